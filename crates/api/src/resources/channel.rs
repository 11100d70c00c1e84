use anyhow::Result;
use cfnmkr_core::IdKind;
use cfnmkr_mackerel::channel::{EmailChannel, NotificationEvent, SlackChannel, SlackMentions, WebhookChannel};
use cfnmkr_proxy::{default, Drain, Proxy};
use serde_json::json;

use super::{outputs, Ctx, Outcome, Resource};
use crate::ResourceError;

/// Channels cannot be edited remotely; any property change makes a new one.
pub(crate) struct NotificationChannel;

type Channel = cfnmkr_mackerel::NotificationChannel;

fn channel(props: &Proxy<'_>) -> Result<Channel> {
    let typ = props.m("Type").string()?;
    let mut d = Drain::new();
    let name = d.string(&props.m("Name"));
    let events = events(&mut d, &props.m("Events"));
    let ch = match typ.as_str() {
        "email" => Channel::Email(EmailChannel {
            id: None,
            name,
            emails: d.string_array(&props.m("Emails").proxy_set()),
            user_ids: d.string_array(&default(props.m("UserIds"), json!([])).proxy_set()),
            events,
        }),
        "slack" => {
            let mentions = props.m("Mentions");
            Channel::Slack(SlackChannel {
                id: None,
                name,
                url: d.string(&props.m("Url")),
                enabled_graph_image: d.bool(&default(props.m("EnabledGraphImage"), false)),
                mentions: SlackMentions {
                    ok: d.string(&default(mentions.m("Ok"), "")),
                    warning: d.string(&default(mentions.m("Warning"), "")),
                    critical: d.string(&default(mentions.m("Critical"), "")),
                },
                events,
            })
        }
        "webhook" => Channel::Webhook(WebhookChannel { id: None, name, url: d.string(&props.m("Url")), events }),
        other => return Err(ResourceError::UnknownType { what: "notification channel", value: other.to_string() }.into()),
    };
    d.combine_errors()?;
    Ok(ch)
}

fn events(d: &mut Drain, p: &Proxy<'_>) -> Vec<NotificationEvent> {
    let mut out = Vec::new();
    for e in d.string_array(&p.proxy_set()) {
        match NotificationEvent::parse(&e) {
            Some(ev) => out.push(ev),
            None => d.put(ResourceError::InvalidValue { what: "notification event", value: e }),
        }
    }
    out
}

#[async_trait::async_trait]
impl Resource for NotificationChannel {
    async fn create(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ch = channel(&ctx.properties())?;
        let ids = ctx.ids().await?;
        let created = ctx.api.create_notification_channel(ctx.inv, &ch).await?;
        let channel_id = created.id().ok_or(ResourceError::MissingId("notification channel"))?;
        Ok((ids.build(IdKind::NotificationChannel, &[channel_id]), outputs([("Name", created.name().into())])))
    }

    // Reached only when nothing changed.
    async fn update_in_place(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ch = channel(&ctx.properties())?;
        Ok(ctx.keep(outputs([("Name", ch.name().into())])))
    }

    async fn delete(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let Some(channel_id) = ctx.owned(ids.parse_notification_channel(ctx.physical_id())) else { return Ok(ctx.echo()) };
        ctx.ignore_missing(ctx.api.delete_notification_channel(ctx.inv, &channel_id).await)?;
        Ok(ctx.echo())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slack_mentions_default_to_empty() {
        let v = json!({"Type": "slack", "Name": "ops", "Url": "https://hooks.slack.com/x", "Mentions": {"Critical": "@here"}, "Events": ["alert"]});
        let Channel::Slack(s) = channel(&Proxy::new(&v)).unwrap() else { panic!("not slack") };
        assert_eq!(s.mentions, SlackMentions { critical: "@here".into(), ..Default::default() });
        assert!(!s.enabled_graph_image);
        assert_eq!(s.events, vec![NotificationEvent::Alert]);
    }

    #[test]
    fn unknown_events_are_rejected() {
        let v = json!({"Type": "webhook", "Name": "hook", "Url": "https://example.com", "Events": ["alert", "everything"]});
        let err = channel(&Proxy::new(&v)).unwrap_err();
        assert_eq!(err.to_string(), "invalid notification event: everything");
    }
}
