//! Notification channels.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NotificationEvent {
    Alert,
    AlertGroup,
    HostStatus,
    HostRegister,
    HostRetire,
    Monitor,
}

impl NotificationEvent {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "alert" => Some(Self::Alert),
            "alertGroup" => Some(Self::AlertGroup),
            "hostStatus" => Some(Self::HostStatus),
            "hostRegister" => Some(Self::HostRegister),
            "hostRetire" => Some(Self::HostRetire),
            "monitor" => Some(Self::Monitor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NotificationChannel {
    Email(EmailChannel),
    Slack(SlackChannel),
    Webhook(WebhookChannel),
}

impl NotificationChannel {
    pub fn type_name(&self) -> &'static str {
        match self {
            NotificationChannel::Email(_) => "email",
            NotificationChannel::Slack(_) => "slack",
            NotificationChannel::Webhook(_) => "webhook",
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            NotificationChannel::Email(c) => c.id.as_deref(),
            NotificationChannel::Slack(c) => c.id.as_deref(),
            NotificationChannel::Webhook(c) => c.id.as_deref(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            NotificationChannel::Email(c) => &c.name,
            NotificationChannel::Slack(c) => &c.name,
            NotificationChannel::Webhook(c) => &c.name,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        let id = Some(id.into());
        match &mut self {
            NotificationChannel::Email(c) => c.id = id,
            NotificationChannel::Slack(c) => c.id = id,
            NotificationChannel::Webhook(c) => c.id = id,
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EmailChannel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub user_ids: Vec<String>,
    #[serde(default)]
    pub events: Vec<NotificationEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SlackMentions {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ok: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub warning: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub critical: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SlackChannel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub enabled_graph_image: bool,
    #[serde(default)]
    pub mentions: SlackMentions,
    #[serde(default)]
    pub events: Vec<NotificationEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WebhookChannel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub events: Vec<NotificationEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slack_channel_shape() {
        let c = NotificationChannel::Slack(SlackChannel {
            name: "ops".into(),
            url: "https://hooks.slack.com/services/x".into(),
            mentions: SlackMentions { critical: "@here".into(), ..Default::default() },
            events: vec![NotificationEvent::Alert, NotificationEvent::HostRetire],
            ..Default::default()
        });
        assert_eq!(
            serde_json::to_value(&c).unwrap(),
            json!({
                "type": "slack", "name": "ops", "url": "https://hooks.slack.com/services/x",
                "enabledGraphImage": false, "mentions": {"critical": "@here"}, "events": ["alert", "hostRetire"]
            })
        );
    }

    #[test]
    fn email_channel_round_trip() {
        let raw = json!({"id": "ch1", "type": "email", "name": "mail", "emails": ["a@example.com"], "userIds": ["u1"], "events": ["alertGroup"]});
        let c: NotificationChannel = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(c.id(), Some("ch1"));
        assert_eq!(c.type_name(), "email");
        assert_eq!(serde_json::to_value(&c).unwrap(), raw);
    }

    #[test]
    fn event_names() {
        for name in ["alert", "alertGroup", "hostStatus", "hostRegister", "hostRetire", "monitor"] {
            let e = NotificationEvent::parse(name).unwrap();
            assert_eq!(serde_json::to_value(e).unwrap(), json!(name));
        }
        assert!(NotificationEvent::parse("alert_group").is_none());
    }
}
