use anyhow::Result;
use cfnmkr_core::{IdCodec, IdKind};
use cfnmkr_mackerel::{NotificationGroupMonitor, NotificationGroupService, NotificationLevel};
use cfnmkr_proxy::{default, Drain, Proxy};
use serde_json::json;

use super::{enum_value, id_list, id_ref, outputs, Ctx, Outcome, Resource};
use crate::ResourceError;

pub(crate) struct NotificationGroup;

type Group = cfnmkr_mackerel::NotificationGroup;

/// Every referenced id is checked; all bad references are reported together.
fn group(ids: &IdCodec, props: &Proxy<'_>) -> Result<Group> {
    let mut d = Drain::new();
    let name = d.string(&props.m("Name"));
    let notification_level = enum_value(&mut d, &default(props.m("NotificationLevel"), "all"), "notification level", NotificationLevel::parse).unwrap_or_default();
    let child_notification_group_ids =
        id_list(&mut d, &default(props.m("ChildNotificationGroupIds"), json!([])), |id| ids.parse_notification_group(id));
    let child_channel_ids = id_list(&mut d, &default(props.m("ChildChannelIds"), json!([])), |id| ids.parse_notification_channel(id));

    let mut services = Vec::new();
    for s in d.proxy_array(default(props.m("Services"), json!([])).proxy_set()) {
        services.push(NotificationGroupService { name: id_ref(&mut d, &s.m("Id"), |id| ids.parse_service(id)) });
    }
    let mut monitors = Vec::new();
    for m in d.proxy_array(default(props.m("Monitors"), json!([])).proxy_set()) {
        monitors.push(NotificationGroupMonitor {
            id: id_ref(&mut d, &m.m("Id"), |id| ids.parse_monitor(id)),
            skip_default: d.bool(&default(m.m("SkipDefault"), false)),
        });
    }

    d.combine_errors()?;
    Ok(Group { id: None, name, notification_level, child_notification_group_ids, child_channel_ids, monitors, services })
}

#[async_trait::async_trait]
impl Resource for NotificationGroup {
    async fn create(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let g = group(&ids, &ctx.properties())?;
        let created = ctx.api.create_notification_group(ctx.inv, &g).await?;
        let group_id = created.id.as_deref().ok_or(ResourceError::MissingId("notification group"))?;
        Ok((ids.build(IdKind::NotificationGroup, &[group_id]), outputs([("Name", created.name.as_str().into())])))
    }

    async fn update_in_place(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let group_id = ids.parse_notification_group(ctx.physical_id())?;
        let g = group(&ids, &ctx.properties())?;
        let updated = ctx.api.update_notification_group(ctx.inv, &group_id, &g).await?;
        Ok(ctx.keep(outputs([("Name", updated.name.into())])))
    }

    async fn delete(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let Some(group_id) = ctx.owned(ids.parse_notification_group(ctx.physical_id())) else { return Ok(ctx.echo()) };
        ctx.ignore_missing(ctx.api.delete_notification_group(ctx.inv, &group_id).await)?;
        Ok(ctx.echo())
    }
}
