use anyhow::Result;
use cfnmkr_core::{IdCodec, IdKind};
use cfnmkr_mackerel::{DowntimeRecurrence, DowntimeWeekday, RecurrenceType};
use cfnmkr_proxy::{default, Drain, ErrorCode, Proxy};
use serde_json::json;

use super::{enum_value, id_list, outputs, Ctx, Outcome, Resource};
use crate::ResourceError;

pub(crate) struct Downtime;

fn downtime(ids: &IdCodec, props: &Proxy<'_>) -> Result<cfnmkr_mackerel::Downtime> {
    let mut d = Drain::new();
    let list = |name: &str| default(props.m(name), json!([]));
    let dt = cfnmkr_mackerel::Downtime {
        id: None,
        name: d.string(&props.m("Name")),
        memo: d.string(&default(props.m("Memo"), "")),
        start: d.int64(&props.m("Start")),
        duration: d.int64(&props.m("Duration")),
        recurrence: recurrence(&mut d, &props.m("Recurrence")),
        service_scopes: id_list(&mut d, &list("ServiceScopes"), |id| ids.parse_service(id)),
        service_exclude_scopes: id_list(&mut d, &list("ServiceExcludeScopes"), |id| ids.parse_service(id)),
        role_scopes: id_list(&mut d, &list("RoleScopes"), |id| ids.parse_role_fullname(id)),
        role_exclude_scopes: id_list(&mut d, &list("RoleExcludeScopes"), |id| ids.parse_role_fullname(id)),
        monitor_scopes: id_list(&mut d, &list("MonitorScopes"), |id| ids.parse_monitor(id)),
        monitor_exclude_scopes: id_list(&mut d, &list("MonitorExcludeScopes"), |id| ids.parse_monitor(id)),
    };
    d.combine_errors()?;
    Ok(dt)
}

fn recurrence(d: &mut Drain, r: &Proxy<'_>) -> Option<DowntimeRecurrence> {
    if r.is_error(ErrorCode::NotFound) {
        return None;
    }
    if let Err(e) = r.map() {
        d.put(e);
        return None;
    }
    let kind = enum_value(d, &r.m("Type"), "recurrence type", RecurrenceType::parse);
    let interval = d.int64(&r.m("Interval"));
    let until = d.optional_int64(&r.m("Until"));

    let days = r.m("Weekdays");
    let mut weekdays = Vec::new();
    if !days.is_error(ErrorCode::NotFound) {
        if let Some(k) = kind.filter(|k| *k != RecurrenceType::Weekly) {
            d.put(ResourceError::WeekdaysNotWeekly(format!("{:?}", k).to_lowercase()));
        }
        for day in d.string_array(&days.proxy_set()) {
            match DowntimeWeekday::parse(&day) {
                Some(w) => weekdays.push(w),
                None => d.put(ResourceError::InvalidValue { what: "weekday", value: day }),
            }
        }
    }
    Some(DowntimeRecurrence { kind: kind?, interval, weekdays, until })
}

#[async_trait::async_trait]
impl Resource for Downtime {
    async fn create(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let dt = downtime(&ids, &ctx.properties())?;
        let created = ctx.api.create_downtime(ctx.inv, &dt).await?;
        let downtime_id = created.id.as_deref().ok_or(ResourceError::MissingId("downtime"))?;
        Ok((ids.build(IdKind::Downtime, &[downtime_id]), outputs([("Name", created.name.as_str().into())])))
    }

    async fn update_in_place(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let dt = downtime(&ids, &ctx.properties())?;
        let downtime_id = ids.parse_downtime(ctx.physical_id())?;
        let updated = ctx.api.update_downtime(ctx.inv, &downtime_id, &dt).await?;
        Ok(ctx.keep(outputs([("Name", updated.name.into())])))
    }

    async fn delete(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let Some(downtime_id) = ctx.owned(ids.parse_downtime(ctx.physical_id())) else { return Ok(ctx.echo()) };
        ctx.ignore_missing(ctx.api.delete_downtime(ctx.inv, &downtime_id).await)?;
        Ok(ctx.echo())
    }
}
