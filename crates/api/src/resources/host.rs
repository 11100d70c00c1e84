use anyhow::Result;
use cfnmkr_core::{IdCodec, IdKind};
use cfnmkr_mackerel::HostParam;
use cfnmkr_proxy::{default, Drain, Proxy};
use serde_json::json;

use super::{id_list, outputs, Ctx, Outcome, Resource};

pub(crate) struct Host;

fn param(ids: &IdCodec, props: &Proxy<'_>) -> Result<HostParam> {
    let mut d = Drain::new();
    let param = HostParam {
        name: d.string(&props.m("Name")),
        role_fullnames: id_list(&mut d, &default(props.m("Roles"), json!([])), |id| ids.parse_role_fullname(id)),
        ..Default::default()
    };
    d.combine_errors()?;
    Ok(param)
}

#[async_trait::async_trait]
impl Resource for Host {
    async fn create(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let param = param(&ids, &ctx.properties())?;
        let host_id = ctx.api.create_host(ctx.inv, &param).await?;
        Ok((ids.build(IdKind::Host, &[&host_id]), outputs([("Name", param.name.into())])))
    }

    async fn update_in_place(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let param = param(&ids, &ctx.properties())?;
        let host_id = ids.parse_host(ctx.physical_id())?;
        ctx.api.update_host(ctx.inv, &host_id, &param).await?;
        Ok(ctx.keep(outputs([("Name", param.name.into())])))
    }

    async fn delete(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let Some(host_id) = ctx.owned(ids.parse_host(ctx.physical_id())) else { return Ok(ctx.echo()) };
        ctx.ignore_missing(ctx.api.retire_host(ctx.inv, &host_id).await)?;
        Ok(ctx.echo())
    }
}
