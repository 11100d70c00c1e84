use anyhow::Result;
use cfnmkr_core::IdKind;
use cfnmkr_mackerel::CreateServiceParam;
use cfnmkr_proxy::{default, Drain, Proxy};

use super::{outputs, Ctx, Outcome, Resource};

pub(crate) struct Service;

fn param(props: &Proxy<'_>) -> Result<CreateServiceParam> {
    let mut d = Drain::new();
    let param = CreateServiceParam { name: d.string(&props.m("Name")), memo: d.string(&default(props.m("Memo"), "")) };
    d.combine_errors()?;
    Ok(param)
}

#[async_trait::async_trait]
impl Resource for Service {
    async fn create(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let param = param(&ctx.properties())?;
        let ids = ctx.ids().await?;
        let svc = ctx.api.create_service(ctx.inv, &param).await?;
        let id = ids.build(IdKind::Service, &[&svc.name]);
        Ok((id, outputs([("Name", svc.name.into()), ("Memo", svc.memo.into())])))
    }

    // Services have no update endpoint; only the name is identifying.
    async fn update_in_place(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let param = param(&ctx.properties())?;
        Ok(ctx.keep(outputs([("Name", param.name.into()), ("Memo", param.memo.into())])))
    }

    async fn delete(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let Some(name) = ctx.owned(ids.parse_service(ctx.physical_id())) else { return Ok(ctx.echo()) };
        ctx.ignore_missing(ctx.api.delete_service(ctx.inv, &name).await)?;
        Ok(ctx.echo())
    }
}
