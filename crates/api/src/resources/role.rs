use anyhow::{Context, Result};
use cfnmkr_core::{IdCodec, IdKind, Outputs};
use cfnmkr_mackerel::{CreateRoleParam, METADATA_NAMESPACE};
use cfnmkr_proxy::{default, Drain, Proxy};
use serde_json::Value;
use tracing::info;

use super::{outputs, Ctx, Outcome, Resource};

pub(crate) struct Role;

struct Props {
    service: String,
    name: String,
    memo: String,
}

fn props(ids: &IdCodec, p: &Proxy<'_>) -> Result<Props> {
    let mut d = Drain::new();
    let service_id = d.string(&p.m("Service"));
    let name = d.string(&p.m("Name"));
    let memo = d.string(&default(p.m("Memo"), ""));
    d.combine_errors()?;
    let service = ids.parse_service(&service_id).with_context(|| format!("failed to parse {:?} as service id", service_id))?;
    Ok(Props { service, name, memo })
}

fn role_outputs(p: &Props) -> Outputs {
    outputs([("Name", Value::from(p.name.as_str())), ("FullName", format!("{}:{}", p.service, p.name).into())])
}

#[async_trait::async_trait]
impl Resource for Role {
    async fn create(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let p = props(&ids, &ctx.properties())?;
        let param = CreateRoleParam { name: p.name.clone(), memo: p.memo.clone() };
        // 400 means the role already exists; adopt it.
        let creation = match ctx.api.create_role(ctx.inv, &p.service, &param).await {
            Ok(_) => None,
            Err(e) if e.is_bad_request() => {
                info!(service = %p.service, role = %p.name, error = %e, "role: may already exist, adopting");
                Some(anyhow::Error::new(e).context("failed to create role"))
            }
            Err(e) => return Err(anyhow::Error::new(e).context("failed to create role")),
        };

        let metadata = serde_json::to_value(ctx.event.metadata())?;
        if let Err(e) = ctx.api.put_role_metadata(ctx.inv, &p.service, &p.name, METADATA_NAMESPACE, &metadata).await {
            return Err(creation.unwrap_or_else(|| anyhow::Error::new(e).context("failed to put role metadata")));
        }
        let id = ids.build(IdKind::Role, &[&p.service, &p.name]);
        Ok((id, role_outputs(&p)))
    }

    // Only the memo can differ here and roles have no update endpoint.
    async fn update_in_place(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let p = props(&ids, &ctx.properties())?;
        Ok(ctx.keep(role_outputs(&p)))
    }

    async fn delete(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let Some((service, role)) = ctx.owned(ids.parse_role(ctx.physical_id())) else { return Ok(ctx.echo()) };
        ctx.ignore_missing(ctx.api.delete_role(ctx.inv, &service, &role).await)?;
        Ok(ctx.echo())
    }
}
