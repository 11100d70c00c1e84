use anyhow::Result;
use cfnmkr_core::IdCodec;

use super::{outputs, Ctx, Outcome, Resource};

/// The organization owning the API key. Read only.
pub(crate) struct Org;

#[async_trait::async_trait]
impl Resource for Org {
    async fn create(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let org = ctx.api.get_org(ctx.inv).await?;
        let id = IdCodec::new(org.name.as_str()).org_id();
        Ok((id, outputs([("Name", org.name.into())])))
    }

    async fn update_in_place(&self, ctx: &Ctx<'_>) -> Result<Outcome> { self.create(ctx).await }

    async fn delete(&self, ctx: &Ctx<'_>) -> Result<Outcome> { Ok(ctx.echo()) }
}
