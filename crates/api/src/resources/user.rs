use anyhow::Result;
use cfnmkr_core::IdKind;
use cfnmkr_mackerel::UserAuthority;
use cfnmkr_proxy::{default, Drain, Proxy};
use tracing::info;

use super::{enum_value, outputs, Ctx, Outcome, Resource};
use crate::ResourceError;

/// Membership of an email address in the organization.
pub(crate) struct User;

fn props(p: &Proxy<'_>) -> Result<(String, UserAuthority)> {
    let mut d = Drain::new();
    let email = d.string(&p.m("Email"));
    let authority = enum_value(&mut d, &default(p.m("Authority"), "viewer"), "authority", UserAuthority::parse).unwrap_or_default();
    d.combine_errors()?;
    Ok((email, authority))
}

async fn invited(ctx: &Ctx<'_>, email: &str) -> Result<bool> {
    let list = ctx.api.find_invitations(ctx.inv).await?;
    Ok(list.iter().any(|i| i.email == email))
}

async fn member_id(ctx: &Ctx<'_>, email: &str) -> Result<Option<String>> {
    let users = ctx.api.find_users(ctx.inv).await?;
    Ok(users.into_iter().find(|u| u.email == email).map(|u| u.id))
}

#[async_trait::async_trait]
impl Resource for User {
    /// Invite the address; a 400 is fine when it is already invited or already a member.
    async fn create(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let (email, authority) = props(&ctx.properties())?;
        let ids = ctx.ids().await?;
        let id = ids.build(IdKind::User, &[&email]);
        let out = outputs([("Email", email.as_str().into())]);

        match ctx.api.create_invitation(ctx.inv, &email, authority).await {
            Ok(_) => return Ok((id, out)),
            Err(e) if e.is_bad_request() => info!(email = %email, error = %e, "user: invitation rejected, checking membership"),
            Err(e) => return Err(e.into()),
        }
        if invited(ctx, &email).await? || member_id(ctx, &email).await?.is_some() {
            return Ok((id, out));
        }
        Err(ResourceError::InviteFailed(email).into())
    }

    // Authority changes are not propagated.
    async fn update_in_place(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let (email, _) = props(&ctx.properties())?;
        Ok(ctx.keep(outputs([("Email", email.into())])))
    }

    async fn delete(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let Some(email) = ctx.owned(ids.parse_user(ctx.physical_id())) else { return Ok(ctx.echo()) };
        ctx.ignore_missing(ctx.api.revoke_invitation(ctx.inv, &email).await)?;
        if let Some(uid) = member_id(ctx, &email).await? {
            ctx.ignore_missing(ctx.api.delete_user(ctx.inv, &uid).await)?;
        }
        Ok(ctx.echo())
    }
}
