//! Per-kind lifecycle adapters and the pieces they share.

mod aws_integration;
mod channel;
mod dashboard;
mod downtime;
mod group;
mod host;
mod monitor;
mod org;
mod role;
mod service;
mod user;

use std::sync::Arc;

use anyhow::Result;
use cfnmkr_core::{immutable, Event, IdCodec, IdError, Invocation, Outputs, RequestType};
use cfnmkr_mackerel::{ApiResult, MackerelApi};
use cfnmkr_proxy::{Drain, Proxy};
use metrics::counter;
use serde_json::Value;
use tracing::{info, warn};

use crate::{Function, ResourceError};

/// Physical id and outputs reported for a handled event.
pub(crate) type Outcome = (String, Outputs);

/// Resource kinds served under `Custom::<Kind>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Org,
    Service,
    Role,
    Host,
    Monitor,
    Dashboard,
    NotificationChannel,
    NotificationGroup,
    User,
    Downtime,
    AwsIntegration,
    AwsIntegrationExternalId,
}

impl Kind {
    pub const ALL: [Kind; 12] = [
        Kind::Org,
        Kind::Service,
        Kind::Role,
        Kind::Host,
        Kind::Monitor,
        Kind::Dashboard,
        Kind::NotificationChannel,
        Kind::NotificationGroup,
        Kind::User,
        Kind::Downtime,
        Kind::AwsIntegration,
        Kind::AwsIntegrationExternalId,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Org => "Org",
            Kind::Service => "Service",
            Kind::Role => "Role",
            Kind::Host => "Host",
            Kind::Monitor => "Monitor",
            Kind::Dashboard => "Dashboard",
            Kind::NotificationChannel => "NotificationChannel",
            Kind::NotificationGroup => "NotificationGroup",
            Kind::User => "User",
            Kind::Downtime => "Downtime",
            Kind::AwsIntegration => "AWSIntegration",
            Kind::AwsIntegrationExternalId => "AWSIntegrationExternalId",
        }
    }

    /// Kind named by a resource type with `Custom::` already stripped.
    pub fn parse(s: &str) -> Option<Self> { Self::ALL.into_iter().find(|k| k.as_str() == s) }

    fn resource(self) -> &'static dyn Resource {
        match self {
            Kind::Org => &org::Org,
            Kind::Service => &service::Service,
            Kind::Role => &role::Role,
            Kind::Host => &host::Host,
            Kind::Monitor => &monitor::Monitor,
            Kind::Dashboard => &dashboard::Dashboard,
            Kind::NotificationChannel => &channel::NotificationChannel,
            Kind::NotificationGroup => &group::NotificationGroup,
            Kind::User => &user::User,
            Kind::Downtime => &downtime::Downtime,
            Kind::AwsIntegration => &aws_integration::AwsIntegration,
            Kind::AwsIntegrationExternalId => &aws_integration::AwsIntegrationExternalId,
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

/// Route one event to its adapter.
pub(crate) async fn dispatch(function: &Function, inv: &Invocation, event: &Event) -> Result<Outcome> {
    let kind = Kind::parse(event.kind()).ok_or_else(|| ResourceError::UnknownResourceType(event.resource_type.clone()))?;
    let api = function.client().await?;
    let ctx = Ctx { event, inv, api, function };
    let resource = kind.resource();
    match event.request_type {
        RequestType::Create => resource.create(&ctx).await,
        RequestType::Update => resource.update(&ctx).await,
        RequestType::Delete => resource.delete(&ctx).await,
    }
}

/// Everything an adapter sees while serving one event.
pub(crate) struct Ctx<'a> {
    pub event: &'a Event,
    pub inv: &'a Invocation,
    pub api: Arc<dyn MackerelApi>,
    function: &'a Function,
}

impl<'a> Ctx<'a> {
    /// Codec for the organization of the API key; fetched once per handler.
    pub async fn ids(&self) -> Result<IdCodec> {
        let org = self.function.org(self.inv).await?;
        Ok(IdCodec::new(org.name))
    }

    pub fn properties(&self) -> Proxy<'a> { self.event.properties() }

    pub fn physical_id(&self) -> &'a str { &self.event.physical_resource_id }

    /// The incoming physical id with no outputs.
    pub fn echo(&self) -> Outcome { (self.event.physical_resource_id.clone(), Outputs::new()) }

    /// Incoming physical id with `outputs`.
    pub fn keep(&self, outputs: Outputs) -> Outcome { (self.event.physical_resource_id.clone(), outputs) }

    /// Delete-time id check: an id this bridge did not mint is not ours to remove.
    pub fn owned<T>(&self, parsed: Result<T, IdError>) -> Option<T> {
        match parsed {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(kind = %self.event.kind(), id = %self.physical_id(), error = %e, "delete: foreign id, nothing to remove");
                counter!("delete_ignored_total", 1u64, "reason" => "foreign_id");
                None
            }
        }
    }

    /// A remote 404 on delete means the entity is already gone.
    pub fn ignore_missing(&self, res: ApiResult<()>) -> Result<()> {
        match res {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                warn!(kind = %self.event.kind(), id = %self.physical_id(), error = %e, "delete: already gone");
                counter!("delete_ignored_total", 1u64, "reason" => "not_found");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Create, update and delete for one resource kind.
#[async_trait::async_trait]
pub(crate) trait Resource: Send + Sync {
    async fn create(&self, ctx: &Ctx<'_>) -> Result<Outcome>;

    /// Replaces the resource through [`Resource::create`] when an immutable property changed.
    async fn update(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let e = ctx.event;
        if immutable::requires_replacement(e.kind(), &e.resource_properties, &e.old_resource_properties) {
            let changed = immutable::changed_properties(&e.resource_properties, &e.old_resource_properties);
            info!(kind = %e.kind(), id = %e.physical_resource_id, changed = ?changed, "update: replacing");
            return self.create(ctx).await;
        }
        self.update_in_place(ctx).await
    }

    async fn update_in_place(&self, ctx: &Ctx<'_>) -> Result<Outcome>;

    async fn delete(&self, ctx: &Ctx<'_>) -> Result<Outcome>;
}

pub(crate) fn outputs<const N: usize>(pairs: [(&str, Value); N]) -> Outputs {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Parse the id stored at `p`, recording any failure on the drain.
pub(crate) fn id_ref<T: Default>(d: &mut Drain, p: &Proxy<'_>, parse: impl FnOnce(&str) -> Result<T, IdError>) -> T {
    match d.check(p.string()) {
        Some(id) => d.check(parse(&id)).unwrap_or_default(),
        None => T::default(),
    }
}

/// Parse every id of the sequence at `p`; bad entries are recorded and skipped.
pub(crate) fn id_list(d: &mut Drain, p: &Proxy<'_>, parse: impl Fn(&str) -> Result<String, IdError>) -> Vec<String> {
    let raw = d.string_array(&p.proxy_set());
    raw.iter().filter_map(|id| d.check(parse(id))).collect()
}

/// String at `p` mapped through `parse`; unknown spellings are recorded.
pub(crate) fn enum_value<T>(d: &mut Drain, p: &Proxy<'_>, what: &'static str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    let s = d.check(p.string())?;
    let v = parse(&s);
    if v.is_none() {
        d.put(ResourceError::InvalidValue { what, value: s });
    }
    v
}

/// Monitor and downtime scopes name either a whole service or one role.
pub(crate) fn scope(ids: &IdCodec, id: &str) -> Option<String> {
    ids.parse_service(id).ok().or_else(|| ids.parse_role_fullname(id).ok())
}

pub(crate) fn scopes(ids: &IdCodec, d: &mut Drain, p: &Proxy<'_>) -> Vec<String> {
    let raw = d.string_array(&p.proxy_set());
    let mut out = Vec::with_capacity(raw.len());
    for id in raw {
        match scope(ids, &id) {
            Some(s) => out.push(s),
            None => d.put(ResourceError::InvalidScope { address: p.address().to_string(), id }),
        }
    }
    out
}
