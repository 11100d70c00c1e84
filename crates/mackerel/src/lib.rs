//! Mackerel API surface used by the custom resource bridge.
//!
//! [`MackerelApi`] is the seam adapters depend on. [`Client`] talks HTTP,
//! [`MockMackerel`] answers in-process and records what it was asked.

#![forbid(unsafe_code)]

pub mod apikey;
pub mod channel;
mod client;
pub mod dashboard;
mod error;
mod mock;
pub mod monitor;
pub mod types;

use cfnmkr_core::Invocation;
use serde_json::Value;

pub use apikey::{ApiKeyProvider, ChainKey, EnvKey, StaticKey};
pub use channel::NotificationChannel;
pub use client::{Client, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, USER_AGENT};
pub use dashboard::Dashboard;
pub use error::{is_bad_request, is_not_found, status_of, ApiError, ApiResult};
pub use mock::{MockMackerel, Request};
pub use monitor::Monitor;
pub use types::*;

/// Namespace of role metadata written for stack provenance.
pub const METADATA_NAMESPACE: &str = "cloudformation";

/// Remote operations; every call observes the invocation's cancellation and deadline.
#[async_trait::async_trait]
pub trait MackerelApi: Send + Sync {
    async fn get_org(&self, inv: &Invocation) -> ApiResult<Org>;

    async fn create_service(&self, inv: &Invocation, param: &CreateServiceParam) -> ApiResult<Service>;
    async fn delete_service(&self, inv: &Invocation, service: &str) -> ApiResult<()>;

    async fn create_role(&self, inv: &Invocation, service: &str, param: &CreateRoleParam) -> ApiResult<Role>;
    async fn delete_role(&self, inv: &Invocation, service: &str, role: &str) -> ApiResult<()>;
    async fn put_role_metadata(&self, inv: &Invocation, service: &str, role: &str, namespace: &str, metadata: &Value) -> ApiResult<()>;

    /// Returns the new host id.
    async fn create_host(&self, inv: &Invocation, param: &HostParam) -> ApiResult<String>;
    async fn update_host(&self, inv: &Invocation, host_id: &str, param: &HostParam) -> ApiResult<String>;
    async fn retire_host(&self, inv: &Invocation, host_id: &str) -> ApiResult<()>;

    async fn create_monitor(&self, inv: &Invocation, monitor: &Monitor) -> ApiResult<Monitor>;
    async fn update_monitor(&self, inv: &Invocation, monitor_id: &str, monitor: &Monitor) -> ApiResult<Monitor>;
    async fn delete_monitor(&self, inv: &Invocation, monitor_id: &str) -> ApiResult<()>;

    async fn create_dashboard(&self, inv: &Invocation, dashboard: &Dashboard) -> ApiResult<Dashboard>;
    async fn update_dashboard(&self, inv: &Invocation, dashboard_id: &str, dashboard: &Dashboard) -> ApiResult<Dashboard>;
    async fn delete_dashboard(&self, inv: &Invocation, dashboard_id: &str) -> ApiResult<()>;

    async fn create_notification_channel(&self, inv: &Invocation, channel: &NotificationChannel) -> ApiResult<NotificationChannel>;
    async fn delete_notification_channel(&self, inv: &Invocation, channel_id: &str) -> ApiResult<()>;

    async fn create_notification_group(&self, inv: &Invocation, group: &NotificationGroup) -> ApiResult<NotificationGroup>;
    async fn update_notification_group(&self, inv: &Invocation, group_id: &str, group: &NotificationGroup) -> ApiResult<NotificationGroup>;
    async fn delete_notification_group(&self, inv: &Invocation, group_id: &str) -> ApiResult<()>;

    async fn find_users(&self, inv: &Invocation) -> ApiResult<Vec<User>>;
    async fn delete_user(&self, inv: &Invocation, user_id: &str) -> ApiResult<()>;
    async fn find_invitations(&self, inv: &Invocation) -> ApiResult<Vec<Invitation>>;
    async fn create_invitation(&self, inv: &Invocation, email: &str, authority: UserAuthority) -> ApiResult<Invitation>;
    async fn revoke_invitation(&self, inv: &Invocation, email: &str) -> ApiResult<()>;

    async fn create_downtime(&self, inv: &Invocation, downtime: &Downtime) -> ApiResult<Downtime>;
    async fn update_downtime(&self, inv: &Invocation, downtime_id: &str, downtime: &Downtime) -> ApiResult<Downtime>;
    async fn delete_downtime(&self, inv: &Invocation, downtime_id: &str) -> ApiResult<()>;

    async fn create_aws_integration(&self, inv: &Invocation, integration: &AwsIntegration) -> ApiResult<AwsIntegration>;
    async fn update_aws_integration(&self, inv: &Invocation, integration_id: &str, integration: &AwsIntegration) -> ApiResult<AwsIntegration>;
    async fn delete_aws_integration(&self, inv: &Invocation, integration_id: &str) -> ApiResult<()>;
    /// Mints the external id AWS must present when assuming the integration role.
    async fn create_aws_integration_external_id(&self, inv: &Invocation) -> ApiResult<String>;
}
