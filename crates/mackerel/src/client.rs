use std::time::{Duration, Instant};

use cfnmkr_core::Invocation;
use metrics::{counter, histogram};
use reqwest::header::{ACCEPT, USER_AGENT as USER_AGENT_HEADER};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::debug;
use url::Url;

use crate::apikey::{self, ApiKeyProvider};
use crate::error::{ApiError, ApiResult};
use crate::{AwsIntegration, CreateRoleParam, CreateServiceParam, Dashboard, Downtime, HostParam, Invitation, MackerelApi, Monitor, NotificationChannel, NotificationGroup, Org, Role, Service, User, UserAuthority};

pub const DEFAULT_BASE_URL: &str = "https://api.mackerelio.com/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const USER_AGENT: &str = concat!("cfn-mackerel-macro/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the Mackerel API.
pub struct Client {
    http: reqwest::Client,
    base: Url,
    key: Box<dyn ApiKeyProvider>,
    key_cache: OnceCell<String>,
    timeout: Duration,
}

#[derive(Deserialize)]
struct Success {
    #[serde(default)]
    success: bool,
}

#[derive(Deserialize)]
struct IdOnly {
    id: String,
}

impl Client {
    pub fn new(key: impl ApiKeyProvider + 'static) -> ApiResult<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, base: Url::parse(DEFAULT_BASE_URL)?, key: Box::new(key), key_cache: OnceCell::new(), timeout: DEFAULT_TIMEOUT })
    }

    /// Key from `CFNMKR_API_KEY`/`MACKEREL_APIKEY`, base URL from `CFNMKR_BASE_URL`,
    /// per-call bound from `CFNMKR_HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> ApiResult<Self> {
        let base = std::env::var("CFNMKR_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let secs = std::env::var("CFNMKR_HTTP_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_TIMEOUT.as_secs());
        Ok(Self::new(apikey::from_env())?.with_base_url(&base)?.with_timeout(Duration::from_secs(secs)))
    }

    pub fn with_base_url(mut self, base: &str) -> ApiResult<Self> {
        self.base = Url::parse(base)?;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url { &self.base }

    async fn api_key(&self) -> ApiResult<String> {
        let key = self.key_cache.get_or_try_init(|| self.key.api_key()).await?;
        Ok(key.clone())
    }

    /// Base URL with its path replaced by `segments`, each one percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut out = self.base.clone();
        out.path_segments_mut().map_err(|_| ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?.clear().extend(segments);
        Ok(out)
    }

    async fn send(&self, method: Method, url: Url, body: Option<Value>) -> ApiResult<Vec<u8>> {
        let key = self.api_key().await?;
        let mut req = self.http.request(method, url).header("X-Api-Key", key).header(USER_AGENT_HEADER, USER_AGENT).header(ACCEPT, "application/json");
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            return Err(ApiError::from_body(status.as_u16(), &bytes));
        }
        Ok(bytes.to_vec())
    }

    /// One bounded round trip: `min(timeout, time left)`, aborted on cancellation.
    async fn call<T: DeserializeOwned>(&self, inv: &Invocation, op: &'static str, method: Method, path: &[&str], body: Option<Value>) -> ApiResult<T> {
        let url = self.endpoint(path)?;
        let path = url.path().to_string();
        let t0 = Instant::now();
        let bound = inv.bound(self.timeout);
        counter!("mackerel_requests_total", 1u64, "op" => op);
        let res = tokio::select! {
            biased;
            _ = inv.cancelled() => Err(ApiError::Cancelled),
            r = tokio::time::timeout(bound, self.send(method.clone(), url, body)) => r.unwrap_or_else(|_| Err(ApiError::Timeout(bound))),
        };
        let took_ms = t0.elapsed().as_secs_f64() * 1000.0;
        histogram!("mackerel_latency_ms", took_ms, "op" => op);
        match &res {
            Ok(bytes) => debug!(op, method = %method, path = %path, bytes = bytes.len(), took_ms = %t0.elapsed().as_millis(), "mackerel: ok"),
            Err(e) => {
                counter!("mackerel_errors_total", 1u64, "op" => op);
                debug!(op, method = %method, path = %path, error = %e, took_ms = %t0.elapsed().as_millis(), "mackerel: failed");
            }
        }
        decode(&res?)
    }

    async fn call_success(&self, inv: &Invocation, op: &'static str, method: Method, path: &[&str], body: Option<Value>) -> ApiResult<()> {
        let s: Success = self.call(inv, op, method, path, body).await?;
        if !s.success {
            return Err(ApiError::UnexpectedResponse);
        }
        Ok(())
    }
}

fn body<T: Serialize + ?Sized>(v: &T) -> ApiResult<Option<Value>> { Ok(Some(serde_json::to_value(v)?)) }

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> ApiResult<T> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(serde_json::from_slice(b"null")?);
    }
    Ok(serde_json::from_slice(bytes)?)
}

#[async_trait::async_trait]
impl MackerelApi for Client {
    async fn get_org(&self, inv: &Invocation) -> ApiResult<Org> { self.call(inv, "get_org", Method::GET, &["api", "v0", "org"], None).await }

    async fn create_service(&self, inv: &Invocation, param: &CreateServiceParam) -> ApiResult<Service> {
        self.call(inv, "create_service", Method::POST, &["api", "v0", "services"], body(param)?).await
    }

    async fn delete_service(&self, inv: &Invocation, service: &str) -> ApiResult<()> {
        let _: Value = self.call(inv, "delete_service", Method::DELETE, &["api", "v0", "services", service], None).await?;
        Ok(())
    }

    async fn create_role(&self, inv: &Invocation, service: &str, param: &CreateRoleParam) -> ApiResult<Role> {
        self.call(inv, "create_role", Method::POST, &["api", "v0", "services", service, "roles"], body(param)?).await
    }

    async fn delete_role(&self, inv: &Invocation, service: &str, role: &str) -> ApiResult<()> {
        let _: Value = self.call(inv, "delete_role", Method::DELETE, &["api", "v0", "services", service, "roles", role], None).await?;
        Ok(())
    }

    async fn put_role_metadata(&self, inv: &Invocation, service: &str, role: &str, namespace: &str, metadata: &Value) -> ApiResult<()> {
        let path = ["api", "v0", "services", service, "roles", role, "metadata", namespace];
        self.call_success(inv, "put_role_metadata", Method::PUT, &path, Some(metadata.clone())).await
    }

    async fn create_host(&self, inv: &Invocation, param: &HostParam) -> ApiResult<String> {
        let r: IdOnly = self.call(inv, "create_host", Method::POST, &["api", "v0", "hosts"], body(param)?).await?;
        Ok(r.id)
    }

    async fn update_host(&self, inv: &Invocation, host_id: &str, param: &HostParam) -> ApiResult<String> {
        let r: IdOnly = self.call(inv, "update_host", Method::PUT, &["api", "v0", "hosts", host_id], body(param)?).await?;
        Ok(r.id)
    }

    async fn retire_host(&self, inv: &Invocation, host_id: &str) -> ApiResult<()> {
        let _: Value = self.call(inv, "retire_host", Method::POST, &["api", "v0", "hosts", host_id, "retire"], Some(json!({}))).await?;
        Ok(())
    }

    async fn create_monitor(&self, inv: &Invocation, monitor: &Monitor) -> ApiResult<Monitor> {
        self.call(inv, "create_monitor", Method::POST, &["api", "v0", "monitors"], body(monitor)?).await
    }

    async fn update_monitor(&self, inv: &Invocation, monitor_id: &str, monitor: &Monitor) -> ApiResult<Monitor> {
        self.call(inv, "update_monitor", Method::PUT, &["api", "v0", "monitors", monitor_id], body(monitor)?).await
    }

    async fn delete_monitor(&self, inv: &Invocation, monitor_id: &str) -> ApiResult<()> {
        let _: Value = self.call(inv, "delete_monitor", Method::DELETE, &["api", "v0", "monitors", monitor_id], None).await?;
        Ok(())
    }

    async fn create_dashboard(&self, inv: &Invocation, dashboard: &Dashboard) -> ApiResult<Dashboard> {
        self.call(inv, "create_dashboard", Method::POST, &["api", "v0", "dashboards"], body(dashboard)?).await
    }

    async fn update_dashboard(&self, inv: &Invocation, dashboard_id: &str, dashboard: &Dashboard) -> ApiResult<Dashboard> {
        self.call(inv, "update_dashboard", Method::PUT, &["api", "v0", "dashboards", dashboard_id], body(dashboard)?).await
    }

    async fn delete_dashboard(&self, inv: &Invocation, dashboard_id: &str) -> ApiResult<()> {
        let _: Value = self.call(inv, "delete_dashboard", Method::DELETE, &["api", "v0", "dashboards", dashboard_id], None).await?;
        Ok(())
    }

    async fn create_notification_channel(&self, inv: &Invocation, channel: &NotificationChannel) -> ApiResult<NotificationChannel> {
        self.call(inv, "create_notification_channel", Method::POST, &["api", "v0", "channels"], body(channel)?).await
    }

    async fn delete_notification_channel(&self, inv: &Invocation, channel_id: &str) -> ApiResult<()> {
        let _: Value = self.call(inv, "delete_notification_channel", Method::DELETE, &["api", "v0", "channels", channel_id], None).await?;
        Ok(())
    }

    async fn create_notification_group(&self, inv: &Invocation, group: &NotificationGroup) -> ApiResult<NotificationGroup> {
        self.call(inv, "create_notification_group", Method::POST, &["api", "v0", "notification-groups"], body(group)?).await
    }

    async fn update_notification_group(&self, inv: &Invocation, group_id: &str, group: &NotificationGroup) -> ApiResult<NotificationGroup> {
        self.call(inv, "update_notification_group", Method::PUT, &["api", "v0", "notification-groups", group_id], body(group)?).await
    }

    async fn delete_notification_group(&self, inv: &Invocation, group_id: &str) -> ApiResult<()> {
        let _: Value = self.call(inv, "delete_notification_group", Method::DELETE, &["api", "v0", "notification-groups", group_id], None).await?;
        Ok(())
    }

    async fn find_users(&self, inv: &Invocation) -> ApiResult<Vec<User>> {
        #[derive(Deserialize)]
        struct Users {
            #[serde(default)]
            users: Vec<User>,
        }
        let r: Users = self.call(inv, "find_users", Method::GET, &["api", "v0", "users"], None).await?;
        Ok(r.users)
    }

    async fn delete_user(&self, inv: &Invocation, user_id: &str) -> ApiResult<()> {
        let _: Value = self.call(inv, "delete_user", Method::DELETE, &["api", "v0", "users", user_id], None).await?;
        Ok(())
    }

    async fn find_invitations(&self, inv: &Invocation) -> ApiResult<Vec<Invitation>> {
        #[derive(Deserialize)]
        struct Invitations {
            #[serde(default)]
            invitations: Vec<Invitation>,
        }
        let r: Invitations = self.call(inv, "find_invitations", Method::GET, &["api", "v0", "invitations"], None).await?;
        Ok(r.invitations)
    }

    async fn create_invitation(&self, inv: &Invocation, email: &str, authority: UserAuthority) -> ApiResult<Invitation> {
        self.call(inv, "create_invitation", Method::POST, &["api", "v0", "invitations"], Some(json!({"email": email, "authority": authority}))).await
    }

    async fn revoke_invitation(&self, inv: &Invocation, email: &str) -> ApiResult<()> {
        self.call_success(inv, "revoke_invitation", Method::POST, &["api", "v0", "invitations", "revoke"], Some(json!({"email": email}))).await
    }

    async fn create_downtime(&self, inv: &Invocation, downtime: &Downtime) -> ApiResult<Downtime> {
        self.call(inv, "create_downtime", Method::POST, &["api", "v0", "downtimes"], body(downtime)?).await
    }

    async fn update_downtime(&self, inv: &Invocation, downtime_id: &str, downtime: &Downtime) -> ApiResult<Downtime> {
        self.call(inv, "update_downtime", Method::PUT, &["api", "v0", "downtimes", downtime_id], body(downtime)?).await
    }

    async fn delete_downtime(&self, inv: &Invocation, downtime_id: &str) -> ApiResult<()> {
        let _: Value = self.call(inv, "delete_downtime", Method::DELETE, &["api", "v0", "downtimes", downtime_id], None).await?;
        Ok(())
    }

    async fn create_aws_integration(&self, inv: &Invocation, integration: &AwsIntegration) -> ApiResult<AwsIntegration> {
        self.call(inv, "create_aws_integration", Method::POST, &["api", "v0", "aws-integrations"], body(integration)?).await
    }

    async fn update_aws_integration(&self, inv: &Invocation, integration_id: &str, integration: &AwsIntegration) -> ApiResult<AwsIntegration> {
        self.call(inv, "update_aws_integration", Method::PUT, &["api", "v0", "aws-integrations", integration_id], body(integration)?).await
    }

    async fn delete_aws_integration(&self, inv: &Invocation, integration_id: &str) -> ApiResult<()> {
        let _: Value = self.call(inv, "delete_aws_integration", Method::DELETE, &["api", "v0", "aws-integrations", integration_id], None).await?;
        Ok(())
    }

    async fn create_aws_integration_external_id(&self, inv: &Invocation) -> ApiResult<String> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ExternalId {
            external_id: String,
        }
        let r: ExternalId = self.call(inv, "create_aws_integration_external_id", Method::POST, &["api", "v0", "aws-integrations-external-id"], None).await?;
        Ok(r.external_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticKey;

    #[test]
    fn paths_replace_base_path() {
        let c = Client::new(StaticKey("k".into())).unwrap().with_base_url("https://mackerel.example.com/prefix/").unwrap();
        assert_eq!(c.endpoint(&["api", "v0", "org"]).unwrap().as_str(), "https://mackerel.example.com/api/v0/org");
    }

    #[test]
    fn path_segments_are_escaped() {
        let c = Client::new(StaticKey("k".into())).unwrap();
        let url = c.endpoint(&["api", "v0", "services", "a/b?c#d", "roles", "x y"]).unwrap();
        assert_eq!(url.path(), "/api/v0/services/a%2Fb%3Fc%23d/roles/x%20y");
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[test]
    fn opaque_base_url_is_rejected() {
        let c = Client::new(StaticKey("k".into())).unwrap().with_base_url("mailto:ops@example.com").unwrap();
        assert!(matches!(c.endpoint(&["api", "v0", "org"]), Err(ApiError::Url(_))));
    }

    #[test]
    fn empty_body_decodes_as_null() {
        let v: Value = decode(b"").unwrap();
        assert!(v.is_null());
        let u: () = decode(b"  ").unwrap();
        assert_eq!(u, ());
        let o: Org = decode(br#"{"name":"test-org"}"#).unwrap();
        assert_eq!(o.name, "test-org");
    }

    #[test]
    fn user_agent_names_the_bridge() {
        assert!(USER_AGENT.starts_with("cfn-mackerel-macro/"));
    }

    #[tokio::test]
    async fn cancelled_invocation_skips_the_request() {
        let c = Client::new(StaticKey("k".into())).unwrap().with_base_url("http://127.0.0.1:9/").unwrap();
        let inv = Invocation::new();
        inv.cancel();
        let err = c.get_org(&inv).await.unwrap_err();
        assert!(matches!(err, ApiError::Cancelled), "err={:?}", err);
    }
}
