//! CloudFormation custom resource handler for Mackerel.
//!
//! [`Function`] takes one `Custom::<Kind>` lifecycle event, runs the matching
//! adapter against the Mackerel API and returns the physical id and outputs to
//! report back. The client and the organization are resolved once per handler.

#![forbid(unsafe_code)]

mod error;
mod resources;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use cfnmkr_core::{Event, Invocation, Outputs, RequestType, Response};
use cfnmkr_mackerel::{Client, MackerelApi, Org};
use metrics::{counter, histogram};
use tokio::sync::Mutex;
use tracing::{info, warn};

pub use error::ResourceError;
pub use resources::Kind;

/// Time kept back from the invocation deadline to deliver the response.
pub const DEADLINE_MARGIN: Duration = Duration::from_millis(100);

/// Result of handling one event.
#[derive(Debug)]
pub struct HandlerResult {
    pub physical_resource_id: String,
    pub data: Outputs,
    pub error: Option<anyhow::Error>,
}

impl HandlerResult {
    pub fn is_ok(&self) -> bool { self.error.is_none() }

    /// Response document for `event`.
    pub fn response(&self, event: &Event) -> Response {
        match &self.error {
            None => Response::success(event, self.physical_resource_id.clone(), self.data.clone()),
            Some(e) => Response::failure(event, self.physical_resource_id.clone(), format!("{:#}", e)),
        }
    }
}

#[derive(Default)]
struct State {
    client: Option<Arc<dyn MackerelApi>>,
    org: Option<Org>,
}

/// Long-lived handler; caches the API client and the organization.
pub struct Function {
    state: Mutex<State>,
}

impl Default for Function {
    fn default() -> Self { Self::new() }
}

impl Function {
    /// Handler whose client is built from the environment on first use.
    pub fn new() -> Self { Self { state: Mutex::new(State::default()) } }

    pub fn with_client(client: Arc<dyn MackerelApi>) -> Self {
        Self { state: Mutex::new(State { client: Some(client), org: None }) }
    }

    pub(crate) async fn client(&self) -> Result<Arc<dyn MackerelApi>> {
        let mut st = self.state.lock().await;
        client_locked(&mut st)
    }

    /// Organization of the API key; the first caller fetches it under the lock.
    pub(crate) async fn org(&self, inv: &Invocation) -> Result<Org> {
        let mut st = self.state.lock().await;
        if let Some(org) = &st.org {
            return Ok(org.clone());
        }
        let client = client_locked(&mut st)?;
        let t0 = Instant::now();
        let org = client.get_org(inv).await.context("fetch organization")?;
        info!(org = %org.name, took_ms = %t0.elapsed().as_millis(), "handle: org resolved");
        st.org = Some(org.clone());
        Ok(org)
    }

    /// Handle one event. Failures are reported in the result, never panicked.
    ///
    /// On failure the id is the incoming one for Update and Delete and empty for
    /// Create. An empty id, whether from a failed dispatch (an unknown resource
    /// type included) or from a handler, is replaced by `mkr::error:<RequestId>`.
    pub async fn handle(&self, inv: &Invocation, event: &Event) -> HandlerResult {
        let kind = event.kind();
        if event.is_failed_create() {
            info!(kind = %kind, request = %event.request_type, id = %event.physical_resource_id, "handle: failed create, nothing to do");
            return HandlerResult { physical_resource_id: event.physical_resource_id.clone(), data: Outputs::new(), error: None };
        }

        let t0 = Instant::now();
        let inv = inv.shortened(DEADLINE_MARGIN);
        counter!("handle_total", 1u64, "kind" => kind.to_string(), "request" => event.request_type.as_str());
        info!(kind = %kind, request = %event.request_type, logical_id = %event.logical_resource_id, id = %event.physical_resource_id, "handle: start");
        let res = resources::dispatch(self, &inv, event).await;
        histogram!("handle_latency_ms", t0.elapsed().as_secs_f64() * 1000.0, "kind" => kind.to_string());

        match res {
            Ok((id, data)) => {
                info!(kind = %kind, request = %event.request_type, id = %id, took_ms = %t0.elapsed().as_millis(), "handle: ok");
                let physical_resource_id = if id.is_empty() { event.error_id() } else { id };
                HandlerResult { physical_resource_id, data, error: None }
            }
            Err(e) => {
                counter!("handle_err", 1u64, "kind" => kind.to_string(), "request" => event.request_type.as_str());
                warn!(kind = %kind, request = %event.request_type, error = %format!("{:#}", e), took_ms = %t0.elapsed().as_millis(), "handle: failed");
                let id = match event.request_type {
                    RequestType::Create => String::new(),
                    RequestType::Update | RequestType::Delete => event.physical_resource_id.clone(),
                };
                let physical_resource_id = if id.is_empty() { event.error_id() } else { id };
                HandlerResult { physical_resource_id, data: Outputs::new(), error: Some(e) }
            }
        }
    }
}

fn client_locked(st: &mut State) -> Result<Arc<dyn MackerelApi>> {
    if let Some(c) = &st.client {
        return Ok(c.clone());
    }
    let c: Arc<dyn MackerelApi> = Arc::new(Client::from_env().context("build mackerel client")?);
    st.client = Some(c.clone());
    Ok(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfnmkr_mackerel::MockMackerel;
    use serde_json::json;

    fn function() -> (Arc<MockMackerel>, Function) {
        let mock = Arc::new(MockMackerel::new("test-org"));
        let f = Function::with_client(mock.clone());
        (mock, f)
    }

    fn event(rt: RequestType, kind: &str, props: serde_json::Value) -> Event {
        let mut e = Event::new(rt, format!("Custom::{}", kind), props);
        e.request_id = "req-1".into();
        e
    }

    #[tokio::test]
    async fn org_is_fetched_once() {
        let (mock, f) = function();
        let inv = Invocation::new();
        for _ in 0..3 {
            let r = f.handle(&inv, &event(RequestType::Create, "Service", json!({"Name": "web"}))).await;
            assert!(r.is_ok(), "{:?}", r.error);
        }
        assert_eq!(mock.requests_for("get_org").len(), 1);
        assert_eq!(mock.requests_for("create_service").len(), 3);
    }

    #[tokio::test]
    async fn failed_create_ids_short_circuit() {
        let (mock, f) = function();
        for rt in [RequestType::Update, RequestType::Delete] {
            let mut e = event(rt, "Monitor", json!({}));
            e.physical_resource_id = "mkr::error:req-0".into();
            let r = f.handle(&Invocation::new(), &e).await;
            assert!(r.is_ok());
            assert_eq!(r.physical_resource_id, "mkr::error:req-0");
            assert!(r.data.is_empty());
        }
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn unknown_kind_fails_without_remote_calls() {
        let (mock, f) = function();
        let r = f.handle(&Invocation::new(), &event(RequestType::Create, "Nope", json!({}))).await;
        let err = r.error.as_ref().expect("error");
        assert_eq!(err.to_string(), "unknown resource type: Custom::Nope");
        assert_eq!(r.physical_resource_id, "mkr::error:req-1");
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn unknown_kind_keeps_or_replaces_the_id() {
        let (mock, f) = function();
        let mut e = event(RequestType::Delete, "Nope", json!({}));
        e.physical_resource_id = "mkr:test-org:service:web".into();
        let r = f.handle(&Invocation::new(), &e).await;
        assert!(!r.is_ok());
        assert_eq!(r.physical_resource_id, "mkr:test-org:service:web");

        e.physical_resource_id = String::new();
        let r = f.handle(&Invocation::new(), &e).await;
        assert!(!r.is_ok());
        assert_eq!(r.physical_resource_id, "mkr::error:req-1");
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn failures_echo_the_incoming_id() {
        let (mock, f) = function();
        mock.fail_with("update_monitor", 500);
        let mut e = event(RequestType::Update, "Monitor", json!({"Type": "expression", "Name": "m", "Expression": "max(x)", "Operator": ">"}));
        e.physical_resource_id = "mkr:test-org:monitor:abc".into();
        e.old_resource_properties = json!({"Type": "expression"});
        let r = f.handle(&Invocation::new(), &e).await;
        assert!(!r.is_ok());
        assert_eq!(r.physical_resource_id, "mkr:test-org:monitor:abc");
        let resp = r.response(&e);
        assert_eq!(resp.status, cfnmkr_core::Status::Failed);
        assert_eq!(resp.reason, "status: 500, update_monitor failed");
    }
}
