use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use cfnmkr_core::Invocation;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::{AwsIntegration, CreateRoleParam, CreateServiceParam, Dashboard, Downtime, HostParam, Invitation, MackerelApi, Monitor, NotificationChannel, NotificationGroup, Org, Role, Service, User, UserAuthority};

/// One call received by [`MockMackerel`].
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub op: &'static str,
    pub args: Vec<String>,
    pub body: Option<Value>,
}

#[derive(Default)]
struct MockState {
    requests: Vec<Request>,
    failures: HashMap<&'static str, (u16, String)>,
    users: Vec<User>,
    invitations: Vec<Invitation>,
    next_id: u64,
}

/// Simple in-memory Mackerel for tests and dry runs.
///
/// Created entities get ids `id-1`, `id-2`, ...; every call is recorded, and
/// [`MockMackerel::fail_with`] makes an operation answer with an HTTP status.
pub struct MockMackerel {
    pub org: Org,
    state: Mutex<MockState>,
}

impl Default for MockMackerel {
    fn default() -> Self { Self::new("test-org") }
}

impl MockMackerel {
    pub fn new(org: &str) -> Self { Self { org: Org { name: org.to_string() }, state: Mutex::new(MockState::default()) } }

    fn lock(&self) -> MutexGuard<'_, MockState> { self.state.lock().unwrap_or_else(|e| e.into_inner()) }

    /// Make every later call of `op` fail with `status`.
    pub fn fail_with(&self, op: &'static str, status: u16) {
        self.lock().failures.insert(op, (status, format!("{} failed", op)));
    }

    pub fn clear_failures(&self) { self.lock().failures.clear(); }

    pub fn with_user(self, user: User) -> Self {
        self.lock().users.push(user);
        self
    }

    pub fn with_invitation(self, invitation: Invitation) -> Self {
        self.lock().invitations.push(invitation);
        self
    }

    pub fn requests(&self) -> Vec<Request> { self.lock().requests.clone() }

    pub fn requests_for(&self, op: &str) -> Vec<Request> { self.lock().requests.iter().filter(|r| r.op == op).cloned().collect() }

    pub fn last(&self, op: &str) -> Option<Request> { self.lock().requests.iter().rev().find(|r| r.op == op).cloned() }

    pub fn users(&self) -> Vec<User> { self.lock().users.clone() }

    pub fn invitations(&self) -> Vec<Invitation> { self.lock().invitations.clone() }

    fn record<B: Serialize + ?Sized>(&self, inv: &Invocation, op: &'static str, args: &[&str], body: Option<&B>) -> ApiResult<()> {
        if inv.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        let mut st = self.lock();
        let body = body.and_then(|b| serde_json::to_value(b).ok());
        st.requests.push(Request { op, args: args.iter().map(|s| s.to_string()).collect(), body });
        match st.failures.get(op) {
            Some((code, msg)) => Err(ApiError::status(*code, msg.clone())),
            None => Ok(()),
        }
    }

    fn next_id(&self) -> String {
        let mut st = self.lock();
        st.next_id += 1;
        format!("id-{}", st.next_id)
    }
}

const NO_BODY: Option<&Value> = None;

#[async_trait::async_trait]
impl MackerelApi for MockMackerel {
    async fn get_org(&self, inv: &Invocation) -> ApiResult<Org> {
        self.record(inv, "get_org", &[], NO_BODY)?;
        Ok(self.org.clone())
    }

    async fn create_service(&self, inv: &Invocation, param: &CreateServiceParam) -> ApiResult<Service> {
        self.record(inv, "create_service", &[], Some(param))?;
        Ok(Service { name: param.name.clone(), memo: param.memo.clone(), roles: Vec::new() })
    }

    async fn delete_service(&self, inv: &Invocation, service: &str) -> ApiResult<()> { self.record(inv, "delete_service", &[service], NO_BODY) }

    async fn create_role(&self, inv: &Invocation, service: &str, param: &CreateRoleParam) -> ApiResult<Role> {
        self.record(inv, "create_role", &[service], Some(param))?;
        Ok(Role { name: param.name.clone(), memo: param.memo.clone() })
    }

    async fn delete_role(&self, inv: &Invocation, service: &str, role: &str) -> ApiResult<()> { self.record(inv, "delete_role", &[service, role], NO_BODY) }

    async fn put_role_metadata(&self, inv: &Invocation, service: &str, role: &str, namespace: &str, metadata: &Value) -> ApiResult<()> {
        self.record(inv, "put_role_metadata", &[service, role, namespace], Some(metadata))
    }

    async fn create_host(&self, inv: &Invocation, param: &HostParam) -> ApiResult<String> {
        self.record(inv, "create_host", &[], Some(param))?;
        Ok(self.next_id())
    }

    async fn update_host(&self, inv: &Invocation, host_id: &str, param: &HostParam) -> ApiResult<String> {
        self.record(inv, "update_host", &[host_id], Some(param))?;
        Ok(host_id.to_string())
    }

    async fn retire_host(&self, inv: &Invocation, host_id: &str) -> ApiResult<()> { self.record(inv, "retire_host", &[host_id], NO_BODY) }

    async fn create_monitor(&self, inv: &Invocation, monitor: &Monitor) -> ApiResult<Monitor> {
        self.record(inv, "create_monitor", &[], Some(monitor))?;
        Ok(monitor.clone().with_id(self.next_id()))
    }

    async fn update_monitor(&self, inv: &Invocation, monitor_id: &str, monitor: &Monitor) -> ApiResult<Monitor> {
        self.record(inv, "update_monitor", &[monitor_id], Some(monitor))?;
        Ok(monitor.clone().with_id(monitor_id))
    }

    async fn delete_monitor(&self, inv: &Invocation, monitor_id: &str) -> ApiResult<()> { self.record(inv, "delete_monitor", &[monitor_id], NO_BODY) }

    async fn create_dashboard(&self, inv: &Invocation, dashboard: &Dashboard) -> ApiResult<Dashboard> {
        self.record(inv, "create_dashboard", &[], Some(dashboard))?;
        Ok(Dashboard { id: Some(self.next_id()), ..dashboard.clone() })
    }

    async fn update_dashboard(&self, inv: &Invocation, dashboard_id: &str, dashboard: &Dashboard) -> ApiResult<Dashboard> {
        self.record(inv, "update_dashboard", &[dashboard_id], Some(dashboard))?;
        Ok(Dashboard { id: Some(dashboard_id.to_string()), ..dashboard.clone() })
    }

    async fn delete_dashboard(&self, inv: &Invocation, dashboard_id: &str) -> ApiResult<()> { self.record(inv, "delete_dashboard", &[dashboard_id], NO_BODY) }

    async fn create_notification_channel(&self, inv: &Invocation, channel: &NotificationChannel) -> ApiResult<NotificationChannel> {
        self.record(inv, "create_notification_channel", &[], Some(channel))?;
        Ok(channel.clone().with_id(self.next_id()))
    }

    async fn delete_notification_channel(&self, inv: &Invocation, channel_id: &str) -> ApiResult<()> {
        self.record(inv, "delete_notification_channel", &[channel_id], NO_BODY)
    }

    async fn create_notification_group(&self, inv: &Invocation, group: &NotificationGroup) -> ApiResult<NotificationGroup> {
        self.record(inv, "create_notification_group", &[], Some(group))?;
        Ok(NotificationGroup { id: Some(self.next_id()), ..group.clone() })
    }

    async fn update_notification_group(&self, inv: &Invocation, group_id: &str, group: &NotificationGroup) -> ApiResult<NotificationGroup> {
        self.record(inv, "update_notification_group", &[group_id], Some(group))?;
        Ok(NotificationGroup { id: Some(group_id.to_string()), ..group.clone() })
    }

    async fn delete_notification_group(&self, inv: &Invocation, group_id: &str) -> ApiResult<()> {
        self.record(inv, "delete_notification_group", &[group_id], NO_BODY)
    }

    async fn find_users(&self, inv: &Invocation) -> ApiResult<Vec<User>> {
        self.record(inv, "find_users", &[], NO_BODY)?;
        Ok(self.users())
    }

    async fn delete_user(&self, inv: &Invocation, user_id: &str) -> ApiResult<()> {
        self.record(inv, "delete_user", &[user_id], NO_BODY)?;
        let mut st = self.lock();
        let before = st.users.len();
        st.users.retain(|u| u.id != user_id);
        if st.users.len() == before {
            return Err(ApiError::status(404, "User not found"));
        }
        Ok(())
    }

    async fn find_invitations(&self, inv: &Invocation) -> ApiResult<Vec<Invitation>> {
        self.record(inv, "find_invitations", &[], NO_BODY)?;
        Ok(self.invitations())
    }

    async fn create_invitation(&self, inv: &Invocation, email: &str, authority: UserAuthority) -> ApiResult<Invitation> {
        self.record(inv, "create_invitation", &[email], Some(&serde_json::json!({"email": email, "authority": authority})))?;
        let invitation = Invitation { email: email.to_string(), authority, expires_at: 0 };
        self.lock().invitations.push(invitation.clone());
        Ok(invitation)
    }

    async fn revoke_invitation(&self, inv: &Invocation, email: &str) -> ApiResult<()> {
        self.record(inv, "revoke_invitation", &[email], NO_BODY)?;
        let mut st = self.lock();
        let before = st.invitations.len();
        st.invitations.retain(|i| i.email != email);
        if st.invitations.len() == before {
            return Err(ApiError::status(404, "Invitation not found"));
        }
        Ok(())
    }

    async fn create_downtime(&self, inv: &Invocation, downtime: &Downtime) -> ApiResult<Downtime> {
        self.record(inv, "create_downtime", &[], Some(downtime))?;
        Ok(Downtime { id: Some(self.next_id()), ..downtime.clone() })
    }

    async fn update_downtime(&self, inv: &Invocation, downtime_id: &str, downtime: &Downtime) -> ApiResult<Downtime> {
        self.record(inv, "update_downtime", &[downtime_id], Some(downtime))?;
        Ok(Downtime { id: Some(downtime_id.to_string()), ..downtime.clone() })
    }

    async fn delete_downtime(&self, inv: &Invocation, downtime_id: &str) -> ApiResult<()> { self.record(inv, "delete_downtime", &[downtime_id], NO_BODY) }

    async fn create_aws_integration(&self, inv: &Invocation, integration: &AwsIntegration) -> ApiResult<AwsIntegration> {
        self.record(inv, "create_aws_integration", &[], Some(integration))?;
        Ok(AwsIntegration { id: Some(self.next_id()), ..integration.clone() })
    }

    async fn update_aws_integration(&self, inv: &Invocation, integration_id: &str, integration: &AwsIntegration) -> ApiResult<AwsIntegration> {
        self.record(inv, "update_aws_integration", &[integration_id], Some(integration))?;
        Ok(AwsIntegration { id: Some(integration_id.to_string()), ..integration.clone() })
    }

    async fn delete_aws_integration(&self, inv: &Invocation, integration_id: &str) -> ApiResult<()> {
        self.record(inv, "delete_aws_integration", &[integration_id], NO_BODY)
    }

    async fn create_aws_integration_external_id(&self, inv: &Invocation) -> ApiResult<String> {
        self.record(inv, "create_aws_integration_external_id", &[], NO_BODY)?;
        Ok(format!("external-{}", self.next_id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_and_fails_on_demand() {
        let m = MockMackerel::new("test-org");
        let inv = Invocation::new();
        assert_eq!(m.get_org(&inv).await.unwrap().name, "test-org");
        m.fail_with("delete_monitor", 404);
        let err = m.delete_monitor(&inv, "abc").await.unwrap_err();
        assert!(err.is_not_found());
        let r = m.last("delete_monitor").unwrap();
        assert_eq!(r.args, vec!["abc".to_string()]);
        assert_eq!(m.requests().len(), 2);
    }

    #[tokio::test]
    async fn invitations_and_users_are_stateful() {
        let m = MockMackerel::default().with_user(User { id: "u1".into(), email: "a@example.com".into(), ..Default::default() });
        let inv = Invocation::new();
        m.create_invitation(&inv, "b@example.com", UserAuthority::Viewer).await.unwrap();
        assert_eq!(m.find_invitations(&inv).await.unwrap().len(), 1);
        m.revoke_invitation(&inv, "b@example.com").await.unwrap();
        assert!(m.revoke_invitation(&inv, "b@example.com").await.unwrap_err().is_not_found());
        m.delete_user(&inv, "u1").await.unwrap();
        assert!(m.users().is_empty());
    }

    #[tokio::test]
    async fn cancelled_calls_are_not_recorded() {
        let m = MockMackerel::default();
        let inv = Invocation::new();
        inv.cancel();
        assert!(matches!(m.get_org(&inv).await, Err(ApiError::Cancelled)));
        assert!(m.requests().is_empty());
    }
}
