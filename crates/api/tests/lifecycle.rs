#![forbid(unsafe_code)]

use std::sync::Arc;

use cfnmkr_api::Function;
use cfnmkr_core::{Event, Invocation, RequestType};
use cfnmkr_mackerel::{ApiError, Invitation, MockMackerel, User};
use serde_json::{json, Value};

fn function(mock: MockMackerel) -> (Arc<MockMackerel>, Function) {
    let mock = Arc::new(mock);
    (mock.clone(), Function::with_client(mock))
}

fn event(rt: RequestType, kind: &str, id: &str, props: Value) -> Event {
    let mut e = Event::new(rt, format!("Custom::{}", kind), props);
    e.request_id = "req-9".into();
    e.physical_resource_id = id.into();
    e
}

#[tokio::test]
async fn delete_tolerates_missing_and_foreign() {
    let (mock, f) = function(MockMackerel::new("test-org"));
    mock.fail_with("delete_monitor", 404);
    let gone = event(RequestType::Delete, "Monitor", "mkr:test-org:monitor:m1", json!({}));
    let r = f.handle(&Invocation::new(), &gone).await;
    assert!(r.is_ok(), "{:?}", r.error);
    assert_eq!(r.physical_resource_id, "mkr:test-org:monitor:m1");

    for id in ["mkr:other-org:monitor:m2", "i-0123456789", "mkr:test-org:dashboard:d1"] {
        let r = f.handle(&Invocation::new(), &event(RequestType::Delete, "Monitor", id, json!({}))).await;
        assert!(r.is_ok(), "{}: {:?}", id, r.error);
        assert_eq!(r.physical_resource_id, id);
    }
    assert_eq!(mock.requests_for("delete_monitor").len(), 1);
}

#[tokio::test]
async fn delete_surfaces_other_failures() {
    let (mock, f) = function(MockMackerel::new("test-org"));
    mock.fail_with("delete_service", 500);
    let e = event(RequestType::Delete, "Service", "mkr:test-org:service:web", json!({}));
    let r = f.handle(&Invocation::new(), &e).await;
    assert!(!r.is_ok());
    assert_eq!(r.physical_resource_id, "mkr:test-org:service:web");
    assert_eq!(r.response(&e).reason, "status: 500, delete_service failed");
}

#[tokio::test]
async fn role_conflict_is_adopted() {
    let (mock, f) = function(MockMackerel::new("test-org"));
    mock.fail_with("create_role", 400);
    let props = json!({"Name": "app", "Service": "mkr:test-org:service:web"});
    let r = f.handle(&Invocation::new(), &event(RequestType::Create, "Role", "", props.clone())).await;
    assert!(r.is_ok(), "{:?}", r.error);
    assert_eq!(r.physical_resource_id, "mkr:test-org:role:web:app");
    assert_eq!(mock.requests_for("put_role_metadata").len(), 1);

    mock.fail_with("put_role_metadata", 403);
    let r = f.handle(&Invocation::new(), &event(RequestType::Create, "Role", "", props)).await;
    let err = r.error.expect("error");
    assert_eq!(format!("{:#}", err), "failed to create role: status: 400, create_role failed");
    assert_eq!(r.physical_resource_id, "mkr::error:req-9");
}

#[tokio::test]
async fn role_with_bad_service_id() {
    let (mock, f) = function(MockMackerel::new("test-org"));
    let r = f.handle(&Invocation::new(), &event(RequestType::Create, "Role", "", json!({"Name": "app", "Service": "web"}))).await;
    let err = r.error.expect("error");
    assert!(format!("{:#}", err).starts_with("failed to parse \"web\" as service id"), "{:#}", err);
    assert!(mock.requests_for("create_role").is_empty());
}

#[tokio::test]
async fn user_invite_paths() {
    let (mock, f) = function(MockMackerel::new("test-org"));
    let r = f.handle(&Invocation::new(), &event(RequestType::Create, "User", "", json!({"Email": "new@example.com", "Authority": "manager"}))).await;
    assert!(r.is_ok(), "{:?}", r.error);
    assert_eq!(mock.last("create_invitation").unwrap().body.unwrap()["authority"], "manager");

    // Already invited.
    mock.fail_with("create_invitation", 400);
    let r = f.handle(&Invocation::new(), &event(RequestType::Create, "User", "", json!({"Email": "new@example.com"}))).await;
    assert!(r.is_ok(), "{:?}", r.error);
    assert!(mock.requests_for("find_users").is_empty());

    // Neither invited nor a member.
    let r = f.handle(&Invocation::new(), &event(RequestType::Create, "User", "", json!({"Email": "nobody@example.com"}))).await;
    assert_eq!(r.error.expect("error").to_string(), "fail to invite nobody@example.com");
    assert_eq!(r.physical_resource_id, "mkr::error:req-9");
}

#[tokio::test]
async fn user_authority_is_validated() {
    let (mock, f) = function(MockMackerel::new("test-org"));
    let r = f.handle(&Invocation::new(), &event(RequestType::Create, "User", "", json!({"Email": "a@example.com", "Authority": "root"}))).await;
    assert!(!r.is_ok());
    assert!(mock.requests_for("create_invitation").is_empty());
}

#[tokio::test]
async fn user_delete_revokes_and_removes() {
    let mock = MockMackerel::new("test-org")
        .with_invitation(Invitation { email: "a@example.com".into(), ..Default::default() })
        .with_user(User { id: "u1".into(), email: "a@example.com".into(), ..Default::default() });
    let (mock, f) = function(mock);
    let e = event(RequestType::Delete, "User", "mkr:test-org:user:a@example.com", json!({}));
    let r = f.handle(&Invocation::new(), &e).await;
    assert!(r.is_ok(), "{:?}", r.error);
    assert!(mock.invitations().is_empty());
    assert!(mock.users().is_empty());

    // Second delete finds nothing and still succeeds.
    let r = f.handle(&Invocation::new(), &e).await;
    assert!(r.is_ok(), "{:?}", r.error);
    assert_eq!(mock.requests_for("delete_user").len(), 1);
}

#[tokio::test]
async fn property_errors_are_reported_together() {
    let (mock, f) = function(MockMackerel::new("test-org"));
    let e = event(RequestType::Create, "Monitor", "", json!({"Type": "host", "Duration": "soon", "Scopes": ["mkr:test-org:monitor:m1"]}));
    let r = f.handle(&Invocation::new(), &e).await;
    let reason = r.response(&e).reason;
    for part in ["not found: .Name", "not found: .Metric", "not found: .Operator", ".Duration", "scopes should be a service or a role"] {
        assert!(reason.contains(part), "missing {:?} in {:?}", part, reason);
    }
    assert_eq!(reason.matches("; ").count(), 4, "{}", reason);
    assert!(mock.requests_for("create_monitor").is_empty());
}

#[tokio::test]
async fn unknown_monitor_type() {
    let (_, f) = function(MockMackerel::new("test-org"));
    let r = f.handle(&Invocation::new(), &event(RequestType::Create, "Monitor", "", json!({"Type": "magic", "Name": "m"}))).await;
    assert_eq!(r.error.expect("error").to_string(), "unknown monitor type: magic");
}

#[tokio::test]
async fn cancelled_invocation_aborts() {
    let (mock, f) = function(MockMackerel::new("test-org"));
    let inv = Invocation::new();
    inv.cancel();
    let r = f.handle(&inv, &event(RequestType::Create, "Service", "", json!({"Name": "web"}))).await;
    let err = r.error.expect("error");
    assert!(err.chain().any(|e| matches!(e.downcast_ref::<ApiError>(), Some(ApiError::Cancelled))), "{:#}", err);
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn external_id_lifecycle() {
    let (mock, f) = function(MockMackerel::new("test-org"));
    let r = f.handle(&Invocation::new(), &event(RequestType::Create, "AWSIntegrationExternalId", "", json!({}))).await;
    assert!(r.is_ok(), "{:?}", r.error);
    assert_eq!(r.physical_resource_id, "mkr:test-org:aws-integration-external-id:external-id-1");
    assert_eq!(r.data.get("Id"), Some(&json!("external-id-1")));

    let mut same = event(RequestType::Update, "AWSIntegrationExternalId", &r.physical_resource_id, json!({}));
    same.old_resource_properties = json!({});
    let u = f.handle(&Invocation::new(), &same).await;
    assert_eq!(u.physical_resource_id, r.physical_resource_id);
    assert_eq!(u.data.get("Id"), Some(&json!("external-id-1")));

    let mut changed = event(RequestType::Update, "AWSIntegrationExternalId", &r.physical_resource_id, json!({"Rotate": "1"}));
    changed.old_resource_properties = json!({});
    let u = f.handle(&Invocation::new(), &changed).await;
    assert_eq!(u.physical_resource_id, "mkr:test-org:aws-integration-external-id:external-id-2");

    let d = f.handle(&Invocation::new(), &event(RequestType::Delete, "AWSIntegrationExternalId", &r.physical_resource_id, json!({}))).await;
    assert!(d.is_ok());
    assert_eq!(mock.requests_for("create_aws_integration_external_id").len(), 2);
}

#[tokio::test]
async fn update_in_place_keeps_the_id() {
    let (mock, f) = function(MockMackerel::new("test-org"));
    let mut e = event(
        RequestType::Update,
        "Downtime",
        "mkr:test-org:downtime:dt1",
        json!({"Name": "window", "Start": 1700000000, "Duration": 60, "ServiceScopes": ["mkr:test-org:service:web"]}),
    );
    e.old_resource_properties = json!({"Name": "old", "Start": 1700000000, "Duration": 30});
    let r = f.handle(&Invocation::new(), &e).await;
    assert!(r.is_ok(), "{:?}", r.error);
    assert_eq!(r.physical_resource_id, "mkr:test-org:downtime:dt1");
    assert_eq!(r.data.get("Name"), Some(&json!("window")));
    let req = mock.last("update_downtime").unwrap();
    assert_eq!(req.args, vec!["dt1".to_string()]);
    assert_eq!(req.body.unwrap()["serviceScopes"], json!(["web"]));
}

#[tokio::test]
async fn deletes_tolerate_missing_and_foreign_ids() {
    let cases = [
        ("Downtime", "downtime", "delete_downtime"),
        ("AWSIntegration", "aws-integration", "delete_aws_integration"),
        ("Dashboard", "dashboard", "delete_dashboard"),
        ("NotificationChannel", "notification-channel", "delete_notification_channel"),
        ("NotificationGroup", "notification-group", "delete_notification_group"),
    ];
    for (kind, tag, op) in cases {
        let (mock, f) = function(MockMackerel::new("test-org"));
        let id = format!("mkr:test-org:{}:x1", tag);
        let r = f.handle(&Invocation::new(), &event(RequestType::Delete, kind, &id, json!({}))).await;
        assert!(r.is_ok(), "{}: {:?}", kind, r.error);
        assert_eq!(r.physical_resource_id, id);
        assert_eq!(mock.last(op).map(|req| req.args), Some(vec!["x1".to_string()]), "{}", kind);

        mock.fail_with(op, 404);
        let r = f.handle(&Invocation::new(), &event(RequestType::Delete, kind, &id, json!({}))).await;
        assert!(r.is_ok(), "{}: {:?}", kind, r.error);
        assert_eq!(r.physical_resource_id, id);
        assert_eq!(mock.requests_for(op).len(), 2, "{}", kind);

        let foreign = format!("mkr:other-org:{}:x2", tag);
        let r = f.handle(&Invocation::new(), &event(RequestType::Delete, kind, &foreign, json!({}))).await;
        assert!(r.is_ok(), "{}: {:?}", kind, r.error);
        assert_eq!(r.physical_resource_id, foreign);
        assert_eq!(mock.requests_for(op).len(), 2, "{}", kind);
    }
}

#[tokio::test]
async fn service_rename_replaces() {
    let (mock, f) = function(MockMackerel::new("test-org"));
    let mut e = event(RequestType::Update, "Service", "mkr:test-org:service:web", json!({"Name": "api"}));
    e.old_resource_properties = json!({"Name": "web"});
    let r = f.handle(&Invocation::new(), &e).await;
    assert!(r.is_ok(), "{:?}", r.error);
    assert_eq!(r.physical_resource_id, "mkr:test-org:service:api");
    assert_eq!(mock.requests_for("create_service").len(), 1);
    assert!(mock.requests_for("delete_service").is_empty());
}

#[tokio::test]
async fn service_memo_change_keeps_the_id() {
    let (mock, f) = function(MockMackerel::new("test-org"));
    let mut e = event(RequestType::Update, "Service", "mkr:test-org:service:web", json!({"Name": "web", "Memo": "new"}));
    e.old_resource_properties = json!({"Name": "web", "Memo": "old"});
    let r = f.handle(&Invocation::new(), &e).await;
    assert!(r.is_ok(), "{:?}", r.error);
    assert_eq!(r.physical_resource_id, "mkr:test-org:service:web");
    assert_eq!(r.data.get("Memo"), Some(&json!("new")));
    assert!(mock.requests_for("create_service").is_empty());
}

#[tokio::test]
async fn role_name_or_service_change_replaces() {
    let (mock, f) = function(MockMackerel::new("test-org"));
    let old = json!({"Name": "app", "Service": "mkr:test-org:service:web"});

    let mut renamed = event(RequestType::Update, "Role", "mkr:test-org:role:web:app", json!({"Name": "worker", "Service": "mkr:test-org:service:web"}));
    renamed.old_resource_properties = old.clone();
    let r = f.handle(&Invocation::new(), &renamed).await;
    assert!(r.is_ok(), "{:?}", r.error);
    assert_eq!(r.physical_resource_id, "mkr:test-org:role:web:worker");

    let mut moved = event(RequestType::Update, "Role", "mkr:test-org:role:web:app", json!({"Name": "app", "Service": "mkr:test-org:service:api"}));
    moved.old_resource_properties = old;
    let r = f.handle(&Invocation::new(), &moved).await;
    assert!(r.is_ok(), "{:?}", r.error);
    assert_eq!(r.physical_resource_id, "mkr:test-org:role:api:app");

    let calls: Vec<Vec<String>> = mock.requests_for("create_role").into_iter().map(|req| req.args).collect();
    assert_eq!(calls, vec![vec!["web".to_string()], vec!["api".to_string()]]);
    assert!(mock.requests_for("delete_role").is_empty());
}

#[tokio::test]
async fn user_email_change_invites_again() {
    let (mock, f) = function(MockMackerel::new("test-org"));
    let mut e = event(RequestType::Update, "User", "mkr:test-org:user:old@example.com", json!({"Email": "new@example.com"}));
    e.old_resource_properties = json!({"Email": "old@example.com"});
    let r = f.handle(&Invocation::new(), &e).await;
    assert!(r.is_ok(), "{:?}", r.error);
    assert_eq!(r.physical_resource_id, "mkr:test-org:user:new@example.com");
    let invites = mock.requests_for("create_invitation");
    assert_eq!(invites.len(), 1);
    assert_eq!(invites[0].body.as_ref().unwrap()["email"], "new@example.com");
}
