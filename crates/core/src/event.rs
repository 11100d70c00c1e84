use cfnmkr_proxy::Proxy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Values surfaced back to the stack as `Fn::GetAtt` attributes.
pub type Outputs = serde_json::Map<String, Value>;

/// Prefix of custom resource types handled by this bridge.
pub const RESOURCE_TYPE_PREFIX: &str = "Custom::";

/// Physical ids starting with this prefix mark a resource whose Create failed.
pub const ERROR_ID_PREFIX: &str = "mkr::error:";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

impl RequestType {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestType::Create => "Create",
            RequestType::Update => "Update",
            RequestType::Delete => "Delete",
        }
    }
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

/// A custom resource lifecycle request as delivered by CloudFormation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Event {
    pub request_type: RequestType,
    #[serde(default)]
    pub request_id: String,
    #[serde(rename = "ResponseURL", default)]
    pub response_url: String,
    pub resource_type: String,
    #[serde(default)]
    pub logical_resource_id: String,
    #[serde(default)]
    pub stack_id: String,
    #[serde(default)]
    pub physical_resource_id: String,
    #[serde(default = "empty_properties")]
    pub resource_properties: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub old_resource_properties: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_token: Option<String>,
}

fn empty_properties() -> Value { Value::Object(Default::default()) }

impl Event {
    pub fn new(request_type: RequestType, resource_type: impl Into<String>, properties: Value) -> Self {
        Self {
            request_type,
            request_id: String::new(),
            response_url: String::new(),
            resource_type: resource_type.into(),
            logical_resource_id: String::new(),
            stack_id: String::new(),
            physical_resource_id: String::new(),
            resource_properties: properties,
            old_resource_properties: Value::Null,
            service_token: None,
        }
    }

    /// Resource kind with the `Custom::` prefix removed.
    pub fn kind(&self) -> &str {
        self.resource_type.strip_prefix(RESOURCE_TYPE_PREFIX).unwrap_or(&self.resource_type)
    }

    pub fn properties(&self) -> Proxy<'_> { Proxy::new(&self.resource_properties) }

    pub fn old_properties(&self) -> Proxy<'_> { Proxy::new(&self.old_resource_properties) }

    /// True when the physical id was minted for a failed Create.
    pub fn is_failed_create(&self) -> bool { self.physical_resource_id.starts_with(ERROR_ID_PREFIX) }

    pub fn error_id(&self) -> String { format!("{}{}", ERROR_ID_PREFIX, self.request_id) }

    pub fn metadata(&self) -> StackMetadata { StackMetadata::from_event(self) }
}

/// Provenance recorded on remote entities created for a stack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StackMetadata {
    pub stack_name: String,
    pub stack_id: String,
    pub logical_id: String,
}

impl StackMetadata {
    pub fn from_event(e: &Event) -> Self {
        Self { stack_name: stack_name(&e.stack_id).to_string(), stack_id: e.stack_id.clone(), logical_id: e.logical_resource_id.clone() }
    }
}

/// Stack name from `arn:aws:cloudformation:<region>:<account>:stack/<name>/<uuid>`.
pub fn stack_name(stack_id: &str) -> &str {
    let mut name = stack_id;
    if let Some(idx) = name.rfind(':') {
        name = &name[idx..];
        name = name.strip_prefix(":stack/").unwrap_or(name);
    }
    if let Some(idx) = name.rfind('/') {
        name = &name[..idx];
    }
    name
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Success,
    Failed,
}

/// Response document for a custom resource request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Response {
    pub status: Status,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    #[serde(default, skip_serializing_if = "Outputs::is_empty")]
    pub data: Outputs,
    #[serde(default, skip_serializing_if = "is_false")]
    pub no_echo: bool,
}

fn is_false(b: &bool) -> bool { !*b }

impl Response {
    pub fn success(event: &Event, physical_resource_id: String, data: Outputs) -> Self {
        Self {
            status: Status::Success,
            reason: String::new(),
            physical_resource_id,
            stack_id: event.stack_id.clone(),
            request_id: event.request_id.clone(),
            logical_resource_id: event.logical_resource_id.clone(),
            data,
            no_echo: false,
        }
    }

    pub fn failure(event: &Event, physical_resource_id: String, reason: impl Into<String>) -> Self {
        Self { status: Status::Failed, reason: reason.into(), ..Self::success(event, physical_resource_id, Outputs::new()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const STACK: &str = "arn:aws:cloudformation:ap-northeast-1:1234567890:stack/foobar/12345678-1234-1234-1234-123456789abc";

    #[test]
    fn decodes_cloudformation_request() {
        let raw = json!({
            "RequestType": "Update",
            "RequestId": "req-1",
            "ResponseURL": "https://example.com/response",
            "ResourceType": "Custom::Monitor",
            "LogicalResourceId": "Monitor",
            "StackId": STACK,
            "PhysicalResourceId": "mkr:test-org:monitor:abc",
            "ResourceProperties": {"ServiceToken": "arn:aws:lambda:x", "Type": "host"},
            "OldResourceProperties": {"Type": "connectivity"}
        });
        let e: Event = serde_json::from_value(raw).expect("decode");
        assert_eq!(e.request_type, RequestType::Update);
        assert_eq!(e.kind(), "Monitor");
        assert_eq!(e.response_url, "https://example.com/response");
        assert_eq!(e.properties().m("Type").string(), Ok("host".to_string()));
        assert_eq!(e.old_properties().m("Type").string(), Ok("connectivity".to_string()));
    }

    #[test]
    fn create_without_properties_gets_empty_map() {
        let e: Event = serde_json::from_value(json!({"RequestType": "Create", "ResourceType": "Custom::Org"})).expect("decode");
        assert!(e.properties().map().map(|m| m.is_empty()).unwrap_or(false));
        assert!(e.old_properties().is_nil());
    }

    #[test]
    fn stack_metadata_from_arn() {
        let mut e = Event::new(RequestType::Create, "Custom::Role", json!({}));
        e.stack_id = STACK.to_string();
        e.logical_resource_id = "Role".to_string();
        let m = e.metadata();
        assert_eq!(m.stack_name, "foobar");
        assert_eq!(m.logical_id, "Role");
        assert_eq!(serde_json::to_value(&m).expect("json")["stack_name"], "foobar");
        assert_eq!(stack_name("plain"), "plain");
    }

    #[test]
    fn failed_create_marker() {
        let mut e = Event::new(RequestType::Delete, "Custom::Host", json!({}));
        e.request_id = "r1".into();
        assert_eq!(e.error_id(), "mkr::error:r1");
        e.physical_resource_id = e.error_id();
        assert!(e.is_failed_create());
    }

    #[test]
    fn response_document_shape() {
        let e = Event::new(RequestType::Create, "Custom::Org", json!({}));
        let mut data = Outputs::new();
        data.insert("Name".into(), json!("test-org"));
        let ok = serde_json::to_value(Response::success(&e, "mkr:test-org".into(), data)).expect("json");
        assert_eq!(ok["Status"], "SUCCESS");
        assert_eq!(ok["Data"]["Name"], "test-org");
        assert!(ok.get("NoEcho").is_none());
        let failed = serde_json::to_value(Response::failure(&e, "mkr::error:".into(), "boom")).expect("json");
        assert_eq!(failed["Status"], "FAILED");
        assert_eq!(failed["Reason"], "boom");
    }
}
