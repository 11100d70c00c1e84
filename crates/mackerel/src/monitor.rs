//! Monitors, discriminated by `type`.

use serde::{Deserialize, Serialize};

fn is_false(b: &bool) -> bool { !*b }
fn is_zero(n: &u64) -> bool { *n == 0 }

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Monitor {
    Connectivity(ConnectivityMonitor),
    Host(HostMetricMonitor),
    Service(ServiceMetricMonitor),
    External(ExternalMonitor),
    Expression(ExpressionMonitor),
    AnomalyDetection(AnomalyDetectionMonitor),
}

impl Monitor {
    pub fn type_name(&self) -> &'static str {
        match self {
            Monitor::Connectivity(_) => "connectivity",
            Monitor::Host(_) => "host",
            Monitor::Service(_) => "service",
            Monitor::External(_) => "external",
            Monitor::Expression(_) => "expression",
            Monitor::AnomalyDetection(_) => "anomalyDetection",
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Monitor::Connectivity(m) => m.id.as_deref(),
            Monitor::Host(m) => m.id.as_deref(),
            Monitor::Service(m) => m.id.as_deref(),
            Monitor::External(m) => m.id.as_deref(),
            Monitor::Expression(m) => m.id.as_deref(),
            Monitor::AnomalyDetection(m) => m.id.as_deref(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Monitor::Connectivity(m) => &m.name,
            Monitor::Host(m) => &m.name,
            Monitor::Service(m) => &m.name,
            Monitor::External(m) => &m.name,
            Monitor::Expression(m) => &m.name,
            Monitor::AnomalyDetection(m) => &m.name,
        }
    }

    /// Copy carrying the id assigned by the server.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        let id = Some(id.into());
        match &mut self {
            Monitor::Connectivity(m) => m.id = id,
            Monitor::Host(m) => m.id = id,
            Monitor::Service(m) => m.id = id,
            Monitor::External(m) => m.id = id,
            Monitor::Expression(m) => m.id = id,
            Monitor::AnomalyDetection(m) => m.id = id,
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityMonitor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memo: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_mute: bool,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub notification_interval: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_scopes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct HostMetricMonitor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memo: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_mute: bool,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub notification_interval: u64,
    #[serde(default)]
    pub metric: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub warning: Option<f64>,
    #[serde(default)]
    pub critical: Option<f64>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub duration: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_check_attempts: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_scopes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMetricMonitor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memo: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_mute: bool,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub notification_interval: u64,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub metric: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub warning: Option<f64>,
    #[serde(default)]
    pub critical: Option<f64>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub duration: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_check_attempts: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_duration_warning: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_duration_critical: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct HeaderField {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExternalMonitor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memo: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_mute: bool,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub notification_interval: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub method: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_check_attempts: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_critical: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_warning: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_duration: Option<u64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub request_body: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub contains_string: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certification_expiration_critical: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certification_expiration_warning: Option<u64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip_certificate_verification: bool,
    #[serde(default)]
    pub headers: Vec<HeaderField>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionMonitor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memo: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_mute: bool,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub notification_interval: u64,
    #[serde(default)]
    pub expression: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub warning: Option<f64>,
    #[serde(default)]
    pub critical: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyDetectionMonitor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memo: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_mute: bool,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub notification_interval: u64,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_sensitivity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical_sensitivity: Option<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_check_attempts: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_period_from: Option<u64>,
}
