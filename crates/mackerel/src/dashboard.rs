//! Custom dashboards and their widgets.

use serde::{Deserialize, Serialize};

fn is_false(b: &bool) -> bool { !*b }

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memo: String,
    #[serde(default)]
    pub url_path: String,
    #[serde(default)]
    pub widgets: Vec<Widget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Layout {
    pub x: u64,
    pub y: u64,
    pub width: u64,
    pub height: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Widget {
    Graph {
        #[serde(default)]
        title: String,
        graph: Graph,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        range: Option<GraphRange>,
        layout: Layout,
    },
    Value {
        #[serde(default)]
        title: String,
        metric: Metric,
        layout: Layout,
    },
    Markdown {
        #[serde(default)]
        title: String,
        #[serde(default)]
        markdown: String,
        layout: Layout,
    },
    #[serde(rename_all = "camelCase")]
    AlertStatus {
        #[serde(default)]
        title: String,
        role_fullname: String,
        layout: Layout,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Graph {
    #[serde(rename_all = "camelCase")]
    Host { host_id: String, name: String },
    #[serde(rename_all = "camelCase")]
    Role {
        role_fullname: String,
        name: String,
        #[serde(default, skip_serializing_if = "is_false")]
        is_stacked: bool,
    },
    #[serde(rename_all = "camelCase")]
    Service { service_name: String, name: String },
    Expression { expression: String },
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Metric {
    #[serde(rename_all = "camelCase")]
    Host { host_id: String, name: String },
    #[serde(rename_all = "camelCase")]
    Service { service_name: String, name: String },
    Expression { expression: String },
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GraphRange {
    Relative { period: i64, offset: i64 },
    Absolute { start: i64, end: i64 },
}
