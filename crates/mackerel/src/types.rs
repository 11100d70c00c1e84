//! Request and response bodies of the Mackerel API.

use std::collections::BTreeMap;
use std::fmt;

use chrono::Weekday;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

fn is_false(b: &bool) -> bool { !*b }

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Org {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CreateServiceParam {
    pub name: String,
    pub memo: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Role {
    pub name: String,
    #[serde(default)]
    pub memo: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CreateRoleParam {
    pub name: String,
    pub memo: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct HostMeta {
    #[serde(rename = "agent-revision", default, skip_serializing_if = "String::is_empty")]
    pub agent_revision: String,
    #[serde(rename = "agent-version", default, skip_serializing_if = "String::is_empty")]
    pub agent_version: String,
    #[serde(rename = "agent-name", default, skip_serializing_if = "String::is_empty")]
    pub agent_name: String,
}

/// Body of host create and update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct HostParam {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(default)]
    pub meta: HostMeta,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub role_fullnames: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub custom_identifier: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    #[default]
    All,
    Critical,
}

impl NotificationLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(Self::All),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NotificationGroupMonitor {
    pub id: String,
    pub skip_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NotificationGroupService {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NotificationGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub notification_level: NotificationLevel,
    #[serde(default)]
    pub child_notification_group_ids: Vec<String>,
    #[serde(default)]
    pub child_channel_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub monitors: Vec<NotificationGroupMonitor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<NotificationGroupService>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserAuthority {
    Owner,
    Manager,
    Collaborator,
    #[default]
    Viewer,
}

impl UserAuthority {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(Self::Owner),
            "manager" => Some(Self::Manager),
            "collaborator" => Some(Self::Collaborator),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub screen_name: String,
    pub email: String,
    #[serde(default)]
    pub authority: UserAuthority,
    #[serde(default)]
    pub is_in_registration_process: bool,
    #[serde(default, rename = "isMFAEnabled")]
    pub is_mfa_enabled: bool,
    #[serde(default)]
    pub authentication_methods: Vec<String>,
    #[serde(default)]
    pub joined_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub email: String,
    #[serde(default)]
    pub authority: UserAuthority,
    #[serde(default)]
    pub expires_at: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceType {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurrenceType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }
}

/// A weekday spelled in full English on the wire (`"Sunday"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DowntimeWeekday(pub Weekday);

const WEEKDAYS: [(Weekday, &str); 7] = [
    (Weekday::Sun, "Sunday"),
    (Weekday::Mon, "Monday"),
    (Weekday::Tue, "Tuesday"),
    (Weekday::Wed, "Wednesday"),
    (Weekday::Thu, "Thursday"),
    (Weekday::Fri, "Friday"),
    (Weekday::Sat, "Saturday"),
];

impl DowntimeWeekday {
    pub fn parse(name: &str) -> Option<Self> { WEEKDAYS.iter().find(|(_, n)| *n == name).map(|(d, _)| DowntimeWeekday(*d)) }

    pub fn name(self) -> &'static str { WEEKDAYS.iter().find(|(d, _)| *d == self.0).map(|(_, n)| *n).unwrap_or("Sunday") }
}

impl fmt::Display for DowntimeWeekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl Serialize for DowntimeWeekday {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> { s.serialize_str(self.name()) }
}

impl<'de> Deserialize<'de> for DowntimeWeekday {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        DowntimeWeekday::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("unknown downtime weekday: {}", s)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DowntimeRecurrence {
    #[serde(rename = "type")]
    pub kind: RecurrenceType,
    pub interval: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weekdays: Vec<DowntimeWeekday>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Downtime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memo: String,
    pub start: i64,
    pub duration: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<DowntimeRecurrence>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_exclude_scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub role_scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub role_exclude_scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub monitor_scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub monitor_exclude_scopes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AwsIntegrationService {
    pub enable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub excluded_metrics: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub retire_automatically: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AwsIntegration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub region: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub included_tags: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub excluded_tags: String,
    #[serde(default)]
    pub services: BTreeMap<String, AwsIntegrationService>,
}
