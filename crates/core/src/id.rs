//! Physical resource ids: `mkr:<org>:<kind>[:tail...]`.

use std::fmt;

pub const SCHEME: &str = "mkr";

/// Remote entity categories addressable by a physical id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Service,
    Role,
    Host,
    Monitor,
    Dashboard,
    Downtime,
    NotificationChannel,
    NotificationGroup,
    AwsIntegration,
    AwsIntegrationExternalId,
    User,
}

impl IdKind {
    pub const ALL: [IdKind; 11] = [
        IdKind::Service,
        IdKind::Role,
        IdKind::Host,
        IdKind::Monitor,
        IdKind::Dashboard,
        IdKind::Downtime,
        IdKind::NotificationChannel,
        IdKind::NotificationGroup,
        IdKind::AwsIntegration,
        IdKind::AwsIntegrationExternalId,
        IdKind::User,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IdKind::Service => "service",
            IdKind::Role => "role",
            IdKind::Host => "host",
            IdKind::Monitor => "monitor",
            IdKind::Dashboard => "dashboard",
            IdKind::Downtime => "downtime",
            IdKind::NotificationChannel => "notification-channel",
            IdKind::NotificationGroup => "notification-group",
            IdKind::AwsIntegration => "aws-integration",
            IdKind::AwsIntegrationExternalId => "aws-integration-external-id",
            IdKind::User => "user",
        }
    }

    pub fn parse(s: &str) -> Option<Self> { Self::ALL.into_iter().find(|k| k.as_str() == s) }

    /// Number of tail segments; `None` when the tail is the whole remainder.
    fn arity(self) -> Option<usize> {
        match self {
            IdKind::Role => Some(2),
            IdKind::User => None,
            _ => Some(1),
        }
    }
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("invalid mkr id: {0}")]
    Malformed(String),
    #[error("invalid org name in id: {0}")]
    OrgMismatch(String),
    #[error("invalid type {actual}, expected {expected}")]
    KindMismatch { actual: String, expected: IdKind },
}

/// Builds and parses physical ids for one organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdCodec {
    org: String,
}

impl IdCodec {
    pub fn new(org: impl Into<String>) -> Self { Self { org: org.into() } }

    pub fn org(&self) -> &str { &self.org }

    /// Id of the organization itself.
    pub fn org_id(&self) -> String { format!("{}:{}", SCHEME, self.org) }

    pub fn build(&self, kind: IdKind, tail: &[&str]) -> String {
        let mut parts = vec![SCHEME, self.org.as_str(), kind.as_str()];
        parts.extend_from_slice(tail);
        parts.join(":")
    }

    /// Tail segments of `id`, checked against scheme, org and kind.
    pub fn parse<'i>(&self, id: &'i str, kind: IdKind) -> Result<Vec<&'i str>, IdError> {
        let parts: Vec<&str> = match kind.arity() {
            Some(n) => id.split(':').take(n + 4).collect(),
            None => id.splitn(4, ':').collect(),
        };
        let want = kind.arity().unwrap_or(1);
        if parts.len() != want + 3 || parts[0] != SCHEME {
            return Err(IdError::Malformed(id.to_string()));
        }
        if parts[1] != self.org {
            return Err(IdError::OrgMismatch(id.to_string()));
        }
        if parts[2] != kind.as_str() {
            return Err(IdError::KindMismatch { actual: parts[2].to_string(), expected: kind });
        }
        Ok(parts[3..].to_vec())
    }

    fn parse_one(&self, id: &str, kind: IdKind) -> Result<String, IdError> {
        let tail = self.parse(id, kind)?;
        Ok(tail.concat())
    }

    pub fn parse_service(&self, id: &str) -> Result<String, IdError> { self.parse_one(id, IdKind::Service) }

    /// `(service, role)` of a role id.
    pub fn parse_role(&self, id: &str) -> Result<(String, String), IdError> {
        let tail = self.parse(id, IdKind::Role)?;
        Ok((tail[0].to_string(), tail[1].to_string()))
    }

    /// `service:role` as the SaaS spells a role.
    pub fn parse_role_fullname(&self, id: &str) -> Result<String, IdError> {
        let (service, role) = self.parse_role(id)?;
        Ok(format!("{}:{}", service, role))
    }

    pub fn parse_host(&self, id: &str) -> Result<String, IdError> { self.parse_one(id, IdKind::Host) }
    pub fn parse_monitor(&self, id: &str) -> Result<String, IdError> { self.parse_one(id, IdKind::Monitor) }
    pub fn parse_dashboard(&self, id: &str) -> Result<String, IdError> { self.parse_one(id, IdKind::Dashboard) }
    pub fn parse_downtime(&self, id: &str) -> Result<String, IdError> { self.parse_one(id, IdKind::Downtime) }
    pub fn parse_notification_channel(&self, id: &str) -> Result<String, IdError> { self.parse_one(id, IdKind::NotificationChannel) }
    pub fn parse_notification_group(&self, id: &str) -> Result<String, IdError> { self.parse_one(id, IdKind::NotificationGroup) }
    pub fn parse_aws_integration(&self, id: &str) -> Result<String, IdError> { self.parse_one(id, IdKind::AwsIntegration) }
    pub fn parse_aws_integration_external_id(&self, id: &str) -> Result<String, IdError> { self.parse_one(id, IdKind::AwsIntegrationExternalId) }
    pub fn parse_user(&self, id: &str) -> Result<String, IdError> { self.parse_one(id, IdKind::User) }

    /// Kind named by `id`, after checking scheme and org.
    pub fn kind_of(&self, id: &str) -> Result<IdKind, IdError> {
        let parts: Vec<&str> = id.splitn(4, ':').collect();
        if parts.len() < 3 || parts[0] != SCHEME {
            return Err(IdError::Malformed(id.to_string()));
        }
        if parts[1] != self.org {
            return Err(IdError::OrgMismatch(id.to_string()));
        }
        IdKind::parse(parts[2]).ok_or_else(|| IdError::Malformed(id.to_string()))
    }
}
