/// Failures raised by the handler itself rather than by the Mackerel API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),
    #[error("unknown {what} type: {value}")]
    UnknownType { what: &'static str, value: String },
    #[error("invalid {what}: {value}")]
    InvalidValue { what: &'static str, value: String },
    #[error("scopes should be a service or a role: {id}: {address}")]
    InvalidScope { address: String, id: String },
    #[error("weekdays are available with weekly type, but it is {0} type")]
    WeekdaysNotWeekly(String),
    #[error("{0} was created without an id")]
    MissingId(&'static str),
    #[error("fail to invite {0}")]
    InviteFailed(String),
}
