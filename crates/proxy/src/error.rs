use std::fmt;

use serde_json::Value;

/// Shape of a node in the property tree, as rendered in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Nil,
    Bool,
    Int64,
    Uint64,
    Float64,
    String,
    Array,
    Map,
}

impl ValueType {
    pub fn of(v: &Value) -> Self {
        match v {
            Value::Null => ValueType::Nil,
            Value::Bool(_) => ValueType::Bool,
            Value::Number(n) if n.is_i64() => ValueType::Int64,
            Value::Number(n) if n.is_u64() => ValueType::Uint64,
            Value::Number(_) => ValueType::Float64,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Object(_) => ValueType::Map,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Nil => "nil",
            ValueType::Bool => "bool",
            ValueType::Int64 => "int64",
            ValueType::Uint64 => "uint64",
            ValueType::Float64 => "float64",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::Map => "map",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Discriminant of a [`ProxyError`], for callers that only care about the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    TypeMismatch,
    NotFound,
    NotMapOrArray,
    ConvertFailure,
    InvalidIndex,
    InvalidQuery,
}

/// A located failure while navigating or coercing a property tree.
///
/// `address` is the breadcrumb from the root (`.Widgets[2].Layout.X`); the
/// root itself renders as the empty string.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProxyError {
    #[error("not matched types: expected={expected} actual={actual}: {address}")]
    TypeMismatch { expected: ValueType, actual: ValueType, address: String },
    #[error("not found: {address}")]
    NotFound { address: String },
    #[error("not map nor array: actual={actual}: {address}")]
    NotMapOrArray { actual: ValueType, address: String },
    #[error("convert error: {info}: {address}")]
    ConvertFailure { info: String, address: String },
    #[error("invalid index: {info}: {address}")]
    InvalidIndex { info: String, address: String },
    #[error("invalid query: {info}: {address}")]
    InvalidQuery { info: String, address: String },
}

impl ProxyError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ProxyError::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            ProxyError::NotFound { .. } => ErrorCode::NotFound,
            ProxyError::NotMapOrArray { .. } => ErrorCode::NotMapOrArray,
            ProxyError::ConvertFailure { .. } => ErrorCode::ConvertFailure,
            ProxyError::InvalidIndex { .. } => ErrorCode::InvalidIndex,
            ProxyError::InvalidQuery { .. } => ErrorCode::InvalidQuery,
        }
    }

    pub fn address(&self) -> &str {
        match self {
            ProxyError::TypeMismatch { address, .. }
            | ProxyError::NotFound { address }
            | ProxyError::NotMapOrArray { address, .. }
            | ProxyError::ConvertFailure { address, .. }
            | ProxyError::InvalidIndex { address, .. }
            | ProxyError::InvalidQuery { address, .. } => address,
        }
    }

    pub fn is_not_found(&self) -> bool { self.code() == ErrorCode::NotFound }

    pub(crate) fn mismatch(expected: ValueType, actual: &Value, address: &str) -> Self {
        ProxyError::TypeMismatch { expected, actual: ValueType::of(actual), address: address.to_string() }
    }

    pub(crate) fn convert(info: impl Into<String>, address: &str) -> Self {
        ProxyError::ConvertFailure { info: info.into(), address: address.to_string() }
    }
}

/// True when `err` is (or wraps) a [`ProxyError`] with the given code.
pub fn is_error_code(err: &anyhow::Error, code: ErrorCode) -> bool {
    err.downcast_ref::<ProxyError>().map(|e| e.code() == code).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn messages_carry_address() {
        let e = ProxyError::mismatch(ValueType::Map, &json!(1), ".Foo");
        assert_eq!(e.to_string(), "not matched types: expected=map actual=int64: .Foo");
        let e = ProxyError::NotFound { address: ".Foo.Bar".into() };
        assert_eq!(e.to_string(), "not found: .Foo.Bar");
        let e = ProxyError::convert("overflow", "[3]");
        assert_eq!(e.to_string(), "convert error: overflow: [3]");
    }

    #[test]
    fn value_types_follow_json_numbers() {
        assert_eq!(ValueType::of(&json!(-1)), ValueType::Int64);
        assert_eq!(ValueType::of(&json!(u64::MAX)), ValueType::Uint64);
        assert_eq!(ValueType::of(&json!(1.5)), ValueType::Float64);
        assert_eq!(ValueType::of(&Value::Null).to_string(), "nil");
    }

    #[test]
    fn code_survives_anyhow() {
        let err: anyhow::Error = ProxyError::NotFound { address: ".X".into() }.into();
        assert!(is_error_code(&err, ErrorCode::NotFound));
        assert!(!is_error_code(&err, ErrorCode::TypeMismatch));
    }
}
