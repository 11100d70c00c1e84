use std::time::Duration;

/// Failures talking to the Mackerel API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("status: {status_code}, {message}")]
    Status { status_code: u16, message: String },
    #[error("request cancelled")]
    Cancelled,
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api key: {0}")]
    ApiKey(String),
    #[error("mackerel: unexpected response")]
    UnexpectedResponse,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(status_code: u16, message: impl Into<String>) -> Self { ApiError::Status { status_code, message: message.into() } }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool { self.status_code() == Some(404) }

    pub fn is_bad_request(&self) -> bool { self.status_code() == Some(400) }

    /// Builds a status error from a non-2xx body.
    ///
    /// Accepts `{"error":{"message":..}}`, `{"error":".."}` or falls back to the raw text.
    pub fn from_body(status_code: u16, body: &[u8]) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_slice(body).ok();
        let message = parsed
            .as_ref()
            .and_then(|v| v.get("error"))
            .and_then(|e| e.get("message").and_then(|m| m.as_str()).or_else(|| e.as_str()))
            .map(|s| s.to_string())
            .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());
        ApiError::Status { status_code, message }
    }
}

/// Status code of an `ApiError` anywhere in an `anyhow` chain.
pub fn status_of(err: &anyhow::Error) -> Option<u16> { err.chain().find_map(|e| e.downcast_ref::<ApiError>()).and_then(|e| e.status_code()) }

pub fn is_not_found(err: &anyhow::Error) -> bool { status_of(err) == Some(404) }

pub fn is_bad_request(err: &anyhow::Error) -> bool { status_of(err) == Some(400) }

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn message_shapes() {
        let e = ApiError::from_body(404, br#"{"error":{"message":"Service not found"}}"#);
        assert_eq!(e.to_string(), "status: 404, Service not found");
        assert!(e.is_not_found());
        let e = ApiError::from_body(400, br#"{"error":"bad"}"#);
        assert_eq!(e.to_string(), "status: 400, bad");
        assert!(e.is_bad_request());
        let e = ApiError::from_body(502, b"Bad Gateway");
        assert_eq!(e.to_string(), "status: 502, Bad Gateway");
    }

    #[test]
    fn status_through_context() {
        let r: Result<(), ApiError> = Err(ApiError::status(404, "gone"));
        let err = r.context("deleting monitor").unwrap_err();
        assert!(is_not_found(&err));
        assert!(!is_bad_request(&err));
        assert_eq!(status_of(&anyhow::anyhow!("plain")), None);
        assert_eq!(ApiError::Cancelled.status_code(), None);
    }
}
