use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing credentials, model artifacts or other setup. Callers degrade to
    /// fixture/rule mode where possible; this is never fatal.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Bad credential material or an expired broker session.
    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed OTP, non-positive quantity, unsupported broker name, etc.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A pledge/unpledge request already reached a terminal state; the side
    /// effect is never applied twice.
    #[error("Already completed: {0}")]
    AlreadyCompleted(String),

    /// Collaborator I/O failure, wrapped with the original message. Never
    /// auto-retried at this layer.
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Upstream(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Upstream(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Tagged `{success, ...}` envelope returned at the HTTP/CLI boundary.
///
/// Every public operation is total: a `Result` converts into an envelope and no
/// error propagates past this point. Struct payloads merge their fields next to
/// `success`; list and scalar payloads serialize under a `data` key.
#[derive(Debug)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> Serialize for Envelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("success", &self.success)?;
        if let Some(data) = &self.data {
            match serde_json::to_value(data).map_err(serde::ser::Error::custom)? {
                serde_json::Value::Object(fields) => {
                    for (key, value) in &fields {
                        map.serialize_entry(key, value)?;
                    }
                }
                value => map.serialize_entry("data", &value)?,
            }
        }
        if let Some(error) = &self.error {
            map.serialize_entry("error", error)?;
        }
        map.end()
    }
}

impl<T: Serialize> From<Result<T>> for Envelope<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Envelope {
                success: true,
                data: Some(data),
                error: None,
            },
            Err(e) => Envelope {
                success: false,
                data: None,
                error: Some(e.to_string()),
            },
        }
    }
}
