use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    NotFound,
    UnknownTable(String),
    InvalidPayload(String),
    InvalidPattern(String),
    Conflict(String),
    Validation(String),
    Unauthorized,
    Serialize(String),
    Deserialize(String),
    Poisoned,
}

impl Error {
    /// Short machine-readable code carried in the envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound => "not_found",
            Error::UnknownTable(_) => "unknown_table",
            Error::InvalidPayload(_) => "invalid_payload",
            Error::InvalidPattern(_) => "invalid_pattern",
            Error::Conflict(_) => "conflict",
            Error::Validation(_) => "validation",
            Error::Unauthorized => "unauthorized",
            Error::Serialize(_) => "serialize",
            Error::Deserialize(_) => "deserialize",
            Error::Poisoned => "internal",
        }
    }

    pub fn info(&self) -> ErrorInfo {
        ErrorInfo {
            code: self.code().to_string(),
            message: self.to_string(),
            details: None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NotFound => write!(f, "Not found"),
            Error::UnknownTable(table) => write!(f, "Unknown table: {}", table),
            Error::InvalidPayload(err) => write!(f, "Invalid payload: {}", err),
            Error::InvalidPattern(err) => write!(f, "Invalid pattern: {}", err),
            Error::Conflict(err) => write!(f, "Conflict: {}", err),
            Error::Validation(err) => write!(f, "Validation error: {}", err),
            Error::Unauthorized => write!(f, "Unauthorized"),
            Error::Serialize(err) => write!(f, "Serialization error: {}", err),
            Error::Deserialize(err) => write!(f, "Deserialization error: {}", err),
            Error::Poisoned => write!(f, "Table store lock poisoned"),
        }
    }
}

impl std::error::Error for Error {}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::InvalidPattern(err.to_string())
    }
}

/// Failure description as it appears in the `error` slot of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorInfo {
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<Error> for ErrorInfo {
    fn from(err: Error) -> Self {
        err.info()
    }
}
