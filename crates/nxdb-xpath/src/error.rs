use core::fmt;
use std::sync::Arc;

use crate::storage::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NXDB0001, // internal inconsistency: operand types matched no comparison branch
    NXDB0002, // storage access failed while evaluating an expression
    NXDB0003, // invalid store / index configuration
    NXDB0004, // document could not be loaded into the store
    XPTY0004, // type error (e.g. atomic value used where a node-set is required)
    // Fallback / unknown (kept last)
    Unknown,
}

/// ErrorCode notes:
/// - `NXDB*` codes are store specific; `XPTY0004` keeps its W3C meaning.
/// - Use `Error::code` for structured handling instead of matching message text.
impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NXDB0001 => "NXDB0001",
            ErrorCode::NXDB0002 => "NXDB0002",
            ErrorCode::NXDB0003 => "NXDB0003",
            ErrorCode::NXDB0004 => "NXDB0004",
            ErrorCode::XPTY0004 => "XPTY0004",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }

    pub fn from_code(s: &str) -> Self {
        use ErrorCode::*;
        match s.strip_prefix("err:").unwrap_or(s) {
            "NXDB0001" => NXDB0001,
            "NXDB0002" => NXDB0002,
            "NXDB0003" => NXDB0003,
            "NXDB0004" => NXDB0004,
            "XPTY0004" => XPTY0004,
            _ => Unknown,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "err:{}", self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>, // optional chained cause
}

impl Error {
    pub fn from_code(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            source: None,
        }
    }

    /// Raised when an expression tree reaches the evaluator in a shape the
    /// upstream compiler should never produce.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::NXDB0001, msg)
    }

    /// Compose an error with a source cause.
    pub fn with_source(
        mut self,
        source: impl Into<Option<Arc<dyn std::error::Error + Send + Sync>>>,
    ) -> Self {
        self.source = source.into();
        self
    }

    /// Wrap a storage failure, keeping the evaluation context in the message.
    pub fn storage(context: impl Into<String>, cause: StorageError) -> Self {
        Error::from_code(
            ErrorCode::NXDB0002,
            format!("An error occurred while processing expression: {}", context.into()),
        )
        .with_source(Some(Arc::new(cause) as Arc<dyn std::error::Error + Send + Sync>))
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn is_internal(&self) -> bool {
        self.code == ErrorCode::NXDB0001
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::from_code(ErrorCode::NXDB0003, e.to_string())
            .with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::from_code(ErrorCode::NXDB0004, e.to_string())
            .with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {} ({})", self.message, self.code)
    }
}
