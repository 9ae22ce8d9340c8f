//! Caller-facing failure taxonomy.
//!
//! Repository and service errors are rich enums; transports only need to
//! know which bucket a failure falls into. Each error type exposes
//! `kind()` returning one of these.

use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Failure category shared by every core operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or missing input, detected before any write.
    Validation,
    /// Store read/write failed, timed out, or returned inconsistent data.
    Persistence,
    /// Lookup matched no row.
    NotFound,
    /// Credential mismatch.
    Auth,
    /// Valid credentials, but not entitled to the requested org.
    Authorization,
    /// Request was cancelled by its caller between workflow steps.
    Cancelled,
}

impl ErrorKind {
    /// Stable snake_case label used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Persistence => "persistence",
            Self::NotFound => "not_found",
            Self::Auth => "auth",
            Self::Authorization => "authorization",
            Self::Cancelled => "cancelled",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
