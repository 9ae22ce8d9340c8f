//! Domain records for user and organization accounts.
//!
//! # Responsibility
//! - Define the account/profile shapes shared by repository and service.
//! - Own input validation that must run before any write.
//!
//! # Invariants
//! - Every account is identified by a server-generated `AccountId`.
//! - A profile always belongs to exactly one account (`account_id`).

pub mod account;
pub mod org;

use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for user and organization accounts.
pub type AccountId = Uuid;

/// Input rejected before reaching the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyUsername,
    EmptyPassword,
    EmptyFirstName,
    EmptyLastName,
    EmptyOrgName,
    /// Partial update named a field that is not updatable.
    UnknownField(String),
    /// Partial update carried an array or object value.
    UnsupportedValue { field: String },
    /// Identifier text is not a valid account id.
    MalformedId(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUsername | Self::EmptyPassword => {
                write!(f, "username and password are required")
            }
            Self::EmptyFirstName | Self::EmptyLastName => {
                write!(f, "first name and last name are required")
            }
            Self::EmptyOrgName => write!(f, "organization name is required"),
            Self::UnknownField(field) => write!(f, "unknown profile field `{field}`"),
            Self::UnsupportedValue { field } => {
                write!(f, "profile field `{field}` only accepts scalar values or null")
            }
            Self::MalformedId(value) => write!(f, "malformed account id `{value}`"),
        }
    }
}

impl Error for ValidationError {}

/// Parses transport-supplied id text into an [`AccountId`].
pub fn parse_account_id(value: &str) -> Result<AccountId, ValidationError> {
    Uuid::parse_str(value.trim()).map_err(|_| ValidationError::MalformedId(value.to_string()))
}
