//! Core domain logic for tiered user/organization accounts.
//! This crate is the single source of truth for account workflows and
//! their compensation rules.

pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, DbLocation};
pub use context::{CancelHandle, Interrupted, RequestContext};
pub use error::ErrorKind;
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget};
pub use model::account::{DetailedUser, NewUser, UserAccount, UserProfile};
pub use model::org::{DetailedOrg, NewOrg, OrgAccount, OrgProfile};
pub use model::{parse_account_id, AccountId, ValidationError};
pub use repo::account_repo::{AccountRepository, RepoError, RepoResult, SqliteAccountRepository};
pub use repo::memory_repo::{MemoryAccountRepository, RepoOperation};
pub use repo::profile_update::{ProfileField, ProfileUpdate, UpdateValue, DEFAULT_SENTINEL};
pub use service::account_service::{AccountService, ServiceError, ServiceResult};
pub use service::saga::{Saga, SagaFailure, WorkflowState};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
