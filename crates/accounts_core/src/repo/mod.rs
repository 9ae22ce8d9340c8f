//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the account/org data access contract.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes validate records before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `InvalidCredentials`,
//!   `NotAssociated`) in addition to store errors.

pub mod account_repo;
pub mod memory_repo;
pub mod profile_update;
