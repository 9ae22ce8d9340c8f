//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into account/org workflows.
//! - Keep transport layers decoupled from storage details.

pub mod account_service;
pub mod saga;
