//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Database: The SQLite fortune store
//! - Adapters: Platform integrations (console for dev mode)

pub mod adapters;
pub mod config;
pub mod database;
