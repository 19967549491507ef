//! fortune-bot - a daily fortune draw plugin for chat bots.
//!
//! The crate is laid out in three layers plus the plugin itself:
//! - Domain: Core entities (User, Message, Command) and the Bot seam
//! - Application: Command dispatch, message parsing, errors
//! - Infrastructure: Config loading, the SQLite fortune store, adapters
//! - Plugin: Quota tracking, the midnight reset task, the draw handler

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod plugin;
