//! Core library for taskdeck.
//!
//! This crate provides the domain models, database operations, and access
//! resolution for taskdeck, independent of any transport layer.
//!
//! # Usage
//!
//! ```no_run
//! use taskdeck_core::db::Database;
//! use taskdeck_core::models::*;
//!
//! let db = Database::open_default()?;
//! db.migrate()?;
//!
//! let users = db.list_active_users()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod access;
pub mod db;
pub mod models;

// Re-export commonly used types at crate root
pub use access::AccessContext;
pub use db::Database;
