// SPDX-FileCopyrightText: 2026 Plughub Contributors
// SPDX-License-Identifier: MIT

//! SQLite database interface for plugin catalog snapshots.
//!
//! This crate provides read and write access to the hub's catalog database,
//! enabling queries for plugins, variants, settings and maintainers.
//!
//! **Architecture**: this is the Database Layer between the offline build
//! pipeline (which produces a snapshot) and the HTTP read path (which only
//! ever opens snapshots read-only).
//!
//! # Key Features
//!
//! - Full schema support (maintainers, plugins, plugin_variants, settings)
//! - Read-only snapshot access for serving
//! - In-memory database for testing
//! - Batched snapshot import for the build pipeline
//!
//! # Example
//!
//! ```ignore
//! use plughub_store_db::{PluginType, StoreDb};
//!
//! // Open a finished snapshot (read-only)
//! let db = StoreDb::open_snapshot("plugins.db")?;
//!
//! // List all extractors
//! for plugin in db.list_plugins(Some(PluginType::Extractors))? {
//!     println!("{}", plugin.name);
//! }
//! ```

mod connection;
mod error;
mod query;
mod schema;
mod types;
mod write;

pub use connection::{OpenMode, StoreDb};
pub use error::{Error, Result};
pub use schema::SCHEMA_VERSION;
pub use types::*;
pub use write::ImportCounts;
