//! Build pipeline for the plugin catalog.
//!
//! Walks a directory tree of per-plugin and per-variant YAML definitions,
//! normalizes the loosely-typed documents into a fixed relational shape, and
//! materializes the result as a SQLite snapshot that the serving process
//! opens read-only.
//!
//! The pipeline is two-phase: documents are folded into a [`Registry`] while
//! it accepts inserts, then [`Registry::resolve`] closes it, resolves every
//! cross-reference against the completed index, and hands an immutable
//! snapshot to the database writer. Per-document problems are collected as
//! [`BuildError`] values and reported; they never abort the run. Only
//! infrastructure problems ([`BuildFailure`]) are fatal.

pub mod document;
pub mod driver;
pub mod error;
pub mod loader;
pub mod registry;
pub mod report;

pub use driver::{BuildOptions, build};
pub use error::{BuildFailure, IoErrorContext, Result};
pub use loader::{DocumentKind, LoadedDocument, Walker};
pub use registry::Registry;
pub use report::{BuildError, BuildReport};
