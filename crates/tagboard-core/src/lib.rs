//! tagboard-core library.
//!
//! Hashtag identity and content-reference tracking over a SQLite document
//! store: tag normalization, usage counting, the slug registry, the formula
//! reference scanner, and a coalescing cache for small derived datasets.
//!
//! # Conventions
//!
//! - **Errors**: [`error::TagboardError`] for operations callers branch on;
//!   `anyhow::Result` for store/config plumbing.
//! - **Logging**: `tracing` macros only; subscribers are installed by binaries.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod refs;
pub mod tags;

pub use error::{ErrorCode, TagboardError};
