//! Shared infrastructure for the pharvest workspace.
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! This crate provides the pieces every workspace member needs:
//!
//! - **Logging**: `tracing` subscriber setup with console/file targets and
//!   environment overrides
//! - **Sanitize**: filesystem-safe name components for materialized records
//!
//! # Example
//!
//! ```no_run
//! use pharvest_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env())?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

pub mod logging;
pub mod sanitize;

pub use sanitize::sanitize_component;
