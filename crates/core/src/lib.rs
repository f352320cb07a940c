//! Core types and configuration for the flowbar pipeline.
//!
//! This crate provides shared types used across all other crates:
//! - Market data types (trades, price bars, CVD bars)
//! - Configuration structures
//! - Common error types
//! - Logging setup

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
