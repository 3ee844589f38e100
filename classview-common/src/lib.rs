//! # Classview Common Library
//!
//! Shared code for the classview crates:
//! - Common error type
//! - TOML configuration file resolution and loading
//! - Logging configuration
//! - Clock abstraction for timestamps and TTL checks

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
pub use time::{Clock, SystemClock};
