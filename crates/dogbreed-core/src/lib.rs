//! Core types and utilities for dog breed transfer learning.
//!
//! This crate provides the foundational types, configuration and error
//! handling shared by the dataset pipeline, the training crate and the tools.

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod types;

pub use cli::*;
pub use config::*;
pub use context::*;
pub use error::{Error, Result};
pub use metrics::*;
pub use types::*;

/// Re-export commonly used items
pub mod prelude {
    pub use crate::config::*;
    pub use crate::context::*;
    pub use crate::error::{Error, Result};
    pub use crate::metrics::*;
    pub use crate::types::*;
}
