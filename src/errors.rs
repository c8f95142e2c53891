//! Error Types
//!
//! This module defines the error types used by the synchronization layer.
//!
//! # Overview
//!
//! Per-frame work never fails: missing bounds, buffers or probe data degrade to
//! early-return no-ops. The only reported failures come from resource creation
//! and configuration loading:
//! - GPU buffer allocation failures
//! - Settings parsing errors
//!
//! # Usage
//!
//! Fallible APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, SyncError>`.
//!
//! ```rust,ignore
//! use myth_renderable::errors::Result;
//!
//! fn attach(unit: &mut RenderableUnit) -> Result<()> {
//!     unit.rebuild_bindings(0)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for renderable synchronization.
#[derive(Error, Debug)]
pub enum SyncError {
    // ========================================================================
    // GPU Resource Errors
    // ========================================================================
    /// The GPU backend refused to create a buffer.
    #[error("Failed to create buffer '{label}' ({size} bytes): {reason}")]
    BufferCreation {
        /// Debug label of the requested buffer
        label: String,
        /// Requested size in bytes
        size: u64,
        /// Backend supplied reason
        reason: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Alias for `Result<T, SyncError>`.
pub type Result<T> = std::result::Result<T, SyncError>;
