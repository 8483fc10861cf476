//! Error Types
//!
//! This module defines the error types used by the animation crate.
//!
//! # Overview
//!
//! Nothing on the per-frame compute path fails: a contributor that cannot be
//! evaluated simply contributes nothing. [`AnimationError`] is only returned by
//! attach-time operations, so callers can log and carry on:
//!
//! - attaching a value whose shape the target cannot mix
//! - re-attaching a joint value that is already bound
//! - attaching skeletal values to an agent without a skeleton
//!
//! Unresolved joints are not errors. They are recorded as an unresolved bone
//! index and skipped at compute time.
//!
//! ```rust,ignore
//! use myth_animation::errors::{AnimationError, Result};
//!
//! fn attach() -> Result<()> {
//!     Err(AnimationError::MissingSkeleton)
//! }
//! ```

use thiserror::Error;

/// The main error type for the animation crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnimationError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// An animated value of an unsupported shape was attached.
    #[error("Animated value '{name}' has unsupported shape '{shape}' for {target}")]
    UnsupportedValue {
        /// Name of the rejected value
        name: String,
        /// Shape of the rejected value (e.g. "vector3")
        shape: &'static str,
        /// What it was being attached to
        target: &'static str,
    },

    // ========================================================================
    // State Errors
    // ========================================================================
    /// The same joint value was attached twice under one controller.
    #[error("Animated value '{0}' is already bound")]
    DuplicateValue(String),

    /// The controller handle no longer refers to a registered controller.
    #[error("Playback controller not found")]
    ControllerNotFound,

    /// Skeletal values were attached where no skeleton instance exists.
    #[error("No skeleton instance is attached")]
    MissingSkeleton,
}

/// Alias for `Result<T, AnimationError>`.
pub type Result<T> = std::result::Result<T, AnimationError>;
