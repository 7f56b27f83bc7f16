//! Error Types
//!
//! Errors raised while building animation data: skeleton topology, keyframe
//! tracks and sampled transform components.
//!
//! # Overview
//!
//! The per-frame animation path never fails. Illegal channel transitions,
//! missing clips and unknown joints are logged and skipped instead. The
//! variants of [`GimbalError`] therefore only describe malformed input handed
//! to constructors, which is an asset-build-time concern.
//!
//! ```rust,ignore
//! use gimbal::core::errors::{GimbalError, Result};
//!
//! fn build() -> Result<Skeleton> {
//!     Skeleton::new(paths, parents, bind, rest, None)
//! }
//! ```

use thiserror::Error;

/// The main error type for the Gimbal animation runtime.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GimbalError {
    // ========================================================================
    // Skeleton Topology Errors
    // ========================================================================
    /// The imported skeleton has no joints.
    #[error("Skeleton has no joints")]
    EmptySkeleton,

    /// One of the per-joint arrays does not match the joint count.
    #[error("Skeleton array '{array}' has {actual} entries, expected {expected}")]
    JointArrayMismatch {
        /// Name of the offending array
        array: &'static str,
        /// Joint count
        expected: usize,
        /// Length of the offending array
        actual: usize,
    },

    /// A joint references a parent stored at or after its own index.
    #[error("Joint {joint} ('{path}') has parent {parent}; joints must be topologically ordered")]
    UnsortedJoints {
        /// Index of the offending joint
        joint: usize,
        /// Joint path, for diagnostics
        path: String,
        /// The parent index it refers to
        parent: usize,
    },

    // ========================================================================
    // Clip & Sample Errors
    // ========================================================================
    /// A keyframe track has a different number of times and values.
    #[error("Keyframe track has {times} times but {values} values")]
    TrackLengthMismatch {
        /// Number of keyframe times
        times: usize,
        /// Number of keyframe values
        values: usize,
    },

    /// Keyframe times must be ascending.
    #[error("Keyframe times are not ascending at index {index}")]
    UnorderedKeyframes {
        /// First index whose time is smaller than its predecessor
        index: usize,
    },

    /// A sampled transform component was given an invalid rate or duration.
    #[error("Invalid sample rate {rate} for duration {duration}")]
    InvalidSampleRate {
        /// Samples per second
        rate: f32,
        /// Covered duration in seconds
        duration: f32,
    },
}

/// Alias for `Result<T, GimbalError>`.
pub type Result<T> = std::result::Result<T, GimbalError>;
