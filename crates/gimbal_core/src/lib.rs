//! # Gimbal Core
//!
//! Foundational types shared by the Gimbal crates: the error type, the joint
//! path interner and a handful of matrix helpers.

pub mod errors;
pub mod interner;
pub mod math;

pub use errors::{GimbalError, Result};
pub use interner::Symbol;
