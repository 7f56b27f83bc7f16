//! Matrix helpers shared by skeleton evaluation and sampled transforms.

use glam::{Mat4, Vec3};

/// Tolerance used when comparing channel values and targets.
pub const VALUE_EPSILON: f32 = 1e-3;

/// Re-expresses `m` in another coordinate basis: `basis · m · basis⁻¹`.
///
/// Vertex data that was already moved into the engine basis needs every joint
/// and node matrix conjugated the same way to stay consistent.
#[inline]
#[must_use]
pub fn conjugate(basis: Mat4, basis_inverse: Mat4, m: Mat4) -> Mat4 {
    basis * m * basis_inverse
}

/// Rotation of `angle` radians about `axis` (normalized here).
///
/// A degenerate axis yields the identity rather than NaNs.
#[must_use]
pub fn rotation_about(axis: Vec3, angle: f32) -> Mat4 {
    match axis.try_normalize() {
        Some(axis) => Mat4::from_axis_angle(axis, angle),
        None => Mat4::IDENTITY,
    }
}

/// Clamps `value` into `[min, max]`, tolerating an inverted range.
#[inline]
#[must_use]
pub fn clamp_to_range(value: f32, min: f32, max: f32) -> f32 {
    if min <= max {
        value.clamp(min, max)
    } else {
        value.clamp(max, min)
    }
}
