use gimbal_core::errors::{GimbalError, Result};
use glam::{Quat, Vec3};

/// How values between two keyframes are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMode {
    #[default]
    Linear,
    Step,
}

/// Values that can be blended between two keyframes.
pub trait Interpolatable: Copy {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self;
}

impl Interpolatable for f32 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start + (end - start) * t
    }
}

impl Interpolatable for Vec3 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.lerp(end, t)
    }
}

impl Interpolatable for Quat {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.slerp(end, t)
    }
}

/// A sorted list of keyframes for one animated property.
#[derive(Debug, Clone)]
pub struct KeyframeTrack<T: Interpolatable> {
    times: Vec<f32>,
    values: Vec<T>,
    interpolation: InterpolationMode,
}

impl<T: Interpolatable> KeyframeTrack<T> {
    /// Builds a track, validating that times are ascending and match the values.
    pub fn new(times: Vec<f32>, values: Vec<T>, interpolation: InterpolationMode) -> Result<Self> {
        if times.len() != values.len() {
            return Err(GimbalError::TrackLengthMismatch {
                times: times.len(),
                values: values.len(),
            });
        }
        if let Some(index) = times.windows(2).position(|w| w[1] < w[0]) {
            return Err(GimbalError::UnorderedKeyframes { index: index + 1 });
        }

        Ok(Self {
            times,
            values,
            interpolation,
        })
    }

    /// A track holding one value for all time.
    #[must_use]
    pub fn constant(value: T) -> Self {
        Self {
            times: vec![0.0],
            values: vec![value],
            interpolation: InterpolationMode::Step,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Time of the last keyframe, or zero for an empty track.
    #[must_use]
    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Samples the track, clamping to the first/last keyframe outside its range.
    ///
    /// Returns `None` only for an empty track.
    #[must_use]
    pub fn sample(&self, time: f32) -> Option<T> {
        let len = self.times.len();
        if len == 0 {
            return None;
        }

        // partition_point gives the first keyframe strictly after `time`
        let next = self.times.partition_point(|&t| t <= time);
        if next == 0 {
            return Some(self.values[0]);
        }
        if next >= len {
            return Some(self.values[len - 1]);
        }

        let index = next - 1;
        let v0 = self.values[index];
        match self.interpolation {
            InterpolationMode::Step => Some(v0),
            InterpolationMode::Linear => {
                let t0 = self.times[index];
                let dt = self.times[next] - t0;
                // Prevent division by zero on duplicated keyframe times
                let t = if dt > 1e-6 { ((time - t0) / dt).clamp(0.0, 1.0) } else { 0.0 };
                Some(T::interpolate_linear(v0, self.values[next], t))
            }
        }
    }
}
