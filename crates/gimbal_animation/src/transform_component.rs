use gimbal_core::errors::{GimbalError, Result};
use gimbal_core::math::conjugate;
use glam::Mat4;

/// Whole-mesh animation baked as key transforms at a fixed rate.
///
/// Used by meshes animated without a skeleton (a gear door parented directly
/// to the airframe, for instance).
#[derive(Debug, Clone)]
pub struct TransformComponent {
    key_transforms: Vec<Mat4>,
    duration: f32,
    current_transform: Mat4,
}

impl TransformComponent {
    /// Keys per second.
    pub const SAMPLE_RATE: f32 = 120.0;

    /// Wraps already sampled keys (`SAMPLE_RATE` apart, starting at zero).
    pub fn from_samples(key_transforms: Vec<Mat4>, duration: f32) -> Result<Self> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(GimbalError::InvalidSampleRate {
                rate: Self::SAMPLE_RATE,
                duration,
            });
        }
        Ok(Self {
            key_transforms,
            duration,
            current_transform: Mat4::IDENTITY,
        })
    }

    /// Samples `sampler` every `1 / SAMPLE_RATE` seconds over `[0, duration)`.
    ///
    /// With a basis, each key is re-expressed as `basis · key · basis⁻¹`, the
    /// same conjugation skeletons apply to their joints.
    pub fn from_fn<F>(duration: f32, mut sampler: F, basis: Option<Mat4>) -> Result<Self>
    where
        F: FnMut(f32) -> Mat4,
    {
        if !duration.is_finite() || duration < 0.0 {
            return Err(GimbalError::InvalidSampleRate {
                rate: Self::SAMPLE_RATE,
                duration,
            });
        }

        let basis = basis.map(|b| (b, b.inverse()));
        let mut key_transforms = Vec::with_capacity((duration * Self::SAMPLE_RATE).ceil() as usize);
        let mut frame = 0_u32;
        loop {
            let time = frame as f32 / Self::SAMPLE_RATE;
            if time >= duration {
                break;
            }
            let key = sampler(time);
            key_transforms.push(match basis {
                Some((b, b_inv)) => conjugate(b, b_inv, key),
                None => key,
            });
            frame += 1;
        }

        Self::from_samples(key_transforms, duration)
    }

    #[must_use]
    pub fn duration(&self) -> f32 {
        self.duration
    }

    #[must_use]
    pub fn key_transforms(&self) -> &[Mat4] {
        &self.key_transforms
    }

    #[must_use]
    pub fn current_transform(&self) -> Mat4 {
        self.current_transform
    }

    /// Selects the key for `time`, holding the last key past the end.
    pub fn set_current_transform(&mut self, time: f32) {
        if self.duration <= 0.0 {
            self.current_transform = Mat4::IDENTITY;
            return;
        }

        // Saturating cast: negative times land on the first key
        let frame = (time.min(self.duration) * Self::SAMPLE_RATE).floor() as usize;
        self.current_transform = self
            .key_transforms
            .get(frame)
            .or_else(|| self.key_transforms.last())
            .copied()
            .unwrap_or(Mat4::IDENTITY);
    }
}
