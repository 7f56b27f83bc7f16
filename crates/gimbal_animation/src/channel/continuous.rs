use std::fmt;
use std::sync::Arc;

use super::ValueDriver;
use crate::clip::AnimationClip;
use crate::mask::AnimationMask;

/// A clip-driven channel positioned by a scalar (flaps at 0..1, a rudder at -1..1).
///
/// The value approaches its target linearly at `transition_speed` units per
/// second; the normalized value selects the clip time.
#[derive(Debug, Clone)]
pub struct ContinuousAnimationChannel {
    id: String,
    mask: AnimationMask,
    weight: f32,
    clip: Option<Arc<AnimationClip>>,
    dirty: bool,

    driver: ValueDriver,
    time_range: Option<(f32, f32)>,
}

impl ContinuousAnimationChannel {
    pub const DEFAULT_RANGE: (f32, f32) = (0.0, 1.0);
    pub const DEFAULT_TRANSITION_SPEED: f32 = 1.0;

    /// New channel at the bottom of `[0, 1]`, moving one unit per second.
    pub fn new(id: impl Into<String>, mask: AnimationMask) -> Self {
        let (min, max) = Self::DEFAULT_RANGE;
        Self {
            id: id.into(),
            mask,
            weight: 1.0,
            clip: None,
            dirty: true,
            driver: ValueDriver::new(min, max, Self::DEFAULT_TRANSITION_SPEED, 0.0),
            time_range: None,
        }
    }

    #[must_use]
    pub fn with_range(mut self, min: f32, max: f32) -> Self {
        self.driver.set_range(min, max);
        self
    }

    #[must_use]
    pub fn with_transition_speed(mut self, speed: f32) -> Self {
        self.driver.speed = speed;
        self
    }

    /// Starting value, clamped to the range.
    #[must_use]
    pub fn with_initial_value(mut self, value: f32) -> Self {
        self.driver.set_immediate(value);
        self
    }

    #[must_use]
    pub fn with_clip(mut self, clip: Arc<AnimationClip>) -> Self {
        self.clip = Some(clip);
        self
    }

    #[must_use]
    pub fn with_time_range(mut self, start: f32, end: f32) -> Self {
        self.time_range = Some((start, end));
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn mask(&self) -> &AnimationMask {
        &self.mask
    }

    #[must_use]
    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight;
    }

    #[must_use]
    pub fn clip(&self) -> Option<&Arc<AnimationClip>> {
        self.clip.as_ref()
    }

    pub(crate) fn set_clip(&mut self, clip: Arc<AnimationClip>) {
        self.clip = Some(clip);
        self.dirty = true;
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    #[must_use]
    pub fn value(&self) -> f32 {
        self.driver.value
    }

    #[must_use]
    pub fn target_value(&self) -> f32 {
        self.driver.target
    }

    #[must_use]
    pub fn range(&self) -> (f32, f32) {
        (self.driver.min, self.driver.max)
    }

    #[must_use]
    pub fn transition_speed(&self) -> f32 {
        self.driver.speed
    }

    pub fn set_transition_speed(&mut self, speed: f32) {
        self.driver.speed = speed;
    }

    #[must_use]
    pub fn time_range(&self) -> Option<(f32, f32)> {
        self.time_range
    }

    /// The value mapped onto `[0, 1]`; zero for a degenerate range.
    #[must_use]
    pub fn normalized_value(&self) -> f32 {
        self.driver.normalized()
    }

    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        self.driver.is_transitioning()
    }

    #[must_use]
    pub fn is_at_minimum(&self) -> bool {
        self.driver.is_near(self.driver.min)
    }

    #[must_use]
    pub fn is_at_maximum(&self) -> bool {
        self.driver.is_near(self.driver.max)
    }

    #[must_use]
    pub fn is_at_neutral(&self) -> bool {
        self.driver.is_near(self.driver.neutral())
    }

    /// Sets a new target; the value follows on subsequent updates.
    pub fn set_value(&mut self, value: f32) {
        if self.driver.set_target(value) {
            self.dirty = true;
        }
    }

    pub fn set_value_immediate(&mut self, value: f32) {
        if self.driver.set_immediate(value) {
            self.dirty = true;
        }
    }

    /// Moves the target by `delta`.
    pub fn adjust_value(&mut self, delta: f32) {
        self.set_value(self.driver.target + delta);
    }

    pub fn set_to_minimum(&mut self) {
        self.set_value(self.driver.min);
    }

    pub fn set_to_maximum(&mut self) {
        self.set_value(self.driver.max);
    }

    pub fn set_to_neutral(&mut self) {
        self.set_value(self.driver.neutral());
    }

    /// Sets the target from a `[0, 1]` fraction of the range.
    pub fn set_normalized_value(&mut self, normalized: f32) {
        self.set_value(self.driver.denormalize(normalized));
    }

    pub fn update(&mut self, delta_time: f32) {
        if self.driver.step(delta_time) {
            self.dirty = true;
        }
    }

    /// Clip time for the current value: the time range remap of the normalized
    /// value, or the normalized value itself.
    #[must_use]
    pub fn animation_time(&self) -> f32 {
        let normalized = self.normalized_value();
        match self.time_range {
            Some((start, end)) => start + normalized * (end - start),
            None => normalized,
        }
    }
}

impl fmt::Display for ContinuousAnimationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ContinuousAnimationChannel('{}', value: {:.2}, target: {:.2})",
            self.id, self.driver.value, self.driver.target
        )
    }
}
