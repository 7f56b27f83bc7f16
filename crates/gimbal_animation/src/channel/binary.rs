use std::fmt;
use std::sync::Arc;

use crate::clip::AnimationClip;
use crate::mask::AnimationMask;

/// Position of a two-state channel in its toggle cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinaryState {
    /// Fully "off" (gear up, canopy closed).
    #[default]
    Inactive,
    Activating,
    /// Fully "on".
    Active,
    Deactivating,
}

impl fmt::Display for BinaryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Inactive => "inactive",
            Self::Activating => "activating",
            Self::Active => "active",
            Self::Deactivating => "deactivating",
        };
        f.write_str(name)
    }
}

/// A toggle with a timed transition between its two stable states.
///
/// `inactive → activating → active → deactivating → inactive`. Transition
/// requests from the wrong state are ignored.
#[derive(Debug, Clone)]
pub struct BinaryAnimationChannel {
    id: String,
    mask: AnimationMask,
    weight: f32,
    clip: Option<Arc<AnimationClip>>,
    dirty: bool,

    state: BinaryState,
    progress: f32,
    transition_duration: f32,
    time_range: Option<(f32, f32)>,
}

impl BinaryAnimationChannel {
    /// New inactive channel. Starts dirty so its first pose gets applied.
    pub fn new(id: impl Into<String>, mask: AnimationMask, transition_duration: f32) -> Self {
        Self {
            id: id.into(),
            mask,
            weight: 1.0,
            clip: None,
            dirty: true,
            state: BinaryState::Inactive,
            progress: 0.0,
            transition_duration,
            time_range: None,
        }
    }

    #[must_use]
    pub fn with_initial_state(mut self, state: BinaryState) -> Self {
        self.state = state;
        self.progress = match state {
            BinaryState::Inactive | BinaryState::Activating => 0.0,
            BinaryState::Active | BinaryState::Deactivating => 1.0,
        };
        self
    }

    #[must_use]
    pub fn with_clip(mut self, clip: Arc<AnimationClip>) -> Self {
        self.clip = Some(clip);
        self
    }

    /// Maps progress onto `[start, end]` of the clip instead of `progress · duration`.
    #[must_use]
    pub fn with_time_range(mut self, start: f32, end: f32) -> Self {
        self.time_range = Some((start, end));
        self
    }

    // --- Accessors ---

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
    pub fn state(&self) -> BinaryState {
        self.state
    }

    /// Always within `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        self.progress
    }

    #[must_use]
    pub fn transition_duration(&self) -> f32 {
        self.transition_duration
    }

    pub fn set_transition_duration(&mut self, duration: f32) {
        self.transition_duration = duration;
    }

    #[must_use]
    pub fn time_range(&self) -> Option<(f32, f32)> {
        self.time_range
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == BinaryState::Active
    }

    #[must_use]
    pub fn is_inactive(&self) -> bool {
        self.state == BinaryState::Inactive
    }

    #[must_use]
    pub fn is_animating(&self) -> bool {
        matches!(self.state, BinaryState::Activating | BinaryState::Deactivating)
    }

    // --- Control ---

    /// Starts the transition to active. Only legal while inactive.
    pub fn activate(&mut self) {
        if self.state != BinaryState::Inactive {
            log::debug!("Channel '{}': cannot activate while {}", self.id, self.state);
            return;
        }
        log::trace!("Channel '{}': activating", self.id);
        self.state = BinaryState::Activating;
        self.dirty = true;
    }

    /// Starts the transition to inactive. Only legal while active.
    pub fn deactivate(&mut self) {
        if self.state != BinaryState::Active {
            log::debug!("Channel '{}': cannot deactivate while {}", self.id, self.state);
            return;
        }
        log::trace!("Channel '{}': deactivating", self.id);
        self.state = BinaryState::Deactivating;
        self.dirty = true;
    }

    pub fn toggle(&mut self) {
        match self.state {
            BinaryState::Inactive => self.activate(),
            BinaryState::Active => self.deactivate(),
            BinaryState::Activating | BinaryState::Deactivating => {
                log::debug!("Channel '{}': transition in progress, toggle ignored", self.id);
            }
        }
    }

    /// Scrubs to `value` (clamped to `[0, 1]`).
    ///
    /// The bounds snap to the stable states; anything in between keeps the
    /// direction the channel was heading in. Non-finite values are ignored.
    pub fn set_progress(&mut self, value: f32) {
        if !value.is_finite() {
            log::warn!("Channel '{}': ignoring non-finite progress {value}", self.id);
            return;
        }
        self.progress = value.clamp(0.0, 1.0);

        self.state = if self.progress >= 1.0 {
            BinaryState::Active
        } else if self.progress <= 0.0 {
            BinaryState::Inactive
        } else if matches!(self.state, BinaryState::Inactive | BinaryState::Activating) {
            BinaryState::Activating
        } else {
            BinaryState::Deactivating
        };

        self.dirty = true;
    }

    pub fn set_active_immediate(&mut self) {
        self.state = BinaryState::Active;
        self.progress = 1.0;
        self.dirty = true;
    }

    pub fn set_inactive_immediate(&mut self) {
        self.state = BinaryState::Inactive;
        self.progress = 0.0;
        self.dirty = true;
    }

    /// Advances a running transition. No-op in a stable state, for a
    /// non-positive duration, or for a non-positive `delta_time`.
    pub fn update(&mut self, delta_time: f32) {
        if self.transition_duration <= 0.0 || delta_time.is_nan() || delta_time <= 0.0 {
            return;
        }

        let step = delta_time / self.transition_duration;
        match self.state {
            BinaryState::Activating => {
                self.progress += step;
                if self.progress >= 1.0 {
                    self.progress = 1.0;
                    self.state = BinaryState::Active;
                    log::trace!("Channel '{}': activation complete", self.id);
                }
                self.dirty = true;
            }
            BinaryState::Deactivating => {
                self.progress -= step;
                if self.progress <= 0.0 {
                    self.progress = 0.0;
                    self.state = BinaryState::Inactive;
                    log::trace!("Channel '{}': deactivation complete", self.id);
                }
                self.dirty = true;
            }
            BinaryState::Active | BinaryState::Inactive => {}
        }
    }

    /// Clip time for the current progress.
    #[must_use]
    pub fn animation_time(&self) -> f32 {
        match self.time_range {
            Some((start, end)) => start + self.progress * (end - start),
            None => self.progress * self.transition_duration,
        }
    }
}

impl fmt::Display for BinaryAnimationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BinaryAnimationChannel('{}', state: {}, progress: {:.2})",
            self.id, self.state, self.progress
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gear() -> BinaryAnimationChannel {
        BinaryAnimationChannel::new("gear", AnimationMask::empty(), 3.0)
    }

    #[test]
    fn test_converges_to_active() {
        let mut channel = gear();
        channel.activate();
        channel.update(1.5);
        assert_eq!(channel.state(), BinaryState::Activating);
        channel.update(1.5);
        assert_eq!(channel.state(), BinaryState::Active);
        assert!((channel.progress() - 1.0).abs() < 1e-6);

        channel.update(1.0);
        assert_eq!(channel.state(), BinaryState::Active);
        assert!((channel.progress() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_illegal_transitions_leave_state() {
        let mut channel = gear();
        channel.deactivate();
        assert_eq!(channel.state(), BinaryState::Inactive);

        channel.activate();
        channel.activate();
        assert_eq!(channel.state(), BinaryState::Activating);
        channel.toggle();
        assert_eq!(channel.state(), BinaryState::Activating);
        channel.deactivate();
        assert_eq!(channel.state(), BinaryState::Activating);
    }

    #[test]
    fn test_set_progress_infers_direction() {
        let mut channel = gear().with_initial_state(BinaryState::Active);
        channel.set_progress(0.4);
        assert_eq!(channel.state(), BinaryState::Deactivating);

        channel.set_progress(-2.0);
        assert_eq!(channel.state(), BinaryState::Inactive);
        assert_eq!(channel.progress(), 0.0);

        channel.set_progress(0.5);
        assert_eq!(channel.state(), BinaryState::Activating);
        channel.set_progress(7.0);
        assert_eq!(channel.state(), BinaryState::Active);
        assert_eq!(channel.progress(), 1.0);
    }

    #[test]
    fn test_set_progress_ignores_non_finite() {
        let mut channel = gear();
        channel.set_progress(0.25);
        channel.clear_dirty();

        for value in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            channel.set_progress(value);
            assert!((channel.progress() - 0.25).abs() < 1e-6);
            assert_eq!(channel.state(), BinaryState::Activating);
            assert!(!channel.is_dirty());
        }

        channel.update(3.0);
        assert!(channel.is_active());
        assert_eq!(channel.progress(), 1.0);
    }

    #[test]
    fn test_zero_duration_never_moves() {
        let mut channel = BinaryAnimationChannel::new("instant", AnimationMask::empty(), 0.0);
        channel.activate();
        channel.update(10.0);
        assert_eq!(channel.state(), BinaryState::Activating);
        assert_eq!(channel.progress(), 0.0);
    }

    #[test]
    fn test_animation_time() {
        let mut channel = gear();
        channel.set_progress(0.5);
        assert!((channel.animation_time() - 1.5).abs() < 1e-6);

        let mut ranged = gear().with_time_range(2.0, 4.0);
        ranged.set_progress(0.25);
        assert!((ranged.animation_time() - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_dirty_lifecycle() {
        let mut channel = gear();
        assert!(channel.is_dirty());
        channel.clear_dirty();

        channel.update(1.0);
        assert!(!channel.is_dirty());

        channel.activate();
        assert!(channel.is_dirty());
        channel.clear_dirty();
        channel.update(0.5);
        assert!(channel.is_dirty());
    }
}
