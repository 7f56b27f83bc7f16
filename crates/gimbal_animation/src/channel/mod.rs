//! Animation channels
//!
//! A channel is one independent source of animation intent. The three kinds
//! share identity, mask, weight and a dirty flag; [`AnimationChannel`] is the
//! closed set the layer system drives, and callers match on it (or use the
//! `as_*` accessors) for kind-specific control.

mod binary;
mod continuous;
mod procedural;

pub use binary::{BinaryAnimationChannel, BinaryState};
pub use continuous::ContinuousAnimationChannel;
pub use procedural::{JointOverrides, ProceduralAnimationChannel, ProceduralJointConfig};

use std::fmt;
use std::sync::Arc;

use gimbal_core::math::{VALUE_EPSILON, clamp_to_range};

use crate::clip::AnimationClip;
use crate::mask::AnimationMask;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Binary,
    Continuous,
    Procedural,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Binary => "binary",
            Self::Continuous => "continuous",
            Self::Procedural => "procedural",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub enum AnimationChannel {
    Binary(BinaryAnimationChannel),
    Continuous(ContinuousAnimationChannel),
    Procedural(ProceduralAnimationChannel),
}

macro_rules! dispatch {
    ($self:expr, $channel:ident => $body:expr) => {
        match $self {
            AnimationChannel::Binary($channel) => $body,
            AnimationChannel::Continuous($channel) => $body,
            AnimationChannel::Procedural($channel) => $body,
        }
    };
}

impl AnimationChannel {
    #[must_use]
    pub fn kind(&self) -> ChannelKind {
        match self {
            Self::Binary(_) => ChannelKind::Binary,
            Self::Continuous(_) => ChannelKind::Continuous,
            Self::Procedural(_) => ChannelKind::Procedural,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        dispatch!(self, c => c.id())
    }

    #[must_use]
    pub fn mask(&self) -> &AnimationMask {
        dispatch!(self, c => c.mask())
    }

    /// Informational only; channels are not blended.
    #[must_use]
    pub fn weight(&self) -> f32 {
        dispatch!(self, c => c.weight())
    }

    pub fn set_weight(&mut self, weight: f32) {
        dispatch!(self, c => c.set_weight(weight));
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        dispatch!(self, c => c.is_dirty())
    }

    pub fn clear_dirty(&mut self) {
        dispatch!(self, c => c.clear_dirty());
    }

    pub fn update(&mut self, delta_time: f32) {
        dispatch!(self, c => c.update(delta_time));
    }

    #[must_use]
    pub fn animation_time(&self) -> f32 {
        dispatch!(self, c => c.animation_time())
    }

    /// Whether this channel samples a clip (as opposed to overriding joints).
    #[must_use]
    pub fn is_clip_driven(&self) -> bool {
        !matches!(self, Self::Procedural(_))
    }

    #[must_use]
    pub fn clip(&self) -> Option<&Arc<AnimationClip>> {
        match self {
            Self::Binary(c) => c.clip(),
            Self::Continuous(c) => c.clip(),
            Self::Procedural(_) => None,
        }
    }

    /// Binds a clip to a clip-driven channel; ignored for procedural ones.
    pub(crate) fn set_clip(&mut self, clip: Arc<AnimationClip>) {
        match self {
            Self::Binary(c) => c.set_clip(clip),
            Self::Continuous(c) => c.set_clip(clip),
            Self::Procedural(_) => {}
        }
    }

    // --- Variant access ---

    #[must_use]
    pub fn as_binary(&self) -> Option<&BinaryAnimationChannel> {
        match self {
            Self::Binary(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_binary_mut(&mut self) -> Option<&mut BinaryAnimationChannel> {
        match self {
            Self::Binary(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_continuous(&self) -> Option<&ContinuousAnimationChannel> {
        match self {
            Self::Continuous(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_continuous_mut(&mut self) -> Option<&mut ContinuousAnimationChannel> {
        match self {
            Self::Continuous(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_procedural(&self) -> Option<&ProceduralAnimationChannel> {
        match self {
            Self::Procedural(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_procedural_mut(&mut self) -> Option<&mut ProceduralAnimationChannel> {
        match self {
            Self::Procedural(c) => Some(c),
            _ => None,
        }
    }

    // --- Uniform control ---

    /// Scrubs the channel to a `[0, 1]` position: progress for binary
    /// channels, the normalized target for valued ones.
    pub fn set_normalized(&mut self, normalized: f32) {
        match self {
            Self::Binary(c) => c.set_progress(normalized),
            Self::Continuous(c) => c.set_normalized_value(normalized),
            Self::Procedural(c) => c.set_normalized_value(normalized),
        }
    }

    /// Snaps to the rest position: inactive, or the bottom of the range.
    pub fn reset(&mut self) {
        match self {
            Self::Binary(c) => c.set_inactive_immediate(),
            Self::Continuous(c) => c.set_value_immediate(c.range().0),
            Self::Procedural(c) => c.set_value_immediate(c.range().0),
        }
    }
}

impl fmt::Display for AnimationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, c => fmt::Display::fmt(c, f))
    }
}

impl From<BinaryAnimationChannel> for AnimationChannel {
    fn from(channel: BinaryAnimationChannel) -> Self {
        Self::Binary(channel)
    }
}

impl From<ContinuousAnimationChannel> for AnimationChannel {
    fn from(channel: ContinuousAnimationChannel) -> Self {
        Self::Continuous(channel)
    }
}

impl From<ProceduralAnimationChannel> for AnimationChannel {
    fn from(channel: ProceduralAnimationChannel) -> Self {
        Self::Procedural(channel)
    }
}

/// Scalar value approaching a target at a fixed rate, kept inside `[min, max]`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ValueDriver {
    pub value: f32,
    pub target: f32,
    pub min: f32,
    pub max: f32,
    /// Units per second.
    pub speed: f32,
}

impl ValueDriver {
    pub fn new(min: f32, max: f32, speed: f32, initial: f32) -> Self {
        let initial = if initial.is_finite() {
            initial
        } else {
            log::warn!("Non-finite initial value {initial}; starting at {min}");
            min
        };
        let value = clamp_to_range(initial, min, max);
        Self {
            value,
            target: value,
            min,
            max,
            speed,
        }
    }

    fn clamp(&self, value: f32) -> f32 {
        clamp_to_range(value, self.min, self.max)
    }

    pub fn set_range(&mut self, min: f32, max: f32) {
        self.min = min;
        self.max = max;
        self.value = self.clamp(self.value);
        self.target = self.clamp(self.target);
    }

    /// Returns whether the target moved by more than [`VALUE_EPSILON`].
    pub fn set_target(&mut self, value: f32) -> bool {
        if !value.is_finite() {
            log::warn!("Ignoring non-finite target {value}");
            return false;
        }
        let clamped = self.clamp(value);
        if (clamped - self.target).abs() > VALUE_EPSILON {
            self.target = clamped;
            true
        } else {
            false
        }
    }

    /// Returns whether the value was accepted.
    pub fn set_immediate(&mut self, value: f32) -> bool {
        if !value.is_finite() {
            log::warn!("Ignoring non-finite value {value}");
            return false;
        }
        let clamped = self.clamp(value);
        self.value = clamped;
        self.target = clamped;
        true
    }

    pub fn is_transitioning(&self) -> bool {
        (self.value - self.target).abs() > VALUE_EPSILON
    }

    pub fn is_near(&self, value: f32) -> bool {
        (self.value - value).abs() < VALUE_EPSILON
    }

    pub fn neutral(&self) -> f32 {
        (self.min + self.max) * 0.5
    }

    pub fn normalized(&self) -> f32 {
        if self.max > self.min {
            (self.value - self.min) / (self.max - self.min)
        } else {
            0.0
        }
    }

    pub fn denormalize(&self, normalized: f32) -> f32 {
        self.min + normalized * (self.max - self.min)
    }

    /// Moves toward the target by at most `speed · delta_time`, snapping when
    /// within reach. Returns whether the value moved; a non-positive speed
    /// never moves it.
    pub fn step(&mut self, delta_time: f32) -> bool {
        if !self.is_transitioning()
            || self.speed <= 0.0
            || delta_time.is_nan()
            || delta_time <= 0.0
        {
            return false;
        }

        let max_change = self.speed * delta_time;
        let diff = self.target - self.value;
        if diff.abs() <= max_change {
            self.value = self.target;
        } else {
            self.value += max_change.copysign(diff);
        }
        self.value = self.clamp(self.value);
        true
    }
}
