use std::fmt;

use gimbal_core::interner::{self, Symbol};
use gimbal_core::math::rotation_about;
use glam::{Mat4, Vec3};
use smallvec::SmallVec;

use super::ValueDriver;
use crate::mask::AnimationMask;

/// How one joint responds to a procedural channel's value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProceduralJointConfig {
    pub joint: Symbol,
    /// Rotation axis in the joint's local space. Normalized when used.
    pub axis: Vec3,
    /// Deflection in radians at a value of `1.0`.
    pub max_deflection: f32,
    /// Mirrors the deflection, for left/right pairs.
    pub inverted: bool,
}

impl ProceduralJointConfig {
    pub fn new(joint_path: &str, axis: Vec3, max_deflection: f32) -> Self {
        Self {
            joint: interner::intern(joint_path),
            axis,
            max_deflection,
            inverted: false,
        }
    }

    #[must_use]
    pub fn inverted(mut self) -> Self {
        self.inverted = true;
        self
    }

    #[must_use]
    pub fn joint_path(&self) -> &'static str {
        interner::resolve(self.joint)
    }
}

/// Per-joint rotations produced by a procedural channel.
pub type JointOverrides = SmallVec<[(Symbol, Mat4); 4]>;

/// An input-driven channel that rotates joints directly instead of sampling a clip.
#[derive(Debug, Clone)]
pub struct ProceduralAnimationChannel {
    id: String,
    mask: AnimationMask,
    weight: f32,
    dirty: bool,

    driver: ValueDriver,
    joint_configs: Vec<ProceduralJointConfig>,
}

impl ProceduralAnimationChannel {
    pub const DEFAULT_RANGE: (f32, f32) = (-1.0, 1.0);
    pub const DEFAULT_TRANSITION_SPEED: f32 = 3.0;

    pub fn new(
        id: impl Into<String>,
        mask: AnimationMask,
        joint_configs: Vec<ProceduralJointConfig>,
    ) -> Self {
        let (min, max) = Self::DEFAULT_RANGE;
        Self {
            id: id.into(),
            mask,
            weight: 1.0,
            dirty: true,
            driver: ValueDriver::new(min, max, Self::DEFAULT_TRANSITION_SPEED, 0.0),
            joint_configs,
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

    #[must_use]
    pub fn with_initial_value(mut self, value: f32) -> Self {
        self.driver.set_immediate(value);
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
    pub fn joint_configs(&self) -> &[ProceduralJointConfig] {
        &self.joint_configs
    }

    #[must_use]
    pub fn normalized_value(&self) -> f32 {
        self.driver.normalized()
    }

    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        self.driver.is_transitioning()
    }

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

    pub fn set_normalized_value(&mut self, normalized: f32) {
        self.set_value(self.driver.denormalize(normalized));
    }

    pub fn update(&mut self, delta_time: f32) {
        if self.driver.step(delta_time) {
            self.dirty = true;
        }
    }

    /// Procedural channels never sample a clip.
    #[must_use]
    pub fn animation_time(&self) -> f32 {
        0.0
    }

    /// Local rotation of each configured joint for the current value.
    ///
    /// `angle = ±value · max_deflection` about the joint's axis. Applied on top
    /// of the joint's rest transform by the skeleton.
    #[must_use]
    pub fn joint_overrides(&self) -> JointOverrides {
        let value = self.driver.value;
        self.joint_configs
            .iter()
            .map(|config| {
                let deflection = if config.inverted { -value } else { value };
                let angle = deflection * config.max_deflection;
                (config.joint, rotation_about(config.axis, angle))
            })
            .collect()
    }
}

impl fmt::Display for ProceduralAnimationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ProceduralAnimationChannel('{}', value: {:.2}, target: {:.2}, joints: {})",
            self.id,
            self.driver.value,
            self.driver.target,
            self.joint_configs.len()
        )
    }
}
