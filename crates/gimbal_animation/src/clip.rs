use gimbal_core::interner::{self, Symbol};
use glam::{Mat4, Quat, Vec3};
use rustc_hash::FxHashMap;

use crate::tracks::KeyframeTrack;

/// Sampled TRS channels for one joint. Absent components stay at identity.
#[derive(Debug, Clone, Default)]
pub struct JointTrack {
    pub translation: Option<KeyframeTrack<Vec3>>,
    pub rotation: Option<KeyframeTrack<Quat>>,
    pub scale: Option<KeyframeTrack<Vec3>>,
}

impl JointTrack {
    #[must_use]
    pub fn with_translation(mut self, track: KeyframeTrack<Vec3>) -> Self {
        self.translation = Some(track);
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, track: KeyframeTrack<Quat>) -> Self {
        self.rotation = Some(track);
        self
    }

    #[must_use]
    pub fn with_scale(mut self, track: KeyframeTrack<Vec3>) -> Self {
        self.scale = Some(track);
        self
    }

    fn end_time(&self) -> f32 {
        let t = self.translation.as_ref().map_or(0.0, KeyframeTrack::end_time);
        let r = self.rotation.as_ref().map_or(0.0, KeyframeTrack::end_time);
        let s = self.scale.as_ref().map_or(0.0, KeyframeTrack::end_time);
        t.max(r).max(s)
    }

    /// Local transform at `time`, or `None` when no component has keyframes.
    #[must_use]
    pub fn sample(&self, time: f32) -> Option<Mat4> {
        let translation = self.translation.as_ref().and_then(|t| t.sample(time));
        let rotation = self.rotation.as_ref().and_then(|t| t.sample(time));
        let scale = self.scale.as_ref().and_then(|t| t.sample(time));

        if translation.is_none() && rotation.is_none() && scale.is_none() {
            return None;
        }

        Some(Mat4::from_scale_rotation_translation(
            scale.unwrap_or(Vec3::ONE),
            rotation.unwrap_or(Quat::IDENTITY),
            translation.unwrap_or(Vec3::ZERO),
        ))
    }
}

/// Read-only sampled joint animation, as produced by model import.
#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub speed: f32,
    tracks: FxHashMap<Symbol, JointTrack>,
    joint_paths: Vec<Symbol>,
}

impl AnimationClip {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            duration: 0.0,
            speed: 1.0,
            tracks: FxHashMap::default(),
            joint_paths: Vec::new(),
        }
    }

    /// Adds (or replaces) the track of one joint and grows the duration to cover it.
    #[must_use]
    pub fn with_joint_track(mut self, joint_path: &str, track: JointTrack) -> Self {
        let joint = interner::intern(joint_path);
        self.duration = self.duration.max(track.end_time());
        if self.tracks.insert(joint, track).is_none() {
            self.joint_paths.push(joint);
        }
        self
    }

    /// Overrides the duration derived from the keyframes.
    #[must_use]
    pub fn with_duration(mut self, duration: f32) -> Self {
        self.duration = duration;
        self
    }

    #[must_use]
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Local pose of `joint` at `time`, or `None` when the clip does not animate it.
    #[must_use]
    pub fn pose(&self, time: f32, joint: Symbol) -> Option<Mat4> {
        self.tracks.get(&joint).and_then(|track| track.sample(time))
    }

    /// Same as [`pose`](Self::pose), addressed by path.
    #[must_use]
    pub fn pose_for_path(&self, time: f32, joint_path: &str) -> Option<Mat4> {
        self.pose(time, interner::get(joint_path)?)
    }

    /// Animated joints, in the order their tracks were added.
    pub fn joint_paths(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.joint_paths.iter().map(|&sym| interner::resolve(sym))
    }

    #[must_use]
    pub fn joint_symbols(&self) -> &[Symbol] {
        &self.joint_paths
    }
}
