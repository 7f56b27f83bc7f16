//! # Gimbal Animation
//!
//! Skeletal and procedural animation for articulated models.
//!
//! - [`Skeleton`]: joint hierarchy with a persistent local-pose buffer and a
//!   single-pass world pose evaluation.
//! - [`AnimationMask`]: which joints and meshes a channel may touch.
//! - [`AnimationChannel`]: binary toggles, continuous values and procedural
//!   joint overrides.
//! - [`AnimationLayer`]: channels grouped and driven together.
//! - [`AnimationLayerSystem`]: the per-entity registry and two-phase frame update.
//!
//! The model side ([`AnimatedModel`], [`AnimationClip`], [`Skin`],
//! [`TransformComponent`]) holds imported data; the layer system borrows it
//! for each call.

pub mod channel;
pub mod clip;
pub mod layer;
pub mod mapping;
pub mod mask;
pub mod model;
pub mod skeleton;
pub mod skin;
pub mod system;
pub mod tracks;
pub mod transform_component;

pub use channel::{
    AnimationChannel, BinaryAnimationChannel, BinaryState, ChannelKind,
    ContinuousAnimationChannel, JointOverrides, ProceduralAnimationChannel, ProceduralJointConfig,
};
pub use clip::{AnimationClip, JointTrack};
pub use layer::{AnimationLayer, ChannelGroup};
pub use mapping::{ChannelMapping, SkeletonTarget};
pub use mask::AnimationMask;
pub use model::{AnimatedModel, ModelMesh, SkeletonKey};
pub use skeleton::{JointSelection, Skeleton, SkeletonImport};
pub use skin::Skin;
pub use system::{
    AnimationLayerSystem, ChannelKey, LayerMut, LayerRef, LayerSystemSettings, MaskCoverage,
    SkeletonCoverage,
};
pub use tracks::{Interpolatable, InterpolationMode, KeyframeTrack};
pub use transform_component::TransformComponent;
