//! # Gimbal
//!
//! Layered skeletal and procedural animation for articulated 3D models.
//!
//! This crate re-exports the Gimbal member crates:
//!
//! - [`core`]: error type, joint-path interner, matrix helpers
//! - [`animation`]: skeletons, masks, channels, layers and the layer system
//!
//! ```rust,ignore
//! use gimbal::prelude::*;
//!
//! let mut system = AnimationLayerSystem::new(&model);
//! system.register_layer(&model, AnimationLayer::new("gear").with_channel(
//!     BinaryAnimationChannel::new("landing_gear", AnimationMask::empty(), 3.0),
//! ));
//! system.force_update_all_poses(&mut model);
//!
//! // every frame
//! system.update(&mut model, dt);
//! ```

pub use gimbal_animation as animation;
pub use gimbal_core as core;

pub use gimbal_animation::{
    AnimatedModel, AnimationChannel, AnimationClip, AnimationLayer, AnimationLayerSystem,
    AnimationMask, BinaryAnimationChannel, BinaryState, ChannelGroup, ContinuousAnimationChannel,
    LayerSystemSettings, ModelMesh, ProceduralAnimationChannel, ProceduralJointConfig, Skeleton,
    Skin, TransformComponent,
};
pub use gimbal_core::{GimbalError, Result};

pub mod prelude {
    pub use gimbal_animation::{
        AnimatedModel, AnimationChannel, AnimationClip, AnimationLayer, AnimationLayerSystem,
        AnimationMask, BinaryAnimationChannel, BinaryState, ChannelGroup,
        ContinuousAnimationChannel, JointTrack, KeyframeTrack, LayerSystemSettings, ModelMesh,
        ProceduralAnimationChannel, ProceduralJointConfig, Skeleton, SkeletonKey, Skin,
        TransformComponent,
    };
    pub use gimbal_core::{GimbalError, Result};
}
