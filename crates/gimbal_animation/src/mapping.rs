//! Channel affinity index
//!
//! Which skeletons and meshes a channel can touch, resolved once when the
//! channel is registered so the per-frame path never scans the whole model.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::channel::AnimationChannel;
use crate::clip::AnimationClip;
use crate::model::{AnimatedModel, SkeletonKey};
use crate::skeleton::JointSelection;

/// One skeleton a channel writes, with the clip it samples there.
#[derive(Debug, Clone)]
pub struct SkeletonTarget {
    pub skeleton: SkeletonKey,
    /// `None` for procedural channels, or when no clip could be resolved.
    pub clip: Option<Arc<AnimationClip>>,
    pub joints: JointSelection,
}

#[derive(Debug, Clone, Default)]
pub struct ChannelMapping {
    targets: SmallVec<[SkeletonTarget; 2]>,
    meshes: Vec<usize>,
    mesh_drivers: FxHashMap<usize, SkeletonKey>,
}

impl ChannelMapping {
    /// Walks the model once and records what `channel` can affect.
    ///
    /// A skeleton is a target when the mask names one of its joints, or when
    /// the mask names no joints at all. A mesh is affected when the mask names
    /// it, when its driving skeleton is a target, when the mask is entirely
    /// empty, or when it carries its own transform component.
    #[must_use]
    pub fn build(channel: &AnimationChannel, model: &AnimatedModel) -> Self {
        let mask = channel.mask();

        let mut targets = SmallVec::new();
        let mut affected = FxHashSet::default();
        for (key, skeleton) in model.skeletons() {
            let joints = skeleton.select_joints(mask);
            if joints.is_empty(skeleton.joint_count()) {
                continue;
            }

            let clip = if channel.is_clip_driven() {
                resolve_clip(channel, model, key)
            } else {
                None
            };

            affected.insert(key);
            targets.push(SkeletonTarget {
                skeleton: key,
                clip,
                joints,
            });
        }

        let mut meshes = Vec::new();
        let mut mesh_drivers = FxHashMap::default();
        for (index, mesh) in model.meshes().iter().enumerate() {
            let driver = model.driving_skeleton(index);
            let is_affected = mask.contains_mesh(index)
                || driver.is_some_and(|key| affected.contains(&key))
                || mask.is_empty()
                || mesh.transform.is_some();
            if !is_affected {
                continue;
            }

            meshes.push(index);
            if let Some(driver) = driver {
                mesh_drivers.insert(index, driver);
            }
        }

        Self {
            targets,
            meshes,
            mesh_drivers,
        }
    }

    #[must_use]
    pub fn targets(&self) -> &[SkeletonTarget] {
        &self.targets
    }

    /// Affected mesh indices, ascending.
    #[must_use]
    pub fn meshes(&self) -> &[usize] {
        &self.meshes
    }

    #[must_use]
    pub fn affects_skeleton(&self, skeleton: SkeletonKey) -> bool {
        self.targets.iter().any(|t| t.skeleton == skeleton)
    }

    #[must_use]
    pub fn affects_mesh(&self, mesh: usize) -> bool {
        self.meshes.binary_search(&mesh).is_ok()
    }

    /// Skeleton feeding `mesh`'s skin, as resolved at build time.
    #[must_use]
    pub fn driving_skeleton(&self, mesh: usize) -> Option<SkeletonKey> {
        self.mesh_drivers.get(&mesh).copied()
    }
}

/// Channel clip, else the clip the model assigns to the skeleton, else the
/// model's first clip.
fn resolve_clip(
    channel: &AnimationChannel,
    model: &AnimatedModel,
    skeleton: SkeletonKey,
) -> Option<Arc<AnimationClip>> {
    channel
        .clip()
        .or_else(|| model.skeleton_clip(skeleton))
        .or_else(|| model.first_clip())
        .cloned()
}
