//! Skeleton pose evaluation
//!
//! A [`Skeleton`] keeps a persistent buffer of per-joint local poses. Any number
//! of animation sources write into it during a frame ("apply", cheap and
//! maskable), then [`Skeleton::evaluate_world_poses`] chains the hierarchy once
//! ("evaluate", O(joints)) to produce skin-ready matrices.
//!
//! Joints are stored in topological order: a joint's parent always sits at a
//! lower index, so a single forward pass is enough.

use gimbal_core::errors::{GimbalError, Result};
use gimbal_core::interner::{self, Symbol};
use gimbal_core::math::conjugate;
use glam::Mat4;
use rustc_hash::FxHashMap;

use crate::clip::AnimationClip;
use crate::mask::AnimationMask;

/// Which joints of a skeleton an apply pass writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JointSelection {
    All,
    /// Joint indices, ascending.
    Indices(Vec<usize>),
}

impl JointSelection {
    #[must_use]
    pub fn len(&self, joint_count: usize) -> usize {
        match self {
            Self::All => joint_count,
            Self::Indices(indices) => indices.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self, joint_count: usize) -> bool {
        self.len(joint_count) == 0
    }
}

/// Raw skeleton data handed over by model import.
#[derive(Debug, Clone, Default)]
pub struct SkeletonImport {
    pub joint_paths: Vec<String>,
    pub bind_transforms: Vec<Mat4>,
    pub rest_transforms: Vec<Mat4>,
    pub basis_transform: Option<Mat4>,
}

#[derive(Debug, Clone)]
pub struct Skeleton {
    joint_paths: Vec<Symbol>,
    joint_lookup: FxHashMap<Symbol, usize>,
    parent_indices: Vec<Option<usize>>,
    bind_transforms: Vec<Mat4>,
    inverse_bind_transforms: Vec<Mat4>,
    rest_transforms: Vec<Mat4>,

    /// Basis and its inverse, for assets authored in another convention.
    basis: Option<(Mat4, Mat4)>,

    // === Runtime Data ===
    local_poses: Vec<Mat4>,
    current_pose: Vec<Mat4>,
    // Evaluated into here, then swapped with `current_pose`
    scratch: Vec<Mat4>,
    evaluation_count: u64,
}

impl Skeleton {
    /// Builds a skeleton from explicit parent links.
    ///
    /// Fails if the skeleton is empty, an array length disagrees with the
    /// joint count, or the joints are not topologically ordered.
    pub fn new<S: AsRef<str>>(
        joint_paths: &[S],
        parent_indices: Vec<Option<usize>>,
        bind_transforms: Vec<Mat4>,
        rest_transforms: Vec<Mat4>,
        basis_transform: Option<Mat4>,
    ) -> Result<Self> {
        let count = joint_paths.len();
        if count == 0 {
            return Err(GimbalError::EmptySkeleton);
        }

        for (array, actual) in [
            ("parent_indices", parent_indices.len()),
            ("bind_transforms", bind_transforms.len()),
            ("rest_transforms", rest_transforms.len()),
        ] {
            if actual != count {
                return Err(GimbalError::JointArrayMismatch {
                    array,
                    expected: count,
                    actual,
                });
            }
        }

        for (joint, parent) in parent_indices.iter().enumerate() {
            if let Some(parent) = *parent
                && parent >= joint
            {
                return Err(GimbalError::UnsortedJoints {
                    joint,
                    path: joint_paths[joint].as_ref().to_string(),
                    parent,
                });
            }
        }

        let joint_paths: Vec<Symbol> = joint_paths
            .iter()
            .map(|path| interner::intern(path.as_ref()))
            .collect();

        let mut joint_lookup = FxHashMap::default();
        for (index, &joint) in joint_paths.iter().enumerate() {
            // First occurrence wins for duplicated paths
            joint_lookup.entry(joint).or_insert(index);
        }

        let inverse_bind_transforms = bind_transforms.iter().map(Mat4::inverse).collect();

        Ok(Self {
            joint_paths,
            joint_lookup,
            parent_indices,
            bind_transforms,
            inverse_bind_transforms,
            local_poses: rest_transforms.clone(),
            rest_transforms,
            basis: basis_transform.map(|b| (b, b.inverse())),
            current_pose: Vec::new(),
            scratch: Vec::with_capacity(count),
            evaluation_count: 0,
        })
    }

    /// Builds a skeleton whose parent links follow the joint path hierarchy:
    /// the parent of `/root/Armature/Gear` is `/root/Armature` when present.
    pub fn from_joint_paths<S: AsRef<str>>(
        joint_paths: &[S],
        bind_transforms: Vec<Mat4>,
        rest_transforms: Vec<Mat4>,
        basis_transform: Option<Mat4>,
    ) -> Result<Self> {
        let parent_indices = parent_indices_from_paths(joint_paths);
        Self::new(
            joint_paths,
            parent_indices,
            bind_transforms,
            rest_transforms,
            basis_transform,
        )
    }

    /// Builds a skeleton from import data, or `None` when the model has none.
    #[must_use]
    pub fn from_import(import: Option<SkeletonImport>) -> Option<Self> {
        let import = import?;
        if import.joint_paths.is_empty() {
            return None;
        }

        match Self::from_joint_paths(
            &import.joint_paths,
            import.bind_transforms,
            import.rest_transforms,
            import.basis_transform,
        ) {
            Ok(skeleton) => Some(skeleton),
            Err(err) => {
                log::warn!("Discarding imported skeleton: {err}");
                None
            }
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.joint_paths.len()
    }

    #[must_use]
    pub fn joint_symbols(&self) -> &[Symbol] {
        &self.joint_paths
    }

    pub fn joint_paths(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.joint_paths.iter().map(|&sym| interner::resolve(sym))
    }

    #[must_use]
    pub fn parent_indices(&self) -> &[Option<usize>] {
        &self.parent_indices
    }

    #[must_use]
    pub fn bind_transforms(&self) -> &[Mat4] {
        &self.bind_transforms
    }

    #[must_use]
    pub fn rest_transforms(&self) -> &[Mat4] {
        &self.rest_transforms
    }

    #[must_use]
    pub fn basis_transform(&self) -> Option<Mat4> {
        self.basis.map(|(basis, _)| basis)
    }

    #[must_use]
    pub fn local_poses(&self) -> &[Mat4] {
        &self.local_poses
    }

    /// Skin-ready joint matrices from the last evaluation; empty before the first one.
    #[must_use]
    pub fn current_pose(&self) -> &[Mat4] {
        &self.current_pose
    }

    /// Number of times [`evaluate_world_poses`](Self::evaluate_world_poses) ran.
    #[must_use]
    pub fn evaluation_count(&self) -> u64 {
        self.evaluation_count
    }

    #[inline]
    #[must_use]
    pub fn joint_index_of(&self, joint: Symbol) -> Option<usize> {
        self.joint_lookup.get(&joint).copied()
    }

    #[must_use]
    pub fn joint_index(&self, joint_path: &str) -> Option<usize> {
        self.joint_index_of(interner::get(joint_path)?)
    }

    /// Resolves joint paths to indices, dropping paths this skeleton lacks.
    #[must_use]
    pub fn map_joints<S: AsRef<str>>(&self, joint_paths: &[S]) -> Vec<usize> {
        joint_paths
            .iter()
            .filter_map(|path| self.joint_index(path.as_ref()))
            .collect()
    }

    /// Indices of the joints `mask` selects; an empty joint set selects all.
    #[must_use]
    pub fn select_joints(&self, mask: &AnimationMask) -> JointSelection {
        if !mask.has_joints() {
            return JointSelection::All;
        }
        JointSelection::Indices(
            self.joint_paths
                .iter()
                .enumerate()
                .filter(|(_, joint)| mask.contains_joint(**joint))
                .map(|(index, _)| index)
                .collect(),
        )
    }

    // ========================================================================
    // Apply
    // ========================================================================

    /// Samples `clip` into the local poses of the joints `mask` selects.
    ///
    /// Joints the clip does not animate fall back to their rest transform;
    /// joints outside the mask keep whatever they held.
    pub fn apply_clip(&mut self, time: f32, clip: &AnimationClip, mask: &AnimationMask) {
        let selection = self.select_joints(mask);
        self.apply_clip_to(time, clip, &selection);
    }

    /// Samples `clip` into an already resolved joint selection.
    pub fn apply_clip_to(&mut self, time: f32, clip: &AnimationClip, joints: &JointSelection) {
        let sample_time = time.min(clip.duration) * clip.speed;

        match joints {
            JointSelection::All => {
                for index in 0..self.joint_paths.len() {
                    self.sample_joint(sample_time, clip, index);
                }
            }
            JointSelection::Indices(indices) => {
                for &index in indices {
                    if index < self.joint_paths.len() {
                        self.sample_joint(sample_time, clip, index);
                    }
                }
            }
        }
    }

    #[inline]
    fn sample_joint(&mut self, sample_time: f32, clip: &AnimationClip, index: usize) {
        self.local_poses[index] = clip
            .pose(sample_time, self.joint_paths[index])
            .unwrap_or(self.rest_transforms[index]);
    }

    /// Sets `local = rest · rotation` for each listed joint.
    ///
    /// Joints missing from this skeleton are skipped; authoring data may name
    /// joints that only exist in other variants of a model.
    pub fn apply_procedural_overrides<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (Symbol, Mat4)>,
    {
        for (joint, rotation) in overrides {
            let Some(index) = self.joint_index_of(joint) else {
                log::trace!(
                    "Procedural override for '{}' skipped: joint not in skeleton",
                    interner::resolve(joint)
                );
                continue;
            };
            self.local_poses[index] = self.rest_transforms[index] * rotation;
        }
    }

    // ========================================================================
    // Evaluate
    // ========================================================================

    /// Chains the local poses down the hierarchy and converts them to skin space.
    ///
    /// `world[i] = world[parent] · local[i]`, then `world[i] · bind[i]⁻¹`, then
    /// (with a basis) `basis · world[i] · basis⁻¹`. The previous pose stays
    /// readable until the new one is complete.
    pub fn evaluate_world_poses(&mut self) {
        let scratch = &mut self.scratch;
        scratch.clear();

        for (index, local) in self.local_poses.iter().enumerate() {
            let world = match self.parent_indices[index] {
                Some(parent) => scratch[parent] * *local,
                None => *local,
            };
            scratch.push(world);
        }

        for (world, inverse_bind) in scratch.iter_mut().zip(&self.inverse_bind_transforms) {
            *world *= *inverse_bind;
        }

        if let Some((basis, basis_inverse)) = self.basis {
            for world in scratch.iter_mut() {
                *world = conjugate(basis, basis_inverse, *world);
            }
        }

        std::mem::swap(&mut self.current_pose, &mut self.scratch);
        self.evaluation_count += 1;
    }

    /// Samples every joint from `clip` and evaluates immediately.
    ///
    /// For a skeleton driven by a single animation source.
    pub fn update_pose(&mut self, time: f32, clip: &AnimationClip) {
        self.apply_clip_to(time, clip, &JointSelection::All);
        self.evaluate_world_poses();
    }
}

/// Parent of each joint, found by stripping the last path component.
fn parent_indices_from_paths<S: AsRef<str>>(joint_paths: &[S]) -> Vec<Option<usize>> {
    joint_paths
        .iter()
        .map(|path| {
            let (parent_path, _) = path.as_ref().rsplit_once('/')?;
            if parent_path.is_empty() {
                return None;
            }
            joint_paths.iter().position(|p| p.as_ref() == parent_path)
        })
        .collect()
}
