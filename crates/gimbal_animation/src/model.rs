//! Model container
//!
//! Imported skeletons, clips and meshes of one animated entity. The model is
//! owned by the entity layer; the layer system only borrows it per call.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use crate::clip::AnimationClip;
use crate::skeleton::Skeleton;
use crate::skin::Skin;
use crate::transform_component::TransformComponent;

new_key_type! {
    pub struct SkeletonKey;
}

static NEXT_MODEL_ID: AtomicU32 = AtomicU32::new(1);

/// One renderable part of a model.
#[derive(Debug, Clone, Default)]
pub struct ModelMesh {
    pub name: String,
    pub skin: Option<Skin>,
    /// Non-skeletal whole-mesh animation.
    pub transform: Option<TransformComponent>,
}

impl ModelMesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            skin: None,
            transform: None,
        }
    }

    #[must_use]
    pub fn with_skin(mut self, skin: Skin) -> Self {
        self.skin = Some(skin);
        self
    }

    #[must_use]
    pub fn with_transform(mut self, transform: TransformComponent) -> Self {
        self.transform = Some(transform);
        self
    }
}

#[derive(Debug)]
pub struct AnimatedModel {
    id: u32,
    skeletons: SlotMap<SkeletonKey, Skeleton>,
    skeleton_names: FxHashMap<String, SkeletonKey>,
    clips: Vec<Arc<AnimationClip>>,
    meshes: Vec<ModelMesh>,
    mesh_skeletons: FxHashMap<usize, SkeletonKey>,
    skeleton_clips: FxHashMap<SkeletonKey, String>,
}

impl Default for AnimatedModel {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimatedModel {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed),
            skeletons: SlotMap::with_key(),
            skeleton_names: FxHashMap::default(),
            clips: Vec::new(),
            meshes: Vec::new(),
            mesh_skeletons: FxHashMap::default(),
            skeleton_clips: FxHashMap::default(),
        }
    }

    /// Process-unique id, used by the layer system to detect a foreign model.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    // ========================================================================
    // Skeletons
    // ========================================================================

    pub fn add_skeleton(&mut self, name: impl Into<String>, skeleton: Skeleton) -> SkeletonKey {
        let key = self.skeletons.insert(skeleton);
        self.skeleton_names.insert(name.into(), key);
        key
    }

    #[must_use]
    pub fn skeleton(&self, key: SkeletonKey) -> Option<&Skeleton> {
        self.skeletons.get(key)
    }

    pub fn skeleton_mut(&mut self, key: SkeletonKey) -> Option<&mut Skeleton> {
        self.skeletons.get_mut(key)
    }

    #[must_use]
    pub fn skeleton_key(&self, name: &str) -> Option<SkeletonKey> {
        self.skeleton_names.get(name).copied()
    }

    #[must_use]
    pub fn skeleton_name(&self, key: SkeletonKey) -> Option<&str> {
        self.skeleton_names
            .iter()
            .find(|(_, k)| **k == key)
            .map(|(name, _)| name.as_str())
    }

    /// Skeletons in insertion order.
    pub fn skeletons(&self) -> impl Iterator<Item = (SkeletonKey, &Skeleton)> {
        self.skeletons.iter()
    }

    #[must_use]
    pub fn skeleton_count(&self) -> usize {
        self.skeletons.len()
    }

    /// The skeleton when the model has exactly one.
    #[must_use]
    pub fn only_skeleton(&self) -> Option<SkeletonKey> {
        if self.skeletons.len() == 1 {
            self.skeletons.keys().next()
        } else {
            None
        }
    }

    // ========================================================================
    // Clips
    // ========================================================================

    pub fn add_clip(&mut self, clip: AnimationClip) -> Arc<AnimationClip> {
        let clip = Arc::new(clip);
        self.clips.push(Arc::clone(&clip));
        clip
    }

    #[must_use]
    pub fn clip(&self, name: &str) -> Option<&Arc<AnimationClip>> {
        self.clips.iter().find(|clip| clip.name == name)
    }

    #[must_use]
    pub fn clips(&self) -> &[Arc<AnimationClip>] {
        &self.clips
    }

    /// Default clip for channels registered without one.
    #[must_use]
    pub fn first_clip(&self) -> Option<&Arc<AnimationClip>> {
        self.clips.first()
    }

    /// Names the clip that drives `skeleton` when a channel has none of its own.
    pub fn set_skeleton_clip(&mut self, skeleton: SkeletonKey, clip_name: impl Into<String>) {
        self.skeleton_clips.insert(skeleton, clip_name.into());
    }

    #[must_use]
    pub fn skeleton_clip(&self, skeleton: SkeletonKey) -> Option<&Arc<AnimationClip>> {
        self.clip(self.skeleton_clips.get(&skeleton)?)
    }

    // ========================================================================
    // Meshes
    // ========================================================================

    pub fn add_mesh(&mut self, mesh: ModelMesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    #[must_use]
    pub fn mesh(&self, index: usize) -> Option<&ModelMesh> {
        self.meshes.get(index)
    }

    pub fn mesh_mut(&mut self, index: usize) -> Option<&mut ModelMesh> {
        self.meshes.get_mut(index)
    }

    #[must_use]
    pub fn meshes(&self) -> &[ModelMesh] {
        &self.meshes
    }

    #[must_use]
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn bind_mesh_to_skeleton(&mut self, mesh: usize, skeleton: SkeletonKey) {
        self.mesh_skeletons.insert(mesh, skeleton);
    }

    /// Explicit skeleton association of `mesh`, if any.
    #[must_use]
    pub fn mesh_skeleton(&self, mesh: usize) -> Option<SkeletonKey> {
        self.mesh_skeletons.get(&mesh).copied()
    }

    /// Skeleton that drives `mesh`'s skin: the explicit association, else the
    /// model's only skeleton.
    #[must_use]
    pub fn driving_skeleton(&self, mesh: usize) -> Option<SkeletonKey> {
        self.mesh_skeleton(mesh).or_else(|| self.only_skeleton())
    }

    /// Borrows skeletons and meshes mutably at the same time.
    pub(crate) fn parts_mut(&mut self) -> (&mut SlotMap<SkeletonKey, Skeleton>, &mut [ModelMesh]) {
        (&mut self.skeletons, &mut self.meshes)
    }
}
