//! Layered animation update
//!
//! [`AnimationLayerSystem`] owns the channels of one animated entity and drives
//! them against that entity's [`AnimatedModel`] every frame in two phases:
//!
//! 1. **Apply**: advance every channel; each dirty channel writes its joints
//!    into the local-pose buffers of the skeletons its [`ChannelMapping`]
//!    names. Touched skeletons and meshes are collected.
//! 2. **Evaluate**: each touched skeleton evaluates its world poses once, then
//!    each touched mesh refreshes its skin palette and transform component.
//!
//! However many channels touch a skeleton in a frame, it is evaluated once.
//!
//! The model is never stored: every call that reads or writes it takes it by
//! reference, and calls made with a different model than the one the system
//! was created for are ignored.

use std::fmt::Write as _;

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::channel::{
    AnimationChannel, BinaryAnimationChannel, ContinuousAnimationChannel,
    ProceduralAnimationChannel,
};
use crate::layer::{AnimationLayer, ChannelGroup};
use crate::mapping::ChannelMapping;
use crate::model::{AnimatedModel, SkeletonKey};
use crate::skeleton::Skeleton;

new_key_type! {
    pub struct ChannelKey;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerSystemSettings {
    /// Per-channel trace output on every frame.
    pub debug_logging: bool,
    /// Discover a missing mapping on the fly instead of skipping the channel.
    pub allow_mapping_fallback: bool,
}

impl Default for LayerSystemSettings {
    fn default() -> Self {
        Self {
            debug_logging: false,
            allow_mapping_fallback: true,
        }
    }
}

/// How much of one skeleton a channel's mask names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkeletonCoverage {
    pub skeleton: SkeletonKey,
    pub name: Option<String>,
    pub matched_joints: usize,
    pub total_joints: usize,
}

/// Mask diagnostics for one registered channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskCoverage {
    pub channel: String,
    pub mask_joints: usize,
    pub mask_meshes: usize,
    /// Skeletons with at least one matched joint.
    pub skeletons: Vec<SkeletonCoverage>,
}

#[derive(Debug)]
struct ChannelEntry {
    channel: AnimationChannel,
    mapping: Option<ChannelMapping>,
}

#[derive(Debug)]
struct LayerEntry {
    id: String,
    channels: SmallVec<[ChannelKey; 4]>,
}

/// Frame-scoped collections, kept between frames to reuse their allocations.
#[derive(Debug, Default)]
struct FrameScratch {
    order: Vec<ChannelKey>,
    skeletons: Vec<SkeletonKey>,
    seen_skeletons: FxHashSet<SkeletonKey>,
    meshes: Vec<usize>,
    seen_meshes: FxHashSet<usize>,
    mesh_drivers: FxHashMap<usize, SkeletonKey>,
    // Last writer wins when several clip channels reach the same mesh
    mesh_times: FxHashMap<usize, f32>,
}

impl FrameScratch {
    fn clear(&mut self) {
        self.skeletons.clear();
        self.seen_skeletons.clear();
        self.meshes.clear();
        self.seen_meshes.clear();
        self.mesh_drivers.clear();
        self.mesh_times.clear();
    }

    fn touch_skeleton(&mut self, key: SkeletonKey) {
        if self.seen_skeletons.insert(key) {
            self.skeletons.push(key);
        }
    }

    fn touch_mesh(&mut self, index: usize, driver: Option<SkeletonKey>) {
        if self.seen_meshes.insert(index) {
            self.meshes.push(index);
        }
        if let Some(driver) = driver {
            self.mesh_drivers.insert(index, driver);
        }
    }
}

#[derive(Debug)]
pub struct AnimationLayerSystem {
    model_id: u32,
    settings: LayerSystemSettings,

    channels: SlotMap<ChannelKey, ChannelEntry>,
    channel_index: FxHashMap<String, ChannelKey>,
    /// Registration order, for introspection.
    channel_order: Vec<ChannelKey>,

    layers: Vec<LayerEntry>,
    layer_index: FxHashMap<String, usize>,
    /// Channels registered on their own; driven after all layers.
    loose_channels: Vec<ChannelKey>,

    single_skeleton: Option<SkeletonKey>,
    scratch: FrameScratch,
}

impl AnimationLayerSystem {
    #[must_use]
    pub fn new(model: &AnimatedModel) -> Self {
        Self::with_settings(model, LayerSystemSettings::default())
    }

    #[must_use]
    pub fn with_settings(model: &AnimatedModel, settings: LayerSystemSettings) -> Self {
        log::debug!(
            "Layer system created for model {}: {} skeletons, {} clips, {} meshes",
            model.id(),
            model.skeleton_count(),
            model.clips().len(),
            model.mesh_count()
        );

        Self {
            model_id: model.id(),
            settings,
            channels: SlotMap::with_key(),
            channel_index: FxHashMap::default(),
            channel_order: Vec::new(),
            layers: Vec::new(),
            layer_index: FxHashMap::default(),
            loose_channels: Vec::new(),
            single_skeleton: model.only_skeleton(),
            scratch: FrameScratch::default(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> LayerSystemSettings {
        self.settings
    }

    pub fn set_debug_logging(&mut self, enabled: bool) {
        self.settings.debug_logging = enabled;
    }

    #[must_use]
    pub fn model_id(&self) -> u32 {
        self.model_id
    }

    fn accepts(&self, model: &AnimatedModel) -> bool {
        if model.id() == self.model_id {
            return true;
        }
        log::warn!(
            "Layer system for model {} called with model {}; ignoring",
            self.model_id,
            model.id()
        );
        false
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Registers a standalone channel and builds its mapping.
    ///
    /// A channel with an existing id replaces the old one. Returns `None` if
    /// `model` is not this system's model.
    pub fn register_channel(
        &mut self,
        model: &AnimatedModel,
        channel: impl Into<AnimationChannel>,
    ) -> Option<ChannelKey> {
        if !self.accepts(model) {
            return None;
        }
        let key = self.insert_channel(model, channel.into());
        self.loose_channels.push(key);
        Some(key)
    }

    /// Registers a layer and all of its channels, in order.
    ///
    /// A layer with an existing id replaces the old one along with its channels.
    pub fn register_layer(&mut self, model: &AnimatedModel, layer: AnimationLayer) -> bool {
        if !self.accepts(model) {
            return false;
        }

        let (id, channels) = layer.into_parts();
        if self.layer_index.contains_key(&id) {
            log::warn!("Replacing existing layer '{id}'");
            self.unregister_layer(&id);
        }

        let mut keys: SmallVec<[ChannelKey; 4]> = channels
            .into_iter()
            .map(|channel| self.insert_channel(model, channel))
            .collect();
        // A repeated id inside the layer replaced its earlier channel
        keys.retain(|key| self.channels.contains_key(*key));

        if self.settings.debug_logging {
            log::trace!("Registered layer '{id}'");
        }
        self.layer_index.insert(id.clone(), self.layers.len());
        self.layers.push(LayerEntry { id, channels: keys });
        true
    }

    fn insert_channel(
        &mut self,
        model: &AnimatedModel,
        mut channel: AnimationChannel,
    ) -> ChannelKey {
        let id = channel.id().to_string();
        if self.channel_index.contains_key(&id) {
            log::warn!("Replacing existing channel '{id}'");
            self.unregister_channel(&id);
        }

        assign_default_clip(&mut channel, model);
        let mapping = ChannelMapping::build(&channel, model);

        if self.settings.debug_logging {
            log::trace!(
                "Registered channel '{id}' ({}): {} skeletons, {} meshes, {}",
                channel.kind(),
                mapping.targets().len(),
                mapping.meshes().len(),
                channel.mask()
            );
        }

        let key = self.channels.insert(ChannelEntry {
            channel,
            mapping: Some(mapping),
        });
        self.channel_index.insert(id, key);
        self.channel_order.push(key);
        key
    }

    /// Removes a channel from the registry and from whichever layer holds it.
    pub fn unregister_channel(&mut self, id: &str) -> Option<AnimationChannel> {
        let key = self.channel_index.remove(id)?;
        self.channel_order.retain(|k| *k != key);
        self.loose_channels.retain(|k| *k != key);
        for layer in &mut self.layers {
            layer.channels.retain(|k| *k != key);
        }

        if self.settings.debug_logging {
            log::trace!("Unregistered channel '{id}'");
        }
        self.channels.remove(key).map(|entry| entry.channel)
    }

    /// Removes a layer and every channel it holds.
    pub fn unregister_layer(&mut self, id: &str) -> bool {
        let Some(position) = self.layer_index.remove(id) else {
            return false;
        };

        let layer = self.layers.remove(position);
        for key in layer.channels {
            if let Some(entry) = self.channels.remove(key) {
                self.channel_index.remove(entry.channel.id());
            }
            self.channel_order.retain(|k| *k != key);
        }

        for (index, layer) in self.layers.iter().enumerate().skip(position) {
            self.layer_index.insert(layer.id.clone(), index);
        }
        true
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    #[must_use]
    pub fn has_channel(&self, id: &str) -> bool {
        self.channel_index.contains_key(id)
    }

    #[must_use]
    pub fn has_layer(&self, id: &str) -> bool {
        self.layer_index.contains_key(id)
    }

    #[must_use]
    pub fn channel(&self, id: &str) -> Option<&AnimationChannel> {
        let key = self.channel_index.get(id)?;
        self.channels.get(*key).map(|entry| &entry.channel)
    }

    /// Mutable access to a channel. Mutators mark it dirty as usual.
    pub fn channel_mut(&mut self, id: &str) -> Option<&mut AnimationChannel> {
        let key = self.channel_index.get(id)?;
        self.channels.get_mut(*key).map(|entry| &mut entry.channel)
    }

    pub fn binary_channel_mut(&mut self, id: &str) -> Option<&mut BinaryAnimationChannel> {
        self.channel_mut(id)?.as_binary_mut()
    }

    pub fn continuous_channel_mut(&mut self, id: &str) -> Option<&mut ContinuousAnimationChannel> {
        self.channel_mut(id)?.as_continuous_mut()
    }

    pub fn procedural_channel_mut(&mut self, id: &str) -> Option<&mut ProceduralAnimationChannel> {
        self.channel_mut(id)?.as_procedural_mut()
    }

    #[must_use]
    pub fn mapping(&self, id: &str) -> Option<&ChannelMapping> {
        let key = self.channel_index.get(id)?;
        self.channels.get(*key)?.mapping.as_ref()
    }

    #[must_use]
    pub fn layer(&self, id: &str) -> Option<LayerRef<'_>> {
        let layer = &self.layers[*self.layer_index.get(id)?];
        Some(LayerRef {
            id: &layer.id,
            keys: &layer.channels,
            channels: &self.channels,
        })
    }

    pub fn layer_mut(&mut self, id: &str) -> Option<LayerMut<'_>> {
        let layer = &self.layers[*self.layer_index.get(id)?];
        Some(LayerMut {
            id: &layer.id,
            keys: &layer.channels,
            channels: &mut self.channels,
        })
    }

    /// Channel ids in registration order.
    #[must_use]
    pub fn channel_ids(&self) -> Vec<&str> {
        self.channel_order
            .iter()
            .filter_map(|key| self.channels.get(*key))
            .map(|entry| entry.channel.id())
            .collect()
    }

    /// Layer ids in update order.
    #[must_use]
    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().map(|layer| layer.id.as_str()).collect()
    }

    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub fn has_dirty_channels(&self) -> bool {
        self.channels.values().any(|entry| entry.channel.is_dirty())
    }

    // ========================================================================
    // Mappings
    // ========================================================================

    /// Drops every mapping; until rebuilt, channels go through discovery.
    pub fn invalidate_mappings(&mut self) {
        for entry in self.channels.values_mut() {
            entry.mapping = None;
        }
    }

    /// Rebuilds every mapping after the model's skeletons, meshes or clips changed.
    pub fn rebuild_mappings(&mut self, model: &AnimatedModel) {
        if !self.accepts(model) {
            return;
        }

        self.single_skeleton = model.only_skeleton();
        for entry in self.channels.values_mut() {
            assign_default_clip(&mut entry.channel, model);
            entry.mapping = Some(ChannelMapping::build(&entry.channel, model));
        }
    }

    // ========================================================================
    // Frame Update
    // ========================================================================

    /// Advances every channel by `delta_time` and refreshes what the dirty ones touched.
    pub fn update(&mut self, model: &mut AnimatedModel, delta_time: f32) {
        if !self.accepts(model) {
            return;
        }
        self.run_frame(model, Some(delta_time));
    }

    /// Applies every channel's current state, dirty or not, and evaluates.
    ///
    /// For initialization and after scrubbing.
    pub fn force_update_all_poses(&mut self, model: &mut AnimatedModel) {
        if !self.accepts(model) {
            return;
        }
        if self.settings.debug_logging {
            log::trace!("Force updating all poses");
        }
        self.run_frame(model, None);
    }

    /// Snaps every channel to its rest position and re-poses the model.
    pub fn reset_all_channels(&mut self, model: &mut AnimatedModel) {
        if !self.accepts(model) {
            return;
        }
        for entry in self.channels.values_mut() {
            entry.channel.reset();
        }
        self.run_frame(model, None);
    }

    /// Scrubs a channel to a `[0, 1]` position.
    pub fn set_channel_value(&mut self, id: &str, normalized: f32) {
        match self.channel_mut(id) {
            Some(channel) => channel.set_normalized(normalized),
            None => log::warn!("Channel '{id}' not found"),
        }
    }

    /// One frame. `None` forces every channel through without advancing it.
    fn run_frame(&mut self, model: &mut AnimatedModel, delta_time: Option<f32>) {
        let force = delta_time.is_none();
        let debug = self.settings.debug_logging;

        self.scratch.clear();
        let mut order = std::mem::take(&mut self.scratch.order);
        order.clear();
        order.extend(self.layers.iter().flat_map(|layer| layer.channels.iter().copied()));
        order.extend(self.loose_channels.iter().copied());

        // Phase 1: apply
        for &key in &order {
            let Some(entry) = self.channels.get_mut(key) else {
                continue;
            };
            if let Some(delta_time) = delta_time {
                entry.channel.update(delta_time);
            }
            if !force && !entry.channel.is_dirty() {
                continue;
            }

            let discovered;
            let mapping = match &entry.mapping {
                Some(mapping) => mapping,
                None if self.settings.allow_mapping_fallback => {
                    log::warn!(
                        "Channel '{}' has no mapping; discovering affected skeletons",
                        entry.channel.id()
                    );
                    discovered = ChannelMapping::build(&entry.channel, model);
                    &discovered
                }
                None => {
                    log::warn!("Channel '{}' has no mapping; skipped", entry.channel.id());
                    entry.channel.clear_dirty();
                    continue;
                }
            };

            let (skeletons, _) = model.parts_mut();
            apply_channel(&entry.channel, mapping, skeletons, &mut self.scratch, debug);
            entry.channel.clear_dirty();
        }
        self.scratch.order = order;

        // Phase 2: evaluate
        let (skeletons, meshes) = model.parts_mut();
        for &key in &self.scratch.skeletons {
            if let Some(skeleton) = skeletons.get_mut(key) {
                skeleton.evaluate_world_poses();
            }
        }

        for &index in &self.scratch.meshes {
            let Some(mesh) = meshes.get_mut(index) else {
                continue;
            };

            if let (Some(transform), Some(&time)) =
                (mesh.transform.as_mut(), self.scratch.mesh_times.get(&index))
            {
                transform.set_current_transform(time);
            }

            let driver = self
                .scratch
                .mesh_drivers
                .get(&index)
                .copied()
                .or(self.single_skeleton);
            if let (Some(skin), Some(skeleton)) =
                (mesh.skin.as_mut(), driver.and_then(|key| skeletons.get(key)))
            {
                skin.update_palette(skeleton);
            }
        }

        if debug && !self.scratch.skeletons.is_empty() {
            log::trace!(
                "Frame evaluated {} skeletons, {} meshes",
                self.scratch.skeletons.len(),
                self.scratch.meshes.len()
            );
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Human-readable dump of layers and channels.
    #[must_use]
    pub fn debug_state(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "AnimationLayerSystem (model {})", self.model_id);

        let _ = writeln!(out, "  Layers ({}):", self.layers.len());
        for layer in &self.layers {
            let ids: Vec<&str> = layer
                .channels
                .iter()
                .filter_map(|key| self.channels.get(*key))
                .map(|entry| entry.channel.id())
                .collect();
            let _ = writeln!(out, "    - {}: [{}]", layer.id, ids.join(", "));
        }

        let _ = writeln!(out, "  Channels ({}):", self.channels.len());
        for key in &self.channel_order {
            let Some(entry) = self.channels.get(*key) else {
                continue;
            };
            let _ = writeln!(
                out,
                "    - {}: dirty={}, time={:.3}, mapped={}",
                entry.channel.id(),
                entry.channel.is_dirty(),
                entry.channel.animation_time(),
                entry.mapping.is_some()
            );
            let _ = writeln!(out, "      {}", entry.channel);
        }
        out
    }

    /// Per channel, how many joints of each skeleton its mask names.
    #[must_use]
    pub fn mask_coverage(&self, model: &AnimatedModel) -> Vec<MaskCoverage> {
        self.channel_order
            .iter()
            .filter_map(|key| self.channels.get(*key))
            .map(|entry| {
                let mask = entry.channel.mask();
                let skeletons = model
                    .skeletons()
                    .filter_map(|(key, skeleton)| {
                        let matched = skeleton
                            .joint_symbols()
                            .iter()
                            .filter(|joint| mask.contains_joint(**joint))
                            .count();
                        (matched > 0).then(|| SkeletonCoverage {
                            skeleton: key,
                            name: model.skeleton_name(key).map(str::to_string),
                            matched_joints: matched,
                            total_joints: skeleton.joint_count(),
                        })
                    })
                    .collect();

                MaskCoverage {
                    channel: entry.channel.id().to_string(),
                    mask_joints: mask.joint_count(),
                    mask_meshes: mask.mesh_count(),
                    skeletons,
                }
            })
            .collect()
    }
}

/// Gives an unbound clip-driven channel the model's first clip.
fn assign_default_clip(channel: &mut AnimationChannel, model: &AnimatedModel) {
    if channel.is_clip_driven()
        && channel.clip().is_none()
        && let Some(clip) = model.first_clip()
    {
        channel.set_clip(clip.clone());
    }
}

/// Writes one channel's current state into the skeletons its mapping names.
fn apply_channel(
    channel: &AnimationChannel,
    mapping: &ChannelMapping,
    skeletons: &mut SlotMap<SkeletonKey, Skeleton>,
    scratch: &mut FrameScratch,
    debug: bool,
) {
    let time = channel.animation_time();
    if debug {
        log::trace!("Applying channel '{}' at time {time:.3}", channel.id());
    }

    match channel {
        AnimationChannel::Procedural(procedural) => {
            let overrides = procedural.joint_overrides();
            for target in mapping.targets() {
                if let Some(skeleton) = skeletons.get_mut(target.skeleton) {
                    skeleton.apply_procedural_overrides(overrides.iter().copied());
                    scratch.touch_skeleton(target.skeleton);
                }
            }
        }
        AnimationChannel::Binary(_) | AnimationChannel::Continuous(_) => {
            for target in mapping.targets() {
                // Without a clip the skeleton keeps its previous pose
                let Some(clip) = &target.clip else {
                    if debug {
                        log::trace!("Channel '{}' has no clip; pose held", channel.id());
                    }
                    continue;
                };
                if let Some(skeleton) = skeletons.get_mut(target.skeleton) {
                    skeleton.apply_clip_to(time, clip, &target.joints);
                    scratch.touch_skeleton(target.skeleton);
                }
            }
        }
    }

    let records_time = channel.is_clip_driven();
    for &mesh in mapping.meshes() {
        scratch.touch_mesh(mesh, mapping.driving_skeleton(mesh));
        if records_time {
            scratch.mesh_times.insert(mesh, time);
        }
    }
}

// ============================================================================
// Registered layer views
// ============================================================================

/// Read-only view of a registered layer.
pub struct LayerRef<'a> {
    id: &'a str,
    keys: &'a [ChannelKey],
    channels: &'a SlotMap<ChannelKey, ChannelEntry>,
}

impl<'a> LayerRef<'a> {
    #[must_use]
    pub fn id(&self) -> &'a str {
        self.id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn channels(&self) -> impl Iterator<Item = &'a AnimationChannel> + 'a {
        let (keys, channels) = (self.keys, self.channels);
        keys.iter()
            .filter_map(move |key| channels.get(*key))
            .map(|entry| &entry.channel)
    }

    #[must_use]
    pub fn channel_ids(&self) -> Vec<&'a str> {
        self.channels().map(AnimationChannel::id).collect()
    }
}

/// Mutable view of a registered layer, controllable as a [`ChannelGroup`].
pub struct LayerMut<'a> {
    id: &'a str,
    keys: &'a [ChannelKey],
    channels: &'a mut SlotMap<ChannelKey, ChannelEntry>,
}

impl LayerMut<'_> {
    #[must_use]
    pub fn id(&self) -> &str {
        self.id
    }

    /// Advances only this layer's channels.
    pub fn update(&mut self, delta_time: f32) {
        self.visit_channels_mut(&mut |channel| channel.update(delta_time));
    }
}

impl ChannelGroup for LayerMut<'_> {
    fn visit_channels_mut(&mut self, f: &mut dyn FnMut(&mut AnimationChannel)) {
        for key in self.keys {
            if let Some(entry) = self.channels.get_mut(*key) {
                f(&mut entry.channel);
            }
        }
    }

    fn first_binary(&self) -> Option<&BinaryAnimationChannel> {
        self.keys
            .iter()
            .filter_map(|key| self.channels.get(*key))
            .find_map(|entry| entry.channel.as_binary())
    }
}
