use std::fmt;

use gimbal_core::interner::{self, Symbol};
use rustc_hash::FxHashSet;

/// Which joints and meshes of a model a channel is allowed to touch.
///
/// Immutable once built. An empty joint set matches every joint when used as a
/// skeleton affinity test; mesh membership is always explicit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimationMask {
    joints: FxHashSet<Symbol>,
    meshes: FxHashSet<usize>,
}

impl AnimationMask {
    pub fn new<I, S>(joint_paths: I, mesh_indices: impl IntoIterator<Item = usize>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            joints: joint_paths
                .into_iter()
                .map(|path| interner::intern(path.as_ref()))
                .collect(),
            meshes: mesh_indices.into_iter().collect(),
        }
    }

    pub fn from_joints<I, S>(joint_paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(joint_paths, [])
    }

    pub fn from_meshes(mesh_indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            joints: FxHashSet::default(),
            meshes: mesh_indices.into_iter().collect(),
        }
    }

    /// A mask naming nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every listed joint plus meshes `0..mesh_count`.
    pub fn all<I, S>(joint_paths: I, mesh_count: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(joint_paths, 0..mesh_count)
    }

    /// The joints of `all_joint_paths` accepted by `predicate`.
    pub fn filtered<S, F>(all_joint_paths: &[S], mut predicate: F) -> Self
    where
        S: AsRef<str>,
        F: FnMut(&str) -> bool,
    {
        Self::from_joints(
            all_joint_paths
                .iter()
                .map(AsRef::as_ref)
                .filter(|path| predicate(path)),
        )
    }

    #[inline]
    #[must_use]
    pub fn contains_joint(&self, joint: Symbol) -> bool {
        self.joints.contains(&joint)
    }

    #[must_use]
    pub fn contains_joint_path(&self, joint_path: &str) -> bool {
        interner::get(joint_path).is_some_and(|joint| self.contains_joint(joint))
    }

    #[inline]
    #[must_use]
    pub fn contains_mesh(&self, mesh_index: usize) -> bool {
        self.meshes.contains(&mesh_index)
    }

    #[inline]
    #[must_use]
    pub fn has_joints(&self) -> bool {
        !self.joints.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn has_meshes(&self) -> bool {
        !self.meshes.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty() && self.meshes.is_empty()
    }

    /// Affinity test: does this mask cover `joint` of a skeleton?
    #[inline]
    #[must_use]
    pub fn affects_joint(&self, joint: Symbol) -> bool {
        !self.has_joints() || self.contains_joint(joint)
    }

    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    #[must_use]
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn joint_paths(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.joints.iter().map(|&joint| interner::resolve(joint))
    }

    pub fn mesh_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.meshes.iter().copied()
    }
}

impl fmt::Display for AnimationMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AnimationMask(joints: {}, meshes: {})",
            self.joints.len(),
            self.meshes.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_joint_set_affects_all_joints() {
        let mask = AnimationMask::from_joints(Vec::<&str>::new());
        let joint = interner::intern("/mask_test/any");
        assert!(mask.affects_joint(joint));
        assert!(!mask.contains_joint(joint));
        assert!(mask.is_empty());
    }

    #[test]
    fn test_named_joint_only() {
        let mask = AnimationMask::from_joints(["a"]);
        assert!(mask.affects_joint(interner::intern("a")));
        assert!(!mask.affects_joint(interner::intern("b")));
        assert!(mask.has_joints());
        assert!(!mask.has_meshes());
    }

    #[test]
    fn test_equality_ignores_order() {
        let a = AnimationMask::new(["x", "y"], [2, 1]);
        let b = AnimationMask::new(["y", "x"], [1, 2]);
        assert_eq!(a, b);
        assert_ne!(a, AnimationMask::from_joints(["x", "y"]));
    }

    #[test]
    fn test_all_and_filtered() {
        let joints = ["/gear/left", "/gear/right", "/flap"];
        let all = AnimationMask::all(joints, 3);
        assert_eq!(all.joint_count(), 3);
        assert!(all.contains_mesh(2));
        assert!(!all.contains_mesh(3));

        let gear = AnimationMask::filtered(&joints, |path| path.starts_with("/gear"));
        assert_eq!(gear.joint_count(), 2);
        assert!(gear.contains_joint_path("/gear/left"));
        assert!(!gear.contains_joint_path("/flap"));
        assert_eq!(gear.to_string(), "AnimationMask(joints: 2, meshes: 0)");
    }
}
