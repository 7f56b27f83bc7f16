use gimbal_core::interner::{self, Symbol};
use glam::Mat4;

use crate::skeleton::Skeleton;

/// Skinning palette of one mesh, fed from a skeleton's evaluated pose.
#[derive(Debug, Clone)]
pub struct Skin {
    joint_paths: Vec<Symbol>,
    palette: Vec<Mat4>,
    update_count: u64,
}

impl Skin {
    /// A skin bound to `joint_paths`, in the order the vertex weights index them.
    pub fn new<S: AsRef<str>>(joint_paths: &[S]) -> Self {
        Self {
            joint_paths: joint_paths
                .iter()
                .map(|path| interner::intern(path.as_ref()))
                .collect(),
            palette: vec![Mat4::IDENTITY; joint_paths.len()],
            update_count: 0,
        }
    }

    #[must_use]
    pub fn joint_symbols(&self) -> &[Symbol] {
        &self.joint_paths
    }

    #[must_use]
    pub fn palette(&self) -> &[Mat4] {
        &self.palette
    }

    /// How many times the palette was rebuilt.
    #[must_use]
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Copies the skeleton's current pose into the palette.
    ///
    /// Joints the skeleton lacks, or a skeleton that was never evaluated,
    /// leave identity entries.
    pub fn update_palette(&mut self, skeleton: &Skeleton) {
        let pose = skeleton.current_pose();
        for (entry, &joint) in self.palette.iter_mut().zip(&self.joint_paths) {
            *entry = skeleton
                .joint_index_of(joint)
                .and_then(|index| pose.get(index))
                .copied()
                .unwrap_or(Mat4::IDENTITY);
        }
        self.update_count += 1;
    }
}
