use std::sync::Arc;

use glam::Affine3A;
use slotmap::new_key_type;

use crate::resources::binding::DescriptorSet;
use crate::resources::instancing::InstancedAttributeBlock;
use crate::resources::material::{MacroPatch, Pass, ShaderVariant, VertexAttribute};
use crate::resources::mesh::{DrawInfo, SubMeshRef};

new_key_type! {
    pub struct SubUnitKey;
}

/// One drawable part of a renderable: a sub-mesh drawn with a material's passes.
///
/// The sub-unit owns its descriptor sets and its per-instance attribute block.
/// Its shader variant is resolved lazily from the first pass and the current
/// macro patches, and dropped whenever either changes.
#[derive(Debug)]
pub struct SubUnit {
    mesh: SubMeshRef,
    passes: Vec<Arc<Pass>>,
    patches: Vec<MacroPatch>,

    descriptor_set: DescriptorSet,
    world_bound_descriptor_set: Option<DescriptorSet>,

    instanced_block: InstancedAttributeBlock,
    instanced_world_matrix_index: Option<usize>,

    variant: Option<ShaderVariant>,
    draw_info: DrawInfo,
    refresh_count: u64,
}

impl SubUnit {
    #[must_use]
    pub fn new(mesh: SubMeshRef, passes: Vec<Arc<Pass>>, patches: Vec<MacroPatch>) -> Self {
        let draw_info = DrawInfo::from(&*mesh.read());
        let world_bound_descriptor_set = Self::wants_world_bound(&passes).then(DescriptorSet::new);
        Self {
            mesh,
            passes,
            patches,
            descriptor_set: DescriptorSet::new(),
            world_bound_descriptor_set,
            instanced_block: InstancedAttributeBlock::default(),
            instanced_world_matrix_index: None,
            variant: None,
            draw_info,
            refresh_count: 0,
        }
    }

    fn wants_world_bound(passes: &[Arc<Pass>]) -> bool {
        passes.iter().any(|p| p.uses_world_bound())
    }

    /// Per-frame refresh: commits staged descriptor changes.
    pub fn update(&mut self) {
        self.descriptor_set.update();
        if let Some(set) = self.world_bound_descriptor_set.as_mut() {
            set.update();
        }
        self.refresh_count += 1;
    }

    pub fn set_mesh(&mut self, mesh: SubMeshRef) {
        self.draw_info = DrawInfo::from(&*mesh.read());
        self.mesh = mesh;
    }

    pub fn set_passes(&mut self, passes: Vec<Arc<Pass>>) {
        if Self::wants_world_bound(&passes) {
            self.world_bound_descriptor_set.get_or_insert_with(DescriptorSet::new);
        } else {
            self.world_bound_descriptor_set = None;
        }
        self.passes = passes;
        self.variant = None;
    }

    pub fn on_pipeline_state_changed(&mut self) {
        self.variant = None;
    }

    pub fn on_macro_patches_changed(&mut self, patches: Vec<MacroPatch>) {
        if patches != self.patches {
            self.patches = patches;
            self.variant = None;
        }
    }

    pub fn on_geometry_changed(&mut self) {
        self.draw_info = DrawInfo::from(&*self.mesh.read());
    }

    /// Shader variant of the first pass under the current patches.
    pub fn active_variant(&mut self) -> Option<&ShaderVariant> {
        if self.variant.is_none() {
            let pass = self.passes.first()?;
            self.variant = Some(pass.shader_variant(&self.patches));
        }
        self.variant.as_ref()
    }

    /// Rebuilds the instance attribute block. With `instancing` off the block is
    /// cleared and the sub-unit falls back to the shared uniform buffer.
    pub fn update_instanced_attributes(&mut self, attributes: &[VertexAttribute], instancing: bool) {
        self.instanced_block = if instancing {
            InstancedAttributeBlock::from_attributes(attributes)
        } else {
            InstancedAttributeBlock::default()
        };
        self.instanced_world_matrix_index = self.instanced_block.world_matrix_index();
    }

    /// `Some` when this sub-unit takes the per-instance path this frame.
    #[inline]
    #[must_use]
    pub fn instanced_world_matrix_index(&self) -> Option<usize> {
        self.instanced_world_matrix_index
    }

    pub fn write_instanced_world_matrix(&mut self, world: &Affine3A) {
        if let Some(index) = self.instanced_world_matrix_index {
            self.instanced_block.write_world_matrix(index, world);
        }
    }

    pub fn set_instanced_attribute(&mut self, name: &str, values: &[f32]) -> bool {
        self.instanced_block.set(name, values)
    }

    #[inline]
    #[must_use]
    pub fn instanced_block(&self) -> &InstancedAttributeBlock {
        &self.instanced_block
    }

    #[inline]
    #[must_use]
    pub fn descriptor_set(&self) -> &DescriptorSet {
        &self.descriptor_set
    }

    #[inline]
    pub fn descriptor_set_mut(&mut self) -> &mut DescriptorSet {
        &mut self.descriptor_set
    }

    #[inline]
    #[must_use]
    pub fn world_bound_descriptor_set(&self) -> Option<&DescriptorSet> {
        self.world_bound_descriptor_set.as_ref()
    }

    #[inline]
    pub fn world_bound_descriptor_set_mut(&mut self) -> Option<&mut DescriptorSet> {
        self.world_bound_descriptor_set.as_mut()
    }

    #[inline]
    #[must_use]
    pub fn patches(&self) -> &[MacroPatch] {
        &self.patches
    }

    #[inline]
    #[must_use]
    pub fn passes(&self) -> &[Arc<Pass>] {
        &self.passes
    }

    #[inline]
    #[must_use]
    pub fn mesh(&self) -> &SubMeshRef {
        &self.mesh
    }

    #[inline]
    #[must_use]
    pub fn draw_info(&self) -> DrawInfo {
        self.draw_info
    }

    #[inline]
    #[must_use]
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count
    }
}
