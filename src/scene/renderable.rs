//! Renderable Unit
//!
//! A [`RenderableUnit`] keeps the GPU-facing state of one scene object in step
//! with its transform node: world-space bounds, the shared per-object uniform
//! buffer, per-instance attributes, light-probe SH data and descriptor
//! bindings of its sub-units.
//!
//! # Frame Order
//!
//! Each frame the owner calls, in order:
//! 1. [`RenderableUnit::update_transform`]
//! 2. [`RenderableUnit::update_uniforms`]
//! 3. [`RenderableUnit::update_spatial_index`]
//!
//! Work is driven by two dirty flags. `local_dirty` is raised whenever uniform
//! data is stale and is only consumed by `update_uniforms`; `world_bounds_dirty`
//! is raised when world bounds move and is consumed by the spatial index
//! update. A static object therefore costs one version comparison and the
//! per-sub-unit refresh.
//!
//! # Host Delegation
//!
//! Units built with [`SyncStrategy::HostDelegated`] forward delegable
//! operations to the host as [`HostEvent`]s and skip the native path. The host
//! runs the native behaviour explicitly through [`RenderableUnit::native`].

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU32, Ordering};

use bitflags::bitflags;
use bytemuck::bytes_of;
use glam::{Affine3A, Mat4, Vec3, Vec4};
use slotmap::SlotMap;

use crate::errors::Result;
use crate::resources::binding::{SamplerInfo, TextureRef};
use crate::resources::bounds::{Aabb, BoundingVolume};
use crate::resources::buffer::{BufferDesc, BufferId, GpuBuffer};
use crate::resources::light_probe::{pack_sh_uniforms, reduce_ringing};
use crate::resources::material::{MacroPatch, Material, macros};
use crate::resources::mesh::SubMeshRef;
use crate::resources::uniforms::{LocalUniforms, ShUniforms, WorldBoundUniforms, binding};
use crate::scene::node::{Node, NodeRef};
use crate::scene::spatial::SpatialIndex;
use crate::scene::strategy::{HostEvent, SyncStrategy};
use crate::scene::sub_unit::{SubUnit, SubUnitKey};
use crate::settings::SyncContext;

static NEXT_UNIT_ID: AtomicU32 = AtomicU32::new(1);

const LOCAL_BUFFER_LABEL: &str = "ModelLocalUniforms";
const SH_BUFFER_LABEL: &str = "ModelShUniforms";
const WORLD_BOUND_BUFFER_LABEL: &str = "ModelWorldBoundUniforms";

bitflags! {
    /// Visibility layers tested against camera masks.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Layers: u32 {
        const IGNORE_RAYCAST = 1 << 20;
        const GIZMOS         = 1 << 21;
        const EDITOR         = 1 << 22;
        const UI_3D          = 1 << 23;
        const SCENE_GIZMO    = 1 << 24;
        const UI_2D          = 1 << 25;
        const PROFILER       = 1 << 28;
        const DEFAULT        = 1 << 30;
    }
}

/// Work counters, mostly useful to tests and profiling overlays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Local-to-world bounds transforms.
    pub bounds_transforms: u64,
    /// Flushes of the shared per-object buffer.
    pub local_uploads: u64,
    /// World matrices written into instance attribute blocks.
    pub instance_writes: u64,
    /// Light-probe field queries.
    pub probe_samples: u64,
    /// Flushes of the world-bound buffer.
    pub world_bound_uploads: u64,
    /// Operations forwarded to the host.
    pub host_events: u64,
}

#[derive(Debug)]
pub struct RenderableUnit {
    id: u32,
    context: Rc<SyncContext>,
    strategy: SyncStrategy,

    transform: Weak<RefCell<Node>>,
    synced_node_version: Option<u64>,

    inited: bool,
    pub enabled: bool,
    pub cast_shadow: bool,
    pub visibility: Layers,
    pub dynamic_batching: bool,
    receive_shadow: bool,
    use_light_probe: bool,

    local_bounds: Option<Aabb>,
    world_bounds: Option<Aabb>,
    local_dirty: bool,
    world_bounds_dirty: bool,

    sub_units: SlotMap<SubUnitKey, SubUnit>,
    slots: Vec<Option<SubUnitKey>>,

    local_buffer: Option<Box<dyn GpuBuffer>>,
    sh_buffer: Option<Box<dyn GpuBuffer>>,
    world_bound_buffer: Option<Box<dyn GpuBuffer>>,

    lightmap: Option<TextureRef>,
    lightmap_uv_param: Vec4,
    shadow_bias: f32,
    shadow_normal_bias: f32,

    last_probe_center: Option<Vec3>,
    tetrahedron_hint: Option<u32>,

    update_stamp: u32,
    stats: SyncStats,
}

impl RenderableUnit {
    /// Creates an uninitialized unit. The strategy is fixed for its lifetime.
    #[must_use]
    pub fn new(context: Rc<SyncContext>, strategy: SyncStrategy) -> Self {
        Self {
            id: NEXT_UNIT_ID.fetch_add(1, Ordering::Relaxed),
            context,
            strategy,
            transform: Weak::new(),
            synced_node_version: None,
            inited: false,
            enabled: false,
            cast_shadow: false,
            visibility: Layers::empty(),
            dynamic_batching: false,
            receive_shadow: false,
            use_light_probe: false,
            local_bounds: None,
            world_bounds: None,
            local_dirty: true,
            world_bounds_dirty: false,
            sub_units: SlotMap::with_key(),
            slots: Vec::new(),
            local_buffer: None,
            sh_buffer: None,
            world_bound_buffer: None,
            lightmap: None,
            lightmap_uv_param: Vec4::ZERO,
            shadow_bias: 0.0,
            shadow_normal_bias: 0.0,
            last_probe_center: None,
            tetrahedron_hint: None,
            update_stamp: 0,
            stats: SyncStats::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Applies default flags. Only the first call after creation or
    /// [`destroy`](Self::destroy) has an effect.
    pub fn initialize(&mut self) {
        if self.inited {
            return;
        }
        self.receive_shadow = true;
        self.cast_shadow = false;
        self.enabled = true;
        self.visibility = Layers::empty();
        self.inited = true;
        log::debug!("RenderableUnit {} initialized", self.id);
    }

    /// Releases sub-units and buffers and returns to the uninitialized state.
    pub fn destroy(&mut self) {
        self.release_buffers();
        self.sub_units.clear();
        self.slots.clear();
        self.local_bounds = None;
        self.world_bounds = None;
        self.transform = Weak::new();
        self.synced_node_version = None;
        self.lightmap = None;
        self.last_probe_center = None;
        self.tetrahedron_hint = None;
        self.world_bounds_dirty = false;
        self.local_dirty = true;
        self.dynamic_batching = false;
        self.inited = false;
        log::debug!("RenderableUnit {} destroyed", self.id);
    }

    fn release_buffers(&mut self) {
        let buffers = [
            self.local_buffer.take(),
            self.sh_buffer.take(),
            self.world_bound_buffer.take(),
        ];
        for mut buffer in buffers.into_iter().flatten() {
            buffer.destroy();
        }
    }

    #[inline]
    #[must_use]
    pub fn is_inited(&self) -> bool {
        self.inited
    }

    // ========================================================================
    // Transform & bounds
    // ========================================================================

    pub fn attach_transform(&mut self, node: &NodeRef) {
        self.transform = Rc::downgrade(node);
        self.synced_node_version = None;
        self.local_dirty = true;
    }

    #[must_use]
    pub fn transform(&self) -> Option<NodeRef> {
        self.transform.upgrade()
    }

    /// Native entry points for host-delegated units.
    pub fn native(&mut self) -> NativeSync<'_> {
        NativeSync { unit: self }
    }

    fn delegate(&mut self, event: HostEvent) -> bool {
        let delegated = self.strategy.delegate(event);
        if delegated {
            self.stats.host_events += 1;
            log::trace!("RenderableUnit {} delegated {:?}", self.id, event);
        }
        delegated
    }

    /// Picks up node changes: refreshes the world matrix, raises `local_dirty`
    /// and re-derives world bounds. Does nothing when the node is unchanged
    /// since the last sync.
    pub fn update_transform(&mut self, stamp: u32) {
        if self.delegate(HostEvent::UpdateTransform { stamp }) {
            return;
        }
        self.native_update_transform();
    }

    fn native_update_transform(&mut self) {
        let Some(node_ref) = self.transform.upgrade() else {
            return;
        };
        let stale = {
            let node = node_ref.borrow();
            node.is_dirty() || self.synced_node_version != Some(node.world_version())
        };
        if !stale {
            return;
        }
        if let Some((world, _)) = self.sync_node() {
            self.local_dirty = true;
            self.transform_bounds(&world);
        }
    }

    /// Recomputes world bounds from the current world matrix even when the node
    /// did not move, and schedules a uniform upload.
    pub fn update_world_bound(&mut self) {
        self.local_dirty = true;
        if let Some((world, _)) = self.sync_node() {
            self.transform_bounds(&world);
        }
    }

    /// Brings the node up to date and records its version. Returns its world
    /// matrix and whether it changed since the previous sync.
    fn sync_node(&mut self) -> Option<(Affine3A, bool)> {
        let node_ref = self.transform.upgrade()?;
        let mut node = node_ref.borrow_mut();
        node.update_world_transform();

        let version = node.world_version();
        let moved = self.synced_node_version != Some(version);
        self.synced_node_version = Some(version);
        Some((*node.world_matrix(), moved))
    }

    fn current_world_matrix(&self) -> Option<Affine3A> {
        let node_ref = self.transform.upgrade()?;
        let world = *node_ref.borrow().world_matrix();
        Some(world)
    }

    fn transform_bounds(&mut self, world: &Affine3A) {
        if let (Some(local), Some(world_bounds)) = (self.local_bounds.as_ref(), self.world_bounds.as_mut())
            && local.is_valid()
        {
            local.transform(world, world_bounds);
            self.world_bounds_dirty = true;
            self.stats.bounds_transforms += 1;
        }
    }

    /// Rebuilds local bounds from corners computed elsewhere (e.g. by a skinning
    /// evaluator) and re-derives world bounds through the current world matrix.
    pub fn update_world_bounds_externally(&mut self, min: Vec3, max: Vec3) {
        let Some(world) = self.current_world_matrix() else {
            return;
        };
        if self.local_bounds.is_none() || self.world_bounds.is_none() {
            return;
        }
        self.local_bounds = Some(Aabb::from_corners(min, max));
        self.transform_bounds(&world);
    }

    /// Writes precomputed world bounds, bypassing local bounds.
    pub fn update_world_bounds_directly(&mut self, center: Vec3, half_extents: Vec3) {
        self.world_bounds = Some(Aabb::new(center, half_extents));
        self.world_bounds_dirty = true;
    }

    /// Creates local and world bounds from model-space corners. Missing corners
    /// leave the bounds untouched.
    pub fn create_bounding_shape(&mut self, min: Option<Vec3>, max: Option<Vec3>) {
        let (Some(min), Some(max)) = (min, max) else {
            return;
        };
        let local = Aabb::from_corners(min, max);
        let mut world = local;
        if let Some(matrix) = self.current_world_matrix() {
            local.transform(&matrix, &mut world);
        }
        self.local_bounds = Some(local);
        self.world_bounds = Some(world);
        self.world_bounds_dirty = true;
    }

    /// Hands the world bounds to `index` if they moved since the last call.
    /// Returns whether the index was notified.
    pub fn update_spatial_index(&mut self, index: &mut dyn SpatialIndex) -> bool {
        if !self.world_bounds_dirty {
            return false;
        }
        self.world_bounds_dirty = false;
        match &self.world_bounds {
            Some(bounds) => {
                index.update(self.id, bounds);
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Uniform upload
    // ========================================================================

    /// Per-frame uniform synchronization.
    ///
    /// Sub-units are refreshed and light-probe data is resampled every frame.
    /// The world matrix is only uploaded when `local_dirty` is set: instanced
    /// sub-units receive it in their attribute block, the others share one
    /// uniform buffer write.
    pub fn update_uniforms(&mut self, stamp: u32) {
        if self.delegate(HostEvent::UpdateUniforms { stamp }) {
            return;
        }
        self.native_update_uniforms(stamp);
    }

    fn native_update_uniforms(&mut self, stamp: u32) {
        for sub_unit in self.sub_units.values_mut() {
            sub_unit.update();
        }
        self.update_stamp = stamp;
        self.refresh_probe_data();

        if !self.local_dirty {
            return;
        }

        let Some((world, moved)) = self.sync_node() else {
            log::trace!("RenderableUnit {} has no transform, upload deferred", self.id);
            return;
        };
        self.local_dirty = false;
        if moved {
            self.transform_bounds(&world);
        }

        let mut needs_shared = false;
        for key in self.slots.iter().flatten() {
            let Some(sub_unit) = self.sub_units.get_mut(*key) else {
                continue;
            };
            if sub_unit.instanced_world_matrix_index().is_some() {
                sub_unit.write_instanced_world_matrix(&world);
                self.stats.instance_writes += 1;
            } else {
                needs_shared = true;
            }
        }

        if needs_shared {
            self.upload_local_uniforms(&world);
        }
    }

    fn upload_local_uniforms(&mut self, world: &Affine3A) {
        let Some(buffer) = self.local_buffer.as_mut() else {
            log::warn!("RenderableUnit {}: shared uniform buffer missing, skipping upload", self.id);
            self.local_dirty = true;
            return;
        };

        let world = Mat4::from(*world);
        let world_inverse_transpose = world.inverse().transpose();
        let shadow_bias = Vec4::new(self.shadow_bias, self.shadow_normal_bias, 0.0, 0.0);

        buffer.write(LocalUniforms::WORLD_OFFSET, bytes_of(&world));
        buffer.write(LocalUniforms::WORLD_IT_OFFSET, bytes_of(&world_inverse_transpose));
        buffer.write(LocalUniforms::LIGHTMAP_UV_PARAM_OFFSET, bytes_of(&self.lightmap_uv_param));
        buffer.write(LocalUniforms::SHADOW_BIAS_OFFSET, bytes_of(&shadow_bias));
        buffer.flush();
        self.stats.local_uploads += 1;

        if self.context.settings.occlusion_query {
            self.update_world_bound_uniforms();
        }
    }

    /// Uploads world bounds for occlusion culling. Without bounds a unit box at
    /// the origin is written.
    pub fn update_world_bound_uniforms(&mut self) {
        let Some(buffer) = self.world_bound_buffer.as_mut() else {
            return;
        };
        let data = match &self.world_bounds {
            Some(bounds) => WorldBoundUniforms {
                center: bounds.center.extend(0.0),
                half_extents: bounds.half_extents.extend(1.0),
            },
            None => WorldBoundUniforms::default(),
        };
        buffer.write(0, bytes_of(&data));
        buffer.flush();
        self.stats.world_bound_uploads += 1;
    }

    /// Resamples SH coefficients when the world bound center moved.
    ///
    /// In editor mode the center cache is bypassed and every call samples.
    pub fn refresh_probe_data(&mut self) {
        if !self.use_light_probe {
            return;
        }
        let context = Rc::clone(&self.context);
        let Some(field) = context.light_probes() else {
            return;
        };
        if !field.is_available() {
            return;
        }
        let Some(center) = self.world_bounds.as_ref().map(BoundingVolume::center) else {
            return;
        };
        if !context.settings.editor_mode
            && self.last_probe_center.is_some_and(|last| same_bits(last, center))
        {
            return;
        }

        let (mut coefficients, hint) = field.sample_coefficients(center, self.tetrahedron_hint);
        reduce_ringing(&mut coefficients, field.reduce_ringing());
        self.last_probe_center = Some(center);
        self.tetrahedron_hint = hint;
        self.stats.probe_samples += 1;

        if let Some(buffer) = self.sh_buffer.as_mut() {
            let packed = pack_sh_uniforms(&coefficients);
            buffer.write(ShUniforms::LINEAR_CONST_R_OFFSET, bytes_of(&packed));
            buffer.flush();
        }
    }

    // ========================================================================
    // Sub-units & bindings
    // ========================================================================

    fn slot(&self, index: usize) -> Option<SubUnitKey> {
        self.slots.get(index).copied().flatten()
    }

    /// Creates (or re-creates) the sub-unit at `index`, growing the slot list
    /// with empty slots as needed, then rebuilds its bindings.
    pub fn init_sub_unit(&mut self, index: usize, mesh: SubMeshRef, material: &Material) -> Result<()> {
        self.initialize();
        if self.slots.len() <= index {
            self.slots.resize(index + 1, None);
        }

        let patches = self.macro_patches(index);
        let passes = material.passes().to_vec();
        match self.slot(index).and_then(|key| self.sub_units.get_mut(key)) {
            Some(sub_unit) => {
                sub_unit.set_mesh(mesh);
                sub_unit.set_passes(passes);
                sub_unit.on_macro_patches_changed(patches);
            }
            None => {
                let key = self.sub_units.insert(SubUnit::new(mesh, passes, patches));
                self.slots[index] = Some(key);
            }
        }

        self.rebuild_bindings(index)?;
        if let Some(texture) = self.lightmap {
            self.bind_lightmap(index, texture);
        }
        Ok(())
    }

    pub fn set_sub_unit_mesh(&mut self, index: usize, mesh: SubMeshRef) {
        if let Some(sub_unit) = self.slot(index).and_then(|key| self.sub_units.get_mut(key)) {
            sub_unit.set_mesh(mesh);
        }
    }

    pub fn set_sub_unit_material(&mut self, index: usize, material: &Material) -> Result<()> {
        let Some(sub_unit) = self.slot(index).and_then(|key| self.sub_units.get_mut(key)) else {
            return Ok(());
        };
        sub_unit.set_passes(material.passes().to_vec());
        self.rebuild_bindings(index)
    }

    /// Re-binds buffers into the sub-unit at `index` and re-derives its
    /// instanced attributes. An empty or out-of-range slot is ignored.
    ///
    /// Buffers are allocated on first use; allocation failures propagate.
    pub fn rebuild_bindings(&mut self, index: usize) -> Result<()> {
        if self.slot(index).is_none() {
            log::debug!("RenderableUnit {}: no sub-unit at {index}, bindings skipped", self.id);
            return Ok(());
        }

        ensure_buffer(&self.context, &mut self.local_buffer, LOCAL_BUFFER_LABEL, LocalUniforms::SIZE)?;
        if !self.delegate(HostEvent::UpdateLocalDescriptors { sub_unit: index }) {
            self.bind_local_descriptors(index);
        }

        if self.use_light_probe || self.context.settings.editor_mode {
            // A fresh SH buffer holds no coefficients yet, resample on the next refresh.
            if ensure_buffer(&self.context, &mut self.sh_buffer, SH_BUFFER_LABEL, ShUniforms::SIZE)? {
                self.last_probe_center = None;
            }
            if !self.delegate(HostEvent::UpdateShDescriptors { sub_unit: index }) {
                self.bind_sh_descriptors(index);
            }
        }

        ensure_buffer(
            &self.context,
            &mut self.world_bound_buffer,
            WORLD_BOUND_BUFFER_LABEL,
            WorldBoundUniforms::SIZE,
        )?;
        if !self.delegate(HostEvent::UpdateWorldBoundDescriptors { sub_unit: index }) {
            self.bind_world_bound_descriptors(index);
        }

        self.update_instanced_attributes(index);
        Ok(())
    }

    fn bind_local_descriptors(&mut self, index: usize) {
        let Some(id) = self.local_buffer.as_ref().map(|b| b.id()) else {
            return;
        };
        if let Some(sub_unit) = self.slot(index).and_then(|key| self.sub_units.get_mut(key)) {
            sub_unit.descriptor_set_mut().bind_buffer(binding::LOCAL, id);
        }
    }

    fn bind_sh_descriptors(&mut self, index: usize) {
        let Some(id) = self.sh_buffer.as_ref().map(|b| b.id()) else {
            return;
        };
        if let Some(sub_unit) = self.slot(index).and_then(|key| self.sub_units.get_mut(key)) {
            sub_unit.descriptor_set_mut().bind_buffer(binding::SH, id);
        }
    }

    fn bind_world_bound_descriptors(&mut self, index: usize) {
        let Some(id) = self.world_bound_buffer.as_ref().map(|b| b.id()) else {
            return;
        };
        if let Some(set) = self
            .slot(index)
            .and_then(|key| self.sub_units.get_mut(key))
            .and_then(SubUnit::world_bound_descriptor_set_mut)
        {
            set.bind_buffer(binding::WORLD_BOUND, id);
        }
    }

    /// Re-derives the instanced attribute layout of the sub-unit at `index`
    /// from its active shader variant, and raises `local_dirty` so the next
    /// upload fills it.
    pub fn update_instanced_attributes(&mut self, index: usize) {
        if self.delegate(HostEvent::UpdateInstancedAttributes { sub_unit: index }) {
            return;
        }
        self.native_update_instanced_attributes(index);
    }

    fn native_update_instanced_attributes(&mut self, index: usize) {
        let instancing = self.context.settings.instancing;
        let Some(sub_unit) = self.slot(index).and_then(|key| self.sub_units.get_mut(key)) else {
            return;
        };
        let attributes = sub_unit
            .active_variant()
            .map(|variant| variant.attributes.clone())
            .unwrap_or_default();
        sub_unit.update_instanced_attributes(&attributes, instancing);
        self.local_dirty = true;
    }

    /// Macro patches for the sub-unit at `index`.
    pub fn macro_patches(&mut self, index: usize) -> Vec<MacroPatch> {
        match self.strategy.host_macro_patches(index) {
            Some(patches) => patches,
            None => self.native_macro_patches(),
        }
    }

    fn native_macro_patches(&self) -> Vec<MacroPatch> {
        let mut patches = Vec::new();
        if self.receive_shadow {
            patches.push(MacroPatch::new(macros::RECEIVE_SHADOW, true));
        }
        if self.use_light_probe {
            patches.push(MacroPatch::new(macros::USE_LIGHT_PROBE, true));
        }
        patches
    }

    /// Pushes fresh macro patches to every sub-unit.
    pub fn on_macro_patches_state_changed(&mut self) {
        self.push_macro_patches();
        for index in 0..self.slots.len() {
            if self.slot(index).is_some() {
                self.update_instanced_attributes(index);
            }
        }
    }

    fn push_macro_patches(&mut self) {
        for index in 0..self.slots.len() {
            let Some(key) = self.slot(index) else {
                continue;
            };
            let patches = self.macro_patches(index);
            if let Some(sub_unit) = self.sub_units.get_mut(key) {
                sub_unit.on_macro_patches_changed(patches);
            }
        }
    }

    pub fn on_global_pipeline_state_changed(&mut self) {
        for sub_unit in self.sub_units.values_mut() {
            sub_unit.on_pipeline_state_changed();
        }
        for index in 0..self.slots.len() {
            self.update_instanced_attributes(index);
        }
    }

    pub fn on_geometry_changed(&mut self) {
        for sub_unit in self.sub_units.values_mut() {
            sub_unit.on_geometry_changed();
        }
    }

    // ========================================================================
    // Shading state
    // ========================================================================

    pub fn set_receive_shadow(&mut self, receive_shadow: bool) {
        if self.receive_shadow != receive_shadow {
            self.receive_shadow = receive_shadow;
            self.on_macro_patches_state_changed();
        }
    }

    /// Toggles light-probe participation. Enabling it allocates and binds the
    /// SH buffer for every sub-unit.
    pub fn set_use_light_probe(&mut self, use_light_probe: bool) -> Result<()> {
        if self.use_light_probe == use_light_probe {
            return Ok(());
        }
        self.use_light_probe = use_light_probe;
        self.last_probe_center = None;
        if !use_light_probe {
            self.on_macro_patches_state_changed();
            return Ok(());
        }
        // Rebuilding the bindings re-derives instanced attributes as well.
        self.push_macro_patches();
        for index in 0..self.slots.len() {
            self.rebuild_bindings(index)?;
        }
        Ok(())
    }

    /// Stores lightmap state without touching bindings.
    pub fn init_lightmap(&mut self, texture: Option<TextureRef>, uv_param: Vec4) {
        self.lightmap = texture;
        self.lightmap_uv_param = uv_param;
        self.local_dirty = true;
    }

    /// Assigns a lightmap and binds it into every sub-unit. `None` binds the
    /// built-in empty texture.
    pub fn update_lightmap(&mut self, texture: Option<TextureRef>, uv_param: Vec4) {
        self.init_lightmap(texture, uv_param);
        let texture = texture.unwrap_or(TextureRef::EMPTY);
        for index in 0..self.slots.len() {
            self.bind_lightmap(index, texture);
        }
    }

    fn bind_lightmap(&mut self, index: usize, texture: TextureRef) {
        let sampler = SamplerInfo::for_lightmap(&texture);
        if let Some(sub_unit) = self.slot(index).and_then(|key| self.sub_units.get_mut(key)) {
            sub_unit
                .descriptor_set_mut()
                .bind_texture(binding::LIGHTMAP_TEXTURE, texture, sampler);
        }
    }

    pub fn set_shadow_bias(&mut self, bias: f32, normal_bias: f32) {
        self.shadow_bias = bias;
        self.shadow_normal_bias = normal_bias;
        self.local_dirty = true;
    }

    /// Writes a named per-instance attribute on every sub-unit that has it.
    pub fn set_instanced_attribute(&mut self, name: &str, values: &[f32]) {
        for sub_unit in self.sub_units.values_mut() {
            sub_unit.set_instanced_attribute(name, values);
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn local_dirty(&self) -> bool {
        self.local_dirty
    }

    #[inline]
    #[must_use]
    pub fn world_bounds_dirty(&self) -> bool {
        self.world_bounds_dirty
    }

    #[inline]
    #[must_use]
    pub fn local_bounds(&self) -> Option<&Aabb> {
        self.local_bounds.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn world_bounds(&self) -> Option<&Aabb> {
        self.world_bounds.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn update_stamp(&self) -> u32 {
        self.update_stamp
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    #[inline]
    #[must_use]
    pub fn receive_shadow(&self) -> bool {
        self.receive_shadow
    }

    #[inline]
    #[must_use]
    pub fn use_light_probe(&self) -> bool {
        self.use_light_probe
    }

    #[inline]
    #[must_use]
    pub fn lightmap(&self) -> Option<TextureRef> {
        self.lightmap
    }

    #[must_use]
    pub fn sub_unit(&self, index: usize) -> Option<&SubUnit> {
        self.slot(index).and_then(|key| self.sub_units.get(key))
    }

    /// Length of the slot list, empty slots included.
    #[inline]
    #[must_use]
    pub fn sub_unit_count(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    #[must_use]
    pub fn last_probe_center(&self) -> Option<Vec3> {
        self.last_probe_center
    }

    #[inline]
    #[must_use]
    pub fn tetrahedron_hint(&self) -> Option<u32> {
        self.tetrahedron_hint
    }

    #[must_use]
    pub fn local_buffer_id(&self) -> Option<BufferId> {
        self.local_buffer.as_ref().map(|b| b.id())
    }

    #[must_use]
    pub fn sh_buffer_id(&self) -> Option<BufferId> {
        self.sh_buffer.as_ref().map(|b| b.id())
    }

    #[must_use]
    pub fn world_bound_buffer_id(&self) -> Option<BufferId> {
        self.world_bound_buffer.as_ref().map(|b| b.id())
    }

    /// Whether the unit shares a layer with a camera's `mask`.
    #[inline]
    #[must_use]
    pub fn is_visible_in(&self, mask: Layers) -> bool {
        self.visibility.intersects(mask)
    }

    #[inline]
    #[must_use]
    pub fn is_host_delegated(&self) -> bool {
        self.strategy.is_host_delegated()
    }
}

impl Drop for RenderableUnit {
    fn drop(&mut self) {
        self.release_buffers();
    }
}

fn ensure_buffer(
    context: &SyncContext,
    slot: &mut Option<Box<dyn GpuBuffer>>,
    label: &str,
    size: u64,
) -> Result<bool> {
    if slot.is_some() {
        return Ok(false);
    }
    let buffer = context.allocator().allocate(&BufferDesc::uniform(label, size))?;
    log::debug!("Allocated '{label}' ({size} bytes) as buffer {}", buffer.id());
    *slot = Some(buffer);
    Ok(true)
}

fn same_bits(a: Vec3, b: Vec3) -> bool {
    a.to_array().map(f32::to_bits) == b.to_array().map(f32::to_bits)
}

/// Native behaviour of a unit, reachable regardless of its strategy.
///
/// A host that received a [`HostEvent`] calls back through this view to run
/// the work the unit skipped.
pub struct NativeSync<'a> {
    unit: &'a mut RenderableUnit,
}

impl NativeSync<'_> {
    pub fn update_transform(&mut self) {
        self.unit.native_update_transform();
    }

    pub fn update_uniforms(&mut self, stamp: u32) {
        self.unit.native_update_uniforms(stamp);
    }

    pub fn update_instanced_attributes(&mut self, index: usize) {
        self.unit.native_update_instanced_attributes(index);
    }

    pub fn bind_local_descriptors(&mut self, index: usize) {
        self.unit.bind_local_descriptors(index);
    }

    pub fn bind_sh_descriptors(&mut self, index: usize) {
        self.unit.bind_sh_descriptors(index);
    }

    pub fn bind_world_bound_descriptors(&mut self, index: usize) {
        self.unit.bind_world_bound_descriptors(index);
    }

    #[must_use]
    pub fn macro_patches(&self) -> Vec<MacroPatch> {
        self.unit.native_macro_patches()
    }

    /// Runs the native counterpart of `event`.
    pub fn handle(&mut self, event: HostEvent) {
        match event {
            HostEvent::UpdateTransform { .. } => self.update_transform(),
            HostEvent::UpdateUniforms { stamp } => self.update_uniforms(stamp),
            HostEvent::UpdateInstancedAttributes { sub_unit } => self.update_instanced_attributes(sub_unit),
            HostEvent::UpdateLocalDescriptors { sub_unit } => self.bind_local_descriptors(sub_unit),
            HostEvent::UpdateShDescriptors { sub_unit } => self.bind_sh_descriptors(sub_unit),
            HostEvent::UpdateWorldBoundDescriptors { sub_unit } => {
                self.bind_world_bound_descriptors(sub_unit);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::buffer::CpuBufferAllocator;
    use crate::settings::SyncSettings;

    fn unit() -> RenderableUnit {
        let context = SyncContext::new(SyncSettings::default(), Rc::new(CpuBufferAllocator::new()));
        RenderableUnit::new(Rc::new(context), SyncStrategy::Native)
    }

    #[test]
    fn initialize_is_idempotent() {
        let mut unit = unit();
        unit.initialize();
        assert!(unit.receive_shadow() && unit.enabled && !unit.cast_shadow);

        unit.set_receive_shadow(false);
        unit.initialize();
        assert!(!unit.receive_shadow());
    }

    #[test]
    fn destroy_resets_batching_and_visibility_follows_layers() {
        let mut unit = unit();
        unit.initialize();
        assert!(!unit.is_visible_in(Layers::DEFAULT));

        unit.visibility = Layers::DEFAULT | Layers::EDITOR;
        assert!(unit.is_visible_in(Layers::EDITOR | Layers::GIZMOS));
        assert!(!unit.is_visible_in(Layers::UI_2D));

        unit.dynamic_batching = true;
        unit.destroy();
        assert!(!unit.dynamic_batching);
        unit.initialize();
        assert!(!unit.is_visible_in(Layers::DEFAULT));
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(unit().id(), unit().id());
    }

    #[test]
    fn same_bits_distinguishes_signed_zero() {
        assert!(same_bits(Vec3::ONE, Vec3::ONE));
        assert!(!same_bits(Vec3::ZERO, Vec3::new(-0.0, 0.0, 0.0)));
    }

    #[test]
    fn bounds_need_both_corners() {
        let mut unit = unit();
        unit.create_bounding_shape(Some(Vec3::ZERO), None);
        assert!(unit.world_bounds().is_none());
        assert!(!unit.world_bounds_dirty());
    }

    #[test]
    fn macro_patches_follow_shading_flags() {
        let mut unit = unit();
        unit.initialize();
        assert_eq!(unit.macro_patches(0).len(), 1);
        unit.use_light_probe = true;
        let names: Vec<_> = unit.macro_patches(0).iter().map(MacroPatch::name_str).collect();
        assert_eq!(names, [macros::RECEIVE_SHADOW, macros::USE_LIGHT_PROBE]);
    }
}
