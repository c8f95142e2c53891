//! Per-object uniform block layouts.
//!
//! Each block is a `#[repr(C)]` [`Pod`] struct mirrored by the shaders. Byte
//! offsets are derived from the struct itself so writers and layouts cannot
//! drift apart.

use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

/// Descriptor binding slots used by model-level resources.
pub mod binding {
    /// Shared per-object uniforms in the sub-unit descriptor set.
    pub const LOCAL: u32 = 0;
    /// Spherical-harmonics light-probe uniforms.
    pub const SH: u32 = 1;
    /// Lightmap texture and sampler.
    pub const LIGHTMAP_TEXTURE: u32 = 2;
    /// World-bound uniforms inside the dedicated world-bound descriptor set.
    pub const WORLD_BOUND: u32 = 0;
}

/// Shared per-object block, written only for non-instanced sub-units.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LocalUniforms {
    pub world: Mat4,
    pub world_inverse_transpose: Mat4,
    pub lightmap_uv_param: Vec4,
    /// x: depth bias, y: normal bias.
    pub shadow_bias: Vec4,
}

impl LocalUniforms {
    pub const SIZE: u64 = size_of::<Self>() as u64;
    pub const WORLD_OFFSET: u64 = offset_of!(Self, world) as u64;
    pub const WORLD_IT_OFFSET: u64 = offset_of!(Self, world_inverse_transpose) as u64;
    pub const LIGHTMAP_UV_PARAM_OFFSET: u64 = offset_of!(Self, lightmap_uv_param) as u64;
    pub const SHADOW_BIAS_OFFSET: u64 = offset_of!(Self, shadow_bias) as u64;
}

/// Third-order SH lighting packed into seven vec4s.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ShUniforms {
    /// Per channel: (L1 x, L1 y, L1 z, L0).
    pub linear_const: [Vec4; 3],
    /// Per channel: first four L2 coefficients.
    pub quadratic: [Vec4; 3],
    /// Last L2 coefficient for r, g, b.
    pub quadratic_last: Vec4,
}

impl ShUniforms {
    pub const SIZE: u64 = size_of::<Self>() as u64;
    pub const LINEAR_CONST_R_OFFSET: u64 = offset_of!(Self, linear_const) as u64;
}

/// World-space bounds exposed to occlusion culling shaders.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct WorldBoundUniforms {
    /// xyz: center, w: 0.
    pub center: Vec4,
    /// xyz: half extents, w: 1.
    pub half_extents: Vec4,
}

impl Default for WorldBoundUniforms {
    fn default() -> Self {
        Self {
            center: Vec4::new(0.0, 0.0, 0.0, 0.0),
            half_extents: Vec4::new(1.0, 1.0, 1.0, 1.0),
        }
    }
}

impl WorldBoundUniforms {
    pub const SIZE: u64 = size_of::<Self>() as u64;
    pub const CENTER_OFFSET: u64 = offset_of!(Self, center) as u64;
    pub const HALF_EXTENTS_OFFSET: u64 = offset_of!(Self, half_extents) as u64;
}
