//! Resource types consumed by renderables.
//!
//! - [`bounds`]: bounding volumes ([`Aabb`])
//! - [`buffer`]: GPU buffer seam and the CPU shadow implementation
//! - [`wgpu_buffer`]: `wgpu` backed buffers
//! - [`binding`]: descriptor sets, textures and samplers
//! - [`material`]: passes, shader variants and macro patches
//! - [`mesh`]: sub-mesh draw ranges
//! - [`instancing`]: per-instance attribute blocks
//! - [`light_probe`]: light-probe field seam and SH helpers
//! - [`uniforms`]: uniform block layouts

pub mod binding;
pub mod bounds;
pub mod buffer;
pub mod instancing;
pub mod light_probe;
pub mod material;
pub mod mesh;
pub mod uniforms;
pub mod wgpu_buffer;

pub use binding::{BoundResource, DescriptorSet, SamplerInfo, TextureRef};
pub use bounds::{Aabb, BoundingVolume};
pub use buffer::{BufferAllocator, BufferDesc, BufferId, CpuBufferAllocator, CpuBufferRef, GpuBuffer};
pub use instancing::InstancedAttributeBlock;
pub use light_probe::{LightProbeField, ShCoefficients};
pub use material::{MacroPatch, Material, Pass, ShaderVariant, VertexAttribute};
pub use mesh::{DrawInfo, SubMesh, SubMeshRef};
pub use uniforms::{LocalUniforms, ShUniforms, WorldBoundUniforms};
pub use wgpu_buffer::WgpuBufferAllocator;
