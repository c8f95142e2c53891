//! Descriptor sets as seen from the model layer.
//!
//! A [`DescriptorSet`] only records which resource sits in which binding slot.
//! Changes are staged and committed by [`DescriptorSet::update`], which bumps
//! the version the backend uses to decide whether a bind group must be rebuilt.

use rustc_hash::FxHashMap;

use crate::resources::buffer::BufferId;

/// Texture reference carried through bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureRef {
    pub id: u64,
    pub mip_levels: u32,
}

impl TextureRef {
    /// Built-in 1x1 placeholder bound when no lightmap is assigned.
    pub const EMPTY: TextureRef = TextureRef {
        id: 0,
        mip_levels: 1,
    };

    #[must_use]
    pub fn new(id: u64, mip_levels: u32) -> Self {
        Self { id, mip_levels }
    }
}

/// Sampler state for bound textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerInfo {
    pub filter: wgpu::FilterMode,
    pub mipmapped: bool,
    pub address_mode: wgpu::AddressMode,
}

impl SamplerInfo {
    /// Linear, clamped, no mip filtering.
    pub const LIGHTMAP: SamplerInfo = SamplerInfo {
        filter: wgpu::FilterMode::Linear,
        mipmapped: false,
        address_mode: wgpu::AddressMode::ClampToEdge,
    };

    /// Linear, clamped, linear between mips.
    pub const LIGHTMAP_MIPMAPPED: SamplerInfo = SamplerInfo {
        filter: wgpu::FilterMode::Linear,
        mipmapped: true,
        address_mode: wgpu::AddressMode::ClampToEdge,
    };

    /// Picks the lightmap sampler matching the texture's mip chain.
    #[must_use]
    pub fn for_lightmap(texture: &TextureRef) -> Self {
        if texture.mip_levels > 1 {
            Self::LIGHTMAP_MIPMAPPED
        } else {
            Self::LIGHTMAP
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundResource {
    Buffer(BufferId),
    Texture {
        texture: TextureRef,
        sampler: SamplerInfo,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DescriptorSet {
    bindings: FxHashMap<u32, BoundResource>,
    pending: bool,
    version: u64,
}

impl DescriptorSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_buffer(&mut self, binding: u32, buffer: BufferId) {
        self.bind(binding, BoundResource::Buffer(buffer));
    }

    pub fn bind_texture(&mut self, binding: u32, texture: TextureRef, sampler: SamplerInfo) {
        self.bind(binding, BoundResource::Texture { texture, sampler });
    }

    fn bind(&mut self, binding: u32, resource: BoundResource) {
        if self.bindings.insert(binding, resource) != Some(resource) {
            self.pending = true;
        }
    }

    #[must_use]
    pub fn get(&self, binding: u32) -> Option<&BoundResource> {
        self.bindings.get(&binding)
    }

    #[must_use]
    pub fn bound_buffer(&self, binding: u32) -> Option<BufferId> {
        match self.bindings.get(&binding) {
            Some(BoundResource::Buffer(id)) => Some(*id),
            _ => None,
        }
    }

    /// Commits staged bindings. Returns whether anything changed.
    pub fn update(&mut self) -> bool {
        if !self.pending {
            return false;
        }
        self.pending = false;
        self.version = self.version.wrapping_add(1);
        true
    }

    #[inline]
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending
    }

    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn clear(&mut self) {
        if !self.bindings.is_empty() {
            self.bindings.clear();
            self.pending = true;
        }
    }
}
