//! Materials, passes and shader variants.
//!
//! A [`Pass`] declares the vertex attributes of its shader. Some attributes
//! only exist in variants compiled with a given macro; [`Pass::shader_variant`]
//! resolves the attribute list for a concrete set of [`MacroPatch`]es.

use std::sync::Arc;

use crate::utils::interner::{self, Symbol};

/// Macro names the model layer toggles.
pub mod macros {
    pub const RECEIVE_SHADOW: &str = "CC_RECEIVE_SHADOW";
    pub const USE_LIGHT_PROBE: &str = "CC_USE_LIGHT_PROBE";
    pub const USE_INSTANCING: &str = "CC_USE_INSTANCING";
}

/// A boolean shader macro override applied per sub-unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacroPatch {
    pub name: Symbol,
    pub value: bool,
}

impl MacroPatch {
    #[must_use]
    pub fn new(name: &str, value: bool) -> Self {
        Self {
            name: interner::intern(name),
            value,
        }
    }

    #[must_use]
    pub fn name_str(&self) -> &'static str {
        interner::resolve(self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    pub name: Symbol,
    /// Number of f32 components.
    pub components: u32,
    /// Advances per instance rather than per vertex.
    pub instanced: bool,
    /// Macro that must be enabled for the attribute to exist.
    pub define: Option<Symbol>,
}

impl VertexAttribute {
    #[must_use]
    pub fn new(name: &str, components: u32) -> Self {
        Self {
            name: interner::intern(name),
            components,
            instanced: false,
            define: None,
        }
    }

    #[must_use]
    pub fn instanced(name: &str, components: u32) -> Self {
        Self {
            instanced: true,
            ..Self::new(name, components)
        }
    }

    #[must_use]
    pub fn with_define(mut self, define: &str) -> Self {
        self.define = Some(interner::intern(define));
        self
    }

    fn enabled_by(&self, patches: &[MacroPatch]) -> bool {
        match self.define {
            None => true,
            Some(define) => patches.iter().any(|p| p.name == define && p.value),
        }
    }
}

/// Attribute list of a shader compiled for a specific patch set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderVariant {
    pub attributes: Vec<VertexAttribute>,
}

#[derive(Debug, Clone)]
pub struct Pass {
    pub name: String,
    attributes: Vec<VertexAttribute>,
    world_bound: bool,
}

impl Pass {
    #[must_use]
    pub fn new(name: &str, attributes: Vec<VertexAttribute>) -> Self {
        Self {
            name: name.to_string(),
            attributes,
            world_bound: false,
        }
    }

    /// Marks the pass as reading world-space bounds (occlusion culling), which
    /// gives its sub-units a dedicated world-bound descriptor set.
    #[must_use]
    pub fn with_world_bound(mut self) -> Self {
        self.world_bound = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn uses_world_bound(&self) -> bool {
        self.world_bound
    }

    #[must_use]
    pub fn shader_variant(&self, patches: &[MacroPatch]) -> ShaderVariant {
        ShaderVariant {
            attributes: self
                .attributes
                .iter()
                .filter(|a| a.enabled_by(patches))
                .cloned()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Material {
    pub name: String,
    passes: Vec<Arc<Pass>>,
}

impl Material {
    #[must_use]
    pub fn new(name: &str, passes: Vec<Arc<Pass>>) -> Self {
        Self {
            name: name.to_string(),
            passes,
        }
    }

    #[inline]
    #[must_use]
    pub fn passes(&self) -> &[Arc<Pass>] {
        &self.passes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass() -> Pass {
        Pass::new(
            "forward",
            vec![
                VertexAttribute::new("a_position", 3),
                VertexAttribute::instanced("a_matWorld0", 4).with_define(macros::USE_INSTANCING),
                VertexAttribute::instanced("a_lightingMapUVParam", 4),
            ],
        )
    }

    #[test]
    fn variant_drops_attributes_of_disabled_macros() {
        let variant = pass().shader_variant(&[]);
        assert_eq!(variant.attributes.len(), 2);
        assert!(variant.attributes.iter().all(|a| a.define.is_none()));
    }

    #[test]
    fn variant_keeps_attributes_of_enabled_macros() {
        let on = [MacroPatch::new(macros::USE_INSTANCING, true)];
        assert_eq!(pass().shader_variant(&on).attributes.len(), 3);

        let off = [MacroPatch::new(macros::USE_INSTANCING, false)];
        assert_eq!(pass().shader_variant(&off).attributes.len(), 2);
    }
}
