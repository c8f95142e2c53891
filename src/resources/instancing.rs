//! Per-instance attribute storage.
//!
//! An [`InstancedAttributeBlock`] holds one f32 view per instanced vertex
//! attribute of the active shader variant. Sub-units whose variant carries the
//! three world-matrix rows write their transform here instead of into the
//! shared per-object uniform buffer.

use glam::Affine3A;
use smallvec::SmallVec;

use crate::resources::material::VertexAttribute;
use crate::utils::interner::{self, Symbol};

/// Rows of the 3x4 world matrix, in attribute order.
pub const WORLD_MATRIX_ATTRIBUTES: [&str; 3] = ["a_matWorld0", "a_matWorld1", "a_matWorld2"];

pub type AttributeView = SmallVec<[f32; 4]>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstancedAttributeBlock {
    names: Vec<Symbol>,
    views: Vec<AttributeView>,
}

impl InstancedAttributeBlock {
    /// Builds a zeroed block from the instanced subset of `attributes`.
    #[must_use]
    pub fn from_attributes(attributes: &[VertexAttribute]) -> Self {
        let mut block = Self::default();
        for attribute in attributes.iter().filter(|a| a.instanced) {
            block.names.push(attribute.name);
            block.views.push(SmallVec::from_elem(0.0, attribute.components as usize));
        }
        block
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.views.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        let symbol = interner::get(name)?;
        self.names.iter().position(|&n| n == symbol)
    }

    #[must_use]
    pub fn view(&self, index: usize) -> Option<&[f32]> {
        self.views.get(index).map(|v| v.as_slice())
    }

    /// Index of the first world-matrix row, when all three rows are present
    /// consecutively with four components each.
    #[must_use]
    pub fn world_matrix_index(&self) -> Option<usize> {
        let first = self.index_of(WORLD_MATRIX_ATTRIBUTES[0])?;
        let rows_match = WORLD_MATRIX_ATTRIBUTES.iter().enumerate().all(|(row, name)| {
            let index = first + row;
            self.index_of(name) == Some(index) && self.views[index].len() == 4
        });
        rows_match.then_some(first)
    }

    /// Copies `values` into the named view, truncated to the view's length.
    /// Returns false when the block has no such attribute.
    pub fn set(&mut self, name: &str, values: &[f32]) -> bool {
        let Some(index) = self.index_of(name) else {
            return false;
        };
        let view = &mut self.views[index];
        let count = view.len().min(values.len());
        view[..count].copy_from_slice(&values[..count]);
        true
    }

    /// Writes the three rows of `world` starting at view `index`.
    pub fn write_world_matrix(&mut self, index: usize, world: &Affine3A) {
        let m = world.matrix3;
        let t = world.translation;
        let rows = [
            [m.x_axis.x, m.y_axis.x, m.z_axis.x, t.x],
            [m.x_axis.y, m.y_axis.y, m.z_axis.y, t.y],
            [m.x_axis.z, m.y_axis.z, m.z_axis.z, t.z],
        ];
        for (row, values) in rows.iter().enumerate() {
            if let Some(view) = self.views.get_mut(index + row) {
                view.copy_from_slice(values);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn world_matrix_attributes() -> Vec<VertexAttribute> {
        vec![
            VertexAttribute::new("a_position", 3),
            VertexAttribute::instanced("a_matWorld0", 4),
            VertexAttribute::instanced("a_matWorld1", 4),
            VertexAttribute::instanced("a_matWorld2", 4),
            VertexAttribute::instanced("a_tint", 4),
        ]
    }

    #[test]
    fn block_keeps_only_instanced_attributes() {
        let block = InstancedAttributeBlock::from_attributes(&world_matrix_attributes());
        assert_eq!(block.len(), 4);
        assert_eq!(block.world_matrix_index(), Some(0));
        assert_eq!(block.index_of("a_tint"), Some(3));
        assert_eq!(block.index_of("a_position"), None);
    }

    #[test]
    fn incomplete_world_matrix_is_not_instanced() {
        let attrs = vec![
            VertexAttribute::instanced("a_matWorld0", 4),
            VertexAttribute::instanced("a_matWorld1", 4),
        ];
        let block = InstancedAttributeBlock::from_attributes(&attrs);
        assert_eq!(block.world_matrix_index(), None);
    }

    #[test]
    fn world_matrix_rows_hold_translation_in_w() {
        let mut block = InstancedAttributeBlock::from_attributes(&world_matrix_attributes());
        let world = Affine3A::from_scale_rotation_translation(
            Vec3::splat(2.0),
            glam::Quat::IDENTITY,
            Vec3::new(1.0, 2.0, 3.0),
        );
        block.write_world_matrix(0, &world);
        assert_eq!(block.view(0), Some(&[2.0, 0.0, 0.0, 1.0][..]));
        assert_eq!(block.view(1), Some(&[0.0, 2.0, 0.0, 2.0][..]));
        assert_eq!(block.view(2), Some(&[0.0, 0.0, 2.0, 3.0][..]));
    }

    #[test]
    fn set_truncates_to_view_length() {
        let mut block = InstancedAttributeBlock::from_attributes(&world_matrix_attributes());
        assert!(block.set("a_tint", &[1.0, 0.5, 0.25, 1.0, 9.0]));
        assert_eq!(block.view(3), Some(&[1.0, 0.5, 0.25, 1.0][..]));
        assert!(!block.set("a_missing", &[1.0]));
    }
}
