use std::sync::Arc;

use parking_lot::RwLock;

/// Draw ranges of one sub-mesh. Geometry producers mutate it in place and
/// notify owners through `RenderableUnit::on_geometry_changed`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubMesh {
    pub name: String,
    pub vertex_count: u32,
    pub index_count: u32,
}

pub type SubMeshRef = Arc<RwLock<SubMesh>>;

impl SubMesh {
    #[must_use]
    pub fn new(name: &str, vertex_count: u32, index_count: u32) -> Self {
        Self {
            name: name.to_string(),
            vertex_count,
            index_count,
        }
    }

    #[must_use]
    pub fn into_ref(self) -> SubMeshRef {
        Arc::new(RwLock::new(self))
    }
}

/// Snapshot of the counts a sub-unit draws with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawInfo {
    pub vertex_count: u32,
    pub index_count: u32,
}

impl From<&SubMesh> for DrawInfo {
    fn from(mesh: &SubMesh) -> Self {
        Self {
            vertex_count: mesh.vertex_count,
            index_count: mesh.index_count,
        }
    }
}
