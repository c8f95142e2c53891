#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod errors;
pub mod resources;
pub mod scene;
pub mod settings;
pub mod utils;

pub use errors::{Result, SyncError};
pub use resources::{
    Aabb, BoundingVolume, BufferAllocator, BufferDesc, CpuBufferAllocator, GpuBuffer, LightProbeField, MacroPatch,
    Material, Pass, SubMesh, TextureRef, VertexAttribute, WgpuBufferAllocator,
};
pub use scene::{
    HostEvent, HostEventQueue, Node, NodeRef, RenderScene, RenderableUnit, ScriptBridge, SpatialIndex, SyncStrategy,
};
pub use settings::{SyncContext, SyncSettings};
pub use utils::interner;
