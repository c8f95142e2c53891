//! Scene-side synchronization.
//!
//! - Node: scene node with parent link and versioned world matrix
//! - Transform: TRS component with dirty tracking
//! - RenderableUnit: per-object transform, bounds and uniform synchronization
//! - SubUnit: one sub-mesh and material of a renderable
//! - SyncStrategy: native or host-delegated synchronization
//! - SpatialIndex: receiver of world-bound changes
//! - RenderScene: owns units and runs the per-frame passes

pub mod node;
pub mod render_scene;
pub mod renderable;
pub mod spatial;
pub mod strategy;
pub mod sub_unit;
pub mod transform;

pub use node::{Node, NodeRef};
pub use render_scene::{RenderScene, UnitKey};
pub use renderable::{Layers, NativeSync, RenderableUnit, SyncStats};
pub use spatial::{BoundsIndex, SpatialIndex};
pub use strategy::{HostEvent, HostEventQueue, ScriptBridge, SyncStrategy};
pub use sub_unit::{SubUnit, SubUnitKey};
pub use transform::Transform;
