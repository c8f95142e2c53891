//! Host delegation tests
//!
//! Tests for:
//! - One event per delegated call, no native work
//! - Buffers still allocated while descriptor binding is delegated
//! - Host re-entry through `native()`
//! - Host supplied macro patches

use std::rc::Rc;
use std::sync::Arc;

use glam::Vec3;
use myth_renderable::resources::buffer::CpuBufferAllocator;
use myth_renderable::resources::material::{MacroPatch, Material, Pass, VertexAttribute, macros};
use myth_renderable::resources::mesh::SubMesh;
use myth_renderable::resources::uniforms::binding;
use myth_renderable::scene::node::{Node, NodeRef};
use myth_renderable::scene::renderable::RenderableUnit;
use myth_renderable::scene::strategy::{HostEvent, HostEventQueue, SyncStrategy};
use myth_renderable::{SyncContext, SyncSettings};

// ============================================================================
// Helpers
// ============================================================================

fn hosted_unit() -> (RenderableUnit, HostEventQueue, NodeRef, Rc<CpuBufferAllocator>) {
    let allocator = Rc::new(CpuBufferAllocator::new());
    let context = Rc::new(SyncContext::new(SyncSettings::default(), allocator.clone()));
    let queue = HostEventQueue::new();

    let node = Node::new("hosted").into_ref();
    node.borrow_mut().transform.position = Vec3::new(0.0, 3.0, 0.0);

    let mut unit = RenderableUnit::new(context, SyncStrategy::HostDelegated(Box::new(queue.clone())));
    unit.initialize();
    unit.attach_transform(&node);
    unit.create_bounding_shape(Some(Vec3::splat(-1.0)), Some(Vec3::splat(1.0)));
    (unit, queue, node, allocator)
}

fn instancing_material() -> Material {
    Material::new(
        "instanced",
        vec![Arc::new(Pass::new(
            "forward",
            vec![
                VertexAttribute::new("a_position", 3),
                VertexAttribute::instanced("a_matWorld0", 4).with_define(macros::USE_INSTANCING),
                VertexAttribute::instanced("a_matWorld1", 4).with_define(macros::USE_INSTANCING),
                VertexAttribute::instanced("a_matWorld2", 4).with_define(macros::USE_INSTANCING),
            ],
        ))],
    )
}

// ============================================================================
// Delegation
// ============================================================================

#[test]
fn update_transform_emits_once_and_skips_native_work() {
    let (mut unit, queue, _node, _) = hosted_unit();
    let dirty_bounds = unit.world_bounds_dirty();

    unit.update_transform(7);

    assert_eq!(queue.drain(), vec![HostEvent::UpdateTransform { stamp: 7 }]);
    assert_eq!(unit.stats().bounds_transforms, 0);
    assert_eq!(unit.stats().host_events, 1);
    assert_eq!(unit.world_bounds_dirty(), dirty_bounds);
    assert_eq!(unit.world_bounds().unwrap().center, Vec3::ZERO);
}

#[test]
fn update_uniforms_emits_once_and_skips_native_work() {
    let (mut unit, queue, _node, _) = hosted_unit();

    unit.update_uniforms(3);

    assert_eq!(queue.drain(), vec![HostEvent::UpdateUniforms { stamp: 3 }]);
    assert_eq!(unit.update_stamp(), 0);
    assert!(unit.local_dirty());
}

#[test]
fn rebuild_bindings_allocates_but_delegates_binding() {
    let (mut unit, queue, _node, allocator) = hosted_unit();
    unit.init_sub_unit(0, SubMesh::new("quad", 4, 6).into_ref(), &instancing_material())
        .unwrap();

    assert_eq!(
        queue.drain(),
        vec![
            HostEvent::UpdateLocalDescriptors { sub_unit: 0 },
            HostEvent::UpdateWorldBoundDescriptors { sub_unit: 0 },
            HostEvent::UpdateInstancedAttributes { sub_unit: 0 },
        ]
    );
    assert_eq!(allocator.allocation_count(), 2);
    let set = unit.sub_unit(0).unwrap().descriptor_set();
    assert_eq!(set.bound_buffer(binding::LOCAL), None);
}

#[test]
fn enabling_light_probes_delegates_sh_binding() {
    let (mut unit, queue, _node, allocator) = hosted_unit();
    unit.init_sub_unit(0, SubMesh::new("quad", 4, 6).into_ref(), &instancing_material())
        .unwrap();
    let _ = queue.drain();

    unit.set_use_light_probe(true).unwrap();

    assert!(queue.drain().contains(&HostEvent::UpdateShDescriptors { sub_unit: 0 }));
    assert!(allocator.find("ModelShUniforms").is_some());
}

#[test]
fn enabling_light_probes_rederives_instanced_attributes_once() {
    let (mut unit, queue, _node, _) = hosted_unit();
    unit.init_sub_unit(0, SubMesh::new("quad", 4, 6).into_ref(), &instancing_material())
        .unwrap();
    unit.init_sub_unit(2, SubMesh::new("quad", 4, 6).into_ref(), &instancing_material())
        .unwrap();
    let _ = queue.drain();

    unit.set_use_light_probe(true).unwrap();

    let events = queue.drain();
    for sub_unit in [0, 2] {
        let count = events
            .iter()
            .filter(|e| **e == HostEvent::UpdateInstancedAttributes { sub_unit })
            .count();
        assert_eq!(count, 1);
    }
    assert!(!events.contains(&HostEvent::UpdateInstancedAttributes { sub_unit: 1 }));
}

// ============================================================================
// Host re-entry
// ============================================================================

#[test]
fn host_runs_native_work_through_native_view() {
    let (mut unit, queue, node, allocator) = hosted_unit();
    unit.init_sub_unit(0, SubMesh::new("quad", 4, 6).into_ref(), &instancing_material())
        .unwrap();
    unit.update_transform(1);
    unit.update_uniforms(1);

    for event in queue.drain() {
        unit.native().handle(event);
    }

    // Re-entry never loops back to the host.
    assert!(queue.is_empty());

    let set = unit.sub_unit(0).unwrap().descriptor_set();
    assert_eq!(set.bound_buffer(binding::LOCAL), unit.local_buffer_id());
    assert_eq!(unit.update_stamp(), 1);
    assert!(!unit.local_dirty());
    assert_eq!(allocator.find("ModelLocalUniforms").unwrap().flush_count(), 1);

    let expected = Vec3::from(node.borrow().world_matrix().translation);
    assert_eq!(unit.world_bounds().unwrap().center, expected);
}

#[test]
fn host_macro_patches_drive_instancing() {
    let (mut unit, queue, _node, allocator) = hosted_unit();
    queue.set_macro_patches(vec![MacroPatch::new(macros::USE_INSTANCING, true)]);
    unit.init_sub_unit(0, SubMesh::new("quad", 4, 6).into_ref(), &instancing_material())
        .unwrap();
    let _ = queue.drain();

    unit.native().update_instanced_attributes(0);
    assert_eq!(unit.sub_unit(0).unwrap().instanced_world_matrix_index(), Some(0));

    unit.native().update_uniforms(1);
    assert_eq!(unit.stats().instance_writes, 1);
    assert_eq!(allocator.find("ModelLocalUniforms").unwrap().flush_count(), 0);
}

#[test]
fn native_patches_ignore_the_host() {
    let (mut unit, queue, _node, _) = hosted_unit();
    queue.set_macro_patches(vec![MacroPatch::new(macros::USE_INSTANCING, true)]);

    assert_eq!(unit.macro_patches(0), vec![MacroPatch::new(macros::USE_INSTANCING, true)]);
    assert_eq!(
        unit.native().macro_patches(),
        vec![MacroPatch::new(macros::RECEIVE_SHADOW, true)]
    );
}
