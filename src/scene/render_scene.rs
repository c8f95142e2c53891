use slotmap::{SlotMap, new_key_type};

use crate::scene::renderable::RenderableUnit;
use crate::scene::spatial::{BoundsIndex, SpatialIndex};
use crate::utils::interner;
use crate::utils::time::Timer;

new_key_type! {
    pub struct UnitKey;
}

/// Owns the renderables of a scene and drives their per-frame synchronization.
///
/// [`RenderScene::update`] runs the three passes in order over all units:
/// transforms, then uniforms, then the spatial index. Each pass completes for
/// every unit before the next starts.
#[derive(Debug, Default)]
pub struct RenderScene {
    units: SlotMap<UnitKey, RenderableUnit>,
    index: BoundsIndex,
    timer: Timer,
    last_update_micros: u64,
}

impl RenderScene {
    #[must_use]
    pub fn new() -> Self {
        interner::preload_common_names();
        Self::default()
    }

    pub fn add(&mut self, unit: RenderableUnit) -> UnitKey {
        self.units.insert(unit)
    }

    /// Removes a unit, drops it from the spatial index and destroys it.
    pub fn remove(&mut self, key: UnitKey) -> Option<RenderableUnit> {
        let mut unit = self.units.remove(key)?;
        self.index.remove(unit.id());
        unit.destroy();
        Some(unit)
    }

    #[must_use]
    pub fn get(&self, key: UnitKey) -> Option<&RenderableUnit> {
        self.units.get(key)
    }

    pub fn get_mut(&mut self, key: UnitKey) -> Option<&mut RenderableUnit> {
        self.units.get_mut(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (UnitKey, &RenderableUnit)> {
        self.units.iter()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn spatial_index(&self) -> &BoundsIndex {
        &self.index
    }

    /// Duration of the last [`update`](Self::update) in microseconds.
    #[inline]
    #[must_use]
    pub fn last_update_micros(&self) -> u64 {
        self.last_update_micros
    }

    /// Synchronizes every enabled unit for frame `stamp`.
    pub fn update(&mut self, stamp: u32) {
        self.timer.reset();

        for unit in self.units.values_mut().filter(|u| u.enabled) {
            unit.update_transform(stamp);
        }
        for unit in self.units.values_mut().filter(|u| u.enabled) {
            unit.update_uniforms(stamp);
        }

        let mut notified = 0usize;
        for unit in self.units.values_mut() {
            if unit.update_spatial_index(&mut self.index) {
                notified += 1;
            }
        }

        self.last_update_micros = self.timer.microseconds();
        log::trace!(
            "Frame {stamp}: synced {} units ({notified} bounds updates) in {}us",
            self.units.len(),
            self.last_update_micros
        );
    }

    pub fn on_global_pipeline_state_changed(&mut self) {
        for unit in self.units.values_mut() {
            unit.on_global_pipeline_state_changed();
        }
    }
}
