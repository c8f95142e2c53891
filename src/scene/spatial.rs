use rustc_hash::FxHashMap;

use crate::resources::bounds::Aabb;

/// Receiver of world-bound changes (octree, BVH, ...).
pub trait SpatialIndex {
    fn update(&mut self, id: u32, bounds: &Aabb);
    fn remove(&mut self, id: u32);
}

/// Flat spatial index: a map from unit id to its last known world bounds.
///
/// Queries are linear; it exists for small scenes and for observing what the
/// sync layer reports.
#[derive(Debug, Default)]
pub struct BoundsIndex {
    entries: FxHashMap<u32, Aabb>,
    updates: u64,
}

impl BoundsIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: u32) -> Option<&Aabb> {
        self.entries.get(&id)
    }

    /// Ids whose bounds overlap `area`, sorted.
    #[must_use]
    pub fn query(&self, area: &Aabb) -> Vec<u32> {
        let mut hits: Vec<u32> = self
            .entries
            .iter()
            .filter(|(_, bounds)| bounds.intersects(area))
            .map(|(&id, _)| id)
            .collect();
        hits.sort_unstable();
        hits
    }

    /// Total number of updates received.
    #[inline]
    #[must_use]
    pub fn update_count(&self) -> u64 {
        self.updates
    }
}

impl SpatialIndex for BoundsIndex {
    fn update(&mut self, id: u32, bounds: &Aabb) {
        self.entries.insert(id, *bounds);
        self.updates += 1;
    }

    fn remove(&mut self, id: u32) {
        self.entries.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn query_returns_overlapping_ids() {
        let mut index = BoundsIndex::new();
        index.update(1, &Aabb::new(Vec3::ZERO, Vec3::ONE));
        index.update(2, &Aabb::new(Vec3::splat(10.0), Vec3::ONE));
        index.update(3, &Aabb::new(Vec3::new(1.5, 0.0, 0.0), Vec3::ONE));

        assert_eq!(index.query(&Aabb::new(Vec3::ZERO, Vec3::splat(0.5))), vec![1, 3]);

        index.remove(3);
        assert_eq!(index.len(), 2);
        assert_eq!(index.update_count(), 3);
    }
}
