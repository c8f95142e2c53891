//! Bounding Volumes
//!
//! [`BoundingVolume`] is the contract the synchronization layer needs from a
//! bound: construction from corners, transformation into another space,
//! validity, and center/half-extent access. [`Aabb`] is the center/half-extents
//! implementation used for both model-space and world-space bounds.

use glam::{Affine3A, Vec3};

pub trait BoundingVolume: Sized {
    /// Builds a volume spanning the two corner points.
    fn from_corners(min: Vec3, max: Vec3) -> Self;

    /// Writes this volume transformed by `matrix` into `out`.
    fn transform(&self, matrix: &Affine3A, out: &mut Self);

    fn is_valid(&self) -> bool;

    fn center(&self) -> Vec3;

    fn half_extents(&self) -> Vec3;
}

/// Axis-aligned bounding box stored as center and half extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub center: Vec3,
    pub half_extents: Vec3,
    valid: bool,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ZERO)
    }
}

impl Aabb {
    #[must_use]
    pub fn new(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            center,
            half_extents,
            valid: Self::well_formed(center, half_extents),
        }
    }

    /// An explicitly invalid box. Transform and probe paths ignore it.
    #[must_use]
    pub fn invalid() -> Self {
        Self {
            center: Vec3::ZERO,
            half_extents: Vec3::ZERO,
            valid: false,
        }
    }

    #[inline]
    pub fn set_valid(&mut self, valid: bool) {
        self.valid = valid && Self::well_formed(self.center, self.half_extents);
    }

    #[inline]
    #[must_use]
    pub fn min(&self) -> Vec3 {
        self.center - self.half_extents
    }

    #[inline]
    #[must_use]
    pub fn max(&self) -> Vec3 {
        self.center + self.half_extents
    }

    /// Inclusive overlap test.
    #[must_use]
    pub fn intersects(&self, other: &Aabb) -> bool {
        let delta = (self.center - other.center).abs();
        let reach = self.half_extents + other.half_extents;
        delta.cmple(reach).all()
    }

    fn well_formed(center: Vec3, half_extents: Vec3) -> bool {
        center.is_finite() && half_extents.is_finite() && half_extents.cmpge(Vec3::ZERO).all()
    }
}

impl BoundingVolume for Aabb {
    fn from_corners(min: Vec3, max: Vec3) -> Self {
        Self::new((min + max) * 0.5, (max - min) * 0.5)
    }

    fn transform(&self, matrix: &Affine3A, out: &mut Self) {
        // |M| * h gives the extents of the rotated box.
        let m = matrix.matrix3;
        let h = self.half_extents;
        let half_extents = m.x_axis.abs() * h.x + m.y_axis.abs() * h.y + m.z_axis.abs() * h.z;

        out.center = matrix.transform_point3(self.center);
        out.half_extents = Vec3::from(half_extents);
        out.valid = self.valid && Self::well_formed(out.center, out.half_extents);
    }

    #[inline]
    fn is_valid(&self) -> bool {
        self.valid
    }

    #[inline]
    fn center(&self) -> Vec3 {
        self.center
    }

    #[inline]
    fn half_extents(&self) -> Vec3 {
        self.half_extents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;
    use std::f32::consts::FRAC_PI_2;

    fn vec3_approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    #[test]
    fn from_corners_computes_center_and_extents() {
        let aabb = Aabb::from_corners(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(3.0, 2.0, 4.0));
        assert!(vec3_approx(aabb.center, Vec3::new(1.0, 1.0, 3.0)));
        assert!(vec3_approx(aabb.half_extents, Vec3::new(2.0, 1.0, 1.0)));
        assert!(aabb.is_valid());
    }

    #[test]
    fn inverted_corners_are_invalid() {
        let aabb = Aabb::from_corners(Vec3::ONE, Vec3::ZERO);
        assert!(!aabb.is_valid());
    }

    #[test]
    fn transform_translates_center() {
        let aabb = Aabb::from_corners(Vec3::splat(-1.0), Vec3::splat(1.0));
        let mut out = Aabb::default();
        aabb.transform(&Affine3A::from_translation(Vec3::new(5.0, 0.0, 0.0)), &mut out);
        assert!(vec3_approx(out.center, Vec3::new(5.0, 0.0, 0.0)));
        assert!(vec3_approx(out.half_extents, Vec3::ONE));
    }

    #[test]
    fn transform_rotation_swaps_extents() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::new(2.0, 1.0, 0.5));
        let mut out = Aabb::default();
        let rot = Affine3A::from_quat(Quat::from_rotation_z(FRAC_PI_2));
        aabb.transform(&rot, &mut out);
        assert!(vec3_approx(out.half_extents, Vec3::new(1.0, 2.0, 0.5)));
    }

    #[test]
    fn transform_scale_grows_extents() {
        let aabb = Aabb::new(Vec3::ONE, Vec3::ONE);
        let mut out = Aabb::default();
        aabb.transform(&Affine3A::from_scale(Vec3::splat(3.0)), &mut out);
        assert!(vec3_approx(out.center, Vec3::splat(3.0)));
        assert!(vec3_approx(out.half_extents, Vec3::splat(3.0)));
    }

    #[test]
    fn invalid_stays_invalid_after_transform() {
        let aabb = Aabb::invalid();
        let mut out = Aabb::default();
        aabb.transform(&Affine3A::IDENTITY, &mut out);
        assert!(!out.is_valid());
    }

    #[test]
    fn intersects_is_inclusive() {
        let a = Aabb::from_corners(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::from_corners(Vec3::ONE, Vec3::splat(2.0));
        let c = Aabb::from_corners(Vec3::splat(3.0), Vec3::splat(4.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}
