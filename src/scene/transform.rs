use glam::{Affine3A, EulerRot, Quat, Vec3};

/// TRS triple as last baked into a local matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Baked {
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
}

/// Transform component.
///
/// Mutating the public TRS fields is enough: the next
/// [`Transform::update_local_matrix`] compares them with the values the cached
/// matrix was baked from and rebuilds only on a difference.
#[derive(Debug, Clone)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,

    local_matrix: Affine3A,
    // None until the first bake, or after `mark_dirty`.
    baked: Option<Baked>,
}

impl Transform {
    #[must_use]
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            local_matrix: Affine3A::IDENTITY,
            baked: None,
        }
    }

    fn current(&self) -> Baked {
        Baked {
            position: self.position,
            rotation: self.rotation,
            scale: self.scale,
        }
    }

    /// Whether the TRS differs from what the local matrix was built from.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.baked != Some(self.current())
    }

    /// Rebuilds the local matrix if the TRS changed. Returns whether it did.
    pub fn update_local_matrix(&mut self) -> bool {
        let current = self.current();
        if self.baked == Some(current) {
            return false;
        }
        self.local_matrix = Affine3A::from_scale_rotation_translation(current.scale, current.rotation, current.position);
        self.baked = Some(current);
        true
    }

    pub fn set_rotation_euler(&mut self, x: f32, y: f32, z: f32) {
        self.rotation = Quat::from_euler(EulerRot::XYZ, x, y, z);
    }

    #[inline]
    #[must_use]
    pub fn local_matrix(&self) -> &Affine3A {
        &self.local_matrix
    }

    /// Forces a rebuild on the next update even if the TRS is unchanged.
    pub fn mark_dirty(&mut self) {
        self.baked = None;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebuilds_only_on_change() {
        let mut t = Transform::new();
        assert!(t.update_local_matrix());
        assert!(!t.update_local_matrix());

        t.position = Vec3::new(1.0, 2.0, 3.0);
        assert!(t.is_dirty());
        assert!(t.update_local_matrix());
        assert!(!t.is_dirty());
        assert_eq!(Vec3::from(t.local_matrix().translation), Vec3::new(1.0, 2.0, 3.0));

        t.mark_dirty();
        assert!(t.update_local_matrix());
        assert!(!t.update_local_matrix());
    }

    #[test]
    fn euler_rotation_marks_dirty() {
        let mut t = Transform::new();
        t.update_local_matrix();
        t.set_rotation_euler(0.0, std::f32::consts::FRAC_PI_2, 0.0);
        assert!(t.is_dirty());
    }
}
