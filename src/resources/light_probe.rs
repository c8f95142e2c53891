//! Light-probe field seam and SH coefficient post-processing.
//!
//! The probe field (tetrahedral interpolation over baked probes) lives
//! elsewhere; this module only defines what a unit asks of it and how the
//! returned coefficients are filtered and packed for upload.

use glam::{Vec3, Vec4};

use crate::resources::uniforms::ShUniforms;

/// Coefficients for bands 0..=2, indexed `l * (l + 1) + m`.
pub const SH_COEFFICIENT_COUNT: usize = 9;

pub type ShCoefficients = [Vec3; SH_COEFFICIENT_COUNT];

const MAX_BAND: usize = 2;

pub trait LightProbeField {
    /// Whether baked probe data is loaded and can be sampled.
    fn is_available(&self) -> bool;

    /// Interpolated coefficients at `point`.
    ///
    /// `hint` is the tetrahedron found by the previous query and only speeds
    /// up the search; a stale or out-of-range hint must still yield the correct
    /// result. Returns the coefficients and the tetrahedron containing `point`.
    fn sample_coefficients(&self, point: Vec3, hint: Option<u32>) -> (ShCoefficients, Option<u32>);

    /// Ringing-reduction strength applied to sampled coefficients.
    fn reduce_ringing(&self) -> f32 {
        0.0
    }
}

/// Damps higher bands by `1 / (1 + λ l² (l + 1)²)`. `λ == 0` leaves the
/// coefficients untouched.
pub fn reduce_ringing(coefficients: &mut ShCoefficients, lambda: f32) {
    if lambda == 0.0 {
        return;
    }
    for band in 0..=MAX_BAND {
        let level = band as f32;
        let scale = 1.0 / (1.0 + lambda * level * level * (level + 1.0) * (level + 1.0));
        for coefficient in &mut coefficients[band * band..(band + 1) * (band + 1)] {
            *coefficient *= scale;
        }
    }
}

/// Packs coefficients into the seven-vec4 uniform layout.
#[must_use]
pub fn pack_sh_uniforms(c: &ShCoefficients) -> ShUniforms {
    let channel = |ch: usize| {
        (
            Vec4::new(c[3][ch], c[1][ch], c[2][ch], c[0][ch]),
            Vec4::new(c[4][ch], c[5][ch], c[6][ch], c[7][ch]),
        )
    };
    let (r_linear, r_quad) = channel(0);
    let (g_linear, g_quad) = channel(1);
    let (b_linear, b_quad) = channel(2);

    ShUniforms {
        linear_const: [r_linear, g_linear, b_linear],
        quadratic: [r_quad, g_quad, b_quad],
        quadratic_last: c[8].extend(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> ShCoefficients {
        std::array::from_fn(|i| Vec3::splat(i as f32 + 1.0))
    }

    #[test]
    fn zero_lambda_is_identity() {
        let mut c = ramp();
        reduce_ringing(&mut c, 0.0);
        assert_eq!(c, ramp());
    }

    #[test]
    fn ringing_reduction_keeps_dc_and_damps_higher_bands() {
        let mut c = ramp();
        reduce_ringing(&mut c, 0.5);
        // Band 0 scale is always 1.
        assert_eq!(c[0], Vec3::splat(1.0));
        // Band 1: 1 / (1 + 0.5 * 4) = 1/3.
        assert!((c[1].x - 2.0 / 3.0).abs() < 1e-6);
        // Band 2: 1 / (1 + 0.5 * 36) = 1/19.
        assert!((c[8].x - 9.0 / 19.0).abs() < 1e-6);
    }

    #[test]
    fn packing_places_dc_in_w_of_linear_rows() {
        let mut c = ramp();
        c[0] = Vec3::new(10.0, 20.0, 30.0);
        let packed = pack_sh_uniforms(&c);
        assert_eq!(packed.linear_const[0].w, 10.0);
        assert_eq!(packed.linear_const[1].w, 20.0);
        assert_eq!(packed.linear_const[2].w, 30.0);
        assert_eq!(packed.linear_const[0].x, 4.0);
        assert_eq!(packed.quadratic[0], Vec4::new(5.0, 6.0, 7.0, 8.0));
        assert_eq!(packed.quadratic_last, Vec4::new(9.0, 9.0, 9.0, 0.0));
    }
}
