//! core/sweep_space.rs — Log-log measurement space.
//!
//! Sweep paths live in (spatial frequency, contrast) space sampled on log
//! axes. A sweep's key is its ray angle (degrees) through that space; key
//! distance is angular distance, which is what cross-sweep push decays over.
//!
//! The engine treats a path as an opaque ordered point sequence; this module
//! is the convenience producer of that input for the simulator and tests.

use serde::{Deserialize, Serialize};

/// One sample point of a sweep path.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub spatial_freq: f32,
    pub contrast: f32,
}

/// Bounded log-log grid over spatial frequency (cpd) and contrast.
#[derive(Clone, Debug)]
pub struct SweepSpace {
    pub sf_min: f32,
    pub sf_max: f32,
    pub contrast_min: f32,
    pub contrast_max: f32,
}

impl SweepSpace {
    pub fn new(sf_min: f32, sf_max: f32, contrast_min: f32, contrast_max: f32) -> Self {
        assert!(sf_min > 0.0 && sf_max > sf_min);
        assert!(contrast_min > 0.0 && contrast_max > contrast_min);
        Self {
            sf_min,
            sf_max,
            contrast_min,
            contrast_max,
        }
    }

    /// Sample `n` points along the ray at `angle_deg` through the grid
    /// center, ordered from easiest (high contrast) to hardest.
    ///
    /// 90 degrees descends in contrast at fixed spatial frequency; 0 degrees
    /// traverses spatial frequency at fixed contrast.
    pub fn ray(&self, angle_deg: f32, n: usize) -> Vec<PathPoint> {
        assert!(n >= 2, "a sweep path needs at least two points");
        let (lsf0, lsf1) = (self.sf_min.log10(), self.sf_max.log10());
        let (lc0, lc1) = (self.contrast_min.log10(), self.contrast_max.log10());
        let center_sf = 0.5 * (lsf0 + lsf1);
        let center_c = 0.5 * (lc0 + lc1);
        let half_sf = 0.5 * (lsf1 - lsf0);
        let half_c = 0.5 * (lc1 - lc0);

        let a = angle_deg.to_radians();
        let (dir_sf, dir_c) = (a.cos(), a.sin());

        (0..n)
            .map(|i| {
                // t runs 1 -> -1 so paths start at the high-contrast end.
                let t = 1.0 - 2.0 * i as f32 / (n - 1) as f32;
                let lsf = (center_sf + t * half_sf * dir_sf).clamp(lsf0, lsf1);
                let lc = (center_c + t * half_c * dir_c).clamp(lc0, lc1);
                PathPoint {
                    spatial_freq: 10f32.powf(lsf),
                    contrast: 10f32.powf(lc),
                }
            })
            .collect()
    }
}

/// Supplies one ordered path per sweep key. The engine calls this at each
/// repeat start, after any key shuffle, so key-to-path binding is decided
/// here and nowhere else.
pub trait PathSource {
    fn generate(&mut self, keys: &[f32]) -> Vec<(f32, Vec<PathPoint>)>;
}

/// Ray-based path source over a [`SweepSpace`].
pub struct RayPathSource {
    pub space: SweepSpace,
    pub points_per_sweep: usize,
}

impl PathSource for RayPathSource {
    fn generate(&mut self, keys: &[f32]) -> Vec<(f32, Vec<PathPoint>)> {
        keys.iter()
            .map(|&key| (key, self.space.ray(key, self.points_per_sweep)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertical_ray_descends_in_contrast() {
        let space = SweepSpace::new(0.5, 32.0, 0.001, 1.0);
        let path = space.ray(90.0, 8);
        assert_eq!(path.len(), 8);
        assert!(path.windows(2).all(|w| w[1].contrast < w[0].contrast));
        // Spatial frequency stays at the grid center.
        let sf0 = path[0].spatial_freq;
        assert!(path.iter().all(|p| (p.spatial_freq / sf0 - 1.0).abs() < 1e-4));
    }

    #[test]
    fn ray_points_stay_in_bounds() {
        let space = SweepSpace::new(0.5, 32.0, 0.001, 1.0);
        for angle in [0.0, 30.0, 45.0, 90.0, 135.0] {
            for p in space.ray(angle, 12) {
                assert!(p.spatial_freq >= 0.5 - 1e-3 && p.spatial_freq <= 32.0 + 1e-3);
                assert!(p.contrast >= 0.001 - 1e-6 && p.contrast <= 1.0 + 1e-4);
            }
        }
    }

    #[test]
    fn geometric_spacing_on_log_axes() {
        let space = SweepSpace::new(1.0, 16.0, 0.01, 1.0);
        let path = space.ray(0.0, 5);
        let ratios: Vec<f32> = path
            .windows(2)
            .map(|w| w[0].spatial_freq / w[1].spatial_freq)
            .collect();
        let target = ratios[0];
        assert!(ratios.iter().all(|&r| (r / target - 1.0).abs() < 1e-4));
    }

    #[test]
    fn ray_source_binds_keys_in_given_order() {
        let mut source = RayPathSource {
            space: SweepSpace::new(0.5, 32.0, 0.001, 1.0),
            points_per_sweep: 4,
        };
        let keys = [30.0, 90.0, 150.0];
        let paths = source.generate(&keys);
        let got: Vec<f32> = paths.iter().map(|(k, _)| *k).collect();
        assert_eq!(got, keys);
        assert!(paths.iter().all(|(_, p)| p.len() == 4));
    }
}
