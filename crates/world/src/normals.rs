//! Per-vertex surface normals from heightmap finite differences.

use crate::heightmap::Heightmap;
use glam::Vec3;
use rayon::prelude::*;

/// Row-major grid of unit normals matching a heightmap's layout.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalField {
    width: usize,
    depth: usize,
    normals: Vec<Vec3>,
}

impl NormalField {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Normal at grid cell `(x, z)`.
    pub fn get(&self, x: usize, z: usize) -> Vec3 {
        self.normals[z * self.width + x]
    }

    pub fn as_slice(&self) -> &[Vec3] {
        &self.normals
    }
}

/// Central-difference normal estimation.
pub struct NormalCalculator;

impl NormalCalculator {
    /// Compute one normal per heightmap cell.
    ///
    /// `scale_xz` is the world distance between adjacent cells and `scale_y`
    /// multiplies height differences. Neighbors are clamped at the border, and
    /// a degenerate gradient yields straight up.
    pub fn compute(heightmap: &Heightmap, scale_xz: f32, scale_y: f32) -> NormalField {
        let width = heightmap.width();
        let depth = heightmap.depth();
        let mut normals = vec![Vec3::Y; width * depth];
        if width == 0 || depth == 0 {
            return NormalField {
                width,
                depth,
                normals,
            };
        }

        let slope = scale_y / scale_xz;
        normals
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(z, row)| {
                let up = z.saturating_sub(1);
                let down = (z + 1).min(depth - 1);
                for (x, normal) in row.iter_mut().enumerate() {
                    let left = x.saturating_sub(1);
                    let right = (x + 1).min(width - 1);

                    let h_left = heightmap.get(left, z);
                    let h_right = heightmap.get(right, z);
                    let h_up = heightmap.get(x, up);
                    let h_down = heightmap.get(x, down);

                    let n = Vec3::new((h_left - h_right) * slope, 2.0, (h_up - h_down) * slope);
                    *normal = unit_or_up(n);
                }
            });

        NormalField {
            width,
            depth,
            normals,
        }
    }
}

fn unit_or_up(n: Vec3) -> Vec3 {
    let length = n.length();
    if length.is_finite() && length > f32::EPSILON {
        n / length
    } else {
        Vec3::Y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heightmap::{HeightmapGenerator, HeightmapParams};

    #[test]
    fn flat_ground_points_up() {
        let hm = Heightmap::filled(4, 4, 3.0);
        let field = NormalCalculator::compute(&hm, 2.0, 1.0);
        for normal in field.as_slice() {
            assert!((*normal - Vec3::Y).length() < 1e-6);
        }
    }

    #[test]
    fn normals_are_unit_length() {
        let mut hm = HeightmapGenerator::new(5).generate(&HeightmapParams::default());
        hm.scale(40.0);
        let field = NormalCalculator::compute(&hm, 64.0 / 31.0, 1.0);
        for normal in field.as_slice() {
            assert!((normal.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn slope_tilts_away_from_rise() {
        // Height increases with x, so the normal leans toward -x.
        let values: Vec<f32> = (0..9).map(|i| (i % 3) as f32).collect();
        let hm = Heightmap::from_values(3, 3, values);
        let normal = NormalCalculator::compute(&hm, 1.0, 1.0).get(1, 1);
        assert!(normal.x < 0.0);
        assert!(normal.z.abs() < 1e-6);
        assert!(normal.y > 0.0);
    }

    #[test]
    fn nan_heights_fall_back_to_up() {
        let hm = Heightmap::from_values(2, 1, vec![f32::NAN, 0.0]);
        let field = NormalCalculator::compute(&hm, 1.0, 1.0);
        assert_eq!(field.get(0, 0), Vec3::Y);
    }
}
