//! Heightmap generation for terrain.
//!
//! Converts fractal Perlin noise into a grid of normalized heights spanning
//! exactly one chunk, so adjacent chunks sample identical world coordinates
//! along their shared border.

use crate::noise::{NoiseSource, PerlinNoise};
use rayon::prelude::*;

/// Row-major grid of heights, indexed `[z][x]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Heightmap {
    width: usize,
    depth: usize,
    values: Vec<f32>,
}

impl Heightmap {
    /// A grid filled with `value`.
    pub fn filled(width: usize, depth: usize, value: f32) -> Self {
        Self {
            width,
            depth,
            values: vec![value; width * depth],
        }
    }

    /// Wrap row-major values.
    ///
    /// # Panics
    /// Panics if `values.len() != width * depth`.
    pub fn from_values(width: usize, depth: usize, values: Vec<f32>) -> Self {
        assert_eq!(values.len(), width * depth, "heightmap size mismatch");
        Self {
            width,
            depth,
            values,
        }
    }

    /// Generate a normalized heightmap for `params` with a fresh Perlin table.
    pub fn generate(seed: u64, params: &HeightmapParams) -> Self {
        HeightmapGenerator::new(seed).generate(params)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Height at grid cell `(x, z)`.
    pub fn get(&self, x: usize, z: usize) -> f32 {
        self.values[z * self.width + x]
    }

    pub fn set(&mut self, x: usize, z: usize, value: f32) {
        self.values[z * self.width + x] = value;
    }

    /// One row of constant `z`.
    pub fn row(&self, z: usize) -> &[f32] {
        &self.values[z * self.width..(z + 1) * self.width]
    }

    /// One column of constant `x`, copied out.
    pub fn column(&self, x: usize) -> Vec<f32> {
        (0..self.depth).map(|z| self.get(x, z)).collect()
    }

    /// Flat row-major values.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Get the minimum height in this heightmap.
    pub fn min(&self) -> f32 {
        self.values.iter().copied().fold(f32::INFINITY, f32::min)
    }

    /// Get the maximum height in this heightmap.
    pub fn max(&self) -> f32 {
        self.values.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Raise every cell to `power`.
    ///
    /// Powers above one flatten low ground and sharpen peaks; powers below one
    /// do the opposite.
    pub fn apply_curve(&mut self, power: f32) {
        for value in &mut self.values {
            *value = value.powf(power);
        }
    }

    /// Multiply every cell by `factor`.
    pub fn scale(&mut self, factor: f32) {
        for value in &mut self.values {
            *value *= factor;
        }
    }
}

/// Grid shape, placement and fractal parameters for one heightmap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightmapParams {
    /// Samples along x.
    pub width: usize,
    /// Samples along z.
    pub depth: usize,
    /// World units per noise period at the first octave.
    pub scale: f64,
    pub octaves: u32,
    pub persistence: f64,
    pub lacunarity: f64,
    /// World x of the first column.
    pub offset_x: f64,
    /// World z of the first row.
    pub offset_z: f64,
    /// World span covered from the first to the last sample.
    pub chunk_size: f64,
}

impl Default for HeightmapParams {
    fn default() -> Self {
        Self {
            width: 32,
            depth: 32,
            scale: 50.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            offset_x: 0.0,
            offset_z: 0.0,
            chunk_size: 64.0,
        }
    }
}

/// Seeded heightmap generator. The permutation table is built once per seed.
#[derive(Debug, Clone)]
pub struct HeightmapGenerator {
    perlin: PerlinNoise,
}

impl HeightmapGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            perlin: PerlinNoise::new(seed),
        }
    }

    /// Generate a grid with every value in [0, 1].
    ///
    /// Cell `i` along an axis samples world coordinate
    /// `offset + i / (dimension - 1) * chunk_size`, so the first and last
    /// rows and columns land exactly on chunk borders. Rows are independent
    /// and computed in parallel.
    pub fn generate(&self, params: &HeightmapParams) -> Heightmap {
        let width = params.width;
        let depth = params.depth;
        let mut values = vec![0.0f32; width * depth];
        if width == 0 || depth == 0 {
            return Heightmap::from_values(width, depth, values);
        }

        values
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(z, row)| {
                let world_z = params.offset_z + edge_fraction(z, depth) * params.chunk_size;
                for (x, cell) in row.iter_mut().enumerate() {
                    let world_x = params.offset_x + edge_fraction(x, width) * params.chunk_size;
                    let noise = self.perlin.fractal(
                        world_x / params.scale,
                        world_z / params.scale,
                        params.octaves,
                        params.persistence,
                        params.lacunarity,
                    );
                    *cell = ((noise + 1.0) * 0.5).clamp(0.0, 1.0) as f32;
                }
            });

        Heightmap::from_values(width, depth, values)
    }
}

/// Position of sample `index` as a fraction of the span, hitting 1.0 exactly
/// on the last sample.
fn edge_fraction(index: usize, dimension: usize) -> f64 {
    if dimension <= 1 {
        0.0
    } else {
        index as f64 / (dimension - 1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params_at(offset_x: f64) -> HeightmapParams {
        HeightmapParams {
            offset_x,
            ..HeightmapParams::default()
        }
    }

    #[test]
    fn generate_is_bit_identical() {
        let a = Heightmap::generate(42, &params_at(0.0));
        let b = Heightmap::generate(42, &params_at(0.0));
        let a_bits: Vec<u32> = a.values().iter().map(|v| v.to_bits()).collect();
        let b_bits: Vec<u32> = b.values().iter().map(|v| v.to_bits()).collect();
        assert_eq!(a_bits, b_bits);
    }

    #[test]
    fn values_stay_normalized() {
        for octaves in 1..6 {
            let hm = Heightmap::generate(
                7,
                &HeightmapParams {
                    octaves,
                    scale: 10.0,
                    ..HeightmapParams::default()
                },
            );
            assert!(hm.min() >= 0.0);
            assert!(hm.max() <= 1.0);
        }
    }

    #[test]
    fn adjacent_grids_share_border_samples() {
        let generator = HeightmapGenerator::new(42);
        let left = generator.generate(&params_at(0.0));
        let right = generator.generate(&params_at(64.0));
        assert_eq!(left.column(left.width() - 1), right.column(0));
    }

    #[test]
    fn apply_curve_matches_pow() {
        let mut hm = Heightmap::from_values(3, 1, vec![0.0, 0.5, 1.0]);
        hm.apply_curve(2.0);
        let expected = [0.0, 0.25, 1.0];
        for (value, want) in hm.values().iter().zip(expected) {
            assert!((value - want).abs() < 1e-6);
        }
    }

    #[test]
    fn scale_multiplies_cells() {
        let mut hm = Heightmap::from_values(2, 1, vec![0.5, 1.0]);
        hm.scale(8.0);
        assert_eq!(hm.values(), &[4.0, 8.0]);
        assert_eq!(hm.min(), 4.0);
        assert_eq!(hm.max(), 8.0);
    }

    #[test]
    fn rows_and_columns_index_consistently() {
        let hm = Heightmap::from_values(3, 2, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(hm.row(1), &[3.0, 4.0, 5.0]);
        assert_eq!(hm.column(2), vec![2.0, 5.0]);
        assert_eq!(hm.get(1, 1), 4.0);
    }

    #[test]
    fn single_sample_grid_uses_offset() {
        let hm = Heightmap::generate(
            1,
            &HeightmapParams {
                width: 1,
                depth: 1,
                ..HeightmapParams::default()
            },
        );
        assert_eq!(hm.values().len(), 1);
    }
}
