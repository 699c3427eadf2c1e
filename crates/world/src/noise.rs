//! Noise generation utilities for terrain generation.
//!
//! Two deterministic 2D noise variants are provided: hashed value noise in
//! [0, 1] used for biome channels, and gradient Perlin noise in [-1, 1] used
//! for heightmaps. They have different corner functions and ranges and are
//! not interchangeable.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// A seeded 2D noise function.
pub trait NoiseSource {
    /// Single-octave sample at `(x, z)`.
    fn noise2d(&self, x: f64, z: f64) -> f64;

    /// Multi-octave sample normalized by the sum of octave amplitudes.
    ///
    /// The result stays in the range of [`NoiseSource::noise2d`] regardless of
    /// octave count. `octaves` below one is treated as one.
    fn fractal(&self, x: f64, z: f64, octaves: u32, persistence: f64, lacunarity: f64) -> f64 {
        let mut value = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut max_value = 0.0;

        for _ in 0..octaves.max(1) {
            value += self.noise2d(x * frequency, z * frequency) * amplitude;
            max_value += amplitude;

            amplitude *= persistence;
            frequency *= lacunarity;
        }

        value / max_value
    }
}

/// Configuration for multi-octave noise generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseConfig {
    /// Number of octaves (layers of detail)
    pub octaves: u32,
    /// Frequency multiplier between octaves
    pub lacunarity: f64,
    /// Amplitude multiplier between octaves (persistence)
    pub persistence: f64,
    /// World units per noise period; inputs are divided by this
    pub scale: f64,
    /// Seed for deterministic generation
    pub seed: u64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            scale: 1.0,
            seed: 0,
        }
    }
}

impl NoiseConfig {
    /// Temperature channel for biome classification.
    pub fn temperature(seed: u64, scale: f64) -> Self {
        Self {
            octaves: 2,
            scale,
            seed,
            ..Self::default()
        }
    }

    /// Moisture channel for biome classification.
    pub fn moisture(seed: u64, scale: f64) -> Self {
        Self {
            octaves: 2,
            scale,
            seed: seed.wrapping_add(1000), // Offset seed
            ..Self::default()
        }
    }

    /// Magic channel for biome classification.
    pub fn magic(seed: u64, scale: f64) -> Self {
        Self {
            octaves: 3,
            scale,
            seed: seed.wrapping_add(2000), // Offset seed
            ..Self::default()
        }
    }
}

/// Noise generator pairing a noise source with its octave configuration.
pub struct NoiseGenerator<N> {
    source: N,
    config: NoiseConfig,
}

impl<N: NoiseSource> NoiseGenerator<N> {
    /// Create a generator from an already seeded source.
    pub fn new(source: N, config: NoiseConfig) -> Self {
        Self { source, config }
    }

    /// Fractal sample at world coordinates.
    pub fn sample_2d(&self, x: f64, z: f64) -> f64 {
        self.source.fractal(
            x / self.config.scale,
            z / self.config.scale,
            self.config.octaves,
            self.config.persistence,
            self.config.lacunarity,
        )
    }

    /// The octave configuration.
    pub fn config(&self) -> &NoiseConfig {
        &self.config
    }
}

impl NoiseGenerator<ValueNoise> {
    /// Value-noise generator seeded from `config.seed`.
    pub fn value(config: NoiseConfig) -> Self {
        Self::new(ValueNoise::new(config.seed), config)
    }
}

/// Hashed-corner value noise with smoothstep interpolation, range [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueNoise {
    seed: i64,
}

impl ValueNoise {
    /// Create value noise for a seed.
    pub fn new(seed: u64) -> Self {
        Self { seed: seed as i64 }
    }

    /// Pseudo-random value in [0, 1] for an integer lattice corner.
    pub fn hash(ix: i64, iz: i64, seed: i64) -> f64 {
        let mut n = ix
            .wrapping_mul(374_761_393)
            .wrapping_add(iz.wrapping_mul(668_265_263))
            .wrapping_add(seed.wrapping_mul(1_013_904_223));
        n = (n ^ (n >> 13)).wrapping_mul(1_274_126_177);
        ((n ^ (n >> 16)) & 0x7fff_ffff) as f64 / 0x7fff_ffff as f64
    }
}

impl NoiseSource for ValueNoise {
    fn noise2d(&self, x: f64, z: f64) -> f64 {
        let x0 = x.floor();
        let z0 = z.floor();
        let ix = x0 as i64;
        let iz = z0 as i64;

        let sx = smoothstep(x - x0);
        let sz = smoothstep(z - z0);

        let n00 = Self::hash(ix, iz, self.seed);
        let n10 = Self::hash(ix.wrapping_add(1), iz, self.seed);
        let n01 = Self::hash(ix, iz.wrapping_add(1), self.seed);
        let n11 = Self::hash(ix.wrapping_add(1), iz.wrapping_add(1), self.seed);

        let nx0 = lerp(n00, n10, sx);
        let nx1 = lerp(n01, n11, sx);
        lerp(nx0, nx1, sz)
    }
}

/// Classic gradient noise over a seeded permutation table, range [-1, 1].
#[derive(Clone)]
pub struct PerlinNoise {
    perm: [u8; 512],
}

impl PerlinNoise {
    /// Build the permutation table by shuffling 0..=255 with a seeded RNG.
    pub fn new(seed: u64) -> Self {
        let mut base: Vec<u8> = (0..=255).collect();
        base.shuffle(&mut StdRng::seed_from_u64(seed));

        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().enumerate() {
            *slot = base[i & 255];
        }
        Self { perm }
    }

    fn corner(&self, xi: usize, yi: usize) -> u8 {
        self.perm[self.perm[xi] as usize + yi]
    }
}

impl std::fmt::Debug for PerlinNoise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerlinNoise")
            .field("perm", &&self.perm[..8])
            .finish_non_exhaustive()
    }
}

impl NoiseSource for PerlinNoise {
    fn noise2d(&self, x: f64, z: f64) -> f64 {
        let x0 = x.floor();
        let z0 = z.floor();
        let xi = (x0 as i64 & 255) as usize;
        let zi = (z0 as i64 & 255) as usize;
        let xf = x - x0;
        let zf = z - z0;

        let u = fade(xf);
        let v = fade(zf);

        let aa = self.corner(xi, zi);
        let ab = self.corner(xi, zi + 1);
        let ba = self.corner(xi + 1, zi);
        let bb = self.corner(xi + 1, zi + 1);

        let x1 = lerp(grad(aa, xf, zf), grad(ba, xf - 1.0, zf), u);
        let x2 = lerp(grad(ab, xf, zf - 1.0), grad(bb, xf - 1.0, zf - 1.0), u);
        lerp(x1, x2, v)
    }
}

fn smoothstep(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}

fn grad(hash: u8, x: f64, y: f64) -> f64 {
    match hash & 3 {
        0 => x + y,
        1 => -x + y,
        2 => x - y,
        _ => -x - y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_noise_is_deterministic() {
        let a = ValueNoise::new(42);
        let b = ValueNoise::new(42);
        for i in 0..50 {
            let x = i as f64 * 0.37 - 9.0;
            let z = i as f64 * -0.91 + 3.0;
            assert_eq!(a.noise2d(x, z).to_bits(), b.noise2d(x, z).to_bits());
        }
    }

    #[test]
    fn value_noise_stays_in_unit_range() {
        let noise = ValueNoise::new(7);
        for i in -100..100 {
            let v = noise.noise2d(i as f64 * 0.173, i as f64 * -0.311);
            assert!((0.0..=1.0).contains(&v), "value noise out of range: {v}");
        }
    }

    #[test]
    fn value_noise_hits_lattice_hash() {
        let noise = ValueNoise::new(3);
        assert_eq!(noise.noise2d(5.0, -2.0), ValueNoise::hash(5, -2, 3));
    }

    #[test]
    fn perlin_is_zero_on_lattice() {
        let noise = PerlinNoise::new(42);
        for i in -5..5 {
            assert_eq!(noise.noise2d(i as f64, (i * 3) as f64), 0.0);
        }
    }

    #[test]
    fn perlin_stays_in_signed_unit_range() {
        let noise = PerlinNoise::new(99);
        for i in -200..200 {
            let v = noise.noise2d(i as f64 * 0.137 + 0.5, i as f64 * 0.071 - 0.25);
            assert!(v.abs() <= 1.0 + 1e-9, "perlin out of range: {v}");
        }
    }

    #[test]
    fn perlin_seed_changes_output() {
        let a = PerlinNoise::new(1);
        let b = PerlinNoise::new(2);
        let differs = (0..64).any(|i| {
            let x = i as f64 * 0.29 + 0.1;
            a.noise2d(x, x * 0.5) != b.noise2d(x, x * 0.5)
        });
        assert!(differs);
    }

    #[test]
    fn fractal_keeps_base_range() {
        let noise = ValueNoise::new(11);
        for octaves in 1..6 {
            let v = noise.fractal(12.3, -4.5, octaves, 0.5, 2.0);
            assert!((0.0..=1.0).contains(&v));
        }
        assert_eq!(
            noise.fractal(1.25, 2.5, 1, 0.5, 2.0),
            noise.noise2d(1.25, 2.5)
        );
    }

    #[test]
    fn channel_presets_offset_seeds() {
        let t = NoiseConfig::temperature(10, 200.0);
        let m = NoiseConfig::moisture(10, 200.0);
        let g = NoiseConfig::magic(10, 200.0);
        assert_eq!((t.seed, m.seed, g.seed), (10, 1010, 2010));
        assert_eq!((t.octaves, m.octaves, g.octaves), (2, 2, 3));
    }
}
