//! Streaming configuration shared by the chunk manager and its generators.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fractal noise parameters for terrain heightmaps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainNoise {
    /// World units per noise period at the first octave.
    pub scale: f64,
    /// Number of octaves summed.
    pub octaves: u32,
    /// Amplitude multiplier between octaves.
    pub persistence: f64,
    /// Frequency multiplier between octaves.
    pub lacunarity: f64,
}

impl Default for TerrainNoise {
    fn default() -> Self {
        Self {
            scale: 50.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

/// Configuration for chunk streaming and terrain generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Edge length of one chunk in world units.
    pub chunk_size: f32,
    /// Vertices per chunk edge.
    pub resolution: usize,
    /// Chunks within this per-axis distance of the player are loaded.
    pub load_distance: i32,
    /// Chunks beyond this per-axis distance of the player are unloaded.
    pub unload_distance: i32,
    /// Seed for every noise channel in the world.
    pub world_seed: u64,
    /// World units per biome noise period.
    pub biome_scale: f64,
    /// Sampling span used when blending biome weights.
    pub biome_blend_distance: f32,
    /// Cell size of the biome classification cache.
    pub biome_cache_resolution: f32,
    /// Heightmap noise parameters.
    pub terrain: TerrainNoise,
    /// Exponent applied to normalized heights before biome scaling.
    pub height_curve: f32,
    /// Height scale used when no biome source is attached.
    pub default_height_scale: f32,
    /// Depth of border skirts below the lowest vertex of a chunk.
    pub skirt_depth: f32,
    /// Queue newly required chunks nearest-first instead of in scan order.
    pub nearest_first: bool,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 64.0,
            resolution: 32,
            load_distance: 3,
            unload_distance: 5,
            world_seed: 42,
            biome_scale: 200.0,
            biome_blend_distance: 16.0,
            biome_cache_resolution: 16.0,
            terrain: TerrainNoise::default(),
            height_curve: 1.5,
            default_height_scale: 5.0,
            skirt_depth: 20.0,
            nearest_first: false,
        }
    }
}

/// Reasons a [`StreamingConfig`] is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("chunk_size must be positive, got {0}")]
    ChunkSize(f32),
    #[error("resolution must be at least 2, got {0}")]
    Resolution(usize),
    #[error("load_distance must be positive, got {0}")]
    LoadDistance(i32),
    #[error("unload_distance ({unload}) must exceed load_distance ({load})")]
    UnloadDistance { load: i32, unload: i32 },
    #[error("biome_scale must be positive, got {0}")]
    BiomeScale(f64),
    #[error("biome_cache_resolution must be positive, got {0}")]
    BiomeCacheResolution(f32),
    #[error("biome_blend_distance must not be negative, got {0}")]
    BiomeBlendDistance(f32),
    #[error("terrain noise {field} is invalid: {value}")]
    TerrainNoise { field: &'static str, value: f64 },
    #[error("height_curve must be positive, got {0}")]
    HeightCurve(f32),
}

impl StreamingConfig {
    /// Check every field, returning the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Negated comparisons also reject NaN.
        if !(self.chunk_size > 0.0) {
            return Err(ConfigError::ChunkSize(self.chunk_size));
        }
        if self.resolution < 2 {
            return Err(ConfigError::Resolution(self.resolution));
        }
        if self.load_distance <= 0 {
            return Err(ConfigError::LoadDistance(self.load_distance));
        }
        if self.unload_distance <= self.load_distance {
            return Err(ConfigError::UnloadDistance {
                load: self.load_distance,
                unload: self.unload_distance,
            });
        }
        if !(self.biome_scale > 0.0) {
            return Err(ConfigError::BiomeScale(self.biome_scale));
        }
        if !(self.biome_cache_resolution > 0.0) {
            return Err(ConfigError::BiomeCacheResolution(
                self.biome_cache_resolution,
            ));
        }
        if !(self.biome_blend_distance >= 0.0) {
            return Err(ConfigError::BiomeBlendDistance(self.biome_blend_distance));
        }
        if !(self.height_curve > 0.0) {
            return Err(ConfigError::HeightCurve(self.height_curve));
        }

        let terrain = &self.terrain;
        if terrain.octaves == 0 {
            return Err(ConfigError::TerrainNoise {
                field: "octaves",
                value: 0.0,
            });
        }
        for (field, value) in [
            ("scale", terrain.scale),
            ("persistence", terrain.persistence),
            ("lacunarity", terrain.lacunarity),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::TerrainNoise { field, value });
            }
        }
        Ok(())
    }

    /// Distance between adjacent heightmap vertices in world units.
    pub fn vertex_spacing(&self) -> f32 {
        self.chunk_size / (self.resolution.max(2) - 1) as f32
    }
}
