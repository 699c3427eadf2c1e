//! Biome system for terrain generation.
//!
//! Classifies world positions from three value-noise channels (temperature,
//! moisture and magic) and blends neighboring classifications for smooth
//! height and color transitions.

use crate::config::StreamingConfig;
use crate::noise::{NoiseConfig, NoiseGenerator, ValueNoise};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

/// Biome identifier.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum BiomeId {
    #[default]
    Grasslands = 0,
    EnchantedForest = 1,
    CrystalCaves = 2,
    FloatingIslands = 3,
    AncientRuins = 4,
}

impl BiomeId {
    /// Get all biome IDs (for iteration).
    pub fn all() -> &'static [BiomeId] {
        &[
            BiomeId::Grasslands,
            BiomeId::EnchantedForest,
            BiomeId::CrystalCaves,
            BiomeId::FloatingIslands,
            BiomeId::AncientRuins,
        ]
    }

    /// Static properties of this biome.
    pub fn definition(self) -> &'static BiomeDefinition {
        &BIOME_DEFINITIONS[self as usize]
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        self.definition().name
    }
}

impl std::fmt::Display for BiomeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-biome terrain, color and atmosphere properties.
#[derive(Debug, Clone, PartialEq)]
pub struct BiomeDefinition {
    pub id: BiomeId,
    pub name: &'static str,
    /// Vertex color for terrain in this biome.
    pub color: [f32; 3],
    /// Multiplier applied to normalized heights.
    pub height_scale: f32,
    pub tree_density: f32,
    pub grass_density: f32,
    pub fog_color: [f32; 3],
    pub fog_density: f32,
}

static BIOME_DEFINITIONS: [BiomeDefinition; 5] = [
    BiomeDefinition {
        id: BiomeId::Grasslands,
        name: "Grasslands",
        color: [0.3, 0.6, 0.2],
        height_scale: 5.0,
        tree_density: 0.1,
        grass_density: 0.8,
        fog_color: [0.7, 0.8, 0.9],
        fog_density: 0.001,
    },
    BiomeDefinition {
        id: BiomeId::EnchantedForest,
        name: "Enchanted Forest",
        color: [0.1, 0.4, 0.3],
        height_scale: 8.0,
        tree_density: 0.7,
        grass_density: 0.5,
        fog_color: [0.2, 0.4, 0.3],
        fog_density: 0.003,
    },
    BiomeDefinition {
        id: BiomeId::CrystalCaves,
        name: "Crystal Caves",
        color: [0.5, 0.3, 0.7],
        height_scale: 3.0,
        tree_density: 0.0,
        grass_density: 0.1,
        fog_color: [0.4, 0.2, 0.5],
        fog_density: 0.002,
    },
    BiomeDefinition {
        id: BiomeId::FloatingIslands,
        name: "Floating Islands",
        color: [0.6, 0.7, 0.9],
        height_scale: 15.0,
        tree_density: 0.3,
        grass_density: 0.6,
        fog_color: [0.8, 0.9, 1.0],
        fog_density: 0.0005,
    },
    BiomeDefinition {
        id: BiomeId::AncientRuins,
        name: "Ancient Ruins",
        color: [0.5, 0.4, 0.3],
        height_scale: 2.0,
        tree_density: 0.05,
        grass_density: 0.2,
        fog_color: [0.6, 0.5, 0.4],
        fog_density: 0.002,
    },
];

/// Raw noise channel values at a position, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClimateSample {
    pub temperature: f64,
    pub moisture: f64,
    pub magic: f64,
}

/// Fixed decision tree from climate to biome. The first matching rule wins.
pub fn select_biome(climate: ClimateSample) -> BiomeId {
    let ClimateSample {
        temperature,
        moisture,
        magic,
    } = climate;

    if magic > 0.7 && temperature > 0.5 {
        BiomeId::FloatingIslands
    } else if magic > 0.7 {
        BiomeId::CrystalCaves
    } else if temperature > 0.6 && moisture < 0.3 {
        BiomeId::AncientRuins
    } else if moisture > 0.6 && temperature < 0.5 {
        BiomeId::EnchantedForest
    } else {
        BiomeId::Grasslands
    }
}

/// Anything that can answer biome queries for world positions.
pub trait BiomeSource {
    /// Biome at a world position.
    fn biome_at(&self, x: f32, z: f32) -> BiomeId;

    /// Height multiplier at a world position.
    fn height_scale_at(&self, x: f32, z: f32) -> f32 {
        self.biome_at(x, z).definition().height_scale
    }
}

/// A biome source that reports one biome everywhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UniformBiome(pub BiomeId);

impl BiomeSource for UniformBiome {
    fn biome_at(&self, _x: f32, _z: f32) -> BiomeId {
        self.0
    }
}

/// Snapshot of everything the classifier knows about one position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BiomeDebugInfo {
    pub biome: BiomeId,
    pub climate: ClimateSample,
    pub weights: BTreeMap<BiomeId, f32>,
    pub height_scale: f32,
    pub color: [f32; 3],
}

/// Noise-driven biome classifier with a coarse spatial cache.
///
/// The cache maps `floor(world / cache_resolution)` cells to the biome of the
/// cell's minimum corner, so cached answers do not depend on query order. It
/// only ever grows until [`BiomeClassifier::clear_cache`] empties it.
pub struct BiomeClassifier {
    temperature: NoiseGenerator<ValueNoise>,
    moisture: NoiseGenerator<ValueNoise>,
    magic: NoiseGenerator<ValueNoise>,
    cache_resolution: f32,
    blend_distance: f32,
    cache: RefCell<HashMap<(i64, i64), BiomeId>>,
}

impl BiomeClassifier {
    /// Create a classifier with default scale, cache and blend settings.
    pub fn new(world_seed: u64) -> Self {
        Self::from_config(&StreamingConfig {
            world_seed,
            ..StreamingConfig::default()
        })
    }

    /// Create a classifier from the biome fields of a streaming config.
    pub fn from_config(config: &StreamingConfig) -> Self {
        let seed = config.world_seed;
        let scale = config.biome_scale;
        Self {
            temperature: NoiseGenerator::value(NoiseConfig::temperature(seed, scale)),
            moisture: NoiseGenerator::value(NoiseConfig::moisture(seed, scale)),
            magic: NoiseGenerator::value(NoiseConfig::magic(seed, scale)),
            cache_resolution: config.biome_cache_resolution,
            blend_distance: config.biome_blend_distance,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Sample the three climate channels without touching the cache.
    pub fn climate(&self, x: f32, z: f32) -> ClimateSample {
        let (x, z) = (x as f64, z as f64);
        ClimateSample {
            temperature: self.temperature.sample_2d(x, z),
            moisture: self.moisture.sample_2d(x, z),
            magic: self.magic.sample_2d(x, z),
        }
    }

    /// Biome at a world position, served from the cache when possible.
    pub fn classify(&self, x: f32, z: f32) -> BiomeId {
        let key = self.cache_key(x, z);
        if let Some(biome) = self.cache.borrow().get(&key) {
            return *biome;
        }

        let corner_x = key.0 as f32 * self.cache_resolution;
        let corner_z = key.1 as f32 * self.cache_resolution;
        let biome = select_biome(self.climate(corner_x, corner_z));
        self.cache.borrow_mut().insert(key, biome);
        biome
    }

    /// Occurrence frequency of each biome over a 3x3 grid around the point.
    ///
    /// Samples are spaced `blend_distance / 2` apart; weights sum to 1.
    pub fn blend_weights(&self, x: f32, z: f32) -> BTreeMap<BiomeId, f32> {
        let step = self.blend_distance * 0.5;
        let mut weights = BTreeMap::new();
        for dz in -1..=1 {
            for dx in -1..=1 {
                let biome = self.classify(x + dx as f32 * step, z + dz as f32 * step);
                *weights.entry(biome).or_insert(0.0) += 1.0 / 9.0;
            }
        }
        weights
    }

    /// Blend-weighted height multiplier.
    pub fn height_scale(&self, x: f32, z: f32) -> f32 {
        self.blend_weights(x, z)
            .iter()
            .map(|(biome, weight)| biome.definition().height_scale * weight)
            .sum()
    }

    /// Blend-weighted terrain color.
    pub fn color(&self, x: f32, z: f32) -> [f32; 3] {
        let mut color = [0.0; 3];
        for (biome, weight) in self.blend_weights(x, z) {
            for (channel, value) in color.iter_mut().zip(biome.definition().color) {
                *channel += value * weight;
            }
        }
        color
    }

    /// Full classification details at a position.
    pub fn debug_info(&self, x: f32, z: f32) -> BiomeDebugInfo {
        BiomeDebugInfo {
            biome: self.classify(x, z),
            climate: self.climate(x, z),
            weights: self.blend_weights(x, z),
            height_scale: self.height_scale(x, z),
            color: self.color(x, z),
        }
    }

    /// Drop every cached classification.
    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Number of cached cells.
    pub fn cache_len(&self) -> usize {
        self.cache.borrow().len()
    }

    fn cache_key(&self, x: f32, z: f32) -> (i64, i64) {
        (
            (x / self.cache_resolution).floor() as i64,
            (z / self.cache_resolution).floor() as i64,
        )
    }
}

impl BiomeSource for BiomeClassifier {
    fn biome_at(&self, x: f32, z: f32) -> BiomeId {
        self.classify(x, z)
    }

    fn height_scale_at(&self, x: f32, z: f32) -> f32 {
        self.height_scale(x, z)
    }
}

/// Per-vertex biome ids for one chunk, row-major `[z][x]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiomeMap {
    resolution: usize,
    ids: Vec<BiomeId>,
}

impl BiomeMap {
    /// A map with every cell set to `biome`.
    pub fn filled(resolution: usize, biome: BiomeId) -> Self {
        Self {
            resolution,
            ids: vec![biome; resolution * resolution],
        }
    }

    /// Classify every vertex of a chunk grid.
    pub fn classify(
        resolution: usize,
        origin_x: f32,
        origin_z: f32,
        chunk_size: f32,
        source: &dyn BiomeSource,
    ) -> Self {
        let step = chunk_size / (resolution.max(2) - 1) as f32;
        let mut ids = Vec::with_capacity(resolution * resolution);
        for z in 0..resolution {
            for x in 0..resolution {
                ids.push(source.biome_at(
                    origin_x + x as f32 * step,
                    origin_z + z as f32 * step,
                ));
            }
        }
        Self { resolution, ids }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Biome at grid cell `(x, z)`.
    pub fn get(&self, x: usize, z: usize) -> BiomeId {
        self.ids[z * self.resolution + x]
    }

    /// Every distinct biome present, in id order.
    pub fn distinct(&self) -> Vec<BiomeId> {
        let mut seen: Vec<BiomeId> = self.ids.clone();
        seen.sort();
        seen.dedup();
        seen
    }
}
