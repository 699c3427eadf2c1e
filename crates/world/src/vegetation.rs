//! Per-chunk vegetation placement driven by biome.
//!
//! Each chunk is split into 4x4 world-unit cells. Every cell may receive one
//! tree and one plant, rolled against the cell's biome densities with an RNG
//! seeded from the world seed and chunk coordinate.

use crate::biome::{BiomeId, BiomeSource};
use crate::chunk::{ChunkCoord, HeightSource};
use eldergrove_core::scoped_rng;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use tracing::debug;

/// Placement cell edge length in world units.
pub const VEGETATION_CELL_SIZE: f32 = 4.0;

/// Kinds of vegetation that can be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum VegetationKind {
    OakTree,
    PineTree,
    MagicTree,
    CrystalTree,
    DeadTree,
    Grass,
    Bush,
    Mushroom,
    CrystalCluster,
    RuinsVine,
}

impl VegetationKind {
    /// Range the instance scale is drawn from.
    pub fn scale_range(self) -> (f32, f32) {
        match self {
            VegetationKind::OakTree => (3.0, 5.0),
            VegetationKind::PineTree => (4.0, 6.0),
            VegetationKind::MagicTree => (3.5, 5.5),
            VegetationKind::CrystalTree => (2.0, 4.0),
            VegetationKind::DeadTree => (3.0, 4.5),
            VegetationKind::Grass => (0.3, 0.6),
            VegetationKind::Bush => (0.8, 1.5),
            VegetationKind::Mushroom => (0.4, 0.8),
            VegetationKind::CrystalCluster => (0.5, 1.2),
            VegetationKind::RuinsVine => (0.6, 1.0),
        }
    }

    /// Base tint for rendering.
    pub fn color(self) -> [f32; 3] {
        match self {
            VegetationKind::OakTree => [0.3, 0.5, 0.2],
            VegetationKind::PineTree => [0.2, 0.4, 0.2],
            VegetationKind::MagicTree => [0.4, 0.3, 0.6],
            VegetationKind::CrystalTree => [0.5, 0.7, 0.9],
            VegetationKind::DeadTree => [0.3, 0.25, 0.2],
            VegetationKind::Grass => [0.3, 0.6, 0.2],
            VegetationKind::Bush => [0.25, 0.5, 0.2],
            VegetationKind::Mushroom => [0.8, 0.4, 0.3],
            VegetationKind::CrystalCluster => [0.6, 0.8, 1.0],
            VegetationKind::RuinsVine => [0.2, 0.4, 0.15],
        }
    }

    pub fn is_tree(self) -> bool {
        matches!(
            self,
            VegetationKind::OakTree
                | VegetationKind::PineTree
                | VegetationKind::MagicTree
                | VegetationKind::CrystalTree
                | VegetationKind::DeadTree
        )
    }
}

/// Weighted tree and plant tables for one biome.
#[derive(Debug, Clone, Copy)]
pub struct BiomeVegetation {
    pub trees: &'static [(VegetationKind, f32)],
    pub tree_density: f32,
    pub plants: &'static [(VegetationKind, f32)],
    pub plant_density: f32,
}

/// Vegetation tables for a biome.
pub fn biome_vegetation(biome: BiomeId) -> BiomeVegetation {
    use VegetationKind::*;
    match biome {
        BiomeId::Grasslands => BiomeVegetation {
            trees: &[(OakTree, 0.7), (PineTree, 0.3)],
            tree_density: 0.08,
            plants: &[(Grass, 0.6), (Bush, 0.4)],
            plant_density: 0.15,
        },
        BiomeId::EnchantedForest => BiomeVegetation {
            trees: &[(MagicTree, 0.8), (OakTree, 0.2)],
            tree_density: 0.12,
            plants: &[(Mushroom, 0.5), (Grass, 0.5)],
            plant_density: 0.20,
        },
        BiomeId::CrystalCaves => BiomeVegetation {
            trees: &[(CrystalTree, 1.0)],
            tree_density: 0.04,
            plants: &[(CrystalCluster, 0.8), (Mushroom, 0.2)],
            plant_density: 0.12,
        },
        BiomeId::FloatingIslands => BiomeVegetation {
            trees: &[(PineTree, 0.6), (MagicTree, 0.4)],
            tree_density: 0.06,
            plants: &[(Grass, 0.7), (Bush, 0.3)],
            plant_density: 0.15,
        },
        BiomeId::AncientRuins => BiomeVegetation {
            trees: &[(DeadTree, 0.7), (OakTree, 0.3)],
            tree_density: 0.05,
            plants: &[(RuinsVine, 0.6), (Grass, 0.4)],
            plant_density: 0.10,
        },
    }
}

/// A single placed tree or plant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VegetationInstance {
    pub position: Vec3,
    pub scale: f32,
    /// Rotation about +Y in degrees.
    pub rotation_y: f32,
    pub kind: VegetationKind,
}

/// Populates chunks with vegetation during generation.
pub trait VegetationProvider {
    /// Instances for one chunk. Called once per chunk generation; must not
    /// call back into the chunk manager.
    fn generate_for_chunk(
        &mut self,
        coord: ChunkCoord,
        chunk_size: f32,
        biomes: &dyn BiomeSource,
        heights: &dyn HeightSource,
    ) -> Vec<VegetationInstance>;

    /// Forget anything held for an unloaded chunk.
    fn clear_chunk(&mut self, _coord: ChunkCoord) {}
}

/// Shared provider, so the caller can read placements after generation.
impl<T: VegetationProvider> VegetationProvider for Rc<RefCell<T>> {
    fn generate_for_chunk(
        &mut self,
        coord: ChunkCoord,
        chunk_size: f32,
        biomes: &dyn BiomeSource,
        heights: &dyn HeightSource,
    ) -> Vec<VegetationInstance> {
        self.borrow_mut()
            .generate_for_chunk(coord, chunk_size, biomes, heights)
    }

    fn clear_chunk(&mut self, coord: ChunkCoord) {
        self.borrow_mut().clear_chunk(coord);
    }
}

/// Counts of cached vegetation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VegetationStats {
    pub total_instances: usize,
    pub loaded_chunks: usize,
    pub by_kind: BTreeMap<VegetationKind, usize>,
}

/// Deterministic vegetation placement with a per-chunk cache.
pub struct VegetationManager {
    seed: u64,
    instances: HashMap<ChunkCoord, Vec<VegetationInstance>>,
}

impl VegetationManager {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            instances: HashMap::new(),
        }
    }

    /// Cached instances for a chunk, empty if never generated.
    pub fn instances_for(&self, coord: ChunkCoord) -> &[VegetationInstance] {
        self.instances
            .get(&coord)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn total_instances(&self) -> usize {
        self.instances.values().map(Vec::len).sum()
    }

    pub fn stats(&self) -> VegetationStats {
        let mut by_kind = BTreeMap::new();
        for instance in self.instances.values().flatten() {
            *by_kind.entry(instance.kind).or_insert(0) += 1;
        }
        VegetationStats {
            total_instances: self.total_instances(),
            loaded_chunks: self.instances.len(),
            by_kind,
        }
    }

    fn place(
        &self,
        coord: ChunkCoord,
        chunk_size: f32,
        biomes: &dyn BiomeSource,
        heights: &dyn HeightSource,
    ) -> Vec<VegetationInstance> {
        let chunk_hash = (coord.x as i64)
            .wrapping_mul(73_856_093)
            .wrapping_add((coord.z as i64).wrapping_mul(19_349_663)) as u64;
        let mut rng = scoped_rng(self.seed, chunk_hash);

        let (world_x, world_z) = coord.origin(chunk_size);
        let cells = (chunk_size / VEGETATION_CELL_SIZE) as usize;
        let half = VEGETATION_CELL_SIZE * 0.5;
        let mut placed = Vec::new();

        for i in 0..cells {
            for j in 0..cells {
                let cell_x = world_x + i as f32 * VEGETATION_CELL_SIZE + half;
                let cell_z = world_z + j as f32 * VEGETATION_CELL_SIZE + half;
                let table = biome_vegetation(biomes.biome_at(cell_x, cell_z));

                if rng.gen::<f32>() < table.tree_density {
                    if let Some(kind) = choose_weighted(table.trees, &mut rng) {
                        placed.push(place_instance(kind, cell_x, cell_z, heights, &mut rng));
                    }
                }
                if rng.gen::<f32>() < table.plant_density {
                    if let Some(kind) = choose_weighted(table.plants, &mut rng) {
                        placed.push(place_instance(kind, cell_x, cell_z, heights, &mut rng));
                    }
                }
            }
        }
        placed
    }
}

impl VegetationProvider for VegetationManager {
    fn generate_for_chunk(
        &mut self,
        coord: ChunkCoord,
        chunk_size: f32,
        biomes: &dyn BiomeSource,
        heights: &dyn HeightSource,
    ) -> Vec<VegetationInstance> {
        if let Some(cached) = self.instances.get(&coord) {
            return cached.clone();
        }
        let placed = self.place(coord, chunk_size, biomes, heights);
        debug!(chunk = %coord, count = placed.len(), "Placed vegetation");
        self.instances.insert(coord, placed.clone());
        placed
    }

    fn clear_chunk(&mut self, coord: ChunkCoord) {
        self.instances.remove(&coord);
    }
}

fn place_instance(
    kind: VegetationKind,
    cell_x: f32,
    cell_z: f32,
    heights: &dyn HeightSource,
    rng: &mut StdRng,
) -> VegetationInstance {
    let half = VEGETATION_CELL_SIZE * 0.5;
    let x = cell_x + rng.gen_range(-half..=half);
    let z = cell_z + rng.gen_range(-half..=half);
    let (min_scale, max_scale) = kind.scale_range();
    VegetationInstance {
        position: Vec3::new(x, heights.height_at(x, z), z),
        scale: rng.gen_range(min_scale..=max_scale),
        rotation_y: rng.gen_range(0.0..360.0),
        kind,
    }
}

/// Pick from `(item, weight)` pairs proportionally to weight.
pub(crate) fn choose_weighted<T: Copy>(choices: &[(T, f32)], rng: &mut StdRng) -> Option<T> {
    let (last, _) = *choices.last()?;
    let total: f32 = choices.iter().map(|(_, weight)| weight).sum();
    let roll = rng.gen_range(0.0..=total);
    let mut cumulative = 0.0;
    for (item, weight) in choices {
        cumulative += weight;
        if roll <= cumulative {
            return Some(*item);
        }
    }
    Some(last)
}
