//! Per-chunk enemy spawning driven by a chunk's primary biome.

use crate::biome::BiomeId;
use crate::chunk::{ChunkCoord, HeightSource};
use crate::vegetation::choose_weighted;
use eldergrove_core::{scoped_rng, EntityHandle};
use glam::Vec3;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Distance kept between spawns and the chunk border, in world units.
pub const SPAWN_EDGE_MARGIN: f32 = 8.0;

/// Broad enemy archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum EnemyKind {
    Weak,
    Normal,
    Tank,
    Fast,
}

/// A spawn request produced for a chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct EnemySpawn {
    pub position: Vec3,
    pub kind: EnemyKind,
    pub name: &'static str,
    pub biome: BiomeId,
}

/// Inclusive range of spawns per chunk for a biome.
pub fn spawn_density(biome: BiomeId) -> (u32, u32) {
    match biome {
        BiomeId::Grasslands => (1, 3),
        BiomeId::EnchantedForest => (2, 4),
        BiomeId::CrystalCaves => (1, 2),
        BiomeId::FloatingIslands => (1, 3),
        BiomeId::AncientRuins => (2, 5),
    }
}

/// Weighted enemy kinds for a biome.
pub fn spawn_table(biome: BiomeId) -> &'static [(EnemyKind, f32)] {
    use EnemyKind::*;
    match biome {
        BiomeId::Grasslands => &[(Weak, 0.5), (Normal, 0.35), (Tank, 0.15)],
        BiomeId::EnchantedForest => &[(Fast, 0.4), (Weak, 0.35), (Normal, 0.25)],
        BiomeId::CrystalCaves => &[(Tank, 0.5), (Normal, 0.35), (Fast, 0.15)],
        BiomeId::FloatingIslands => &[(Fast, 0.5), (Normal, 0.35), (Weak, 0.15)],
        BiomeId::AncientRuins => &[(Tank, 0.4), (Normal, 0.4), (Weak, 0.2)],
    }
}

/// Flavor names for an enemy kind in a biome.
pub fn enemy_names(biome: BiomeId, kind: EnemyKind) -> &'static [&'static str] {
    use EnemyKind::*;
    match (biome, kind) {
        (BiomeId::Grasslands, Weak) => &["Wolf Pup", "Young Bear", "Wild Boar"],
        (BiomeId::Grasslands, Normal) => &["Wolf", "Bear", "Mountain Lion"],
        (BiomeId::Grasslands, Tank) => &["Alpha Wolf", "Grizzly Bear", "Elder Boar"],
        (BiomeId::Grasslands, Fast) => &["Swift Fox", "Rabid Wolf", "Pouncing Cat"],
        (BiomeId::EnchantedForest, Weak) => &["Wisp", "Tiny Spirit", "Glowbug"],
        (BiomeId::EnchantedForest, Normal) => &["Forest Spirit", "Tree Guardian", "Fae Warrior"],
        (BiomeId::EnchantedForest, Tank) => &["Ancient Treant", "Elder Spirit", "Forest Colossus"],
        (BiomeId::EnchantedForest, Fast) => &["Swift Spirit", "Shadow Fae", "Flickering Wisp"],
        (BiomeId::CrystalCaves, Weak) => &["Crystal Bat", "Cave Rat", "Gem Beetle"],
        (BiomeId::CrystalCaves, Normal) => &["Crystal Guardian", "Stone Elemental", "Cave Dweller"],
        (BiomeId::CrystalCaves, Tank) => &["Crystal Golem", "Stone Titan", "Gem Giant"],
        (BiomeId::CrystalCaves, Fast) => &["Swooping Bat", "Quick Crawler", "Darting Shade"],
        (BiomeId::FloatingIslands, Weak) => &["Sky Minnow", "Cloud Wisp", "Wind Sprite"],
        (BiomeId::FloatingIslands, Normal) => &["Sky Serpent", "Wind Elemental", "Air Guardian"],
        (BiomeId::FloatingIslands, Tank) => &["Storm Drake", "Thunder Titan", "Sky Colossus"],
        (BiomeId::FloatingIslands, Fast) => &["Lightning Serpent", "Swift Wind", "Darting Drake"],
        (BiomeId::AncientRuins, Weak) => &["Skeleton", "Zombie", "Restless Spirit"],
        (BiomeId::AncientRuins, Normal) => &["Undead Warrior", "Cursed Knight", "Ancient Soldier"],
        (BiomeId::AncientRuins, Tank) => &["Undead Guardian", "Tomb Lord", "Ancient Champion"],
        (BiomeId::AncientRuins, Fast) => &["Wraith", "Shadow Fiend", "Quick Revenant"],
    }
}

/// Produces enemy spawns for freshly generated chunks.
pub trait SpawnProvider {
    /// Spawns for one chunk. Called once per chunk generation; must not call
    /// back into the chunk manager.
    fn generate_spawns(
        &mut self,
        coord: ChunkCoord,
        chunk_size: f32,
        biome: BiomeId,
        heights: &dyn HeightSource,
    ) -> Vec<EnemySpawn>;
}

/// External owner of live enemies.
pub trait EnemySink {
    /// Take ownership of a spawned enemy, returning its handle.
    fn add_enemy(&mut self, spawn: EnemySpawn) -> EntityHandle;

    /// The chunk that spawned these enemies was unloaded.
    fn release_enemies(&mut self, _handles: &[EntityHandle]) {}
}

/// Shared sink, so the caller can inspect enemies the manager spawned.
impl<T: EnemySink> EnemySink for Rc<RefCell<T>> {
    fn add_enemy(&mut self, spawn: EnemySpawn) -> EntityHandle {
        self.borrow_mut().add_enemy(spawn)
    }

    fn release_enemies(&mut self, handles: &[EntityHandle]) {
        self.borrow_mut().release_enemies(handles);
    }
}

/// Deterministic biome-weighted spawner.
#[derive(Debug, Clone)]
pub struct SpawnSystem {
    seed: u64,
}

impl SpawnSystem {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl SpawnProvider for SpawnSystem {
    fn generate_spawns(
        &mut self,
        coord: ChunkCoord,
        chunk_size: f32,
        biome: BiomeId,
        heights: &dyn HeightSource,
    ) -> Vec<EnemySpawn> {
        let chunk_hash = (coord.x as i64)
            .wrapping_mul(1000)
            .wrapping_add(coord.z as i64) as u64;
        let mut rng = scoped_rng(self.seed, chunk_hash);

        let (min_spawns, max_spawns) = spawn_density(biome);
        let count = rng.gen_range(min_spawns..=max_spawns);
        let (base_x, base_z) = coord.origin(chunk_size);
        let far = (chunk_size - SPAWN_EDGE_MARGIN).max(SPAWN_EDGE_MARGIN);

        (0..count)
            .filter_map(|_| {
                let x = base_x + rng.gen_range(SPAWN_EDGE_MARGIN..=far);
                let z = base_z + rng.gen_range(SPAWN_EDGE_MARGIN..=far);
                let kind = choose_weighted(spawn_table(biome), &mut rng)?;
                let name = enemy_names(biome, kind).choose(&mut rng).copied()?;
                Some(EnemySpawn {
                    position: Vec3::new(x, heights.height_at(x, z), z),
                    kind,
                    name,
                    biome,
                })
            })
            .collect()
    }
}

/// Simple in-memory [`EnemySink`] handing out sequential handles.
#[derive(Debug, Default)]
pub struct EnemyRoster {
    next_id: u64,
    live: BTreeMap<EntityHandle, EnemySpawn>,
}

impl EnemyRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn get(&self, handle: EntityHandle) -> Option<&EnemySpawn> {
        self.live.get(&handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityHandle, &EnemySpawn)> {
        self.live.iter()
    }
}

impl EnemySink for EnemyRoster {
    fn add_enemy(&mut self, spawn: EnemySpawn) -> EntityHandle {
        let handle = EntityHandle(self.next_id);
        self.next_id += 1;
        self.live.insert(handle, spawn);
        handle
    }

    fn release_enemies(&mut self, handles: &[EntityHandle]) {
        for handle in handles {
            self.live.remove(handle);
        }
    }
}
