//! Chunk streaming around the player.
//!
//! The manager decides which chunks must exist from the player's chunk,
//! creates and destroys them, and drains two FIFO queues (generation and
//! upload) by at most one entry each per [`ChunkManager::update`] call.

use crate::biome::{BiomeId, BiomeMap, BiomeSource, UniformBiome};
use crate::blend::{EdgeBlender, NeighborEdges};
use crate::chunk::{sample_height, Chunk, ChunkCoord, ChunkData, ChunkState, HeightSource};
use crate::config::{ConfigError, StreamingConfig};
use crate::heightmap::{HeightmapGenerator, HeightmapParams};
use crate::mesh::MeshBuilder;
use crate::normals::NormalCalculator;
use crate::spawn::{EnemySink, SpawnProvider};
use crate::upload::MeshUploader;
use crate::vegetation::VegetationProvider;
use glam::Vec3;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use tracing::{debug, info, instrument, trace, warn};

/// Visibility test used by [`ChunkManager::render_in_frustum`].
pub trait SphereCull {
    fn sphere_visible(&self, center: Vec3, radius: f32) -> bool;
}

/// Snapshot of streaming state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    pub total_chunks: usize,
    pub ready_chunks: usize,
    pub generation_queue_len: usize,
    pub upload_queue_len: usize,
    pub chunks_generated: u64,
    pub chunks_uploaded: u64,
    pub chunks_unloaded: u64,
    pub player_chunk: Option<ChunkCoord>,
}

/// What one [`ChunkManager::update`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub player_chunk: ChunkCoord,
    /// Chunks created and queued because the player changed chunk.
    pub queued: usize,
    /// Chunks destroyed because the player changed chunk.
    pub unloaded: usize,
    pub generated: Option<ChunkCoord>,
    pub uploaded: Option<ChunkCoord>,
}

struct Spawning {
    provider: Box<dyn SpawnProvider>,
    sink: Box<dyn EnemySink>,
}

/// Owns every resident chunk and streams them around the player.
///
/// Single-threaded: all generation and upload happens synchronously inside
/// [`ChunkManager::update`]. Collaborators run during generation and must not
/// re-enter the manager.
pub struct ChunkManager<U: MeshUploader> {
    config: StreamingConfig,
    heightmaps: HeightmapGenerator,
    mesh_builder: MeshBuilder,
    uploader: U,
    biomes: Option<Rc<dyn BiomeSource>>,
    vegetation: Option<Box<dyn VegetationProvider>>,
    spawning: Option<Spawning>,
    chunks: HashMap<ChunkCoord, Chunk<U::Handle>>,
    generation_queue: VecDeque<ChunkCoord>,
    upload_queue: VecDeque<ChunkCoord>,
    player_chunk: Option<ChunkCoord>,
    chunks_generated: u64,
    chunks_uploaded: u64,
    chunks_unloaded: u64,
}

impl<U: MeshUploader> ChunkManager<U> {
    /// Create an empty manager. Fails if `config` does not validate.
    pub fn new(config: StreamingConfig, uploader: U) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            heightmaps: HeightmapGenerator::new(config.world_seed),
            mesh_builder: MeshBuilder::new(config.skirt_depth),
            config,
            uploader,
            biomes: None,
            vegetation: None,
            spawning: None,
            chunks: HashMap::new(),
            generation_queue: VecDeque::new(),
            upload_queue: VecDeque::new(),
            player_chunk: None,
            chunks_generated: 0,
            chunks_uploaded: 0,
            chunks_unloaded: 0,
        })
    }

    /// Use a biome source for height scale and per-vertex biomes.
    ///
    /// Without one, chunks use `default_height_scale` and the default biome.
    pub fn with_biomes(mut self, biomes: Rc<dyn BiomeSource>) -> Self {
        self.biomes = Some(biomes);
        self
    }

    /// Populate each generated chunk with vegetation.
    pub fn with_vegetation(mut self, provider: impl VegetationProvider + 'static) -> Self {
        self.vegetation = Some(Box::new(provider));
        self
    }

    /// Spawn enemies into `sink` for each generated chunk.
    pub fn with_spawning(
        mut self,
        provider: impl SpawnProvider + 'static,
        sink: impl EnemySink + 'static,
    ) -> Self {
        self.spawning = Some(Spawning {
            provider: Box::new(provider),
            sink: Box::new(sink),
        });
        self
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    pub fn uploader(&self) -> &U {
        &self.uploader
    }

    pub fn biomes(&self) -> Option<&Rc<dyn BiomeSource>> {
        self.biomes.as_ref()
    }

    pub fn player_chunk(&self) -> Option<ChunkCoord> {
        self.player_chunk
    }

    /// Advance streaming by one frame.
    ///
    /// If the player changed chunk, creates and queues every missing chunk
    /// within `load_distance` and unloads every chunk beyond
    /// `unload_distance`. Then handles at most one generation entry and at
    /// most one upload entry. Stale entries are dropped and still use up
    /// that frame's slot.
    pub fn update(&mut self, player_x: f32, player_z: f32) -> FrameReport {
        let current = ChunkCoord::from_world(player_x, player_z, self.config.chunk_size);
        let mut report = FrameReport {
            player_chunk: current,
            queued: 0,
            unloaded: 0,
            generated: None,
            uploaded: None,
        };

        if self.player_chunk != Some(current) {
            self.player_chunk = Some(current);
            let (queued, unloaded) = self.refresh_residency(current);
            report.queued = queued;
            report.unloaded = unloaded;
        }

        report.generated = self.process_generation_queue();
        report.uploaded = self.process_upload_queue();
        report
    }

    fn refresh_residency(&mut self, center: ChunkCoord) -> (usize, usize) {
        let load = self.config.load_distance;
        let size = self.config.chunk_size;

        let mut queued = Vec::new();
        for dx in -load..=load {
            for dz in -load..=load {
                let coord = center.offset(dx, dz);
                if let Entry::Vacant(slot) = self.chunks.entry(coord) {
                    slot.insert(Chunk::new(coord, size));
                    queued.push(coord);
                }
            }
        }
        if self.config.nearest_first {
            queued.sort_by_key(|c| (c.chebyshev_distance(center), c.distance_squared(center), *c));
        }
        self.generation_queue.extend(queued.iter().copied());

        let unload = self.config.unload_distance;
        let mut doomed: Vec<ChunkCoord> = self
            .chunks
            .keys()
            .copied()
            .filter(|coord| coord.chebyshev_distance(center) > unload)
            .collect();
        doomed.sort();
        for coord in &doomed {
            self.unload_chunk(*coord);
        }

        info!(
            player_chunk = %center,
            queued = queued.len(),
            unloaded = doomed.len(),
            resident = self.chunks.len(),
            "Player entered chunk"
        );
        (queued.len(), doomed.len())
    }

    fn process_generation_queue(&mut self) -> Option<ChunkCoord> {
        let coord = self.generation_queue.pop_front()?;
        match self.chunks.get(&coord).map(Chunk::state) {
            Some(ChunkState::Unloaded) => {
                self.generate_chunk(coord);
                Some(coord)
            }
            state => {
                trace!(chunk = %coord, ?state, "Dropping stale generation entry");
                None
            }
        }
    }

    /// Run the full pipeline for one chunk and queue it for upload.
    #[instrument(skip(self), fields(world_seed = self.config.world_seed))]
    fn generate_chunk(&mut self, coord: ChunkCoord) {
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return;
        };
        chunk.begin_generation();

        let (data, primary) = self.build_chunk_data(coord);
        let size = self.config.chunk_size;

        let heights = GenerationHeights {
            chunks: &self.chunks,
            chunk_size: size,
            pending: coord,
            pending_data: &data,
        };
        let fallback = UniformBiome(primary);
        let biomes: &dyn BiomeSource = match &self.biomes {
            Some(source) => source.as_ref(),
            None => &fallback,
        };

        let vegetation = match self.vegetation.as_mut() {
            Some(provider) => provider.generate_for_chunk(coord, size, biomes, &heights),
            None => Vec::new(),
        };

        let enemies = match self.spawning.as_mut() {
            Some(spawning) => spawning
                .provider
                .generate_spawns(coord, size, primary, &heights)
                .into_iter()
                .map(|spawn| spawning.sink.add_enemy(spawn))
                .collect(),
            None => Vec::new(),
        };

        debug!(
            biome = %primary,
            triangles = data.mesh.triangle_count(),
            vegetation = vegetation.len(),
            enemies = enemies.len(),
            "Generated chunk"
        );

        if let Some(chunk) = self.chunks.get_mut(&coord) {
            chunk.finish_generation(data, vegetation, enemies);
        }
        self.upload_queue.push_back(coord);
        self.chunks_generated += 1;
    }

    /// Heightmap, blend, biome map, normals and mesh for one chunk, plus its
    /// primary biome.
    fn build_chunk_data(&self, coord: ChunkCoord) -> (ChunkData, BiomeId) {
        let config = &self.config;
        let size = config.chunk_size;
        let res = config.resolution;
        let (origin_x, origin_z) = coord.origin(size);
        let center_x = origin_x + size * 0.5;
        let center_z = origin_z + size * 0.5;

        let (primary, height_scale) = match &self.biomes {
            Some(source) => (
                source.biome_at(center_x, center_z),
                source.height_scale_at(center_x, center_z),
            ),
            None => (BiomeId::default(), config.default_height_scale),
        };

        let mut heightmap = self.heightmaps.generate(&HeightmapParams {
            width: res,
            depth: res,
            scale: config.terrain.scale,
            octaves: config.terrain.octaves,
            persistence: config.terrain.persistence,
            lacunarity: config.terrain.lacunarity,
            offset_x: origin_x as f64,
            offset_z: origin_z as f64,
            chunk_size: size as f64,
        });
        heightmap.apply_curve(config.height_curve);
        heightmap.scale(height_scale);
        EdgeBlender::blend(&mut heightmap, &self.neighbor_edges(coord));

        let biomes = match &self.biomes {
            Some(source) => BiomeMap::classify(res, origin_x, origin_z, size, source.as_ref()),
            None => BiomeMap::filled(res, primary),
        };
        let normals = NormalCalculator::compute(&heightmap, config.vertex_spacing(), 1.0);
        let mesh = self
            .mesh_builder
            .build(&heightmap, &normals, Some(&biomes), origin_x, origin_z, size);

        (
            ChunkData {
                heightmap,
                biomes,
                normals,
                mesh,
            },
            primary,
        )
    }

    /// Heightmaps of cardinal neighbors that already have generated data.
    fn neighbor_edges(&self, coord: ChunkCoord) -> NeighborEdges<'_> {
        let generated = |dx, dz| {
            self.chunks
                .get(&coord.offset(dx, dz))
                .and_then(Chunk::data)
                .map(|data| &data.heightmap)
        };
        NeighborEdges {
            left: generated(-1, 0),
            right: generated(1, 0),
            front: generated(0, -1),
            back: generated(0, 1),
        }
    }

    #[instrument(skip(self))]
    fn process_upload_queue(&mut self) -> Option<ChunkCoord> {
        let coord = self.upload_queue.pop_front()?;
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            trace!(chunk = %coord, "Dropping upload entry for unloaded chunk");
            return None;
        };
        if chunk.state() != ChunkState::Meshing {
            trace!(chunk = %coord, state = ?chunk.state(), "Dropping stale upload entry");
            return None;
        }
        let data = chunk.data()?;

        match self.uploader.upload(coord, &data.mesh) {
            Ok(handle) => {
                chunk.finish_upload(handle);
                self.chunks_uploaded += 1;
                debug!(chunk = %coord, "Uploaded chunk mesh");
                Some(coord)
            }
            Err(err) => {
                warn!(chunk = %coord, error = %err, "Chunk mesh upload failed");
                None
            }
        }
    }

    /// Destroy a chunk, freeing its GPU handle and notifying collaborators.
    fn unload_chunk(&mut self, coord: ChunkCoord) -> bool {
        let Some(mut chunk) = self.chunks.remove(&coord) else {
            return false;
        };
        let released = chunk.unload();
        if let Some(handle) = released.gpu {
            self.uploader.release(handle);
        }
        if let Some(provider) = self.vegetation.as_mut() {
            provider.clear_chunk(coord);
        }
        if let Some(spawning) = self.spawning.as_mut() {
            if !released.enemies.is_empty() {
                spawning.sink.release_enemies(&released.enemies);
            }
        }
        self.chunks_unloaded += 1;
        debug!(chunk = %coord, "Unloaded chunk");
        true
    }

    /// Terrain height at a world position, or `0.0` unless that chunk is ready.
    pub fn get_height_at(&self, x: f32, z: f32) -> f32 {
        ready_height(&self.chunks, self.config.chunk_size, x, z)
    }

    /// Biome at a world position, or the default biome unless that chunk is
    /// ready.
    pub fn get_biome_at(&self, x: f32, z: f32) -> BiomeId {
        self.get_chunk_at(x, z)
            .filter(|chunk| chunk.is_ready())
            .and_then(|chunk| chunk.biome_at(x, z))
            .unwrap_or_default()
    }

    /// Resident chunk containing a world position, in any state.
    pub fn get_chunk_at(&self, x: f32, z: f32) -> Option<&Chunk<U::Handle>> {
        self.chunks
            .get(&ChunkCoord::from_world(x, z, self.config.chunk_size))
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk<U::Handle>> {
        self.chunks.get(&coord)
    }

    pub fn chunk_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk<U::Handle>> {
        self.chunks.get_mut(&coord)
    }

    /// Every resident chunk, in no particular order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk<U::Handle>> {
        self.chunks.values()
    }

    /// Pending generation entries, front first. May include stale entries.
    pub fn generation_queue(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.generation_queue.iter().copied()
    }

    /// Pending upload entries, front first. May include stale entries.
    pub fn upload_queue(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.upload_queue.iter().copied()
    }

    /// Visit every ready chunk, returning how many were visited.
    pub fn render<'s>(&'s self, mut visit: impl FnMut(&'s Chunk<U::Handle>)) -> usize {
        let mut drawn = 0;
        for chunk in self.chunks.values().filter(|chunk| chunk.is_ready()) {
            visit(chunk);
            drawn += 1;
        }
        drawn
    }

    /// Visit every ready chunk whose bounding sphere passes `cull`.
    pub fn render_in_frustum<'s>(
        &'s self,
        cull: &impl SphereCull,
        mut visit: impl FnMut(&'s Chunk<U::Handle>),
    ) -> usize {
        let mut drawn = 0;
        for chunk in self.chunks.values().filter(|chunk| chunk.is_ready()) {
            let (center, radius) = chunk.bounding_sphere();
            if cull.sphere_visible(center, radius) {
                visit(chunk);
                drawn += 1;
            }
        }
        drawn
    }

    pub fn get_stats(&self) -> StreamStats {
        StreamStats {
            total_chunks: self.chunks.len(),
            ready_chunks: self.chunks.values().filter(|c| c.is_ready()).count(),
            generation_queue_len: self.generation_queue.len(),
            upload_queue_len: self.upload_queue.len(),
            chunks_generated: self.chunks_generated,
            chunks_uploaded: self.chunks_uploaded,
            chunks_unloaded: self.chunks_unloaded,
            player_chunk: self.player_chunk,
        }
    }

    /// Unload every chunk and forget the player position.
    pub fn release(&mut self) {
        let mut resident: Vec<ChunkCoord> = self.chunks.keys().copied().collect();
        resident.sort();
        for coord in resident {
            self.unload_chunk(coord);
        }
        self.generation_queue.clear();
        self.upload_queue.clear();
        self.player_chunk = None;
        info!(
            generated = self.chunks_generated,
            unloaded = self.chunks_unloaded,
            "Released all chunks"
        );
    }
}

impl<U: MeshUploader> HeightSource for ChunkManager<U> {
    fn height_at(&self, x: f32, z: f32) -> f32 {
        self.get_height_at(x, z)
    }
}

fn ready_height<H>(chunks: &HashMap<ChunkCoord, Chunk<H>>, chunk_size: f32, x: f32, z: f32) -> f32 {
    chunks
        .get(&ChunkCoord::from_world(x, z, chunk_size))
        .filter(|chunk| chunk.is_ready())
        .and_then(|chunk| chunk.height_at(x, z))
        .unwrap_or(0.0)
}

/// Height queries handed to collaborators while a chunk is generating.
///
/// Points inside the generating chunk read its fresh heightmap; everything
/// else answers like [`ChunkManager::get_height_at`].
struct GenerationHeights<'a, H> {
    chunks: &'a HashMap<ChunkCoord, Chunk<H>>,
    chunk_size: f32,
    pending: ChunkCoord,
    pending_data: &'a ChunkData,
}

impl<H> HeightSource for GenerationHeights<'_, H> {
    fn height_at(&self, x: f32, z: f32) -> f32 {
        if ChunkCoord::from_world(x, z, self.chunk_size) == self.pending {
            let origin = self.pending.origin(self.chunk_size);
            return sample_height(&self.pending_data.heightmap, origin, self.chunk_size, x, z);
        }
        ready_height(self.chunks, self.chunk_size, x, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::BiomeClassifier;
    use crate::spawn::{EnemyRoster, SpawnSystem};
    use crate::upload::HeadlessUploader;
    use crate::vegetation::VegetationManager;
    use std::cell::RefCell;

    fn small_config() -> StreamingConfig {
        StreamingConfig {
            resolution: 8,
            load_distance: 1,
            unload_distance: 2,
            ..StreamingConfig::default()
        }
    }

    fn manager(config: StreamingConfig) -> ChunkManager<HeadlessUploader> {
        ChunkManager::new(config, HeadlessUploader::new()).expect("valid config")
    }

    fn drain(manager: &mut ChunkManager<HeadlessUploader>, x: f32, z: f32) {
        for _ in 0..200 {
            manager.update(x, z);
            if manager.generation_queue.is_empty() && manager.upload_queue.is_empty() {
                return;
            }
        }
        panic!("queues did not drain");
    }

    #[test]
    fn rejects_invalid_config() {
        let config = StreamingConfig {
            unload_distance: 1,
            ..small_config()
        };
        assert!(ChunkManager::new(config, HeadlessUploader::new()).is_err());
    }

    #[test]
    fn first_update_creates_load_square() {
        let mut manager = manager(small_config());
        let report = manager.update(10.0, 10.0);
        assert_eq!(report.queued, 9);
        assert_eq!(report.generated, Some(ChunkCoord::new(-1, -1)));
        assert_eq!(report.uploaded, Some(ChunkCoord::new(-1, -1)));
        let stats = manager.get_stats();
        assert_eq!(stats.total_chunks, 9);
        assert_eq!(stats.ready_chunks, 1);
        assert_eq!(stats.generation_queue_len, 8);
        assert_eq!(stats.player_chunk, Some(ChunkCoord::new(0, 0)));
    }

    #[test]
    fn queries_default_until_ready() {
        let mut manager = manager(small_config());
        manager.update(10.0, 10.0);
        // Chunk (0, 0) is fifth in scan order.
        assert_eq!(manager.get_height_at(10.0, 10.0), 0.0);
        assert_eq!(manager.get_biome_at(10.0, 10.0), BiomeId::Grasslands);
        assert_eq!(
            manager.get_chunk_at(10.0, 10.0).map(Chunk::state),
            Some(ChunkState::Unloaded)
        );

        drain(&mut manager, 10.0, 10.0);
        let chunk = manager.get_chunk_at(10.0, 10.0).expect("resident");
        assert!(chunk.is_ready());
        let expected = chunk.height_at(10.0, 10.0).expect("data");
        assert_eq!(manager.get_height_at(10.0, 10.0), expected);
        assert!(expected >= 0.0 && expected <= 5.0);
    }

    #[test]
    fn ready_chunks_satisfy_data_invariants() {
        let mut manager = manager(small_config());
        manager.update(0.0, 0.0);
        manager.update(0.0, 0.0);
        for chunk in manager.chunks() {
            match chunk.state() {
                ChunkState::Unloaded | ChunkState::Generating | ChunkState::Unloading => {
                    assert!(chunk.data().is_none());
                    assert!(chunk.gpu_mesh().is_none());
                }
                ChunkState::Meshing => {
                    assert!(chunk.data().is_some());
                    assert!(chunk.gpu_mesh().is_none());
                }
                ChunkState::Ready => {
                    assert!(chunk.data().is_some());
                    assert!(chunk.gpu_mesh().is_some());
                }
            }
        }
    }

    #[test]
    fn later_chunk_blends_toward_earlier_neighbor() {
        let mut manager = manager(small_config());
        drain(&mut manager, 10.0, 10.0);
        let res = manager.config().resolution;
        let width = EdgeBlender::blend_width(res);
        let left = manager.chunk(ChunkCoord::new(-1, 0)).and_then(Chunk::data).expect("left");
        let center = manager.chunk(ChunkCoord::new(0, 0)).and_then(Chunk::data).expect("center");
        // (-1, 0) generated before (0, 0), so the center's left column copies
        // it. Rows near z = 0 were then blended again toward (0, -1).
        for z in width..res {
            let diff = center.heightmap.get(0, z) - left.heightmap.get(res - 1, z);
            assert!(diff.abs() < 1e-5, "row {z}: {diff}");
        }
    }

    #[test]
    fn moving_far_unloads_and_releases_gpu() {
        let mut manager = manager(small_config());
        drain(&mut manager, 10.0, 10.0);
        assert_eq!(manager.uploader().live(), 9);

        let report = manager.update(64.0 * 10.0, 10.0);
        assert_eq!(report.unloaded, 9);
        assert_eq!(manager.uploader().releases(), 9);
        // The first chunk of the new square was generated and uploaded too.
        assert_eq!(report.uploaded, Some(ChunkCoord::new(9, -1)));
        assert_eq!(manager.uploader().live(), 1);
        assert!(manager.chunk(ChunkCoord::new(0, 0)).is_none());
        assert_eq!(manager.get_stats().chunks_unloaded, 9);
    }

    #[test]
    fn stale_generation_entries_are_dropped() {
        let mut manager = manager(small_config());
        manager.update(10.0, 10.0);
        // Jump away before the backlog drains; old entries now point nowhere.
        let report = manager.update(64.0 * 20.0, 10.0);
        assert_eq!(report.unloaded, 9);
        assert!(report.generated.is_none());
        let generated_before = manager.get_stats().chunks_generated;
        for _ in 0..7 {
            assert!(manager.update(64.0 * 20.0, 10.0).generated.is_none());
        }
        assert_eq!(manager.get_stats().chunks_generated, generated_before);
        assert!(manager.update(64.0 * 20.0, 10.0).generated.is_some());
    }

    #[test]
    fn nearest_first_generates_player_chunk_first() {
        let config = StreamingConfig {
            nearest_first: true,
            ..small_config()
        };
        let mut manager = manager(config);
        let report = manager.update(-10.0, 70.0);
        assert_eq!(report.generated, Some(ChunkCoord::new(-1, 1)));
    }

    #[test]
    fn collaborators_populate_and_release() {
        let roster = Rc::new(RefCell::new(EnemyRoster::new()));
        let classifier: Rc<dyn BiomeSource> = Rc::new(BiomeClassifier::new(42));
        let mut manager = manager(small_config())
            .with_biomes(classifier)
            .with_vegetation(VegetationManager::new(42))
            .with_spawning(SpawnSystem::new(42), Rc::clone(&roster));

        drain(&mut manager, 10.0, 10.0);
        let enemies: usize = manager.chunks().map(|c| c.enemies().len()).sum();
        assert!(enemies >= 9);
        assert_eq!(roster.borrow().len(), enemies);

        let chunk = manager.chunk(ChunkCoord::new(0, 0)).expect("resident");
        for instance in chunk.vegetation() {
            if chunk.contains_point(instance.position.x, instance.position.z) {
                let expected = chunk
                    .height_at(instance.position.x, instance.position.z)
                    .expect("data");
                assert!((instance.position.y - expected).abs() < 1e-4);
            }
        }

        manager.release();
        assert!(roster.borrow().is_empty());
        assert_eq!(manager.get_stats().total_chunks, 0);
        assert_eq!(manager.player_chunk(), None);
    }

    struct RejectAll;

    impl SphereCull for RejectAll {
        fn sphere_visible(&self, _center: Vec3, _radius: f32) -> bool {
            false
        }
    }

    #[test]
    fn render_counts_ready_chunks() {
        let mut manager = manager(small_config());
        manager.update(10.0, 10.0);
        manager.update(10.0, 10.0);
        let mut visited = Vec::new();
        assert_eq!(manager.render(|chunk| visited.push(chunk.coord())), 2);
        assert_eq!(visited.len(), 2);
        assert_eq!(manager.render_in_frustum(&RejectAll, |_| {}), 0);
    }
}
