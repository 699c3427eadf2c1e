use crate::biome::{BiomeId, BiomeMap};
use crate::heightmap::Heightmap;
use crate::mesh::TerrainMesh;
use crate::normals::NormalField;
use crate::vegetation::VegetationInstance;
use eldergrove_core::EntityHandle;
use glam::Vec3;
use std::fmt;

/// Bounding sphere radius as a fraction of chunk size.
pub const CHUNK_SPHERE_RADIUS_FACTOR: f32 = 0.7;

/// Chunk coordinate (X,Z) in chunk space.
/// Implements Ord for deterministic iteration in BTreeMap/BTreeSet (sorts by x, then z).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk containing a world position. Uses floor division, so `-0.5`
    /// maps to chunk `-1`.
    pub fn from_world(x: f32, z: f32, chunk_size: f32) -> Self {
        Self {
            x: (x / chunk_size).floor() as i32,
            z: (z / chunk_size).floor() as i32,
        }
    }

    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }

    /// Largest per-axis distance (the load/unload metric).
    pub fn chebyshev_distance(self, other: Self) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }

    pub fn distance_squared(self, other: Self) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dz * dz
    }

    /// World position of the chunk's minimum corner.
    pub fn origin(self, chunk_size: f32) -> (f32, f32) {
        (self.x as f32 * chunk_size, self.z as f32 * chunk_size)
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Lifecycle of a streamed chunk.
///
/// `Unloaded -> Generating -> Meshing -> Ready`, and any state to removal
/// through `Unloading`. Only the chunk manager drives transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ChunkState {
    /// Created and queued, nothing computed yet.
    Unloaded,
    /// Heightmap, normals and mesh are being computed.
    Generating,
    /// CPU data ready, waiting for GPU upload.
    Meshing,
    /// GPU buffers exist; renderable.
    Ready,
    /// Resources are being released.
    Unloading,
}

/// Everything generated for one chunk.
#[derive(Debug, Clone)]
pub struct ChunkData {
    /// Heights after curve, biome scaling and edge blending.
    pub heightmap: Heightmap,
    pub biomes: BiomeMap,
    pub normals: NormalField,
    pub mesh: TerrainMesh,
}

/// One streamed terrain tile.
///
/// `data` is present exactly while the state is `Meshing` or `Ready`, and
/// the GPU handle exactly while `Ready`.
#[derive(Debug)]
pub struct Chunk<H> {
    coord: ChunkCoord,
    size: f32,
    state: ChunkState,
    data: Option<ChunkData>,
    gpu: Option<H>,
    min_height: f32,
    max_height: f32,
    entities: Vec<EntityHandle>,
    vegetation: Vec<VegetationInstance>,
    enemies: Vec<EntityHandle>,
}

impl<H> Chunk<H> {
    pub(crate) fn new(coord: ChunkCoord, size: f32) -> Self {
        Self {
            coord,
            size,
            state: ChunkState::Unloaded,
            data: None,
            gpu: None,
            min_height: 0.0,
            max_height: 0.0,
            entities: Vec::new(),
            vegetation: Vec::new(),
            enemies: Vec::new(),
        }
    }

    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn state(&self) -> ChunkState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ChunkState::Ready
    }

    pub fn data(&self) -> Option<&ChunkData> {
        self.data.as_ref()
    }

    /// Uploaded GPU mesh, present only when ready.
    pub fn gpu_mesh(&self) -> Option<&H> {
        self.gpu.as_ref()
    }

    /// Lowest and highest terrain height, cached on upload.
    pub fn height_range(&self) -> (f32, f32) {
        (self.min_height, self.max_height)
    }

    pub fn entities(&self) -> &[EntityHandle] {
        &self.entities
    }

    pub fn vegetation(&self) -> &[VegetationInstance] {
        &self.vegetation
    }

    pub fn enemies(&self) -> &[EntityHandle] {
        &self.enemies
    }

    /// Attach an externally owned entity; it is dropped from the list on unload.
    pub fn attach_entity(&mut self, entity: EntityHandle) {
        self.entities.push(entity);
    }

    /// World position of the chunk's minimum corner.
    pub fn origin(&self) -> (f32, f32) {
        self.coord.origin(self.size)
    }

    /// World-space center on the ground plane.
    pub fn center_world(&self) -> (f32, f32) {
        let (x, z) = self.origin();
        (x + self.size * 0.5, z + self.size * 0.5)
    }

    /// Whether a world position lies inside this chunk's footprint.
    pub fn contains_point(&self, x: f32, z: f32) -> bool {
        let (ox, oz) = self.origin();
        x >= ox && x < ox + self.size && z >= oz && z < oz + self.size
    }

    /// Ground-plane distance from the chunk center to a world position.
    pub fn distance_to(&self, x: f32, z: f32) -> f32 {
        let (cx, cz) = self.center_world();
        ((x - cx).powi(2) + (z - cz).powi(2)).sqrt()
    }

    /// Culling sphere at mid height, radius `0.7 * size`.
    pub fn bounding_sphere(&self) -> (Vec3, f32) {
        let (cx, cz) = self.center_world();
        let cy = (self.min_height + self.max_height) * 0.5;
        (
            Vec3::new(cx, cy, cz),
            self.size * CHUNK_SPHERE_RADIUS_FACTOR,
        )
    }

    /// Terrain bounds, excluding skirts.
    pub fn aabb(&self) -> (Vec3, Vec3) {
        let (ox, oz) = self.origin();
        (
            Vec3::new(ox, self.min_height, oz),
            Vec3::new(ox + self.size, self.max_height, oz + self.size),
        )
    }

    /// Bilinearly interpolated height, or `None` without generated data.
    ///
    /// Positions outside the chunk clamp to its border.
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        let heightmap = &self.data.as_ref()?.heightmap;
        Some(sample_height(heightmap, self.origin(), self.size, x, z))
    }

    /// Biome of the grid cell at or before a position, or `None` without data.
    pub fn biome_at(&self, x: f32, z: f32) -> Option<BiomeId> {
        let biomes = &self.data.as_ref()?.biomes;
        let last = biomes.resolution().saturating_sub(1);
        let (lx, lz) = local_grid(self.origin(), self.size, x, z, last);
        Some(biomes.get(lx as usize, lz as usize))
    }

    pub(crate) fn begin_generation(&mut self) {
        debug_assert_eq!(self.state, ChunkState::Unloaded);
        self.state = ChunkState::Generating;
    }

    pub(crate) fn finish_generation(
        &mut self,
        data: ChunkData,
        vegetation: Vec<VegetationInstance>,
        enemies: Vec<EntityHandle>,
    ) {
        debug_assert_eq!(self.state, ChunkState::Generating);
        self.data = Some(data);
        self.vegetation = vegetation;
        self.enemies = enemies;
        self.state = ChunkState::Meshing;
    }

    pub(crate) fn finish_upload(&mut self, handle: H) {
        debug_assert_eq!(self.state, ChunkState::Meshing);
        if let Some(data) = &self.data {
            self.min_height = data.heightmap.min();
            self.max_height = data.heightmap.max();
        }
        self.gpu = Some(handle);
        self.state = ChunkState::Ready;
    }

    /// Release everything, returning what the owner must hand back to
    /// collaborators.
    pub(crate) fn unload(&mut self) -> UnloadedResources<H> {
        self.state = ChunkState::Unloading;
        self.data = None;
        self.vegetation.clear();
        self.entities.clear();
        let resources = UnloadedResources {
            gpu: self.gpu.take(),
            enemies: std::mem::take(&mut self.enemies),
        };
        self.state = ChunkState::Unloaded;
        resources
    }
}

/// Resources released from an unloaded chunk.
pub(crate) struct UnloadedResources<H> {
    pub gpu: Option<H>,
    pub enemies: Vec<EntityHandle>,
}

/// Terrain height queries for world positions.
pub trait HeightSource {
    fn height_at(&self, x: f32, z: f32) -> f32;
}

/// Bilinear height from a chunk heightmap whose minimum corner sits at
/// `origin`. Positions outside the chunk clamp to its border.
pub(crate) fn sample_height(
    heightmap: &Heightmap,
    origin: (f32, f32),
    size: f32,
    x: f32,
    z: f32,
) -> f32 {
    let last = heightmap.width().saturating_sub(1);
    let (lx, lz) = local_grid(origin, size, x, z, last);

    let x0 = lx.floor() as usize;
    let z0 = lz.floor() as usize;
    let x1 = (x0 + 1).min(last);
    let z1 = (z0 + 1).min(last);
    let fx = lx - x0 as f32;
    let fz = lz - z0 as f32;

    let h00 = heightmap.get(x0, z0);
    let h10 = heightmap.get(x1, z0);
    let h01 = heightmap.get(x0, z1);
    let h11 = heightmap.get(x1, z1);

    let top = h00 + (h10 - h00) * fx;
    let bottom = h01 + (h11 - h01) * fx;
    top + (bottom - top) * fz
}

/// Position in grid units, clamped to `[0, last]`.
fn local_grid(origin: (f32, f32), size: f32, x: f32, z: f32, last: usize) -> (f32, f32) {
    let cells = last as f32;
    let lx = ((x - origin.0) / size * cells).clamp(0.0, cells);
    let lz = ((z - origin.1) / size * cells).clamp(0.0, cells);
    (lx, lz)
}
