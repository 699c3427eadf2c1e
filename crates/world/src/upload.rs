//! Boundary between generated meshes and whatever owns GPU memory.

use crate::chunk::ChunkCoord;
use crate::mesh::TerrainMesh;
use thiserror::Error;

/// Why a mesh could not be uploaded.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("mesh for chunk {0} has no triangles")]
    EmptyMesh(ChunkCoord),
    #[error("mesh for chunk {coord} has {vertices} vertices, beyond 32-bit indexing")]
    TooManyVertices { coord: ChunkCoord, vertices: usize },
    #[error("GPU upload for chunk {coord} failed: {reason}")]
    Backend { coord: ChunkCoord, reason: String },
}

impl UploadError {
    /// Reject meshes no backend can draw.
    pub fn check(coord: ChunkCoord, mesh: &TerrainMesh) -> Result<(), UploadError> {
        if mesh.is_empty() {
            return Err(UploadError::EmptyMesh(coord));
        }
        if mesh.vertex_count() > u32::MAX as usize {
            return Err(UploadError::TooManyVertices {
                coord,
                vertices: mesh.vertex_count(),
            });
        }
        Ok(())
    }
}

/// Creates and frees GPU buffers for chunk meshes.
///
/// Called only from the thread driving the chunk manager.
pub trait MeshUploader {
    /// Opaque handle kept on a ready chunk.
    type Handle;

    fn upload(&mut self, coord: ChunkCoord, mesh: &TerrainMesh) -> Result<Self::Handle, UploadError>;

    /// Free a handle from an unloaded chunk.
    fn release(&mut self, handle: Self::Handle);
}

/// Handle produced by [`HeadlessUploader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessMesh {
    pub id: u64,
    pub index_count: u32,
    pub bytes: usize,
}

/// Uploader that only does bookkeeping, for tests and headless runs.
#[derive(Debug, Default)]
pub struct HeadlessUploader {
    next_id: u64,
    uploads: u64,
    releases: u64,
    live_bytes: usize,
}

impl HeadlessUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    pub fn releases(&self) -> u64 {
        self.releases
    }

    /// Handles uploaded and not yet released.
    pub fn live(&self) -> u64 {
        self.uploads - self.releases
    }

    /// Bytes held by live handles.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes
    }
}

impl MeshUploader for HeadlessUploader {
    type Handle = HeadlessMesh;

    fn upload(&mut self, coord: ChunkCoord, mesh: &TerrainMesh) -> Result<HeadlessMesh, UploadError> {
        UploadError::check(coord, mesh)?;
        let handle = HeadlessMesh {
            id: self.next_id,
            index_count: mesh.indices.len() as u32,
            bytes: mesh.byte_size(),
        };
        self.next_id += 1;
        self.uploads += 1;
        self.live_bytes += handle.bytes;
        Ok(handle)
    }

    fn release(&mut self, handle: HeadlessMesh) {
        self.releases += 1;
        self.live_bytes = self.live_bytes.saturating_sub(handle.bytes);
    }
}
