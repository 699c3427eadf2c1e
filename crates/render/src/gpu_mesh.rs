use eldergrove_world::{ChunkCoord, MeshUploader, TerrainMesh, TerrainVertex, UploadError};
use std::sync::Arc;
use tracing::debug;
use wgpu::util::DeviceExt;

const TERRAIN_ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x2,
    2 => Float32x3,
    3 => Float32x3
];

/// Vertex buffer layout matching [`TerrainVertex`]: position, uv, normal, color.
pub fn terrain_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<TerrainVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &TERRAIN_ATTRIBUTES,
    }
}

/// GPU-side representation of a chunk mesh.
pub struct GpuTerrainMesh {
    /// Vertex buffer on GPU.
    pub vertex_buffer: wgpu::Buffer,
    /// Index buffer on GPU.
    pub index_buffer: wgpu::Buffer,
    /// Number of indices to draw.
    pub index_count: u32,
    bytes: usize,
}

impl GpuTerrainMesh {
    /// Upload a mesh to the GPU.
    pub fn from_terrain_mesh(device: &wgpu::Device, coord: ChunkCoord, mesh: &TerrainMesh) -> Self {
        let label = format!("Terrain Chunk {coord}");
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            bytes: mesh.byte_size(),
        }
    }

    /// Bytes of vertex and index data held on the GPU.
    pub fn byte_size(&self) -> usize {
        self.bytes
    }

    /// Bind buffers and issue the indexed draw.
    pub fn draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// [`MeshUploader`] that creates wgpu buffers on a shared device.
pub struct WgpuMeshUploader {
    device: Arc<wgpu::Device>,
    live: usize,
    live_bytes: usize,
}

impl WgpuMeshUploader {
    /// Create an uploader for `device`.
    pub fn new(device: Arc<wgpu::Device>) -> Self {
        Self {
            device,
            live: 0,
            live_bytes: 0,
        }
    }

    /// Meshes currently resident on the GPU.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Bytes currently resident on the GPU.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes
    }
}

impl MeshUploader for WgpuMeshUploader {
    type Handle = GpuTerrainMesh;

    fn upload(&mut self, coord: ChunkCoord, mesh: &TerrainMesh) -> Result<GpuTerrainMesh, UploadError> {
        UploadError::check(coord, mesh)?;
        let gpu = GpuTerrainMesh::from_terrain_mesh(&self.device, coord, mesh);
        self.live += 1;
        self.live_bytes += gpu.byte_size();
        debug!(chunk = %coord, bytes = gpu.byte_size(), "Created terrain buffers");
        Ok(gpu)
    }

    fn release(&mut self, handle: GpuTerrainMesh) {
        self.live = self.live.saturating_sub(1);
        self.live_bytes = self.live_bytes.saturating_sub(handle.byte_size());
        handle.vertex_buffer.destroy();
        handle.index_buffer.destroy();
    }
}
