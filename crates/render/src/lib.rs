#![warn(missing_docs)]
//! wgpu backend for streamed terrain: buffer upload, frustum culling and the
//! terrain render pipeline.

mod camera;
mod frustum;
mod gpu_mesh;
mod pipeline;

pub use camera::Camera;
pub use frustum::{Frustum, Plane};
pub use gpu_mesh::{terrain_vertex_layout, GpuTerrainMesh, WgpuMeshUploader};
pub use pipeline::{CameraUniform, LightingUniform, TerrainPipeline, DEPTH_FORMAT};
