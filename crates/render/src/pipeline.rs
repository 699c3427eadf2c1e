use crate::camera::Camera;
use crate::frustum::Frustum;
use crate::gpu_mesh::{terrain_vertex_layout, WgpuMeshUploader};
use eldergrove_world::{BiomeId, ChunkManager};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

/// Depth format used by the terrain pass.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Ambient light floor applied before diffuse shading.
const AMBIENT: f32 = 0.35;

/// Camera uniform data.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    /// View-projection matrix, column major.
    pub view_proj: [[f32; 4]; 4],
    /// Eye position; `w` is unused.
    pub eye: [f32; 4],
}

impl CameraUniform {
    /// Build from a view-projection matrix and eye position.
    pub fn new(view_proj: Mat4, eye: Vec3) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            eye: eye.extend(1.0).to_array(),
        }
    }

    /// Create camera uniform from camera.
    pub fn from_camera(camera: &Camera) -> Self {
        Self::new(camera.view_projection_matrix(), camera.position)
    }
}

/// Sun and fog parameters.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    /// Direction light travels; `w` is unused.
    pub sun_direction: [f32; 4],
    /// Fog color; `w` is unused.
    pub fog_color: [f32; 4],
    /// `x` fog density, `y` ambient.
    pub params: [f32; 4],
}

impl LightingUniform {
    /// Fog of `biome` with a fixed afternoon sun.
    pub fn for_biome(biome: BiomeId) -> Self {
        let definition = biome.definition();
        let [r, g, b] = definition.fog_color;
        Self {
            sun_direction: [-0.4, -1.0, -0.3, 0.0],
            fog_color: [r, g, b, 1.0],
            params: [definition.fog_density, AMBIENT, 0.0, 0.0],
        }
    }
}

/// Render pipeline and uniforms for streamed terrain chunks.
pub struct TerrainPipeline {
    render_pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    lighting_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl TerrainPipeline {
    /// Create the pipeline for a color target format.
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Self {
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Terrain Camera Buffer"),
            contents: bytemuck::cast_slice(&[CameraUniform::new(Mat4::IDENTITY, Vec3::ZERO)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let lighting_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Terrain Lighting Buffer"),
            contents: bytemuck::cast_slice(&[LightingUniform::for_biome(BiomeId::default())]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_entry = |binding: u32, visibility: wgpu::ShaderStages| wgpu::BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Terrain Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
                uniform_entry(1, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Terrain Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lighting_buffer.as_entire_binding(),
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Terrain Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/terrain.wgsl").into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Terrain Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Terrain Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[terrain_vertex_layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        Self {
            render_pipeline,
            camera_buffer,
            lighting_buffer,
            bind_group,
        }
    }

    /// Upload the camera for this frame.
    pub fn update_camera(&self, queue: &wgpu::Queue, camera: &Camera) {
        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[CameraUniform::from_camera(camera)]),
        );
    }

    /// Switch fog to the biome the camera stands in.
    pub fn update_lighting(&self, queue: &wgpu::Queue, biome: BiomeId) {
        queue.write_buffer(
            &self.lighting_buffer,
            0,
            bytemuck::cast_slice(&[LightingUniform::for_biome(biome)]),
        );
    }

    /// Draw every ready chunk inside `frustum`, returning how many were drawn.
    pub fn draw<'a>(
        &'a self,
        pass: &mut wgpu::RenderPass<'a>,
        chunks: &'a ChunkManager<WgpuMeshUploader>,
        frustum: &Frustum,
    ) -> usize {
        pass.set_pipeline(&self.render_pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        chunks.render_in_frustum(frustum, |chunk| {
            if let Some(mesh) = chunk.gpu_mesh() {
                mesh.draw(pass);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniforms_match_shader_layout() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 80);
        assert_eq!(std::mem::size_of::<LightingUniform>(), 48);
    }

    #[test]
    fn lighting_uses_biome_fog() {
        let lighting = LightingUniform::for_biome(BiomeId::EnchantedForest);
        assert_eq!(lighting.fog_color, [0.2, 0.4, 0.3, 1.0]);
        assert_eq!(lighting.params[0], 0.003);
    }
}
