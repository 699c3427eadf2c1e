//! Terrain mesh construction with border skirts.

use crate::biome::BiomeMap;
use crate::heightmap::Heightmap;
use crate::normals::NormalField;
use glam::Vec3;

/// UV repeats across one chunk.
pub const UV_TILING: f32 = 4.0;

/// Vertex color for terrain without a biome map.
pub const DEFAULT_TERRAIN_COLOR: [f32; 3] = [0.5, 0.5, 0.5];

/// Vertex color of skirt bottoms.
pub const SKIRT_COLOR: [f32; 3] = [0.3, 0.2, 0.1];

/// Vertex layout uploaded to the GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TerrainVertex {
    /// World-space position.
    pub position: [f32; 3],
    /// Tiled texture coordinate.
    pub uv: [f32; 2],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

/// CPU-side triangle list for one chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerrainMesh {
    pub vertices: Vec<TerrainVertex>,
    pub indices: Vec<u32>,
}

impl TerrainMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Axis-aligned bounds of every vertex, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut iter = self.vertices.iter().map(|v| Vec3::from(v.position));
        let first = iter.next()?;
        Some(iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }

    /// Size of the vertex and index data in bytes.
    pub fn byte_size(&self) -> usize {
        std::mem::size_of_val(self.vertices.as_slice()) + std::mem::size_of_val(self.indices.as_slice())
    }
}

/// Builds a chunk's surface grid plus four skirt strips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshBuilder {
    skirt_depth: f32,
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self { skirt_depth: 20.0 }
    }
}

impl MeshBuilder {
    pub fn new(skirt_depth: f32) -> Self {
        Self { skirt_depth }
    }

    /// Build a triangle list for a square heightmap.
    ///
    /// The surface has `res * res` vertices and `(res - 1)^2 * 2` triangles,
    /// each quad wound (top-left, bottom-left, top-right) then (top-right,
    /// bottom-left, bottom-right). Each border then gets a skirt that drops
    /// from its top vertices to `min(heightmap) - skirt_depth`, appending two
    /// bottom vertices per segment. All faces wind counter-clockwise when seen
    /// from outside the chunk.
    pub fn build(
        &self,
        heightmap: &Heightmap,
        normals: &NormalField,
        biomes: Option<&BiomeMap>,
        origin_x: f32,
        origin_z: f32,
        chunk_size: f32,
    ) -> TerrainMesh {
        let res = heightmap.width();
        if res < 2 || heightmap.depth() != res {
            return TerrainMesh::default();
        }

        let step = chunk_size / (res - 1) as f32;
        let uv_step = UV_TILING / (res - 1) as f32;
        let surface_quads = (res - 1) * (res - 1);
        let mut mesh = TerrainMesh {
            vertices: Vec::with_capacity(res * res + 8 * (res - 1)),
            indices: Vec::with_capacity(surface_quads * 6 + 24 * (res - 1)),
        };

        for z in 0..res {
            for x in 0..res {
                let color = biomes
                    .map(|map| map.get(x, z).definition().color)
                    .unwrap_or(DEFAULT_TERRAIN_COLOR);
                mesh.vertices.push(TerrainVertex {
                    position: [
                        origin_x + x as f32 * step,
                        heightmap.get(x, z),
                        origin_z + z as f32 * step,
                    ],
                    uv: [x as f32 * uv_step, z as f32 * uv_step],
                    normal: normals.get(x, z).to_array(),
                    color,
                });
            }
        }

        let res32 = res as u32;
        for z in 0..res32 - 1 {
            for x in 0..res32 - 1 {
                let top_left = z * res32 + x;
                let top_right = top_left + 1;
                let bottom_left = top_left + res32;
                let bottom_right = bottom_left + 1;
                mesh.indices.extend_from_slice(&[
                    top_left,
                    bottom_left,
                    top_right,
                    top_right,
                    bottom_left,
                    bottom_right,
                ]);
            }
        }

        let base_y = heightmap.min() - self.skirt_depth;
        let last = res32 - 1;
        for i in 0..last {
            let v0 = i as f32 * uv_step;
            let v1 = (i + 1) as f32 * uv_step;

            // Left edge, x = 0.
            push_skirt(
                &mut mesh,
                i * res32,
                (i + 1) * res32,
                base_y,
                [[0.0, v0], [0.0, v1]],
                [-1.0, 0.0, 0.0],
                Winding::BottomMiddle,
            );
            // Right edge, x = res - 1.
            push_skirt(
                &mut mesh,
                i * res32 + last,
                (i + 1) * res32 + last,
                base_y,
                [[UV_TILING, v0], [UV_TILING, v1]],
                [1.0, 0.0, 0.0],
                Winding::TopMiddle,
            );
            // Front edge, z = 0.
            push_skirt(
                &mut mesh,
                i,
                i + 1,
                base_y,
                [[v0, 0.0], [v1, 0.0]],
                [0.0, 0.0, -1.0],
                Winding::TopMiddle,
            );
            // Back edge, z = res - 1.
            push_skirt(
                &mut mesh,
                last * res32 + i,
                last * res32 + i + 1,
                base_y,
                [[v0, UV_TILING], [v1, UV_TILING]],
                [0.0, 0.0, 1.0],
                Winding::BottomMiddle,
            );
        }

        mesh
    }
}

/// Triangle order for one skirt segment with tops `t1`, `t2` and bottoms
/// `b1`, `b2`.
#[derive(Clone, Copy)]
enum Winding {
    /// `[t1, b1, t2], [t2, b1, b2]`
    BottomMiddle,
    /// `[t1, t2, b1], [t2, b2, b1]`
    TopMiddle,
}

fn push_skirt(
    mesh: &mut TerrainMesh,
    top1: u32,
    top2: u32,
    base_y: f32,
    uvs: [[f32; 2]; 2],
    normal: [f32; 3],
    winding: Winding,
) {
    let bottom1 = mesh.vertices.len() as u32;
    let bottom2 = bottom1 + 1;
    for (top, uv) in [top1, top2].into_iter().zip(uvs) {
        let [x, _, z] = mesh.vertices[top as usize].position;
        mesh.vertices.push(TerrainVertex {
            position: [x, base_y, z],
            uv,
            normal,
            color: SKIRT_COLOR,
        });
    }

    let triangles = match winding {
        Winding::BottomMiddle => [top1, bottom1, top2, top2, bottom1, bottom2],
        Winding::TopMiddle => [top1, top2, bottom1, top2, bottom2, bottom1],
    };
    mesh.indices.extend_from_slice(&triangles);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::BiomeId;
    use crate::normals::NormalCalculator;

    fn build_flat(res: usize, height: f32, biomes: Option<&BiomeMap>) -> TerrainMesh {
        let hm = Heightmap::filled(res, res, height);
        let normals = NormalCalculator::compute(&hm, 1.0, 1.0);
        MeshBuilder::default().build(&hm, &normals, biomes, 0.0, 0.0, 64.0)
    }

    fn face_normal(mesh: &TerrainMesh, tri: usize) -> Vec3 {
        let p = |i: usize| Vec3::from(mesh.vertices[mesh.indices[tri * 3 + i] as usize].position);
        (p(1) - p(0)).cross(p(2) - p(0))
    }

    #[test]
    fn counts_include_surface_and_skirts() {
        let res = 8;
        let mesh = build_flat(res, 1.0, None);
        assert_eq!(mesh.vertex_count(), res * res + 4 * (res - 1) * 2);
        assert_eq!(
            mesh.triangle_count(),
            (res - 1) * (res - 1) * 2 + 4 * (res - 1) * 2
        );
        assert!(mesh
            .indices
            .iter()
            .all(|&i| (i as usize) < mesh.vertex_count()));
    }

    #[test]
    fn surface_spans_chunk_with_tiled_uvs() {
        let res = 5;
        let mesh = build_flat(res, 2.0, None);
        let last = mesh.vertices[res * res - 1];
        assert_eq!(last.position, [64.0, 2.0, 64.0]);
        assert_eq!(last.uv, [UV_TILING, UV_TILING]);
        assert_eq!(mesh.vertices[0].color, DEFAULT_TERRAIN_COLOR);
    }

    #[test]
    fn biome_colors_are_per_vertex() {
        let map = BiomeMap::filled(4, BiomeId::CrystalCaves);
        let mesh = build_flat(4, 0.0, Some(&map));
        assert_eq!(
            mesh.vertices[5].color,
            BiomeId::CrystalCaves.definition().color
        );
    }

    #[test]
    fn skirts_drop_below_lowest_vertex() {
        let mut hm = Heightmap::filled(4, 4, 10.0);
        hm.set(2, 2, 3.0);
        let normals = NormalCalculator::compute(&hm, 1.0, 1.0);
        let mesh = MeshBuilder::new(20.0).build(&hm, &normals, None, 0.0, 0.0, 64.0);
        let skirt = &mesh.vertices[16..];
        assert!(skirt.iter().all(|v| v.position[1] == -17.0));
        assert!(skirt.iter().all(|v| v.color == SKIRT_COLOR));
    }

    #[test]
    fn every_face_winds_outward() {
        let res = 6;
        let mesh = build_flat(res, 5.0, None);
        let surface_tris = (res - 1) * (res - 1) * 2;
        for tri in 0..surface_tris {
            assert!(face_normal(&mesh, tri).y > 0.0, "surface triangle {tri} faces down");
        }
        for tri in surface_tris..mesh.triangle_count() {
            let facing = face_normal(&mesh, tri);
            let declared = Vec3::from(mesh.vertices[mesh.indices[tri * 3 + 1] as usize].normal);
            let declared = if declared.y != 0.0 {
                Vec3::from(mesh.vertices[mesh.indices[tri * 3 + 2] as usize].normal)
            } else {
                declared
            };
            assert!(
                facing.dot(declared) > 0.0,
                "skirt triangle {tri} winds against its normal"
            );
        }
    }

    #[test]
    fn bounds_cover_skirt_depth() {
        let mesh = build_flat(4, 1.0, None);
        let (min, max) = mesh.bounds().expect("mesh has vertices");
        assert_eq!(min, Vec3::new(0.0, -19.0, 0.0));
        assert_eq!(max, Vec3::new(64.0, 1.0, 64.0));
        assert!(mesh.byte_size() > 0);
    }

    #[test]
    fn degenerate_grid_yields_empty_mesh() {
        let mesh = build_flat(1, 0.0, None);
        assert!(mesh.is_empty());
        assert!(mesh.bounds().is_none());
    }
}
