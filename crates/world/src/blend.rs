//! Border blending against already generated neighbor chunks.

use crate::heightmap::Heightmap;

/// Generated heightmaps of the four cardinal neighbors, where available.
///
/// `left` is `x - 1`, `right` is `x + 1`, `front` is `z - 1` and `back` is
/// `z + 1` in chunk space.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeighborEdges<'a> {
    pub left: Option<&'a Heightmap>,
    pub right: Option<&'a Heightmap>,
    pub front: Option<&'a Heightmap>,
    pub back: Option<&'a Heightmap>,
}

/// Pulls a chunk's border strip toward its neighbors' shared edges.
pub struct EdgeBlender;

impl EdgeBlender {
    /// Cells blended inward from each edge: `min(4, resolution / 4)`.
    pub fn blend_width(resolution: usize) -> usize {
        (resolution / 4).min(4)
    }

    /// Blend `heightmap` in place against each present neighbor.
    ///
    /// Neighbors apply in the fixed order left, right, front, back. The cell
    /// `i` cells in from a shared edge is overwritten with a mix of this
    /// chunk's edge height and the neighbor's matching edge height, weighted
    /// `1 - i / blend_width` toward the neighbor. The edge itself takes the
    /// neighbor's value exactly and interior detail inside the strip is
    /// replaced by the ramp. Corner cells end up reflecting the last
    /// direction applied. Neighbors whose grid differs in shape are skipped.
    pub fn blend(heightmap: &mut Heightmap, neighbors: &NeighborEdges<'_>) {
        let width = heightmap.width();
        let depth = heightmap.depth();
        let same_shape = |other: &&Heightmap| other.width() == width && other.depth() == depth;

        let band_x = Self::blend_width(width);
        let band_z = Self::blend_width(depth);

        if let Some(left) = neighbors.left.filter(same_shape) {
            for z in 0..depth {
                let target = left.get(width - 1, z);
                let edge = heightmap.get(0, z);
                for i in 0..band_x {
                    let value = mix(edge, target, falloff(i, band_x));
                    heightmap.set(i, z, value);
                }
            }
        }

        if let Some(right) = neighbors.right.filter(same_shape) {
            for z in 0..depth {
                let target = right.get(0, z);
                let edge = heightmap.get(width - 1, z);
                for i in 0..band_x {
                    let value = mix(edge, target, falloff(i, band_x));
                    heightmap.set(width - 1 - i, z, value);
                }
            }
        }

        if let Some(front) = neighbors.front.filter(same_shape) {
            for x in 0..width {
                let target = front.get(x, depth - 1);
                let edge = heightmap.get(x, 0);
                for i in 0..band_z {
                    let value = mix(edge, target, falloff(i, band_z));
                    heightmap.set(x, i, value);
                }
            }
        }

        if let Some(back) = neighbors.back.filter(same_shape) {
            for x in 0..width {
                let target = back.get(x, 0);
                let edge = heightmap.get(x, depth - 1);
                for i in 0..band_z {
                    let value = mix(edge, target, falloff(i, band_z));
                    heightmap.set(x, depth - 1 - i, value);
                }
            }
        }
    }
}

fn falloff(i: usize, band: usize) -> f32 {
    1.0 - i as f32 / band as f32
}

fn mix(edge: f32, target: f32, factor: f32) -> f32 {
    edge * (1.0 - factor) + target * factor
}
