//! Chunked procedural terrain: noise, biomes, heightmaps, meshes and the
//! streaming manager that keeps a square of chunks alive around the player.

mod biome;
mod blend;
mod chunk;
mod config;
mod heightmap;
mod manager;
mod mesh;
mod noise;
mod normals;
mod spawn;
mod upload;
mod vegetation;

pub use biome::*;
pub use blend::*;
pub use chunk::*;
pub use config::*;
pub use heightmap::*;
pub use manager::*;
pub use mesh::*;
pub use noise::*;
pub use normals::*;
pub use spawn::*;
pub use upload::*;
pub use vegetation::*;
