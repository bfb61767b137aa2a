//! Meshes and materials drawn by the scene

mod material;
mod mesh;

pub use material::*;
pub use mesh::*;
