//! Render Graph System
//!
//! Passes declare the resources they read and write. The graph orders them
//! so every writer runs before its readers, the executor allocates graph
//! textures and records the passes in that order.

pub mod executor;
pub mod graph;
pub mod pass;
pub mod resource;

pub use executor::*;
pub use graph::*;
pub use pass::*;
pub use resource::*;
