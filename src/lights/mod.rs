//! Light store: packed point lights, seeded colors and deterministic motion

mod data;
mod motion;
mod store;

pub use data::*;
pub use motion::*;
pub use store::{generate_lights, LightStore, LightStoreConfig};
