//! WGSL sources and composition.
//!
//! Shaders live as `.wgsl` files under `shaders/` and are concatenated per
//! pipeline. Data layouts and the lighting function are written once and
//! shared by every consumer, so the clustering kernel, the forward pass and
//! the deferred resolve always agree on the cluster buffer contract.
//!
//! Initialization-time constants appear in the sources as `${NAME}` and are
//! substituted from [`ShaderConstants`] when a pipeline is built.
//!
//! | Source | Contents |
//! |--------|----------|
//! | `common.wgsl` | Camera, light set and cluster layouts |
//! | `cluster_grid.wgsl` | Depth slicing and cluster bounds |
//! | `clustering.wgsl` | Light assignment kernel |
//! | `scene_bindings.wgsl` | Group 0 bindings of the shading consumers |
//! | `lighting.wgsl` | Cluster lookup and light accumulation |
//! | `geometry.wgsl` | Vertex stage shared by forward and G-buffer |
//! | `forward.wgsl` | Forward fragment stage |
//! | `gbuffer.wgsl` | G-buffer fragment stage |
//! | `resolve.wgsl` | Fullscreen deferred resolve |
//! | `move_lights.wgsl` | Light motion kernel |

use crate::backend::{BackendError, BackendResult};

pub const COMMON: &str = include_str!("../../shaders/common.wgsl");
pub const CLUSTER_GRID: &str = include_str!("../../shaders/cluster_grid.wgsl");
pub const CLUSTERING: &str = include_str!("../../shaders/clustering.wgsl");
pub const SCENE_BINDINGS: &str = include_str!("../../shaders/scene_bindings.wgsl");
pub const LIGHTING: &str = include_str!("../../shaders/lighting.wgsl");
pub const GEOMETRY: &str = include_str!("../../shaders/geometry.wgsl");
pub const FORWARD: &str = include_str!("../../shaders/forward.wgsl");
pub const GBUFFER: &str = include_str!("../../shaders/gbuffer.wgsl");
pub const RESOLVE: &str = include_str!("../../shaders/resolve.wgsl");
pub const MOVE_LIGHTS: &str = include_str!("../../shaders/move_lights.wgsl");

/// Module lists for every pipeline in the crate
pub mod programs {
    use super::*;

    pub const CLUSTERING_PROGRAM: &[&str] = &[COMMON, CLUSTER_GRID, CLUSTERING];
    pub const MOVE_LIGHTS_PROGRAM: &[&str] = &[COMMON, MOVE_LIGHTS];
    pub const FORWARD_PROGRAM: &[&str] =
        &[COMMON, CLUSTER_GRID, SCENE_BINDINGS, LIGHTING, GEOMETRY, FORWARD];
    pub const GBUFFER_PROGRAM: &[&str] = &[COMMON, SCENE_BINDINGS, GEOMETRY, GBUFFER];
    pub const RESOLVE_PROGRAM: &[&str] =
        &[COMMON, CLUSTER_GRID, SCENE_BINDINGS, LIGHTING, RESOLVE];
}

/// Named values substituted into `${NAME}` placeholders
#[derive(Debug, Clone, Default)]
pub struct ShaderConstants {
    entries: Vec<(String, String)>,
}

impl ShaderConstants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uint(self, name: &str, value: u32) -> Self {
        self.raw(name, value.to_string())
    }

    /// Floats are written with `{:?}` so integral values keep their `.0`.
    pub fn float(self, name: &str, value: f32) -> Self {
        self.raw(name, format!("{:?}", value))
    }

    pub fn raw(mut self, name: &str, value: String) -> Self {
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Replace every placeholder in `source`. Unknown names are an error.
    pub fn substitute(&self, source: &str) -> BackendResult<String> {
        let mut output = String::with_capacity(source.len());
        let mut rest = source;
        while let Some(start) = rest.find("${") {
            output.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find('}').ok_or_else(|| {
                BackendError::PipelineCreationFailed("unterminated shader constant".into())
            })?;
            let name = &after[..end];
            let value = self.get(name).ok_or_else(|| {
                BackendError::PipelineCreationFailed(format!("unknown shader constant `{}`", name))
            })?;
            output.push_str(value);
            rest = &after[end + 1..];
        }
        output.push_str(rest);
        Ok(output)
    }
}

/// Concatenate `modules` and substitute constants.
pub fn compose(modules: &[&str], constants: &ShaderConstants) -> BackendResult<String> {
    constants.substitute(&modules.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_replaces_all_occurrences() {
        let constants = ShaderConstants::new().uint("N", 4).float("R", 2.0);
        let out = constants
            .substitute("array<u32, ${N}>; const R = ${R}; const M = ${N}u;")
            .unwrap();
        assert_eq!(out, "array<u32, 4>; const R = 2.0; const M = 4u;");
    }

    #[test]
    fn test_unknown_constant_is_an_error() {
        let constants = ShaderConstants::new();
        assert!(constants.substitute("const X = ${MISSING};").is_err());
        assert!(constants.substitute("const X = ${UNTERMINATED").is_err());
    }

    #[test]
    fn test_later_value_wins() {
        let constants = ShaderConstants::new().uint("N", 1).uint("N", 2);
        assert_eq!(constants.get("N"), Some("2"));
    }

    #[test]
    fn test_float_formatting_is_valid_wgsl() {
        let constants = ShaderConstants::new()
            .float("A", 0.1)
            .float("B", 5.0)
            .float("C", 1e-4);
        assert_eq!(constants.get("A"), Some("0.1"));
        assert_eq!(constants.get("B"), Some("5.0"));
        assert_eq!(constants.get("C"), Some("0.0001"));
    }
}
