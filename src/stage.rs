//! GPU state shared by every renderer: camera, lights, clusters, geometry

use crate::backend::{BackendError, BackendResult, GraphicsBackend};
use crate::cluster::{ClusterEngine, ClusterGridConfig, CLUSTER_WORKGROUP_SIZE};
use crate::lights::{
    LightStore, LightStoreConfig, BOUNCE_SPEED, DRIFT_AMPLITUDE, DRIFT_SPEED,
    MOVE_LIGHTS_WORKGROUP_SIZE,
};
use crate::scene::{Camera, CameraBuffer, DrawList, Scene};
use crate::shaders::ShaderConstants;
use crate::shading::{ShadingConfig, CLEAR_COLOR, MIN_DISTANCE_SQUARED};

/// Constants baked into every shader of the crate
pub fn shader_constants(
    grid: &ClusterGridConfig,
    lights: &LightStoreConfig,
    shading: &ShadingConfig,
) -> ShaderConstants {
    let clear_color = CLEAR_COLOR
        .iter()
        .map(|c| format!("{:?}", c))
        .collect::<Vec<_>>()
        .join(", ");

    ShaderConstants::new()
        .uint("NUM_CLUSTERS_X", grid.dims.x)
        .uint("NUM_CLUSTERS_Y", grid.dims.y)
        .uint("NUM_CLUSTERS_Z", grid.dims.z)
        .uint("MAX_LIGHTS_PER_CLUSTER", grid.max_lights_per_cluster)
        .uint("CLUSTER_WORKGROUP_X", CLUSTER_WORKGROUP_SIZE[0])
        .uint("CLUSTER_WORKGROUP_Y", CLUSTER_WORKGROUP_SIZE[1])
        .float("LIGHT_RADIUS", lights.radius)
        .float("AMBIENT", shading.ambient)
        .float("MIN_DISTANCE_SQUARED", MIN_DISTANCE_SQUARED)
        .uint("MOVE_LIGHTS_WORKGROUP_SIZE", MOVE_LIGHTS_WORKGROUP_SIZE)
        .float("BOUNCE_SPEED", BOUNCE_SPEED)
        .float("DRIFT_SPEED", DRIFT_SPEED)
        .float("DRIFT_AMPLITUDE", DRIFT_AMPLITUDE)
        .raw("CLEAR_COLOR", clear_color)
}

/// Everything a frame reads, independent of the shading path
pub struct Stage {
    pub camera: Camera,
    pub camera_buffer: CameraBuffer,
    pub lights: LightStore,
    pub clusters: ClusterEngine,
    pub draw_list: DrawList,
    pub shading: ShadingConfig,
    pub constants: ShaderConstants,
}

impl Stage {
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        scene: &Scene,
        grid: ClusterGridConfig,
        lights: LightStoreConfig,
        shading: ShadingConfig,
    ) -> BackendResult<Self> {
        grid.validate()?;
        lights.validate()?;
        shading.validate()?;

        let projection = scene.camera.projection;
        if !(projection.near > 0.0 && projection.far > projection.near) {
            return Err(BackendError::InvalidConfig(format!(
                "camera needs 0 < near < far, got near {} far {}",
                projection.near, projection.far
            )));
        }

        let constants = shader_constants(&grid, &lights, &shading);
        let (width, height) = backend.surface_size();

        let mut camera = scene.camera.clone();
        camera.set_aspect(width as f32, height as f32);
        let camera_buffer = CameraBuffer::new(backend, &camera, width, height)?;
        let lights = LightStore::new(backend, lights, &constants)?;
        let clusters = ClusterEngine::new(
            backend,
            grid,
            &constants,
            camera_buffer.buffer(),
            lights.buffer(),
        )?;
        let draw_list = DrawList::upload(backend, scene)?;

        Ok(Self {
            camera,
            camera_buffer,
            lights,
            clusters,
            draw_list,
            shading,
            constants,
        })
    }

    /// Write this frame's camera block
    pub fn update_camera(&mut self, backend: &mut dyn GraphicsBackend, width: u32, height: u32) {
        self.camera_buffer.update(backend, &self.camera, width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaders::{compose, programs};

    #[test]
    fn test_every_placeholder_is_defined() {
        let constants = shader_constants(
            &ClusterGridConfig::default(),
            &LightStoreConfig::default(),
            &ShadingConfig::default(),
        );
        for program in [
            programs::CLUSTERING_PROGRAM,
            programs::MOVE_LIGHTS_PROGRAM,
            programs::FORWARD_PROGRAM,
            programs::GBUFFER_PROGRAM,
            programs::RESOLVE_PROGRAM,
        ] {
            let source = compose(program, &constants).unwrap();
            assert!(!source.contains("${"));
        }
        assert_eq!(constants.get("CLEAR_COLOR"), Some("0.0, 0.0, 0.0, 1.0"));
        assert_eq!(constants.get("NUM_CLUSTERS_Z"), Some("24"));
    }
}
