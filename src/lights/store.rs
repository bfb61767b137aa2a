//! GPU light store

use super::data::{hue_to_rgb, light_buffer_size, GpuLight, LightSetHeader, LIGHT_HEADER_SIZE};
use super::motion::{LightMotion, MotionUniforms, MOVE_LIGHTS_WORKGROUP_SIZE};
use crate::backend::*;
use crate::shaders::{compose, programs, ShaderConstants};
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Light store configuration
#[derive(Debug, Clone, PartialEq)]
pub struct LightStoreConfig {
    /// Lights allocated up front. The buffer never grows.
    pub capacity: u32,
    pub initial_active: u32,
    /// Influence radius shared by every light
    pub radius: f32,
    pub intensity: f32,
    /// Seed for colors, motion seeds and phases
    pub seed: u64,
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
}

impl Default for LightStoreConfig {
    fn default() -> Self {
        Self {
            capacity: 5000,
            initial_active: 500,
            radius: 2.0,
            intensity: 0.1,
            seed: 0x5eed_1163,
            bounds_min: Vec3::new(-14.0, 0.2, -14.0),
            bounds_max: Vec3::new(14.0, 3.0, 14.0),
        }
    }
}

impl LightStoreConfig {
    pub fn validate(&self) -> BackendResult<()> {
        if self.capacity == 0 {
            return Err(BackendError::InvalidConfig("light capacity must be at least 1".into()));
        }
        if !(self.radius > 0.0) {
            return Err(BackendError::InvalidConfig(format!(
                "light radius must be positive, got {}",
                self.radius
            )));
        }
        if self.bounds_min.cmpgt(self.bounds_max).any() {
            return Err(BackendError::InvalidConfig(format!(
                "light bounds are inverted: {} > {}",
                self.bounds_min, self.bounds_max
            )));
        }
        Ok(())
    }

    pub fn motion(&self) -> LightMotion {
        LightMotion::new(self.bounds_min, self.bounds_max)
    }
}

/// Generate `config.capacity` lights. The same config always yields the
/// same lights.
pub fn generate_lights(config: &LightStoreConfig) -> Vec<GpuLight> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let motion = config.motion();
    (0..config.capacity)
        .map(|_| {
            let hue: f32 = rng.gen();
            let seed: f32 = rng.gen();
            let phase = rng.gen_range(0.0..std::f32::consts::TAU);
            let position = motion.position_at(seed, phase, 0.0);
            GpuLight::new(position, seed, hue_to_rgb(hue) * config.intensity, phase)
        })
        .collect()
}

/// Owns the packed light buffer and the motion kernel.
///
/// The buffer holds a 16-byte header with the active count followed by
/// `capacity` lights. Lights past the active count stay allocated but are
/// ignored by every consumer.
pub struct LightStore {
    config: LightStoreConfig,
    lights: Vec<GpuLight>,
    active_count: u32,
    buffer: BufferHandle,
    motion_buffer: BufferHandle,
    motion_bind_group: BindGroupHandle,
    motion_pipeline: ComputePipelineHandle,
}

impl LightStore {
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        config: LightStoreConfig,
        constants: &ShaderConstants,
    ) -> BackendResult<Self> {
        config.validate()?;

        let lights = generate_lights(&config);
        let active_count = config.initial_active.min(config.capacity);

        let mut contents = Vec::with_capacity(light_buffer_size(config.capacity) as usize);
        contents.extend_from_slice(bytemuck::bytes_of(&LightSetHeader::new(active_count)));
        contents.extend_from_slice(bytemuck::cast_slice(&lights));

        let buffer = backend.create_buffer_init(
            &BufferDescriptor::new(
                "Light Buffer",
                light_buffer_size(config.capacity),
                BufferUsage::STORAGE | BufferUsage::COPY_DST | BufferUsage::COPY_SRC,
            ),
            &contents,
        )?;

        let motion_buffer = backend.create_buffer_init(
            &BufferDescriptor::new(
                "Light Motion Uniforms",
                std::mem::size_of::<MotionUniforms>() as u64,
                BufferUsage::UNIFORM | BufferUsage::COPY_DST,
            ),
            bytemuck::bytes_of(&config.motion().uniforms(0.0)),
        )?;

        let layout = backend.create_bind_group_layout(
            "Light Motion",
            &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStageFlags::COMPUTE,
                    ty: BindingType::StorageBuffer { read_only: false },
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStageFlags::COMPUTE,
                    ty: BindingType::UniformBuffer,
                },
            ],
        )?;
        let motion_bind_group = backend.create_bind_group(
            "Light Motion",
            layout,
            &[
                (0, BindGroupEntry::buffer(buffer)),
                (1, BindGroupEntry::buffer(motion_buffer)),
            ],
        )?;
        let motion_pipeline = backend.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some("Light Motion".into()),
            shader: compose(programs::MOVE_LIGHTS_PROGRAM, constants)?,
            entry_point: "main".into(),
            bind_group_layouts: vec![layout],
        })?;

        log::info!(
            "Light store: {} of {} lights active, radius {}",
            active_count,
            config.capacity,
            config.radius
        );

        Ok(Self {
            config,
            lights,
            active_count,
            buffer,
            motion_buffer,
            motion_bind_group,
            motion_pipeline,
        })
    }

    /// Set how many lights contribute to shading. Requests above capacity
    /// are clamped, never rejected. Returns the count actually stored.
    pub fn set_active_count(&mut self, backend: &mut dyn GraphicsBackend, count: u32) -> u32 {
        let clamped = count.min(self.config.capacity);
        if clamped != count {
            log::debug!(
                "Requested {} active lights, clamped to capacity {}",
                count,
                self.config.capacity
            );
        }
        self.active_count = clamped;
        backend.write_buffer(self.buffer, 0, bytemuck::bytes_of(&LightSetHeader::new(clamped)));
        clamped
    }

    /// Move every active light to its position at `time`.
    ///
    /// Records and submits its own command batch, so it must not be called
    /// while a frame is open. The frame's clustering dispatch observes the
    /// new positions.
    pub fn advance(&mut self, backend: &mut dyn GraphicsBackend, time: f32) {
        backend.write_buffer(
            self.motion_buffer,
            0,
            bytemuck::bytes_of(&self.config.motion().uniforms(time)),
        );
        if self.active_count == 0 {
            return;
        }

        backend.begin_commands("Light Motion");
        backend.begin_compute_pass(Some("Move Lights"));
        backend.set_compute_pipeline(self.motion_pipeline);
        backend.set_bind_group(0, self.motion_bind_group);
        backend.dispatch_compute(Self::motion_workgroups(self.active_count), 1, 1);
        backend.end_compute_pass();
        backend.submit_commands();
    }

    pub fn motion_workgroups(active_count: u32) -> u32 {
        active_count.div_ceil(MOVE_LIGHTS_WORKGROUP_SIZE)
    }

    /// Host-side positions of the active lights at `time`, as the motion
    /// kernel computes them.
    pub fn positions_at(&self, time: f32) -> Vec<Vec3> {
        let motion = self.config.motion();
        self.lights[..self.active_count as usize]
            .iter()
            .map(|light| motion.position_at(light.seed(), light.phase(), time))
            .collect()
    }

    /// Lights as they were uploaded
    pub fn lights(&self) -> &[GpuLight] {
        &self.lights
    }

    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    pub fn active_count(&self) -> u32 {
        self.active_count
    }

    pub fn capacity(&self) -> u32 {
        self.config.capacity
    }

    pub fn radius(&self) -> f32 {
        self.config.radius
    }

    pub fn motion(&self) -> LightMotion {
        self.config.motion()
    }

    pub fn config(&self) -> &LightStoreConfig {
        &self.config
    }

    /// Byte offset of the first light in the buffer
    pub fn lights_offset(&self) -> u64 {
        LIGHT_HEADER_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_reproducible() {
        let config = LightStoreConfig {
            capacity: 64,
            ..Default::default()
        };
        assert_eq!(generate_lights(&config), generate_lights(&config));

        let other = LightStoreConfig {
            seed: config.seed + 1,
            ..config.clone()
        };
        assert_ne!(generate_lights(&config), generate_lights(&other));
    }

    #[test]
    fn test_generated_lights_start_at_time_zero() {
        let config = LightStoreConfig {
            capacity: 16,
            ..Default::default()
        };
        let motion = config.motion();
        for light in generate_lights(&config) {
            assert_eq!(
                light.world_position(),
                motion.position_at(light.seed(), light.phase(), 0.0)
            );
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(LightStoreConfig::default().validate().is_ok());
        let zero = LightStoreConfig {
            capacity: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());
        let radius = LightStoreConfig {
            radius: 0.0,
            ..Default::default()
        };
        assert!(radius.validate().is_err());
    }

    #[test]
    fn test_motion_workgroups() {
        assert_eq!(LightStore::motion_workgroups(1), 1);
        assert_eq!(LightStore::motion_workgroups(128), 1);
        assert_eq!(LightStore::motion_workgroups(129), 2);
        assert_eq!(LightStore::motion_workgroups(5000), 40);
    }
}
