//! GPU light clustering

use super::diagnostics::ClusterReadback;
use super::grid::ClusterGridConfig;
use super::layout::ClusterLayout;
use crate::backend::*;
use crate::shaders::{compose, programs, ShaderConstants};
use glam::UVec3;

/// Invocations per workgroup along the tile axes. One invocation per cluster.
pub const CLUSTER_WORKGROUP_SIZE: [u32; 2] = [8, 8];

/// Everything needed to record one clustering dispatch.
///
/// Kept separate from [`ClusterEngine`] so render graph passes can hold a
/// copy without borrowing the engine.
#[derive(Debug, Clone, Copy)]
pub struct ClusterDispatch {
    pub pipeline: ComputePipelineHandle,
    pub bind_group: BindGroupHandle,
    pub workgroups: UVec3,
}

impl ClusterDispatch {
    /// Record the clustering compute pass into the open command batch
    pub fn record(&self, backend: &mut dyn GraphicsBackend) {
        backend.begin_compute_pass(Some("Light Clustering"));
        backend.set_compute_pipeline(self.pipeline);
        backend.set_bind_group(0, self.bind_group);
        backend.dispatch_compute(self.workgroups.x, self.workgroups.y, self.workgroups.z);
        backend.end_compute_pass();
    }
}

/// Owns the cluster buffer and the clustering pipeline.
///
/// Each dispatch rewrites every cluster record completely, so nothing from
/// an earlier frame survives into the next one.
pub struct ClusterEngine {
    config: ClusterGridConfig,
    layout: ClusterLayout,
    cluster_buffer: BufferHandle,
    bind_group_layout: BindGroupLayoutHandle,
    dispatch: ClusterDispatch,
}

impl ClusterEngine {
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        config: ClusterGridConfig,
        constants: &ShaderConstants,
        camera_buffer: BufferHandle,
        light_buffer: BufferHandle,
    ) -> BackendResult<Self> {
        config.validate()?;
        let layout = ClusterLayout::new(config.num_clusters(), config.max_lights_per_cluster);

        let cluster_buffer = backend.create_buffer(&BufferDescriptor::new(
            "Cluster Buffer",
            layout.buffer_size(),
            BufferUsage::STORAGE | BufferUsage::COPY_SRC | BufferUsage::COPY_DST,
        ))?;

        let bind_group_layout = backend.create_bind_group_layout(
            "Light Clustering",
            &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStageFlags::COMPUTE,
                    ty: BindingType::UniformBuffer,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStageFlags::COMPUTE,
                    ty: BindingType::StorageBuffer { read_only: true },
                },
                BindGroupLayoutEntry {
                    binding: 2,
                    visibility: ShaderStageFlags::COMPUTE,
                    ty: BindingType::StorageBuffer { read_only: false },
                },
            ],
        )?;

        let bind_group = backend.create_bind_group(
            "Light Clustering",
            bind_group_layout,
            &[
                (0, BindGroupEntry::buffer(camera_buffer)),
                (1, BindGroupEntry::buffer(light_buffer)),
                (2, BindGroupEntry::buffer(cluster_buffer)),
            ],
        )?;

        let pipeline = backend.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some("Light Clustering".into()),
            shader: compose(programs::CLUSTERING_PROGRAM, constants)?,
            entry_point: "main".into(),
            bind_group_layouts: vec![bind_group_layout],
        })?;

        log::info!(
            "Cluster grid {}x{}x{} ({} clusters, {} lights max each, {} KiB)",
            config.dims.x,
            config.dims.y,
            config.dims.z,
            layout.num_clusters,
            layout.max_lights_per_cluster,
            layout.buffer_size() / 1024
        );

        Ok(Self {
            config,
            layout,
            cluster_buffer,
            bind_group_layout,
            dispatch: ClusterDispatch {
                pipeline,
                bind_group,
                workgroups: Self::workgroup_count(config.dims),
            },
        })
    }

    /// Workgroups covering every cluster: `ceil(x / 8)`, `ceil(y / 8)`, one
    /// per depth slice.
    pub fn workgroup_count(dims: UVec3) -> UVec3 {
        UVec3::new(
            dims.x.div_ceil(CLUSTER_WORKGROUP_SIZE[0]),
            dims.y.div_ceil(CLUSTER_WORKGROUP_SIZE[1]),
            dims.z,
        )
    }

    /// Record a clustering dispatch into the current command batch. The
    /// camera uniform must already hold this frame's matrices.
    pub fn run_clustering(&self, backend: &mut dyn GraphicsBackend) {
        self.dispatch.record(backend);
    }

    /// Start an asynchronous copy of the first `first_n` cluster records.
    ///
    /// The copy is submitted right away and observes every batch submitted
    /// before this call.
    pub fn inspect(
        &self,
        backend: &mut dyn GraphicsBackend,
        first_n: u32,
    ) -> BackendResult<ClusterReadback> {
        let count = first_n.min(self.layout.num_clusters);
        let size = self.layout.stride() * count as u64;
        let pending = backend.read_buffer(self.cluster_buffer, 0, size)?;
        Ok(ClusterReadback::new(pending, self.layout, count))
    }

    pub fn dispatch(&self) -> ClusterDispatch {
        self.dispatch
    }

    pub fn config(&self) -> &ClusterGridConfig {
        &self.config
    }

    pub fn layout(&self) -> ClusterLayout {
        self.layout
    }

    pub fn cluster_buffer(&self) -> BufferHandle {
        self.cluster_buffer
    }

    pub fn bind_group_layout(&self) -> BindGroupLayoutHandle {
        self.bind_group_layout
    }
}
