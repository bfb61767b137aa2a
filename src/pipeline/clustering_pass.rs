//! Light clustering as a render graph pass

use crate::cluster::ClusterDispatch;
use crate::render_graph::*;
use std::any::Any;

/// Rebuilds the cluster buffer. It is the only writer of that buffer, so
/// every shading pass that reads clusters is ordered after it.
pub struct ClusteringPass {
    dispatch: ClusterDispatch,
    camera: ResourceId,
    lights: ResourceId,
    clusters: ResourceId,
}

impl ClusteringPass {
    pub fn new(dispatch: ClusterDispatch, camera: ResourceId, lights: ResourceId, clusters: ResourceId) -> Self {
        Self {
            dispatch,
            camera,
            lights,
            clusters,
        }
    }
}

impl RenderPass for ClusteringPass {
    fn name(&self) -> &str {
        "Light Clustering"
    }

    fn setup(&mut self, ctx: &mut PassSetupContext) {
        ctx.read(self.camera, ResourceUsage::UniformBuffer);
        ctx.read(self.lights, ResourceUsage::StorageBufferRead);
        ctx.write(self.clusters, ResourceUsage::StorageBufferWrite);
    }

    fn execute(&self, ctx: &mut PassExecuteContext) {
        self.dispatch.record(ctx.backend);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
