//! Render graph definition and compilation

use super::pass::*;
use super::resource::*;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderGraphError {
    #[error("Render graph has a dependency cycle through pass `{0}`")]
    CyclicDependency(String),
    #[error("Unknown render graph resource {0}")]
    UnknownResource(u32),
    #[error("External resource `{0}` was not bound before execution")]
    MissingExternal(String),
}

/// Passes and the resources they touch
pub struct RenderGraph {
    passes: Vec<Box<dyn RenderPass>>,
    pass_nodes: Vec<PassNode>,
    resources: Vec<VirtualResource>,
    next_pass_id: u32,
    next_resource_id: u32,
    screen_width: u32,
    screen_height: u32,
}

impl RenderGraph {
    pub fn new(screen_width: u32, screen_height: u32) -> Self {
        Self {
            passes: Vec::new(),
            pass_nodes: Vec::new(),
            resources: Vec::new(),
            next_pass_id: 0,
            next_resource_id: 0,
            screen_width,
            screen_height,
        }
    }

    fn allocate_resource_id(&mut self) -> ResourceId {
        let id = ResourceId(self.next_resource_id);
        self.next_resource_id += 1;
        id
    }

    /// Register a resource bound per frame, like the output image
    pub fn register_external(&mut self, name: &str) -> ResourceId {
        let id = self.allocate_resource_id();
        self.resources.push(VirtualResource::External {
            id,
            name: name.to_string(),
        });
        id
    }

    /// Make a buffer owned elsewhere visible to pass dependency tracking
    pub fn import_buffer(&mut self, name: &str) -> ResourceId {
        let id = self.allocate_resource_id();
        self.resources.push(VirtualResource::Buffer(ImportedBuffer {
            id,
            name: name.to_string(),
        }));
        id
    }

    pub fn add_pass<P: RenderPass + 'static>(&mut self, pass: P, pass_type: PassType) -> PassId {
        let id = PassId(self.next_pass_id);
        self.next_pass_id += 1;

        let name = pass.name().to_string();
        let mut boxed_pass = Box::new(pass);

        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        {
            let mut ctx = PassSetupContext {
                resources: &mut self.resources,
                inputs: &mut inputs,
                outputs: &mut outputs,
                next_resource_id: &mut self.next_resource_id,
                screen_width: self.screen_width,
                screen_height: self.screen_height,
            };
            boxed_pass.setup(&mut ctx);
        }

        self.passes.push(boxed_pass);
        self.pass_nodes.push(PassNode {
            id,
            name,
            pass_type,
            inputs,
            outputs,
        });
        id
    }

    /// Order passes so that every writer of a resource runs before its
    /// readers. Independent passes keep their insertion order, so the same
    /// graph always compiles to the same order.
    pub fn compile(&self) -> Result<CompiledGraph, RenderGraphError> {
        for node in &self.pass_nodes {
            for access in node.accesses() {
                if !self.resources.iter().any(|r| r.id() == access.resource) {
                    return Err(RenderGraphError::UnknownResource(access.resource.0));
                }
            }
        }

        // dependencies[i] = passes that must run before pass i
        let count = self.pass_nodes.len();
        let mut dependencies: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); count];
        for (reader_index, reader) in self.pass_nodes.iter().enumerate() {
            for (writer_index, writer) in self.pass_nodes.iter().enumerate() {
                if reader_index != writer_index
                    && reader.inputs.iter().any(|input| writer.writes_resource(input.resource))
                {
                    dependencies[reader_index].insert(writer_index);
                }
            }
        }

        let mut in_degree: Vec<usize> = dependencies.iter().map(BTreeSet::len).collect();
        let mut ready: BTreeSet<usize> = (0..count).filter(|&i| in_degree[i] == 0).collect();
        let mut sorted = Vec::with_capacity(count);

        while let Some(index) = ready.pop_first() {
            sorted.push(index);
            for (dependent, deps) in dependencies.iter().enumerate() {
                if deps.contains(&index) {
                    in_degree[dependent] -= 1;
                    if in_degree[dependent] == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if sorted.len() < count {
            let stuck = (0..count)
                .find(|i| !sorted.contains(i))
                .map(|i| self.pass_nodes[i].name.clone())
                .unwrap_or_default();
            return Err(RenderGraphError::CyclicDependency(stuck));
        }

        let pass_order: Vec<PassId> = sorted.iter().map(|&i| self.pass_nodes[i].id).collect();
        log::debug!(
            "Compiled render graph: {}",
            sorted
                .iter()
                .map(|&i| self.pass_nodes[i].name.as_str())
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        Ok(CompiledGraph { pass_order })
    }

    pub fn passes_mut(&mut self) -> &mut [Box<dyn RenderPass>] {
        &mut self.passes
    }

    pub fn pass_nodes(&self) -> &[PassNode] {
        &self.pass_nodes
    }

    pub fn resources(&self) -> &[VirtualResource] {
        &self.resources
    }

    pub fn screen_size(&self) -> (u32, u32) {
        (self.screen_width, self.screen_height)
    }

    pub fn get_pass(&self, id: PassId) -> Option<&dyn RenderPass> {
        let index = self.pass_nodes.iter().position(|n| n.id == id)?;
        Some(self.passes[index].as_ref())
    }

    /// Downcast a pass to its concrete type
    pub fn pass_as<P: RenderPass + 'static>(&self, id: PassId) -> Option<&P> {
        self.get_pass(id)?.as_any().downcast_ref::<P>()
    }

    pub fn get_pass_node(&self, id: PassId) -> Option<&PassNode> {
        self.pass_nodes.iter().find(|n| n.id == id)
    }
}

/// Compiled render graph: passes in execution order
#[derive(Debug, Clone)]
pub struct CompiledGraph {
    pub pass_order: Vec<PassId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    struct TestPass {
        name: &'static str,
        reads: Vec<ResourceId>,
        writes: Vec<ResourceId>,
    }

    impl TestPass {
        fn new(name: &'static str, reads: &[ResourceId], writes: &[ResourceId]) -> Self {
            Self {
                name,
                reads: reads.to_vec(),
                writes: writes.to_vec(),
            }
        }
    }

    impl RenderPass for TestPass {
        fn name(&self) -> &str {
            self.name
        }

        fn setup(&mut self, ctx: &mut PassSetupContext) {
            for &r in &self.reads {
                ctx.read(r, ResourceUsage::StorageBufferRead);
            }
            for &w in &self.writes {
                ctx.write(w, ResourceUsage::StorageBufferWrite);
            }
        }

        fn execute(&self, _ctx: &mut PassExecuteContext) {}

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn names(graph: &RenderGraph, compiled: &CompiledGraph) -> Vec<String> {
        compiled
            .pass_order
            .iter()
            .map(|&id| graph.get_pass_node(id).unwrap().name.clone())
            .collect()
    }

    #[test]
    fn test_writer_runs_before_reader() {
        let mut graph = RenderGraph::new(64, 64);
        let clusters = graph.import_buffer("clusters");
        let output = graph.register_external("output");
        graph.add_pass(TestPass::new("shade", &[clusters], &[output]), PassType::Graphics);
        graph.add_pass(TestPass::new("cluster", &[], &[clusters]), PassType::Compute);

        let compiled = graph.compile().unwrap();
        assert_eq!(names(&graph, &compiled), vec!["cluster", "shade"]);
    }

    #[test]
    fn test_independent_passes_keep_insertion_order() {
        let mut graph = RenderGraph::new(64, 64);
        let a = graph.import_buffer("a");
        let b = graph.import_buffer("b");
        for name in ["first", "second", "third"] {
            graph.add_pass(TestPass::new(name, &[], &[a]), PassType::Compute);
        }
        graph.add_pass(TestPass::new("fourth", &[], &[b]), PassType::Compute);

        let first = names(&graph, &graph.compile().unwrap());
        assert_eq!(first, vec!["first", "second", "third", "fourth"]);
        assert_eq!(names(&graph, &graph.compile().unwrap()), first);
    }

    #[test]
    fn test_cycle_is_reported() {
        let mut graph = RenderGraph::new(64, 64);
        let a = graph.import_buffer("a");
        let b = graph.import_buffer("b");
        graph.add_pass(TestPass::new("x", &[a], &[b]), PassType::Compute);
        graph.add_pass(TestPass::new("y", &[b], &[a]), PassType::Compute);
        assert!(matches!(graph.compile(), Err(RenderGraphError::CyclicDependency(_))));
    }

    #[test]
    fn test_unknown_resource_is_reported() {
        let mut graph = RenderGraph::new(64, 64);
        graph.add_pass(TestPass::new("x", &[ResourceId(42)], &[]), PassType::Compute);
        assert_eq!(graph.compile().unwrap_err(), RenderGraphError::UnknownResource(42));
    }

    #[test]
    fn test_pass_downcast() {
        let mut graph = RenderGraph::new(64, 64);
        let id = graph.add_pass(TestPass::new("x", &[], &[]), PassType::Compute);
        assert_eq!(graph.pass_as::<TestPass>(id).unwrap().name, "x");
    }
}
