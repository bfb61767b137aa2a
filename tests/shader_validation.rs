//! Every pipeline's composed WGSL parses and validates with naga, and
//! translates to GLSL ES so the pipelines also build on GL adapters.

mod common;

use clustered_shading::cluster::ClusterGridConfig;
use clustered_shading::{Engine, EngineConfig, RecordingBackend, RendererKind, Scene, ShadingConfig};
use glam::UVec3;
use naga::back::glsl;
use naga::proc::BoundsCheckPolicies;
use naga::valid::{Capabilities, ModuleInfo, ValidationFlags, Validator};
use naga::Module;
use rstest::rstest;

fn validate(label: &str, source: &str) -> (Module, ModuleInfo) {
    let module = naga::front::wgsl::parse_str(source)
        .unwrap_or_else(|e| panic!("{} failed to parse:\n{}", label, e.emit_to_string(source)));
    let info = Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .unwrap_or_else(|e| panic!("{} failed validation: {:?}", label, e));
    (module, info)
}

/// Same translation wgpu's GL backend runs when it creates the pipeline
fn translate_to_glsl(label: &str, module: &Module, info: &ModuleInfo) {
    let options = glsl::Options::default();
    for entry in &module.entry_points {
        let pipeline_options = glsl::PipelineOptions {
            shader_stage: entry.stage,
            entry_point: entry.name.clone(),
            multiview: None,
        };
        let mut output = String::new();
        glsl::Writer::new(
            &mut output,
            module,
            info,
            &options,
            &pipeline_options,
            BoundsCheckPolicies::default(),
        )
        .and_then(|mut writer| writer.write())
        .unwrap_or_else(|e| panic!("{} `{}` has no GLSL form: {:?}", label, entry.name, e));
    }
}

fn deferred_engine(grid: ClusterGridConfig) -> Engine<RecordingBackend> {
    let config = EngineConfig {
        grid,
        shading: ShadingConfig { ambient: 0.05 },
        renderer: RendererKind::Deferred,
        ..Default::default()
    };
    Engine::from_backend(RecordingBackend::new(320, 240), config, &Scene::demo()).unwrap()
}

#[rstest]
#[case::default_grid(ClusterGridConfig::default())]
#[case::tiny(ClusterGridConfig::new(UVec3::new(1, 1, 1), 1))]
#[case::end_to_end(ClusterGridConfig::new(UVec3::new(4, 4, 4), 4))]
#[case::odd(ClusterGridConfig::new(UVec3::new(13, 7, 5), 33))]
fn test_all_pipelines_validate(#[case] grid: ClusterGridConfig) {
    common::init_logging();
    let engine = deferred_engine(grid);

    let pipelines = engine.backend().pipelines();
    let labels: Vec<_> = pipelines.iter().filter_map(|p| p.label.clone()).collect();
    for expected in [
        "Light Clustering",
        "Light Motion",
        "Forward Shading",
        "G-Buffer",
        "Deferred Resolve",
    ] {
        assert!(labels.iter().any(|l| l == expected), "missing {}", expected);
    }
    assert_eq!(pipelines.iter().filter(|p| p.compute).count(), 2);

    for pipeline in pipelines {
        assert!(!pipeline.shader.contains("${"));
        validate(pipeline.label.as_deref().unwrap_or("unlabelled"), &pipeline.shader);
    }
}

#[rstest]
fn test_invalid_grid_is_rejected() {
    let config = EngineConfig {
        grid: ClusterGridConfig::new(UVec3::new(16, 0, 24), 256),
        ..Default::default()
    };
    let result = Engine::from_backend(RecordingBackend::new(320, 240), config, &Scene::demo());
    assert!(matches!(
        result.err(),
        Some(clustered_shading::BackendError::InvalidConfig(_))
    ));
}

#[rstest]
#[case::default_grid(ClusterGridConfig::default())]
#[case::end_to_end(ClusterGridConfig::new(UVec3::new(4, 4, 4), 4))]
fn test_all_pipelines_translate_to_glsl(#[case] grid: ClusterGridConfig) {
    common::init_logging();
    let engine = deferred_engine(grid);
    for pipeline in engine.backend().pipelines() {
        let label = pipeline.label.as_deref().unwrap_or("unlabelled");
        let (module, info) = validate(label, &pipeline.shader);
        translate_to_glsl(label, &module, &info);
    }
}

#[rstest]
fn test_resolve_reads_only_color_targets() {
    let engine = deferred_engine(ClusterGridConfig::default());
    let resolve = engine
        .backend()
        .pipelines()
        .iter()
        .find(|p| p.label.as_deref() == Some("Deferred Resolve"))
        .unwrap();
    let (module, _) = validate("Deferred Resolve", &resolve.shader);
    assert!(module.global_variables.iter().all(|(_, var)| {
        !matches!(
            module.types[var.ty].inner,
            naga::TypeInner::Image { class: naga::ImageClass::Depth { .. }, .. }
        )
    }));
}
