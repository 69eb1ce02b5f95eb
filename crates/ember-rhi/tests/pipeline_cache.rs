//! Pipeline/bound-state caching through the system registry.

mod common;

use std::sync::Arc;

use common::{simple_graphics_state, start_rendering, test_context, test_system};
use ember_gpu::bindings::ShaderId;
use ember_gpu::pipeline_key::ShaderBoundStateKey;
use ember_gpu::state_objects::{BlendDesc, BlendFactor};
use ember_gpu::GpuError;
use ember_rhi::null::NativeCall;

#[test]
fn identical_state_descs_share_one_pipeline_build() {
    let system = test_system();
    let desc = simple_graphics_state(&system);

    let bound = system.bound_state_for(&desc.shaders).unwrap();
    let a = system.graphics_pipeline_for(&desc, &bound).unwrap();
    let b = system.graphics_pipeline_for(&desc, &bound).unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(system.with_device(|device| device.pipeline_builds), 1);

    let stats = system.pipeline_cache_stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.entries, 1);
}

#[test]
fn distinct_keys_build_distinct_pipelines() {
    let system = test_system();
    let desc = simple_graphics_state(&system);
    let bound = system.bound_state_for(&desc.shaders).unwrap();

    let base = system.graphics_pipeline_for(&desc, &bound).unwrap();

    let blended = ember_gpu::pipeline_key::GraphicsStateDesc {
        blend: system.intern_blend(&BlendDesc {
            enable: true,
            src_color: BlendFactor::SrcAlpha,
            dst_color: BlendFactor::InvSrcAlpha,
            ..Default::default()
        }),
        ..desc
    };
    let other = system.graphics_pipeline_for(&blended, &bound).unwrap();

    assert!(!Arc::ptr_eq(&base, &other));
    assert_ne!(*base, *other);
    assert_eq!(system.with_device(|device| device.pipeline_builds), 2);
}

#[test]
fn bound_state_layout_builds_once_per_shader_set() {
    let system = test_system();
    let key = ShaderBoundStateKey::graphics(ShaderId(1), Some(ShaderId(2)));

    let a = system.bound_state_for(&key).unwrap();
    let b = system.bound_state_for(&key).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(system.with_device(|device| device.layout_builds), 1);

    let other = system
        .bound_state_for(&ShaderBoundStateKey::graphics(ShaderId(3), None))
        .unwrap();
    assert_ne!(a.layout, other.layout);
}

#[test]
fn failed_pipeline_build_is_retried_not_poisoned() {
    let mut ctx = test_context();
    ctx.system().with_device(|device| device.fail_pipeline_builds = true);

    ctx.begin_frame().unwrap();
    ctx.begin_render().unwrap();
    let desc = simple_graphics_state(&ctx.system().clone());
    ctx.set_graphics_state(desc);

    // Build fails: the draw is skipped, nothing reaches the stream.
    let err = ctx.draw_primitive(0, 3).unwrap_err();
    assert!(matches!(err, GpuError::PipelineUnavailable));
    assert!(!ctx
        .native_mut()
        .take_calls()
        .iter()
        .any(|c| matches!(c, NativeCall::Draw { .. } | NativeCall::SetPipeline(_))));
    assert_eq!(ctx.system().pipeline_cache_stats().build_failures, 1);
    assert_eq!(ctx.system().pipeline_cache_stats().entries, 0);

    // Device recovers: the same key builds on the next draw.
    ctx.system().with_device(|device| device.fail_pipeline_builds = false);
    ctx.draw_primitive(0, 3).unwrap();
    let calls = ctx.native_mut().take_calls();
    assert!(calls.iter().any(|c| matches!(c, NativeCall::SetPipeline(_))));
    assert!(calls.iter().any(|c| matches!(c, NativeCall::Draw { .. })));
    assert_eq!(ctx.system().pipeline_cache_stats().entries, 1);
}

#[test]
fn unchanged_pipeline_is_not_rebound_between_draws() {
    let mut ctx = test_context();
    start_rendering(&mut ctx);

    ctx.draw_primitive(0, 3).unwrap();
    ctx.draw_primitive(3, 3).unwrap();

    let calls = ctx.native_mut().take_calls();
    assert!(!calls.iter().any(|c| matches!(c, NativeCall::SetPipeline(_))));
    assert_eq!(
        calls
            .iter()
            .filter(|c| matches!(c, NativeCall::Draw { .. }))
            .count(),
        2
    );
}

#[test]
fn device_loss_clears_caches_and_rebuilds() {
    let mut ctx = test_context();
    start_rendering(&mut ctx);
    assert_eq!(ctx.system().pipeline_cache_stats().entries, 1);

    ctx.system().replace_device(ember_rhi::null::NullDevice::new());
    ctx.reset_after_device_loss();
    assert_eq!(ctx.system().pipeline_cache_stats().entries, 0);

    // Recording again rebuilds the pipeline against the new device.
    ctx.begin_frame().unwrap();
    ctx.begin_render().unwrap();
    let desc = simple_graphics_state(&ctx.system().clone());
    ctx.set_graphics_state(desc);
    ctx.draw_primitive(0, 3).unwrap();
    assert!(ctx
        .native_mut()
        .take_calls()
        .iter()
        .any(|c| matches!(c, NativeCall::SetPipeline(_))));
    assert_eq!(ctx.system().pipeline_cache_stats().entries, 1);
}
