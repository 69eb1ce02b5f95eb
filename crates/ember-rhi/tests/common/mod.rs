#![allow(dead_code)]

use std::sync::Arc;

use ember_gpu::bindings::{ShaderId, ShaderParam, ShaderStage};
use ember_gpu::pipeline_key::{GraphicsStateDesc, PrimitiveTopology, ShaderBoundStateKey};
use ember_gpu::state_objects::{
    BlendDesc, ColorFormat, DepthStencilDesc, InputLayoutDesc, RasterizerDesc,
    RenderTargetFormatsDesc,
};
use ember_gpu::{ResourceId, TextureKind, TextureUsage};
use ember_rhi::null::{NullDevice, RecordingContext};
use ember_rhi::{CommandContext, RhiSystem};

pub type TestContext = CommandContext<NullDevice, RecordingContext>;

pub fn test_system() -> Arc<RhiSystem<NullDevice>> {
    RhiSystem::new(NullDevice::new())
}

pub fn test_context() -> TestContext {
    CommandContext::new(test_system(), RecordingContext::new())
}

pub fn simple_graphics_state(system: &Arc<RhiSystem<NullDevice>>) -> GraphicsStateDesc {
    GraphicsStateDesc {
        shaders: ShaderBoundStateKey::graphics(ShaderId(1), Some(ShaderId(2))),
        input_layout: system.intern_input_layout(&InputLayoutDesc::default()),
        rasterizer: system.intern_rasterizer(&RasterizerDesc::default()),
        blend: system.intern_blend(&BlendDesc::default()),
        depth_stencil: system.intern_depth_stencil(&DepthStencilDesc::default()),
        rt_formats: system.intern_rt_formats(&RenderTargetFormatsDesc {
            colors: vec![ColorFormat::Bgra8Unorm],
            depth: None,
        }),
        topology: PrimitiveTopology::TriangleList,
    }
}

pub fn sampled_texture(system: &Arc<RhiSystem<NullDevice>>) -> ResourceId {
    system
        .create_texture(
            TextureKind::D2 {
                width: 64,
                height: 64,
            },
            TextureUsage::SHADER_RESOURCE,
        )
        .unwrap()
}

pub fn storage_texture(system: &Arc<RhiSystem<NullDevice>>) -> ResourceId {
    system
        .create_texture(
            TextureKind::D2 {
                width: 64,
                height: 64,
            },
            TextureUsage::SHADER_RESOURCE | TextureUsage::UNORDERED_ACCESS,
        )
        .unwrap()
}

pub fn pixel(slot: u32) -> ShaderParam {
    ShaderParam {
        stage: ShaderStage::Pixel,
        slot,
    }
}

pub fn vertex(slot: u32) -> ShaderParam {
    ShaderParam {
        stage: ShaderStage::Vertex,
        slot,
    }
}

pub fn compute(slot: u32) -> ShaderParam {
    ShaderParam {
        stage: ShaderStage::Compute,
        slot,
    }
}

/// Route layer warnings to the test output when `--nocapture` is used.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Begin a frame, enter the render pass, set a pipeline, and flush the
/// initial recommit-everything state so tests assert only their own calls.
pub fn start_rendering(ctx: &mut TestContext) {
    init_tracing();
    ctx.begin_frame().unwrap();
    ctx.begin_render().unwrap();
    let desc = simple_graphics_state(&ctx.system().clone());
    ctx.set_graphics_state(desc);
    ctx.commit_shader_state().unwrap();
    ctx.native_mut().take_calls();
}
