//! Deviceless backend that records the native call stream.
//!
//! Stands in for a driver in tests and headless runs: every call the layer
//! would issue is appended to a log that assertions can inspect call-by-call,
//! and object creation mints fresh opaque handles (optionally failing on
//! demand to exercise degrade paths).

use ember_gpu::bindings::{
    BindSink, BufferHandle, LayoutHandle, PipelineHandle, SamplerHandle, ShaderId, ShaderStage,
    SrvHandle, UavHandle,
};
use ember_gpu::pipeline_key::{GraphicsStateDesc, ShaderBoundStateKey};
use ember_gpu::state_objects::SamplerDesc;
use ember_gpu::{
    BufferDesc, BufferUsage, ResourceId, TextureDesc, TextureKind, TextureUsage, UsageMode,
};

use crate::backend::{DeviceCaps, IndexFormat, NativeContext, NativeDevice};

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    SetConstantBuffers {
        stage: ShaderStage,
        first: u32,
        buffers: Vec<Option<BufferHandle>>,
    },
    SetShaderResources {
        stage: ShaderStage,
        first: u32,
        views: Vec<Option<SrvHandle>>,
    },
    SetUnorderedViews {
        stage: ShaderStage,
        first: u32,
        views: Vec<Option<UavHandle>>,
    },
    SetSamplers {
        stage: ShaderStage,
        first: u32,
        samplers: Vec<Option<SamplerHandle>>,
    },
    UpdateBuffer {
        buffer: BufferHandle,
        bytes: Vec<u8>,
    },
    SetPipeline(PipelineHandle),
    SetVertexStream {
        slot: u32,
        buffer: BufferHandle,
        stride: u32,
        offset: u32,
    },
    SetIndexBuffer {
        buffer: Option<BufferHandle>,
        format: IndexFormat,
    },
    Barrier {
        resource: ResourceId,
        from: UsageMode,
        to: UsageMode,
    },
    Draw {
        start_vertex: u32,
        vertex_count: u32,
    },
    DrawIndexed {
        start_index: u32,
        index_count: u32,
        base_vertex: i32,
    },
    Dispatch {
        groups: (u32, u32, u32),
    },
    SignalFence(u64),
}

/// Recording implementation of [`NativeContext`].
#[derive(Debug, Default)]
pub struct RecordingContext {
    pub calls: Vec<NativeCall>,
    completed_fence: u64,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the recorded call log.
    pub fn take_calls(&mut self) -> Vec<NativeCall> {
        std::mem::take(&mut self.calls)
    }

    /// Pretend the GPU finished work up to `value`.
    pub fn complete_fence_to(&mut self, value: u64) {
        self.completed_fence = self.completed_fence.max(value);
    }

    pub fn srv_calls(&self) -> Vec<&NativeCall> {
        self.calls
            .iter()
            .filter(|call| matches!(call, NativeCall::SetShaderResources { .. }))
            .collect()
    }

    pub fn bind_call_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    NativeCall::SetConstantBuffers { .. }
                        | NativeCall::SetShaderResources { .. }
                        | NativeCall::SetUnorderedViews { .. }
                        | NativeCall::SetSamplers { .. }
                        | NativeCall::UpdateBuffer { .. }
                )
            })
            .count()
    }
}

impl BindSink for RecordingContext {
    fn set_constant_buffers(
        &mut self,
        stage: ShaderStage,
        first: u32,
        buffers: &[Option<BufferHandle>],
    ) {
        self.calls.push(NativeCall::SetConstantBuffers {
            stage,
            first,
            buffers: buffers.to_vec(),
        });
    }

    fn set_shader_resources(&mut self, stage: ShaderStage, first: u32, views: &[Option<SrvHandle>]) {
        self.calls.push(NativeCall::SetShaderResources {
            stage,
            first,
            views: views.to_vec(),
        });
    }

    fn set_unordered_views(&mut self, stage: ShaderStage, first: u32, views: &[Option<UavHandle>]) {
        self.calls.push(NativeCall::SetUnorderedViews {
            stage,
            first,
            views: views.to_vec(),
        });
    }

    fn set_samplers(&mut self, stage: ShaderStage, first: u32, samplers: &[Option<SamplerHandle>]) {
        self.calls.push(NativeCall::SetSamplers {
            stage,
            first,
            samplers: samplers.to_vec(),
        });
    }

    fn update_buffer(&mut self, buffer: BufferHandle, bytes: &[u8]) {
        self.calls.push(NativeCall::UpdateBuffer {
            buffer,
            bytes: bytes.to_vec(),
        });
    }
}

impl NativeContext for RecordingContext {
    fn set_pipeline(&mut self, pipeline: PipelineHandle) {
        self.calls.push(NativeCall::SetPipeline(pipeline));
    }

    fn set_vertex_stream(&mut self, slot: u32, buffer: BufferHandle, stride: u32, offset: u32) {
        self.calls.push(NativeCall::SetVertexStream {
            slot,
            buffer,
            stride,
            offset,
        });
    }

    fn set_index_buffer(&mut self, buffer: Option<BufferHandle>, format: IndexFormat) {
        self.calls.push(NativeCall::SetIndexBuffer { buffer, format });
    }

    fn resource_barrier(&mut self, resource: ResourceId, from: UsageMode, to: UsageMode) {
        self.calls.push(NativeCall::Barrier { resource, from, to });
    }

    fn draw(&mut self, start_vertex: u32, vertex_count: u32) {
        self.calls.push(NativeCall::Draw {
            start_vertex,
            vertex_count,
        });
    }

    fn draw_indexed(&mut self, start_index: u32, index_count: u32, base_vertex: i32) {
        self.calls.push(NativeCall::DrawIndexed {
            start_index,
            index_count,
            base_vertex,
        });
    }

    fn dispatch(&mut self, groups_x: u32, groups_y: u32, groups_z: u32) {
        self.calls.push(NativeCall::Dispatch {
            groups: (groups_x, groups_y, groups_z),
        });
    }

    fn signal_fence(&mut self, value: u64) {
        self.calls.push(NativeCall::SignalFence(value));
    }

    fn completed_fence(&mut self) -> u64 {
        self.completed_fence
    }
}

/// Handle-minting implementation of [`NativeDevice`].
#[derive(Debug)]
pub struct NullDevice {
    next_handle: u32,
    caps: DeviceCaps,
    /// When set, pipeline builds fail, exercising the no-poisoning retry
    /// path of the pipeline cache.
    pub fail_pipeline_builds: bool,
    pub pipeline_builds: u32,
    pub layout_builds: u32,
}

impl Default for NullDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl NullDevice {
    pub fn new() -> Self {
        Self {
            next_handle: 0,
            caps: DeviceCaps::default(),
            fail_pipeline_builds: false,
            pipeline_builds: 0,
            layout_builds: 0,
        }
    }

    pub fn with_caps(caps: DeviceCaps) -> Self {
        Self {
            caps,
            ..Self::new()
        }
    }

    fn mint(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl NativeDevice for NullDevice {
    fn backend_name(&self) -> &'static str {
        "null"
    }

    fn caps(&self) -> DeviceCaps {
        self.caps
    }

    fn create_buffer(&mut self, _size: u32, _usage: BufferUsage) -> Option<BufferHandle> {
        Some(BufferHandle(self.mint()))
    }

    fn create_structured_buffer(&mut self, size: u32, usage: BufferUsage) -> Option<BufferDesc> {
        let native = BufferHandle(self.mint());
        let srv = Some(SrvHandle(self.mint()));
        let uav = usage
            .contains(BufferUsage::STORAGE)
            .then(|| UavHandle(self.mint()));
        Some(BufferDesc {
            size,
            native,
            srv,
            uav,
        })
    }

    fn create_texture(&mut self, kind: TextureKind, usage: TextureUsage) -> Option<TextureDesc> {
        let srv = usage
            .contains(TextureUsage::SHADER_RESOURCE)
            .then(|| SrvHandle(self.mint()));
        let uav = usage
            .contains(TextureUsage::UNORDERED_ACCESS)
            .then(|| UavHandle(self.mint()));
        Some(TextureDesc { kind, srv, uav })
    }

    fn create_sampler(&mut self, _desc: &SamplerDesc) -> Option<SamplerHandle> {
        Some(SamplerHandle(self.mint()))
    }

    fn create_bound_layout(&mut self, _key: &ShaderBoundStateKey) -> Option<LayoutHandle> {
        self.layout_builds += 1;
        Some(LayoutHandle(self.mint()))
    }

    fn create_graphics_pipeline(
        &mut self,
        _desc: &GraphicsStateDesc,
        _layout: LayoutHandle,
    ) -> Option<PipelineHandle> {
        self.pipeline_builds += 1;
        if self.fail_pipeline_builds {
            return None;
        }
        Some(PipelineHandle(self.mint()))
    }

    fn create_compute_pipeline(
        &mut self,
        _shader: ShaderId,
        _layout: LayoutHandle,
    ) -> Option<PipelineHandle> {
        self.pipeline_builds += 1;
        if self.fail_pipeline_builds {
            return None;
        }
        Some(PipelineHandle(self.mint()))
    }
}
