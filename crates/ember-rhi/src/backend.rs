//! The narrow seam between the command layer and a native driver.
//!
//! Everything the layer ever asks of a backend goes through these two traits:
//! ranged "set resources" calls (inherited from [`BindSink`]), draws and
//! dispatches, barriers, fence signals, and object creation. The shader stage
//! is always passed as a value and dispatched by the backend, one code path
//! for all stages.

use ember_gpu::bindings::{
    BindSink, BufferHandle, LayoutHandle, PipelineHandle, SamplerHandle, ShaderId,
};
use ember_gpu::pipeline_key::{GraphicsStateDesc, ShaderBoundStateKey};
use ember_gpu::state_objects::SamplerDesc;
use ember_gpu::{
    BufferDesc, BufferUsage, ResourceId, TextureDesc, TextureKind, TextureUsage, UsageMode,
};

/// Device limits the binding layer has to respect.
#[derive(Debug, Clone, Copy)]
pub struct DeviceCaps {
    /// Maximum simultaneously bound UAVs per stage.
    pub max_simultaneous_uavs: u32,
}

impl Default for DeviceCaps {
    fn default() -> Self {
        Self {
            max_simultaneous_uavs: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

/// One recorded native command stream.
///
/// Calls arrive already deduplicated and run-coalesced; implementations
/// translate them 1:1 into driver calls without further state tracking.
pub trait NativeContext: BindSink {
    fn set_pipeline(&mut self, pipeline: PipelineHandle);

    fn set_vertex_stream(&mut self, slot: u32, buffer: BufferHandle, stride: u32, offset: u32);

    fn set_index_buffer(&mut self, buffer: Option<BufferHandle>, format: IndexFormat);

    /// Transition a resource between usage modes. Only issued when the modes
    /// actually differ.
    fn resource_barrier(&mut self, resource: ResourceId, from: UsageMode, to: UsageMode);

    fn draw(&mut self, start_vertex: u32, vertex_count: u32);

    fn draw_indexed(&mut self, start_index: u32, index_count: u32, base_vertex: i32);

    fn dispatch(&mut self, groups_x: u32, groups_y: u32, groups_z: u32);

    /// Submit recorded work and associate it with `value`.
    fn signal_fence(&mut self, value: u64);

    /// Latest fence value the GPU has fully completed.
    fn completed_fence(&mut self) -> u64;
}

/// Native object factory. Creation failures are reported as `None`; the
/// layer logs, degrades, and retries later rather than aborting a frame.
pub trait NativeDevice {
    fn backend_name(&self) -> &'static str;

    fn caps(&self) -> DeviceCaps;

    fn create_buffer(&mut self, size: u32, usage: BufferUsage) -> Option<BufferHandle>;

    fn create_structured_buffer(&mut self, size: u32, usage: BufferUsage) -> Option<BufferDesc>;

    fn create_texture(&mut self, kind: TextureKind, usage: TextureUsage) -> Option<TextureDesc>;

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Option<SamplerHandle>;

    /// Build the root/bind layout for an attached-shader combination.
    fn create_bound_layout(&mut self, key: &ShaderBoundStateKey) -> Option<LayoutHandle>;

    fn create_graphics_pipeline(
        &mut self,
        desc: &GraphicsStateDesc,
        layout: LayoutHandle,
    ) -> Option<PipelineHandle>;

    fn create_compute_pipeline(
        &mut self,
        shader: ShaderId,
        layout: LayoutHandle,
    ) -> Option<PipelineHandle>;
}
