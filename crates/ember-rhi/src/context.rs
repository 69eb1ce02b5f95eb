use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use ember_gpu::bindings::{
    BufferHandle, SamplerHandle, ShaderId, ShaderParam, ShaderStage, SrvHandle, StageBindings,
    StageMask, UavHandle, ValueParam, MAX_BOUND_SLOTS,
};
use ember_gpu::pipeline_key::GraphicsStateDesc;
use ember_gpu::stats::BindingStats;
use ember_gpu::{AccessMode, BufferUsage, DynamicBufferPool, GpuError, ResourceId, UsageMode};

use crate::backend::{IndexFormat, NativeContext, NativeDevice};
use crate::system::RhiSystem;

/// Capacity of the per-stage constant staging buffers created at context
/// init. Staged CPU storage grows past this; the native buffer does not.
const VALUE_BUFFER_CAPACITY: u32 = 4096;

/// Where the context is in its frame lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    RecordingFrame,
    Rendering,
    Presenting,
}

impl FrameState {
    pub(crate) fn name(self) -> &'static str {
        match self {
            FrameState::Idle => "idle",
            FrameState::RecordingFrame => "recording-frame",
            FrameState::Rendering => "rendering",
            FrameState::Presenting => "presenting",
        }
    }
}

/// One slot a resource is currently bound at, as recorded in its bind-slot
/// list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SlotRef {
    pub stage: ShaderStage,
    pub slot: u32,
    pub is_uav: bool,
}

/// Per-context bookkeeping for one logical resource: its current usage mode
/// and every slot it is bound at.
#[derive(Debug, Default)]
pub(crate) struct BoundResourceInfo {
    pub mode: UsageMode,
    pub slots: Vec<SlotRef>,
}

/// Records one logical command stream against a native context.
///
/// Single-threaded: one `CommandContext` is one sequentially issued native
/// stream. Multiple contexts over the same [`RhiSystem`] may record
/// concurrently and are merged only at frame-submit boundaries.
pub struct CommandContext<D: NativeDevice, C: NativeContext> {
    system: Arc<RhiSystem<D>>,
    native: C,
    frame: FrameState,

    stages: [StageBindings; ShaderStage::COUNT],
    bound: HashMap<ResourceId, BoundResourceInfo>,
    pending_barriers: Vec<(ResourceId, UsageMode, UsageMode)>,

    graphics: Option<GraphicsStateDesc>,
    graphics_dirty: bool,
    stage_mask: StageMask,
    compute_shader: Option<ShaderId>,
    compute_dirty: bool,

    dynamic_vertices: DynamicBufferPool,
    dynamic_indices: DynamicBufferPool,
}

impl<D: NativeDevice, C: NativeContext> CommandContext<D, C> {
    pub fn new(system: Arc<RhiSystem<D>>, native: C) -> Self {
        let mut stages = ShaderStage::ALL.map(StageBindings::new);
        for stage in &mut stages {
            let buffer = system.create_buffer(VALUE_BUFFER_CAPACITY, BufferUsage::CONSTANT);
            if buffer.is_none() {
                warn!(stage = %stage.stage(), "constant staging buffer creation failed");
            }
            stage.set_value_buffer(buffer);
        }

        Self {
            system,
            native,
            frame: FrameState::Idle,
            stages,
            bound: HashMap::new(),
            pending_barriers: Vec::new(),
            graphics: None,
            graphics_dirty: false,
            stage_mask: StageMask::empty(),
            compute_shader: None,
            compute_dirty: false,
            dynamic_vertices: DynamicBufferPool::new(),
            dynamic_indices: DynamicBufferPool::new(),
        }
    }

    pub fn system(&self) -> &Arc<RhiSystem<D>> {
        &self.system
    }

    pub fn frame_state(&self) -> FrameState {
        self.frame
    }

    pub fn native(&self) -> &C {
        &self.native
    }

    pub fn native_mut(&mut self) -> &mut C {
        &mut self.native
    }

    pub(crate) fn stage_mut(&mut self, stage: ShaderStage) -> &mut StageBindings {
        &mut self.stages[stage.index()]
    }

    /// The SRV currently recorded at a slot, for inspection in tests and
    /// debug overlays.
    pub fn srv_bound_at(&self, stage: ShaderStage, slot: u32) -> Option<SrvHandle> {
        self.stages[stage.index()].srv_at(slot as usize)
    }

    pub fn uav_bound_at(&self, stage: ShaderStage, slot: u32) -> Option<UavHandle> {
        self.stages[stage.index()].uav_at(slot as usize)
    }

    /// Usage mode this context last transitioned the resource to.
    pub fn resource_usage_mode(&self, id: ResourceId) -> UsageMode {
        self.bound.get(&id).map(|info| info.mode).unwrap_or_default()
    }

    /// How many slots the resource is currently bound at in this context.
    pub fn resource_bound_slot_count(&self, id: ResourceId) -> usize {
        self.bound.get(&id).map(|info| info.slots.len()).unwrap_or(0)
    }

    fn stats(&self) -> &BindingStats {
        self.system.stats()
    }

    fn require_state(
        &self,
        operation: &'static str,
        allowed: &[FrameState],
    ) -> Result<(), GpuError> {
        if allowed.contains(&self.frame) {
            return Ok(());
        }
        warn!(operation, state = self.frame.name(), "operation in wrong frame state");
        Err(GpuError::InvalidFrameState {
            operation,
            state: self.frame.name(),
        })
    }

    // -----------------------------------------------------------------
    // Frame lifecycle
    // -----------------------------------------------------------------

    /// Start recording a frame. Observes how far the GPU has progressed so
    /// dynamic-pool buffers fenced behind completed work become reusable.
    pub fn begin_frame(&mut self) -> Result<(), GpuError> {
        self.require_state("begin_frame", &[FrameState::Idle, FrameState::Presenting])?;
        let completed = self.native.completed_fence();
        self.system.complete_fence_to(completed);
        self.frame = FrameState::RecordingFrame;
        Ok(())
    }

    /// Enter the rendering phase. The entire render state is marked dirty so
    /// the first draw recommits everything; the native device may have been
    /// driven by another context since this one last drew.
    pub fn begin_render(&mut self) -> Result<(), GpuError> {
        self.require_state("begin_render", &[FrameState::RecordingFrame])?;
        self.frame = FrameState::Rendering;
        self.mark_render_state_dirty();
        Ok(())
    }

    /// Submit the recorded stream and advance the frame fence. Returns the
    /// fence value attached to this frame's work.
    pub fn end_frame(&mut self) -> Result<u64, GpuError> {
        self.require_state(
            "end_frame",
            &[FrameState::RecordingFrame, FrameState::Rendering],
        )?;
        let value = self.system.signal_frame_fence();
        self.native.signal_fence(value);
        self.frame = FrameState::Presenting;
        Ok(value)
    }

    /// Forget what the native device is assumed to have bound; every slot of
    /// every stage recommits on the next draw.
    pub fn mark_render_state_dirty(&mut self) {
        for stage in &mut self.stages {
            stage.mark_all_dirty();
        }
        self.graphics_dirty = self.graphics.is_some();
        self.compute_dirty = self.compute_shader.is_some();
    }

    /// Drop all binding bookkeeping after device loss. The system must have
    /// swapped the device (`RhiSystem::replace_device`) already; native
    /// handles recorded so far are invalid.
    pub fn reset_after_device_loss(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
        self.bound.clear();
        self.pending_barriers.clear();
        self.graphics = None;
        self.graphics_dirty = false;
        self.stage_mask = StageMask::empty();
        self.compute_shader = None;
        self.compute_dirty = false;
        self.frame = FrameState::Idle;
    }

    // -----------------------------------------------------------------
    // Pipeline state
    // -----------------------------------------------------------------

    pub fn set_graphics_state(&mut self, desc: GraphicsStateDesc) {
        if self.graphics == Some(desc) {
            return;
        }
        self.stage_mask = desc.shaders.stage_mask();
        self.graphics = Some(desc);
        self.graphics_dirty = true;
    }

    pub fn set_compute_shader(&mut self, shader: Option<ShaderId>) {
        if self.compute_shader == shader {
            return;
        }
        self.compute_shader = shader;
        self.compute_dirty = shader.is_some();
    }

    /// Grow a stage's staged-constant storage to the linked shader's needs.
    pub fn reserve_shader_values(&mut self, stage: ShaderStage, size: usize) {
        self.stages[stage.index()].reserve_value_bytes(size);
    }

    // -----------------------------------------------------------------
    // Resolved-parameter entry points
    // -----------------------------------------------------------------

    /// Bind a texture or buffer for shader reads. Missing resources or
    /// resources without an SRV degrade to a warned clear.
    pub fn set_texture(&mut self, param: ShaderParam, id: ResourceId) {
        let Some(desc) = self.system.resource(id) else {
            warn!(slot = param.slot, "set_texture on dead resource; clearing slot");
            self.clear_texture(param);
            return;
        };

        self.transition_resource(id, UsageMode::ShaderRead);

        let srv = desc.srv();
        if srv.is_none() {
            warn!(
                kind = desc.describe(),
                slot = param.slot,
                "resource has no shader-resource view; clearing slot"
            );
        }

        let owner = srv.map(|_| id);
        let change = self.stages[param.stage.index()].set_srv(param.slot, srv, owner);
        self.note_slot_change(change.changed, change.prev_owner, owner, param, false);
    }

    /// Unbind whatever SRV is at the slot. Returns whether a real change
    /// occurred.
    pub fn clear_texture(&mut self, param: ShaderParam) -> bool {
        let change = self.stages[param.stage.index()].clear_srv_at(param.slot);
        self.note_slot_change(change.changed, change.prev_owner, None, param, false);
        change.changed
    }

    /// Bind a texture for unordered access at `level`.
    ///
    /// The UAV path covers every access mode (UAV loads are legal), so the
    /// resource transitions to UnorderedAccess regardless; `access` is for
    /// backends that distinguish read-only image bindings. Mip-level view
    /// selection is the backend's concern via the native UAV itself.
    pub fn set_rw_texture(
        &mut self,
        param: ShaderParam,
        id: ResourceId,
        _level: u32,
        _access: AccessMode,
    ) {
        let Some(desc) = self.system.resource(id) else {
            warn!(slot = param.slot, "set_rw_texture on dead resource; clearing slot");
            self.clear_rw_texture(param);
            return;
        };

        self.transition_resource(id, UsageMode::UnorderedAccess);

        let uav = desc.uav();
        if uav.is_none() {
            warn!(
                kind = desc.describe(),
                slot = param.slot,
                "resource has no unordered-access view; clearing slot"
            );
        }

        let owner = uav.map(|_| id);
        let max_live = self.system.caps().max_simultaneous_uavs;
        let change = self.stages[param.stage.index()].set_uav(param.slot, uav, owner, max_live);
        self.note_slot_change(change.changed, change.prev_owner, owner, param, true);
    }

    pub fn clear_rw_texture(&mut self, param: ShaderParam) -> bool {
        let change = self.stages[param.stage.index()].clear_uav_at(param.slot);
        self.note_slot_change(change.changed, change.prev_owner, None, param, true);
        change.changed
    }

    /// Bind a structured buffer either as SRV (read-only) or UAV
    /// (write-capable), transitioning it accordingly.
    pub fn set_storage_buffer(&mut self, param: ShaderParam, id: ResourceId, access: AccessMode) {
        let Some(desc) = self.system.resource(id) else {
            warn!(slot = param.slot, "set_storage_buffer on dead resource; clearing slot");
            if access.is_write() {
                self.clear_rw_texture(param);
            } else {
                self.clear_texture(param);
            }
            return;
        };

        if access.is_write() {
            self.transition_resource(id, UsageMode::UnorderedAccess);
            let uav = desc.uav();
            if uav.is_none() {
                warn!(slot = param.slot, "buffer has no UAV; clearing slot");
            }
            let owner = uav.map(|_| id);
            let max_live = self.system.caps().max_simultaneous_uavs;
            let change = self.stages[param.stage.index()].set_uav(param.slot, uav, owner, max_live);
            self.note_slot_change(change.changed, change.prev_owner, owner, param, true);
        } else {
            self.transition_resource(id, UsageMode::ShaderRead);
            let srv = desc.srv();
            if srv.is_none() {
                warn!(slot = param.slot, "buffer has no SRV; clearing slot");
            }
            let owner = srv.map(|_| id);
            let change = self.stages[param.stage.index()].set_srv(param.slot, srv, owner);
            self.note_slot_change(change.changed, change.prev_owner, owner, param, false);
        }
    }

    /// Bind a whole buffer as a constant buffer.
    pub fn set_uniform_buffer(&mut self, param: ShaderParam, id: ResourceId) {
        let Some(desc) = self.system.buffer_desc(id) else {
            warn!(slot = param.slot, "set_uniform_buffer on non-buffer; clearing slot");
            if !self.stages[param.stage.index()].set_constant_buffer(param.slot, None) {
                self.stats().inc_redundant_binds_skipped();
            }
            return;
        };
        if !self.stages[param.stage.index()].set_constant_buffer(param.slot, Some(desc.native)) {
            self.stats().inc_redundant_binds_skipped();
        }
    }

    pub fn set_sampler(&mut self, param: ShaderParam, sampler: Option<SamplerHandle>) {
        if !self.stages[param.stage.index()].set_sampler(param.slot, sampler) {
            self.stats().inc_redundant_binds_skipped();
        }
    }

    /// Stage a constant value at its resolved byte offset.
    pub fn set_shader_value(&mut self, param: ValueParam, bytes: &[u8]) {
        debug_assert_eq!(param.size as usize, bytes.len());
        self.stages[param.stage.index()].set_shader_value(param.offset, bytes);
    }

    pub fn set_shader_value_pod<T: bytemuck::Pod>(&mut self, param: ValueParam, value: &T) {
        self.set_shader_value(param, bytemuck::bytes_of(value));
    }

    fn note_slot_change(
        &mut self,
        changed: bool,
        prev_owner: Option<ResourceId>,
        new_owner: Option<ResourceId>,
        param: ShaderParam,
        is_uav: bool,
    ) {
        if !changed {
            self.stats().inc_redundant_binds_skipped();
            return;
        }
        if let Some(prev) = prev_owner {
            self.remove_slot_ref(prev, param.stage, param.slot, is_uav);
        }
        if let Some(owner) = new_owner {
            self.add_slot_ref(owner, param.stage, param.slot, is_uav);
        }
    }

    pub(crate) fn add_slot_ref(
        &mut self,
        id: ResourceId,
        stage: ShaderStage,
        slot: u32,
        is_uav: bool,
    ) {
        let info = self.bound.entry(id).or_default();
        let slot_ref = SlotRef { stage, slot, is_uav };
        if !info.slots.contains(&slot_ref) {
            info.slots.push(slot_ref);
        }
    }

    pub(crate) fn remove_slot_ref(
        &mut self,
        id: ResourceId,
        stage: ShaderStage,
        slot: u32,
        is_uav: bool,
    ) {
        if let Some(info) = self.bound.get_mut(&id) {
            info.slots
                .retain(|s| !(s.stage == stage && s.slot == slot && s.is_uav == is_uav));
        }
    }

    pub(crate) fn bound_entry(&mut self, id: ResourceId) -> &mut BoundResourceInfo {
        self.bound.entry(id).or_default()
    }

    pub(crate) fn push_barrier(&mut self, id: ResourceId, from: UsageMode, to: UsageMode) {
        self.pending_barriers.push((id, from, to));
    }

    pub(crate) fn take_bound_info(&mut self, id: ResourceId) -> Option<BoundResourceInfo> {
        self.bound.remove(&id)
    }

    /// Drop the non-UAV entries of every slot list after a wholesale SRV
    /// clear invalidated them.
    pub(crate) fn forget_srv_slot_refs(&mut self) {
        for info in self.bound.values_mut() {
            info.slots.retain(|slot_ref| slot_ref.is_uav);
        }
        self.bound.retain(|_, info| {
            !info.slots.is_empty() || info.mode != UsageMode::Undefined
        });
    }

    /// Immediately unbind the first `count` SRV slots of a stage natively.
    /// Used by the wholesale clear, which bypasses the dirty masks.
    pub(crate) fn unbind_srvs_now(&mut self, stage: ShaderStage, count: u32) {
        const NONE: [Option<SrvHandle>; MAX_BOUND_SLOTS] = [None; MAX_BOUND_SLOTS];
        self.native
            .set_shader_resources(stage, 0, &NONE[..count as usize]);
    }

    // -----------------------------------------------------------------
    // Input assembly
    // -----------------------------------------------------------------

    pub fn set_vertex_stream(&mut self, slot: u32, buffer: BufferHandle, stride: u32, offset: u32) {
        self.native.set_vertex_stream(slot, buffer, stride, offset);
    }

    pub fn set_index_buffer(&mut self, buffer: Option<BufferHandle>, format: IndexFormat) {
        self.native.set_index_buffer(buffer, format);
    }

    // -----------------------------------------------------------------
    // Commit + draw/dispatch
    // -----------------------------------------------------------------

    fn flush_barriers(&mut self) {
        for (id, from, to) in self.pending_barriers.drain(..) {
            self.native.resource_barrier(id, from, to);
            self.system.stats().inc_barriers_issued();
        }
    }

    /// Push dirty pipeline and resource state for the graphics stages.
    ///
    /// Idempotent: calling twice with no intervening state changes issues
    /// zero native calls the second time.
    pub fn commit_shader_state(&mut self) -> Result<(), GpuError> {
        self.flush_barriers();

        if self.graphics_dirty {
            let Some(desc) = self.graphics else {
                warn!("draw without graphics state; skipping");
                return Err(GpuError::PipelineUnavailable);
            };
            let Some(bound) = self.system.bound_state_for(&desc.shaders) else {
                warn!("bound-state layout build failed; draw unavailable");
                return Err(GpuError::PipelineUnavailable);
            };
            self.stage_mask = bound.stage_mask;
            let Some(pipeline) = self.system.graphics_pipeline_for(&desc, &bound) else {
                warn!("pipeline build failed; draw unavailable");
                return Err(GpuError::PipelineUnavailable);
            };
            self.native.set_pipeline(*pipeline);
            self.graphics_dirty = false;
        }

        let mut native_calls = 0;
        for stage in [
            ShaderStage::Vertex,
            ShaderStage::Pixel,
            ShaderStage::Geometry,
            ShaderStage::Hull,
            ShaderStage::Domain,
        ] {
            if self.stage_mask.contains(stage.mask_bit()) {
                native_calls += self.stages[stage.index()].commit(&mut self.native, false);
            }
        }

        let stats = self.system.stats();
        stats.inc_commits();
        stats.add_native_set_calls(native_calls as u64);
        Ok(())
    }

    /// Compute-path commit: pipeline, then the compute stage including UAVs.
    pub fn commit_compute_state(&mut self) -> Result<(), GpuError> {
        self.flush_barriers();

        if self.compute_dirty {
            let Some(shader) = self.compute_shader else {
                warn!("dispatch without compute shader; skipping");
                return Err(GpuError::PipelineUnavailable);
            };
            let key = ember_gpu::pipeline_key::ShaderBoundStateKey::compute(shader);
            let Some(bound) = self.system.bound_state_for(&key) else {
                warn!("compute bound-state build failed; dispatch unavailable");
                return Err(GpuError::PipelineUnavailable);
            };
            let Some(pipeline) = self.system.compute_pipeline_for(shader, &bound) else {
                warn!("compute pipeline build failed; dispatch unavailable");
                return Err(GpuError::PipelineUnavailable);
            };
            self.native.set_pipeline(*pipeline);
            self.compute_dirty = false;
        } else if self.compute_shader.is_none() {
            warn!("dispatch without compute shader; skipping");
            return Err(GpuError::PipelineUnavailable);
        }

        let native_calls =
            self.stages[ShaderStage::Compute.index()].commit(&mut self.native, true);

        let stats = self.system.stats();
        stats.inc_commits();
        stats.add_native_set_calls(native_calls as u64);
        Ok(())
    }

    pub fn draw_primitive(&mut self, start_vertex: u32, vertex_count: u32) -> Result<(), GpuError> {
        self.require_state("draw_primitive", &[FrameState::Rendering])?;
        self.commit_shader_state()?;
        self.native.draw(start_vertex, vertex_count);
        self.system.stats().inc_draws();
        Ok(())
    }

    pub fn draw_indexed_primitive(
        &mut self,
        start_index: u32,
        index_count: u32,
        base_vertex: i32,
    ) -> Result<(), GpuError> {
        self.require_state("draw_indexed_primitive", &[FrameState::Rendering])?;
        self.commit_shader_state()?;
        self.native.draw_indexed(start_index, index_count, base_vertex);
        self.system.stats().inc_draws();
        Ok(())
    }

    pub fn dispatch_compute(
        &mut self,
        groups_x: u32,
        groups_y: u32,
        groups_z: u32,
    ) -> Result<(), GpuError> {
        self.require_state(
            "dispatch_compute",
            &[FrameState::RecordingFrame, FrameState::Rendering],
        )?;
        self.commit_compute_state()?;
        self.native.dispatch(groups_x, groups_y, groups_z);
        self.system.stats().inc_dispatches();
        Ok(())
    }

    // -----------------------------------------------------------------
    // Immediate-mode draws through the dynamic pools
    // -----------------------------------------------------------------

    /// Draw vertices supplied inline. The data is staged through the dynamic
    /// vertex pool; the backing buffer is fenced to this frame's submission
    /// and recycled once the GPU is done with it.
    pub fn draw_primitive_up<V: bytemuck::Pod>(&mut self, vertices: &[V]) -> Result<(), GpuError> {
        self.require_state("draw_primitive_up", &[FrameState::Rendering])?;

        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        let fence = self.system.fence_snapshot();
        let system = &self.system;
        let alloc = self.dynamic_vertices.lock(bytes.len() as u32, &fence, |size| {
            system.create_buffer(size, BufferUsage::VERTEX)
        })?;
        self.dynamic_vertices.staging_mut(&alloc).copy_from_slice(bytes);

        let upcoming = self.system.upcoming_fence_value();
        let native = &mut self.native;
        let (buffer, offset) = self
            .dynamic_vertices
            .unlock(alloc, upcoming, |handle, staged| {
                native.update_buffer(handle, staged)
            });

        self.native
            .set_vertex_stream(0, buffer, std::mem::size_of::<V>() as u32, offset);
        self.commit_shader_state()?;
        self.native.draw(0, vertices.len() as u32);
        self.system.stats().inc_draws();
        Ok(())
    }

    /// Indexed variant of [`Self::draw_primitive_up`]; indices go through
    /// their own pool.
    pub fn draw_indexed_primitive_up<V: bytemuck::Pod>(
        &mut self,
        vertices: &[V],
        indices: &[u32],
    ) -> Result<(), GpuError> {
        self.require_state("draw_indexed_primitive_up", &[FrameState::Rendering])?;

        let upcoming = self.system.upcoming_fence_value();
        let fence = self.system.fence_snapshot();

        let vertex_bytes: &[u8] = bytemuck::cast_slice(vertices);
        let system = &self.system;
        let alloc = self
            .dynamic_vertices
            .lock(vertex_bytes.len() as u32, &fence, |size| {
                system.create_buffer(size, BufferUsage::VERTEX)
            })?;
        self.dynamic_vertices
            .staging_mut(&alloc)
            .copy_from_slice(vertex_bytes);
        let native = &mut self.native;
        let (vertex_buffer, vertex_offset) =
            self.dynamic_vertices.unlock(alloc, upcoming, |handle, staged| {
                native.update_buffer(handle, staged)
            });

        let index_bytes: &[u8] = bytemuck::cast_slice(indices);
        let alloc = self
            .dynamic_indices
            .lock(index_bytes.len() as u32, &fence, |size| {
                system.create_buffer(size, BufferUsage::INDEX)
            })?;
        self.dynamic_indices
            .staging_mut(&alloc)
            .copy_from_slice(index_bytes);
        let native = &mut self.native;
        let (index_buffer, _) = self.dynamic_indices.unlock(alloc, upcoming, |handle, staged| {
            native.update_buffer(handle, staged)
        });

        self.native.set_vertex_stream(
            0,
            vertex_buffer,
            std::mem::size_of::<V>() as u32,
            vertex_offset,
        );
        self.native
            .set_index_buffer(Some(index_buffer), IndexFormat::Uint32);
        self.commit_shader_state()?;
        self.native.draw_indexed(0, indices.len() as u32, 0);
        self.system.stats().inc_draws();
        Ok(())
    }

    /// Transition render-target resources out of any readable/writable
    /// binding before the pass samples from stale views. The actual target
    /// plumbing (swapchain, views) is outside this layer.
    pub fn bind_render_targets(&mut self, colors: &[ResourceId], depth: Option<ResourceId>) {
        for &id in colors {
            self.transition_resource(id, UsageMode::RenderTarget);
        }
        if let Some(id) = depth {
            self.transition_resource(id, UsageMode::RenderTarget);
        }
    }
}
