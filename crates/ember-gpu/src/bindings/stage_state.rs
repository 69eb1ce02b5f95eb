use tracing::warn;

use crate::bindings::{
    BindSink, BufferHandle, DirtyRuns, SamplerHandle, ShaderStage, SrvHandle, UavHandle,
};
use crate::handle::ResourceId;

/// Fixed per-category slot capacity, matching the simulated bind space of the
/// D3D11-class slot model.
pub const MAX_BOUND_SLOTS: usize = 16;

/// Result of a bind/clear on a tracked slot.
///
/// `prev_owner` is the logical resource whose view was displaced, so the
/// caller can drop the slot from that resource's bind-slot list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotChange {
    pub changed: bool,
    pub prev_owner: Option<ResourceId>,
}

impl SlotChange {
    const NONE: SlotChange = SlotChange {
        changed: false,
        prev_owner: None,
    };
}

/// Staged constant values for one stage, committed into a backing native
/// buffer at draw time.
#[derive(Debug, Default)]
struct StagedValues {
    buffer: Option<BufferHandle>,
    data: Vec<u8>,
    /// High-watermark of bytes ever written; commit uploads `data[..written]`.
    written: usize,
    dirty: bool,
}

/// Authoritative record of what is bound at one shader stage.
///
/// Every setter is a no-op when the identical native handle is already bound
/// at the slot; real changes set the category's dirty bit. [`Self::commit`]
/// pushes dirty slots to the driver as contiguous runs and clears each
/// category's mask before issuing its calls.
#[derive(Debug)]
pub struct StageBindings {
    stage: ShaderStage,

    const_buffers: [Option<BufferHandle>; MAX_BOUND_SLOTS],
    const_dirty: u32,
    values: StagedValues,

    srvs: [Option<SrvHandle>; MAX_BOUND_SLOTS],
    srv_owners: [Option<ResourceId>; MAX_BOUND_SLOTS],
    srv_dirty: u32,
    /// Highest slot holding a live SRV; bounds scan cost for clears.
    max_srv_bound: Option<usize>,

    uavs: [Option<UavHandle>; MAX_BOUND_SLOTS],
    uav_owners: [Option<ResourceId>; MAX_BOUND_SLOTS],
    uav_dirty: u32,
    uav_live: u32,

    samplers: [Option<SamplerHandle>; MAX_BOUND_SLOTS],
    sampler_dirty: u32,
}

impl StageBindings {
    pub fn new(stage: ShaderStage) -> Self {
        Self {
            stage,
            const_buffers: [None; MAX_BOUND_SLOTS],
            const_dirty: 0,
            values: StagedValues::default(),
            srvs: [None; MAX_BOUND_SLOTS],
            srv_owners: [None; MAX_BOUND_SLOTS],
            srv_dirty: 0,
            max_srv_bound: None,
            uavs: [None; MAX_BOUND_SLOTS],
            uav_owners: [None; MAX_BOUND_SLOTS],
            uav_dirty: 0,
            uav_live: 0,
            samplers: [None; MAX_BOUND_SLOTS],
            sampler_dirty: 0,
        }
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn max_srv_bound(&self) -> Option<usize> {
        self.max_srv_bound
    }

    pub fn live_uav_count(&self) -> u32 {
        self.uav_live
    }

    pub fn srv_at(&self, slot: usize) -> Option<SrvHandle> {
        self.srvs.get(slot).copied().flatten()
    }

    pub fn srv_owner_at(&self, slot: usize) -> Option<ResourceId> {
        self.srv_owners.get(slot).copied().flatten()
    }

    pub fn uav_at(&self, slot: usize) -> Option<UavHandle> {
        self.uavs.get(slot).copied().flatten()
    }

    pub fn uav_owner_at(&self, slot: usize) -> Option<ResourceId> {
        self.uav_owners.get(slot).copied().flatten()
    }

    fn slot_in_range(&self, slot: u32, what: &str) -> bool {
        if (slot as usize) < MAX_BOUND_SLOTS {
            return true;
        }
        debug_assert!(false, "{what} slot {slot} out of range");
        warn!(stage = %self.stage, slot, "{what} slot out of range; ignoring bind");
        false
    }

    /// Attach the native buffer backing this stage's staged constant values.
    pub fn set_value_buffer(&mut self, buffer: Option<BufferHandle>) {
        self.values.buffer = buffer;
    }

    pub fn value_buffer(&self) -> Option<BufferHandle> {
        self.values.buffer
    }

    /// Grow the staged-value storage to the linked shader's constant size.
    pub fn reserve_value_bytes(&mut self, size: usize) {
        if self.values.data.len() < size {
            self.values.data.resize(size, 0);
        }
    }

    /// Write a constant value at its resolved byte offset and mark the
    /// staging buffer dirty. Touches no native state.
    pub fn set_shader_value(&mut self, offset: u32, bytes: &[u8]) {
        let start = offset as usize;
        let end = start + bytes.len();
        if self.values.data.len() < end {
            self.values.data.resize(end, 0);
        }
        self.values.data[start..end].copy_from_slice(bytes);
        self.values.written = self.values.written.max(end);
        self.values.dirty = true;

        // The staging buffer itself is bound at constant slot 0; rebinding it
        // is only needed when something else displaced it.
        if let Some(buffer) = self.values.buffer {
            if self.const_buffers[0] != Some(buffer) {
                self.const_buffers[0] = Some(buffer);
                self.const_dirty |= 1;
            }
        }
    }

    pub fn set_constant_buffer(&mut self, slot: u32, buffer: Option<BufferHandle>) -> bool {
        if !self.slot_in_range(slot, "constant buffer") {
            return false;
        }
        let slot = slot as usize;
        if self.const_buffers[slot] == buffer {
            return false;
        }
        self.const_buffers[slot] = buffer;
        self.const_dirty |= 1 << slot;
        true
    }

    pub fn set_srv(
        &mut self,
        slot: u32,
        view: Option<SrvHandle>,
        owner: Option<ResourceId>,
    ) -> SlotChange {
        if !self.slot_in_range(slot, "SRV") {
            return SlotChange::NONE;
        }
        let slot = slot as usize;
        if self.srvs[slot] == view {
            return SlotChange::NONE;
        }

        let prev_owner = self.srv_owners[slot];
        self.srvs[slot] = view;
        self.srv_owners[slot] = owner;
        self.srv_dirty |= 1 << slot;

        if view.is_some() {
            if self.max_srv_bound.is_none_or(|max| max < slot) {
                self.max_srv_bound = Some(slot);
            }
        } else if self.max_srv_bound == Some(slot) {
            self.tighten_srv_watermark();
        }

        SlotChange {
            changed: true,
            prev_owner,
        }
    }

    pub fn clear_srv_at(&mut self, slot: u32) -> SlotChange {
        self.set_srv(slot, None, None)
    }

    pub fn set_uav(
        &mut self,
        slot: u32,
        view: Option<UavHandle>,
        owner: Option<ResourceId>,
        max_live: u32,
    ) -> SlotChange {
        if !self.slot_in_range(slot, "UAV") {
            return SlotChange::NONE;
        }
        let slot = slot as usize;
        if self.uavs[slot] == view {
            return SlotChange::NONE;
        }

        match (self.uavs[slot].is_some(), view.is_some()) {
            (false, true) => {
                if self.uav_live >= max_live {
                    warn!(
                        stage = %self.stage,
                        slot,
                        live = self.uav_live,
                        max = max_live,
                        "simultaneous UAV limit reached; ignoring bind"
                    );
                    return SlotChange::NONE;
                }
                self.uav_live += 1;
            }
            (true, false) => {
                debug_assert!(self.uav_live > 0);
                self.uav_live = self.uav_live.saturating_sub(1);
            }
            _ => {}
        }

        let prev_owner = self.uav_owners[slot];
        self.uavs[slot] = view;
        self.uav_owners[slot] = owner;
        self.uav_dirty |= 1 << slot;

        SlotChange {
            changed: true,
            prev_owner,
        }
    }

    pub fn clear_uav_at(&mut self, slot: u32) -> SlotChange {
        self.set_uav(slot, None, None, 0)
    }

    pub fn set_sampler(&mut self, slot: u32, sampler: Option<SamplerHandle>) -> bool {
        if !self.slot_in_range(slot, "sampler") {
            return false;
        }
        let slot = slot as usize;
        if self.samplers[slot] == sampler {
            return false;
        }
        self.samplers[slot] = sampler;
        self.sampler_dirty |= 1 << slot;
        true
    }

    fn tighten_srv_watermark(&mut self) {
        let mut max = self.max_srv_bound;
        while let Some(slot) = max {
            if self.srvs[slot].is_some() {
                break;
            }
            max = slot.checked_sub(1);
        }
        self.max_srv_bound = max;
    }

    /// Drop every SRV binding at once, returning how many leading slots the
    /// caller must unbind natively (`0..count`). Used when render targets are
    /// rebound and all readable views must go.
    pub fn clear_all_srvs(&mut self) -> Option<u32> {
        let max = self.max_srv_bound?;
        for slot in 0..=max {
            self.srvs[slot] = None;
            self.srv_owners[slot] = None;
        }
        self.srv_dirty = 0;
        self.max_srv_bound = None;
        Some(max as u32 + 1)
    }

    /// Forget everything, dirty bits included. For device-loss resets; the
    /// native side is assumed to be reset out-of-band.
    pub fn reset(&mut self) {
        let stage = self.stage;
        let buffer = self.values.buffer;
        *self = Self::new(stage);
        self.values.buffer = buffer;
    }

    /// Mark every slot of every category dirty so the next commit re-pushes
    /// the entire stage state, unbinding whatever another context left behind.
    pub fn mark_all_dirty(&mut self) {
        let full = (1u32 << MAX_BOUND_SLOTS) - 1;
        self.const_dirty = full;
        self.srv_dirty = full;
        self.uav_dirty = full;
        self.sampler_dirty = full;
        self.values.dirty = self.values.written > 0;
    }

    /// Push dirty state to the driver: staged values, then constant buffers,
    /// SRVs, UAVs (compute only), samplers. Each category's mask is taken and
    /// cleared before its calls are issued, so a second commit with no
    /// intervening changes is free.
    ///
    /// Returns the number of native calls issued.
    pub fn commit(&mut self, sink: &mut dyn BindSink, include_uavs: bool) -> usize {
        let mut issued = 0;

        if self.values.dirty {
            self.values.dirty = false;
            if let Some(buffer) = self.values.buffer {
                sink.update_buffer(buffer, &self.values.data[..self.values.written]);
                issued += 1;
            }
        }

        let mask = std::mem::take(&mut self.const_dirty);
        for (first, count) in DirtyRuns::new(mask) {
            let range = first as usize..(first + count) as usize;
            sink.set_constant_buffers(self.stage, first, &self.const_buffers[range]);
            issued += 1;
        }

        let mask = std::mem::take(&mut self.srv_dirty);
        for (first, count) in DirtyRuns::new(mask) {
            let range = first as usize..(first + count) as usize;
            sink.set_shader_resources(self.stage, first, &self.srvs[range]);
            issued += 1;
        }

        if include_uavs {
            let mask = std::mem::take(&mut self.uav_dirty);
            for (first, count) in DirtyRuns::new(mask) {
                let range = first as usize..(first + count) as usize;
                sink.set_unordered_views(self.stage, first, &self.uavs[range]);
                issued += 1;
            }
        }

        let mask = std::mem::take(&mut self.sampler_dirty);
        for (first, count) in DirtyRuns::new(mask) {
            let range = first as usize..(first + count) as usize;
            sink.set_samplers(self.stage, first, &self.samplers[range]);
            issued += 1;
        }

        issued
    }
}
