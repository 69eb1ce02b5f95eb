//! Read/write aliasing resolution.
//!
//! A resource simultaneously visible as SRV and UAV (or bound while used as
//! a render target) is undefined on real hardware. Every usage-mode change
//! funnels through [`CommandContext::transition_resource`], which clears the
//! conflicting bindings *before* the next commit can push them; hazards are
//! prevented structurally, not detected after the fact.

use ember_gpu::{ResourceId, UsageMode};

use crate::backend::{NativeContext, NativeDevice};
use crate::context::CommandContext;

impl<D: NativeDevice, C: NativeContext> CommandContext<D, C> {
    /// Move a resource to `to_mode`.
    ///
    /// Same-mode transitions are a no-op fast path. Otherwise this walks the
    /// resource's own bind-slot list (O of the slots bound to this resource)
    /// and clears every slot whose view kind conflicts with the new mode, then
    /// enqueues the native barrier. Only binding state is mutated here; the
    /// unbinds reach the driver at the next commit.
    pub fn transition_resource(&mut self, id: ResourceId, to_mode: UsageMode) {
        let (from, slots) = {
            let info = self.bound_entry(id);
            if info.mode == to_mode {
                return;
            }
            let from = info.mode;
            info.mode = to_mode;
            (from, std::mem::take(&mut info.slots))
        };

        let mut kept = Vec::with_capacity(slots.len());
        for slot_ref in slots {
            let conflicts = if slot_ref.is_uav {
                to_mode.conflicts_with_uav()
            } else {
                to_mode.conflicts_with_srv()
            };

            if !conflicts {
                kept.push(slot_ref);
                continue;
            }

            let change = if slot_ref.is_uav {
                self.stage_mut(slot_ref.stage).clear_uav_at(slot_ref.slot)
            } else {
                self.stage_mut(slot_ref.stage).clear_srv_at(slot_ref.slot)
            };
            // The slot list never references a cleared slot, so the clear
            // must observe a live binding.
            debug_assert!(change.changed);
            self.system().stats().inc_hazard_unbinds();
        }

        self.bound_entry(id).slots = kept;
        self.push_barrier(id, from, to_mode);
    }

    /// Remove every binding of a resource across all stages, e.g. before the
    /// resource is destroyed. Slots are cleared (marked dirty), the slot list
    /// dropped; no barrier is issued.
    pub fn clear_resource_bindings(&mut self, id: ResourceId) {
        let Some(info) = self.take_bound_info(id) else {
            return;
        };
        for slot_ref in info.slots {
            if slot_ref.is_uav {
                self.stage_mut(slot_ref.stage).clear_uav_at(slot_ref.slot);
            } else {
                self.stage_mut(slot_ref.stage).clear_srv_at(slot_ref.slot);
            }
        }
    }

    /// Wholesale SRV clear across all stages, scanning each stage's slot
    /// watermark rather than per-resource lists. The native unbinds are
    /// issued immediately, one call per stage.
    pub fn clear_all_shader_resources(&mut self) {
        for stage in ember_gpu::bindings::ShaderStage::ALL {
            if let Some(count) = self.stage_mut(stage).clear_all_srvs() {
                self.unbind_srvs_now(stage, count);
            }
        }
        self.forget_srv_slot_refs();
    }
}
