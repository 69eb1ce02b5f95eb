use thiserror::Error;

use crate::bindings::{BindCategory, ShaderStage};

/// Errors surfaced by the command/binding layer.
///
/// Transient native failures are reported, never panicked on; callers decide
/// whether to degrade (skip the effect) or retry next frame.
#[derive(Debug, Error)]
pub enum GpuError {
    /// A native object build failed; the feature using it is unavailable for
    /// this draw and the next request will retry the build.
    #[error("native {kind} creation failed")]
    NativeCreation { kind: &'static str },

    /// The pipeline (or its bound-state layout) for the current draw could
    /// not be built; the caller skips the effect and the next draw retries.
    #[error("pipeline state unavailable")]
    PipelineUnavailable,

    /// A fence poll exhausted its retry budget without completing.
    #[error("fence wait timed out: waiting for {value}, completed {completed} after {polls} polls")]
    FenceTimeout {
        value: u64,
        completed: u64,
        polls: u32,
    },

    /// Zero-byte dynamic allocations are rejected rather than rounded up.
    #[error("zero-size dynamic buffer allocation")]
    ZeroSizeAllocation,

    /// The dynamic pool could not create a backing buffer of the needed size.
    #[error("dynamic buffer pool growth failed for {size} bytes")]
    PoolGrowthFailed { size: u32 },

    /// Slot index outside the fixed per-category capacity.
    #[error("{category:?} slot {slot} out of range for {stage} stage (max {max})")]
    SlotOutOfRange {
        stage: ShaderStage,
        category: BindCategory,
        slot: u32,
        max: u32,
    },

    /// A resource id whose generation no longer matches the table entry.
    #[error("stale resource id (index {index}, generation {generation})")]
    StaleResource { index: u32, generation: u32 },

    /// A command-context entry point was called in the wrong frame state.
    #[error("invalid frame state: {operation} called while {state}")]
    InvalidFrameState {
        operation: &'static str,
        state: &'static str,
    },
}
