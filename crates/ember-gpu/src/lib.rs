//! `ember-gpu` contains the backend-independent plumbing under the Ember
//! command layer.
//!
//! Currently this crate provides:
//! - Per-stage resource-binding state with dirty-mask commit (see
//!   [`bindings::StageBindings`]).
//! - Structural-key caching of native pipeline/bound-state objects (see
//!   [`pipeline_cache::PipelineCache`]).
//! - A capacity-sorted dynamic buffer pool for immediate-mode draw data
//!   (see [`DynamicBufferPool`]).
//! - A persisted pipeline blob store with source-mtime validation (see
//!   [`blob_cache::PipelineBlobCache`]).

mod dynamic;
mod error;
mod fence;
mod handle;
mod resource;

pub mod bindings;
pub mod blob_cache;
pub mod pipeline_cache;
pub mod pipeline_key;
pub mod state_objects;
pub mod stats;

pub use dynamic::{DynamicAllocation, DynamicBufferPool, DYNAMIC_BUFFER_ALIGN};
pub use error::GpuError;
pub use fence::{FenceClock, DEFAULT_WAIT_POLLS};
pub use handle::{ResourceId, ResourceTable};
pub use resource::{
    AccessMode, BufferDesc, BufferUsage, ResourceDesc, TextureDesc, TextureKind, TextureUsage,
    UsageMode,
};
