//! `ember-rhi` is the command layer between scene-rendering code and a native
//! D3D11/D3D12-class driver.
//!
//! The driver is consumed through the narrow [`NativeContext`] /
//! [`NativeDevice`] traits; everything above them (per-stage binding state,
//! dirty-run commit, hazard resolution, pipeline caching, transient
//! allocation) is backend independent. A recording null backend
//! ([`null::RecordingContext`]) stands in for a device in tests.

mod context;
mod hazard;
mod system;

pub mod backend;
pub mod null;

pub use backend::{DeviceCaps, IndexFormat, NativeContext, NativeDevice};
pub use context::{CommandContext, FrameState};
pub use system::RhiSystem;
