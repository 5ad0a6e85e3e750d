//! wgpu backend for the forward-pass benchmark: device context, dispatch
//! planning, buffer staging and the [`ParallelEngine`].

pub mod context;
pub mod dispatch;
pub mod engine;
pub mod staging;

pub use context::GpuContext;
pub use dispatch::DispatchPlan;
pub use engine::ParallelEngine;
