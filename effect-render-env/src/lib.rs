//! The render environment: the dedicated render thread, its bounded FIFO
//! task queue, and the FIFO texture cache that backs GPU execution.

pub mod env;
pub mod render_thread;
pub mod task;
pub mod texture_cache;

pub use env::{CpuRenderEnvironment, RenderEnvironment};
pub use render_thread::RenderThread;
pub use task::RenderTask;
pub use texture_cache::TextureCache;
