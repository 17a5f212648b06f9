//! Render pipeline core for the image effect engine.
//!
//! A pipeline is a linear chain: a [`source::SourceFilter`] materializes the
//! caller's input, a sequence of user-registered filters run in order
//! through [`dispatch::FilterDispatch`], and a [`sink::SinkFilter`]
//! materializes the final buffer back into the caller's requested
//! container. [`orchestrator::EffectPipeline`] wires all of this together
//! with the supporting managers: [`memory::MemoryManager`],
//! [`colorspace::ColorSpaceManager`], [`strategy::RenderStrategy`] and
//! [`capability::CapabilityNegotiator`], bundled per-invocation into
//! [`context::EffectContext`].

pub mod buffer;
pub mod capability;
pub mod colorspace;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod effect_buffer;
pub mod error;
pub mod extra;
pub mod format;
pub mod graph;
pub mod json;
pub mod memory;
pub mod orchestrator;
pub mod sink;
pub mod source;
pub mod strategy;

pub use buffer::{BufferInfo, NativeHandle};
pub use capability::{Capability, CapabilityNegotiator, RunningType};
pub use colorspace::ColorSpaceManager;
pub use config::{ConfigureValue, EngineConfig};
pub use context::{EffectContext, ExifMetadata};
pub use dispatch::{ExecutionHandler, ExecutionPath, FilterDispatch, FilterFactory, PixelAlgorithm};
pub use effect_buffer::EffectBuffer;
pub use error::{EffectError, ErrorKind, Result};
pub use extra::{ContainerRef, DataType, ExtraInfo};
pub use format::{BackingKind, ColorSpace, HdrFormat, HdrMetadataType, PixelFormat, PixelMapRole};
pub use graph::{FilterGraph, FilterIndex, FilterState, PortId};
pub use json::{FilterEntry, PipelineDocument};
pub use memory::{AllocInfo, MemDataType, MemoryManager, MemoryRecord};
pub use orchestrator::EffectPipeline;
pub use sink::{now_exif_timestamp, MaterializePlan, SinkFilter};
pub use source::SourceFilter;
pub use strategy::{NegotiatedSize, RenderStrategy, StrategyOutcome};
