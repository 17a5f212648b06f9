//! The per-invocation `EffectContext` (spec §3): a single struct passed by
//! reference through the pipeline rather than a shared-pointer graph of
//! managers (spec §9 "Context as a passed-in bundle").

use fxhash::FxHashSet;

use crate::capability::CapabilityNegotiator;
use crate::dispatch::ExecutionPath;
use crate::extra::DataType;
use crate::format::{ColorSpace, HdrFormat, PixelFormat};
use crate::memory::MemoryManager;

/// Metadata the context resolves for EXIF purposes (SPEC_FULL supplemented
/// feature #1, grounded on `effect_context.cpp`'s `GetExifMetadata`).
#[derive(Clone, Debug, Default)]
pub struct ExifMetadata {
    pub width: u32,
    pub height: u32,
    pub date_time: Option<String>,
}

/// Bundles every sub-manager needed for one render invocation.
pub struct EffectContext {
    pub memory: MemoryManager,
    pub capability: CapabilityNegotiator,
    pub execution_path: ExecutionPath,
    pub pipeline_format: PixelFormat,
    /// Color spaces supported by the intersection of all filters in the
    /// current chain.
    pub filters_supported_color_space: FxHashSet<ColorSpace>,
    /// HDR formats supported by the intersection of all filters.
    pub filters_supported_hdr: FxHashSet<HdrFormat>,
    exif: Option<ExifMetadata>,
}

impl EffectContext {
    pub fn new() -> Self {
        EffectContext {
            memory: MemoryManager::new(),
            capability: CapabilityNegotiator::new(),
            execution_path: ExecutionPath::Cpu,
            pipeline_format: PixelFormat::Default,
            filters_supported_color_space: FxHashSet::default(),
            filters_supported_hdr: FxHashSet::default(),
            exif: None,
        }
    }

    /// Resolves which container's EXIF metadata currently applies, based on
    /// the render strategy's registered input's data type (SPEC_FULL
    /// supplemented feature #1).
    pub fn resolve_exif_source(&mut self, input_data_type: Option<DataType>) -> Option<&ExifMetadata> {
        match input_data_type {
            Some(DataType::PixelMap) | Some(DataType::Path) | Some(DataType::Uri) | Some(DataType::Picture) => {
                self.exif.as_ref()
            }
            Some(other) => {
                log::warn!("context: data type {:?} does not carry EXIF metadata", other);
                None
            }
            None => self.exif.as_ref(),
        }
    }

    pub fn set_exif(&mut self, exif: ExifMetadata) {
        self.exif = Some(exif);
    }
}

impl Default for EffectContext {
    fn default() -> Self {
        Self::new()
    }
}
