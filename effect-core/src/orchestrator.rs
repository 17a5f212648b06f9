//! C11: the pipeline orchestrator, grounded on `ImageEffect::Render` in
//! `image_effect_inner.cpp` (`Render`/`Start`/`Stop`). Wires the source
//! filter, the filter graph + per-filter dispatch, the sink filter, and the
//! context's sub-managers (capability, memory, colorspace, strategy) into
//! a single synchronous render call.

use log::{info, warn};

use crate::capability::{Capability, RunningType};
use crate::colorspace::ColorSpaceManager;
use crate::config::EngineConfig;
use crate::context::EffectContext;
use crate::dispatch::{ExecutionPath, FilterDispatch};
use crate::effect_buffer::EffectBuffer;
use crate::error::{EffectError, Result};
use crate::graph::{priority_insert_position, FilterGraph};
use crate::memory::AllocInfo;
use crate::sink::{now_exif_timestamp, SinkFilter};
use crate::source::SourceFilter;
use crate::strategy::{NegotiatedSize, RenderStrategy, StrategyOutcome};

/// Filter names inserted via `AddEFilter` rather than explicitly positioned
/// are reordered ahead of non-priority filters (spec §4.11, `Crop`).
const PRIORITY_FILTER_NAMES: &[&str] = &["Crop"];

/// One user-registered filter: its place in the linear graph plus the
/// dispatch table and advertised capability it was constructed with.
struct InstalledFilter {
    dispatch: FilterDispatch,
    capability: Capability,
}

/// The complete render pipeline: source → N filters → sink, plus the
/// context bundle threaded through every stage (spec §3, §9 "context as a
/// passed-in bundle" rather than a shared-pointer graph of managers).
pub struct EffectPipeline {
    source: SourceFilter,
    graph: FilterGraph,
    filters: Vec<InstalledFilter>,
    pub context: EffectContext,
    pub config: EngineConfig,
}

impl EffectPipeline {
    pub fn new() -> Self {
        EffectPipeline {
            source: SourceFilter::new(),
            graph: FilterGraph::new(),
            filters: Vec::new(),
            context: EffectContext::new(),
            config: EngineConfig::default(),
        }
    }

    pub fn set_source(&mut self, buffer: EffectBuffer) {
        self.source.set_source(buffer);
    }

    /// `AddEFilter`: appends a filter, moving it ahead of trailing
    /// non-priority filters if its name is a priority filter (spec §4.11).
    pub fn add_filter(&mut self, name: impl Into<String>, dispatch: FilterDispatch, capability: Capability) {
        let name = name.into();
        let at = if PRIORITY_FILTER_NAMES.contains(&name.as_str()) {
            priority_insert_position(&self.graph, PRIORITY_FILTER_NAMES)
        } else {
            self.graph.len()
        };
        self.graph.insert(at, name).expect("insert position is always in range");
        self.filters.insert(at, InstalledFilter { dispatch, capability });
    }

    pub fn remove_filter(&mut self, name: &str) -> Result<()> {
        let pos = self
            .graph
            .position_of(name)
            .ok_or_else(|| EffectError::InvalidFilter(name.to_string()))?;
        self.graph.remove_by_name(name)?;
        self.filters.remove(pos);
        Ok(())
    }

    /// `InsertEFilter`: places a filter at an explicit position rather than
    /// appending (spec §4.11). Priority reordering only applies to
    /// `AddEFilter`'s append path, so the requested position is honored
    /// exactly here.
    pub fn insert_filter(
        &mut self,
        at: usize,
        name: impl Into<String>,
        dispatch: FilterDispatch,
        capability: Capability,
    ) -> Result<()> {
        self.graph.insert(at, name)?;
        self.filters.insert(at, InstalledFilter { dispatch, capability });
        Ok(())
    }

    /// `ReplaceEFilter`: swaps the filter named `name` for a new dispatch
    /// table, capability and (possibly new) name, in place (spec §4.11).
    pub fn replace_filter(
        &mut self,
        name: &str,
        new_name: impl Into<String>,
        dispatch: FilterDispatch,
        capability: Capability,
    ) -> Result<()> {
        let pos = self
            .graph
            .position_of(name)
            .ok_or_else(|| EffectError::InvalidFilter(name.to_string()))?;
        self.graph.replace(name, new_name)?;
        self.filters[pos] = InstalledFilter { dispatch, capability };
        Ok(())
    }

    pub fn filter_names(&self) -> Vec<&str> {
        self.graph.names()
    }

    /// `Render`: runs the full pipeline against the configured source/dst,
    /// returning the final buffer (`Start` additionally calls this then
    /// tears the context down; this method is the reusable core).
    pub fn render(&mut self, mut dst: Option<EffectBuffer>) -> Result<EffectBuffer> {
        if self.filters.is_empty() {
            warn!("orchestrator: render invoked with no efilters installed");
            return Err(EffectError::InvalidOperation("no efilters in pipeline".into()));
        }

        self.context.capability.clear_negotiate_result();
        for f in &self.filters {
            self.context.capability.add_capability(f.capability.clone());
        }

        let initial_format = self.context.capability.negotiate_format();
        let (path, format) = self
            .context
            .capability
            .negotiate_execution_path(self.config.running_type, initial_format);
        self.context.execution_path = path;
        self.context.pipeline_format = format;
        self.context.memory.set_execution_path(path);
        // Every installed filter has now registered its `Capability`, so the
        // color-space/HDR-format sets they jointly support can be derived
        // before the color-space manager needs them below (spec §3, §4.3
        // step 3, §4.3 step 5).
        self.context.filters_supported_color_space = self.context.capability.negotiate_color_spaces();
        self.context.filters_supported_hdr = self.context.capability.negotiate_hdr_formats();
        info!("orchestrator: negotiated execution path {:?}, format {:?}", path, format);

        let mut current = self.source.start(path, &mut self.context.memory)?;
        self.context.memory.init(&current, dst.as_ref());

        // Spec §4.3 step 2 precedes step 3: normalize the source into its
        // target-map color space (e.g. AdobeRgb -> DisplayP3) before the
        // pipeline-wide choice runs. Without this, a color space whose
        // target map entry differs from itself (AdobeRgb) would be handed to
        // `resolve` pre-conversion, where it is supported by neither the
        // filter-declared set nor the defaults nor the HDR fallback table.
        let source_color_space = current.info.color_space;
        let applied = ColorSpaceManager::new().apply_color_space(&mut current, source_color_space);
        if applied.converted {
            info!(
                "orchestrator: converted source color space {:?} -> {:?} before negotiation",
                source_color_space, applied.chosen
            );
        }

        let resolved = {
            let mut colorspace = ColorSpaceManager::new();
            colorspace.init(&current, dst.as_ref());
            colorspace.resolve(
                &self.context.filters_supported_color_space,
                current.info.color_space,
                &self.context.filters_supported_hdr,
                current.info.hdr_format,
            )?
        };

        let negotiated = NegotiatedSize {
            width: current.info.width,
            height: current.info.height,
        };

        for (idx, installed) in self.filters.iter().enumerate() {
            let alloc = AllocInfo {
                width: negotiated.width,
                height: negotiated.height,
                row_stride: current.info.row_stride,
                format,
                color_space: current.info.color_space,
                backing: current.info.backing,
            };
            let record = self.context.memory.alloc(current.addr(), &alloc);
            let mut candidate = current.clone();
            candidate.info = record.info;

            let outcome = {
                let strategy = {
                    let mut s = RenderStrategy::new();
                    s.init(&current, dst.as_ref());
                    s
                };
                strategy.choose_best_output(&candidate.info, negotiated)
            };
            match outcome {
                StrategyOutcome::UseBuffer(info) => candidate.info = info.clone(),
                StrategyOutcome::NoChangeNeeded => {
                    candidate.info = dst.as_ref().expect("dst present when NoChangeNeeded").info.clone()
                }
                StrategyOutcome::AllocateScratch => {}
            }

            installed.dispatch.render(path, &current, &mut candidate)?;
            info!("orchestrator: filter[{}] '{}' rendered", idx, installed.dispatch.filter_name);
            current = candidate;
        }

        if resolved.decompose_hdr {
            ColorSpaceManager::new().decompose_hdr(&mut current, resolved.output)?;
        }

        let source_data_type = self.source.buffer().map(|b| b.extra.data_type);
        let exif = self.context.resolve_exif_source(source_data_type).cloned();

        if let Some(dst) = dst.as_mut() {
            let mut exif = exif;
            SinkFilter::materialize(&current, dst, exif.as_mut(), now_exif_timestamp)?;
            if let Some(exif) = exif {
                self.context.set_exif(exif);
            }
            self.context.memory.deinit();
            Ok(dst.clone())
        } else {
            if let Some(mut exif) = exif {
                SinkFilter::update_exif(&mut exif, &current.info, now_exif_timestamp);
                self.context.set_exif(exif);
            }
            self.context.memory.deinit();
            Ok(current)
        }
    }

    /// Seeds the context's EXIF metadata (e.g. decoded from the source
    /// container by an external collaborator) so `render` has something to
    /// update on the output path (spec §4.10 "EXIF update on output").
    pub fn set_exif(&mut self, exif: crate::context::ExifMetadata) {
        self.context.set_exif(exif);
    }

    /// `Start` followed by `Stop`: renders once then clears all memory
    /// (spec §4.8/§4.10 "invocation is one-shot for still images").
    pub fn start(&mut self, dst: Option<EffectBuffer>) -> Result<EffectBuffer> {
        let result = self.render(dst);
        self.stop();
        result
    }

    pub fn stop(&mut self) {
        self.context.memory.clear_memory();
    }
}

impl Default for EffectPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferInfo;
    use crate::dispatch::{ExecutionHandler, PixelAlgorithm};
    use crate::extra::{ContainerRef, DataType, ExtraInfo};
    use crate::format::{BackingKind, ColorSpace, HdrFormat, PixelFormat};

    struct Identity;
    impl PixelAlgorithm for Identity {
        fn apply_rgba8888(&self, src: &EffectBuffer, dst: &mut EffectBuffer) -> Result<()> {
            dst.info.color_space = src.info.color_space;
            Ok(())
        }
    }

    fn cpu_dispatch(name: &str) -> FilterDispatch {
        FilterDispatch::new(
            name,
            vec![ExecutionHandler {
                path: ExecutionPath::Cpu,
                supported_formats: smallvec::smallvec![PixelFormat::Rgba8888],
                algorithm: Box::new(Identity),
            }],
        )
    }

    fn cap(name: &str) -> Capability {
        Capability::new(name).supports(PixelFormat::Rgba8888, &[ExecutionPath::Cpu])
    }

    fn src_buffer() -> EffectBuffer {
        let mut info = BufferInfo::new(4, 4, 16, PixelFormat::Rgba8888, ColorSpace::Srgb, HdrFormat::Sdr, BackingKind::Heap);
        info.raw_addr = Some(0x1000);
        EffectBuffer::new(info, ExtraInfo::new(DataType::PixelMap, ContainerRef::None))
    }

    /// AdobeRgb is conversion-needed (spec §4.3 step 1) but supported by
    /// neither filter-declared capability nor the HDR fallback table, so it
    /// must be converted to its target-map entry (DisplayP3) before the
    /// pipeline-wide color-space choice runs, or the render fails outright.
    #[test]
    fn adobe_rgb_source_converts_before_colorspace_choice() {
        let mut pipeline = EffectPipeline::new();
        let mut src = src_buffer();
        src.info.color_space = ColorSpace::AdobeRgb;
        pipeline.set_source(src);
        pipeline.add_filter("brightness", cpu_dispatch("brightness"), cap("brightness"));
        let out = pipeline.start(None).unwrap();
        assert_eq!(out.info.color_space, ColorSpace::DisplayP3);
    }

    #[test]
    fn render_without_filters_errors() {
        let mut pipeline = EffectPipeline::new();
        pipeline.set_source(src_buffer());
        let err = pipeline.render(None);
        assert!(matches!(err, Err(EffectError::InvalidOperation(_))));
    }

    #[test]
    fn single_filter_renders_in_place_without_dst() {
        let mut pipeline = EffectPipeline::new();
        pipeline.set_source(src_buffer());
        pipeline.add_filter("brightness", cpu_dispatch("brightness"), cap("brightness"));
        let out = pipeline.render(None).unwrap();
        assert_eq!(out.info.format, PixelFormat::Rgba8888);
    }

    #[test]
    fn priority_filter_is_reordered_first() {
        let mut pipeline = EffectPipeline::new();
        pipeline.add_filter("brightness", cpu_dispatch("brightness"), cap("brightness"));
        pipeline.add_filter("Crop", cpu_dispatch("Crop"), cap("Crop"));
        assert_eq!(pipeline.filter_names(), vec!["Crop", "brightness"]);
    }

    #[test]
    fn start_clears_memory_after_render() {
        let mut pipeline = EffectPipeline::new();
        pipeline.set_source(src_buffer());
        pipeline.add_filter("brightness", cpu_dispatch("brightness"), cap("brightness"));
        pipeline.start(None).unwrap();
        assert!(pipeline.context.memory.records().is_empty());
    }

    #[test]
    fn insert_filter_places_at_explicit_position() {
        let mut pipeline = EffectPipeline::new();
        pipeline.add_filter("brightness", cpu_dispatch("brightness"), cap("brightness"));
        pipeline.add_filter("contrast", cpu_dispatch("contrast"), cap("contrast"));
        pipeline
            .insert_filter(1, "crop", cpu_dispatch("crop"), cap("crop"))
            .unwrap();
        assert_eq!(pipeline.filter_names(), vec!["brightness", "crop", "contrast"]);
    }

    #[test]
    fn replace_filter_swaps_dispatch_in_place() {
        let mut pipeline = EffectPipeline::new();
        pipeline.set_source(src_buffer());
        pipeline.add_filter("brightness", cpu_dispatch("brightness"), cap("brightness"));
        pipeline.add_filter("contrast", cpu_dispatch("contrast"), cap("contrast"));
        pipeline
            .replace_filter("brightness", "sharpen", cpu_dispatch("sharpen"), cap("sharpen"))
            .unwrap();
        assert_eq!(pipeline.filter_names(), vec!["sharpen", "contrast"]);
        assert!(pipeline.render(None).is_ok());
    }

    #[test]
    fn replace_filter_unknown_name_errors() {
        let mut pipeline = EffectPipeline::new();
        pipeline.add_filter("brightness", cpu_dispatch("brightness"), cap("brightness"));
        let err = pipeline.replace_filter("missing", "x", cpu_dispatch("x"), cap("x"));
        assert!(matches!(err, Err(EffectError::InvalidFilter(_))));
    }
}
