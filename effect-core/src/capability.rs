//! C4: capability negotiation (spec §4.4), grounded on
//! `frameworks/native/effect/pipeline/core/capability_negotiate.cpp`.

use std::collections::HashMap;

use fxhash::FxHashSet;
use log::debug;
use smallvec::SmallVec;

use crate::dispatch::{ExecutionPath, ExecutionPaths};
use crate::format::{ColorSpace, HdrFormat, PixelFormat};

/// What one filter advertises during negotiation: for each pixel format it
/// can handle, the set of execution paths it supports, plus its preferred
/// output size (spec §3 "Capability"). The execution-path set is
/// `ExecutionPaths` (a `bitflags!` set over the two-member `ExecutionPath`
/// enum) rather than a hash set — the natural representation for "CPU
/// and/or GPU", matching the teacher's own flag-set usage.
///
/// `color_spaces`/`hdr_formats` are the color-space/HDR-format counterpart
/// of `formats`: a filter that cares which color spaces or HDR
/// representations it receives declares them here, and
/// [`CapabilityNegotiator::negotiate_color_spaces`]/
/// [`CapabilityNegotiator::negotiate_hdr_formats`] intersect the declarations
/// across the chain (spec §3 "set of color spaces/HDR formats supported by
/// all filters", §4.3 step 3). A filter that declares neither is treated as
/// indifferent and does not narrow the intersection.
#[derive(Clone, Debug)]
pub struct Capability {
    pub filter_name: String,
    pub preferred_size: Option<(u32, u32)>,
    pub formats: HashMap<PixelFormat, ExecutionPaths>,
    pub color_spaces: FxHashSet<ColorSpace>,
    pub hdr_formats: FxHashSet<HdrFormat>,
}

impl Capability {
    pub fn new(filter_name: impl Into<String>) -> Self {
        Capability {
            filter_name: filter_name.into(),
            preferred_size: None,
            formats: HashMap::new(),
            color_spaces: FxHashSet::default(),
            hdr_formats: FxHashSet::default(),
        }
    }

    pub fn supports(mut self, format: PixelFormat, paths: &[ExecutionPath]) -> Self {
        *self.formats.entry(format).or_insert_with(ExecutionPaths::empty) |= ExecutionPaths::from_paths(paths);
        self
    }

    /// Declares that this filter can operate directly on `color_spaces`
    /// without the pipeline needing to fall back to a default or HDR→SDR
    /// conversion (spec §4.3 step 3 "filters explicitly support this
    /// colorspace").
    pub fn supports_color_spaces(mut self, color_spaces: &[ColorSpace]) -> Self {
        self.color_spaces.extend(color_spaces.iter().copied());
        self
    }

    /// Declares that this filter can operate directly on `hdr_formats`
    /// without requiring the HDR-decompose fallback (spec §4.3 step 5 gate).
    pub fn supports_hdr_formats(mut self, hdr_formats: &[HdrFormat]) -> Self {
        self.hdr_formats.extend(hdr_formats.iter().copied());
        self
    }

    fn format_list(&self) -> SmallVec<[PixelFormat; 8]> {
        self.formats.keys().copied().collect()
    }
}

/// Which execution paths the caller allows (spec §4.4): `Default`/
/// `Foreground` = {CPU, GPU}, `Background` = {CPU}.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RunningType {
    Default,
    Foreground,
    Background,
}

impl RunningType {
    pub fn allowed_paths(self) -> ExecutionPaths {
        match self {
            RunningType::Default | RunningType::Foreground => ExecutionPaths::CPU | ExecutionPaths::GPU,
            RunningType::Background => ExecutionPaths::CPU,
        }
    }
}

/// Accumulates per-filter capabilities during the prepare phase and
/// resolves a pipeline-wide (execution path, pixel format) choice
/// (spec §4.4).
#[derive(Default)]
pub struct CapabilityNegotiator {
    caps: Vec<Capability>,
}

impl CapabilityNegotiator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_capability(&mut self, cap: Capability) {
        self.caps.push(cap);
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.caps
    }

    /// Re-running negotiation (e.g. after a pipeline rebuild) clears the
    /// prior result rather than appending to stale state, mirroring
    /// `ClearNegotiateResult` (SPEC_FULL supplemented feature #5).
    pub fn clear_negotiate_result(&mut self) {
        self.caps.clear();
    }

    /// Resolves `(execution_path, pipeline_format)` by walking the filter
    /// list in order, upgrading to GPU (and forcing the working format to
    /// RGBA8888) while allowed, and falling back to CPU otherwise
    /// (spec §4.4 steps 1-3).
    pub fn negotiate_execution_path(
        &self,
        running_type: RunningType,
        initial_format: PixelFormat,
    ) -> (ExecutionPath, PixelFormat) {
        let allowed = running_type.allowed_paths();
        let mut path = ExecutionPath::Cpu;
        let mut format = initial_format;
        let mut gpu_locked_out = false;

        for cap in &self.caps {
            let Some(paths_for_format) = cap.formats.get(&format) else {
                debug!(
                    "negotiation: filter {} has no capability for format {:?}, stopping",
                    cap.filter_name, format
                );
                break;
            };
            if !gpu_locked_out && allowed.has(ExecutionPath::Gpu) && paths_for_format.has(ExecutionPath::Gpu) {
                path = ExecutionPath::Gpu;
                format = PixelFormat::Rgba8888;
            } else {
                path = ExecutionPath::Cpu;
                gpu_locked_out = true;
            }
        }
        (path, format)
    }

    /// Intersection of supported formats across all negotiated
    /// capabilities, broken by [`crate::format::FORMAT_PRIORITY_TABLE`]
    /// (spec §4.4, `CalculateNegotiateFormats`/`CalculateHighPriorityFormat`).
    pub fn negotiate_format(&self) -> PixelFormat {
        let per_filter: Vec<SmallVec<[PixelFormat; 8]>> = self.caps.iter().map(Capability::format_list).collect();
        let intersection = calculate_negotiate_formats(&per_filter);
        calculate_high_priority_format(&intersection, &per_filter)
    }

    /// Intersection of `color_spaces` declared by every filter that declares
    /// at least one; filters that declare none are indifferent and don't
    /// narrow the result (spec §3, §4.3 step 3).
    pub fn negotiate_color_spaces(&self) -> FxHashSet<ColorSpace> {
        aggregate_declared(self.caps.iter().map(|c| &c.color_spaces))
    }

    /// Intersection of `hdr_formats` declared by every filter that declares
    /// at least one (spec §3, §4.3 step 5).
    pub fn negotiate_hdr_formats(&self) -> FxHashSet<HdrFormat> {
        aggregate_declared(self.caps.iter().map(|c| &c.hdr_formats))
    }
}

/// Intersects every non-empty set in `sets`; an empty or all-indifferent
/// input yields an empty result rather than a vacuous "supports everything".
fn aggregate_declared<'a, T: Eq + std::hash::Hash + Copy + 'a>(
    sets: impl Iterator<Item = &'a FxHashSet<T>>,
) -> FxHashSet<T> {
    let mut acc: Option<FxHashSet<T>> = None;
    for declared in sets {
        if declared.is_empty() {
            continue;
        }
        acc = Some(match acc {
            None => declared.clone(),
            Some(running) => running.intersection(declared).copied().collect(),
        });
    }
    acc.unwrap_or_default()
}

/// Pairwise intersection of each filter's supported-format list. Pure:
/// reordering the input list does not change the (set) result (spec §8 Law
/// "Format priority").
pub fn calculate_negotiate_formats(per_filter: &[SmallVec<[PixelFormat; 8]>]) -> Vec<PixelFormat> {
    if per_filter.is_empty() {
        return Vec::new();
    }
    let mut intersection: FxHashSet<PixelFormat> = per_filter[0].iter().copied().collect();
    for formats in &per_filter[1..] {
        let set: FxHashSet<PixelFormat> = formats.iter().copied().collect();
        intersection = intersection.intersection(&set).copied().collect();
    }
    intersection.into_iter().collect()
}

/// Picks the intersection member with the lowest
/// [`crate::format::FORMAT_PRIORITY_INDEX`] rank; if the intersection is
/// empty, falls back to the first filter's first format (spec §9 Open
/// Question (c) / §4.4). The index is a `lazy_static!` map built once from
/// [`crate::format::FORMAT_PRIORITY_TABLE`], turning the old linear
/// `priority.iter().find(...)` scan into an O(1) lookup per candidate
/// (grounded on the teacher's `lazy_static!`-backed lookup tables in its
/// shader preprocessor).
pub fn calculate_high_priority_format(
    intersection: &[PixelFormat],
    per_filter: &[SmallVec<[PixelFormat; 8]>],
) -> PixelFormat {
    if let Some(found) = intersection.iter().min_by_key(|f| {
        crate::format::FORMAT_PRIORITY_INDEX
            .get(f)
            .copied()
            .unwrap_or(usize::MAX)
    }) {
        return *found;
    }
    per_filter
        .first()
        .and_then(|formats| formats.first())
        .copied()
        .unwrap_or(PixelFormat::Default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_priority_is_order_independent() {
        let a: Vec<SmallVec<[PixelFormat; 8]>> = vec![
            smallvec::smallvec![PixelFormat::Rgba8888, PixelFormat::Nv12],
            smallvec::smallvec![PixelFormat::Nv12, PixelFormat::Rgba8888],
        ];
        let b: Vec<SmallVec<[PixelFormat; 8]>> = vec![
            smallvec::smallvec![PixelFormat::Nv12, PixelFormat::Rgba8888],
            smallvec::smallvec![PixelFormat::Rgba8888, PixelFormat::Nv12],
        ];
        let ia = calculate_negotiate_formats(&a);
        let ib = calculate_negotiate_formats(&b);
        let fa = calculate_high_priority_format(&ia, &a);
        let fb = calculate_high_priority_format(&ib, &b);
        assert_eq!(fa, fb);
        assert_eq!(fa, PixelFormat::Nv12);
    }

    #[test]
    fn empty_intersection_falls_back_to_first_filter_first_format() {
        let per_filter: Vec<SmallVec<[PixelFormat; 8]>> =
            vec![smallvec::smallvec![PixelFormat::Rgba8888], smallvec::smallvec![PixelFormat::Nv21]];
        let intersection = calculate_negotiate_formats(&per_filter);
        assert!(intersection.is_empty());
        let chosen = calculate_high_priority_format(&intersection, &per_filter);
        assert_eq!(chosen, PixelFormat::Rgba8888);
    }

    #[test]
    fn negotiation_upgrades_to_gpu_then_stays_cpu_once_downgraded() {
        let mut neg = CapabilityNegotiator::new();
        neg.add_capability(
            Capability::new("a").supports(PixelFormat::Rgba8888, &[ExecutionPath::Cpu, ExecutionPath::Gpu]),
        );
        neg.add_capability(Capability::new("b").supports(PixelFormat::Rgba8888, &[ExecutionPath::Cpu]));
        neg.add_capability(
            Capability::new("c").supports(PixelFormat::Rgba8888, &[ExecutionPath::Cpu, ExecutionPath::Gpu]),
        );
        let (path, format) = neg.negotiate_execution_path(RunningType::Foreground, PixelFormat::Rgba8888);
        assert_eq!(path, ExecutionPath::Cpu);
        assert_eq!(format, PixelFormat::Rgba8888);
    }

    #[test]
    fn background_running_type_never_picks_gpu() {
        let mut neg = CapabilityNegotiator::new();
        neg.add_capability(
            Capability::new("a").supports(PixelFormat::Rgba8888, &[ExecutionPath::Cpu, ExecutionPath::Gpu]),
        );
        let (path, _) = neg.negotiate_execution_path(RunningType::Background, PixelFormat::Rgba8888);
        assert_eq!(path, ExecutionPath::Cpu);
    }

    #[test]
    fn color_space_negotiation_intersects_only_declaring_filters() {
        use crate::format::ColorSpace;

        let mut neg = CapabilityNegotiator::new();
        neg.add_capability(
            Capability::new("a").supports_color_spaces(&[ColorSpace::Bt2020Hlg, ColorSpace::Srgb]),
        );
        neg.add_capability(Capability::new("b").supports_color_spaces(&[ColorSpace::Bt2020Hlg]));
        // "c" declares nothing and stays indifferent rather than emptying the intersection.
        neg.add_capability(Capability::new("c"));

        let supported = neg.negotiate_color_spaces();
        assert_eq!(supported.len(), 1);
        assert!(supported.contains(&ColorSpace::Bt2020Hlg));
    }

    #[test]
    fn color_space_negotiation_empty_when_nothing_declared() {
        let mut neg = CapabilityNegotiator::new();
        neg.add_capability(Capability::new("a").supports(PixelFormat::Rgba8888, &[ExecutionPath::Cpu]));
        assert!(neg.negotiate_color_spaces().is_empty());
        assert!(neg.negotiate_hdr_formats().is_empty());
    }
}
