//! C5: render strategy (spec §4.5), grounded on
//! `frameworks/native/efilter/base/render_strategy.cpp`.

use crate::buffer::BufferInfo;
use crate::effect_buffer::EffectBuffer;

/// The negotiated (width, height) a filter's candidate output is checked
/// against (spec §4.5).
#[derive(Copy, Clone, Debug)]
pub struct NegotiatedSize {
    pub width: u32,
    pub height: u32,
}

/// Decides, given a filter's candidate output buffer, which buffer the
/// filter should actually write to: the candidate unchanged, the
/// caller-supplied destination, or nothing (meaning "allocate scratch")
/// (spec §4.5).
pub struct RenderStrategy<'a> {
    src: Option<&'a EffectBuffer>,
    dst: Option<&'a EffectBuffer>,
}

/// Outcome of [`RenderStrategy::choose_best_output`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum StrategyOutcome<'a> {
    /// Write into this candidate/destination buffer.
    UseBuffer(&'a BufferInfo),
    /// Already writing to the destination; nothing more to do.
    NoChangeNeeded,
    /// Candidate would overwrite src, or no better choice exists: filter
    /// must allocate scratch.
    AllocateScratch,
}

impl<'a> RenderStrategy<'a> {
    pub fn new() -> Self {
        RenderStrategy { src: None, dst: None }
    }

    pub fn init(&mut self, src: &'a EffectBuffer, dst: Option<&'a EffectBuffer>) {
        self.src = Some(src);
        self.dst = dst;
    }

    pub fn get_input(&self) -> Option<&'a EffectBuffer> {
        self.src
    }

    pub fn get_output(&self) -> Option<&'a EffectBuffer> {
        self.dst
    }

    pub fn deinit(&mut self) {
        self.src = None;
        self.dst = None;
    }

    /// Mirrors `ChooseBestOutput`/`ChooseBufOnSetInput`/`ChooseBufOnSetInOutput`.
    pub fn choose_best_output(
        &self,
        candidate: &'a BufferInfo,
        negotiated: NegotiatedSize,
    ) -> StrategyOutcome<'a> {
        let Some(src) = self.src else {
            return StrategyOutcome::UseBuffer(candidate);
        };

        match self.dst {
            None => StrategyOutcome::UseBuffer(candidate),
            Some(dst) if dst.addr() == src.addr() => StrategyOutcome::UseBuffer(candidate),
            Some(dst) => self.choose_with_distinct_output(candidate, src, dst, negotiated),
        }
    }

    fn choose_with_distinct_output(
        &self,
        candidate: &'a BufferInfo,
        src: &'a EffectBuffer,
        dst: &'a EffectBuffer,
        negotiated: NegotiatedSize,
    ) -> StrategyOutcome<'a> {
        if candidate.raw_addr == dst.info.raw_addr {
            return StrategyOutcome::NoChangeNeeded;
        }
        if negotiated.width == dst.info.width && negotiated.height == dst.info.height {
            return StrategyOutcome::UseBuffer(&dst.info);
        }
        if candidate.raw_addr == src.info.raw_addr {
            return StrategyOutcome::AllocateScratch;
        }
        StrategyOutcome::UseBuffer(candidate)
    }
}

impl<'a> Default for RenderStrategy<'a> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extra::{ContainerRef, DataType, ExtraInfo};
    use crate::format::{BackingKind, ColorSpace, HdrFormat, PixelFormat};

    fn buffer(addr: usize, w: u32, h: u32) -> EffectBuffer {
        let mut info = BufferInfo::new(w, h, w * 4, PixelFormat::Rgba8888, ColorSpace::Srgb, HdrFormat::Sdr, BackingKind::Heap);
        info.raw_addr = Some(addr);
        EffectBuffer::new(info, ExtraInfo::new(DataType::PixelMap, ContainerRef::None))
    }

    #[test]
    fn no_dst_returns_candidate_unchanged() {
        let src = buffer(1, 4, 4);
        let candidate = buffer(2, 4, 4);
        let mut strat = RenderStrategy::new();
        strat.init(&src, None);
        let negotiated = NegotiatedSize { width: 4, height: 4 };
        let out = strat.choose_best_output(&candidate.info, negotiated);
        assert_eq!(out, StrategyOutcome::UseBuffer(&candidate.info));
    }

    #[test]
    fn candidate_already_dst_means_no_change() {
        let src = buffer(1, 4, 4);
        let dst = buffer(2, 4, 4);
        let candidate = buffer(2, 4, 4);
        let mut strat = RenderStrategy::new();
        strat.init(&src, Some(&dst));
        let negotiated = NegotiatedSize { width: 8, height: 8 };
        let out = strat.choose_best_output(&candidate.info, negotiated);
        assert_eq!(out, StrategyOutcome::NoChangeNeeded);
    }

    #[test]
    fn candidate_overwriting_src_is_disallowed() {
        let src = buffer(1, 4, 4);
        let dst = buffer(2, 8, 8);
        let candidate = buffer(1, 4, 4);
        let mut strat = RenderStrategy::new();
        strat.init(&src, Some(&dst));
        let negotiated = NegotiatedSize { width: 4, height: 4 };
        let out = strat.choose_best_output(&candidate.info, negotiated);
        assert_eq!(out, StrategyOutcome::AllocateScratch);
    }

    #[test]
    fn matching_negotiated_size_routes_to_dst() {
        let src = buffer(1, 4, 4);
        let dst = buffer(2, 8, 8);
        let candidate = buffer(3, 8, 8);
        let mut strat = RenderStrategy::new();
        strat.init(&src, Some(&dst));
        let negotiated = NegotiatedSize { width: 8, height: 8 };
        let out = strat.choose_best_output(&candidate.info, negotiated);
        assert_eq!(out, StrategyOutcome::UseBuffer(&dst.info));
    }
}
