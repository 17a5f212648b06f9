//! C3: the color-space manager (spec §4.3), grounded on
//! `colorspace_strategy.cpp` and `colorspace_manager.cpp`.

use fxhash::FxHashSet;
use log::{debug, info};

use crate::effect_buffer::EffectBuffer;
use crate::error::{EffectError, Result};
use crate::extra::DataType;
use crate::format::{ColorSpace, HdrFormat, PixelMapRole};

/// `COLORSPACE_CONVERTER_MAP`: the execution-space each color space maps to.
/// A color space is "conversion-needed" iff its target differs from itself.
pub fn target_color_space(src: ColorSpace) -> ColorSpace {
    match src {
        ColorSpace::AdobeRgb => ColorSpace::DisplayP3,
        other => other,
    }
}

pub fn is_need_convert(src: ColorSpace) -> bool {
    target_color_space(src) != src
}

/// `COLORSPACE_HDR_CONVERTER_MAP`: BT2020 HLG/PQ (limited or full) fall back
/// to DISPLAY_P3 (limited or full respectively) when no filter supports the
/// HDR space directly.
fn hdr_fallback(src: ColorSpace) -> Option<ColorSpace> {
    match src {
        ColorSpace::Bt2020Hlg => Some(ColorSpace::DisplayP3),
        ColorSpace::Bt2020HlgLimit => Some(ColorSpace::DisplayP3Limit),
        ColorSpace::Bt2020Pq => Some(ColorSpace::DisplayP3),
        ColorSpace::Bt2020PqLimit => Some(ColorSpace::DisplayP3Limit),
        _ => None,
    }
}

/// `DEFAULT_SUPPORTED_COLORSPACE`.
pub const DEFAULT_SUPPORTED_COLORSPACE: &[ColorSpace] = &[
    ColorSpace::Srgb,
    ColorSpace::SrgbLimit,
    ColorSpace::DisplayP3,
    ColorSpace::DisplayP3Limit,
];

/// Result of [`ColorSpaceManager::apply_color_space`]: the (possibly
/// converted) buffer's color space and whether a conversion actually ran.
#[derive(Copy, Clone, Debug)]
pub struct ApplyResult {
    pub chosen: ColorSpace,
    pub converted: bool,
}

/// Outcome of [`ColorSpaceManager::resolve`]: the pipeline-wide color space
/// and whether HDR decompose to SDR+gainmap is required.
#[derive(Copy, Clone, Debug)]
pub struct ResolvedColorSpace {
    pub output: ColorSpace,
    pub decompose_hdr: bool,
}

pub struct ColorSpaceManager<'a> {
    src: Option<&'a EffectBuffer>,
    dst: Option<&'a EffectBuffer>,
}

impl<'a> ColorSpaceManager<'a> {
    pub fn new() -> Self {
        ColorSpaceManager { src: None, dst: None }
    }

    pub fn init(&mut self, src: &'a EffectBuffer, dst: Option<&'a EffectBuffer>) {
        self.src = Some(src);
        self.dst = dst;
    }

    pub fn deinit(&mut self) {
        self.src = None;
        self.dst = None;
    }

    /// Per-pixel conversion to `requested` if needed; updates the buffer's
    /// color space in place (spec §4.3 step 2). The actual pixel math is an
    /// external collaborator (spec §1); this records the chosen target.
    pub fn apply_color_space(&self, buffer: &mut EffectBuffer, requested: ColorSpace) -> ApplyResult {
        let target = target_color_space(requested);
        let converted = is_need_convert(requested);
        if converted {
            debug!("colorspace manager: converting {:?} -> {:?}", requested, target);
            buffer.info.color_space = target;
        }
        ApplyResult { chosen: target, converted }
    }

    /// Pipeline-wide color-space choice (spec §4.3 steps 1-4):
    /// `ChooseColorSpace` → optional HDR decompose gate.
    pub fn resolve(
        &self,
        filters_supported: &FxHashSet<ColorSpace>,
        src_real_color_space: ColorSpace,
        filters_supported_hdr: &FxHashSet<HdrFormat>,
        src_hdr_format: HdrFormat,
    ) -> Result<ResolvedColorSpace> {
        let output = self.choose_color_space(filters_supported, src_real_color_space)?;
        self.check_input_output_hdr_consistency(src_real_color_space, output)?;

        let decompose_hdr = src_real_color_space.is_hdr()
            && !output.is_hdr()
            && !filters_supported_hdr.contains(&src_hdr_format);
        if decompose_hdr {
            info!(
                "colorspace manager: decomposing HDR ({:?}) to SDR+gainmap for output {:?}",
                src_hdr_format, output
            );
        }
        Ok(ResolvedColorSpace { output, decompose_hdr })
    }

    /// `ChooseColorSpace`: dispatches to the with/without-output variants
    /// depending on whether a distinct destination buffer was supplied.
    fn choose_color_space(
        &self,
        filters_supported: &FxHashSet<ColorSpace>,
        src_real_color_space: ColorSpace,
    ) -> Result<ColorSpace> {
        let src = self.src.ok_or(EffectError::NullInput)?;
        match self.dst {
            None => choose_without_output(filters_supported, src_real_color_space),
            Some(dst) if dst.addr() == src.addr() => {
                choose_without_output(filters_supported, src_real_color_space)
            }
            Some(dst) => {
                let chosen = choose_without_output(filters_supported, src_real_color_space)?;
                if src.extra.data_type == DataType::PixelMap && dst.extra.data_type == DataType::PixelMap {
                    if src_real_color_space.is_hdr() != chosen.is_hdr() {
                        return Err(EffectError::NotSupportInputOutputColorSpace);
                    }
                }
                Ok(chosen)
            }
        }
    }

    /// Spec §4.3 step 4 as a standalone invariant check (also exercised as
    /// spec §8 invariant #5).
    fn check_input_output_hdr_consistency(&self, src_cs: ColorSpace, chosen: ColorSpace) -> Result<()> {
        if let (Some(src), Some(dst)) = (self.src, self.dst) {
            if src.extra.data_type == DataType::PixelMap && dst.extra.data_type == DataType::PixelMap {
                if src_cs.is_hdr() != chosen.is_hdr() {
                    return Err(EffectError::NotSupportInputOutputColorSpace);
                }
            }
        }
        Ok(())
    }

    /// Decomposes an HDR buffer into an SDR primary + gainmap auxiliary,
    /// replacing the working buffer with the SDR primary and clearing its
    /// HDR metadata (spec §4.3 step 5). The actual pixel decomposition
    /// (VPE) is an external collaborator; this performs the bookkeeping
    /// transition the pipeline is responsible for.
    pub fn decompose_hdr(&self, buffer: &mut EffectBuffer, sdr_color_space: ColorSpace) -> Result<()> {
        if !buffer.auxiliaries.contains_key(&PixelMapRole::Gainmap) {
            return Err(EffectError::VpeDecomposeFailed);
        }
        buffer.info.hdr_format = HdrFormat::Sdr;
        buffer.info.color_space = sdr_color_space;
        Ok(())
    }
}

impl<'a> Default for ColorSpaceManager<'a> {
    fn default() -> Self {
        Self::new()
    }
}

/// `ChooseColorSpaceInner`: srcRealColorSpace if filters support it or it's
/// one of the always-supported defaults; else the HDR→SDR fallback; else
/// an error.
fn choose_without_output(
    filters_supported: &FxHashSet<ColorSpace>,
    src_real_color_space: ColorSpace,
) -> Result<ColorSpace> {
    if filters_supported.contains(&src_real_color_space) {
        return Ok(src_real_color_space);
    }
    if DEFAULT_SUPPORTED_COLORSPACE.contains(&src_real_color_space) {
        return Ok(src_real_color_space);
    }
    hdr_fallback(src_real_color_space).ok_or(EffectError::ColorSpaceNotSupportConvert(src_real_color_space))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adobe_rgb_needs_conversion_to_display_p3() {
        assert!(is_need_convert(ColorSpace::AdobeRgb));
        assert_eq!(target_color_space(ColorSpace::AdobeRgb), ColorSpace::DisplayP3);
    }

    #[test]
    fn srgb_is_passthrough() {
        assert!(!is_need_convert(ColorSpace::Srgb));
    }

    #[test]
    fn filter_supported_colorspace_wins() {
        let mut supported = FxHashSet::default();
        supported.insert(ColorSpace::Bt2020Hlg);
        let chosen = choose_without_output(&supported, ColorSpace::Bt2020Hlg).unwrap();
        assert_eq!(chosen, ColorSpace::Bt2020Hlg);
    }

    #[test]
    fn unsupported_hdr_falls_back_to_display_p3() {
        let supported = FxHashSet::default();
        let chosen = choose_without_output(&supported, ColorSpace::Bt2020HlgLimit).unwrap();
        assert_eq!(chosen, ColorSpace::DisplayP3Limit);
    }

    #[test]
    fn unconvertible_colorspace_errors() {
        let supported = FxHashSet::default();
        let err = choose_without_output(&supported, ColorSpace::AdobeRgb);
        // AdobeRgb is in DEFAULT_SUPPORTED_COLORSPACE? No -> falls to hdr_fallback -> None -> error.
        assert!(err.is_err());
    }
}
