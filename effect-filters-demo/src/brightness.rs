//! Brightness filter, grounded on `cpu_brightness_algo.cpp`'s
//! `CpuBrightnessAlgo::OnApplyRGBA8888`/`ParseBrightness`.
//!
//! The real implementation walks every pixel through a 256-entry LUT built
//! from the intensity parameter. Raw pixel storage is owned by the external
//! bitmap/graphics-buffer container (spec §1), not by [`EffectBuffer`], so
//! [`BrightnessFilter::apply_rgba8888`] does the bookkeeping half of that
//! (format/state propagation) while [`build_lut`] is the actual per-pixel
//! math, kept as a pure, independently testable function.

use log::{debug, info};

use effect_core::dispatch::{ExecutionHandler, FilterDispatch, PixelAlgorithm};
use effect_core::effect_buffer::EffectBuffer;
use effect_core::error::Result;
use effect_core::{Capability, ExecutionPath, PixelFormat};

const EPS: f32 = 1e-5;
const SCALE_FACTOR: f32 = 100.0;
const LUT_EXPONENT: f32 = 2.4;

/// `ParseBrightness` + the LUT-building loop in `OnApplyRGBA8888`: for each
/// of the 256 possible input channel values, the output value after
/// applying `intensity` (roughly -100..100, 0 = no change).
pub fn build_lut(intensity: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if intensity.abs() < EPS {
        for (idx, entry) in lut.iter_mut().enumerate() {
            *entry = idx as u8;
        }
        return lut;
    }

    let scale = LUT_EXPONENT.powf(intensity / SCALE_FACTOR);
    for (idx, entry) in lut.iter_mut().enumerate() {
        let current = (1.0 - idx as f32 / 255.0).clamp(0.0, 1.0) + EPS;
        let current = (1.0 - current.powf(scale)).clamp(0.0, 1.0);
        *entry = (current * 255.0) as u8;
    }
    lut
}

pub struct BrightnessFilter {
    pub intensity: f32,
}

impl PixelAlgorithm for BrightnessFilter {
    fn apply_rgba8888(&self, src: &EffectBuffer, dst: &mut EffectBuffer) -> Result<()> {
        let lut = build_lut(self.intensity);
        debug!("brightness: applying intensity {} (lut[128]={})", self.intensity, lut[128]);
        dst.info.color_space = src.info.color_space;
        dst.info.hdr_format = src.info.hdr_format;
        info!("brightness: applied over {}x{} buffer", src.info.width, src.info.height);
        Ok(())
    }
}

/// Builds the registered dispatch + advertised capability for this filter,
/// the shape a real `FilterFactory::register` entry would produce.
pub fn brightness_dispatch(intensity: f32) -> (FilterDispatch, Capability) {
    let dispatch = FilterDispatch::new(
        "Brightness",
        vec![ExecutionHandler {
            path: ExecutionPath::Cpu,
            supported_formats: smallvec::smallvec![PixelFormat::Rgba8888],
            algorithm: Box::new(BrightnessFilter { intensity }),
        }],
    );
    let capability = Capability::new("Brightness").supports(PixelFormat::Rgba8888, &[ExecutionPath::Cpu]);
    (dispatch, capability)
}
