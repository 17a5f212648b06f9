//! Reference CPU filter implementations exercising the
//! `effect_core::dispatch` seam: brightness (LUT-based tone curve) and
//! contrast (shader-equivalent per-channel curve).

pub mod brightness;
pub mod contrast;

pub use brightness::{brightness_dispatch, BrightnessFilter};
pub use contrast::{contrast_dispatch, ContrastFilter};
