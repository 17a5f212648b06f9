//! C1: the canonical description of a pixel buffer (spec §3, §4.1).

use crate::error::{EffectError, Result};
use crate::format::{BackingKind, ColorSpace, HdrFormat, PixelFormat, PixelMapRole};

/// Opaque native handle to a graphics buffer (DMA) or GPU texture.
///
/// Modeled as a raw integer rather than a real platform handle: the concrete
/// graphics-buffer / EGL / window primitives are external collaborators
/// (spec §1), out of scope for this engine.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NativeHandle(pub u64);

/// Canonical description of a pixel buffer: dimensions, stride, format,
/// color space, HDR format, backing kind, and the handles that back it.
#[derive(Clone, Debug, PartialEq)]
pub struct BufferInfo {
    pub width: u32,
    pub height: u32,
    pub row_stride: u32,
    pub length: usize,
    pub format: PixelFormat,
    pub color_space: ColorSpace,
    pub hdr_format: HdrFormat,
    pub backing: BackingKind,
    pub role: PixelMapRole,
    /// Raw CPU-visible pointer, as an address. `None` for GPU-only buffers.
    pub raw_addr: Option<usize>,
    /// Handle to the native graphics buffer, if the backing kind is DMA/shared.
    pub native_buffer: Option<NativeHandle>,
    /// GPU texture handle, if this buffer has been uploaded.
    pub texture: Option<NativeHandle>,
}

impl BufferInfo {
    pub fn new(
        width: u32,
        height: u32,
        row_stride: u32,
        format: PixelFormat,
        color_space: ColorSpace,
        hdr_format: HdrFormat,
        backing: BackingKind,
    ) -> Self {
        let length = row_stride as usize * format.effective_rows(height) as usize;
        BufferInfo {
            width,
            height,
            row_stride,
            length,
            format,
            color_space,
            hdr_format,
            backing,
            role: PixelMapRole::Primary,
            raw_addr: None,
            native_buffer: None,
            texture: None,
        }
    }

    /// Enforces the spec §3 invariant:
    /// `length >= row_stride * effective_rows(format, height)`,
    /// `row_stride >= width * bytes_per_pixel(format)`, and the backing
    /// kind is consistent with which handle fields are populated.
    pub fn validate(&self) -> Result<()> {
        let min_stride = self.width * self.format.bytes_per_pixel();
        if self.format != PixelFormat::Default && self.row_stride < min_stride {
            return Err(EffectError::InvalidBuffer);
        }
        let min_length = self.row_stride as usize * self.format.effective_rows(self.height) as usize;
        if self.length < min_length {
            return Err(EffectError::InvalidBuffer);
        }
        match self.backing {
            BackingKind::Dma | BackingKind::Shared => {
                if self.native_buffer.is_none() && self.texture.is_none() {
                    return Err(EffectError::InvalidGraphicsBuffer);
                }
            }
            BackingKind::Heap => {
                if self.raw_addr.is_none() && self.texture.is_none() {
                    return Err(EffectError::InvalidBuffer);
                }
            }
            BackingKind::Default => {}
        }
        Ok(())
    }

    pub fn dims_match(&self, other: &BufferInfo) -> bool {
        self.width == other.width && self.height == other.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba(width: u32, height: u32, stride: u32) -> BufferInfo {
        let mut b = BufferInfo::new(
            width,
            height,
            stride,
            PixelFormat::Rgba8888,
            ColorSpace::Srgb,
            HdrFormat::Sdr,
            BackingKind::Heap,
        );
        b.raw_addr = Some(0x1000);
        b
    }

    #[test]
    fn accepts_exact_stride() {
        assert!(rgba(32, 16, 32 * 4).validate().is_ok());
    }

    #[test]
    fn rejects_undersized_stride() {
        let b = rgba(32, 16, 32 * 4 - 1);
        assert!(b.validate().is_err());
    }

    #[test]
    fn nv12_effective_rows_are_1_5x() {
        assert_eq!(PixelFormat::Nv12.effective_rows(16), 24);
        assert_eq!(PixelFormat::Rgba8888.effective_rows(16), 16);
    }

    #[test]
    fn dma_without_handle_is_invalid() {
        let mut b = rgba(4, 4, 16);
        b.backing = BackingKind::Dma;
        b.raw_addr = None;
        assert!(matches!(b.validate(), Err(EffectError::InvalidGraphicsBuffer)));
    }
}
