//! Pixel formats, color spaces and the other small enums shared by every
//! layer of the pipeline (spec §3, §6, Glossary).

use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// In-memory pixel layout. See the Glossary for the bit layout of each.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    Default,
    Rgba8888,
    Rgba1010102,
    RgbaF16,
    Nv12,
    Nv21,
    P010CbCr,
    P010CrCb,
}

impl PixelFormat {
    /// Bytes per pixel of the primary (chroma-excluded for planar formats) plane.
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Default => 0,
            PixelFormat::Rgba8888 | PixelFormat::Rgba1010102 => 4,
            PixelFormat::RgbaF16 => 8,
            PixelFormat::Nv12 | PixelFormat::Nv21 => 1,
            PixelFormat::P010CbCr | PixelFormat::P010CrCb => 2,
        }
    }

    /// Effective number of rows a buffer of `height` rows occupies for this
    /// format, honoring the NV12/NV21/P010 1.5x chroma-plane convention
    /// (spec §3 invariant).
    pub fn effective_rows(self, height: u32) -> u32 {
        match self {
            PixelFormat::Nv12 | PixelFormat::Nv21 | PixelFormat::P010CbCr | PixelFormat::P010CrCb => {
                height + height / 2
            }
            _ => height,
        }
    }

    /// Whether this format is planar with a half-resolution interleaved
    /// chroma plane (NV12/NV21/P010 family).
    pub fn is_yuv_like(self) -> bool {
        matches!(
            self,
            PixelFormat::Nv12 | PixelFormat::Nv21 | PixelFormat::P010CbCr | PixelFormat::P010CrCb
        )
    }
}

/// Format-priority table used to break ties when intersecting supported
/// formats across filters (spec §4.4), grounded on
/// `capability_negotiate.cpp`'s `FORMAT_PRIORITY_TABLE`.
pub const FORMAT_PRIORITY_TABLE: &[PixelFormat] = &[
    PixelFormat::Nv12,
    PixelFormat::Nv21,
    PixelFormat::Rgba8888,
    PixelFormat::Rgba1010102,
    PixelFormat::P010CbCr,
    PixelFormat::P010CrCb,
];

lazy_static! {
    /// Rank of each [`FORMAT_PRIORITY_TABLE`] entry, built once so negotiation
    /// can rank a candidate format in O(1) instead of rescanning the table
    /// per candidate (grounded on the teacher's `lazy_static!`-backed lookup
    /// tables in its shader preprocessor, e.g. `render/src/shader/preprocess.rs`).
    pub static ref FORMAT_PRIORITY_INDEX: HashMap<PixelFormat, usize> = FORMAT_PRIORITY_TABLE
        .iter()
        .enumerate()
        .map(|(idx, f)| (*f, idx))
        .collect();
}

/// Gamut + transfer function + range tuple (spec Glossary).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ColorSpace {
    Default,
    Srgb,
    SrgbLimit,
    DisplayP3,
    DisplayP3Limit,
    Bt2020Hlg,
    Bt2020HlgLimit,
    Bt2020Pq,
    Bt2020PqLimit,
    AdobeRgb,
}

impl ColorSpace {
    /// True for the BT.2020 HLG/PQ (full or limited range) family (spec §4.3
    /// `IsHdrColorSpace`).
    pub fn is_hdr(self) -> bool {
        matches!(
            self,
            ColorSpace::Bt2020Hlg
                | ColorSpace::Bt2020HlgLimit
                | ColorSpace::Bt2020Pq
                | ColorSpace::Bt2020PqLimit
        )
    }
}

/// Single-layer vs. dual-layer HDR representation (spec Glossary).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum HdrFormat {
    Default,
    Sdr,
    Hdr10,
    Hdr8Gainmap,
}

/// Where the backing pixel storage for a buffer actually lives (spec §4.2).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum BackingKind {
    Default,
    Heap,
    Dma,
    Shared,
}

/// Auxiliary role of a pixelmap inside a `Picture` container (spec §3).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PixelMapRole {
    Primary,
    Gainmap,
    Depthmap,
    Unrefocus,
    Linear,
    WatermarkCut,
}

/// Native HDR metadata side-channel keys carried on DMA buffers (spec §6).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum HdrMetadataType {
    None,
    HdrVividSingle,
    HdrVividDual,
}
