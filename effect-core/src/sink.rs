//! C10: the sink filter (spec §4.10), materializing the final in-pipeline
//! buffer into the caller's requested output container.

use log::{info, warn};

use crate::buffer::BufferInfo;
use crate::context::ExifMetadata;
use crate::effect_buffer::EffectBuffer;
use crate::error::{EffectError, Result};
use crate::extra::{ContainerRef, DataType};
use crate::format::{BackingKind, HdrFormat, PixelFormat, PixelMapRole};

/// Metadata keys copied src→dst between DMA bitmaps with surrounding
/// picture containers (spec §4.10 "Picture-wide metadata copy").
pub const COPIED_METADATA_KEYS: &[&str] = &[
    "HDR_METADATA_TYPE",
    "COLORSPACE_INFO",
    "HDR_STATIC_METADATA",
    "HDR_DYNAMIC_METADATA",
];

/// Outcome of materializing into a bitmap/graphics-buffer destination.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MaterializePlan {
    /// Buffer address equals destination address: metadata-only update.
    InPlace,
    /// Sizes/formats match: row-by-row copy honoring strides.
    CopyRows,
    /// Destination must be reallocated to the new dimensions before copy.
    Reallocate,
}

/// Formats the current UTC instant as EXIF's `DateTime` tag
/// (`YYYY:MM:DD HH:MM:SS`), the default clock `materialize`/`render` pass to
/// [`SinkFilter::update_exif`] (spec §4.10 "EXIF update on output").
pub fn now_exif_timestamp() -> String {
    let now = time::OffsetDateTime::now_utc();
    format!(
        "{:04}:{:02}:{:02} {:02}:{:02}:{:02}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

pub struct SinkFilter;

impl SinkFilter {
    /// Decides the materialization plan for a `PixelMap`/bitmap destination
    /// (spec §4.10 table, first row).
    pub fn plan_for_bitmap(produced: &BufferInfo, dst: &BufferInfo) -> MaterializePlan {
        if produced.raw_addr.is_some() && produced.raw_addr == dst.raw_addr {
            MaterializePlan::InPlace
        } else if produced.dims_match(dst) && produced.format == dst.format {
            MaterializePlan::CopyRows
        } else {
            MaterializePlan::Reallocate
        }
    }

    /// Decides the materialization plan for a DMA graphics-buffer
    /// destination; unlike bitmaps, a size/format mismatch is a hard error
    /// rather than a reallocation (spec §4.10 table, second row).
    pub fn plan_for_graphics_buffer(produced: &BufferInfo, dst: &BufferInfo) -> Result<MaterializePlan> {
        if produced.raw_addr.is_some() && produced.raw_addr == dst.raw_addr {
            Ok(MaterializePlan::InPlace)
        } else if produced.dims_match(dst) && produced.format == dst.format {
            Ok(MaterializePlan::CopyRows)
        } else {
            Err(EffectError::BufferNotAllowChange)
        }
    }

    /// Updates EXIF width/height/PixelXDimension/PixelYDimension from the
    /// produced buffer, and DateTime (format `YYYY:MM:DD HH:MM:SS`) if it
    /// was originally non-empty (spec §4.10 "EXIF update on output").
    pub fn update_exif(exif: &mut ExifMetadata, produced: &BufferInfo, now: impl Fn() -> String) {
        exif.width = produced.width;
        exif.height = produced.height;
        if exif.date_time.is_some() {
            exif.date_time = Some(now());
        }
    }

    /// Copies the four HDR/colorspace metadata keys from src to dst when
    /// both are DMA bitmaps inside picture containers (spec §4.10).
    /// Non-fatal failures are logged and skipped (spec §7 propagation
    /// policy), never surfaced as an error from the sink.
    pub fn copy_picture_metadata(
        src: &BufferInfo,
        dst: &BufferInfo,
        copy_one: impl Fn(&str) -> std::result::Result<(), String>,
    ) {
        if src.backing != BackingKind::Dma || dst.backing != BackingKind::Dma {
            return;
        }
        for key in COPIED_METADATA_KEYS {
            if let Err(e) = copy_one(key) {
                warn!("sink: skipping metadata key {} (non-fatal): {}", key, e);
            }
        }
    }

    /// Materializes into a `Picture` destination: primary always, gainmap
    /// only if present in both src and dst (spec §4.10 "picture" row).
    pub fn materialize_picture(src: &EffectBuffer, dst: &mut EffectBuffer) -> Result<()> {
        dst.info = src.info.clone();
        if let (Some(src_gain), true) = (src.gainmap(), dst.auxiliaries.contains_key(&PixelMapRole::Gainmap)) {
            dst.auxiliaries.insert(PixelMapRole::Gainmap, src_gain.clone());
            info!("sink: updated primary and gainmap pixelmaps on output picture");
        } else {
            info!("sink: updated primary pixelmap on output picture (no gainmap to propagate)");
        }
        Ok(())
    }

    /// HDR re-compose path (spec §4.10 "HDR output specifics"): if the
    /// produced buffer is RGBA8888 but the source picture was
    /// HDR8_GAINMAP, the sink must re-compose HDR before presenting.
    pub fn needs_hdr_recompose(produced_format: PixelFormat, source_hdr_format: HdrFormat) -> bool {
        produced_format == PixelFormat::Rgba8888 && source_hdr_format == HdrFormat::Hdr8Gainmap
    }

    /// Dispatches materialization by output data type (spec §4.10 table),
    /// then updates `exif` (when the caller has one to update) from the
    /// produced buffer's dimensions and `now` (spec §4.10 "EXIF update on
    /// output").
    pub fn materialize(
        produced: &EffectBuffer,
        dst: &mut EffectBuffer,
        exif: Option<&mut ExifMetadata>,
        now: impl Fn() -> String,
    ) -> Result<MaterializePlan> {
        let plan = match dst.extra.data_type {
            DataType::PixelMap => Ok(Self::plan_for_bitmap(&produced.info, &dst.info)),
            DataType::SurfaceBuffer => Self::plan_for_graphics_buffer(&produced.info, &dst.info),
            DataType::Uri | DataType::Path => {
                Self::ensure_file_extension(&dst.extra.container)?;
                Ok(MaterializePlan::Reallocate)
            }
            DataType::Picture => {
                Self::materialize_picture(produced, dst)?;
                Ok(MaterializePlan::InPlace)
            }
            DataType::NativeWindow | DataType::Tex => Ok(MaterializePlan::CopyRows),
            other => Err(EffectError::UnsupportedDataType(other)),
        }?;

        if let Some(exif) = exif {
            Self::update_exif(exif, &produced.info, now);
        }

        Ok(plan)
    }

    fn ensure_file_extension(container: &ContainerRef) -> Result<()> {
        let path = match container {
            ContainerRef::Uri(s) => s.clone(),
            ContainerRef::Path(p) => p.to_string_lossy().to_string(),
            _ => return Err(EffectError::ParamInvalid("missing file container".into())),
        };
        if crate::extra::ExtraInfo::has_supported_file_extension(&path) {
            Ok(())
        } else {
            Err(EffectError::UnsupportedFileExtension(path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extra::ExtraInfo;
    use crate::format::ColorSpace;

    fn info(addr: usize, w: u32, h: u32, format: PixelFormat) -> BufferInfo {
        let mut b = BufferInfo::new(w, h, w * 4, format, ColorSpace::Srgb, HdrFormat::Sdr, BackingKind::Heap);
        b.raw_addr = Some(addr);
        b
    }

    #[test]
    fn same_addr_is_in_place() {
        let produced = info(1, 4, 4, PixelFormat::Rgba8888);
        let dst = info(1, 4, 4, PixelFormat::Rgba8888);
        assert_eq!(SinkFilter::plan_for_bitmap(&produced, &dst), MaterializePlan::InPlace);
    }

    #[test]
    fn matching_size_and_format_copies_rows() {
        let produced = info(1, 4, 4, PixelFormat::Rgba8888);
        let dst = info(2, 4, 4, PixelFormat::Rgba8888);
        assert_eq!(SinkFilter::plan_for_bitmap(&produced, &dst), MaterializePlan::CopyRows);
    }

    #[test]
    fn mismatched_size_reallocates_for_bitmap_but_errors_for_graphics_buffer() {
        let produced = info(1, 8, 8, PixelFormat::Rgba8888);
        let dst = info(2, 4, 4, PixelFormat::Rgba8888);
        assert_eq!(SinkFilter::plan_for_bitmap(&produced, &dst), MaterializePlan::Reallocate);
        assert!(matches!(
            SinkFilter::plan_for_graphics_buffer(&produced, &dst),
            Err(EffectError::BufferNotAllowChange)
        ));
    }

    #[test]
    fn exif_datetime_only_updated_if_originally_present() {
        let mut exif = ExifMetadata { width: 0, height: 0, date_time: None };
        let produced = info(1, 10, 20, PixelFormat::Rgba8888);
        SinkFilter::update_exif(&mut exif, &produced, || "2026:07:28 00:00:00".to_string());
        assert_eq!(exif.date_time, None);
        assert_eq!((exif.width, exif.height), (10, 20));

        let mut exif2 = ExifMetadata { width: 0, height: 0, date_time: Some(String::new()) };
        SinkFilter::update_exif(&mut exif2, &produced, || "2026:07:28 00:00:00".to_string());
        assert_eq!(exif2.date_time, Some("2026:07:28 00:00:00".to_string()));
    }

    #[test]
    fn gainmap_propagated_only_when_present_on_both_sides() {
        let src_info = info(1, 2, 2, PixelFormat::Rgba8888);
        let dst_info = info(2, 2, 2, PixelFormat::Rgba8888);
        let mut src = EffectBuffer::new(src_info, ExtraInfo::new(DataType::Picture, ContainerRef::None));
        src.auxiliaries.insert(PixelMapRole::Gainmap, info(3, 1, 1, PixelFormat::Rgba8888));
        let mut dst = EffectBuffer::new(dst_info, ExtraInfo::new(DataType::Picture, ContainerRef::None));
        dst.auxiliaries.insert(PixelMapRole::Gainmap, info(4, 1, 1, PixelFormat::Rgba8888));

        SinkFilter::materialize_picture(&src, &mut dst).unwrap();
        assert_eq!(dst.gainmap().unwrap().raw_addr, Some(3));
    }
}
