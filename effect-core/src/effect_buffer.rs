//! C1: `EffectBuffer` — the (BufferInfo, ExtraInfo) pair that flows through
//! the pipeline, plus its optional auxiliary-role map (spec §3).

use std::collections::HashMap;

use crate::buffer::BufferInfo;
use crate::error::{EffectError, Result};
use crate::extra::ExtraInfo;
use crate::format::{HdrFormat, PixelMapRole};

/// Pair of (BufferInfo, ExtraInfo), plus optional GPU texture alias and
/// auxiliary-role map. An `EffectBuffer` never owns the underlying pixel
/// storage: that's owned by a scratch `MemoryRecord` or by the external
/// container (spec §4.1).
#[derive(Clone, Debug)]
pub struct EffectBuffer {
    pub info: BufferInfo,
    pub extra: ExtraInfo,
    /// Auxiliary buffers keyed by role (gainmap, depthmap, unrefocus, linear).
    pub auxiliaries: HashMap<PixelMapRole, BufferInfo>,
}

impl EffectBuffer {
    pub fn new(info: BufferInfo, extra: ExtraInfo) -> Self {
        EffectBuffer {
            info,
            extra,
            auxiliaries: HashMap::new(),
        }
    }

    /// The raw address this buffer is identified by, used as the "never
    /// overwrite the input" key throughout the memory manager (spec §4.2).
    pub fn addr(&self) -> Option<usize> {
        self.info.raw_addr
    }

    /// For an `Hdr8Gainmap` picture, a `Gainmap` auxiliary entry is
    /// mandatory; `Depthmap`/`Unrefocus`/`Linear` are optional (spec §3).
    pub fn validate_auxiliaries(&self) -> Result<()> {
        if self.info.hdr_format == HdrFormat::Hdr8Gainmap
            && !self.auxiliaries.contains_key(&PixelMapRole::Gainmap)
        {
            return Err(EffectError::InvalidBuffer);
        }
        Ok(())
    }

    pub fn gainmap(&self) -> Option<&BufferInfo> {
        self.auxiliaries.get(&PixelMapRole::Gainmap)
    }

    pub fn gainmap_mut(&mut self) -> Option<&mut BufferInfo> {
        self.auxiliaries.get_mut(&PixelMapRole::Gainmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferInfo;
    use crate::extra::{ContainerRef, DataType};
    use crate::format::{BackingKind, ColorSpace, PixelFormat};

    fn primary() -> BufferInfo {
        BufferInfo::new(
            2,
            2,
            8,
            PixelFormat::Rgba8888,
            ColorSpace::Srgb,
            HdrFormat::Hdr8Gainmap,
            BackingKind::Heap,
        )
    }

    #[test]
    fn gainmap_required_for_hdr8_gainmap() {
        let buf = EffectBuffer::new(primary(), ExtraInfo::new(DataType::Picture, ContainerRef::None));
        assert!(buf.validate_auxiliaries().is_err());
    }

    #[test]
    fn gainmap_present_passes() {
        let mut buf = EffectBuffer::new(primary(), ExtraInfo::new(DataType::Picture, ContainerRef::None));
        buf.auxiliaries.insert(
            PixelMapRole::Gainmap,
            BufferInfo::new(1, 1, 4, PixelFormat::Rgba8888, ColorSpace::Srgb, HdrFormat::Sdr, BackingKind::Heap),
        );
        assert!(buf.validate_auxiliaries().is_ok());
    }
}
