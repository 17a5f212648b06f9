//! C8: the source filter (spec §4.8).

use log::debug;

use crate::buffer::BufferInfo;
use crate::capability::Capability;
use crate::dispatch::ExecutionPath;
use crate::effect_buffer::EffectBuffer;
use crate::error::Result;
use crate::format::BackingKind;
use crate::memory::{AllocInfo, MemoryManager};

/// Materializes the user-provided input as an in-pipeline buffer.
pub struct SourceFilter {
    buffer: Option<EffectBuffer>,
}

impl SourceFilter {
    pub fn new() -> Self {
        SourceFilter { buffer: None }
    }

    pub fn set_source(&mut self, buffer: EffectBuffer) {
        self.buffer = Some(buffer);
    }

    /// `Prepare`: publishes the src capability (width, height, format) via
    /// the out-port.
    pub fn publish_capability(&self) -> Option<Capability> {
        self.buffer.as_ref().map(|b| {
            Capability::new("__source__")
                .supports(b.info.format, &[ExecutionPath::Cpu, ExecutionPath::Gpu])
        })
    }

    /// `Start`: pushes the src buffer downstream. If the negotiated path is
    /// GPU and the src backing kind is not DMA, allocates a DMA scratch,
    /// copies src into it, and pushes that instead (spec §4.8).
    pub fn start(&self, ip_type: ExecutionPath, memory: &mut MemoryManager) -> Result<EffectBuffer> {
        let src = self.buffer.clone().ok_or(crate::error::EffectError::NullInput)?;

        if ip_type == ExecutionPath::Gpu && src.info.backing != BackingKind::Dma {
            debug!("source filter: uploading CPU input to DMA scratch for GPU execution");
            let alloc = AllocInfo {
                width: src.info.width,
                height: src.info.height,
                row_stride: src.info.row_stride,
                format: src.info.format,
                color_space: src.info.color_space,
                backing: BackingKind::Dma,
            };
            let record = memory.alloc(src.addr(), &alloc);
            let mut uploaded = src.clone();
            uploaded.info = record.info;
            return Ok(uploaded);
        }

        Ok(src)
    }

    pub fn buffer(&self) -> Option<&EffectBuffer> {
        self.buffer.as_ref()
    }
}

impl Default for SourceFilter {
    fn default() -> Self {
        Self::new()
    }
}
