//! C7: the render environment (spec §4.7), grounded on
//! `render_environment.h`/`render_environment.cpp`.
//!
//! The original couples a GL context, shader/mesh state and the FIFO
//! texture cache behind one class. The GL/EGL surface and shader pipeline
//! are external collaborators (spec §1); this models the part the engine
//! owns directly: readiness tracking, the output data type the sink needs,
//! and the texture cache. [`RenderEnvironment`] is the seam a real GPU
//! backend plugs into; [`CpuRenderEnvironment`] is the trivial
//! implementation used when the negotiated execution path is CPU.

use effect_core::{BufferInfo, DataType, EffectError, NativeHandle, Result};

use crate::texture_cache::TextureCache;

/// `GenMainTex`/`ConvertTextureToBuffer`/`BeginFrame` and friends: the seam
/// a GPU-backed environment implements. The CPU path never calls these.
pub trait RenderEnvironment: Send {
    fn init(&mut self);
    fn is_prepared(&self) -> bool;
    fn set_output_type(&mut self, data_type: DataType);

    /// `GenMainTex`: uploads `buffer` as a GPU texture, or reuses a cached
    /// one keyed by `cache_key` if present (spec §4.7 `GetOrCreateTextureFromCache`).
    fn gen_main_tex(&mut self, cache_key: &str, buffer: &BufferInfo) -> Result<NativeHandle>;

    /// `ConvertTextureToBuffer`: reads a GPU texture back into CPU-visible
    /// storage described by `dst`.
    fn convert_texture_to_buffer(&mut self, tex: NativeHandle, dst: &mut BufferInfo) -> Result<()>;

    fn begin_frame(&mut self) -> bool;
}

/// No-op implementation used when the negotiated execution path never
/// needs a GPU context (spec §4.4: CPU-only negotiation outcome).
pub struct CpuRenderEnvironment {
    prepared: bool,
    output_type: DataType,
    cache: TextureCache<String, NativeHandle>,
}

impl CpuRenderEnvironment {
    pub fn new(texture_cache_capacity_bytes: u64) -> Self {
        CpuRenderEnvironment {
            prepared: false,
            output_type: DataType::Unknown,
            cache: TextureCache::new(texture_cache_capacity_bytes, |_| 0),
        }
    }

    pub fn cache(&mut self) -> &mut TextureCache<String, NativeHandle> {
        &mut self.cache
    }
}

impl RenderEnvironment for CpuRenderEnvironment {
    fn init(&mut self) {
        self.prepared = true;
    }

    fn is_prepared(&self) -> bool {
        self.prepared
    }

    fn set_output_type(&mut self, data_type: DataType) {
        self.output_type = data_type;
    }

    fn gen_main_tex(&mut self, _cache_key: &str, _buffer: &BufferInfo) -> Result<NativeHandle> {
        Err(EffectError::CreateGpuResourceFailed)
    }

    fn convert_texture_to_buffer(&mut self, _tex: NativeHandle, _dst: &mut BufferInfo) -> Result<()> {
        Err(EffectError::CreateGpuResourceFailed)
    }

    fn begin_frame(&mut self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_environment_starts_unprepared_and_becomes_prepared_on_init() {
        let mut env = CpuRenderEnvironment::new(1024);
        assert!(!env.is_prepared());
        env.init();
        assert!(env.is_prepared());
    }

    #[test]
    fn cpu_environment_refuses_gpu_texture_operations() {
        let mut env = CpuRenderEnvironment::new(1024);
        let buf = BufferInfo::new(
            2,
            2,
            8,
            effect_core::PixelFormat::Rgba8888,
            effect_core::ColorSpace::Srgb,
            effect_core::HdrFormat::Sdr,
            effect_core::BackingKind::Heap,
        );
        assert!(env.gen_main_tex("key", &buf).is_err());
    }
}
