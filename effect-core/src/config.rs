//! Engine configuration (spec §6 "Configure keys"), plus the render-thread
//! and texture-cache constants from §4.7 so they aren't buried as magic
//! numbers elsewhere.

use crate::capability::RunningType;
use crate::error::{EffectError, Result};

/// `runningType` / `flushSurfaceBuffer` configure keys, plus the ambient
/// tuning constants grounded on `render_thread.h`/`render_fifo_cache.h`.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub running_type: RunningType,
    pub flush_surface_buffer: bool,
    /// Render-thread bounded FIFO queue depth (spec §4.7, default 8).
    pub render_queue_depth: usize,
    /// Render-thread idle timeout before running the idle task (spec §4.7,
    /// default 2.5s).
    pub idle_timeout_ms: u64,
    /// Texture cache hard cap in bytes (spec §4.7, ≈800 MiB).
    pub texture_cache_hard_cap_bytes: u64,
    /// Texture cache soft cap in bytes (spec §4.7, ≈80 MiB).
    pub texture_cache_soft_cap_bytes: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            running_type: RunningType::Default,
            flush_surface_buffer: false,
            render_queue_depth: 8,
            idle_timeout_ms: 2500,
            texture_cache_hard_cap_bytes: 800 * 1024 * 1024,
            texture_cache_soft_cap_bytes: 80 * 1024 * 1024,
        }
    }
}

/// A single configure-key/value pair, as accepted by `Configure` (spec §6).
#[derive(Clone, Debug)]
pub enum ConfigureValue {
    RunningType(RunningType),
    FlushSurfaceBuffer(bool),
}

impl EngineConfig {
    /// Applying the same key/value twice is a no-op the second time
    /// (spec §8 Law "Idempotent configure").
    pub fn configure(&mut self, value: ConfigureValue) -> Result<()> {
        match value {
            ConfigureValue::RunningType(rt) => {
                self.running_type = rt;
                Ok(())
            }
            ConfigureValue::FlushSurfaceBuffer(flush) => {
                self.flush_surface_buffer = flush;
                Ok(())
            }
        }
    }

    pub fn configure_by_key(&mut self, key: &str, raw_value: &str) -> Result<()> {
        match key {
            "runningType" => {
                let rt = match raw_value {
                    "0" | "DEFAULT" => RunningType::Default,
                    "1" | "FOREGROUND" => RunningType::Foreground,
                    "2" | "BACKGROUND" => RunningType::Background,
                    _ => return Err(EffectError::ParamInvalid(raw_value.to_string())),
                };
                self.configure(ConfigureValue::RunningType(rt))
            }
            "flushSurfaceBuffer" => {
                let flush = raw_value
                    .parse::<bool>()
                    .map_err(|_| EffectError::ParamInvalid(raw_value.to_string()))?;
                self.configure(ConfigureValue::FlushSurfaceBuffer(flush))
            }
            other => Err(EffectError::UnsupportedConfigKey(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuring_running_type_twice_is_idempotent() {
        let mut cfg = EngineConfig::default();
        cfg.configure(ConfigureValue::RunningType(RunningType::Foreground)).unwrap();
        let after_first = cfg.running_type;
        cfg.configure(ConfigureValue::RunningType(RunningType::Foreground)).unwrap();
        assert_eq!(after_first, cfg.running_type);
        assert_eq!(cfg.running_type, RunningType::Foreground);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let mut cfg = EngineConfig::default();
        assert!(cfg.configure_by_key("bogus", "1").is_err());
    }
}
