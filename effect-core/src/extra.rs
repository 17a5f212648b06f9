//! C1: `ExtraInfo` — the owning-container side of a buffer (spec §3).

use std::path::PathBuf;
use std::time::Duration;

/// The kind of external container a buffer is materialized from/to (spec §6).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DataType {
    PixelMap,
    Surface,
    SurfaceBuffer,
    Uri,
    Path,
    Tex,
    NativeWindow,
    Picture,
    Unknown,
}

/// A reference to the concrete external container backing a buffer.
///
/// The concrete bitmap/picture/file/window types are external collaborators
/// (spec §1); this engine only needs to know which kind of reference it
/// holds and pass it through to the sink.
#[derive(Clone, Debug)]
pub enum ContainerRef {
    PixelMap { id: u64 },
    Picture { id: u64 },
    Uri(String),
    Path(PathBuf),
    NativeWindow { id: u64 },
    Texture { id: u64 },
    /// Streaming source: each producer buffer carries its own timestamp.
    Surface { timestamp: Duration },
    None,
}

/// Owning-container metadata for a buffer (spec §3).
#[derive(Clone, Debug)]
pub struct ExtraInfo {
    pub data_type: DataType,
    pub container: ContainerRef,
}

impl ExtraInfo {
    pub fn new(data_type: DataType, container: ContainerRef) -> Self {
        ExtraInfo { data_type, container }
    }

    /// File-type inputs/outputs (`Uri`/`Path`) must end in one of these
    /// extensions (spec §4.11).
    pub fn has_supported_file_extension(path: &str) -> bool {
        let lower = path.to_ascii_lowercase();
        [".jpg", ".jpeg", ".heic", ".heif"]
            .iter()
            .any(|ext| lower.ends_with(ext))
    }
}
