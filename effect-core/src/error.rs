//! The shared error type for the whole render pipeline.
//!
//! Every public entry point returns [`Result<T>`]. Variants are grouped by
//! the taxonomy in spec §7 (input / capability / resource / pipeline /
//! colorspace-and-gpu / VPE); [`EffectError::kind`] exposes that grouping
//! without requiring callers to match every variant.

use thiserror::Error;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    Input,
    Capability,
    Resource,
    Pipeline,
    ColorSpaceOrGpu,
    Vpe,
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum EffectError {
    // ---- input errors ----
    #[error("input buffer is null")]
    NullInput,
    #[error("invalid bitmap or graphics buffer")]
    InvalidBuffer,
    #[error("unsupported pixel format: {0:?}")]
    UnsupportedFormatType(crate::format::PixelFormat),
    #[error("unsupported data type: {0:?}")]
    UnsupportedDataType(crate::extra::DataType),
    #[error("unsupported file extension: {0}")]
    UnsupportedFileExtension(String),
    #[error("invalid parameter: {0}")]
    ParamInvalid(String),

    // ---- capability errors ----
    #[error("filter {filter} does not support execution path {path:?}")]
    UnsupportedIpTypeForEffect {
        filter: String,
        path: crate::dispatch::ExecutionPath,
    },
    #[error("filter {filter} does not support pixel format {format:?}")]
    UnsupportedFormatTypeForEffect {
        filter: String,
        format: crate::format::PixelFormat,
    },
    #[error("unsupported running type")]
    UnsupportedRunningType,
    #[error("unsupported configure key: {0}")]
    UnsupportedConfigKey(String),
    #[error("source and destination pixel formats do not match")]
    FormatMismatch,
    #[error("source and destination color spaces do not match")]
    ColorSpaceMismatch,
    #[error("colorspace {0:?} cannot be converted to a pipeline-supported colorspace")]
    ColorSpaceNotSupportConvert(crate::format::ColorSpace),
    #[error("input and output color space HDR-ness differ")]
    NotSupportInputOutputColorSpace,

    // ---- resource errors ----
    #[error("allocation size out of range")]
    AllocSizeOutOfRange,
    #[error("allocation failed")]
    AllocFailed,
    #[error("memcpy failed")]
    MemcpyFailed,
    #[error("invalid graphics buffer or file descriptor")]
    InvalidGraphicsBuffer,
    #[error("buffer does not allow dimension/format change")]
    BufferNotAllowChange,
    #[error("failed to set image info on output container")]
    SetImageInfoFailed,
    #[error("failed to create pixelmap")]
    CreatePixelMapFailed,
    #[error("failed to create image source")]
    CreateImageSourceFailed,
    #[error("failed to create image packer")]
    CreateImagePackerFailed,

    // ---- pipeline errors ----
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    #[error("invalid port: {0:?}")]
    InvalidPort(crate::graph::PortId),
    #[error("invalid filter callback")]
    InvalidFilterCallback,
    #[error("invalid operation in current state: {0}")]
    InvalidOperation(String),

    // ---- colorspace & GPU errors ----
    #[error("failed to get/set colorspace type")]
    ColorSpaceTypeFailed,
    #[error("failed to get/set native buffer metadata")]
    MetadataFailed,
    #[error("failed to create texture, framebuffer or program")]
    CreateGpuResourceFailed,
    #[error("draw call failed")]
    DrawFailed,
    #[error("framebuffer incomplete")]
    FramebufferIncomplete,

    // ---- VPE (video processing engine) errors ----
    #[error("invalid VPE instance")]
    VpeInvalidInstance,
    #[error("VPE compose failed")]
    VpeComposeFailed,
    #[error("VPE decompose failed")]
    VpeDecomposeFailed,
    #[error("VPE process image failed")]
    VpeProcessFailed,
}

impl EffectError {
    pub fn kind(&self) -> ErrorKind {
        use EffectError::*;
        match self {
            NullInput
            | InvalidBuffer
            | UnsupportedFormatType(_)
            | UnsupportedDataType(_)
            | UnsupportedFileExtension(_)
            | ParamInvalid(_) => ErrorKind::Input,

            UnsupportedIpTypeForEffect { .. }
            | UnsupportedFormatTypeForEffect { .. }
            | UnsupportedRunningType
            | UnsupportedConfigKey(_)
            | FormatMismatch
            | ColorSpaceMismatch
            | ColorSpaceNotSupportConvert(_)
            | NotSupportInputOutputColorSpace => ErrorKind::Capability,

            AllocSizeOutOfRange
            | AllocFailed
            | MemcpyFailed
            | InvalidGraphicsBuffer
            | BufferNotAllowChange
            | SetImageInfoFailed
            | CreatePixelMapFailed
            | CreateImageSourceFailed
            | CreateImagePackerFailed => ErrorKind::Resource,

            InvalidFilter(_) | InvalidPort(_) | InvalidFilterCallback | InvalidOperation(_) => {
                ErrorKind::Pipeline
            }

            ColorSpaceTypeFailed
            | MetadataFailed
            | CreateGpuResourceFailed
            | DrawFailed
            | FramebufferIncomplete => ErrorKind::ColorSpaceOrGpu,

            VpeInvalidInstance | VpeComposeFailed | VpeDecomposeFailed | VpeProcessFailed => {
                ErrorKind::Vpe
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, EffectError>;
