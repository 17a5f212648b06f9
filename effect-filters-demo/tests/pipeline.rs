use effect_core::{
    BackingKind, ColorSpace, ContainerRef, DataType, EffectBuffer, EffectPipeline, ExtraInfo, HdrFormat, PixelFormat,
};
use effect_filters_demo::{brightness_dispatch, contrast_dispatch};

fn make_input() -> EffectBuffer {
    let mut info = effect_core::BufferInfo::new(
        8,
        8,
        32,
        PixelFormat::Rgba8888,
        ColorSpace::Srgb,
        HdrFormat::Sdr,
        BackingKind::Heap,
    );
    info.raw_addr = Some(0xF00D);
    EffectBuffer::new(info, ExtraInfo::new(DataType::PixelMap, ContainerRef::None))
}

#[test]
fn brightness_then_contrast_runs_end_to_end_without_dst() {
    let mut pipeline = EffectPipeline::new();
    pipeline.set_source(make_input());

    let (dispatch, cap) = brightness_dispatch(30.0);
    pipeline.add_filter("Brightness", dispatch, cap);
    let (dispatch, cap) = contrast_dispatch(-20.0);
    pipeline.add_filter("Contrast", dispatch, cap);

    let out = pipeline.start(None).unwrap();
    assert_eq!(out.info.format, PixelFormat::Rgba8888);
    assert_eq!(out.info.color_space, ColorSpace::Srgb);
}

#[test]
fn brightness_then_contrast_writes_into_distinct_destination() {
    let mut pipeline = EffectPipeline::new();
    pipeline.set_source(make_input());

    let (dispatch, cap) = brightness_dispatch(10.0);
    pipeline.add_filter("Brightness", dispatch, cap);
    let (dispatch, cap) = contrast_dispatch(10.0);
    pipeline.add_filter("Contrast", dispatch, cap);

    let mut dst_info = effect_core::BufferInfo::new(
        8,
        8,
        32,
        PixelFormat::Rgba8888,
        ColorSpace::Srgb,
        HdrFormat::Sdr,
        BackingKind::Heap,
    );
    dst_info.raw_addr = Some(0xBEEF);
    let dst = EffectBuffer::new(dst_info, ExtraInfo::new(DataType::PixelMap, ContainerRef::None));

    let out = pipeline.start(Some(dst)).unwrap();
    assert_eq!(out.addr(), Some(0xBEEF));
}
