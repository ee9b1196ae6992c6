#![no_main]
use libfuzzer_sys::fuzz_target;
use bare_png::*;

fuzz_target!(|data: &[u8]| {
    // First two bytes pick the geometry and settings, the rest are pixels.
    let [shape, settings, pixels @ ..] = data else {
        return;
    };
    let width = u32::from(shape % 32) + 1;
    let height = (pixels.len() / 4) as u32 / width;
    if height == 0 {
        return;
    }
    let pixels = &pixels[..(width * height * 4) as usize];

    let filter = match settings % 6 {
        0 => FilterStrategy::None,
        1 => FilterStrategy::Sub,
        2 => FilterStrategy::Up,
        3 => FilterStrategy::Average,
        4 => FilterStrategy::Paeth,
        _ => FilterStrategy::Adaptive,
    };
    let encoded = EncodeRequest::new()
        .with_compression(settings / 6 % 11)
        .with_filter(filter)
        .encode(pixels, width, height)
        .expect("valid RGBA8 input must encode");

    let decoded = decode(&encoded).expect("encoder output must decode");
    assert_eq!(decoded.width, width);
    assert_eq!(decoded.height, height);
    assert_eq!(decoded.pixels(), pixels, "roundtrip pixel mismatch");
});
