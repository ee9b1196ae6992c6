#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Header read and full decode must never panic.
    let header = bare_png::ImageInfo::from_bytes(data);

    let limits = bare_png::Limits {
        max_pixels: Some(1 << 24),
        ..Default::default()
    };
    match bare_png::DecodeRequest::new(data).with_limits(&limits).decode() {
        Ok(image) => {
            let info = header.expect("decodable stream must have a readable header");
            assert_eq!((info.width, info.height), (image.width, image.height));
            assert_eq!(
                image.pixels().len(),
                image.width as usize * image.height as usize * 4
            );
        }
        Err(err) => assert!(err.message().len() <= bare_png::MAX_MESSAGE_LEN),
    }
});
