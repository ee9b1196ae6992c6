//! Color type and bit depth matrix against streams written by the `png`
//! crate, and our encoder's output read back by it.

use std::io::Cursor;

use bare_png::*;

struct Case {
    color: png::ColorType,
    depth: u8,
    palette: Option<Vec<[u8; 3]>>,
    trns: Option<Vec<u8>>,
}

impl Case {
    fn new(color: png::ColorType, depth: u8) -> Self {
        Self {
            color,
            depth,
            palette: None,
            trns: None,
        }
    }

    fn channels(&self) -> usize {
        match self.color {
            png::ColorType::Grayscale | png::ColorType::Indexed => 1,
            png::ColorType::GrayscaleAlpha => 2,
            png::ColorType::Rgb => 3,
            png::ColorType::Rgba => 4,
            #[allow(unreachable_patterns)]
            other => panic!("unexpected color type {other:?}"),
        }
    }

    fn samples(&self, w: u32, h: u32) -> Vec<u16> {
        let max = match &self.palette {
            Some(p) => p.len() as u32,
            None => 1 << self.depth,
        };
        let mut state = 0x9E37_79B9u32 ^ (u32::from(self.depth) << 8);
        (0..w as usize * h as usize * self.channels())
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state % max) as u16
            })
            .collect()
    }

    /// Reference stream written by the `png` crate.
    fn encode(&self, samples: &[u16], w: u32, h: u32) -> Vec<u8> {
        let row_samples = w as usize * self.channels();
        let mut data = Vec::new();
        for row in samples.chunks_exact(row_samples) {
            data.extend(pack(row, self.depth));
        }

        let mut out = Vec::new();
        let mut encoder = png::Encoder::new(&mut out, w, h);
        encoder.set_color(self.color);
        encoder.set_depth(png::BitDepth::from_u8(self.depth).unwrap());
        if let Some(palette) = &self.palette {
            encoder.set_palette(palette.iter().flatten().copied().collect::<Vec<u8>>());
        }
        if let Some(trns) = &self.trns {
            encoder.set_trns(trns.clone());
        }
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(&data).unwrap();
        writer.finish().unwrap();
        out
    }

    /// RGBA8 straight from the PNG rules.
    fn expected(&self, samples: &[u16]) -> Vec<u8> {
        let to8 = |v: u16| -> u8 {
            match self.depth {
                16 => (v >> 8) as u8,
                8 => v as u8,
                d => (u32::from(v) * 255 / ((1 << d) - 1)) as u8,
            }
        };
        let key = |i: usize| {
            self.trns
                .as_ref()
                .map(|t| u16::from_be_bytes([t[2 * i], t[2 * i + 1]]))
        };
        let mut out = Vec::new();
        for px in samples.chunks_exact(self.channels()) {
            let rgba = match self.color {
                png::ColorType::Grayscale => {
                    let g = to8(px[0]);
                    [g, g, g, if key(0) == Some(px[0]) { 0 } else { 255 }]
                }
                png::ColorType::GrayscaleAlpha => {
                    let g = to8(px[0]);
                    [g, g, g, to8(px[1])]
                }
                png::ColorType::Rgb => {
                    let hit = (0..3).all(|i| key(i) == Some(px[i]));
                    [to8(px[0]), to8(px[1]), to8(px[2]), if hit { 0 } else { 255 }]
                }
                png::ColorType::Rgba => [to8(px[0]), to8(px[1]), to8(px[2]), to8(px[3])],
                png::ColorType::Indexed => {
                    let i = usize::from(px[0]);
                    let [r, g, b] = self.palette.as_ref().unwrap()[i];
                    let a = self.trns.as_ref().and_then(|t| t.get(i).copied()).unwrap_or(255);
                    [r, g, b, a]
                }
                #[allow(unreachable_patterns)]
                other => panic!("unexpected color type {other:?}"),
            };
            out.extend_from_slice(&rgba);
        }
        out
    }
}

fn pack(samples: &[u16], depth: u8) -> Vec<u8> {
    match depth {
        16 => samples.iter().flat_map(|s| s.to_be_bytes()).collect(),
        8 => samples.iter().map(|&s| s as u8).collect(),
        d => samples
            .chunks(8 / usize::from(d))
            .map(|group| {
                group.iter().enumerate().fold(0u8, |b, (i, &s)| {
                    b | ((s as u8) << (8 - usize::from(d) * (i + 1)))
                })
            })
            .collect(),
    }
}

fn palette(len: usize) -> Vec<[u8; 3]> {
    (0..len)
        .map(|i| [(i * 3) as u8, 255 - i as u8, (i * 11) as u8])
        .collect()
}

fn check(case: &Case) {
    for (w, h) in [(1, 1), (7, 3), (33, 17)] {
        let samples = case.samples(w, h);
        let stream = case.encode(&samples, w, h);
        let image = decode(&stream).unwrap_or_else(|e| {
            panic!("{:?} {}-bit {w}x{h}: {e}", case.color, case.depth)
        });
        assert_eq!(image.pixels().len(), (w * h * 4) as usize);
        assert_eq!(
            image.pixels(),
            &case.expected(&samples)[..],
            "{:?} {}-bit {w}x{h}",
            case.color,
            case.depth
        );
    }
}

#[test]
fn grayscale_all_depths() {
    for depth in [1, 2, 4, 8, 16] {
        check(&Case::new(png::ColorType::Grayscale, depth));
    }
}

#[test]
fn grayscale_with_color_key() {
    for (depth, key) in [(1u8, 1u16), (4, 9), (8, 200), (16, 0x0102)] {
        let mut case = Case::new(png::ColorType::Grayscale, depth);
        case.trns = Some(key.to_be_bytes().to_vec());
        check(&case);
    }
}

#[test]
fn gray_alpha() {
    check(&Case::new(png::ColorType::GrayscaleAlpha, 8));
    check(&Case::new(png::ColorType::GrayscaleAlpha, 16));
}

#[test]
fn truecolor() {
    for color in [png::ColorType::Rgb, png::ColorType::Rgba] {
        for depth in [8, 16] {
            check(&Case::new(color, depth));
        }
    }
}

#[test]
fn truecolor_with_color_key() {
    let mut case = Case::new(png::ColorType::Rgb, 8);
    case.trns = Some(vec![0, 10, 0, 20, 0, 30]);
    check(&case);
    let mut case = Case::new(png::ColorType::Rgb, 16);
    case.trns = Some(vec![1, 2, 3, 4, 5, 6]);
    check(&case);
}

#[test]
fn indexed_all_depths() {
    for depth in [1u8, 2, 4, 8] {
        let mut case = Case::new(png::ColorType::Indexed, depth);
        case.palette = Some(palette(1 << depth));
        check(&case);
    }
}

#[test]
fn indexed_with_partial_alpha_table() {
    let mut case = Case::new(png::ColorType::Indexed, 4);
    case.palette = Some(palette(12));
    case.trns = Some(vec![0, 50, 100, 150]);
    check(&case);
}

#[test]
fn header_info_matches_reference() {
    let mut case = Case::new(png::ColorType::Indexed, 2);
    case.palette = Some(palette(4));
    case.trns = Some(vec![0]);
    let stream = case.encode(&case.samples(5, 6), 5, 6);
    let info = ImageInfo::from_bytes(&stream).unwrap();
    assert_eq!((info.width, info.height), (5, 6));
    assert_eq!(info.format.bit_depth, 2);
    assert_eq!(info.format.color_type, ColorType::Palette);
    assert!(info.format.has_transparency);
}

#[test]
fn reference_decoder_reads_our_output() {
    let (w, h) = (23u32, 11u32);
    let pixels: Vec<u8> = (0..w * h * 4).map(|i| (i * 37 % 256) as u8).collect();
    for filter in [FilterStrategy::None, FilterStrategy::Paeth, FilterStrategy::Adaptive] {
        let encoded = EncodeRequest::new()
            .with_filter(filter)
            .encode(&pixels, w, h)
            .unwrap();
        let decoder = png::Decoder::new(Cursor::new(&encoded[..]));
        let mut reader = decoder.read_info().unwrap();
        let info = reader.info();
        assert_eq!(info.color_type, png::ColorType::Rgba);
        assert_eq!(info.bit_depth, png::BitDepth::Eight);
        assert!(!info.interlaced);
        let mut buf = vec![0u8; (w * h * 4) as usize];
        reader.next_frame(&mut buf).unwrap();
        assert_eq!(buf, pixels, "{filter:?}");
    }
}
