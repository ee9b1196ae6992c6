#!/usr/bin/env -S cargo +nightly -Zscript
//! Generate seed corpus files for fuzzing.
//! Run: cargo +nightly -Zscript fuzz/generate_seeds.rs

fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &b in bytes {
        crc ^= u32::from(b);
        for _ in 0..8 {
            crc = if crc & 1 != 0 { 0xEDB8_8320 ^ (crc >> 1) } else { crc >> 1 };
        }
    }
    !crc
}

fn adler32(bytes: &[u8]) -> u32 {
    let (mut a, mut b) = (1u32, 0u32);
    for &x in bytes {
        a = (a + u32::from(x)) % 65521;
        b = (b + a) % 65521;
    }
    (b << 16) | a
}

/// zlib stream of one stored deflate block.
fn zlib_stored(raw: &[u8]) -> Vec<u8> {
    let len = raw.len() as u16;
    let mut out = vec![0x78, 0x01, 0x01];
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&(!len).to_le_bytes());
    out.extend_from_slice(raw);
    out.extend_from_slice(&adler32(raw).to_be_bytes());
    out
}

fn chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    let start = out.len();
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    let crc = crc32(&out[start..]);
    out.extend_from_slice(&crc.to_be_bytes());
}

fn png(w: u32, h: u32, depth: u8, color: u8, interlace: u8, extra: &[(&[u8; 4], Vec<u8>)], raw: &[u8]) -> Vec<u8> {
    let mut out = b"\x89PNG\r\n\x1a\n".to_vec();
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&w.to_be_bytes());
    ihdr.extend_from_slice(&h.to_be_bytes());
    ihdr.extend_from_slice(&[depth, color, 0, 0, interlace]);
    chunk(&mut out, b"IHDR", &ihdr);
    for (kind, data) in extra {
        chunk(&mut out, kind, data);
    }
    chunk(&mut out, b"IDAT", &zlib_stored(raw));
    chunk(&mut out, b"IEND", &[]);
    out
}

fn main() {
    use std::fs;
    let dir = "fuzz/corpus/fuzz_decode";
    fs::create_dir_all(dir).unwrap();

    // RGBA8 2x2, filters None and Sub
    let raw = [0, 255, 0, 0, 255, 0, 255, 0, 128, 1, 0, 0, 255, 255, 0, 0, 0, 0];
    fs::write(format!("{dir}/rgba8_2x2.png"), png(2, 2, 8, 6, 0, &[], &raw)).unwrap();

    // Gray 1-bit 8x1
    fs::write(format!("{dir}/gray1_8x1.png"), png(8, 1, 1, 0, 0, &[], &[0, 0b1010_0110])).unwrap();

    // Gray 16-bit 1x1 with tRNS key
    let trns = vec![0x12, 0x34];
    fs::write(
        format!("{dir}/gray16_trns.png"),
        png(1, 1, 16, 0, 0, &[(b"tRNS", trns)], &[0, 0x12, 0x34]),
    )
    .unwrap();

    // Palette 2-bit 4x1 with partial alpha table
    let plte = vec![255, 0, 0, 0, 255, 0, 0, 0, 255];
    let alpha = vec![0, 128];
    fs::write(
        format!("{dir}/palette2_trns.png"),
        png(4, 1, 2, 3, 0, &[(b"PLTE", plte), (b"tRNS", alpha)], &[0, 0b0001_1011]),
    )
    .unwrap();

    // RGB8 3x3 Adam7: passes 1, 2 (empty), 3 (empty), 4, 5, 6, 7
    let raw_adam7 = [
        0, 1, 2, 3, // pass 1: (0,0)
        0, 4, 5, 6, // pass 4: (2,0)
        0, 7, 8, 9, 10, 11, 12, // pass 5: (0,2), (2,2)
        0, 13, 14, 15, // pass 6: (1,0)
        0, 16, 17, 18, // pass 6: (1,2)
        0, 19, 20, 21, 22, 23, 24, 25, 26, 27, // pass 7: row 1
    ];
    fs::write(format!("{dir}/rgb8_adam7_3x3.png"), png(3, 3, 8, 2, 1, &[], &raw_adam7)).unwrap();

    // Ancillary chunk before IDAT
    let text = b"Comment\0seed".to_vec();
    fs::write(
        format!("{dir}/with_text.png"),
        png(1, 1, 8, 6, 0, &[(b"tEXt", text)], &[0, 1, 2, 3, 4]),
    )
    .unwrap();

    // Truncated/malformed seeds for edge coverage
    fs::write(format!("{dir}/empty.bin"), b"").unwrap();
    fs::write(format!("{dir}/signature_only.bin"), b"\x89PNG\r\n\x1a\n").unwrap();
    let full = png(2, 2, 8, 6, 0, &[], &raw);
    fs::write(format!("{dir}/truncated_idat.bin"), &full[..full.len() - 20]).unwrap();

    println!("Generated seed corpus in {dir}/");
}
