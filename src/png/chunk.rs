//! Chunk framing: `length | type | data | crc32`.

use core::fmt;

use crate::error::PngError;
use crate::io::{ByteReader, ByteWriter};

/// Largest chunk payload the format permits (2^31 - 1).
pub(crate) const MAX_CHUNK_LEN: u32 = 0x7FFF_FFFF;

/// Four-letter chunk tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ChunkType(pub [u8; 4]);

impl ChunkType {
    pub(crate) const IHDR: Self = Self(*b"IHDR");
    pub(crate) const PLTE: Self = Self(*b"PLTE");
    pub(crate) const TRNS: Self = Self(*b"tRNS");
    pub(crate) const IDAT: Self = Self(*b"IDAT");
    pub(crate) const IEND: Self = Self(*b"IEND");

    /// Critical chunks have an uppercase first letter.
    pub(crate) fn is_critical(self) -> bool {
        self.0[0] & 0x20 == 0
    }

    fn is_well_formed(self) -> bool {
        self.0.iter().all(u8::is_ascii_alphabetic)
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkType({self})")
    }
}

/// One chunk whose CRC has been checked, payload borrowed from the input.
#[derive(Debug)]
pub(crate) struct Chunk<'a> {
    pub kind: ChunkType,
    pub data: &'a [u8],
}

const CRC_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut n = 0;
    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 { 0xEDB8_8320 ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[n] = c;
        n += 1;
    }
    table
};

fn crc_update(mut crc: u32, bytes: &[u8]) -> u32 {
    for &b in bytes {
        crc = CRC_TABLE[((crc ^ u32::from(b)) & 0xFF) as usize] ^ (crc >> 8);
    }
    crc
}

/// CRC-32 over the chunk type and payload, as stored after each chunk.
pub(crate) fn chunk_crc(kind: ChunkType, data: &[u8]) -> u32 {
    crc_update(crc_update(0xFFFF_FFFF, &kind.0), data) ^ 0xFFFF_FFFF
}

/// Pull the next chunk from `reader`.
///
/// A CRC mismatch on a critical chunk is fatal. On an ancillary chunk the
/// chunk is still returned with `crc_ok == false` so the caller can drop it.
pub(crate) fn read_chunk<'a>(reader: &mut ByteReader<'a>) -> Result<(Chunk<'a>, bool), PngError> {
    let len = reader.read_u32_be()?;
    let kind = ChunkType(reader.read_array()?);
    if len > MAX_CHUNK_LEN {
        return Err(PngError::malformed(kind, "length exceeds 2^31-1"));
    }
    if !kind.is_well_formed() {
        return Err(PngError::malformed(kind, "chunk type is not ASCII letters"));
    }
    let data = reader.read(len as usize)?;
    let stored = reader.read_u32_be()?;
    let crc_ok = stored == chunk_crc(kind, data);
    if !crc_ok && kind.is_critical() {
        return Err(PngError::CrcMismatch(alloc::format!("{kind}")));
    }
    log::trace!("chunk {kind} ({len} bytes) at offset {}", reader.offset());
    Ok((Chunk { kind, data }, crc_ok))
}

pub(crate) fn write_chunk(
    writer: &mut ByteWriter,
    kind: ChunkType,
    data: &[u8],
) -> Result<(), PngError> {
    let len = u32::try_from(data.len())
        .ok()
        .filter(|&len| len <= MAX_CHUNK_LEN)
        .ok_or_else(|| PngError::malformed(kind, "payload too large"))?;
    writer.write(&len.to_be_bytes())?;
    writer.write(&kind.0)?;
    writer.write(data)?;
    writer.write(&chunk_crc(kind, data).to_be_bytes())
}
