//! PNG container layer between the byte-stream adapters and zlib.
//!
//! [`read::ReadEngine`] pulls chunks through the bounds-checked reader and
//! inflates one scanline at a time; [`write::WriteEngine`] filters and
//! deflates scanlines into IDAT chunks through the growable writer. zlib
//! itself is `miniz_oxide`'s streaming API.

pub(crate) mod chunk;
pub(crate) mod filter;
pub(crate) mod header;
pub(crate) mod interlace;
pub(crate) mod read;
pub(crate) mod write;

/// The 8-byte PNG signature.
pub(crate) const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];
