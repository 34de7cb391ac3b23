//! Texture decoding
//!
//! Two texture sources are supported:
//!
//! - [`tex`]: GIF packets that upload palettised data into GS memory,
//!   replayed through [`GsMemory`] and read back in the sampled format.
//! - [`world`]: Huffman-compressed 16x16 blocks of palette indices.

pub mod gs_memory;
pub mod huffman;
pub mod palette;
pub mod pixels;
pub mod tex;
pub mod world;

pub use gs_memory::{GsMemory, expand_4bit};
pub use huffman::HuffmanBlockDecoder;
pub use palette::{PalEntry, read_palette, unswizzle_palette};
pub use pixels::PixelBuffer;
pub use tex::decode_tex;
pub use world::{TexEntry, WorldTexFile};
