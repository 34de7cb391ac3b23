//! Shared binary reading helpers

mod bitstream;
mod reader;

pub use bitstream::BitstreamReader;
pub use reader::ByteReader;

/// Round `value` up to a multiple of `alignment` (a power of two).
#[must_use]
pub const fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}
