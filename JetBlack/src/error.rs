//! Error types for `JetBlack`

use std::path::PathBuf;

use thiserror::Error;

/// The error type for `JetBlack` decoding operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A read ran past the end of the supplied byte window.
    #[error("unexpected end of data at offset {offset:#x}: needed {needed} bytes, window is {len} bytes")]
    UnexpectedEof {
        /// Offset of the read, relative to the window start.
        offset: usize,
        /// Number of bytes the read required.
        needed: usize,
        /// Length of the window.
        len: usize,
    },

    /// An offset field points outside the buffer it indexes.
    #[error("{field} offset {offset:#x} is outside the {len} byte buffer")]
    OffsetOutOfRange {
        /// Name of the header field holding the offset.
        field: &'static str,
        /// The resolved offset.
        offset: i64,
        /// Length of the buffer.
        len: usize,
    },

    // ==================== VIF / Mesh Errors ====================
    /// Unknown VIF command in the stream.
    #[error("unknown VIF command {command:#04x} at offset {offset:#x}")]
    UnknownVifCommand {
        /// The 7-bit command code.
        command: u8,
        /// Offset of the command word.
        offset: usize,
    },

    /// UNPACK with a `vn`/`vl` combination this format never uses.
    #[error("unsupported UNPACK vn={vn}, vl={vl} at offset {offset:#x}")]
    UnsupportedUnpack {
        /// Vector count selector.
        vn: u8,
        /// Vector length selector.
        vl: u8,
        /// Offset of the command word.
        offset: usize,
    },

    /// v4-32 UNPACK carrying a GIF tag count other than 1 or 2.
    #[error("expected 1 or 2 GIF tags at offset {offset:#x}, found {count}")]
    UnexpectedGifTagCount {
        /// Number of tags announced by the command.
        count: u8,
        /// Offset of the payload.
        offset: usize,
    },

    /// A chunk whose primitive is not a triangle strip.
    #[error("chunk {chunk} uses primitive type {prim:#x}, only triangle strips are supported")]
    UnsupportedPrimitive {
        /// Index of the chunk in the decoded list.
        chunk: usize,
        /// The GIF `prim` field.
        prim: u16,
    },

    /// A strip references a vertex that the chunk does not contain.
    #[error("chunk {chunk} references vertex {vertex}, but only {count} are available")]
    VertexOutOfRange {
        /// Index of the chunk.
        chunk: usize,
        /// The offending vertex index.
        vertex: usize,
        /// Number of vertices available.
        count: usize,
    },

    /// A strip position has no matching UV entry.
    #[error("chunk {chunk} has no UV for strip position {index} ({count} UVs)")]
    UvOutOfRange {
        /// Index of the chunk.
        chunk: usize,
        /// Strip position.
        index: usize,
        /// Number of UVs in the chunk.
        count: usize,
    },

    /// A vertex weight range extends past the chunk in strict mode.
    #[error("chunk {chunk} vertex weight range {start}..={end} exceeds {count} vertices")]
    VertexWeightOutOfRange {
        /// Index of the chunk.
        chunk: usize,
        /// First vertex of the range.
        start: usize,
        /// Last vertex of the range.
        end: usize,
        /// Number of vertices in the chunk.
        count: usize,
    },

    /// A weighted chunk has a vertex that no weight range covers.
    #[error("chunk {chunk} has no vertex weight covering vertex {vertex}")]
    VertexWeightMissing {
        /// Index of the chunk.
        chunk: usize,
        /// Chunk-local vertex index.
        vertex: usize,
    },

    /// A strip index table entry lies outside the GIF loop count.
    #[error("chunk {chunk} strip slot {slot} is outside the {nloop} entry strip table")]
    StripIndexOutOfRange {
        /// Index of the chunk.
        chunk: usize,
        /// The computed strip slot.
        slot: usize,
        /// The GIF `nloop`.
        nloop: usize,
    },

    /// The strip remap table announces more pairs than it holds.
    #[error("chunk {chunk} remap table announces {pairs} pairs but holds {len} entries")]
    ExtraVlocsTruncated {
        /// Index of the chunk.
        chunk: usize,
        /// Pair count from entry 0.
        pairs: usize,
        /// Entries present.
        len: usize,
    },

    // ==================== Texture Errors ====================
    /// GS memory address outside the emulated 4 MiB.
    #[error("GS address {address:#x} is outside video memory")]
    GsAddressOutOfRange {
        /// The computed byte address.
        address: usize,
    },

    /// Huffman code longer than the table supports.
    #[error("Huffman code at bit {bit} of block {block_offset:#x} is longer than {max_bits} bits")]
    HuffmanOverflow {
        /// Offset of the block data.
        block_offset: usize,
        /// Bit position of the code.
        bit: usize,
        /// Longest code length the table allows.
        max_bits: u32,
    },

    /// Back-reference to a pixel before the start of the block.
    #[error("Huffman back-reference {command:#x} at pixel {pixel} points before the block start")]
    HuffmanBackReference {
        /// The decoded pixel command.
        command: u16,
        /// Pixel index inside the block.
        pixel: usize,
    },

    /// Texture layout that this decoder does not understand.
    #[error("unsupported texture layout: {message}")]
    UnsupportedTexture {
        /// Description of the layout.
        message: String,
    },

    /// Requested texture entry is beyond the chunk's entry count.
    #[error("texture {index} requested, chunk holds {count}")]
    TextureIndexOutOfRange {
        /// The requested entry.
        index: usize,
        /// Entries in the chunk.
        count: usize,
    },

    /// Failed to encode PNG image.
    #[error("failed to encode PNG: {message}")]
    PngEncodeFailed {
        /// The encoding error message.
        message: String,
    },

    // ==================== Animation Errors ====================
    /// Animation bone index out of range.
    #[error("animation references bone {bone}, skeleton has {num_bones}")]
    BoneOutOfRange {
        /// The referenced bone.
        bone: usize,
        /// Bones in the skeleton.
        num_bones: usize,
    },

    /// Skeleton parent table is not in parent-before-child order.
    #[error("bone {bone} has parent slot {parent}, which is not an earlier bone")]
    InvalidSkeleton {
        /// The child bone.
        bone: usize,
        /// The parent slot (0 = root).
        parent: usize,
    },

    /// Animation header field with an impossible value.
    #[error("invalid animation header: {message}")]
    InvalidAnimation {
        /// Description of what is invalid.
        message: String,
    },

    /// The engine version does not use this decoder.
    #[error("{decoder} does not support engine version {version}")]
    EngineNotSupported {
        /// Name of the decoder.
        decoder: &'static str,
        /// The requested engine version.
        version: String,
    },

    // ==================== World / Script Errors ====================
    /// A header or table whose fields cannot describe a valid file.
    #[error("invalid {format} data: {message}")]
    InvalidHeader {
        /// Kind of file being decoded.
        format: &'static str,
        /// Description of what is invalid.
        message: String,
    },

    /// Script opcode with no known operand layout.
    #[error("unknown script opcode {opcode:#x} at {address:#06x}")]
    UnknownScriptOpcode {
        /// The opcode word.
        opcode: i32,
        /// Byte address inside the instruction block.
        address: usize,
    },

    // ==================== Configuration Errors ====================
    /// Failed to parse a TOML options file.
    #[error("invalid options file {path}: {message}")]
    InvalidOptions {
        /// Path of the options file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    // ==================== Parsing Errors ====================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Directory traversal error.
    #[error("directory walk error: {0}")]
    WalkDirError(String),
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDirError(err.to_string())
    }
}

/// A specialized Result type for `JetBlack` operations.
pub type Result<T> = std::result::Result<T, Error>;
