//! Output conversion
//!
//! Turns decoded assets into files other tools can read:
//! - pixel buffers to PNG
//! - meshes, chunks and animations to JSON

mod json;
mod png;

pub use json::{to_json_string, write_json};
pub use png::{pixel_buffer_to_png_bytes, write_png};
