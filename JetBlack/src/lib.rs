//! # JetBlack
//!
//! A pure-Rust library for the asset formats of the PS2 engine behind
//! Baldur's Gate: Dark Alliance, Champions: Return to Arms and Justice
//! League Heroes.
//!
//! ## Supported Formats
//!
//! - **VIF models** - vector-unit command streams rebuilt into triangle meshes
//! - **Textures** - GIF-packet uploads through emulated GS memory, and
//!   Huffman-compressed world textures
//! - **Animations** - delta-compressed skeletal animation with forward kinematics
//! - **Worlds** - placed world geometry with its textures, and object definitions
//! - **Cutscenes and dialog** - scene keyframes and voice clip tables
//! - **Scripts** - level script bytecode with a disassembler
//!
//! ## Quick Start
//!
//! ### Decoding a Model
//!
//! ```no_run
//! use jetblack::prelude::*;
//!
//! let data = std::fs::read("barrel.vif")?;
//! let meshes = decode_model(&data, &MeshAssembler::new(128, 64))?;
//! println!("{} triangles", meshes[0].triangle_count());
//! # Ok::<(), jetblack::Error>(())
//! ```
//!
//! ### Decoding an Animation
//!
//! ```no_run
//! use jetblack::prelude::*;
//!
//! let data = std::fs::read("walk.anm")?;
//! let anim = decode_animation(EngineVersion::DarkAlliance, &data)?;
//! let hand = anim.fk_pose(10, 12);
//! # Ok::<(), jetblack::Error>(())
//! ```
//!
//! ### Decoding a World
//!
//! ```no_run
//! use jetblack::prelude::*;
//!
//! let options = DecodeOptions::new().with_engine_version(EngineVersion::ReturnToArms);
//! let textures = WorldTexFile::open(options.engine_version, "town.tex")?;
//! let world = decode_world(&std::fs::read("town.world")?, Some(&textures), &options)?;
//! println!("{} elements, {} triangles", world.elements.len(), world.triangle_count());
//! # Ok::<(), jetblack::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `jetblack` command-line binary

pub mod batch;
pub mod config;
pub mod converter;
pub mod error;
pub mod formats;
pub mod utils;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::{DecodeOptions, EngineVersion};
    pub use crate::error::{Error, Result};

    pub use crate::formats::anim::{AnimData, AnimMeshPose, BonePose, decode_animation};
    pub use crate::formats::gif::{GifFlag, GifTag};
    pub use crate::formats::texture::{
        GsMemory, HuffmanBlockDecoder, PalEntry, PixelBuffer, WorldTexFile, decode_tex,
    };
    pub use crate::formats::vif::{Chunk, Mesh, MeshAssembler, decode_model, read_chunks};
    pub use crate::formats::world::{ObjectDef, WorldData, WorldElement, decode_objects, decode_world};
    pub use crate::formats::scene::{Cutscene, DialogEntry, decode_cutscene, decode_dialog};
    pub use crate::formats::script::{Script, decode_script};

    pub use crate::batch::{AssetKind, BatchDecodeResult, batch_decode, find_asset_files};
    pub use crate::converter::{write_json, write_png};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
