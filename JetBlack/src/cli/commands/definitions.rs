//! Subcommand enum definitions for CLI

use clap::Subcommand;
use std::path::PathBuf;

use crate::config::EngineVersion;

/// VIF model commands
#[derive(Subcommand)]
pub enum VifCommands {
    /// List the chunks of every mesh in a model file
    Inspect {
        /// Model file
        path: PathBuf,

        /// Write the raw chunks as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Decode a model file into mesh JSON
    Decode {
        /// Model file
        path: PathBuf,

        /// Width of the bound texture
        #[arg(long)]
        width: Option<u32>,

        /// Height of the bound texture
        #[arg(long)]
        height: Option<u32>,

        /// Fail on weight ranges past the end of a chunk
        #[arg(long)]
        strict_weights: bool,

        /// Output JSON file (prints a summary when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Texture commands
#[derive(Subcommand)]
pub enum TextureCommands {
    /// Decode a GIF-packet `.tex` file to PNG
    Decode {
        /// Texture file
        path: PathBuf,

        /// Output PNG file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Decode one texture of a world texture file to PNG
    World {
        /// World texture file
        path: PathBuf,

        /// Offset of the texture header
        #[arg(long, value_parser = parse_number)]
        offset: usize,

        /// Start of the containing chunk
        #[arg(long, value_parser = parse_number, default_value = "0")]
        chunk: usize,

        /// Engine the file comes from
        #[arg(long, value_enum)]
        engine: Option<EngineVersion>,

        /// Output PNG file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List the directory of a world texture file
    Entries {
        /// World texture file
        path: PathBuf,
    },
}

/// Animation commands
#[derive(Subcommand)]
pub enum AnimCommands {
    /// Decode an animation into JSON
    Decode {
        /// Animation file
        path: PathBuf,

        /// Engine the file comes from
        #[arg(long, value_enum)]
        engine: Option<EngineVersion>,

        /// Output JSON file (prints a summary when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// World commands
#[derive(Subcommand)]
pub enum WorldCommands {
    /// Decode a world file into JSON
    Decode {
        /// World file
        path: PathBuf,

        /// Matching world texture file
        #[arg(short, long)]
        textures: Option<PathBuf>,

        /// Engine the file comes from
        #[arg(long, value_enum)]
        engine: Option<EngineVersion>,

        /// Fail on weight ranges past the end of a chunk
        #[arg(long)]
        strict_weights: bool,

        /// Output JSON file (prints a summary when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory to write the world's textures to as PNG
        #[arg(long)]
        png_dir: Option<PathBuf>,
    },

    /// List the objects of an `.ob` file
    Objects {
        /// Object definition file
        path: PathBuf,

        /// Write the objects as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

/// Cutscene and dialog commands
#[derive(Subcommand)]
pub enum SceneCommands {
    /// Print the cast and keyframes of a cutscene
    Cutscene {
        /// Cutscene file
        path: PathBuf,

        /// Write the scene as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// List the entries of a dialog table
    Dialog {
        /// Dialog table file
        path: PathBuf,

        /// Write the entries as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

/// Script commands
#[derive(Subcommand)]
pub enum ScriptCommands {
    /// Disassemble a compiled script
    Disassemble {
        /// Script file
        path: PathBuf,

        /// Write the listing to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the decoded script as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

/// Accept decimal or `0x`-prefixed hexadecimal offsets.
fn parse_number(s: &str) -> Result<usize, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid number '{s}': {e}"))
}
