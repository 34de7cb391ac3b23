pub mod anim;
pub mod batch;
pub mod definitions;
pub mod execute;
pub mod scene;
pub mod script;
pub mod texture;
pub mod vif;
pub mod world;

use clap::Subcommand;
use std::path::PathBuf;

use crate::batch::AssetKind;
pub use definitions::{
    AnimCommands, SceneCommands, ScriptCommands, TextureCommands, VifCommands, WorldCommands,
};

#[derive(Subcommand)]
pub enum Commands {
    /// VIF model commands
    Vif {
        #[command(subcommand)]
        command: VifCommands,
    },

    /// Texture commands
    Texture {
        #[command(subcommand)]
        command: TextureCommands,
    },

    /// Animation commands
    Anim {
        #[command(subcommand)]
        command: AnimCommands,
    },

    /// World geometry commands
    World {
        #[command(subcommand)]
        command: WorldCommands,
    },

    /// Cutscene and dialog commands
    Scene {
        #[command(subcommand)]
        command: SceneCommands,
    },

    /// Level script commands
    Script {
        #[command(subcommand)]
        command: ScriptCommands,
    },

    /// Decode every asset of one kind in a directory
    Batch {
        /// Directory to search recursively
        source: PathBuf,

        /// Asset kind to decode
        #[arg(value_enum)]
        kind: AssetKind,

        /// Output directory
        destination: PathBuf,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },
}
