//! Execute implementations for CLI commands

use super::{
    AnimCommands, Commands, SceneCommands, ScriptCommands, TextureCommands, VifCommands, WorldCommands, anim,
    batch, scene, script, texture, vif, world,
};
use crate::config::DecodeOptions;

impl Commands {
    /// Execute the selected command.
    ///
    /// # Errors
    /// Returns an error if the command execution fails.
    pub fn execute(&self, options: &DecodeOptions) -> anyhow::Result<()> {
        match self {
            Commands::Vif { command } => command.execute(options),
            Commands::Texture { command } => command.execute(options),
            Commands::Anim { command } => command.execute(options),
            Commands::World { command } => command.execute(options),
            Commands::Scene { command } => command.execute(),
            Commands::Script { command } => command.execute(),
            Commands::Batch {
                source,
                kind,
                destination,
                quiet,
            } => batch::execute(source, *kind, destination, options, *quiet),
        }
    }
}

impl VifCommands {
    /// Execute the selected VIF command.
    ///
    /// # Errors
    /// Returns an error if the model cannot be read or decoded.
    pub fn execute(&self, options: &DecodeOptions) -> anyhow::Result<()> {
        match self {
            VifCommands::Inspect { path, json } => vif::inspect(path, json.as_deref()),
            VifCommands::Decode {
                path,
                width,
                height,
                strict_weights,
                output,
            } => {
                let mut options = options.clone().with_texture_size(
                    width.unwrap_or(options.texture_width),
                    height.unwrap_or(options.texture_height),
                );
                options.strict_weights |= *strict_weights;
                vif::decode(path, &options, output.as_deref())
            }
        }
    }
}

impl TextureCommands {
    /// Execute the selected texture command.
    ///
    /// # Errors
    /// Returns an error if the texture cannot be read, decoded or written.
    pub fn execute(&self, options: &DecodeOptions) -> anyhow::Result<()> {
        match self {
            TextureCommands::Decode { path, output } => texture::decode(path, output),
            TextureCommands::World {
                path,
                offset,
                chunk,
                engine,
                output,
            } => texture::world(
                path,
                *offset,
                *chunk,
                engine.unwrap_or(options.engine_version),
                output,
            ),
            TextureCommands::Entries { path } => texture::entries(path, options.engine_version),
        }
    }
}

impl AnimCommands {
    /// Execute the selected animation command.
    ///
    /// # Errors
    /// Returns an error if the animation cannot be read or decoded.
    pub fn execute(&self, options: &DecodeOptions) -> anyhow::Result<()> {
        match self {
            AnimCommands::Decode {
                path,
                engine,
                output,
            } => anim::decode(path, engine.unwrap_or(options.engine_version), output.as_deref()),
        }
    }
}

impl WorldCommands {
    /// Execute the selected world command.
    ///
    /// # Errors
    /// Returns an error if the world or its textures cannot be read, decoded or written.
    pub fn execute(&self, options: &DecodeOptions) -> anyhow::Result<()> {
        match self {
            WorldCommands::Decode {
                path,
                textures,
                engine,
                strict_weights,
                output,
                png_dir,
            } => {
                let mut options = options.clone().with_engine_version(engine.unwrap_or(options.engine_version));
                options.strict_weights |= *strict_weights;
                world::decode(path, textures.as_deref(), &options, output.as_deref(), png_dir.as_deref())
            }
            WorldCommands::Objects { path, json } => world::objects(path, json.as_deref()),
        }
    }
}

impl SceneCommands {
    /// Execute the selected scene command.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or decoded.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            SceneCommands::Cutscene { path, json } => scene::cutscene(path, json.as_deref()),
            SceneCommands::Dialog { path, json } => scene::dialog(path, json.as_deref()),
        }
    }
}

impl ScriptCommands {
    /// Execute the selected script command.
    ///
    /// # Errors
    /// Returns an error if the script cannot be read, decoded or written.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            ScriptCommands::Disassemble { path, output, json } => {
                script::disassemble(path, output.as_deref(), json.as_deref())
            }
        }
    }
}
