//! Asset format decoders
//!
//! - [`gif`] - GS interface tags shared by meshes and textures
//! - [`vif`] - VIF mesh packets and model files
//! - [`texture`] - GS memory emulation, palettes and Huffman textures
//! - [`anim`] - skeletal animation streams
//! - [`world`] - world geometry and object definitions
//! - [`scene`] - cutscenes and dialog tables
//! - [`script`] - compiled level scripts

pub mod anim;
pub mod gif;
pub mod scene;
pub mod script;
pub mod texture;
pub mod vif;
pub mod world;

pub use anim::{AnimData, decode_animation};
pub use gif::{GifFlag, GifTag};
pub use scene::{Cutscene, DialogEntry, decode_cutscene, decode_dialog};
pub use script::{Script, decode_script};
pub use texture::{PixelBuffer, WorldTexFile, decode_tex};
pub use vif::{Chunk, Mesh, MeshAssembler, decode_model};
pub use world::{ObjectDef, WorldData, decode_objects, decode_world};
