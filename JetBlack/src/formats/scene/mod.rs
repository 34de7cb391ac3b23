//! Cutscenes and dialog
//!
//! - [`cutscene`] - camera, sound and cast keyframes of scripted scenes
//! - [`dialog`] - names and voice clip ranges of recorded dialog

pub mod cutscene;
pub mod dialog;

pub use cutscene::{Actor, CastMember, Cutscene, Keyframe, decode_cutscene, read_cutscene};
pub use dialog::{DialogEntry, decode_dialog, read_dialog};
