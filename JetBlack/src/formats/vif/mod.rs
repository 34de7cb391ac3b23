//! VIF mesh decoding
//!
//! Models are stored as the VIF packets the game streams to the vector unit.
//! [`interpreter`] turns a packet into [`Chunk`]s, [`assembler`] rebuilds the
//! triangle strips into a [`Mesh`], and [`model`] handles the file header
//! that locates each mesh's packet.

pub mod assembler;
pub mod interpreter;
pub mod model;
pub mod types;

pub use assembler::MeshAssembler;
pub use interpreter::read_chunks;
pub use model::{decode_chunks, decode_mesh, decode_model, mesh_ranges};
pub use types::{Chunk, Mesh, PackedNormal, Uv, VLoc, Vertex, VertexWeight, STRIP_SKIP, UNSET_UV};
