//! MST binary mesh container format (`.mst`)
//!
//! A little-endian binary interchange format for mesh geometry, polymorphic
//! materials, embedded textures and per-entity key/value metadata. Five
//! backward-compatible revisions (V1..V5) exist in the wild; the decoder
//! accepts all of them and the encoder can target any of them.
//!
//! # Stream layout
//! ```text
//! 0x00: signature "fwtm" (4 bytes)
//! 0x04: version u32
//! var:  code u32                      (V4+)
//! var:  materials block
//! var:  nodes block                   (V5+: per-node properties trailer)
//! var:  instances block
//! var:  properties flag u32 + block   (V5+)
//! ```
//!
//! Reading and writing go through [`MstReader`] and [`MstWriter`]; the
//! revision-dependent layout decisions live on [`Version`].

pub mod error;
pub mod material;
pub mod mesh;
pub mod properties;
pub mod texture;

mod reader;
mod version;
mod writer;

pub use error::{Error, Result};
pub use material::{
    BaseMaterial, LambertMaterial, Material, PbrMaterial, PhongMaterial, TextureMaterial,
};
pub use mesh::{BaseMesh, EdgeGroup, Face, FaceGroup, InstanceMesh, Mesh, MeshNode};
pub use properties::{Properties, Value};
pub use reader::MstReader;
pub use texture::{texture_from_bytes, PixelType, Texture, TextureCompression, TextureFormat};
pub use version::Version;
pub use writer::MstWriter;

/// Magic bytes at the start of every MST stream.
pub const MESH_SIGNATURE: &[u8; 4] = b"fwtm";

/// Conventional file extension for MST containers.
pub const MST_EXT: &str = ".mst";
