//! glTF 2.0 export for MST mesh containers.
//!
//! Converts decoded [`mst_format::Mesh`] values into a `gltf_json::Root`
//! plus one contiguous binary buffer: geometry is packed node by node into
//! buffer views and accessors, materials map onto PBR metallic-roughness
//! (with the specular-glossiness extension for Lambert/Phong shading),
//! embedded textures become PNG images, and MST properties surface as
//! vendor document extensions.
//!
//! ```no_run
//! # fn main() -> mst_gltf::Result<()> {
//! # let mesh = mst_format::Mesh::new();
//! let doc = mst_gltf::mst_to_gltf(&[mesh])?;
//! let glb = doc.to_padded_binary(8)?;
//! # Ok(()) }
//! ```

pub mod binary;
pub mod error;

mod buffer;
mod builder;
mod material;

pub use binary::padding;
pub use builder::{mst_to_gltf, mst_to_gltf_with_outline, DocumentBuilder, GltfDocument};
pub use error::{Error, Result};

/// Document extension carrying mesh-level MST properties.
pub const MESH_PROPERTIES_EXT: &str = "MST_mesh_properties";

/// Prefix of the per-instance properties extensions; the full key is
/// `MST_instance_mesh_properties_<instanceIndex>_<propsIndex>`.
pub const INSTANCE_PROPERTIES_EXT_PREFIX: &str = "MST_instance_mesh_properties";

/// Specular-glossiness material extension attached for Lambert/Phong.
pub const SPECULAR_GLOSSINESS_EXT: &str = "KHR_materials_pbrSpecularGlossiness";
