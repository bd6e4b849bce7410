//! GLB container assembly.

use gltf_json as json;

use crate::error::Result;

/// Bytes needed to advance `offset` to the next multiple of `unit`.
pub fn padding(offset: usize, unit: usize) -> usize {
    (unit - offset % unit) % unit
}

/// Assemble a GLB binary: 12-byte header, 4-byte-aligned JSON chunk
/// (space-padded) and binary chunk (zero-padded).
pub(crate) fn assemble_glb(root: &json::Root, buffer_data: &[u8]) -> Result<Vec<u8>> {
    let json_string = json::serialize::to_string(root)?;
    let json_bytes = json_string.as_bytes();

    let json_padding = padding(json_bytes.len(), 4);
    let json_chunk_length = json_bytes.len() + json_padding;
    let buffer_padding = padding(buffer_data.len(), 4);
    let buffer_chunk_length = buffer_data.len() + buffer_padding;

    let total_length = 12 + 8 + json_chunk_length + 8 + buffer_chunk_length;
    let mut glb = Vec::with_capacity(total_length);

    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total_length as u32).to_le_bytes());

    glb.extend_from_slice(&(json_chunk_length as u32).to_le_bytes());
    glb.extend_from_slice(&0x4E4F_534Au32.to_le_bytes()); // "JSON"
    glb.extend_from_slice(json_bytes);
    glb.resize(glb.len() + json_padding, 0x20);

    glb.extend_from_slice(&(buffer_chunk_length as u32).to_le_bytes());
    glb.extend_from_slice(&0x004E_4942u32.to_le_bytes()); // "BIN\0"
    glb.extend_from_slice(buffer_data);
    glb.resize(glb.len() + buffer_padding, 0);

    Ok(glb)
}
