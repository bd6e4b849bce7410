//! Geometry packing into the shared document buffer.
//!
//! Each mesh node becomes a run of contiguous regions appended to the one
//! document buffer: indices first, then positions, then the optional
//! texcoord and normal attributes. Every region is one buffer view; the
//! view indices are carried in a short-lived [`NodeViews`] and consumed
//! when the node's accessors are built.

use gltf_json as json;
use gltf_json::validation::Checked::Valid;
use mst_format::MeshNode;

/// Buffer-view indices for one packed node.
pub(crate) struct NodeViews {
    pub indices: u32,
    pub positions: u32,
    pub tex_coords: Option<u32>,
    pub normals: Option<u32>,
}

fn push_view(
    views: &mut Vec<json::buffer::View>,
    offset: usize,
    length: usize,
    target: json::buffer::Target,
) -> u32 {
    let index = views.len() as u32;
    views.push(json::buffer::View {
        buffer: json::Index::new(0),
        byte_length: (length as u64).into(),
        byte_offset: Some((offset as u64).into()),
        byte_stride: None,
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        target: Some(Valid(target)),
    });
    index
}

/// Pack a node's triangle geometry; regions are not padded between each
/// other, offsets are the running buffer length.
pub(crate) fn pack_node(
    buffer: &mut Vec<u8>,
    views: &mut Vec<json::buffer::View>,
    node: &MeshNode,
) -> NodeViews {
    let offset = buffer.len();
    for group in &node.face_groups {
        for face in &group.faces {
            buffer.extend_from_slice(bytemuck::cast_slice(&face.vertex));
        }
    }
    let indices = push_view(
        views,
        offset,
        buffer.len() - offset,
        json::buffer::Target::ElementArrayBuffer,
    );

    let offset = buffer.len();
    for v in &node.vertices {
        buffer.extend_from_slice(bytemuck::cast_slice(v));
    }
    let positions = push_view(
        views,
        offset,
        buffer.len() - offset,
        json::buffer::Target::ArrayBuffer,
    );

    let tex_coords = if node.tex_coords.is_empty() {
        None
    } else {
        let offset = buffer.len();
        for uv in &node.tex_coords {
            buffer.extend_from_slice(bytemuck::cast_slice(uv));
        }
        Some(push_view(
            views,
            offset,
            buffer.len() - offset,
            json::buffer::Target::ArrayBuffer,
        ))
    };

    let normals = if node.normals.is_empty() {
        None
    } else {
        let offset = buffer.len();
        for n in &node.normals {
            buffer.extend_from_slice(bytemuck::cast_slice(n));
        }
        Some(push_view(
            views,
            offset,
            buffer.len() - offset,
            json::buffer::Target::ArrayBuffer,
        ))
    };

    NodeViews {
        indices,
        positions,
        tex_coords,
        normals,
    }
}

/// Outline variant: edge index pairs plus positions, no other attributes.
pub(crate) fn pack_outline(
    buffer: &mut Vec<u8>,
    views: &mut Vec<json::buffer::View>,
    node: &MeshNode,
) -> NodeViews {
    let offset = buffer.len();
    for group in &node.edge_groups {
        for edge in &group.edges {
            buffer.extend_from_slice(bytemuck::cast_slice(edge));
        }
    }
    let indices = push_view(
        views,
        offset,
        buffer.len() - offset,
        json::buffer::Target::ElementArrayBuffer,
    );

    let offset = buffer.len();
    for v in &node.vertices {
        buffer.extend_from_slice(bytemuck::cast_slice(v));
    }
    let positions = push_view(
        views,
        offset,
        buffer.len() - offset,
        json::buffer::Target::ArrayBuffer,
    );

    NodeViews {
        indices,
        positions,
        tex_coords: None,
        normals: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mst_format::{EdgeGroup, Face, FaceGroup};

    fn node() -> MeshNode {
        MeshNode {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            tex_coords: vec![[0.0, 0.0]; 3],
            face_groups: vec![FaceGroup {
                batch_id: 0,
                faces: vec![Face {
                    vertex: [0, 1, 2],
                    normal: None,
                    uv: None,
                }],
            }],
            edge_groups: vec![EdgeGroup {
                batch_id: 0,
                edges: vec![[0, 1], [1, 2]],
            }],
            ..MeshNode::default()
        }
    }

    #[test]
    fn regions_are_contiguous() {
        let mut buffer = Vec::new();
        let mut views = Vec::new();
        let packed = pack_node(&mut buffer, &mut views, &node());

        // 1 face * 12 + 3 verts * 12 + 3 uvs * 8 + 3 normals * 12
        assert_eq!(buffer.len(), 12 + 36 + 24 + 36);
        assert_eq!(packed.indices, 0);
        assert_eq!(packed.positions, 1);
        assert_eq!(packed.tex_coords, Some(2));
        assert_eq!(packed.normals, Some(3));

        let offsets: Vec<u64> = views
            .iter()
            .map(|v| v.byte_offset.unwrap().0)
            .collect();
        assert_eq!(offsets, vec![0, 12, 48, 72]);
    }

    #[test]
    fn outline_packs_edges_and_positions_only() {
        let mut buffer = Vec::new();
        let mut views = Vec::new();
        let packed = pack_outline(&mut buffer, &mut views, &node());

        // 2 edges * 8 + 3 verts * 12
        assert_eq!(buffer.len(), 16 + 36);
        assert_eq!(views.len(), 2);
        assert!(packed.tex_coords.is_none());
        assert!(packed.normals.is_none());
    }

    #[test]
    fn second_node_offsets_continue_from_first() {
        let mut buffer = Vec::new();
        let mut views = Vec::new();
        pack_node(&mut buffer, &mut views, &node());
        let first_end = buffer.len() as u64;
        let packed = pack_node(&mut buffer, &mut views, &node());

        assert_eq!(
            views[packed.indices as usize].byte_offset.unwrap().0,
            first_end
        );
    }
}
