//! Document assembly: meshes, nodes, scene wiring and property extensions.

use std::collections::BTreeMap;

use gltf_json as json;
use gltf_json::validation::Checked::Valid;
use mst_format::properties::Value as PropValue;
use mst_format::{BaseMesh, Mesh, MeshNode, Properties};

use crate::binary;
use crate::buffer::{pack_node, pack_outline, NodeViews};
use crate::error::Result;
use crate::{MESH_PROPERTIES_EXT, SPECULAR_GLOSSINESS_EXT};

/// A finished export: the JSON document plus its single binary buffer.
pub struct GltfDocument {
    pub root: json::Root,
    pub buffer: Vec<u8>,
}

impl GltfDocument {
    /// Encode as a GLB binary.
    pub fn to_binary(&self) -> Result<Vec<u8>> {
        binary::assemble_glb(&self.root, &self.buffer)
    }

    /// Encode as a GLB binary padded with spaces to a multiple of `unit`.
    ///
    /// The pad bytes sit outside the length declared in the GLB header,
    /// which is what containers embedding GLB payloads expect.
    pub fn to_padded_binary(&self, unit: usize) -> Result<Vec<u8>> {
        let mut glb = self.to_binary()?;
        glb.resize(glb.len() + binary::padding(glb.len(), unit), 0x20);
        Ok(glb)
    }
}

/// Convert meshes into one glTF document with a single scene and buffer.
pub fn mst_to_gltf(meshes: &[Mesh]) -> Result<GltfDocument> {
    let mut builder = DocumentBuilder::new();
    for mesh in meshes {
        builder.push_mesh(mesh, false)?;
    }
    Ok(builder.into_document())
}

/// Like [`mst_to_gltf`], but nodes with edge groups export their outline
/// as line-strip primitives instead of triangles.
pub fn mst_to_gltf_with_outline(meshes: &[Mesh]) -> Result<GltfDocument> {
    let mut builder = DocumentBuilder::new();
    for mesh in meshes {
        builder.push_mesh(mesh, true)?;
    }
    Ok(builder.into_document())
}

/// Incrementally builds the document; [`DocumentBuilder::into_document`]
/// finalizes it.
#[derive(Default)]
pub struct DocumentBuilder {
    pub(crate) buffer: Vec<u8>,
    pub(crate) views: Vec<json::buffer::View>,
    pub(crate) accessors: Vec<json::Accessor>,
    pub(crate) meshes: Vec<json::Mesh>,
    pub(crate) nodes: Vec<json::Node>,
    pub(crate) scene_nodes: Vec<json::Index<json::Node>>,
    pub(crate) materials: Vec<json::Material>,
    pub(crate) textures: Vec<json::Texture>,
    pub(crate) images: Vec<json::Image>,
    pub(crate) samplers: Vec<json::texture::Sampler>,
    pub(crate) extensions: serde_json::Map<String, serde_json::Value>,
    pub(crate) specular_glossiness_used: bool,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_mesh(&mut self, mesh: &Mesh, outline: bool) -> Result<()> {
        tracing::debug!(
            nodes = mesh.base.nodes.len(),
            instances = mesh.instances.len(),
            outline,
            "building gltf document"
        );
        if let Some(props) = &mesh.properties {
            if !props.is_empty() {
                self.merge_mesh_properties(props);
            }
        }

        self.push_base_mesh(&mesh.base, None, outline)?;

        for (i, instance) in mesh.instances.iter().enumerate() {
            for (j, props) in instance.properties.iter().enumerate() {
                if let Some(props) = props {
                    if !props.is_empty() {
                        self.extensions.insert(
                            format!("{}_{i}_{j}", crate::INSTANCE_PROPERTIES_EXT_PREFIX),
                            serde_json::Value::Object(props_to_json(props)),
                        );
                    }
                }
            }
            self.push_base_mesh(&instance.mesh, Some(&instance.transforms), false)?;
        }
        Ok(())
    }

    fn push_base_mesh(
        &mut self,
        mesh: &BaseMesh,
        transforms: Option<&[[f64; 16]]>,
        outline: bool,
    ) -> Result<()> {
        // Primitives reference materials that fill_materials appends below.
        let mtl_size = self.materials.len() as u32;

        for node in &mesh.nodes {
            let mesh_index = json::Index::new(self.meshes.len() as u32);

            let gltf_mesh = if outline && !node.edge_groups.is_empty() {
                let packed = pack_outline(&mut self.buffer, &mut self.views, node);
                self.outline_mesh(&packed, node, mtl_size)
            } else {
                let packed = pack_node(&mut self.buffer, &mut self.views, node);
                self.triangle_mesh(&packed, node, mtl_size)
            };
            self.meshes.push(gltf_mesh);

            match transforms {
                None => {
                    let trs = node.matrix.as_ref().map(decompose);
                    self.push_scene_node(mesh_index, trs);
                }
                Some(transforms) => {
                    for matrix in transforms {
                        self.push_scene_node(mesh_index, Some(decompose(matrix)));
                    }
                }
            }
        }

        self.fill_materials(&mesh.materials)
    }

    fn push_scene_node(
        &mut self,
        mesh: json::Index<json::Mesh>,
        trs: Option<([f32; 3], [f32; 4], [f32; 3])>,
    ) {
        let node_index = json::Index::new(self.nodes.len() as u32);
        let (translation, rotation, scale) = match trs {
            Some((t, r, s)) => (Some(t), Some(json::scene::UnitQuaternion(r)), Some(s)),
            None => (None, None, None),
        };
        self.nodes.push(json::Node {
            camera: None,
            children: None,
            extensions: Default::default(),
            extras: Default::default(),
            matrix: None,
            mesh: Some(mesh),
            name: None,
            rotation,
            scale,
            skin: None,
            translation,
            weights: None,
        });
        self.scene_nodes.push(node_index);
    }

    /// One triangle primitive per face group, all sharing the node's
    /// position/texcoord/normal accessors.
    fn triangle_mesh(
        &mut self,
        packed: &NodeViews,
        node: &MeshNode,
        mtl_size: u32,
    ) -> json::Mesh {
        let accessor_offset = self.accessors.len() as u32;
        let position_accessor = accessor_offset + node.face_groups.len() as u32;

        let mut primitives = Vec::with_capacity(node.face_groups.len());
        let mut running_faces = 0u64;
        for (i, group) in node.face_groups.iter().enumerate() {
            let mut attributes = BTreeMap::new();
            let mut attribute_index = position_accessor;
            attributes.insert(
                Valid(json::mesh::Semantic::Positions),
                json::Index::new(attribute_index),
            );
            if !node.tex_coords.is_empty() {
                attribute_index += 1;
                attributes.insert(
                    Valid(json::mesh::Semantic::TexCoords(0)),
                    json::Index::new(attribute_index),
                );
            }
            if !node.normals.is_empty() {
                attribute_index += 1;
                attributes.insert(
                    Valid(json::mesh::Semantic::Normals),
                    json::Index::new(attribute_index),
                );
            }

            primitives.push(json::mesh::Primitive {
                attributes,
                extensions: Default::default(),
                extras: Default::default(),
                indices: Some(json::Index::new(accessor_offset + i as u32)),
                material: Some(json::Index::new(mtl_size + group.batch_id.max(0) as u32)),
                mode: Valid(json::mesh::Mode::Triangles),
                targets: None,
            });

            self.accessors.push(json::Accessor {
                buffer_view: Some(json::Index::new(packed.indices)),
                byte_offset: Some((running_faces * 12).into()),
                count: (group.faces.len() * 3).into(),
                component_type: Valid(json::accessor::GenericComponentType(
                    json::accessor::ComponentType::U32,
                )),
                extensions: Default::default(),
                extras: Default::default(),
                type_: Valid(json::accessor::Type::Scalar),
                min: None,
                max: None,
                name: None,
                normalized: false,
                sparse: None,
            });
            running_faces += group.faces.len() as u64;
        }

        self.push_position_accessor(packed.positions, node);

        if let Some(view) = packed.tex_coords {
            self.accessors.push(json::Accessor {
                buffer_view: Some(json::Index::new(view)),
                byte_offset: Some(0u64.into()),
                count: node.tex_coords.len().into(),
                component_type: Valid(json::accessor::GenericComponentType(
                    json::accessor::ComponentType::F32,
                )),
                extensions: Default::default(),
                extras: Default::default(),
                type_: Valid(json::accessor::Type::Vec2),
                min: None,
                max: None,
                name: None,
                normalized: false,
                sparse: None,
            });
        }
        if let Some(view) = packed.normals {
            self.accessors.push(json::Accessor {
                buffer_view: Some(json::Index::new(view)),
                byte_offset: Some(0u64.into()),
                count: node.normals.len().into(),
                component_type: Valid(json::accessor::GenericComponentType(
                    json::accessor::ComponentType::F32,
                )),
                extensions: Default::default(),
                extras: Default::default(),
                type_: Valid(json::accessor::Type::Vec3),
                min: None,
                max: None,
                name: None,
                normalized: false,
                sparse: None,
            });
        }

        json::Mesh {
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            primitives,
            weights: None,
        }
    }

    /// One line-strip primitive per edge group over the shared positions.
    fn outline_mesh(&mut self, packed: &NodeViews, node: &MeshNode, mtl_size: u32) -> json::Mesh {
        let accessor_offset = self.accessors.len() as u32;
        let position_accessor = accessor_offset + node.edge_groups.len() as u32;

        let mut primitives = Vec::with_capacity(node.edge_groups.len());
        let mut running_edges = 0u64;
        for (i, group) in node.edge_groups.iter().enumerate() {
            let mut attributes = BTreeMap::new();
            attributes.insert(
                Valid(json::mesh::Semantic::Positions),
                json::Index::new(position_accessor),
            );
            primitives.push(json::mesh::Primitive {
                attributes,
                extensions: Default::default(),
                extras: Default::default(),
                indices: Some(json::Index::new(accessor_offset + i as u32)),
                material: Some(json::Index::new(mtl_size + group.batch_id.max(0) as u32)),
                mode: Valid(json::mesh::Mode::LineStrip),
                targets: None,
            });

            self.accessors.push(json::Accessor {
                buffer_view: Some(json::Index::new(packed.indices)),
                byte_offset: Some((running_edges * 8).into()),
                count: (group.edges.len() * 2).into(),
                component_type: Valid(json::accessor::GenericComponentType(
                    json::accessor::ComponentType::U32,
                )),
                extensions: Default::default(),
                extras: Default::default(),
                type_: Valid(json::accessor::Type::Scalar),
                min: None,
                max: None,
                name: None,
                normalized: false,
                sparse: None,
            });
            running_edges += group.edges.len() as u64;
        }

        self.push_position_accessor(packed.positions, node);

        json::Mesh {
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            primitives,
            weights: None,
        }
    }

    fn push_position_accessor(&mut self, view: u32, node: &MeshNode) {
        let bounds = node.bounding_box();
        let min: Vec<_> = bounds[..3]
            .iter()
            .map(|v| json::Value::from(*v as f32))
            .collect();
        let max: Vec<_> = bounds[3..]
            .iter()
            .map(|v| json::Value::from(*v as f32))
            .collect();
        self.accessors.push(json::Accessor {
            buffer_view: Some(json::Index::new(view)),
            byte_offset: Some(0u64.into()),
            count: node.vertices.len().into(),
            component_type: Valid(json::accessor::GenericComponentType(
                json::accessor::ComponentType::F32,
            )),
            extensions: Default::default(),
            extras: Default::default(),
            type_: Valid(json::accessor::Type::Vec3),
            min: Some(json::Value::Array(min)),
            max: Some(json::Value::Array(max)),
            name: None,
            normalized: false,
            sparse: None,
        });
    }

    fn merge_mesh_properties(&mut self, props: &Properties) {
        let map = props_to_json(props);
        let entry = self
            .extensions
            .entry(MESH_PROPERTIES_EXT.to_string())
            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
        match entry {
            serde_json::Value::Object(existing) => existing.extend(map),
            other => *other = serde_json::Value::Object(map),
        }
    }

    pub fn into_document(self) -> GltfDocument {
        let buffers = vec![json::Buffer {
            byte_length: (self.buffer.len() as u64).into(),
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            uri: None,
        }];

        let extensions_used = if self.specular_glossiness_used {
            vec![SPECULAR_GLOSSINESS_EXT.to_string()]
        } else {
            Vec::new()
        };
        let extensions = if self.extensions.is_empty() {
            None
        } else {
            let mut ext = json::extensions::root::Root::default();
            ext.others = self.extensions;
            Some(ext)
        };

        let root = json::Root {
            accessors: self.accessors,
            animations: Vec::new(),
            asset: json::Asset {
                copyright: None,
                extensions: Default::default(),
                extras: Default::default(),
                generator: Some(concat!("mst-gltf ", env!("CARGO_PKG_VERSION")).to_string()),
                min_version: None,
                version: "2.0".to_string(),
            },
            buffers,
            buffer_views: self.views,
            cameras: Vec::new(),
            extensions,
            extensions_required: Vec::new(),
            extensions_used,
            extras: Default::default(),
            images: self.images,
            materials: self.materials,
            meshes: self.meshes,
            nodes: self.nodes,
            samplers: self.samplers,
            scene: Some(json::Index::new(0)),
            scenes: vec![json::Scene {
                extensions: Default::default(),
                extras: Default::default(),
                name: None,
                nodes: self.scene_nodes,
            }],
            skins: Vec::new(),
            textures: self.textures,
        };

        GltfDocument {
            root,
            buffer: self.buffer,
        }
    }
}

/// TRS decomposition of a column-major matrix, narrowed to f32 for glTF.
fn decompose(matrix: &[f64; 16]) -> ([f32; 3], [f32; 4], [f32; 3]) {
    let (scale, rotation, translation) =
        glam::DMat4::from_cols_array(matrix).to_scale_rotation_translation();
    (
        translation.as_vec3().to_array(),
        rotation.as_quat().to_array(),
        scale.as_vec3().to_array(),
    )
}

fn props_to_json(props: &Properties) -> serde_json::Map<String, serde_json::Value> {
    props
        .iter()
        .map(|(key, value)| (key.clone(), value_to_json(value)))
        .collect()
}

fn value_to_json(value: &PropValue) -> serde_json::Value {
    match value {
        PropValue::String(s) => serde_json::Value::from(s.clone()),
        PropValue::Int(v) => serde_json::Value::from(*v),
        PropValue::Float(v) => serde_json::Value::from(*v),
        PropValue::Bool(b) => serde_json::Value::from(*b),
        PropValue::Array(items) => items.iter().map(value_to_json).collect(),
        PropValue::Map(nested) => serde_json::Value::Object(props_to_json(nested)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_matrix_decomposes_to_neutral_trs() {
        let mut m = [0.0; 16];
        m[0] = 1.0;
        m[5] = 1.0;
        m[10] = 1.0;
        m[15] = 1.0;
        m[12] = 3.0;
        m[13] = -2.0;
        m[14] = 0.5;
        let (t, r, s) = decompose(&m);
        assert_eq!(t, [3.0, -2.0, 0.5]);
        assert_eq!(r, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(s, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn nested_properties_flatten_to_json() {
        let inner: Properties = [("depth".to_string(), PropValue::Int(2))]
            .into_iter()
            .collect();
        let props: Properties = [
            ("name".to_string(), PropValue::String("slab".into())),
            (
                "tags".to_string(),
                PropValue::Array(vec![PropValue::Bool(true), PropValue::Float(0.5)]),
            ),
            ("child".to_string(), PropValue::Map(inner)),
        ]
        .into_iter()
        .collect();

        let json = serde_json::Value::Object(props_to_json(&props));
        assert_eq!(json["name"], "slab");
        assert_eq!(json["tags"][0], true);
        assert_eq!(json["tags"][1], 0.5);
        assert_eq!(json["child"]["depth"], 2);
    }
}
