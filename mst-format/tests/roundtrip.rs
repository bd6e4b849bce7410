//! End-to-end codec coverage: stream round-trips and the layout
//! differences between format revisions.

use std::io::Cursor;

use mst_format::{
    BaseMaterial, BaseMesh, EdgeGroup, Error, Face, FaceGroup, InstanceMesh, LambertMaterial,
    Material, Mesh, MeshNode, PbrMaterial, PhongMaterial, Properties, Texture, TextureMaterial,
    Value, Version,
};

fn encode(mesh: &Mesh, version: Version) -> Vec<u8> {
    let mut bytes = Vec::new();
    mesh.encode(&mut bytes, version).unwrap();
    bytes
}

fn decode(bytes: &[u8]) -> Mesh {
    Mesh::decode(Cursor::new(bytes)).unwrap()
}

fn sample_node() -> MeshNode {
    MeshNode {
        vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        normals: vec![[0.0, 0.0, 1.0]; 3],
        colors: vec![[255, 0, 0], [0, 255, 0], [0, 0, 255]],
        tex_coords: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
        matrix: Some([
            1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 4.0, 5.0, 6.0, 1.0,
        ]),
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
        properties: None,
    }
}

fn sample_texture(id: i32) -> Texture {
    Texture {
        id,
        name: format!("tex-{id}"),
        size: [2, 2],
        data: vec![1, 2, 3, 4],
        ..Texture::default()
    }
}

fn all_materials() -> Vec<Material> {
    vec![
        Material::Base(BaseMaterial {
            color: [200, 100, 50],
            transparency: 0.25,
        }),
        Material::Texture(TextureMaterial {
            base: BaseMaterial::default(),
            texture: Some(sample_texture(1)),
            normal: None,
        }),
        Material::Pbr(PbrMaterial {
            emissive: [10, 20, 30],
            metallic: 0.9,
            roughness: 0.1,
            anisotropy_direction: [1.0, 0.0, 0.0],
            ..PbrMaterial::default()
        }),
        Material::Lambert(LambertMaterial {
            ambient: [5, 5, 5],
            diffuse: [100, 110, 120],
            emissive: [0, 1, 2],
            ..LambertMaterial::default()
        }),
        Material::Phong(PhongMaterial {
            specular: [255, 255, 255],
            shininess: 32.0,
            specularity: 0.8,
            ..PhongMaterial::default()
        }),
    ]
}

fn props(key: &str, value: i64) -> Properties {
    [(key.to_string(), Value::Int(value))].into_iter().collect()
}

fn sample_instance() -> InstanceMesh {
    InstanceMesh {
        transforms: vec![[
            1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 10.0, 0.0, 0.0, 1.0,
        ]],
        features: vec![77],
        bbox: Some([-1.0, -1.0, -1.0, 1.0, 1.0, 1.0]),
        mesh: BaseMesh {
            materials: vec![Material::default()],
            nodes: vec![sample_node()],
            code: 9,
        },
        properties: vec![Some(props("kind", 3))],
        hash: 0xDEAD_BEEF_CAFE_F00D,
    }
}

#[test]
fn full_mesh_round_trips_at_latest() {
    let mut node = sample_node();
    node.properties = Some(props("floor", 2));
    let mesh = Mesh {
        base: BaseMesh {
            materials: all_materials(),
            nodes: vec![node],
            code: 12345,
        },
        version: Version::V5,
        instances: vec![sample_instance()],
        properties: Some(props("project", 1)),
    };

    let decoded = decode(&encode(&mesh, Version::V5));
    assert_eq!(decoded, mesh);
}

#[test]
fn every_version_preserves_geometry() {
    let mesh = Mesh {
        base: BaseMesh {
            materials: all_materials(),
            nodes: vec![sample_node()],
            code: 0,
        },
        ..Mesh::new()
    };
    for version in [
        Version::V1,
        Version::V2,
        Version::V3,
        Version::V4,
        Version::V5,
    ] {
        let decoded = decode(&encode(&mesh, version));
        assert_eq!(decoded.version, version);
        assert_eq!(decoded.base.nodes, mesh.base.nodes, "at {version}");
        assert_eq!(decoded.base.materials, mesh.base.materials, "at {version}");
    }
}

#[test]
fn code_persisted_only_from_v4() {
    let mut mesh = Mesh::new();
    mesh.base.code = 12345;

    assert_eq!(decode(&encode(&mesh, Version::V3)).base.code, 0);
    assert_eq!(decode(&encode(&mesh, Version::V4)).base.code, 12345);
}

#[test]
fn v1_pbr_layout_has_filler_byte() {
    let mesh = Mesh {
        base: BaseMesh {
            materials: vec![Material::Pbr(PbrMaterial::default())],
            ..BaseMesh::default()
        },
        ..Mesh::new()
    };
    let v1 = encode(&mesh, Version::V1);
    let v2 = encode(&mesh, Version::V2);
    assert_eq!(v1.len(), v2.len() + 1);

    let decoded = decode(&v1);
    assert_eq!(decoded.base.materials, mesh.base.materials);
}

#[test]
fn feature_width_narrow_before_v3() {
    let mut mesh = Mesh::new();
    mesh.instances.push(InstanceMesh {
        features: vec![0x1_0000_0001],
        ..sample_instance()
    });

    // u32 on disk before V3: the high word is lost.
    let narrow = decode(&encode(&mesh, Version::V2));
    assert_eq!(narrow.instances[0].features, vec![1]);

    let wide = decode(&encode(&mesh, Version::V3));
    assert_eq!(wide.instances[0].features, vec![0x1_0000_0001]);
}

#[test]
fn instance_properties_padded_to_instance_count() {
    let mut mesh = Mesh::new();
    mesh.instances.push(InstanceMesh {
        transforms: vec![[0.0; 16], [0.0; 16]],
        features: vec![1, 2],
        properties: vec![Some(props("only", 1))],
        ..sample_instance()
    });

    let decoded = decode(&encode(&mesh, Version::V5));
    let inst = &decoded.instances[0];
    assert_eq!(inst.properties.len(), 2);
    assert_eq!(inst.properties[0], Some(props("only", 1)));
    assert_eq!(inst.properties[1], None);
}

#[test]
fn instance_properties_decode_with_wide_presence_flags() {
    // Hand-assembled V5 stream: presence flags in the instance property
    // block are u32, not a single byte.
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"fwtm");
    bytes.extend_from_slice(&5u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes()); // code
    bytes.extend_from_slice(&0u32.to_le_bytes()); // materials
    bytes.extend_from_slice(&0u32.to_le_bytes()); // nodes
    bytes.extend_from_slice(&1u32.to_le_bytes()); // instances
    bytes.extend_from_slice(&1u32.to_le_bytes()); // transforms
    let identity = [
        1.0f64, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
    ];
    for v in identity {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes.extend_from_slice(&1u32.to_le_bytes()); // features
    bytes.extend_from_slice(&7u64.to_le_bytes());
    for _ in 0..6 {
        bytes.extend_from_slice(&0f64.to_le_bytes()); // bbox
    }
    bytes.extend_from_slice(&0u32.to_le_bytes()); // embedded materials
    bytes.extend_from_slice(&0u32.to_le_bytes()); // embedded nodes
    bytes.extend_from_slice(&0u32.to_le_bytes()); // embedded code
    bytes.extend_from_slice(&1u32.to_le_bytes()); // property slots
    bytes.extend_from_slice(&1u32.to_le_bytes()); // present flag, u32
    props("kind", 3).encode(&mut bytes).unwrap();
    bytes.extend_from_slice(&0x0102_0304_0506_0708u64.to_le_bytes()); // hash
    bytes.extend_from_slice(&0u32.to_le_bytes()); // mesh properties flag

    let decoded = decode(&bytes);
    assert_eq!(decoded.instances.len(), 1);
    let inst = &decoded.instances[0];
    assert_eq!(inst.transforms, vec![identity]);
    assert_eq!(inst.features, vec![7]);
    assert_eq!(inst.properties, vec![Some(props("kind", 3))]);
    assert_eq!(inst.hash, 0x0102_0304_0506_0708);
}

#[test]
fn writer_pads_property_slots_with_wide_zero_flags() {
    let mut mesh = Mesh::new();
    mesh.instances.push(InstanceMesh {
        transforms: vec![[0.0; 16], [0.0; 16]],
        features: vec![1],
        properties: Vec::new(),
        ..sample_instance()
    });

    let bytes = encode(&mesh, Version::V5);
    // Tail of the stream: slot count, two u32 zero flags, hash, mesh
    // properties flag.
    let tail = &bytes[bytes.len() - 24..];
    assert_eq!(&tail[0..4], &2u32.to_le_bytes());
    assert_eq!(&tail[4..8], &0u32.to_le_bytes());
    assert_eq!(&tail[8..12], &0u32.to_le_bytes());

    let decoded = decode(&bytes);
    assert_eq!(decoded.instances[0].properties, vec![None, None]);
}

#[test]
fn node_properties_dropped_before_v5() {
    let mut node = sample_node();
    node.properties = Some(props("floor", 2));
    let mut mesh = Mesh::new();
    mesh.base.nodes.push(node);
    mesh.properties = Some(props("project", 1));

    let decoded = decode(&encode(&mesh, Version::V4));
    assert_eq!(decoded.base.nodes[0].properties, None);
    assert_eq!(decoded.properties, None);

    let decoded = decode(&encode(&mesh, Version::V5));
    assert_eq!(decoded.base.nodes[0].properties, Some(props("floor", 2)));
    assert_eq!(decoded.properties, Some(props("project", 1)));
}

#[test]
fn instance_geometry_never_carries_node_properties() {
    let mut inst = sample_instance();
    inst.mesh.nodes[0].properties = Some(props("hidden", 1));
    let mut mesh = Mesh::new();
    mesh.instances.push(inst);

    let decoded = decode(&encode(&mesh, Version::V5));
    assert_eq!(decoded.instances[0].mesh.nodes[0].properties, None);
}

#[test]
fn bad_signature_rejected() {
    let mut bytes = encode(&Mesh::new(), Version::V5);
    bytes[0] = b'x';
    assert!(matches!(
        Mesh::decode(Cursor::new(bytes)),
        Err(Error::BadSignature(_))
    ));
}

#[test]
fn unknown_version_rejected() {
    let mut bytes = encode(&Mesh::new(), Version::V5);
    bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
    assert!(matches!(
        Mesh::decode(Cursor::new(bytes)),
        Err(Error::UnsupportedVersion(99))
    ));
}

#[test]
fn truncated_stream_is_an_error() {
    let mut mesh = Mesh::new();
    mesh.base.nodes.push(sample_node());
    let mut bytes = encode(&mesh, Version::V5);
    bytes.truncate(bytes.len() / 2);
    assert!(Mesh::decode(Cursor::new(bytes)).is_err());
}

#[test]
fn unknown_material_tag_rejected() {
    let mesh = Mesh {
        base: BaseMesh {
            materials: vec![Material::default()],
            ..BaseMesh::default()
        },
        ..Mesh::new()
    };
    let mut bytes = encode(&mesh, Version::V5);
    // The first material tag sits right after signature, version, code
    // and the u32 material count.
    bytes[16..20].copy_from_slice(&7u32.to_le_bytes());
    assert!(matches!(
        Mesh::decode(Cursor::new(bytes)),
        Err(Error::UnknownMaterialType(7))
    ));
}
