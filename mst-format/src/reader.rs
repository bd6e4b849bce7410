//! MST stream decoder.
//!
//! The decoder is strict where the format allows it to be: a wrong
//! signature, an unknown version, material tag or texture enum value, and
//! any short read all surface as [`Error`] instead of producing a
//! partially-filled mesh.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{Error, Result};
use crate::material::{
    BaseMaterial, LambertMaterial, Material, PbrMaterial, PhongMaterial, TextureMaterial,
    MATERIAL_TYPE_COLOR, MATERIAL_TYPE_LAMBERT, MATERIAL_TYPE_PBR, MATERIAL_TYPE_PHONG,
    MATERIAL_TYPE_TEXTURE,
};
use crate::mesh::{BaseMesh, EdgeGroup, Face, FaceGroup, InstanceMesh, Mesh, MeshNode};
use crate::properties::Properties;
use crate::texture::Texture;
use crate::version::Version;
use crate::MESH_SIGNATURE;

pub struct MstReader<R: Read> {
    reader: R,
    version: Version,
}

impl<R: Read> MstReader<R> {
    pub fn new(reader: R) -> Self {
        // Placeholder until the header is parsed.
        MstReader {
            reader,
            version: Version::LATEST,
        }
    }

    pub fn read_mesh(&mut self) -> Result<Mesh> {
        let mut sig = [0u8; 4];
        self.reader.read_exact(&mut sig)?;
        if &sig != MESH_SIGNATURE {
            return Err(Error::BadSignature(sig));
        }
        self.version = Version::try_from(self.reader.read_u32::<LittleEndian>()?)?;
        tracing::debug!(version = %self.version, "decoding mesh");

        let code = if self.version.has_code() {
            self.reader.read_u32::<LittleEndian>()?
        } else {
            0
        };
        let materials = self.read_materials()?;
        let nodes = self.read_nodes()?;
        let instances = self.read_instances()?;
        let properties = if self.version.has_properties() {
            if self.reader.read_u32::<LittleEndian>()? > 0 {
                Some(Properties::decode(&mut self.reader)?)
            } else {
                None
            }
        } else {
            None
        };

        Ok(Mesh {
            base: BaseMesh {
                materials,
                nodes,
                code,
            },
            version: self.version,
            instances,
            properties,
        })
    }

    fn read_materials(&mut self) -> Result<Vec<Material>> {
        let count = self.reader.read_u32::<LittleEndian>()?;
        let mut materials = Vec::with_capacity(count as usize);
        for _ in 0..count {
            materials.push(self.read_material()?);
        }
        Ok(materials)
    }

    fn read_material(&mut self) -> Result<Material> {
        let tag = self.reader.read_u32::<LittleEndian>()?;
        match tag {
            MATERIAL_TYPE_COLOR => Ok(Material::Base(self.read_base_material()?)),
            MATERIAL_TYPE_TEXTURE => Ok(Material::Texture(self.read_texture_material()?)),
            MATERIAL_TYPE_PBR => Ok(Material::Pbr(self.read_pbr_material()?)),
            MATERIAL_TYPE_LAMBERT => Ok(Material::Lambert(self.read_lambert_material()?)),
            MATERIAL_TYPE_PHONG => Ok(Material::Phong(self.read_phong_material()?)),
            other => Err(Error::UnknownMaterialType(other)),
        }
    }

    fn read_base_material(&mut self) -> Result<BaseMaterial> {
        let mut color = [0u8; 3];
        self.reader.read_exact(&mut color)?;
        let transparency = self.reader.read_f32::<LittleEndian>()?;
        Ok(BaseMaterial {
            color,
            transparency,
        })
    }

    fn read_texture_material(&mut self) -> Result<TextureMaterial> {
        let base = self.read_base_material()?;
        let texture = self.read_optional_texture()?;
        let normal = self.read_optional_texture()?;
        Ok(TextureMaterial {
            base,
            texture,
            normal,
        })
    }

    fn read_optional_texture(&mut self) -> Result<Option<Texture>> {
        if self.reader.read_u16::<LittleEndian>()? == 1 {
            Ok(Some(self.read_texture()?))
        } else {
            Ok(None)
        }
    }

    fn read_texture(&mut self) -> Result<Texture> {
        let id = self.reader.read_i32::<LittleEndian>()?;
        let name_len = self.reader.read_u32::<LittleEndian>()?;
        let mut name_bytes = vec![0u8; name_len as usize];
        self.reader.read_exact(&mut name_bytes)?;
        let name = String::from_utf8_lossy(&name_bytes).into_owned();
        let size = [
            self.reader.read_u64::<LittleEndian>()?,
            self.reader.read_u64::<LittleEndian>()?,
        ];
        let format = self.reader.read_u16::<LittleEndian>()?.try_into()?;
        let pixel_type = self.reader.read_u16::<LittleEndian>()?.try_into()?;
        let compression = self.reader.read_u16::<LittleEndian>()?.try_into()?;
        let data_len = self.reader.read_u32::<LittleEndian>()?;
        let mut data = vec![0u8; data_len as usize];
        self.reader.read_exact(&mut data)?;
        let repeated = self.reader.read_u8()? == 1;
        Ok(Texture {
            id,
            name,
            size,
            format,
            pixel_type,
            compression,
            data,
            repeated,
        })
    }

    fn read_pbr_material(&mut self) -> Result<PbrMaterial> {
        let base = self.read_texture_material()?;
        let mut m = PbrMaterial {
            base,
            ..PbrMaterial::default()
        };
        self.reader.read_exact(&mut m.emissive)?;
        if self.version.pbr_filler_byte() {
            self.reader.read_u8()?;
        }
        m.metallic = self.reader.read_f32::<LittleEndian>()?;
        m.roughness = self.reader.read_f32::<LittleEndian>()?;
        m.reflectance = self.reader.read_f32::<LittleEndian>()?;
        m.ambient_occlusion = self.reader.read_f32::<LittleEndian>()?;
        m.clear_coat = self.reader.read_f32::<LittleEndian>()?;
        m.clear_coat_roughness = self.reader.read_f32::<LittleEndian>()?;
        self.reader.read_exact(&mut m.clear_coat_normal)?;
        m.anisotropy = self.reader.read_f32::<LittleEndian>()?;
        for v in &mut m.anisotropy_direction {
            *v = self.reader.read_f32::<LittleEndian>()?;
        }
        m.thickness = self.reader.read_f32::<LittleEndian>()?;
        m.subsurface_power = self.reader.read_f32::<LittleEndian>()?;
        self.reader.read_exact(&mut m.sheen_color)?;
        self.reader.read_exact(&mut m.subsurface_color)?;
        Ok(m)
    }

    fn read_lambert_material(&mut self) -> Result<LambertMaterial> {
        let base = self.read_texture_material()?;
        let mut m = LambertMaterial {
            base,
            ..LambertMaterial::default()
        };
        self.reader.read_exact(&mut m.ambient)?;
        self.reader.read_exact(&mut m.diffuse)?;
        self.reader.read_exact(&mut m.emissive)?;
        Ok(m)
    }

    fn read_phong_material(&mut self) -> Result<PhongMaterial> {
        let base = self.read_lambert_material()?;
        let mut m = PhongMaterial {
            base,
            ..PhongMaterial::default()
        };
        self.reader.read_exact(&mut m.specular)?;
        m.shininess = self.reader.read_f32::<LittleEndian>()?;
        m.specularity = self.reader.read_f32::<LittleEndian>()?;
        Ok(m)
    }

    fn read_nodes(&mut self) -> Result<Vec<MeshNode>> {
        let count = self.reader.read_u32::<LittleEndian>()?;
        let mut nodes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            nodes.push(self.read_node(self.version.has_properties())?);
        }
        Ok(nodes)
    }

    fn read_node(&mut self, with_properties: bool) -> Result<MeshNode> {
        let mut node = MeshNode::default();

        let count = self.reader.read_u32::<LittleEndian>()?;
        node.vertices = Vec::with_capacity(count as usize);
        for _ in 0..count {
            node.vertices.push(self.read_vec3()?);
        }
        let count = self.reader.read_u32::<LittleEndian>()?;
        node.normals = Vec::with_capacity(count as usize);
        for _ in 0..count {
            node.normals.push(self.read_vec3()?);
        }
        let count = self.reader.read_u32::<LittleEndian>()?;
        node.colors = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let mut rgb = [0u8; 3];
            self.reader.read_exact(&mut rgb)?;
            node.colors.push(rgb);
        }
        let count = self.reader.read_u32::<LittleEndian>()?;
        node.tex_coords = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let u = self.reader.read_f32::<LittleEndian>()?;
            let v = self.reader.read_f32::<LittleEndian>()?;
            node.tex_coords.push([u, v]);
        }
        if self.reader.read_u8()? == 1 {
            node.matrix = Some(self.read_matrix()?);
        }

        let count = self.reader.read_u32::<LittleEndian>()?;
        node.face_groups = Vec::with_capacity(count as usize);
        for _ in 0..count {
            node.face_groups.push(self.read_face_group()?);
        }
        let count = self.reader.read_u32::<LittleEndian>()?;
        node.edge_groups = Vec::with_capacity(count as usize);
        for _ in 0..count {
            node.edge_groups.push(self.read_edge_group()?);
        }
        if with_properties {
            node.properties = Properties::decode_opt(&mut self.reader)?;
        }
        Ok(node)
    }

    fn read_vec3(&mut self) -> Result<[f32; 3]> {
        let mut v = [0f32; 3];
        for c in &mut v {
            *c = self.reader.read_f32::<LittleEndian>()?;
        }
        Ok(v)
    }

    fn read_matrix(&mut self) -> Result<[f64; 16]> {
        let mut matrix = [0f64; 16];
        for v in &mut matrix {
            *v = self.reader.read_f64::<LittleEndian>()?;
        }
        Ok(matrix)
    }

    fn read_face_group(&mut self) -> Result<FaceGroup> {
        let batch_id = self.reader.read_i32::<LittleEndian>()?;
        let count = self.reader.read_u32::<LittleEndian>()?;
        let mut faces = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let mut vertex = [0u32; 3];
            for idx in &mut vertex {
                *idx = self.reader.read_u32::<LittleEndian>()?;
            }
            faces.push(Face {
                vertex,
                normal: None,
                uv: None,
            });
        }
        Ok(FaceGroup { batch_id, faces })
    }

    fn read_edge_group(&mut self) -> Result<EdgeGroup> {
        let batch_id = self.reader.read_i32::<LittleEndian>()?;
        let count = self.reader.read_u32::<LittleEndian>()?;
        let mut edges = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let a = self.reader.read_u32::<LittleEndian>()?;
            let b = self.reader.read_u32::<LittleEndian>()?;
            edges.push([a, b]);
        }
        Ok(EdgeGroup { batch_id, edges })
    }

    fn read_instances(&mut self) -> Result<Vec<InstanceMesh>> {
        let count = self.reader.read_u32::<LittleEndian>()?;
        let mut instances = Vec::with_capacity(count as usize);
        for _ in 0..count {
            instances.push(self.read_instance()?);
        }
        Ok(instances)
    }

    fn read_instance(&mut self) -> Result<InstanceMesh> {
        let count = self.reader.read_u32::<LittleEndian>()?;
        let mut transforms = Vec::with_capacity(count as usize);
        for _ in 0..count {
            transforms.push(self.read_matrix()?);
        }

        let count = self.reader.read_u32::<LittleEndian>()?;
        let mut features = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let feature = if self.version.wide_features() {
                self.reader.read_u64::<LittleEndian>()?
            } else {
                u64::from(self.reader.read_u32::<LittleEndian>()?)
            };
            features.push(feature);
        }

        let mut bbox = [0f64; 6];
        for v in &mut bbox {
            *v = self.reader.read_f64::<LittleEndian>()?;
        }

        let mesh = self.read_embedded_mesh()?;

        let mut properties = Vec::new();
        if self.version.has_properties() {
            let declared = self.reader.read_u32::<LittleEndian>()?;
            properties.reserve(declared as usize);
            for _ in 0..declared {
                if self.reader.read_u32::<LittleEndian>()? > 0 {
                    properties.push(Some(Properties::decode(&mut self.reader)?));
                } else {
                    properties.push(None);
                }
            }
        }
        // One slot per instance even when the stream declared fewer.
        let instances = properties
            .len()
            .max(transforms.len())
            .max(features.len());
        properties.resize(instances, None);

        let hash = self.reader.read_u64::<LittleEndian>()?;

        Ok(InstanceMesh {
            transforms,
            features,
            bbox: Some(bbox),
            mesh,
            properties,
            hash,
        })
    }

    fn read_embedded_mesh(&mut self) -> Result<BaseMesh> {
        let materials = self.read_materials()?;
        let count = self.reader.read_u32::<LittleEndian>()?;
        let mut nodes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            nodes.push(self.read_node(false)?);
        }
        let code = if self.version.has_code() {
            self.reader.read_u32::<LittleEndian>()?
        } else {
            0
        };
        Ok(BaseMesh {
            materials,
            nodes,
            code,
        })
    }
}
