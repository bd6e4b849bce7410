//! MST stream encoder.

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::error::Result;
use crate::material::{
    BaseMaterial, LambertMaterial, Material, PbrMaterial, PhongMaterial, TextureMaterial,
};
use crate::mesh::{BaseMesh, EdgeGroup, FaceGroup, InstanceMesh, Mesh, MeshNode};
use crate::properties::Properties;
use crate::texture::Texture;
use crate::version::Version;
use crate::MESH_SIGNATURE;

/// Serializes a [`Mesh`] at a fixed format revision.
///
/// The writer never consults `Mesh::version`; the revision passed to
/// [`MstWriter::new`] decides every version-gated field, so one in-memory
/// mesh can be written at any revision.
pub struct MstWriter<W: Write> {
    writer: W,
    version: Version,
}

impl<W: Write> MstWriter<W> {
    pub fn new(writer: W, version: Version) -> Self {
        MstWriter { writer, version }
    }

    pub fn write_mesh(&mut self, mesh: &Mesh) -> Result<()> {
        tracing::debug!(
            version = %self.version,
            nodes = mesh.base.nodes.len(),
            instances = mesh.instances.len(),
            "encoding mesh"
        );
        self.writer.write_all(MESH_SIGNATURE)?;
        self.writer.write_u32::<LittleEndian>(self.version.as_u32())?;
        if self.version.has_code() {
            self.writer.write_u32::<LittleEndian>(mesh.base.code)?;
        }
        self.write_materials(&mesh.base.materials)?;
        self.write_nodes(&mesh.base.nodes)?;
        self.write_instances(&mesh.instances)?;
        if self.version.has_properties() {
            match &mesh.properties {
                Some(props) if !props.is_empty() => {
                    self.writer.write_u32::<LittleEndian>(1)?;
                    props.encode(&mut self.writer)?;
                }
                _ => self.writer.write_u32::<LittleEndian>(0)?,
            }
        }
        Ok(())
    }

    fn write_materials(&mut self, materials: &[Material]) -> Result<()> {
        self.writer.write_u32::<LittleEndian>(materials.len() as u32)?;
        for material in materials {
            self.write_material(material)?;
        }
        Ok(())
    }

    fn write_material(&mut self, material: &Material) -> Result<()> {
        self.writer.write_u32::<LittleEndian>(material.type_tag())?;
        match material {
            Material::Base(m) => self.write_base_material(m),
            Material::Texture(m) => self.write_texture_material(m),
            Material::Pbr(m) => self.write_pbr_material(m),
            Material::Lambert(m) => self.write_lambert_material(m),
            Material::Phong(m) => self.write_phong_material(m),
        }
    }

    fn write_base_material(&mut self, m: &BaseMaterial) -> Result<()> {
        self.writer.write_all(&m.color)?;
        self.writer.write_f32::<LittleEndian>(m.transparency)?;
        Ok(())
    }

    fn write_texture_material(&mut self, m: &TextureMaterial) -> Result<()> {
        self.write_base_material(&m.base)?;
        self.write_optional_texture(m.texture.as_ref())?;
        self.write_optional_texture(m.normal.as_ref())
    }

    fn write_optional_texture(&mut self, texture: Option<&Texture>) -> Result<()> {
        match texture {
            Some(tex) => {
                self.writer.write_u16::<LittleEndian>(1)?;
                self.write_texture(tex)
            }
            None => Ok(self.writer.write_u16::<LittleEndian>(0)?),
        }
    }

    fn write_texture(&mut self, tex: &Texture) -> Result<()> {
        self.writer.write_i32::<LittleEndian>(tex.id)?;
        self.writer.write_u32::<LittleEndian>(tex.name.len() as u32)?;
        self.writer.write_all(tex.name.as_bytes())?;
        self.writer.write_u64::<LittleEndian>(tex.size[0])?;
        self.writer.write_u64::<LittleEndian>(tex.size[1])?;
        self.writer.write_u16::<LittleEndian>(tex.format as u16)?;
        self.writer.write_u16::<LittleEndian>(tex.pixel_type as u16)?;
        self.writer.write_u16::<LittleEndian>(tex.compression as u16)?;
        self.writer.write_u32::<LittleEndian>(tex.data.len() as u32)?;
        self.writer.write_all(&tex.data)?;
        self.writer.write_u8(u8::from(tex.repeated))?;
        Ok(())
    }

    fn write_pbr_material(&mut self, m: &PbrMaterial) -> Result<()> {
        self.write_texture_material(&m.base)?;
        self.writer.write_all(&m.emissive)?;
        if self.version.pbr_filler_byte() {
            self.writer.write_u8(0xFF)?;
        }
        self.writer.write_f32::<LittleEndian>(m.metallic)?;
        self.writer.write_f32::<LittleEndian>(m.roughness)?;
        self.writer.write_f32::<LittleEndian>(m.reflectance)?;
        self.writer.write_f32::<LittleEndian>(m.ambient_occlusion)?;
        self.writer.write_f32::<LittleEndian>(m.clear_coat)?;
        self.writer.write_f32::<LittleEndian>(m.clear_coat_roughness)?;
        self.writer.write_all(&m.clear_coat_normal)?;
        self.writer.write_f32::<LittleEndian>(m.anisotropy)?;
        for v in m.anisotropy_direction {
            self.writer.write_f32::<LittleEndian>(v)?;
        }
        self.writer.write_f32::<LittleEndian>(m.thickness)?;
        self.writer.write_f32::<LittleEndian>(m.subsurface_power)?;
        self.writer.write_all(&m.sheen_color)?;
        self.writer.write_all(&m.subsurface_color)?;
        Ok(())
    }

    fn write_lambert_material(&mut self, m: &LambertMaterial) -> Result<()> {
        self.write_texture_material(&m.base)?;
        self.writer.write_all(&m.ambient)?;
        self.writer.write_all(&m.diffuse)?;
        self.writer.write_all(&m.emissive)?;
        Ok(())
    }

    fn write_phong_material(&mut self, m: &PhongMaterial) -> Result<()> {
        self.write_lambert_material(&m.base)?;
        self.writer.write_all(&m.specular)?;
        self.writer.write_f32::<LittleEndian>(m.shininess)?;
        self.writer.write_f32::<LittleEndian>(m.specularity)?;
        Ok(())
    }

    fn write_nodes(&mut self, nodes: &[MeshNode]) -> Result<()> {
        self.writer.write_u32::<LittleEndian>(nodes.len() as u32)?;
        for node in nodes {
            self.write_node(node, self.version.has_properties())?;
        }
        Ok(())
    }

    /// Instance geometry never carries per-node properties, so the trailer
    /// is controlled by the caller rather than the version alone.
    fn write_node(&mut self, node: &MeshNode, with_properties: bool) -> Result<()> {
        self.writer.write_u32::<LittleEndian>(node.vertices.len() as u32)?;
        for v in &node.vertices {
            for c in v {
                self.writer.write_f32::<LittleEndian>(*c)?;
            }
        }
        self.writer.write_u32::<LittleEndian>(node.normals.len() as u32)?;
        for n in &node.normals {
            for c in n {
                self.writer.write_f32::<LittleEndian>(*c)?;
            }
        }
        self.writer.write_u32::<LittleEndian>(node.colors.len() as u32)?;
        for c in &node.colors {
            self.writer.write_all(c)?;
        }
        self.writer.write_u32::<LittleEndian>(node.tex_coords.len() as u32)?;
        for uv in &node.tex_coords {
            for c in uv {
                self.writer.write_f32::<LittleEndian>(*c)?;
            }
        }
        match &node.matrix {
            Some(matrix) => {
                self.writer.write_u8(1)?;
                self.write_matrix(matrix)?;
            }
            None => self.writer.write_u8(0)?,
        }
        self.writer.write_u32::<LittleEndian>(node.face_groups.len() as u32)?;
        for group in &node.face_groups {
            self.write_face_group(group)?;
        }
        self.writer.write_u32::<LittleEndian>(node.edge_groups.len() as u32)?;
        for group in &node.edge_groups {
            self.write_edge_group(group)?;
        }
        if with_properties {
            Properties::encode_opt(node.properties.as_ref(), &mut self.writer)?;
        }
        Ok(())
    }

    fn write_matrix(&mut self, matrix: &[f64; 16]) -> Result<()> {
        for v in matrix {
            self.writer.write_f64::<LittleEndian>(*v)?;
        }
        Ok(())
    }

    fn write_face_group(&mut self, group: &FaceGroup) -> Result<()> {
        self.writer.write_i32::<LittleEndian>(group.batch_id)?;
        self.writer.write_u32::<LittleEndian>(group.faces.len() as u32)?;
        for face in &group.faces {
            for idx in face.vertex {
                self.writer.write_u32::<LittleEndian>(idx)?;
            }
        }
        Ok(())
    }

    fn write_edge_group(&mut self, group: &EdgeGroup) -> Result<()> {
        self.writer.write_i32::<LittleEndian>(group.batch_id)?;
        self.writer.write_u32::<LittleEndian>(group.edges.len() as u32)?;
        for edge in &group.edges {
            self.writer.write_u32::<LittleEndian>(edge[0])?;
            self.writer.write_u32::<LittleEndian>(edge[1])?;
        }
        Ok(())
    }

    fn write_instances(&mut self, instances: &[InstanceMesh]) -> Result<()> {
        self.writer.write_u32::<LittleEndian>(instances.len() as u32)?;
        for instance in instances {
            self.write_instance(instance)?;
        }
        Ok(())
    }

    fn write_instance(&mut self, instance: &InstanceMesh) -> Result<()> {
        self.writer.write_u32::<LittleEndian>(instance.transforms.len() as u32)?;
        for matrix in &instance.transforms {
            self.write_matrix(matrix)?;
        }
        self.writer.write_u32::<LittleEndian>(instance.features.len() as u32)?;
        for &feature in &instance.features {
            if self.version.wide_features() {
                self.writer.write_u64::<LittleEndian>(feature)?;
            } else {
                self.writer.write_u32::<LittleEndian>(feature as u32)?;
            }
        }
        for v in instance.bbox.unwrap_or_default() {
            self.writer.write_f64::<LittleEndian>(v)?;
        }
        self.write_embedded_mesh(&instance.mesh)?;
        if self.version.has_properties() {
            // One slot per instance on the wire; short property arrays pad
            // out with zero flags.
            let declared = instance
                .properties
                .len()
                .max(instance.transforms.len())
                .max(instance.features.len());
            self.writer.write_u32::<LittleEndian>(declared as u32)?;
            for i in 0..declared {
                match instance.properties.get(i).and_then(|p| p.as_ref()) {
                    Some(p) if !p.is_empty() => {
                        self.writer.write_u32::<LittleEndian>(1)?;
                        p.encode(&mut self.writer)?;
                    }
                    _ => self.writer.write_u32::<LittleEndian>(0)?,
                }
            }
        }
        self.writer.write_u64::<LittleEndian>(instance.hash)?;
        Ok(())
    }

    fn write_embedded_mesh(&mut self, mesh: &BaseMesh) -> Result<()> {
        self.write_materials(&mesh.materials)?;
        self.writer.write_u32::<LittleEndian>(mesh.nodes.len() as u32)?;
        for node in &mesh.nodes {
            self.write_node(node, false)?;
        }
        if self.version.has_code() {
            self.writer.write_u32::<LittleEndian>(mesh.code)?;
        }
        Ok(())
    }
}
