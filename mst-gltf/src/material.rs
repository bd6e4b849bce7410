//! MST material and texture mapping onto glTF.
//!
//! Every material variant becomes a double-sided, alpha-masked glTF
//! material over PBR metallic-roughness. Lambert and Phong additionally
//! carry the `KHR_materials_pbrSpecularGlossiness` extension so viewers
//! keep the classic shading terms.

use std::io::Cursor;

use gltf_json as json;
use gltf_json::validation::Checked::Valid;
use hashbrown::HashMap;
use mst_format::{Material, Texture};

use crate::builder::DocumentBuilder;
use crate::error::Result;

fn scaled(rgb: [u8; 3]) -> [f32; 3] {
    [
        f32::from(rgb[0]) / 255.0,
        f32::from(rgb[1]) / 255.0,
        f32::from(rgb[2]) / 255.0,
    ]
}

impl DocumentBuilder {
    /// Append one glTF material per MST material, in order. Texture ids
    /// are deduplicated within this call: the same id reuses the glTF
    /// texture already built, whether it appeared as base color or normal
    /// map.
    pub(crate) fn fill_materials(&mut self, materials: &[Material]) -> Result<()> {
        let mut texture_map: HashMap<i32, u32> = HashMap::new();

        for material in materials {
            let [r, g, b] = scaled(material.color());
            let base_color = [r, g, b, 1.0 - material.transparency()];
            let emissive = scaled(material.emissive());

            let mut metallic = 0.0;
            let mut roughness = 1.0;
            let mut specular_glossiness = None;
            match material {
                Material::Pbr(m) => {
                    metallic = m.metallic;
                    roughness = m.roughness;
                }
                Material::Lambert(m) => {
                    specular_glossiness = Some(json::extensions::material::PbrSpecularGlossiness {
                        diffuse_factor: json::extensions::material::PbrDiffuseFactor({
                            let [r, g, b] = scaled(m.diffuse);
                            [r, g, b, 1.0]
                        }),
                        ..Default::default()
                    });
                }
                Material::Phong(m) => {
                    specular_glossiness = Some(json::extensions::material::PbrSpecularGlossiness {
                        diffuse_factor: json::extensions::material::PbrDiffuseFactor({
                            let [r, g, b] = scaled(m.base.diffuse);
                            [r, g, b, 1.0]
                        }),
                        specular_factor: json::extensions::material::PbrSpecularFactor(scaled(
                            m.specular,
                        )),
                        glossiness_factor: json::material::StrengthFactor(m.shininess),
                        ..Default::default()
                    });
                }
                Material::Base(_) | Material::Texture(_) => {}
            }

            let base_color_texture = match material.texture() {
                Some(tex) => Some(json::texture::Info {
                    index: json::Index::new(self.texture_index(&mut texture_map, tex)?),
                    tex_coord: 0,
                    extensions: Default::default(),
                    extras: Default::default(),
                }),
                None => None,
            };
            let normal_texture = match material.normal_texture() {
                Some(tex) => Some(json::material::NormalTexture {
                    index: json::Index::new(self.texture_index(&mut texture_map, tex)?),
                    scale: 1.0,
                    tex_coord: 0,
                    extensions: Default::default(),
                    extras: Default::default(),
                }),
                None => None,
            };

            let extensions = specular_glossiness.map(|sg| {
                self.specular_glossiness_used = true;
                let mut ext = json::extensions::material::Material::default();
                ext.pbr_specular_glossiness = Some(sg);
                ext
            });

            self.materials.push(json::Material {
                alpha_cutoff: None,
                alpha_mode: Valid(json::material::AlphaMode::Mask),
                double_sided: true,
                name: None,
                pbr_metallic_roughness: json::material::PbrMetallicRoughness {
                    base_color_factor: json::material::PbrBaseColorFactor(base_color),
                    base_color_texture,
                    metallic_factor: json::material::StrengthFactor(metallic),
                    roughness_factor: json::material::StrengthFactor(roughness),
                    metallic_roughness_texture: None,
                    extensions: Default::default(),
                    extras: Default::default(),
                },
                normal_texture,
                occlusion_texture: None,
                emissive_texture: None,
                emissive_factor: json::material::EmissiveFactor(emissive),
                extensions,
                extras: Default::default(),
            });
        }
        Ok(())
    }

    fn texture_index(
        &mut self,
        texture_map: &mut HashMap<i32, u32>,
        texture: &Texture,
    ) -> Result<u32> {
        if let Some(&index) = texture_map.get(&texture.id) {
            return Ok(index);
        }
        let index = self.build_texture(texture)?;
        texture_map.insert(texture.id, index);
        Ok(index)
    }

    /// Materialize the texture as an embedded PNG: buffer view, image,
    /// sampler and texture records.
    fn build_texture(&mut self, texture: &Texture) -> Result<u32> {
        let pixels = texture.decode_pixels(true)?;
        let mut png = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(pixels).write_to(&mut png, image::ImageFormat::Png)?;
        let png = png.into_inner();

        let view_index = self.views.len() as u32;
        self.views.push(json::buffer::View {
            buffer: json::Index::new(0),
            byte_length: (png.len() as u64).into(),
            byte_offset: Some((self.buffer.len() as u64).into()),
            byte_stride: None,
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            target: None,
        });
        self.buffer.extend_from_slice(&png);

        let image_index = self.images.len() as u32;
        self.images.push(json::Image {
            buffer_view: Some(json::Index::new(view_index)),
            mime_type: Some(json::image::MimeType("image/png".to_string())),
            name: None,
            uri: None,
            extensions: Default::default(),
            extras: Default::default(),
        });

        let wrap = if texture.repeated {
            json::texture::WrappingMode::Repeat
        } else {
            json::texture::WrappingMode::ClampToEdge
        };
        let sampler_index = self.samplers.len() as u32;
        self.samplers.push(json::texture::Sampler {
            mag_filter: None,
            min_filter: None,
            name: None,
            wrap_s: Valid(wrap),
            wrap_t: Valid(wrap),
            extensions: Default::default(),
            extras: Default::default(),
        });

        let texture_index = self.textures.len() as u32;
        self.textures.push(json::Texture {
            name: None,
            sampler: Some(json::Index::new(sampler_index)),
            source: json::Index::new(image_index),
            extensions: Default::default(),
            extras: Default::default(),
        });
        Ok(texture_index)
    }
}
