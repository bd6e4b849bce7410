//! Polymorphic material variants.
//!
//! The on-disk format models materials as a single-inheritance hierarchy
//! (base → texture → pbr / lambert → phong). In memory that becomes a
//! closed enum with struct embedding, so the codec can dispatch with an
//! exhaustive match and parent fields always serialize first.

use crate::texture::Texture;

/// Material type tags as stored in the stream.
pub const MATERIAL_TYPE_COLOR: u32 = 0;
pub const MATERIAL_TYPE_TEXTURE: u32 = 1;
pub const MATERIAL_TYPE_PBR: u32 = 2;
pub const MATERIAL_TYPE_LAMBERT: u32 = 3;
pub const MATERIAL_TYPE_PHONG: u32 = 4;

/// Flat color with transparency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseMaterial {
    pub color: [u8; 3],
    /// 0 = opaque, 1 = fully transparent.
    pub transparency: f32,
}

/// Base material plus optional diffuse and normal-map textures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureMaterial {
    pub base: BaseMaterial,
    pub texture: Option<Texture>,
    pub normal: Option<Texture>,
}

/// Physically-based material (Filament-style parameter set).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PbrMaterial {
    pub base: TextureMaterial,
    pub emissive: [u8; 3],
    pub metallic: f32,
    pub roughness: f32,
    pub reflectance: f32,
    pub ambient_occlusion: f32,
    pub clear_coat: f32,
    pub clear_coat_roughness: f32,
    pub clear_coat_normal: [u8; 3],
    pub anisotropy: f32,
    pub anisotropy_direction: [f32; 3],
    /// Subsurface variants only.
    pub thickness: f32,
    /// Subsurface variants only.
    pub subsurface_power: f32,
    /// Cloth variants only.
    pub sheen_color: [u8; 3],
    /// Subsurface or cloth variants.
    pub subsurface_color: [u8; 3],
}

/// Classic diffuse shading model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LambertMaterial {
    pub base: TextureMaterial,
    pub ambient: [u8; 3],
    pub diffuse: [u8; 3],
    pub emissive: [u8; 3],
}

/// Lambert plus a specular highlight term.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhongMaterial {
    pub base: LambertMaterial,
    pub specular: [u8; 3],
    pub shininess: f32,
    pub specularity: f32,
}

/// The closed set of material variants a mesh may reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    Base(BaseMaterial),
    Texture(TextureMaterial),
    Pbr(PbrMaterial),
    Lambert(LambertMaterial),
    Phong(PhongMaterial),
}

impl Material {
    pub fn type_tag(&self) -> u32 {
        match self {
            Material::Base(_) => MATERIAL_TYPE_COLOR,
            Material::Texture(_) => MATERIAL_TYPE_TEXTURE,
            Material::Pbr(_) => MATERIAL_TYPE_PBR,
            Material::Lambert(_) => MATERIAL_TYPE_LAMBERT,
            Material::Phong(_) => MATERIAL_TYPE_PHONG,
        }
    }

    /// The embedded texture layer, when this variant carries one.
    pub fn texture_material(&self) -> Option<&TextureMaterial> {
        match self {
            Material::Base(_) => None,
            Material::Texture(m) => Some(m),
            Material::Pbr(m) => Some(&m.base),
            Material::Lambert(m) => Some(&m.base),
            Material::Phong(m) => Some(&m.base.base),
        }
    }

    pub fn has_texture(&self) -> bool {
        self.texture().is_some()
    }

    pub fn texture(&self) -> Option<&Texture> {
        self.texture_material().and_then(|m| m.texture.as_ref())
    }

    pub fn normal_texture(&self) -> Option<&Texture> {
        self.texture_material().and_then(|m| m.normal.as_ref())
    }

    pub fn color(&self) -> [u8; 3] {
        self.base_material().color
    }

    pub fn transparency(&self) -> f32 {
        self.base_material().transparency
    }

    pub fn emissive(&self) -> [u8; 3] {
        match self {
            Material::Pbr(m) => m.emissive,
            Material::Lambert(m) => m.emissive,
            Material::Phong(m) => m.base.emissive,
            _ => [0, 0, 0],
        }
    }

    fn base_material(&self) -> &BaseMaterial {
        match self {
            Material::Base(m) => m,
            Material::Texture(m) => &m.base,
            Material::Pbr(m) => &m.base.base,
            Material::Lambert(m) => &m.base.base,
            Material::Phong(m) => &m.base.base.base,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Material::Base(BaseMaterial::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_surface_per_variant() {
        let base = Material::Base(BaseMaterial {
            color: [10, 20, 30],
            transparency: 0.5,
        });
        assert!(!base.has_texture());
        assert_eq!(base.color(), [10, 20, 30]);
        assert_eq!(base.emissive(), [0, 0, 0]);

        let phong = Material::Phong(PhongMaterial {
            base: LambertMaterial {
                base: TextureMaterial {
                    texture: Some(Texture {
                        id: 3,
                        ..Texture::default()
                    }),
                    ..TextureMaterial::default()
                },
                emissive: [1, 2, 3],
                ..LambertMaterial::default()
            },
            ..PhongMaterial::default()
        });
        assert!(phong.has_texture());
        assert_eq!(phong.texture().unwrap().id, 3);
        assert_eq!(phong.emissive(), [1, 2, 3]);
    }
}
