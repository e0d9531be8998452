use bytemuck::{Pod, Zeroable};
use ultraviolet::Vec3;

use super::Texture;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Material {
    Lambertian { texture: Texture },
    Metallic { texture: Texture, roughness: f32 },
    Dielectric { texture: Texture, refractive_index: f32 },
    Phong { texture: Texture, specular: f32, roughness: f32 },
    Light { texture: Texture, emission_strength: f32 },
    /// Participating medium filling the instance's volume
    Smoke { texture: Texture, density: f32 },
}

impl Material {
    pub fn texture(&self) -> &Texture {
        match self {
            Material::Lambertian { texture }
            | Material::Metallic { texture, .. }
            | Material::Dielectric { texture, .. }
            | Material::Phong { texture, .. }
            | Material::Light { texture, .. }
            | Material::Smoke { texture, .. } => texture,
        }
    }

    fn kind(&self) -> u32 {
        match self {
            Material::Lambertian { .. } => 0,
            Material::Metallic { .. } => 1,
            Material::Dielectric { .. } => 2,
            Material::Phong { .. } => 3,
            Material::Light { .. } => 4,
            Material::Smoke { .. } => 5,
        }
    }

    fn parameters(&self) -> [f32; 2] {
        match *self {
            Material::Lambertian { .. } => [0.0, 0.0],
            Material::Metallic { roughness, .. } => [roughness, 0.0],
            Material::Dielectric {
                refractive_index, ..
            } => [refractive_index, 0.0],
            Material::Phong {
                specular,
                roughness,
                ..
            } => [specular, roughness],
            Material::Light {
                emission_strength, ..
            } => [emission_strength, 0.0],
            Material::Smoke { density, .. } => [density, 0.0],
        }
    }
}

/// Fixed size encoding of a [`Material`] as the shaders read it from the material buffer (std430).
#[derive(Clone, Copy, Debug, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct MaterialRecord {
    pub primary_color: [f32; 4],
    pub secondary_color: [f32; 4],
    pub material_kind: u32,
    pub texture_kind: u32,
    pub texture_slot: u32,
    pub texture_depth: u32,
    pub texture_scale: f32,
    pub texture_frequency: f32,
    pub parameters: [f32; 2],
}

fn color(value: Vec3) -> [f32; 4] {
    [value.x, value.y, value.z, 1.0]
}

impl From<&Material> for MaterialRecord {
    fn from(material: &Material) -> Self {
        let texture = material.texture();
        let mut record = MaterialRecord {
            material_kind: material.kind(),
            texture_kind: texture.kind(),
            parameters: material.parameters(),
            ..Default::default()
        };

        match *texture {
            Texture::FlatColor { color: c } => record.primary_color = color(c),
            Texture::CheckerBoard { odd, even, scale } => {
                record.primary_color = color(odd);
                record.secondary_color = color(even);
                record.texture_scale = scale;
            }
            Texture::Simplex3D {
                color: c,
                scale,
                frequency,
            } => {
                record.primary_color = color(c);
                record.texture_scale = scale;
                record.texture_frequency = frequency;
            }
            Texture::Turbulence {
                color: c,
                scale,
                frequency,
                depth,
            }
            | Texture::Marble {
                color: c,
                scale,
                frequency,
                depth,
            } => {
                record.primary_color = color(c);
                record.texture_scale = scale;
                record.texture_frequency = frequency;
                record.texture_depth = depth;
            }
            Texture::Image { texture } => {
                record.primary_color = [1.0; 4];
                record.texture_slot = texture.slot();
            }
            Texture::Normals => {}
        }

        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::TextureId;

    #[test]
    fn record_is_std430_sized() {
        assert_eq!(std::mem::size_of::<MaterialRecord>(), 64);
        assert_eq!(std::mem::size_of::<MaterialRecord>() % 16, 0);
    }

    #[test]
    fn dielectric_keeps_refractive_index() {
        let record = MaterialRecord::from(&Material::Dielectric {
            texture: Texture::flat(1.0, 1.0, 1.0),
            refractive_index: 1.5,
        });
        assert_eq!(record.material_kind, 2);
        assert_eq!(record.texture_kind, 0);
        assert_eq!(record.parameters, [1.5, 0.0]);
        assert_eq!(record.primary_color, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn image_texture_records_slot() {
        let record = MaterialRecord::from(&Material::Lambertian {
            texture: Texture::Image {
                texture: TextureId(3),
            },
        });
        assert_eq!(record.texture_kind, 5);
        assert_eq!(record.texture_slot, 3);
    }

    #[test]
    fn checker_board_uses_both_colors() {
        let record = MaterialRecord::from(&Material::Metallic {
            texture: Texture::CheckerBoard {
                odd: Vec3::new(0.2, 0.3, 0.1),
                even: Vec3::new(0.9, 0.9, 0.9),
                scale: 10.0,
            },
            roughness: 0.25,
        });
        assert_eq!(record.primary_color, [0.2, 0.3, 0.1, 1.0]);
        assert_eq!(record.secondary_color, [0.9, 0.9, 0.9, 1.0]);
        assert_eq!(record.texture_scale, 10.0);
        assert_eq!(record.parameters[0], 0.25);
    }
}
