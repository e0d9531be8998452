use std::path::PathBuf;

use ultraviolet::Vec3;

/// Slot of an image in the texture array bound to the ray tracing pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub(crate) u32);

impl TextureId {
    pub fn slot(self) -> u32 {
        self.0
    }
}

/// An image file that is decoded and uploaded when the scene is brought onto the device.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureResource {
    pub name: String,
    pub path: PathBuf,
    pub id: TextureId,
}

/// How a surface looks up its albedo. Everything but `Image` is evaluated procedurally on the GPU.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Texture {
    FlatColor {
        color: Vec3,
    },
    CheckerBoard {
        odd: Vec3,
        even: Vec3,
        scale: f32,
    },
    Simplex3D {
        color: Vec3,
        scale: f32,
        frequency: f32,
    },
    Turbulence {
        color: Vec3,
        scale: f32,
        frequency: f32,
        depth: u32,
    },
    Marble {
        color: Vec3,
        scale: f32,
        frequency: f32,
        depth: u32,
    },
    Image {
        texture: TextureId,
    },
    /// Visualizes the surface normal
    Normals,
}

impl Texture {
    pub fn flat(r: f32, g: f32, b: f32) -> Self {
        Texture::FlatColor {
            color: Vec3::new(r, g, b),
        }
    }

    pub(crate) fn kind(&self) -> u32 {
        match self {
            Texture::FlatColor { .. } => 0,
            Texture::CheckerBoard { .. } => 1,
            Texture::Simplex3D { .. } => 2,
            Texture::Turbulence { .. } => 3,
            Texture::Marble { .. } => 4,
            Texture::Image { .. } => 5,
            Texture::Normals => 6,
        }
    }

    pub(crate) fn image(&self) -> Option<TextureId> {
        match self {
            Texture::Image { texture } => Some(*texture),
            _ => None,
        }
    }
}
