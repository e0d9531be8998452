use bytemuck::{Pod, Zeroable};
use ultraviolet::Vec3;

use super::Vertex;
use crate::error::SceneError;

/// Registration index of a model inside its scene. Never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub(crate) u32);

impl ModelId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Layout matches `vk::AabbPositionsKHR`.
#[derive(Clone, Copy, Debug, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
        }
    }

    pub fn cube(half_extent: f32) -> Self {
        Self::new(Vec3::broadcast(-half_extent), Vec3::broadcast(half_extent))
    }
}

/// Volume whose ray intersection is computed by an intersection shader.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProceduralPrimitive {
    Sphere,
    Box,
}

/// Shading routine family a model is dispatched to by default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitGroup {
    Triangles,
    Sphere,
    Box,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Triangles {
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
    },
    Procedural {
        primitive: ProceduralPrimitive,
        aabb: Aabb,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    pub name: String,
    pub geometry: Geometry,
}

impl Model {
    pub fn triangles(name: impl Into<String>, vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            geometry: Geometry::Triangles { vertices, indices },
        }
    }

    pub fn procedural(name: impl Into<String>, primitive: ProceduralPrimitive, aabb: Aabb) -> Self {
        Self {
            name: name.into(),
            geometry: Geometry::Procedural { primitive, aabb },
        }
    }

    pub fn vertices(&self) -> &[Vertex] {
        match &self.geometry {
            Geometry::Triangles { vertices, .. } => vertices,
            Geometry::Procedural { .. } => &[],
        }
    }

    pub fn indices(&self) -> &[u32] {
        match &self.geometry {
            Geometry::Triangles { indices, .. } => indices,
            Geometry::Procedural { .. } => &[],
        }
    }

    pub fn aabb(&self) -> Option<&Aabb> {
        match &self.geometry {
            Geometry::Triangles { .. } => None,
            Geometry::Procedural { aabb, .. } => Some(aabb),
        }
    }

    pub fn hit_group(&self) -> HitGroup {
        match self.geometry {
            Geometry::Triangles { .. } => HitGroup::Triangles,
            Geometry::Procedural {
                primitive: ProceduralPrimitive::Sphere,
                ..
            } => HitGroup::Sphere,
            Geometry::Procedural {
                primitive: ProceduralPrimitive::Box,
                ..
            } => HitGroup::Box,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), SceneError> {
        let Geometry::Triangles { vertices, indices } = &self.geometry else {
            return Ok(());
        };

        if vertices.is_empty() {
            return Err(SceneError::EmptyTriangleModel {
                name: self.name.clone(),
            });
        }
        if indices.len() % 3 != 0 {
            return Err(SceneError::MalformedIndices {
                name: self.name.clone(),
                reason: format!("{} indices do not form whole triangles", indices.len()),
            });
        }
        if let Some(index) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(SceneError::MalformedIndices {
                name: self.name.clone(),
                reason: format!("index {} exceeds {} vertices", index, vertices.len()),
            });
        }
        Ok(())
    }
}
