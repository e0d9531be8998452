use bytemuck::{Pod, Zeroable};
use log::info;

use crate::scene::{Aabb, MaterialRecord, Scene, Vertex};

/// Where a model's data starts inside the shared vertex and index buffers, counted in elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Offset {
    pub vertex_offset: u32,
    pub index_offset: u32,
}

impl Offset {
    pub const fn new(vertex_offset: u32, index_offset: u32) -> Self {
        Self {
            vertex_offset,
            index_offset,
        }
    }
}

/// Host side copy of every buffer the ray tracing shaders index into.
///
/// Per model data is concatenated in registration order. Per instance data follows the
/// instance list, so the instance custom index reads both the offset and the material.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct PackedScene {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub model_offsets: Vec<Offset>,
    /// One per instance: the offsets of the instance's model
    pub offsets: Vec<Offset>,
    pub materials: Vec<MaterialRecord>,
    /// Bounding boxes of procedural models only
    pub aabbs: Vec<Aabb>,
    /// Per model position inside `aabbs`, `None` for triangle models
    pub aabb_slots: Vec<Option<u32>>,
}

pub fn pack(scene: &Scene) -> PackedScene {
    let models = scene.models();

    let mut packed = PackedScene {
        vertices: Vec::with_capacity(models.iter().map(|m| m.vertices().len()).sum()),
        indices: Vec::with_capacity(models.iter().map(|m| m.indices().len()).sum()),
        model_offsets: Vec::with_capacity(models.len()),
        aabb_slots: Vec::with_capacity(models.len()),
        ..Default::default()
    };

    for model in models {
        packed.model_offsets.push(Offset::new(
            packed.vertices.len() as u32,
            packed.indices.len() as u32,
        ));
        packed.vertices.extend_from_slice(model.vertices());
        packed.indices.extend_from_slice(model.indices());

        let slot = model.aabb().map(|aabb| {
            packed.aabbs.push(*aabb);
            packed.aabbs.len() as u32 - 1
        });
        packed.aabb_slots.push(slot);
    }

    let instances = scene.instances();
    packed.offsets = instances
        .iter()
        .map(|instance| packed.model_offsets[instance.model.index()])
        .collect();
    packed.materials = instances
        .iter()
        .map(|instance| MaterialRecord::from(&instance.material))
        .collect();

    info!(
        "Packed {} models and {} instances: {} vertices, {} indices, {} procedural bounding boxes",
        models.len(),
        instances.len(),
        packed.vertices.len(),
        packed.indices.len(),
        packed.aabbs.len()
    );

    packed
}

impl PackedScene {
    pub fn has_procedural_geometry(&self) -> bool {
        !self.aabbs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Material, Model, ModelId, ProceduralPrimitive, Texture};
    use crate::transform::AffineTransform;

    fn mesh(name: &str, vertex_count: usize, index_count: usize) -> Model {
        let vertices = (0..vertex_count)
            .map(|i| Vertex {
                position: [i as f32, 0.0, 0.0],
                ..Default::default()
            })
            .collect();
        let indices = (0..index_count).map(|i| (i % vertex_count) as u32).collect();
        Model::triangles(name, vertices, indices)
    }

    fn colored(r: f32) -> Material {
        Material::Lambertian {
            texture: Texture::flat(r, 0.0, 0.0),
        }
    }

    /// Models A (4 vertices, 6 indices) and B (8 vertices, 36 indices), instances [B, A, B]
    fn two_model_scene() -> (Scene, ModelId, ModelId) {
        let mut scene = Scene::new();
        let a = scene.add_model(mesh("A", 4, 6)).unwrap();
        let b = scene.add_model(mesh("B", 8, 36)).unwrap();
        scene
            .add_instance(b, AffineTransform::identity(), colored(0.1))
            .unwrap();
        scene
            .add_instance(a, AffineTransform::identity(), colored(0.2))
            .unwrap();
        scene
            .add_instance(b, AffineTransform::identity(), colored(0.3))
            .unwrap();
        (scene, a, b)
    }

    #[test]
    fn offsets_are_running_sums() {
        let (scene, _, _) = two_model_scene();
        let packed = pack(&scene);

        assert_eq!(
            packed.model_offsets,
            vec![Offset::new(0, 0), Offset::new(4, 6)]
        );
        assert_eq!(packed.vertices.len(), 12);
        assert_eq!(packed.indices.len(), 42);
    }

    #[test]
    fn instance_offsets_follow_their_model() {
        let (scene, _, _) = two_model_scene();
        let packed = pack(&scene);

        assert_eq!(
            packed.offsets,
            vec![Offset::new(4, 6), Offset::new(0, 0), Offset::new(4, 6)]
        );
        for (instance, offset) in scene.instances().iter().zip(&packed.offsets) {
            assert_eq!(*offset, packed.model_offsets[instance.model.index()]);
        }
    }

    #[test]
    fn materials_follow_instance_order() {
        let (scene, _, _) = two_model_scene();
        let packed = pack(&scene);

        assert_eq!(packed.materials.len(), scene.instances().len());
        for (instance, record) in scene.instances().iter().zip(&packed.materials) {
            assert_eq!(*record, MaterialRecord::from(&instance.material));
        }
        assert_eq!(packed.materials[1].primary_color[0], 0.2);
    }

    #[test]
    fn vertices_are_concatenated_in_registration_order() {
        let (scene, _, b) = two_model_scene();
        let packed = pack(&scene);

        let start = packed.model_offsets[b.index()].vertex_offset as usize;
        assert_eq!(&packed.vertices[start..], scene.model(b).unwrap().vertices());
        let start = packed.model_offsets[b.index()].index_offset as usize;
        assert_eq!(&packed.indices[start..], scene.model(b).unwrap().indices());
    }

    #[test]
    fn only_procedural_models_get_bounding_boxes() {
        let mut scene = Scene::new();
        scene.add_model(mesh("A", 3, 3)).unwrap();
        scene
            .add_model(Model::procedural(
                "sphere",
                ProceduralPrimitive::Sphere,
                Aabb::cube(1.0),
            ))
            .unwrap();
        scene.add_model(mesh("B", 3, 3)).unwrap();
        scene
            .add_model(Model::procedural(
                "box",
                ProceduralPrimitive::Box,
                Aabb::cube(0.5),
            ))
            .unwrap();

        let packed = pack(&scene);
        assert_eq!(packed.aabbs, vec![Aabb::cube(1.0), Aabb::cube(0.5)]);
        assert_eq!(packed.aabb_slots, vec![None, Some(0), None, Some(1)]);
        // procedural models do not advance the vertex offsets
        assert_eq!(packed.model_offsets[2], Offset::new(3, 3));
        assert_eq!(packed.model_offsets[3], Offset::new(6, 6));
    }

    #[test]
    fn triangle_only_scene_has_no_bounding_boxes() {
        let (scene, _, _) = two_model_scene();
        let packed = pack(&scene);
        assert!(!packed.has_procedural_geometry());
        assert!(packed.aabbs.is_empty());
    }

    #[test]
    fn packing_is_deterministic() {
        let (scene, _, _) = two_model_scene();
        assert_eq!(pack(&scene), pack(&scene));
    }
}
