//! Built-in shapes. Each shape is an ordinary model; [`ShapeLibrary`] registers the model the
//! first time it is placed and hands the same model to every later instance, so all spheres
//! share one bottom level structure.

use ultraviolet::{Vec2, Vec3};

use super::{Aabb, InstanceId, Material, Model, ModelId, ProceduralPrimitive, Scene, Vertex};
use crate::error::SceneError;
use crate::transform::Transform;

/// Procedural sphere of radius 1 around the origin.
pub fn sphere_model() -> Model {
    Model::procedural("Sphere", ProceduralPrimitive::Sphere, Aabb::cube(1.0))
}

/// Procedural unit cube around the origin.
pub fn procedural_box_model() -> Model {
    Model::procedural("ProceduralBox", ProceduralPrimitive::Box, Aabb::cube(0.5))
}

/// Unit cube around the origin with one quad of four vertices per face.
pub fn box_model() -> Model {
    let faces = [
        (Vec3::unit_x(), -Vec3::unit_z(), Vec3::unit_y()),
        (-Vec3::unit_x(), Vec3::unit_z(), Vec3::unit_y()),
        (Vec3::unit_y(), Vec3::unit_x(), -Vec3::unit_z()),
        (-Vec3::unit_y(), Vec3::unit_x(), Vec3::unit_z()),
        (Vec3::unit_z(), Vec3::unit_x(), Vec3::unit_y()),
        (-Vec3::unit_z(), -Vec3::unit_x(), Vec3::unit_y()),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let base = vertices.len() as u32;
        vertices.extend(quad(normal * 0.5, normal, u, v));
        indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    Model::triangles("Box", vertices, indices)
}

/// Unit square in the xy plane facing +z.
pub fn rectangle_model() -> Model {
    let vertices = quad(Vec3::zero(), Vec3::unit_z(), Vec3::unit_x(), Vec3::unit_y());
    Model::triangles("Rectangle", vertices.to_vec(), vec![0, 1, 2, 0, 2, 3])
}

fn quad(centre: Vec3, normal: Vec3, u: Vec3, v: Vec3) -> [Vertex; 4] {
    let corner = |s: f32, t: f32| {
        Vertex::new(
            centre + u * (s - 0.5) + v * (t - 0.5),
            normal,
            Vec3::one(),
            Vec2::new(s, 1.0 - t),
        )
    };
    [
        corner(0.0, 0.0),
        corner(1.0, 0.0),
        corner(1.0, 1.0),
        corner(0.0, 1.0),
    ]
}

#[derive(Debug, Default)]
pub struct ShapeLibrary {
    sphere: Option<ModelId>,
    cube: Option<ModelId>,
    procedural_cube: Option<ModelId>,
    rectangle: Option<ModelId>,
}

impl ShapeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    fn model(
        slot: &mut Option<ModelId>,
        scene: &mut Scene,
        build: fn() -> Model,
    ) -> Result<ModelId, SceneError> {
        match *slot {
            Some(id) => Ok(id),
            None => {
                let id = scene.add_model(build())?;
                *slot = Some(id);
                Ok(id)
            }
        }
    }

    pub fn sphere(
        &mut self,
        scene: &mut Scene,
        centre: Vec3,
        radius: f32,
        material: Material,
    ) -> Result<InstanceId, SceneError> {
        let model = Self::model(&mut self.sphere, scene, sphere_model)?;
        let transform = Transform::new(centre, Vec3::zero(), Vec3::broadcast(radius));
        scene.add_instance(model, transform, material)
    }

    pub fn cuboid(
        &mut self,
        scene: &mut Scene,
        centre: Vec3,
        size: Vec3,
        rotation: Vec3,
        material: Material,
    ) -> Result<InstanceId, SceneError> {
        let model = Self::model(&mut self.cube, scene, box_model)?;
        scene.add_instance(model, Transform::new(centre, rotation, size), material)
    }

    pub fn procedural_cuboid(
        &mut self,
        scene: &mut Scene,
        centre: Vec3,
        size: Vec3,
        rotation: Vec3,
        material: Material,
    ) -> Result<InstanceId, SceneError> {
        let model = Self::model(&mut self.procedural_cube, scene, procedural_box_model)?;
        scene.add_instance(model, Transform::new(centre, rotation, size), material)
    }

    pub fn rectangle(
        &mut self,
        scene: &mut Scene,
        centre: Vec3,
        size: Vec2,
        rotation: Vec3,
        material: Material,
    ) -> Result<InstanceId, SceneError> {
        let model = Self::model(&mut self.rectangle, scene, rectangle_model)?;
        let scale = Vec3::new(size.x, size.y, 1.0);
        scene.add_instance(model, Transform::new(centre, rotation, scale), material)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{HitGroup, Texture};

    fn grey() -> Material {
        Material::Lambertian {
            texture: Texture::flat(0.5, 0.5, 0.5),
        }
    }

    #[test]
    fn box_has_four_vertices_per_face() {
        let model = box_model();
        assert_eq!(model.vertices().len(), 24);
        assert_eq!(model.indices().len(), 36);
        for vertex in model.vertices() {
            for component in vertex.position {
                assert!((component.abs() - 0.5).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn box_faces_wind_towards_their_normal() {
        let model = box_model();
        for triangle in model.indices().chunks_exact(3) {
            let [a, b, c] =
                [0, 1, 2].map(|i| Vec3::from(model.vertices()[triangle[i] as usize].position));
            let normal = Vec3::from(model.vertices()[triangle[0] as usize].normal);
            assert!((b - a).cross(c - a).dot(normal) > 0.0);
        }
    }

    #[test]
    fn rectangle_is_a_unit_quad() {
        let model = rectangle_model();
        assert_eq!(model.vertices().len(), 4);
        assert_eq!(model.indices(), &[0, 1, 2, 0, 2, 3]);
        assert_eq!(model.vertices()[0].position, [-0.5, -0.5, 0.0]);
        assert_eq!(model.vertices()[2].position, [0.5, 0.5, 0.0]);
    }

    #[test]
    fn shapes_share_their_model() {
        let mut scene = Scene::new();
        let mut shapes = ShapeLibrary::new();

        shapes
            .sphere(&mut scene, Vec3::zero(), 1.0, grey())
            .unwrap();
        shapes
            .cuboid(&mut scene, Vec3::one(), Vec3::one(), Vec3::zero(), grey())
            .unwrap();
        shapes
            .sphere(&mut scene, Vec3::unit_x(), 0.5, grey())
            .unwrap();

        assert_eq!(scene.models().len(), 2);
        let instances = scene.instances();
        assert_eq!(instances[0].model, instances[2].model);
        assert_ne!(instances[0].model, instances[1].model);
        assert_eq!(
            scene.model(instances[1].model).unwrap().hit_group(),
            HitGroup::Triangles
        );
    }

    #[test]
    fn sphere_scales_by_radius() {
        let mut scene = Scene::new();
        let mut shapes = ShapeLibrary::new();
        let id = shapes
            .sphere(&mut scene, Vec3::new(0.0, 1.0, 0.0), 2.0, grey())
            .unwrap();

        let transform = scene.instances()[id.index()].transform;
        assert_eq!(transform.rows[0][0], 2.0);
        assert_eq!(transform.rows[1][1], 2.0);
        assert_eq!(transform.rows[2][2], 2.0);
        assert_eq!(transform.translation(), Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn procedural_shapes_only_register_when_used() {
        let mut scene = Scene::new();
        let mut shapes = ShapeLibrary::new();
        shapes
            .rectangle(&mut scene, Vec3::zero(), Vec2::one(), Vec3::zero(), grey())
            .unwrap();
        assert!(scene.models().iter().all(|model| model.aabb().is_none()));

        shapes
            .procedural_cuboid(&mut scene, Vec3::zero(), Vec3::one(), Vec3::zero(), grey())
            .unwrap();
        assert_eq!(
            scene.models().last().unwrap().hit_group(),
            HitGroup::Box
        );
    }
}
