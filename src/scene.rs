mod material;
mod model;
pub mod shapes;
mod texture;
mod vertex;

use std::path::PathBuf;

pub use material::*;
pub use model::*;
pub use texture::*;
pub use vertex::*;

use log::debug;
use ultraviolet::Vec3;

use crate::error::SceneError;
use crate::transform::AffineTransform;

/// Position of an instance in the scene's instance list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstanceId(pub(crate) u32);

impl InstanceId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub model: ModelId,
    pub transform: AffineTransform,
    pub material: Material,
}

/// Owns every model, instance and texture. Models and instances are only ever appended,
/// so their positions double as the ids shaders see.
#[derive(Clone, Debug)]
pub struct Scene {
    models: Vec<Model>,
    instances: Vec<Instance>,
    textures: Vec<TextureResource>,
    horizon_color: Vec3,
    zenith_color: Vec3,
    accumulate_frames: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            models: Vec::new(),
            instances: Vec::new(),
            textures: Vec::new(),
            horizon_color: Vec3::one(),
            zenith_color: Vec3::new(0.5, 0.7, 1.0),
            accumulate_frames: true,
        }
    }

    pub fn add_model(&mut self, model: Model) -> Result<ModelId, SceneError> {
        model.validate()?;

        let id = ModelId(self.models.len() as u32);
        debug!(
            "Registered model '{}' as {} ({} vertices, {} indices)",
            model.name,
            id.0,
            model.vertices().len(),
            model.indices().len()
        );
        self.models.push(model);
        Ok(id)
    }

    pub fn add_instance(
        &mut self,
        model: ModelId,
        transform: impl Into<AffineTransform>,
        material: Material,
    ) -> Result<InstanceId, SceneError> {
        if model.index() >= self.models.len() {
            return Err(SceneError::UnknownModel {
                model: model.0,
                registered: self.models.len(),
            });
        }
        if let Some(texture) = material.texture().image() {
            if texture.slot() as usize >= self.textures.len() {
                return Err(SceneError::UnknownTexture {
                    slot: texture.slot(),
                    registered: self.textures.len(),
                });
            }
        }

        let id = InstanceId(self.instances.len() as u32);
        self.instances.push(Instance {
            model,
            transform: transform.into(),
            material,
        });
        Ok(id)
    }

    /// Registers an image file for the texture array. Registering the same name twice
    /// returns the existing slot.
    pub fn add_texture(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> TextureId {
        let name = name.into();
        if let Some(id) = self.texture_id(&name) {
            return id;
        }

        let id = TextureId(self.textures.len() as u32);
        self.textures.push(TextureResource {
            name,
            path: path.into(),
            id,
        });
        id
    }

    pub fn texture_id(&self, name: &str) -> Option<TextureId> {
        self.textures
            .iter()
            .find(|texture| texture.name == name)
            .map(|texture| texture.id)
    }

    pub fn model(&self, id: ModelId) -> Option<&Model> {
        self.models.get(id.index())
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn textures(&self) -> &[TextureResource] {
        &self.textures
    }

    pub fn set_horizon_color(&mut self, color: Vec3) {
        self.horizon_color = color;
    }

    pub fn set_zenith_color(&mut self, color: Vec3) {
        self.zenith_color = color;
    }

    pub fn set_accumulate_frames(&mut self, accumulate: bool) {
        self.accumulate_frames = accumulate;
    }

    pub fn horizon_color(&self) -> Vec3 {
        self.horizon_color
    }

    pub fn zenith_color(&self) -> Vec3 {
        self.zenith_color
    }

    pub fn accumulate_frames(&self) -> bool {
        self.accumulate_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ultraviolet::Vec2;

    fn triangle() -> Model {
        let vertex = |x: f32, y: f32| {
            Vertex::new(Vec3::new(x, y, 0.0), Vec3::unit_z(), Vec3::one(), Vec2::zero())
        };
        Model::triangles(
            "triangle",
            vec![vertex(0.0, 0.0), vertex(1.0, 0.0), vertex(0.0, 1.0)],
            vec![0, 1, 2],
        )
    }

    fn white() -> Material {
        Material::Lambertian {
            texture: Texture::flat(1.0, 1.0, 1.0),
        }
    }

    #[test]
    fn model_ids_are_dense_in_registration_order() {
        let mut scene = Scene::new();
        let a = scene.add_model(triangle()).unwrap();
        let b = scene
            .add_model(Model::procedural(
                "sphere",
                ProceduralPrimitive::Sphere,
                Aabb::cube(1.0),
            ))
            .unwrap();
        let c = scene.add_model(triangle()).unwrap();

        assert_eq!([a.index(), b.index(), c.index()], [0, 1, 2]);
        assert_eq!(scene.models().len(), 3);
        assert_eq!(scene.model(b).unwrap().hit_group(), HitGroup::Sphere);
    }

    #[test]
    fn empty_triangle_model_is_rejected() {
        let mut scene = Scene::new();
        let result = scene.add_model(Model::triangles("empty", Vec::new(), Vec::new()));
        assert_eq!(
            result,
            Err(SceneError::EmptyTriangleModel {
                name: "empty".to_string()
            })
        );
        assert!(scene.models().is_empty());
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut model = triangle();
        if let Geometry::Triangles { indices, .. } = &mut model.geometry {
            indices[2] = 7;
        }
        let mut scene = Scene::new();
        assert!(matches!(
            scene.add_model(model),
            Err(SceneError::MalformedIndices { .. })
        ));
    }

    #[test]
    fn instance_of_unknown_model_is_rejected() {
        let mut other = Scene::new();
        other.add_model(triangle()).unwrap();
        let foreign = other.add_model(triangle()).unwrap();

        let mut scene = Scene::new();
        scene.add_model(triangle()).unwrap();
        let result = scene.add_instance(foreign, AffineTransform::identity(), white());
        assert_eq!(
            result,
            Err(SceneError::UnknownModel {
                model: 1,
                registered: 1
            })
        );
        assert!(scene.instances().is_empty());
    }

    #[test]
    fn instance_of_unregistered_texture_is_rejected() {
        let mut scene = Scene::new();
        let model = scene.add_model(triangle()).unwrap();
        let material = Material::Lambertian {
            texture: Texture::Image {
                texture: TextureId(0),
            },
        };
        assert!(matches!(
            scene.add_instance(model, AffineTransform::identity(), material),
            Err(SceneError::UnknownTexture { slot: 0, .. })
        ));

        let earth = scene.add_texture("Earth", "assets/textures/earthmap.jpg");
        let material = Material::Lambertian {
            texture: Texture::Image { texture: earth },
        };
        assert!(scene
            .add_instance(model, AffineTransform::identity(), material)
            .is_ok());
    }

    #[test]
    fn textures_get_sequential_slots() {
        let mut scene = Scene::new();
        let earth = scene.add_texture("Earth", "earth.jpg");
        let moon = scene.add_texture("Moon", "moon.jpg");
        assert_eq!(earth.slot(), 0);
        assert_eq!(moon.slot(), 1);
        assert_eq!(scene.add_texture("Earth", "other.jpg"), earth);
        assert_eq!(scene.texture_id("Moon"), Some(moon));
        assert_eq!(scene.textures().len(), 2);
    }

    #[test]
    fn sky_and_accumulation_settings() {
        let mut scene = Scene::new();
        assert!(scene.accumulate_frames());
        scene.set_accumulate_frames(false);
        scene.set_horizon_color(Vec3::new(0.5, 0.5, 0.5));
        scene.set_zenith_color(Vec3::zero());
        assert!(!scene.accumulate_frames());
        assert_eq!(scene.horizon_color(), Vec3::new(0.5, 0.5, 0.5));
        assert_eq!(scene.zenith_color(), Vec3::zero());
    }
}
