//! The demo scenes, mostly from the "Ray Tracing in One Weekend" book series.

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use ultraviolet::{Mat4, Vec2, Vec3};

use crate::error::{RenderError, SceneError};
use crate::loader;
use crate::scene::shapes::ShapeLibrary;
use crate::scene::{Material, Scene, Texture};
use crate::transform::Transform;

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SceneKind {
    FurnaceTest,
    NormalsTest,
    Simple,
    OneWeekend,
    NextWeekTexturesAndLight,
    CornellBoxWithBoxes,
    CornellBoxWithSmoke,
    CornellBoxWithEarth,
    NextWeekFinal,
    #[default]
    WineGlass,
}

/// Where the camera starts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPlacement {
    pub eye: Vec3,
    /// Not normalized
    pub direction: Vec3,
    pub up: Vec3,
}

impl CameraPlacement {
    fn new(eye: Vec3, direction: Vec3) -> Self {
        Self {
            eye,
            direction,
            up: Vec3::unit_y(),
        }
    }
}

pub struct SceneDescription {
    pub scene: Scene,
    pub camera: CameraPlacement,
}

const EARTH_TEXTURE: &str = "Earth";
const EARTH_TEXTURE_FILE: &str = "textures/earthmap.png";
const WINE_GLASS_FILE: &str = "models/wine_glass.gltf";

/// Builds one of the demo scenes. Files are looked up below `assets_path` and the random
/// placements only depend on `seed`.
pub fn build(
    kind: SceneKind,
    assets_path: &Path,
    seed: u64,
) -> Result<SceneDescription, RenderError> {
    let mut builder = SceneBuilder {
        scene: Scene::new(),
        shapes: ShapeLibrary::new(),
        rng: StdRng::seed_from_u64(seed),
        assets_path,
    };

    let camera = match kind {
        SceneKind::FurnaceTest => builder.furnace_test()?,
        SceneKind::NormalsTest => builder.normals_test()?,
        SceneKind::Simple => builder.simple()?,
        SceneKind::OneWeekend => builder.one_weekend()?,
        SceneKind::NextWeekTexturesAndLight => builder.next_week_textures_and_light()?,
        SceneKind::CornellBoxWithBoxes => builder.cornell_box_with_boxes(false)?,
        SceneKind::CornellBoxWithSmoke => builder.cornell_box_with_boxes(true)?,
        SceneKind::CornellBoxWithEarth => builder.cornell_box_with_earth()?,
        SceneKind::NextWeekFinal => builder.next_week_final()?,
        SceneKind::WineGlass => builder.wine_glass()?,
    };

    Ok(SceneDescription {
        scene: builder.scene,
        camera,
    })
}

fn flat(color: Vec3) -> Texture {
    Texture::FlatColor { color }
}

fn lambertian(color: Vec3) -> Material {
    Material::Lambertian {
        texture: flat(color),
    }
}

fn metallic(color: Vec3, roughness: f32) -> Material {
    Material::Metallic {
        texture: flat(color),
        roughness,
    }
}

fn glass() -> Material {
    Material::Dielectric {
        texture: flat(Vec3::one()),
        refractive_index: 1.5,
    }
}

/// Emitted radiance is the texture color, so brightness above one goes into the color.
fn light(brightness: f32) -> Material {
    Material::Light {
        texture: flat(Vec3::broadcast(brightness)),
        emission_strength: 1.0,
    }
}

fn smoke(color: Vec3, density: f32) -> Material {
    Material::Smoke {
        texture: flat(color),
        density,
    }
}

fn degrees(x: f32, y: f32, z: f32) -> Vec3 {
    Vec3::new(x.to_radians(), y.to_radians(), z.to_radians())
}

struct SceneBuilder<'a> {
    scene: Scene,
    shapes: ShapeLibrary,
    rng: StdRng,
    assets_path: &'a Path,
}

impl SceneBuilder<'_> {
    fn random(&mut self) -> f32 {
        self.rng.gen()
    }

    fn random_range(&mut self, min: f32, max: f32) -> f32 {
        self.rng.gen_range(min..max)
    }

    /// Product of two random numbers per channel, biased towards dark colors
    fn random_dark_color(&mut self) -> Vec3 {
        let mut channel = || self.random() * self.random();
        Vec3::new(channel(), channel(), channel())
    }

    fn sphere(&mut self, centre: Vec3, radius: f32, material: Material) -> Result<(), SceneError> {
        self.shapes
            .sphere(&mut self.scene, centre, radius, material)
            .map(|_| ())
    }

    fn cuboid(
        &mut self,
        centre: Vec3,
        size: Vec3,
        rotation: Vec3,
        material: Material,
    ) -> Result<(), SceneError> {
        self.shapes
            .cuboid(&mut self.scene, centre, size, rotation, material)
            .map(|_| ())
    }

    fn rectangle(
        &mut self,
        centre: Vec3,
        size: Vec2,
        rotation: Vec3,
        material: Material,
    ) -> Result<(), SceneError> {
        self.shapes
            .rectangle(&mut self.scene, centre, size, rotation, material)
            .map(|_| ())
    }

    fn earth_texture(&mut self) -> Texture {
        let texture = self
            .scene
            .add_texture(EARTH_TEXTURE, self.assets_path.join(EARTH_TEXTURE_FILE));
        Texture::Image { texture }
    }

    fn wine_glass(&mut self) -> Result<CameraPlacement, RenderError> {
        let size = Vec3::broadcast(555.0);
        let camera = self.cornell_box(size, 50.0)?;

        let chromium = metallic(Vec3::new(0.549, 0.556, 0.554), 0.0);
        let mirror_size = Vec2::new(165.0, 330.0);
        let mirror_centre = Vec3::new(-120.0, -(size.y - mirror_size.y) * 0.5, -250.0);
        self.rectangle(mirror_centre, mirror_size, degrees(0.0, -39.5, 0.0), chromium)?;

        self.add_wine_glass(Vec3::new(130.0, -278.0, -170.0), 200.0, glass())?;
        Ok(camera)
    }

    fn add_wine_glass(
        &mut self,
        centre: Vec3,
        scale: f32,
        material: Material,
    ) -> Result<(), RenderError> {
        let path = self.assets_path.join(WINE_GLASS_FILE);
        let model = self.scene.add_model(loader::load_mesh_model(&path, "WineGlass")?)?;
        let transform = Transform::new(centre, Vec3::zero(), Vec3::broadcast(scale));
        self.scene.add_instance(model, transform, material)?;
        Ok(())
    }

    fn furnace_test(&mut self) -> Result<CameraPlacement, RenderError> {
        self.scene.set_horizon_color(Vec3::one());
        self.scene.set_zenith_color(Vec3::one());
        // a single unaccumulated sample shows whether the sampling is unbiased
        self.scene.set_accumulate_frames(false);

        self.sphere(Vec3::new(0.0, 1.0, 2.0), 1.0, lambertian(Vec3::broadcast(0.5)))?;
        Ok(CameraPlacement::new(
            Vec3::new(8.0, 2.0, 2.0),
            Vec3::new(-2.0, -0.25, -0.25),
        ))
    }

    fn normals_test(&mut self) -> Result<CameraPlacement, RenderError> {
        let normals = Material::Lambertian {
            texture: Texture::Normals,
        };

        self.sphere(Vec3::zero(), 1.0, normals)?;
        self.cuboid(
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::one(),
            degrees(20.0, 45.0, 0.0),
            normals,
        )?;
        self.add_wine_glass(Vec3::new(-2.0, 0.0, 0.0), 1.0, normals)?;

        Ok(CameraPlacement::new(
            Vec3::new(0.0, 0.0, 6.0),
            Vec3::new(0.0, 0.0, -1.0),
        ))
    }

    fn simple(&mut self) -> Result<CameraPlacement, RenderError> {
        self.scene.set_horizon_color(Vec3::broadcast(0.2));
        self.scene.set_zenith_color(Vec3::broadcast(0.02));

        let blue = lambertian(Vec3::new(0.2, 0.2, 1.0));
        let hard_plastic = Material::Phong {
            texture: flat(Vec3::new(0.2, 0.2, 1.0)),
            specular: 0.1,
            roughness: 0.1,
        };

        self.rectangle(
            Vec3::zero(),
            Vec2::broadcast(1000.0),
            degrees(-90.0, 0.0, 0.0),
            blue,
        )?;
        self.sphere(Vec3::new(0.0, 1.0, 0.0), 1.0, hard_plastic)?;
        self.sphere(Vec3::new(0.0, 20.0, 20.0), 1.0, light(170.0))?;

        Ok(CameraPlacement::new(
            Vec3::new(8.0, 2.0, 2.0),
            Vec3::new(-2.0, -0.25, -0.5),
        ))
    }

    /// Places a 22x22 grid of small spheres at `height`, skipping those too close to the big
    /// spheres at `clearance_height`. The closure picks the material from the random number
    /// drawn for it.
    fn small_spheres(
        &mut self,
        height: f32,
        clearance_height: f32,
        mut choose_material: impl FnMut(&mut Self, f32) -> Material,
    ) -> Result<(), SceneError> {
        let big_spheres = [-4.0, 0.0, 4.0].map(|x| Vec3::new(x, clearance_height, 0.0));
        for a in -11..11 {
            for b in -11..11 {
                let choice = self.random();
                let centre = Vec3::new(
                    a as f32 + 0.9 * self.random(),
                    height,
                    b as f32 + 0.9 * self.random(),
                );
                if big_spheres
                    .iter()
                    .all(|&big_sphere| (centre - big_sphere).mag() > 0.9)
                {
                    let material = choose_material(self, choice);
                    self.sphere(centre, 0.2, material)?;
                }
            }
        }
        Ok(())
    }

    fn one_weekend(&mut self) -> Result<CameraPlacement, RenderError> {
        self.scene.set_horizon_color(Vec3::new(0.75, 0.85, 1.0));
        self.scene.set_zenith_color(Vec3::new(0.5, 0.7, 1.0));

        self.rectangle(
            Vec3::zero(),
            Vec2::broadcast(1000.0),
            degrees(-90.0, 0.0, 0.0),
            lambertian(Vec3::broadcast(0.5)),
        )?;

        self.small_spheres(1.2, 0.2, |builder, choice| {
            if choice < 0.8 {
                lambertian(builder.random_dark_color())
            } else if choice < 0.95 {
                let mut channel = || 0.5 * builder.random_range(1.0, 2.0);
                let color = Vec3::new(channel(), channel(), channel());
                metallic(color, 0.5 * builder.random())
            } else {
                glass()
            }
        })?;

        self.sphere(Vec3::new(0.0, 1.0, 0.0), 1.0, glass())?;
        self.sphere(
            Vec3::new(-4.0, 1.0, 0.0),
            1.0,
            lambertian(Vec3::new(0.4, 0.2, 0.1)),
        )?;
        self.sphere(
            Vec3::new(4.0, 1.0, 0.0),
            1.0,
            metallic(Vec3::new(0.7, 0.6, 0.5), 0.01),
        )?;

        Ok(CameraPlacement::new(
            Vec3::new(8.0, 3.0, 2.0),
            Vec3::new(-2.0, -0.5, -0.5),
        ))
    }

    fn next_week_textures_and_light(&mut self) -> Result<CameraPlacement, RenderError> {
        self.scene.set_horizon_color(Vec3::new(0.75, 0.85, 1.0));
        self.scene.set_zenith_color(Vec3::new(0.5, 0.7, 1.0));

        // raised by one so the checker pattern does not sit on a zero of its sine
        let checker = Material::Lambertian {
            texture: Texture::CheckerBoard {
                odd: Vec3::new(0.2, 0.3, 0.1),
                even: Vec3::broadcast(0.9),
                scale: 10.0,
            },
        };
        self.rectangle(
            Vec3::new(0.0, 1.0, 0.0),
            Vec2::broadcast(1000.0),
            degrees(-90.0, 0.0, 0.0),
            checker,
        )?;

        self.small_spheres(1.2, 1.2, |builder, choice| {
            let texture_choice = builder.random();
            if choice < 0.8 {
                let color = builder.random_dark_color();
                let texture = if texture_choice < 0.33 {
                    flat(color)
                } else if texture_choice < 0.67 {
                    Texture::Simplex3D {
                        color,
                        scale: 10.0 * builder.random(),
                        frequency: builder.random(),
                    }
                } else {
                    Texture::Turbulence {
                        color,
                        scale: 10.0 * builder.random(),
                        frequency: builder.random(),
                        depth: (10.0 * builder.random()) as u32,
                    }
                };
                Material::Lambertian { texture }
            } else if choice < 0.95 {
                let mut channel = || 0.5 * (1.0 + builder.random());
                let color = Vec3::new(channel(), channel(), channel());
                metallic(color, 0.5 * builder.random())
            } else {
                light(10.0)
            }
        })?;

        self.sphere(Vec3::new(0.0, 2.0, 0.0), 1.0, light(20.0))?;
        self.sphere(
            Vec3::new(-4.0, 2.0, 0.0),
            1.0,
            metallic(Vec3::new(0.4, 0.2, 0.1), 0.0),
        )?;
        self.sphere(
            Vec3::new(4.0, 2.0, 0.0),
            1.0,
            lambertian(Vec3::new(0.2, 0.2, 0.7)),
        )?;
        // thin glass shell around the blue sphere
        self.sphere(Vec3::new(4.0, 2.0, 0.0), 1.001, glass())?;

        Ok(CameraPlacement::new(
            Vec3::new(8.0, 3.0, 2.0),
            Vec3::new(-2.0, -0.5, -0.5),
        ))
    }

    /// Walls, floor and ceiling of a box centred on the x and y axes, with its front face at
    /// z = 0 and a light in the ceiling.
    fn cornell_box(&mut self, size: Vec3, brightness: f32) -> Result<CameraPlacement, SceneError> {
        self.scene.set_horizon_color(Vec3::zero());
        self.scene.set_zenith_color(Vec3::zero());

        let red = lambertian(Vec3::new(0.65, 0.05, 0.05));
        let green = lambertian(Vec3::new(0.12, 0.45, 0.15));
        let white = lambertian(Vec3::broadcast(0.73));

        let half_size = size / 2.0;
        let wall_size = Vec2::new(size.x, size.y);
        let light_size = Vec2::new(130.0, 105.0);

        self.rectangle(
            Vec3::new(-half_size.x, 0.0, -half_size.z),
            wall_size,
            degrees(0.0, -90.0, 0.0),
            green,
        )?;
        self.rectangle(
            Vec3::new(half_size.x, 0.0, -half_size.z),
            wall_size,
            degrees(0.0, 90.0, 0.0),
            red,
        )?;
        self.rectangle(
            Vec3::new(0.0, half_size.y, -half_size.z),
            wall_size,
            degrees(90.0, 0.0, 0.0),
            white,
        )?;
        self.rectangle(
            Vec3::new(0.0, -half_size.y, -half_size.z),
            wall_size,
            degrees(-90.0, 0.0, 0.0),
            white,
        )?;
        self.rectangle(Vec3::new(0.0, 0.0, -size.z), wall_size, Vec3::zero(), white)?;
        self.rectangle(
            Vec3::new(0.0, half_size.y - 0.1, -half_size.z),
            light_size,
            degrees(90.0, 0.0, 0.0),
            light(brightness),
        )?;

        Ok(CameraPlacement::new(
            Vec3::new(0.0, 0.0, 800.0),
            Vec3::new(0.0, 0.0, -150.0),
        ))
    }

    /// A tall box at the back left and a cube at the front right, either as triangle meshes or
    /// as procedural boxes filled with smoke.
    fn cornell_box_with_boxes(
        &mut self,
        smoke_filled: bool,
    ) -> Result<CameraPlacement, RenderError> {
        let size = Vec3::broadcast(555.0);
        let half_size = size / 2.0;
        let camera = self.cornell_box(size, 15.0)?;

        let tall_size = Vec3::new(165.0, 330.0, 165.0);
        let tall_centre = Vec3::new(
            -half_size.x * 0.30,
            -(size.y - tall_size.y) * 0.5,
            -half_size.z * 1.25,
        );
        let cube_size = Vec3::broadcast(165.0);
        let cube_centre = Vec3::new(
            half_size.x * 0.35,
            -(size.y - cube_size.y) * 0.5,
            -half_size.z * 0.65,
        );
        let boxes = [
            (tall_centre, tall_size, degrees(0.0, -15.0, 0.0), Vec3::zero()),
            (cube_centre, cube_size, degrees(0.0, 18.0, 0.0), Vec3::one()),
        ];

        for (centre, box_size, rotation, smoke_color) in boxes {
            if smoke_filled {
                self.shapes.procedural_cuboid(
                    &mut self.scene,
                    centre,
                    box_size,
                    rotation,
                    smoke(smoke_color, 0.01),
                )?;
            } else {
                self.cuboid(centre, box_size, rotation, lambertian(Vec3::broadcast(0.73)))?;
            }
        }

        Ok(camera)
    }

    fn cornell_box_with_earth(&mut self) -> Result<CameraPlacement, RenderError> {
        let size = Vec3::broadcast(555.0);
        let half_size = size / 2.0;
        let camera = self.cornell_box(size, 15.0)?;

        let earth_size = 165.0;
        let centre = Vec3::new(
            half_size.x * 0.35,
            -(size.y - earth_size) * 0.5,
            -half_size.z * 0.65,
        );
        let texture = self.earth_texture();
        self.sphere(centre, earth_size / 2.0, Material::Lambertian { texture })?;

        Ok(camera)
    }

    fn next_week_final(&mut self) -> Result<CameraPlacement, RenderError> {
        self.scene.set_horizon_color(Vec3::zero());
        self.scene.set_zenith_color(Vec3::zero());

        let green = lambertian(Vec3::new(0.48, 0.83, 0.53));
        let white = lambertian(Vec3::broadcast(0.73));

        // ground of boxes with random heights
        let boxes_per_side = 20;
        let box_size = 100.0;
        for i in 0..boxes_per_side {
            for j in 0..boxes_per_side {
                let centre = Vec3::new(
                    1278.0 - (i as f32 + 0.5) * box_size,
                    -278.0,
                    1000.0 - (j as f32 + 0.5) * box_size,
                );
                let height = self.random_range(1.0, 101.0);
                self.cuboid(
                    centre,
                    Vec3::new(box_size, height, box_size),
                    Vec3::zero(),
                    green,
                )?;
            }
        }

        self.sphere(Vec3::new(18.0, -128.0, -45.0), 50.0, glass())?;
        self.sphere(
            Vec3::new(278.0, -128.0, -145.0),
            50.0,
            metallic(Vec3::new(0.8, 0.8, 0.9), 1.0),
        )?;

        // glass ball filled with blue smoke
        let smoke_ball = Vec3::new(-82.0, -128.0, -145.0);
        self.sphere(smoke_ball, 70.0, glass())?;
        self.sphere(smoke_ball, 69.99, smoke(Vec3::new(0.2, 0.4, 0.9), 0.2))?;

        // cube made of small spheres
        let cube_transform = Mat4::from_translation(Vec3::new(213.0, -8.0, -560.0))
            * Mat4::from_rotation_y(15f32.to_radians());
        for _ in 0..1000 {
            let centre = Vec3::new(
                self.random_range(0.0, 165.0),
                self.random_range(0.0, 165.0),
                self.random_range(0.0, 165.0),
            );
            self.sphere(cube_transform.transform_point3(centre), 10.0, white)?;
        }

        let marble = Material::Lambertian {
            texture: Texture::Marble {
                color: Vec3::one(),
                scale: 0.01,
                frequency: 0.5,
                depth: 7,
            },
        };
        self.sphere(Vec3::new(58.0, 2.0, -300.0), 80.0, marble)?;

        let texture = self.earth_texture();
        self.sphere(
            Vec3::new(-122.0, -78.0, -400.0),
            100.0,
            Material::Lambertian { texture },
        )?;

        // thin mist over the whole scene
        self.sphere(Vec3::zero(), 2000.0, smoke(Vec3::one(), 0.0001))?;

        self.rectangle(
            Vec3::new(5.0, 276.0, -279.5),
            Vec2::new(30.0, 26.0),
            degrees(90.0, 0.0, 0.0),
            light(7000.0),
        )?;

        Ok(CameraPlacement::new(
            Vec3::new(-200.0, 0.0, 600.0),
            Vec3::new(50.0, 1.0, -140.0),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::HitGroup;
    use crate::scene_packer;

    fn build_without_assets(kind: SceneKind, seed: u64) -> SceneDescription {
        build(kind, Path::new("missing-assets"), seed).unwrap()
    }

    #[test]
    fn cornell_box_with_boxes_layout() {
        let description = build_without_assets(SceneKind::CornellBoxWithBoxes, 0);
        let scene = &description.scene;

        // five walls, the light and two boxes
        assert_eq!(scene.instances().len(), 8);
        // rectangle and box meshes
        assert_eq!(scene.models().len(), 2);
        assert_eq!(scene.horizon_color(), Vec3::zero());
        assert_eq!(description.camera.eye, Vec3::new(0.0, 0.0, 800.0));
        assert!(!scene_packer::pack(scene).has_procedural_geometry());
    }

    #[test]
    fn smoke_boxes_are_procedural() {
        let description = build_without_assets(SceneKind::CornellBoxWithSmoke, 0);
        let scene = &description.scene;
        let smoke_boxes: Vec<_> = scene
            .instances()
            .iter()
            .filter(|instance| matches!(instance.material, Material::Smoke { .. }))
            .collect();

        assert_eq!(smoke_boxes.len(), 2);
        for instance in smoke_boxes {
            let model = scene.model(instance.model).unwrap();
            assert_eq!(model.hit_group(), HitGroup::Box);
        }
    }

    #[test]
    fn final_scene_smoke_fills_spheres() {
        let description = build_without_assets(SceneKind::NextWeekFinal, 0);
        let scene = &description.scene;
        let smoke_spheres: Vec<_> = scene
            .instances()
            .iter()
            .filter(|instance| matches!(instance.material, Material::Smoke { .. }))
            .collect();

        assert_eq!(smoke_spheres.len(), 2);
        for instance in smoke_spheres {
            let model = scene.model(instance.model).unwrap();
            assert_eq!(model.hit_group(), HitGroup::Sphere);
        }
    }

    #[test]
    fn random_scenes_are_reproducible() {
        let first = build_without_assets(SceneKind::OneWeekend, 7);
        let second = build_without_assets(SceneKind::OneWeekend, 7);
        assert_eq!(first.scene.instances(), second.scene.instances());

        let other = build_without_assets(SceneKind::OneWeekend, 8);
        assert_ne!(first.scene.instances(), other.scene.instances());
    }

    #[test]
    fn one_weekend_shares_the_sphere_model() {
        let description = build_without_assets(SceneKind::OneWeekend, 1);
        let scene = &description.scene;

        // ground, at most 22 * 22 small spheres and the three big ones
        let instance_count = scene.instances().len();
        assert!(instance_count > 4 && instance_count <= 1 + 22 * 22 + 3);
        assert_eq!(scene.models().len(), 2);
        assert_eq!(scene_packer::pack(scene).aabbs.len(), 1);
    }

    #[test]
    fn small_spheres_keep_clear_of_the_big_ones() {
        let description = build_without_assets(SceneKind::NextWeekTexturesAndLight, 3);
        for instance in description.scene.instances() {
            let centre = instance.transform.translation();
            let is_small = (instance.transform.rows[0][0] - 0.2).abs() < 1e-6;
            if is_small {
                for x in [-4.0, 0.0, 4.0] {
                    assert!((centre - Vec3::new(x, 1.2, 0.0)).mag() > 0.9);
                }
            }
        }
    }

    #[test]
    fn earth_scenes_register_the_texture() {
        let description = build_without_assets(SceneKind::CornellBoxWithEarth, 0);
        let scene = &description.scene;
        assert_eq!(scene.textures().len(), 1);
        assert_eq!(scene.textures()[0].name, EARTH_TEXTURE);
        assert!(scene.textures()[0].path.ends_with(EARTH_TEXTURE_FILE));
        let earth = scene.instances().last().unwrap();
        assert_eq!(
            earth.material.texture().image(),
            scene.texture_id(EARTH_TEXTURE)
        );
    }

    #[test]
    fn final_scene_counts() {
        let description = build_without_assets(SceneKind::NextWeekFinal, 0);
        // 400 ground boxes, 1000 cube spheres and 8 other objects
        assert_eq!(description.scene.instances().len(), 400 + 1000 + 8);
    }

    #[test]
    fn furnace_test_does_not_accumulate() {
        let description = build_without_assets(SceneKind::FurnaceTest, 0);
        assert!(!description.scene.accumulate_frames());
        assert_eq!(description.scene.zenith_color(), Vec3::one());
    }

    #[test]
    fn mesh_scenes_report_the_missing_file() {
        let result = build(SceneKind::WineGlass, Path::new("missing-assets"), 0);
        assert!(matches!(result, Err(RenderError::MeshLoad { .. })));
    }

    #[test]
    fn wine_glass_loads_the_bundled_mesh() {
        let assets = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets");
        let description = build(SceneKind::WineGlass, &assets, 0).unwrap();
        let glass = description
            .scene
            .models()
            .iter()
            .find(|model| model.name == "WineGlass")
            .unwrap();
        assert!(!glass.indices().is_empty());
    }

    #[test]
    fn scene_kinds_parse_by_name() {
        let kind: SceneKind = serde_json::from_str("\"NextWeekFinal\"").unwrap();
        assert_eq!(kind, SceneKind::NextWeekFinal);
    }
}
