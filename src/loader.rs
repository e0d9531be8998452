//! Decoding of the files a scene refers to: image textures and triangle meshes.

use std::path::Path;

use log::{debug, info};

use crate::error::RenderError;
use crate::scene::{Model, Vertex};

/// Decoded texture in R8G8B8A8 layout.
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

pub fn load_image_file(path: &Path) -> Result<LoadedImage, RenderError> {
    let image = image::open(path)
        .map_err(|source| RenderError::TextureLoad {
            path: path.to_path_buf(),
            source,
        })?
        .into_rgba8();
    let (width, height) = image.dimensions();
    debug!("Loaded texture {:?} ({}x{})", path, width, height);

    Ok(LoadedImage {
        width,
        height,
        bytes: image.into_raw(),
    })
}

/// Collects the primitives of one mesh into a single vertex and index list.
#[derive(Default)]
struct MeshBuilder {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl MeshBuilder {
    /// Appends a primitive. Primitives without indices are drawn as a plain triangle list.
    fn append(&mut self, vertices: Vec<Vertex>, indices: Option<Vec<u32>>) {
        let base = self.vertices.len() as u32;
        let indices = indices.unwrap_or_else(|| (0..vertices.len() as u32).collect());
        self.indices.extend(indices.into_iter().map(|index| base + index));
        self.vertices.extend(vertices);
    }

    fn into_model(self, name: &str) -> Model {
        Model::triangles(name, self.vertices, self.indices)
    }
}

/// Loads the first mesh of a glTF file as one triangle model. The base color factor of each
/// primitive's material becomes the vertex color.
pub fn load_mesh_model(path: &Path, name: &str) -> Result<Model, RenderError> {
    let (document, buffers, _images) =
        gltf::import(path).map_err(|source| RenderError::MeshLoad {
            path: path.to_path_buf(),
            source,
        })?;

    let mesh = document
        .meshes()
        .next()
        .ok_or_else(|| RenderError::EmptyMesh(path.to_path_buf()))?;

    let mut builder = MeshBuilder::default();
    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            debug!("Skipping {:?} primitive in {:?}", primitive.mode(), path);
            continue;
        }

        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|v| &v.0[..]));
        let Some(positions) = reader.read_positions() else {
            continue;
        };
        let normals: Box<dyn Iterator<Item = [f32; 3]>> = match reader.read_normals() {
            Some(normals) => Box::new(normals),
            None => Box::new(std::iter::repeat([0.0, 1.0, 0.0])),
        };
        let tex_coords: Box<dyn Iterator<Item = [f32; 2]>> = match reader.read_tex_coords(0) {
            Some(tex_coords) => Box::new(tex_coords.into_f32()),
            None => Box::new(std::iter::repeat([0.0, 0.0])),
        };
        let [r, g, b, _] = primitive
            .material()
            .pbr_metallic_roughness()
            .base_color_factor();

        let vertices = positions
            .zip(normals.zip(tex_coords))
            .map(|(position, (normal, tex_coord))| Vertex {
                position,
                normal,
                color: [r, g, b],
                tex_coord,
            })
            .collect();
        let indices = reader
            .read_indices()
            .map(|indices| indices.into_u32().collect());

        builder.append(vertices, indices);
    }

    if builder.vertices.is_empty() {
        return Err(RenderError::EmptyMesh(path.to_path_buf()));
    }

    info!(
        "Loaded mesh {:?} with {} vertices and {} triangles",
        path,
        builder.vertices.len(),
        builder.indices.len() / 3
    );
    Ok(builder.into_model(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ultraviolet::{Vec2, Vec3};

    fn vertices(count: usize) -> Vec<Vertex> {
        (0..count)
            .map(|i| {
                Vertex::new(
                    Vec3::broadcast(i as f32),
                    Vec3::unit_y(),
                    Vec3::one(),
                    Vec2::zero(),
                )
            })
            .collect()
    }

    #[test]
    fn primitives_are_rebased() {
        let mut builder = MeshBuilder::default();
        builder.append(vertices(3), Some(vec![0, 1, 2]));
        builder.append(vertices(4), Some(vec![0, 1, 2, 0, 2, 3]));

        assert_eq!(builder.vertices.len(), 7);
        assert_eq!(builder.indices, vec![0, 1, 2, 3, 4, 5, 3, 5, 6]);
    }

    #[test]
    fn unindexed_primitives_become_triangle_lists() {
        let mut builder = MeshBuilder::default();
        builder.append(vertices(3), None);
        builder.append(vertices(3), None);
        assert_eq!(builder.indices, vec![0, 1, 2, 3, 4, 5]);

        let model = builder.into_model("glass");
        assert_eq!(model.name, "glass");
        assert_eq!(model.indices().len(), 6);
    }

    #[test]
    fn missing_files_report_their_path() {
        let path = Path::new("does/not/exist.gltf");
        match load_mesh_model(path, "missing") {
            Err(RenderError::MeshLoad { path: reported, .. }) => assert_eq!(reported, path),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("loaded a missing file"),
        }
        assert!(matches!(
            load_image_file(Path::new("does/not/exist.png")),
            Err(RenderError::TextureLoad { .. })
        ));
    }

    #[test]
    fn bundled_assets_load() {
        let assets = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets");

        let glass = load_mesh_model(&assets.join("models/wine_glass.gltf"), "WineGlass").unwrap();
        assert_eq!(glass.indices().len() % 3, 0);
        assert!(glass.indices().iter().all(|&i| (i as usize) < glass.vertices().len()));

        let earth = load_image_file(&assets.join("textures/earthmap.png")).unwrap();
        assert_eq!((earth.width, earth.height), (512, 256));
        assert_eq!(earth.bytes.len(), 512 * 256 * 4);
    }
}
