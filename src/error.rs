use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while a scene is being assembled.
#[derive(Error, Debug, PartialEq)]
pub enum SceneError {
    /// An instance was placed for a model id that this scene never handed out
    #[error("instance refers to unknown model {model} ({registered} models are registered)")]
    UnknownModel { model: u32, registered: usize },

    /// A triangle model needs at least one vertex to build a bottom level structure
    #[error("triangle model '{name}' has no vertices")]
    EmptyTriangleModel { name: String },

    #[error("triangle model '{name}' has malformed indices: {reason}")]
    MalformedIndices { name: String, reason: String },

    /// An image texture slot was referenced before being registered
    #[error("texture slot {slot} is not registered ({registered} textures are registered)")]
    UnknownTexture { slot: u32, registered: usize },
}

/// Fatal conditions hit while bringing the scene onto the device.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// The device is missing an extension or feature the ray tracer relies on
    #[error("no physical device supports {0}")]
    MissingCapability(String),

    #[error("push constant block of {requested} bytes exceeds the device limit of {limit} bytes")]
    PushConstantsTooLarge { requested: u32, limit: u32 },

    #[error("could not load texture '{path}'")]
    TextureLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("could not load mesh '{path}'")]
    MeshLoad {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("mesh file '{0}' contains no triangle primitives")]
    EmptyMesh(PathBuf),

    #[error("could not read shader '{path}'")]
    ShaderLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scene has {count} instances, the instance custom index holds at most {limit}")]
    TooManyInstances { count: usize, limit: usize },

    /// A top level instance references a model whose bottom level structure was never built
    #[error("bottom level acceleration structure for model {0} is not built")]
    UnboundBottomLevel(u32),
}
