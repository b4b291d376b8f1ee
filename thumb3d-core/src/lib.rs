/// thumb3d core library - model thumbnail rendering
///
/// Loads OBJ and STL models, frames them with a fixed camera and light rig,
/// rasterizes a single frame in software and returns it as a PNG data URL.
/// The same pipeline runs inline, on a background thread, or behind the
/// [`ThumbnailAdapter`] state holder.

pub mod adapter;
pub mod bounds;
pub mod cancel;
pub mod config;
pub mod encode;
pub mod error;
pub mod geometry;
pub mod loader;
pub mod material;
pub mod normalize;
pub mod obj;
pub mod pipeline;
pub mod projection;
pub mod raster;
pub mod scene;
pub mod shadow;
pub mod source;
pub mod stl;
pub mod transform;
pub mod worker;

// Re-export commonly used types
pub use adapter::{AdapterState, ThumbnailAdapter, ThumbnailView};
pub use bounds::Aabb;
pub use cancel::CancellationToken;
pub use config::RenderConfig;
pub use error::{LoadError, RenderError};
pub use geometry::{Mesh, Triangle, Vertex};
pub use loader::{FileType, LoadedModel};
pub use material::{Color, Material};
pub use pipeline::{render_thumbnail, ProgressSink, RenderRequest, Thumbnail};
pub use projection::{Camera, ProjectionMode};
pub use scene::{LightRig, Model, Scene};
pub use source::{FileSource, MemorySource, ModelSource, UrlSource};
#[cfg(not(target_arch = "wasm32"))]
pub use source::HttpSource;
pub use transform::ModelTransform;
pub use worker::{spawn_render, RenderEvent, RenderHandle};
