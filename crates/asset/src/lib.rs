//! Asset loading/parsers for binary image and model formats.
//! TIM: paletted/truecolour raster images.
//! HDV: fixed-point meshes with offset-addressed geometry.

pub mod hdv;
pub mod loader;
pub mod mesh;
pub mod pixel;
pub mod sniff;
pub mod stream;
pub mod texture;
pub mod tim;

pub use loader::{
    AssetKind, AssetLoader, HdvLoader, TimLoader, load_from_path, load_from_reader, load_image,
    load_model, probe,
};
pub use mesh::{MeshData, MeshVertex, StaticModel};
pub use texture::{ColourOrder, PixelFormat, RasterImage, compute_buffer_size};
