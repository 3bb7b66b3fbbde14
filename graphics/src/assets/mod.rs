//! Byte-level asset access and decoding.
//!
//! - [`AssetSource`] - where bytes come from (disk or memory)
//! - [`TextureData`] - images decoded to RGBA8 with the `image` crate
//! - [`decode_obj`] - Wavefront OBJ geometry decoded with `tobj`

mod mesh;
mod source;
mod texture;

pub use mesh::decode_obj;
pub use source::{AssetSource, FileSystemSource, MemorySource};
pub use texture::TextureData;
