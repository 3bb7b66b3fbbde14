//! Common types and descriptors for graphics resources.
//!
//! This module contains format enums, usage flags, and descriptor structs
//! used throughout the graphics system.

mod buffer;
mod common;
mod sampler;
mod texture;

pub use buffer::{BufferUsage, StructuredBufferDescriptor};
pub use common::{ArraySlice, Extent3d, Viewport};
pub use sampler::SamplerState;
pub use texture::{TextureDescriptor, TextureDimension, TextureFormat, TextureUsage};
