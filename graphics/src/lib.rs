//! # Relay Graphics
//!
//! Render command pipeline for the Relay engine: a producer thread records
//! frame `N + 1` while a dedicated render thread executes frame `N`.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`Renderer`] - Owns the subsystems and the render thread
//! - [`ResourceManager`], [`GeometryManager`], [`ShaderManager`] - Handle
//!   pools fed by double-buffered command queues
//! - [`draw`] - Draw ops, buckets and the fixed action/pass model
//! - [`GpuBackend`] - Trait for device implementations, with a recording
//!   [`DummyBackend`] for tests
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use relay_graphics::{DummyBackend, MemorySource, Renderer, RendererConfig};
//!
//! let renderer = Renderer::new(
//!     Arc::new(DummyBackend::new()),
//!     Arc::new(MemorySource::new()),
//!     RendererConfig::default(),
//! )
//! .unwrap();
//! let brick = renderer.resources().create_texture_from_file("textures/brick.png");
//! renderer.post_frame_sync();
//! renderer.wait_idle();
//! assert!(renderer.resources().resource(brick).unwrap().is_placeholder);
//! ```

pub mod assets;
pub mod backend;
pub mod camera;
pub mod config;
pub mod draw;
pub mod error;
pub mod geometry;
pub mod renderer;
pub mod resources;
pub mod scheduler;
pub mod shader;
pub mod types;

// Re-export main types for convenience
pub use assets::{AssetSource, FileSystemSource, MemorySource};
pub use backend::{DeviceCall, DummyBackend, GpuBackend, NativeObject};
pub use camera::Camera;
pub use config::RendererConfig;
pub use draw::{BucketKind, DrawOp, DrawOpHandle, PassKind, PrimaryTargets};
pub use error::GraphicsError;
pub use geometry::{GeoHandle, GeometryData, GeometryManager, Vertex};
pub use renderer::Renderer;
pub use resources::{
    ConstantBufferHandle, DepthStencilViewHandle, RenderTargetViewHandle, ResourceHandle,
    ResourceManager,
};
pub use shader::{
    ShaderDefine, ShaderHandle, ShaderManager, ShaderReloader, ShaderStage, VertexShaderFlags,
    VertexShaderType,
};
pub use types::{
    ArraySlice, BufferUsage, SamplerState, StructuredBufferDescriptor, TextureDescriptor,
    TextureFormat, TextureUsage, Viewport,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_dummy_backend() {
        let backend = DummyBackend::new();
        assert_eq!(backend.name(), "Dummy");
    }
}
