//! Resource command queue.
//!
//! Textures, structured buffers, render-target views, depth-stencil views and
//! constant buffers all live in handle pools owned by the [`ResourceManager`].
//! Every producer-side operation returns a handle synchronously; the device
//! object behind it is created by the render thread when it processes the
//! frame's commands.
//!
//! Commands of one batch execute in this order, regardless of enqueue order:
//!
//! | # | Command |
//! |---|---------|
//! | 1 | resource releases |
//! | 2 | render-target view releases |
//! | 3 | depth-stencil view releases |
//! | 4 | constant buffer releases |
//! | 5 | texture creates |
//! | 6 | buffer updates |
//! | 7 | buffer creates |
//! | 8 | render-target view creates |
//! | 9 | depth-stencil view creates |
//! | 10 | constant buffer creates and updates (in enqueue order) |
//!
//! A handle's slot is only returned to its pool when the release is
//! processed, so a pending release can never alias a fresh allocation.

mod command;
mod manager;

pub use manager::ResourceManager;

use relay_core::pool::Handle;

use crate::backend::NativeObject;
use crate::types::{ArraySlice, StructuredBufferDescriptor, TextureDescriptor, TextureFormat};

/// Handle to a texture or structured buffer.
pub type ResourceHandle = Handle<Resource>;
/// Handle to a render-target view.
pub type RenderTargetViewHandle = Handle<RenderTargetView>;
/// Handle to a depth-stencil view.
pub type DepthStencilViewHandle = Handle<DepthStencilView>;
/// Handle to a constant buffer.
pub type ConstantBufferHandle = Handle<ConstantBuffer>;

/// What a [`Resource`] is.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceKind {
    Texture(TextureDescriptor),
    StructuredBuffer(StructuredBufferDescriptor),
}

/// A texture or structured buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// Asset name for textures loaded through the name cache.
    pub name: Option<String>,
    pub kind: ResourceKind,
    /// Stands in for an image that could not be loaded.
    pub is_placeholder: bool,
    /// Set by the render thread once the object exists.
    pub native: Option<NativeObject>,
}

impl Resource {
    fn new(kind: ResourceKind) -> Self {
        Self {
            name: None,
            kind,
            is_placeholder: false,
            native: None,
        }
    }

    /// Texture format, if this is a texture.
    pub fn format(&self) -> Option<TextureFormat> {
        match &self.kind {
            ResourceKind::Texture(desc) => Some(desc.format),
            ResourceKind::StructuredBuffer(_) => None,
        }
    }

    /// Width and height, if this is a texture.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match &self.kind {
            ResourceKind::Texture(desc) => Some((desc.size.width, desc.size.height)),
            ResourceKind::StructuredBuffer(_) => None,
        }
    }

    /// Element count, if this is a structured buffer.
    pub fn element_count(&self) -> Option<u32> {
        match &self.kind {
            ResourceKind::Texture(_) => None,
            ResourceKind::StructuredBuffer(desc) => Some(desc.element_count),
        }
    }
}

/// Render-target view of a texture resource.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTargetView {
    pub resource: ResourceHandle,
    /// `None` covers the whole resource.
    pub slice: Option<ArraySlice>,
    pub native: Option<NativeObject>,
}

/// Depth-stencil view of a texture resource.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthStencilView {
    pub resource: ResourceHandle,
    /// `None` covers the whole resource.
    pub slice: Option<ArraySlice>,
    pub native: Option<NativeObject>,
}

/// A constant buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantBuffer {
    /// Size in bytes (rounded up to 16 for temp buffers).
    pub size: usize,
    /// Owned by the temp pool and recycled at flip time.
    pub temp: bool,
    pub native: Option<NativeObject>,
}

/// Records whose device object is filled in by the render thread.
trait NativeSlot {
    fn native_slot(&mut self) -> &mut Option<NativeObject>;
}

macro_rules! impl_native_slot {
    ($($record:ty),*) => {
        $(impl NativeSlot for $record {
            fn native_slot(&mut self) -> &mut Option<NativeObject> {
                &mut self.native
            }
        })*
    };
}

impl_native_slot!(Resource, RenderTargetView, DepthStencilView, ConstantBuffer);
