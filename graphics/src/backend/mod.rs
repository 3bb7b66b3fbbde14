//! GPU backend abstraction layer.
//!
//! The renderer talks to the device only through [`GpuBackend`], and only
//! from the render thread: command processing creates and releases objects,
//! the frame executor opens passes and submits draws.
//!
//! Device objects are opaque [`NativeObject`] ids. Records in the resource,
//! geometry and shader pools hold them once the render thread has created
//! them; the producer never sees a native object it could race on.
//!
//! # Available Backends
//!
//! - [`DummyBackend`]: no-op backend recording every call, for tests and
//!   headless tools

pub mod dummy;

pub use dummy::{DeviceCall, DummyBackend};

use crate::draw::{BlendMode, DepthTestMode, MAX_CONSTANT_BUFFER_SLOTS, MAX_TEXTURE_SLOTS, PassKind};
use crate::error::GraphicsError;
use crate::shader::{ShaderDefine, ShaderStage};
use crate::types::{ArraySlice, SamplerState, StructuredBufferDescriptor, TextureDescriptor, Viewport};

/// Opaque id of an object owned by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeObject(pub u64);

/// Everything the device needs to open a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PassDescriptor {
    /// Which pass is being opened.
    pub kind: PassKind,
    /// Viewport for the pass.
    pub viewport: Viewport,
    /// Color targets; empty means the swapchain back buffer.
    pub color_targets: Vec<NativeObject>,
    /// Depth-stencil target.
    pub depth_stencil: Option<NativeObject>,
    /// Depth comparison.
    pub depth_test: DepthTestMode,
    /// Whether depth writes are enabled.
    pub depth_write: bool,
    /// Color blending.
    pub blend: BlendMode,
    /// Clear color targets to this value when the pass opens.
    pub clear_color: Option<[f32; 4]>,
    /// Clear the depth target to this value when the pass opens.
    pub clear_depth: Option<f32>,
}

/// One indexed draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub vertex_shader: NativeObject,
    /// `None` in depth-only passes.
    pub pixel_shader: Option<NativeObject>,
    pub vertex_buffer: NativeObject,
    pub index_buffer: NativeObject,
    pub vertex_stride: u32,
    pub index_count: u32,
    pub textures: [Option<NativeObject>; MAX_TEXTURE_SLOTS],
    pub samplers: [SamplerState; MAX_TEXTURE_SLOTS],
    pub constant_buffers: [Option<NativeObject>; MAX_CONSTANT_BUFFER_SLOTS],
}

/// One compute dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchCall {
    pub shader: NativeObject,
    pub thread_groups: [u32; 3],
    pub textures: [Option<NativeObject>; MAX_TEXTURE_SLOTS],
    pub constant_buffers: [Option<NativeObject>; MAX_CONSTANT_BUFFER_SLOTS],
}

/// GPU backend trait for abstracting different GPU APIs.
///
/// Errors returned from any method are treated as fatal by the render thread.
/// Shader compilation failures are the exception: the shader manager turns
/// them into a redirect to the per-stage error shader.
pub trait GpuBackend: Send + Sync + 'static {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Create a texture, optionally uploading mip 0 of every layer.
    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        data: Option<&[u8]>,
    ) -> Result<NativeObject, GraphicsError>;

    /// Create a structured buffer, optionally with initial contents.
    fn create_structured_buffer(
        &self,
        descriptor: &StructuredBufferDescriptor,
        data: Option<&[u8]>,
    ) -> Result<NativeObject, GraphicsError>;

    /// Replace the contents of a buffer (structured, constant or vertex).
    fn update_buffer(&self, buffer: NativeObject, data: &[u8]) -> Result<(), GraphicsError>;

    /// Create a render-target view of a texture, whole or one layer range.
    fn create_render_target_view(
        &self,
        texture: NativeObject,
        slice: Option<ArraySlice>,
    ) -> Result<NativeObject, GraphicsError>;

    /// Create a depth-stencil view of a texture, whole or one layer range.
    fn create_depth_stencil_view(
        &self,
        texture: NativeObject,
        slice: Option<ArraySlice>,
    ) -> Result<NativeObject, GraphicsError>;

    /// Create a constant buffer of `size` bytes.
    fn create_constant_buffer(&self, size: usize) -> Result<NativeObject, GraphicsError>;

    /// Create a vertex buffer.
    fn create_vertex_buffer(&self, data: &[u8], stride: u32) -> Result<NativeObject, GraphicsError>;

    /// Create a 32-bit index buffer.
    fn create_index_buffer(&self, indices: &[u32]) -> Result<NativeObject, GraphicsError>;

    /// Compile a shader.
    ///
    /// Returns [`GraphicsError::ShaderCompilationFailed`] for source errors.
    fn compile_shader(
        &self,
        stage: ShaderStage,
        name: &str,
        source: &str,
        defines: &[ShaderDefine],
    ) -> Result<NativeObject, GraphicsError>;

    /// Destroy a device object.
    fn release(&self, object: NativeObject);

    /// Open a pass, clearing its targets as requested.
    fn begin_pass(&self, pass: &PassDescriptor) -> Result<(), GraphicsError>;

    /// Submit an indexed draw inside the open pass.
    fn draw(&self, call: &DrawCall) -> Result<(), GraphicsError>;

    /// Submit a compute dispatch inside the open pass.
    fn dispatch(&self, call: &DispatchCall) -> Result<(), GraphicsError>;

    /// Close the open pass.
    fn end_pass(&self) -> Result<(), GraphicsError>;

    /// Present the frame.
    fn present(&self) -> Result<(), GraphicsError>;
}
