//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations. It hands out
//! sequential [`NativeObject`] ids, tracks which ones are alive and records
//! every call in a log that tests can inspect.
//!
//! Shader sources containing `#error` fail to compile, mirroring the
//! preprocessor directive real shader compilers honor.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::draw::PassKind;
use crate::error::GraphicsError;
use crate::shader::{ShaderDefine, ShaderStage};
use crate::types::{ArraySlice, StructuredBufferDescriptor, TextureDescriptor};

use super::{DispatchCall, DrawCall, GpuBackend, NativeObject, PassDescriptor};

/// Marker that makes [`DummyBackend::compile_shader`] fail.
pub const COMPILE_ERROR_MARKER: &str = "#error";

/// One recorded device call.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    CreateTexture {
        object: NativeObject,
        label: Option<String>,
        layers: u32,
        has_data: bool,
    },
    CreateStructuredBuffer {
        object: NativeObject,
        size: u64,
    },
    UpdateBuffer {
        object: NativeObject,
        len: usize,
    },
    CreateRenderTargetView {
        object: NativeObject,
        texture: NativeObject,
        slice: Option<ArraySlice>,
    },
    CreateDepthStencilView {
        object: NativeObject,
        texture: NativeObject,
        slice: Option<ArraySlice>,
    },
    CreateConstantBuffer {
        object: NativeObject,
        size: usize,
    },
    CreateVertexBuffer {
        object: NativeObject,
        len: usize,
    },
    CreateIndexBuffer {
        object: NativeObject,
        count: usize,
    },
    CompileShader {
        object: NativeObject,
        stage: ShaderStage,
        name: String,
    },
    CompileFailed {
        stage: ShaderStage,
        name: String,
    },
    Release(NativeObject),
    BeginPass(PassKind),
    Draw {
        vertex_shader: NativeObject,
        pixel_shader: Option<NativeObject>,
        index_count: u32,
    },
    Dispatch {
        shader: NativeObject,
        thread_groups: [u32; 3],
    },
    EndPass,
    Present,
}

impl DeviceCall {
    /// Whether this call created a device object.
    pub fn is_create(&self) -> bool {
        matches!(
            self,
            Self::CreateTexture { .. }
                | Self::CreateStructuredBuffer { .. }
                | Self::CreateRenderTargetView { .. }
                | Self::CreateDepthStencilView { .. }
                | Self::CreateConstantBuffer { .. }
                | Self::CreateVertexBuffer { .. }
                | Self::CreateIndexBuffer { .. }
                | Self::CompileShader { .. }
        )
    }
}

/// Dummy GPU backend.
#[derive(Debug, Default)]
pub struct DummyBackend {
    next_object: AtomicU64,
    live: Mutex<HashSet<NativeObject>>,
    calls: Mutex<Vec<DeviceCall>>,
    lost: AtomicBool,
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every call recorded so far.
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().clone()
    }

    /// Remove and return the recorded calls.
    pub fn take_calls(&self) -> Vec<DeviceCall> {
        std::mem::take(&mut *self.calls.lock())
    }

    /// Forget the recorded calls.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Number of objects created and not yet released.
    pub fn live_objects(&self) -> usize {
        self.live.lock().len()
    }

    /// Whether `object` was created and not yet released.
    pub fn is_live(&self, object: NativeObject) -> bool {
        self.live.lock().contains(&object)
    }

    /// Simulate device loss: every later call fails with [`GraphicsError::DeviceLost`].
    pub fn set_device_lost(&self, lost: bool) {
        self.lost.store(lost, Ordering::Release);
    }

    fn check_device(&self) -> Result<(), GraphicsError> {
        if self.lost.load(Ordering::Acquire) {
            Err(GraphicsError::DeviceLost)
        } else {
            Ok(())
        }
    }

    fn record(&self, call: DeviceCall) {
        self.calls.lock().push(call);
    }

    fn new_object(&self) -> NativeObject {
        let object = NativeObject(self.next_object.fetch_add(1, Ordering::Relaxed) + 1);
        self.live.lock().insert(object);
        object
    }

    fn require_live(&self, object: NativeObject, what: &str) -> Result<(), GraphicsError> {
        if self.is_live(object) {
            Ok(())
        } else {
            Err(GraphicsError::InvalidParameter(format!(
                "{what} {object:?} is not a live device object"
            )))
        }
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy"
    }

    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        data: Option<&[u8]>,
    ) -> Result<NativeObject, GraphicsError> {
        self.check_device()?;
        let object = self.new_object();
        log::trace!(
            "DummyBackend: creating texture {:?} ({}x{}x{}) -> {:?}",
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.size.depth,
            object
        );
        self.record(DeviceCall::CreateTexture {
            object,
            label: descriptor.label.clone(),
            layers: descriptor.layer_count(),
            has_data: data.is_some(),
        });
        Ok(object)
    }

    fn create_structured_buffer(
        &self,
        descriptor: &StructuredBufferDescriptor,
        _data: Option<&[u8]>,
    ) -> Result<NativeObject, GraphicsError> {
        self.check_device()?;
        let object = self.new_object();
        log::trace!(
            "DummyBackend: creating structured buffer {:?} (size: {}) -> {:?}",
            descriptor.label,
            descriptor.size(),
            object
        );
        self.record(DeviceCall::CreateStructuredBuffer {
            object,
            size: descriptor.size(),
        });
        Ok(object)
    }

    fn update_buffer(&self, buffer: NativeObject, data: &[u8]) -> Result<(), GraphicsError> {
        self.check_device()?;
        self.require_live(buffer, "buffer")?;
        log::trace!("DummyBackend: update_buffer {:?} len={}", buffer, data.len());
        self.record(DeviceCall::UpdateBuffer {
            object: buffer,
            len: data.len(),
        });
        Ok(())
    }

    fn create_render_target_view(
        &self,
        texture: NativeObject,
        slice: Option<ArraySlice>,
    ) -> Result<NativeObject, GraphicsError> {
        self.check_device()?;
        self.require_live(texture, "texture")?;
        let object = self.new_object();
        log::trace!("DummyBackend: creating render target view of {texture:?} {slice:?} -> {object:?}");
        self.record(DeviceCall::CreateRenderTargetView {
            object,
            texture,
            slice,
        });
        Ok(object)
    }

    fn create_depth_stencil_view(
        &self,
        texture: NativeObject,
        slice: Option<ArraySlice>,
    ) -> Result<NativeObject, GraphicsError> {
        self.check_device()?;
        self.require_live(texture, "texture")?;
        let object = self.new_object();
        log::trace!("DummyBackend: creating depth stencil view of {texture:?} {slice:?} -> {object:?}");
        self.record(DeviceCall::CreateDepthStencilView {
            object,
            texture,
            slice,
        });
        Ok(object)
    }

    fn create_constant_buffer(&self, size: usize) -> Result<NativeObject, GraphicsError> {
        self.check_device()?;
        let object = self.new_object();
        log::trace!("DummyBackend: creating constant buffer (size: {size}) -> {object:?}");
        self.record(DeviceCall::CreateConstantBuffer { object, size });
        Ok(object)
    }

    fn create_vertex_buffer(&self, data: &[u8], stride: u32) -> Result<NativeObject, GraphicsError> {
        self.check_device()?;
        let object = self.new_object();
        log::trace!(
            "DummyBackend: creating vertex buffer (len: {}, stride: {stride}) -> {object:?}",
            data.len()
        );
        self.record(DeviceCall::CreateVertexBuffer {
            object,
            len: data.len(),
        });
        Ok(object)
    }

    fn create_index_buffer(&self, indices: &[u32]) -> Result<NativeObject, GraphicsError> {
        self.check_device()?;
        let object = self.new_object();
        log::trace!(
            "DummyBackend: creating index buffer (count: {}) -> {object:?}",
            indices.len()
        );
        self.record(DeviceCall::CreateIndexBuffer {
            object,
            count: indices.len(),
        });
        Ok(object)
    }

    fn compile_shader(
        &self,
        stage: ShaderStage,
        name: &str,
        source: &str,
        defines: &[ShaderDefine],
    ) -> Result<NativeObject, GraphicsError> {
        self.check_device()?;
        if let Some(line) = source
            .lines()
            .find(|line| line.trim_start().starts_with(COMPILE_ERROR_MARKER))
        {
            log::trace!("DummyBackend: compile of {stage:?} shader '{name}' failed");
            self.record(DeviceCall::CompileFailed {
                stage,
                name: name.to_string(),
            });
            return Err(GraphicsError::ShaderCompilationFailed {
                name: name.to_string(),
                message: line.trim().to_string(),
            });
        }
        let object = self.new_object();
        log::trace!(
            "DummyBackend: compiled {stage:?} shader '{name}' ({} defines) -> {object:?}",
            defines.len()
        );
        self.record(DeviceCall::CompileShader {
            object,
            stage,
            name: name.to_string(),
        });
        Ok(object)
    }

    fn release(&self, object: NativeObject) {
        if !self.live.lock().remove(&object) {
            log::warn!("DummyBackend: release of unknown object {object:?}");
            return;
        }
        log::trace!("DummyBackend: released {object:?}");
        self.record(DeviceCall::Release(object));
    }

    fn begin_pass(&self, pass: &PassDescriptor) -> Result<(), GraphicsError> {
        self.check_device()?;
        for target in pass.color_targets.iter().chain(&pass.depth_stencil) {
            self.require_live(*target, "pass target")?;
        }
        log::trace!(
            "DummyBackend: begin pass {:?} ({} color targets, depth: {})",
            pass.kind,
            pass.color_targets.len(),
            pass.depth_stencil.is_some()
        );
        self.record(DeviceCall::BeginPass(pass.kind));
        Ok(())
    }

    fn draw(&self, call: &DrawCall) -> Result<(), GraphicsError> {
        self.check_device()?;
        self.require_live(call.vertex_buffer, "vertex buffer")?;
        self.require_live(call.index_buffer, "index buffer")?;
        log::trace!(
            "DummyBackend: draw {} indices with {:?}/{:?}",
            call.index_count,
            call.vertex_shader,
            call.pixel_shader
        );
        self.record(DeviceCall::Draw {
            vertex_shader: call.vertex_shader,
            pixel_shader: call.pixel_shader,
            index_count: call.index_count,
        });
        Ok(())
    }

    fn dispatch(&self, call: &DispatchCall) -> Result<(), GraphicsError> {
        self.check_device()?;
        log::trace!(
            "DummyBackend: dispatch {:?} groups={:?}",
            call.shader,
            call.thread_groups
        );
        self.record(DeviceCall::Dispatch {
            shader: call.shader,
            thread_groups: call.thread_groups,
        });
        Ok(())
    }

    fn end_pass(&self) -> Result<(), GraphicsError> {
        self.check_device()?;
        self.record(DeviceCall::EndPass);
        Ok(())
    }

    fn present(&self) -> Result<(), GraphicsError> {
        self.check_device()?;
        log::trace!("DummyBackend: present");
        self.record(DeviceCall::Present);
        Ok(())
    }
}

static_assertions::assert_impl_all!(DummyBackend: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TextureFormat, TextureUsage};

    #[test]
    fn test_objects_are_unique_and_tracked() {
        let backend = DummyBackend::new();
        let a = backend.create_constant_buffer(64).unwrap();
        let b = backend.create_constant_buffer(64).unwrap();
        assert_ne!(a, b);
        assert_eq!(backend.live_objects(), 2);

        backend.release(a);
        assert!(!backend.is_live(a));
        assert_eq!(backend.live_objects(), 1);
    }

    #[test]
    fn test_call_log() {
        let backend = DummyBackend::new();
        let desc = TextureDescriptor::new_2d(4, 4, TextureFormat::Rgba8Unorm, TextureUsage::SAMPLED)
            .with_label("albedo");
        let texture = backend.create_texture(&desc, None).unwrap();
        backend.release(texture);

        assert_eq!(
            backend.take_calls(),
            vec![
                DeviceCall::CreateTexture {
                    object: texture,
                    label: Some("albedo".to_string()),
                    layers: 1,
                    has_data: false,
                },
                DeviceCall::Release(texture),
            ]
        );
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_error_marker_fails_compile() {
        let backend = DummyBackend::new();
        let err = backend
            .compile_shader(ShaderStage::Pixel, "broken.ps", "float4 main() {\n#error nope\n}", &[])
            .unwrap_err();
        assert!(matches!(err, GraphicsError::ShaderCompilationFailed { name, .. } if name == "broken.ps"));
        assert_eq!(backend.live_objects(), 0);
    }

    #[test]
    fn test_view_of_dead_texture_rejected() {
        let backend = DummyBackend::new();
        assert!(backend.create_render_target_view(NativeObject(99), None).is_err());
    }

    #[test]
    fn test_device_lost() {
        let backend = DummyBackend::new();
        backend.set_device_lost(true);
        assert_eq!(backend.present(), Err(GraphicsError::DeviceLost));
        backend.set_device_lost(false);
        assert!(backend.present().is_ok());
    }
}
