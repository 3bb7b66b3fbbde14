use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{MappedMutexGuard, Mutex};
use relay_core::pool::{Handle, SyncHandlePool};

use crate::assets::{AssetSource, TextureData};
use crate::backend::{GpuBackend, NativeObject};
use crate::config::RendererConfig;
use crate::error::GraphicsError;
use crate::scheduler::FrameIndex;
use crate::types::{
    ArraySlice, StructuredBufferDescriptor, TextureDescriptor, TextureFormat, TextureUsage,
};

use super::command::ResourceCommand;
use super::{
    ConstantBuffer, ConstantBufferHandle, DepthStencilView, DepthStencilViewHandle, NativeSlot,
    RenderTargetView, RenderTargetViewHandle, Resource, ResourceHandle, ResourceKind,
};

/// Temp constant buffer sizes are rounded up to this.
const CONSTANT_BUFFER_ALIGNMENT: usize = 16;
/// Larger temp buffers are released at flip instead of pooled.
const MAX_POOLED_CONSTANT_BUFFER_SIZE: usize = 1024;
const TEMP_BUCKETS: usize = MAX_POOLED_CONSTANT_BUFFER_SIZE / CONSTANT_BUFFER_ALIGNMENT + 1;

#[derive(Debug)]
struct TempConstantBuffers {
    /// Free handles per size bucket (`size / 16`).
    free: Vec<Vec<ConstantBufferHandle>>,
    /// Handles handed out while recording each side.
    in_flight: [Vec<ConstantBufferHandle>; 2],
}

/// Owns the resource pools and the double-buffered resource command queue.
///
/// Producer-side methods may be called while the render thread processes
/// the other side; they never block on device work.
pub struct ResourceManager {
    frame: FrameIndex,
    source: Arc<dyn AssetSource>,
    resources: SyncHandlePool<Resource>,
    render_target_views: SyncHandlePool<RenderTargetView>,
    depth_stencil_views: SyncHandlePool<DepthStencilView>,
    constant_buffers: SyncHandlePool<ConstantBuffer>,
    texture_cache: Mutex<HashMap<String, ResourceHandle>>,
    temp: Mutex<TempConstantBuffers>,
    temp_pool_depth: usize,
    queues: [Mutex<Vec<ResourceCommand>>; 2],
}

impl ResourceManager {
    /// Create a manager with the pool capacities from `config`.
    pub fn new(frame: FrameIndex, source: Arc<dyn AssetSource>, config: &RendererConfig) -> Self {
        Self {
            frame,
            source,
            resources: SyncHandlePool::new("resource", config.max_resources),
            render_target_views: SyncHandlePool::new(
                "render target view",
                config.max_render_target_views,
            ),
            depth_stencil_views: SyncHandlePool::new(
                "depth stencil view",
                config.max_depth_stencil_views,
            ),
            constant_buffers: SyncHandlePool::new("constant buffer", config.max_constant_buffers),
            texture_cache: Mutex::new(HashMap::new()),
            temp: Mutex::new(TempConstantBuffers {
                free: vec![Vec::new(); TEMP_BUCKETS],
                in_flight: [Vec::new(), Vec::new()],
            }),
            temp_pool_depth: config.temp_constant_buffer_pool_depth,
            queues: [Mutex::new(Vec::new()), Mutex::new(Vec::new())],
        }
    }

    fn enqueue(&self, command: ResourceCommand) {
        log::trace!("Resources: queued {:?}", command.phase());
        self.queues[self.frame.write()].lock().push(command);
    }

    /// Commands queued on the write side so far.
    pub fn queued_commands(&self) -> usize {
        self.queues[self.frame.write()].lock().len()
    }

    /// Create commands queued on the write side so far.
    pub fn queued_creates(&self) -> usize {
        self.queues[self.frame.write()]
            .lock()
            .iter()
            .filter(|command| command.is_create())
            .count()
    }

    // ------------------------------------------------------------------
    // Textures
    // ------------------------------------------------------------------

    /// Create a texture of any shape, optionally with initial contents for
    /// mip 0 of every layer.
    pub fn create_texture(
        &self,
        descriptor: TextureDescriptor,
        data: Option<Vec<u8>>,
    ) -> ResourceHandle {
        let data = data.filter(|bytes| {
            let expected = descriptor.byte_size();
            if bytes.len() != expected {
                log::warn!(
                    "Resources: texture {:?} data is {} bytes, expected {expected}; creating it uninitialized",
                    descriptor.label,
                    bytes.len()
                );
            }
            bytes.len() == expected
        });
        let handle = self
            .resources
            .insert(Resource::new(ResourceKind::Texture(descriptor)));
        self.enqueue(ResourceCommand::CreateTexture { handle, data });
        handle
    }

    /// Create an uninitialized 2D texture.
    pub fn create_texture_2d(
        &self,
        width: u32,
        height: u32,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> ResourceHandle {
        self.create_texture(TextureDescriptor::new_2d(width, height, format, usage), None)
    }

    /// Create an uninitialized 2D array texture.
    pub fn create_texture_2d_array(
        &self,
        width: u32,
        height: u32,
        layers: u32,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> ResourceHandle {
        self.create_texture(
            TextureDescriptor::new_2d_array(width, height, layers, format, usage),
            None,
        )
    }

    /// Create an uninitialized cube texture.
    pub fn create_texture_cube(
        &self,
        size: u32,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> ResourceHandle {
        self.create_texture(TextureDescriptor::new_cube(size, format, usage), None)
    }

    /// Create an uninitialized array of `cubes` cube textures.
    pub fn create_texture_cube_array(
        &self,
        size: u32,
        cubes: u32,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> ResourceHandle {
        self.create_texture(
            TextureDescriptor::new_cube_array(size, cubes, format, usage),
            None,
        )
    }

    /// Load an image, or return the cached handle for `name`.
    ///
    /// A cache hit queues nothing. Missing or undecodable images log a
    /// warning and are replaced by a 1x1 magenta texture, cached under the
    /// same name.
    pub fn create_texture_from_file(&self, name: &str) -> ResourceHandle {
        let mut cache = self.texture_cache.lock();
        if let Some(handle) = cache.get(name) {
            return *handle;
        }
        let handle = match self.load_texture(name) {
            Ok(data) => self.insert_named_texture(name, data, false),
            Err(e) => {
                log::warn!("Resources: {e}; using placeholder for '{name}'");
                self.insert_named_texture(name, TextureData::placeholder(), true)
            }
        };
        cache.insert(name.to_string(), handle);
        handle
    }

    /// Like [`create_texture_from_file`](Self::create_texture_from_file), but
    /// load failures are returned instead of replaced by a placeholder.
    pub fn try_create_texture_from_file(&self, name: &str) -> Result<ResourceHandle, GraphicsError> {
        let mut cache = self.texture_cache.lock();
        if let Some(handle) = cache.get(name) {
            return Ok(*handle);
        }
        let data = self.load_texture(name)?;
        let handle = self.insert_named_texture(name, data, false);
        cache.insert(name.to_string(), handle);
        Ok(handle)
    }

    /// Decode an encoded image from memory, sharing the file name cache.
    pub fn create_texture_from_memory(
        &self,
        name: &str,
        bytes: &[u8],
    ) -> Result<ResourceHandle, GraphicsError> {
        let mut cache = self.texture_cache.lock();
        if let Some(handle) = cache.get(name) {
            return Ok(*handle);
        }
        let data = TextureData::decode(name, bytes)?;
        let handle = self.insert_named_texture(name, data, false);
        cache.insert(name.to_string(), handle);
        Ok(handle)
    }

    fn load_texture(&self, name: &str) -> Result<TextureData, GraphicsError> {
        let bytes = self.source.load(name)?;
        TextureData::decode(name, &bytes)
    }

    fn insert_named_texture(
        &self,
        name: &str,
        data: TextureData,
        is_placeholder: bool,
    ) -> ResourceHandle {
        let mut resource = Resource::new(ResourceKind::Texture(data.descriptor(name)));
        resource.name = Some(name.to_string());
        resource.is_placeholder = is_placeholder;
        let handle = self.resources.insert(resource);
        self.enqueue(ResourceCommand::CreateTexture {
            handle,
            data: Some(data.pixels),
        });
        handle
    }

    // ------------------------------------------------------------------
    // Structured buffers
    // ------------------------------------------------------------------

    /// Create a structured buffer, optionally with initial contents.
    pub fn create_structured_buffer(
        &self,
        descriptor: StructuredBufferDescriptor,
        data: Option<Vec<u8>>,
    ) -> ResourceHandle {
        let handle = self
            .resources
            .insert(Resource::new(ResourceKind::StructuredBuffer(descriptor)));
        self.enqueue(ResourceCommand::CreateBuffer { handle, data });
        handle
    }

    /// Replace the contents of a structured buffer.
    ///
    /// Updates run before buffer creates within a batch, so an update queued
    /// in the same frame as the create is dropped; pass initial contents to
    /// [`create_structured_buffer`](Self::create_structured_buffer) instead.
    pub fn update_structured_buffer(&self, handle: ResourceHandle, data: Vec<u8>) {
        if !self.resources.contains(handle) {
            log::warn!("Resources: update of unknown {handle:?} ignored");
            return;
        }
        self.enqueue(ResourceCommand::UpdateBuffer { handle, data });
    }

    /// Queue a texture or structured buffer for release.
    ///
    /// The handle stays valid until the release is processed.
    pub fn release_resource(&self, handle: ResourceHandle) {
        let Some(name) = self.resources.with(handle, |r| r.name.clone()) else {
            log::warn!("Resources: release of unknown {handle:?} ignored");
            return;
        };
        if let Some(name) = name {
            let mut cache = self.texture_cache.lock();
            if cache.get(&name) == Some(&handle) {
                cache.remove(&name);
            }
        }
        self.enqueue(ResourceCommand::ReleaseResource(handle));
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// Render-target view of a whole texture.
    pub fn create_render_target_view(&self, resource: ResourceHandle) -> RenderTargetViewHandle {
        self.insert_render_target_view(resource, None)
    }

    /// Render-target view of a layer range of an array or cube texture.
    pub fn create_render_target_view_slice(
        &self,
        resource: ResourceHandle,
        slice: ArraySlice,
    ) -> RenderTargetViewHandle {
        self.insert_render_target_view(resource, Some(slice))
    }

    fn insert_render_target_view(
        &self,
        resource: ResourceHandle,
        slice: Option<ArraySlice>,
    ) -> RenderTargetViewHandle {
        let handle = self.render_target_views.insert(RenderTargetView {
            resource,
            slice,
            native: None,
        });
        self.enqueue(ResourceCommand::CreateRenderTargetView(handle));
        handle
    }

    /// Depth-stencil view of a whole texture.
    pub fn create_depth_stencil_view(&self, resource: ResourceHandle) -> DepthStencilViewHandle {
        self.insert_depth_stencil_view(resource, None)
    }

    /// Depth-stencil view of a layer range of an array or cube texture.
    pub fn create_depth_stencil_view_slice(
        &self,
        resource: ResourceHandle,
        slice: ArraySlice,
    ) -> DepthStencilViewHandle {
        self.insert_depth_stencil_view(resource, Some(slice))
    }

    fn insert_depth_stencil_view(
        &self,
        resource: ResourceHandle,
        slice: Option<ArraySlice>,
    ) -> DepthStencilViewHandle {
        let handle = self.depth_stencil_views.insert(DepthStencilView {
            resource,
            slice,
            native: None,
        });
        self.enqueue(ResourceCommand::CreateDepthStencilView(handle));
        handle
    }

    pub fn release_render_target_view(&self, handle: RenderTargetViewHandle) {
        if self.render_target_views.contains(handle) {
            self.enqueue(ResourceCommand::ReleaseRenderTargetView(handle));
        } else {
            log::warn!("Resources: release of unknown render target view {handle:?} ignored");
        }
    }

    pub fn release_depth_stencil_view(&self, handle: DepthStencilViewHandle) {
        if self.depth_stencil_views.contains(handle) {
            self.enqueue(ResourceCommand::ReleaseDepthStencilView(handle));
        } else {
            log::warn!("Resources: release of unknown depth stencil view {handle:?} ignored");
        }
    }

    // ------------------------------------------------------------------
    // Constant buffers
    // ------------------------------------------------------------------

    /// Create a long-lived constant buffer of `size` bytes.
    pub fn create_constant_buffer(&self, size: usize) -> ConstantBufferHandle {
        let handle = self.constant_buffers.insert(ConstantBuffer {
            size,
            temp: false,
            native: None,
        });
        self.enqueue(ResourceCommand::CreateConstantBuffer(handle));
        handle
    }

    /// Get a constant buffer that lives for the current frame.
    ///
    /// Reuses a buffer of the same 16-byte size bucket returned at an
    /// earlier flip when one is free; only a fresh buffer queues a create.
    /// The buffer goes back to its pool once the render thread finished the
    /// frame it was recorded in.
    pub fn create_temp_constant_buffer(&self, size: usize) -> ConstantBufferHandle {
        let bucket = size.max(1).div_ceil(CONSTANT_BUFFER_ALIGNMENT);
        let mut temp = self.temp.lock();
        let reused = temp.free.get_mut(bucket).and_then(Vec::pop);
        let handle = match reused {
            Some(handle) => {
                log::trace!("Resources: reusing temp constant buffer {handle:?} ({size} bytes)");
                handle
            }
            None => {
                let handle = self.constant_buffers.insert(ConstantBuffer {
                    size: bucket * CONSTANT_BUFFER_ALIGNMENT,
                    temp: true,
                    native: None,
                });
                self.enqueue(ResourceCommand::CreateConstantBuffer(handle));
                handle
            }
        };
        temp.in_flight[self.frame.write()].push(handle);
        handle
    }

    /// Queue new contents for a constant buffer.
    pub fn update_constant_buffer(&self, handle: ConstantBufferHandle, data: &[u8]) {
        match self.constant_buffers.with(handle, |cb| cb.size) {
            Some(size) if data.len() <= size => {
                self.enqueue(ResourceCommand::UpdateConstantBuffer {
                    handle,
                    data: data.to_vec(),
                });
            }
            Some(size) => log::warn!(
                "Resources: {} bytes do not fit constant buffer {handle:?} ({size} bytes); update ignored",
                data.len()
            ),
            None => log::warn!("Resources: update of unknown constant buffer {handle:?} ignored"),
        }
    }

    /// Queue a plain-old-data value as the new contents of a constant buffer.
    pub fn update_constant_buffer_pod<T: bytemuck::Pod>(&self, handle: ConstantBufferHandle, value: &T) {
        self.update_constant_buffer(handle, bytemuck::bytes_of(value));
    }

    /// Queue a long-lived constant buffer for release. Temp buffers are owned
    /// by their pool and cannot be released by hand.
    pub fn release_constant_buffer(&self, handle: ConstantBufferHandle) {
        match self.constant_buffers.with(handle, |cb| cb.temp) {
            Some(false) => self.enqueue(ResourceCommand::ReleaseConstantBuffer(handle)),
            Some(true) => {
                log::warn!("Resources: {handle:?} is a temp constant buffer; release ignored");
            }
            None => log::warn!("Resources: release of unknown constant buffer {handle:?} ignored"),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    //
    // Each guard locks its whole pool until dropped. Holding one across a
    // create or release of the same kind, or across a frame sync, deadlocks.
    // ------------------------------------------------------------------

    /// Read access to a texture or structured buffer record.
    pub fn resource(&self, handle: ResourceHandle) -> Option<MappedMutexGuard<'_, Resource>> {
        self.resources.get(handle)
    }

    /// Read access to a render target view record.
    pub fn render_target_view(
        &self,
        handle: RenderTargetViewHandle,
    ) -> Option<MappedMutexGuard<'_, RenderTargetView>> {
        self.render_target_views.get(handle)
    }

    /// Read access to a depth-stencil view record.
    pub fn depth_stencil_view(
        &self,
        handle: DepthStencilViewHandle,
    ) -> Option<MappedMutexGuard<'_, DepthStencilView>> {
        self.depth_stencil_views.get(handle)
    }

    /// Read access to a constant buffer record.
    pub fn constant_buffer(
        &self,
        handle: ConstantBufferHandle,
    ) -> Option<MappedMutexGuard<'_, ConstantBuffer>> {
        self.constant_buffers.get(handle)
    }

    pub(crate) fn texture_native(&self, handle: ResourceHandle) -> Option<NativeObject> {
        self.resources.with(handle, |r| r.native).flatten()
    }

    pub(crate) fn render_target_native(&self, handle: RenderTargetViewHandle) -> Option<NativeObject> {
        self.render_target_views.with(handle, |v| v.native).flatten()
    }

    pub(crate) fn depth_stencil_native(&self, handle: DepthStencilViewHandle) -> Option<NativeObject> {
        self.depth_stencil_views.with(handle, |v| v.native).flatten()
    }

    pub(crate) fn constant_buffer_native(&self, handle: ConstantBufferHandle) -> Option<NativeObject> {
        self.constant_buffers.with(handle, |cb| cb.native).flatten()
    }

    // ------------------------------------------------------------------
    // Frame boundary
    // ------------------------------------------------------------------

    /// Recycle the temp constant buffers of the frame the render thread just
    /// finished. Called by the producer before the frame index flips.
    ///
    /// Each buffer goes back to its size bucket, or is released when the
    /// bucket already holds `temp_constant_buffer_pool_depth` buffers.
    pub fn flip_state(&self) {
        let read = self.frame.read();
        let mut temp = self.temp.lock();
        let mut retired = std::mem::take(&mut temp.in_flight[read]);
        for handle in retired.drain(..) {
            let Some(size) = self.constant_buffers.with(handle, |cb| cb.size) else {
                continue;
            };
            let bucket = size / CONSTANT_BUFFER_ALIGNMENT;
            match temp.free.get_mut(bucket) {
                Some(free) if free.len() < self.temp_pool_depth => free.push(handle),
                _ => self.enqueue(ResourceCommand::ReleaseConstantBuffer(handle)),
            }
        }
        temp.in_flight[read] = retired;

        debug_assert!(
            self.queues[read].lock().is_empty(),
            "resource commands left unprocessed on the read side"
        );
    }

    /// Render thread: execute the read side's commands in phase order.
    pub fn process_commands(&self, backend: &dyn GpuBackend) -> Result<(), GraphicsError> {
        let mut commands = std::mem::take(&mut *self.queues[self.frame.read()].lock());
        if commands.is_empty() {
            return Ok(());
        }
        commands.sort_by_key(ResourceCommand::phase);
        log::trace!("Resources: processing {} commands", commands.len());

        for command in commands {
            self.execute(backend, command)?;
        }
        Ok(())
    }

    fn execute(&self, backend: &dyn GpuBackend, command: ResourceCommand) -> Result<(), GraphicsError> {
        match command {
            ResourceCommand::ReleaseResource(handle) => {
                release_record(backend, &self.resources, handle);
            }
            ResourceCommand::ReleaseRenderTargetView(handle) => {
                release_record(backend, &self.render_target_views, handle);
            }
            ResourceCommand::ReleaseDepthStencilView(handle) => {
                release_record(backend, &self.depth_stencil_views, handle);
            }
            ResourceCommand::ReleaseConstantBuffer(handle) => {
                release_record(backend, &self.constant_buffers, handle);
            }
            ResourceCommand::CreateTexture { handle, data } => {
                let descriptor = self
                    .resources
                    .with(handle, |r| match &r.kind {
                        ResourceKind::Texture(descriptor) => Some(descriptor.clone()),
                        ResourceKind::StructuredBuffer(_) => None,
                    })
                    .flatten();
                let Some(descriptor) = descriptor else {
                    log::trace!("Resources: skipping create of released {handle:?}");
                    return Ok(());
                };
                let native = backend.create_texture(&descriptor, data.as_deref())?;
                install(backend, &self.resources, handle, native);
            }
            ResourceCommand::UpdateBuffer { handle, data } => {
                match self.texture_native(handle) {
                    Some(native) => backend.update_buffer(native, &data)?,
                    None => log::warn!("Resources: update of {handle:?} before it exists dropped"),
                }
            }
            ResourceCommand::CreateBuffer { handle, data } => {
                let descriptor = self
                    .resources
                    .with(handle, |r| match &r.kind {
                        ResourceKind::StructuredBuffer(descriptor) => Some(descriptor.clone()),
                        ResourceKind::Texture(_) => None,
                    })
                    .flatten();
                let Some(descriptor) = descriptor else {
                    log::trace!("Resources: skipping create of released {handle:?}");
                    return Ok(());
                };
                let native = backend.create_structured_buffer(&descriptor, data.as_deref())?;
                install(backend, &self.resources, handle, native);
            }
            ResourceCommand::CreateRenderTargetView(handle) => {
                let Some((resource, slice)) =
                    self.render_target_views.with(handle, |v| (v.resource, v.slice))
                else {
                    log::trace!("Resources: skipping create of released {handle:?}");
                    return Ok(());
                };
                let Some(texture) = self.texture_native(resource) else {
                    log::warn!("Resources: render target view {handle:?} of missing {resource:?} skipped");
                    return Ok(());
                };
                let native = backend.create_render_target_view(texture, slice)?;
                install(backend, &self.render_target_views, handle, native);
            }
            ResourceCommand::CreateDepthStencilView(handle) => {
                let Some((resource, slice)) =
                    self.depth_stencil_views.with(handle, |v| (v.resource, v.slice))
                else {
                    log::trace!("Resources: skipping create of released {handle:?}");
                    return Ok(());
                };
                let Some(texture) = self.texture_native(resource) else {
                    log::warn!("Resources: depth stencil view {handle:?} of missing {resource:?} skipped");
                    return Ok(());
                };
                let native = backend.create_depth_stencil_view(texture, slice)?;
                install(backend, &self.depth_stencil_views, handle, native);
            }
            ResourceCommand::CreateConstantBuffer(handle) => {
                let Some(size) = self.constant_buffers.with(handle, |cb| cb.size) else {
                    log::trace!("Resources: skipping create of released {handle:?}");
                    return Ok(());
                };
                let native = backend.create_constant_buffer(size)?;
                install(backend, &self.constant_buffers, handle, native);
            }
            ResourceCommand::UpdateConstantBuffer { handle, data } => {
                match self.constant_buffer_native(handle) {
                    Some(native) => backend.update_buffer(native, &data)?,
                    None => log::warn!("Resources: update of {handle:?} before it exists dropped"),
                }
            }
        }
        Ok(())
    }
}

/// Release the device object behind `handle` and return its slot to the pool.
fn release_record<T: NativeSlot>(backend: &dyn GpuBackend, pool: &SyncHandlePool<T>, handle: Handle<T>) {
    match pool.with_mut(handle, |record| record.native_slot().take()) {
        Some(native) => {
            if let Some(native) = native {
                backend.release(native);
            }
            pool.release(handle);
            log::trace!("Resources: released {handle:?}");
        }
        None => log::warn!("Resources: {handle:?} released twice"),
    }
}

/// Store a freshly created device object on its record.
fn install<T: NativeSlot>(
    backend: &dyn GpuBackend,
    pool: &SyncHandlePool<T>,
    handle: Handle<T>,
    native: NativeObject,
) {
    let previous = pool.with_mut(handle, |record| record.native_slot().replace(native));
    match previous {
        Some(Some(old)) => backend.release(old),
        Some(None) => log::trace!("Resources: created {handle:?} -> {native:?}"),
        None => backend.release(native),
    }
}

static_assertions::assert_impl_all!(ResourceManager: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemorySource;
    use crate::backend::{DeviceCall, DummyBackend};
    use crate::types::BufferUsage;

    struct Fixture {
        frame: FrameIndex,
        resources: ResourceManager,
        backend: DummyBackend,
    }

    impl Fixture {
        fn new(source: MemorySource) -> Self {
            let frame = FrameIndex::new();
            let config = RendererConfig {
                temp_constant_buffer_pool_depth: 2,
                ..RendererConfig::default().with_capacity(64)
            };
            let resources = ResourceManager::new(frame.clone(), Arc::new(source), &config);
            Self {
                frame,
                resources,
                backend: DummyBackend::new(),
            }
        }

        /// Flip, let the "render thread" process, and recycle like the renderer does.
        fn frame(&self) {
            self.resources.flip_state();
            self.frame.flip();
            self.resources.process_commands(&self.backend).unwrap();
        }
    }

    fn png_bytes() -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 255]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        image.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_same_frame_file_requests_share_one_create() {
        let fx = Fixture::new(MemorySource::new().with_file("brick.png", png_bytes()));
        let a = fx.resources.create_texture_from_file("brick.png");
        let b = fx.resources.create_texture_from_file("brick.png");
        assert_eq!(a, b);
        assert_eq!(fx.resources.queued_creates(), 1);

        fx.frame();
        let resource = fx.resources.resource(a).unwrap();
        assert!(resource.native.is_some());
        assert_eq!(resource.dimensions(), Some((2, 2)));
        assert!(!resource.is_placeholder);
    }

    #[test]
    fn test_memory_texture_shares_cache() {
        let fx = Fixture::new(MemorySource::new());
        let a = fx.resources.create_texture_from_memory("gen/noise", &png_bytes()).unwrap();
        let b = fx.resources.create_texture_from_file("gen/noise");
        assert_eq!(a, b);
        assert!(fx.resources.create_texture_from_memory("bad", b"xx").is_err());
    }

    #[test]
    fn test_missing_texture_uses_placeholder() {
        let fx = Fixture::new(MemorySource::new());
        let handle = fx.resources.create_texture_from_file("missing.png");
        assert!(fx.resources.try_create_texture_from_file("other.png").is_err());
        assert_eq!(fx.resources.create_texture_from_file("missing.png"), handle);

        fx.frame();
        let resource = fx.resources.resource(handle).unwrap();
        assert!(resource.is_placeholder);
        assert_eq!(resource.dimensions(), Some((1, 1)));
        assert!(resource.native.is_some());
    }

    #[test]
    fn test_release_processed_before_create() {
        let fx = Fixture::new(MemorySource::new());
        let old = fx.resources.create_texture_2d(8, 8, TextureFormat::Rgba8Unorm, TextureUsage::SAMPLED);
        fx.frame();
        let old_native = fx.resources.texture_native(old).unwrap();
        fx.backend.clear_calls();

        let new = fx.resources.create_texture_2d(8, 8, TextureFormat::Rgba8Unorm, TextureUsage::SAMPLED);
        fx.resources.release_resource(old);
        assert!(fx.resources.resource(old).is_some());
        fx.frame();

        let calls = fx.backend.take_calls();
        assert_eq!(calls[0], DeviceCall::Release(old_native));
        assert!(calls[1].is_create());
        assert!(fx.resources.resource(old).is_none());
        assert!(fx.resources.texture_native(new).is_some());
    }

    #[test]
    fn test_create_then_release_same_frame_skips_create() {
        let fx = Fixture::new(MemorySource::new());
        let handle = fx.resources.create_constant_buffer(64);
        fx.resources.release_constant_buffer(handle);
        fx.frame();
        assert!(fx.backend.calls().is_empty());
        assert!(fx.resources.constant_buffer(handle).is_none());
    }

    #[test]
    fn test_temp_constant_buffer_reused_after_two_flips() {
        let fx = Fixture::new(MemorySource::new());
        let first = fx.resources.create_temp_constant_buffer(100);
        assert_eq!(fx.resources.constant_buffer(first).unwrap().size, 112);
        fx.frame();
        fx.frame();

        let second = fx.resources.create_temp_constant_buffer(97);
        assert_eq!(second, first);
        assert_eq!(fx.resources.queued_creates(), 0);

        let other_bucket = fx.resources.create_temp_constant_buffer(64);
        assert_ne!(other_bucket, first);
        assert_eq!(fx.resources.queued_creates(), 1);
    }

    #[test]
    fn test_temp_pool_overflow_releases() {
        let fx = Fixture::new(MemorySource::new());
        let handles: Vec<_> = (0..3).map(|_| fx.resources.create_temp_constant_buffer(32)).collect();
        fx.frame();
        fx.backend.clear_calls();
        fx.frame();
        fx.frame();

        let released = fx
            .backend
            .calls()
            .iter()
            .filter(|call| matches!(call, DeviceCall::Release(_)))
            .count();
        assert_eq!(released, 1);
        let live = handles
            .iter()
            .filter(|h| fx.resources.constant_buffer(**h).is_some())
            .count();
        assert_eq!(live, 2);
    }

    #[test]
    fn test_oversized_temp_buffers_are_not_pooled() {
        let fx = Fixture::new(MemorySource::new());
        let big = fx.resources.create_temp_constant_buffer(4096);
        fx.frame();
        fx.frame();
        fx.frame();
        assert!(fx.resources.constant_buffer(big).is_none());
    }

    #[test]
    fn test_manual_release_of_temp_buffer_ignored() {
        let fx = Fixture::new(MemorySource::new());
        let temp = fx.resources.create_temp_constant_buffer(16);
        fx.resources.release_constant_buffer(temp);
        assert_eq!(fx.resources.queued_commands(), 1);
    }

    #[test]
    fn test_constant_buffer_update_follows_create() {
        let fx = Fixture::new(MemorySource::new());
        let handle = fx.resources.create_constant_buffer(64);
        fx.resources.update_constant_buffer_pod(handle, &[1.0f32; 4]);
        fx.resources.update_constant_buffer(handle, &[0; 128]);
        fx.frame();

        let native = fx.resources.constant_buffer_native(handle).unwrap();
        assert_eq!(
            fx.backend.calls(),
            vec![
                DeviceCall::CreateConstantBuffer { object: native, size: 64 },
                DeviceCall::UpdateBuffer { object: native, len: 16 },
            ]
        );
    }

    #[test]
    fn test_views_of_array_slices() {
        let fx = Fixture::new(MemorySource::new());
        let shadow = fx.resources.create_texture_cube_array(
            512,
            2,
            TextureFormat::Depth32Float,
            TextureUsage::DEPTH_STENCIL | TextureUsage::SAMPLED,
        );
        let face = fx.resources.create_depth_stencil_view_slice(shadow, ArraySlice::layer(7));
        let whole = fx.resources.create_depth_stencil_view(shadow);
        fx.frame();

        let texture = fx.resources.texture_native(shadow).unwrap();
        let view = fx.resources.depth_stencil_view(face).unwrap();
        assert_eq!(view.slice, Some(ArraySlice::layer(7)));
        assert!(fx.backend.calls().contains(&DeviceCall::CreateDepthStencilView {
            object: view.native.unwrap(),
            texture,
            slice: Some(ArraySlice::layer(7)),
        }));
        drop(view);
        assert!(fx.resources.depth_stencil_native(whole).is_some());

        fx.resources.release_depth_stencil_view(face);
        fx.frame();
        assert!(fx.resources.depth_stencil_view(face).is_none());
    }

    #[test]
    fn test_render_target_view_of_missing_resource_skipped() {
        let fx = Fixture::new(MemorySource::new());
        let target = fx.resources.create_texture_2d(4, 4, TextureFormat::Rgba16Float, TextureUsage::RENDER_TARGET);
        fx.resources.release_resource(target);
        let view = fx.resources.create_render_target_view(target);
        fx.frame();
        assert!(fx.resources.render_target_view(view).is_some());
        assert!(fx.resources.render_target_native(view).is_none());
    }

    #[test]
    fn test_structured_buffer_update_needs_existing_buffer() {
        let fx = Fixture::new(MemorySource::new());
        let buffer = fx.resources.create_structured_buffer(
            StructuredBufferDescriptor::new(16, 8, BufferUsage::SHADER_READ | BufferUsage::CPU_UPDATE),
            Some(vec![0; 128]),
        );
        fx.resources.update_structured_buffer(buffer, vec![1; 128]);
        fx.frame();
        assert!(!fx.backend.calls().iter().any(|c| matches!(c, DeviceCall::UpdateBuffer { .. })));
        assert_eq!(fx.resources.resource(buffer).unwrap().element_count(), Some(8));

        fx.resources.update_structured_buffer(buffer, vec![2; 128]);
        fx.frame();
        assert!(fx.backend.calls().iter().any(|c| matches!(c, DeviceCall::UpdateBuffer { len: 128, .. })));
    }

    #[test]
    fn test_release_clears_texture_cache() {
        let fx = Fixture::new(MemorySource::new().with_file("a.png", png_bytes()));
        let first = fx.resources.create_texture_from_file("a.png");
        fx.resources.release_resource(first);
        let second = fx.resources.create_texture_from_file("a.png");
        assert_ne!(first, second);
    }
}
