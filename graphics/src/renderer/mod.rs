//! The renderer: subsystem ownership, the producer API and the render thread.
//!
//! [`Renderer`] builds every subsystem around one [`FrameIndex`], shares them
//! with a render thread named `relay-render` and drives the frame handshake
//! from [`post_frame_sync`](Renderer::post_frame_sync):
//!
//! 1. wait until the render thread finished the previous frame
//! 2. retire that frame's actions and draw ops
//! 3. let every subsystem recycle its read side, then flip the frame index
//! 4. signal the render thread, which processes the commands and draws
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use relay_graphics::{
//!     BucketKind, Camera, DummyBackend, MemorySource, PrimaryTargets, Renderer, RendererConfig,
//!     Viewport,
//! };
//!
//! let renderer = Renderer::new(
//!     Arc::new(DummyBackend::new()),
//!     Arc::new(MemorySource::new()),
//!     RendererConfig::default(),
//! )
//! .unwrap();
//!
//! renderer.begin_primary_action(
//!     Camera::default(),
//!     &PrimaryTargets::back_buffer(Viewport::from_dimensions(1280, 720)),
//! );
//! let op = renderer.allocate_draw_op();
//! renderer.add_to_bucket(op, BucketKind::Opaque);
//! renderer.end_action();
//! renderer.post_frame_sync();
//! ```

mod executor;
mod frame_state;

use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::assets::AssetSource;
use crate::backend::GpuBackend;
use crate::camera::{Camera, CameraConstants};
use crate::config::RendererConfig;
use crate::draw::{ActionKind, BucketKind, DrawOp, DrawOpHandle, PrimaryTargets};
use crate::error::GraphicsError;
use crate::geometry::GeometryManager;
use crate::resources::{ConstantBufferHandle, DepthStencilViewHandle, ResourceManager};
use crate::scheduler::{FrameHandshake, FrameIndex};
use crate::shader::{ShaderManager, ShaderReloader, ShaderWatcher};
use crate::types::Viewport;

use frame_state::FrameState;

/// State shared between the producer and the render thread.
pub(crate) struct RendererShared {
    backend: Arc<dyn GpuBackend>,
    frame: FrameIndex,
    handshake: FrameHandshake,
    resources: ResourceManager,
    geometry: GeometryManager,
    shaders: ShaderManager,
    frames: [Mutex<FrameState>; 2],
}

/// Two-thread renderer.
///
/// All methods are producer-side and take `&self`; the render thread only
/// touches the read side of each double buffer.
pub struct Renderer {
    shared: Arc<RendererShared>,
    render_thread: Option<JoinHandle<()>>,
    _watcher: Option<ShaderWatcher>,
}

impl Renderer {
    /// Build the subsystems and start the render thread.
    ///
    /// With `hot_reload` set, a [`ShaderWatcher`] on `shader_dir` requests
    /// reloads for changed shader files.
    pub fn new(
        backend: Arc<dyn GpuBackend>,
        source: Arc<dyn AssetSource>,
        config: RendererConfig,
    ) -> Result<Self, GraphicsError> {
        config.validate()?;
        let frame = FrameIndex::new();
        let new_frame_state =
            || Mutex::new(FrameState::new(config.max_actions_per_frame, config.max_draw_ops_per_frame));

        let shared = Arc::new(RendererShared {
            resources: ResourceManager::new(frame.clone(), source.clone(), &config),
            geometry: GeometryManager::new(frame.clone(), source.clone(), config.max_geometry),
            shaders: ShaderManager::new(frame.clone(), source, config.max_shaders_per_stage),
            frames: [new_frame_state(), new_frame_state()],
            handshake: FrameHandshake::new(),
            frame,
            backend,
        });

        let watcher = if config.hot_reload {
            Some(ShaderWatcher::new(
                &config.shader_dir,
                &config.asset_root,
                shared.shaders.reloader(),
            )?)
        } else {
            None
        };

        let render_thread = {
            let shared = shared.clone();
            std::thread::Builder::new()
                .name("relay-render".into())
                .spawn(move || render_loop(&shared))
                .map_err(|e| {
                    GraphicsError::InitializationFailed(format!("failed to spawn render thread: {e}"))
                })?
        };

        log::info!("Renderer started on backend '{}'", shared.backend.name());
        Ok(Self {
            shared,
            render_thread: Some(render_thread),
            _watcher: watcher,
        })
    }

    pub fn resources(&self) -> &ResourceManager {
        &self.shared.resources
    }

    pub fn geometry(&self) -> &GeometryManager {
        &self.shared.geometry
    }

    pub fn shaders(&self) -> &ShaderManager {
        &self.shared.shaders
    }

    /// A handle for requesting shader reloads from any thread.
    pub fn shader_reloader(&self) -> ShaderReloader {
        self.shared.shaders.reloader()
    }

    /// Number of frames handed to the render thread so far.
    pub fn frame_index(&self) -> usize {
        self.shared.frame.frame()
    }

    fn write_state(&self) -> MutexGuard<'_, FrameState> {
        self.shared.frames[self.shared.frame.write()].lock()
    }

    /// Temp constant buffer with `camera`'s constants for a new action.
    fn camera_constants(&self, camera: &Camera) -> ConstantBufferHandle {
        let resources = &self.shared.resources;
        let constants = resources.create_temp_constant_buffer(size_of::<CameraConstants>());
        resources.update_constant_buffer_pod(constants, &camera.constants());
        constants
    }

    /// Start recording the main view.
    ///
    /// # Panics
    ///
    /// Panics if another action is recording or the frame's action limit is
    /// reached.
    pub fn begin_primary_action(&self, camera: Camera, targets: &PrimaryTargets) {
        let mut state = self.write_state();
        assert_can_begin(&state);
        let constants = self.camera_constants(&camera);
        state.begin_action().begin_primary(camera, constants, targets);
    }

    /// Start recording a depth-only shadow map.
    ///
    /// # Panics
    ///
    /// Same as [`begin_primary_action`](Self::begin_primary_action).
    pub fn begin_shadow_map_action(
        &self,
        camera: Camera,
        depth: DepthStencilViewHandle,
        viewport: Viewport,
    ) {
        self.begin_shadow(ActionKind::ShadowMap, camera, depth, viewport);
    }

    /// Start recording a depth-only cube shadow map; `depth` should view all
    /// six faces.
    ///
    /// # Panics
    ///
    /// Same as [`begin_primary_action`](Self::begin_primary_action).
    pub fn begin_shadow_cube_map_action(
        &self,
        camera: Camera,
        depth: DepthStencilViewHandle,
        viewport: Viewport,
    ) {
        self.begin_shadow(ActionKind::ShadowCubeMap, camera, depth, viewport);
    }

    fn begin_shadow(
        &self,
        kind: ActionKind,
        camera: Camera,
        depth: DepthStencilViewHandle,
        viewport: Viewport,
    ) {
        let mut state = self.write_state();
        assert_can_begin(&state);
        let constants = self.camera_constants(&camera);
        state
            .begin_action()
            .begin_shadow(kind, camera, constants, depth, viewport);
    }

    /// Finish the current action. It stays queued for this frame.
    pub fn end_action(&self) {
        self.write_state().end_action();
    }

    /// Allocate a zeroed draw op, valid until this frame retires.
    ///
    /// # Panics
    ///
    /// Panics if the frame's draw-op pool is exhausted.
    pub fn allocate_draw_op(&self) -> DrawOpHandle {
        self.write_state().draw_ops.alloc()
    }

    /// Mutable access to a draw op of the frame being recorded.
    ///
    /// The guard holds the frame's recording lock: drop it before calling
    /// any other recording method on this thread, or the call deadlocks.
    pub fn draw_op_mut(&self, handle: DrawOpHandle) -> Option<MappedMutexGuard<'_, DrawOp>> {
        MutexGuard::try_map(self.write_state(), |state| state.draw_ops.get_mut(handle)).ok()
    }

    /// File a draw op into a bucket of the current action. An op joins one
    /// bucket per frame; a second insert is ignored with a warning.
    ///
    /// # Panics
    ///
    /// Panics if no action is recording or `op` is not a live draw op of the
    /// frame being recorded.
    pub fn add_to_bucket(&self, op: DrawOpHandle, bucket: BucketKind) {
        self.write_state().add_to_bucket(op, bucket);
    }

    /// End the frame: wait for the render thread, recycle its frame, flip
    /// every double buffer and hand the recorded frame over.
    ///
    /// # Panics
    ///
    /// Panics if an action is still recording, or with the render thread's
    /// error if it failed.
    pub fn post_frame_sync(&self) {
        assert!(
            !self.write_state().is_recording(),
            "post_frame_sync called while an action is recording"
        );
        let shared = &*self.shared;
        shared.handshake.wait_render_done();

        shared.frames[shared.frame.read()]
            .lock()
            .retire(&shared.geometry);
        shared.resources.flip_state();
        shared.geometry.flip_state();
        shared.shaders.flip_state();
        shared.frame.flip();

        shared.handshake.signal_frame();
    }

    /// Block until the render thread finished the frame it is working on.
    ///
    /// # Panics
    ///
    /// Panics with the render thread's error if it failed.
    pub fn wait_idle(&self) {
        self.shared.handshake.wait_render_done();
        self.shared.handshake.signal_render_done();
    }
}

fn assert_can_begin(state: &FrameState) {
    assert!(
        !state.is_recording(),
        "begin action while another action is recording; call end_action first"
    );
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.shared.handshake.request_shutdown();
        if let Some(thread) = self.render_thread.take()
            && thread.join().is_err()
        {
            log::error!("Render thread panicked during shutdown");
        }
        log::info!("Renderer stopped");
    }
}

fn render_loop(shared: &RendererShared) {
    log::debug!("Render thread started");
    while shared.handshake.wait_for_frame() {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            executor::execute_frame(shared)
        }));
        let failure = match result {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(payload) => Some(panic_payload_to_string(&*payload)),
        };
        if let Some(message) = failure {
            shared.handshake.report_failure(message);
            shared.handshake.signal_render_done();
            break;
        }
        shared.handshake.signal_render_done();
    }
    log::debug!("Render thread exiting");
}

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

static_assertions::assert_impl_all!(RendererShared: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemorySource;
    use crate::backend::{DeviceCall, DummyBackend};
    use crate::draw::PassKind;

    fn renderer() -> (Arc<DummyBackend>, Renderer) {
        let backend = Arc::new(DummyBackend::new());
        let renderer = Renderer::new(
            backend.clone(),
            Arc::new(MemorySource::new()),
            RendererConfig::default().with_capacity(128),
        )
        .unwrap();
        (backend, renderer)
    }

    #[test]
    fn test_frames_advance() {
        let (backend, renderer) = renderer();
        renderer.post_frame_sync();
        renderer.post_frame_sync();
        renderer.wait_idle();
        assert_eq!(renderer.frame_index(), 2);
        let presents = backend.calls().iter().filter(|c| **c == DeviceCall::Present).count();
        assert_eq!(presents, 2);
    }

    #[test]
    fn test_shadow_action_runs_one_depth_pass() {
        let (backend, renderer) = renderer();
        let depth = renderer.resources().create_texture_2d(
            256,
            256,
            crate::types::TextureFormat::Depth32Float,
            crate::types::TextureUsage::DEPTH_STENCIL,
        );
        let view = renderer.resources().create_depth_stencil_view(depth);
        renderer.post_frame_sync();

        renderer.begin_shadow_map_action(Camera::default(), view, Viewport::from_dimensions(256, 256));
        renderer.end_action();
        renderer.post_frame_sync();
        renderer.wait_idle();

        let passes: Vec<_> = backend
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                DeviceCall::BeginPass(kind) => Some(kind),
                _ => None,
            })
            .collect();
        assert_eq!(passes, [PassKind::ZPrepass]);
    }

    #[test]
    #[should_panic(expected = "post_frame_sync called while an action is recording")]
    fn test_sync_while_recording_panics() {
        let (_backend, renderer) = renderer();
        renderer.begin_primary_action(
            Camera::default(),
            &PrimaryTargets::back_buffer(Viewport::from_dimensions(8, 8)),
        );
        renderer.post_frame_sync();
    }

    #[test]
    fn test_panic_payload_to_string() {
        let payload = std::panic::catch_unwind(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(panic_payload_to_string(&*payload), "boom 1");
    }
}
