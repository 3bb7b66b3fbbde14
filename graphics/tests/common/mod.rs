//! Common utilities for renderer integration tests.
//!
//! Every test drives a real [`Renderer`] with its render thread, on top of the
//! recording [`DummyBackend`] and an in-memory asset source.

#![allow(dead_code)]

use std::sync::Arc;

use relay_graphics::{
    Camera, DeviceCall, DummyBackend, GeometryData, MemorySource, PassKind, PrimaryTargets,
    Renderer, RendererConfig, Vertex, Viewport,
};

/// A pixel shader source the dummy backend compiles.
pub const LIT_PIXEL_SHADER: &str = "float4 main() : SV_Target { return float4(1, 1, 1, 1); }\n";

/// A pixel shader source the dummy backend rejects.
pub const BROKEN_PIXEL_SHADER: &str = "#error unterminated block\n";

/// Vertex shader source shared by the default vertex shader table.
pub const STATIC_MESH_VERTEX_SHADER: &str = "float4 main(float3 p : POSITION) : SV_Position { return float4(p, 1); }\n";

/// Route `log` output to the test harness. Safe to call repeatedly.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Renderer plus handles to its backend and asset source.
pub struct TestContext {
    pub backend: Arc<DummyBackend>,
    pub source: MemorySource,
    pub renderer: Renderer,
}

impl TestContext {
    /// Renderer with small pools and the shaders every test draws with.
    pub fn new() -> Self {
        Self::with_config(RendererConfig::default().with_capacity(256))
    }

    pub fn with_config(config: RendererConfig) -> Self {
        init_logger();
        let backend = Arc::new(DummyBackend::new());
        let source = MemorySource::new()
            .with_file("shaders/static_mesh.vs", STATIC_MESH_VERTEX_SHADER)
            .with_file("shaders/lit.ps", LIT_PIXEL_SHADER);
        let renderer = Renderer::new(backend.clone(), Arc::new(source.clone()), config)
            .expect("renderer should start on the dummy backend");
        Self {
            backend,
            source,
            renderer,
        }
    }

    /// Hand the recorded frame over and wait until the render thread drew it.
    pub fn run_frame(&self) {
        self.renderer.post_frame_sync();
        self.renderer.wait_idle();
    }

    /// Device calls since the last call to this method.
    pub fn take_calls(&self) -> Vec<DeviceCall> {
        self.backend.take_calls()
    }
}

/// Back buffer targets of `width` x `height`.
pub fn back_buffer(width: u32, height: u32) -> PrimaryTargets {
    PrimaryTargets::back_buffer(Viewport::from_dimensions(width, height))
}

/// A camera looking down -Z from `z = 5`.
pub fn test_camera() -> Camera {
    Camera::perspective(
        glam::Vec3::new(0.0, 0.0, 5.0),
        glam::Vec3::ZERO,
        std::f32::consts::FRAC_PI_3,
        16.0 / 9.0,
        0.1,
        100.0,
    )
}

/// Geometry with `vertex_count` vertices on a line and `index_count` indices.
pub fn line_geometry(vertex_count: usize, index_count: usize) -> GeometryData {
    GeometryData::new(
        (0..vertex_count)
            .map(|i| Vertex::at([i as f32, 0.0, 0.0]))
            .collect(),
        (0..index_count as u32)
            .map(|i| i % vertex_count as u32)
            .collect(),
    )
}

/// Passes opened by `calls`, in order.
pub fn begun_passes(calls: &[DeviceCall]) -> Vec<PassKind> {
    calls
        .iter()
        .filter_map(|call| match call {
            DeviceCall::BeginPass(kind) => Some(*kind),
            _ => None,
        })
        .collect()
}

/// Number of calls matching `predicate`.
pub fn count_calls(calls: &[DeviceCall], predicate: impl Fn(&DeviceCall) -> bool) -> usize {
    calls.iter().filter(|call| predicate(call)).count()
}
