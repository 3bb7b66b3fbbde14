//! Render-thread side of a frame: command processing and pass execution.

use relay_core::pool::HandlePool;

use crate::backend::{DispatchCall, DrawCall, NativeObject, PassDescriptor};
use crate::draw::{
    Action, ActionState, DrawOp, MAX_CONSTANT_BUFFER_SLOTS, MAX_TEXTURE_SLOTS, PassConfig, PassKind,
};
use crate::error::GraphicsError;
use crate::shader::ShaderStage;

use super::RendererShared;

/// Execute the frame on the read side: apply queued commands, draw every
/// queued action, present.
pub(super) fn execute_frame(shared: &RendererShared) -> Result<(), GraphicsError> {
    let backend = &*shared.backend;
    shared.resources.process_commands(backend)?;
    shared.geometry.process_commands(backend)?;
    shared.shaders.process_commands(backend)?;

    let mut state = shared.frames[shared.frame.read()].lock();
    let (draw_ops, actions) = state.execution_view();
    for action in actions {
        action.state = ActionState::Executing;
        for kind in PassKind::ALL {
            let pass = action.pass(kind);
            if pass.enabled {
                execute_pass(shared, action, kind, pass, draw_ops)?;
            }
        }
    }

    backend.present()
}

fn execute_pass(
    shared: &RendererShared,
    action: &Action,
    kind: PassKind,
    pass: &PassConfig,
    draw_ops: &HandlePool<DrawOp>,
) -> Result<(), GraphicsError> {
    let Some(descriptor) = pass_descriptor(shared, kind, pass) else {
        return Ok(());
    };
    let backend = &*shared.backend;
    backend.begin_pass(&descriptor)?;

    let camera = action.constants.and_then(|cb| shared.resources.constant_buffer_native(cb));
    for &handle in action.bucket(kind.bucket()) {
        let Some(op) = draw_ops.get(handle) else {
            log::warn!("Executor: stale draw op {handle:?} in {kind:?} skipped");
            continue;
        };
        if kind == PassKind::Compute {
            if let Some(call) = dispatch_call(shared, op, camera) {
                backend.dispatch(&call)?;
            }
        } else if let Some(call) = draw_call(shared, op, pass, camera) {
            backend.draw(&call)?;
        }
    }

    backend.end_pass()
}

/// Resolve the pass targets. `None` skips the pass.
fn pass_descriptor(shared: &RendererShared, kind: PassKind, pass: &PassConfig) -> Option<PassDescriptor> {
    let mut color_targets = Vec::with_capacity(pass.color_targets.len());
    for &view in &pass.color_targets {
        let Some(native) = shared.resources.render_target_native(view) else {
            log::warn!("Executor: {kind:?} pass skipped, render target {view:?} not created");
            return None;
        };
        color_targets.push(native);
    }
    let depth_stencil = match pass.depth_stencil {
        Some(view) => {
            let Some(native) = shared.resources.depth_stencil_native(view) else {
                log::warn!("Executor: {kind:?} pass skipped, depth target {view:?} not created");
                return None;
            };
            Some(native)
        }
        None => None,
    };
    Some(PassDescriptor {
        kind,
        viewport: pass.viewport,
        color_targets,
        depth_stencil,
        depth_test: pass.depth_test,
        depth_write: pass.depth_write,
        blend: pass.blend,
        clear_color: pass.clear_color,
        clear_depth: pass.clear_depth,
    })
}

fn bindings(
    shared: &RendererShared,
    op: &DrawOp,
    camera: Option<NativeObject>,
) -> (
    [Option<NativeObject>; MAX_TEXTURE_SLOTS],
    [Option<NativeObject>; MAX_CONSTANT_BUFFER_SLOTS],
) {
    let textures = op
        .textures
        .map(|texture| texture.and_then(|t| shared.resources.texture_native(t)));
    let mut constant_buffers = op
        .constant_buffers
        .map(|cb| cb.and_then(|cb| shared.resources.constant_buffer_native(cb)));
    if op.constant_buffers[0].is_none() {
        constant_buffers[0] = camera;
    }
    (textures, constant_buffers)
}

fn draw_call(
    shared: &RendererShared,
    op: &DrawOp,
    pass: &PassConfig,
    camera: Option<NativeObject>,
) -> Option<DrawCall> {
    let geo = op.geo?;
    let (vertex_buffer, index_buffer, vertex_stride, index_count) = {
        let geometry = shared.geometry.geo(geo)?;
        if !geometry.is_resident() {
            log::trace!("Executor: {geo:?} not resident, draw skipped");
            return None;
        }
        (
            geometry.vertex_buffer?,
            geometry.index_buffer?,
            geometry.vertex_stride,
            geometry.index_count,
        )
    };

    let vertex = op.custom_vertex_shader.unwrap_or_else(|| {
        shared
            .shaders
            .default_vertex_shader(op.vertex_shader, pass.shader_flags)
    });
    let vertex_shader = shared.shaders.resolve_native(vertex)?;
    let pixel_shader = if pass.is_depth_only() {
        None
    } else {
        let pixel = op
            .pixel_shader
            .unwrap_or_else(|| shared.shaders.error_shader(ShaderStage::Pixel));
        Some(shared.shaders.resolve_native(pixel)?)
    };

    let (textures, constant_buffers) = bindings(shared, op, camera);
    Some(DrawCall {
        vertex_shader,
        pixel_shader,
        vertex_buffer,
        index_buffer,
        vertex_stride,
        index_count,
        textures,
        samplers: op.samplers,
        constant_buffers,
    })
}

fn dispatch_call(shared: &RendererShared, op: &DrawOp, camera: Option<NativeObject>) -> Option<DispatchCall> {
    let Some(shader) = op.compute_shader else {
        log::warn!("Executor: compute draw op without a compute shader skipped");
        return None;
    };
    let shader = shared.shaders.resolve_native(shader)?;
    let (textures, constant_buffers) = bindings(shared, op, camera);
    Some(DispatchCall {
        shader,
        thread_groups: op.thread_groups,
        textures,
        constant_buffers,
    })
}
