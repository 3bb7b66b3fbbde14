use relay_core::pool::{Handle, Poolable};

use crate::geometry::GeoHandle;
use crate::resources::{ConstantBufferHandle, ResourceHandle};
use crate::shader::{ShaderHandle, VertexShaderType};
use crate::types::SamplerState;

use super::{MAX_CONSTANT_BUFFER_SLOTS, MAX_TEXTURE_SLOTS};

/// Handle to a draw op in the current frame's pool.
///
/// Only valid until the frame it was allocated in retires.
pub type DrawOpHandle = Handle<DrawOp>;

/// One draw or dispatch, filled in by the scene layer.
///
/// A draw needs `geo`; a dispatch (in the compute bucket) needs
/// `compute_shader`. Everything else has a usable default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawOp {
    /// Selects the default vertex shader; the pass picks the variant.
    pub vertex_shader: VertexShaderType,
    /// Overrides the default vertex shader table when set.
    pub custom_vertex_shader: Option<ShaderHandle>,
    /// Not bound in depth-only passes.
    pub pixel_shader: Option<ShaderHandle>,
    pub compute_shader: Option<ShaderHandle>,
    pub textures: [Option<ResourceHandle>; MAX_TEXTURE_SLOTS],
    pub samplers: [SamplerState; MAX_TEXTURE_SLOTS],
    /// Slot 0 is filled with the action's camera constants when empty.
    pub constant_buffers: [Option<ConstantBufferHandle>; MAX_CONSTANT_BUFFER_SLOTS],
    pub geo: Option<GeoHandle>,
    /// Release `geo` when the frame retires.
    pub owns_geo: bool,
    pub thread_groups: [u32; 3],
    /// Set once the op is filed into a bucket; cleared when the pool reuses it.
    pub(crate) bucketed: bool,
}

impl DrawOp {
    /// Bind `texture` with `sampler` at `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is not below [`MAX_TEXTURE_SLOTS`].
    pub fn with_texture(mut self, slot: usize, texture: ResourceHandle, sampler: SamplerState) -> Self {
        assert!(
            slot < MAX_TEXTURE_SLOTS,
            "texture slot {slot} out of range (max {MAX_TEXTURE_SLOTS})"
        );
        self.textures[slot] = Some(texture);
        self.samplers[slot] = sampler;
        self
    }

    /// Whether the op is already filed into a bucket this frame.
    pub fn is_bucketed(&self) -> bool {
        self.bucketed
    }
}

impl Poolable for DrawOp {
    fn new_empty() -> Self {
        Self::default()
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}
