use crate::resources::{DepthStencilViewHandle, RenderTargetViewHandle};
use crate::shader::VertexShaderFlags;
use crate::types::Viewport;

use super::BucketKind;

/// The fixed pass sequence of an action, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    Compute,
    ZPrepass,
    Opaque,
    Decal,
    Sky,
    Alpha,
    Editor,
    Ui,
}

impl PassKind {
    /// Number of passes.
    pub const COUNT: usize = 8;

    /// All passes, in execution order.
    pub const ALL: [PassKind; Self::COUNT] = [
        PassKind::Compute,
        PassKind::ZPrepass,
        PassKind::Opaque,
        PassKind::Decal,
        PassKind::Sky,
        PassKind::Alpha,
        PassKind::Editor,
        PassKind::Ui,
    ];

    /// Position in [`PassKind::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Bucket whose draw ops this pass executes.
    pub fn bucket(self) -> BucketKind {
        match self {
            PassKind::Compute => BucketKind::Compute,
            PassKind::ZPrepass | PassKind::Opaque => BucketKind::Opaque,
            PassKind::Decal => BucketKind::Decal,
            PassKind::Sky => BucketKind::Sky,
            PassKind::Alpha => BucketKind::Alpha,
            PassKind::Editor => BucketKind::Editor,
            PassKind::Ui => BucketKind::Ui,
        }
    }
}

/// Depth comparison of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthTestMode {
    #[default]
    Disabled,
    Less,
    LessEqual,
    Equal,
    Always,
}

/// Color blending of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Opaque,
    Alpha,
    Additive,
}

/// State one pass of an action runs with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassConfig {
    /// Disabled passes are skipped entirely, including clears.
    pub enabled: bool,
    pub viewport: Viewport,
    /// Empty means the back buffer.
    pub color_targets: Vec<RenderTargetViewHandle>,
    pub depth_stencil: Option<DepthStencilViewHandle>,
    pub depth_test: DepthTestMode,
    pub depth_write: bool,
    pub blend: BlendMode,
    pub clear_color: Option<[f32; 4]>,
    pub clear_depth: Option<f32>,
    /// Vertex shader variant every draw in the pass uses.
    pub shader_flags: VertexShaderFlags,
}

impl PassConfig {
    /// An enabled pass over `viewport` with default state.
    pub fn enabled(viewport: Viewport) -> Self {
        Self {
            enabled: true,
            viewport,
            ..Self::default()
        }
    }

    /// Whether draws in this pass bind no pixel shader.
    pub fn is_depth_only(&self) -> bool {
        self.shader_flags.contains(VertexShaderFlags::DEPTH_ONLY)
    }

    /// Clear and reuse the color target list.
    pub(crate) fn reset(&mut self) {
        let mut color_targets = std::mem::take(&mut self.color_targets);
        color_targets.clear();
        *self = Self {
            color_targets,
            ..Self::default()
        };
    }
}
