//! Renderer configuration.
//!
//! Pool capacities and frame limits are fixed for the lifetime of a
//! [`Renderer`](crate::Renderer). They are read from a TOML file:
//!
//! ```toml
//! max_resources = 8192
//! max_draw_ops_per_frame = 16384
//! hot_reload = true
//! shader_dir = "assets/shaders"
//! ```
//!
//! Every field is optional and falls back to [`RendererConfig::default`].

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::GraphicsError;

/// Capacities and switches for a renderer instance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererConfig {
    /// Textures and structured buffers.
    pub max_resources: usize,
    /// Render-target views.
    pub max_render_target_views: usize,
    /// Depth-stencil views.
    pub max_depth_stencil_views: usize,
    /// Constant buffers, including pooled temporaries.
    pub max_constant_buffers: usize,
    /// Vertex/index buffer pairs.
    pub max_geometry: usize,
    /// Shaders per stage (vertex, pixel, geometry, compute each get their own pool).
    pub max_shaders_per_stage: usize,
    /// Draw-ops recorded in one frame.
    pub max_draw_ops_per_frame: usize,
    /// Actions recorded in one frame.
    pub max_actions_per_frame: usize,
    /// Free temp constant buffers kept per size bucket.
    pub temp_constant_buffer_pool_depth: usize,
    /// Root the asset source resolves names against; watcher events are
    /// reported relative to it.
    pub asset_root: PathBuf,
    /// Directory watched for shader edits.
    pub shader_dir: PathBuf,
    /// Start a file watcher that reloads edited shaders.
    pub hot_reload: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_resources: 4096,
            max_render_target_views: 256,
            max_depth_stencil_views: 256,
            max_constant_buffers: 4096,
            max_geometry: 4096,
            max_shaders_per_stage: 512,
            max_draw_ops_per_frame: 8192,
            max_actions_per_frame: 16,
            temp_constant_buffer_pool_depth: 64,
            asset_root: PathBuf::from("assets"),
            shader_dir: PathBuf::from("assets/shaders"),
            hot_reload: false,
        }
    }
}

impl RendererConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, GraphicsError> {
        let config: Self =
            toml::from_str(text).map_err(|e| GraphicsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GraphicsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| GraphicsError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
            .map_err(|e| GraphicsError::Config(format!("{}: {e}", path.display())))
    }

    /// Check that every capacity is usable.
    pub fn validate(&self) -> Result<(), GraphicsError> {
        let capacities = [
            ("max_resources", self.max_resources),
            ("max_render_target_views", self.max_render_target_views),
            ("max_depth_stencil_views", self.max_depth_stencil_views),
            ("max_constant_buffers", self.max_constant_buffers),
            ("max_geometry", self.max_geometry),
            ("max_shaders_per_stage", self.max_shaders_per_stage),
            ("max_draw_ops_per_frame", self.max_draw_ops_per_frame),
            ("max_actions_per_frame", self.max_actions_per_frame),
        ];
        for (name, value) in capacities {
            if value == 0 || value > u32::MAX as usize {
                return Err(GraphicsError::Config(format!(
                    "{name} must be between 1 and {}, got {value}",
                    u32::MAX
                )));
            }
        }
        Ok(())
    }

    /// Set every pool capacity to `capacity`. Handy for tests.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.max_resources = capacity;
        self.max_render_target_views = capacity;
        self.max_depth_stencil_views = capacity;
        self.max_constant_buffers = capacity;
        self.max_geometry = capacity;
        self.max_shaders_per_stage = capacity;
        self.max_draw_ops_per_frame = capacity;
        self
    }
}
