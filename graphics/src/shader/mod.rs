//! Shader loading, variant selection and hot reload.
//!
//! Shaders live in one pool per [`ShaderStage`] and are cached by file name
//! plus define set. Compilation happens on the render thread while it
//! processes the shader command queue; the producer only ever sees handles.
//!
//! A shader that fails to compile is never fatal. Its slot is redirected to
//! the stage's built-in error shader and the frame renders with that instead:
//!
//! | Stage | Error shader |
//! |-------|--------------|
//! | Vertex | `builtin/error.vs`: position transform only |
//! | Pixel | `builtin/error.ps`: flat magenta |
//! | Geometry | `builtin/error.gs`: pass-through |
//! | Compute | `builtin/error.cs`: empty |
//!
//! Vertex shaders for the fixed pass set come from a table built at startup,
//! see [`VertexShaderType`] and [`VertexShaderFlags`].

mod manager;
mod variants;
mod watcher;

pub use manager::{ShaderManager, ShaderReloader};
pub use variants::{VertexShaderFlags, VertexShaderType};
pub use watcher::ShaderWatcher;

use relay_core::pool::Handle;

use crate::backend::NativeObject;

/// Pipeline stage a shader runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
    Geometry,
    Compute,
}

impl ShaderStage {
    /// Number of stages.
    pub const COUNT: usize = 4;

    /// All stages, in pool order.
    pub const ALL: [ShaderStage; Self::COUNT] = [
        ShaderStage::Vertex,
        ShaderStage::Pixel,
        ShaderStage::Geometry,
        ShaderStage::Compute,
    ];

    /// Human-readable name, also used as the pool label.
    pub fn label(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex shader",
            ShaderStage::Pixel => "pixel shader",
            ShaderStage::Geometry => "geometry shader",
            ShaderStage::Compute => "compute shader",
        }
    }

    /// Position in [`ShaderStage::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    fn error_shader(self) -> (&'static str, &'static str) {
        match self {
            ShaderStage::Vertex => ("builtin/error.vs", include_str!("../../shaders/error.vs")),
            ShaderStage::Pixel => ("builtin/error.ps", include_str!("../../shaders/error.ps")),
            ShaderStage::Geometry => ("builtin/error.gs", include_str!("../../shaders/error.gs")),
            ShaderStage::Compute => ("builtin/error.cs", include_str!("../../shaders/error.cs")),
        }
    }
}

/// Preprocessor define passed to the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderDefine {
    pub name: String,
    pub value: String,
}

impl ShaderDefine {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// A define whose value is `1`.
    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name, "1")
    }
}

/// Handle to a shader in its stage's pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle {
    pub stage: ShaderStage,
    pub handle: Handle<Shader>,
}

/// A shader record.
#[derive(Debug, Clone)]
pub struct Shader {
    /// Asset name the source is read from.
    pub name: String,
    pub stage: ShaderStage,
    /// Sorted define set this variant was compiled with.
    pub defines: Vec<ShaderDefine>,
    /// Compiled object; `None` until the render thread compiled it.
    pub native: Option<NativeObject>,
    /// The last compile failed; draws use the stage's error shader.
    pub redirected: bool,
    /// Error shaders and the default vertex table; never released.
    pub persistent: bool,
    pub(crate) embedded: Option<&'static str>,
}

impl Shader {
    fn new(stage: ShaderStage, name: &str, defines: Vec<ShaderDefine>) -> Self {
        Self {
            name: name.to_string(),
            stage,
            defines,
            native: None,
            redirected: false,
            persistent: false,
            embedded: None,
        }
    }
}
