//! Graphics error types.

use std::fmt;

/// Errors that can occur in the graphics system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// Failed to initialize the renderer (e.g. the render thread could not start).
    InitializationFailed(String),
    /// Failed to create a resource.
    ResourceCreationFailed(String),
    /// A shader failed to compile.
    ShaderCompilationFailed {
        /// Shader name.
        name: String,
        /// Compiler output.
        message: String,
    },
    /// The GPU device was lost.
    DeviceLost,
    /// An invalid parameter was provided.
    InvalidParameter(String),
    /// An asset does not exist in the asset source.
    AssetNotFound(String),
    /// An asset exists but could not be decoded.
    AssetDecodeFailed {
        /// Asset name.
        name: String,
        /// Decoder output.
        message: String,
    },
    /// Renderer configuration could not be read or is invalid.
    Config(String),
    /// An internal error occurred.
    Internal(String),
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitializationFailed(msg) => write!(f, "initialization failed: {msg}"),
            Self::ResourceCreationFailed(msg) => write!(f, "resource creation failed: {msg}"),
            Self::ShaderCompilationFailed { name, message } => {
                write!(f, "shader '{name}' failed to compile: {message}")
            }
            Self::DeviceLost => write!(f, "GPU device lost"),
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Self::AssetNotFound(name) => write!(f, "asset not found: {name}"),
            Self::AssetDecodeFailed { name, message } => {
                write!(f, "failed to decode asset '{name}': {message}")
            }
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for GraphicsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphicsError::DeviceLost;
        assert_eq!(err.to_string(), "GPU device lost");

        let err = GraphicsError::AssetNotFound("textures/brick.png".to_string());
        assert_eq!(err.to_string(), "asset not found: textures/brick.png");

        let err = GraphicsError::ShaderCompilationFailed {
            name: "sky.ps".to_string(),
            message: "unexpected token".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "shader 'sky.ps' failed to compile: unexpected token"
        );
    }
}
