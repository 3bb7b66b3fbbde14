use crate::error::GraphicsError;
use crate::types::{TextureDescriptor, TextureFormat, TextureUsage};

/// Decoded 2D image in RGBA8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 rows.
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// Decode a PNG or JPEG image.
    pub fn decode(name: &str, bytes: &[u8]) -> Result<Self, GraphicsError> {
        let image = image::load_from_memory(bytes).map_err(|e| GraphicsError::AssetDecodeFailed {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }

    /// 1x1 magenta texture substituted for missing or broken images.
    pub fn placeholder() -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![255, 0, 255, 255],
        }
    }

    /// Descriptor for uploading this image as a sampled texture.
    pub fn descriptor(&self, label: &str) -> TextureDescriptor {
        TextureDescriptor::new_2d(
            self.width,
            self.height,
            TextureFormat::Rgba8Unorm,
            TextureUsage::SAMPLED,
        )
        .with_label(label)
    }
}
