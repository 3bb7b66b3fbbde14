//! Texture types and descriptors.

use super::Extent3d;
use bitflags::bitflags;

/// Texture format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum TextureFormat {
    /// 8-bit red channel, unsigned normalized.
    R8Unorm,
    /// 8-bit RG channels, unsigned normalized.
    Rg8Unorm,
    /// 32-bit red channel, float.
    R32Float,
    /// 8-bit RGBA channels, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA channels, sRGB.
    Rgba8UnormSrgb,
    /// 16-bit RGBA channels, float.
    Rgba16Float,
    /// 32-bit RGBA channels, float.
    Rgba32Float,
    /// 32-bit depth, float.
    Depth32Float,
    /// 24-bit depth with 8-bit stencil.
    Depth24PlusStencil8,
}

impl TextureFormat {
    /// Returns true if this is a depth or stencil format.
    pub fn is_depth_stencil(&self) -> bool {
        matches!(self, Self::Depth32Float | Self::Depth24PlusStencil8)
    }

    /// Returns the size in bytes per pixel.
    pub fn block_size(&self) -> u32 {
        match self {
            Self::R8Unorm => 1,
            Self::Rg8Unorm => 2,
            Self::R32Float
            | Self::Rgba8Unorm
            | Self::Rgba8UnormSrgb
            | Self::Depth32Float
            | Self::Depth24PlusStencil8 => 4,
            Self::Rgba16Float => 8,
            Self::Rgba32Float => 16,
        }
    }
}

/// Shape of a texture resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureDimension {
    /// Plain 2D texture.
    #[default]
    D2,
    /// Array of 2D layers.
    D2Array,
    /// Six-face cube map.
    Cube,
    /// Array of cube maps (six layers each).
    CubeArray,
}

bitflags! {
    /// Usage flags for textures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Texture can be sampled in a shader.
        const SAMPLED = 1 << 0;
        /// Texture can be bound as a render target view.
        const RENDER_TARGET = 1 << 1;
        /// Texture can be bound as a depth-stencil view.
        const DEPTH_STENCIL = 1 << 2;
        /// Texture can be written from compute shaders.
        const STORAGE = 1 << 3;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::SAMPLED
    }
}

/// Descriptor for creating a texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Debug label for the texture.
    pub label: Option<String>,
    /// Shape of the texture.
    pub dimension: TextureDimension,
    /// Size; `depth` is the total layer count.
    pub size: Extent3d,
    /// Mip level count.
    pub mip_level_count: u32,
    /// Texture format.
    pub format: TextureFormat,
    /// Usage flags.
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    /// Create a 2D texture descriptor.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            label: None,
            dimension: TextureDimension::D2,
            size: Extent3d::new_2d(width, height),
            mip_level_count: 1,
            format,
            usage,
        }
    }

    /// Create a 2D array texture descriptor.
    pub fn new_2d_array(
        width: u32,
        height: u32,
        layers: u32,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> Self {
        Self {
            dimension: TextureDimension::D2Array,
            size: Extent3d::new_3d(width, height, layers),
            ..Self::new_2d(width, height, format, usage)
        }
    }

    /// Create a cube texture descriptor.
    pub fn new_cube(size: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            dimension: TextureDimension::Cube,
            size: Extent3d::new_3d(size, size, 6),
            ..Self::new_2d(size, size, format, usage)
        }
    }

    /// Create a cube array texture descriptor holding `cubes` cube maps.
    pub fn new_cube_array(
        size: u32,
        cubes: u32,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> Self {
        Self {
            dimension: TextureDimension::CubeArray,
            size: Extent3d::new_3d(size, size, cubes * 6),
            ..Self::new_2d(size, size, format, usage)
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the mip level count.
    pub fn with_mip_levels(mut self, count: u32) -> Self {
        self.mip_level_count = count;
        self
    }

    /// Total array layers (6 per cube).
    pub fn layer_count(&self) -> u32 {
        self.size.depth
    }

    /// Bytes in mip 0 across all layers.
    pub fn byte_size(&self) -> usize {
        self.size.width as usize
            * self.size.height as usize
            * self.size.depth as usize
            * self.format.block_size() as usize
    }
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self::new_2d(1, 1, TextureFormat::default(), TextureUsage::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_layers() {
        let cube = TextureDescriptor::new_cube(64, TextureFormat::Rgba16Float, TextureUsage::SAMPLED);
        assert_eq!(cube.layer_count(), 6);

        let array = TextureDescriptor::new_cube_array(
            64,
            4,
            TextureFormat::Depth32Float,
            TextureUsage::DEPTH_STENCIL,
        );
        assert_eq!(array.dimension, TextureDimension::CubeArray);
        assert_eq!(array.layer_count(), 24);
    }

    #[test]
    fn test_byte_size() {
        let desc = TextureDescriptor::new_2d_array(4, 4, 3, TextureFormat::Rgba8Unorm, TextureUsage::SAMPLED);
        assert_eq!(desc.byte_size(), 4 * 4 * 3 * 4);
    }

    #[test]
    fn test_depth_formats() {
        assert!(TextureFormat::Depth32Float.is_depth_stencil());
        assert!(!TextureFormat::Rgba8UnormSrgb.is_depth_stencil());
    }
}
