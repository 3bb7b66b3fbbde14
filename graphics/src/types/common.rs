//! Common types shared across the graphics system.

// ============================================================================
// Viewport
// ============================================================================

/// Viewport configuration for a pass.
///
/// Uses the `[0, 1]` depth range convention. Projection matrices built with
/// `glam::Mat4::perspective_rh` match it.
///
/// # Example
///
/// ```
/// use relay_graphics::types::Viewport;
///
/// let shadow = Viewport::from_dimensions(2048, 2048);
/// let split = Viewport::new(0.0, 0.0, 1920.0, 1080.0).with_depth_range(0.0, 0.5);
/// assert_eq!(shadow.width, 2048.0);
/// assert_eq!(split.max_depth, 0.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// X coordinate of the viewport's top-left corner.
    pub x: f32,
    /// Y coordinate of the viewport's top-left corner.
    pub y: f32,
    /// Width of the viewport.
    pub width: f32,
    /// Height of the viewport.
    pub height: f32,
    /// Minimum depth value (default: 0.0).
    pub min_depth: f32,
    /// Maximum depth value (default: 1.0).
    pub max_depth: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

impl Viewport {
    /// Create a new viewport with standard `[0, 1]` depth range.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    /// Create a viewport from dimensions with origin at (0, 0).
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    /// Set the depth range.
    pub fn with_depth_range(mut self, min_depth: f32, max_depth: f32) -> Self {
        self.min_depth = min_depth;
        self.max_depth = max_depth;
        self
    }

    /// Width over height, or 1.0 for an empty viewport.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

// ============================================================================
// Extent3d
// ============================================================================

/// Texture extent. `depth` holds the layer count for array and cube textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent3d {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Depth or array layers (1 for plain 2D textures).
    pub depth: u32,
}

impl Extent3d {
    /// Create a new 2D extent.
    pub fn new_2d(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth: 1,
        }
    }

    /// Create a new extent with explicit depth/layers.
    pub fn new_3d(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }
}

// ============================================================================
// ArraySlice
// ============================================================================

/// Range of array layers a view covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArraySlice {
    /// First layer in the view.
    pub first_layer: u32,
    /// Number of layers in the view.
    pub layer_count: u32,
}

impl ArraySlice {
    /// A single layer.
    pub fn layer(layer: u32) -> Self {
        Self {
            first_layer: layer,
            layer_count: 1,
        }
    }

    /// A contiguous layer range.
    pub fn range(first_layer: u32, layer_count: u32) -> Self {
        Self {
            first_layer,
            layer_count,
        }
    }

    /// One past the last layer.
    pub fn end(&self) -> u32 {
        self.first_layer + self.layer_count
    }
}
