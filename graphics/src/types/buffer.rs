//! Buffer types and descriptors.

use bitflags::bitflags;

bitflags! {
    /// Usage flags for structured buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be read by shaders.
        const SHADER_READ = 1 << 0;
        /// Buffer can be written by compute shaders.
        const SHADER_WRITE = 1 << 1;
        /// Buffer contents are replaced from the CPU after creation.
        const CPU_UPDATE = 1 << 2;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::SHADER_READ
    }
}

/// Descriptor for creating a structured buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct StructuredBufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Size of one element in bytes.
    pub element_size: u32,
    /// Number of elements.
    pub element_count: u32,
    /// Usage flags.
    pub usage: BufferUsage,
}

impl StructuredBufferDescriptor {
    /// Create a new structured buffer descriptor.
    pub fn new(element_size: u32, element_count: u32, usage: BufferUsage) -> Self {
        Self {
            label: None,
            element_size,
            element_count,
            usage,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Total size in bytes.
    pub fn size(&self) -> u64 {
        u64::from(self.element_size) * u64::from(self.element_count)
    }
}
