//! Geometry command queue.
//!
//! Vertex/index buffer pairs follow the same create/update/release shape as
//! [`resources`](crate::resources): the producer gets a [`GeoHandle`] back
//! immediately, the buffers appear when the render thread processes the
//! frame's commands (releases, then creates, then vertex updates).

mod manager;

pub use manager::GeometryManager;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use relay_core::pool::Handle;

use crate::backend::NativeObject;

/// Handle to a [`Geometry`] record.
pub type GeoHandle = Handle<Geometry>;

/// Interleaved vertex layout shared by all geometry.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    /// Size of one vertex in bytes.
    pub const STRIDE: u32 = std::mem::size_of::<Self>() as u32;

    /// Vertex at `position` with zero normal and uv.
    pub fn at(position: [f32; 3]) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}

/// CPU-side mesh handed to [`GeometryManager::create_geo`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeometryData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl GeometryData {
    /// Create geometry data from vertices and triangle-list indices.
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Smallest box containing every vertex position, or `None` for no vertices.
    pub fn from_vertices(vertices: &[Vertex]) -> Option<Self> {
        let mut points = vertices.iter().map(|v| Vec3::from_array(v.position));
        let first = points.next()?;
        Some(points.fold(Self { min: first, max: first }, |aabb, p| Self {
            min: aabb.min.min(p),
            max: aabb.max.max(p),
        }))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
}

/// Bounding box and bounding-sphere radius (around the box center) of a vertex set.
pub(crate) fn compute_bounds(vertices: &[Vertex]) -> (Aabb, f32) {
    let Some(bounds) = Aabb::from_vertices(vertices) else {
        return (Aabb::default(), 0.0);
    };
    let center = bounds.center();
    let radius = vertices
        .iter()
        .map(|v| Vec3::from_array(v.position).distance(center))
        .fold(0.0, f32::max);
    (bounds, radius)
}

/// One vertex/index buffer pair.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Geometry {
    /// File name for geometry loaded through the name cache.
    pub name: Option<String>,
    pub vertex_count: u32,
    pub index_count: u32,
    pub vertex_stride: u32,
    /// Computed once when the data is handed over.
    pub bounds: Aabb,
    pub radius: f32,
    /// Stands in for a file that could not be loaded; never drawn.
    pub is_placeholder: bool,
    /// Set by the render thread once the buffers exist.
    pub vertex_buffer: Option<NativeObject>,
    pub index_buffer: Option<NativeObject>,
}

impl Geometry {
    /// Whether the device buffers exist and the geometry can be drawn.
    pub fn is_resident(&self) -> bool {
        self.vertex_buffer.is_some() && self.index_buffer.is_some() && self.index_count > 0
    }
}
