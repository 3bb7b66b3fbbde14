use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{MappedMutexGuard, Mutex};
use relay_core::pool::SyncHandlePool;

use crate::assets::{AssetSource, decode_obj};
use crate::backend::GpuBackend;
use crate::error::GraphicsError;
use crate::scheduler::FrameIndex;

use super::{GeoHandle, Geometry, GeometryData, Vertex, compute_bounds};

/// Processing order within one batch; releases always run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum GeometryPhase {
    Release,
    Create,
    UpdateVertices,
}

#[derive(Debug)]
enum GeometryCommand {
    Release(GeoHandle),
    Create {
        handle: GeoHandle,
        data: GeometryData,
    },
    UpdateVertices {
        handle: GeoHandle,
        vertices: Vec<Vertex>,
    },
}

impl GeometryCommand {
    fn phase(&self) -> GeometryPhase {
        match self {
            Self::Release(_) => GeometryPhase::Release,
            Self::Create { .. } => GeometryPhase::Create,
            Self::UpdateVertices { .. } => GeometryPhase::UpdateVertices,
        }
    }
}

/// Owns every [`Geometry`] record and the double-buffered geometry command queue.
pub struct GeometryManager {
    frame: FrameIndex,
    source: Arc<dyn AssetSource>,
    pool: SyncHandlePool<Geometry>,
    cache: Mutex<HashMap<String, GeoHandle>>,
    queues: [Mutex<Vec<GeometryCommand>>; 2],
}

impl GeometryManager {
    /// Create a manager holding at most `capacity` geometry records.
    pub fn new(frame: FrameIndex, source: Arc<dyn AssetSource>, capacity: usize) -> Self {
        Self {
            frame,
            source,
            pool: SyncHandlePool::new("geometry", capacity),
            cache: Mutex::new(HashMap::new()),
            queues: [Mutex::new(Vec::new()), Mutex::new(Vec::new())],
        }
    }

    fn enqueue(&self, command: GeometryCommand) {
        self.queues[self.frame.write()].lock().push(command);
    }

    /// Create geometry from CPU data. Buffers appear at the next frame's processing.
    pub fn create_geo(&self, data: GeometryData) -> GeoHandle {
        self.create_named(None, data)
    }

    fn create_named(&self, name: Option<String>, data: GeometryData) -> GeoHandle {
        let (bounds, radius) = compute_bounds(&data.vertices);
        let handle = self.pool.insert(Geometry {
            name,
            vertex_count: data.vertices.len() as u32,
            index_count: data.indices.len() as u32,
            vertex_stride: Vertex::STRIDE,
            bounds,
            radius,
            ..Geometry::default()
        });
        log::trace!(
            "Geometry: queued create {:?} ({} vertices, {} indices)",
            handle,
            data.vertices.len(),
            data.indices.len()
        );
        self.enqueue(GeometryCommand::Create { handle, data });
        handle
    }

    /// Load an OBJ file, or return the cached handle for `name`.
    ///
    /// Missing or broken files log a warning and yield an empty placeholder
    /// record (flagged `is_placeholder`), which is cached like a real load.
    pub fn create_geo_from_file(&self, name: &str) -> GeoHandle {
        let mut cache = self.cache.lock();
        if let Some(handle) = cache.get(name) {
            return *handle;
        }
        let handle = match self.load(name) {
            Ok(data) => self.create_named(Some(name.to_string()), data),
            Err(e) => {
                log::warn!("Geometry: {e}; using placeholder for '{name}'");
                self.pool.insert(Geometry {
                    name: Some(name.to_string()),
                    vertex_stride: Vertex::STRIDE,
                    is_placeholder: true,
                    ..Geometry::default()
                })
            }
        };
        cache.insert(name.to_string(), handle);
        handle
    }

    /// Like [`create_geo_from_file`](Self::create_geo_from_file), but load
    /// failures are returned instead of replaced by a placeholder.
    pub fn try_create_geo_from_file(&self, name: &str) -> Result<GeoHandle, GraphicsError> {
        let mut cache = self.cache.lock();
        if let Some(handle) = cache.get(name) {
            return Ok(*handle);
        }
        let data = self.load(name)?;
        let handle = self.create_named(Some(name.to_string()), data);
        cache.insert(name.to_string(), handle);
        Ok(handle)
    }

    fn load(&self, name: &str) -> Result<GeometryData, GraphicsError> {
        let bytes = self.source.load(name)?;
        decode_obj(name, &bytes)
    }

    /// Replace the vertices of `handle`. Bounds are recomputed immediately.
    pub fn update_geo_verts(&self, handle: GeoHandle, vertices: Vec<Vertex>) {
        let updated = self.pool.with_mut(handle, |geo| {
            let (bounds, radius) = compute_bounds(&vertices);
            geo.bounds = bounds;
            geo.radius = radius;
        });
        if updated.is_none() {
            log::warn!("Geometry: update of unknown {handle:?} ignored");
            return;
        }
        self.enqueue(GeometryCommand::UpdateVertices { handle, vertices });
    }

    /// Queue `handle` for release. The handle stays valid until the release
    /// is processed, so its id cannot be handed out again before then.
    pub fn release_geo(&self, handle: GeoHandle) {
        let Some(name) = self.pool.with(handle, |geo| geo.name.clone()) else {
            log::warn!("Geometry: release of unknown {handle:?} ignored");
            return;
        };
        if let Some(name) = name {
            let mut cache = self.cache.lock();
            if cache.get(&name) == Some(&handle) {
                cache.remove(&name);
            }
        }
        log::trace!("Geometry: queued release {handle:?}");
        self.enqueue(GeometryCommand::Release(handle));
    }

    /// Read access to a geometry record.
    ///
    /// The guard locks the geometry pool: drop it before creating or
    /// releasing geometry, or syncing the frame, on this thread.
    pub fn geo(&self, handle: GeoHandle) -> Option<MappedMutexGuard<'_, Geometry>> {
        self.pool.get(handle)
    }

    /// Number of live geometry records.
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Whether no geometry is live.
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Called by the producer before the frame index flips.
    pub fn flip_state(&self) {
        debug_assert!(
            self.queues[self.frame.read()].lock().is_empty(),
            "geometry commands left unprocessed on the read side"
        );
    }

    /// Render thread: execute the read side's commands.
    pub fn process_commands(&self, backend: &dyn GpuBackend) -> Result<(), GraphicsError> {
        let mut commands = std::mem::take(&mut *self.queues[self.frame.read()].lock());
        commands.sort_by_key(GeometryCommand::phase);

        for command in commands {
            match command {
                GeometryCommand::Release(handle) => self.release_now(backend, handle),
                GeometryCommand::Create { handle, data } => {
                    self.create_now(backend, handle, &data)?;
                }
                GeometryCommand::UpdateVertices { handle, vertices } => {
                    self.update_now(backend, handle, &vertices)?;
                }
            }
        }
        Ok(())
    }

    fn release_now(&self, backend: &dyn GpuBackend, handle: GeoHandle) {
        let buffers = self
            .pool
            .with_mut(handle, |geo| (geo.vertex_buffer.take(), geo.index_buffer.take()));
        let Some((vertex_buffer, index_buffer)) = buffers else {
            log::warn!("Geometry: {handle:?} released twice");
            return;
        };
        for object in vertex_buffer.into_iter().chain(index_buffer) {
            backend.release(object);
        }
        self.pool.release(handle);
        log::trace!("Geometry: released {handle:?}");
    }

    fn create_now(
        &self,
        backend: &dyn GpuBackend,
        handle: GeoHandle,
        data: &GeometryData,
    ) -> Result<(), GraphicsError> {
        if !self.pool.contains(handle) {
            log::trace!("Geometry: skipping create of released {handle:?}");
            return Ok(());
        }
        let vertex_buffer =
            backend.create_vertex_buffer(bytemuck::cast_slice(&data.vertices), Vertex::STRIDE)?;
        let index_buffer = backend.create_index_buffer(&data.indices)?;
        self.pool.with_mut(handle, |geo| {
            geo.vertex_buffer = Some(vertex_buffer);
            geo.index_buffer = Some(index_buffer);
        });
        log::trace!("Geometry: created {handle:?}");
        Ok(())
    }

    fn update_now(
        &self,
        backend: &dyn GpuBackend,
        handle: GeoHandle,
        vertices: &[Vertex],
    ) -> Result<(), GraphicsError> {
        let Some((current, count)) = self
            .pool
            .with(handle, |geo| (geo.vertex_buffer, geo.vertex_count))
        else {
            log::trace!("Geometry: skipping update of released {handle:?}");
            return Ok(());
        };
        let Some(current) = current else {
            log::warn!("Geometry: update of {handle:?} before its buffers exist ignored");
            return Ok(());
        };

        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        if count as usize == vertices.len() {
            return backend.update_buffer(current, bytes);
        }

        // Size changed: the buffer is recreated.
        let replacement = backend.create_vertex_buffer(bytes, Vertex::STRIDE)?;
        backend.release(current);
        self.pool.with_mut(handle, |geo| {
            geo.vertex_buffer = Some(replacement);
            geo.vertex_count = vertices.len() as u32;
        });
        Ok(())
    }
}

static_assertions::assert_impl_all!(GeometryManager: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemorySource;
    use crate::backend::{DeviceCall, DummyBackend};

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    fn setup(source: MemorySource) -> (FrameIndex, GeometryManager, DummyBackend) {
        let frame = FrameIndex::new();
        let manager = GeometryManager::new(frame.clone(), Arc::new(source), 64);
        (frame, manager, DummyBackend::new())
    }

    fn quad_data(vertex_count: usize, index_count: usize) -> GeometryData {
        GeometryData::new(
            (0..vertex_count).map(|i| Vertex::at([i as f32, 0.0, 0.0])).collect(),
            (0..index_count as u32).map(|i| i % vertex_count as u32).collect(),
        )
    }

    #[test]
    fn test_create_is_deferred_until_processing() {
        let (frame, manager, backend) = setup(MemorySource::new());
        let handle = manager.create_geo(quad_data(4, 6));
        assert!(!manager.geo(handle).unwrap().is_resident());

        // Processing before the flip sees an empty read side.
        manager.process_commands(&backend).unwrap();
        assert!(backend.calls().is_empty());

        frame.flip();
        manager.process_commands(&backend).unwrap();
        let geo = manager.geo(handle).unwrap();
        assert!(geo.is_resident());
        assert_eq!((geo.vertex_count, geo.index_count), (4, 6));
    }

    #[test]
    fn test_released_id_not_reused_before_processing() {
        let (frame, manager, backend) = setup(MemorySource::new());
        let first = manager.create_geo(quad_data(10, 15));
        frame.flip();
        manager.process_commands(&backend).unwrap();

        manager.release_geo(first);
        let second = manager.create_geo(quad_data(10, 15));
        assert_ne!(first.index(), second.index());
        assert!(manager.geo(first).is_some());

        frame.flip();
        manager.process_commands(&backend).unwrap();
        assert!(manager.geo(first).is_none());
        assert!(manager.geo(second).unwrap().is_resident());
    }

    #[test]
    fn test_release_before_create_in_same_batch() {
        let (frame, manager, backend) = setup(MemorySource::new());
        let handle = manager.create_geo(quad_data(3, 3));
        manager.release_geo(handle);
        frame.flip();
        manager.process_commands(&backend).unwrap();

        assert!(manager.geo(handle).is_none());
        assert!(backend.calls().is_empty());
        assert!(manager.is_empty());
    }

    #[test]
    fn test_file_cache_and_bounds() {
        let (_frame, manager, _backend) = setup(MemorySource::new().with_file("tri.obj", TRIANGLE));
        let a = manager.create_geo_from_file("tri.obj");
        let b = manager.create_geo_from_file("tri.obj");
        assert_eq!(a, b);
        assert_eq!(manager.len(), 1);

        let geo = manager.geo(a).unwrap();
        assert_eq!(geo.bounds.max, glam::Vec3::new(1.0, 1.0, 0.0));
        assert!(geo.radius > 0.0);
        assert_eq!(geo.name.as_deref(), Some("tri.obj"));
    }

    #[test]
    fn test_missing_file_gives_placeholder() {
        let (frame, manager, backend) = setup(MemorySource::new());
        let handle = manager.create_geo_from_file("missing.obj");
        assert!(manager.geo(handle).unwrap().is_placeholder);
        assert!(manager.try_create_geo_from_file("also_missing.obj").is_err());

        frame.flip();
        manager.process_commands(&backend).unwrap();
        assert!(!manager.geo(handle).unwrap().is_resident());
    }

    #[test]
    fn test_release_clears_cache_entry() {
        let (frame, manager, backend) = setup(MemorySource::new().with_file("tri.obj", TRIANGLE));
        let first = manager.create_geo_from_file("tri.obj");
        manager.release_geo(first);
        frame.flip();
        manager.process_commands(&backend).unwrap();

        let second = manager.create_geo_from_file("tri.obj");
        assert_ne!(first, second);
    }

    #[test]
    fn test_vertex_update_in_place_and_resize() {
        let (frame, manager, backend) = setup(MemorySource::new());
        let handle = manager.create_geo(quad_data(4, 6));
        frame.flip();
        manager.process_commands(&backend).unwrap();
        let original = manager.geo(handle).unwrap().vertex_buffer.unwrap();
        backend.clear_calls();

        manager.update_geo_verts(handle, quad_data(4, 0).vertices);
        frame.flip();
        manager.process_commands(&backend).unwrap();
        assert_eq!(
            backend.take_calls(),
            vec![DeviceCall::UpdateBuffer {
                object: original,
                len: 4 * Vertex::STRIDE as usize,
            }]
        );

        manager.update_geo_verts(handle, quad_data(8, 0).vertices);
        assert_eq!(manager.geo(handle).unwrap().bounds.max.x, 7.0);
        frame.flip();
        manager.process_commands(&backend).unwrap();
        let geo = manager.geo(handle).unwrap();
        assert_eq!(geo.vertex_count, 8);
        assert_ne!(geo.vertex_buffer, Some(original));
        assert!(!backend.is_live(original));
    }
}
