use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{MappedMutexGuard, Mutex};
use relay_core::pool::SyncHandlePool;

use crate::assets::AssetSource;
use crate::backend::{GpuBackend, NativeObject};
use crate::error::GraphicsError;
use crate::scheduler::FrameIndex;

use super::{Shader, ShaderDefine, ShaderHandle, ShaderStage, VertexShaderFlags, VertexShaderType};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ShaderKey {
    stage: ShaderStage,
    name: String,
    defines: Vec<ShaderDefine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ShaderPhase {
    Release,
    Compile,
}

#[derive(Debug)]
enum ShaderCommand {
    Release(ShaderHandle),
    Compile(ShaderHandle),
}

impl ShaderCommand {
    fn phase(&self) -> ShaderPhase {
        match self {
            Self::Release(_) => ShaderPhase::Release,
            Self::Compile(_) => ShaderPhase::Compile,
        }
    }
}

/// Requests recompilation of shaders by file name from any thread.
///
/// Cloned into file watchers and editor tools; the queue it feeds is drained
/// by the render thread under the same mutex.
#[derive(Debug, Clone, Default)]
pub struct ShaderReloader {
    queue: Arc<Mutex<Vec<String>>>,
}

impl ShaderReloader {
    /// Queue every shader compiled from `name` for recompilation.
    pub fn reload_shader(&self, name: &str) {
        let mut queue = self.queue.lock();
        if !queue.iter().any(|queued| queued == name) {
            log::debug!("Shaders: reload of '{name}' requested");
            queue.push(name.to_string());
        }
    }

    /// Reload requests not yet drained.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    pub(crate) fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.queue.lock())
    }
}

/// Owns the per-stage shader pools, the shader command queue and the reload queue.
pub struct ShaderManager {
    frame: FrameIndex,
    source: Arc<dyn AssetSource>,
    pools: [SyncHandlePool<Shader>; ShaderStage::COUNT],
    cache: Mutex<HashMap<ShaderKey, ShaderHandle>>,
    queues: [Mutex<Vec<ShaderCommand>>; 2],
    reloader: ShaderReloader,
    error_shaders: [ShaderHandle; ShaderStage::COUNT],
    default_vertex: HashMap<(VertexShaderType, VertexShaderFlags), ShaderHandle>,
}

impl ShaderManager {
    /// Create a manager holding at most `capacity` shaders per stage.
    ///
    /// The error shaders and the default vertex shader table are queued for
    /// compilation immediately, so they are ready after the first frame.
    pub fn new(frame: FrameIndex, source: Arc<dyn AssetSource>, capacity: usize) -> Self {
        let pools: [SyncHandlePool<Shader>; ShaderStage::COUNT] =
            std::array::from_fn(|i| SyncHandlePool::new(ShaderStage::ALL[i].label(), capacity));
        let queues: [Mutex<Vec<ShaderCommand>>; 2] = [Mutex::new(Vec::new()), Mutex::new(Vec::new())];

        let error_shaders = ShaderStage::ALL.map(|stage| {
            let (name, source) = stage.error_shader();
            let mut shader = Shader::new(stage, name, Vec::new());
            shader.persistent = true;
            shader.embedded = Some(source);
            let handle = ShaderHandle {
                stage,
                handle: pools[stage.index()].insert(shader),
            };
            queues[frame.write()].lock().push(ShaderCommand::Compile(handle));
            handle
        });

        let mut manager = Self {
            frame,
            source,
            pools,
            cache: Mutex::new(HashMap::new()),
            queues,
            reloader: ShaderReloader::default(),
            error_shaders,
            default_vertex: HashMap::new(),
        };

        for ty in VertexShaderType::ALL {
            for flags in VertexShaderFlags::VARIANTS {
                let handle =
                    manager.create_shader_from_file(ShaderStage::Vertex, ty.file_name(), &flags.defines());
                manager.pools[ShaderStage::Vertex.index()].with_mut(handle.handle, |shader| {
                    shader.persistent = true;
                });
                manager.default_vertex.insert((ty, flags), handle);
            }
        }
        log::debug!(
            "Shaders: {} default vertex shader variants queued",
            manager.default_vertex.len()
        );
        manager
    }

    fn pool(&self, stage: ShaderStage) -> &SyncHandlePool<Shader> {
        &self.pools[stage.index()]
    }

    fn enqueue(&self, command: ShaderCommand) {
        self.queues[self.frame.write()].lock().push(command);
    }

    /// Get the shader compiled from `name` with `defines`, queuing a compile
    /// on a cache miss. Define order does not matter.
    pub fn create_shader_from_file(
        &self,
        stage: ShaderStage,
        name: &str,
        defines: &[ShaderDefine],
    ) -> ShaderHandle {
        let mut defines = defines.to_vec();
        defines.sort();
        defines.dedup();
        let key = ShaderKey {
            stage,
            name: name.to_string(),
            defines,
        };

        let mut cache = self.cache.lock();
        if let Some(handle) = cache.get(&key) {
            return *handle;
        }
        let handle = ShaderHandle {
            stage,
            handle: self.pool(stage).insert(Shader::new(stage, name, key.defines.clone())),
        };
        log::trace!("Shaders: queued compile of {} '{name}'", stage.label());
        self.enqueue(ShaderCommand::Compile(handle));
        cache.insert(key, handle);
        handle
    }

    /// Queue a shader for release. Error shaders and the default vertex
    /// table are persistent and ignore this.
    pub fn release_shader(&self, handle: ShaderHandle) {
        let Some(shader) = self.pool(handle.stage).with(handle.handle, |s| {
            (s.persistent, s.name.clone(), s.defines.clone())
        }) else {
            log::warn!("Shaders: release of unknown {handle:?} ignored");
            return;
        };
        let (persistent, name, defines) = shader;
        if persistent {
            log::warn!("Shaders: '{name}' is persistent; release ignored");
            return;
        }
        let key = ShaderKey {
            stage: handle.stage,
            name,
            defines,
        };
        let mut cache = self.cache.lock();
        if cache.get(&key) == Some(&handle) {
            cache.remove(&key);
        }
        self.enqueue(ShaderCommand::Release(handle));
    }

    /// Queue every shader compiled from `name` for recompilation. Callable
    /// from any thread.
    pub fn reload_shader(&self, name: &str) {
        self.reloader.reload_shader(name);
    }

    /// A cloneable handle for requesting reloads from other threads.
    pub fn reloader(&self) -> ShaderReloader {
        self.reloader.clone()
    }

    /// Read access to a shader record.
    ///
    /// The guard locks the stage's pool: drop it before creating or
    /// releasing shaders of that stage, or syncing the frame, on this thread.
    pub fn shader(&self, handle: ShaderHandle) -> Option<MappedMutexGuard<'_, Shader>> {
        self.pool(handle.stage).get(handle.handle)
    }

    /// The built-in shader a failed `stage` shader is redirected to.
    pub fn error_shader(&self, stage: ShaderStage) -> ShaderHandle {
        self.error_shaders[stage.index()]
    }

    /// Vertex shader from the default table. Flag bits outside
    /// [`VertexShaderFlags::all`] are ignored.
    pub fn default_vertex_shader(
        &self,
        ty: VertexShaderType,
        flags: VertexShaderFlags,
    ) -> ShaderHandle {
        // Unknown bits are dropped; the table holds every known combination.
        let flags = flags & VertexShaderFlags::all();
        self.default_vertex
            .get(&(ty, flags))
            .copied()
            .unwrap_or(self.error_shaders[ShaderStage::Vertex.index()])
    }

    /// Number of live shaders in `stage`.
    pub fn len(&self, stage: ShaderStage) -> usize {
        self.pool(stage).len()
    }

    /// Device object to bind for `handle`: its own when compiled, otherwise
    /// the stage's error shader.
    pub(crate) fn resolve_native(&self, handle: ShaderHandle) -> Option<NativeObject> {
        let own = self
            .pool(handle.stage)
            .with(handle.handle, |s| if s.redirected { None } else { s.native })
            .flatten();
        own.or_else(|| {
            let error = self.error_shader(handle.stage);
            self.pool(error.stage).with(error.handle, |s| s.native).flatten()
        })
    }

    /// Called by the producer before the frame index flips.
    pub fn flip_state(&self) {
        debug_assert!(
            self.queues[self.frame.read()].lock().is_empty(),
            "shader commands left unprocessed on the read side"
        );
    }

    /// Render thread: execute the read side's commands, then drain reloads.
    ///
    /// Only a failing error shader is fatal; any other compile failure
    /// redirects the shader and the frame goes on.
    pub fn process_commands(&self, backend: &dyn GpuBackend) -> Result<(), GraphicsError> {
        let mut commands = std::mem::take(&mut *self.queues[self.frame.read()].lock());
        commands.sort_by_key(ShaderCommand::phase);

        for command in commands {
            match command {
                ShaderCommand::Release(handle) => self.release_now(backend, handle),
                ShaderCommand::Compile(handle) => self.compile_now(backend, handle)?,
            }
        }

        for name in self.reloader.drain() {
            let targets: Vec<ShaderHandle> = ShaderStage::ALL
                .iter()
                .flat_map(|&stage| {
                    self.pool(stage)
                        .lock()
                        .iter()
                        .filter(|(_, s)| s.name == name && s.embedded.is_none())
                        .map(|(handle, _)| ShaderHandle { stage, handle })
                        .collect::<Vec<_>>()
                })
                .collect();
            if targets.is_empty() {
                log::debug!("Shaders: reload of '{name}' matches no loaded shader");
                continue;
            }
            log::info!("Shaders: reloading '{name}' ({} variants)", targets.len());
            for handle in targets {
                self.compile_now(backend, handle)?;
            }
        }
        Ok(())
    }

    fn release_now(&self, backend: &dyn GpuBackend, handle: ShaderHandle) {
        let pool = self.pool(handle.stage);
        let Some(native) = pool.with_mut(handle.handle, |s| s.native.take()) else {
            log::warn!("Shaders: {handle:?} released twice");
            return;
        };
        if let Some(native) = native {
            backend.release(native);
        }
        pool.release(handle.handle);
    }

    /// Compile (or recompile) `handle` from its current source.
    fn compile_now(&self, backend: &dyn GpuBackend, handle: ShaderHandle) -> Result<(), GraphicsError> {
        let pool = self.pool(handle.stage);
        let Some((name, defines, embedded)) = pool.with(handle.handle, |s| {
            (s.name.clone(), s.defines.clone(), s.embedded)
        }) else {
            log::trace!("Shaders: skipping compile of released {handle:?}");
            return Ok(());
        };

        let source = match embedded {
            Some(source) => Ok(source.to_string()),
            None => self.source.load_text(&name),
        };
        let compiled = source.and_then(|source| backend.compile_shader(handle.stage, &name, &source, &defines));

        match compiled {
            Ok(native) => {
                let previous = pool.with_mut(handle.handle, |s| {
                    s.redirected = false;
                    s.native.replace(native)
                });
                if let Some(Some(old)) = previous {
                    backend.release(old);
                }
                log::trace!("Shaders: compiled {} '{name}'", handle.stage.label());
                Ok(())
            }
            Err(e) if embedded.is_some() => Err(GraphicsError::Internal(format!(
                "built-in {} failed: {e}",
                handle.stage.label()
            ))),
            Err(
                e @ (GraphicsError::ShaderCompilationFailed { .. }
                | GraphicsError::AssetNotFound(_)
                | GraphicsError::AssetDecodeFailed { .. }),
            ) => {
                log::warn!("Shaders: {e}; redirecting to the error shader");
                let previous = pool.with_mut(handle.handle, |s| {
                    s.redirected = true;
                    s.native.take()
                });
                if let Some(Some(old)) = previous {
                    backend.release(old);
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

static_assertions::assert_impl_all!(ShaderManager: Send, Sync);
static_assertions::assert_impl_all!(ShaderReloader: Send, Sync);
