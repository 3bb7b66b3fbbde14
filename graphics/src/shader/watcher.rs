use std::path::{Path, PathBuf};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::GraphicsError;

use super::ShaderReloader;

/// Watches a shader directory and requests reloads for changed files.
///
/// Reload requests are issued from notify's own thread. Changed paths are
/// reported relative to the asset root with `/` separators, matching the
/// names shaders were loaded with.
pub struct ShaderWatcher {
    /// The underlying file watcher (kept alive).
    _watcher: RecommendedWatcher,
    watch_dir: PathBuf,
}

impl ShaderWatcher {
    /// Start watching `watch_dir` recursively.
    pub fn new(
        watch_dir: impl AsRef<Path>,
        asset_root: impl AsRef<Path>,
        reloader: ShaderReloader,
    ) -> Result<Self, GraphicsError> {
        let watch_dir = absolute(watch_dir.as_ref());
        let asset_root = absolute(asset_root.as_ref());

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    log::warn!("Shader watcher error: {e}");
                    return;
                }
            };
            if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                return;
            }
            for path in &event.paths {
                if let Some(name) = asset_name(&asset_root, path) {
                    reloader.reload_shader(&name);
                }
            }
        })
        .map_err(|e| GraphicsError::InitializationFailed(format!("shader watcher: {e}")))?;

        watcher
            .watch(&watch_dir, RecursiveMode::Recursive)
            .map_err(|e| {
                GraphicsError::InitializationFailed(format!("failed to watch {watch_dir:?}: {e}"))
            })?;
        log::info!("Watching shaders in {watch_dir:?}");

        Ok(Self {
            _watcher: watcher,
            watch_dir,
        })
    }

    /// Directory being watched.
    pub fn watch_dir(&self) -> &Path {
        &self.watch_dir
    }
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Map a changed file to the asset name it was loaded under.
fn asset_name(asset_root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(asset_root).ok()?;
    let name = relative.to_string_lossy().replace('\\', "/");
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_asset_name_is_root_relative() {
        let root = Path::new("/game/assets");
        assert_eq!(
            asset_name(root, Path::new("/game/assets/shaders/lit.ps")).as_deref(),
            Some("shaders/lit.ps")
        );
        assert_eq!(asset_name(root, Path::new("/elsewhere/lit.ps")), None);
        assert_eq!(asset_name(root, root), None);
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = ShaderWatcher::new(dir.path().join("nope"), dir.path(), ShaderReloader::default());
        assert!(matches!(result, Err(GraphicsError::InitializationFailed(_))));
    }

    #[test]
    fn test_modified_file_requests_reload() {
        let root = tempfile::tempdir().unwrap();
        let shaders = root.path().join("shaders");
        std::fs::create_dir(&shaders).unwrap();
        std::fs::write(shaders.join("lit.ps"), "v1").unwrap();

        let reloader = ShaderReloader::default();
        let _watcher = ShaderWatcher::new(&shaders, root.path(), reloader.clone()).unwrap();
        std::fs::write(shaders.join("lit.ps"), "v2").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while reloader.pending() == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(reloader.drain(), vec!["shaders/lit.ps".to_string()]);
    }
}
