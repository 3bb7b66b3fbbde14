use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::GraphicsError;

/// Synchronous byte source for textures, geometry and shader text.
///
/// Names use forward slashes and no leading slash, e.g. `"textures/brick.png"`.
pub trait AssetSource: Send + Sync + 'static {
    /// Read the whole asset.
    fn load(&self, name: &str) -> Result<Vec<u8>, GraphicsError>;

    /// Whether the asset exists.
    fn exists(&self, name: &str) -> bool;

    /// Read an asset as UTF-8 text.
    fn load_text(&self, name: &str) -> Result<String, GraphicsError> {
        let bytes = self.load(name)?;
        String::from_utf8(bytes).map_err(|e| GraphicsError::AssetDecodeFailed {
            name: name.to_string(),
            message: e.to_string(),
        })
    }
}

/// Asset source reading files below a root directory.
///
/// # Example
///
/// ```ignore
/// let source = FileSystemSource::new("./assets");
///
/// // Reads ./assets/textures/brick.png
/// let bytes = source.load("textures/brick.png")?;
/// ```
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    root: PathBuf,
}

impl FileSystemSource {
    /// Create a source rooted at the given directory.
    ///
    /// The directory does not need to exist yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, GraphicsError> {
        if name.split('/').any(|segment| segment == "..") {
            return Err(GraphicsError::InvalidParameter(format!(
                "asset name escapes the asset root: {name}"
            )));
        }
        Ok(self.root.join(name))
    }
}

impl AssetSource for FileSystemSource {
    fn load(&self, name: &str) -> Result<Vec<u8>, GraphicsError> {
        let path = self.resolve(name)?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => GraphicsError::AssetNotFound(name.to_string()),
            _ => GraphicsError::Internal(format!("failed to read {}: {e}", path.display())),
        })
    }

    fn exists(&self, name: &str) -> bool {
        self.resolve(name).is_ok_and(|path| path.is_file())
    }
}

/// In-memory asset source for tests and embedded assets.
///
/// Cloning shares the underlying files, so a test can keep a clone and edit
/// assets after handing the source to a renderer.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a file.
    pub fn insert(&self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.files.write().insert(name.into(), data.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_file(self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(name, data);
        self
    }

    /// Remove a file, returning its data if it existed.
    pub fn remove(&self, name: &str) -> Option<Vec<u8>> {
        self.files.write().remove(name)
    }
}

impl AssetSource for MemorySource {
    fn load(&self, name: &str) -> Result<Vec<u8>, GraphicsError> {
        self.files
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| GraphicsError::AssetNotFound(name.to_string()))
    }

    fn exists(&self, name: &str) -> bool {
        self.files.read().contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source() {
        let source = MemorySource::new().with_file("shaders/sky.ps", "float4 main();");
        assert!(source.exists("shaders/sky.ps"));
        assert_eq!(source.load_text("shaders/sky.ps").unwrap(), "float4 main();");

        let shared = source.clone();
        shared.remove("shaders/sky.ps");
        assert_eq!(
            source.load("shaders/sky.ps"),
            Err(GraphicsError::AssetNotFound("shaders/sky.ps".to_string()))
        );
    }

    #[test]
    fn test_invalid_utf8_text() {
        let source = MemorySource::new().with_file("bad.vs", vec![0xff, 0xfe]);
        assert!(matches!(
            source.load_text("bad.vs"),
            Err(GraphicsError::AssetDecodeFailed { .. })
        ));
    }

    #[test]
    fn test_file_system_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("meshes")).unwrap();
        std::fs::write(dir.path().join("meshes/cube.obj"), b"v 0 0 0\n").unwrap();

        let source = FileSystemSource::new(dir.path());
        assert!(source.exists("meshes/cube.obj"));
        assert_eq!(source.load("meshes/cube.obj").unwrap(), b"v 0 0 0\n");
        assert_eq!(
            source.load("meshes/missing.obj"),
            Err(GraphicsError::AssetNotFound("meshes/missing.obj".to_string()))
        );
        assert!(matches!(
            source.load("../secret"),
            Err(GraphicsError::InvalidParameter(_))
        ));
    }
}
