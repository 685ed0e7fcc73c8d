//! Where shader text comes from

use super::AssetError;
use std::collections::HashMap;
use std::path::PathBuf;

/// Provider of shader source text by file name
pub trait ShaderSource {
    /// Read one source file, e.g. `"lighting.vs"`
    fn read(&self, file_name: &str) -> Result<String, AssetError>;
}

/// Reads shader files from a directory prefix
#[derive(Debug, Clone)]
pub struct FileShaderSource {
    base_path: PathBuf,
}

impl FileShaderSource {
    /// Read files below `base_path`
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Directory files are resolved against
    pub fn base_path(&self) -> &std::path::Path {
        &self.base_path
    }
}

impl ShaderSource for FileShaderSource {
    fn read(&self, file_name: &str) -> Result<String, AssetError> {
        let path = self.base_path.join(file_name);
        std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AssetError::NotFound(path.display().to_string()),
            _ => AssetError::LoadFailed(format!("{}: {}", path.display(), e)),
        })
    }
}

/// In-memory sources, for tests and embedded shaders
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, String>,
}

impl MemorySource {
    /// Empty source set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    pub fn with_file(mut self, file_name: impl Into<String>, contents: impl Into<String>) -> Self {
        self.files.insert(file_name.into(), contents.into());
        self
    }

    /// Add a vertex/fragment pair under one shader name
    pub fn with_shader(self, name: &str, vertex: &str, fragment: &str) -> Self {
        self.with_file(format!("{name}.vs"), vertex)
            .with_file(format!("{name}.fs"), fragment)
    }
}

impl ShaderSource for MemorySource {
    fn read(&self, file_name: &str) -> Result<String, AssetError> {
        self.files
            .get(file_name)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(file_name.to_string()))
    }
}
