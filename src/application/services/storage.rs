//! Map storage service
//!
//! Reads and writes map documents as pretty-printed JSON through the
//! [`FileSystem`] boundary. Saves replace the whole file atomically.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{MapDocument, MindMap};
use crate::infrastructure::traits::FileSystem;

/// Extension used for map files.
pub const MAP_EXTENSION: &str = "json";

/// Longest file stem derived from a map title.
const MAX_STEM_LEN: usize = 50;

/// Service for persisting mind maps.
pub struct MapStorage {
    fs: Arc<dyn FileSystem>,
}

impl MapStorage {
    /// Create a new storage service.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Load and validate the map at `path`.
    ///
    /// A zero-length (or whitespace-only) file is an empty map named after the file.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> ApplicationResult<MindMap> {
        if !self.fs.exists(path) {
            return Err(ApplicationError::MapFileNotFound(path.to_path_buf()));
        }
        if !self.fs.is_file(path) {
            return Err(ApplicationError::InvalidFormat {
                path: path.to_path_buf(),
                message: "not a file".into(),
            });
        }

        let content = self.fs.read_to_string(path).with_path_context("read map", path)?;
        if content.trim().is_empty() {
            debug!("load: {} is empty", path.display());
            return Ok(MindMap::new(title_from_path(path)));
        }

        let document: MapDocument =
            serde_json::from_str(&content).map_err(|e| ApplicationError::InvalidFormat {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        let map = MindMap::from_document(document)?;
        debug!("load: {} node(s) from {}", map.len(), path.display());
        Ok(map)
    }

    /// Write `map` to `path`, creating parent directories as needed.
    #[instrument(level = "debug", skip(self, map))]
    pub fn save(&self, map: &MindMap, path: &Path) -> ApplicationResult<()> {
        let json = serde_json::to_string_pretty(&map.to_document()).map_err(|e| {
            ApplicationError::OperationFailed {
                context: format!("serialize map for {}", path.display()),
                source: Box::new(e),
            }
        })?;
        self.fs
            .ensure_parent(path)
            .with_path_context("create directory for", path)?;
        self.fs
            .write_atomic(path, &format!("{json}\n"))
            .with_path_context("write map", path)?;
        debug!("save: {} node(s) to {}", map.len(), path.display());
        Ok(())
    }

    /// Create and save an empty map; refuses to clobber an existing file unless `force`.
    #[instrument(level = "debug", skip(self))]
    pub fn create(&self, path: &Path, title: &str, force: bool) -> ApplicationResult<MindMap> {
        if self.fs.exists(path) && !force {
            return Err(ApplicationError::AlreadyExists(path.to_path_buf()));
        }
        let map = MindMap::new(title.trim());
        self.save(&map, path)?;
        Ok(map)
    }

    /// Write the plain-text export of `map` to `path`.
    #[instrument(level = "debug", skip(self, map))]
    pub fn export(&self, map: &MindMap, path: &Path) -> ApplicationResult<()> {
        let text = map.export_text()?;
        self.fs
            .ensure_parent(path)
            .with_path_context("create directory for", path)?;
        self.fs.write(path, &text).with_path_context("write export", path)
    }

    /// Map files (`*.json`) directly inside `dir`; empty when `dir` does not exist.
    #[instrument(level = "debug", skip(self))]
    pub fn list_maps(&self, dir: &Path) -> ApplicationResult<Vec<PathBuf>> {
        if !self.fs.is_dir(dir) {
            return Ok(Vec::new());
        }
        let files = self.fs.list_files(dir).with_path_context("list maps in", dir)?;
        Ok(files
            .into_iter()
            .filter(|p| p.extension().is_some_and(|ext| ext == MAP_EXTENSION))
            .collect())
    }
}

/// File name for a new map titled `title`: unsafe characters become `_`.
///
/// `"Trip to Rome!"` → `Trip_to_Rome_.json`
pub fn file_name_for_title(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_STEM_LEN)
        .collect();
    let stem = if stem.is_empty() { "untitled".to_string() } else { stem };
    format!("{stem}.{MAP_EXTENSION}")
}

/// Map title implied by a file name: `my_map.json` → `my_map`.
pub fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
