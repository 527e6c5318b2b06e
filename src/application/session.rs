//! Editing session: the loaded map, where it lives, and when it gets saved.
//!
//! Front-ends hold one `Session` instead of process-wide globals. Every
//! operation that needs a map fails with [`ApplicationError::NoMapLoaded`]
//! until `new_map`, `load` or `open_or_create` succeeds.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::application::services::{title_from_path, MapStorage};
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{DeletePreview, DomainResult, MindMap, NodeId};

/// What a mutation did about persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(PathBuf),
    /// Autosave is off; the change lives in memory until `save`
    Pending,
}

pub struct Session {
    storage: MapStorage,
    autosave: bool,
    map: Option<MindMap>,
    path: Option<PathBuf>,
    dirty: bool,
}

impl Session {
    pub fn new(storage: MapStorage, autosave: bool) -> Self {
        Self {
            storage,
            autosave,
            map: None,
            path: None,
            dirty: false,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.map.is_some()
    }

    /// Unsaved changes exist.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn storage(&self) -> &MapStorage {
        &self.storage
    }

    pub fn map(&self) -> ApplicationResult<&MindMap> {
        self.map.as_ref().ok_or(ApplicationError::NoMapLoaded)
    }

    /// Create an empty map file at `path` and make it current.
    #[instrument(level = "debug", skip(self))]
    pub fn new_map(&mut self, path: &Path, title: &str, force: bool) -> ApplicationResult<()> {
        let map = self.storage.create(path, title, force)?;
        info!("created map '{}' at {}", map.title(), path.display());
        self.replace(map, path);
        Ok(())
    }

    /// Load `path`, replacing whatever was loaded before.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&mut self, path: &Path) -> ApplicationResult<()> {
        let map = self.storage.load(path)?;
        self.replace(map, path);
        Ok(())
    }

    /// Load `path`, or start an unsaved empty map there when the file is missing.
    ///
    /// Returns true when a fresh map was started.
    #[instrument(level = "debug", skip(self))]
    pub fn open_or_create(&mut self, path: &Path) -> ApplicationResult<bool> {
        match self.storage.load(path) {
            Ok(map) => {
                self.replace(map, path);
                Ok(false)
            }
            Err(ApplicationError::MapFileNotFound(_)) => {
                debug!("open_or_create: starting new map at {}", path.display());
                self.replace(MindMap::new(title_from_path(path)), path);
                self.dirty = true;
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    /// Save to `target`, or to the current path when None; the target becomes current.
    #[instrument(level = "debug", skip(self))]
    pub fn save(&mut self, target: Option<&Path>) -> ApplicationResult<PathBuf> {
        let map = self.map.as_ref().ok_or(ApplicationError::NoMapLoaded)?;
        let path = match target.or(self.path.as_deref()) {
            Some(path) => path.to_path_buf(),
            None => return Err(ApplicationError::NoMapLoaded),
        };
        self.storage.save(map, &path)?;
        self.path = Some(path.clone());
        self.dirty = false;
        Ok(path)
    }

    /// Drop the current map without saving.
    pub fn close(&mut self) {
        self.map = None;
        self.path = None;
        self.dirty = false;
    }

    fn replace(&mut self, map: MindMap, path: &Path) {
        self.map = Some(map);
        self.path = Some(path.to_path_buf());
        self.dirty = false;
    }

    /// Apply `change` to the loaded map, then autosave when enabled.
    ///
    /// A failed change or a failed autosave leaves both the map and the file untouched.
    fn mutate<T, F>(&mut self, change: F) -> ApplicationResult<(T, SaveOutcome)>
    where
        F: FnOnce(&mut MindMap) -> DomainResult<T>,
    {
        let map = self.map.as_mut().ok_or(ApplicationError::NoMapLoaded)?;
        if !self.autosave {
            let value = change(map)?;
            self.dirty = true;
            return Ok((value, SaveOutcome::Pending));
        }

        let snapshot = map.clone();
        let value = change(map)?;
        let was_dirty = std::mem::replace(&mut self.dirty, true);
        match self.save(None) {
            Ok(path) => Ok((value, SaveOutcome::Saved(path))),
            Err(e) => {
                warn!("autosave failed, change rolled back: {}", e);
                self.map = Some(snapshot);
                self.dirty = was_dirty;
                Err(e)
            }
        }
    }

    pub fn add_node(
        &mut self,
        text: &str,
        parent_id: Option<&NodeId>,
    ) -> ApplicationResult<(NodeId, SaveOutcome)> {
        self.mutate(|map| map.add_node(text, parent_id))
    }

    /// Returns the previous text.
    pub fn edit_node(
        &mut self,
        id: &NodeId,
        new_text: &str,
    ) -> ApplicationResult<(String, SaveOutcome)> {
        self.mutate(|map| map.edit_node(id, new_text))
    }

    pub fn move_node(
        &mut self,
        id: &NodeId,
        new_parent_id: &NodeId,
    ) -> ApplicationResult<((), SaveOutcome)> {
        self.mutate(|map| map.move_node(id, new_parent_id))
    }

    pub fn delete_preview(&self, id: &NodeId) -> ApplicationResult<DeletePreview> {
        Ok(self.map()?.delete_preview(id)?)
    }

    /// Returns the removed ids.
    pub fn delete_node(
        &mut self,
        id: &NodeId,
        confirmed: bool,
    ) -> ApplicationResult<(Vec<NodeId>, SaveOutcome)> {
        self.mutate(|map| map.delete_node(id, confirmed))
    }
}
