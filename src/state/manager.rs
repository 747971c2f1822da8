//! Shared, optionally file-backed state
//!
//! The processor updates bookmarks in memory and calls
//! [`StateManager::checkpoint`] at batch boundaries. With auto-save on, every
//! update is also written through immediately.

use super::types::State;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
enum Backing {
    Memory,
    File { path: PathBuf, auto_save: bool },
}

/// Handle to the sync state; clones share the same state
#[derive(Debug, Clone)]
pub struct StateManager {
    state: Arc<RwLock<State>>,
    backing: Backing,
}

impl StateManager {
    /// State that is never written anywhere
    pub fn in_memory() -> Self {
        Self::with_state(State::new())
    }

    /// In-memory state seeded with `state`
    pub fn with_state(state: State) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            backing: Backing::Memory,
        }
    }

    /// In-memory state parsed from inline JSON (`--state-json`)
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::with_state(parse_state(json)?))
    }

    /// State backed by `path`, loaded from it when the file exists
    ///
    /// Auto-save is on; turn it off with [`StateManager::auto_save`] to only
    /// write on checkpoints.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match std::fs::read_to_string(&path) {
            Ok(contents) => parse_state(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => State::new(),
            Err(e) => {
                return Err(Error::state(format!(
                    "Failed to read state file {}: {e}",
                    path.display()
                )))
            }
        };

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            backing: Backing::File {
                path,
                auto_save: true,
            },
        })
    }

    #[must_use]
    pub fn auto_save(mut self, enabled: bool) -> Self {
        if let Backing::File { auto_save, .. } = &mut self.backing {
            *auto_save = enabled;
        }
        self
    }

    /// State file path, `None` for in-memory state
    pub fn path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::Memory => None,
            Backing::File { path, .. } => Some(path),
        }
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> State {
        self.state.read().await.clone()
    }

    pub async fn get_bookmark(&self, stream: &str, sub_type: Option<&str>) -> Option<String> {
        self.state
            .read()
            .await
            .get_bookmark(stream, sub_type)
            .map(ToString::to_string)
    }

    pub async fn set_bookmark(
        &self,
        stream: &str,
        sub_type: Option<&str>,
        value: String,
    ) -> Result<()> {
        self.update(|state| state.set_bookmark(stream, sub_type, value))
            .await
    }

    /// Stream that was in progress when the state was last written
    pub async fn currently_syncing(&self) -> Option<String> {
        self.state.read().await.currently_syncing.clone()
    }

    /// Mark `stream` as in progress, or clear the marker with `None`
    pub async fn set_currently_syncing(&self, stream: Option<&str>) -> Result<()> {
        self.update(|state| state.set_currently_syncing(stream.map(ToString::to_string)))
            .await
    }

    /// Forget every bookmark of `stream`
    pub async fn clear_stream(&self, stream: &str) -> Result<()> {
        self.update(|state| {
            state.bookmarks.remove(stream);
        })
        .await
    }

    /// Write the current state to the backing file
    ///
    /// A no-op for in-memory state.
    pub async fn checkpoint(&self) -> Result<()> {
        let Some(path) = self.path() else {
            return Ok(());
        };

        self.write_to(path).await.map_err(|e| Error::Checkpoint {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        debug!(path = %path.display(), "State checkpointed");
        Ok(())
    }

    async fn update(&self, apply: impl FnOnce(&mut State)) -> Result<()> {
        apply(&mut *self.state.write().await);

        match &self.backing {
            Backing::File {
                path,
                auto_save: true,
            } => self.write_to(path).await,
            _ => Ok(()),
        }
    }

    /// Write through a sibling temp file so readers never see a torn file
    async fn write_to(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(&*self.state.read().await)?;
        let temp_path = path.with_extension("tmp");

        tokio::fs::write(&temp_path, contents).await?;
        tokio::fs::rename(&temp_path, path).await?;
        Ok(())
    }
}

fn parse_state(json: &str) -> Result<State> {
    serde_json::from_str(json).map_err(|e| Error::state(format!("Failed to parse state: {e}")))
}
