//! Persisted "was signed in" indicator.
//!
//! The marker only decides whether a startup refresh is worth attempting.
//! It never holds credentials or tokens.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

/// Durable flag recording that a session existed.
///
/// Writes are best-effort: a marker that fails to persist costs at most
/// one skipped or pointless startup refresh, so implementations log and
/// carry on instead of returning errors.
pub trait SessionMarker: Send + Sync + 'static {
    fn is_set(&self) -> bool;
    fn set(&self);
    fn clear(&self);
}

/// Marker that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryMarker {
    set: AtomicBool,
}

impl MemoryMarker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A marker that starts out set, as if a previous run had signed in.
    pub fn preset() -> Self {
        Self {
            set: AtomicBool::new(true),
        }
    }
}

impl SessionMarker for MemoryMarker {
    fn is_set(&self) -> bool {
        self.set.load(Ordering::Acquire)
    }

    fn set(&self) {
        self.set.store(true, Ordering::Release);
    }

    fn clear(&self) {
        self.set.store(false, Ordering::Release);
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkerFile {
    signed_in: bool,
}

/// Marker kept as a small JSON file (`{"signedIn":true}`).
///
/// A missing, unreadable or malformed file reads as "not set".
#[derive(Debug, Clone)]
pub struct FileMarker {
    path: PathBuf,
}

impl FileMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionMarker for FileMarker {
    fn is_set(&self) -> bool {
        let Ok(raw) = std::fs::read(&self.path) else {
            return false;
        };
        match serde_json::from_slice::<MarkerFile>(&raw) {
            Ok(file) => file.signed_in,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "unreadable session marker");
                false
            }
        }
    }

    fn set(&self) {
        let body = match serde_json::to_vec(&MarkerFile { signed_in: true }) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode session marker");
                return;
            }
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(path = %parent.display(), error = %e, "failed to create marker directory");
                return;
            }
        }
        if let Err(e) = std::fs::write(&self.path, body) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write session marker");
        }
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove session marker");
            }
        }
    }
}
