//! Durable client-side state: the last signed-in user and the refresh token.
//!
//! This is only used to bootstrap a session at startup. The access token is never written here.

use crate::error::ClientResult;
use api_shared::UserRes;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub last_user: Option<UserRes>,
    pub refresh_token: Option<String>,
}

/// A JSON file holding a [`PersistedSession`], or nothing at all for in-memory sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    path: Option<PathBuf>,
}

impl SessionStore {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn memory() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Reads the stored session. A missing or unreadable file yields an empty session.
    pub fn load(&self) -> PersistedSession {
        let Some(path) = &self.path else {
            return PersistedSession::default();
        };
        match std::fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "discarding corrupt session file");
                PersistedSession::default()
            }),
            Err(_) => PersistedSession::default(),
        }
    }

    pub fn save(&self, session: &PersistedSession) -> ClientResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(session)?)?;
        Ok(())
    }

    pub fn clear(&self) {
        if let Some(path) = &self.path {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove session file");
                }
            }
        }
    }
}
