//! Client-side session storage.
//!
//! A session is the bearer token plus the profile of the signed-in user.
//! It is only ever reached through a [`SessionStore`] handed to the client
//! explicitly.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Profile of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Credential and profile of the signed-in user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: UserProfile,
}

impl Session {
    #[must_use]
    pub fn new(token: impl Into<String>, user: UserProfile) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// Errors raised by session stores.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The backing file could not be read or written.
    #[error("Session I/O error: {0}")]
    Io(String),

    /// The stored session could not be decoded.
    #[error("Corrupt session data: {0}")]
    Corrupt(String),
}

/// Read/write/clear access to the current session.
pub trait SessionStore: Send + Sync {
    /// Returns the stored session, or `None` when signed out.
    fn read(&self) -> BoxFuture<'static, Result<Option<Session>, SessionError>>;

    /// Replaces the stored session.
    fn write(&self, session: &Session) -> BoxFuture<'static, Result<(), SessionError>>;

    /// Removes the stored session. Clearing an empty store succeeds.
    fn clear(&self) -> BoxFuture<'static, Result<(), SessionError>>;
}

// =============================================================================
// In-Memory Session Store
// =============================================================================

/// Process-local session store. Clones share the same session.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    session: Arc<RwLock<Option<Session>>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that starts signed in.
    #[must_use]
    pub fn with_session(session: Session) -> Self {
        Self {
            session: Arc::new(RwLock::new(Some(session))),
        }
    }
}

impl SessionStore for InMemorySessionStore {
    fn read(&self) -> BoxFuture<'static, Result<Option<Session>, SessionError>> {
        let session = Arc::clone(&self.session);
        Box::pin(async move { Ok(session.read().await.clone()) })
    }

    fn write(&self, session: &Session) -> BoxFuture<'static, Result<(), SessionError>> {
        let slot = Arc::clone(&self.session);
        let session = session.clone();
        Box::pin(async move {
            *slot.write().await = Some(session);
            Ok(())
        })
    }

    fn clear(&self) -> BoxFuture<'static, Result<(), SessionError>> {
        let slot = Arc::clone(&self.session);
        Box::pin(async move {
            *slot.write().await = None;
            Ok(())
        })
    }
}

// =============================================================================
// File Session Store
// =============================================================================

/// Session persisted as a JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn read(&self) -> BoxFuture<'static, Result<Option<Session>, SessionError>> {
        let path = self.path.clone();
        Box::pin(async move {
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                Err(error) => return Err(SessionError::Io(error.to_string())),
            };
            serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|error| SessionError::Corrupt(error.to_string()))
        })
    }

    fn write(&self, session: &Session) -> BoxFuture<'static, Result<(), SessionError>> {
        let path = self.path.clone();
        let session = session.clone();
        Box::pin(async move {
            let bytes = serde_json::to_vec_pretty(&session)
                .map_err(|error| SessionError::Corrupt(error.to_string()))?;
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                let existed = tokio::fs::try_exists(parent).await.unwrap_or(false);
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|error| SessionError::Io(error.to_string()))?;
                if !existed {
                    restrict_directory(parent).await;
                }
            }
            tokio::fs::write(&path, bytes)
                .await
                .map_err(|error| SessionError::Io(error.to_string()))?;
            restrict_file(&path).await
        })
    }

    fn clear(&self) -> BoxFuture<'static, Result<(), SessionError>> {
        let path = self.path.clone();
        Box::pin(async move {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(error) => Err(SessionError::Io(error.to_string())),
            }
        })
    }
}

/// Limits a directory created for the session file to its owner (0700).
#[cfg(unix)]
async fn restrict_directory(directory: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(error) =
        tokio::fs::set_permissions(directory, std::fs::Permissions::from_mode(0o700)).await
    {
        tracing::warn!("failed to chmod 0700 {}: {error}", directory.display());
    }
}

#[cfg(not(unix))]
async fn restrict_directory(_directory: &Path) {}

/// Makes the session file readable and writable by its owner only (0600).
#[cfg(unix)]
async fn restrict_file(path: &Path) -> Result<(), SessionError> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .map_err(|error| SessionError::Io(format!("chmod {}: {error}", path.display())))
}

#[cfg(not(unix))]
async fn restrict_file(_path: &Path) -> Result<(), SessionError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn session() -> Session {
        Session::new(
            "token-123",
            UserProfile {
                id: "u1".to_string(),
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
            },
        )
    }

    #[rstest]
    #[tokio::test]
    async fn test_in_memory_read_write_clear(session: Session) {
        let store = InMemorySessionStore::new();
        assert_eq!(store.read().await.unwrap(), None);

        store.write(&session).await.unwrap();
        assert_eq!(store.read().await.unwrap(), Some(session));

        store.clear().await.unwrap();
        assert_eq!(store.read().await.unwrap(), None);
    }

    #[rstest]
    #[tokio::test]
    async fn test_in_memory_clones_share_state(session: Session) {
        let store = InMemorySessionStore::new();
        let other = store.clone();
        store.write(&session).await.unwrap();
        assert!(other.read().await.unwrap().is_some());
    }

    #[rstest]
    #[tokio::test]
    async fn test_file_store_round_trip(session: Session) {
        let directory = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(directory.path().join("nested").join("session.json"));

        assert_eq!(store.read().await.unwrap(), None);
        store.write(&session).await.unwrap();

        let reopened = FileSessionStore::new(store.path().to_path_buf());
        assert_eq!(reopened.read().await.unwrap(), Some(session));

        reopened.clear().await.unwrap();
        assert_eq!(store.read().await.unwrap(), None);
        reopened.clear().await.unwrap();
    }

    #[cfg(unix)]
    #[rstest]
    #[tokio::test]
    async fn test_file_store_is_private_to_owner(session: Session) {
        use std::os::unix::fs::PermissionsExt;

        let directory = tempfile::tempdir().unwrap();
        let nested = directory.path().join("client");
        let store = FileSessionStore::new(nested.join("session.json"));

        store.write(&session).await.unwrap();

        let file_mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(file_mode & 0o777, 0o600);
        let directory_mode = std::fs::metadata(&nested).unwrap().permissions().mode();
        assert_eq!(directory_mode & 0o777, 0o700);
    }

    #[cfg(unix)]
    #[rstest]
    #[tokio::test]
    async fn test_file_store_tightens_existing_file(session: Session) {
        use std::os::unix::fs::PermissionsExt;

        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("session.json");
        std::fs::write(&path, b"{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        FileSessionStore::new(path.clone()).write(&session).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[rstest]
    #[tokio::test]
    async fn test_file_store_corrupt_data() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("session.json");
        std::fs::write(&path, b"{not json").unwrap();

        let result = FileSessionStore::new(path).read().await;

        assert!(matches!(result, Err(SessionError::Corrupt(_))));
    }

    #[rstest]
    fn test_session_debug_redacts_token(session: Session) {
        assert!(!format!("{session:?}").contains("token-123"));
    }
}
