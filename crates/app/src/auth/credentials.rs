//! Credential storage.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use mockall::automock;
use thiserror::Error;

use crate::auth::SessionState;

/// Errors reading or writing remembered credentials.
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("failed to access credentials file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("credentials file {path} is malformed")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[automock]
pub trait CredentialStore: Send + Sync {
    /// Load remembered state. A store that has never been written yields the default state.
    fn load(&self) -> Result<SessionState, CredentialsError>;

    /// Replace remembered state.
    fn save(&self, state: &SessionState) -> Result<(), CredentialsError>;
}

/// Process-local store, used by tests and the offline backend.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    state: Mutex<SessionState>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: SessionState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<SessionState, CredentialsError> {
        Ok(self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, state: &SessionState) -> Result<(), CredentialsError> {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state.clone();

        Ok(())
    }
}

/// JSON file store, the CLI's counterpart of browser local storage.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> CredentialsError {
        CredentialsError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<SessionState, CredentialsError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Ok(SessionState::default());
            }
            Err(error) => return Err(self.io_error(error)),
        };

        if contents.trim().is_empty() {
            return Ok(SessionState::default());
        }

        serde_json::from_str(&contents).map_err(|source| CredentialsError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, state: &SessionState) -> Result<(), CredentialsError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|error| self.io_error(error))?;
        }

        let contents =
            serde_json::to_string_pretty(state).map_err(|source| CredentialsError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        let staging = self.path.with_extension("tmp");

        fs::write(&staging, contents).map_err(|error| self.io_error(error))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            fs::set_permissions(&staging, fs::Permissions::from_mode(0o600))
                .map_err(|error| self.io_error(error))?;
        }

        fs::rename(&staging, &self.path).map_err(|error| self.io_error(error))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use testresult::TestResult;

    use crate::auth::{AccessToken, Customer};

    use super::*;

    fn signed_in_state() -> SessionState {
        SessionState {
            token: AccessToken::new("tok-1"),
            customer: Some(Customer {
                customer_id: 4,
                email: "reader@example.com".to_string(),
                full_name: None,
                username: Some("reader".to_string()),
            }),
            cookie: Some("sessionid=abc".to_string()),
        }
    }

    #[test]
    fn missing_file_loads_default_state() -> TestResult {
        let dir = TempDir::new()?;
        let store = FileCredentialStore::new(dir.path().join("nested/credentials.json"));

        assert_eq!(store.load()?, SessionState::default());

        Ok(())
    }

    #[test]
    fn file_store_round_trips_state() -> TestResult {
        let dir = TempDir::new()?;
        let store = FileCredentialStore::new(dir.path().join("nested/credentials.json"));

        store.save(&signed_in_state())?;

        let reopened = FileCredentialStore::new(store.path());

        assert_eq!(reopened.load()?, signed_in_state());

        Ok(())
    }

    #[test]
    fn malformed_file_is_reported() -> TestResult {
        let dir = TempDir::new()?;
        let path = dir.path().join("credentials.json");

        fs::write(&path, "{ not json")?;

        let result = FileCredentialStore::new(&path).load();

        assert!(
            matches!(result, Err(CredentialsError::Malformed { .. })),
            "expected Malformed, got {result:?}"
        );

        Ok(())
    }

    #[test]
    fn memory_store_keeps_last_saved_state() -> TestResult {
        let store = MemoryCredentialStore::new();

        store.save(&signed_in_state())?;

        assert_eq!(store.load()?, signed_in_state());

        Ok(())
    }
}
