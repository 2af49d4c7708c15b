//! Token persistence.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use super::Token;
use crate::config::CONFIG_SUBDIR;
use crate::error::{Error, Result};

/// Token file name inside the configuration subdirectory.
const TOKEN_FILE: &str = "token.json";

/// Storage for the single cached token.
///
/// `load` never fails: a missing, unreadable or malformed cache simply
/// means there is no cached token.
pub trait TokenStore: Send + Sync {
    /// Returns the cached token, if one can be read.
    fn load(&self) -> Option<Token>;

    /// Replaces the cached token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token could not be written.
    fn save(&self, token: &Token) -> Result<()>;
}

/// Token cache backed by a JSON file, readable by its owner only.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Creates a store at an explicit path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at `<config dir>/azure/token.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform has no configuration directory.
    pub fn default_location() -> Result<Self> {
        dirs::config_dir()
            .map(|dir| Self::new(dir.join(CONFIG_SUBDIR).join(TOKEN_FILE)))
            .ok_or_else(|| {
                Error::InvalidConfig("failed to determine configuration directory".into())
            })
    }

    /// Returns the token file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the token file, distinguishing "absent" from "broken".
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn read(&self) -> Result<Option<Token>> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&data)?))
    }

    fn write_atomically(&self, data: &[u8]) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        // Same directory as the target so the rename cannot cross filesystems.
        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        restrict_to_owner(file.as_file())?;
        file.write_all(data)?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_to_owner(file: &std::fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
const fn restrict_to_owner(_file: &std::fs::File) -> io::Result<()> {
    Ok(())
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<Token> {
        match self.read() {
            Ok(Some(token)) => {
                debug!(path = %self.path.display(), "loaded cached token");
                Some(token)
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "no cached token");
                None
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unusable token file");
                None
            }
        }
    }

    fn save(&self, token: &Token) -> Result<()> {
        let data = serde_json::to_vec(token)?;
        self.write_atomically(&data).map_err(|source| Error::TokenFile {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "stored token");
        Ok(())
    }
}

/// Token cache kept in memory, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<Token>>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding a token.
    #[must_use]
    pub fn with_token(token: Token) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<Token> {
        self.token.lock().ok().and_then(|guard| guard.clone())
    }

    fn save(&self, token: &Token) -> Result<()> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| Error::Io(io::Error::other("token store lock poisoned")))?;
        *guard = Some(token.clone());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, SubsecRound, Utc};

    fn sample_token() -> Token {
        Token::new("eyJ0eXAi", "Bearer")
            .with_refresh_token("0.AAAA")
            .with_expiry((Utc::now() + Duration::hours(1)).trunc_subsecs(0))
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token.json"));
        let token = sample_token();

        store.save(&token).unwrap();
        assert_eq!(store.read().unwrap(), Some(token.clone()));
        assert_eq!(store.load(), Some(token));
    }

    #[test]
    fn test_missing_file_is_no_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token.json"));
        assert!(store.read().unwrap().is_none());
        assert!(store.load().is_none());
    }

    #[test]
    fn test_malformed_file_is_no_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, b"{not json").unwrap();
        let store = FileTokenStore::new(&path);

        assert!(matches!(store.read(), Err(Error::Json(_))));
        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_overwrites_previous_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token.json"));

        store.save(&Token::new("first", "Bearer")).unwrap();
        store.save(&Token::new("second", "Bearer")).unwrap();

        assert_eq!(store.load().unwrap().access_token, "second");
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("azure").join("token.json"));
        store.save(&sample_token()).unwrap();
        assert!(store.path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_permissions_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token.json"));
        store.save(&sample_token()).unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryTokenStore::new();
        assert!(store.load().is_none());
        store.save(&Token::new("abc", "Bearer")).unwrap();
        assert_eq!(store.load().unwrap().access_token, "abc");
    }
}
