use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Token file name in cache directory
const TOKEN_FILE: &str = "tokens.json";

/// The access/refresh/user triple written on login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access: String,
    pub refresh: String,
    pub user_id: String,
}

impl Credentials {
    pub fn new(
        access: impl Into<String>,
        refresh: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
            user_id: user_id.into(),
        }
    }
}

/// On-disk shape of the token record. Each value is optional so that a
/// record written mid-refresh (access replaced, rest untouched) round-trips.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl From<&Credentials> for StoredTokens {
    fn from(c: &Credentials) -> Self {
        Self {
            access_token: Some(c.access.clone()),
            refresh_token: Some(c.refresh.clone()),
            user_id: Some(c.user_id.clone()),
        }
    }
}

/// Durable storage for the session credentials.
///
/// None of the operations report failure. Backends log storage problems and
/// degrade reads to `None`, so callers treat an unavailable store exactly
/// like an empty one.
pub trait TokenStore: Send + Sync {
    /// Write all three values.
    fn set(&self, credentials: &Credentials);

    /// Replace only the access token, and only while the store still holds
    /// `expected_refresh`. Returns false, writing nothing, when the record was
    /// cleared or replaced since the refresh token was read.
    fn replace_access(&self, expected_refresh: &str, access: &str) -> bool;

    fn access(&self) -> Option<String>;

    fn refresh(&self) -> Option<String>;

    fn user_id(&self) -> Option<String>;

    /// Remove every value in one step.
    fn clear(&self);

    /// True when both access and refresh tokens are present.
    fn has_credentials(&self) -> bool {
        self.access().is_some() && self.refresh().is_some()
    }
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<StoredTokens>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: &Credentials) -> Self {
        Self::with_tokens(credentials.into())
    }

    pub fn with_tokens(tokens: StoredTokens) -> Self {
        Self {
            tokens: Mutex::new(tokens),
        }
    }

    fn read(&self) -> StoredTokens {
        match self.tokens.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn write<R>(&self, f: impl FnOnce(&mut StoredTokens) -> R) -> R {
        match self.tokens.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn set(&self, credentials: &Credentials) {
        self.write(|t| *t = credentials.into());
    }

    fn replace_access(&self, expected_refresh: &str, access: &str) -> bool {
        self.write(|t| {
            if t.refresh_token.as_deref() != Some(expected_refresh) {
                return false;
            }
            t.access_token = Some(access.to_string());
            true
        })
    }

    fn access(&self) -> Option<String> {
        self.read().access_token
    }

    fn refresh(&self) -> Option<String> {
        self.read().refresh_token
    }

    fn user_id(&self) -> Option<String> {
        self.read().user_id
    }

    fn clear(&self) {
        self.write(|t| *t = StoredTokens::default());
    }
}

// ============================================================================
// File store
// ============================================================================

/// Token record persisted as JSON in the cache directory.
///
/// Reads always go to disk. Writes land in a sibling temp file that is then
/// renamed over the real one, so readers see either the old record or the
/// new one and never a half-written file.
pub struct FileTokenStore {
    path: PathBuf,
    // Serializes the read-compare-write in `replace_access` against set/clear
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(cache_dir: &Path) -> Self {
        Self::at_path(cache_dir.join(TOKEN_FILE))
    }

    pub fn at_path(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StoredTokens {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return StoredTokens::default(),
            Err(e) => {
                warn!(error = %e, path = ?self.path, "Failed to read token file");
                return StoredTokens::default();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, path = ?self.path, "Failed to parse token file");
                StoredTokens::default()
            }
        }
    }

    fn save(&self, tokens: &StoredTokens) {
        if let Err(e) = self.try_save(tokens) {
            warn!(error = %e, path = ?self.path, "Failed to write token file");
        }
    }

    fn try_save(&self, tokens: &StoredTokens) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(tokens)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl TokenStore for FileTokenStore {
    fn set(&self, credentials: &Credentials) {
        let _guard = self.lock();
        self.save(&credentials.into());
    }

    fn replace_access(&self, expected_refresh: &str, access: &str) -> bool {
        let _guard = self.lock();
        let mut tokens = self.load();
        if tokens.refresh_token.as_deref() != Some(expected_refresh) {
            return false;
        }
        tokens.access_token = Some(access.to_string());
        self.save(&tokens);
        true
    }

    fn access(&self) -> Option<String> {
        self.load().access_token
    }

    fn refresh(&self) -> Option<String> {
        self.load().refresh_token
    }

    fn user_id(&self) -> Option<String> {
        self.load().user_id
    }

    fn clear(&self) {
        let _guard = self.lock();
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = ?self.path, "Token file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, path = ?self.path, "Failed to remove token file"),
        }
    }
}
