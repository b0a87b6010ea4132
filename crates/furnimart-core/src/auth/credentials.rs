use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use keyring::Entry;
use tracing::warn;

use super::store::{Credentials, StoredTokens, TokenStore};

const SERVICE_NAME: &str = "furnimart";

/// Keychain account under which the token record is stored
const DEFAULT_ACCOUNT: &str = "session";

/// Token store backed by the OS keychain.
///
/// The whole record lives in a single secret so that `set` and `clear` touch
/// exactly one keychain entry.
pub struct KeyringTokenStore {
    account: String,
    write_lock: Mutex<()>,
}

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self::for_account(DEFAULT_ACCOUNT)
    }

    pub fn for_account(account: &str) -> Self {
        Self {
            account: account.to_string(),
            write_lock: Mutex::new(()),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.account).context("Failed to create keyring entry")
    }

    fn load(&self) -> StoredTokens {
        match self.try_load() {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "Failed to read tokens from keychain");
                StoredTokens::default()
            }
        }
    }

    fn try_load(&self) -> Result<StoredTokens> {
        parse_record(self.entry()?.get_password())
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn save(&self, tokens: &StoredTokens) {
        let result = serde_json::to_string(tokens)
            .context("Failed to serialize token record")
            .and_then(|secret| {
                self.entry()?
                    .set_password(&secret)
                    .context("Failed to store tokens in keychain")
            });
        if let Err(e) = result {
            warn!(error = %e, "Failed to write tokens to keychain");
        }
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringTokenStore {
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
        let result = self.entry().and_then(|entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        });
        if let Err(e) = result {
            warn!(error = %e, "Failed to clear keychain tokens");
        }
    }
}

/// Interpret a keychain lookup. A missing entry is an empty record.
fn parse_record(secret: keyring::Result<String>) -> Result<StoredTokens> {
    match secret {
        Ok(secret) => serde_json::from_str(&secret).context("Failed to parse keychain token record"),
        Err(keyring::Error::NoEntry) => Ok(StoredTokens::default()),
        Err(e) => Err(e).context("Failed to retrieve tokens from keychain"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_entry_is_empty_record() {
        let tokens = parse_record(Err(keyring::Error::NoEntry)).unwrap();
        assert_eq!(tokens, StoredTokens::default());
    }

    #[test]
    fn test_stored_record_parses() {
        let secret = r#"{"access_token":"A1","refresh_token":"R1","user_id":"42"}"#;
        let tokens = parse_record(Ok(secret.to_string())).unwrap();
        assert_eq!(tokens, StoredTokens::from(&Credentials::new("A1", "R1", "42")));
    }

    #[test]
    fn test_corrupt_secret_is_an_error() {
        assert!(parse_record(Ok("not json".to_string())).is_err());
        assert!(parse_record(Err(keyring::Error::PlatformFailure("locked".into()))).is_err());
    }
}
