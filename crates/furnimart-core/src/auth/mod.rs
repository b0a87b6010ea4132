//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `TokenStore`: durable storage for the access/refresh/user triple, with
//!   file, keychain and in-memory backends
//! - `SessionManager`: login/logout transitions and the token refresh protocol
//! - `RouteGuard`: a one-shot authorization check in front of protected views
//! - `claims`: unverified decoding of the access token's `exp` and `user_id`

pub mod claims;
pub mod credentials;
pub mod guard;
pub mod session;
pub mod store;

pub use credentials::KeyringTokenStore;
pub use guard::{GuardState, RouteGuard};
pub use session::{Navigator, NoopNavigator, RefreshError, Route, SessionManager, SessionState};
pub use store::{Credentials, FileTokenStore, MemoryTokenStore, StoredTokens, TokenStore};
