use serde::{Deserialize, Serialize};

/// Username/password body for the token and registration endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct AccountCredentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Response of the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RegisteredUser {
    #[serde(default)]
    pub id: Option<i64>,
    pub username: String,
}
