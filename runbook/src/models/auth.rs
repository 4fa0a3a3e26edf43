//! Development login models.

use serde::{Deserialize, Serialize};

/// Optional overrides sent to the development login endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevLoginRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

/// Session payload returned by a successful login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    /// ISO-8601 instant after which the token is no longer valid.
    pub expires_at: String,
    pub subject: String,
    pub roles: Vec<String>,
}
