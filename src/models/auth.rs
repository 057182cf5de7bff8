// Identity token claims
// Issued by the external auth provider; only `sub` is required here

use serde::{Deserialize, Serialize};

/// Claims decoded from a bearer token or session cookie
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentityClaims {
    /// Stable user identifier (subject)
    pub sub: String,

    /// Expires at timestamp (Unix epoch seconds)
    pub exp: u64,

    /// Issued at timestamp (Unix epoch seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}
