// Caller identity attached to authenticated requests

use serde::{Deserialize, Serialize};

/// User resolved from a bearer token or session cookie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: Option<String>,
}
