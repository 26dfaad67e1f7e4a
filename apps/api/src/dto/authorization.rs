use serde::{Deserialize, Serialize};

/// Effective codenames of a principal under one scope.
#[derive(Debug, Serialize)]
pub struct EffectivePermissionsResponse {
    pub codenames: Vec<String>,
}

/// Incoming payload for a permit decision.
#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    pub principal_id: uuid::Uuid,
    pub permissions: Vec<String>,
    #[serde(default = "default_require_all")]
    pub require_all: bool,
    pub organization_id: Option<uuid::Uuid>,
}

fn default_require_all() -> bool {
    true
}

/// Permit decision.
#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    pub allowed: bool,
}
