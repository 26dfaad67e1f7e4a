use std::str::FromStr;

use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use warden_core::{AppError, OrganizationId, UserId, UserIdentity};

use crate::error::ApiResult;

/// Header carrying the authenticated principal, set by the fronting gateway.
pub const PRINCIPAL_HEADER: &str = "x-principal-id";

/// Optional header naming the principal's home organization.
pub const ORGANIZATION_HEADER: &str = "x-organization-id";

pub async fn require_principal(mut request: Request, next: Next) -> ApiResult<Response> {
    let identity = identity_from_headers(request.headers())?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

fn identity_from_headers(headers: &HeaderMap) -> Result<UserIdentity, AppError> {
    let principal = headers
        .get(PRINCIPAL_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;
    let user_id = UserId::from_str(principal)
        .map_err(|_| AppError::Unauthorized(format!("invalid {PRINCIPAL_HEADER} header")))?;

    let organization_id = headers
        .get(ORGANIZATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map(OrganizationId::from_str)
        .transpose()?;

    Ok(UserIdentity::new(
        user_id,
        user_id.to_string(),
        None,
        organization_id,
    ))
}
