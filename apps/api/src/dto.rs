use serde::{Deserialize, Serialize};

mod admin;
mod authorization;

pub use admin::{
    AssignPermissionsRequest, AssignRolesRequest, CreateGroupRequest, CreateRoleRequest,
    GroupMembersRequest, GroupResponse, MembershipResponse, PermissionListQuery,
    PermissionResponse, RemovedMembersResponse, RolePermissionsRequest, RoleResponse,
    SetPermissionActiveRequest,
};
pub use authorization::{AuthorizeRequest, AuthorizeResponse, EffectivePermissionsResponse};

/// Health response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ready: bool,
    pub postgres: HealthDependencyStatus,
}

/// Status of one backing dependency.
#[derive(Debug, Serialize)]
pub struct HealthDependencyStatus {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Optional organization scope passed as a query string.
#[derive(Debug, Default, Deserialize)]
pub struct ScopeQuery {
    pub organization_id: Option<uuid::Uuid>,
}

impl ScopeQuery {
    pub fn scope(&self) -> Option<warden_core::OrganizationId> {
        self.organization_id
            .map(warden_core::OrganizationId::from_uuid)
    }
}
