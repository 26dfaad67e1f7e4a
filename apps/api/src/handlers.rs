use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use warden_core::{OrganizationId, UserId, UserIdentity};
use warden_domain::{GroupId, PermissionId, ProtectedResource, ResourceAction, RoleId};

use crate::dto::{
    AssignPermissionsRequest, AssignRolesRequest, AuthorizeRequest, AuthorizeResponse,
    CreateGroupRequest, CreateRoleRequest, EffectivePermissionsResponse, GroupMembersRequest,
    GroupResponse, MembershipResponse, PermissionListQuery, PermissionResponse,
    RemovedMembersResponse, RolePermissionsRequest, RoleResponse, ScopeQuery,
    SetPermissionActiveRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub mod authorization;
pub mod catalog;
pub mod groups;
pub mod health;
pub mod roles;
pub mod users;

/// Checks the caller against the access rule for `resource.action`.
async fn require_access(
    state: &AppState,
    user: &UserIdentity,
    resource: ProtectedResource,
    action: ResourceAction,
    scope: Option<OrganizationId>,
) -> ApiResult<()> {
    let requirement = state.access_map.requirement(resource, action)?;
    state
        .authorization_service
        .require_permissions(user, requirement, scope)
        .await?;
    Ok(())
}

fn permission_ids(values: &[uuid::Uuid]) -> Vec<PermissionId> {
    values.iter().copied().map(PermissionId::from_uuid).collect()
}

fn role_ids(values: &[uuid::Uuid]) -> Vec<RoleId> {
    values.iter().copied().map(RoleId::from_uuid).collect()
}

fn user_ids(values: &[uuid::Uuid]) -> Vec<UserId> {
    values.iter().copied().map(UserId::from_uuid).collect()
}
