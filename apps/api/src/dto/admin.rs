use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_domain::{Group, GroupMembership, Permission, Role, ScopedResource};

/// Filter for permission catalog listings.
#[derive(Debug, Default, Deserialize)]
pub struct PermissionListQuery {
    pub resource: Option<String>,
}

/// API representation of a catalog permission.
#[derive(Debug, Serialize)]
pub struct PermissionResponse {
    pub permission_id: String,
    pub codename: String,
    pub name: String,
    pub description: String,
    pub resource: String,
    pub permission_type: String,
    pub is_active: bool,
}

impl From<Permission> for PermissionResponse {
    fn from(value: Permission) -> Self {
        Self {
            permission_id: value.id().to_string(),
            codename: value.codename().to_owned(),
            name: value.name().to_owned(),
            description: value.description().to_owned(),
            resource: value.resource().to_owned(),
            permission_type: value.permission_type().as_str().to_owned(),
            is_active: value.is_active(),
        }
    }
}

/// Incoming payload for permission soft-disable.
#[derive(Debug, Deserialize)]
pub struct SetPermissionActiveRequest {
    pub is_active: bool,
}

/// Incoming payload for role creation.
#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    pub codename: String,
    #[serde(default)]
    pub description: String,
    pub role_type: String,
    pub organization_id: Option<uuid::Uuid>,
}

/// API representation of a role.
#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub role_id: String,
    pub name: String,
    pub codename: String,
    pub description: String,
    pub role_type: String,
    pub organization_id: Option<String>,
    pub is_system_role: bool,
    pub is_active: bool,
}

impl From<Role> for RoleResponse {
    fn from(value: Role) -> Self {
        Self {
            role_id: value.id().to_string(),
            name: value.name().to_owned(),
            codename: value.codename().to_owned(),
            description: value.description().to_owned(),
            role_type: value.role_type().as_str().to_owned(),
            organization_id: value
                .organization_id()
                .map(|organization_id| organization_id.to_string()),
            is_system_role: value.is_system_role(),
            is_active: value.is_active(),
        }
    }
}

/// Incoming payload for group creation.
#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// API representation of a group.
#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub group_id: String,
    pub name: String,
    pub description: String,
    pub organization_id: String,
    pub created_by: Option<String>,
    pub is_active: bool,
}

impl From<Group> for GroupResponse {
    fn from(value: Group) -> Self {
        Self {
            group_id: value.id().to_string(),
            name: value.name().to_owned(),
            description: value.description().to_owned(),
            organization_id: value.organization_id().to_string(),
            created_by: value.created_by().map(|user_id| user_id.to_string()),
            is_active: value.is_active(),
        }
    }
}

/// Incoming payload for adding or removing group members.
#[derive(Debug, Deserialize)]
pub struct GroupMembersRequest {
    pub user_ids: Vec<uuid::Uuid>,
    /// Ignored on removal.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// API representation of one group membership.
#[derive(Debug, Serialize)]
pub struct MembershipResponse {
    pub user_id: String,
    pub added_by: Option<String>,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<GroupMembership> for MembershipResponse {
    fn from(value: GroupMembership) -> Self {
        Self {
            user_id: value.user_id.to_string(),
            added_by: value.added_by.map(|user_id| user_id.to_string()),
            granted_at: value.window.granted_at(),
            expires_at: value.window.expires_at(),
        }
    }
}

/// Number of memberships soft-disabled by a removal.
#[derive(Debug, Serialize)]
pub struct RemovedMembersResponse {
    pub removed: u64,
}

/// Incoming payload replacing the permissions bundled in a role.
#[derive(Debug, Deserialize)]
pub struct RolePermissionsRequest {
    pub permission_ids: Vec<uuid::Uuid>,
}

/// Incoming payload replacing a role set.
#[derive(Debug, Deserialize)]
pub struct AssignRolesRequest {
    pub role_ids: Vec<uuid::Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Incoming payload replacing a permission set.
#[derive(Debug, Deserialize)]
pub struct AssignPermissionsRequest {
    pub permission_ids: Vec<uuid::Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
}
