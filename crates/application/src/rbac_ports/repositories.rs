use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warden_core::{AppResult, OrganizationId, UserId};
use warden_domain::{
    Group, GroupId, GroupMembership, GroupPermissionGrant, GroupRoleGrant, Permission,
    PermissionId, PrincipalGrantGraph, Role, RoleId, RolePermissionGrant, UserPermissionGrant,
    UserRoleGrant,
};

use super::queries::{ExpiredGrantSweep, PermissionQuery};

/// Repository port for the permission catalog.
#[async_trait]
pub trait PermissionCatalogRepository: Send + Sync {
    /// Stores a new permission. Fails with `Conflict` on a duplicate codename.
    async fn save_permission(&self, permission: Permission) -> AppResult<()>;

    /// Finds a permission by id.
    async fn find_permission(&self, permission_id: PermissionId) -> AppResult<Option<Permission>>;

    /// Finds a permission by codename.
    async fn find_permission_by_codename(&self, codename: &str) -> AppResult<Option<Permission>>;

    /// Lists permissions ordered by resource then permission type.
    async fn list_permissions(&self, query: PermissionQuery) -> AppResult<Vec<Permission>>;

    /// Enables or soft-disables a permission. Fails with `NotFound` for unknown ids.
    async fn set_permission_active(
        &self,
        permission_id: PermissionId,
        is_active: bool,
    ) -> AppResult<()>;

    /// Deletes every permission and role together with their assignment rows.
    async fn clear_catalog(&self) -> AppResult<()>;
}

/// Repository port for roles and their structural permission sets.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Stores a new role. Fails with `Conflict` when the codename is taken in
    /// the same organization (or among system roles).
    async fn save_role(&self, role: Role) -> AppResult<()>;

    /// Finds a role by id.
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Finds a role by codename within an organization, or among system roles for `None`.
    async fn find_role_by_codename(
        &self,
        codename: &str,
        organization_id: Option<OrganizationId>,
    ) -> AppResult<Option<Role>>;

    /// Lists roles applicable under `scope`, ordered by codename.
    async fn list_roles(&self, scope: Option<OrganizationId>) -> AppResult<Vec<Role>>;

    /// Atomically replaces every role-permission row of `role_id` with `grants`.
    async fn replace_role_permissions(
        &self,
        role_id: RoleId,
        grants: &[RolePermissionGrant],
    ) -> AppResult<()>;

    /// Lists the permissions linked to a role, including inactive ones.
    async fn list_role_permissions(&self, role_id: RoleId) -> AppResult<Vec<Permission>>;
}

/// Repository port for groups, memberships and group grants.
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Stores a new group. Fails with `Conflict` on a duplicate name in the organization.
    async fn save_group(&self, group: Group) -> AppResult<()>;

    /// Finds a group by id.
    async fn find_group(&self, group_id: GroupId) -> AppResult<Option<Group>>;

    /// Lists groups of an organization ordered by name.
    async fn list_groups(&self, organization_id: OrganizationId) -> AppResult<Vec<Group>>;

    /// Inserts memberships or overwrites existing `(user, group)` rows, atomically.
    async fn upsert_memberships(
        &self,
        group_id: GroupId,
        memberships: &[GroupMembership],
    ) -> AppResult<()>;

    /// Soft-disables memberships of the listed users and returns the affected row count.
    async fn deactivate_memberships(&self, group_id: GroupId, user_ids: &[UserId])
    -> AppResult<u64>;

    /// Lists every membership row of a group, active or not.
    async fn list_memberships(&self, group_id: GroupId) -> AppResult<Vec<GroupMembership>>;

    /// Atomically replaces every group-role row of `group_id` with `grants`.
    async fn replace_group_roles(&self, group_id: GroupId, grants: &[GroupRoleGrant])
    -> AppResult<()>;

    /// Atomically replaces every group-permission row of `group_id` with `grants`.
    async fn replace_group_permissions(
        &self,
        group_id: GroupId,
        grants: &[GroupPermissionGrant],
    ) -> AppResult<()>;
}

/// Repository port for grants made directly to principals.
#[async_trait]
pub trait UserAssignmentRepository: Send + Sync {
    /// Atomically replaces every user-role row of `user_id` with `grants`.
    async fn replace_user_roles(&self, user_id: UserId, grants: &[UserRoleGrant]) -> AppResult<()>;

    /// Atomically replaces every user-permission row of `user_id` with `grants`.
    async fn replace_user_permissions(
        &self,
        user_id: UserId,
        grants: &[UserPermissionGrant],
    ) -> AppResult<()>;

    /// Inserts one user-role row or overwrites the existing one.
    async fn upsert_user_role(&self, grant: UserRoleGrant) -> AppResult<()>;
}

/// Read port feeding the resolution engine.
#[async_trait]
pub trait AuthorizationRepository: Send + Sync {
    /// Loads every grant reachable from `user_id`, unfiltered, joined with the catalogs.
    ///
    /// Unknown principals yield an empty graph.
    async fn load_grant_graph(&self, user_id: UserId) -> AppResult<PrincipalGrantGraph>;
}

/// Repository port for assignment hygiene.
#[async_trait]
pub trait GrantMaintenanceRepository: Send + Sync {
    /// Soft-disables active rows whose expiry is at or before `now`.
    async fn deactivate_expired_grants(&self, now: DateTime<Utc>) -> AppResult<ExpiredGrantSweep>;
}
