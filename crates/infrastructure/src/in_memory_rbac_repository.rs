use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use warden_core::{AppError, AppResult, UserId};
use warden_domain::{
    Group, GroupId, GroupMembership, GroupPermissionGrant, GroupRoleGrant, Permission,
    PermissionId, Role, RoleId, RolePermissionGrant, UserPermissionGrant, UserRoleGrant,
};

use crate::grant_rows::keyed_rows;

mod catalog;
mod groups;
mod resolution;
mod users;

/// Every table behind one lock, so each write is all-or-nothing and readers
/// never see a half-replaced assignment set.
#[derive(Debug, Default)]
struct RbacTables {
    permissions: BTreeMap<PermissionId, Permission>,
    roles: BTreeMap<RoleId, Role>,
    groups: BTreeMap<GroupId, Group>,
    role_permissions: BTreeMap<(RoleId, PermissionId), RolePermissionGrant>,
    user_roles: BTreeMap<(UserId, RoleId), UserRoleGrant>,
    user_permissions: BTreeMap<(UserId, PermissionId), UserPermissionGrant>,
    memberships: BTreeMap<(GroupId, UserId), GroupMembership>,
    group_roles: BTreeMap<(GroupId, RoleId), GroupRoleGrant>,
    group_permissions: BTreeMap<(GroupId, PermissionId), GroupPermissionGrant>,
}

impl RbacTables {
    fn require_role(&self, role_id: RoleId) -> AppResult<()> {
        if self.roles.contains_key(&role_id) {
            return Ok(());
        }
        Err(AppError::NotFound(format!("role '{role_id}' does not exist")))
    }

    fn require_group(&self, group_id: GroupId) -> AppResult<()> {
        if self.groups.contains_key(&group_id) {
            return Ok(());
        }
        Err(AppError::NotFound(format!("group '{group_id}' does not exist")))
    }

    fn check_permission_reference(&self, permission_id: PermissionId) -> AppResult<()> {
        match self.permissions.get(&permission_id) {
            Some(permission) if permission.is_active() => Ok(()),
            _ => Err(AppError::Validation(format!(
                "permission '{permission_id}' does not exist or is inactive"
            ))),
        }
    }

    fn check_role_reference(&self, role_id: RoleId) -> AppResult<()> {
        match self.roles.get(&role_id) {
            Some(role) if role.is_active() => Ok(()),
            _ => Err(AppError::Validation(format!(
                "role '{role_id}' does not exist or is inactive"
            ))),
        }
    }
}

/// In-memory RBAC store implementing every repository port.
#[derive(Debug, Default)]
pub struct InMemoryRbacRepository {
    tables: RwLock<RbacTables>,
}

impl InMemoryRbacRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
