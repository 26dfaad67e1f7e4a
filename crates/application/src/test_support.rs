use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use warden_core::{AppError, AppResult, OrganizationId, UserId, UserIdentity};
use warden_domain::{
    GrantWindow, Granted, Group, GroupGrants, GroupId, GroupMembership, GroupPermissionGrant,
    GroupRoleGrant, Permission, PermissionDraft, PermissionId, PermissionType, PrincipalGrantGraph,
    ResourceAccessMap, Role, RoleDraft, RoleId, RolePermissionGrant, RoleType, ScopedResource,
    UserPermissionGrant, UserRoleGrant,
};

use crate::{
    AuthorizationRepository, AuthorizationService, ExpiredGrantSweep, GrantMaintenanceRepository,
    GroupRepository, PermissionCatalogRepository, PermissionQuery, RbacAdminService,
    RoleRepository, UserAssignmentRepository,
};

#[derive(Default)]
struct FakeState {
    permissions: BTreeMap<PermissionId, Permission>,
    roles: BTreeMap<RoleId, Role>,
    groups: BTreeMap<GroupId, Group>,
    role_permissions: Vec<RolePermissionGrant>,
    user_roles: Vec<UserRoleGrant>,
    user_permissions: Vec<UserPermissionGrant>,
    memberships: Vec<GroupMembership>,
    group_roles: Vec<GroupRoleGrant>,
    group_permissions: Vec<GroupPermissionGrant>,
}

/// Single-lock fake implementing every port for service tests.
#[derive(Default)]
pub(crate) struct FakeRbacStore {
    state: Mutex<FakeState>,
}

impl FakeRbacStore {
    pub(crate) async fn role_permission_ids(&self, role_id: RoleId) -> Vec<PermissionId> {
        let state = self.state.lock().await;
        state
            .role_permissions
            .iter()
            .filter(|grant| grant.role_id == role_id)
            .map(|grant| grant.permission_id)
            .collect()
    }

    pub(crate) async fn membership_rows(&self, group_id: GroupId) -> Vec<GroupMembership> {
        let state = self.state.lock().await;
        state
            .memberships
            .iter()
            .filter(|membership| membership.group_id == group_id)
            .cloned()
            .collect()
    }

    pub(crate) async fn user_role_rows(&self, user_id: UserId) -> Vec<UserRoleGrant> {
        let state = self.state.lock().await;
        state
            .user_roles
            .iter()
            .filter(|grant| grant.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PermissionCatalogRepository for FakeRbacStore {
    async fn save_permission(&self, permission: Permission) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state
            .permissions
            .values()
            .any(|existing| existing.codename() == permission.codename())
        {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                permission.codename()
            )));
        }
        state.permissions.insert(permission.id(), permission);
        Ok(())
    }

    async fn find_permission(&self, permission_id: PermissionId) -> AppResult<Option<Permission>> {
        Ok(self.state.lock().await.permissions.get(&permission_id).cloned())
    }

    async fn find_permission_by_codename(&self, codename: &str) -> AppResult<Option<Permission>> {
        Ok(self
            .state
            .lock()
            .await
            .permissions
            .values()
            .find(|permission| permission.codename() == codename)
            .cloned())
    }

    async fn list_permissions(&self, query: PermissionQuery) -> AppResult<Vec<Permission>> {
        let state = self.state.lock().await;
        let mut permissions: Vec<Permission> = state
            .permissions
            .values()
            .filter(|permission| !query.active_only || permission.is_active())
            .filter(|permission| {
                query
                    .resource
                    .as_deref()
                    .is_none_or(|resource| permission.resource() == resource)
            })
            .cloned()
            .collect();
        permissions.sort_by(|left, right| {
            (left.resource(), left.permission_type().as_str())
                .cmp(&(right.resource(), right.permission_type().as_str()))
        });
        Ok(permissions)
    }

    async fn set_permission_active(
        &self,
        permission_id: PermissionId,
        is_active: bool,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let permission = state.permissions.get_mut(&permission_id).ok_or_else(|| {
            AppError::NotFound(format!("permission '{permission_id}' does not exist"))
        })?;
        permission.set_active(is_active);
        Ok(())
    }

    async fn clear_catalog(&self) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.permissions.clear();
        state.roles.clear();
        state.role_permissions.clear();
        state.user_roles.clear();
        state.user_permissions.clear();
        state.group_roles.clear();
        state.group_permissions.clear();
        Ok(())
    }
}

#[async_trait]
impl RoleRepository for FakeRbacStore {
    async fn save_role(&self, role: Role) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.roles.values().any(|existing| {
            existing.codename() == role.codename()
                && existing.organization_id() == role.organization_id()
        }) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.codename()
            )));
        }
        state.roles.insert(role.id(), role);
        Ok(())
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self.state.lock().await.roles.get(&role_id).cloned())
    }

    async fn find_role_by_codename(
        &self,
        codename: &str,
        organization_id: Option<OrganizationId>,
    ) -> AppResult<Option<Role>> {
        Ok(self
            .state
            .lock()
            .await
            .roles
            .values()
            .find(|role| role.codename() == codename && role.organization_id() == organization_id)
            .cloned())
    }

    async fn list_roles(&self, scope: Option<OrganizationId>) -> AppResult<Vec<Role>> {
        let state = self.state.lock().await;
        let mut roles: Vec<Role> = state
            .roles
            .values()
            .filter(|role| role.applies_in_scope(scope))
            .cloned()
            .collect();
        roles.sort_by(|left, right| left.codename().cmp(right.codename()));
        Ok(roles)
    }

    async fn replace_role_permissions(
        &self,
        role_id: RoleId,
        grants: &[RolePermissionGrant],
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.role_permissions.retain(|grant| grant.role_id != role_id);
        state.role_permissions.extend(grants.iter().cloned());
        Ok(())
    }

    async fn list_role_permissions(&self, role_id: RoleId) -> AppResult<Vec<Permission>> {
        let state = self.state.lock().await;
        Ok(state
            .role_permissions
            .iter()
            .filter(|grant| grant.role_id == role_id)
            .filter_map(|grant| state.permissions.get(&grant.permission_id).cloned())
            .collect())
    }
}

#[async_trait]
impl GroupRepository for FakeRbacStore {
    async fn save_group(&self, group: Group) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.groups.values().any(|existing| {
            existing.name() == group.name() && existing.organization_id() == group.organization_id()
        }) {
            return Err(AppError::Conflict(format!(
                "group '{}' already exists",
                group.name()
            )));
        }
        state.groups.insert(group.id(), group);
        Ok(())
    }

    async fn find_group(&self, group_id: GroupId) -> AppResult<Option<Group>> {
        Ok(self.state.lock().await.groups.get(&group_id).cloned())
    }

    async fn list_groups(&self, organization_id: OrganizationId) -> AppResult<Vec<Group>> {
        let state = self.state.lock().await;
        Ok(state
            .groups
            .values()
            .filter(|group| group.organization_id() == organization_id)
            .cloned()
            .collect())
    }

    async fn upsert_memberships(
        &self,
        _group_id: GroupId,
        memberships: &[GroupMembership],
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        for membership in memberships {
            state.memberships.retain(|existing| {
                (existing.user_id, existing.group_id) != (membership.user_id, membership.group_id)
            });
            state.memberships.push(membership.clone());
        }
        Ok(())
    }

    async fn deactivate_memberships(
        &self,
        group_id: GroupId,
        user_ids: &[UserId],
    ) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let mut changed = 0;
        for membership in state.memberships.iter_mut().filter(|membership| {
            membership.group_id == group_id && user_ids.contains(&membership.user_id)
        }) {
            membership.window.deactivate();
            changed += 1;
        }
        Ok(changed)
    }

    async fn list_memberships(&self, group_id: GroupId) -> AppResult<Vec<GroupMembership>> {
        Ok(self.membership_rows(group_id).await)
    }

    async fn replace_group_roles(
        &self,
        group_id: GroupId,
        grants: &[GroupRoleGrant],
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.group_roles.retain(|grant| grant.group_id != group_id);
        state.group_roles.extend(grants.iter().cloned());
        Ok(())
    }

    async fn replace_group_permissions(
        &self,
        group_id: GroupId,
        grants: &[GroupPermissionGrant],
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.group_permissions.retain(|grant| grant.group_id != group_id);
        state.group_permissions.extend(grants.iter().cloned());
        Ok(())
    }
}

#[async_trait]
impl UserAssignmentRepository for FakeRbacStore {
    async fn replace_user_roles(&self, user_id: UserId, grants: &[UserRoleGrant]) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.user_roles.retain(|grant| grant.user_id != user_id);
        state.user_roles.extend(grants.iter().cloned());
        Ok(())
    }

    async fn replace_user_permissions(
        &self,
        user_id: UserId,
        grants: &[UserPermissionGrant],
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.user_permissions.retain(|grant| grant.user_id != user_id);
        state.user_permissions.extend(grants.iter().cloned());
        Ok(())
    }

    async fn upsert_user_role(&self, grant: UserRoleGrant) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state
            .user_roles
            .retain(|existing| {
                (existing.user_id, existing.role_id) != (grant.user_id, grant.role_id)
            });
        state.user_roles.push(grant);
        Ok(())
    }
}

#[async_trait]
impl AuthorizationRepository for FakeRbacStore {
    async fn load_grant_graph(&self, user_id: UserId) -> AppResult<PrincipalGrantGraph> {
        let state = self.state.lock().await;
        let role = |role_id: RoleId| state.roles.get(&role_id).cloned();
        let permission =
            |permission_id: PermissionId| state.permissions.get(&permission_id).cloned();

        let mut graph = PrincipalGrantGraph {
            direct_permissions: state
                .user_permissions
                .iter()
                .filter(|grant| grant.user_id == user_id)
                .filter_map(|grant| {
                    permission(grant.permission_id).map(|item| Granted::new(grant.window, item))
                })
                .collect(),
            direct_roles: state
                .user_roles
                .iter()
                .filter(|grant| grant.user_id == user_id)
                .filter_map(|grant| {
                    role(grant.role_id).map(|item| Granted::new(grant.window, item))
                })
                .collect(),
            ..PrincipalGrantGraph::default()
        };

        for membership in state.memberships.iter().filter(|row| row.user_id == user_id) {
            let Some(group) = state.groups.get(&membership.group_id).cloned() else {
                continue;
            };
            graph.memberships.push(GroupGrants {
                membership: Granted::new(membership.window, group),
                permissions: state
                    .group_permissions
                    .iter()
                    .filter(|grant| grant.group_id == membership.group_id)
                    .filter_map(|grant| {
                    permission(grant.permission_id).map(|item| Granted::new(grant.window, item))
                })
                    .collect(),
                roles: state
                    .group_roles
                    .iter()
                    .filter(|grant| grant.group_id == membership.group_id)
                    .filter_map(|grant| {
                    role(grant.role_id).map(|item| Granted::new(grant.window, item))
                })
                    .collect(),
            });
        }

        let role_ids: Vec<RoleId> = graph
            .direct_roles
            .iter()
            .chain(graph.memberships.iter().flat_map(|grants| grants.roles.iter()))
            .map(|grant| grant.item.id())
            .collect();
        for role_id in role_ids {
            let permissions = state
                .role_permissions
                .iter()
                .filter(|grant| grant.role_id == role_id)
                .filter_map(|grant| permission(grant.permission_id))
                .collect();
            graph.role_permissions.insert(role_id, permissions);
        }

        Ok(graph)
    }
}

#[async_trait]
impl GrantMaintenanceRepository for FakeRbacStore {
    async fn deactivate_expired_grants(&self, _now: DateTime<Utc>) -> AppResult<ExpiredGrantSweep> {
        Ok(ExpiredGrantSweep::default())
    }
}

/// Fake store plus services wired on top of it.
pub(crate) struct Fixture {
    pub(crate) store: Arc<FakeRbacStore>,
    pub(crate) authorization: AuthorizationService,
    pub(crate) admin: RbacAdminService,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let store = Arc::new(FakeRbacStore::default());
        let authorization = AuthorizationService::new(store.clone());
        let access_map = ResourceAccessMap::default_rules().unwrap_or_else(|_| unreachable!());
        let admin = RbacAdminService::new(
            authorization.clone(),
            Arc::new(access_map),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        );

        Self {
            store,
            authorization,
            admin,
        }
    }

    pub(crate) async fn permission(
        &self,
        resource: &str,
        permission_type: PermissionType,
    ) -> Permission {
        let permission = Permission::new(
            PermissionId::new(),
            PermissionDraft {
                resource: resource.to_owned(),
                permission_type,
                codename: None,
                name: None,
                description: String::new(),
            },
            Utc::now(),
        )
        .unwrap_or_else(|_| unreachable!());
        self.store
            .save_permission(permission.clone())
            .await
            .unwrap_or_else(|_| unreachable!());
        permission
    }

    pub(crate) async fn role(
        &self,
        codename: &str,
        organization_id: Option<OrganizationId>,
        permissions: &[&Permission],
    ) -> Role {
        let role = Role::new(
            RoleId::new(),
            RoleDraft {
                name: codename.to_owned(),
                codename: codename.to_owned(),
                description: String::new(),
                role_type: if organization_id.is_some() {
                    RoleType::Organization
                } else {
                    RoleType::System
                },
                organization_id,
                is_system_role: false,
            },
            Utc::now(),
        )
        .unwrap_or_else(|_| unreachable!());
        self.store
            .save_role(role.clone())
            .await
            .unwrap_or_else(|_| unreachable!());

        let grants: Vec<RolePermissionGrant> = permissions
            .iter()
            .map(|permission| RolePermissionGrant {
                role_id: role.id(),
                permission_id: permission.id(),
                granted_by: None,
                granted_at: Utc::now(),
            })
            .collect();
        self.store
            .replace_role_permissions(role.id(), &grants)
            .await
            .unwrap_or_else(|_| unreachable!());
        role
    }

    pub(crate) async fn group(&self, name: &str, organization_id: OrganizationId) -> Group {
        let group = Group::new(GroupId::new(), name, "", organization_id, None, Utc::now())
            .unwrap_or_else(|_| unreachable!());
        self.store
            .save_group(group.clone())
            .await
            .unwrap_or_else(|_| unreachable!());
        group
    }

    /// Grants `role` to a fresh principal without expiry and returns its identity.
    pub(crate) async fn actor_with_role(
        &self,
        role: &Role,
        organization_id: Option<OrganizationId>,
    ) -> UserIdentity {
        let actor = UserIdentity::new(UserId::new(), "Admin", None, organization_id);
        self.store
            .upsert_user_role(UserRoleGrant {
                user_id: actor.user_id(),
                role_id: role.id(),
                assigned_by: None,
                window: GrantWindow::restore(Utc::now(), None, true),
            })
            .await
            .unwrap_or_else(|_| unreachable!());
        actor
    }
}
