use warden_application::AuthorizationRepository;
use warden_domain::{GrantWindow, GroupGrants, Granted, PrincipalGrantGraph};

use super::*;

impl RbacTables {
    fn granted_role(&self, role_id: RoleId, window: GrantWindow) -> Option<Granted<Role>> {
        self.roles
            .get(&role_id)
            .map(|role| Granted::new(window, role.clone()))
    }

    fn granted_permission(
        &self,
        permission_id: PermissionId,
        window: GrantWindow,
    ) -> Option<Granted<Permission>> {
        self.permissions
            .get(&permission_id)
            .map(|permission| Granted::new(window, permission.clone()))
    }

    fn group_grants(&self, membership: &GroupMembership) -> Option<GroupGrants> {
        let group = self.groups.get(&membership.group_id)?;
        let group_id = membership.group_id;

        Some(GroupGrants {
            membership: Granted::new(membership.window, group.clone()),
            permissions: self
                .group_permissions
                .values()
                .filter(|grant| grant.group_id == group_id)
                .filter_map(|grant| self.granted_permission(grant.permission_id, grant.window))
                .collect(),
            roles: self
                .group_roles
                .values()
                .filter(|grant| grant.group_id == group_id)
                .filter_map(|grant| self.granted_role(grant.role_id, grant.window))
                .collect(),
        })
    }

    fn role_permission_sets(
        &self,
        roles: impl Iterator<Item = RoleId>,
    ) -> BTreeMap<RoleId, Vec<Permission>> {
        roles
            .map(|role_id| {
                let permissions = self
                    .role_permissions
                    .keys()
                    .filter(|(stored_role_id, _)| *stored_role_id == role_id)
                    .filter_map(|(_, permission_id)| self.permissions.get(permission_id).cloned())
                    .collect();
                (role_id, permissions)
            })
            .collect()
    }
}

#[async_trait]
impl AuthorizationRepository for InMemoryRbacRepository {
    async fn load_grant_graph(&self, user_id: UserId) -> AppResult<PrincipalGrantGraph> {
        let tables = self.tables.read().await;

        let direct_permissions: Vec<Granted<Permission>> = tables
            .user_permissions
            .values()
            .filter(|grant| grant.user_id == user_id)
            .filter_map(|grant| tables.granted_permission(grant.permission_id, grant.window))
            .collect();
        let direct_roles: Vec<Granted<Role>> = tables
            .user_roles
            .values()
            .filter(|grant| grant.user_id == user_id)
            .filter_map(|grant| tables.granted_role(grant.role_id, grant.window))
            .collect();
        let memberships: Vec<GroupGrants> = tables
            .memberships
            .values()
            .filter(|membership| membership.user_id == user_id)
            .filter_map(|membership| tables.group_grants(membership))
            .collect();

        let referenced_roles = direct_roles
            .iter()
            .chain(memberships.iter().flat_map(|grants| grants.roles.iter()))
            .map(|granted| granted.item.id());
        let role_permissions = tables.role_permission_sets(referenced_roles);

        Ok(PrincipalGrantGraph {
            direct_permissions,
            direct_roles,
            memberships,
            role_permissions,
        })
    }
}
