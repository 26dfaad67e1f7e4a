use std::collections::BTreeSet;
use std::fmt::Display;
use std::sync::Arc;

use warden_core::{AppError, AppResult, OrganizationId, UserIdentity};
use warden_domain::{
    Group, GroupId, OrganizationRole, Permission, PermissionId, ProtectedResource,
    ResourceAccessMap, ResourceAction, Role, RoleId, ScopedResource,
};

use crate::{
    AuthorizationService, GroupRepository, PermissionCatalogRepository, RoleRepository,
    UserAssignmentRepository,
};

mod catalog;
mod groups;
mod roles;
mod users;

/// Application service for catalog and assignment administration.
///
/// Every mutation is authorized through the resource access map before it
/// touches a repository.
#[derive(Clone)]
pub struct RbacAdminService {
    authorization_service: AuthorizationService,
    access_map: Arc<ResourceAccessMap>,
    catalog_repository: Arc<dyn PermissionCatalogRepository>,
    role_repository: Arc<dyn RoleRepository>,
    group_repository: Arc<dyn GroupRepository>,
    assignment_repository: Arc<dyn UserAssignmentRepository>,
}

impl RbacAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        access_map: Arc<ResourceAccessMap>,
        catalog_repository: Arc<dyn PermissionCatalogRepository>,
        role_repository: Arc<dyn RoleRepository>,
        group_repository: Arc<dyn GroupRepository>,
        assignment_repository: Arc<dyn UserAssignmentRepository>,
    ) -> Self {
        Self {
            authorization_service,
            access_map,
            catalog_repository,
            role_repository,
            group_repository,
            assignment_repository,
        }
    }

    async fn authorize(
        &self,
        actor: &UserIdentity,
        resource: ProtectedResource,
        action: ResourceAction,
        scope: Option<OrganizationId>,
    ) -> AppResult<()> {
        let requirement = self.access_map.requirement(resource, action)?;
        self.authorization_service
            .require_permissions(actor, requirement, scope)
            .await
    }

    async fn authorize_on(
        &self,
        actor: &UserIdentity,
        resource: ProtectedResource,
        action: ResourceAction,
        target: &(dyn ScopedResource + Sync),
    ) -> AppResult<()> {
        self.authorize(actor, resource, action, Some(target.organization_id()))
            .await
    }

    /// Authorizes a change whose effect holds in every organization.
    async fn authorize_platform(
        &self,
        actor: &UserIdentity,
        resource: ProtectedResource,
        action: ResourceAction,
    ) -> AppResult<()> {
        let requirement = self.access_map.requirement(resource, action)?;
        self.authorization_service
            .require_platform_permissions(actor, requirement)
            .await
    }

    /// Authorizes inside `owner`, or at platform level for ownerless targets.
    async fn authorize_owner(
        &self,
        actor: &UserIdentity,
        resource: ProtectedResource,
        action: ResourceAction,
        owner: Option<OrganizationId>,
    ) -> AppResult<()> {
        match owner {
            Some(organization_id) => {
                self.authorize(actor, resource, action, Some(organization_id))
                    .await
            }
            None => self.authorize_platform(actor, resource, action).await,
        }
    }

    /// Authorizes a change touching `roles`: once per owning organization, and
    /// at platform level when a system role is involved.
    async fn authorize_roles(
        &self,
        actor: &UserIdentity,
        resource: ProtectedResource,
        action: ResourceAction,
        roles: &[Role],
    ) -> AppResult<()> {
        let mut organizations: BTreeSet<OrganizationId> =
            roles.iter().filter_map(Role::organization_id).collect();
        let touches_system = roles.iter().any(|role| role.organization_id().is_none());

        if organizations.is_empty() && !touches_system {
            match actor.organization_id() {
                Some(home) => {
                    organizations.insert(home);
                }
                None => return self.authorize_platform(actor, resource, action).await,
            }
        }
        if touches_system {
            self.authorize_platform(actor, resource, action).await?;
        }
        for organization_id in organizations {
            self.authorize(actor, resource, action, Some(organization_id))
                .await?;
        }

        Ok(())
    }

    async fn existing_role(&self, role_id: RoleId) -> AppResult<Role> {
        self.role_repository
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))
    }

    async fn existing_group(&self, group_id: GroupId) -> AppResult<Group> {
        self.group_repository
            .find_group(group_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("group '{group_id}' does not exist")))
    }

    /// Resolves every id to an active permission or fails the whole request.
    async fn active_permissions(
        &self,
        permission_ids: &[PermissionId],
    ) -> AppResult<Vec<Permission>> {
        reject_duplicates(permission_ids, "permission")?;

        let mut permissions = Vec::with_capacity(permission_ids.len());
        for permission_id in permission_ids {
            match self.catalog_repository.find_permission(*permission_id).await? {
                Some(permission) if permission.is_active() => permissions.push(permission),
                _ => {
                    return Err(AppError::Validation(format!(
                        "permission '{permission_id}' does not exist or is inactive"
                    )));
                }
            }
        }

        Ok(permissions)
    }

    /// Resolves every id to an active role or fails the whole request.
    async fn active_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<Role>> {
        reject_duplicates(role_ids, "role")?;

        let mut roles = Vec::with_capacity(role_ids.len());
        for role_id in role_ids {
            match self.role_repository.find_role(*role_id).await? {
                Some(role) if role.is_active() => roles.push(role),
                _ => {
                    return Err(AppError::Validation(format!(
                        "role '{role_id}' does not exist or is inactive"
                    )));
                }
            }
        }

        Ok(roles)
    }
}

/// Read scope for a role: its owner, or the actor's home organization for
/// system roles.
fn read_scope(actor: &UserIdentity, role: &Role) -> Option<OrganizationId> {
    OrganizationRole::try_from_role(role)
        .ok()
        .map(|scoped| scoped.organization_id())
        .or(actor.organization_id())
}

fn reject_duplicates<T: Ord + Display>(ids: &[T], kind: &str) -> AppResult<()> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(AppError::Validation(format!(
                "{kind} '{id}' is listed more than once"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests;
