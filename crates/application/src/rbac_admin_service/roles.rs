use chrono::Utc;
use tracing::info;
use warden_domain::{RoleDraft, RolePermissionGrant, RoleType};

use super::*;

use crate::CreateRoleInput;

impl RbacAdminService {
    /// Defines a role. System roles must be ownerless; every other role needs an organization.
    ///
    /// Ownerless roles apply in every organization and need platform authority.
    pub async fn create_role(
        &self,
        actor: &UserIdentity,
        input: CreateRoleInput,
    ) -> AppResult<Role> {
        self.authorize_owner(
            actor,
            ProtectedResource::Role,
            ResourceAction::Create,
            input.organization_id,
        )
        .await?;

        let role = Role::new(
            RoleId::new(),
            RoleDraft {
                name: input.name,
                codename: input.codename,
                description: input.description,
                role_type: input.role_type,
                organization_id: input.organization_id,
                is_system_role: false,
            },
            Utc::now(),
        )?;
        self.role_repository.save_role(role.clone()).await?;

        info!(
            role_id = %role.id(),
            codename = role.codename(),
            role_type = role.role_type().as_str(),
            actor = %actor.user_id(),
            "role created"
        );
        Ok(role)
    }

    /// Replaces the role's permission set with exactly `permission_ids`.
    ///
    /// System roles are shared by every tenant and need platform authority.
    pub async fn assign_role_permissions(
        &self,
        actor: &UserIdentity,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        let role = self.existing_role(role_id).await?;
        self.authorize_owner(
            actor,
            ProtectedResource::Role,
            ResourceAction::Update,
            role.organization_id(),
        )
        .await?;

        let permissions = self.active_permissions(permission_ids).await?;
        let granted_at = Utc::now();
        let grants: Vec<RolePermissionGrant> = permissions
            .iter()
            .map(|permission| RolePermissionGrant {
                role_id,
                permission_id: permission.id(),
                granted_by: Some(actor.user_id()),
                granted_at,
            })
            .collect();

        self.role_repository
            .replace_role_permissions(role_id, &grants)
            .await?;

        info!(
            role_id = %role_id,
            permissions = grants.len(),
            actor = %actor.user_id(),
            "role permissions replaced"
        );
        Ok(())
    }

    /// Lists the active permissions of a role.
    pub async fn list_role_permissions(
        &self,
        actor: &UserIdentity,
        role_id: RoleId,
    ) -> AppResult<Vec<Permission>> {
        let role = self.existing_role(role_id).await?;
        self.authorize(
            actor,
            ProtectedResource::Role,
            ResourceAction::Read,
            read_scope(actor, &role),
        )
        .await?;

        let permissions = self.role_repository.list_role_permissions(role_id).await?;
        Ok(permissions
            .into_iter()
            .filter(|permission| permission.is_active())
            .collect())
    }

    /// Lists roles applicable under `scope`: its organization roles plus every system role.
    pub async fn list_roles(
        &self,
        actor: &UserIdentity,
        scope: Option<OrganizationId>,
    ) -> AppResult<Vec<Role>> {
        self.authorize(actor, ProtectedResource::Role, ResourceAction::List, scope)
            .await?;
        self.role_repository.list_roles(scope).await
    }

    /// Lists global roles only.
    pub async fn list_system_roles(&self, actor: &UserIdentity) -> AppResult<Vec<Role>> {
        self.authorize(
            actor,
            ProtectedResource::Role,
            ResourceAction::List,
            actor.organization_id(),
        )
        .await?;

        let roles = self.role_repository.list_roles(None).await?;
        Ok(roles
            .into_iter()
            .filter(|role| role.role_type() == RoleType::System)
            .collect())
    }
}
