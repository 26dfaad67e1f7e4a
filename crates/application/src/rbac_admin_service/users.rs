use chrono::{DateTime, Utc};
use tracing::info;
use warden_core::UserId;
use warden_domain::{GrantWindow, UserPermissionGrant, UserRoleGrant};

use super::*;

impl RbacAdminService {
    /// Replaces every direct role of `user_id` with exactly `role_ids`.
    ///
    /// Organization roles must belong to the actor's organization. The actor
    /// needs authority in every organization whose roles are granted or
    /// revoked, and platform authority whenever a system role is involved.
    pub async fn assign_user_roles(
        &self,
        actor: &UserIdentity,
        user_id: UserId,
        role_ids: &[RoleId],
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        let roles = self.active_roles(role_ids).await?;
        if let Some(foreign) = roles.iter().find(|role| {
            role.organization_id().is_some_and(|owner| actor.organization_id() != Some(owner))
        }) {
            return Err(AppError::Validation(format!(
                "role '{}' is outside the actor's organization",
                foreign.codename()
            )));
        }

        let mut touched = self
            .authorization_service
            .direct_role_grants(user_id)
            .await?;
        touched.extend(roles.iter().cloned());
        self.authorize_roles(actor, ProtectedResource::User, ResourceAction::Update, &touched)
            .await?;

        let window = GrantWindow::new(Utc::now(), expires_at)?;
        let grants: Vec<UserRoleGrant> = roles
            .iter()
            .map(|role| UserRoleGrant {
                user_id,
                role_id: role.id(),
                assigned_by: Some(actor.user_id()),
                window,
            })
            .collect();

        self.assignment_repository
            .replace_user_roles(user_id, &grants)
            .await?;

        info!(
            user_id = %user_id,
            roles = grants.len(),
            actor = %actor.user_id(),
            "user roles replaced"
        );
        Ok(())
    }

    /// Replaces every direct permission of `user_id` with exactly `permission_ids`.
    ///
    /// Direct permissions hold in every organization, so only platform
    /// authority may change them.
    pub async fn assign_user_permissions(
        &self,
        actor: &UserIdentity,
        user_id: UserId,
        permission_ids: &[PermissionId],
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        self.authorize_platform(actor, ProtectedResource::User, ResourceAction::Update)
            .await?;

        let permissions = self.active_permissions(permission_ids).await?;
        let window = GrantWindow::new(Utc::now(), expires_at)?;
        let grants: Vec<UserPermissionGrant> = permissions
            .iter()
            .map(|permission| UserPermissionGrant {
                user_id,
                permission_id: permission.id(),
                granted_by: Some(actor.user_id()),
                window,
            })
            .collect();

        self.assignment_repository
            .replace_user_permissions(user_id, &grants)
            .await?;

        info!(
            user_id = %user_id,
            permissions = grants.len(),
            actor = %actor.user_id(),
            "user permissions replaced"
        );
        Ok(())
    }
}
