use chrono::{DateTime, Utc};
use tracing::info;
use warden_core::UserId;
use warden_domain::{GrantWindow, GroupMembership, GroupPermissionGrant, GroupRoleGrant};

use super::*;

use crate::CreateGroupInput;

impl RbacAdminService {
    /// Defines a group inside one organization.
    pub async fn create_group(
        &self,
        actor: &UserIdentity,
        input: CreateGroupInput,
    ) -> AppResult<Group> {
        self.authorize_on(
            actor,
            ProtectedResource::Group,
            ResourceAction::Create,
            &input.organization_id,
        )
        .await?;

        let group = Group::new(
            GroupId::new(),
            input.name,
            input.description,
            input.organization_id,
            Some(actor.user_id()),
            Utc::now(),
        )?;
        self.group_repository.save_group(group.clone()).await?;

        info!(
            group_id = %group.id(),
            organization_id = %input.organization_id,
            actor = %actor.user_id(),
            "group created"
        );
        Ok(group)
    }

    /// Adds users to a group. Existing memberships are reactivated and their
    /// provenance and expiry overwritten.
    pub async fn add_group_members(
        &self,
        actor: &UserIdentity,
        group_id: GroupId,
        user_ids: &[UserId],
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        let group = self.existing_group(group_id).await?;
        self.authorize_on(actor, ProtectedResource::Group, ResourceAction::Update, &group)
            .await?;

        if user_ids.is_empty() {
            return Err(AppError::Validation(
                "at least one user id is required".to_owned(),
            ));
        }
        reject_duplicates(user_ids, "user")?;

        let window = GrantWindow::new(Utc::now(), expires_at)?;
        let memberships: Vec<GroupMembership> = user_ids
            .iter()
            .map(|user_id| GroupMembership {
                user_id: *user_id,
                group_id,
                added_by: Some(actor.user_id()),
                window,
            })
            .collect();

        self.group_repository
            .upsert_memberships(group_id, &memberships)
            .await?;

        info!(
            group_id = %group_id,
            members = memberships.len(),
            actor = %actor.user_id(),
            "group members added"
        );
        Ok(())
    }

    /// Soft-disables memberships, keeping the rows as history.
    pub async fn remove_group_members(
        &self,
        actor: &UserIdentity,
        group_id: GroupId,
        user_ids: &[UserId],
    ) -> AppResult<u64> {
        let group = self.existing_group(group_id).await?;
        self.authorize_on(actor, ProtectedResource::Group, ResourceAction::Update, &group)
            .await?;

        if user_ids.is_empty() {
            return Err(AppError::Validation(
                "at least one user id is required".to_owned(),
            ));
        }

        let removed = self
            .group_repository
            .deactivate_memberships(group_id, user_ids)
            .await?;

        info!(
            group_id = %group_id,
            removed,
            actor = %actor.user_id(),
            "group members removed"
        );
        Ok(removed)
    }

    /// Lists memberships currently in effect.
    pub async fn list_group_members(
        &self,
        actor: &UserIdentity,
        group_id: GroupId,
    ) -> AppResult<Vec<GroupMembership>> {
        let group = self.existing_group(group_id).await?;
        self.authorize_on(actor, ProtectedResource::Group, ResourceAction::Read, &group)
            .await?;

        let now = Utc::now();
        let memberships = self.group_repository.list_memberships(group_id).await?;
        Ok(memberships
            .into_iter()
            .filter(|membership| membership.window.is_effective_at(now))
            .collect())
    }

    /// Lists the groups of an organization.
    pub async fn list_groups(
        &self,
        actor: &UserIdentity,
        organization_id: OrganizationId,
    ) -> AppResult<Vec<Group>> {
        self.authorize_on(
            actor,
            ProtectedResource::Group,
            ResourceAction::List,
            &organization_id,
        )
        .await?;
        self.group_repository.list_groups(organization_id).await
    }

    /// Replaces the group's role set with exactly `role_ids`.
    ///
    /// Only system roles and roles of the group's own organization qualify.
    pub async fn assign_group_roles(
        &self,
        actor: &UserIdentity,
        group_id: GroupId,
        role_ids: &[RoleId],
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        let group = self.existing_group(group_id).await?;
        self.authorize_on(actor, ProtectedResource::Group, ResourceAction::Update, &group)
            .await?;

        let roles = self.active_roles(role_ids).await?;
        if let Some(foreign) = roles
            .iter()
            .find(|role| !role.applies_in_scope(Some(group.organization_id())))
        {
            return Err(AppError::Validation(format!(
                "role '{}' belongs to another organization than group '{group_id}'",
                foreign.codename()
            )));
        }

        let window = GrantWindow::new(Utc::now(), expires_at)?;
        let grants: Vec<GroupRoleGrant> = roles
            .iter()
            .map(|role| GroupRoleGrant {
                group_id,
                role_id: role.id(),
                assigned_by: Some(actor.user_id()),
                window,
            })
            .collect();

        self.group_repository
            .replace_group_roles(group_id, &grants)
            .await?;

        info!(
            group_id = %group_id,
            roles = grants.len(),
            actor = %actor.user_id(),
            "group roles replaced"
        );
        Ok(())
    }

    /// Replaces the group's direct permission set with exactly `permission_ids`.
    pub async fn assign_group_permissions(
        &self,
        actor: &UserIdentity,
        group_id: GroupId,
        permission_ids: &[PermissionId],
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        let group = self.existing_group(group_id).await?;
        self.authorize_on(actor, ProtectedResource::Group, ResourceAction::Update, &group)
            .await?;

        let permissions = self.active_permissions(permission_ids).await?;
        let window = GrantWindow::new(Utc::now(), expires_at)?;
        let grants: Vec<GroupPermissionGrant> = permissions
            .iter()
            .map(|permission| GroupPermissionGrant {
                group_id,
                permission_id: permission.id(),
                granted_by: Some(actor.user_id()),
                window,
            })
            .collect();

        self.group_repository
            .replace_group_permissions(group_id, &grants)
            .await?;

        info!(
            group_id = %group_id,
            permissions = grants.len(),
            actor = %actor.user_id(),
            "group permissions replaced"
        );
        Ok(())
    }
}
