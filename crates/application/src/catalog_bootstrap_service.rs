use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use warden_core::{AppError, AppResult, UserId};
use warden_domain::{
    GrantWindow, Permission, PermissionId, ResourceAccessMap, Role, RoleDraft, RoleId,
    RolePermissionGrant, RoleType, SYSTEM_ROLE_SEEDS, SystemRoleSeed, UserRoleGrant,
    default_permission_drafts,
};

use crate::{PermissionCatalogRepository, PermissionQuery, RoleRepository, UserAssignmentRepository};

/// Counters reported by one bootstrap run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Permissions inserted by this run.
    pub permissions_created: usize,
    /// Permissions that were already registered.
    pub permissions_existing: usize,
    /// System roles inserted by this run.
    pub roles_created: usize,
    /// System roles that were already present.
    pub roles_existing: usize,
}

/// Installs the default catalog and system roles.
#[derive(Clone)]
pub struct CatalogBootstrapService {
    catalog_repository: Arc<dyn PermissionCatalogRepository>,
    role_repository: Arc<dyn RoleRepository>,
    assignment_repository: Arc<dyn UserAssignmentRepository>,
}

impl CatalogBootstrapService {
    /// Creates a new bootstrap service.
    #[must_use]
    pub fn new(
        catalog_repository: Arc<dyn PermissionCatalogRepository>,
        role_repository: Arc<dyn RoleRepository>,
        assignment_repository: Arc<dyn UserAssignmentRepository>,
    ) -> Self {
        Self {
            catalog_repository,
            role_repository,
            assignment_repository,
        }
    }

    /// Get-or-creates every default permission and system role.
    ///
    /// A role receives its permission set only when this run creates it, so
    /// edits made to seeded roles survive re-runs. `reset` wipes permissions
    /// and roles (and every assignment referencing them) first.
    pub async fn seed(&self, reset: bool) -> AppResult<SeedReport> {
        if reset {
            self.catalog_repository.clear_catalog().await?;
            info!("permission catalog and roles cleared");
        }

        let mut report = SeedReport::default();
        let now = Utc::now();

        for draft in default_permission_drafts() {
            let permission = Permission::new(PermissionId::new(), draft, now)?;
            if self
                .catalog_repository
                .find_permission_by_codename(permission.codename())
                .await?
                .is_some()
            {
                report.permissions_existing += 1;
                continue;
            }

            self.catalog_repository
                .save_permission(permission)
                .await?;
            report.permissions_created += 1;
        }

        let catalog = self
            .catalog_repository
            .list_permissions(PermissionQuery::active(None))
            .await?;

        for seed in SYSTEM_ROLE_SEEDS {
            if self
                .role_repository
                .find_role_by_codename(seed.codename, None)
                .await?
                .is_some()
            {
                report.roles_existing += 1;
                continue;
            }

            self.create_system_role(seed, &catalog).await?;
            report.roles_created += 1;
        }

        info!(
            permissions_created = report.permissions_created,
            permissions_existing = report.permissions_existing,
            roles_created = report.roles_created,
            roles_existing = report.roles_existing,
            "catalog bootstrap finished"
        );
        Ok(report)
    }

    /// Assigns a seeded system role to a principal without expiry.
    pub async fn grant_system_role(&self, user_id: UserId, codename: &str) -> AppResult<()> {
        let role = self
            .role_repository
            .find_role_by_codename(codename, None)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("system role '{codename}' does not exist")))?;

        self.assignment_repository
            .upsert_user_role(UserRoleGrant {
                user_id,
                role_id: role.id(),
                assigned_by: None,
                window: GrantWindow::new(Utc::now(), None)?,
            })
            .await?;

        info!(user_id = %user_id, role = codename, "system role granted");
        Ok(())
    }

    /// Builds the resource access map and checks it against the active catalog.
    pub async fn validated_access_map(&self) -> AppResult<ResourceAccessMap> {
        let access_map = ResourceAccessMap::default_rules()?;
        let catalog: BTreeSet<String> = self
            .catalog_repository
            .list_permissions(PermissionQuery::active(None))
            .await?
            .into_iter()
            .map(|permission| permission.codename().to_owned())
            .collect();

        access_map.validate_against(&catalog)?;
        Ok(access_map)
    }

    async fn create_system_role(
        &self,
        seed: &SystemRoleSeed,
        catalog: &[Permission],
    ) -> AppResult<()> {
        let now = Utc::now();
        let role = Role::new(
            RoleId::new(),
            RoleDraft {
                name: seed.name.to_owned(),
                codename: seed.codename.to_owned(),
                description: seed.description.to_owned(),
                role_type: RoleType::System,
                organization_id: None,
                is_system_role: true,
            },
            now,
        )?;
        let role_id = role.id();
        self.role_repository.save_role(role).await?;

        let grants: Vec<RolePermissionGrant> = catalog
            .iter()
            .filter(|permission| seed.permissions.matches(permission))
            .map(|permission| RolePermissionGrant {
                role_id,
                permission_id: permission.id(),
                granted_by: None,
                granted_at: now,
            })
            .collect();
        self.role_repository
            .replace_role_permissions(role_id, &grants)
            .await?;

        info!(
            role = seed.codename,
            permissions = grants.len(),
            "system role created"
        );
        Ok(())
    }
}
