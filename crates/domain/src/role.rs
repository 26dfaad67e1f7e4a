use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::{AppError, AppResult, NonEmptyString, OrganizationId};

use crate::permission::validate_codename;
use crate::{RoleId, ScopedResource};

/// Ownership class of a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleType {
    /// Global role applicable under every organization scope.
    System,
    /// Role owned by one organization.
    Organization,
    /// Organization-owned role defined by tenant administrators.
    Custom,
}

impl RoleType {
    /// Returns a stable storage value for the role type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Organization => "organization",
            Self::Custom => "custom",
        }
    }
}

impl FromStr for RoleType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "system" => Ok(Self::System),
            "organization" => Ok(Self::Organization),
            "custom" => Ok(Self::Custom),
            _ => Err(AppError::Validation(format!("unknown role type '{value}'"))),
        }
    }
}

/// Input used to define a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDraft {
    /// Human-readable role name.
    pub name: String,
    /// Stable codename, unique per organization.
    pub codename: String,
    /// Free-form description.
    pub description: String,
    /// Ownership class.
    pub role_type: RoleType,
    /// Owning organization; must be `None` exactly for system roles.
    pub organization_id: Option<OrganizationId>,
    /// Marks seeded roles that administrators cannot delete.
    pub is_system_role: bool,
}

/// Named bundle of permissions, global or owned by one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: RoleId,
    name: NonEmptyString,
    codename: NonEmptyString,
    description: String,
    role_type: RoleType,
    organization_id: Option<OrganizationId>,
    is_system_role: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl Role {
    /// Creates an active role, enforcing the system/organization ownership invariant.
    pub fn new(id: RoleId, draft: RoleDraft, created_at: DateTime<Utc>) -> AppResult<Self> {
        Self::restore(id, draft, true, created_at)
    }

    /// Rebuilds a persisted role.
    pub fn restore(
        id: RoleId,
        draft: RoleDraft,
        is_active: bool,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        match (draft.role_type, draft.organization_id) {
            (RoleType::System, Some(_)) => {
                return Err(AppError::Validation(
                    "system roles cannot belong to an organization".to_owned(),
                ));
            }
            (RoleType::Organization | RoleType::Custom, None) => {
                return Err(AppError::Validation(
                    "organization and custom roles must belong to an organization".to_owned(),
                ));
            }
            _ => {}
        }

        validate_codename(draft.codename.as_str())?;

        Ok(Self {
            id,
            name: NonEmptyString::new(draft.name.trim())?,
            codename: NonEmptyString::new(draft.codename)?,
            description: draft.description,
            role_type: draft.role_type,
            organization_id: draft.organization_id,
            is_system_role: draft.is_system_role,
            is_active,
            created_at,
        })
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the role name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the role codename.
    #[must_use]
    pub fn codename(&self) -> &str {
        self.codename.as_str()
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the ownership class.
    #[must_use]
    pub fn role_type(&self) -> RoleType {
        self.role_type
    }

    /// Returns the owning organization, `None` for system roles.
    #[must_use]
    pub fn organization_id(&self) -> Option<OrganizationId> {
        self.organization_id
    }

    /// Returns whether the role was seeded and is protected from deletion.
    #[must_use]
    pub fn is_system_role(&self) -> bool {
        self.is_system_role
    }

    /// Returns whether the role is enabled.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Enables or soft-disables the role.
    pub fn set_active(&mut self, is_active: bool) {
        self.is_active = is_active;
    }

    /// Returns whether grants of this role are visible under `scope`.
    ///
    /// System roles apply everywhere; other roles only inside their organization.
    /// A `None` scope applies no organization filter.
    #[must_use]
    pub fn applies_in_scope(&self, scope: Option<OrganizationId>) -> bool {
        match scope {
            None => true,
            Some(organization_id) => {
                self.role_type == RoleType::System || self.organization_id == Some(organization_id)
            }
        }
    }
}

/// Organization roles are tenant-scoped resources; system roles are not.
pub struct OrganizationRole<'a>(&'a Role, OrganizationId);

impl<'a> OrganizationRole<'a> {
    /// Wraps a role that belongs to an organization.
    pub fn try_from_role(role: &'a Role) -> AppResult<Self> {
        role.organization_id
            .map(|organization_id| Self(role, organization_id))
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "role '{}' is a system role and has no organization scope",
                    role.codename()
                ))
            })
    }

    /// Returns the wrapped role.
    #[must_use]
    pub fn role(&self) -> &Role {
        self.0
    }
}

impl ScopedResource for OrganizationRole<'_> {
    fn organization_id(&self) -> OrganizationId {
        self.1
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use warden_core::{AppError, OrganizationId};

    use super::{OrganizationRole, Role, RoleDraft, RoleType};
    use crate::{RoleId, ScopedResource};

    fn draft(role_type: RoleType, organization_id: Option<OrganizationId>) -> RoleDraft {
        RoleDraft {
            name: "Editor".to_owned(),
            codename: "editor".to_owned(),
            description: String::new(),
            role_type,
            organization_id,
            is_system_role: false,
        }
    }

    #[test]
    fn system_role_with_organization_is_rejected() {
        let role = Role::new(
            RoleId::new(),
            draft(RoleType::System, Some(OrganizationId::new())),
            Utc::now(),
        );
        assert!(matches!(role, Err(AppError::Validation(_))));
    }

    #[test]
    fn organization_and_custom_roles_require_organization() {
        for role_type in [RoleType::Organization, RoleType::Custom] {
            let role = Role::new(RoleId::new(), draft(role_type, None), Utc::now());
            assert!(matches!(role, Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn system_role_applies_in_every_scope() {
        let role = Role::new(RoleId::new(), draft(RoleType::System, None), Utc::now())
            .unwrap_or_else(|_| unreachable!());

        assert!(role.applies_in_scope(None));
        assert!(role.applies_in_scope(Some(OrganizationId::new())));
    }

    #[test]
    fn organization_role_applies_only_in_its_organization() {
        let home = OrganizationId::new();
        let role = Role::new(
            RoleId::new(),
            draft(RoleType::Organization, Some(home)),
            Utc::now(),
        )
        .unwrap_or_else(|_| unreachable!());

        assert!(role.applies_in_scope(None));
        assert!(role.applies_in_scope(Some(home)));
        assert!(!role.applies_in_scope(Some(OrganizationId::new())));
    }

    #[test]
    fn organization_role_exposes_tenant_scope() {
        let home = OrganizationId::new();
        let role = Role::new(RoleId::new(), draft(RoleType::Custom, Some(home)), Utc::now())
            .unwrap_or_else(|_| unreachable!());
        let scoped = OrganizationRole::try_from_role(&role);
        assert!(scoped.is_ok());
        assert_eq!(scoped.map(|value| value.organization_id()).ok(), Some(home));

        let system = Role::new(RoleId::new(), draft(RoleType::System, None), Utc::now())
            .unwrap_or_else(|_| unreachable!());
        assert!(OrganizationRole::try_from_role(&system).is_err());
    }
}
