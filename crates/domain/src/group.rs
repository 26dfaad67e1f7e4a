use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::{AppResult, NonEmptyString, OrganizationId, UserId};

use crate::{GroupId, ScopedResource};

/// Tenant-scoped collection of principals that can hold roles and permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    id: GroupId,
    name: NonEmptyString,
    description: String,
    organization_id: OrganizationId,
    created_by: Option<UserId>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl Group {
    /// Creates an active group owned by `organization_id`.
    pub fn new(
        id: GroupId,
        name: impl Into<String>,
        description: impl Into<String>,
        organization_id: OrganizationId,
        created_by: Option<UserId>,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        let name = name.into();
        Ok(Self {
            id,
            name: NonEmptyString::new(name.trim())?,
            description: description.into(),
            organization_id,
            created_by,
            is_active: true,
            created_at,
        })
    }

    /// Rebuilds a persisted group.
    pub fn restore(
        id: GroupId,
        name: impl Into<String>,
        description: impl Into<String>,
        organization_id: OrganizationId,
        created_by: Option<UserId>,
        is_active: bool,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        let mut group = Self::new(
            id,
            name,
            description,
            organization_id,
            created_by,
            created_at,
        )?;
        group.is_active = is_active;
        Ok(group)
    }

    /// Returns the group identifier.
    #[must_use]
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Returns the group name, unique within its organization.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the principal who created the group, if still known.
    #[must_use]
    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    /// Returns whether the group is enabled.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Enables or soft-disables the group.
    pub fn set_active(&mut self, is_active: bool) {
        self.is_active = is_active;
    }

    /// Groups are never global: a scoped query only sees groups of that organization.
    #[must_use]
    pub fn visible_in_scope(&self, scope: Option<OrganizationId>) -> bool {
        scope.is_none_or(|organization_id| self.organization_id == organization_id)
    }
}

impl ScopedResource for Group {
    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }
}
