use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::{AppError, AppResult, NonEmptyString};

use crate::PermissionId;

/// Action category a permission governs on its resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
    /// Allows creating resources.
    Create,
    /// Allows reading a single resource.
    Read,
    /// Allows mutating resources.
    Update,
    /// Allows deleting resources.
    Delete,
    /// Allows listing resources.
    List,
    /// Allows administrative management of a resource family.
    Manage,
}

impl PermissionType {
    /// Returns a stable storage value for this permission type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::List => "list",
            Self::Manage => "manage",
        }
    }

    /// Returns all known permission types.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[PermissionType] = &[
            PermissionType::Create,
            PermissionType::Read,
            PermissionType::Update,
            PermissionType::Delete,
            PermissionType::List,
            PermissionType::Manage,
        ];

        ALL
    }
}

impl FromStr for PermissionType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "list" => Ok(Self::List),
            "manage" => Ok(Self::Manage),
            _ => Err(AppError::Validation(format!(
                "unknown permission type '{value}'"
            ))),
        }
    }
}

/// Input used to register a permission in the catalog.
///
/// `codename` and `name` default to `{resource}_{type}` and `{resource}:{type}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDraft {
    /// Resource (model) the permission governs.
    pub resource: String,
    /// Action category.
    pub permission_type: PermissionType,
    /// Optional explicit codename.
    pub codename: Option<String>,
    /// Optional explicit human label.
    pub name: Option<String>,
    /// Free-form description.
    pub description: String,
}

/// Catalog entry describing one grantable permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    id: PermissionId,
    codename: NonEmptyString,
    name: NonEmptyString,
    description: String,
    permission_type: PermissionType,
    resource: NonEmptyString,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl Permission {
    /// Creates an active permission from a draft.
    pub fn new(
        id: PermissionId,
        draft: PermissionDraft,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        let resource = NonEmptyString::new(draft.resource.trim())?;
        let codename = draft.codename.unwrap_or_else(|| {
            format!("{}_{}", resource.as_str(), draft.permission_type.as_str())
        });
        validate_codename(codename.as_str())?;
        let name = draft
            .name
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| {
                format!("{}:{}", resource.as_str(), draft.permission_type.as_str())
            });

        Ok(Self {
            id,
            codename: NonEmptyString::new(codename)?,
            name: NonEmptyString::new(name)?,
            description: draft.description,
            permission_type: draft.permission_type,
            resource,
            is_active: true,
            created_at,
        })
    }

    /// Rebuilds a persisted permission.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: PermissionId,
        codename: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        permission_type: PermissionType,
        resource: impl Into<String>,
        is_active: bool,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            codename: NonEmptyString::new(codename)?,
            name: NonEmptyString::new(name)?,
            description: description.into(),
            permission_type,
            resource: NonEmptyString::new(resource)?,
            is_active,
            created_at,
        })
    }

    /// Returns the permission identifier.
    #[must_use]
    pub fn id(&self) -> PermissionId {
        self.id
    }

    /// Returns the stable codename (e.g. `users_create`).
    #[must_use]
    pub fn codename(&self) -> &str {
        self.codename.as_str()
    }

    /// Returns the human label.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the action category.
    #[must_use]
    pub fn permission_type(&self) -> PermissionType {
        self.permission_type
    }

    /// Returns the governed resource.
    #[must_use]
    pub fn resource(&self) -> &str {
        self.resource.as_str()
    }

    /// Returns whether the permission is currently enabled.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Enables or soft-disables the permission.
    pub fn set_active(&mut self, is_active: bool) {
        self.is_active = is_active;
    }
}

/// Validates the codename alphabet shared by permissions and roles.
pub fn validate_codename(value: &str) -> AppResult<()> {
    if value.is_empty() {
        return Err(AppError::Validation("codename must not be empty".to_owned()));
    }

    let is_valid = value.chars().all(|character| {
        character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_'
    });
    if !is_valid {
        return Err(AppError::Validation(format!(
            "codename '{value}' must contain only lowercase letters, digits and underscores"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::Utc;

    use super::{Permission, PermissionDraft, PermissionType};
    use crate::PermissionId;

    fn draft(resource: &str, permission_type: PermissionType) -> PermissionDraft {
        PermissionDraft {
            resource: resource.to_owned(),
            permission_type,
            codename: None,
            name: None,
            description: String::new(),
        }
    }

    #[test]
    fn permission_type_roundtrip_storage_value() {
        for permission_type in PermissionType::all() {
            let restored = PermissionType::from_str(permission_type.as_str());
            assert_eq!(restored.ok(), Some(*permission_type));
        }
    }

    #[test]
    fn unknown_permission_type_is_rejected() {
        assert!(PermissionType::from_str("approve").is_err());
    }

    #[test]
    fn missing_codename_and_name_are_derived_from_resource_and_type() {
        let permission = Permission::new(
            PermissionId::new(),
            draft("docs", PermissionType::Update),
            Utc::now(),
        );
        assert!(permission.is_ok());
        let permission = permission.unwrap_or_else(|_| unreachable!());

        assert_eq!(permission.codename(), "docs_update");
        assert_eq!(permission.name(), "docs:update");
        assert!(permission.is_active());
    }

    #[test]
    fn codename_with_invalid_characters_is_rejected() {
        let mut input = draft("docs", PermissionType::Read);
        input.codename = Some("Docs Read".to_owned());

        let permission = Permission::new(PermissionId::new(), input, Utc::now());
        assert!(permission.is_err());
    }

    #[test]
    fn blank_resource_is_rejected() {
        let permission = Permission::new(
            PermissionId::new(),
            draft("  ", PermissionType::Read),
            Utc::now(),
        );
        assert!(permission.is_err());
    }
}
