use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use warden_core::{AppError, AppResult};

/// Resource families guarded by administrative operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectedResource {
    /// Permission catalog entries.
    Permission,
    /// Roles and their permission sets.
    Role,
    /// Groups, memberships and group grants.
    Group,
    /// Direct user assignments.
    User,
}

impl ProtectedResource {
    /// Returns a stable value for this resource.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permission => "permission",
            Self::Role => "role",
            Self::Group => "group",
            Self::User => "user",
        }
    }
}

/// Operation attempted on a protected resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceAction {
    /// Create a new instance.
    Create,
    /// Read one instance.
    Read,
    /// Mutate an instance or its assignments.
    Update,
    /// Delete or disable an instance.
    Delete,
    /// Enumerate instances.
    List,
}

impl ResourceAction {
    /// Returns a stable value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::List => "list",
        }
    }
}

/// Codenames a caller must hold to perform one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequirement {
    codenames: BTreeSet<String>,
    require_all: bool,
}

impl AccessRequirement {
    /// Builds a requirement. An empty codename set is rejected so that a
    /// missing rule can never read as "unrestricted".
    pub fn new<I, S>(codenames: I, require_all: bool) -> AppResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let codenames: BTreeSet<String> = codenames.into_iter().map(Into::into).collect();
        if codenames.is_empty() {
            return Err(AppError::Validation(
                "access requirement must name at least one permission".to_owned(),
            ));
        }

        Ok(Self {
            codenames,
            require_all,
        })
    }

    /// Returns the required codenames.
    #[must_use]
    pub fn codenames(&self) -> &BTreeSet<String> {
        &self.codenames
    }

    /// Returns whether every codename is required, or any one suffices.
    #[must_use]
    pub fn require_all(&self) -> bool {
        self.require_all
    }
}

const DEFAULT_RULES: &[(ProtectedResource, ResourceAction, &[&str], bool)] = &[
    (ProtectedResource::Permission, ResourceAction::Read, &["permissions_read"], true),
    (ProtectedResource::Permission, ResourceAction::List, &["permissions_list"], true),
    (ProtectedResource::Permission, ResourceAction::Update, &["permissions_update"], true),
    (ProtectedResource::Role, ResourceAction::Create, &["roles_create"], true),
    (ProtectedResource::Role, ResourceAction::Read, &["roles_read"], true),
    (ProtectedResource::Role, ResourceAction::Update, &["roles_update"], true),
    (ProtectedResource::Role, ResourceAction::Delete, &["roles_delete"], true),
    (ProtectedResource::Role, ResourceAction::List, &["roles_list", "roles_read"], false),
    (ProtectedResource::Group, ResourceAction::Create, &["groups_create"], true),
    (ProtectedResource::Group, ResourceAction::Read, &["groups_read"], true),
    (ProtectedResource::Group, ResourceAction::Update, &["groups_update"], true),
    (ProtectedResource::Group, ResourceAction::Delete, &["groups_delete"], true),
    (ProtectedResource::Group, ResourceAction::List, &["groups_list", "groups_read"], false),
    (ProtectedResource::User, ResourceAction::Read, &["users_read"], true),
    (ProtectedResource::User, ResourceAction::Update, &["users_update"], true),
];

/// Statically declared `(resource, action) -> requirement` table.
///
/// Built once at startup and checked against the permission catalog so a
/// rule naming an unknown codename fails before serving requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceAccessMap {
    rules: BTreeMap<(ProtectedResource, ResourceAction), AccessRequirement>,
}

impl ResourceAccessMap {
    /// Builds a map from explicit rules. Duplicate keys are rejected.
    pub fn from_rules<I>(rules: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (ProtectedResource, ResourceAction, AccessRequirement)>,
    {
        let mut table = BTreeMap::new();
        for (resource, action, requirement) in rules {
            if table.insert((resource, action), requirement).is_some() {
                return Err(AppError::Validation(format!(
                    "duplicate access rule for {}.{}",
                    resource.as_str(),
                    action.as_str()
                )));
            }
        }

        Ok(Self { rules: table })
    }

    /// Returns the built-in rule table for administrative operations.
    pub fn default_rules() -> AppResult<Self> {
        let rules = DEFAULT_RULES
            .iter()
            .map(|(resource, action, codenames, require_all)| {
                AccessRequirement::new(codenames.iter().copied(), *require_all)
                    .map(|requirement| (*resource, *action, requirement))
            })
            .collect::<AppResult<Vec<_>>>()?;

        Self::from_rules(rules)
    }

    /// Returns the requirement for an action. Unmapped actions are a
    /// configuration error, never an implicit allow.
    pub fn requirement(
        &self,
        resource: ProtectedResource,
        action: ResourceAction,
    ) -> AppResult<&AccessRequirement> {
        self.rules.get(&(resource, action)).ok_or_else(|| {
            AppError::Validation(format!(
                "no access rule declared for {}.{}",
                resource.as_str(),
                action.as_str()
            ))
        })
    }

    /// Returns every codename referenced by the table.
    #[must_use]
    pub fn referenced_codenames(&self) -> BTreeSet<&str> {
        self.rules
            .values()
            .flat_map(|requirement| requirement.codenames.iter().map(String::as_str))
            .collect()
    }

    /// Fails with the sorted list of referenced codenames missing from `catalog`.
    pub fn validate_against(&self, catalog: &BTreeSet<String>) -> AppResult<()> {
        let unknown: Vec<&str> = self
            .referenced_codenames()
            .into_iter()
            .filter(|codename| !catalog.contains(*codename))
            .collect();

        if unknown.is_empty() {
            return Ok(());
        }

        Err(AppError::Validation(format!(
            "access map references unknown permissions: {}",
            unknown.join(", ")
        )))
    }
}
