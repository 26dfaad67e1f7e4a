use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use warden_core::{AppError, AppResult, OrganizationId, UserId, UserIdentity};
use warden_domain::{AccessRequirement, GroupSummary, Role, RoleSummary, ScopedResource};

use crate::AuthorizationRepository;

mod gate;

pub use gate::satisfies;

/// Effective codenames plus the roles and groups contributing them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionDetails {
    /// Sorted effective codenames.
    pub permissions: Vec<String>,
    /// Roles assigned directly to the principal.
    pub roles: Vec<RoleSummary>,
    /// Groups the principal belongs to.
    pub groups: Vec<GroupSummary>,
}

/// Application service resolving effective permissions and gating access.
#[derive(Clone)]
pub struct AuthorizationService {
    repository: Arc<dyn AuthorizationRepository>,
}

impl AuthorizationService {
    /// Creates a new authorization service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AuthorizationRepository>) -> Self {
        Self { repository }
    }

    /// Returns the principal's effective codenames under `scope` right now.
    pub async fn effective_permissions(
        &self,
        user_id: UserId,
        scope: Option<OrganizationId>,
    ) -> AppResult<BTreeSet<String>> {
        self.effective_permissions_at(user_id, scope, Utc::now())
            .await
    }

    /// Returns the principal's effective codenames under `scope` at `now`.
    pub async fn effective_permissions_at(
        &self,
        user_id: UserId,
        scope: Option<OrganizationId>,
        now: DateTime<Utc>,
    ) -> AppResult<BTreeSet<String>> {
        let graph = self.repository.load_grant_graph(user_id).await?;
        Ok(graph.effective_permissions(scope, now))
    }

    /// Returns roles assigned directly to the principal and visible under `scope`.
    pub async fn user_roles(
        &self,
        user_id: UserId,
        scope: Option<OrganizationId>,
    ) -> AppResult<Vec<RoleSummary>> {
        let graph = self.repository.load_grant_graph(user_id).await?;
        Ok(graph.visible_roles(scope, Utc::now()))
    }

    /// Returns groups the principal belongs to under `scope`.
    pub async fn user_groups(
        &self,
        user_id: UserId,
        scope: Option<OrganizationId>,
    ) -> AppResult<Vec<GroupSummary>> {
        let graph = self.repository.load_grant_graph(user_id).await?;
        Ok(graph.visible_groups(scope, Utc::now()))
    }

    /// Returns codenames, roles and groups from a single snapshot.
    pub async fn permission_details(
        &self,
        user_id: UserId,
        scope: Option<OrganizationId>,
    ) -> AppResult<PermissionDetails> {
        let graph = self.repository.load_grant_graph(user_id).await?;
        let now = Utc::now();

        Ok(PermissionDetails {
            permissions: graph.effective_permissions(scope, now).into_iter().collect(),
            roles: graph.visible_roles(scope, now),
            groups: graph.visible_groups(scope, now),
        })
    }

    /// Decides whether `principal` satisfies `required` under `scope`.
    ///
    /// Unauthenticated callers are refused without resolving anything; an
    /// empty requirement always passes for authenticated callers.
    pub async fn permit<S: AsRef<str> + Sync>(
        &self,
        principal: Option<&UserIdentity>,
        required: &[S],
        require_all: bool,
        scope: Option<OrganizationId>,
    ) -> AppResult<bool> {
        let Some(principal) = principal else {
            return Ok(false);
        };

        if required.is_empty() {
            return Ok(true);
        }

        let effective = self
            .effective_permissions(principal.user_id(), scope)
            .await?;
        Ok(satisfies(&effective, required, require_all))
    }

    /// Like [`Self::permit`] with the scope taken from the resource's owner.
    pub async fn permit_resource<S: AsRef<str> + Sync>(
        &self,
        principal: Option<&UserIdentity>,
        required: &[S],
        require_all: bool,
        resource: &(dyn ScopedResource + Sync),
    ) -> AppResult<bool> {
        self.permit(
            principal,
            required,
            require_all,
            Some(resource.organization_id()),
        )
        .await
    }

    /// Returns whether the principal holds `codename`.
    pub async fn has_permission(
        &self,
        user_id: UserId,
        codename: &str,
        scope: Option<OrganizationId>,
    ) -> AppResult<bool> {
        let effective = self.effective_permissions(user_id, scope).await?;
        Ok(effective.contains(codename))
    }

    /// Returns whether the principal holds at least one of `codenames`.
    pub async fn has_any_permission(
        &self,
        user_id: UserId,
        codenames: &[&str],
        scope: Option<OrganizationId>,
    ) -> AppResult<bool> {
        let effective = self.effective_permissions(user_id, scope).await?;
        Ok(codenames.iter().any(|codename| effective.contains(*codename)))
    }

    /// Returns whether the principal holds every one of `codenames`.
    pub async fn has_all_permissions(
        &self,
        user_id: UserId,
        codenames: &[&str],
        scope: Option<OrganizationId>,
    ) -> AppResult<bool> {
        let effective = self.effective_permissions(user_id, scope).await?;
        Ok(codenames.iter().all(|codename| effective.contains(*codename)))
    }

    /// Returns the codenames the principal holds across every organization.
    pub async fn platform_permissions(&self, user_id: UserId) -> AppResult<BTreeSet<String>> {
        let graph = self.repository.load_grant_graph(user_id).await?;
        Ok(graph.platform_permissions(Utc::now()))
    }

    /// Returns every role granted directly to the principal, expired or not.
    pub async fn direct_role_grants(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        let graph = self.repository.load_grant_graph(user_id).await?;
        Ok(graph
            .direct_roles
            .into_iter()
            .map(|grant| grant.item)
            .collect())
    }

    /// Ensures the actor meets an access requirement, failing with `Forbidden`.
    pub async fn require_permissions(
        &self,
        actor: &UserIdentity,
        requirement: &AccessRequirement,
        scope: Option<OrganizationId>,
    ) -> AppResult<()> {
        let required: Vec<&str> = requirement.codenames().iter().map(String::as_str).collect();
        if self
            .permit(Some(actor), &required, requirement.require_all(), scope)
            .await?
        {
            return Ok(());
        }

        let scope_label = scope
            .map(|organization_id| format!("organization '{organization_id}'"))
            .unwrap_or_else(|| "any organization".to_owned());
        Err(denied(actor, requirement, &scope_label))
    }

    /// Like [`Self::require_permissions`] but counting only grants that hold
    /// in every organization.
    pub async fn require_platform_permissions(
        &self,
        actor: &UserIdentity,
        requirement: &AccessRequirement,
    ) -> AppResult<()> {
        let required: Vec<&str> = requirement.codenames().iter().map(String::as_str).collect();
        let effective = self.platform_permissions(actor.user_id()).await?;
        if satisfies(&effective, &required, requirement.require_all()) {
            return Ok(());
        }

        Err(denied(actor, requirement, "every organization"))
    }
}

fn denied(actor: &UserIdentity, requirement: &AccessRequirement, scope_label: &str) -> AppError {
    let policy = if requirement.require_all() {
        "all of"
    } else {
        "one of"
    };
    let required: Vec<&str> = requirement.codenames().iter().map(String::as_str).collect();
    AppError::Forbidden(format!(
        "user '{}' requires {policy} [{}] in {scope_label}",
        actor.user_id(),
        required.join(", ")
    ))
}
