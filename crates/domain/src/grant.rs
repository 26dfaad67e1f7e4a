use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::{AppError, AppResult, UserId};

use crate::{GroupId, PermissionId, RoleId};

/// Temporal validity and soft-disable state shared by every expiring grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantWindow {
    granted_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
}

impl GrantWindow {
    /// Creates an active window. `expires_at` must be strictly after `granted_at`.
    pub fn new(granted_at: DateTime<Utc>, expires_at: Option<DateTime<Utc>>) -> AppResult<Self> {
        if let Some(expires_at) = expires_at
            && expires_at <= granted_at
        {
            return Err(AppError::Validation(format!(
                "expiration '{}' must be after grant time '{}'",
                expires_at.to_rfc3339(),
                granted_at.to_rfc3339()
            )));
        }

        Ok(Self {
            granted_at,
            expires_at,
            is_active: true,
        })
    }

    /// Rebuilds a persisted window without re-validating it.
    #[must_use]
    pub fn restore(
        granted_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
        is_active: bool,
    ) -> Self {
        Self {
            granted_at,
            expires_at,
            is_active,
        }
    }

    /// Returns when the grant was made.
    #[must_use]
    pub fn granted_at(&self) -> DateTime<Utc> {
        self.granted_at
    }

    /// Returns the optional expiry.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns the soft-disable flag.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// `is_active AND (expires_at IS NULL OR expires_at > now)`.
    #[must_use]
    pub fn is_effective_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired_at(now)
    }

    /// Returns whether the expiry has been reached at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Soft-disables the grant while keeping its history.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }
}

/// Structural grant of a permission to a role. Never expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissionGrant {
    /// Role receiving the permission.
    pub role_id: RoleId,
    /// Granted permission.
    pub permission_id: PermissionId,
    /// Principal that made the grant.
    pub granted_by: Option<UserId>,
    /// Grant timestamp.
    pub granted_at: DateTime<Utc>,
}

/// Direct assignment of a role to a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRoleGrant {
    /// Principal receiving the role.
    pub user_id: UserId,
    /// Assigned role.
    pub role_id: RoleId,
    /// Principal that made the assignment.
    pub assigned_by: Option<UserId>,
    /// Assignment validity; `granted_at` is the assignment time.
    pub window: GrantWindow,
}

/// Direct grant of a permission to a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPermissionGrant {
    /// Principal receiving the permission.
    pub user_id: UserId,
    /// Granted permission.
    pub permission_id: PermissionId,
    /// Principal that made the grant.
    pub granted_by: Option<UserId>,
    /// Grant validity.
    pub window: GrantWindow,
}

/// Direct grant of a permission to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPermissionGrant {
    /// Group receiving the permission.
    pub group_id: GroupId,
    /// Granted permission.
    pub permission_id: PermissionId,
    /// Principal that made the grant.
    pub granted_by: Option<UserId>,
    /// Grant validity.
    pub window: GrantWindow,
}

/// Membership of a principal in a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    /// Member principal.
    pub user_id: UserId,
    /// Group joined.
    pub group_id: GroupId,
    /// Principal that added the member.
    pub added_by: Option<UserId>,
    /// Membership validity; `granted_at` is the time the member was added.
    pub window: GrantWindow,
}

/// Assignment of a role to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRoleGrant {
    /// Group receiving the role.
    pub group_id: GroupId,
    /// Assigned role.
    pub role_id: RoleId,
    /// Principal that made the assignment.
    pub assigned_by: Option<UserId>,
    /// Assignment validity.
    pub window: GrantWindow,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    use super::GrantWindow;

    #[test]
    fn expiry_at_or_before_grant_time_is_rejected() {
        let now = Utc::now();
        assert!(GrantWindow::new(now, Some(now)).is_err());
        assert!(GrantWindow::new(now, Some(now - Duration::seconds(1))).is_err());
        assert!(GrantWindow::new(now, Some(now + Duration::seconds(1))).is_ok());
    }

    #[test]
    fn window_without_expiry_never_expires() {
        let granted_at = Utc::now() - Duration::days(3650);
        let window = GrantWindow::restore(granted_at, None, true);
        assert!(window.is_effective_at(Utc::now() + Duration::days(36500)));
    }

    #[test]
    fn deactivated_window_is_not_effective() {
        let mut window = GrantWindow::restore(Utc::now(), None, true);
        window.deactivate();
        assert!(!window.is_effective_at(Utc::now()));
    }

    proptest! {
        #[test]
        fn expiry_boundary_is_exact(offset_seconds in 1_i64..1_000_000) {
            let granted_at = Utc::now() - Duration::days(1);
            let expires_at = granted_at + Duration::seconds(offset_seconds);
            let window = GrantWindow::new(granted_at, Some(expires_at));
            prop_assert!(window.is_ok());
            let window = window.unwrap_or_else(|_| unreachable!());

            prop_assert!(window.is_effective_at(expires_at - Duration::seconds(1)));
            prop_assert!(!window.is_effective_at(expires_at));
            prop_assert!(!window.is_effective_at(expires_at + Duration::seconds(1)));
        }
    }
}
