use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use warden_core::AppResult;

use crate::{ExpiredGrantSweep, GrantMaintenanceRepository};

/// Soft-disables expired assignment rows.
///
/// Resolution already ignores expired rows, so the sweep only keeps stored
/// state tidy for listings and reporting.
#[derive(Clone)]
pub struct GrantMaintenanceService {
    repository: Arc<dyn GrantMaintenanceRepository>,
}

impl GrantMaintenanceService {
    /// Creates a new maintenance service.
    #[must_use]
    pub fn new(repository: Arc<dyn GrantMaintenanceRepository>) -> Self {
        Self { repository }
    }

    /// Runs one sweep at `now`.
    pub async fn sweep(&self, now: DateTime<Utc>) -> AppResult<ExpiredGrantSweep> {
        let sweep = self.repository.deactivate_expired_grants(now).await?;

        if sweep.total() > 0 {
            info!(
                user_roles = sweep.user_roles,
                user_permissions = sweep.user_permissions,
                group_permissions = sweep.group_permissions,
                memberships = sweep.memberships,
                group_roles = sweep.group_roles,
                "expired grants deactivated"
            );
        }

        Ok(sweep)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use tokio::sync::Mutex;
    use warden_core::AppResult;

    use super::GrantMaintenanceService;
    use crate::{ExpiredGrantSweep, GrantMaintenanceRepository};

    #[derive(Default)]
    struct FakeMaintenanceRepository {
        calls: Mutex<Vec<DateTime<Utc>>>,
    }

    #[async_trait]
    impl GrantMaintenanceRepository for FakeMaintenanceRepository {
        async fn deactivate_expired_grants(
            &self,
            now: DateTime<Utc>,
        ) -> AppResult<ExpiredGrantSweep> {
            self.calls.lock().await.push(now);
            Ok(ExpiredGrantSweep {
                memberships: 2,
                group_roles: 1,
                ..ExpiredGrantSweep::default()
            })
        }
    }

    #[tokio::test]
    async fn sweep_forwards_clock_and_reports_counts() {
        let repository = Arc::new(FakeMaintenanceRepository::default());
        let service = GrantMaintenanceService::new(repository.clone());
        let now = Utc::now();

        let sweep = service.sweep(now).await;
        assert!(sweep.is_ok());
        assert_eq!(sweep.map(|value| value.total()).ok(), Some(3));
        assert_eq!(repository.calls.lock().await.as_slice(), &[now]);
    }
}
