//! Permission Cache: TTL-bounded role checks in front of the ledger
//!
//! # Consistency
//!
//! Results are point-in-time snapshots. A revoke becomes visible to callers
//! of [`PermissionCache::check`] within one TTL of taking effect on the
//! ledger, not sooner; entries are never invalidated proactively. This lag
//! is an accepted relaxation for repeated UI-side checks. Privileged writes
//! are always re-checked by the registry itself.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use super::RoleQuery;
use crate::cache::{Clock, SystemClock, TtlCache, TtlCacheStatsSnapshot};
use crate::types::{Address, CertificateError, Result, Role};

/// Default validity window for cached role checks (1 minute).
pub const DEFAULT_ROLE_CACHE_TTL: Duration = Duration::from_secs(60);

/// Detailed result of a role check.
#[derive(Debug, Clone)]
pub struct RoleCheck {
    pub role: Role,
    pub account: Address,
    pub granted: bool,
    pub observed_at: Instant,
    /// Age of the snapshot when returned (zero for fresh queries)
    pub age: Duration,
    pub from_cache: bool,
}

impl RoleCheck {
    /// Returns the grant, or `StaleAuthorization` when the answer came from
    /// cache. Callers that need ledger-fresh answers use this.
    pub fn require_fresh(&self) -> Result<bool> {
        if self.from_cache {
            return Err(CertificateError::StaleAuthorization {
                role: self.role,
                account: self.account,
                age_ms: self.age.as_millis() as u64,
            });
        }
        Ok(self.granted)
    }
}

pub struct PermissionCache {
    source: Arc<dyn RoleQuery>,
    entries: TtlCache<(Role, Address), bool>,
}

impl PermissionCache {
    pub fn new(source: Arc<dyn RoleQuery>, ttl: Duration) -> Self {
        Self::with_clock(source, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(source: Arc<dyn RoleQuery>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            entries: TtlCache::with_clock(ttl, clock),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.entries.ttl()
    }

    pub async fn check(&self, role: Role, account: &Address) -> Result<bool> {
        Ok(self.check_detailed(role, account).await?.granted)
    }

    pub async fn check_detailed(&self, role: Role, account: &Address) -> Result<RoleCheck> {
        let key = (role, *account);

        if let Some(hit) = self.entries.get(&key) {
            debug!(%role, %account, age_ms = hit.age.as_millis() as u64, "Role check cache hit");
            return Ok(RoleCheck {
                role,
                account: *account,
                granted: hit.value,
                observed_at: hit.observed_at,
                age: hit.age,
                from_cache: true,
            });
        }

        let granted = self.source.has_role(role, account).await?;
        let observed_at = self.entries.insert(key, granted);
        debug!(%role, %account, granted, "Role check refreshed from ledger");

        Ok(RoleCheck {
            role,
            account: *account,
            granted,
            observed_at,
            age: Duration::ZERO,
            from_cache: false,
        })
    }

    /// Drop expired snapshots to bound memory in long-running processes.
    pub fn purge_expired(&self) -> usize {
        self.entries.purge_expired()
    }

    pub fn stats(&self) -> TtlCacheStatsSnapshot {
        self.entries.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingRoles {
        granted: Mutex<HashSet<(Role, Address)>>,
        queries: AtomicU32,
    }

    #[async_trait]
    impl RoleQuery for CountingRoles {
        async fn has_role(&self, role: Role, account: &Address) -> Result<bool> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(self.granted.lock().unwrap().contains(&(role, *account)))
        }
    }

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[0] = n;
        Address::from_bytes(bytes)
    }

    #[tokio::test]
    async fn test_repeated_checks_hit_cache() {
        let roles = Arc::new(CountingRoles::default());
        roles.granted.lock().unwrap().insert((Role::Minter, addr(1)));
        let clock = Arc::new(ManualClock::new());
        let cache = PermissionCache::with_clock(roles.clone(), Duration::from_secs(60), clock);

        assert!(cache.check(Role::Minter, &addr(1)).await.unwrap());
        assert!(cache.check(Role::Minter, &addr(1)).await.unwrap());
        assert_eq!(roles.queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_revoke_visible_after_ttl() {
        let roles = Arc::new(CountingRoles::default());
        roles.granted.lock().unwrap().insert((Role::Minter, addr(1)));
        let clock = Arc::new(ManualClock::new());
        let cache =
            PermissionCache::with_clock(roles.clone(), Duration::from_secs(60), clock.clone());

        assert!(cache.check(Role::Minter, &addr(1)).await.unwrap());

        // Revoke on the ledger
        roles.granted.lock().unwrap().clear();

        clock.advance(Duration::from_secs(30));
        let stale = cache.check_detailed(Role::Minter, &addr(1)).await.unwrap();
        assert!(stale.granted);
        assert!(stale.from_cache);
        assert!(matches!(
            stale.require_fresh(),
            Err(CertificateError::StaleAuthorization { age_ms: 30_000, .. })
        ));

        clock.advance(Duration::from_secs(30));
        assert!(!cache.check(Role::Minter, &addr(1)).await.unwrap());
        assert_eq!(roles.queries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_roles_cached_independently() {
        let roles = Arc::new(CountingRoles::default());
        roles.granted.lock().unwrap().insert((Role::Admin, addr(1)));
        let cache = PermissionCache::new(roles.clone(), DEFAULT_ROLE_CACHE_TTL);

        assert!(cache.check(Role::Admin, &addr(1)).await.unwrap());
        assert!(!cache.check(Role::Minter, &addr(1)).await.unwrap());
        assert_eq!(roles.queries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fresh_check_is_not_stale() {
        let roles = Arc::new(CountingRoles::default());
        let cache = PermissionCache::new(roles, DEFAULT_ROLE_CACHE_TTL);

        let check = cache.check_detailed(Role::Minter, &addr(4)).await.unwrap();
        assert!(!check.from_cache);
        assert!(!check.require_fresh().unwrap());
    }
}
