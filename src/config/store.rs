//! The versioned configuration store.
//!
//! [`ConfigurationStore`] fronts the configuration repository with an
//! in-memory cache bounded by a TTL. It is an explicit object injected
//! into the calculators and services rather than ambient global state:
//! construction, invalidation, and expiry are all visible at the seams.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::config::defaults;
use crate::config::types::{CompanyPayrollPolicy, YearlyConfiguration};
use crate::error::EngineResult;
use crate::repository::ConfigurationRepository;

/// How long a cached yearly configuration is served before the backing
/// store is consulted again.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

struct CacheEntry {
    config: Arc<YearlyConfiguration>,
    loaded_at: Instant,
}

/// Cached, repository-backed access to yearly legal parameters and
/// company payroll policies.
///
/// Reads within the TTL are served from memory; a miss (or expiry) goes
/// to the repository, and a year with no persisted record falls back to
/// the hard-coded statutory defaults, which are lazily persisted so the
/// next consistent read finds them. Writes invalidate the cached year.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use nomina_engine::config::ConfigurationStore;
/// use nomina_engine::repository::memory::InMemoryConfigurationRepository;
///
/// let store = ConfigurationStore::new(Arc::new(InMemoryConfigurationRepository::new()));
/// let config = store.get(2025).unwrap();
/// assert_eq!(config.year, 2025);
/// ```
pub struct ConfigurationStore {
    repository: Arc<dyn ConfigurationRepository>,
    cache: Mutex<HashMap<i32, CacheEntry>>,
    ttl: Duration,
}

impl ConfigurationStore {
    /// Creates a store with the default five-minute TTL.
    pub fn new(repository: Arc<dyn ConfigurationRepository>) -> Self {
        Self::with_ttl(repository, DEFAULT_CACHE_TTL)
    }

    /// Creates a store with an explicit TTL. A zero TTL disables caching
    /// for consistent reads while keeping `get_cached` available.
    pub fn with_ttl(repository: Arc<dyn ConfigurationRepository>, ttl: Duration) -> Self {
        Self {
            repository,
            cache: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Returns the configuration for a year, served from cache while the
    /// TTL holds.
    ///
    /// On a cache miss the repository is consulted; if it has no record
    /// for the year, the statutory defaults are returned and lazily
    /// persisted (best effort — a failed lazy write is logged, not
    /// propagated, since the caller still has a usable configuration).
    pub fn get(&self, year: i32) -> EngineResult<Arc<YearlyConfiguration>> {
        if let Some(entry) = self.cached_entry(year) {
            if entry.1.elapsed() < self.ttl {
                return Ok(entry.0);
            }
        }
        self.get_fresh(year)
    }

    /// Synchronous, possibly-stale read that never touches the backing
    /// store. Returns whatever the cache holds for the year, even past
    /// the TTL, or `None` if the year was never loaded.
    pub fn get_cached(&self, year: i32) -> Option<Arc<YearlyConfiguration>> {
        self.cached_entry(year).map(|(config, _)| config)
    }

    /// Consistent read: always consults the repository (falling back to
    /// defaults) and refreshes the cache.
    pub fn get_fresh(&self, year: i32) -> EngineResult<Arc<YearlyConfiguration>> {
        let config = match self.repository.get_configuration(year)? {
            Some(config) => config,
            None => {
                let default = defaults::for_year(year);
                if let Err(error) = self.repository.save_configuration(&default) {
                    tracing::warn!(year, %error, "could not lazily persist default configuration");
                }
                default
            }
        };
        let config = Arc::new(config);
        self.lock_cache().insert(
            year,
            CacheEntry {
                config: Arc::clone(&config),
                loaded_at: Instant::now(),
            },
        );
        Ok(config)
    }

    /// Validates and persists a configuration version, invalidating any
    /// cached copy for that year.
    pub fn set(&self, config: YearlyConfiguration) -> EngineResult<()> {
        config.validate()?;
        self.repository.save_configuration(&config)?;
        self.invalidate(config.year);
        Ok(())
    }

    /// Years available either in the repository or as statutory
    /// defaults, ascending and deduplicated.
    pub fn available_years(&self) -> EngineResult<Vec<i32>> {
        let mut years = self.repository.available_years()?;
        years.extend(defaults::known_years());
        years.sort_unstable();
        years.dedup();
        Ok(years)
    }

    /// Drops the cached entry for one year.
    pub fn invalidate(&self, year: i32) {
        self.lock_cache().remove(&year);
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.lock_cache().clear();
    }

    /// Returns the payroll policy for a company, or the default policy
    /// when none was configured.
    pub fn policy_for(&self, company_id: Uuid) -> EngineResult<CompanyPayrollPolicy> {
        Ok(self
            .repository
            .get_policy(company_id)?
            .unwrap_or_else(|| CompanyPayrollPolicy::default_for(company_id)))
    }

    /// Persists a company payroll policy.
    pub fn set_policy(&self, policy: &CompanyPayrollPolicy) -> EngineResult<()> {
        self.repository.save_policy(policy)
    }

    fn cached_entry(&self, year: i32) -> Option<(Arc<YearlyConfiguration>, Instant)> {
        self.lock_cache()
            .get(&year)
            .map(|entry| (Arc::clone(&entry.config), entry.loaded_at))
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<i32, CacheEntry>> {
        // A poisoned cache only means another thread panicked mid-insert;
        // the map itself is still usable.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::InMemoryConfigurationRepository;
    use rust_decimal::Decimal;

    fn repo() -> Arc<InMemoryConfigurationRepository> {
        Arc::new(InMemoryConfigurationRepository::new())
    }

    #[test]
    fn test_get_falls_back_to_defaults_and_lazily_persists() {
        let repository = repo();
        let store = ConfigurationStore::new(repository.clone());

        let config = store.get(2025).unwrap();
        assert_eq!(config.minimum_wage, Decimal::new(1_423_500, 0));

        // The default must now exist in the backing store.
        let persisted = repository.get_configuration(2025).unwrap();
        assert!(persisted.is_some());
    }

    #[test]
    fn test_get_serves_cache_within_ttl() {
        let repository = repo();
        let store = ConfigurationStore::new(repository.clone());
        let first = store.get(2025).unwrap();

        // Mutate the backing store behind the cache's back; a TTL-fresh
        // read must not observe it.
        let mut altered = (*first).clone();
        altered.transport_allowance = Decimal::from(1);
        repository.save_configuration(&altered).unwrap();

        let second = store.get(2025).unwrap();
        assert_eq!(second.transport_allowance, first.transport_allowance);

        // A consistent read does observe it.
        let fresh = store.get_fresh(2025).unwrap();
        assert_eq!(fresh.transport_allowance, Decimal::from(1));
    }

    #[test]
    fn test_zero_ttl_always_refetches() {
        let repository = repo();
        let store = ConfigurationStore::with_ttl(repository.clone(), Duration::ZERO);
        let first = store.get(2025).unwrap();

        let mut altered = (*first).clone();
        altered.transport_allowance = Decimal::from(7);
        repository.save_configuration(&altered).unwrap();

        let second = store.get(2025).unwrap();
        assert_eq!(second.transport_allowance, Decimal::from(7));
    }

    #[test]
    fn test_get_cached_is_stale_tolerant_and_non_loading() {
        let store = ConfigurationStore::with_ttl(repo(), Duration::ZERO);
        assert!(store.get_cached(2025).is_none());

        store.get(2025).unwrap();
        // TTL is zero, so the entry is expired — the sync path serves it anyway.
        assert!(store.get_cached(2025).is_some());
    }

    #[test]
    fn test_set_validates_and_invalidates() {
        let store = ConfigurationStore::new(repo());
        let cached = store.get(2025).unwrap();

        let mut invalid = (*cached).clone();
        invalid.minimum_wage = Decimal::ZERO;
        assert!(store.set(invalid).is_err());

        let mut corrected = (*cached).clone();
        corrected.transport_allowance = Decimal::from(210_000);
        store.set(corrected).unwrap();

        let reread = store.get(2025).unwrap();
        assert_eq!(reread.transport_allowance, Decimal::from(210_000));
    }

    #[test]
    fn test_available_years_merges_defaults_and_persisted() {
        let repository = repo();
        let store = ConfigurationStore::new(repository.clone());
        let mut custom = defaults::for_year(2023);
        custom.year = 2023;
        repository.save_configuration(&custom).unwrap();

        let years = store.available_years().unwrap();
        assert_eq!(years, vec![2023, 2024, 2025]);
    }

    #[test]
    fn test_policy_defaults_when_unconfigured() {
        let store = ConfigurationStore::new(repo());
        let company = Uuid::new_v4();
        let policy = store.policy_for(company).unwrap();
        assert_eq!(policy, CompanyPayrollPolicy::default_for(company));
    }

    #[test]
    fn test_policy_round_trip() {
        let store = ConfigurationStore::new(repo());
        let company = Uuid::new_v4();
        let mut policy = CompanyPayrollPolicy::default_for(company);
        policy.ibc_mode = crate::config::IbcMode::FullSalary;
        store.set_policy(&policy).unwrap();
        assert_eq!(store.policy_for(company).unwrap(), policy);
    }
}
