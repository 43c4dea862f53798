//! Persistence of administrator overrides.
//!
//! Overrides live in a single record keyed by a well-known configuration id.
//! A [`FallbackingRepository`] writes to and reads from a primary store first
//! and falls back to a local cache when the primary is unavailable. Every
//! read and write reports the tier that served it, so a degraded or stale
//! answer is visible to the caller.
//!
//! The two tiers are not kept in sync: a successful primary write does not
//! repair an older fallback entry, and the last writer wins.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::rates::{OverrideSet, RateTable};

/// Identifier of the shared override record.
pub const DEFAULT_CONFIG_ID: &str = "default";

/// Errors raised by override persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid configuration id: {0}")]
    InvalidConfigId(String),

    #[error("Primary store failed ({primary}); fallback cache failed ({fallback})")]
    BothTiersFailed {
        primary: Box<StoreError>,
        fallback: Box<StoreError>,
    },
}

/// The persisted override record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverrideRecord {
    pub config_id: String,
    #[serde(flatten)]
    pub overrides: OverrideSet,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

impl OverrideRecord {
    /// Creates a record stamped with the current time.
    pub fn new(config_id: &str, overrides: OverrideSet, updated_by: Option<String>) -> Self {
        Self {
            config_id: config_id.to_string(),
            overrides,
            updated_at: Utc::now(),
            updated_by,
        }
    }
}

/// A store of override records.
#[async_trait]
pub trait ConfigRepository: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Loads the record for `config_id`, `None` if it was never written.
    async fn load(&self, config_id: &str) -> Result<Option<OverrideRecord>, StoreError>;

    /// Stores the record under its `config_id`, replacing any earlier record.
    async fn save(&self, record: &OverrideRecord) -> Result<(), StoreError>;
}

/// JSON files on disk, one file per configuration id.
#[derive(Clone, Debug)]
pub struct FileRepository {
    dir: PathBuf,
}

impl FileRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, config_id: &str) -> Result<PathBuf, StoreError> {
        let valid = !config_id.is_empty()
            && config_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidConfigId(config_id.to_string()));
        }
        Ok(self.dir.join(format!("{config_id}.json")))
    }
}

#[async_trait]
impl ConfigRepository for FileRepository {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn load(&self, config_id: &str) -> Result<Option<OverrideRecord>, StoreError> {
        let path = self.record_path(config_id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, record: &OverrideRecord) -> Result<(), StoreError> {
        let path = self.record_path(&record.config_id)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(record)?;
        // Write then rename so readers never see a half-written record.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// In-process cache of override records.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    entries: RwLock<HashMap<String, OverrideRecord>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigRepository for MemoryRepository {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, config_id: &str) -> Result<Option<OverrideRecord>, StoreError> {
        Ok(self.entries.read().await.get(config_id).cloned())
    }

    async fn save(&self, record: &OverrideRecord) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(record.config_id.clone(), record.clone());
        Ok(())
    }
}

/// Which tier answered a read or accepted a write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StoreTier {
    Primary,
    Fallback,
    /// Neither tier held a record; built-in defaults apply.
    Defaults,
}

/// A value together with the tier that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Served<T> {
    pub value: T,
    pub tier: StoreTier,
    /// True when a tier failed while producing the value, so it may be stale.
    pub degraded: bool,
}

/// Where a write landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct WriteOutcome {
    pub tier: StoreTier,
    /// True when the primary store rejected the write and only the fallback holds it.
    pub degraded: bool,
}

/// Primary store with a local fallback cache.
#[derive(Clone)]
pub struct FallbackingRepository {
    primary: Arc<dyn ConfigRepository>,
    fallback: Arc<dyn ConfigRepository>,
}

impl FallbackingRepository {
    pub fn new(primary: Arc<dyn ConfigRepository>, fallback: Arc<dyn ConfigRepository>) -> Self {
        Self { primary, fallback }
    }

    /// Reads from the primary store, then from the fallback cache.
    ///
    /// A miss in both tiers is served as [`StoreTier::Defaults`]. An error is
    /// returned only when neither tier could be read.
    pub async fn load(
        &self,
        config_id: &str,
    ) -> Result<Served<Option<OverrideRecord>>, StoreError> {
        let primary_error = match self.primary.load(config_id).await {
            Ok(Some(record)) => {
                return Ok(Served {
                    value: Some(record),
                    tier: StoreTier::Primary,
                    degraded: false,
                });
            }
            Ok(None) => None,
            Err(err) => {
                warn!(store = self.primary.name(), error = %err, "Primary store read failed");
                Some(err)
            }
        };

        let degraded = primary_error.is_some();
        match self.fallback.load(config_id).await {
            Ok(Some(record)) => Ok(Served {
                value: Some(record),
                tier: StoreTier::Fallback,
                degraded,
            }),
            Ok(None) => Ok(Served {
                value: None,
                tier: StoreTier::Defaults,
                degraded,
            }),
            Err(fallback) => match primary_error {
                Some(primary) => Err(StoreError::BothTiersFailed {
                    primary: Box::new(primary),
                    fallback: Box::new(fallback),
                }),
                None => {
                    warn!(store = self.fallback.name(), error = %fallback, "Fallback cache read failed");
                    Ok(Served {
                        value: None,
                        tier: StoreTier::Defaults,
                        degraded: true,
                    })
                }
            },
        }
    }

    /// Writes to the primary store, or to the fallback cache if the primary fails.
    pub async fn save(&self, record: &OverrideRecord) -> Result<WriteOutcome, StoreError> {
        let primary = match self.primary.save(record).await {
            Ok(()) => {
                return Ok(WriteOutcome {
                    tier: StoreTier::Primary,
                    degraded: false,
                });
            }
            Err(err) => err,
        };
        warn!(
            store = self.primary.name(),
            error = %primary,
            "Primary store write failed, writing to fallback cache"
        );

        match self.fallback.save(record).await {
            Ok(()) => Ok(WriteOutcome {
                tier: StoreTier::Fallback,
                degraded: true,
            }),
            Err(fallback) => Err(StoreError::BothTiersFailed {
                primary: Box::new(primary),
                fallback: Box::new(fallback),
            }),
        }
    }
}

/// Loads, caches and saves the active override set.
///
/// The merged view is cached after the first clean read; degraded reads are
/// served but not cached. Every successful write through
/// [`OverrideService::save`] invalidates the cache; writes made behind the
/// service's back require an explicit [`OverrideService::invalidate`].
pub struct OverrideService {
    repository: FallbackingRepository,
    table: RateTable,
    config_id: String,
    cache: RwLock<CachedView>,
}

/// Cached overrides tagged with the invalidation generation they were read in.
#[derive(Default)]
struct CachedView {
    generation: u64,
    view: Option<Served<OverrideSet>>,
}

impl OverrideService {
    pub fn new(repository: FallbackingRepository, table: RateTable) -> Self {
        Self {
            repository,
            table,
            config_id: DEFAULT_CONFIG_ID.to_string(),
            cache: RwLock::new(CachedView::default()),
        }
    }

    /// The default rate table the overrides apply to.
    pub fn table(&self) -> &RateTable {
        &self.table
    }

    /// Returns the active overrides and the tier they came from.
    ///
    /// Read failures degrade to the default tables instead of failing pricing.
    pub async fn current(&self) -> Served<OverrideSet> {
        let generation = {
            let cache = self.cache.read().await;
            if let Some(view) = cache.view.as_ref() {
                return view.clone();
            }
            cache.generation
        };

        let served = match self.repository.load(&self.config_id).await {
            Ok(Served {
                value,
                tier,
                degraded,
            }) => Served {
                value: value.map(|record| record.overrides).unwrap_or_default(),
                tier,
                degraded,
            },
            Err(err) => {
                warn!(error = %err, "Could not load overrides, using default rates");
                Served {
                    value: OverrideSet::default(),
                    tier: StoreTier::Defaults,
                    degraded: true,
                }
            }
        };

        let inert = served.value.inert_keys(&self.table);
        if !inert.is_empty() {
            debug!(keys = ?inert, "Ignoring overrides without a matching default entry");
        }

        if !served.degraded {
            let mut cache = self.cache.write().await;
            // An invalidation during the load means this view may predate a write.
            if cache.generation == generation {
                cache.view = Some(served.clone());
            }
        }
        served
    }

    /// Persists a new override set and invalidates the cached view.
    pub async fn save(
        &self,
        overrides: OverrideSet,
        updated_by: Option<String>,
    ) -> Result<WriteOutcome, StoreError> {
        let record = OverrideRecord::new(&self.config_id, overrides, updated_by);
        let outcome = self.repository.save(&record).await?;
        self.invalidate().await;
        info!(
            tier = ?outcome.tier,
            degraded = outcome.degraded,
            plots = record.overrides.plot_overrides.len(),
            distance_tiers = record.overrides.distance_tier_overrides.len(),
            weight_ratio_tiers = record.overrides.weight_ratio_tier_overrides.len(),
            "Saved rate overrides"
        );
        Ok(outcome)
    }

    /// Removes every override, restoring the default tables.
    pub async fn reset_all(&self, updated_by: Option<String>) -> Result<WriteOutcome, StoreError> {
        self.save(OverrideSet::default(), updated_by).await
    }

    /// Drops the cached view so the next read goes back to the store.
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        cache.generation = cache.generation.wrapping_add(1);
        cache.view = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    /// A store that is always down.
    struct OfflineRepository;

    #[async_trait]
    impl ConfigRepository for OfflineRepository {
        fn name(&self) -> &'static str {
            "offline"
        }

        async fn load(&self, _config_id: &str) -> Result<Option<OverrideRecord>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn save(&self, _record: &OverrideRecord) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    /// A store whose reads fail until `recover` is called.
    #[derive(Default)]
    struct FlakyRepository {
        inner: MemoryRepository,
        down: AtomicBool,
    }

    impl FlakyRepository {
        fn down() -> Self {
            let repo = Self::default();
            repo.down.store(true, Ordering::SeqCst);
            repo
        }

        fn recover(&self) {
            self.down.store(false, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ConfigRepository for FlakyRepository {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn load(&self, config_id: &str) -> Result<Option<OverrideRecord>, StoreError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("timeout".to_string()));
            }
            self.inner.load(config_id).await
        }

        async fn save(&self, record: &OverrideRecord) -> Result<(), StoreError> {
            self.inner.save(record).await
        }
    }

    /// A store whose next read takes its snapshot, then waits to be released.
    #[derive(Default)]
    struct SlowReadRepository {
        inner: MemoryRepository,
        hold_next_read: AtomicBool,
        read_started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ConfigRepository for SlowReadRepository {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn load(&self, config_id: &str) -> Result<Option<OverrideRecord>, StoreError> {
            let snapshot = self.inner.load(config_id).await;
            if self
                .hold_next_read
                .swap(false, Ordering::SeqCst)
            {
                self.read_started.notify_one();
                self.release.notified().await;
            }
            snapshot
        }

        async fn save(&self, record: &OverrideRecord) -> Result<(), StoreError> {
            self.inner.save(record).await
        }
    }

    fn full_plot_override(cost: rust_decimal::Decimal) -> OverrideSet {
        let mut overrides = OverrideSet::default();
        overrides.set_plot_cost("Full Plot", cost);
        overrides
    }

    fn record(cost: rust_decimal::Decimal) -> OverrideRecord {
        OverrideRecord::new(DEFAULT_CONFIG_ID, full_plot_override(cost), Some("admin".into()))
    }

    #[tokio::test]
    async fn file_repository_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = FileRepository::new(dir.path().join("overrides"));

        assert_eq!(repo.load(DEFAULT_CONFIG_ID).await.unwrap(), None);

        let saved = record(dec!(61.00));
        repo.save(&saved).await.unwrap();
        let loaded = repo.load(DEFAULT_CONFIG_ID).await.unwrap();
        assert_eq!(loaded, Some(saved));
        assert!(dir.path().join("overrides").join("default.json").exists());
    }

    #[tokio::test]
    async fn file_repository_rejects_path_like_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = FileRepository::new(dir.path());
        assert!(matches!(
            repo.load("../etc/passwd").await,
            Err(StoreError::InvalidConfigId(_))
        ));
    }

    #[test]
    fn record_serializes_lists_at_top_level() {
        let json = serde_json::to_value(record(dec!(61.00))).unwrap();
        assert_eq!(json["config_id"], "default");
        assert!(json["plot_overrides"].is_array());
        assert!(json["distance_tier_overrides"].is_array());
        assert!(json["weight_ratio_tier_overrides"].is_array());
        assert_eq!(json["updated_by"], "admin");
    }

    #[tokio::test]
    async fn reads_from_primary_when_available() {
        let primary = Arc::new(MemoryRepository::new());
        primary.save(&record(dec!(61.00))).await.unwrap();
        let repo = FallbackingRepository::new(primary, Arc::new(MemoryRepository::new()));

        let served = repo.load(DEFAULT_CONFIG_ID).await.unwrap();
        assert_eq!(served.tier, StoreTier::Primary);
        assert!(served.value.is_some());
    }

    #[tokio::test]
    async fn falls_back_on_primary_failure() {
        let fallback = Arc::new(MemoryRepository::new());
        let repo = FallbackingRepository::new(Arc::new(OfflineRepository), fallback.clone());

        let outcome = repo.save(&record(dec!(62.00))).await.unwrap();
        assert_eq!(
            outcome,
            WriteOutcome {
                tier: StoreTier::Fallback,
                degraded: true
            }
        );
        assert!(fallback.load(DEFAULT_CONFIG_ID).await.unwrap().is_some());

        let served = repo.load(DEFAULT_CONFIG_ID).await.unwrap();
        assert_eq!(served.tier, StoreTier::Fallback);
    }

    #[tokio::test]
    async fn miss_in_both_tiers_is_served_as_defaults() {
        let repo = FallbackingRepository::new(
            Arc::new(MemoryRepository::new()),
            Arc::new(MemoryRepository::new()),
        );
        let served = repo.load(DEFAULT_CONFIG_ID).await.unwrap();
        assert_eq!(served.tier, StoreTier::Defaults);
        assert_eq!(served.value, None);
    }

    #[tokio::test]
    async fn both_tiers_failing_surfaces_an_error() {
        let repo =
            FallbackingRepository::new(Arc::new(OfflineRepository), Arc::new(OfflineRepository));
        assert!(matches!(
            repo.save(&record(dec!(1))).await,
            Err(StoreError::BothTiersFailed { .. })
        ));
        assert!(matches!(
            repo.load(DEFAULT_CONFIG_ID).await,
            Err(StoreError::BothTiersFailed { .. })
        ));
    }

    fn service_with(primary: Arc<dyn ConfigRepository>) -> OverrideService {
        OverrideService::new(
            FallbackingRepository::new(primary, Arc::new(MemoryRepository::new())),
            RateTable::standard(),
        )
    }

    #[tokio::test]
    async fn save_invalidates_cached_overrides() {
        let service = service_with(Arc::new(MemoryRepository::new()));
        let before = service.current().await;
        assert!(before.value.is_empty());

        service
            .save(full_plot_override(dec!(70.00)), Some("admin".into()))
            .await
            .unwrap();
        let after = service.current().await;
        assert_eq!(after.tier, StoreTier::Primary);
        assert_eq!(
            service.table().effective_cost("Full Plot", &after.value),
            Some(dec!(70.00))
        );
    }

    #[tokio::test]
    async fn reset_restores_default_cost() {
        let service = service_with(Arc::new(MemoryRepository::new()));
        let original = service
            .table()
            .effective_cost("Full Plot", &service.current().await.value);

        service.save(full_plot_override(dec!(70.00)), None).await.unwrap();
        service.reset_all(None).await.unwrap();

        let current = service.current().await;
        assert_eq!(
            service.table().effective_cost("Full Plot", &current.value),
            original
        );
    }

    #[tokio::test]
    async fn external_writes_need_explicit_invalidation() {
        let primary = Arc::new(MemoryRepository::new());
        let service = service_with(primary.clone());
        assert!(service.current().await.value.is_empty());

        primary.save(&record(dec!(80.00))).await.unwrap();
        assert!(service.current().await.value.is_empty(), "cached view is stale");

        service.invalidate().await;
        assert!(!service.current().await.value.is_empty());
    }

    #[tokio::test]
    async fn unreadable_store_degrades_to_defaults() {
        let service = OverrideService::new(
            FallbackingRepository::new(Arc::new(OfflineRepository), Arc::new(OfflineRepository)),
            RateTable::standard(),
        );
        let served = service.current().await;
        assert_eq!(served.tier, StoreTier::Defaults);
        assert!(served.value.is_empty());
    }

    #[tokio::test]
    async fn read_in_flight_during_save_does_not_reinstall_old_view() {
        let primary = Arc::new(SlowReadRepository::default());
        primary
            .hold_next_read
            .store(true, Ordering::SeqCst);
        let service = Arc::new(service_with(primary.clone()));

        let reader = tokio::spawn({
            let service = service.clone();
            async move { service.current().await }
        });
        primary.read_started.notified().await;

        service
            .save(full_plot_override(dec!(70.00)), None)
            .await
            .unwrap();
        primary.release.notify_one();
        reader.await.unwrap();

        let current = service.current().await;
        assert_eq!(
            service.table().effective_cost("Full Plot", &current.value),
            Some(dec!(70.00))
        );
    }

    #[tokio::test]
    async fn degraded_read_is_not_cached() {
        let primary = Arc::new(FlakyRepository::down());
        primary.inner.save(&record(dec!(70.00))).await.unwrap();
        let service = service_with(primary.clone());

        let during_outage = service.current().await;
        assert_eq!(during_outage.tier, StoreTier::Defaults);
        assert!(during_outage.degraded);

        primary.recover();
        let recovered = service.current().await;
        assert_eq!(recovered.tier, StoreTier::Primary);
        assert!(!recovered.degraded);
        assert_eq!(
            service.table().effective_cost("Full Plot", &recovered.value),
            Some(dec!(70.00))
        );
    }

    #[tokio::test]
    async fn fallback_hit_after_primary_failure_is_marked_degraded() {
        let fallback = Arc::new(MemoryRepository::new());
        fallback.save(&record(dec!(62.00))).await.unwrap();
        let repo = FallbackingRepository::new(Arc::new(OfflineRepository), fallback);

        let served = repo.load(DEFAULT_CONFIG_ID).await.unwrap();
        assert_eq!(served.tier, StoreTier::Fallback);
        assert!(served.degraded);
    }
}
