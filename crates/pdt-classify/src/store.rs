//! Classification lookup with a moka front-cache.

use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::{debug, info};

use pdt_core::{ParkId, RideId};

use crate::types::{Classification, ClassificationOverride, RideClass};

/// Cached, read-mostly `(ride -> tier, weight, category)` lookup.
///
/// One instance is shared per process; the cache is rebuilt lazily after a
/// wholesale invalidation.
pub struct ClassificationStore {
    pool: PgPool,
    cache: Cache<i64, RideClass>,
    known_schema_version: AtomicI32,
}

impl ClassificationStore {
    /// Cache capacity; comfortably above the tracked ride count.
    const CACHE_CAPACITY: u64 = 20_000;

    /// Create a new store.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        let cache = Cache::builder()
            .max_capacity(Self::CACHE_CAPACITY)
            .time_to_live(Duration::from_secs(6 * 60 * 60))
            .build();
        Self {
            pool,
            cache,
            known_schema_version: AtomicI32::new(0),
        }
    }

    /// Look up one ride. Unclassified rides resolve to the default class.
    ///
    /// # Errors
    /// Returns error if the database query fails.
    pub async fn get(&self, ride_id: RideId) -> Result<RideClass, sqlx::Error> {
        if let Some(class) = self.cache.get(&ride_id.0).await {
            return Ok(class);
        }

        let classification: Option<Classification> = sqlx::query_as(
            "SELECT ride_id, park_id, tier, tier_weight, category, confidence, reasoning, \
                    research_sources, schema_version, classified_at \
             FROM ride_classifications WHERE ride_id = $1",
        )
        .bind(ride_id)
        .fetch_optional(&self.pool)
        .await?;

        let human: Option<ClassificationOverride> = sqlx::query_as(
            "SELECT ride_id, tier, category, note \
             FROM ride_classification_overrides WHERE ride_id = $1",
        )
        .bind(ride_id)
        .fetch_optional(&self.pool)
        .await?;

        let class = RideClass::resolve(classification.as_ref(), human.as_ref());
        self.cache.insert(ride_id.0, class).await;
        Ok(class)
    }

    /// Bulk lookup for every active ride of one park, one round trip. Rides
    /// missing from the result are unclassified and default to weight 2.
    ///
    /// # Errors
    /// Returns error if the database query fails.
    pub async fn for_park(
        &self,
        park_id: ParkId,
    ) -> Result<std::collections::HashMap<RideId, RideClass>, sqlx::Error> {
        let classifications: Vec<Classification> = sqlx::query_as(
            "SELECT ride_id, park_id, tier, tier_weight, category, confidence, reasoning, \
                    research_sources, schema_version, classified_at \
             FROM ride_classifications WHERE park_id = $1",
        )
        .bind(park_id)
        .fetch_all(&self.pool)
        .await?;

        let overrides: Vec<ClassificationOverride> = sqlx::query_as(
            "SELECT o.ride_id, o.tier, o.category, o.note \
             FROM ride_classification_overrides o \
             JOIN rides r ON o.ride_id = r.ride_id \
             WHERE r.park_id = $1",
        )
        .bind(park_id)
        .fetch_all(&self.pool)
        .await?;

        let override_map: std::collections::HashMap<RideId, ClassificationOverride> =
            overrides.into_iter().map(|o| (o.ride_id, o)).collect();

        let mut result = std::collections::HashMap::new();
        for classification in &classifications {
            let class = RideClass::resolve(
                Some(classification),
                override_map.get(&classification.ride_id),
            );
            self.cache.insert(classification.ride_id.0, class).await;
            result.insert(classification.ride_id, class);
        }
        // Override-only rides (no classifier row yet)
        for (ride_id, human) in &override_map {
            if !result.contains_key(ride_id) {
                let class = RideClass::resolve(None, Some(human));
                self.cache.insert(ride_id.0, class).await;
                result.insert(*ride_id, class);
            }
        }
        Ok(result)
    }

    /// Drop every cached entry if the classifier has bumped its schema
    /// version since the last check. Called at the top of each collection
    /// cycle; cheap when nothing changed.
    ///
    /// # Errors
    /// Returns error if the database query fails.
    pub async fn refresh_schema_version(&self) -> Result<(), sqlx::Error> {
        let (version,): (Option<i32>,) =
            sqlx::query_as("SELECT MAX(schema_version) FROM ride_classifications")
                .fetch_one(&self.pool)
                .await?;
        let version = version.unwrap_or(0);

        let known = self.known_schema_version.swap(version, Ordering::SeqCst);
        if known != 0 && known != version {
            info!(
                old_version = known,
                new_version = version,
                "Classification schema version changed; invalidating cache"
            );
            self.cache.invalidate_all();
        } else {
            debug!(version, "Classification schema version unchanged");
        }
        Ok(())
    }

    /// Number of cached entries (for diagnostics).
    #[must_use]
    pub fn cached_entries(&self) -> u64 {
        self.cache.entry_count()
    }
}
