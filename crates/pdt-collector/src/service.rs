//! The collection service: fan-out, retries, and the interval loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use sqlx::PgPool;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use pdt_classify::ClassificationStore;
use pdt_config::{CollectorSettings, ScoringSettings};
use pdt_core::Park;
use pdt_store::{
    CycleWrite, ParkRepository, RideRepository, SnapshotRepository, VendorPark, VendorRide,
};
use pdt_time::{parse_timezone, Clock};

use crate::client::QueueTimesClient;
use crate::cycle::build_park_cycle;
use crate::error::CollectError;

/// Outcome of one full collection cycle across all parks.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleSummary {
    pub parks_processed: u32,
    pub parks_skipped: u32,
    pub rides_written: u64,
    pub duplicates_rejected: u64,
}

/// Polls the upstream API and writes the snapshot stream.
pub struct Collector {
    client: QueueTimesClient,
    parks: ParkRepository,
    rides: RideRepository,
    snapshots: SnapshotRepository,
    classifications: Arc<ClassificationStore>,
    settings: CollectorSettings,
    clock: Arc<dyn Clock>,
}

impl Collector {
    /// Create a collector over a shared pool.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(
        pool: PgPool,
        settings: CollectorSettings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CollectError> {
        let client = QueueTimesClient::new(
            &settings.api_base_url,
            Duration::from_secs(settings.request_timeout_secs),
        )?;
        Ok(Self {
            client,
            parks: ParkRepository::new(pool.clone()),
            rides: RideRepository::new(pool.clone()),
            snapshots: SnapshotRepository::new(pool.clone()),
            classifications: Arc::new(ClassificationStore::new(pool)),
            settings,
            clock,
        })
    }

    /// Run one collection cycle across every active park.
    ///
    /// Per-park failures are logged and skipped; the cycle itself only fails
    /// on environment-level errors (database unreachable).
    ///
    /// # Errors
    /// Returns error if the park roster cannot be loaded.
    pub async fn run_cycle(&self) -> Result<CycleSummary, CollectError> {
        self.classifications
            .refresh_schema_version()
            .await
            .map_err(CollectError::Database)?;

        let parks = self.parks.get_all_active().await?;
        let recorded_at = self.clock.now_utc();
        info!(parks = parks.len(), %recorded_at, "Collection cycle starting");

        let results: Vec<(i64, Result<CycleWrite, CollectError>)> =
            stream::iter(parks.into_iter().map(|park| {
                let vendor_id = park.queue_times_id;
                async move { (vendor_id, self.collect_park(park, recorded_at).await) }
            }))
            .buffer_unordered(self.settings.fetch_concurrency)
            .collect()
            .await;

        let mut summary = CycleSummary::default();
        for (vendor_id, result) in results {
            match result {
                Ok(write) => {
                    summary.parks_processed += 1;
                    summary.rides_written += write.rides_written;
                    summary.duplicates_rejected += write.duplicates_rejected;
                }
                Err(e) => {
                    // One bad park does not poison the cycle; no synthetic
                    // snapshot is written for it.
                    warn!(park = vendor_id, error = %e, "Park skipped this cycle");
                    summary.parks_skipped += 1;
                }
            }
        }

        info!(
            parks_processed = summary.parks_processed,
            parks_skipped = summary.parks_skipped,
            rides_written = summary.rides_written,
            "Collection cycle complete"
        );
        Ok(summary)
    }

    /// Collect one park: fetch, assemble, write, refresh `last_operated_at`.
    async fn collect_park(
        &self,
        park: Park,
        recorded_at: DateTime<Utc>,
    ) -> Result<CycleWrite, CollectError> {
        let payload = self.fetch_with_retries(park.queue_times_id).await?;
        let rides = self.rides.get_active_for_park(park.park_id).await?;
        let classes = self.classifications.for_park(park.park_id).await?;
        let schedule_open = self.parks.schedule_covers(park.park_id, recorded_at).await?;

        let cycle = build_park_cycle(
            &park,
            &rides,
            &classes,
            &payload.all_rides(),
            schedule_open,
            recorded_at,
        );

        let write = self
            .snapshots
            .record_cycle(&cycle.park_snapshot, &cycle.ride_snapshots)
            .await?;
        self.rides
            .refresh_last_operated(&cycle.operated_now, recorded_at)
            .await?;

        debug!(
            park_id = %park.park_id,
            rides_open = cycle.park_snapshot.rides_open,
            shame = ?cycle.park_snapshot.shame_score,
            "Park collected"
        );
        Ok(write)
    }

    async fn fetch_with_retries(
        &self,
        vendor_park_id: i64,
    ) -> Result<crate::client::QueueTimesResponse, CollectError> {
        let mut last_error = None;
        for attempt in 0..=self.settings.fetch_retries {
            match self.client.queue_times(vendor_park_id).await {
                Ok(payload) => return Ok(payload),
                Err(e) => {
                    debug!(park = vendor_park_id, attempt, error = %e, "Fetch attempt failed");
                    last_error = Some(e);
                    tokio::time::sleep(Duration::from_millis(250 * u64::from(attempt + 1))).await;
                }
            }
        }
        Err(last_error.unwrap_or(CollectError::Upstream {
            park: vendor_park_id,
            message: "no attempts made".to_string(),
        }))
    }

    /// Sync the park and ride rosters from the vendor listing.
    ///
    /// The `down_semantics` flag is derived here from the configured operator
    /// list and persisted, so every downstream predicate reads one column.
    ///
    /// # Errors
    /// Returns error if the listing cannot be fetched or a write fails.
    pub async fn sync_parks(&self, scoring: &ScoringSettings) -> Result<(u32, u32), CollectError> {
        let groups = self.client.list_parks().await?;
        let mut parks_synced = 0;
        let mut rides_synced = 0;

        for group in groups {
            let operator = group.name.to_lowercase();
            let is_disney = operator.contains("disney");
            let is_universal = operator.contains("universal");
            let down_semantics = scoring.uses_down_semantics(&operator);

            for listing in group.parks {
                let Some(timezone) = listing.timezone.clone() else {
                    warn!(park = listing.id, "Listing missing timezone; skipped");
                    continue;
                };
                if parse_timezone(&timezone).is_err() {
                    warn!(park = listing.id, %timezone, "Invalid timezone; skipped");
                    continue;
                }

                let vendor_park = VendorPark {
                    queue_times_id: listing.id,
                    name: listing.name.clone(),
                    city: String::new(),
                    state_province: String::new(),
                    country: listing.country.clone().unwrap_or_default(),
                    timezone,
                    operator: operator.clone(),
                };
                let park_id = self
                    .parks
                    .upsert_from_vendor(&vendor_park, is_disney, is_universal, down_semantics)
                    .await?;
                parks_synced += 1;

                match self.client.queue_times(listing.id).await {
                    Ok(payload) => {
                        for (area, api_ride) in payload.all_rides() {
                            self.rides
                                .upsert_from_vendor(
                                    park_id,
                                    &VendorRide {
                                        queue_times_id: api_ride.id,
                                        name: api_ride.name,
                                        area: area.clone(),
                                    },
                                )
                                .await?;
                            rides_synced += 1;
                        }
                    }
                    Err(e) => {
                        warn!(park = listing.id, error = %e, "Ride sync skipped");
                    }
                }
            }
        }

        info!(parks_synced, rides_synced, "Roster sync complete");
        Ok((parks_synced, rides_synced))
    }

    /// Run collection cycles forever at the configured interval.
    ///
    /// The first cycle runs immediately; subsequent cycles tick on the
    /// interval. Cycle errors are logged and the loop continues.
    pub async fn run_loop(&self) {
        let period = Duration::from_secs(u64::from(self.settings.snapshot_interval_minutes) * 60);
        let mut ticker = interval(period);
        info!(
            interval_minutes = self.settings.snapshot_interval_minutes,
            "Collector loop started"
        );

        loop {
            ticker.tick().await;
            if let Err(e) = self.run_cycle().await {
                error!(error = %e, "Collection cycle failed");
            }
        }
    }
}
