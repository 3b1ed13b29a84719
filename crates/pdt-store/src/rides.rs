//! Repository for ride rows.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use pdt_core::{ParkId, Ride, RideId};

use crate::error::StoreError;

/// Upstream ride record used by the sync path.
#[derive(Debug, Clone)]
pub struct VendorRide {
    pub queue_times_id: i64,
    pub name: String,
    pub area: Option<String>,
}

const RIDE_COLUMNS: &str =
    "ride_id, queue_times_id, park_id, name, area, tier, category, is_active, last_operated_at";

/// Repository for ride metadata.
pub struct RideRepository {
    pool: PgPool,
}

impl RideRepository {
    /// Create a new repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All active rides, ordered by id.
    ///
    /// # Errors
    /// Returns error if the database query fails.
    pub async fn get_all_active(&self) -> Result<Vec<Ride>, StoreError> {
        let rides = sqlx::query_as::<_, Ride>(&format!(
            "SELECT {RIDE_COLUMNS} FROM rides WHERE is_active = TRUE ORDER BY ride_id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rides)
    }

    /// Active rides of one park.
    ///
    /// # Errors
    /// Returns error if the database query fails.
    pub async fn get_active_for_park(&self, park_id: ParkId) -> Result<Vec<Ride>, StoreError> {
        let rides = sqlx::query_as::<_, Ride>(&format!(
            "SELECT {RIDE_COLUMNS} FROM rides \
             WHERE park_id = $1 AND is_active = TRUE ORDER BY ride_id"
        ))
        .bind(park_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rides)
    }

    /// Refresh `last_operated_at` for rides observed operating.
    ///
    /// `GREATEST` keeps the column monotonic non-decreasing even if cycles
    /// land out of order.
    ///
    /// # Errors
    /// Returns error if the update fails.
    pub async fn refresh_last_operated(
        &self,
        ride_ids: &[RideId],
        observed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if ride_ids.is_empty() {
            return Ok(());
        }
        let raw_ids: Vec<i64> = ride_ids.iter().map(|id| id.0).collect();
        sqlx::query(
            r"
            UPDATE rides
            SET last_operated_at = GREATEST(COALESCE(last_operated_at, 'epoch'::timestamptz), $2),
                updated_at = NOW()
            WHERE ride_id = ANY($1)
            ",
        )
        .bind(&raw_ids)
        .bind(observed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Upsert a ride from the vendor listing, keyed on `(park, vendor id)`.
    ///
    /// # Errors
    /// Returns error if the insert/update fails.
    pub async fn upsert_from_vendor(
        &self,
        park_id: ParkId,
        ride: &VendorRide,
    ) -> Result<RideId, StoreError> {
        let (ride_id,): (RideId,) = sqlx::query_as(
            r"
            INSERT INTO rides (queue_times_id, park_id, name, area)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (park_id, queue_times_id) DO UPDATE SET
                name = EXCLUDED.name,
                area = EXCLUDED.area,
                updated_at = NOW()
            RETURNING ride_id
            ",
        )
        .bind(ride.queue_times_id)
        .bind(park_id)
        .bind(&ride.name)
        .bind(&ride.area)
        .fetch_one(&self.pool)
        .await?;
        Ok(ride_id)
    }
}
