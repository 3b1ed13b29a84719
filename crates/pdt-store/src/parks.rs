//! Repository for park rows.

use sqlx::PgPool;

use pdt_core::{Park, ParkId};

use crate::error::StoreError;

/// Upstream park record used by the sync path.
#[derive(Debug, Clone)]
pub struct VendorPark {
    pub queue_times_id: i64,
    pub name: String,
    pub city: String,
    pub state_province: String,
    pub country: String,
    pub timezone: String,
    pub operator: String,
}

const PARK_COLUMNS: &str = "park_id, queue_times_id, name, city, state_province, country, \
                            timezone, operator, is_disney, is_universal, down_semantics, is_active";

/// Repository for park metadata.
pub struct ParkRepository {
    pool: PgPool,
}

impl ParkRepository {
    /// Create a new repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All active parks, ordered by id.
    ///
    /// # Errors
    /// Returns error if the database query fails.
    pub async fn get_all_active(&self) -> Result<Vec<Park>, StoreError> {
        let parks = sqlx::query_as::<_, Park>(&format!(
            "SELECT {PARK_COLUMNS} FROM parks WHERE is_active = TRUE ORDER BY park_id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(parks)
    }

    /// One park by id.
    ///
    /// # Errors
    /// Returns error if the database query fails.
    pub async fn get(&self, park_id: ParkId) -> Result<Option<Park>, StoreError> {
        let park = sqlx::query_as::<_, Park>(&format!(
            "SELECT {PARK_COLUMNS} FROM parks WHERE park_id = $1"
        ))
        .bind(park_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(park)
    }

    /// Distinct timezones of active parks; the daily aggregator iterates
    /// these.
    ///
    /// # Errors
    /// Returns error if the database query fails.
    pub async fn distinct_active_timezones(&self) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT timezone FROM parks WHERE is_active = TRUE ORDER BY timezone",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(tz,)| tz).collect())
    }

    /// Active parks in one timezone, for the per-timezone daily pass.
    ///
    /// # Errors
    /// Returns error if the database query fails.
    pub async fn get_active_in_timezone(&self, timezone: &str) -> Result<Vec<Park>, StoreError> {
        let parks = sqlx::query_as::<_, Park>(&format!(
            "SELECT {PARK_COLUMNS} FROM parks \
             WHERE timezone = $1 AND is_active = TRUE ORDER BY park_id"
        ))
        .bind(timezone)
        .fetch_all(&self.pool)
        .await?;
        Ok(parks)
    }

    /// Whether the park's published schedule covers an instant. Schedules
    /// are optional; absence simply returns false and live activity decides.
    ///
    /// # Errors
    /// Returns error if the database query fails.
    pub async fn schedule_covers(
        &self,
        park_id: ParkId,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<bool, StoreError> {
        let (covered,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (\
                SELECT 1 FROM park_schedules \
                WHERE park_id = $1 AND opens_at_utc <= $2 AND closes_at_utc > $2\
             )",
        )
        .bind(park_id)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;
        Ok(covered)
    }

    /// Upsert a park from the vendor listing.
    ///
    /// `down_semantics` is derived here, at sync time, so every query reads
    /// one persisted flag instead of re-deriving the configured operator
    /// list.
    ///
    /// # Errors
    /// Returns error if the insert/update fails.
    pub async fn upsert_from_vendor(
        &self,
        park: &VendorPark,
        is_disney: bool,
        is_universal: bool,
        down_semantics: bool,
    ) -> Result<ParkId, StoreError> {
        let (park_id,): (ParkId,) = sqlx::query_as(
            r"
            INSERT INTO parks (
                queue_times_id, name, city, state_province, country,
                timezone, operator, is_disney, is_universal, down_semantics
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (queue_times_id) DO UPDATE SET
                name = EXCLUDED.name,
                city = EXCLUDED.city,
                state_province = EXCLUDED.state_province,
                country = EXCLUDED.country,
                timezone = EXCLUDED.timezone,
                operator = EXCLUDED.operator,
                is_disney = EXCLUDED.is_disney,
                is_universal = EXCLUDED.is_universal,
                down_semantics = EXCLUDED.down_semantics,
                updated_at = NOW()
            RETURNING park_id
            ",
        )
        .bind(park.queue_times_id)
        .bind(&park.name)
        .bind(&park.city)
        .bind(&park.state_province)
        .bind(&park.country)
        .bind(&park.timezone)
        .bind(&park.operator)
        .bind(is_disney)
        .bind(is_universal)
        .bind(down_semantics)
        .fetch_one(&self.pool)
        .await?;
        Ok(park_id)
    }
}
