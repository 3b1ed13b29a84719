//! The query engine facade: period dispatch and fast/slow path selection.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::debug;

use pdt_config::QuerySettings;
use pdt_core::ParkId;
use pdt_store::ParkRepository;
use pdt_time::{hour_start, parse_timezone, Clock};

use crate::charts::Charts;
use crate::error::QueryError;
use crate::parks::ParkRankings;
use crate::period::Period;
use crate::rides::RideRankings;
use crate::types::{
    ParkRankingEntry, RankingFilter, RankingResponse, RideRankingEntry, SortBy, TimeSeriesResponse,
};

/// Answers ranking and chart requests for the fixed period menu.
pub struct QueryEngine {
    parks: ParkRankings,
    rides: RideRankings,
    charts: Charts,
    park_repo: ParkRepository,
    pool: PgPool,
    settings: QuerySettings,
    clock: Arc<dyn Clock>,
}

impl QueryEngine {
    /// Create an engine over a shared pool.
    #[must_use]
    pub fn new(
        pool: PgPool,
        settings: QuerySettings,
        interval_minutes: u32,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            parks: ParkRankings::new(pool.clone(), interval_minutes),
            rides: RideRankings::new(pool.clone(), interval_minutes),
            charts: Charts::new(pool.clone()),
            park_repo: ParkRepository::new(pool.clone()),
            pool,
            settings,
            clock,
        }
    }

    fn resolve_limit(&self, limit: Option<i64>) -> Result<i64, QueryError> {
        let limit = limit.unwrap_or(self.settings.default_limit);
        if limit <= 0 || limit > 500 {
            return Err(QueryError::InvalidParameter {
                name: "limit",
                value: limit.to_string(),
            });
        }
        Ok(limit)
    }

    /// Park rankings for one period.
    ///
    /// # Errors
    /// Returns `InvalidParameter` for bad caller input, `Database` otherwise.
    pub async fn park_rankings(
        &self,
        period: Period,
        filter: RankingFilter,
        sort_by: SortBy,
        limit: Option<i64>,
    ) -> Result<RankingResponse<ParkRankingEntry>, QueryError> {
        let now = self.clock.now_utc();
        let limit = self.resolve_limit(limit)?;
        debug!(period = period.as_str(), filter = filter.as_str(), "Park rankings");

        let data = match period {
            Period::Live => {
                let (start, end) = period.window_utc(now);
                self.parks.live(start, end, filter, limit).await?
            }
            Period::Today => {
                let (day_start, _) = period.window_utc(now);
                if self.settings.use_aggregates {
                    let current_hour = hour_start(now);
                    self.parks
                        .today_fast(day_start, current_hour, now, filter, sort_by, limit)
                        .await?
                } else {
                    // Zero-score parks did not earn a rank today
                    self.parks
                        .raw_window(day_start, now, filter, sort_by, limit, false)
                        .await?
                }
            }
            Period::Yesterday => {
                if self.settings.use_aggregates {
                    let (date, _) = period
                        .date_range(now)
                        .unwrap_or((now.date_naive(), now.date_naive()));
                    self.parks.daily(date, filter, sort_by, limit).await?
                } else {
                    let (start, end) = period.window_utc(now);
                    // YESTERDAY keeps zero-score parks, ordered by downtime
                    self.parks
                        .raw_window(start, end, filter, sort_by, limit, true)
                        .await?
                }
            }
            Period::SevenDays | Period::ThirtyDays => {
                let (start, end) = period
                    .date_range(now)
                    .unwrap_or((now.date_naive(), now.date_naive()));
                self.parks
                    .trailing_daily(start, end, filter, sort_by, limit)
                    .await?
            }
        };

        Ok(RankingResponse::new(period.as_str(), filter, sort_by, data))
    }

    /// Ride rankings for one period.
    ///
    /// # Errors
    /// Returns `InvalidParameter` for bad caller input, `Database` otherwise.
    pub async fn ride_rankings(
        &self,
        period: Period,
        filter: RankingFilter,
        limit: Option<i64>,
    ) -> Result<RankingResponse<RideRankingEntry>, QueryError> {
        let now = self.clock.now_utc();
        let limit = self.resolve_limit(limit)?;
        debug!(period = period.as_str(), filter = filter.as_str(), "Ride rankings");

        let data = match period {
            Period::Live | Period::Today => {
                let (start, end) = period.window_utc(now);
                self.rides.raw_window(start, end, filter, limit).await?
            }
            Period::Yesterday | Period::SevenDays | Period::ThirtyDays => {
                let (start, end) = period
                    .date_range(now)
                    .unwrap_or((now.date_naive(), now.date_naive()));
                self.rides.daily_range(start, end, filter, limit).await?
            }
        };

        Ok(RankingResponse::new(
            period.as_str(),
            filter,
            SortBy::DowntimeHours,
            data,
        ))
    }

    /// Shame-score time series for one park.
    ///
    /// # Errors
    /// Returns `NotFound` for unknown parks.
    pub async fn park_chart(
        &self,
        park_id: i64,
        period: Period,
    ) -> Result<TimeSeriesResponse, QueryError> {
        let now = self.clock.now_utc();
        let park = self
            .park_repo
            .get(ParkId(park_id))
            .await?
            .ok_or_else(|| QueryError::NotFound(format!("park {park_id}")))?;
        let tz = parse_timezone(&park.timezone)
            .map_err(|e| QueryError::Internal(anyhow::anyhow!(e)))?;

        match period {
            Period::Live => {
                let (start, end) = period.window_utc(now);
                self.charts.park_live(park_id, tz, start, end).await
            }
            Period::Today | Period::Yesterday => {
                let (start, end) = period.window_utc(now);
                if self.settings.use_aggregates {
                    self.charts.park_hourly(park_id, tz, start, end).await
                } else {
                    self.charts.park_hourly_raw(park_id, tz, start, end).await
                }
            }
            Period::SevenDays | Period::ThirtyDays => {
                let (start, end) = period
                    .date_range(now)
                    .unwrap_or((now.date_naive(), now.date_naive()));
                self.charts.park_daily(park_id, start, end).await
            }
        }
    }

    /// Downtime time series for one ride.
    ///
    /// # Errors
    /// Returns `NotFound` for unknown rides; LIVE is not offered at ride
    /// granularity.
    pub async fn ride_chart(
        &self,
        ride_id: i64,
        period: Period,
    ) -> Result<TimeSeriesResponse, QueryError> {
        let now = self.clock.now_utc();
        let timezone: Option<(String,)> = sqlx::query_as(
            "SELECT p.timezone FROM rides r \
             JOIN parks p ON r.park_id = p.park_id \
             WHERE r.ride_id = $1",
        )
        .bind(ride_id)
        .fetch_optional(&self.pool)
        .await?;
        let (timezone,) =
            timezone.ok_or_else(|| QueryError::NotFound(format!("ride {ride_id}")))?;
        let tz = parse_timezone(&timezone)
            .map_err(|e| QueryError::Internal(anyhow::anyhow!(e)))?;

        match period {
            Period::Live => Err(QueryError::InvalidParameter {
                name: "period",
                value: "live (ride charts are hourly or daily)".to_string(),
            }),
            Period::Today | Period::Yesterday => {
                let (start, end) = period.window_utc(now);
                self.charts.ride_hourly(ride_id, tz, start, end).await
            }
            Period::SevenDays | Period::ThirtyDays => {
                let (start, end) = period
                    .date_range(now)
                    .unwrap_or((now.date_naive(), now.date_naive()));
                self.charts.ride_daily(ride_id, start, end).await
            }
        }
    }
}
