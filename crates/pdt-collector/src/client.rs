//! HTTP client for the Queue-Times ride-status API.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::CollectError;

/// One ride as reported by the upstream API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRide {
    pub id: i64,
    pub name: String,
    /// Raw open flag; may be absent on some feeds
    #[serde(default)]
    pub is_open: Option<bool>,
    /// Wait time in minutes
    #[serde(default)]
    pub wait_time: Option<i32>,
    /// Status string where the feed provides one (OPERATING, DOWN, ...)
    #[serde(default)]
    pub status: Option<String>,
    /// Last update timestamp reported upstream
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// A themed land grouping rides in the queue-times payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiLand {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rides: Vec<ApiRide>,
}

/// Queue-times payload for one park.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueTimesResponse {
    #[serde(default)]
    pub lands: Vec<ApiLand>,
    /// Rides outside any land
    #[serde(default)]
    pub rides: Vec<ApiRide>,
}

impl QueueTimesResponse {
    /// Flatten lands into one `(area, ride)` list.
    #[must_use]
    pub fn all_rides(self) -> Vec<(Option<String>, ApiRide)> {
        let mut result: Vec<(Option<String>, ApiRide)> = Vec::new();
        for land in self.lands {
            for ride in land.rides {
                result.push((land.name.clone(), ride));
            }
        }
        for ride in self.rides {
            result.push((None, ride));
        }
        result
    }
}

/// One park in the vendor's park listing.
#[derive(Debug, Clone, Deserialize)]
pub struct VendorParkListing {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub continent: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Park-group wrapper in the listing payload (parks are grouped by company).
#[derive(Debug, Clone, Deserialize)]
pub struct VendorParkGroup {
    pub name: String,
    #[serde(default)]
    pub parks: Vec<VendorParkListing>,
}

/// Client for the queue-times API.
pub struct QueueTimesClient {
    http: reqwest::Client,
    base_url: String,
}

impl QueueTimesClient {
    /// Create a client with a per-request timeout.
    ///
    /// # Errors
    /// Returns error if the underlying HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CollectError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollectError::Internal(anyhow::anyhow!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the full park listing, grouped by operating company.
    ///
    /// # Errors
    /// Returns error on network failure or an unparseable payload.
    pub async fn list_parks(&self) -> Result<Vec<VendorParkGroup>, CollectError> {
        let url = format!("{}/parks.json", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| CollectError::Payload(format!("GET {url}: {e}")))?
            .error_for_status()
            .map_err(|e| CollectError::Payload(format!("GET {url}: {e}")))?;
        response
            .json()
            .await
            .map_err(|e| CollectError::Payload(format!("parks.json parse: {e}")))
    }

    /// Fetch current queue times for one park.
    ///
    /// # Errors
    /// Returns error on network failure or an unparseable payload.
    pub async fn queue_times(&self, vendor_park_id: i64) -> Result<QueueTimesResponse, CollectError> {
        let url = format!("{}/parks/{}/queue_times.json", self.base_url, vendor_park_id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| CollectError::Upstream {
                park: vendor_park_id,
                message: e.to_string(),
            })?
            .error_for_status()
            .map_err(|e| CollectError::Upstream {
                park: vendor_park_id,
                message: e.to_string(),
            })?;
        response.json().await.map_err(|e| CollectError::Upstream {
            park: vendor_park_id,
            message: format!("parse: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_queue_times_parses_lands_and_loose_rides() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/parks/7/queue_times.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "lands": [
                    {
                        "id": 1,
                        "name": "Tomorrowland",
                        "rides": [
                            {"id": 11, "name": "Space Mountain", "is_open": true,
                             "wait_time": 45, "last_updated": "2025-06-01T12:00:00Z"}
                        ]
                    }
                ],
                "rides": [
                    {"id": 12, "name": "Main Street Railroad", "is_open": false, "wait_time": 0}
                ]
            })))
            .mount(&server)
            .await;

        let client =
            QueueTimesClient::new(&server.uri(), Duration::from_secs(2)).unwrap();
        let response = client.queue_times(7).await.unwrap();
        let rides = response.all_rides();

        assert_eq!(rides.len(), 2);
        assert_eq!(rides[0].0.as_deref(), Some("Tomorrowland"));
        assert_eq!(rides[0].1.wait_time, Some(45));
        assert_eq!(rides[1].0, None);
        assert_eq!(rides[1].1.is_open, Some(false));
    }

    #[tokio::test]
    async fn test_queue_times_5xx_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/parks/7/queue_times.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client =
            QueueTimesClient::new(&server.uri(), Duration::from_secs(2)).unwrap();
        let err = client.queue_times(7).await.unwrap_err();
        assert!(matches!(err, CollectError::Upstream { park: 7, .. }));
    }

    #[tokio::test]
    async fn test_list_parks_parses_groups() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/parks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": 1,
                    "name": "Walt Disney Attractions",
                    "parks": [
                        {"id": 101, "name": "Magic Kingdom", "country": "United States",
                         "continent": "North America", "timezone": "America/New_York"}
                    ]
                }
            ])))
            .mount(&server)
            .await;

        let client =
            QueueTimesClient::new(&server.uri(), Duration::from_secs(2)).unwrap();
        let groups = client.list_parks().await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "Walt Disney Attractions");
        assert_eq!(groups[0].parks[0].timezone.as_deref(), Some("America/New_York"));
    }
}
