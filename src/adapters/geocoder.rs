use crate::core::backoff::{parse_retry_after, BackoffPolicy};
use crate::domain::model::LatLon;
use crate::domain::ports::Geocoder;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Method};
use serde::Deserialize;
use std::time::Duration;

pub const ONEMAP_SEARCH_URL: &str = "https://www.onemap.gov.sg/api/common/elastic/search";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    found: u64,
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(rename = "LONGITUDE")]
    longitude: Coordinate,
    #[serde(rename = "LATITUDE")]
    latitude: Coordinate,
}

/// OneMap returns coordinates as strings; plain numbers are accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Coordinate {
    Number(f64),
    Text(String),
}

impl Coordinate {
    fn to_f64(&self) -> Option<f64> {
        match self {
            Coordinate::Number(value) => Some(*value),
            Coordinate::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl SearchResponse {
    fn first_match(&self, postal_code: &str) -> Result<Option<LatLon>> {
        if self.found == 0 {
            return Ok(None);
        }

        let first = self.results.first().ok_or_else(|| EtlError::GeocodeError {
            postal_code: postal_code.to_string(),
            message: format!("response reports {} matches but no results", self.found),
        })?;

        match (first.latitude.to_f64(), first.longitude.to_f64()) {
            (Some(lat), Some(lon)) => Ok(Some(LatLon::new(lat, lon))),
            _ => Err(EtlError::GeocodeError {
                postal_code: postal_code.to_string(),
                message: "unparseable LATITUDE/LONGITUDE".to_string(),
            }),
        }
    }
}

/// Postal code lookup against the OneMap elastic search API.
#[derive(Debug, Clone)]
pub struct OneMapGeocoder {
    client: Client,
    endpoint: String,
    policy: BackoffPolicy,
}

impl OneMapGeocoder {
    pub fn new(endpoint: impl Into<String>, policy: BackoffPolicy, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            policy,
        })
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    async fn wait_before_retry(&self, postal_code: &str, attempt: u32, reason: &str, delay: Duration) {
        tracing::warn!(
            "🔄 Geocoding {} failed ({}), retry {}/{} in {:?}",
            postal_code,
            reason,
            attempt,
            self.policy.max_attempts.saturating_sub(1),
            delay
        );
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl Geocoder for OneMapGeocoder {
    async fn lookup(&self, postal_code: &str) -> Result<Option<LatLon>> {
        let method = Method::GET;
        let mut attempt = 1;

        loop {
            tracing::debug!("Geocoding {} (attempt {})", postal_code, attempt);
            let sent = self
                .client
                .request(method.clone(), &self.endpoint)
                .query(&[
                    ("searchVal", postal_code),
                    ("returnGeom", "Y"),
                    ("getAddrDetails", "Y"),
                    ("pageNum", "1"),
                ])
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(e)
                    if (e.is_connect() || e.is_timeout())
                        && self.policy.should_retry_transport(method.as_str(), attempt) =>
                {
                    let delay = self.policy.delay_for(attempt);
                    self.wait_before_retry(postal_code, attempt, &e.to_string(), delay)
                        .await;
                    attempt += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();
            if status.is_success() {
                let body = response.text().await?;
                let payload: SearchResponse = serde_json::from_str(&body)?;
                return payload.first_match(postal_code);
            }

            if self
                .policy
                .should_retry_status(method.as_str(), status.as_u16(), attempt)
            {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| parse_retry_after(value, chrono::Utc::now()));
                let delay = self
                    .policy
                    .delay_for_status(attempt, status.as_u16(), retry_after);
                self.wait_before_retry(postal_code, attempt, status.as_str(), delay)
                    .await;
                attempt += 1;
                continue;
            }

            return Err(EtlError::HttpStatusError {
                url: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }
    }
}
