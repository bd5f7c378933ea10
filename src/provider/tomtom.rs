//! HTTP client for the TomTom asynchronous Matrix Routing v2 API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::protocol::{CostRecord, JobId, JobStatus, MatrixRoutingService};
use crate::error::{ClusterError, Result};
use crate::models::Coordinate;

/// Connection and routing options for [`TomTomMatrixService`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomTomConfig {
    pub base_url: String,
    pub api_key: String,
    pub route_type: String,
    pub travel_mode: String,
    /// Timeout for each individual HTTP call.
    pub request_timeout: Duration,
}

impl TomTomConfig {
    /// Default endpoint and routing options with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Overrides the async matrix endpoint.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets `routeType` (e.g. `fastest`, `shortest`).
    pub fn with_route_type(mut self, route_type: impl Into<String>) -> Self {
        self.route_type = route_type.into();
        self
    }

    /// Sets `travelMode` (e.g. `truck`, `car`).
    pub fn with_travel_mode(mut self, mode: impl Into<String>) -> Self {
        self.travel_mode = mode.into();
        self
    }

    /// Sets the timeout of each HTTP call.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for TomTomConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.tomtom.com/routing/matrix/2/async".into(),
            api_key: String::new(),
            route_type: "fastest".into(),
            travel_mode: "truck".into(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
struct WirePoint {
    point: Coordinate,
}

#[derive(Debug, Serialize)]
struct SubmitBody {
    origins: Vec<WirePoint>,
    destinations: Vec<WirePoint>,
}

impl SubmitBody {
    fn new(origins: &[Coordinate], destinations: &[Coordinate]) -> Self {
        let wrap = |c: &[Coordinate]| -> Vec<WirePoint> {
            c.iter().map(|&point| WirePoint { point }).collect()
        };
        Self {
            origins: wrap(origins),
            destinations: wrap(destinations),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    state: String,
}

#[derive(Debug, Deserialize)]
struct ResultResponse {
    data: Vec<ResultCell>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultCell {
    origin_index: usize,
    destination_index: usize,
    route_summary: Option<RouteSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteSummary {
    length_in_meters: f64,
}

/// [`MatrixRoutingService`] over the TomTom async matrix endpoints.
///
/// Costs are route lengths in meters. Cells the API could not route (no
/// `routeSummary`) are left out of the fetched records, which the provider
/// then reports as a data-integrity error.
pub struct TomTomMatrixService {
    http: Client,
    config: TomTomConfig,
}

impl TomTomMatrixService {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// [`ClusterError::InvalidConfig`] if the API key is empty, or
    /// [`ClusterError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: TomTomConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(ClusterError::InvalidConfig("TomTom API key is empty".into()));
        }
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { http, config })
    }

    /// Returns the client settings.
    pub fn config(&self) -> &TomTomConfig {
        &self.config
    }

    fn job_url(&self, job: &JobId) -> String {
        format!("{}/{}", self.config.base_url, job)
    }
}

#[async_trait]
impl MatrixRoutingService for TomTomMatrixService {
    async fn submit(&self, origins: &[Coordinate], destinations: &[Coordinate]) -> Result<JobId> {
        let response = self
            .http
            .post(&self.config.base_url)
            .query(&[
                ("key", self.config.api_key.as_str()),
                ("routeType", self.config.route_type.as_str()),
                ("travelMode", self.config.travel_mode.as_str()),
            ])
            .json(&SubmitBody::new(origins, destinations))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::ACCEPTED {
            return Err(ClusterError::Submission {
                status: status.as_u16(),
                body,
            });
        }
        let job = parse_submit(&body)?;
        debug!(%job, origins = origins.len(), destinations = destinations.len(), "TomTom job accepted");
        Ok(job)
    }

    async fn status(&self, job: &JobId) -> Result<JobStatus> {
        let response = self
            .http
            .get(self.job_url(job))
            .query(&[("key", self.config.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClusterError::Protocol(format!(
                "status poll for job {job} returned {status}: {body}"
            )));
        }
        parse_status(&body)
    }

    async fn fetch(&self, job: &JobId) -> Result<Vec<CostRecord>> {
        let response = self
            .http
            .get(format!("{}/result", self.job_url(job)))
            .query(&[("key", self.config.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClusterError::Protocol(format!(
                "result download for job {job} returned {status}: {body}"
            )));
        }
        parse_result(&body)
    }
}

fn decode<'a, T: Deserialize<'a>>(body: &'a str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| ClusterError::Protocol(format!("{e}: {body}")))
}

fn parse_submit(body: &str) -> Result<JobId> {
    decode::<SubmitResponse>(body).map(|r| JobId::new(r.job_id))
}

fn parse_status(body: &str) -> Result<JobStatus> {
    let response: StatusResponse = decode(body)?;
    Ok(match response.state.as_str() {
        "Completed" => JobStatus::Completed,
        "Failed" => JobStatus::Failed(body.to_string()),
        _ => JobStatus::Pending,
    })
}

fn parse_result(body: &str) -> Result<Vec<CostRecord>> {
    let response: ResultResponse = decode(body)?;
    Ok(response
        .data
        .into_iter()
        .filter_map(|cell| {
            cell.route_summary.map(|s| {
                CostRecord::new(cell.origin_index, cell.destination_index, s.length_in_meters)
            })
        })
        .collect())
}
