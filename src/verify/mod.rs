// ABOUTME: Health probes over the deployed workload's two network paths.
// ABOUTME: Edge gateway and direct load balancer; results are advisory, never fatal.

pub mod smoke;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMethod {
    Get,
    Post,
}

/// One HTTP call issued by the verifier or smoke suite.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub method: ProbeMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// JSON body for POST requests.
    pub body: Option<String>,
}

impl ProbeRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: ProbeMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: ProbeMethod::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body.into()),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
}

impl ProbeResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP seam so verification logic can be exercised without a live
/// endpoint.
#[async_trait]
pub trait HttpProbe: Send + Sync {
    async fn request(&self, request: &ProbeRequest) -> Result<ProbeResponse, ProbeError>;
}

/// Real probe backed by reqwest with a per-request timeout.
pub struct ReqwestProbe {
    client: reqwest::Client,
}

impl ReqwestProbe {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            // The direct load-balancer path is probed before DNS and
            // certificates have settled.
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| ProbeError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpProbe for ReqwestProbe {
    async fn request(&self, request: &ProbeRequest) -> Result<ProbeResponse, ProbeError> {
        let mut builder = match request.method {
            ProbeMethod::Get => self.client.get(&request.url),
            ProbeMethod::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(body) = &request.body {
            builder = builder
                .header("content-type", "application/json")
                .body(body.clone());
        }

        let response = builder.send().await.map_err(|e| ProbeError::Request {
            url: request.url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| ProbeError::Request {
            url: request.url.clone(),
            message: e.to_string(),
        })?;

        Ok(ProbeResponse { status, body })
    }
}

/// A network path to probe, by operator-facing name.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub name: String,
    pub base_url: String,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// One probe result.
#[derive(Debug, Clone)]
pub struct HealthRecord {
    pub endpoint: String,
    pub url: String,
    pub passed: bool,
    pub status: Option<u16>,
    pub detail: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// Pass/fail per probed path; printed for the operator, not persisted.
#[derive(Debug, Default)]
pub struct HealthReport {
    pub records: Vec<HealthRecord>,
}

impl HealthReport {
    pub fn all_passed(&self) -> bool {
        self.records.iter().all(|r| r.passed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &HealthRecord> {
        self.records.iter().filter(|r| !r.passed)
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }
}

/// Probe `health_path` on every endpoint, sequentially. Unreachable
/// endpoints become failed records, not errors: verification reports,
/// it does not abort.
pub async fn probe_health<P: HttpProbe>(
    probe: &P,
    endpoints: &[Endpoint],
    health_path: &str,
) -> HealthReport {
    let mut report = HealthReport::default();

    for endpoint in endpoints {
        let url = endpoint.url_for(health_path);
        let record = match probe.request(&ProbeRequest::get(&url)).await {
            Ok(response) => HealthRecord {
                endpoint: endpoint.name.clone(),
                url,
                passed: response.is_success(),
                status: Some(response.status),
                detail: (!response.is_success()).then(|| trim_body(&response.body)),
                checked_at: Utc::now(),
            },
            Err(e) => HealthRecord {
                endpoint: endpoint.name.clone(),
                url,
                passed: false,
                status: None,
                detail: Some(e.to_string()),
                checked_at: Utc::now(),
            },
        };
        report.records.push(record);
    }

    report
}

fn trim_body(body: &str) -> String {
    body.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_paths_without_double_slash() {
        let endpoint = Endpoint::new("edge gateway", "https://api.example.com/");
        assert_eq!(
            endpoint.url_for("/health"),
            "https://api.example.com/health"
        );
    }

    #[test]
    fn response_success_is_2xx() {
        let ok = ProbeResponse {
            status: 204,
            body: String::new(),
        };
        let bad = ProbeResponse {
            status: 503,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!bad.is_success());
    }
}
