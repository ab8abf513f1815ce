use crate::booking::{BookingEndpoint, EndpointResponse};
use crate::config::Settings;
use crate::domain::contract::BookingRequest;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use std::time::Duration;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0";

/// Posts each booking as JSON. Every call is independent and bounded by the
/// client timeout.
#[derive(Debug, Clone)]
pub struct HttpBookingClient {
    http: reqwest::Client,
    url: String,
}

impl HttpBookingClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(&settings.endpoint_url, settings.request_timeout)
    }

    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        anyhow::ensure!(!url.trim().is_empty(), "booking endpoint url must be non-empty");

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build booking http client")?;

        Ok(Self {
            http,
            url: url.trim().to_string(),
        })
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers
    }
}

#[async_trait::async_trait]
impl BookingEndpoint for HttpBookingClient {
    fn endpoint_name(&self) -> &'static str {
        "http_json"
    }

    async fn submit(&self, request: &BookingRequest) -> Result<EndpointResponse> {
        let res = self
            .http
            .post(&self.url)
            .headers(Self::headers())
            .json(request)
            .send()
            .await
            .with_context(|| format!("booking request for {} failed", request.booking_date))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("failed to read booking response body")?;

        Ok(EndpointResponse {
            status: status.as_u16(),
            body,
        })
    }
}
