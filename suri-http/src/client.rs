//! HTTP client implementation

use crate::errors::HttpError;
use crate::types::{HttpMethod, HttpResponse};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;
use std::str::FromStr;
use suri_config::HttpConfig;
use tracing::{debug, info};

/// HTTP client trait for the call proxy's single request shape: one URL, at
/// most one caller-specified header, an optional body implying POST.
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    async fn call_http(
        &self,
        url: &str,
        header: Option<(&str, &str)>,
        body: Option<&str>,
    ) -> Result<HttpResponse, HttpError>;
}

/// HTTP manager handling real requests, with mock support for tests
#[derive(Debug, Clone)]
pub struct HttpManager {
    offline: bool,
    mocks: HashMap<String, HttpResponse>,
    client: reqwest::Client,
    config: HttpConfig,
}

impl HttpManager {
    /// Create a new HttpManager in online mode with default configuration
    pub fn new() -> Result<Self, HttpError> {
        Self::with_config(HttpConfig::default())
    }

    /// Create a new HttpManager with specific configuration
    pub fn with_config(config: HttpConfig) -> Result<Self, HttpError> {
        debug!(
            "Creating HttpManager with timeout: {}s",
            config.timeout.as_secs()
        );
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .redirect(reqwest::redirect::Policy::limited(
                config.max_redirects as usize,
            ))
            .build()?;

        Ok(Self {
            offline: false,
            mocks: HashMap::new(),
            client,
            config,
        })
    }

    /// Create an offline manager for tests; every request is served from
    /// registered mocks and the transport client is never used
    pub fn offline() -> Self {
        Self {
            offline: true,
            mocks: HashMap::new(),
            client: reqwest::Client::new(),
            config: HttpConfig::default(),
        }
    }

    /// Set offline mode
    pub fn set_offline(&mut self) {
        self.offline = true;
        debug!("HttpManager set to offline mode");
    }

    /// Add a single HTTP mock keyed by method and URL
    pub fn add_mock(&mut self, method: HttpMethod, url: &str, response: HttpResponse) {
        let key = format!("{}:{}", method.as_str(), url);
        self.mocks.insert(key, response);
        debug!("Added HTTP mock for {} {}", method, url);
    }

    /// Clear all mocks
    pub fn clear_mocks(&mut self) {
        self.mocks.clear();
        debug!("Cleared all HTTP mocks");
    }

    /// The configured request timeout
    pub fn timeout(&self) -> std::time::Duration {
        self.config.timeout
    }

    fn mock_response(&self, method: HttpMethod, url: &str) -> Result<HttpResponse, HttpError> {
        let key = format!("{}:{}", method.as_str(), url);
        match self.mocks.get(&key) {
            Some(response) => {
                debug!("Serving mock response for {} {}", method, url);
                Ok(response.clone())
            }
            None => Err(HttpError::NoMockResponse(key)),
        }
    }
}

#[async_trait::async_trait]
impl HttpClient for HttpManager {
    async fn call_http(
        &self,
        url: &str,
        header: Option<(&str, &str)>,
        body: Option<&str>,
    ) -> Result<HttpResponse, HttpError> {
        let method = HttpMethod::from_body(body);

        // Reject malformed URLs before they reach the transport. Only the
        // host is ever logged: widget URLs routinely carry secrets in their
        // query strings.
        let parsed = url::Url::parse(url).map_err(|e| HttpError::InvalidUrl(e.to_string()))?;
        info!(
            "Making {} request to host: {}",
            method,
            parsed.host_str().unwrap_or("-")
        );

        if self.offline {
            return self.mock_response(method, url);
        }

        let mut request = self.client.request(method.into(), url);

        if let Some((name, value)) = header {
            let header_name = HeaderName::from_str(name)
                .map_err(|_| HttpError::InvalidHeaderName(name.to_string()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| HttpError::InvalidHeaderValue(name.to_string()))?;
            let mut header_map = HeaderMap::new();
            header_map.insert(header_name, header_value);
            request = request.headers(header_map);
        }

        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        debug!("Sending HTTP request");
        let response = request.send().await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        info!("HTTP response received: {} ({} bytes)", status, body.len());

        Ok(HttpResponse { status, body })
    }
}
