//! AirLabs schedules API client.
//!
//! The origin behind the flight cache: one `GET /schedules` per location
//! and direction.
//!
//! ### Specification
//!
//! - **Endpoint**: `https://airlabs.co/api/v9/schedules`
//! - **Authentication**: `api_key` query parameter. The key never appears in logs.
//! - **Filtering**: `dep_iata=<code>` for departures, `arr_iata=<code>` for arrivals.
//! - **Normalization**: items without `flight_iata` or `dep_time` are dropped;
//!   the rest become [`FlightRecord`]s without a storage id.

pub mod error;
pub mod request;
pub mod response;

pub use error::AirLabsError;
pub use request::ScheduleRequest;
pub use response::{ScheduleBatch, parse_body};

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use flightcache_core::{AppConfig, CacheKey, Error, FlightRecord, OriginFetcher};
use reqwest::header;
use url::Url;

/// Default base URL for the AirLabs API.
const DEFAULT_BASE_URL: &str = "https://airlabs.co/api/v9";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_USER_AGENT: &str = "flightcache/0.1";

/// AirLabs client configuration.
#[derive(Clone)]
pub struct AirLabsConfig {
    pub api_key: String,
    /// Base URL (default: https://airlabs.co/api/v9).
    pub base_url: String,
    /// Request timeout (default: 10s).
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for AirLabsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl std::fmt::Debug for AirLabsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirLabsConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl AirLabsConfig {
    /// Build from application configuration.
    ///
    /// Returns `MissingApiKey` when no usable key is configured.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, AirLabsError> {
        let api_key = config.require_airlabs_api_key().map_err(|_| AirLabsError::MissingApiKey)?;
        Ok(Self {
            api_key: api_key.to_string(),
            base_url: config.airlabs_base_url.clone(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
        })
    }
}

/// AirLabs schedules client.
#[derive(Debug, Clone)]
pub struct AirLabsClient {
    http: reqwest::Client,
    config: AirLabsConfig,
    endpoint: Url,
}

impl AirLabsClient {
    /// Create a new client with the given configuration.
    pub fn new(config: AirLabsConfig) -> Result<Self, AirLabsError> {
        if config.api_key.trim().is_empty() {
            return Err(AirLabsError::MissingApiKey);
        }

        let endpoint = Url::parse(&format!("{}/schedules", config.base_url.trim_end_matches('/')))
            .map_err(|e| AirLabsError::InvalidBaseUrl(format!("{}: {e}", config.base_url)))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(AirLabsError::InvalidBaseUrl(config.base_url.clone()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| AirLabsError::Network(Arc::new(e)))?;

        Ok(Self { http, config, endpoint })
    }

    /// Create a client from application configuration.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, AirLabsError> {
        Self::new(AirLabsConfig::from_app_config(config)?)
    }

    /// Request URL without the API key, safe to log.
    fn redacted_url(&self, req: &ScheduleRequest) -> Url {
        let mut url = self.endpoint.clone();
        let (name, value) = req.filter();
        url.query_pairs_mut().append_pair(name, value);
        url
    }

    /// Fetch schedules for one location and direction.
    pub async fn schedules(&self, req: &ScheduleRequest) -> Result<ScheduleBatch, AirLabsError> {
        req.validate()?;

        let start = Instant::now();
        let url = self.redacted_url(req);
        tracing::debug!(url = %url, "fetching AirLabs schedules");

        let mut authed = url;
        authed.query_pairs_mut().append_pair("api_key", &self.config.api_key);

        let http_response = self
            .http
            .get(authed)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = http_response.status();
        tracing::debug!(%status, "AirLabs response status");

        if status == 401 || status == 403 {
            return Err(AirLabsError::AuthError);
        }

        if status == 429 {
            return Err(AirLabsError::RateLimited);
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(AirLabsError::HttpError { status: status.as_u16() });
        }

        let bytes = http_response.bytes().await?;
        let batch = parse_body(&bytes)?;

        if batch.dropped > 0 {
            tracing::warn!(
                code = %req.code,
                direction = %req.direction.as_str(),
                dropped = batch.dropped,
                "dropped schedule items without flight code or departure time"
            );
        }
        tracing::debug!(
            "schedules fetched in {:?}, {} records",
            start.elapsed(),
            batch.records.len()
        );

        Ok(batch)
    }
}

#[async_trait]
impl OriginFetcher for AirLabsClient {
    async fn fetch_schedules(&self, key: &CacheKey) -> Result<Vec<FlightRecord>, Error> {
        let batch = self.schedules(&ScheduleRequest::from(key)).await?;
        Ok(batch.records)
    }
}

#[cfg(test)]
mod tests {
    use flightcache_core::Direction;
    use mockito::{Matcher, Server};

    use super::*;

    const BODY: &str = r#"{"response": [
        {"flight_iata": "VN220", "dep_iata": "SGN", "dep_time": "2025-01-10 08:30", "arr_iata": "HAN", "status": "scheduled"},
        {"flight_iata": "VJ120", "dep_iata": "SGN", "dep_time": "2025-01-10 09:00", "arr_iata": "DAD", "status": "active"},
        {"dep_iata": "SGN", "dep_time": "2025-01-10 09:30"}
    ]}"#;

    fn client(base_url: String) -> AirLabsClient {
        AirLabsClient::new(AirLabsConfig {
            api_key: "test-key".into(),
            base_url,
            timeout: Duration::from_secs(2),
            ..Default::default()
        })
        .unwrap()
    }

    fn departures(code: &str) -> ScheduleRequest {
        ScheduleRequest::new(code, Direction::Departures)
    }

    #[test]
    fn test_new_requires_api_key() {
        let result = AirLabsClient::new(AirLabsConfig::default());
        assert!(matches!(result, Err(AirLabsError::MissingApiKey)));
    }

    #[test]
    fn test_new_rejects_bad_base_url() {
        let config = AirLabsConfig { api_key: "k".into(), base_url: "not a url".into(), ..Default::default() };
        assert!(matches!(AirLabsClient::new(config), Err(AirLabsError::InvalidBaseUrl(_))));

        let config = AirLabsConfig { api_key: "k".into(), base_url: "ftp://airlabs.co".into(), ..Default::default() };
        assert!(matches!(AirLabsClient::new(config), Err(AirLabsError::InvalidBaseUrl(_))));
    }

    #[test]
    fn test_config_from_app_config() {
        let app = AppConfig { airlabs_api_key: Some("abc".into()), timeout_ms: 2500, ..Default::default() };
        let config = AirLabsConfig::from_app_config(&app).unwrap();
        assert_eq!(config.api_key, "abc");
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.base_url, "https://airlabs.co/api/v9");

        assert!(matches!(
            AirLabsConfig::from_app_config(&AppConfig::default()),
            Err(AirLabsError::MissingApiKey)
        ));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = AirLabsConfig { api_key: "secret-key".into(), ..Default::default() };
        assert!(!format!("{config:?}").contains("secret-key"));
    }

    #[test]
    fn test_redacted_url_has_filter_only() {
        let client = client("https://airlabs.co/api/v9/".into());
        let url = client.redacted_url(&ScheduleRequest::new("HAN", Direction::Arrivals));
        assert_eq!(url.as_str(), "https://airlabs.co/api/v9/schedules?arr_iata=HAN");
    }

    #[tokio::test]
    async fn test_schedules_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/schedules")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("dep_iata".into(), "SGN".into()),
                Matcher::UrlEncoded("api_key".into(), "test-key".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(BODY)
            .create_async()
            .await;

        let batch = client(server.url()).schedules(&departures("SGN")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.dropped, 1);
        assert_eq!(batch.records[0].flight_iata, "VN220");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let mut server = Server::new_async().await;
        let cases = [
            ("HAN", 401, "auth"),
            ("DAD", 403, "auth"),
            ("CXR", 429, "rate"),
            ("PQC", 502, "http"),
        ];
        for (code, status, _) in &cases {
            server
                .mock("GET", "/schedules")
                .match_query(Matcher::UrlEncoded("dep_iata".into(), (*code).into()))
                .with_status(*status)
                .create_async()
                .await;
        }

        let client = client(server.url());
        for (code, status, kind) in cases {
            let err = client.schedules(&departures(code)).await.unwrap_err();
            let matched = match kind {
                "auth" => matches!(err, AirLabsError::AuthError),
                "rate" => matches!(err, AirLabsError::RateLimited),
                _ => matches!(err, AirLabsError::HttpError { status: s } if s == status as u16),
            };
            assert!(matched, "status {status} produced {err:?}");
        }
    }

    #[tokio::test]
    async fn test_provider_error_body() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/schedules")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error": {"message": "Unknown API key", "code": "unknown_api_key"}}"#)
            .create_async()
            .await;

        let err = client(server.url()).schedules(&departures("SGN")).await.unwrap_err();
        assert!(matches!(err, AirLabsError::Api { .. }));
    }

    #[tokio::test]
    async fn test_invalid_code_skips_request() {
        let mut server = Server::new_async().await;
        let mock = server.mock("GET", "/schedules").match_query(Matcher::Any).expect(0).create_async().await;

        let err = client(server.url()).schedules(&departures("S")).await.unwrap_err();

        assert!(matches!(err, AirLabsError::InvalidCode(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_origin_fetcher_maps_errors() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/schedules")
            .match_query(Matcher::UrlEncoded("arr_iata".into(), "HAN".into()))
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;
        server
            .mock("GET", "/schedules")
            .match_query(Matcher::UrlEncoded("dep_iata".into(), "HAN".into()))
            .with_status(503)
            .create_async()
            .await;

        let client = client(server.url());

        let key = CacheKey::new("han", Direction::Arrivals).unwrap();
        assert!(matches!(client.fetch_schedules(&key).await, Err(Error::OriginMalformed(_))));

        let key = CacheKey::new("HAN", Direction::Departures).unwrap();
        assert!(matches!(client.fetch_schedules(&key).await, Err(Error::OriginUnavailable(_))));
    }

    #[tokio::test]
    async fn test_network_error_omits_api_key() {
        let client = AirLabsClient::new(AirLabsConfig {
            api_key: "SUPERSECRET".into(),
            base_url: "http://127.0.0.1:9".into(),
            timeout: Duration::from_secs(2),
            ..Default::default()
        })
        .unwrap();

        let err = client.schedules(&departures("SGN")).await.unwrap_err();
        assert!(!format!("{err} {err:?}").contains("SUPERSECRET"), "{err:?}");

        let key = CacheKey::new("SGN", Direction::Departures).unwrap();
        let err = client.fetch_schedules(&key).await.unwrap_err();
        assert!(err.is_origin_failure());
        assert!(!format!("{err} {err:?}").contains("SUPERSECRET"), "{err:?}");
    }

    #[tokio::test]
    async fn test_origin_fetcher_empty_response() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/schedules")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"response": []}"#)
            .create_async()
            .await;

        let key = CacheKey::new("VCS", Direction::Arrivals).unwrap();
        let records = client(server.url()).fetch_schedules(&key).await.unwrap();
        assert!(records.is_empty());
    }
}
