use crate::error::Result;
use crate::query::{self, Params};
use crate::rate_limit::RateLimiter;
use reqwest::blocking::ClientBuilder;
use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use url::Url;

/// Configuration for a base connection.
///
/// Passed explicitly into table registration; there is no process-wide
/// default API key. Tables sharing the same (api_key, base_key) pair share
/// one underlying client.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key used for the Authorization header
    pub api_key: String,
    /// URL scheme (http or https)
    pub scheme: String,
    /// API host
    pub host: String,
    /// Client-side request quota per one-second window
    pub requests_per_second: u32,
    /// Enable debug logging of requests
    pub debug: bool,
}

impl Config {
    /// Create a configuration with the given API key and default endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Config {
            api_key: api_key.into(),
            scheme: "https".to_string(),
            host: "api.airtable.com".to_string(),
            requests_per_second: 5,
            debug: false,
        }
    }

    /// Set the URL scheme
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Set the API host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the per-second request quota
    pub fn with_requests_per_second(mut self, requests_per_second: u32) -> Self {
        self.requests_per_second = requests_per_second;
        self
    }

    /// Set debug mode
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Get the base URL for API requests
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }
}

/// An HTTP request ready for dispatch
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

/// A completed HTTP exchange: status code and raw body
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Synchronous request/response transport.
///
/// The production implementation wraps a blocking reqwest client; tests
/// substitute an in-memory stub through [`Client::with_transport`].
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Default transport backed by reqwest's blocking client
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        ReqwestTransport {
            client: create_http_client(),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?.to_vec();

        Ok(HttpResponse { status, body })
    }
}

/// Create the default HTTP client with settings for connection pooling and
/// timeouts
fn create_http_client() -> reqwest::blocking::Client {
    ClientBuilder::new()
        .pool_max_idle_per_host(50)
        .timeout(Duration::from_secs(300)) // 5 minutes
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to create HTTP client")
}

/// One connection to a base, identified by the (api_key, base_key) pair.
///
/// Owns URL and header construction, the query string encoding, and the
/// rate limiter that gates every dispatch.
pub struct Client {
    config: Config,
    base_key: String,
    transport: Arc<dyn Transport>,
    limiter: Mutex<RateLimiter>,
}

impl Client {
    /// Create a client using the default reqwest transport
    pub fn new(config: Config, base_key: impl Into<String>) -> Self {
        Self::with_transport(config, base_key, Arc::new(ReqwestTransport::new()))
    }

    /// Create a client with a custom transport (used by tests to stub the
    /// HTTP exchange)
    pub fn with_transport(
        config: Config,
        base_key: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let limiter = Mutex::new(RateLimiter::new(config.requests_per_second));
        Client {
            config,
            base_key: base_key.into(),
            transport,
            limiter,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn api_key(&self) -> &str {
        &self.config.api_key
    }

    pub fn base_key(&self) -> &str {
        &self.base_key
    }

    /// Perform one HTTP exchange against the given path.
    ///
    /// Builds the URL and headers, encodes the query string, serializes the
    /// body, and dispatches through the rate limiter. The returned exchange
    /// is not yet validated; callers run it through the response checker.
    pub fn request(
        &self,
        method: Method,
        path: &str,
        query: Option<&Params>,
        body: Option<&Value>,
    ) -> Result<HttpResponse> {
        let mut url = Url::parse(&format!("{}{}", self.config.base_url(), path))?;
        if let Some(params) = query {
            if !params.is_empty() {
                url.set_query(Some(&query::encode(params)));
            }
        }

        let mut headers = vec![
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.config.api_key),
            ),
            (
                "User-Agent".to_string(),
                format!("airrecord-rs/{}", env!("CARGO_PKG_VERSION")),
            ),
            ("X-API-VERSION".to_string(), "0.1.0".to_string()),
        ];

        let body_bytes = match body {
            Some(value) => {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
                Some(serde_json::to_vec(value)?)
            }
            None => None,
        };

        let request = HttpRequest {
            method,
            url: url.into(),
            headers,
            body: body_bytes,
        };

        self.limiter
            .lock()
            .expect("rate limiter lock poisoned")
            .throttle();

        let start = std::time::Instant::now();
        let response = self.transport.execute(&request)?;

        if self.config.debug {
            eprintln!(
                "[airrecord] {} {} => {} ({:?})",
                request.method,
                request.url,
                response.status,
                start.elapsed()
            );
        }

        Ok(response)
    }
}

type Registry = Mutex<HashMap<(String, String), Arc<Client>>>;

static CLIENTS: OnceLock<Registry> = OnceLock::new();

/// Get or create the shared client for an (api_key, base_key) pair.
///
/// The registry lives for the whole process and is never evicted;
/// concurrent first uses of the same pair resolve to a single client. A
/// later call with the same pair but a different config keeps the first
/// client's settings.
pub fn shared(config: &Config, base_key: &str) -> Arc<Client> {
    let registry = CLIENTS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut clients = registry.lock().expect("client registry lock poisoned");

    clients
        .entry((config.api_key.clone(), base_key.to_string()))
        .or_insert_with(|| Arc::new(Client::new(config.clone(), base_key)))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::new("key1");
        assert_eq!(config.scheme, "https");
        assert_eq!(config.host, "api.airtable.com");
        assert_eq!(config.requests_per_second, 5);
        assert!(!config.debug);
    }

    #[test]
    fn test_config_base_url() {
        let config = Config::new("key1")
            .with_scheme("http")
            .with_host("localhost:8080");
        assert_eq!(config.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_shared_clients_reused_per_pair() {
        let config = Config::new("registry-key-1");

        let first = shared(&config, "appA");
        let second = shared(&config, "appA");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_different_pairs_get_different_clients() {
        let one = shared(&Config::new("registry-key-2"), "appA");
        let two = shared(&Config::new("registry-key-2"), "appB");
        let three = shared(&Config::new("registry-key-3"), "appA");

        assert!(!Arc::ptr_eq(&one, &two));
        assert!(!Arc::ptr_eq(&one, &three));
    }
}
