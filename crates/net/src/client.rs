//! HTTP client with connection pooling and retry logic

use relup_errors::PlatformError;
use reqwest::{Client, Response};
use std::time::Duration;

/// Network client configuration
#[derive(Debug, Clone)]
pub struct NetConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub retry_count: u32,
    pub retry_delay: Duration,
    /// Maximum silence between two body chunks
    pub chunk_timeout: Duration,
    pub user_agent: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300), // 5 minutes for large downloads
            connect_timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 4,
            retry_count: 3,
            retry_delay: Duration::from_secs(1),
            chunk_timeout: Duration::from_secs(30),
            user_agent: format!("relup/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

fn request_failed(message: impl Into<String>) -> PlatformError {
    PlatformError::DownloadServiceFailed {
        operation: "http".to_string(),
        message: message.into(),
    }
}

/// HTTP client wrapper with retry logic
#[derive(Clone, Debug)]
pub struct NetClient {
    client: Client,
    config: NetConfig,
}

impl NetClient {
    /// Create a new network client
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to initialize.
    pub fn new(config: NetConfig) -> Result<Self, PlatformError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| request_failed(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created with default settings.
    pub fn with_defaults() -> Result<Self, PlatformError> {
        Self::new(NetConfig::default())
    }

    #[must_use]
    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    /// Execute a GET request with retries
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after all retry attempts or the
    /// server answers with a non-success status.
    pub async fn get(&self, url: &str) -> Result<Response, PlatformError> {
        let response = self.retry_request(|| self.client.get(url).send()).await?;
        if !response.status().is_success() {
            return Err(request_failed(format!("HTTP {}", response.status())));
        }
        Ok(response)
    }

    /// Execute a request with retries
    async fn retry_request<F, Fut>(&self, mut f: F) -> Result<Response, PlatformError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<Response, reqwest::Error>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.retry_count {
            if attempt > 0 {
                tokio::time::sleep(self.config.retry_delay * attempt).await;
            }

            match f().await {
                Ok(response) if response.status().is_server_error() => {
                    tracing::debug!(status = %response.status(), attempt, "server error, retrying");
                    last_error = Some(format!("HTTP {}", response.status()));
                }
                Ok(response) => return Ok(response),
                Err(e) => {
                    let retry = Self::should_retry(&e);
                    last_error = Some(Self::describe(&e));
                    // Don't retry on certain errors
                    if !retry {
                        break;
                    }
                }
            }
        }

        Err(request_failed(
            last_error.unwrap_or_else(|| "Unknown error".to_string()),
        ))
    }

    fn describe(error: &reqwest::Error) -> String {
        if error.is_timeout() {
            format!(
                "timed out fetching {}",
                error.url().map(ToString::to_string).unwrap_or_default()
            )
        } else if error.is_connect() {
            format!("connection failed: {error}")
        } else {
            error.to_string()
        }
    }

    /// Determine if an error should be retried
    fn should_retry(error: &reqwest::Error) -> bool {
        // Retry on timeout, connection errors, and server errors
        error.is_timeout()
            || error.is_connect()
            || error.status().is_none_or(|s| s.is_server_error())
    }
}
