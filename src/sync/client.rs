//! WebDAV client
//!
//! Thin HTTP client for the WebDAV operations sync needs: MKCOL to ensure
//! the remote collection exists and PUT to upload document bodies.
//! Basic-Auth credentials are supplied on every call.

use reqwest::{Client, Method, StatusCode};
use thiserror::Error;

/// WebDAV connection configuration
#[derive(Debug, Clone)]
pub struct WebDavConfig {
    /// Server base URL (e.g. "https://dav.example.com/remote.php/dav")
    pub base_url: String,
    /// Remote collection that holds the backup (e.g. "vitalog")
    pub remote_dir: String,
    /// Basic-Auth username
    pub username: String,
    /// Basic-Auth password
    pub password: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for WebDavConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            remote_dir: "vitalog".to_string(),
            username: String::new(),
            password: String::new(),
            request_timeout_ms: 15_000,
        }
    }
}

/// WebDAV client over reqwest
pub struct WebDavClient {
    client: Client,
    config: WebDavConfig,
}

impl WebDavClient {
    /// Create a client with the given configuration
    pub fn new(config: WebDavConfig) -> Result<Self, WebDavError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(WebDavError::Request)?;
        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &WebDavConfig {
        &self.config
    }

    /// Build the absolute URL for a path inside the remote collection
    pub fn remote_url(&self, name: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let dir = self.config.remote_dir.trim_matches('/');
        if name.is_empty() {
            format!("{base}/{dir}")
        } else {
            format!("{base}/{dir}/{name}")
        }
    }

    /// Ensure the remote collection exists
    ///
    /// MKCOL on an existing collection answers 405, which is success here.
    pub async fn ensure_collection(&self) -> Result<(), WebDavError> {
        let url = self.remote_url("");
        let method = Method::from_bytes(b"MKCOL").expect("static method name");

        let response = self
            .client
            .request(method, &url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await
            .map_err(map_transport_error)?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::METHOD_NOT_ALLOWED => Ok(()),
            status => Err(WebDavError::Server {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }),
        }
    }

    /// Upload a document body into the remote collection
    pub async fn put(
        &self,
        name: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), WebDavError> {
        let url = self.remote_url(name);

        let response = self
            .client
            .put(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            Err(WebDavError::Server {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            })
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> WebDavError {
    if e.is_timeout() {
        WebDavError::Timeout
    } else if e.is_connect() {
        WebDavError::Unavailable
    } else {
        WebDavError::Request(e)
    }
}

/// Errors that can occur talking to the WebDAV server
#[derive(Error, Debug)]
pub enum WebDavError {
    #[error("WebDAV server unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },
}
