//! Obtaining the initial image of a run.
//!
//! The executor never reads sources itself; it asks an [`ImageFetcher`].
//! [`DefaultFetcher`] covers the references a chat attachment can carry:
//! remote URLs, inline `data:` URLs, local paths and raw bytes.

use crate::config::ImagerConfig;
use crate::core::error::FetchError;
use crate::core::types::ImageSource;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Default cap on downloaded bytes (8 MiB).
pub const DEFAULT_MAX_DOWNLOAD_BYTES: usize = 8 * 1024 * 1024;

/// Default network timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolves an [`ImageSource`] to encoded image bytes.
pub trait ImageFetcher: Send + Sync {
    /// Fetch the encoded bytes behind a source.
    fn fetch(&self, source: &ImageSource) -> Result<Vec<u8>, FetchError>;
}

/// Fetcher for URLs, data URLs, paths and in-memory bytes.
pub struct DefaultFetcher {
    agent: ureq::Agent,
    max_download_bytes: usize,
}

impl DefaultFetcher {
    /// Create a fetcher with default limits.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_DOWNLOAD_BYTES, DEFAULT_FETCH_TIMEOUT)
    }

    /// Create a fetcher with an explicit size cap and network timeout.
    pub fn with_limits(max_download_bytes: usize, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            max_download_bytes,
        }
    }

    /// Create a fetcher from configuration.
    pub fn from_config(config: &ImagerConfig) -> Self {
        Self::with_limits(
            config.max_download_bytes,
            Duration::from_secs(config.fetch_timeout_secs),
        )
    }

    /// Maximum number of bytes accepted from any source.
    pub fn max_download_bytes(&self) -> usize {
        self.max_download_bytes
    }

    fn fetch_url(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if let Some(rest) = url.strip_prefix("data:") {
            return self.decode_data_url(rest);
        }

        log::debug!("[Fetcher] GET {}", url);
        let response = self.agent.get(url).call().map_err(|e| {
            let reason = match e {
                ureq::Error::Status(code, _) => format!("status {}", code),
                ureq::Error::Transport(t) => t.to_string(),
            };
            FetchError::Http {
                url: url.to_string(),
                reason,
            }
        })?;

        if let Some(length) = response
            .header("Content-Length")
            .and_then(|v| v.parse::<usize>().ok())
        {
            if length > self.max_download_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_download_bytes,
                });
            }
        }

        let mut data = Vec::new();
        response
            .into_reader()
            .take(self.max_download_bytes as u64 + 1)
            .read_to_end(&mut data)?;
        self.check_size(data)
    }

    fn decode_data_url(&self, rest: &str) -> Result<Vec<u8>, FetchError> {
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| FetchError::InvalidDataUrl("missing ',' separator".to_string()))?;

        if !header.ends_with(";base64") {
            return Err(FetchError::InvalidDataUrl(
                "only base64 payloads are supported".to_string(),
            ));
        }

        let data = BASE64
            .decode(payload.trim())
            .map_err(|e| FetchError::InvalidDataUrl(e.to_string()))?;
        self.check_size(data)
    }

    fn fetch_path(&self, path: &Path) -> Result<Vec<u8>, FetchError> {
        let length = std::fs::metadata(path)?.len();
        if length > self.max_download_bytes as u64 {
            return Err(FetchError::TooLarge {
                limit: self.max_download_bytes,
            });
        }
        Ok(std::fs::read(path)?)
    }

    fn check_size(&self, data: Vec<u8>) -> Result<Vec<u8>, FetchError> {
        if data.len() > self.max_download_bytes {
            Err(FetchError::TooLarge {
                limit: self.max_download_bytes,
            })
        } else {
            Ok(data)
        }
    }
}

impl Default for DefaultFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFetcher for DefaultFetcher {
    fn fetch(&self, source: &ImageSource) -> Result<Vec<u8>, FetchError> {
        match source {
            ImageSource::Url(url) => self.fetch_url(url),
            ImageSource::Path(path) => self.fetch_path(path),
            ImageSource::Bytes(bytes) => self.check_size(bytes.clone()),
        }
    }
}
