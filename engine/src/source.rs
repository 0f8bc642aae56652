//! Fetching the engine's source definition (bootstrap stage 3).

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::echo::BUILTIN_ENGINE_SOURCE;

const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Query parameter carrying the per-session cache-busting nonce.
pub const CACHE_BUST_PARAM: &str = "v";

pub type SourceFut<'a> = Pin<Box<dyn Future<Output = Result<String, SourceError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid engine source URL {raw}: {source}")]
    InvalidUrl {
        raw: String,
        #[source]
        source: url::ParseError,
    },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where the engine definition lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Url(Url),
    Path(PathBuf),
    /// The definition shipped with the echo runtime.
    Builtin,
    /// A URL that failed to parse. Fetching it fails at stage 3.
    Malformed { raw: String, error: url::ParseError },
}

impl SourceLocation {
    /// `builtin`, an `http(s)://` URL, or a filesystem path.
    pub fn parse(raw: &str) -> Result<Self, SourceError> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("builtin") {
            return Ok(Self::Builtin);
        }
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Url::parse(trimmed)
                .map(Self::Url)
                .map_err(|source| SourceError::InvalidUrl {
                    raw: trimmed.to_string(),
                    source,
                });
        }
        Ok(Self::Path(PathBuf::from(trimmed)))
    }

    /// Like [`SourceLocation::parse`], but keeps a malformed URL as
    /// [`SourceLocation::Malformed`] so the failure surfaces during bootstrap.
    #[must_use]
    pub fn resolve(raw: &str) -> Self {
        match Self::parse(raw) {
            Ok(location) => location,
            Err(SourceError::InvalidUrl { raw, source }) => Self::Malformed { raw, error: source },
            Err(_) => Self::Path(PathBuf::from(raw.trim())),
        }
    }
}

/// Stage-3 collaborator.
pub trait SourceFetcher: Send + Sync {
    fn fetch(&self) -> SourceFut<'_>;
}

/// Default fetcher: plain HTTP GET, local file, or the builtin definition.
#[derive(Debug, Clone)]
pub struct SourceLoader {
    location: SourceLocation,
    cache_bust: bool,
    nonce: String,
    client: reqwest::Client,
}

impl SourceLoader {
    #[must_use]
    pub fn new(location: SourceLocation, cache_bust: bool) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                tracing::error!("Failed to build HTTP client: {e}. Using defaults.");
                reqwest::Client::new()
            });
        Self {
            location,
            cache_bust,
            nonce: uuid::Uuid::new_v4().simple().to_string(),
            client,
        }
    }

    #[must_use]
    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// The URL actually requested, with the session nonce when cache busting.
    #[must_use]
    pub fn request_url(&self) -> Option<Url> {
        match &self.location {
            SourceLocation::Url(url) => Some(self.busted(url)),
            SourceLocation::Path(_) | SourceLocation::Builtin | SourceLocation::Malformed { .. } => {
                None
            }
        }
    }

    fn busted(&self, url: &Url) -> Url {
        let mut url = url.clone();
        if self.cache_bust {
            url.query_pairs_mut()
                .append_pair(CACHE_BUST_PARAM, &self.nonce);
        }
        url
    }

    async fn fetch_url(&self, url: Url) -> Result<String, SourceError> {
        let shown = url.to_string();
        tracing::info!(url = %shown, "Fetching engine source");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| SourceError::Transport {
                url: shown.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: shown,
                status: status.as_u16(),
            });
        }
        response
            .text()
            .await
            .map_err(|source| SourceError::Transport {
                url: shown,
                source,
            })
    }
}

impl SourceFetcher for SourceLoader {
    fn fetch(&self) -> SourceFut<'_> {
        Box::pin(async move {
            match &self.location {
                SourceLocation::Builtin => Ok(BUILTIN_ENGINE_SOURCE.to_string()),
                SourceLocation::Path(path) => {
                    tracing::info!(path = %path.display(), "Reading engine source");
                    tokio::fs::read_to_string(path)
                        .await
                        .map_err(|source| SourceError::Read {
                            path: path.clone(),
                            source,
                        })
                }
                SourceLocation::Url(url) => self.fetch_url(self.busted(url)).await,
                SourceLocation::Malformed { raw, error } => Err(SourceError::InvalidUrl {
                    raw: raw.clone(),
                    source: *error,
                }),
            }
        })
    }
}
