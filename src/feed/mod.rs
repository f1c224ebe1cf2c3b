//! Reading sources: where a [`ReadingSeries`] comes from.
//!
//! - [`HttpFeed`]: GET the configured feed URL with `ureq` (blocking).
//! - [`FileFeed`]: read a saved feed document from disk (or stdin).
//! - [`CachedSource`]: TTL cache in front of any source, so repeated
//!   dashboard requests inside the TTL reuse the last successful fetch.
//!
//! A source returns `Ok(None)` when the feed answered but had no data, and
//! `Err` for transport or decoding failures.

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::config::schema::FeedConfig;
use crate::readings::{ReadingSeries, decode_feed};

/// Anything that can produce a fresh reading series on demand.
pub trait ReadingSource {
    /// Short human-readable description (URL or path) for logs.
    fn describe(&self) -> String;

    /// Fetch the full current series.
    fn fetch(&self) -> Result<Option<ReadingSeries>>;
}

// ---------------------------------------------------------------------------
// HTTP feed
// ---------------------------------------------------------------------------

/// Blocking HTTP client for the reading feed.
#[derive(Debug, Clone)]
pub struct HttpFeed {
    url: String,
    timeout: Duration,
}

impl HttpFeed {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    /// Build a client from the resolved config. Fails when no URL is set.
    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        let url = config.url.trim();
        if url.is_empty() {
            anyhow::bail!(
                "no feed URL configured. Set feed.url with `tankwatch config set feed.url <URL>` or TANKWATCH_FEED_URL."
            );
        }
        Ok(Self::new(url, Duration::from_secs(config.timeout_secs)))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ReadingSource for HttpFeed {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> Result<Option<ReadingSeries>> {
        let resp = ureq::get(&self.url)
            .timeout(self.timeout)
            .call()
            .with_context(|| format!("feed request to {} failed", self.url))?;

        let body = resp
            .into_string()
            .context("failed to read feed response body")?;

        decode_feed(&body)
    }
}

// ---------------------------------------------------------------------------
// File feed
// ---------------------------------------------------------------------------

/// A feed document stored on disk. The path `-` reads stdin.
#[derive(Debug, Clone)]
pub struct FileFeed {
    path: PathBuf,
}

impl FileFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn is_stdin(&self) -> bool {
        self.path.as_os_str() == "-"
    }
}

impl ReadingSource for FileFeed {
    fn describe(&self) -> String {
        if self.is_stdin() {
            "stdin".to_string()
        } else {
            self.path.display().to_string()
        }
    }

    fn fetch(&self) -> Result<Option<ReadingSeries>> {
        let body = if self.is_stdin() {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed reading feed document from stdin")?;
            buf
        } else {
            fs::read_to_string(&self.path)
                .with_context(|| format!("failed to read {}", self.path.display()))?
        };

        decode_feed(&body)
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Default cache TTL in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// TTL cache in front of a [`ReadingSource`].
///
/// Successful fetches (including "no data") are kept for the TTL; errors
/// are returned to the caller and never cached.
pub struct CachedSource<S> {
    source: S,
    ttl: Duration,
    entry: Option<CachedFetch>,
}

struct CachedFetch {
    series: Option<ReadingSeries>,
    fetched_at: Instant,
}

impl<S: ReadingSource> CachedSource<S> {
    pub fn new(source: S, ttl_secs: u64) -> Self {
        Self {
            source,
            ttl: Duration::from_secs(ttl_secs),
            entry: None,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Return the cached series if still fresh, otherwise fetch.
    pub fn get(&mut self) -> Result<Option<ReadingSeries>> {
        if let Some(entry) = &self.entry
            && entry.fetched_at.elapsed() < self.ttl
        {
            return Ok(entry.series.clone());
        }

        let series = self.source.fetch()?;
        self.entry = Some(CachedFetch {
            series: series.clone(),
            fetched_at: Instant::now(),
        });
        Ok(series)
    }

    /// Drop the cached entry so the next [`get`](Self::get) fetches.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Age of the cached entry, if any.
    pub fn age(&self) -> Option<Duration> {
        self.entry.as_ref().map(|e| e.fetched_at.elapsed())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
