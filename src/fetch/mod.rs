//! Input loading from local paths or HTTP URLs, with transparent gunzip.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use tracing::debug;

use crate::error::InputError;

/// Where an input table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Local(PathBuf),
    Remote(String),
}

impl Source {
    /// Interprets a configured source. Relative paths are taken from `base`.
    pub fn resolve(raw: &str, base: &Path) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Source::Remote(raw.to_string())
        } else {
            Source::Local(base.join(raw))
        }
    }

    fn is_gzip(&self) -> bool {
        match self {
            Source::Local(p) => p.extension().is_some_and(|e| e == "gz"),
            Source::Remote(u) => u.split(['?', '#']).next().is_some_and(|p| p.ends_with(".gz")),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Local(p) => write!(f, "{}", p.display()),
            Source::Remote(u) => f.write_str(u),
        }
    }
}

pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    Ok(resp.bytes().await?.to_vec())
}

/// Reads a source fully, decompressing `.gz` content.
///
/// A local file that does not exist is reported as [`InputError::Missing`].
#[tracing::instrument(skip_all, fields(source = %source))]
pub async fn load_source<C: HttpClient>(client: &C, source: &Source) -> Result<Vec<u8>> {
    let bytes = match source {
        Source::Remote(url) => fetch_bytes(client, url)
            .await
            .with_context(|| format!("fetching {url}"))?,
        Source::Local(path) => match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(InputError::Missing(path.clone()).into());
            }
            Err(e) => return Err(InputError::Io(e)).with_context(|| format!("reading {source}")),
        },
    };

    let bytes = if source.is_gzip() {
        gunzip(&bytes).with_context(|| format!("decompressing {source}"))?
    } else {
        bytes
    };
    debug!(bytes = bytes.len(), "Source loaded");
    Ok(bytes)
}

fn gunzip(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(bytes.len() * 4);
    GzDecoder::new(bytes).read_to_end(&mut out)?;
    Ok(out)
}
