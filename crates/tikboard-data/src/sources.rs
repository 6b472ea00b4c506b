//! Source resolution and loading.
//!
//! Each of the three inputs is resolved to a local file (a configured file,
//! or the newest matching file in a configured directory) and, failing
//! that, to a remote URL. The resolved location plus its size and
//! modification time form a [`SourceSignature`] which the session uses as
//! its memo key.

use crate::records::{ClickTable, CounterTable, RawTable, RosterTable};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tikboard_common::{DashError, Result};
use tikboard_config::{SourceConfig, SourceFormat};
use tracing::{debug, info, instrument, warn};

/// Which of the three inputs is being loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Account roster
    Roster,
    /// Daily counter export
    Counters,
    /// Click log
    Clicks,
}

impl SourceKind {
    /// Human-readable name used in messages.
    pub fn name(self) -> &'static str {
        match self {
            SourceKind::Roster => "roster",
            SourceKind::Counters => "counters",
            SourceKind::Clicks => "clicks",
        }
    }

    /// File extensions accepted when scanning a directory.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            SourceKind::Roster => &["xlsx", "xls", "csv"],
            SourceKind::Counters | SourceKind::Clicks => &["csv"],
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fetches a remote source body.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Download `url` and return the response body.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// [`RemoteFetcher`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a client with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tikboard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.bytes().await?;
        debug!(bytes = body.len(), "Fetched remote source");
        Ok(body.to_vec())
    }
}

/// Where a source was resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceLocation {
    /// A local file
    Local(PathBuf),
    /// A remote URL
    Remote(String),
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Local(path) => write!(f, "{}", path.display()),
            SourceLocation::Remote(url) => f.write_str(url),
        }
    }
}

/// Identity of one resolved input; equal signatures load identical tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceSignature {
    /// Which input
    pub kind: SourceKind,
    /// Resolved location
    pub location: SourceLocation,
    /// File size, zero for remote sources
    pub len: u64,
    /// Modification time of local files
    pub modified: Option<SystemTime>,
    /// Decoding format
    pub format: SourceFormat,
}

/// Newest file in `dir` whose name starts with `prefix` and whose extension
/// is one of `extensions` (case-insensitive).
pub fn latest_file(dir: &Path, prefix: &str, extensions: &[&str]) -> Result<Option<PathBuf>> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let extension_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)));
        if !name.starts_with(prefix) || !extension_ok {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified()?;
        if newest.as_ref().map_or(true, |(best, _)| modified > *best) {
            newest = Some((modified, path));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

/// Decoding format for a location: explicit configuration first, then the extension.
pub fn infer_format(explicit: Option<SourceFormat>, location: &str) -> SourceFormat {
    if let Some(format) = explicit {
        return format;
    }
    let path_part = location.split(['?', '#']).next().unwrap_or(location);
    let lowered = path_part.to_ascii_lowercase();
    if lowered.ends_with(".xlsx") || lowered.ends_with(".xls") || lowered.ends_with(".xlsm") {
        SourceFormat::Xlsx
    } else {
        SourceFormat::Csv
    }
}

/// Resolves and reads sources.
#[derive(Clone)]
pub struct SourceLoader {
    fetcher: Arc<dyn RemoteFetcher>,
}

impl fmt::Debug for SourceLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceLoader").finish_non_exhaustive()
    }
}

impl SourceLoader {
    /// Loader using the given remote fetcher.
    pub fn new(fetcher: Arc<dyn RemoteFetcher>) -> Self {
        Self { fetcher }
    }

    /// Loader with an HTTP fetcher using `timeout`.
    pub fn http(timeout: Duration) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpFetcher::new(timeout)?)))
    }

    /// Resolve `spec` without reading the body.
    ///
    /// A local file wins; a directory yields its newest matching file. When
    /// nothing local is found the URL is used, and with no URL either the
    /// source is missing.
    pub fn resolve(&self, kind: SourceKind, spec: &SourceConfig) -> Result<SourceSignature> {
        if let Some(path) = spec.path.as_deref().map(Path::new) {
            let local = if path.is_dir() {
                let prefix = spec.file_prefix.as_deref().unwrap_or("");
                let found = latest_file(path, prefix, kind.extensions())?;
                if found.is_none() {
                    debug!(%kind, dir = %path.display(), prefix, "No matching file in directory");
                }
                found
            } else if path.is_file() {
                Some(path.to_path_buf())
            } else {
                None
            };

            if let Some(file) = local {
                let metadata = std::fs::metadata(&file)?;
                let format = infer_format(spec.format, &file.to_string_lossy());
                return Ok(SourceSignature {
                    kind,
                    location: SourceLocation::Local(file),
                    len: metadata.len(),
                    modified: metadata.modified().ok(),
                    format,
                });
            }
        }

        if let Some(url) = spec.url.as_deref() {
            if spec.path.is_some() {
                warn!(%kind, url, "Local source not found, falling back to remote URL");
            }
            return Ok(SourceSignature {
                kind,
                location: SourceLocation::Remote(url.to_string()),
                len: 0,
                modified: None,
                format: infer_format(spec.format, url),
            });
        }

        let message = match spec.path.as_deref() {
            Some(path) => format!("no file found at '{path}' and no remote URL configured"),
            None => "neither a path nor a URL is configured".to_string(),
        };
        Err(DashError::missing_source(kind.name(), message))
    }

    /// Read and decode a resolved source. An empty body or header-only table is missing.
    #[instrument(skip(self), fields(kind = %signature.kind, location = %signature.location))]
    pub async fn read(&self, signature: &SourceSignature) -> Result<RawTable> {
        let bytes = match &signature.location {
            SourceLocation::Local(path) => tokio::fs::read(path).await?,
            SourceLocation::Remote(url) => self.fetcher.fetch(url).await?,
        };
        if bytes.is_empty() {
            return Err(DashError::missing_source(
                signature.kind.name(),
                format!("'{}' is empty", signature.location),
            ));
        }

        let raw = match signature.format {
            SourceFormat::Csv => RawTable::from_csv_bytes(&bytes)?,
            SourceFormat::Xlsx => RawTable::from_workbook_bytes(bytes)?,
        };
        if raw.is_empty() {
            return Err(DashError::missing_source(
                signature.kind.name(),
                format!("'{}' has no data rows", signature.location),
            ));
        }
        info!(rows = raw.len(), columns = raw.headers().len(), "Loaded source");
        Ok(raw)
    }

    /// Resolve then read.
    pub async fn load_raw(&self, kind: SourceKind, spec: &SourceConfig) -> Result<RawTable> {
        let signature = self.resolve(kind, spec)?;
        self.read(&signature).await
    }

    /// Load and type the roster.
    pub async fn load_roster(&self, spec: &SourceConfig) -> Result<RosterTable> {
        RosterTable::from_raw(&self.load_raw(SourceKind::Roster, spec).await?)
    }

    /// Load and type the counter export.
    pub async fn load_counters(&self, spec: &SourceConfig) -> Result<CounterTable> {
        CounterTable::from_raw(&self.load_raw(SourceKind::Counters, spec).await?)
    }

    /// Load and type the click log.
    pub async fn load_clicks(&self, spec: &SourceConfig) -> Result<ClickTable> {
        ClickTable::from_raw(&self.load_raw(SourceKind::Clicks, spec).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tikboard_common::test_utils::{create_temp_dir, fixtures, write_fixture};

    struct NoNetwork;

    #[async_trait]
    impl RemoteFetcher for NoNetwork {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            Err(DashError::network(format!("offline: {url}")))
        }
    }

    fn loader() -> SourceLoader {
        SourceLoader::new(Arc::new(NoNetwork))
    }

    #[test]
    fn test_infer_format() {
        assert_eq!(infer_format(None, "a/b/accounts.XLSX"), SourceFormat::Xlsx);
        assert_eq!(infer_format(None, "https://x.io/f.xlsx?dl=1"), SourceFormat::Xlsx);
        assert_eq!(infer_format(None, "clicks.csv"), SourceFormat::Csv);
        assert_eq!(infer_format(Some(SourceFormat::Xlsx), "export"), SourceFormat::Xlsx);
    }

    #[test]
    fn test_latest_file_respects_prefix_and_extension() {
        let dir = create_temp_dir();
        write_fixture(dir.path(), "redash_data_1.csv", "a\n1\n");
        write_fixture(dir.path(), "other_2.csv", "a\n1\n");
        write_fixture(dir.path(), "redash_data_3.txt", "a\n1\n");

        let found = latest_file(dir.path(), "redash_data_", &["csv"]).unwrap();
        assert_eq!(found.unwrap().file_name().unwrap(), "redash_data_1.csv");
        assert!(latest_file(dir.path(), "nope_", &["csv"]).unwrap().is_none());
    }

    #[test]
    fn test_resolve_missing_source() {
        let spec = SourceConfig::file("/nonexistent/accounts.xlsx");
        let err = loader().resolve(SourceKind::Roster, &spec).unwrap_err();
        assert!(err.is_missing_source());
        assert!(err.to_string().contains("roster"));
    }

    #[test]
    fn test_resolve_falls_back_to_url() {
        let spec = SourceConfig {
            url: Some("https://example.com/clicks.csv".to_string()),
            ..SourceConfig::file("/nonexistent/clicks.csv")
        };
        let signature = loader().resolve(SourceKind::Clicks, &spec).unwrap();
        assert_eq!(
            signature.location,
            SourceLocation::Remote("https://example.com/clicks.csv".to_string())
        );
        assert_eq!(signature.format, SourceFormat::Csv);
    }

    #[tokio::test]
    async fn test_load_local_tables() {
        let dir = create_temp_dir();
        let roster = write_fixture(dir.path(), "accounts.csv", fixtures::roster_csv());
        write_fixture(dir.path(), "redash_data_2024.csv", fixtures::counters_csv());

        let loader = loader();
        let roster = loader
            .load_roster(&SourceConfig::file(roster.to_string_lossy()))
            .await
            .unwrap();
        assert_eq!(roster.len(), 2);

        let counters = loader
            .load_counters(&SourceConfig::directory(
                dir.path().to_string_lossy(),
                "redash_data_",
            ))
            .await
            .unwrap();
        assert_eq!(counters.len(), 5);
    }

    #[tokio::test]
    async fn test_header_only_file_is_missing() {
        let dir = create_temp_dir();
        let path = write_fixture(dir.path(), "clicks.csv", "timestamp,session_id,visitor_id\n");
        let err = loader()
            .load_clicks(&SourceConfig::file(path.to_string_lossy()))
            .await
            .unwrap_err();
        assert!(err.is_missing_source());
    }
}
