use crate::config::SourceConfig;
use crate::error::{Result, RevenueError};
use crate::ingestion::RevenueTableBuilder;
use crate::schema::RevenueTable;
use futures::future::{BoxFuture, FutureExt};
use log::{info, warn};
use std::path::PathBuf;

/// Dataset compiled into the crate for demos and offline use.
pub const SAMPLE_DATASET: &str = include_str!("../data/sample_revenue.csv");

/// Where the raw revenue CSV text comes from. Chosen once at start-up and
/// held as a trait object.
pub trait DataSource: Send + Sync {
    fn name(&self) -> String;

    fn fetch_text(&self) -> BoxFuture<'_, Result<String>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundledFile {
    Path(PathBuf),
    Embedded(&'static str),
}

impl BundledFile {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn sample() -> Self {
        Self::Embedded(SAMPLE_DATASET)
    }
}

impl DataSource for BundledFile {
    fn name(&self) -> String {
        match self {
            BundledFile::Path(path) => format!("file:{}", path.display()),
            BundledFile::Embedded(_) => "embedded sample".to_string(),
        }
    }

    fn fetch_text(&self) -> BoxFuture<'_, Result<String>> {
        let result = match self {
            BundledFile::Path(path) => std::fs::read_to_string(path).map_err(|e| {
                RevenueError::SourceUnavailable(format!("{}: {}", path.display(), e))
            }),
            BundledFile::Embedded(text) => Ok(text.to_string()),
        };
        futures::future::ready(result).boxed()
    }
}

/// Fetches and parses one snapshot of the table. A fetch failure never yields
/// a partial table.
pub async fn load_table(source: &dyn DataSource) -> Result<RevenueTable> {
    let raw = source
        .fetch_text()
        .await
        .map_err(RevenueError::into_unavailable)?;

    let (records, report) = RevenueTableBuilder::parse_with_report(&raw);
    info!(
        "Loaded {} revenue records from {} ({} lines skipped)",
        report.admitted,
        source.name(),
        report.total_lines - report.admitted
    );

    Ok(RevenueTable::new(records))
}

/// What a view shows after a load: data, the empty state, or an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Ready(RevenueTable),
    Empty,
    Failed(String),
}

impl ViewState {
    pub fn from_load(result: Result<RevenueTable>) -> Self {
        match result {
            Ok(table) if table.is_empty() => ViewState::Empty,
            Ok(table) => ViewState::Ready(table),
            Err(e) => {
                warn!("Revenue load failed: {}", e);
                ViewState::Failed(e.to_string())
            }
        }
    }

    pub fn table(&self) -> Option<&RevenueTable> {
        match self {
            ViewState::Ready(table) => Some(table),
            _ => None,
        }
    }
}

pub fn source_from_config(config: &SourceConfig) -> Result<Box<dyn DataSource>> {
    match config {
        SourceConfig::Bundled { path: Some(path) } => Ok(Box::new(BundledFile::path(path))),
        SourceConfig::Bundled { path: None } => Ok(Box::new(BundledFile::sample())),
        #[cfg(feature = "remote")]
        SourceConfig::Remote { .. } => Ok(Box::new(crate::remote::RemoteStore::from_config(
            config,
        )?)),
        #[cfg(not(feature = "remote"))]
        SourceConfig::Remote { .. } => Err(RevenueError::InvalidConfig(
            "remote source requires the `remote` feature".to_string(),
        )),
    }
}
