use crate::error::{Result, RevenueError};
use crate::forecast::ForecastMethod;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_TABLE: &str = "revenue_uploads";
pub const DEFAULT_CONTENT_COLUMN: &str = "content";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    #[schemars(description = "A CSV file on disk, or the embedded sample dataset when no path is given")]
    Bundled {
        #[serde(default)]
        path: Option<PathBuf>,
    },

    #[schemars(description = "A hosted table reached through its REST endpoint")]
    Remote {
        #[schemars(description = "Project base URL, e.g. https://xyz.example.co")]
        url: String,

        #[schemars(description = "Anonymous or service API key sent with every request")]
        api_key: String,

        #[serde(default = "default_table")]
        table: String,

        #[schemars(description = "Column holding the raw CSV text")]
        #[serde(default = "default_content_column")]
        content_column: String,

        #[schemars(description = "Column used to pick the newest upload, descending")]
        #[serde(default)]
        order_column: Option<String>,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Bundled { path: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LiveConfig {
    #[schemars(description = "Milliseconds between live metric samples")]
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[schemars(description = "Standard deviation of the relative jitter, 0.0 to 1.0")]
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            jitter: default_jitter(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DashboardConfig {
    #[serde(default)]
    pub source: SourceConfig,

    #[schemars(description = "Drop spreadsheet subtotal rows before aggregating")]
    #[serde(default = "default_true")]
    pub exclude_subtotals: bool,

    #[schemars(description = "Number of entries shown by ranking panels")]
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    #[serde(default)]
    pub forecast_method: ForecastMethod,

    #[serde(default)]
    pub live: LiveConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            exclude_subtotals: true,
            top_n: default_top_n(),
            forecast_method: ForecastMethod::default(),
            live: LiveConfig::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: DashboardConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        debug!("Read dashboard configuration from {}", path.as_ref().display());
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.live.jitter) {
            return Err(RevenueError::InvalidJitter(self.live.jitter));
        }
        if self.live.interval_ms == 0 {
            return Err(RevenueError::InvalidConfig(
                "live.interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.top_n == 0 {
            return Err(RevenueError::InvalidConfig(
                "top_n must be greater than zero".to_string(),
            ));
        }
        if let SourceConfig::Remote {
            url,
            table,
            content_column,
            ..
        } = &self.source
        {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(RevenueError::InvalidConfig(format!(
                    "remote url '{}' must start with http:// or https://",
                    url
                )));
            }
            if table.trim().is_empty() || content_column.trim().is_empty() {
                return Err(RevenueError::InvalidConfig(
                    "remote table and content column must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Applies `REVENUE_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`:
    ///
    /// - `REVENUE_SOURCE`: `bundled` or `remote`
    /// - `REVENUE_DATA_PATH`: CSV path for the bundled source
    /// - `REVENUE_STORE_URL`, `REVENUE_STORE_KEY`, `REVENUE_STORE_TABLE`
    /// - `REVENUE_TOP_N`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup("REVENUE_SOURCE").as_deref() {
            Some("bundled") => {
                self.source = SourceConfig::Bundled {
                    path: lookup("REVENUE_DATA_PATH").map(PathBuf::from),
                };
            }
            Some("remote") => {
                let url = lookup("REVENUE_STORE_URL").ok_or_else(|| {
                    RevenueError::InvalidConfig("REVENUE_STORE_URL is not set".to_string())
                })?;
                let api_key = lookup("REVENUE_STORE_KEY").ok_or_else(|| {
                    RevenueError::InvalidConfig("REVENUE_STORE_KEY is not set".to_string())
                })?;
                self.source = SourceConfig::Remote {
                    url,
                    api_key,
                    table: lookup("REVENUE_STORE_TABLE").unwrap_or_else(default_table),
                    content_column: default_content_column(),
                    order_column: None,
                };
            }
            Some(other) => {
                return Err(RevenueError::InvalidConfig(format!(
                    "REVENUE_SOURCE must be 'bundled' or 'remote', got '{}'",
                    other
                )));
            }
            None => {
                if let (SourceConfig::Bundled { path }, Some(new_path)) =
                    (&mut self.source, lookup("REVENUE_DATA_PATH"))
                {
                    *path = Some(PathBuf::from(new_path));
                }
            }
        }

        if let Some(top_n) = lookup("REVENUE_TOP_N") {
            self.top_n = top_n.trim().parse().map_err(|_| {
                RevenueError::InvalidConfig(format!("REVENUE_TOP_N is not a number: {}", top_n))
            })?;
        }

        self.validate()
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(DashboardConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_content_column() -> String {
    DEFAULT_CONTENT_COLUMN.to_string()
}

fn default_interval_ms() -> u64 {
    3000
}

fn default_jitter() -> f64 {
    0.02
}

fn default_top_n() -> usize {
    10
}

fn default_true() -> bool {
    true
}
