//! # Revenue Dashboard Core
//!
//! The data layer of a revenue reporting dashboard. It turns a wide-format
//! revenue comparison CSV (one row per project, twelve months of
//! prior-year/current-year/percent triplets, then annual totals) into typed
//! records and derives every view the dashboard renders from them.
//!
//! ## Core Concepts
//!
//! - **Record**: one project's prior-year vs. current-year comparison row
//! - **Segment**: a rollup key, usually the business line or the company
//! - **Growth rate**: percent change from prior to current year; always zero
//!   instead of NaN/infinity when there is no prior-year base
//! - **Intensity**: a 0-100 magnitude used for heatmap colouring
//! - **Scenario**: optimistic/conservative/pessimistic variants of a forecast
//!
//! ## Example
//!
//! ```rust,ignore
//! use revenue_dashboard_core::*;
//!
//! let config = DashboardConfig::default();
//! let source = source_from_config(&config.source)?;
//! let table = futures::executor::block_on(load_table(source.as_ref()))?;
//!
//! let report = DashboardProcessor::new(&config).process(&table);
//! for segment in &report.business_lines {
//!     println!("{}: {:.1}%", segment.key, segment.contribution_share);
//! }
//! ```
//!
//! ## Features
//!
//! - `remote`: hosted-table source over REST (`reqwest`)
//! - `live`: periodic live-metrics feed on a tokio `watch` channel
//!
//! The store and feed tests only compile with their feature enabled; run
//! `cargo test --all-features` to include them.

pub mod access;
pub mod aggregation;
pub mod config;
pub mod error;
pub mod export;
pub mod forecast;
pub mod heatmap;
pub mod ingestion;
pub mod live;
pub mod ranking;
pub mod schema;
pub mod source;
pub mod utils;

#[cfg(feature = "remote")]
pub mod remote;

pub use access::{can_view, Feature, Role};
pub use aggregation::{
    by_business_line, by_company, month_has_actuals, monthly_totals, monthly_trend, portfolio_summary,
    segment_rollup, MonthlyTotals, MonthlyTrendPoint, PortfolioSummary, SegmentSummary,
};
pub use config::{DashboardConfig, LiveConfig, SourceConfig};
pub use error::{Result, RevenueError};
pub use export::{to_csv, write_csv};
pub use forecast::{forecast_remaining_months, Forecast, ForecastMethod, MonthForecast, Scenario};
pub use heatmap::{intensity, HeatmapCell, HeatmapGrid, HeatmapMetric};
pub use ingestion::{normalize_amount, normalize_percent, ParseReport, RevenueTableBuilder};
pub use live::{LiveMetrics, LiveSample};
pub use ranking::*;
pub use schema::*;
pub use source::{load_table, source_from_config, BundledFile, DataSource, ViewState};

#[cfg(feature = "remote")]
pub use remote::{RemoteStore, StoreClient, StoreFilter};

use chrono::Month;
use log::{debug, info};
use serde::Serialize;

/// Everything the overview page shows, computed from one table in one pass.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub summary: PortfolioSummary,
    pub trend: Vec<MonthlyTrendPoint>,
    pub business_lines: Vec<SegmentSummary>,
    pub companies: Vec<SegmentSummary>,
    pub top_gainers: Vec<RevenueRecord>,
    pub top_losers: Vec<RevenueRecord>,
    pub forecast: Forecast,
}

pub struct DashboardProcessor<'a> {
    config: &'a DashboardConfig,
}

impl<'a> DashboardProcessor<'a> {
    pub fn new(config: &'a DashboardConfig) -> Self {
        Self { config }
    }

    pub fn process(&self, table: &RevenueTable) -> DashboardReport {
        let table = if self.config.exclude_subtotals {
            table.without_subtotals()
        } else {
            table.clone()
        };
        let records = table.records();

        info!("Building dashboard report over {} records", records.len());

        let actual_months = months_with_actuals(records);
        debug!("{} months carry current-year revenue", actual_months.len());

        DashboardReport {
            summary: portfolio_summary(records),
            trend: monthly_trend(records),
            business_lines: segment_rollup(records, by_business_line),
            companies: segment_rollup(records, by_company),
            top_gainers: top_gainers(records, self.config.top_n)
                .into_iter()
                .cloned()
                .collect(),
            top_losers: top_losers(records, self.config.top_n)
                .into_iter()
                .cloned()
                .collect(),
            forecast: forecast_remaining_months(
                records,
                &actual_months,
                self.config.forecast_method,
            ),
        }
    }
}

/// Months in which at least one record has current-year revenue.
pub fn months_with_actuals(records: &[RevenueRecord]) -> Vec<Month> {
    CALENDAR
        .iter()
        .copied()
        .filter(|&month| month_has_actuals(records, month))
        .collect()
}
