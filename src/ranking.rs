use crate::schema::RevenueRecord;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Annual change below which a project is flagged high risk.
pub const HIGH_RISK_THRESHOLD: f64 = -50.0;
/// Annual change at or above which a project is flagged high growth.
pub const HIGH_GROWTH_THRESHOLD: f64 = 100.0;
/// Absolute annual change below which a project is flagged stagnant.
pub const STAGNANT_BAND: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Growth in percent, defined only when both annual totals are non-zero.
pub fn growth_metric(record: &RevenueRecord) -> Option<f64> {
    if record.total_prior_year != 0.0 && record.total_current_year != 0.0 {
        Some(record.total_percent_change)
    } else {
        None
    }
}

pub fn volume_metric(record: &RevenueRecord) -> Option<f64> {
    Some(record.total_current_year)
}

pub fn change_metric(record: &RevenueRecord) -> Option<f64> {
    Some(record.absolute_change())
}

/// Ranks the records for which `metric_fn` is defined and keeps the first
/// `n`. Equal metrics keep their input order.
pub fn top_n<'a, I, F>(
    records: I,
    metric_fn: F,
    n: usize,
    direction: SortDirection,
) -> Vec<&'a RevenueRecord>
where
    I: IntoIterator<Item = &'a RevenueRecord>,
    F: Fn(&RevenueRecord) -> Option<f64>,
{
    let mut ranked: Vec<(f64, &RevenueRecord)> = records
        .into_iter()
        .filter_map(|record| metric_fn(record).map(|metric| (metric, record)))
        .filter(|(metric, _)| !metric.is_nan())
        .collect();

    match direction {
        SortDirection::Ascending => ranked.sort_by(|a, b| a.0.total_cmp(&b.0)),
        SortDirection::Descending => ranked.sort_by(|a, b| b.0.total_cmp(&a.0)),
    }

    ranked.into_iter().take(n).map(|(_, record)| record).collect()
}

pub fn top_gainers(records: &[RevenueRecord], n: usize) -> Vec<&RevenueRecord> {
    top_n(records, growth_metric, n, SortDirection::Descending)
}

pub fn top_losers(records: &[RevenueRecord], n: usize) -> Vec<&RevenueRecord> {
    top_n(records, growth_metric, n, SortDirection::Ascending)
}

pub fn top_by_volume(records: &[RevenueRecord], n: usize) -> Vec<&RevenueRecord> {
    top_n(records, volume_metric, n, SortDirection::Descending)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Classification {
    pub high_risk: bool,
    pub high_growth: bool,
    pub stagnant: bool,
}

impl Classification {
    pub fn is_flagged(&self) -> bool {
        self.high_risk || self.high_growth || self.stagnant
    }
}

/// Threshold classes for one record, judged on the annual percent change the
/// source supplied. Only the growth boundary is inclusive.
pub fn classify(record: &RevenueRecord) -> Classification {
    let change = record.total_percent_change;
    let has_base = record.total_prior_year > 0.0;

    Classification {
        high_risk: has_base && change < HIGH_RISK_THRESHOLD,
        high_growth: change >= HIGH_GROWTH_THRESHOLD,
        stagnant: has_base && change.abs() < STAGNANT_BAND,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdReport<'a> {
    pub high_risk: Vec<&'a RevenueRecord>,
    pub high_growth: Vec<&'a RevenueRecord>,
    pub stagnant: Vec<&'a RevenueRecord>,
}

pub fn classify_all(records: &[RevenueRecord]) -> ThresholdReport<'_> {
    let mut report = ThresholdReport::default();
    for record in records {
        let class = classify(record);
        if class.high_risk {
            report.high_risk.push(record);
        }
        if class.high_growth {
            report.high_growth.push(record);
        }
        if class.stagnant {
            report.stagnant.push(record);
        }
    }
    report
}

/// Narrows a table the way the dashboard filter bar does. Empty criteria match
/// everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RecordFilter {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub business_line: Option<String>,
    /// Case-insensitive substring over company and project.
    #[serde(default)]
    pub search: Option<String>,
}

impl RecordFilter {
    pub fn company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    pub fn business_line(mut self, line: impl Into<String>) -> Self {
        self.business_line = Some(line.into());
        self
    }

    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }

    pub fn matches(&self, record: &RevenueRecord) -> bool {
        if let Some(company) = &self.company {
            if record.company != *company {
                return false;
            }
        }
        if let Some(line) = &self.business_line {
            if record.business_line != *line {
                return false;
            }
        }
        if let Some(query) = &self.search {
            let query = query.trim().to_lowercase();
            if !query.is_empty()
                && !record.company.to_lowercase().contains(&query)
                && !record.project.to_lowercase().contains(&query)
            {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(project: &str, prior: f64, current: f64, change: f64) -> RevenueRecord {
        let mut r = RevenueRecord::new("ACME", "Retail", "CC1", project);
        r.total_prior_year = prior;
        r.total_current_year = current;
        r.total_percent_change = change;
        r
    }

    #[test]
    fn test_top_gainers_and_losers() {
        let records = vec![
            record("A", 100.0, 150.0, 50.0),
            record("B", 100.0, 300.0, 200.0),
            record("C", 0.0, 300.0, 0.0),
            record("D", 100.0, 40.0, -60.0),
        ];

        let gainers: Vec<&str> = top_gainers(&records, 2)
            .iter()
            .map(|r| r.project.as_str())
            .collect();
        assert_eq!(gainers, vec!["B", "A"]);

        let losers: Vec<&str> = top_losers(&records, 10)
            .iter()
            .map(|r| r.project.as_str())
            .collect();
        assert_eq!(losers, vec!["D", "A", "B"]);

        let volume: Vec<&str> = top_by_volume(&records, 2)
            .iter()
            .map(|r| r.project.as_str())
            .collect();
        assert_eq!(volume, vec!["B", "C"]);
    }

    #[test]
    fn test_top_n_is_stable_for_ties() {
        let records = vec![
            record("First", 100.0, 200.0, 100.0),
            record("Second", 100.0, 200.0, 100.0),
            record("Top", 100.0, 500.0, 400.0),
            record("Third", 100.0, 200.0, 100.0),
        ];

        for direction in [SortDirection::Ascending, SortDirection::Descending] {
            let ties: Vec<&str> = top_n(&records, growth_metric, 10, direction)
                .iter()
                .filter(|r| r.project != "Top")
                .map(|r| r.project.as_str())
                .collect();
            assert_eq!(ties, vec!["First", "Second", "Third"]);
        }
    }

    #[test]
    fn test_top_n_zero() {
        let records = vec![record("A", 1.0, 2.0, 100.0)];
        assert!(top_n(&records, volume_metric, 0, SortDirection::Descending).is_empty());
    }

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(
            classify(&record("Boom", 1000.0, 2000.0, 100.0)),
            Classification {
                high_risk: false,
                high_growth: true,
                stagnant: false
            }
        );
        assert!(classify(&record("Bust", 1000.0, 490.0, -51.0)).high_risk);
        assert!(!classify(&record("Halved", 1000.0, 500.0, -50.0)).high_risk);
        assert!(!classify(&record("Dip", 1000.0, 510.0, -49.0)).high_risk);
        assert!(classify(&record("Flat", 1000.0, 1040.0, 4.0)).stagnant);
        assert!(!classify(&record("Edge", 1000.0, 1050.0, 5.0)).stagnant);

        let new_business = classify(&record("New", 0.0, 500.0, 0.0));
        assert!(!new_business.is_flagged());
    }

    #[test]
    fn test_classify_all() {
        let records = vec![
            record("Boom", 100.0, 300.0, 200.0),
            record("Bust", 100.0, 20.0, -80.0),
            record("Flat", 100.0, 101.0, 1.0),
            record("Normal", 100.0, 120.0, 20.0),
        ];
        let report = classify_all(&records);
        assert_eq!(report.high_growth.len(), 1);
        assert_eq!(report.high_risk[0].project, "Bust");
        assert_eq!(report.stagnant[0].project, "Flat");
    }

    #[test]
    fn test_record_filter() {
        let mut other = record("Pipeline Upgrade", 1.0, 1.0, 0.0);
        other.company = "Globex".to_string();
        other.business_line = "Energy".to_string();
        let records = vec![record("Store Refit", 1.0, 1.0, 0.0), other];

        let by_company = RecordFilter::default().company("Globex");
        assert_eq!(records.iter().filter(|r| by_company.matches(r)).count(), 1);

        let search = RecordFilter::default().search("  REFIT ");
        let hits: Vec<&RevenueRecord> = records.iter().filter(|r| search.matches(r)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].project, "Store Refit");

        let combined = RecordFilter::default().business_line("Energy").search("acme");
        assert_eq!(records.iter().filter(|r| combined.matches(r)).count(), 0);

        assert!(records.iter().all(|r| RecordFilter::default().matches(r)));
    }
}
