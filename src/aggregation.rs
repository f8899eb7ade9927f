use crate::schema::{RevenueRecord, CALENDAR};
use crate::utils::{growth_rate, share_of};
use chrono::Month;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Label used by [`by_business_line`] for records without a business line.
pub const UNASSIGNED_SEGMENT: &str = "Unassigned";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MonthlyTotals {
    pub prior_year_total: f64,
    pub current_year_total: f64,
}

impl MonthlyTotals {
    /// Percent growth for the month, zero without a positive prior-year base.
    pub fn growth_rate(&self) -> f64 {
        growth_rate(self.prior_year_total, self.current_year_total)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTrendPoint {
    pub month: Month,
    pub totals: MonthlyTotals,
    pub growth_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentSummary {
    pub key: String,
    pub total_prior_year: f64,
    pub total_current_year: f64,
    pub project_count: usize,
    /// Growth of the group totals, in percent.
    pub average_growth: f64,
    /// Share of the current-year total across all groups, in percent.
    pub contribution_share: f64,
}

/// Dashboard headline figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PortfolioSummary {
    pub total_prior_year: f64,
    pub total_current_year: f64,
    pub growth_rate: f64,
    pub absolute_change: f64,
    pub record_count: usize,
    pub company_count: usize,
}

pub fn monthly_totals<'a, I>(records: I, month: Month) -> MonthlyTotals
where
    I: IntoIterator<Item = &'a RevenueRecord>,
{
    records
        .into_iter()
        .fold(MonthlyTotals::default(), |mut totals, record| {
            let figures = record.month(month);
            totals.prior_year_total += figures.prior_year_value;
            totals.current_year_total += figures.current_year_value;
            totals
        })
}

/// True when any record carries current-year revenue for `month`, even if the
/// values cancel out in the sum.
pub fn month_has_actuals(records: &[RevenueRecord], month: Month) -> bool {
    records
        .iter()
        .any(|record| record.month(month).current_year_value != 0.0)
}

/// Month-over-month series for all twelve months, January first.
pub fn monthly_trend(records: &[RevenueRecord]) -> Vec<MonthlyTrendPoint> {
    CALENDAR
        .iter()
        .map(|&month| {
            let totals = monthly_totals(records, month);
            MonthlyTrendPoint {
                month,
                totals,
                growth_rate: totals.growth_rate(),
            }
        })
        .collect()
}

/// Groups records by `key_fn`, largest current-year contributor first. Groups
/// with equal totals keep the order in which their key was first seen.
pub fn segment_rollup<'a, I, F>(records: I, key_fn: F) -> Vec<SegmentSummary>
where
    I: IntoIterator<Item = &'a RevenueRecord>,
    F: Fn(&RevenueRecord) -> String,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<SegmentSummary> = Vec::new();

    for record in records {
        let key = key_fn(record);
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(SegmentSummary {
                    key,
                    total_prior_year: 0.0,
                    total_current_year: 0.0,
                    project_count: 0,
                    average_growth: 0.0,
                    contribution_share: 0.0,
                });
                groups.len() - 1
            }
        };

        let group = &mut groups[slot];
        group.total_prior_year += record.total_prior_year;
        group.total_current_year += record.total_current_year;
        group.project_count += 1;
    }

    let grand_total: f64 = groups.iter().map(|g| g.total_current_year).sum();
    for group in &mut groups {
        group.average_growth = growth_rate(group.total_prior_year, group.total_current_year);
        group.contribution_share = share_of(group.total_current_year, grand_total);
    }

    groups.sort_by(|a, b| b.total_current_year.total_cmp(&a.total_current_year));
    groups
}

pub fn by_business_line(record: &RevenueRecord) -> String {
    if record.business_line.is_empty() {
        UNASSIGNED_SEGMENT.to_string()
    } else {
        record.business_line.clone()
    }
}

pub fn by_company(record: &RevenueRecord) -> String {
    record.company.clone()
}

pub fn portfolio_summary(records: &[RevenueRecord]) -> PortfolioSummary {
    let total_prior_year: f64 = records.iter().map(|r| r.total_prior_year).sum();
    let total_current_year: f64 = records.iter().map(|r| r.total_current_year).sum();

    let mut companies: Vec<&str> = records.iter().map(|r| r.company.as_str()).collect();
    companies.sort_unstable();
    companies.dedup();

    PortfolioSummary {
        total_prior_year,
        total_current_year,
        growth_rate: growth_rate(total_prior_year, total_current_year),
        absolute_change: total_current_year - total_prior_year,
        record_count: records.len(),
        company_count: companies.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(company: &str, line: &str, prior: f64, current: f64) -> RevenueRecord {
        let mut r = RevenueRecord::new(company, line, "", format!("{} project", company));
        r.total_prior_year = prior;
        r.total_current_year = current;
        r
    }

    #[test]
    fn test_monthly_totals() {
        let mut a = record("ACME", "Retail", 0.0, 0.0);
        a.month_mut(Month::May).prior_year_value = 100.0;
        a.month_mut(Month::May).current_year_value = 120.0;
        let mut b = record("Globex", "Energy", 0.0, 0.0);
        b.month_mut(Month::May).prior_year_value = 300.0;
        b.month_mut(Month::May).current_year_value = 330.0;

        let totals = monthly_totals(&[a, b], Month::May);
        assert_eq!(totals.prior_year_total, 400.0);
        assert_eq!(totals.current_year_total, 450.0);
        assert!((totals.growth_rate() - 12.5).abs() < 1e-10);
    }

    #[test]
    fn test_month_has_actuals_ignores_cancelling_sums() {
        let mut a = record("ACME", "Retail", 0.0, 0.0);
        a.month_mut(Month::April).current_year_value = 50.0;
        let mut b = record("Globex", "Energy", 0.0, 0.0);
        b.month_mut(Month::April).current_year_value = -50.0;
        let records = [a, b];

        assert_eq!(monthly_totals(&records, Month::April).current_year_total, 0.0);
        assert!(month_has_actuals(&records, Month::April));
        assert!(!month_has_actuals(&records, Month::May));
    }

    #[test]
    fn test_monthly_growth_without_prior_base() {
        let mut a = record("ACME", "Retail", 0.0, 0.0);
        a.month_mut(Month::June).current_year_value = 900.0;

        let trend = monthly_trend(&[a]);
        assert_eq!(trend.len(), 12);
        assert_eq!(trend[5].month, Month::June);
        assert_eq!(trend[5].growth_rate, 0.0);
        assert!(trend.iter().all(|p| p.growth_rate.is_finite()));
    }

    #[test]
    fn test_segment_rollup_sorted_by_current_year() {
        let records = vec![
            record("ACME", "Retail", 100.0, 150.0),
            record("Globex", "Energy", 400.0, 300.0),
            record("Initech", "Retail", 200.0, 250.0),
            record("Umbrella", "", 0.0, 100.0),
        ];

        let rollup = segment_rollup(&records, by_business_line);
        assert_eq!(rollup.len(), 3);
        assert_eq!(rollup[0].key, "Retail");
        assert_eq!(rollup[0].project_count, 2);
        assert_eq!(rollup[0].total_current_year, 400.0);
        assert!((rollup[0].average_growth - (100.0 / 300.0 * 100.0)).abs() < 1e-10);
        assert_eq!(rollup[1].key, "Energy");
        assert!((rollup[1].average_growth + 25.0).abs() < 1e-10);
        assert_eq!(rollup[2].key, UNASSIGNED_SEGMENT);
        assert_eq!(rollup[2].average_growth, 0.0);

        let share_sum: f64 = rollup.iter().map(|g| g.contribution_share).sum();
        assert!((share_sum - 100.0).abs() < 1e-9, "got {}", share_sum);
    }

    #[test]
    fn test_segment_rollup_ties_keep_first_seen_order() {
        let records = vec![
            record("Zeta", "", 10.0, 50.0),
            record("Alpha", "", 10.0, 50.0),
            record("Mid", "", 10.0, 80.0),
        ];

        let rollup = segment_rollup(&records, by_company);
        let keys: Vec<&str> = rollup.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["Mid", "Zeta", "Alpha"]);
    }

    #[test]
    fn test_segment_rollup_all_zero_is_finite() {
        let records = vec![record("ACME", "", 0.0, 0.0), record("Globex", "", 0.0, 0.0)];
        let rollup = segment_rollup(&records, by_company);
        for group in rollup {
            assert_eq!(group.average_growth, 0.0);
            assert_eq!(group.contribution_share, 0.0);
        }
    }

    #[test]
    fn test_portfolio_summary() {
        let records = vec![
            record("ACME", "Retail", 100.0, 150.0),
            record("ACME", "Energy", 100.0, 50.0),
            record("Globex", "Energy", 200.0, 300.0),
        ];
        let summary = portfolio_summary(&records);
        assert_eq!(summary.total_prior_year, 400.0);
        assert_eq!(summary.total_current_year, 500.0);
        assert!((summary.growth_rate - 25.0).abs() < 1e-10);
        assert_eq!(summary.absolute_change, 100.0);
        assert_eq!(summary.record_count, 3);
        assert_eq!(summary.company_count, 2);
    }
}
