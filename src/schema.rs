use crate::ranking::RecordFilter;
use chrono::Month;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Calendar months in the order the source table lays out its month groups.
pub const CALENDAR: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

/// Company value used by spreadsheet exports for their subtotal row.
pub const SUBTOTAL_SENTINEL: &str = "Total";

pub fn month_index(month: Month) -> usize {
    month.number_from_month() as usize - 1
}

pub fn month_name(month: Month) -> &'static str {
    month.name()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MonthFigures {
    #[schemars(description = "Revenue recorded for this month in the prior reference year")]
    pub prior_year_value: f64,

    #[schemars(description = "Revenue recorded for this month in the current reference year")]
    pub current_year_value: f64,

    #[schemars(description = "Month-over-year change as supplied by the source, in percent (12.5 means 12.5%)")]
    pub month_percent_change: f64,
}

impl MonthFigures {
    pub fn new(prior_year_value: f64, current_year_value: f64, month_percent_change: f64) -> Self {
        Self {
            prior_year_value,
            current_year_value,
            month_percent_change,
        }
    }
}

/// One project's prior-year vs. current-year revenue comparison row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RevenueRecord {
    #[schemars(description = "Owning organization name")]
    pub company: String,

    #[schemars(description = "Business line classification label, may be empty")]
    pub business_line: String,

    #[schemars(description = "Cost center identifier, may be empty")]
    pub cost_center: String,

    #[schemars(description = "Project name; together with the company this is the search key")]
    pub project: String,

    #[schemars(description = "Exactly twelve month triplets, January first")]
    pub monthly: [MonthFigures; 12],

    pub total_prior_year: f64,
    pub total_current_year: f64,

    #[schemars(description = "Annual percent change trusted verbatim from the source")]
    pub total_percent_change: f64,
}

impl RevenueRecord {
    pub fn new(
        company: impl Into<String>,
        business_line: impl Into<String>,
        cost_center: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        Self {
            company: company.into(),
            business_line: business_line.into(),
            cost_center: cost_center.into(),
            project: project.into(),
            ..Self::default()
        }
    }

    pub fn month(&self, month: Month) -> &MonthFigures {
        &self.monthly[month_index(month)]
    }

    pub fn month_mut(&mut self, month: Month) -> &mut MonthFigures {
        &mut self.monthly[month_index(month)]
    }

    /// Month triplets in calendar order.
    pub fn months(&self) -> impl Iterator<Item = (Month, &MonthFigures)> {
        CALENDAR.iter().copied().zip(self.monthly.iter())
    }

    pub fn is_subtotal(&self) -> bool {
        self.company.trim().eq_ignore_ascii_case(SUBTOTAL_SENTINEL)
    }

    pub fn absolute_change(&self) -> f64 {
        self.total_current_year - self.total_prior_year
    }
}

/// The parsed form of one load. Rebuilt from scratch on every fetch and never
/// mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueTable {
    records: Vec<RevenueRecord>,
}

impl RevenueTable {
    pub fn new(records: Vec<RevenueRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[RevenueRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RevenueRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<RevenueRecord> {
        self.records
    }

    pub fn without_subtotals(&self) -> RevenueTable {
        RevenueTable::new(
            self.records
                .iter()
                .filter(|r| !r.is_subtotal())
                .cloned()
                .collect(),
        )
    }

    /// Distinct companies in first-seen order.
    pub fn companies(&self) -> Vec<&str> {
        distinct(self.records.iter().map(|r| r.company.as_str()))
    }

    /// Distinct non-empty business lines in first-seen order.
    pub fn business_lines(&self) -> Vec<&str> {
        distinct(
            self.records
                .iter()
                .map(|r| r.business_line.as_str())
                .filter(|line| !line.is_empty()),
        )
    }

    pub fn filter(&self, filter: &RecordFilter) -> RevenueTable {
        RevenueTable::new(
            self.records
                .iter()
                .filter(|r| filter.matches(r))
                .cloned()
                .collect(),
        )
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(RevenueRecord)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

impl<'a> IntoIterator for &'a RevenueTable {
    type Item = &'a RevenueRecord;
    type IntoIter = std::slice::Iter<'a, RevenueRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = Vec::new();
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}
