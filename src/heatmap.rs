use crate::schema::{RevenueRecord, CALENDAR};
use crate::utils::{finite_or_zero, growth_rate};
use chrono::Month;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum HeatmapMetric {
    /// Absolute growth percent.
    #[default]
    Growth,
    /// Current-year value.
    Volume,
    /// Absolute difference between the two years.
    Variance,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeatmapCell {
    pub prior_year_value: f64,
    pub current_year_value: f64,
}

impl HeatmapCell {
    pub fn new(prior_year_value: f64, current_year_value: f64) -> Self {
        Self {
            prior_year_value,
            current_year_value,
        }
    }

    pub fn growth_percent(&self) -> f64 {
        growth_rate(self.prior_year_value, self.current_year_value)
    }

    pub fn magnitude(&self, metric: HeatmapMetric) -> f64 {
        let value = match metric {
            HeatmapMetric::Growth => self.growth_percent().abs(),
            HeatmapMetric::Volume => self.current_year_value,
            HeatmapMetric::Variance => (self.current_year_value - self.prior_year_value).abs(),
        };
        finite_or_zero(value)
    }
}

/// Scales `cell` against the largest magnitude in `population` to 0..=100.
pub fn intensity(cell: &HeatmapCell, metric: HeatmapMetric, population: &[HeatmapCell]) -> f64 {
    scale(cell.magnitude(metric), max_magnitude(population, metric))
}

fn max_magnitude(population: &[HeatmapCell], metric: HeatmapMetric) -> f64 {
    population
        .iter()
        .map(|c| c.magnitude(metric))
        .fold(0.0, f64::max)
}

fn scale(magnitude: f64, max: f64) -> f64 {
    if max <= 0.0 {
        return 0.0;
    }
    (magnitude / max * 100.0).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapRow {
    pub company: String,
    /// January first.
    pub cells: Vec<HeatmapCell>,
    pub intensities: Vec<f64>,
}

/// Company by month grid, every cell scaled against the whole grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapGrid {
    pub metric: HeatmapMetric,
    pub rows: Vec<HeatmapRow>,
}

impl HeatmapGrid {
    pub fn build(records: &[RevenueRecord], metric: HeatmapMetric) -> Self {
        let mut rows: Vec<HeatmapRow> = Vec::new();

        for record in records {
            let row = match rows.iter().position(|r| r.company == record.company) {
                Some(idx) => &mut rows[idx],
                None => {
                    rows.push(HeatmapRow {
                        company: record.company.clone(),
                        cells: vec![HeatmapCell::default(); CALENDAR.len()],
                        intensities: Vec::new(),
                    });
                    let last = rows.len() - 1;
                    &mut rows[last]
                }
            };

            for (cell, (_, figures)) in row.cells.iter_mut().zip(record.months()) {
                cell.prior_year_value += figures.prior_year_value;
                cell.current_year_value += figures.current_year_value;
            }
        }

        let population: Vec<HeatmapCell> = rows.iter().flat_map(|r| r.cells.iter().copied()).collect();
        let max = max_magnitude(&population, metric);

        for row in &mut rows {
            row.intensities = row
                .cells
                .iter()
                .map(|c| scale(c.magnitude(metric), max))
                .collect();
        }

        Self { metric, rows }
    }

    pub fn intensity_at(&self, company: &str, month: Month) -> Option<f64> {
        let idx = month.number_from_month() as usize - 1;
        self.rows
            .iter()
            .find(|r| r.company == company)
            .and_then(|r| r.intensities.get(idx).copied())
    }
}
