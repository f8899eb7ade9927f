use crate::aggregation::{month_has_actuals, monthly_totals};
use crate::schema::{RevenueRecord, CALENDAR};
use crate::utils::mean;
use chrono::Month;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Growth assumed when no month offers a usable observation, in percent.
pub const DEFAULT_GROWTH_RATE: f64 = 5.0;

pub const OPTIMISTIC_MULTIPLIER: f64 = 1.25;
/// Above 1.0, so conservative projections sit between baseline and optimistic.
pub const CONSERVATIVE_MULTIPLIER: f64 = 1.05;
pub const PESSIMISTIC_MULTIPLIER: f64 = 0.85;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum ForecastMethod {
    #[schemars(description = "Mean observed growth applied to the prior-year value of the same month")]
    #[default]
    Linear,

    #[schemars(
        description = "Mean observed growth scaled up for the final quarter (Oct 1.1x, Nov 1.15x, Dec 1.2x)"
    )]
    Seasonal,

    #[schemars(description = "Mean of the two most recent observed growth rates")]
    Trend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Scenario {
    Baseline,
    Optimistic,
    Conservative,
    Pessimistic,
}

impl Scenario {
    pub fn multiplier(&self) -> f64 {
        match self {
            Scenario::Baseline => 1.0,
            Scenario::Optimistic => OPTIMISTIC_MULTIPLIER,
            Scenario::Conservative => CONSERVATIVE_MULTIPLIER,
            Scenario::Pessimistic => PESSIMISTIC_MULTIPLIER,
        }
    }
}

/// Multiplier applied to the growth rate by [`ForecastMethod::Seasonal`].
pub fn seasonal_multiplier(month: Month) -> f64 {
    match month {
        Month::October => 1.1,
        Month::November => 1.15,
        Month::December => 1.2,
        _ => 1.0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthForecast {
    pub month: Month,
    pub prior_year_value: f64,
    /// Growth rate used for this month, in percent.
    pub growth_rate: f64,
    pub baseline: f64,
    pub optimistic: f64,
    pub conservative: f64,
    pub pessimistic: f64,
}

impl MonthForecast {
    fn project(month: Month, prior_year_value: f64, growth_rate: f64) -> Self {
        let baseline = (prior_year_value * (1.0 + growth_rate / 100.0)).max(0.0);
        Self {
            month,
            prior_year_value,
            growth_rate,
            baseline,
            optimistic: baseline * Scenario::Optimistic.multiplier(),
            conservative: baseline * Scenario::Conservative.multiplier(),
            pessimistic: baseline * Scenario::Pessimistic.multiplier(),
        }
    }

    pub fn value(&self, scenario: Scenario) -> f64 {
        match scenario {
            Scenario::Baseline => self.baseline,
            Scenario::Optimistic => self.optimistic,
            Scenario::Conservative => self.conservative,
            Scenario::Pessimistic => self.pessimistic,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub method: ForecastMethod,
    /// Monthly growth rates observed in the actual months, calendar order.
    pub observed_rates: Vec<f64>,
    /// Rate before any per-month seasonal scaling.
    pub base_rate: f64,
    pub months: Vec<MonthForecast>,
}

impl Forecast {
    pub fn projected_total(&self, scenario: Scenario) -> f64 {
        self.months.iter().map(|m| m.value(scenario)).sum()
    }

    pub fn used_default_rate(&self) -> bool {
        self.observed_rates.is_empty()
    }
}

/// Projects every month in which no record has current-year revenue yet, from
/// its prior-year value and the growth observed over `actual_months`.
pub fn forecast_remaining_months(
    records: &[RevenueRecord],
    actual_months: &[Month],
    method: ForecastMethod,
) -> Forecast {
    let observed_rates: Vec<f64> = CALENDAR
        .iter()
        .filter(|month| actual_months.contains(*month))
        .map(|&month| monthly_totals(records, month))
        .filter(|totals| totals.prior_year_total > 0.0)
        .map(|totals| totals.growth_rate())
        .collect();

    let base_rate = match method {
        ForecastMethod::Linear | ForecastMethod::Seasonal => mean(&observed_rates),
        ForecastMethod::Trend => {
            let recent = &observed_rates[observed_rates.len().saturating_sub(2)..];
            mean(recent)
        }
    };

    let months = CALENDAR
        .iter()
        .filter(|&&month| !month_has_actuals(records, month))
        .map(|&month| {
            let totals = monthly_totals(records, month);
            let rate = match (base_rate, method) {
                (None, _) => DEFAULT_GROWTH_RATE,
                (Some(rate), ForecastMethod::Seasonal) => rate * seasonal_multiplier(month),
                (Some(rate), _) => rate,
            };
            MonthForecast::project(month, totals.prior_year_total, rate)
        })
        .collect::<Vec<_>>();

    debug!(
        "{:?} forecast over {} observed months projected {} months",
        method,
        observed_rates.len(),
        months.len()
    );

    Forecast {
        method,
        base_rate: base_rate.unwrap_or(DEFAULT_GROWTH_RATE),
        observed_rates,
        months,
    }
}
