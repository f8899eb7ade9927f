use crate::aggregation::PortfolioSummary;
use crate::error::{Result, RevenueError};
use chrono::{DateTime, Utc};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// EBIT share of revenue assumed when seeding from a portfolio summary.
pub const DEFAULT_EBIT_MARGIN: f64 = 0.18;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveSample {
    pub taken_at: DateTime<Utc>,
    pub revenue: f64,
    pub ebit: f64,
    /// EBIT over revenue, in percent.
    pub margin: f64,
}

/// Jitters a set of base KPIs to drive the "real-time" widgets.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveMetrics {
    base_revenue: f64,
    base_ebit: f64,
    jitter: f64,
}

impl LiveMetrics {
    pub fn new(base_revenue: f64, base_ebit: f64, jitter: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&jitter) {
            return Err(RevenueError::InvalidJitter(jitter));
        }
        Ok(Self {
            base_revenue,
            base_ebit,
            jitter,
        })
    }

    pub fn from_summary(summary: &PortfolioSummary, jitter: f64) -> Result<Self> {
        Self::new(
            summary.total_current_year,
            summary.total_current_year * DEFAULT_EBIT_MARGIN,
            jitter,
        )
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    pub fn sample(&self) -> LiveSample {
        self.sample_with(&mut rand::thread_rng())
    }

    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> LiveSample {
        let (revenue, ebit) = if self.jitter > 0.0 {
            // jitter is validated in new()
            match Normal::new(0.0, self.jitter) {
                Ok(normal) => (
                    self.base_revenue * (1.0 + normal.sample(rng)),
                    self.base_ebit * (1.0 + normal.sample(rng)),
                ),
                Err(_) => (self.base_revenue, self.base_ebit),
            }
        } else {
            (self.base_revenue, self.base_ebit)
        };

        LiveSample {
            taken_at: Utc::now(),
            revenue,
            ebit,
            margin: crate::utils::share_of(ebit, revenue),
        }
    }
}

/// Publishes a fresh sample every `interval` into a watch channel. Readers
/// only ever see the latest sample. The task stops once every receiver is
/// dropped.
#[cfg(feature = "live")]
pub fn spawn_feed(
    metrics: LiveMetrics,
    interval: std::time::Duration,
) -> (
    tokio::sync::watch::Receiver<LiveSample>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, rx) = tokio::sync::watch::channel(metrics.sample());

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if tx.send(metrics.sample()).is_err() {
                log::debug!("Live metrics feed has no receivers, stopping");
                break;
            }
        }
    });

    (rx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_zero_jitter_returns_base_values() {
        let metrics = LiveMetrics::new(1000.0, 200.0, 0.0).unwrap();
        let sample = metrics.sample();
        assert_eq!(sample.revenue, 1000.0);
        assert_eq!(sample.ebit, 200.0);
        assert!((sample.margin - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_jitter_stays_near_base() {
        let metrics = LiveMetrics::new(1000.0, 200.0, 0.01).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let sample = metrics.sample_with(&mut rng);
            assert!((sample.revenue - 1000.0).abs() < 100.0);
            assert!(sample.margin.is_finite());
        }
    }

    #[test]
    fn test_invalid_jitter() {
        assert!(matches!(
            LiveMetrics::new(1.0, 1.0, 1.5),
            Err(RevenueError::InvalidJitter(_))
        ));
        assert!(LiveMetrics::new(1.0, 1.0, -0.1).is_err());
    }

    #[test]
    fn test_from_summary() {
        let summary = PortfolioSummary {
            total_current_year: 5000.0,
            ..PortfolioSummary::default()
        };
        let metrics = LiveMetrics::from_summary(&summary, 0.0).unwrap();
        let sample = metrics.sample();
        assert_eq!(sample.revenue, 5000.0);
        assert!((sample.margin - DEFAULT_EBIT_MARGIN * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_revenue_margin_is_zero() {
        let metrics = LiveMetrics::new(0.0, 0.0, 0.0).unwrap();
        assert_eq!(metrics.sample().margin, 0.0);
    }

    #[cfg(feature = "live")]
    #[tokio::test]
    async fn test_feed_keeps_latest_sample() {
        let metrics = LiveMetrics::new(100.0, 10.0, 0.0).unwrap();
        let (mut rx, handle) = spawn_feed(metrics, std::time::Duration::from_millis(50));

        rx.changed().await.unwrap();
        let first = rx.borrow_and_update().clone();
        assert_eq!(first.revenue, 100.0);

        drop(rx);
        handle.await.unwrap();
    }
}
