use anyhow::Result;
use revenue_dashboard_core::*;

fn main() -> Result<()> {
    let mut config = DashboardConfig::default();
    config.apply_env()?;

    let source = source_from_config(&config.source)?;
    let state = ViewState::from_load(futures::executor::block_on(load_table(source.as_ref())));

    let table = match state {
        ViewState::Ready(table) => table,
        ViewState::Empty => {
            println!("{} contains no revenue rows", source.name());
            return Ok(());
        }
        ViewState::Failed(message) => {
            println!("Could not load revenue data: {}", message);
            return Ok(());
        }
    };

    let report = DashboardProcessor::new(&config).process(&table);

    println!("=== Portfolio ===");
    println!(
        "Prior year: {:>14.2}   Current year: {:>14.2}   Growth: {:>7.2}%",
        report.summary.total_prior_year, report.summary.total_current_year, report.summary.growth_rate
    );
    println!(
        "{} projects across {} companies",
        report.summary.record_count, report.summary.company_count
    );

    println!("\n=== Monthly trend ===");
    for point in &report.trend {
        println!(
            "{:<10} {:>12.2} {:>12.2} {:>8.2}%",
            month_name(point.month),
            point.totals.prior_year_total,
            point.totals.current_year_total,
            point.growth_rate
        );
    }

    println!("\n=== Business lines ===");
    for segment in &report.business_lines {
        println!(
            "{:<12} {:>12.2} share {:>6.2}% growth {:>8.2}% ({} projects)",
            segment.key,
            segment.total_current_year,
            segment.contribution_share,
            segment.average_growth,
            segment.project_count
        );
    }

    println!("\n=== Top gainers ===");
    for record in &report.top_gainers {
        println!("{:<20} {:<22} {:>8.2}%", record.company, record.project, record.total_percent_change);
    }

    println!("\n=== Top losers ===");
    for record in &report.top_losers {
        println!("{:<20} {:<22} {:>8.2}%", record.company, record.project, record.total_percent_change);
    }

    println!("\n=== {:?} forecast (base rate {:.2}%) ===", report.forecast.method, report.forecast.base_rate);
    for month in &report.forecast.months {
        println!(
            "{:<10} pessimistic {:>11.2} baseline {:>11.2} optimistic {:>11.2}",
            month_name(month.month),
            month.pessimistic,
            month.baseline,
            month.optimistic
        );
    }

    let live = LiveMetrics::from_summary(&report.summary, config.live.jitter)?;
    let sample = live.sample();
    println!(
        "\nLive: revenue {:.2}, EBIT {:.2}, margin {:.2}% at {}",
        sample.revenue, sample.ebit, sample.margin, sample.taken_at
    );

    Ok(())
}
