use crate::error::{Result, RevenueError};
use crate::schema::{RevenueRecord, CALENDAR};
use csv::WriterBuilder;
use std::io::Write;

pub fn header_row() -> Vec<String> {
    let mut header = vec![
        "Company".to_string(),
        "Business Line".to_string(),
        "Cost Center".to_string(),
        "Project".to_string(),
    ];
    for month in CALENDAR {
        header.push(format!("{} Prior Year", month.name()));
        header.push(format!("{} Current Year", month.name()));
        header.push(format!("{} % Change", month.name()));
    }
    header.push("Total Prior Year".to_string());
    header.push("Total Current Year".to_string());
    header.push("Total % Change".to_string());
    header
}

/// Writes records in the same wide layout the ingestion side reads, so that
/// parsing the output gives back the same records.
pub fn write_csv<W: Write>(records: &[RevenueRecord], writer: W) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().flexible(false).from_writer(writer);
    csv_writer.write_record(header_row())?;

    for record in records {
        let mut row = vec![
            record.company.clone(),
            record.business_line.clone(),
            record.cost_center.clone(),
            record.project.clone(),
        ];
        for figures in &record.monthly {
            row.push(format_amount(figures.prior_year_value));
            row.push(format_amount(figures.current_year_value));
            row.push(format_percent(figures.month_percent_change));
        }
        row.push(format_amount(record.total_prior_year));
        row.push(format_amount(record.total_current_year));
        row.push(format_percent(record.total_percent_change));

        csv_writer.write_record(&row)?;
    }

    csv_writer
        .flush()
        .map_err(RevenueError::from)
}

pub fn to_csv(records: &[RevenueRecord]) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(records, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| {
        RevenueError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}

// `Display` for f64 prints the shortest text that parses back to the same value.
fn format_amount(value: f64) -> String {
    format!("{}", value)
}

fn format_percent(value: f64) -> String {
    format!("{}%", value)
}
