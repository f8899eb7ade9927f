use crate::schema::{MonthFigures, RevenueRecord, RevenueTable};
use csv::{ReaderBuilder, StringRecord};
use log::{debug, trace, warn};

/// company, business line, cost center, project
pub const ENTITY_COLUMNS: usize = 4;
/// prior year, current year, percent change
pub const TRIPLET_WIDTH: usize = 3;
/// Smallest row that carries a trailing total block of its own.
const MIN_ROW_WITH_TOTALS: usize = ENTITY_COLUMNS + TRIPLET_WIDTH;

const CURRENCY_SYMBOLS: [char; 5] = ['$', '€', '£', '¥', '₹'];
const DASHES: [&str; 3] = ["-", "–", "—"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    /// Data lines seen after the header.
    pub total_lines: usize,
    pub admitted: usize,
    pub skipped_blank: usize,
    pub skipped_short: usize,
    pub skipped_missing_key: usize,
    pub skipped_unreadable: usize,
}

enum RowRejection {
    Blank,
    Short,
    MissingKey,
}

/// Builds [`RevenueRecord`]s from the wide revenue comparison layout:
///
/// ```text
/// company, business line, cost center, project,
/// Jan prior, Jan current, Jan %, ... Dec prior, Dec current, Dec %,
/// total prior, total current, total %
/// ```
///
/// Parsing never fails on cell content. Unreadable numbers become zero and
/// inadmissible rows are dropped.
pub struct RevenueTableBuilder;

impl RevenueTableBuilder {
    pub fn parse(raw: &str) -> Vec<RevenueRecord> {
        Self::parse_with_report(raw).0
    }

    pub fn build(raw: &str) -> RevenueTable {
        RevenueTable::new(Self::parse(raw))
    }

    pub fn parse_with_report(raw: &str) -> (Vec<RevenueRecord>, ParseReport) {
        let mut records = Vec::new();
        let mut report = ParseReport::default();

        // Each physical line is one row; quoting never spans a line break.
        for (line, text) in raw.lines().enumerate().skip(1) {
            report.total_lines += 1;

            if text.trim().is_empty() {
                report.skipped_blank += 1;
                continue;
            }

            let row = match split_line(text) {
                Ok(row) => row,
                Err(e) => {
                    warn!("Skipping unreadable revenue row {}: {}", line + 1, e);
                    report.skipped_unreadable += 1;
                    continue;
                }
            };

            match Self::parse_row(&row) {
                Ok(record) => {
                    report.admitted += 1;
                    records.push(record);
                }
                Err(RowRejection::Blank) => report.skipped_blank += 1,
                Err(RowRejection::Short) => {
                    trace!("Row {} has {} fields, skipping", line + 1, row.len());
                    report.skipped_short += 1;
                }
                Err(RowRejection::MissingKey) => {
                    trace!("Row {} has no company or project, skipping", line + 1);
                    report.skipped_missing_key += 1;
                }
            }
        }

        debug!(
            "Parsed {} of {} revenue rows ({} short, {} without key)",
            report.admitted, report.total_lines, report.skipped_short, report.skipped_missing_key
        );

        (records, report)
    }

    fn parse_row(row: &StringRecord) -> std::result::Result<RevenueRecord, RowRejection> {
        if row.iter().all(|field| field.trim().is_empty()) && row.len() < ENTITY_COLUMNS {
            return Err(RowRejection::Blank);
        }
        if row.len() < ENTITY_COLUMNS {
            return Err(RowRejection::Short);
        }

        let company = row[0].trim();
        let project = row[3].trim();
        if company.is_empty() || project.is_empty() {
            return Err(RowRejection::MissingKey);
        }

        let mut record = RevenueRecord::new(company, row[1].trim(), row[2].trim(), project);

        // Month groups stop where the trailing total block begins.
        let totals_start = if row.len() >= MIN_ROW_WITH_TOTALS {
            row.len() - TRIPLET_WIDTH
        } else {
            row.len()
        };
        for (i, figures) in record.monthly.iter_mut().enumerate() {
            let start = ENTITY_COLUMNS + TRIPLET_WIDTH * i;
            *figures = MonthFigures::new(
                normalize_amount(month_cell(row, start, totals_start)),
                normalize_amount(month_cell(row, start + 1, totals_start)),
                normalize_percent(month_cell(row, start + 2, totals_start)),
            );
        }

        if row.len() >= MIN_ROW_WITH_TOTALS {
            record.total_prior_year = normalize_amount(&row[totals_start]);
            record.total_current_year = normalize_amount(&row[totals_start + 1]);
            record.total_percent_change = normalize_percent(&row[totals_start + 2]);
        }

        Ok(record)
    }
}

/// Splits one line into fields. Balanced quotes are read as RFC 4180 cells;
/// a line with an unmatched quote falls back to plain comma splitting.
fn split_line(line: &str) -> csv::Result<StringRecord> {
    if line.matches('"').count() % 2 != 0 {
        trace!("Unbalanced quotes in {:?}, splitting on commas", line);
        return Ok(line.split(',').collect());
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    let first = reader.records().next();
    first.unwrap_or_else(|| Ok(StringRecord::new()))
}

fn month_cell(row: &StringRecord, idx: usize, totals_start: usize) -> &str {
    if idx < totals_start {
        row.get(idx).unwrap_or("")
    } else {
        ""
    }
}

/// Normalizes a monetary cell such as `"$1,234.50"` to `1234.5`.
/// Blank cells, lone dashes and `"$-"` placeholders are zero.
pub fn normalize_amount(cell: &str) -> f64 {
    let trimmed = cell.trim();
    if is_placeholder(trimmed) {
        return 0.0;
    }
    parse_cleaned(trimmed)
}

/// Normalizes a percentage cell such as `"12.34%"` to `12.34` (percent units,
/// not a fraction).
pub fn normalize_percent(cell: &str) -> f64 {
    let trimmed = cell.trim();
    if is_placeholder(trimmed) || is_zero_percent(trimmed) {
        return 0.0;
    }
    parse_cleaned(trimmed)
}

fn is_placeholder(trimmed: &str) -> bool {
    if trimmed.is_empty() || DASHES.contains(&trimmed) {
        return true;
    }
    match trimmed.strip_prefix(&CURRENCY_SYMBOLS[..]) {
        Some(rest) => DASHES.contains(&rest.trim()),
        None => false,
    }
}

fn is_zero_percent(trimmed: &str) -> bool {
    match trimmed.strip_suffix('%') {
        Some(number) => matches!(number.trim().parse::<f64>(), Ok(v) if v == 0.0),
        None => false,
    }
}

fn parse_cleaned(trimmed: &str) -> f64 {
    let cleaned: String = trimmed
        .chars()
        .filter(|c| {
            !CURRENCY_SYMBOLS.contains(c) && !matches!(c, ',' | '"' | '%') && !c.is_whitespace()
        })
        .collect();

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => {
            trace!("Unparseable numeric cell {:?}, using 0", trimmed);
            0.0
        }
    }
}
