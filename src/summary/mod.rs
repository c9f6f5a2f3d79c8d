//! Processing summary: the journal of answered requests and its reports.

pub mod csv;
pub mod journal;
pub mod report;

use crate::model::summary::SummaryRecord;

/// Records processed on `day` (`YYYY-MM-DD`).
pub fn records_for_day<'a>(records: &'a [SummaryRecord], day: &str) -> Vec<&'a SummaryRecord> {
    records.iter().filter(|r| r.processed_day() == day).collect()
}
