//! Plain-text summary tables.
//!
//! Values are never truncated; columns are padded by display width so CJK
//! descriptions line up. When any record belongs to a recognized ticket
//! category the extended layout with the category columns is used.

use std::path::Path;

use chrono::Local;
use unicode_width::UnicodeWidthStr;

use crate::model::summary::{SummaryRecord, NOT_AVAILABLE};

const STANDARD_COLUMNS: [(&str, usize); 5] = [
    ("#", 4),
    ("Processed", 20),
    ("Ticket", 15),
    ("Short Description", 70),
    ("Requested by", 60),
];

const EXTENDED_COLUMNS: [(&str, usize); 8] = [
    ("#", 4),
    ("Processed", 20),
    ("Ticket", 15),
    ("Short Description", 60),
    ("Requested by", 30),
    ("Environment", 40),
    ("Required Permissions", 50),
    ("Reason", 40),
];

/// Left-align `value` in a column of `width` display columns.
fn pad(value: &str, width: usize) -> String {
    let used = UnicodeWidthStr::width(value);
    let mut out = value.to_string();
    if used < width {
        out.push_str(&" ".repeat(width - used));
    }
    out
}

fn row(cells: &[String], columns: &[(&str, usize)]) -> String {
    let mut line = cells
        .iter()
        .zip(columns)
        .map(|(cell, (_, width))| pad(cell, *width))
        .collect::<Vec<_>>()
        .join(" ");
    line.truncate(line.trim_end().len());
    line.push('\n');
    line
}

/// Render `records` as a text table headed by `title`.
pub fn render_report(title: &str, records: &[&SummaryRecord], exported_at: &str) -> String {
    let extended = records.iter().any(|r| r.is_china_cloud);
    let columns: &[(&str, usize)] = if extended {
        &EXTENDED_COLUMNS
    } else {
        &STANDARD_COLUMNS
    };
    let rule_width = if extended { 350 } else { 170 };

    let mut out = String::new();
    out.push_str(&format!("{title}\n"));
    out.push_str(&format!("Exported: {exported_at}\n\n"));
    out.push_str(&"=".repeat(rule_width));
    out.push('\n');
    let header: Vec<String> = columns.iter().map(|(name, _)| name.to_string()).collect();
    out.push_str(&row(&header, columns));
    out.push_str(&"-".repeat(rule_width));
    out.push('\n');

    for (i, record) in records.iter().enumerate() {
        let processed = record
            .processed_time
            .get(..19)
            .unwrap_or(&record.processed_time);
        let mut cells = vec![
            (i + 1).to_string(),
            processed.to_string(),
            record.ticket_number.clone(),
            record.short_description.clone(),
            record.requested_by.clone(),
        ];
        if extended {
            let category = |v: &Option<String>| {
                if record.is_china_cloud {
                    v.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string())
                } else {
                    "-".to_string()
                }
            };
            cells.push(category(&record.environment));
            cells.push(category(&record.required_permissions));
            cells.push(category(&record.reason_for_application));
        }
        out.push_str(&row(&cells, columns));
    }

    out.push_str(&"-".repeat(rule_width));
    out.push('\n');
    out.push_str(&format!("Total messages processed: {}\n", records.len()));
    out.push_str(&"=".repeat(rule_width));
    out.push('\n');
    out
}

/// Write the text report to `path`.
pub fn export_text(records: &[&SummaryRecord], title: &str, path: &Path) -> anyhow::Result<()> {
    let exported_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    std::fs::write(path, render_report(title, records, &exported_at))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ticket: &str, china: bool) -> SummaryRecord {
        SummaryRecord {
            processed_time: "2025-03-04 09:10:11".into(),
            ticket_number: ticket.into(),
            short_description: "申请 VPN access".into(),
            subject: "S".into(),
            from: "F".into(),
            message_id: "N/A".into(),
            requested_by: "Jane Doe".into(),
            environment: china.then(|| "PROD".to_string()),
            required_permissions: china.then(|| "Read".to_string()),
            reason_for_application: None,
            is_china_cloud: china,
        }
    }

    #[test]
    fn test_standard_layout() {
        let a = record("RITM1", false);
        let text = render_report("Processing summary", &[&a], "2025-03-04 10:00:00");
        assert!(text.starts_with("Processing summary\nExported: 2025-03-04 10:00:00\n"));
        assert!(!text.contains("Environment"));
        assert!(text.contains("Total messages processed: 1"));
        assert!(text.lines().any(|l| l.starts_with("1    2025-03-04 09:10:11  RITM1")));
    }

    #[test]
    fn test_extended_layout_marks_plain_rows() {
        let a = record("RITM1", false);
        let b = record("RITM2", true);
        let text = render_report("Today", &[&a, &b], "now");
        assert!(text.contains("Required Permissions"));

        let plain = text.lines().find(|l| l.contains("RITM1")).unwrap();
        assert!(plain.trim_end().ends_with('-'));
        let china = text.lines().find(|l| l.contains("RITM2")).unwrap();
        assert!(china.contains("PROD"));
        assert!(china.trim_end().ends_with(NOT_AVAILABLE));
    }

    #[test]
    fn test_pad_uses_display_width() {
        assert_eq!(pad("申请", 6), "申请  ");
        assert_eq!(pad("abcdef", 3), "abcdef");
    }
}
