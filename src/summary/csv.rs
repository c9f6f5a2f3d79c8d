//! Export summary records to CSV.
//!
//! Output is UTF-8 with BOM for Excel compatibility.

use std::io::Write;
use std::path::Path;

use crate::model::summary::{SummaryRecord, NOT_AVAILABLE};

const HEADER: &str = "Processed_Time,Ticket_Number,Short_Description,Requested_By,Environment,Required_Permissions,Reason_For_Application,Subject,From,Message_ID";

/// Export summary records to a CSV file.
///
/// Category columns are `-` for requests outside the recognized categories.
pub fn export_csv(records: &[&SummaryRecord], output_path: &Path) -> anyhow::Result<()> {
    let mut file = std::fs::File::create(output_path)?;
    file.write_all(&render_csv(records))?;
    Ok(())
}

/// CSV bytes, BOM included.
pub fn render_csv(records: &[&SummaryRecord]) -> Vec<u8> {
    let mut out: Vec<u8> = vec![0xEF, 0xBB, 0xBF];
    out.extend_from_slice(HEADER.as_bytes());
    out.extend_from_slice(b"\r\n");

    for record in records {
        let category = |v: &Option<String>| {
            if record.is_china_cloud {
                v.as_deref().unwrap_or(NOT_AVAILABLE).to_string()
            } else {
                "-".to_string()
            }
        };
        let row = [
            record.processed_time.clone(),
            record.ticket_number.clone(),
            record.short_description.clone(),
            record.requested_by.clone(),
            category(&record.environment),
            category(&record.required_permissions),
            category(&record.reason_for_application),
            record.subject.clone(),
            record.from.clone(),
            record.message_id.clone(),
        ]
        .iter()
        .map(|v| csv_escape(v))
        .collect::<Vec<_>>()
        .join(",");
        out.extend_from_slice(row.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Escape a value for CSV (RFC 4180).
///
/// Wraps in double quotes if the value contains commas, quotes, or newlines.
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("hello"), "hello");
        assert_eq!(csv_escape("hello, world"), "\"hello, world\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_render_csv() {
        let record = SummaryRecord {
            processed_time: "2025-03-04 09:10:11".into(),
            ticket_number: "RITM7".into(),
            short_description: "Access, please".into(),
            subject: "RITM7 approval".into(),
            from: "ServiceNow <sn@example.com>".into(),
            message_id: "<7@sn>".into(),
            requested_by: "Jane".into(),
            environment: None,
            required_permissions: None,
            reason_for_application: None,
            is_china_cloud: false,
        };
        let bytes = render_csv(&[&record]);
        assert!(bytes.starts_with(&[0xEF, 0xBB, 0xBF]));

        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Processed_Time,Ticket_Number"));
        assert_eq!(
            lines[1],
            "2025-03-04 09:10:11,RITM7,\"Access, please\",Jane,-,-,-,RITM7 approval,ServiceNow <sn@example.com>,<7@sn>"
        );
    }
}
