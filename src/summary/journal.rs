//! JSON journal of answered approval requests.

use std::path::Path;

use tracing::{debug, warn};

use crate::error::{ApproveError, Result};
use crate::model::summary::SummaryRecord;
use crate::state::write_atomic;

/// Load all records. A missing journal is empty.
pub fn load(path: &Path) -> Result<Vec<SummaryRecord>> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ApproveError::io(path, e)),
    };
    serde_json::from_str(&data).map_err(|e| ApproveError::State {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Replace the journal with `records`.
pub fn save(path: &Path, records: &[SummaryRecord]) -> Result<()> {
    let json = serde_json::to_vec_pretty(records).map_err(|e| ApproveError::State {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    write_atomic(path, &json)
}

/// Append one record.
///
/// A corrupt journal is set aside as `<name>.corrupt` rather than overwritten.
pub fn append(path: &Path, record: SummaryRecord) -> Result<()> {
    let mut records = match load(path) {
        Ok(records) => records,
        Err(ApproveError::State { reason, .. }) => {
            let aside = path.with_extension("json.corrupt");
            warn!(path = %path.display(), reason = %reason, aside = %aside.display(), "Summary journal corrupt, starting a new one");
            std::fs::rename(path, &aside).map_err(|e| ApproveError::io(path, e))?;
            Vec::new()
        }
        Err(e) => return Err(e),
    };
    records.push(record);
    save(path, &records)?;
    debug!(path = %path.display(), total = records.len(), "Appended summary record");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ticket: &str) -> SummaryRecord {
        SummaryRecord {
            processed_time: "2025-03-04 09:10:11".into(),
            ticket_number: ticket.into(),
            short_description: "Laptop".into(),
            subject: "S".into(),
            from: "F".into(),
            message_id: "N/A".into(),
            requested_by: "N/A".into(),
            environment: None,
            required_permissions: None,
            reason_for_application: None,
            is_china_cloud: false,
        }
    }

    #[test]
    fn test_append_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("processing_summary.json");
        assert!(load(&path).unwrap().is_empty());

        append(&path, record("RITM1")).unwrap();
        append(&path, record("RITM2")).unwrap();
        let records = load(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].ticket_number, "RITM2");
    }

    #[test]
    fn test_corrupt_journal_is_set_aside() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("processing_summary.json");
        std::fs::write(&path, "[{broken").unwrap();

        append(&path, record("RITM3")).unwrap();
        assert_eq!(load(&path).unwrap().len(), 1);
        assert!(tmp.path().join("processing_summary.json.corrupt").exists());
    }
}
