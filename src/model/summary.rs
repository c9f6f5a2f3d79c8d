//! Records kept in the processing summary journal.

use serde::{Deserialize, Serialize};

use crate::extract::category::Category;
use crate::model::message::{ParsedMessage, TicketField};
use crate::reply::ticket_number;

/// Placeholder written for values that could not be determined.
pub const NOT_AVAILABLE: &str = "N/A";

/// One answered approval request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Local time the reply was sent, `%Y-%m-%d %H:%M:%S`.
    pub processed_time: String,
    /// `RITM…` / `CHG…` token from the subject, or `N/A`.
    pub ticket_number: String,
    pub short_description: String,
    pub subject: String,
    pub from: String,
    pub message_id: String,
    pub requested_by: String,
    /// Present only for recognized ticket categories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_permissions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_for_application: Option<String>,
    /// Whether the request belonged to one of the recognized categories.
    pub is_china_cloud: bool,
}

impl SummaryRecord {
    /// Build the journal entry for a message answered at `processed_time`.
    pub fn from_message(msg: &ParsedMessage, processed_time: &str) -> Self {
        let or_na = |s: &str| {
            if s.is_empty() {
                NOT_AVAILABLE.to_string()
            } else {
                s.to_string()
            }
        };

        let categorized = Category::detect(&msg.short_description).is_some();
        let category_field = |field| categorized.then(|| or_na(msg.field(field)));

        Self {
            processed_time: processed_time.to_string(),
            ticket_number: ticket_number(&msg.subject)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            short_description: or_na(&msg.short_description),
            subject: or_na(&msg.subject),
            from: or_na(&msg.from),
            message_id: or_na(&msg.message_id),
            requested_by: or_na(msg.field(TicketField::RequestedBy)),
            environment: category_field(TicketField::Environment),
            required_permissions: category_field(TicketField::RequiredPermissions),
            reason_for_application: category_field(TicketField::ReasonForApplication),
            is_china_cloud: categorized,
        }
    }

    /// Calendar day (`YYYY-MM-DD`) the record was processed on.
    pub fn processed_day(&self) -> &str {
        self.processed_time.get(..10).unwrap_or(&self.processed_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::TicketFields;
    use std::path::PathBuf;

    fn message(subject: &str, short_description: &str, fields: TicketFields) -> ParsedMessage {
        ParsedMessage {
            message_id: String::new(),
            from: "ServiceNow <sn@example.com>".into(),
            to: String::new(),
            reply_to: String::new(),
            subject: subject.into(),
            date: String::new(),
            body: String::new(),
            raw_text: String::new(),
            source_path: PathBuf::new(),
            short_description: short_description.into(),
            extra_fields: fields,
        }
    }

    #[test]
    fn test_record_for_plain_request() {
        let msg = message("RITM1602185 | Approval Required", "Laptop refresh", TicketFields::new());
        let rec = SummaryRecord::from_message(&msg, "2025-03-04 09:10:11");
        assert_eq!(rec.ticket_number, "RITM1602185");
        assert_eq!(rec.message_id, NOT_AVAILABLE);
        assert_eq!(rec.requested_by, NOT_AVAILABLE);
        assert!(!rec.is_china_cloud);
        assert!(rec.environment.is_none());
        assert_eq!(rec.processed_day(), "2025-03-04");
    }

    #[test]
    fn test_record_for_category_request() {
        let mut fields = TicketFields::new();
        fields.insert(TicketField::Environment, "PROD".into());
        fields.insert(TicketField::RequestedBy, "Jane Doe".into());
        fields.insert(TicketField::RequiredPermissions, String::new());
        let msg = message(
            "CHG0031 approval",
            "China Cloud Resource Request - ECS",
            fields,
        );
        let rec = SummaryRecord::from_message(&msg, "2025-03-04 09:10:11");
        assert_eq!(rec.ticket_number, "CHG0031");
        assert!(rec.is_china_cloud);
        assert_eq!(rec.environment.as_deref(), Some("PROD"));
        assert_eq!(rec.required_permissions.as_deref(), Some(NOT_AVAILABLE));
        assert_eq!(rec.requested_by, "Jane Doe");
    }
}
