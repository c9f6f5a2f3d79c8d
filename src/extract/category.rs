//! Ticket categories and their field rule sets.
//!
//! Three request templates carry structured fields worth recording. Each is
//! described by an ordered list of `(field, rule)` pairs; CN-Server & DB
//! Access Control is additionally gated on the system being requested.

use std::fmt;
use std::sync::LazyLock;

use tracing::{info, warn};

use crate::model::message::{TicketField, TicketFields};

use super::rules::{BlockRule, FieldRule, FirstMatch, LineRule, Tier};

/// Maximum characters of body echoed to the log when nothing was found.
const DEBUG_SNIPPET_CHARS: usize = 500;

/// A recognized ServiceNow request template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    ChinaCloudPermission,
    ChinaCloudResource,
    CnServerDbAccess,
}

impl Category {
    /// Lower-case short-description prefix identifying the category.
    pub fn prefix(self) -> &'static str {
        match self {
            Category::ChinaCloudPermission => "china cloud account and permission request",
            Category::ChinaCloudResource => "china cloud resource request",
            Category::CnServerDbAccess => "cn-server & db access control",
        }
    }

    /// Category of a ticket from its short description, if recognized.
    pub fn detect(short_description: &str) -> Option<Self> {
        let lower = short_description.to_lowercase();
        [
            Category::ChinaCloudPermission,
            Category::ChinaCloudResource,
            Category::CnServerDbAccess,
        ]
        .into_iter()
        .find(|c| lower.starts_with(c.prefix()))
    }

    fn rules(self) -> &'static CategoryRules {
        match self {
            Category::ChinaCloudPermission => &CHINA_CLOUD_PERMISSION,
            Category::ChinaCloudResource => &CHINA_CLOUD_RESOURCE,
            Category::CnServerDbAccess => &CN_SERVER_DB_ACCESS,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::ChinaCloudPermission => "China Cloud Account and Permission Request",
            Category::ChinaCloudResource => "China Cloud Resource Request",
            Category::CnServerDbAccess => "CN-Server & DB Access Control",
        })
    }
}

/// One field of a category: where it goes, how it is labelled in logs, how it is found.
struct FieldSpec {
    field: TicketField,
    label: &'static str,
    rule: FieldRule,
}

/// Rule set for a category.
struct CategoryRules {
    /// Question whose single-line answer must equal the configured gate answer.
    gate: Option<LineRule>,
    fields: Vec<FieldSpec>,
}

// ── Shared label lists ──────────────────────────────────────────

const REQUESTED_BY: [&str; 4] = [
    r"Requested\s+by",
    r"Requested\s+for",
    r"Request\s+by",
    r"Request\s+for",
];

const REASON: [&str; 4] = [
    r"Reason\s+for\s+application",
    r"Application\s+reason",
    r"Reason",
    r"Justification",
];

const SERVER_ENVIRONMENT: [&str; 3] = ["Environment", "Env", r"Environment\s*"];

fn requested_by() -> FieldSpec {
    FieldSpec {
        field: TicketField::RequestedBy,
        label: "Requested by",
        rule: FieldRule::Line(FirstMatch::labelled(&REQUESTED_BY)),
    }
}

fn environment(labels: &[&str]) -> FieldSpec {
    FieldSpec {
        field: TicketField::Environment,
        label: "Environment",
        rule: FieldRule::Line(FirstMatch::labelled(labels)),
    }
}

fn single_line_reason() -> FieldSpec {
    FieldSpec {
        field: TicketField::ReasonForApplication,
        label: "Reason for application",
        rule: FieldRule::Line(FirstMatch::labelled(&REASON)),
    }
}

static CHINA_CLOUD_PERMISSION: LazyLock<CategoryRules> = LazyLock::new(|| CategoryRules {
    gate: None,
    fields: vec![
        requested_by(),
        environment(&[
            r"Permission\s+regards\s+to\s+environm?e?nt",
            "Environment",
            r"Regards\s+to\s+environm?e?nt",
        ]),
        FieldSpec {
            field: TicketField::RequiredPermissions,
            label: "Required permissions",
            rule: FieldRule::Block(BlockRule::new(
                &[r"Required\s+permissions"],
                &[
                    "Environment",
                    r"Reason\s+for\s+application",
                    "Justification",
                    "Notes",
                    "Comments",
                    r"Additional\s+information",
                    r"Permission\s+regards\s+to\s+environment",
                ],
                &[
                    r"Required\s+permissions",
                    r"Permissions\s+required",
                    "Permission",
                    r"Required\s+permission",
                ],
            )),
        },
        single_line_reason(),
    ],
});

static CHINA_CLOUD_RESOURCE: LazyLock<CategoryRules> = LazyLock::new(|| CategoryRules {
    gate: None,
    fields: vec![
        requested_by(),
        environment(&SERVER_ENVIRONMENT),
        FieldSpec {
            field: TicketField::RequiredPermissions,
            label: "Resource Info",
            rule: FieldRule::Block(BlockRule::new(
                &[r"Resource\s+Info"],
                &[
                    "Environment",
                    r"Reason\s+for\s+application",
                    "Justification",
                    "Notes",
                    "Comments",
                    r"Additional\s+information",
                ],
                &[
                    r"Resource\s+Info",
                    r"Resource\s+Information",
                    "Resource",
                    "Resources",
                ],
            )),
        },
        single_line_reason(),
    ],
});

static CN_SERVER_DB_ACCESS: LazyLock<CategoryRules> = LazyLock::new(|| CategoryRules {
    gate: Some(LineRule::labelled(
        r"What\s+System\s+do\s+you\s+need\s+access\s+to\?",
    )),
    fields: vec![
        requested_by(),
        environment(&SERVER_ENVIRONMENT),
        FieldSpec {
            field: TicketField::RequiredPermissions,
            label: "Authorization time",
            rule: FieldRule::Block(BlockRule::new(
                &[r"Authorization\s+time"],
                &[
                    "Environment",
                    r"Reason\s+for\s+application",
                    r"What\s+System",
                    "Justification",
                    "Notes",
                    "Comments",
                ],
                &[r"Authorization\s+time", r"Auth\s+time", "Authorization"],
            )),
        },
        FieldSpec {
            field: TicketField::ReasonForApplication,
            label: "Reason for application",
            rule: FieldRule::Block(BlockRule::new(
                &[
                    r"Reason\s+for\s+application\s*\(including\s+reason\s+for\s+Authorization\s+time\)",
                    r"Reason\s+for\s+application",
                ],
                &[
                    "Environment",
                    r"Authorization\s+time",
                    r"What\s+System",
                    "Justification",
                    "Notes",
                    "Comments",
                ],
                &REASON,
            )),
        },
    ],
});

/// Extracts category-specific ticket fields from message bodies.
#[derive(Debug, Clone)]
pub struct CategoryExtractor {
    gate_answer: String,
}

impl CategoryExtractor {
    /// `gate_answer` is the system name CN-Server & DB Access Control
    /// requests must ask for (compared case-insensitively).
    pub fn new(gate_answer: impl Into<String>) -> Self {
        Self {
            gate_answer: gate_answer.into(),
        }
    }

    /// Extract every field of `category` from `body`.
    ///
    /// Always returns all four fields; missing ones are empty strings.
    pub fn extract(&self, category: Category, body: &str) -> TicketFields {
        let rules = category.rules();
        let mut fields: TicketFields = TicketField::ALL
            .iter()
            .map(|&f| (f, String::new()))
            .collect();

        if let Some(gate) = &rules.gate {
            if !self.gate_passes(gate, body) {
                return fields;
            }
        }

        info!(%category, "Extracting ticket fields");

        for spec in &rules.fields {
            match spec.rule.extract(body) {
                Some((value, tier)) => {
                    let multi_line = tier == Tier::Block;
                    info!(
                        field = %spec.field,
                        multi_line,
                        value = %value,
                        "Extracted {}",
                        spec.label
                    );
                    fields.insert(spec.field, value);
                }
                None => warn!(field = %spec.field, "{} not found", spec.label),
            }
        }

        if fields.values().all(String::is_empty) {
            let snippet: String = body
                .chars()
                .take(DEBUG_SNIPPET_CHARS)
                .collect::<String>()
                .replace('\n', "\\n")
                .replace('\r', "\\r");
            warn!(%category, body = %snippet, "No ticket fields found");
        }

        fields
    }

    fn gate_passes(&self, gate: &LineRule, body: &str) -> bool {
        match gate.capture(body) {
            Some(answer) if answer.eq_ignore_ascii_case(&self.gate_answer) => true,
            Some(answer) => {
                info!(
                    answer,
                    expected = %self.gate_answer,
                    "Requested system does not match, skipping field extraction"
                );
                false
            }
            None => {
                info!("Requested system question not found, skipping field extraction");
                false
            }
        }
    }
}
