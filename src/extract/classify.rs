//! Approval classification from the subject line.

/// Subject keywords (lower-case) that mark a message as needing an approval reply.
pub const APPROVAL_KEYWORDS: [&str; 4] = ["approve", "approval", "ritm", "servicenow"];

/// Whether a message with this subject needs an approval reply.
///
/// Pure function of the lower-cased subject; the body is never inspected.
pub fn is_approval_needed(subject: &str) -> bool {
    let subject = subject.to_lowercase();
    APPROVAL_KEYWORDS.iter().any(|kw| subject.contains(kw))
}
