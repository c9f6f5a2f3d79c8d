//! One processing pass over a mailbox.
//!
//! For every message that needs approval and has not been answered yet the
//! pass derives the reply, hands it to the [`Sender`], and on success records
//! the dedup key (persisted immediately), appends a summary record and
//! optionally moves the message out of the mailbox.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, error, info, warn};

use crate::config::{self, Config};
use crate::error::Result;
use crate::extract::classify::is_approval_needed;
use crate::model::message::ParsedMessage;
use crate::model::summary::SummaryRecord;
use crate::parser::message::MessageDecoder;
use crate::reply::ReplyDraft;
use crate::sender::Sender;
use crate::state::ProcessedSet;
use crate::store::relocate;
use crate::summary::journal;

/// Counters and records of one pass.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Messages found in the mailbox.
    pub total: usize,
    /// Messages that need an approval reply.
    pub approval_needed: usize,
    /// Approval requests skipped because they were already answered.
    pub already_processed: usize,
    /// Approval requests left alone because auto-approve is off.
    pub held: usize,
    /// Replies the sender failed to deliver.
    pub failed: usize,
    /// Summary records of the replies sent in this pass.
    pub records: Vec<SummaryRecord>,
}

impl BatchReport {
    /// Number of replies sent.
    pub fn sent(&self) -> usize {
        self.records.len()
    }
}

/// Runs processing passes with a fixed configuration and sender.
pub struct Processor<'a> {
    config: &'a Config,
    decoder: MessageDecoder,
    sender: &'a mut dyn Sender,
    state_path: PathBuf,
    journal_path: PathBuf,
}

impl<'a> Processor<'a> {
    /// Processor using the state and journal paths derived from `config`.
    pub fn new(config: &'a Config, sender: &'a mut dyn Sender) -> Self {
        Self {
            config,
            decoder: MessageDecoder::from_config(config),
            sender,
            state_path: config::processed_path(config),
            journal_path: config::summary_path(config),
        }
    }

    /// Process `mailbox` once.
    ///
    /// An unreadable mailbox yields an empty report. Failing to persist the
    /// dedup state aborts the pass, since continuing could answer the same
    /// request twice on the next run.
    pub fn process_mailbox(&mut self, mailbox: &Path) -> Result<BatchReport> {
        info!(mailbox = %mailbox.display(), "Processing mailbox");
        let messages = self.decoder.read_messages(mailbox);
        let mut report = BatchReport {
            total: messages.len(),
            ..BatchReport::default()
        };
        if messages.is_empty() {
            info!("No messages in mailbox");
            return Ok(report);
        }

        let mut processed = ProcessedSet::load_or_default(&self.state_path);

        for message in &messages {
            if !is_approval_needed(&message.subject) {
                debug!(subject = %message.subject, "Not an approval request");
                continue;
            }
            report.approval_needed += 1;

            let key = message.dedup_key();
            if processed.contains(&key) {
                debug!(key = %key, "Already answered");
                report.already_processed += 1;
                continue;
            }

            if !self.config.general.auto_approve_enabled {
                info!(subject = %message.subject, "Auto-approve disabled, leaving request unanswered");
                report.held += 1;
                continue;
            }

            if report.sent() > 0 {
                let delay = self.config.reply.delay();
                if !delay.is_zero() {
                    info!(secs = delay.as_secs(), "Waiting before next reply");
                    std::thread::sleep(delay);
                }
            }

            if self.answer(message, mailbox, &mut processed, &mut report)? {
                continue;
            }

            report.failed += 1;
            let backoff = self.config.reply.failure_backoff();
            if !backoff.is_zero() {
                std::thread::sleep(backoff);
            }
        }

        info!(
            total = report.total,
            sent = report.sent(),
            skipped = report.already_processed,
            failed = report.failed,
            "Mailbox pass complete"
        );
        Ok(report)
    }

    /// Send the reply for one message. Returns false if sending failed.
    fn answer(
        &mut self,
        message: &ParsedMessage,
        mailbox: &Path,
        processed: &mut ProcessedSet,
        report: &mut BatchReport,
    ) -> Result<bool> {
        info!(subject = %message.subject, from = %message.from, "Answering approval request");
        if message.short_description.is_empty() {
            warn!(subject = %message.subject, "No short description found");
        } else {
            info!(short_description = %message.short_description, "Short description");
        }

        let draft = ReplyDraft::for_message(message, &self.config.reply.default_message);
        if let Err(e) = self.sender.send(&draft.to, &draft.subject, &draft.body) {
            error!(subject = %message.subject, error = %e, "Failed to send reply");
            return Ok(false);
        }

        processed.insert_and_persist(message.dedup_key(), &self.state_path)?;

        let processed_time = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let record = SummaryRecord::from_message(message, &processed_time);
        if let Err(e) = journal::append(&self.journal_path, record.clone()) {
            warn!(error = %e, "Could not record processing summary");
        }
        info!(ticket = %record.ticket_number, n = report.sent() + 1, "Reply sent");
        report.records.push(record);

        self.relocate(message, mailbox);
        Ok(true)
    }

    fn relocate(&self, message: &ParsedMessage, mailbox: &Path) {
        if !self.config.mailbox.move_processed {
            return;
        }
        let Some(target) = self.config.mailbox.processed_mailbox.as_deref() else {
            warn!("move_processed is set but processed_mailbox is not");
            return;
        };
        if let Err(e) = relocate::move_message(&self.decoder, message, mailbox, target) {
            warn!(error = %e, "Reply sent, but moving the message failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApproveError;

    #[derive(Default)]
    struct Recorder {
        sent: Vec<(String, String, String)>,
        fail: bool,
    }

    impl Sender for Recorder {
        fn send(&mut self, to: &str, subject: &str, body: &str) -> Result<()> {
            if self.fail {
                return Err(ApproveError::Send("offline".into()));
            }
            self.sent.push((to.into(), subject.into(), body.into()));
            Ok(())
        }
    }

    const MAILBOX: &str = "From - Mon Jan 01 2024 10:00:00\nMessage-ID: <1@sn>\nFrom: sn@example.com\nSubject: RITM100 | Approval Required\n\nShort description: Laptop refresh\nRef:MSG555\n\nFrom - Mon Jan 01 2024 10:01:00\nFrom: friend@example.com\nSubject: Lunch?\n\nnoon\n";

    fn setup() -> (tempfile::TempDir, Config, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.general.state_dir = Some(tmp.path().join("state"));
        cfg.reply.delay_secs = 0;
        cfg.reply.failure_backoff_secs = 0;
        let mailbox = tmp.path().join("NeedApprove");
        std::fs::write(&mailbox, MAILBOX).unwrap();
        (tmp, cfg, mailbox)
    }

    #[test]
    fn test_answers_once() {
        let (_tmp, cfg, mailbox) = setup();
        let mut sender = Recorder::default();

        let report = Processor::new(&cfg, &mut sender)
            .process_mailbox(&mailbox)
            .unwrap();
        assert_eq!(report.total, 2);
        assert_eq!(report.approval_needed, 1);
        assert_eq!(report.sent(), 1);
        assert_eq!(report.records[0].ticket_number, "RITM100");

        let again = Processor::new(&cfg, &mut sender)
            .process_mailbox(&mailbox)
            .unwrap();
        assert_eq!(again.sent(), 0);
        assert_eq!(again.already_processed, 1);

        assert_eq!(
            sender.sent,
            vec![(
                "sn@example.com".to_string(),
                "Re: RITM100 - approve".to_string(),
                "Ref:MSG555".to_string()
            )]
        );
        assert_eq!(journal::load(&config::summary_path(&cfg)).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_send_is_not_recorded() {
        let (_tmp, cfg, mailbox) = setup();
        let mut sender = Recorder {
            fail: true,
            ..Recorder::default()
        };

        let report = Processor::new(&cfg, &mut sender)
            .process_mailbox(&mailbox)
            .unwrap();
        assert_eq!(report.failed, 1);
        assert!(ProcessedSet::load(&config::processed_path(&cfg))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_auto_approve_disabled() {
        let (_tmp, mut cfg, mailbox) = setup();
        cfg.general.auto_approve_enabled = false;
        let mut sender = Recorder::default();

        let report = Processor::new(&cfg, &mut sender)
            .process_mailbox(&mailbox)
            .unwrap();
        assert_eq!(report.held, 1);
        assert!(sender.sent.is_empty());
    }

    #[test]
    fn test_moves_answered_message() {
        let (tmp, mut cfg, mailbox) = setup();
        let target = tmp.path().join("Processed");
        cfg.mailbox.move_processed = true;
        cfg.mailbox.processed_mailbox = Some(target.clone());
        let mut sender = Recorder::default();

        Processor::new(&cfg, &mut sender)
            .process_mailbox(&mailbox)
            .unwrap();

        let decoder = MessageDecoder::default();
        let left = decoder.parse_mailbox_file(&mailbox).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].subject, "Lunch?");
        assert_eq!(decoder.parse_mailbox_file(&target).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_mailbox_is_empty_pass() {
        let (tmp, cfg, _mailbox) = setup();
        let mut sender = Recorder::default();
        let report = Processor::new(&cfg, &mut sender)
            .process_mailbox(&tmp.path().join("absent"))
            .unwrap();
        assert_eq!(report.total, 0);
    }
}
