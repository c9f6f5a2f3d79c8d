//! Reply transmission.
//!
//! Actually delivering a reply is host-specific (driving a desktop mail
//! client, an SMTP relay, …), so the processing pass only sees the [`Sender`]
//! trait. Two backends ship with the crate: [`DraftSender`] writes `.eml`
//! drafts for manual sending, [`CommandSender`] hands the reply to an
//! external program.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use chrono::Local;
use regex::{Captures, Regex};
use tracing::{info, warn};

use crate::config::{self, Config, SenderKind};
use crate::error::{ApproveError, Result};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(to|subject|body)\}").expect("valid placeholder pattern"));

/// Something that can deliver a reply.
pub trait Sender {
    /// Deliver one reply. `Ok(())` means the reply was handed off successfully.
    fn send(&mut self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Writes each reply as an RFC 5322 `.eml` file.
#[derive(Debug, Clone)]
pub struct DraftSender {
    dir: PathBuf,
    from: String,
    written: u64,
}

impl DraftSender {
    /// Drafts go into `dir` with `from` as the `From:` header (may be empty).
    pub fn new(dir: impl Into<PathBuf>, from: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            from: from.into(),
            written: 0,
        }
    }

    /// Directory drafts are written into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn render(&self, to: &str, subject: &str, body: &str, message_id: &str) -> String {
        let mut eml = String::new();
        if !self.from.is_empty() {
            eml.push_str(&format!("From: {}\r\n", self.from));
        }
        eml.push_str(&format!("To: {to}\r\n"));
        eml.push_str(&format!("Subject: {subject}\r\n"));
        eml.push_str(&format!("Date: {}\r\n", Local::now().to_rfc2822()));
        eml.push_str(&format!("Message-ID: <{message_id}>\r\n"));
        eml.push_str("MIME-Version: 1.0\r\n");
        eml.push_str("Content-Type: text/plain; charset=utf-8\r\n");
        eml.push_str("Content-Transfer-Encoding: 8bit\r\n");
        eml.push_str("\r\n");
        eml.push_str(&body.replace("\r\n", "\n").replace('\n', "\r\n"));
        eml.push_str("\r\n");
        eml
    }
}

impl Sender for DraftSender {
    fn send(&mut self, to: &str, subject: &str, body: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| ApproveError::io(&self.dir, e))?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        self.written += 1;
        let path = self
            .dir
            .join(format!("approval_reply_{stamp}_{}.eml", self.written));
        let message_id = format!("{stamp}.{}.{}@mboxapprove", std::process::id(), self.written);

        fs::write(&path, self.render(to, subject, body, &message_id))
            .map_err(|e| ApproveError::io(&path, e))?;
        info!(path = %path.display(), "Saved reply draft");
        Ok(())
    }
}

/// Runs an external program for each reply.
///
/// `{to}`, `{subject}` and `{body}` in the arguments are replaced with the
/// reply's values; `MBOXAPPROVE_AUTO_SEND` is set to `1` or `0`. A zero exit
/// status means success.
#[derive(Debug, Clone)]
pub struct CommandSender {
    program: String,
    args: Vec<String>,
    auto_send: bool,
}

impl CommandSender {
    /// Create a command sender.
    pub fn new(program: impl Into<String>, args: Vec<String>, auto_send: bool) -> Self {
        Self {
            program: program.into(),
            args,
            auto_send,
        }
    }

    /// Substitute placeholders in one pass; substituted values are never rescanned.
    fn expand_args(&self, to: &str, subject: &str, body: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                PLACEHOLDER
                    .replace_all(arg, |caps: &Captures<'_>| match &caps[1] {
                        "to" => to,
                        "subject" => subject,
                        _ => body,
                    })
                    .into_owned()
            })
            .collect()
    }
}

impl Sender for CommandSender {
    fn send(&mut self, to: &str, subject: &str, body: &str) -> Result<()> {
        let output = Command::new(&self.program)
            .args(self.expand_args(to, subject, body))
            .env("MBOXAPPROVE_AUTO_SEND", if self.auto_send { "1" } else { "0" })
            .output()
            .map_err(|e| ApproveError::Send(format!("cannot run '{}': {e}", self.program)))?;

        if output.status.success() {
            info!(program = %self.program, auto_send = self.auto_send, "Reply handed to command");
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(program = %self.program, status = %output.status, stderr = %stderr.trim(), "Send command failed");
            Err(ApproveError::Send(format!(
                "'{}' exited with {}",
                self.program, output.status
            )))
        }
    }
}

/// Build the sender selected by `[sender]`.
pub fn sender_from_config(config: &Config) -> Result<Box<dyn Sender>> {
    match config.sender.kind {
        SenderKind::Draft => {
            let from = match (
                config.reply.from_name.is_empty(),
                config.reply.from_email.is_empty(),
            ) {
                (_, true) => String::new(),
                (true, false) => config.reply.from_email.clone(),
                (false, false) => format!("{} <{}>", config.reply.from_name, config.reply.from_email),
            };
            Ok(Box::new(DraftSender::new(config::draft_dir(config), from)))
        }
        SenderKind::Command => {
            let program = config
                .sender
                .command
                .clone()
                .filter(|c| !c.is_empty())
                .ok_or_else(|| {
                    ApproveError::Config("sender.kind = \"command\" requires sender.command".into())
                })?;
            Ok(Box::new(CommandSender::new(
                program,
                config.sender.args.clone(),
                config.sender.auto_send,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_sender_writes_eml() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sender = DraftSender::new(tmp.path().join("drafts"), "Approver <me@example.com>");
        sender
            .send("sn@example.com", "Re: RITM1 - approve", "Ref:MSG1")
            .unwrap();

        let entries: Vec<_> = fs::read_dir(sender.dir()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let path = entries[0].as_ref().unwrap().path();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("eml"));

        let eml = fs::read_to_string(path).unwrap();
        assert!(eml.contains("From: Approver <me@example.com>\r\n"));
        assert!(eml.contains("To: sn@example.com\r\n"));
        assert!(eml.contains("Subject: Re: RITM1 - approve\r\n"));
        assert!(eml.ends_with("\r\n\r\nRef:MSG1\r\n"));
    }

    #[test]
    fn test_command_args_are_expanded() {
        let sender = CommandSender::new(
            "send-reply",
            vec!["--to={to}".into(), "{subject}".into(), "{body}".into()],
            false,
        );
        assert_eq!(
            sender.expand_args("a@b", "Re: X", "Ref:MSG9"),
            vec!["--to=a@b", "Re: X", "Ref:MSG9"]
        );
    }

    #[test]
    fn test_substituted_values_are_not_expanded_again() {
        let sender = CommandSender::new("send-reply", vec!["{subject} / {to}".into()], true);
        assert_eq!(
            sender.expand_args("x@y", "Re: literal {body} and {to}", "Ref:MSG1"),
            vec!["Re: literal {body} and {to} / x@y"]
        );
    }

    #[test]
    fn test_missing_program_is_send_error() {
        let mut sender = CommandSender::new("/definitely/not/a/program", Vec::new(), true);
        assert!(matches!(
            sender.send("a", "b", "c"),
            Err(ApproveError::Send(_))
        ));
    }

    #[test]
    fn test_command_kind_requires_program() {
        let mut cfg = Config::default();
        cfg.sender.kind = SenderKind::Command;
        assert!(matches!(
            sender_from_config(&cfg),
            Err(ApproveError::Config(_))
        ));
    }
}
