//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MBOXAPPROVE_CONFIG` (environment variable)
//! 2. `~/.config/mboxapprove/config.toml` (Linux/macOS)
//!    `%APPDATA%\mboxapprove\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::parser::mbox::SplitterOptions;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Watched mailbox and relocation of handled messages.
    pub mailbox: MailboxConfig,
    /// Reply identity, default body and pacing.
    pub reply: ReplyConfig,
    /// Field extraction knobs.
    pub extraction: ExtractionConfig,
    /// Which sender backend delivers replies.
    pub sender: SenderConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override directory for dedup state, summary journal and logs.
    pub state_dir: Option<PathBuf>,
    /// When false, approval requests are detected and logged but never answered.
    pub auto_approve_enabled: bool,
}

/// Watched mailbox settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxConfig {
    /// Mailbox file to process when `run` is given no explicit path.
    pub path: Option<PathBuf>,
    /// Move handled messages into `processed_mailbox`.
    pub move_processed: bool,
    /// Destination mailbox file for handled messages.
    pub processed_mailbox: Option<PathBuf>,
    /// Line prefixes of client status pseudo-headers dropped before the real headers.
    pub vendor_markers: Vec<String>,
}

/// Reply settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyConfig {
    /// Display name used in drafted replies.
    pub from_name: String,
    /// Address used in drafted replies.
    pub from_email: String,
    /// Reply body used when the request carries no `MSG<digits>` reference.
    pub default_message: String,
    /// Pause between two consecutive outbound replies, in seconds.
    pub delay_secs: u64,
    /// Pause after a failed send, in seconds.
    pub failure_backoff_secs: u64,
}

/// Field extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Captured short descriptions starting with this token are rejected.
    pub sentinel_token: String,
    /// Required answer to "What System do you need access to?" for
    /// CN-Server & DB Access Control tickets.
    pub gate_answer: String,
}

/// Sender backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderKind {
    /// Write `.eml` drafts into `draft_dir`.
    Draft,
    /// Run an external program per reply.
    Command,
}

/// Sender settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Backend: "draft" or "command".
    pub kind: SenderKind,
    /// Where `draft` writes replies (defaults to `<state_dir>/drafts`).
    pub draft_dir: Option<PathBuf>,
    /// Program run by the `command` backend.
    pub command: Option<String>,
    /// Arguments; `{to}`, `{subject}` and `{body}` are substituted.
    pub args: Vec<String>,
    /// Passed to the command as `MBOXAPPROVE_AUTO_SEND=1|0`.
    pub auto_send: bool,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            state_dir: None,
            auto_approve_enabled: true,
        }
    }
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            path: None,
            move_processed: false,
            processed_mailbox: None,
            vendor_markers: SplitterOptions::default().vendor_markers,
        }
    }
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            from_name: String::new(),
            from_email: String::new(),
            default_message: "Ref:MSG00000000".to_string(),
            delay_secs: 15,
            failure_backoff_secs: 5,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            sentinel_token: "字段".to_string(),
            gate_answer: "Bastion".to_string(),
        }
    }
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            kind: SenderKind::Draft,
            draft_dir: None,
            command: None,
            args: Vec::new(),
            auto_send: true,
        }
    }
}

impl ReplyConfig {
    /// Delay between consecutive replies.
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    /// Back-off after a failed send.
    pub fn failure_backoff(&self) -> Duration {
        Duration::from_secs(self.failure_backoff_secs)
    }
}

impl Config {
    /// Splitter options derived from `[mailbox]`.
    pub fn splitter_options(&self) -> SplitterOptions {
        SplitterOptions {
            vendor_markers: self.mailbox.vendor_markers.clone(),
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    match config_file_path() {
        Some(path) if path.exists() => load_config_from(&path),
        _ => Config::default(),
    }
}

/// Load configuration from an explicit file, falling back to defaults on error.
pub fn load_config_from(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(cfg) => {
                tracing::info!(path = %path.display(), "Loaded config");
                cfg
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse config, using defaults"
                );
                Config::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to read config file, using defaults"
            );
            Config::default()
        }
    }
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<PathBuf> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;
    save_config_to(config, &path)?;
    Ok(path)
}

/// Save configuration as pretty TOML to `path`, creating parent directories.
pub fn save_config_to(config: &Config, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MBOXAPPROVE_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mboxapprove").join("config.toml"))
}

/// Directory holding dedup state, the summary journal and logs.
pub fn state_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.state_dir {
        return dir.clone();
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mboxapprove")
}

/// Path of the persisted set of already-answered messages.
pub fn processed_path(config: &Config) -> PathBuf {
    state_dir(config).join("processed_emails.json")
}

/// Path of the processing summary journal.
pub fn summary_path(config: &Config) -> PathBuf {
    state_dir(config).join("processing_summary.json")
}

/// Directory the draft sender writes into.
pub fn draft_dir(config: &Config) -> PathBuf {
    config
        .sender
        .draft_dir
        .clone()
        .unwrap_or_else(|| state_dir(config).join("drafts"))
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    state_dir(config).join("mboxapprove.log")
}
