//! CLI entry point for `mboxapprove`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};

use mboxapprove::config::{self, Config};
use mboxapprove::extract::classify::is_approval_needed;
use mboxapprove::model::message::{ParsedMessage, TicketField};
use mboxapprove::model::summary::SummaryRecord;
use mboxapprove::parser::message::MessageDecoder;
use mboxapprove::processor::Processor;
use mboxapprove::reply::ReplyDraft;
use mboxapprove::sender::sender_from_config;
use mboxapprove::summary::{self, csv as summary_csv, journal, report};

#[derive(Parser)]
#[command(
    name = "mboxapprove",
    version,
    about = "Answer ServiceNow approval requests from a Thunderbird mailbox"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (overrides $MBOXAPPROVE_CONFIG)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a mailbox once and answer pending approval requests
    Run {
        /// Mailbox file (defaults to mailbox.path from the config)
        #[arg(short, long)]
        mailbox: Option<PathBuf>,
    },
    /// Show how every message in a mailbox is parsed, without sending anything
    Inspect {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print or export the processing summary
    Summary {
        /// Only records processed on this day (YYYY-MM-DD)
        #[arg(long, conflicts_with = "today")]
        date: Option<String>,
        /// Only records processed today
        #[arg(long)]
        today: bool,
        /// Also write the summary to this file
        #[arg(short, long, value_name = "FILE")]
        export: Option<PathBuf>,
        #[arg(short, long, value_enum, default_value = "txt")]
        format: ExportFormat,
    },
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Txt,
    Csv,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    };

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Run { mailbox } => cmd_run(mailbox, &config),
        Commands::Inspect { path, json } => cmd_inspect(&path, json, &config),
        Commands::Summary {
            date,
            today,
            export,
            format,
        } => cmd_summary(date, today, export.as_deref(), format, &config),
        Commands::Init { force } => cmd_init(cli.config.as_deref(), force),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_path = config::log_file_path(config);
    let log_dir = log_path.parent().unwrap_or(Path::new("."));
    let log_name = log_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "mboxapprove.log".into());
    if std::fs::create_dir_all(log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(log_dir, log_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Write the default configuration to `--config`, or the standard location.
fn cmd_init(path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let target = match path {
        Some(p) => p.to_path_buf(),
        None => config::config_file_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?,
    };
    if target.exists() && !force {
        anyhow::bail!(
            "Config already exists: {} (use --force to overwrite)",
            target.display()
        );
    }

    let defaults = Config::default();
    if path.is_some() {
        config::save_config_to(&defaults, &target)?;
    } else {
        config::save_config(&defaults)?;
    }
    println!("  Wrote {}", target.display());
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mboxapprove", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Run one processing pass and print the batch summary.
fn cmd_run(mailbox: Option<PathBuf>, config: &Config) -> anyhow::Result<()> {
    let Some(mailbox) = mailbox.or_else(|| config.mailbox.path.clone()) else {
        anyhow::bail!("No mailbox given: pass --mailbox or set mailbox.path in the config");
    };
    if !mailbox.exists() {
        anyhow::bail!("Mailbox not found: {}", mailbox.display());
    }

    let mut sender = sender_from_config(config)?;
    let start = Instant::now();
    let batch = Processor::new(config, sender.as_mut()).process_mailbox(&mailbox)?;

    println!();
    println!("  Mailbox:            {}", mailbox.display());
    println!("  Messages:           {}", batch.total);
    println!("  Approval requests:  {}", batch.approval_needed);
    println!("  Already answered:   {}", batch.already_processed);
    if batch.held > 0 {
        println!("  Held (auto-approve off): {}", batch.held);
    }
    println!("  Replies sent:       {}", batch.sent());
    if batch.failed > 0 {
        println!("  Failed:             {}", batch.failed);
    }
    println!("  Time:               {:.2}s", start.elapsed().as_secs_f64());

    if !batch.records.is_empty() {
        let records: Vec<&SummaryRecord> = batch.records.iter().collect();
        println!();
        print!("{}", report::render_report("Batch summary", &records, &now()));
    }
    Ok(())
}

/// Print every parsed message with its classification and derived reply.
fn cmd_inspect(path: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    let decoder = MessageDecoder::from_config(config);
    let messages = decoder.parse_mailbox_file(path)?;
    let default_body = &config.reply.default_message;

    if json {
        let items: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| inspect_json(m, default_body))
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    use humansize::{format_size, BINARY};
    let file_size = std::fs::metadata(path)?.len();
    println!();
    println!("  File:     {}", path.display());
    println!("  Size:     {}", format_size(file_size, BINARY));
    println!("  Messages: {}", messages.len());

    for (i, msg) in messages.iter().enumerate() {
        let approval = is_approval_needed(&msg.subject);
        println!();
        println!("  [{}] {}", i + 1, msg.subject);
        println!("      From:        {}", msg.from);
        println!("      Message-ID:  {}", msg.message_id);
        println!("      Approval:    {}", if approval { "yes" } else { "no" });
        println!("      Short desc:  {}", msg.short_description);
        for field in TicketField::ALL {
            if let Some(value) = msg.extra_fields.get(&field) {
                println!("      {:<22} {}", format!("{field}:"), value);
            }
        }
        if approval {
            let draft = ReplyDraft::for_message(msg, default_body);
            println!("      Reply:       {} | {} | {}", draft.to, draft.subject, draft.body);
        }
    }
    Ok(())
}

fn inspect_json(msg: &ParsedMessage, default_body: &str) -> serde_json::Value {
    let approval = is_approval_needed(&msg.subject);
    let reply = approval.then(|| {
        let draft = ReplyDraft::for_message(msg, default_body);
        serde_json::json!({
            "to": draft.to,
            "subject": draft.subject,
            "body": draft.body,
        })
    });
    serde_json::json!({
        "message_id": msg.message_id,
        "from": msg.from,
        "subject": msg.subject,
        "date": msg.date,
        "approval_needed": approval,
        "short_description": msg.short_description,
        "extra_fields": msg.extra_fields,
        "reply": reply,
    })
}

/// Print the processing summary, optionally exporting it.
fn cmd_summary(
    date: Option<String>,
    today: bool,
    export: Option<&Path>,
    format: ExportFormat,
    config: &Config,
) -> anyhow::Result<()> {
    let records = journal::load(&config::summary_path(config))?;

    let day = if today {
        Some(chrono::Local::now().format("%Y-%m-%d").to_string())
    } else {
        date
    };
    let (title, selected): (String, Vec<&SummaryRecord>) = match &day {
        Some(day) => (
            format!("Processing summary for {day}"),
            summary::records_for_day(&records, day),
        ),
        None => ("Processing summary".to_string(), records.iter().collect()),
    };

    if selected.is_empty() {
        println!("  No processing records");
        return Ok(());
    }

    print!("{}", report::render_report(&title, &selected, &now()));

    if let Some(output) = export {
        match format {
            ExportFormat::Txt => report::export_text(&selected, &title, output)?,
            ExportFormat::Csv => summary_csv::export_csv(&selected, output)?,
        }
        println!("  Exported {} record(s) to {}", selected.len(), output.display());
    }
    Ok(())
}

fn now() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
