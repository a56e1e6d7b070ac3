//! CLI entry point for `postsink`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};

use postsink::ingest::{self, IngestOptions};
use postsink::relay::SmtpRelay;
use postsink::store::SpoolStore;
use postsink::{config, smtp};

#[derive(Parser)]
#[command(name = "postsink", version, about = "SMTP sink and relay for mail testing")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the inbound SMTP receiver and spool every message it accepts
    Serve {
        /// Listen address (overrides config)
        #[arg(short, long)]
        listen: Option<String>,
        /// Spool directory (overrides config)
        #[arg(long)]
        spool: Option<PathBuf>,
        /// Maximum accepted message size in bytes (overrides config)
        #[arg(long)]
        max_message_size: Option<u64>,
    },
    /// Replay files or folders of captured emails against an SMTP server
    ///
    /// Each email must be a separate file (Maildir format, not mbox).
    Ingest {
        /// Files or folders to scan
        #[arg(value_name = "FILE|FOLDER", required = true)]
        paths: Vec<PathBuf>,
        /// Target SMTP server address
        #[arg(short = 'S', long)]
        smtp_addr: Option<String>,
        /// Only ingest messages modified within the last N days
        #[arg(short, long, value_name = "DAYS")]
        recent: Option<u64>,
        /// Default envelope sender when a message has no From header
        #[arg(short, long)]
        from: Option<String>,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Serve {
            listen,
            spool,
            max_message_size,
        } => cmd_serve(config, listen, spool, max_message_size),
        Commands::Ingest {
            paths,
            smtp_addr,
            recent,
            from,
            json,
        } => cmd_ingest(&config, paths, smtp_addr, recent, from, json),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &config::Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "postsink.log");
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

/// Run the inbound receiver until interrupted.
fn cmd_serve(
    mut config: config::Config,
    listen: Option<String>,
    spool: Option<PathBuf>,
    max_message_size: Option<u64>,
) -> anyhow::Result<()> {
    if let Some(listen) = listen {
        config.smtp.listen = listen;
    }
    if spool.is_some() {
        config.storage.dir = spool;
    }
    if let Some(max) = max_message_size {
        config.storage.max_message_size = max;
    }

    let spool_dir = config::spool_dir(&config);
    let store = SpoolStore::open(&spool_dir, config.storage.max_message_size)
        .map_err(|e| anyhow::anyhow!("cannot open spool at {}: {e}", spool_dir.display()))?;

    smtp::serve(&config, Arc::new(store))
}

/// Replay captured emails against a test SMTP server.
fn cmd_ingest(
    config: &config::Config,
    paths: Vec<PathBuf>,
    smtp_addr: Option<String>,
    recent: Option<u64>,
    from: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    for path in &paths {
        if !path.exists() {
            anyhow::bail!("no such file or folder: {}", path.display());
        }
    }

    let mut options = IngestOptions {
        roots: paths,
        recent_days: recent,
        smtp_addr: smtp_addr.unwrap_or_else(|| config.smtp.ingest_target.clone()),
        from_addr: from,
    };

    let relay = SmtpRelay::new(&options.smtp_addr);
    let start = Instant::now();
    let summary = ingest::run(&mut options, &relay);
    let elapsed = start.elapsed();

    if json {
        let out = serde_json::json!({
            "processed": summary.processed,
            "relay_errors": summary.relay_errors,
            "skipped": summary.skipped,
            "batches": summary.batches,
            "elapsed_ms": elapsed.as_millis() as u64,
            "smtp_addr": options.smtp_addr,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!();
        println!("  {:<20} {}", "Processed", summary.processed);
        println!("  {:<20} {}", "Relay errors", summary.relay_errors);
        println!("  {:<20} {}", "Skipped", summary.skipped);
        println!("  {:<20} {:.2?}", "Elapsed", elapsed);
        println!();
    }

    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "postsink", &mut std::io::stdout());
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
