use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lexmetric_core::{FlagId, FlagStatus, Money, SessionId};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

mod commands;
mod demo;
mod settings;

use commands::App;
use settings::Settings;

#[derive(Parser)]
#[command(
    name = "lexmetric",
    version,
    about = "Lookback audit of bank statements for transfers that can cost benefits eligibility."
)]
struct Cli {
    /// Directory holding the audit database and settings (default: platform data dir)
    #[arg(long = "data-dir", global = true)]
    data_dir: Option<PathBuf>,
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new audit session and print its id.
    New {
        #[arg(long, default_value = "Unnamed Client")]
        client: String,
    },
    /// Extract statement files into a session and re-run the rules.
    Ingest {
        session: SessionId,
        /// Plain-text statements (form feed between pages), or PDFs with the `pdf` feature
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Re-run the rules over a session and print its flags.
    Analyze { session: SessionId },
    /// Record a decision on one flag.
    Review {
        session: SessionId,
        flag: FlagId,
        /// PENDING, CONFIRMED, IGNORED or SAFE
        status: FlagStatus,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Exposure and penalty period for a session.
    Summary {
        session: SessionId,
        #[arg(long)]
        json: bool,
    },
    /// Write a session with its flags, transactions and summary as JSON.
    Export {
        session: SessionId,
        /// Output file (default: exports/audit-<SESSION>.json in the data dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List audit sessions, most recently updated first.
    List,
    /// Delete a session with all its transactions and flags.
    Delete { session: SessionId },
    /// Run the engine over a built-in forensic demo set.
    Demo,
    /// Show settings, or update the given ones.
    Config {
        /// Digital wallet total per recipient that triggers DIGITAL_ALLOWANCE
        #[arg(long)]
        threshold: Option<Decimal>,
        /// Average monthly private-pay care cost
        #[arg(long)]
        divisor: Option<Decimal>,
        /// Two-letter state code
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        strict: Option<bool>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "lexmetric", "Lexmetric")
        .context("Failed to determine the application data directory")?;
    Ok(dirs.data_dir().to_path_buf())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    match cli.command {
        Commands::Demo => {
            let settings = Settings::load(&data_dir)?;
            let (transactions, flags, summary) = commands::demo(&settings);
            commands::print_flags(&transactions, &flags);
            println!();
            commands::print_summary(&summary);
        }
        Commands::Config {
            threshold,
            divisor,
            state,
            strict,
        } => {
            let mut settings = Settings::load(&data_dir)?;
            let changed =
                threshold.is_some() || divisor.is_some() || state.is_some() || strict.is_some();
            if let Some(t) = threshold {
                settings.engine.digital_allowance_threshold = Money::from_decimal(t);
            }
            if let Some(d) = divisor {
                settings.divisor = Money::from_decimal(d);
            }
            if let Some(s) = state {
                settings.default_state = s.trim().to_uppercase();
            }
            if let Some(s) = strict {
                settings.strict_mode = s;
            }
            if changed {
                settings.save(&data_dir)?;
                tracing::info!(path = %Settings::path(&data_dir).display(), "Settings saved");
            }
            print!("{}", toml::to_string_pretty(&settings)?);
        }
        Commands::New { client } => {
            let app = App::open(&data_dir).await?;
            let session = app.new_session(&client).await?;
            println!("{}", session.id);
        }
        Commands::Ingest { session, files } => {
            let app = App::open(&data_dir).await?;
            let report = app.ingest(session, &files).await?;
            commands::print_ingest(&report);
        }
        Commands::Analyze { session } => {
            let app = App::open(&data_dir).await?;
            let session = app.analyze(session).await?;
            commands::print_flags(&session.transactions, &session.flags);
        }
        Commands::Review {
            session,
            flag,
            status,
            notes,
        } => {
            let app = App::open(&data_dir).await?;
            let flag = app.review(session, flag, status, notes).await?;
            println!("{} {} -> {}", flag.id, flag.rule_id, flag.status);
        }
        Commands::Summary { session, json } => {
            let app = App::open(&data_dir).await?;
            let (session, summary) = app.summary(session).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{} ({})", session.client_name, session.status);
                commands::print_summary(&summary);
            }
        }
        Commands::Export { session, out } => {
            let app = App::open(&data_dir).await?;
            let path = app.export(session, out).await?;
            println!("Wrote {}", path.display());
        }
        Commands::List => {
            let app = App::open(&data_dir).await?;
            commands::print_sessions(&app.list().await?);
        }
        Commands::Delete { session } => {
            let app = App::open(&data_dir).await?;
            if !app.delete(session).await? {
                anyhow::bail!("No audit session with id {session}");
            }
            println!("Deleted {session}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_review() {
        let session = SessionId::new().to_string();
        let flag = FlagId::new().to_string();
        let cli = Cli::try_parse_from([
            "lexmetric",
            "review",
            session.as_str(),
            flag.as_str(),
            "safe",
            "--notes",
            "Receipt on file",
        ])
        .unwrap();
        match cli.command {
            Commands::Review { status, notes, .. } => {
                assert_eq!(status, FlagStatus::Safe);
                assert_eq!(notes.as_deref(), Some("Receipt on file"));
            }
            _ => panic!("expected review"),
        }
    }

    #[test]
    fn cli_rejects_bad_session_id() {
        assert!(Cli::try_parse_from(["lexmetric", "analyze", "not-a-uuid"]).is_err());
    }

    #[test]
    fn ingest_requires_files() {
        let session = SessionId::new().to_string();
        assert!(Cli::try_parse_from(["lexmetric", "ingest", session.as_str()]).is_err());
    }

    #[test]
    fn cli_parses_export_with_out() {
        let session = SessionId::new().to_string();
        let cli =
            Cli::try_parse_from(["lexmetric", "export", session.as_str(), "--out", "a.json"]).unwrap();
        match cli.command {
            Commands::Export { out, .. } => assert_eq!(out, Some(PathBuf::from("a.json"))),
            _ => panic!("expected export"),
        }
    }

    #[test]
    fn cli_verify() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
