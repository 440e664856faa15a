//! SandGrains CLI - life expectancy calculator.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sandgrains_baseline::{BaselineSource, StaticBaseline, WorldBankClient};
use sandgrains_core::{CountryCode, Exercise, FormInput, Lifestyle, Smoking};
use sandgrains_reconcile::{
    establish_session, Calculator, Credentials, PurgeScope, Session, TrustedAccounts, View,
};
use sandgrains_storage::{JsonStorage, RestStorage, SqliteStorage, Storage};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, StorageKind};

#[derive(Parser)]
#[command(name = "sandgrains")]
#[command(about = "Estimate your remaining lifetime from your habits and country", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Authenticated email (defaults to SANDGRAINS_EMAIL)
    #[arg(long, global = true)]
    email: Option<String>,

    /// Storage backend: json, sqlite or rest (defaults to SANDGRAINS_STORAGE)
    #[arg(long, global = true)]
    storage: Option<StorageKind>,

    /// Data directory for json/sqlite storage
    #[arg(long, global = true)]
    data_dir: Option<std::path::PathBuf>,

    /// Skip the baseline lookup and use the default expectancy
    #[arg(long, global = true)]
    offline: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate and save your estimate
    Calc {
        /// Current age
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=120))]
        age: u8,
        /// Country code, e.g. US, TR, DE
        #[arg(long, default_value = "US")]
        country: CountryCode,
        /// never, former or current
        #[arg(long)]
        smoking: Smoking,
        /// regular, occasional or none
        #[arg(long)]
        exercise: Exercise,
        /// Show the estimate without saving
        #[arg(long)]
        dry_run: bool,
        /// Do not add the calculation to history
        #[arg(long)]
        no_history: bool,
    },
    /// Show your last saved record
    Show,
    /// List past calculations
    History {
        /// Maximum entries
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Delete your calculation history
    Purge {
        /// Also delete the saved record
        #[arg(long)]
        all: bool,
    },
    /// Look up the baseline expectancy for a country
    Lookup {
        /// Country code, e.g. US, TR, DE
        country: CountryCode,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Logs go to stderr so stdout carries only command output.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = AppConfig::from_env().context("Invalid configuration")?;
    if let Some(storage) = cli.storage {
        config.storage = storage;
    }
    if let Some(dir) = cli.data_dir.clone() {
        config.data_dir = dir;
    }
    if cli.offline {
        config.offline = true;
    }
    if let Some(email) = cli.email.clone() {
        config.email = Some(email);
    }
    debug!("Configuration: {:?}", config);

    let baseline: Box<dyn BaselineSource> = if config.offline {
        Box::new(StaticBaseline(None))
    } else {
        Box::new(WorldBankClient::new(config.baseline_url.clone(), config.http_timeout))
    };

    match config.storage {
        StorageKind::Json => {
            let storage = JsonStorage::new(&config.data_dir)
                .await
                .with_context(|| format!("Failed to open {}", config.data_dir.display()))?;
            run(cli.command, &config, storage, baseline).await
        }
        StorageKind::Sqlite => {
            std::fs::create_dir_all(&config.data_dir)
                .with_context(|| format!("Failed to create {}", config.data_dir.display()))?;
            let storage = SqliteStorage::new(&config.sqlite_url())
                .await
                .context("Failed to open SQLite database")?;
            run(cli.command, &config, storage, baseline).await
        }
        StorageKind::Rest => {
            let storage = RestStorage::new(config.rest_config()?).context("Failed to create HTTP client")?;
            run(cli.command, &config, storage, baseline).await
        }
    }
}

async fn run<S: Storage, B: BaselineSource>(
    command: Commands,
    config: &AppConfig,
    storage: S,
    baseline: B,
) -> Result<()> {
    let mut calculator = Calculator::new(storage, baseline);

    match command {
        Commands::Calc {
            age,
            country,
            smoking,
            exercise,
            dry_run,
            no_history,
        } => {
            let session = open_session(config).await?.navigate(View::Calculator);
            let form = FormInput {
                age,
                country_code: country,
                lifestyle: Lifestyle::new(smoking, exercise),
            };

            if dry_run {
                let (baseline, estimate) = calculator.estimate(&form).await;
                print_estimate(baseline.years(), baseline.is_fallback(), &estimate);
                return Ok(());
            }

            let mut calculator = calculator.with_history(!no_history);
            let outcome = calculator
                .calculate_and_save(&session, &form)
                .await
                .context("Could not save your information, please try again")?;

            print_estimate(outcome.baseline.years(), outcome.baseline.is_fallback(), &outcome.estimate);
            if outcome.reconciled.was_inserted() {
                println!("Your information has been saved.");
            } else {
                println!("Your information has been updated.");
            }
            if !no_history && !outcome.history_saved {
                println!("This calculation could not be added to your history.");
            }
        }
        Commands::Show => {
            let session = open_session(config).await?;
            match calculator.last_record(&session).await.context("Could not load your record")? {
                Some(record) => {
                    println!("Your last recorded data:");
                    println!("{}", serde_json::to_string_pretty(&record)?);
                }
                None => println!("No saved record for {}", session.email()),
            }
        }
        Commands::History { limit } => {
            let session = open_session(config).await?.navigate(View::History);
            let entries = calculator
                .history(&session, limit)
                .await
                .context("Could not load your history")?;

            println!("History ({})", entries.len());
            for entry in entries {
                println!(
                    "  {} | age {} | {} | {}/{} | {:.2} years left",
                    entry.recorded_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.age,
                    entry.country_code,
                    entry.lifestyle.smoking,
                    entry.lifestyle.exercise,
                    entry.remaining_years,
                );
            }
        }
        Commands::Purge { all } => {
            let session = open_session(config).await?.navigate(View::Account);
            let scope = if all { PurgeScope::Everything } else { PurgeScope::History };
            let report = calculator
                .purge(&session, scope)
                .await
                .context("Could not delete your history")?;

            println!("Deleted {} history entries.", report.history_removed);
            if report.record_removed {
                println!("Deleted your saved record.");
            }
        }
        Commands::Lookup { country } => {
            let resolved = calculator.baseline(&country).await;
            let source = if resolved.is_fallback() { "default" } else { "World Bank" };
            println!("{}: {:.2} years ({})", country, resolved.years(), source);
        }
    }

    Ok(())
}

/// Session for the configured, already-authenticated email.
async fn open_session(config: &AppConfig) -> Result<Session> {
    let email = config
        .email
        .clone()
        .context("Please provide your email with --email or SANDGRAINS_EMAIL")?;
    let session = establish_session(
        &TrustedAccounts,
        &Credentials {
            email,
            secret: String::new(),
        },
    )
    .await?;

    info!("Signed in as {}", session.email());
    Ok(session)
}

fn print_estimate(base: f64, fallback: bool, estimate: &sandgrains_core::Estimate) {
    if fallback {
        println!("Baseline unavailable, using the default of {:.0} years.", base);
    } else {
        println!("Baseline life expectancy: {:.2} years", base);
    }
    println!("Lifestyle adjustment: {:+} years", estimate.adjustment);
    println!(
        "Your estimated remaining life: {:.2} years ({} seconds)",
        estimate.remaining_years,
        group_thousands(estimate.remaining_seconds)
    );
}

/// `1576800000` → `1,576,800,000`.
fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0 {
        out.insert(0, '-');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(1_576_800_000), "1,576,800,000");
        assert_eq!(group_thousands(-189_216_000), "-189,216,000");
    }

    #[test]
    fn test_cli_parses_calc() {
        let cli = Cli::try_parse_from([
            "sandgrains", "--email", "ada@example.com", "calc", "--age", "30", "--country", "us",
            "--smoking", "never", "--exercise", "regular",
        ])
        .unwrap();
        match cli.command {
            Commands::Calc { age, country, smoking, exercise, .. } => {
                assert_eq!(age, 30);
                assert_eq!(country.as_str(), "US");
                assert_eq!(smoking, Smoking::Never);
                assert_eq!(exercise, Exercise::Regular);
            }
            _ => panic!("expected calc"),
        }
    }

    #[test]
    fn test_cli_rejects_out_of_range_age() {
        let result = Cli::try_parse_from([
            "sandgrains", "calc", "--age", "121", "--smoking", "never", "--exercise", "regular",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_rejects_unknown_habit() {
        let result = Cli::try_parse_from([
            "sandgrains", "calc", "--age", "30", "--smoking", "sometimes", "--exercise", "regular",
        ]);
        assert!(result.is_err());
    }
}
