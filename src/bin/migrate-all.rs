//! migrate-all - load a legacy registration mysqldump into the new schema
//!
//! Zones and hospitals are upserted; members, attendees and finances are
//! reloaded from scratch on every run.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use confreg_migrate::{migrate_file, MemoryStore, MigrateConfig, MigrationReport};

#[derive(Parser)]
#[command(name = "migrate-all")]
#[command(version, about = "Migrate a legacy registration mysqldump into the new database", long_about = None)]
struct Cli {
    /// YAML config file (defaults to ./migrate.yaml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// mysqldump file to load (overrides MIGRATE_DUMP_PATH and the config file)
    #[arg(short, long)]
    dump: Option<PathBuf>,

    /// Target database URL (overrides DATABASE_URL and the config file)
    #[arg(long)]
    database_url: Option<String>,

    /// Parse and reconcile into memory without touching the database
    #[arg(long)]
    dry_run: bool,

    /// Create the target tables if they do not exist
    #[arg(long)]
    ensure_tables: bool,

    /// Write the run report as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt::Subscriber::builder().with_env_filter(env).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Migration failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = MigrateConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.apply_env();
    if let Some(dump) = cli.dump {
        config.dump_path = dump;
    }
    if let Some(url) = cli.database_url {
        config.database_url = Some(url);
    }
    config.validate()?;

    info!(dump = %config.dump_path.display(), dry_run = cli.dry_run, "Starting legacy migration");

    let report = if cli.dry_run {
        let mut store = MemoryStore::new();
        migrate_file(&config.dump_path, &mut store, config.load_options())?
    } else {
        run_against_database(&config, cli.ensure_tables)?
    };

    report.log_summary();

    if let Some(path) = cli.report {
        report
            .write_json(&path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "Report written");
    }

    Ok(())
}

#[cfg(any(feature = "postgres", feature = "mysql"))]
fn run_against_database(config: &MigrateConfig, ensure_tables: bool) -> Result<MigrationReport> {
    use confreg_migrate::{Database, DieselStore};

    let url = config
        .database_url
        .as_deref()
        .context("No database URL: pass --database-url or set DATABASE_URL")?;

    let db = Database::new(url).context("Failed to create connection pool")?;
    db.test_connection().context("Database is not reachable")?;
    if ensure_tables {
        db.ensure_tables()?;
    }

    let mut store = DieselStore::connect(&db)?;
    let result = migrate_file(&config.dump_path, &mut store, config.load_options());
    drop(store);
    info!("Store connection released");

    Ok(result?)
}

#[cfg(not(any(feature = "postgres", feature = "mysql")))]
fn run_against_database(_config: &MigrateConfig, _ensure_tables: bool) -> Result<MigrationReport> {
    anyhow::bail!("Built without a database backend; rebuild with --features postgres or mysql, or use --dry-run")
}
