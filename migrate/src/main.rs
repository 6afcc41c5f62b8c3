//! One-shot copy of the Steam warehouse into the catalog store.
//!
//! Reads the normalized `processed` schema from PostgreSQL and upserts games,
//! developers, publishers, genres, categories, tags and their junction rows
//! into the catalog database. Safe to re-run: every write is keyed by the
//! warehouse id, so a second run updates documents in place.

use std::path::{Path, PathBuf};

use anyhow::Context;
use catalog::EntityKind;
use catalog_store::Database;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod migrator;
mod source;

use migrator::{MigrationReport, Migrator};
use source::{PgSourceReader, SourceReader};

/// Copy the Steam warehouse into the catalog store.
#[derive(Parser)]
#[command(name = "catalog-migrate", version, about)]
struct Cli {
    /// Only migrate the first N games (by warehouse id) and the entities
    /// they reference.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    limit: Option<u64>,

    /// Catalog database file. Defaults to `CATALOG_DB_PATH`, then
    /// `./data/steam_games.db`.
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,
}

/// Log to stderr, and to a daily file when a log directory is configured.
/// The returned guard flushes the file writer on drop.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).ok();
            let file_appender = tracing_appender::rolling::daily(dir, "catalog-migrate");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(config::get_log_dir().as_deref());

    let db_path = cli.database.unwrap_or_else(config::get_db_path);
    let pg = config::get_pg_config();

    tracing::info!("Connecting to databases");
    let source = PgSourceReader::connect(&pg).await.with_context(|| {
        format!(
            "failed to connect to PostgreSQL at {}:{}/{}",
            pg.host, pg.port, pg.database
        )
    })?;
    let db = match Database::open(&db_path).await {
        Ok(db) => db,
        Err(e) => {
            source.close().await;
            return Err(e).with_context(|| {
                format!("failed to open catalog database at {}", db_path.display())
            });
        }
    };

    if let Some(limit) = cli.limit {
        tracing::info!(limit, "Running migration with limit");
    }

    let migrator = Migrator::new(source, db.games(), db.entities(), db.links());
    let result = run(&migrator, cli.limit).await;

    migrator.source().close().await;
    db.close().await;

    if let Err(e) = &result {
        tracing::error!(error = %e, "Migration failed");
    }
    result
}

async fn run<S, G, E, L>(
    migrator: &Migrator<S, G, E, L>,
    limit: Option<u64>,
) -> anyhow::Result<()>
where
    S: SourceReader,
    G: catalog_store::GameRepository,
    E: catalog_store::EntityRepository,
    L: catalog_store::LinkRepository,
{
    let report = migrator.run(limit).await?;
    print_summary(&report);

    let stats = migrator.statistics().await?;
    println!();
    println!("Final statistics:");
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn print_summary(report: &MigrationReport) {
    println!("Migration summary:");
    println!("  games: {}", report.games);
    for kind in EntityKind::ALL {
        let entry = report.kind(kind);
        println!("  {}: {}", kind.collection(), entry.entities);
    }
    for kind in EntityKind::ALL {
        let entry = report.kind(kind);
        println!(
            "  {}: {} ({} skipped)",
            kind.link_collection(),
            entry.links,
            entry.skipped_links
        );
    }
}
