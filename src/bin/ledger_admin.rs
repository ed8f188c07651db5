use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use kiosk_inventory_api::{
    config, db,
    openapi,
    services::reconciliation::{ReconciliationReport, ReconciliationService},
};
use tracing::info;

/// Operational commands for the inventory ledger.
#[derive(Parser)]
#[command(name = "ledger-admin", version, about = "Kiosk inventory ledger administration")]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Rebuild cached product stock from the movement ledger
    Reconcile {
        /// Report drift without writing
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// Write the OpenAPI document to stdout or a file
    Openapi {
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate => {
            let pool = connect().await?;
            db::run_migrations(&pool)
                .await
                .context("failed to run migrations")?;
            println!("Migrations applied");
        }
        Commands::Reconcile { dry_run } => {
            let pool = connect().await?;
            let service = ReconciliationService::new(Arc::new(pool));
            let report = service
                .reconcile(dry_run)
                .await
                .context("reconciliation failed")?;
            render_report(&report, cli.json)?;
        }
        Commands::Openapi { output } => {
            let document = openapi::openapi_json().context("failed to render OpenAPI document")?;
            match output {
                Some(path) => {
                    fs::write(&path, document)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("OpenAPI document written to {}", path.display());
                }
                None => println!("{}", document),
            }
        }
    }

    Ok(())
}

async fn connect() -> Result<db::DbPool> {
    let cfg = config::load_config().context("failed to load application config")?;
    config::init_tracing(&cfg.log_level, cfg.log_json);
    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");
    Ok(pool)
}

fn render_report(report: &ReconciliationReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for drift in &report.drifted {
        println!(
            "{} ({}): cached {} ledger {} difference {}",
            drift.product_id,
            drift.product_name,
            drift.cached_stock,
            drift.ledger_stock,
            drift.difference
        );
    }
    println!(
        "{} products checked, {} drifted{}",
        report.products_checked,
        report.drifted.len(),
        if report.dry_run { " (dry run, nothing written)" } else { "" }
    );
    Ok(())
}
