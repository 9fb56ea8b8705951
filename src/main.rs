// src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use finserve_data::config::Config;
use finserve_data::migrate::Migrator;
use finserve_data::migrations;
use finserve_data::Store;

#[derive(Parser)]
#[command(name = "finserve", about = "FinserveNew schema and migration tool", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply or revert migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Inspect the schema
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply pending migrations
    Up {
        /// Stop after this migration id instead of applying everything
        #[arg(long)]
        target: Option<String>,
    },
    /// Revert the most recent applied migrations
    Down {
        #[arg(long, default_value_t = 1)]
        steps: usize,
    },
    /// Show each known migration and whether it is applied
    Status,
}

#[derive(Subcommand)]
enum SchemaAction {
    /// Diff the live database schema against the recorded history
    Verify {
        /// Run against a fresh in-memory database instead of the configured one
        #[arg(long)]
        scratch: bool,
    },
    /// Print the final model snapshot
    Dump {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let migrator = Migrator::new(migrations::registry())?;

    match cli.command {
        Command::Migrate { action } => {
            let store = Store::connect(&config.database_url).await?;
            match action {
                MigrateAction::Up { target } => {
                    let applied = migrator.up(store.pool(), target.as_deref()).await?;
                    println!("{applied} migration(s) applied");
                }
                MigrateAction::Down { steps } => {
                    let reverted = migrator.down(store.pool(), steps).await?;
                    println!("{reverted} migration(s) reverted");
                }
                MigrateAction::Status => {
                    for (id, applied) in migrator.status(store.pool()).await? {
                        let mark = if applied { "applied" } else { "pending" };
                        println!("{mark:>8}  {id}");
                    }
                }
            }
        }
        Command::Schema { action } => match action {
            SchemaAction::Verify { scratch } => {
                let store = if scratch {
                    let store = Store::connect_memory().await?;
                    migrator.up(store.pool(), None).await?;
                    store
                } else {
                    Store::connect(&config.database_url).await?
                };
                let diffs = migrator.verify(store.pool()).await?;
                if diffs.is_empty() {
                    println!("schema matches the recorded history");
                } else {
                    for d in &diffs {
                        eprintln!("mismatch: {d}");
                    }
                    anyhow::bail!("{} schema mismatch(es)", diffs.len());
                }
            }
            SchemaAction::Dump { json } => {
                let snap = migrator.final_snapshot();
                if json {
                    println!("{}", serde_json::to_string_pretty(snap)?);
                } else {
                    for (name, table) in &snap.tables {
                        println!("{name}");
                        for col in &table.columns {
                            let null = if col.nullable { "" } else { " NOT NULL" };
                            println!("    {} {}{null}", col.name, col.ty.sql());
                        }
                        for fk in &table.foreign_keys {
                            println!(
                                "    -> {} ({}) ON DELETE {}",
                                fk.ref_table,
                                fk.columns.join(", "),
                                fk.on_delete.sql()
                            );
                        }
                    }
                    for (name, index) in &snap.indexes {
                        let unique = if index.unique { "unique " } else { "" };
                        println!(
                            "{unique}index {name} on {} ({})",
                            index.table,
                            index.columns.join(", ")
                        );
                    }
                }
            }
        },
    }

    Ok(())
}
