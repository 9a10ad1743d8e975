//! CLI tool to export one tenant schema to a JSON export document
//!
//! Usage:
//!   cargo run --bin export-schema -- shop
//!   cargo run --bin export-schema -- shop ./shop-backup.json
//!
//! Connection settings come from the same environment (or .env) as the server.

use std::env;
use std::io::Write;
use std::path::Path;

use tenantdb_admin::config::Config;
use tenantdb_admin::pool::PoolManager;
use tenantdb_admin::schema::SchemaExporter;

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <schema> [output.json]", args[0]);
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  {} shop", args[0]);
        eprintln!("  {} shop ./shop-backup.json", args[0]);
        std::process::exit(1);
    }

    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args[1], args.get(2).map(Path::new)).await {
        eprintln!("Error exporting schema '{}': {}", args[1], e);
        std::process::exit(1);
    }
}

async fn run(schema: &str, output: Option<&Path>) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let pool_manager = PoolManager::new(&config).await?;

    let document = SchemaExporter::new()
        .export(pool_manager.pool(), schema)
        .await?;
    let json = serde_json::to_string_pretty(&document)?;

    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            eprintln!(
                "Exported {} tables ({} rows) from '{}' to {}",
                document.table_count(),
                document.row_count(),
                schema,
                path.display()
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json)?;
        }
    }

    Ok(())
}
