//! Bookshelf: personal book library with paginated reading.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod maintenance;
mod routes;
mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("BOOKSHELF_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

fn data_dir_arg(args: &[String]) -> PathBuf {
    args.get(2)
        .map(PathBuf::from)
        .unwrap_or_else(resolve_data_dir)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--validate" | "validate" => {
                let report = maintenance::validate(&data_dir_arg(&args));
                maintenance::print_report(&report);
                std::process::exit(if report.db_valid { 0 } else { 1 });
            }
            "--reset" | "reset" => {
                let report = maintenance::reset(&data_dir_arg(&args));
                maintenance::print_report(&report);
                std::process::exit(if report.errors.is_empty() { 0 } else { 1 });
            }
            "--help" | "-h" | "help" => {
                println!("Bookshelf: personal book library with paginated reading");
                println!();
                println!("Usage: bookshelf [command]");
                println!();
                println!("Commands:");
                println!("  (none)                   Start the server");
                println!("  validate [data-dir]      Validate existing database");
                println!("  reset [data-dir]         Recreate the database with seed books");
                println!("  help                     Show this help message");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'bookshelf help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = bookshelf_core::BookshelfConfig::from_env(&data_dir)?;
    let port = config.port;
    info!("Page size: {} characters", config.page_size);

    let store = bookshelf_store::SqliteStore::open(&config.data_paths.database)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;

    let state = Arc::new(AppState::new(config, store));
    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Bookshelf server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
