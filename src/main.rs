use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskdeck::{api, auth::AuthConfig, seed};
use taskdeck_core::Database;

#[derive(Parser)]
#[command(name = "taskdeck")]
#[command(about = "Team task planner with calendar scheduling and per-project access control")]
struct Cli {
    /// Database file path (defaults to the platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the taskdeck server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// Populate default categories, settings, and a sample task
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "taskdeck=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let db = open_database(cli.db.as_deref())?;
    db.migrate()?;

    match cli.command {
        Some(Commands::Seed) => seed::run(&db)?,
        Some(Commands::Serve { port }) => serve(db, port).await?,
        None => serve(db, 3000).await?,
    }

    Ok(())
}

fn open_database(path: Option<&Path>) -> anyhow::Result<Database> {
    match path {
        Some(path) => Database::open(path),
        None => Database::open_default(),
    }
}

async fn serve(db: Database, port: u16) -> anyhow::Result<()> {
    let auth = AuthConfig::from_env()?;
    let app = api::create_router(db, auth);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("taskdeck server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}
