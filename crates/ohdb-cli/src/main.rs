mod query;
mod seed;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "ohdb-cli")]
#[command(about = "Outlet hours database command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load an outlet JSON fixture into the database.
    Seed {
        /// Path to a JSON array of outlet records.
        #[arg(long)]
        file: PathBuf,
    },
    /// Run a natural-language outlet query against the database.
    Query {
        /// The question, e.g. "which outlets in Bangsar are open after 9pm".
        text: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Seed { file } => seed::run(&file).await,
        Commands::Query { text } => query::run(&text).await,
    }
}
