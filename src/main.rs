use clap::{Parser, Subcommand};
use talkback::Result;
use talkback::commands::{ask, serve, show_status};
use talkback::config::{run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "talkback")]
#[command(about = "Retrieval-based conversational answer server with voice output")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure collaborator endpoints and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Start the HTTP answer server
    Serve {
        /// Override the configured listen port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Answer a single query without starting the server
    Ask {
        /// The question to answer from the corpus
        query: String,
    },
    /// Show collaborator and corpus status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Serve { port } => {
            serve(port).await?;
        }
        Commands::Ask { query } => {
            ask(query)?;
        }
        Commands::Status => {
            show_status()?;
        }
    }

    Ok(())
}
