mod commands;

use clap::{CommandFactory, Parser};
use clap_complete::{Shell, generate};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "homefeed")]
#[command(version, about = "Build-time data aggregation for the home page payload", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Validate site configuration
    Validate {
        /// Path to site directory
        path: PathBuf,
    },

    /// Run one generation cycle and write payload files per locale
    Generate {
        /// Path to site directory
        path: PathBuf,

        /// Output directory for payload artifacts
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Serve payloads locally, regenerating when the revalidation window elapses
    Preview {
        /// Path to site directory
        path: PathBuf,

        /// Port to serve on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Validate { path } => commands::validate::run(path).await,
        Command::Generate { path, output } => commands::generate::run(path, output).await,
        Command::Preview { path, port } => commands::preview::run(path, port).await,
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "homefeed", &mut io::stdout());
            Ok(())
        }
    }
}
