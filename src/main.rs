// Vigil - main entry point

use anyhow::Result;
use clap::Parser;
use vigil::cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    if let Err(e) = cli::commands::execute(cli.command).await {
        cli::error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}
