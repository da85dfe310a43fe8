use anyhow::Result;
use clap::Parser;
use ticketbot_cli::{init_tracing, run_cli, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format)?;
    run_cli(cli).await
}
