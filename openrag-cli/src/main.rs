use anyhow::{Result, anyhow};
use clap::Parser;
use openrag_cli::{Cli, run};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    openrag_telemetry::init_with_format("openrag", cli.log_format)
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))?;

    let mut stdout = std::io::stdout().lock();
    run(cli, &mut stdout).await
}
