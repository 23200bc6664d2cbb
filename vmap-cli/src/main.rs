//! VMAP CLI - weekly vaccination coverage statistics from the command line.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "vmap-cli",
    version,
    about = "Weekly vaccination coverage map toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: vmap_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    vmap_cmd::run(cli.command).await
}
