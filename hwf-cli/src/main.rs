//! HWF CLI - Command line tool for detecting and classifying gridded heatwaves.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "hwf-cli",
    version,
    about = "Heatwave detection and seasonal classification on daily gridded temperatures"
)]
struct Cli {
    #[command(subcommand)]
    command: hwf_cmd::Command,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    log::debug!("hwf-cli {}", env!("CARGO_PKG_VERSION"));
    hwf_cmd::run(cli.command)
}
