use anyhow::Result;
use clap::Parser;

use flexing::cli::CliArgs;

fn main() -> Result<()> {
    flexing::tracing::init();

    let args = CliArgs::parse();
    tracing::debug!(command = ?args.command, "starting");

    let stdout = std::io::stdout();
    args.command.run(&mut stdout.lock())
}
