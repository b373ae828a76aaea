mod cli;
mod model;
#[cfg(feature = "tui")]
mod orchestrator;
#[cfg(feature = "tui")]
mod storage;
mod supervisor;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_headless = args.text;

    match cli::run(args).await {
        Ok(()) => {
            // Explicitly exit with code 0 on success in headless mode, in case
            // a PTY thread is still parked in a blocking read.
            if is_headless {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}
