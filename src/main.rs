//! gfxtrace - Command-line client for the gfxtrace replay service
//!
//! This is the binary entry point. All logic lives in the library.

use clap::Parser;
use gfxtrace::Cli;
use rpclib_core::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    gfxtrace::run(cli).await
}
