use anyhow::Result;
use clap::Parser;

use deep_search::{cli::Cli, runtime::Runtime, utils::init_logger};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logger(cli.verbose);

    Runtime::new(cli)?.run().await
}
