use anyhow::Result;
use clap::Parser;
use codebuddy::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    codebuddy::run(args).await
}
