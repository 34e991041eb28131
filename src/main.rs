use anyhow::Result;
use rally::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
