//! Spread Sentinel
//!
//! Adaptive spread-arbitrage signal engine for mini/full futures pairs.

use anyhow::Result;
use spread_sentinel::adapters::cli;

#[tokio::main]
async fn main() -> Result<()> {
    // ARBITRAGE_PROFILE and RUST_LOG may come from .env
    dotenvy::dotenv().ok();

    let app = cli::init();
    cli::execute(app).await
}
