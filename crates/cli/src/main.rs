//! `bloodbank`: operator client for the donor registry and stock ledger.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use bloodbank_infra::{BloodBank, SqliteStore};

mod cli;
mod commands;
mod output;

use cli::Cli;
use output::Output;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    bloodbank_observability::init_with(&cli.log_level, cli.log_format);

    let config = cli.database_config();
    let store = SqliteStore::connect(&config)
        .await
        .with_context(|| format!("failed to open database {}", config.url))?;
    debug!(url = %config.url, "database ready");

    let bank = BloodBank::new(store);
    let result = commands::run(&bank, cli.command, Output::new(cli.json)).await;

    bank.store().pool().close().await;
    result
}
