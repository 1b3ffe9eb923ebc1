//! Operator tool for inspecting and editing player currency.
//!
//! ```bash
//! gamestate-admin show 42
//! gamestate-admin --policy award-difference set 42 --donuts 500 --cash 1000
//! ```
//!
//! Settings come from the environment (and `.env`), see
//! [`gamestate::StoreConfig::from_env`]; flags take precedence.
mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use gamestate::{CurrencyUpdate, GameStateGateway, LedgerPolicy, StoreConfig, StoreError};
use serde_json::{Value, json};

#[derive(Parser)]
#[command(name = "gamestate-admin", about = "Inspect and edit player currency save files")]
struct Cli {
    /// Root of the per-player save directories
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// `.proto` file or compiled descriptor set
    #[arg(long, global = true, value_name = "PATH")]
    schema: Option<PathBuf>,

    /// Ledger policy for donut updates
    #[arg(long, global = true)]
    policy: Option<LedgerPolicy>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the combined donuts and cash view as JSON
    Show {
        entity_id: String,
    },
    /// Set donuts and/or cash
    Set {
        entity_id: String,
        /// New donut balance
        #[arg(long, allow_hyphen_values = true)]
        donuts: Option<i64>,
        /// New cash amount
        #[arg(long, allow_hyphen_values = true)]
        cash: Option<i64>,
    },
}

impl Cli {
    /// Environment settings with flag overrides. A `--policy` flag also
    /// replaces an unusable `LEDGER_POLICY`.
    fn store_config(&self) -> Result<StoreConfig> {
        let mut config = StoreConfig::from_lookup(|key| {
            if key == "LEDGER_POLICY" && self.policy.is_some() {
                return None;
            }
            std::env::var(key).ok()
        })?;
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(schema) = &self.schema {
            config.schema_path = schema.clone();
        }
        if let Some(policy) = self.policy {
            config.ledger_policy = policy;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let _guard = logging::setup_logging()?;

    let cli = Cli::parse();
    let config = cli.store_config()?;

    tracing::debug!(
        "data_dir={}, schema={}, policy={}",
        config.data_dir.display(),
        config.schema_path.display(),
        config.ledger_policy
    );

    let gateway = GameStateGateway::builder()
        .config(config)
        .build()
        .context("failed to initialize game-state store")?;

    match cli.command {
        Command::Show { entity_id } => show(&gateway, &entity_id).await,
        Command::Set {
            entity_id,
            donuts,
            cash,
        } => set(&gateway, &entity_id, CurrencyUpdate { donuts, cash }).await,
    }
}

async fn show(gateway: &GameStateGateway, entity_id: &str) -> Result<()> {
    let view = gateway
        .get_currency_view(entity_id)
        .await
        .with_context(|| format!("cannot read currency for '{}'", entity_id))?;
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

async fn set(gateway: &GameStateGateway, entity_id: &str, update: CurrencyUpdate) -> Result<()> {
    let report = gateway.update_currency_report(entity_id, update).await?;

    let output = json!({
        "id": entity_id,
        "donuts": report.donuts.as_ref().map(outcome),
        "cash": report.cash.as_ref().map(outcome),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    if !report.is_complete() {
        bail!("update for '{}' was only partially applied", entity_id);
    }
    Ok(())
}

fn outcome(result: &Result<i64, StoreError>) -> Value {
    match result {
        Ok(value) => json!({ "ok": value }),
        Err(e) => json!({ "error": e.to_string(), "kind": e.kind().to_string() }),
    }
}
