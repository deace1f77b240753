//! Swiss tournament administration tool.
//!
//! Runs one command per invocation against the PostgreSQL-backed engine.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Error};
use pico_args::Arguments;
use swiss_admin::cli::{self, HELP};
use swiss_admin::config::AdminConfig;
use swiss_admin::logging;
use swiss_tournament::db::Database;
use swiss_tournament::tournament::{TournamentError, TournamentManager};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let Some(invocation) = cli::parse_args(Arguments::from_env())? else {
        print!("{HELP}");
        return Ok(());
    };

    logging::init();

    let config = AdminConfig::from_env(invocation.database_url.clone(), invocation.bye_policy)?;
    config.validate()?;

    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Database connected");

    let manager = TournamentManager::with_config(Arc::new(db.store()), config.engine);

    let started = Instant::now();
    let result = cli::execute(
        &invocation.command,
        invocation.tournament,
        &manager,
        Some(&db),
    )
    .await;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    logging::log_command(invocation.command.name(), elapsed_ms, result.is_ok());

    db.close().await;

    match result {
        Ok(outcome) => {
            println!("{}", cli::render(&outcome, invocation.json)?);
            Ok(())
        }
        Err(err) => {
            if let Some(engine_err) = err.downcast_ref::<TournamentError>() {
                error!("{engine_err:?}");
                anyhow::bail!(engine_err.client_message());
            }
            Err(err)
        }
    }
}
