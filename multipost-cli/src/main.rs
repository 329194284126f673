mod commands;

use crate::commands::{Cli, CommandError};
use clap::Parser;
use multipost_common::{legacy::LEGACY_FILE_NAME, util::PositiveDuration};
use multipost_db::{
    client::{DbClient, DbError},
    migration::{LegacyBlob, migrate_if_present},
    store::StoreOptions,
};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("STORAGE_TIMEOUT_MS must be positive")]
    NonPositiveTimeout,
    #[error("Error opening the record store: {0}")]
    Database(#[from] DbError),
    #[error(transparent)]
    Command(#[from] CommandError),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    #[serde(default = "default_database_url")]
    database_url: String,
    #[serde(default = "default_legacy_path")]
    legacy_path: PathBuf,
    storage_timeout_ms: Option<u64>,
}

fn default_database_url() -> String {
    "sqlite://multipost.db".to_owned()
}

fn default_legacy_path() -> PathBuf {
    LEGACY_FILE_NAME.into()
}

impl Env {
    fn store_options(&self) -> Result<StoreOptions, InitError> {
        let timeout = self
            .storage_timeout_ms
            .map(|millis| PositiveDuration::from_millis(millis).ok_or(InitError::NonPositiveTimeout))
            .transpose()?;

        Ok(StoreOptions::new(&self.database_url).with_timeout(timeout))
    }
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "multipost_cli=debug,\
                multipost_db=debug,\
                multipost_common=debug,sqlx=warn"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let cli = Cli::parse();
    let env = get_env()?;

    let db = DbClient::connect(&env.store_options()?).await?;
    // legacy data has to be in the store before anything reads from it
    migrate_if_present(&db, &LegacyBlob::new(&env.legacy_path)).await;

    commands::run(&db, cli.command).await?;

    Ok(())
}
