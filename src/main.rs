//! Loyalty bot - bonuses, promo codes and giveaways for a retail shop
//!
//! Architecture:
//! - SeaORM for database access (SQLite)
//! - Teloxide for the customer-facing Telegram bot
//! - Axum for the admin JSON API with rate limiting
//! - Supervised plugins on the Tokio runtime

mod config;
mod entity;
mod error;
mod plugins;
mod prelude;
mod state;
mod sv;
mod utils;

use std::sync::Arc;

use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{
  config::Config,
  plugins::{App, cron, server, telegram},
  prelude::*,
  state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "loyalty=debug,tower_http=debug,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = Config::from_env().context("Invalid configuration")?;
  if config.admins.is_empty() {
    warn!("No admins configured, admin commands are disabled");
  }

  info!("Starting loyalty bot v{}", env!("CARGO_PKG_VERSION"));

  let app = Arc::new(AppState::new(config).await?);

  App::new()
    .register(telegram::Plugin)
    .register(server::Plugin)
    .register(cron::Cron)
    .run(app)
    .await;

  tokio::signal::ctrl_c().await.context("Failed to listen for ctrl-c")?;
  info!("Shutting down");
  Ok(())
}
