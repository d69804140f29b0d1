use std::sync::Arc;

use crate::{plugins::Plugin, prelude::*, state::AppState};

/// Finishes expired giveaways and evicts stale captcha challenges
pub struct Cron;

#[async_trait]
impl Plugin for Cron {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let mut interval = time::interval(app.config.giveaway_poll);

    loop {
      interval.tick().await;

      let now = Utc::now().naive_utc();
      match app.sv().giveaway.finish_expired(now).await {
        Ok(finished) => {
          for (giveaway, winners) in finished {
            info!(
              "Giveaway {} `{}` expired with {} winners",
              giveaway.id,
              giveaway.title,
              winners.len()
            );
            super::telegram::announce_winners(&app, &giveaway, &winners).await;
          }
        }
        Err(e) => {
          error!("Failed to finish expired giveaways: {e}");
        }
      }

      let evicted = app.challenges.gc();
      if evicted > 0 {
        debug!("Evicted {evicted} stale captcha challenges");
      }
    }
  }
}
