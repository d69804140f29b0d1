use teloxide::Bot;

use crate::{
  config::Config, prelude::*, sv, sv::captcha::ChallengeStore,
};

pub struct Services<'a> {
  pub settings: sv::Settings<'a>,
  pub client: sv::Client<'a>,
  pub bonus: sv::Bonus<'a>,
  pub giveaway: sv::Giveaway<'a>,
  pub promotion: sv::Promotion<'a>,
  pub feedback: sv::Feedback<'a>,
  pub mailing: sv::Mailing<'a>,
}

pub struct AppState {
  pub db: DatabaseConnection,
  pub bot: Bot,
  pub config: Config,
  pub challenges: ChallengeStore,
}

impl AppState {
  pub async fn new(config: Config) -> anyhow::Result<Self> {
    info!("Connecting to database...");
    let db = Database::connect(&config.db_url)
      .await
      .context("Failed to connect to database")?;

    info!("Running migrations...");
    migration::Migrator::up(&db, None)
      .await
      .context("Failed to run migrations")?;

    sv::Settings::new(&db)
      .seed_defaults(config.default_bonus_amount)
      .await
      .context("Failed to seed settings")?;

    let clients = sv::Client::new(&db)
      .count()
      .await
      .context("Failed to count clients")?;
    info!("Database ready, {clients} clients registered");

    Ok(Self {
      bot: Bot::new(&config.token),
      challenges: ChallengeStore::new(config.captcha_ttl),
      db,
      config,
    })
  }

  pub fn sv(&self) -> Services<'_> {
    Services {
      settings: sv::Settings::new(&self.db),
      client: sv::Client::new(&self.db),
      bonus: sv::Bonus::new(&self.db),
      giveaway: sv::Giveaway::new(&self.db),
      promotion: sv::Promotion::new(&self.db),
      feedback: sv::Feedback::new(&self.db),
      mailing: sv::Mailing::new(&self.db),
    }
  }

  pub fn is_admin(&self, tg_user_id: i64) -> bool {
    self.config.is_admin(tg_user_id)
  }
}
