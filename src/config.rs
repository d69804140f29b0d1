use std::{collections::HashSet, env, str::FromStr};

use crate::prelude::*;

#[derive(Debug, Clone)]
pub struct Config {
  pub token: String,
  pub admins: HashSet<i64>,
  pub admin_secret: String,
  pub db_url: String,
  pub port: u16,
  pub bot_username: String,
  pub default_bonus_amount: i64,
  pub broadcast_delay: Duration,
  pub captcha_ttl: Duration,
  pub giveaway_poll: Duration,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      token: String::new(),
      admins: HashSet::new(),
      admin_secret: String::new(),
      db_url: String::from("sqlite:loyalty.db?mode=rwc"),
      port: 8080,
      bot_username: String::from("bot"),
      default_bonus_amount: 100,
      broadcast_delay: Duration::from_millis(50),
      captcha_ttl: Duration::from_secs(10 * 60),
      giveaway_poll: Duration::from_secs(60),
    }
  }
}

impl Config {
  pub fn from_env() -> anyhow::Result<Self> {
    let default = Self::default();

    Ok(Self {
      token: env::var("TELOXIDE_TOKEN").context("TELOXIDE_TOKEN not set")?,
      admins: parse_admins(&env::var("ADMIN_IDS").unwrap_or_default())?,
      admin_secret: env::var("ADMIN_SECRET").context("ADMIN_SECRET not set")?,
      db_url: env::var("DATABASE_URL").unwrap_or(default.db_url),
      port: parsed("PORT")?.unwrap_or(default.port),
      bot_username: env::var("BOT_USERNAME").unwrap_or(default.bot_username),
      default_bonus_amount: parsed("DEFAULT_BONUS_AMOUNT")?
        .unwrap_or(default.default_bonus_amount),
      broadcast_delay: duration("BROADCAST_DELAY")?
        .unwrap_or(default.broadcast_delay),
      captcha_ttl: duration("CAPTCHA_TTL")?.unwrap_or(default.captcha_ttl),
      giveaway_poll: duration("GIVEAWAY_POLL")?
        .unwrap_or(default.giveaway_poll),
    })
  }

  pub fn is_admin(&self, tg_user_id: i64) -> bool {
    self.admins.contains(&tg_user_id)
  }
}

fn parse_admins(raw: &str) -> anyhow::Result<HashSet<i64>> {
  raw
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|id| id.parse::<i64>().with_context(|| format!("Invalid admin id `{id}`")))
    .collect()
}

fn parsed<T>(key: &str) -> anyhow::Result<Option<T>>
where
  T: FromStr,
  T::Err: std::error::Error + Send + Sync + 'static,
{
  env::var(key)
    .ok()
    .map(|raw| raw.trim().parse().with_context(|| format!("Invalid {key}")))
    .transpose()
}

fn duration(key: &str) -> anyhow::Result<Option<Duration>> {
  env::var(key)
    .ok()
    .map(|raw| {
      humantime::parse_duration(raw.trim())
        .with_context(|| format!("Invalid {key}, expected e.g. `50ms` or `10m`"))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_admin_list() {
    let admins = parse_admins(" 1, 2 ,,3").unwrap();
    assert_eq!(admins, HashSet::from([1, 2, 3]));
    assert!(parse_admins("").unwrap().is_empty());
    assert!(parse_admins("1,abc").is_err());
  }

  #[test]
  fn defaults_match_documented_values() {
    let config = Config::default();
    assert_eq!(config.default_bonus_amount, 100);
    assert_eq!(config.broadcast_delay, Duration::from_millis(50));
    assert_eq!(config.captcha_ttl, Duration::from_secs(600));
  }
}
