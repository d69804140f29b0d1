use sea_orm::sea_query::OnConflict;

use crate::{entity::setting, prelude::*};

pub const DEFAULT_BONUS_AMOUNT: &str = "default_bonus_amount";
pub const DEFAULT_BONUS_ENABLED: &str = "default_bonus_enabled";
pub const WELCOME_TEXT: &str = "welcome_text";
pub const BONUS_TERMS: &str = "bonus_terms";
pub const TOTAL_REDEEMED: &str = "total_redeemed";

pub struct Settings<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Settings<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn get(&self, key: &str) -> Result<Option<String>> {
    let setting = setting::Entity::find_by_id(key).one(self.db).await?;
    Ok(setting.map(|s| s.value))
  }

  pub async fn set(&self, key: &str, value: &str) -> Result<()> {
    setting::Entity::insert(setting::ActiveModel {
      key: Set(key.to_string()),
      value: Set(value.to_string()),
    })
    .on_conflict(
      OnConflict::column(setting::Column::Key)
        .update_column(setting::Column::Value)
        .to_owned(),
    )
    .exec_without_returning(self.db)
    .await?;

    Ok(())
  }

  pub async fn get_i64(&self, key: &str) -> Result<Option<i64>> {
    let Some(raw) = self.get(key).await? else {
      return Ok(None);
    };

    match raw.trim().parse() {
      Ok(value) => Ok(Some(value)),
      Err(_) => {
        warn!("Setting `{key}` is not a number: {raw:?}");
        Ok(None)
      }
    }
  }

  pub async fn get_bool(&self, key: &str) -> Result<bool> {
    let raw = self.get(key).await?;
    Ok(matches!(raw.as_deref().map(str::trim), Some("1" | "true")))
  }

  /// Read-modify-write, concurrent callers may lose an update
  pub async fn add_i64(&self, key: &str, delta: i64) -> Result<i64> {
    let value = self.get_i64(key).await?.unwrap_or(0) + delta;
    self.set(key, &value.to_string()).await?;
    Ok(value)
  }

  pub async fn all(&self) -> Result<Vec<setting::Model>> {
    Ok(setting::Entity::find().all(self.db).await?)
  }

  /// Inserts defaults without touching values an operator already changed
  pub async fn seed_defaults(&self, default_bonus_amount: i64) -> Result<()> {
    let defaults = [
      (DEFAULT_BONUS_AMOUNT, default_bonus_amount.to_string()),
      (DEFAULT_BONUS_ENABLED, "1".to_string()),
      (TOTAL_REDEEMED, "0".to_string()),
    ];

    for (key, value) in defaults {
      setting::Entity::insert(setting::ActiveModel {
        key: Set(key.to_string()),
        value: Set(value),
      })
      .on_conflict(OnConflict::column(setting::Column::Key).do_nothing().to_owned())
      .exec_without_returning(self.db)
      .await?;
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::testing::setup_db;

  #[tokio::test]
  async fn set_overwrites_value() {
    let db = setup_db().await;
    let sv = Settings::new(&db);

    sv.set(WELCOME_TEXT, "hi").await.unwrap();
    sv.set(WELCOME_TEXT, "hello").await.unwrap();

    assert_eq!(sv.get(WELCOME_TEXT).await.unwrap().as_deref(), Some("hello"));
    assert_eq!(sv.get("missing").await.unwrap(), None);
  }

  #[tokio::test]
  async fn seed_keeps_operator_values() {
    let db = setup_db().await;
    let sv = Settings::new(&db);

    sv.set(DEFAULT_BONUS_AMOUNT, "250").await.unwrap();
    sv.seed_defaults(100).await.unwrap();

    assert_eq!(sv.get_i64(DEFAULT_BONUS_AMOUNT).await.unwrap(), Some(250));
    assert!(sv.get_bool(DEFAULT_BONUS_ENABLED).await.unwrap());
    assert_eq!(sv.get_i64(TOTAL_REDEEMED).await.unwrap(), Some(0));
  }

  #[tokio::test]
  async fn add_accumulates() {
    let db = setup_db().await;
    let sv = Settings::new(&db);

    assert_eq!(sv.add_i64(TOTAL_REDEEMED, 30).await.unwrap(), 30);
    assert_eq!(sv.add_i64(TOTAL_REDEEMED, 12).await.unwrap(), 42);
  }

  #[tokio::test]
  async fn malformed_number_reads_as_none() {
    let db = setup_db().await;
    let sv = Settings::new(&db);

    sv.set(DEFAULT_BONUS_AMOUNT, "lots").await.unwrap();
    assert_eq!(sv.get_i64(DEFAULT_BONUS_AMOUNT).await.unwrap(), None);
    assert!(!sv.get_bool("missing").await.unwrap());
  }
}
