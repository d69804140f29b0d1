//! Bonus ledger
//!
//! One running balance per client. Grants add to it in place, redemptions
//! deduct `min(requested, balance)` and leave an audit record behind.

use sea_orm::sea_query::Expr;
use serde::Serialize;

use crate::{
  entity::{bonus, client, redemption},
  prelude::*,
  sv::{self, settings},
};

pub const HISTORY_LIMIT: u64 = 10;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchReport {
  pub succeeded: u32,
  pub failed: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redeemed {
  pub bonus_id: i32,
  pub client_id: i64,
  pub code: String,
  pub requested: i64,
  pub deducted: i64,
  pub remaining: i64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BonusStats {
  pub total_balance: i64,
  pub records: u64,
  pub claimed: u64,
  pub clients: u64,
  pub total_redeemed: i64,
}

pub struct Bonus<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Bonus<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn by_id(&self, bonus_id: i32) -> Result<Option<bonus::Model>> {
    Ok(bonus::Entity::find_by_id(bonus_id).one(self.db).await?)
  }

  pub async fn by_code(&self, code: &str) -> Result<Option<bonus::Model>> {
    let bonus = bonus::Entity::find()
      .filter(bonus::Column::PromoCode.eq(code.trim()))
      .one(self.db)
      .await?;
    Ok(bonus)
  }

  /// Oldest account of the client, legacy data may hold several
  pub async fn by_client(&self, client_id: i64) -> Result<Option<bonus::Model>> {
    let bonus = bonus::Entity::find()
      .filter(bonus::Column::ClientId.eq(client_id))
      .order_by_asc(bonus::Column::Id)
      .one(self.db)
      .await?;
    Ok(bonus)
  }

  pub async fn grant(
    &self,
    client_id: i64,
    amount: i64,
    code: Option<&str>,
  ) -> Result<bonus::Model> {
    if amount <= 0 {
      return Err(Error::InvalidArgs("Bonus amount must be positive".into()));
    }

    if client::Entity::find_by_id(client_id).one(self.db).await?.is_none() {
      return Err(Error::ClientNotFound);
    }

    if let Some(existing) = self.by_client(client_id).await? {
      bonus::Entity::update_many()
        .col_expr(
          bonus::Column::Amount,
          Expr::col(bonus::Column::Amount).add(amount),
        )
        .filter(bonus::Column::Id.eq(existing.id))
        .exec(self.db)
        .await?;

      info!("Granted {amount} bonus to {client_id} (account {})", existing.id);
      return self.by_id(existing.id).await?.ok_or(Error::BonusNotFound);
    }

    let code = match code.map(str::trim).filter(|c| !c.is_empty()) {
      Some(code) => {
        if self.by_code(code).await?.is_some() {
          return Err(Error::CodeTaken(code.to_string()));
        }
        code.to_string()
      }
      None => sv::Promo::new(self.db).generate_unique().await?,
    };

    let bonus = bonus::ActiveModel {
      id: NotSet,
      client_id: Set(client_id),
      amount: Set(amount),
      promo_code: Set(code),
      is_claimed: Set(false),
      claimed_at: Set(None),
      created_at: Set(Utc::now().naive_utc()),
    }
    .insert(self.db)
    .await?;

    info!(
      "Opened bonus account {} for {client_id}: {amount} with code {}",
      bonus.id, bonus.promo_code
    );
    Ok(bonus)
  }

  /// Not atomic: clients granted before a failure keep their bonus
  pub async fn grant_to_all(
    &self,
    amount: i64,
    code: Option<&str>,
  ) -> Result<BatchReport> {
    if amount <= 0 {
      return Err(Error::InvalidArgs("Bonus amount must be positive".into()));
    }

    let clients = sv::Client::new(self.db).ids().await?;

    let mut report = BatchReport::default();
    for client_id in clients {
      match self.grant(client_id, amount, code).await {
        Ok(_) => report.succeeded += 1,
        Err(err) => {
          warn!("Bulk grant to {client_id} failed: {err}");
          report.failed += 1;
        }
      }
    }

    info!(
      "Bulk grant of {amount}: {} succeeded, {} failed",
      report.succeeded, report.failed
    );
    Ok(report)
  }

  /// Welcome bonus for a freshly registered client, if enabled
  pub async fn grant_welcome(
    &self,
    client_id: i64,
  ) -> Result<Option<bonus::Model>> {
    let settings = sv::Settings::new(self.db);
    if !settings.get_bool(settings::DEFAULT_BONUS_ENABLED).await? {
      return Ok(None);
    }

    let amount =
      settings.get_i64(settings::DEFAULT_BONUS_AMOUNT).await?.unwrap_or(0);
    if amount <= 0 {
      return Ok(None);
    }

    self.grant(client_id, amount, None).await.map(Some)
  }

  pub async fn redeem_by_code(
    &self,
    code: &str,
    amount: i64,
    phone: Option<&str>,
  ) -> Result<Redeemed> {
    if amount <= 0 {
      return Err(Error::InvalidArgs("Redeem amount must be positive".into()));
    }

    let txn = self.db.begin().await?;

    let bonus = bonus::Entity::find()
      .filter(bonus::Column::PromoCode.eq(code.trim()))
      .one(&txn)
      .await?
      .ok_or(Error::CodeNotFound)?;

    let deducted = amount.min(bonus.amount);
    let remaining = bonus.amount - deducted;
    let now = Utc::now().naive_utc();

    let bonus = bonus::ActiveModel { amount: Set(remaining), ..bonus.into() }
      .update(&txn)
      .await?;

    redemption::ActiveModel {
      id: NotSet,
      bonus_id: Set(bonus.id),
      amount: Set(deducted),
      created_at: Set(now),
    }
    .insert(&txn)
    .await?;

    if let Some(phone) = phone.map(str::trim).filter(|p| !p.is_empty()) {
      sv::Client::set_phone(&txn, bonus.client_id, phone).await?;
    }

    txn.commit().await?;

    sv::Settings::new(self.db)
      .add_i64(settings::TOTAL_REDEEMED, deducted)
      .await?;

    info!(
      "Redeemed {deducted}/{amount} from {} ({} left)",
      bonus.promo_code, remaining
    );

    Ok(Redeemed {
      bonus_id: bonus.id,
      client_id: bonus.client_id,
      code: bonus.promo_code,
      requested: amount,
      deducted,
      remaining,
    })
  }

  /// `None` when the client never had a bonus account
  pub async fn balance(&self, client_id: i64) -> Result<Option<i64>> {
    let balance: Option<Option<i64>> = bonus::Entity::find()
      .select_only()
      .column_as(bonus::Column::Amount.sum(), "balance")
      .filter(bonus::Column::ClientId.eq(client_id))
      .into_tuple()
      .one(self.db)
      .await?;
    Ok(balance.flatten())
  }

  /// Sum of everything ever redeemed from the client's accounts
  pub async fn claimed_total(&self, client_id: i64) -> Result<i64> {
    let total: Option<Option<i64>> = redemption::Entity::find()
      .inner_join(bonus::Entity)
      .select_only()
      .column_as(redemption::Column::Amount.sum(), "total")
      .filter(bonus::Column::ClientId.eq(client_id))
      .into_tuple()
      .one(self.db)
      .await?;
    Ok(total.flatten().unwrap_or(0))
  }

  pub async fn redemption_history(
    &self,
    client_id: i64,
    limit: u64,
  ) -> Result<Vec<redemption::Model>> {
    let history = redemption::Entity::find()
      .inner_join(bonus::Entity)
      .filter(bonus::Column::ClientId.eq(client_id))
      .order_by_desc(redemption::Column::CreatedAt)
      .order_by_desc(redemption::Column::Id)
      .limit(limit)
      .all(self.db)
      .await?;
    Ok(history)
  }

  /// Legacy single-claim flow over the same rows
  pub async fn claim(&self, client_id: i64) -> Result<Option<String>> {
    let txn = self.db.begin().await?;

    let Some(bonus) = bonus::Entity::find()
      .filter(bonus::Column::ClientId.eq(client_id))
      .filter(bonus::Column::IsClaimed.eq(false))
      .order_by_asc(bonus::Column::CreatedAt)
      .order_by_asc(bonus::Column::Id)
      .one(&txn)
      .await?
    else {
      return Ok(None);
    };

    let bonus = bonus::ActiveModel {
      is_claimed: Set(true),
      claimed_at: Set(Some(Utc::now().naive_utc())),
      ..bonus.into()
    }
    .update(&txn)
    .await?;

    txn.commit().await?;

    info!("Client {client_id} claimed bonus code {}", bonus.promo_code);
    Ok(Some(bonus.promo_code))
  }

  pub async fn last_claimed_code(&self, client_id: i64) -> Result<Option<String>> {
    let bonus = bonus::Entity::find()
      .filter(bonus::Column::ClientId.eq(client_id))
      .filter(bonus::Column::IsClaimed.eq(true))
      .order_by_desc(bonus::Column::ClaimedAt)
      .one(self.db)
      .await?;
    Ok(bonus.map(|b| b.promo_code))
  }

  pub async fn all_with_clients(
    &self,
  ) -> Result<Vec<(bonus::Model, Option<client::Model>)>> {
    let bonuses = bonus::Entity::find()
      .find_also_related(client::Entity)
      .order_by_desc(bonus::Column::CreatedAt)
      .all(self.db)
      .await?;
    Ok(bonuses)
  }

  pub async fn update_code(
    &self,
    bonus_id: i32,
    code: &str,
  ) -> Result<bonus::Model> {
    let code = code.trim();
    if code.is_empty() {
      return Err(Error::InvalidArgs("Promo code must not be empty".into()));
    }

    let bonus = self.by_id(bonus_id).await?.ok_or(Error::BonusNotFound)?;
    if let Some(holder) = self.by_code(code).await?
      && holder.id != bonus_id
    {
      return Err(Error::CodeTaken(code.to_string()));
    }

    let bonus =
      bonus::ActiveModel { promo_code: Set(code.to_string()), ..bonus.into() }
        .update(self.db)
        .await?;
    Ok(bonus)
  }

  /// Redemption records go with the account
  pub async fn delete(&self, bonus_id: i32) -> Result<()> {
    let res = bonus::Entity::delete_by_id(bonus_id).exec(self.db).await?;
    if res.rows_affected == 0 {
      return Err(Error::BonusNotFound);
    }
    Ok(())
  }

  pub async fn stats(&self) -> Result<BonusStats> {
    let total_balance: Option<Option<i64>> = bonus::Entity::find()
      .select_only()
      .column_as(bonus::Column::Amount.sum(), "total")
      .into_tuple()
      .one(self.db)
      .await?;

    let records = bonus::Entity::find().count(self.db).await?;
    let claimed = bonus::Entity::find()
      .filter(bonus::Column::IsClaimed.eq(true))
      .count(self.db)
      .await?;
    let clients = bonus::Entity::find()
      .select_only()
      .column(bonus::Column::ClientId)
      .distinct()
      .count(self.db)
      .await?;

    let total_redeemed = sv::Settings::new(self.db)
      .get_i64(settings::TOTAL_REDEEMED)
      .await?
      .unwrap_or(0);

    Ok(BonusStats {
      total_balance: total_balance.flatten().unwrap_or(0),
      records,
      claimed,
      clients,
      total_redeemed,
    })
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use super::*;
  use crate::sv::testing::{client, setup_db};

  #[tokio::test]
  async fn grant_opens_then_accumulates() {
    let db = setup_db().await;
    client(&db, 1).await;
    let sv = Bonus::new(&db);

    let first = sv.grant(1, 100, Some("SUNSHINE")).await.unwrap();
    let second = sv.grant(1, 50, Some("IGNORED")).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.amount, 150);
    assert_eq!(second.promo_code, "SUNSHINE");
    assert_eq!(bonus::Entity::find().count(&db).await.unwrap(), 1);
    assert_eq!(sv.balance(1).await.unwrap(), Some(150));
  }

  #[tokio::test]
  async fn grant_rejects_unknown_client_and_bad_amount() {
    let db = setup_db().await;
    let sv = Bonus::new(&db);

    assert!(matches!(sv.grant(42, 10, None).await, Err(Error::ClientNotFound)));

    client(&db, 42).await;
    assert!(matches!(sv.grant(42, 0, None).await, Err(Error::InvalidArgs(_))));
    assert!(matches!(sv.grant(42, -5, None).await, Err(Error::InvalidArgs(_))));
    assert_eq!(sv.balance(42).await.unwrap(), None);
  }

  #[tokio::test]
  async fn explicit_code_must_be_free() {
    let db = setup_db().await;
    client(&db, 1).await;
    client(&db, 2).await;
    let sv = Bonus::new(&db);

    sv.grant(1, 10, Some("HONEY")).await.unwrap();
    let err = sv.grant(2, 10, Some("HONEY")).await.unwrap_err();
    assert!(matches!(err, Error::CodeTaken(code) if code == "HONEY"));
  }

  #[tokio::test]
  async fn generated_codes_are_distinct() {
    let db = setup_db().await;
    let sv = Bonus::new(&db);

    let mut codes = HashSet::new();
    for id in 1..=20 {
      client(&db, id).await;
      let bonus = sv.grant(id, 5, None).await.unwrap();
      codes.insert(bonus.promo_code);
    }

    assert_eq!(codes.len(), 20);
  }

  #[tokio::test]
  async fn grant_to_all_reports_partial_failure() {
    let db = setup_db().await;
    for id in 1..=3 {
      client(&db, id).await;
    }
    let sv = Bonus::new(&db);

    // a shared explicit code can only open one new account
    let report = sv.grant_to_all(20, Some("SHARED")).await.unwrap();
    assert_eq!(report, BatchReport { succeeded: 1, failed: 2 });

    let report = sv.grant_to_all(20, None).await.unwrap();
    assert_eq!(report, BatchReport { succeeded: 3, failed: 0 });

    let mut total = 0;
    for id in 1..=3 {
      total += sv.balance(id).await.unwrap().unwrap();
    }
    assert_eq!(total, 40 + 20 + 20);
  }

  #[tokio::test]
  async fn welcome_bonus_follows_settings() {
    let db = setup_db().await;
    let settings = sv::Settings::new(&db);
    settings.seed_defaults(100).await.unwrap();
    client(&db, 1).await;
    client(&db, 2).await;
    let sv = Bonus::new(&db);

    let bonus = sv.grant_welcome(1).await.unwrap().unwrap();
    assert_eq!(bonus.amount, 100);
    assert!(!bonus.promo_code.is_empty());
    assert_eq!(sv.balance(1).await.unwrap(), Some(100));

    settings.set(settings::DEFAULT_BONUS_ENABLED, "0").await.unwrap();
    assert!(sv.grant_welcome(2).await.unwrap().is_none());
    assert_eq!(sv.balance(2).await.unwrap(), None);
  }

  #[tokio::test]
  async fn redeem_partial_amount() {
    let db = setup_db().await;
    client(&db, 1).await;
    let sv = Bonus::new(&db);
    sv.grant(1, 100, Some("SUNSHINE")).await.unwrap();

    let redeemed = sv.redeem_by_code("SUNSHINE", 30, None).await.unwrap();

    assert_eq!(redeemed.deducted, 30);
    assert_eq!(redeemed.remaining, 70);
    assert_eq!(sv.balance(1).await.unwrap(), Some(70));

    let history = sv.redemption_history(1, HISTORY_LIMIT).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].amount, 30);

    let total = sv::Settings::new(&db)
      .get_i64(settings::TOTAL_REDEEMED)
      .await
      .unwrap();
    assert_eq!(total, Some(30));
  }

  #[tokio::test]
  async fn redeem_caps_at_balance() {
    let db = setup_db().await;
    client(&db, 1).await;
    let sv = Bonus::new(&db);
    sv.grant(1, 40, Some("HONEY")).await.unwrap();

    let redeemed = sv.redeem_by_code("HONEY", 100, None).await.unwrap();
    assert_eq!(redeemed.deducted, 40);
    assert_eq!(redeemed.remaining, 0);

    // exhausted balance deducts zero, it is not an error
    let again = sv.redeem_by_code("HONEY", 10, None).await.unwrap();
    assert_eq!(again.deducted, 0);
    assert_eq!(sv.balance(1).await.unwrap(), Some(0));

    let history = sv.redemption_history(1, HISTORY_LIMIT).await.unwrap();
    assert_eq!(history.iter().map(|r| r.amount).collect::<Vec<_>>(), [0, 40]);
    assert_eq!(sv.claimed_total(1).await.unwrap(), 40);
  }

  #[tokio::test]
  async fn redeem_unknown_code() {
    let db = setup_db().await;
    let sv = Bonus::new(&db);

    assert!(matches!(
      sv.redeem_by_code("NOPE", 10, None).await,
      Err(Error::CodeNotFound)
    ));
    assert!(matches!(
      sv.redeem_by_code("NOPE", 0, None).await,
      Err(Error::InvalidArgs(_))
    ));
  }

  #[tokio::test]
  async fn redeem_stamps_phone() {
    let db = setup_db().await;
    client(&db, 1).await;
    let sv = Bonus::new(&db);
    sv.grant(1, 10, Some("DAISY")).await.unwrap();

    sv.redeem_by_code(" DAISY ", 5, Some("+10000000000")).await.unwrap();

    let client = client::Entity::find_by_id(1).one(&db).await.unwrap().unwrap();
    assert_eq!(client.phone.as_deref(), Some("+10000000000"));
  }

  #[tokio::test]
  async fn balance_never_negative() {
    let db = setup_db().await;
    client(&db, 1).await;
    let sv = Bonus::new(&db);
    sv.grant(1, 25, Some("ZEST")).await.unwrap();

    for amount in [10, 50, 1, 7] {
      sv.redeem_by_code("ZEST", amount, None).await.unwrap();
      assert!(sv.balance(1).await.unwrap().unwrap() >= 0);
    }
    sv.grant(1, 3, None).await.unwrap();
    assert_eq!(sv.balance(1).await.unwrap(), Some(3));
  }

  #[tokio::test]
  async fn history_is_limited_and_newest_first() {
    let db = setup_db().await;
    client(&db, 1).await;
    let sv = Bonus::new(&db);
    sv.grant(1, 1000, Some("MELODY")).await.unwrap();

    for amount in 1..=12 {
      sv.redeem_by_code("MELODY", amount, None).await.unwrap();
    }

    let history = sv.redemption_history(1, HISTORY_LIMIT).await.unwrap();
    assert_eq!(history.len(), 10);
    assert_eq!(history[0].amount, 12);
    assert_eq!(sv.claimed_total(1).await.unwrap(), (1..=12).sum::<i64>());
  }

  #[tokio::test]
  async fn legacy_claim_marks_once() {
    let db = setup_db().await;
    client(&db, 1).await;
    let sv = Bonus::new(&db);

    assert_eq!(sv.claim(1).await.unwrap(), None);

    sv.grant(1, 10, Some("TULIP")).await.unwrap();
    assert_eq!(sv.claim(1).await.unwrap().as_deref(), Some("TULIP"));
    assert_eq!(sv.claim(1).await.unwrap(), None);
    assert_eq!(sv.last_claimed_code(1).await.unwrap().as_deref(), Some("TULIP"));
  }

  #[tokio::test]
  async fn update_code_and_delete() {
    let db = setup_db().await;
    client(&db, 1).await;
    client(&db, 2).await;
    let sv = Bonus::new(&db);
    let a = sv.grant(1, 10, Some("AURORA")).await.unwrap();
    sv.grant(2, 10, Some("BREEZE")).await.unwrap();

    assert!(matches!(
      sv.update_code(a.id, "BREEZE").await,
      Err(Error::CodeTaken(_))
    ));
    let a = sv.update_code(a.id, "CARAMEL").await.unwrap();
    assert_eq!(a.promo_code, "CARAMEL");

    sv.redeem_by_code("CARAMEL", 4, None).await.unwrap();
    sv.delete(a.id).await.unwrap();
    assert_eq!(redemption::Entity::find().count(&db).await.unwrap(), 0);
    assert!(matches!(sv.delete(a.id).await, Err(Error::BonusNotFound)));
  }

  #[tokio::test]
  async fn stats_aggregate() {
    let db = setup_db().await;
    client(&db, 1).await;
    client(&db, 2).await;
    let sv = Bonus::new(&db);
    sv.grant(1, 100, Some("SUNNY")).await.unwrap();
    sv.grant(2, 50, Some("LUCKY")).await.unwrap();
    sv.claim(2).await.unwrap();
    sv.redeem_by_code("SUNNY", 30, None).await.unwrap();

    let stats = sv.stats().await.unwrap();
    assert_eq!(
      stats,
      BonusStats {
        total_balance: 120,
        records: 2,
        claimed: 1,
        clients: 2,
        total_redeemed: 30,
      }
    );
  }
}
