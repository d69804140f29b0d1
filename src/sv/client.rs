use sea_orm::sea_query::OnConflict;
use serde::Serialize;

use crate::{
  entity::{bonus, client},
  prelude::*,
  sv,
};

/// Profile as reported by the chat platform on every contact
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
  pub tg_user_id: i64,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub username: Option<String>,
  pub language_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientBalance {
  #[serde(flatten)]
  pub client: client::Model,
  pub balance: i64,
  pub promo_code: Option<String>,
}

pub struct Client<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Client<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Creates the client on first contact and refreshes the profile
  /// afterwards. A new client receives the welcome bonus.
  pub async fn register(
    &self,
    profile: Profile,
  ) -> Result<(client::Model, bool)> {
    let now = Utc::now().naive_utc();
    let id = profile.tg_user_id;

    let inserted = client::Entity::insert(client::ActiveModel {
      tg_user_id: Set(id),
      first_name: Set(profile.first_name.clone()),
      last_name: Set(profile.last_name.clone()),
      username: Set(profile.username.clone()),
      language_code: Set(profile.language_code.clone()),
      phone: Set(None),
      created_at: Set(now),
      updated_at: Set(now),
    })
    .on_conflict(
      OnConflict::column(client::Column::TgUserId).do_nothing().to_owned(),
    )
    .exec_without_returning(self.db)
    .await?;

    let is_new = inserted > 0;
    if is_new {
      info!("Registered client {id}");
      if let Err(err) = sv::Bonus::new(self.db).grant_welcome(id).await {
        warn!("Welcome bonus for {id} failed: {err}");
      }
    } else {
      client::Entity::update_many()
        .set(client::ActiveModel {
          first_name: Set(profile.first_name),
          last_name: Set(profile.last_name),
          username: Set(profile.username),
          language_code: Set(profile.language_code),
          updated_at: Set(now),
          ..Default::default()
        })
        .filter(client::Column::TgUserId.eq(id))
        .exec(self.db)
        .await?;
    }

    let client = self.by_id(id).await?.ok_or_else(|| {
      Error::Internal(format!("client {id} missing right after upsert"))
    })?;
    Ok((client, is_new))
  }

  pub async fn by_id(&self, tg_user_id: i64) -> Result<Option<client::Model>> {
    Ok(client::Entity::find_by_id(tg_user_id).one(self.db).await?)
  }

  /// Newest first
  pub async fn all_with_balances(&self) -> Result<Vec<ClientBalance>> {
    let rows = client::Entity::find()
      .order_by_desc(client::Column::CreatedAt)
      .find_with_related(bonus::Entity)
      .all(self.db)
      .await?;

    let clients = rows
      .into_iter()
      .map(|(client, bonuses)| ClientBalance {
        balance: bonuses.iter().map(|b| b.amount).sum(),
        promo_code: bonuses
          .into_iter()
          .min_by_key(|b| b.id)
          .map(|b| b.promo_code),
        client,
      })
      .collect();
    Ok(clients)
  }

  /// Every client id in registration order
  pub async fn ids(&self) -> Result<Vec<i64>> {
    let ids = client::Entity::find()
      .select_only()
      .column(client::Column::TgUserId)
      .order_by_asc(client::Column::CreatedAt)
      .order_by_asc(client::Column::TgUserId)
      .into_tuple()
      .all(self.db)
      .await?;
    Ok(ids)
  }

  /// Runs on any connection so redemptions can stamp inside their txn
  pub async fn set_phone<C: ConnectionTrait>(
    conn: &C,
    tg_user_id: i64,
    phone: &str,
  ) -> Result<()> {
    let res = client::Entity::update_many()
      .set(client::ActiveModel {
        phone: Set(Some(phone.trim().to_string())),
        updated_at: Set(Utc::now().naive_utc()),
        ..Default::default()
      })
      .filter(client::Column::TgUserId.eq(tg_user_id))
      .exec(conn)
      .await?;
    if res.rows_affected == 0 {
      return Err(Error::ClientNotFound);
    }
    Ok(())
  }

  pub async fn count(&self) -> Result<u64> {
    Ok(client::Entity::find().count(self.db).await?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::{settings, testing::setup_db};

  fn profile(id: i64, first_name: &str) -> Profile {
    Profile {
      tg_user_id: id,
      first_name: Some(first_name.into()),
      username: Some(format!("{}_tg", first_name.to_lowercase())),
      ..Default::default()
    }
  }

  #[tokio::test]
  async fn register_is_an_upsert() {
    let db = setup_db().await;
    let sv = Client::new(&db);

    let (client, is_new) = sv.register(profile(7, "Anna")).await.unwrap();
    assert!(is_new);
    assert_eq!(client.display_name(), "Anna");

    let (client, is_new) = sv.register(profile(7, "Anya")).await.unwrap();
    assert!(!is_new);
    assert_eq!(client.first_name.as_deref(), Some("Anya"));
    assert_eq!(sv.count().await.unwrap(), 1);
  }

  #[tokio::test]
  async fn welcome_bonus_only_on_first_contact() {
    let db = setup_db().await;
    sv::Settings::new(&db).seed_defaults(100).await.unwrap();
    let sv = Client::new(&db);
    let bonuses = sv::Bonus::new(&db);

    sv.register(profile(1, "Ivan")).await.unwrap();
    assert_eq!(bonuses.balance(1).await.unwrap(), Some(100));

    sv.register(profile(1, "Ivan")).await.unwrap();
    assert_eq!(bonuses.balance(1).await.unwrap(), Some(100));
  }

  #[tokio::test]
  async fn disabled_welcome_bonus() {
    let db = setup_db().await;
    let settings = sv::Settings::new(&db);
    settings.seed_defaults(100).await.unwrap();
    settings.set(settings::DEFAULT_BONUS_AMOUNT, "0").await.unwrap();

    Client::new(&db).register(profile(1, "Olga")).await.unwrap();
    assert_eq!(sv::Bonus::new(&db).balance(1).await.unwrap(), None);
  }

  #[tokio::test]
  async fn balances_and_phone() {
    let db = setup_db().await;
    let sv = Client::new(&db);
    sv.register(profile(1, "Petr")).await.unwrap();
    sv.register(profile(2, "Maria")).await.unwrap();
    sv::Bonus::new(&db).grant(2, 70, Some("HONEY")).await.unwrap();

    let rows = sv.all_with_balances().await.unwrap();
    assert_eq!(rows.len(), 2);
    let maria = rows.iter().find(|r| r.client.tg_user_id == 2).unwrap();
    assert_eq!(maria.balance, 70);
    assert_eq!(maria.promo_code.as_deref(), Some("HONEY"));

    Client::set_phone(&db, 1, " +123 ").await.unwrap();
    let client = sv.by_id(1).await.unwrap().unwrap();
    assert_eq!(client.phone.as_deref(), Some("+123"));
    assert!(matches!(
      Client::set_phone(&db, 9, "1").await,
      Err(Error::ClientNotFound)
    ));

    let ids = sv.ids().await.unwrap();
    assert_eq!(ids, [1, 2]);
  }
}
