//! Giveaway engine
//!
//! A giveaway is `active` until it is finished, then winners are drawn
//! from its participants once. Entry goes through a deep link and the
//! captcha gate in [`super::captcha`].

use rand::{Rng, seq::SliceRandom};
use sea_orm::sea_query::OnConflict;
use serde::Deserialize;

use crate::{
  entity::{GiveawayStatus, client, giveaway, participant, winner},
  prelude::*,
};

pub const CODE_LEN: usize = 8;
pub const CODE_ATTEMPTS: usize = 10;
pub const DEEP_LINK_PREFIX: &str = "gw_";
const CODE_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

pub fn random_code<R: Rng + ?Sized>(rng: &mut R) -> String {
  (0..CODE_LEN)
    .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
    .collect()
}

/// Extracts the giveaway code from a `/start` parameter
pub fn parse_deep_link(param: &str) -> Option<&str> {
  param.strip_prefix(DEEP_LINK_PREFIX).filter(|code| !code.is_empty())
}

pub fn invite_url(bot_username: &str, giveaway: &giveaway::Model) -> String {
  format!("https://t.me/{bot_username}?start={}", giveaway.deep_link())
}

/// Uniform draw without replacement, order of the result is random
pub fn draw<R: Rng + ?Sized>(
  rng: &mut R,
  participants: &[i64],
  count: usize,
) -> Vec<i64> {
  participants.choose_multiple(rng, count).copied().collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewGiveaway {
  pub title: String,
  #[serde(default)]
  pub description: String,
  pub winner_count: i32,
  pub end_time: DateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
  /// Client may solve the captcha and join
  Open(giveaway::Model),
  AlreadyEntered(giveaway::Model),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
  Joined(giveaway::Model),
  AlreadyEntered(giveaway::Model),
}

pub struct Giveaway<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Giveaway<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn create(&self, new: NewGiveaway) -> Result<giveaway::Model> {
    let codes: Vec<String> = {
      let mut rng = rand::thread_rng();
      (0..CODE_ATTEMPTS).map(|_| random_code(&mut rng)).collect()
    };
    self.create_with_codes(new, codes).await
  }

  /// Takes the first candidate code that is not in use yet
  pub async fn create_with_codes(
    &self,
    new: NewGiveaway,
    codes: impl IntoIterator<Item = String>,
  ) -> Result<giveaway::Model> {
    let title = new.title.trim();
    if title.is_empty() {
      return Err(Error::InvalidArgs("Giveaway title must not be empty".into()));
    }
    if new.winner_count < 1 {
      return Err(Error::InvalidArgs("There must be at least one winner".into()));
    }

    let mut code = None;
    for candidate in codes.into_iter().take(CODE_ATTEMPTS) {
      if self.by_code(&candidate).await?.is_none() {
        code = Some(candidate);
        break;
      }
      debug!("Giveaway code {candidate} collided, retrying");
    }
    let code = code.ok_or(Error::CodeSpaceExhausted)?;

    let giveaway = giveaway::ActiveModel {
      id: NotSet,
      title: Set(title.to_string()),
      description: Set(new.description.trim().to_string()),
      winner_count: Set(new.winner_count),
      end_time: Set(new.end_time),
      code: Set(code),
      status: Set(GiveawayStatus::Active),
      created_at: Set(Utc::now().naive_utc()),
      finished_at: Set(None),
    }
    .insert(self.db)
    .await?;

    info!(
      "Created giveaway {} `{}` ({} winners, ends {})",
      giveaway.id, giveaway.title, giveaway.winner_count, giveaway.end_time
    );
    Ok(giveaway)
  }

  pub async fn by_id(&self, giveaway_id: i32) -> Result<Option<giveaway::Model>> {
    Ok(giveaway::Entity::find_by_id(giveaway_id).one(self.db).await?)
  }

  pub async fn by_code(&self, code: &str) -> Result<Option<giveaway::Model>> {
    let giveaway = giveaway::Entity::find()
      .filter(giveaway::Column::Code.eq(code))
      .one(self.db)
      .await?;
    Ok(giveaway)
  }

  pub async fn all(&self) -> Result<Vec<giveaway::Model>> {
    let giveaways = giveaway::Entity::find()
      .order_by_desc(giveaway::Column::CreatedAt)
      .order_by_desc(giveaway::Column::Id)
      .all(self.db)
      .await?;
    Ok(giveaways)
  }

  /// Active giveaways whose end time has passed
  pub async fn expired(&self, now: DateTime) -> Result<Vec<giveaway::Model>> {
    let giveaways = giveaway::Entity::find()
      .filter(giveaway::Column::Status.eq(GiveawayStatus::Active))
      .filter(giveaway::Column::EndTime.lte(now))
      .order_by_asc(giveaway::Column::EndTime)
      .all(self.db)
      .await?;
    Ok(giveaways)
  }

  pub async fn is_participant(
    &self,
    giveaway_id: i32,
    client_id: i64,
  ) -> Result<bool> {
    let count = participant::Entity::find()
      .filter(participant::Column::GiveawayId.eq(giveaway_id))
      .filter(participant::Column::ClientId.eq(client_id))
      .count(self.db)
      .await?;
    Ok(count > 0)
  }

  pub async fn check_entry(&self, code: &str, client_id: i64) -> Result<Admission> {
    let giveaway = self.by_code(code).await?.ok_or(Error::GiveawayNotFound)?;
    if !giveaway.is_active() {
      return Err(Error::GiveawayFinished);
    }

    if self.is_participant(giveaway.id, client_id).await? {
      Ok(Admission::AlreadyEntered(giveaway))
    } else {
      Ok(Admission::Open(giveaway))
    }
  }

  /// Returns whether a new participant row was created
  pub async fn register(&self, giveaway_id: i32, client_id: i64) -> Result<bool> {
    let giveaway = self.by_id(giveaway_id).await?.ok_or(Error::GiveawayNotFound)?;
    if !giveaway.is_active() {
      return Err(Error::GiveawayFinished);
    }
    if client::Entity::find_by_id(client_id).one(self.db).await?.is_none() {
      return Err(Error::ClientNotFound);
    }

    let res = participant::Entity::insert(participant::ActiveModel {
      id: NotSet,
      giveaway_id: Set(giveaway_id),
      client_id: Set(client_id),
      created_at: Set(Utc::now().naive_utc()),
    })
    .on_conflict(
      OnConflict::columns([
        participant::Column::GiveawayId,
        participant::Column::ClientId,
      ])
      .do_nothing()
      .to_owned(),
    )
    .exec_without_returning(self.db)
    .await?;

    let joined = res > 0;
    if joined {
      info!("Client {client_id} joined giveaway {giveaway_id}");
    }
    Ok(joined)
  }

  pub async fn enter(&self, code: &str, client_id: i64) -> Result<Entry> {
    match self.check_entry(code, client_id).await? {
      Admission::AlreadyEntered(giveaway) => Ok(Entry::AlreadyEntered(giveaway)),
      Admission::Open(giveaway) => {
        if self.register(giveaway.id, client_id).await? {
          Ok(Entry::Joined(giveaway))
        } else {
          Ok(Entry::AlreadyEntered(giveaway))
        }
      }
    }
  }

  /// Flips the giveaway to `finished` and draws its winners. A giveaway
  /// that is already finished yields no winners.
  pub async fn finish(&self, giveaway_id: i32) -> Result<Vec<i64>> {
    let txn = self.db.begin().await?;

    let giveaway = giveaway::Entity::find_by_id(giveaway_id)
      .one(&txn)
      .await?
      .ok_or(Error::GiveawayNotFound)?;

    let now = Utc::now().naive_utc();
    let flipped = giveaway::Entity::update_many()
      .set(giveaway::ActiveModel {
        status: Set(GiveawayStatus::Finished),
        finished_at: Set(Some(now)),
        ..Default::default()
      })
      .filter(giveaway::Column::Id.eq(giveaway_id))
      .filter(giveaway::Column::Status.eq(GiveawayStatus::Active))
      .exec(&txn)
      .await?;

    if flipped.rows_affected == 0 {
      txn.commit().await?;
      debug!("Giveaway {giveaway_id} was already finished");
      return Ok(Vec::new());
    }

    let participants: Vec<i64> = participant::Entity::find()
      .select_only()
      .column(participant::Column::ClientId)
      .filter(participant::Column::GiveawayId.eq(giveaway_id))
      .order_by_asc(participant::Column::Id)
      .into_tuple()
      .all(&txn)
      .await?;

    let count = usize::try_from(giveaway.winner_count).unwrap_or(0);
    let winners = draw(&mut rand::thread_rng(), &participants, count);

    if !winners.is_empty() {
      winner::Entity::insert_many(winners.iter().map(|&client_id| {
        winner::ActiveModel {
          id: NotSet,
          giveaway_id: Set(giveaway_id),
          client_id: Set(client_id),
          created_at: Set(now),
        }
      }))
      .exec_without_returning(&txn)
      .await?;
    }

    txn.commit().await?;

    info!(
      "Finished giveaway {giveaway_id}: {} winners out of {} participants",
      winners.len(),
      participants.len()
    );
    Ok(winners)
  }

  /// Finishes every expired giveaway, returns each with its winners
  pub async fn finish_expired(
    &self,
    now: DateTime,
  ) -> Result<Vec<(giveaway::Model, Vec<i64>)>> {
    let expired = self.expired(now).await?;
    Ok(self.finish_each(expired).await)
  }

  /// A failure is logged and skipped, the rest still get finished
  pub async fn finish_each(
    &self,
    giveaways: impl IntoIterator<Item = giveaway::Model>,
  ) -> Vec<(giveaway::Model, Vec<i64>)> {
    let mut finished = Vec::new();
    for giveaway in giveaways {
      match self.finish(giveaway.id).await {
        Ok(winners) => finished.push((giveaway, winners)),
        Err(err) => {
          error!("Failed to finish giveaway {}: {err}", giveaway.id);
        }
      }
    }
    finished
  }

  /// Participants in entry order
  pub async fn participants(&self, giveaway_id: i32) -> Result<Vec<client::Model>> {
    let rows = participant::Entity::find()
      .filter(participant::Column::GiveawayId.eq(giveaway_id))
      .order_by_asc(participant::Column::Id)
      .find_also_related(client::Entity)
      .all(self.db)
      .await?;
    Ok(rows.into_iter().filter_map(|(_, client)| client).collect())
  }

  pub async fn winners(&self, giveaway_id: i32) -> Result<Vec<client::Model>> {
    let rows = winner::Entity::find()
      .filter(winner::Column::GiveawayId.eq(giveaway_id))
      .order_by_asc(winner::Column::Id)
      .find_also_related(client::Entity)
      .all(self.db)
      .await?;
    Ok(rows.into_iter().filter_map(|(_, client)| client).collect())
  }

  pub async fn participant_count(&self, giveaway_id: i32) -> Result<u64> {
    let count = participant::Entity::find()
      .filter(participant::Column::GiveawayId.eq(giveaway_id))
      .count(self.db)
      .await?;
    Ok(count)
  }

  /// Participants and winners go with it
  pub async fn delete(&self, giveaway_id: i32) -> Result<()> {
    let res = giveaway::Entity::delete_by_id(giveaway_id).exec(self.db).await?;
    if res.rows_affected == 0 {
      return Err(Error::GiveawayNotFound);
    }
    info!("Deleted giveaway {giveaway_id}");
    Ok(())
  }
}
