use serde::Deserialize;

use crate::{
  entity::{client, feedback},
  prelude::*,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackFilter {
  #[default]
  All,
  Replied,
  Unreplied,
}

pub struct Feedback<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Feedback<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn save(&self, client_id: i64, text: &str) -> Result<feedback::Model> {
    let text = text.trim();
    if text.is_empty() {
      return Err(Error::InvalidArgs("Feedback must not be empty".into()));
    }
    if client::Entity::find_by_id(client_id).one(self.db).await?.is_none() {
      return Err(Error::ClientNotFound);
    }

    let feedback = feedback::ActiveModel {
      id: NotSet,
      client_id: Set(client_id),
      message_text: Set(text.to_string()),
      admin_reply: Set(None),
      is_replied: Set(false),
      created_at: Set(Utc::now().naive_utc()),
      replied_at: Set(None),
    }
    .insert(self.db)
    .await?;

    info!("Feedback {} from {client_id}", feedback.id);
    Ok(feedback)
  }

  pub async fn by_id(&self, feedback_id: i32) -> Result<Option<feedback::Model>> {
    Ok(feedback::Entity::find_by_id(feedback_id).one(self.db).await?)
  }

  /// Newest first, with the author attached
  pub async fn all(
    &self,
    filter: FeedbackFilter,
  ) -> Result<Vec<(feedback::Model, Option<client::Model>)>> {
    let mut query =
      feedback::Entity::find().order_by_desc(feedback::Column::CreatedAt);

    query = match filter {
      FeedbackFilter::All => query,
      FeedbackFilter::Replied => {
        query.filter(feedback::Column::IsReplied.eq(true))
      }
      FeedbackFilter::Unreplied => {
        query.filter(feedback::Column::IsReplied.eq(false))
      }
    };

    let rows = query
      .order_by_desc(feedback::Column::Id)
      .find_also_related(client::Entity)
      .all(self.db)
      .await?;
    Ok(rows)
  }

  /// Stores the reply, a later reply overwrites it. Returns the message so
  /// the caller can notify its author.
  pub async fn reply(
    &self,
    feedback_id: i32,
    text: &str,
  ) -> Result<feedback::Model> {
    let text = text.trim();
    if text.is_empty() {
      return Err(Error::InvalidArgs("Reply must not be empty".into()));
    }
    let feedback = self.by_id(feedback_id).await?.ok_or(Error::FeedbackNotFound)?;

    let feedback = feedback::ActiveModel {
      admin_reply: Set(Some(text.to_string())),
      is_replied: Set(true),
      replied_at: Set(Some(Utc::now().naive_utc())),
      ..feedback.into()
    }
    .update(self.db)
    .await?;
    Ok(feedback)
  }

  pub async fn delete(&self, feedback_id: i32) -> Result<()> {
    let res = feedback::Entity::delete_by_id(feedback_id).exec(self.db).await?;
    if res.rows_affected == 0 {
      return Err(Error::FeedbackNotFound);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::testing::{client, setup_db};

  #[tokio::test]
  async fn save_and_filter() {
    let db = setup_db().await;
    client(&db, 1).await;
    let sv = Feedback::new(&db);

    let first = sv.save(1, "Coffee was cold").await.unwrap();
    sv.save(1, "Great service").await.unwrap();
    sv.reply(first.id, "Sorry, fixed!").await.unwrap();

    assert_eq!(sv.all(FeedbackFilter::All).await.unwrap().len(), 2);

    let replied = sv.all(FeedbackFilter::Replied).await.unwrap();
    assert_eq!(replied.len(), 1);
    assert_eq!(replied[0].0.id, first.id);
    assert_eq!(replied[0].1.as_ref().map(|c| c.tg_user_id), Some(1));

    let unreplied = sv.all(FeedbackFilter::Unreplied).await.unwrap();
    assert_eq!(unreplied[0].0.message_text, "Great service");
  }

  #[tokio::test]
  async fn reply_can_be_overwritten() {
    let db = setup_db().await;
    client(&db, 1).await;
    let sv = Feedback::new(&db);
    let msg = sv.save(1, "Where is my bonus?").await.unwrap();

    sv.reply(msg.id, "Checking").await.unwrap();
    let msg = sv.reply(msg.id, "Granted").await.unwrap();

    assert!(msg.is_replied);
    assert_eq!(msg.admin_reply.as_deref(), Some("Granted"));
    assert_eq!(msg.client_id, 1);
  }

  #[tokio::test]
  async fn rejects_bad_input() {
    let db = setup_db().await;
    let sv = Feedback::new(&db);

    assert!(matches!(sv.save(1, "hi").await, Err(Error::ClientNotFound)));
    assert!(matches!(sv.save(1, "  ").await, Err(Error::InvalidArgs(_))));
    assert!(matches!(sv.reply(5, "ok").await, Err(Error::FeedbackNotFound)));
    assert!(matches!(sv.delete(5).await, Err(Error::FeedbackNotFound)));
  }
}
