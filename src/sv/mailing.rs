//! Mailings: drafts, recipient selection and sequential broadcast

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
  entity::{MailingStatus, MailingTarget, bonus, mailing, redemption},
  prelude::*,
  sv::{
    self,
    messenger::{Button, Messenger},
  },
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Draft {
  pub text: String,
  pub photo_path: Option<String>,
  pub button_text: Option<String>,
  pub button_url: Option<String>,
  #[serde(default)]
  pub target: MailingTarget,
  pub recipients: Option<Vec<i64>>,
}

impl Draft {
  fn validate(&self) -> Result<()> {
    if self.text.trim().is_empty() {
      return Err(Error::InvalidArgs("Mailing text must not be empty".into()));
    }
    if self.button_text.is_some() != self.button_url.is_some() {
      return Err(Error::InvalidArgs(
        "Button needs both a caption and a url".into(),
      ));
    }
    if self.target == MailingTarget::Clients
      && self.recipients.as_ref().is_none_or(|ids| ids.is_empty())
    {
      return Err(Error::InvalidArgs("No recipients selected".into()));
    }
    Ok(())
  }

  fn recipients_json(&self) -> Option<json::Value> {
    match self.target {
      MailingTarget::Clients => {
        self.recipients.as_ref().map(|ids| json::json!(ids))
      }
      _ => None,
    }
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
  pub total: i32,
  pub ok: i32,
  pub fail: i32,
}

pub struct Mailing<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Mailing<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn create(&self, draft: Draft) -> Result<mailing::Model> {
    draft.validate()?;

    let mailing = mailing::ActiveModel {
      id: NotSet,
      recipients: Set(draft.recipients_json()),
      text: Set(draft.text),
      photo_path: Set(draft.photo_path),
      button_text: Set(draft.button_text),
      button_url: Set(draft.button_url),
      target: Set(draft.target),
      status: Set(MailingStatus::Draft),
      sent_total: Set(0),
      sent_ok: Set(0),
      sent_fail: Set(0),
      sent_at: Set(None),
      created_at: Set(Utc::now().naive_utc()),
    }
    .insert(self.db)
    .await?;

    info!("Created mailing {}", mailing.id);
    Ok(mailing)
  }

  pub async fn update(
    &self,
    mailing_id: i32,
    draft: Draft,
  ) -> Result<mailing::Model> {
    draft.validate()?;
    let mailing = self.draft(mailing_id).await?;

    let mailing = mailing::ActiveModel {
      recipients: Set(draft.recipients_json()),
      text: Set(draft.text),
      photo_path: Set(draft.photo_path),
      button_text: Set(draft.button_text),
      button_url: Set(draft.button_url),
      target: Set(draft.target),
      ..mailing.into()
    }
    .update(self.db)
    .await?;
    Ok(mailing)
  }

  pub async fn by_id(&self, mailing_id: i32) -> Result<Option<mailing::Model>> {
    Ok(mailing::Entity::find_by_id(mailing_id).one(self.db).await?)
  }

  pub async fn all(&self) -> Result<Vec<mailing::Model>> {
    let mailings = mailing::Entity::find()
      .order_by_desc(mailing::Column::CreatedAt)
      .order_by_desc(mailing::Column::Id)
      .all(self.db)
      .await?;
    Ok(mailings)
  }

  pub async fn delete(&self, mailing_id: i32) -> Result<()> {
    let res = mailing::Entity::delete_by_id(mailing_id).exec(self.db).await?;
    if res.rows_affected == 0 {
      return Err(Error::MailingNotFound);
    }
    Ok(())
  }

  /// Chat ids the mailing goes to, in registration order
  pub async fn recipients(&self, mailing: &mailing::Model) -> Result<Vec<i64>> {
    let ids = match mailing.target {
      MailingTarget::Clients => mailing.recipient_ids(),
      MailingTarget::All => sv::Client::new(self.db).ids().await?,
      MailingTarget::NoRedemptions => {
        let redeemed: HashSet<i64> = redemption::Entity::find()
          .inner_join(bonus::Entity)
          .select_only()
          .column(bonus::Column::ClientId)
          .distinct()
          .into_tuple::<i64>()
          .all(self.db)
          .await?
          .into_iter()
          .collect();

        sv::Client::new(self.db)
          .ids()
          .await?
          .into_iter()
          .filter(|id| !redeemed.contains(id))
          .collect()
      }
    };
    Ok(ids)
  }

  /// Closes a draft or an in-flight mailing with its delivery counters
  pub async fn mark_sent(
    &self,
    mailing_id: i32,
    report: DeliveryReport,
  ) -> Result<mailing::Model> {
    let mailing = self.by_id(mailing_id).await?.ok_or(Error::MailingNotFound)?;
    if mailing.status == MailingStatus::Sent {
      return Err(Error::MailingSent);
    }

    let mailing = mailing::ActiveModel {
      status: Set(MailingStatus::Sent),
      sent_total: Set(report.total),
      sent_ok: Set(report.ok),
      sent_fail: Set(report.fail),
      sent_at: Set(Some(Utc::now().naive_utc())),
      ..mailing.into()
    }
    .update(self.db)
    .await?;
    Ok(mailing)
  }

  /// Moves a draft to `sending`, only one caller can win the flip
  async fn start_sending(&self, mailing_id: i32) -> Result<()> {
    let res = mailing::Entity::update_many()
      .set(mailing::ActiveModel {
        status: Set(MailingStatus::Sending),
        ..Default::default()
      })
      .filter(mailing::Column::Id.eq(mailing_id))
      .filter(mailing::Column::Status.eq(MailingStatus::Draft))
      .exec(self.db)
      .await?;

    if res.rows_affected == 0 {
      return Err(Error::MailingSent);
    }
    Ok(())
  }

  /// Sends to every recipient one by one. Failed deliveries are counted
  /// and never abort the run.
  pub async fn broadcast(
    &self,
    mailing_id: i32,
    messenger: &dyn Messenger,
    delay: Duration,
  ) -> Result<DeliveryReport> {
    let mailing = self.draft(mailing_id).await?;
    let recipients = self.recipients(&mailing).await?;
    self.start_sending(mailing_id).await?;
    let button = mailing.button().map(|(text, url)| Button::new(text, url));

    info!("Broadcasting mailing {mailing_id} to {} chats", recipients.len());

    let mut report = DeliveryReport::default();
    for (i, chat_id) in recipients.into_iter().enumerate() {
      if i > 0 && !delay.is_zero() {
        time::sleep(delay).await;
      }

      let sent = match &mailing.photo_path {
        Some(photo) => {
          messenger
            .send_photo(chat_id, photo, &mailing.text, button.as_ref())
            .await
        }
        None => {
          messenger.send_text(chat_id, &mailing.text, button.as_ref()).await
        }
      };

      report.total += 1;
      match sent {
        Ok(()) => report.ok += 1,
        Err(err) => {
          warn!("Mailing {mailing_id} to {chat_id} failed: {err:#}");
          report.fail += 1;
        }
      }
    }

    self.mark_sent(mailing_id, report).await?;
    info!(
      "Mailing {mailing_id} done: {}/{} delivered",
      report.ok, report.total
    );
    Ok(report)
  }

  /// Mailing that can still be edited or sent
  async fn draft(&self, mailing_id: i32) -> Result<mailing::Model> {
    let mailing = self.by_id(mailing_id).await?.ok_or(Error::MailingNotFound)?;
    if mailing.status != MailingStatus::Draft {
      return Err(Error::MailingSent);
    }
    Ok(mailing)
  }
}
