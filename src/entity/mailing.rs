//! Mailing - broadcast draft and its delivery counters

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum MailingStatus {
  #[sea_orm(string_value = "draft")]
  #[default]
  Draft,
  /// Delivery in progress, no longer editable
  #[sea_orm(string_value = "sending")]
  Sending,
  #[sea_orm(string_value = "sent")]
  Sent,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum MailingTarget {
  #[sea_orm(string_value = "all")]
  #[default]
  All,
  /// Clients that never redeemed anything
  #[sea_orm(string_value = "no_redemptions")]
  NoRedemptions,
  /// Explicit list stored in `recipients`
  #[sea_orm(string_value = "clients")]
  Clients,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "mailings")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  #[sea_orm(column_type = "Text")]
  pub text: String,
  pub photo_path: Option<String>,
  pub button_text: Option<String>,
  pub button_url: Option<String>,
  pub target: MailingTarget,
  /// json array of telegram ids
  pub recipients: Option<Json>,
  pub status: MailingStatus,
  pub sent_total: i32,
  pub sent_ok: i32,
  pub sent_fail: i32,
  pub sent_at: Option<DateTime>,
  pub created_at: DateTime,
}

impl Model {
  pub fn recipient_ids(&self) -> Vec<i64> {
    self
      .recipients
      .as_ref()
      .and_then(|value| json::from_value(value.clone()).ok())
      .unwrap_or_default()
  }

  pub fn button(&self) -> Option<(&str, &str)> {
    match (&self.button_text, &self.button_url) {
      (Some(text), Some(url)) => Some((text, url)),
      _ => None,
    }
  }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
