//! Giveaway - deep-link addressable draw, `active` until finished

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{participant, winner};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum GiveawayStatus {
  #[sea_orm(string_value = "active")]
  #[default]
  Active,
  #[sea_orm(string_value = "finished")]
  Finished,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "giveaways")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub title: String,
  #[sea_orm(column_type = "Text")]
  pub description: String,
  pub winner_count: i32,
  pub end_time: DateTime,
  #[sea_orm(unique)]
  pub code: String,
  pub status: GiveawayStatus,
  pub created_at: DateTime,
  pub finished_at: Option<DateTime>,
}

impl Model {
  pub fn is_active(&self) -> bool {
    self.status == GiveawayStatus::Active
  }

  /// Start parameter that routes `/start` into this giveaway
  pub fn deep_link(&self) -> String {
    format!("gw_{}", self.code)
  }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "participant::Entity")]
  Participants,
  #[sea_orm(has_many = "winner::Entity")]
  Winners,
}

impl Related<participant::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Participants.def()
  }
}

impl Related<winner::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Winners.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
