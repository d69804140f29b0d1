//! Bonus account - running balance of a client with its promo code

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{client, redemption};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bonuses")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub client_id: i64,
  /// Never negative
  pub amount: i64,
  #[sea_orm(unique)]
  pub promo_code: String,
  pub is_claimed: bool,
  pub claimed_at: Option<DateTime>,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "client::Entity",
    from = "Column::ClientId",
    to = "client::Column::TgUserId",
    on_delete = "Cascade"
  )]
  Client,
  #[sea_orm(has_many = "redemption::Entity")]
  Redemptions,
}

impl Related<client::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Client.def()
  }
}

impl Related<redemption::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Redemptions.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
