use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{client, giveaway};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "giveaway_participants")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub giveaway_id: i32,
  pub client_id: i64,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "giveaway::Entity",
    from = "Column::GiveawayId",
    to = "giveaway::Column::Id",
    on_delete = "Cascade"
  )]
  Giveaway,
  #[sea_orm(
    belongs_to = "client::Entity",
    from = "Column::ClientId",
    to = "client::Column::TgUserId",
    on_delete = "Cascade"
  )]
  Client,
}

impl Related<giveaway::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Giveaway.def()
  }
}

impl Related<client::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Client.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
