use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::client;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "feedback_messages")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub client_id: i64,
  #[sea_orm(column_type = "Text")]
  pub message_text: String,
  #[sea_orm(column_type = "Text", nullable)]
  pub admin_reply: Option<String>,
  pub is_replied: bool,
  pub created_at: DateTime,
  pub replied_at: Option<DateTime>,
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
}

impl Related<client::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Client.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
