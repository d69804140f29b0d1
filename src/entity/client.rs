use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{bonus, feedback};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "clients")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub tg_user_id: i64,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub username: Option<String>,
  pub language_code: Option<String>,
  pub phone: Option<String>,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

impl Model {
  pub fn display_name(&self) -> String {
    match (&self.first_name, &self.last_name, &self.username) {
      (Some(first), Some(last), _) => format!("{first} {last}"),
      (Some(first), None, _) => first.clone(),
      (None, _, Some(username)) => format!("@{username}"),
      _ => self.tg_user_id.to_string(),
    }
  }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "bonus::Entity")]
  Bonuses,
  #[sea_orm(has_many = "feedback::Entity")]
  Feedback,
}

impl Related<bonus::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Bonuses.def()
  }
}

impl Related<feedback::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Feedback.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
