use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "promotions")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub title: String,
  #[sea_orm(column_type = "Text")]
  pub description: String,
  pub photo_path: Option<String>,
  pub start_date: Option<Date>,
  pub end_date: Option<Date>,
  /// Perpetual promotions ignore the date range
  pub is_perpetual: bool,
  pub is_active: bool,
  pub created_at: DateTime,
}

impl Model {
  pub fn is_visible(&self, today: Date) -> bool {
    if !self.is_active {
      return false;
    }
    if self.is_perpetual {
      return true;
    }
    match (self.start_date, self.end_date) {
      (Some(start), Some(end)) => start <= today && today <= end,
      (Some(start), None) => start <= today,
      (None, Some(end)) => today <= end,
      (None, None) => false,
    }
  }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
