//! Redemption - append-only audit of deductions from a bonus account

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::bonus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "redemptions")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub bonus_id: i32,
  pub amount: i64,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "bonus::Entity",
    from = "Column::BonusId",
    to = "bonus::Column::Id",
    on_delete = "Cascade"
  )]
  Bonus,
}

impl Related<bonus::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Bonus.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
