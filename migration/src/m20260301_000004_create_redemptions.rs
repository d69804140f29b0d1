use sea_orm_migration::prelude::*;

use super::m20260301_000003_create_bonuses::Bonuses;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Redemptions::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Redemptions::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Redemptions::BonusId).integer().not_null())
          .col(ColumnDef::new(Redemptions::Amount).big_integer().not_null())
          .col(ColumnDef::new(Redemptions::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_redemptions_bonus")
              .from(Redemptions::Table, Redemptions::BonusId)
              .to(Bonuses::Table, Bonuses::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_redemptions_bonus")
          .table(Redemptions::Table)
          .col(Redemptions::BonusId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(Redemptions::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum Redemptions {
  Table,
  Id,
  BonusId,
  Amount,
  CreatedAt,
}
