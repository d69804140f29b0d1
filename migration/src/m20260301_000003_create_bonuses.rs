use sea_orm_migration::prelude::*;

use super::m20260301_000001_create_clients::Clients;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Bonuses::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Bonuses::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Bonuses::ClientId).big_integer().not_null())
          .col(
            ColumnDef::new(Bonuses::Amount)
              .big_integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(Bonuses::PromoCode).string().not_null().unique_key(),
          )
          .col(
            ColumnDef::new(Bonuses::IsClaimed)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(ColumnDef::new(Bonuses::ClaimedAt).date_time().null())
          .col(ColumnDef::new(Bonuses::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_bonuses_client")
              .from(Bonuses::Table, Bonuses::ClientId)
              .to(Clients::Table, Clients::TgUserId)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_bonuses_client")
          .table(Bonuses::Table)
          .col(Bonuses::ClientId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Bonuses::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Bonuses {
  Table,
  Id,
  ClientId,
  Amount,
  PromoCode,
  IsClaimed,
  ClaimedAt,
  CreatedAt,
}
