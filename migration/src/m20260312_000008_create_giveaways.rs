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
          .table(Giveaways::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Giveaways::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Giveaways::Title).string().not_null())
          .col(ColumnDef::new(Giveaways::Description).text().not_null())
          .col(
            ColumnDef::new(Giveaways::WinnerCount)
              .integer()
              .not_null()
              .default(1),
          )
          .col(ColumnDef::new(Giveaways::EndTime).date_time().not_null())
          .col(ColumnDef::new(Giveaways::Code).string().not_null().unique_key())
          .col(
            ColumnDef::new(Giveaways::Status)
              .string()
              .not_null()
              .default("active"),
          )
          .col(ColumnDef::new(Giveaways::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Giveaways::FinishedAt).date_time().null())
          .to_owned(),
      )
      .await?;

    // participants and winners share the same shape
    for (table, name) in [
      (GiveawayParticipants::Table.into_iden(), "participants"),
      (GiveawayWinners::Table.into_iden(), "winners"),
    ] {
      manager
        .create_table(
          Table::create()
            .table(table.clone())
            .if_not_exists()
            .col(
              ColumnDef::new(Entry::Id)
                .integer()
                .not_null()
                .auto_increment()
                .primary_key(),
            )
            .col(ColumnDef::new(Entry::GiveawayId).integer().not_null())
            .col(ColumnDef::new(Entry::ClientId).big_integer().not_null())
            .col(ColumnDef::new(Entry::CreatedAt).date_time().not_null())
            .foreign_key(
              ForeignKey::create()
                .name(format!("fk_giveaway_{name}_giveaway"))
                .from(table.clone(), Entry::GiveawayId)
                .to(Giveaways::Table, Giveaways::Id)
                .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
              ForeignKey::create()
                .name(format!("fk_giveaway_{name}_client"))
                .from(table.clone(), Entry::ClientId)
                .to(Clients::Table, Clients::TgUserId)
                .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned(),
        )
        .await?;

      manager
        .create_index(
          Index::create()
            .name(format!("idx_giveaway_{name}_pair"))
            .table(table)
            .col(Entry::GiveawayId)
            .col(Entry::ClientId)
            .unique()
            .to_owned(),
        )
        .await?;
    }

    Ok(())
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(GiveawayWinners::Table).to_owned())
      .await?;
    manager
      .drop_table(Table::drop().table(GiveawayParticipants::Table).to_owned())
      .await?;
    manager.drop_table(Table::drop().table(Giveaways::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Giveaways {
  Table,
  Id,
  Title,
  Description,
  WinnerCount,
  EndTime,
  Code,
  Status,
  CreatedAt,
  FinishedAt,
}

#[derive(DeriveIden)]
pub enum GiveawayParticipants {
  Table,
}

#[derive(DeriveIden)]
pub enum GiveawayWinners {
  Table,
}

#[derive(DeriveIden)]
enum Entry {
  Id,
  GiveawayId,
  ClientId,
  CreatedAt,
}
