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
          .table(FeedbackMessages::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(FeedbackMessages::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(
            ColumnDef::new(FeedbackMessages::ClientId).big_integer().not_null(),
          )
          .col(ColumnDef::new(FeedbackMessages::MessageText).text().not_null())
          .col(ColumnDef::new(FeedbackMessages::AdminReply).text().null())
          .col(
            ColumnDef::new(FeedbackMessages::IsReplied)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(
            ColumnDef::new(FeedbackMessages::CreatedAt).date_time().not_null(),
          )
          .col(ColumnDef::new(FeedbackMessages::RepliedAt).date_time().null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_feedback_client")
              .from(FeedbackMessages::Table, FeedbackMessages::ClientId)
              .to(Clients::Table, Clients::TgUserId)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(FeedbackMessages::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum FeedbackMessages {
  Table,
  Id,
  ClientId,
  MessageText,
  AdminReply,
  IsReplied,
  CreatedAt,
  RepliedAt,
}
