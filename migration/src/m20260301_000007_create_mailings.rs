use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Mailings::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Mailings::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Mailings::Text).text().not_null())
          .col(ColumnDef::new(Mailings::PhotoPath).string().null())
          .col(ColumnDef::new(Mailings::ButtonText).string().null())
          .col(ColumnDef::new(Mailings::ButtonUrl).string().null())
          .col(
            ColumnDef::new(Mailings::Target).string().not_null().default("all"),
          )
          .col(ColumnDef::new(Mailings::Recipients).json().null())
          .col(
            ColumnDef::new(Mailings::Status)
              .string()
              .not_null()
              .default("draft"),
          )
          .col(
            ColumnDef::new(Mailings::SentTotal).integer().not_null().default(0),
          )
          .col(ColumnDef::new(Mailings::SentOk).integer().not_null().default(0))
          .col(
            ColumnDef::new(Mailings::SentFail).integer().not_null().default(0),
          )
          .col(ColumnDef::new(Mailings::SentAt).date_time().null())
          .col(ColumnDef::new(Mailings::CreatedAt).date_time().not_null())
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Mailings::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Mailings {
  Table,
  Id,
  Text,
  PhotoPath,
  ButtonText,
  ButtonUrl,
  Target,
  Recipients,
  Status,
  SentTotal,
  SentOk,
  SentFail,
  SentAt,
  CreatedAt,
}
