use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Clients::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Clients::TgUserId)
              .big_integer()
              .not_null()
              .primary_key(),
          )
          .col(ColumnDef::new(Clients::FirstName).string().null())
          .col(ColumnDef::new(Clients::LastName).string().null())
          .col(ColumnDef::new(Clients::Username).string().null())
          .col(ColumnDef::new(Clients::LanguageCode).string().null())
          .col(ColumnDef::new(Clients::Phone).string().null())
          .col(ColumnDef::new(Clients::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Clients::UpdatedAt).date_time().not_null())
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Clients::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Clients {
  Table,
  TgUserId,
  FirstName,
  LastName,
  Username,
  LanguageCode,
  Phone,
  CreatedAt,
  UpdatedAt,
}
