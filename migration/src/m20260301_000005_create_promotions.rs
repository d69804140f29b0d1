use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Promotions::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Promotions::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Promotions::Title).string().not_null())
          .col(ColumnDef::new(Promotions::Description).text().not_null())
          .col(ColumnDef::new(Promotions::PhotoPath).string().null())
          .col(ColumnDef::new(Promotions::StartDate).date().null())
          .col(ColumnDef::new(Promotions::EndDate).date().null())
          .col(
            ColumnDef::new(Promotions::IsPerpetual)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(
            ColumnDef::new(Promotions::IsActive)
              .boolean()
              .not_null()
              .default(true),
          )
          .col(ColumnDef::new(Promotions::CreatedAt).date_time().not_null())
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(Promotions::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum Promotions {
  Table,
  Id,
  Title,
  Description,
  PhotoPath,
  StartDate,
  EndDate,
  IsPerpetual,
  IsActive,
  CreatedAt,
}
