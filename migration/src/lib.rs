//! Schema migrations for the loyalty store

pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_clients;
mod m20260301_000002_create_settings;
mod m20260301_000003_create_bonuses;
mod m20260301_000004_create_redemptions;
mod m20260301_000005_create_promotions;
mod m20260301_000006_create_feedback;
mod m20260301_000007_create_mailings;
mod m20260312_000008_create_giveaways;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20260301_000001_create_clients::Migration),
      Box::new(m20260301_000002_create_settings::Migration),
      Box::new(m20260301_000003_create_bonuses::Migration),
      Box::new(m20260301_000004_create_redemptions::Migration),
      Box::new(m20260301_000005_create_promotions::Migration),
      Box::new(m20260301_000006_create_feedback::Migration),
      Box::new(m20260301_000007_create_mailings::Migration),
      Box::new(m20260312_000008_create_giveaways::Migration),
    ]
  }
}
