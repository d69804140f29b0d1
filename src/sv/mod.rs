pub mod bonus;
pub mod captcha;
pub mod client;
pub mod feedback;
pub mod giveaway;
pub mod mailing;
pub mod messenger;
pub mod promo;
pub mod promotion;
pub mod settings;

pub use bonus::Bonus;
pub use client::Client;
pub use feedback::Feedback;
pub use giveaway::Giveaway;
pub use mailing::Mailing;
pub use promo::Promo;
pub use promotion::Promotion;
pub use settings::Settings;

#[cfg(test)]
pub(crate) mod testing {
  use sea_orm::ConnectOptions;

  use crate::{entity::client, prelude::*};

  pub async fn setup_db() -> DatabaseConnection {
    // a single connection keeps the in-memory database alive
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opts).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
  }

  /// Inserts a bare client, bypassing registration side effects
  pub async fn client(db: &DatabaseConnection, tg_user_id: i64) -> client::Model {
    let now = Utc::now().naive_utc();
    client::ActiveModel {
      tg_user_id: Set(tg_user_id),
      first_name: Set(Some(format!("user{tg_user_id}"))),
      last_name: Set(None),
      username: Set(None),
      language_code: Set(None),
      phone: Set(None),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
  }
}
