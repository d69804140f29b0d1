use serde::Deserialize;

use crate::{entity::promotion, prelude::*};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPromotion {
  pub title: String,
  #[serde(default)]
  pub description: String,
  pub photo_path: Option<String>,
  pub start_date: Option<Date>,
  pub end_date: Option<Date>,
  #[serde(default)]
  pub is_perpetual: bool,
  #[serde(default = "default_active")]
  pub is_active: bool,
}

fn default_active() -> bool {
  true
}

impl NewPromotion {
  fn validate(&self) -> Result<()> {
    if self.title.trim().is_empty() {
      return Err(Error::InvalidArgs("Promotion title must not be empty".into()));
    }
    if let (Some(start), Some(end)) = (self.start_date, self.end_date)
      && start > end
    {
      return Err(Error::InvalidArgs(format!(
        "Promotion ends ({end}) before it starts ({start})"
      )));
    }
    if !self.is_perpetual && self.start_date.is_none() && self.end_date.is_none()
    {
      return Err(Error::InvalidArgs(
        "Promotion needs a date range or the perpetual flag".into(),
      ));
    }
    Ok(())
  }
}

pub struct Promotion<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Promotion<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn create(&self, new: NewPromotion) -> Result<promotion::Model> {
    new.validate()?;

    let promotion = promotion::ActiveModel {
      id: NotSet,
      title: Set(new.title.trim().to_string()),
      description: Set(new.description),
      photo_path: Set(new.photo_path),
      start_date: Set(new.start_date),
      end_date: Set(new.end_date),
      is_perpetual: Set(new.is_perpetual),
      is_active: Set(new.is_active),
      created_at: Set(Utc::now().naive_utc()),
    }
    .insert(self.db)
    .await?;

    info!("Created promotion {} `{}`", promotion.id, promotion.title);
    Ok(promotion)
  }

  pub async fn update(
    &self,
    promotion_id: i32,
    new: NewPromotion,
  ) -> Result<promotion::Model> {
    new.validate()?;
    let promotion =
      self.by_id(promotion_id).await?.ok_or(Error::PromotionNotFound)?;

    let promotion = promotion::ActiveModel {
      title: Set(new.title.trim().to_string()),
      description: Set(new.description),
      photo_path: Set(new.photo_path),
      start_date: Set(new.start_date),
      end_date: Set(new.end_date),
      is_perpetual: Set(new.is_perpetual),
      is_active: Set(new.is_active),
      ..promotion.into()
    }
    .update(self.db)
    .await?;
    Ok(promotion)
  }

  pub async fn by_id(&self, promotion_id: i32) -> Result<Option<promotion::Model>> {
    Ok(promotion::Entity::find_by_id(promotion_id).one(self.db).await?)
  }

  pub async fn all(&self) -> Result<Vec<promotion::Model>> {
    let promotions = promotion::Entity::find()
      .order_by_desc(promotion::Column::CreatedAt)
      .order_by_desc(promotion::Column::Id)
      .all(self.db)
      .await?;
    Ok(promotions)
  }

  /// What end users see on `today`
  pub async fn visible(&self, today: Date) -> Result<Vec<promotion::Model>> {
    let promotions = promotion::Entity::find()
      .filter(promotion::Column::IsActive.eq(true))
      .order_by_desc(promotion::Column::CreatedAt)
      .order_by_desc(promotion::Column::Id)
      .all(self.db)
      .await?;
    Ok(promotions.into_iter().filter(|p| p.is_visible(today)).collect())
  }

  pub async fn toggle(&self, promotion_id: i32) -> Result<promotion::Model> {
    let promotion =
      self.by_id(promotion_id).await?.ok_or(Error::PromotionNotFound)?;
    let is_active = !promotion.is_active;

    let promotion =
      promotion::ActiveModel { is_active: Set(is_active), ..promotion.into() }
        .update(self.db)
        .await?;
    Ok(promotion)
  }

  pub async fn delete(&self, promotion_id: i32) -> Result<()> {
    let res =
      promotion::Entity::delete_by_id(promotion_id).exec(self.db).await?;
    if res.rows_affected == 0 {
      return Err(Error::PromotionNotFound);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::testing::setup_db;

  fn day(d: u32) -> Date {
    Date::from_ymd_opt(2026, 6, d).unwrap()
  }

  fn ranged(title: &str, start: u32, end: u32) -> NewPromotion {
    NewPromotion {
      title: title.into(),
      start_date: Some(day(start)),
      end_date: Some(day(end)),
      is_active: true,
      ..Default::default()
    }
  }

  #[test]
  fn visibility_predicate() {
    let model = |start, end, perpetual, active| promotion::Model {
      id: 1,
      title: "Sale".into(),
      description: String::new(),
      photo_path: None,
      start_date: start,
      end_date: end,
      is_perpetual: perpetual,
      is_active: active,
      created_at: Utc::now().naive_utc(),
    };

    let today = day(15);
    assert!(model(Some(day(10)), Some(day(20)), false, true).is_visible(today));
    assert!(model(Some(day(15)), Some(day(15)), false, true).is_visible(today));
    assert!(!model(Some(day(16)), Some(day(20)), false, true).is_visible(today));
    assert!(!model(Some(day(1)), Some(day(14)), false, true).is_visible(today));
    assert!(model(Some(day(1)), Some(day(14)), true, true).is_visible(today));
    assert!(model(None, None, true, true).is_visible(today));
    assert!(!model(None, None, true, false).is_visible(today));
  }

  #[tokio::test]
  async fn visible_hides_out_of_range() {
    let db = setup_db().await;
    let sv = Promotion::new(&db);

    let current = sv.create(ranged("Current", 10, 20)).await.unwrap();
    sv.create(ranged("Past", 1, 5)).await.unwrap();
    let forever = sv
      .create(NewPromotion {
        title: "Forever".into(),
        is_perpetual: true,
        is_active: true,
        ..Default::default()
      })
      .await
      .unwrap();

    let mut ids: Vec<_> =
      sv.visible(day(15)).await.unwrap().iter().map(|p| p.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, [current.id, forever.id]);

    sv.toggle(forever.id).await.unwrap();
    let ids: Vec<_> =
      sv.visible(day(15)).await.unwrap().iter().map(|p| p.id).collect();
    assert_eq!(ids, [current.id]);
  }

  #[tokio::test]
  async fn rejects_bad_ranges() {
    let db = setup_db().await;
    let sv = Promotion::new(&db);

    assert!(matches!(
      sv.create(ranged("Backwards", 20, 10)).await,
      Err(Error::InvalidArgs(_))
    ));
    assert!(matches!(
      sv.create(NewPromotion { title: "Undated".into(), ..Default::default() })
        .await,
      Err(Error::InvalidArgs(_))
    ));
    assert!(matches!(
      sv.update(404, ranged("Missing", 1, 2)).await,
      Err(Error::PromotionNotFound)
    ));
  }

  #[tokio::test]
  async fn update_and_delete() {
    let db = setup_db().await;
    let sv = Promotion::new(&db);
    let promo = sv.create(ranged("Old", 1, 2)).await.unwrap();

    let promo = sv.update(promo.id, ranged("New", 3, 4)).await.unwrap();
    assert_eq!(promo.title, "New");
    assert_eq!(promo.start_date, Some(day(3)));

    sv.delete(promo.id).await.unwrap();
    assert!(sv.all().await.unwrap().is_empty());
    assert!(matches!(sv.delete(promo.id).await, Err(Error::PromotionNotFound)));
  }
}
