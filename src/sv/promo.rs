//! Promo code generator
//!
//! Codes are drawn from a list of friendly words first, then from
//! `WORD + NN` combinations, and finally from a random `BONUS-XXXXXX`
//! code. Only the first two tiers are checked against existing codes.

use rand::{Rng, seq::SliceRandom};

use crate::{entity::bonus, prelude::*};

pub const WORDS: &[&str] = &[
  "SUNSHINE", "RAINBOW", "BLOSSOM", "HARMONY", "DELIGHT", "SPARKLE",
  "TREASURE", "BRIGHT", "CHEERFUL", "GOLDEN", "LUCKY", "HAPPY", "SMILE",
  "WONDER", "BLISS", "CHARM", "DREAM", "GLORY", "JOYFUL", "MAGIC", "SUNNY",
  "STARLIGHT", "COMFORT", "KINDNESS", "FORTUNE", "VICTORY", "CELEBRATE",
  "GRATITUDE", "SWEETNESS", "FRIENDSHIP", "MIRACLE", "SERENITY", "BRAVO",
  "AMAZING", "BRILLIANT", "CRYSTAL", "DIAMOND", "EMERALD", "FESTIVE",
  "GENTLE", "HONEY", "JASMINE", "LAUGHTER", "MELODY", "ORCHID", "PARADISE",
  "RADIANT", "SPLENDID", "SUMMER", "TULIP", "VELVET", "WARMTH", "ZEST",
  "AURORA", "BREEZE", "CARAMEL", "DAISY", "FIREFLY", "HORIZON", "SAPPHIRE",
];

const SUFFIX_ATTEMPTS: usize = 100;
const FALLBACK_PREFIX: &str = "BONUS-";
const FALLBACK_LEN: usize = 6;
const FALLBACK_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub fn shuffled_words<R: Rng + ?Sized>(rng: &mut R) -> Vec<&'static str> {
  let mut words = WORDS.to_vec();
  words.shuffle(rng);
  words
}

pub fn suffixed_candidates<R: Rng + ?Sized>(
  rng: &mut R,
  count: usize,
) -> Vec<String> {
  let mut codes = Vec::with_capacity(count);
  for _ in 0..count {
    if let Some(word) = WORDS.choose(rng) {
      codes.push(format!("{word}{}", rng.gen_range(10..=99)));
    }
  }
  codes
}

pub fn random_code<R: Rng + ?Sized>(rng: &mut R) -> String {
  let tail: String = (0..FALLBACK_LEN)
    .map(|_| FALLBACK_CHARSET[rng.gen_range(0..FALLBACK_CHARSET.len())] as char)
    .collect();
  format!("{FALLBACK_PREFIX}{tail}")
}

pub struct Promo<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Promo<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn is_taken(&self, code: &str) -> Result<bool> {
    let count = bonus::Entity::find()
      .filter(bonus::Column::PromoCode.eq(code))
      .count(self.db)
      .await?;
    Ok(count > 0)
  }

  pub async fn generate_unique(&self) -> Result<String> {
    // thread rng is not Send, so every candidate is drawn up front
    let (words, suffixed, fallback) = {
      let mut rng = rand::thread_rng();
      (
        shuffled_words(&mut rng),
        suffixed_candidates(&mut rng, SUFFIX_ATTEMPTS),
        random_code(&mut rng),
      )
    };
    self.first_free(&words, suffixed, fallback).await
  }

  /// Walks the tiers in order, `fallback` is returned unchecked
  pub async fn first_free(
    &self,
    words: &[&str],
    suffixed: Vec<String>,
    fallback: String,
  ) -> Result<String> {
    for &word in words {
      if !self.is_taken(word).await? {
        return Ok(word.to_string());
      }
    }

    for code in suffixed {
      if !self.is_taken(&code).await? {
        return Ok(code);
      }
    }

    // not checked for uniqueness, see DESIGN.md
    warn!("Promo vocabulary exhausted, issuing random code {fallback}");
    Ok(fallback)
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use rand::{SeedableRng, rngs::StdRng};

  use super::*;
  use crate::sv::testing::{client, setup_db};

  async fn insert_code(db: &DatabaseConnection, client_id: i64, code: &str) {
    bonus::ActiveModel {
      id: NotSet,
      client_id: Set(client_id),
      amount: Set(0),
      promo_code: Set(code.to_string()),
      is_claimed: Set(false),
      claimed_at: Set(None),
      created_at: Set(Utc::now().naive_utc()),
    }
    .insert(db)
    .await
    .unwrap();
  }

  #[test]
  fn vocabulary_has_no_duplicates() {
    let unique: HashSet<_> = WORDS.iter().collect();
    assert_eq!(unique.len(), WORDS.len());
    assert!(WORDS.iter().all(|w| w.chars().all(|c| c.is_ascii_uppercase())));
  }

  #[test]
  fn shuffle_keeps_every_word() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut words = shuffled_words(&mut rng);
    words.sort_unstable();

    let mut expected = WORDS.to_vec();
    expected.sort_unstable();
    assert_eq!(words, expected);
  }

  #[test]
  fn suffixed_codes_have_two_digits() {
    let mut rng = StdRng::seed_from_u64(1);
    for code in suffixed_candidates(&mut rng, 50) {
      let (word, digits) = code.split_at(code.len() - 2);
      assert!(WORDS.contains(&word));
      let n: u32 = digits.parse().unwrap();
      assert!((10..=99).contains(&n));
    }
  }

  #[test]
  fn fallback_code_format() {
    let mut rng = StdRng::seed_from_u64(3);
    let code = random_code(&mut rng);
    assert!(code.starts_with("BONUS-"));
    assert_eq!(code.len(), FALLBACK_PREFIX.len() + FALLBACK_LEN);
    assert!(
      code[FALLBACK_PREFIX.len()..]
        .bytes()
        .all(|b| FALLBACK_CHARSET.contains(&b))
    );
  }

  #[tokio::test]
  async fn prefers_free_vocabulary_word() {
    let db = setup_db().await;
    client(&db, 1).await;
    insert_code(&db, 1, "SUNSHINE").await;

    let code = Promo::new(&db).generate_unique().await.unwrap();
    assert!(WORDS.contains(&code.as_str()));
    assert_ne!(code, "SUNSHINE");
  }

  #[tokio::test]
  async fn falls_back_to_suffix_when_words_exhausted() {
    let db = setup_db().await;
    for (i, word) in WORDS.iter().enumerate() {
      let id = i as i64 + 1;
      client(&db, id).await;
      insert_code(&db, id, word).await;
    }

    let promo = Promo::new(&db);
    let code = promo.generate_unique().await.unwrap();

    assert!(!WORDS.contains(&code.as_str()));
    assert!(code.chars().rev().take(2).all(|c| c.is_ascii_digit()));
    assert!(!promo.is_taken(&code).await.unwrap());
  }

  #[tokio::test]
  async fn issues_random_code_when_every_tier_is_taken() {
    let db = setup_db().await;
    client(&db, 1).await;
    for word in WORDS {
      insert_code(&db, 1, word).await;
    }
    let suffixed = vec!["HONEY10".to_string(), "TULIP42".to_string()];
    for code in &suffixed {
      insert_code(&db, 1, code).await;
    }

    let promo = Promo::new(&db);
    let code = promo
      .first_free(WORDS, suffixed, "BONUS-7QX2KD".into())
      .await
      .unwrap();
    assert_eq!(code, "BONUS-7QX2KD");

    // a free suffixed candidate still wins over the fallback
    let suffixed = vec!["HONEY10".into(), "DAISY77".into()];
    let code =
      promo.first_free(WORDS, suffixed, "BONUS-X".into()).await.unwrap();
    assert_eq!(code, "DAISY77");
  }
}
