//! Math captcha guarding giveaway entry
//!
//! Challenges are `a + b` with four shuffled options. Pending challenges
//! live in memory keyed by the message that shows them and expire after
//! a fixed lifetime.

use std::time::Instant;

use rand::{Rng, seq::SliceRandom};

use crate::prelude::*;

const OPERAND_MAX: i32 = 20;
const DECOYS: usize = 3;
const DECOY_SPREAD: i32 = 10;
const DECOY_FLOOR: i32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
  pub a: i32,
  pub b: i32,
  pub options: Vec<i32>,
}

impl Challenge {
  pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
    let a = rng.gen_range(1..=OPERAND_MAX);
    let b = rng.gen_range(1..=OPERAND_MAX);
    let sum = a + b;

    // sum >= 2, so the window always has more than enough candidates
    let mut pool: Vec<i32> = ((sum - DECOY_SPREAD).max(DECOY_FLOOR)
      ..=sum + DECOY_SPREAD)
      .filter(|&n| n != sum)
      .collect();
    pool.shuffle(rng);

    let mut options: Vec<i32> = pool.into_iter().take(DECOYS).collect();
    options.push(sum);
    options.shuffle(rng);

    Self { a, b, options }
  }

  pub fn answer(&self) -> i32 {
    self.a + self.b
  }

  pub fn question(&self) -> String {
    format!("{} + {} = ?", self.a, self.b)
  }

  pub fn is_correct(&self, answer: i32) -> bool {
    answer == self.answer()
  }
}

/// (chat id, message id) of the message carrying the challenge
pub type ChallengeKey = (i64, i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
  Correct,
  /// Caller is expected to issue a fresh challenge on the same message
  Wrong,
  /// Unknown, expired or issued for another giveaway
  Missing,
}

#[derive(Debug)]
struct Pending {
  giveaway_id: i32,
  challenge: Challenge,
  issued_at: Instant,
}

#[derive(Debug)]
pub struct ChallengeStore {
  pending: DashMap<ChallengeKey, Pending>,
  ttl: Duration,
}

impl ChallengeStore {
  pub fn new(ttl: Duration) -> Self {
    Self { pending: DashMap::new(), ttl }
  }

  /// Replaces any challenge already pending on the same message
  pub fn issue(&self, key: ChallengeKey, giveaway_id: i32, challenge: Challenge) {
    self
      .pending
      .insert(key, Pending { giveaway_id, challenge, issued_at: Instant::now() });
  }

  /// Consumes the challenge on `key` if it was issued for `giveaway_id`
  pub fn resolve(
    &self,
    key: ChallengeKey,
    giveaway_id: i32,
    answer: i32,
  ) -> Verdict {
    let Some((_, pending)) = self
      .pending
      .remove_if(&key, |_, pending| pending.giveaway_id == giveaway_id)
    else {
      return Verdict::Missing;
    };

    if self.is_expired(&pending) {
      debug!("Captcha on {key:?} expired");
      return Verdict::Missing;
    }

    if pending.challenge.is_correct(answer) {
      Verdict::Correct
    } else {
      Verdict::Wrong
    }
  }

  /// Evicts expired challenges, returns how many were dropped
  pub fn gc(&self) -> usize {
    let before = self.pending.len();
    self.pending.retain(|_, pending| !self.is_expired(pending));
    before.saturating_sub(self.pending.len())
  }

  #[cfg(test)]
  fn len(&self) -> usize {
    self.pending.len()
  }

  fn is_expired(&self, pending: &Pending) -> bool {
    pending.issued_at.elapsed() >= self.ttl
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use rand::{SeedableRng, rngs::StdRng};

  use super::*;

  #[test]
  fn options_are_well_formed() {
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..1000 {
      let c = Challenge::generate(&mut rng);
      let sum = c.answer();

      assert!((1..=OPERAND_MAX).contains(&c.a));
      assert!((1..=OPERAND_MAX).contains(&c.b));
      assert_eq!(c.options.len(), 4);

      let unique: HashSet<_> = c.options.iter().collect();
      assert_eq!(unique.len(), 4);
      assert_eq!(c.options.iter().filter(|&&o| o == sum).count(), 1);

      for &decoy in c.options.iter().filter(|&&o| o != sum) {
        assert!(decoy >= DECOY_FLOOR);
        assert!(decoy <= sum + DECOY_SPREAD);
        assert!(decoy >= sum - DECOY_SPREAD);
      }
    }
  }

  #[test]
  fn question_renders_operands() {
    let c = Challenge { a: 1, b: 1, options: vec![] };
    assert_eq!(c.answer(), 2);
    assert_eq!(c.question(), "1 + 1 = ?");
  }

  #[test]
  fn correct_answer_resolves_once() {
    let store = ChallengeStore::new(Duration::from_secs(600));
    let challenge = Challenge { a: 3, b: 4, options: vec![5, 7, 9, 12] };
    store.issue((1, 10), 77, challenge);

    assert_eq!(store.resolve((1, 10), 77, 7), Verdict::Correct);
    assert_eq!(store.resolve((1, 10), 77, 7), Verdict::Missing);
  }

  #[test]
  fn wrong_answer_keeps_giveaway() {
    let store = ChallengeStore::new(Duration::from_secs(600));
    store.issue((1, 10), 5, Challenge { a: 2, b: 2, options: vec![3, 4, 5, 6] });

    assert_eq!(store.resolve((1, 10), 5, 5), Verdict::Wrong);

    // retry on the same message
    store.issue((1, 10), 5, Challenge { a: 1, b: 2, options: vec![2, 3, 4, 5] });
    assert_eq!(store.resolve((1, 10), 5, 3), Verdict::Correct);
  }

  #[test]
  fn keys_are_per_message() {
    let store = ChallengeStore::new(Duration::from_secs(600));
    store.issue((1, 10), 1, Challenge { a: 1, b: 1, options: vec![2] });

    assert_eq!(store.resolve((1, 11), 1, 2), Verdict::Missing);
    assert_eq!(store.resolve((2, 10), 1, 2), Verdict::Missing);
    assert_eq!(store.len(), 1);
  }

  #[test]
  fn answer_for_another_giveaway_is_rejected() {
    let store = ChallengeStore::new(Duration::from_secs(600));
    store.issue((1, 10), 3, Challenge { a: 1, b: 1, options: vec![2] });

    assert_eq!(store.resolve((1, 10), 4, 2), Verdict::Missing);
    // the genuine challenge survives a forged answer
    assert_eq!(store.len(), 1);
    assert_eq!(store.resolve((1, 10), 3, 2), Verdict::Correct);
  }

  #[test]
  fn expired_challenges_are_missing_and_collected() {
    let store = ChallengeStore::new(Duration::ZERO);
    store.issue((1, 1), 1, Challenge { a: 1, b: 1, options: vec![2] });
    store.issue((1, 2), 1, Challenge { a: 1, b: 1, options: vec![2] });

    assert_eq!(store.resolve((1, 1), 1, 2), Verdict::Missing);
    assert_eq!(store.gc(), 1);
    assert_eq!(store.len(), 0);
  }

  #[test]
  fn gc_keeps_fresh_challenges() {
    let store = ChallengeStore::new(Duration::from_secs(600));
    store.issue((1, 1), 1, Challenge { a: 1, b: 1, options: vec![2] });

    assert_eq!(store.gc(), 0);
    assert_eq!(store.len(), 1);
  }
}
