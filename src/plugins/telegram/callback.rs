use std::sync::Arc;

use teloxide::{
  prelude::*,
  types::{InlineKeyboardButton, InlineKeyboardMarkup},
};

use super::{ReplyBot, command};
use crate::{
  entity::giveaway,
  prelude::*,
  state::{AppState, Services},
  sv::{
    bonus,
    captcha::{Challenge, Verdict},
    giveaway::Entry,
    settings,
  },
};

/// Callback data enum - provides type-safe callback handling
#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
  Bonuses,
  Claim,
  Promotions,
  Captcha { giveaway_id: i32, answer: i32 },
  Back,
}

impl Callback {
  /// Serialize callback to string for Telegram API
  pub fn to_data(&self) -> String {
    match self {
      Callback::Bonuses => "bonuses".to_string(),
      Callback::Claim => "claim".to_string(),
      Callback::Promotions => "promotions".to_string(),
      Callback::Captcha { giveaway_id, answer } => {
        format!("cap:{giveaway_id}:{answer}")
      }
      Callback::Back => "back".to_string(),
    }
  }

  /// Parse callback from string received from Telegram API
  pub fn from_data(data: &str) -> Option<Self> {
    match data {
      "bonuses" => Some(Callback::Bonuses),
      "claim" => Some(Callback::Claim),
      "promotions" => Some(Callback::Promotions),
      "back" => Some(Callback::Back),
      _ => {
        let (giveaway_id, answer) = data.strip_prefix("cap:")?.split_once(':')?;
        Some(Callback::Captcha {
          giveaway_id: giveaway_id.parse().ok()?,
          answer: answer.parse().ok()?,
        })
      }
    }
  }
}

pub fn main_menu() -> InlineKeyboardMarkup {
  InlineKeyboardMarkup::new(vec![
    vec![InlineKeyboardButton::callback(
      "💰 My Bonuses",
      Callback::Bonuses.to_data(),
    )],
    vec![InlineKeyboardButton::callback(
      "🔥 Promotions",
      Callback::Promotions.to_data(),
    )],
  ])
}

pub fn bonus_keyboard() -> InlineKeyboardMarkup {
  InlineKeyboardMarkup::new(vec![
    vec![InlineKeyboardButton::callback(
      "🎁 Get Promo Code",
      Callback::Claim.to_data(),
    )],
    vec![InlineKeyboardButton::callback(
      "« Back to Menu",
      Callback::Back.to_data(),
    )],
  ])
}

pub fn back_keyboard() -> InlineKeyboardMarkup {
  InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
    "« Back to Menu",
    Callback::Back.to_data(),
  )]])
}

/// One row with the four shuffled answers
pub fn captcha_keyboard(
  giveaway_id: i32,
  challenge: &Challenge,
) -> InlineKeyboardMarkup {
  let row = challenge
    .options
    .iter()
    .map(|&answer| {
      InlineKeyboardButton::callback(
        answer.to_string(),
        Callback::Captcha { giveaway_id, answer }.to_data(),
      )
    })
    .collect::<Vec<_>>();
  InlineKeyboardMarkup::new(vec![row])
}

pub fn entered_text(giveaway: &giveaway::Model) -> String {
  format!(
    "✅ You are taking part in the giveaway <b>«{}»</b>!\n\n\
    Results on {}. Good luck 🍀",
    utils::escape_html(&giveaway.title),
    utils::format_date(giveaway.end_time)
  )
}

pub async fn bonus_text(sv: &Services<'_>, client_id: i64) -> String {
  let view = async {
    let Some(balance) = sv.bonus.balance(client_id).await? else {
      return Ok::<_, Error>(
        "💰 <b>My Bonuses</b>\n\nYou have no bonuses yet.".to_string(),
      );
    };
    let account = sv.bonus.by_client(client_id).await?;
    let redeemed = sv.bonus.claimed_total(client_id).await?;
    let history =
      sv.bonus.redemption_history(client_id, bonus::HISTORY_LIMIT).await?;
    let terms = sv.settings.get(settings::BONUS_TERMS).await?;

    let mut text = format!(
      "💰 <b>My Bonuses</b>\n\n\
      <b>Balance:</b> {balance}\n\
      <b>Redeemed:</b> {redeemed}"
    );
    if let Some(account) = account {
      text.push_str(&format!(
        "\n<b>Promo code:</b> <code>{}</code>",
        account.promo_code
      ));
    }
    if !history.is_empty() {
      text.push_str("\n\n<b>Recent redemptions:</b>");
      for record in history {
        text.push_str(&format!(
          "\n• {} - {}",
          utils::format_date(record.created_at),
          record.amount
        ));
      }
    }
    if let Some(terms) = terms.filter(|t| !t.trim().is_empty()) {
      text.push_str(&format!("\n\n<i>{}</i>", utils::escape_html(&terms)));
    }
    Ok(text)
  };

  view.await.unwrap_or_else(|e| super::error_text(&e))
}

pub async fn promotions_text(sv: &Services<'_>) -> String {
  let today = Utc::now().date_naive();
  let promotions = match sv.promotion.visible(today).await {
    Ok(promotions) => promotions,
    Err(e) => return super::error_text(&e),
  };

  if promotions.is_empty() {
    return "🔥 <b>Promotions</b>\n\nNo promotions right now, stay tuned!"
      .to_string();
  }

  let mut text = String::from("🔥 <b>Promotions</b>\n");
  for promo in promotions {
    text.push_str(&format!("\n<b>{}</b>\n", utils::escape_html(&promo.title)));
    if !promo.description.is_empty() {
      text.push_str(&format!("{}\n", utils::escape_html(&promo.description)));
    }
    if !promo.is_perpetual
      && let Some(end) = promo.end_date
    {
      text.push_str(&format!("<i>until {}</i>\n", utils::format_day(end)));
    }
  }
  text
}

pub async fn handle(
  app: Arc<AppState>,
  bot: ReplyBot,
  data: &str,
) -> ResponseResult<()> {
  let sv = app.sv();

  let Some(callback) = Callback::from_data(data) else {
    return Ok(());
  };

  match callback {
    Callback::Bonuses => {
      let text = bonus_text(&sv, bot.user_id).await;
      bot.edit_with_keyboard(text, bonus_keyboard()).await?;
    }
    Callback::Claim => {
      handle_claim(&sv, &bot).await?;
    }
    Callback::Promotions => {
      let text = promotions_text(&sv).await;
      bot.edit_with_keyboard(text, back_keyboard()).await?;
    }
    Callback::Captcha { giveaway_id, answer } => {
      handle_captcha(&app, &bot, giveaway_id, answer).await?;
    }
    Callback::Back => {
      let text = match sv.settings.get(settings::WELCOME_TEXT).await {
        Ok(Some(text)) if !text.trim().is_empty() => text,
        _ => command::DEFAULT_WELCOME.to_string(),
      };
      bot.edit_with_keyboard(text, main_menu()).await?;
    }
  }

  Ok(())
}

async fn handle_claim(sv: &Services<'_>, bot: &ReplyBot) -> ResponseResult<()> {
  let claimed = async {
    if let Some(code) = sv.bonus.claim(bot.user_id).await? {
      return Ok::<_, Error>(format!(
        "🎁 Your promo code:\n\n<code>{code}</code>\n\n\
        Show it at the counter to use your bonuses."
      ));
    }
    Ok(match sv.bonus.last_claimed_code(bot.user_id).await? {
      Some(code) => format!(
        "🎁 You already received your promo code:\n\n<code>{code}</code>"
      ),
      None => "📭 You have no bonuses to claim yet.".to_string(),
    })
  };

  let text = claimed.await.unwrap_or_else(|e| super::error_text(&e));
  bot.edit_with_keyboard(text, back_keyboard()).await
}

/// Challenges are keyed by the message and bound to one giveaway
async fn handle_captcha(
  app: &AppState,
  bot: &ReplyBot,
  giveaway_id: i32,
  answer: i32,
) -> ResponseResult<()> {
  match app.challenges.resolve(bot.message_key(), giveaway_id, answer) {
    Verdict::Missing => {
      return bot
        .edit_html("❌ The captcha has expired. Open the giveaway link again.")
        .await;
    }
    Verdict::Wrong => {
      let challenge = Challenge::generate(&mut rand::thread_rng());
      let text =
        format!("❌ Wrong! Try again:\n🧩 <b>{}</b>", challenge.question());
      let keyboard = captcha_keyboard(giveaway_id, &challenge);
      app.challenges.issue(bot.message_key(), giveaway_id, challenge);
      return bot.edit_with_keyboard(text, keyboard).await;
    }
    Verdict::Correct => {}
  }

  let sv = app.sv();
  let joined = async {
    let giveaway =
      sv.giveaway.by_id(giveaway_id).await?.ok_or(Error::GiveawayNotFound)?;
    sv.giveaway.enter(&giveaway.code, bot.user_id).await
  };

  let text = match joined.await {
    Ok(Entry::Joined(giveaway) | Entry::AlreadyEntered(giveaway)) => {
      entered_text(&giveaway)
    }
    Err(Error::GiveawayFinished) => "⏰ This giveaway is already over.".into(),
    Err(e) => super::error_text(&e),
  };
  bot.edit_html(text).await
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn callback_data_roundtrip() {
    let all = [
      Callback::Bonuses,
      Callback::Claim,
      Callback::Promotions,
      Callback::Captcha { giveaway_id: 12, answer: 31 },
      Callback::Back,
    ];
    for callback in all {
      assert_eq!(Callback::from_data(&callback.to_data()), Some(callback));
    }
  }

  #[test]
  fn rejects_malformed_captcha_data() {
    assert_eq!(Callback::from_data("cap:1"), None);
    assert_eq!(Callback::from_data("cap:x:2"), None);
    assert_eq!(Callback::from_data("unknown"), None);
  }

  #[test]
  fn captcha_data_fits_telegram_limit() {
    let data = Callback::Captcha { giveaway_id: i32::MAX, answer: 40 }.to_data();
    assert!(data.len() <= 64);
  }
}
