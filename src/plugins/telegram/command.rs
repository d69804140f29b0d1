use std::sync::Arc;

use teloxide::{
  prelude::*,
  utils::command::{BotCommands, ParseError},
};

use super::{ReplyBot, callback};
use crate::{
  entity::GiveawayStatus,
  prelude::*,
  state::{AppState, Services},
  sv::{
    captcha::Challenge,
    giveaway::{self, Admission},
    messenger::Messenger,
    settings,
  },
};

fn parse_redeem(
  input: String,
) -> std::result::Result<(String, i64, String), ParseError> {
  const USAGE: &str = "Usage: /redeem <code> <amount> [phone]";

  let mut parts = input.split_whitespace();
  let code = parts.next().unwrap_or_default().to_string();
  let amount = parts.next().and_then(|a| a.parse::<i64>().ok());
  let phone = parts.next().unwrap_or_default().to_string();

  match amount {
    Some(amount) if !code.is_empty() => Ok((code, amount, phone)),
    _ => Err(ParseError::IncorrectFormat(USAGE.into())),
  }
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
  /// Optional deep-link parameter, e.g. `gw_<code>`
  Start(String),
  Help,
  Bonus,
  Promo,
  Feedback(String),
  // Admin commands below
  #[command(parse_with = parse_redeem)]
  Redeem {
    code: String,
    amount: i64,
    phone: String,
  },
  #[command(parse_with = "split")]
  Grant {
    user_id: i64,
    amount: i64,
  },
  Finish(String),
  Giveaways,
}

const USER_HELP: &str = "\
<b>ℹ️ Help</b>

/start - Main menu
/bonus - My bonuses
/promo - Current promotions
/feedback &lt;text&gt; - Send us a message";

const ADMIN_HELP: &str = "\
<b>📋 Admin Commands</b>

<b>Bonuses:</b>
/redeem &lt;code&gt; &lt;amount&gt; [phone] - Redeem bonuses at the counter
/grant &lt;user_id&gt; &lt;amount&gt; - Grant bonuses to a client

<b>Giveaways:</b>
/giveaways - List giveaways with invite links
/finish &lt;id&gt; - Finish a giveaway and draw winners

/help - Show this message";

pub const DEFAULT_WELCOME: &str = "<b>Welcome!</b>\n\n\
  Collect bonuses, follow our promotions and take part in giveaways.\n\
  Use the buttons below to navigate.";

pub async fn handle(
  app: Arc<AppState>,
  bot: ReplyBot,
  cmd: Command,
) -> ResponseResult<()> {
  let sv = app.sv();

  match &cmd {
    Command::Start(param) => {
      if let Some(code) = giveaway::parse_deep_link(param.trim()) {
        return giveaway_entry(&app, &bot, code).await;
      }
      let text = welcome_text(&sv).await;
      bot.reply_with_keyboard(text, callback::main_menu()).await?;
      return Ok(());
    }
    Command::Help if app.is_admin(bot.user_id) => {
      bot.reply_html(format!("{USER_HELP}\n\n{ADMIN_HELP}")).await?;
      return Ok(());
    }
    Command::Help => {
      bot.reply_html(USER_HELP).await?;
      return Ok(());
    }
    Command::Bonus => {
      let text = callback::bonus_text(&sv, bot.user_id).await;
      bot.reply_with_keyboard(text, callback::bonus_keyboard()).await?;
      return Ok(());
    }
    Command::Promo => {
      let text = callback::promotions_text(&sv).await;
      bot.reply_with_keyboard(text, callback::back_keyboard()).await?;
      return Ok(());
    }
    Command::Feedback(text) => {
      let reply = match sv.feedback.save(bot.user_id, text).await {
        Ok(_) => "✅ Thank you! Your message was sent to the team.".into(),
        Err(Error::InvalidArgs(_)) => {
          "✍️ Usage: /feedback &lt;your message&gt;".into()
        }
        Err(e) => super::error_text(&e),
      };
      bot.reply_html(reply).await?;
      return Ok(());
    }
    _ => {}
  }

  if app.is_admin(bot.user_id) {
    handle_admin_command(app, bot, cmd).await?;
  }

  Ok(())
}

async fn welcome_text(sv: &Services<'_>) -> String {
  match sv.settings.get(settings::WELCOME_TEXT).await {
    Ok(Some(text)) if !text.trim().is_empty() => text,
    _ => DEFAULT_WELCOME.to_string(),
  }
}

/// `/start gw_<code>`: either reports the entry or shows the captcha
async fn giveaway_entry(
  app: &AppState,
  bot: &ReplyBot,
  code: &str,
) -> ResponseResult<()> {
  let giveaway = match app.sv().giveaway.check_entry(code, bot.user_id).await {
    Ok(Admission::Open(giveaway)) => giveaway,
    Ok(Admission::AlreadyEntered(giveaway)) => {
      bot
        .reply_with_keyboard(
          callback::entered_text(&giveaway),
          callback::back_keyboard(),
        )
        .await?;
      return Ok(());
    }
    Err(e) => {
      let text = match e {
        Error::GiveawayNotFound => "❌ Giveaway not found.".into(),
        Error::GiveawayFinished => "⏰ This giveaway is already over.".into(),
        e => super::error_text(&e),
      };
      bot.reply_with_keyboard(text, callback::back_keyboard()).await?;
      return Ok(());
    }
  };

  let challenge = Challenge::generate(&mut rand::thread_rng());
  let text = format!(
    "🎰 Giveaway: <b>«{}»</b>\n\nSolve the example to take part:\n🧩 <b>{}</b>",
    utils::escape_html(&giveaway.title),
    challenge.question()
  );
  let keyboard = callback::captcha_keyboard(giveaway.id, &challenge);

  let sent = bot.reply_with_keyboard(text, keyboard).await?;
  app.challenges.issue((sent.chat.id.0, sent.id.0), giveaway.id, challenge);
  Ok(())
}

async fn handle_admin_command(
  app: Arc<AppState>,
  bot: ReplyBot,
  cmd: Command,
) -> ResponseResult<()> {
  let sv = app.sv();

  let result = match cmd {
    Command::Redeem { code, amount, phone } => {
      let phone = Some(phone.as_str()).filter(|p| !p.is_empty());
      redeem(&app, &sv, &code, amount, phone).await
    }
    Command::Grant { user_id, amount } => {
      sv.bonus.grant(user_id, amount, None).await.map(|bonus| {
        format!(
          "✅ Granted {amount} bonuses to <code>{user_id}</code>\n\
          Balance: <b>{}</b>\nCode: <code>{}</code>",
          bonus.amount, bonus.promo_code
        )
      })
    }
    Command::Finish(id) => finish(&app, &sv, &id).await,
    Command::Giveaways => giveaways_text(&app, &sv).await,
    _ => return Ok(()),
  };

  match result {
    Ok(text) => {
      bot.reply_html_chunked(text).await?;
    }
    Err(e) => {
      bot.reply_html(super::error_text(&e)).await?;
    }
  }

  Ok(())
}

async fn redeem(
  app: &AppState,
  sv: &Services<'_>,
  code: &str,
  amount: i64,
  phone: Option<&str>,
) -> Result<String> {
  let redeemed = sv.bonus.redeem_by_code(code, amount, phone).await?;

  let notice = format!(
    "💳 {} bonuses were redeemed.\nRemaining balance: <b>{}</b>",
    redeemed.deducted, redeemed.remaining
  );
  if let Err(err) = app.bot.send_text(redeemed.client_id, &notice, None).await
  {
    warn!("Failed to notify {} about redemption: {err:#}", redeemed.client_id);
  }

  Ok(format!(
    "✅ Redeemed <b>{}</b> of {} from <code>{}</code>\n\
    Remaining balance: <b>{}</b>",
    redeemed.deducted,
    redeemed.requested,
    utils::escape_html(&redeemed.code),
    redeemed.remaining
  ))
}

async fn finish(app: &AppState, sv: &Services<'_>, id: &str) -> Result<String> {
  let id = id
    .trim()
    .parse::<i32>()
    .map_err(|_| Error::InvalidArgs("Usage: /finish <giveaway_id>".into()))?;
  let giveaway = sv.giveaway.by_id(id).await?.ok_or(Error::GiveawayNotFound)?;
  if !giveaway.is_active() {
    return Err(Error::GiveawayFinished);
  }

  let winners = sv.giveaway.finish(id).await?;
  let notified = super::announce_winners(app, &giveaway, &winners).await;

  let mut text = format!(
    "🏁 Giveaway <b>«{}»</b> finished.\n\
    Winners: {} (notified {})",
    utils::escape_html(&giveaway.title),
    winners.len(),
    notified
  );
  for client in sv.giveaway.winners(id).await? {
    text.push_str(&format!(
      "\n• {} (<code>{}</code>)",
      utils::escape_html(&client.display_name()),
      client.tg_user_id
    ));
  }
  Ok(text)
}

async fn giveaways_text(app: &AppState, sv: &Services<'_>) -> Result<String> {
  let giveaways = sv.giveaway.all().await?;
  if giveaways.is_empty() {
    return Ok("📭 No giveaways yet.".to_string());
  }

  let mut text = String::from("<b>🎰 Giveaways</b>\n");
  for giveaway in giveaways {
    let status = match giveaway.status {
      GiveawayStatus::Active => "🟢",
      GiveawayStatus::Finished => "🏁",
    };
    let participants = sv.giveaway.participant_count(giveaway.id).await?;
    text.push_str(&format!(
      "\n{status} <b>#{}</b> {}\n\
      Ends: {} | Winners: {} | Participants: {}\n\
      {}\n",
      giveaway.id,
      utils::escape_html(&giveaway.title),
      utils::format_date(giveaway.end_time),
      giveaway.winner_count,
      participants,
      giveaway::invite_url(&app.config.bot_username, &giveaway)
    ));
  }
  Ok(text)
}
