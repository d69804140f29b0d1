mod callback;
mod command;

use std::sync::Arc;

use command::Command;
use reqwest::Url;
use teloxide::{
  Bot,
  dispatching::{Dispatcher, HandlerExt, UpdateFilterExt},
  prelude::*,
  types::{
    CallbackQuery, ChatId, InlineKeyboardButton, InlineKeyboardMarkup,
    InputFile, Message, MessageId, ParseMode, Update, User,
  },
};

use crate::{
  entity::giveaway,
  prelude::*,
  state::AppState,
  sv::{
    client::Profile,
    messenger::{Button, Messenger},
  },
};

pub struct Plugin;

#[async_trait]
impl super::Plugin for Plugin {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    run_bot(app).await;
    Ok(())
  }
}

pub async fn run_bot(app: Arc<AppState>) {
  info!("Starting Telegram bot...");

  let bot = app.bot.clone();

  let handler = teloxide::dptree::entry()
    .branch(Update::filter_message().filter_command::<Command>().endpoint({
      let app = app.clone();
      move |bot: Bot, msg: Message, cmd: Command| {
        let app = app.clone();
        command_handle(app, bot, msg, cmd)
      }
    }))
    .branch(Update::filter_callback_query().endpoint({
      let app = app.clone();
      move |bot: Bot, query: CallbackQuery| {
        let app = app.clone();
        callback_handle(app, bot, query)
      }
    }));

  Dispatcher::builder(bot, handler).build().dispatch().await;
}

async fn command_handle(
  app: Arc<AppState>,
  bot: Bot,
  msg: Message,
  cmd: Command,
) -> ResponseResult<()> {
  let Some(user) = msg.from.as_ref() else {
    return Ok(());
  };
  register(&app, user).await;

  let bot = ReplyBot::new(bot, user.id.0 as i64, msg.chat.id, msg.id);
  command::handle(app, bot, cmd).await
}

async fn callback_handle(
  app: Arc<AppState>,
  bot: Bot,
  query: CallbackQuery,
) -> ResponseResult<()> {
  if let Some(data) = query.data
    && let Some(msg) = query.message.as_ref()
  {
    register(&app, &query.from).await;

    let bot =
      ReplyBot::new(bot, query.from.id.0 as i64, msg.chat().id, msg.id());

    // answer callback to remove loading state
    bot.inner.answer_callback_query(query.id.clone()).await?;

    callback::handle(app, bot, &data).await
  } else {
    Ok(())
  }
}

/// Every contact refreshes the client profile
async fn register(app: &AppState, user: &User) {
  let profile = Profile {
    tg_user_id: user.id.0 as i64,
    first_name: Some(user.first_name.clone()),
    last_name: user.last_name.clone(),
    username: user.username.clone(),
    language_code: user.language_code.clone(),
  };

  if let Err(err) = app.sv().client.register(profile).await {
    error!("Failed to register client {}: {err}", user.id);
  }
}

/// Tells each winner about the result, failures are only logged
pub async fn announce_winners(
  app: &AppState,
  giveaway: &giveaway::Model,
  winners: &[i64],
) -> usize {
  let text = format!(
    "🎉 <b>Congratulations!</b>\n\n\
    You won the giveaway <b>«{}»</b>!\n\
    We will contact you soon.",
    utils::escape_html(&giveaway.title)
  );

  let mut delivered = 0;
  for &winner in winners {
    match app.bot.send_text(winner, &text, None).await {
      Ok(()) => delivered += 1,
      Err(err) => warn!("Failed to notify winner {winner}: {err:#}"),
    }
    time::sleep(app.config.broadcast_delay).await;
  }
  delivered
}

/// Chat reply for a failed operation
fn error_text(err: &Error) -> String {
  format!("❌ {}", utils::escape_html(&err.user_message()))
}

fn url_keyboard(button: &Button) -> anyhow::Result<InlineKeyboardMarkup> {
  let url = Url::parse(&button.url)
    .with_context(|| format!("Invalid button url `{}`", button.url))?;
  Ok(InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::url(
    button.text.clone(),
    url,
  )]]))
}

#[async_trait]
impl Messenger for Bot {
  async fn send_text(
    &self,
    chat_id: i64,
    text: &str,
    button: Option<&Button>,
  ) -> anyhow::Result<()> {
    let mut request =
      self.send_message(ChatId(chat_id), text).parse_mode(ParseMode::Html);
    if let Some(button) = button {
      request = request.reply_markup(url_keyboard(button)?);
    }
    request.await?;
    Ok(())
  }

  async fn send_photo(
    &self,
    chat_id: i64,
    photo_path: &str,
    caption: &str,
    button: Option<&Button>,
  ) -> anyhow::Result<()> {
    let mut request = Requester::send_photo(
      self,
      ChatId(chat_id),
      InputFile::file(photo_path),
    )
    .caption(caption)
    .parse_mode(ParseMode::Html);
    if let Some(button) = button {
      request = request.reply_markup(url_keyboard(button)?);
    }
    request.await?;
    Ok(())
  }
}

#[derive(Debug, Clone)]
struct ReplyBot {
  inner: Bot,
  pub user_id: i64,
  pub chat_id: ChatId,
  pub message_id: MessageId,
}

impl ReplyBot {
  pub fn new(
    inner: Bot,
    user_id: i64,
    chat_id: ChatId,
    message_id: MessageId,
  ) -> Self {
    Self { inner, user_id, chat_id, message_id }
  }

  /// Key of the message this bot replies about, used by the captcha store
  fn message_key(&self) -> (i64, i32) {
    (self.chat_id.0, self.message_id.0)
  }

  async fn reply_html(
    &self,
    text: impl Into<String>,
  ) -> ResponseResult<Message> {
    self
      .inner
      .send_message(self.chat_id, text.into())
      .parse_mode(ParseMode::Html)
      .await
  }

  /// Send a potentially long message by splitting it into chunks if needed.
  async fn reply_html_chunked(
    &self,
    text: impl Into<String>,
  ) -> ResponseResult<()> {
    for chunk in utils::chunk_message(&text.into(), 0) {
      self
        .inner
        .send_message(self.chat_id, chunk)
        .parse_mode(ParseMode::Html)
        .await?;
    }
    Ok(())
  }

  async fn reply_with_keyboard(
    &self,
    text: impl Into<String>,
    keyboard: InlineKeyboardMarkup,
  ) -> ResponseResult<Message> {
    self
      .inner
      .send_message(self.chat_id, text.into())
      .parse_mode(ParseMode::Html)
      .reply_markup(keyboard)
      .await
  }

  pub async fn edit_with_keyboard(
    &self,
    text: impl Into<String>,
    keyboard: InlineKeyboardMarkup,
  ) -> ResponseResult<()> {
    self
      .inner
      .edit_message_text(self.chat_id, self.message_id, text.into())
      .parse_mode(ParseMode::Html)
      .reply_markup(keyboard)
      .await?;
    Ok(())
  }

  pub async fn edit_html(&self, text: impl Into<String>) -> ResponseResult<()> {
    self
      .inner
      .edit_message_text(self.chat_id, self.message_id, text.into())
      .parse_mode(ParseMode::Html)
      .await?;
    Ok(())
  }
}
