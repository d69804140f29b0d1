use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, Request, State},
  http::{StatusCode, header},
  middleware::Next,
  response::Response,
};
use serde::{Deserialize, Serialize};

use crate::{
  entity::{self, MailingStatus, bonus, client, setting},
  plugins::telegram,
  prelude::*,
  state::AppState,
  sv::{
    bonus::{BatchReport, BonusStats, Redeemed},
    client::ClientBalance,
    feedback::FeedbackFilter,
    giveaway::{NewGiveaway, invite_url},
    mailing::Draft,
    messenger::Messenger,
    promotion::NewPromotion,
  },
};

type App = State<Arc<AppState>>;

/// Plain success marker for endpoints with nothing else to report
#[derive(Debug, Serialize)]
pub struct Done {
  pub success: bool,
}

impl Done {
  fn ok() -> Json<Self> {
    Json(Self { success: true })
  }
}

pub async fn health() -> &'static str {
  "OK"
}

/// Admin routes require `Authorization: Bearer <ADMIN_SECRET>`
pub async fn require_admin(
  State(app): App,
  req: Request,
  next: Next,
) -> std::result::Result<Response, StatusCode> {
  let token = req
    .headers()
    .get(header::AUTHORIZATION)
    .and_then(|value| value.to_str().ok())
    .and_then(|value| value.strip_prefix("Bearer "));

  let secret = app.config.admin_secret.as_str();
  if secret.is_empty() || token != Some(secret) {
    warn!("Rejected admin request to {}", req.uri().path());
    return Err(StatusCode::UNAUTHORIZED);
  }

  Ok(next.run(req).await)
}

// clients & settings

pub async fn clients(State(app): App) -> Result<Json<Vec<ClientBalance>>> {
  Ok(Json(app.sv().client.all_with_balances().await?))
}

pub async fn settings(State(app): App) -> Result<Json<Vec<setting::Model>>> {
  Ok(Json(app.sv().settings.all().await?))
}

#[derive(Debug, Deserialize)]
pub struct SettingReq {
  pub value: String,
}

pub async fn set_setting(
  State(app): App,
  Path(key): Path<String>,
  Json(req): Json<SettingReq>,
) -> Result<Json<Done>> {
  app.sv().settings.set(&key, req.value.trim()).await?;
  info!("Setting `{key}` updated");
  Ok(Done::ok())
}

// bonuses

#[derive(Debug, Serialize)]
pub struct BonusRow {
  #[serde(flatten)]
  pub bonus: bonus::Model,
  pub client: Option<client::Model>,
}

pub async fn bonuses(State(app): App) -> Result<Json<Vec<BonusRow>>> {
  let rows = app.sv().bonus.all_with_clients().await?;
  Ok(Json(
    rows
      .into_iter()
      .map(|(bonus, client)| BonusRow { bonus, client })
      .collect(),
  ))
}

pub async fn bonus_stats(State(app): App) -> Result<Json<BonusStats>> {
  Ok(Json(app.sv().bonus.stats().await?))
}

#[derive(Debug, Deserialize)]
pub struct GrantReq {
  pub client_id: i64,
  pub amount: i64,
  pub code: Option<String>,
}

pub async fn grant(
  State(app): App,
  Json(req): Json<GrantReq>,
) -> Result<Json<bonus::Model>> {
  let bonus = app
    .sv()
    .bonus
    .grant(req.client_id, req.amount, req.code.as_deref())
    .await?;
  Ok(Json(bonus))
}

#[derive(Debug, Deserialize)]
pub struct GrantAllReq {
  pub amount: i64,
  pub code: Option<String>,
}

pub async fn grant_all(
  State(app): App,
  Json(req): Json<GrantAllReq>,
) -> Result<Json<BatchReport>> {
  let report =
    app.sv().bonus.grant_to_all(req.amount, req.code.as_deref()).await?;
  Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct RedeemReq {
  pub code: String,
  pub amount: i64,
  pub phone: Option<String>,
}

pub async fn redeem(
  State(app): App,
  Json(req): Json<RedeemReq>,
) -> Result<Json<Redeemed>> {
  let redeemed = app
    .sv()
    .bonus
    .redeem_by_code(&req.code, req.amount, req.phone.as_deref())
    .await?;
  Ok(Json(redeemed))
}

#[derive(Debug, Deserialize)]
pub struct CodeReq {
  pub code: String,
}

pub async fn update_bonus_code(
  State(app): App,
  Path(id): Path<i32>,
  Json(req): Json<CodeReq>,
) -> Result<Json<bonus::Model>> {
  Ok(Json(app.sv().bonus.update_code(id, &req.code).await?))
}

pub async fn delete_bonus(
  State(app): App,
  Path(id): Path<i32>,
) -> Result<Json<Done>> {
  app.sv().bonus.delete(id).await?;
  Ok(Done::ok())
}

// promotions

pub async fn promotions(
  State(app): App,
) -> Result<Json<Vec<entity::promotion::Model>>> {
  Ok(Json(app.sv().promotion.all().await?))
}

pub async fn create_promotion(
  State(app): App,
  Json(req): Json<NewPromotion>,
) -> Result<Json<entity::promotion::Model>> {
  Ok(Json(app.sv().promotion.create(req).await?))
}

pub async fn update_promotion(
  State(app): App,
  Path(id): Path<i32>,
  Json(req): Json<NewPromotion>,
) -> Result<Json<entity::promotion::Model>> {
  Ok(Json(app.sv().promotion.update(id, req).await?))
}

pub async fn toggle_promotion(
  State(app): App,
  Path(id): Path<i32>,
) -> Result<Json<entity::promotion::Model>> {
  Ok(Json(app.sv().promotion.toggle(id).await?))
}

pub async fn delete_promotion(
  State(app): App,
  Path(id): Path<i32>,
) -> Result<Json<Done>> {
  app.sv().promotion.delete(id).await?;
  Ok(Done::ok())
}

// feedback

#[derive(Debug, Default, Deserialize)]
pub struct FeedbackQuery {
  #[serde(default)]
  pub filter: FeedbackFilter,
}

#[derive(Debug, Serialize)]
pub struct FeedbackRow {
  #[serde(flatten)]
  pub feedback: entity::feedback::Model,
  pub client: Option<client::Model>,
}

pub async fn feedback(
  State(app): App,
  Query(query): Query<FeedbackQuery>,
) -> Result<Json<Vec<FeedbackRow>>> {
  let rows = app.sv().feedback.all(query.filter).await?;
  Ok(Json(
    rows
      .into_iter()
      .map(|(feedback, client)| FeedbackRow { feedback, client })
      .collect(),
  ))
}

#[derive(Debug, Deserialize)]
pub struct ReplyReq {
  pub text: String,
}

/// Stores the reply and forwards it to the author
pub async fn reply_feedback(
  State(app): App,
  Path(id): Path<i32>,
  Json(req): Json<ReplyReq>,
) -> Result<Json<entity::feedback::Model>> {
  let feedback = app.sv().feedback.reply(id, &req.text).await?;

  let text = format!(
    "💬 <b>Reply to your message</b>\n\n<i>{}</i>\n\n{}",
    utils::escape_html(&feedback.message_text),
    utils::escape_html(&req.text)
  );
  if let Err(err) = app.bot.send_text(feedback.client_id, &text, None).await {
    warn!("Failed to deliver reply {id} to {}: {err:#}", feedback.client_id);
  }

  Ok(Json(feedback))
}

pub async fn delete_feedback(
  State(app): App,
  Path(id): Path<i32>,
) -> Result<Json<Done>> {
  app.sv().feedback.delete(id).await?;
  Ok(Done::ok())
}

// mailings

pub async fn mailings(
  State(app): App,
) -> Result<Json<Vec<entity::mailing::Model>>> {
  Ok(Json(app.sv().mailing.all().await?))
}

pub async fn create_mailing(
  State(app): App,
  Json(draft): Json<Draft>,
) -> Result<Json<entity::mailing::Model>> {
  Ok(Json(app.sv().mailing.create(draft).await?))
}

pub async fn update_mailing(
  State(app): App,
  Path(id): Path<i32>,
  Json(draft): Json<Draft>,
) -> Result<Json<entity::mailing::Model>> {
  Ok(Json(app.sv().mailing.update(id, draft).await?))
}

pub async fn delete_mailing(
  State(app): App,
  Path(id): Path<i32>,
) -> Result<Json<Done>> {
  app.sv().mailing.delete(id).await?;
  Ok(Done::ok())
}

#[derive(Debug, Serialize)]
pub struct Queued {
  pub success: bool,
  pub recipients: usize,
}

/// Delivery runs in the background, progress lands in the mailing counters
pub async fn send_mailing(
  State(app): App,
  Path(id): Path<i32>,
) -> Result<(StatusCode, Json<Queued>)> {
  let mailing =
    app.sv().mailing.by_id(id).await?.ok_or(Error::MailingNotFound)?;
  if mailing.status != MailingStatus::Draft {
    return Err(Error::MailingSent);
  }
  let recipients = app.sv().mailing.recipients(&mailing).await?.len();

  let task = app.clone();
  tokio::spawn(async move {
    let delay = task.config.broadcast_delay;
    if let Err(err) = task.sv().mailing.broadcast(id, &task.bot, delay).await {
      error!("Mailing {id} failed: {err}");
    }
  });

  Ok((StatusCode::ACCEPTED, Json(Queued { success: true, recipients })))
}

// giveaways

#[derive(Debug, Serialize)]
pub struct GiveawayRow {
  #[serde(flatten)]
  pub giveaway: entity::giveaway::Model,
  pub invite_url: String,
  pub participants: u64,
}

#[derive(Debug, Serialize)]
pub struct GiveawayDetail {
  #[serde(flatten)]
  pub giveaway: entity::giveaway::Model,
  pub invite_url: String,
  pub participants: Vec<client::Model>,
  pub winners: Vec<client::Model>,
}

pub async fn giveaways(State(app): App) -> Result<Json<Vec<GiveawayRow>>> {
  let sv = app.sv();
  let mut rows = Vec::new();
  for giveaway in sv.giveaway.all().await? {
    rows.push(GiveawayRow {
      invite_url: invite_url(&app.config.bot_username, &giveaway),
      participants: sv.giveaway.participant_count(giveaway.id).await?,
      giveaway,
    });
  }
  Ok(Json(rows))
}

pub async fn create_giveaway(
  State(app): App,
  Json(req): Json<NewGiveaway>,
) -> Result<Json<GiveawayRow>> {
  let giveaway = app.sv().giveaway.create(req).await?;
  Ok(Json(GiveawayRow {
    invite_url: invite_url(&app.config.bot_username, &giveaway),
    participants: 0,
    giveaway,
  }))
}

pub async fn giveaway(
  State(app): App,
  Path(id): Path<i32>,
) -> Result<Json<GiveawayDetail>> {
  let sv = app.sv();
  let giveaway = sv.giveaway.by_id(id).await?.ok_or(Error::GiveawayNotFound)?;

  Ok(Json(GiveawayDetail {
    invite_url: invite_url(&app.config.bot_username, &giveaway),
    participants: sv.giveaway.participants(id).await?,
    winners: sv.giveaway.winners(id).await?,
    giveaway,
  }))
}

#[derive(Debug, Serialize)]
pub struct Finished {
  pub winners: Vec<i64>,
  pub notified: usize,
}

pub async fn finish_giveaway(
  State(app): App,
  Path(id): Path<i32>,
) -> Result<Json<Finished>> {
  let giveaway =
    app.sv().giveaway.by_id(id).await?.ok_or(Error::GiveawayNotFound)?;
  let winners = app.sv().giveaway.finish(id).await?;
  let notified = telegram::announce_winners(&app, &giveaway, &winners).await;
  Ok(Json(Finished { winners, notified }))
}

pub async fn delete_giveaway(
  State(app): App,
  Path(id): Path<i32>,
) -> Result<Json<Done>> {
  app.sv().giveaway.delete(id).await?;
  Ok(Done::ok())
}
