//! Error types shared by services and front-ends

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("Database error: {0}")]
  Database(#[from] sea_orm::DbErr),

  #[error("Client not found")]
  ClientNotFound,

  #[error("Promo code not found")]
  CodeNotFound,

  #[error("Promo code `{0}` is already taken")]
  CodeTaken(String),

  #[error("Bonus not found")]
  BonusNotFound,

  #[error("Giveaway not found")]
  GiveawayNotFound,

  #[error("Giveaway already finished")]
  GiveawayFinished,

  #[error("Could not allocate a unique giveaway code")]
  CodeSpaceExhausted,

  #[error("Promotion not found")]
  PromotionNotFound,

  #[error("Feedback message not found")]
  FeedbackNotFound,

  #[error("Mailing not found")]
  MailingNotFound,

  #[error("Mailing is already sent or being sent")]
  MailingSent,

  #[error("{0}")]
  InvalidArgs(String),

  #[error("Internal error: {0}")]
  Internal(String),
}

impl Error {
  /// Text safe to show to chat users, internals are never exposed
  pub fn user_message(&self) -> String {
    match self {
      Error::Database(_) | Error::Internal(_) | Error::CodeSpaceExhausted => {
        "Something went wrong, please try again later.".into()
      }
      other => other.to_string(),
    }
  }

  fn status(&self) -> StatusCode {
    match self {
      Error::ClientNotFound
      | Error::CodeNotFound
      | Error::BonusNotFound
      | Error::GiveawayNotFound
      | Error::PromotionNotFound
      | Error::FeedbackNotFound
      | Error::MailingNotFound => StatusCode::NOT_FOUND,
      Error::CodeTaken(_) | Error::GiveawayFinished | Error::MailingSent => {
        StatusCode::CONFLICT
      }
      Error::InvalidArgs(_) => StatusCode::BAD_REQUEST,
      Error::Database(_) | Error::Internal(_) | Error::CodeSpaceExhausted => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!("Admin request failed: {self}");
    }

    // admin surface, full detail is fine here
    let body = json::json!({
      "success": false,
      "error": self.to_string(),
    });

    (status, axum::Json(body)).into_response()
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn user_message_hides_internals() {
    let err = Error::Database(sea_orm::DbErr::Custom("disk I/O".into()));
    assert!(!err.user_message().contains("disk"));

    let err = Error::Internal("secret path".into());
    assert!(!err.user_message().contains("secret"));
  }

  #[test]
  fn user_message_keeps_expected_absence() {
    assert_eq!(Error::CodeNotFound.user_message(), "Promo code not found");
    assert_eq!(Error::GiveawayFinished.status(), StatusCode::CONFLICT);
    assert_eq!(Error::MailingNotFound.status(), StatusCode::NOT_FOUND);
  }
}
