//! Outbound delivery seam used by broadcasts and notifications

use crate::prelude::*;

/// Inline url button attached under a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
  pub text: String,
  pub url: String,
}

impl Button {
  pub fn new(text: impl Into<String>, url: impl Into<String>) -> Self {
    Self { text: text.into(), url: url.into() }
  }
}

#[async_trait]
pub trait Messenger: Send + Sync {
  async fn send_text(
    &self,
    chat_id: i64,
    text: &str,
    button: Option<&Button>,
  ) -> anyhow::Result<()>;

  async fn send_photo(
    &self,
    chat_id: i64,
    photo_path: &str,
    caption: &str,
    button: Option<&Button>,
  ) -> anyhow::Result<()>;
}

#[cfg(test)]
pub(crate) mod fake {
  use std::sync::Mutex;

  use super::*;

  #[derive(Debug, Clone, PartialEq, Eq)]
  pub struct Sent {
    pub chat_id: i64,
    pub text: String,
    pub photo: Option<String>,
    pub button: Option<Button>,
  }

  /// Records deliveries, fails for chats listed in `failing`
  #[derive(Default)]
  pub struct Recorder {
    pub sent: Mutex<Vec<Sent>>,
    pub failing: Vec<i64>,
  }

  impl Recorder {
    pub fn failing(chats: impl Into<Vec<i64>>) -> Self {
      Self { failing: chats.into(), ..Default::default() }
    }

    pub fn sent(&self) -> Vec<Sent> {
      self.sent.lock().unwrap().clone()
    }

    fn record(
      &self,
      chat_id: i64,
      text: &str,
      photo: Option<&str>,
      button: Option<&Button>,
    ) -> anyhow::Result<()> {
      if self.failing.contains(&chat_id) {
        anyhow::bail!("chat {chat_id} blocked the bot");
      }
      self.sent.lock().unwrap().push(Sent {
        chat_id,
        text: text.to_string(),
        photo: photo.map(str::to_string),
        button: button.cloned(),
      });
      Ok(())
    }
  }

  #[async_trait]
  impl Messenger for Recorder {
    async fn send_text(
      &self,
      chat_id: i64,
      text: &str,
      button: Option<&Button>,
    ) -> anyhow::Result<()> {
      self.record(chat_id, text, None, button)
    }

    async fn send_photo(
      &self,
      chat_id: i64,
      photo_path: &str,
      caption: &str,
      button: Option<&Button>,
    ) -> anyhow::Result<()> {
      self.record(chat_id, caption, Some(photo_path), button)
    }
  }
}
