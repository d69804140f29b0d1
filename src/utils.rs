use crate::prelude::*;

pub fn format_date(date: DateTime) -> String {
  date.format("%d.%m.%Y %H:%M").to_string()
}

pub fn format_day(date: Date) -> String {
  date.format("%d.%m.%Y").to_string()
}

/// Minimal escaping for user-provided text inside HTML parse mode
pub fn escape_html(text: &str) -> String {
  text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Maximum message length for Telegram Bot API (4096 characters).
/// We use a slightly smaller limit to account for potential HTML entity expansion.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4000;

/// Splits a long message into chunks that fit within Telegram's message limit.
/// Attempts to split at newline boundaries to preserve formatting.
pub fn chunk_message(text: &str, max_len: usize) -> Vec<String> {
  let max_len =
    if max_len == 0 { TELEGRAM_MAX_MESSAGE_LENGTH } else { max_len };

  if text.len() <= max_len {
    return vec![text.to_string()];
  }

  let mut chunks = Vec::new();
  let mut current = String::new();

  for line in text.lines() {
    if !current.is_empty() && current.len() + line.len() + 1 > max_len {
      chunks.push(std::mem::take(&mut current));
    }

    if line.chars().count() > max_len {
      if !current.is_empty() {
        chunks.push(std::mem::take(&mut current));
      }
      // split on char boundaries, user text is rarely ascii here
      let chars: Vec<char> = line.chars().collect();
      let mut pieces = chars.chunks(max_len).peekable();
      while let Some(piece) = pieces.next() {
        let piece: String = piece.iter().collect();
        if pieces.peek().is_some() {
          chunks.push(piece);
        } else {
          current = piece;
        }
      }
    } else {
      if !current.is_empty() {
        current.push('\n');
      }
      current.push_str(line);
    }
  }

  if !current.is_empty() {
    chunks.push(current);
  }

  chunks
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn short_message_is_single_chunk() {
    assert_eq!(chunk_message("hello", 0), vec!["hello".to_string()]);
  }

  #[test]
  fn splits_on_lines() {
    let text = "aaaa\nbbbb\ncccc";
    let chunks = chunk_message(text, 9);
    assert_eq!(chunks, vec!["aaaa\nbbbb", "cccc"]);
  }

  #[test]
  fn splits_long_cyrillic_line_without_panicking() {
    let text = "бонус".repeat(10);
    let chunks = chunk_message(&text, 20);
    assert!(chunks.iter().all(|c| c.chars().count() <= 20));
    assert_eq!(chunks.concat(), text);
  }

  #[test]
  fn escapes_html() {
    assert_eq!(escape_html("<b>&</b>"), "&lt;b&gt;&amp;&lt;/b&gt;");
  }
}
