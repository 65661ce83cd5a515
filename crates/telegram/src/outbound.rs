use std::{future::Future, time::Duration};

use {
    async_trait::async_trait,
    teloxide::{RequestError, prelude::*, types::ChatId},
    tracing::{debug, warn},
};

use crate::{Error, Result};

/// Telegram message size limit.
pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

/// Outbound endpoint that delivers one text to one conversation.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_text(&self, conversation_id: &str, text: &str) -> Result<()>;
}

/// `sendMessage` over the Telegram Bot API.
pub struct TelegramSender {
    bot: Bot,
}

impl TelegramSender {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn run_with_retry<T, F, Fut>(
        &self,
        to: &str,
        mut request: F,
    ) -> std::result::Result<T, RequestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, RequestError>>,
    {
        let mut retries = 0usize;

        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let Some(wait) = retry_after_duration(&err) else {
                        return Err(err);
                    };

                    if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                        warn!(
                            chat_id = to,
                            retries,
                            retry_after_secs = wait.as_secs(),
                            "telegram rate limit persisted after retries"
                        );
                        return Err(err);
                    }

                    retries += 1;
                    warn!(
                        chat_id = to,
                        retries,
                        max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limited, waiting before retry"
                    );
                    tokio::time::sleep(wait).await;
                },
            }
        }
    }
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

fn parse_chat_id(conversation_id: &str) -> Result<ChatId> {
    conversation_id
        .trim()
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| Error::invalid_conversation(conversation_id))
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn send_text(&self, conversation_id: &str, text: &str) -> Result<()> {
        let chat_id = parse_chat_id(conversation_id)?;
        let chunks = chunk_message(text, TELEGRAM_MAX_MESSAGE_LEN);

        for chunk in &chunks {
            self.run_with_retry(conversation_id, || {
                let req = self.bot.send_message(chat_id, chunk.as_str());
                async move { req.await }
            })
            .await?;
        }

        debug!(
            chat_id = conversation_id,
            text_len = text.len(),
            chunk_count = chunks.len(),
            "telegram message sent"
        );
        Ok(())
    }
}

/// Split text into chunks that fit within Telegram's message limit.
/// Prefers splitting at newlines, then spaces.
pub fn chunk_message(text: &str, max_len: usize) -> Vec<String> {
    if max_len == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.len() > max_len {
        let mut window = remaining.floor_char_boundary(max_len);
        if window == 0 {
            window = remaining
                .chars()
                .next()
                .map(char::len_utf8)
                .unwrap_or(remaining.len());
        }

        let slice = &remaining[..window];
        let split_at = match slice.rfind('\n').or_else(|| slice.rfind(' ')) {
            Some(0) | None => window,
            Some(pos) => pos,
        };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start_matches(['\n', ' ']);
    }

    if !remaining.is_empty() || chunks.is_empty() {
        chunks.push(remaining.to_string());
    }
    chunks
}
