use std::time::Duration;

use {secrecy::ExposeSecret, tracing::debug};

use crate::{Error, Result, config::TelegramAccountConfig};

/// Build a Bot API client from the account config.
///
/// The HTTP timeout covers the long-poll window plus the configured request
/// timeout, so a hung provider call ends instead of blocking a pass forever.
pub fn build_bot(config: &TelegramAccountConfig) -> Result<teloxide::Bot> {
    if !config.has_token() {
        return Err(Error::invalid_input("telegram bot token is not configured"));
    }

    let timeout = Duration::from_secs(
        config
            .request_timeout_secs
            .saturating_add(u64::from(config.poll_timeout_secs)),
    );
    let client = teloxide::net::default_reqwest_settings()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::message(format!("failed to build telegram http client: {e}")))?;
    let mut bot = teloxide::Bot::with_client(config.token.expose_secret(), client);

    if let Some(raw) = config.api_url.as_deref() {
        let url = reqwest::Url::parse(raw)
            .map_err(|e| Error::invalid_input(format!("invalid api_url {raw:?}: {e}")))?;
        debug!(api_url = %url, "using custom telegram api url");
        bot = bot.set_api_url(url);
    }

    Ok(bot)
}
