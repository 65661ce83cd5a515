//! Self-service opt-in link (`https://t.me/<bot>?start=<payload>`).

use {
    qrcode::{QrCode, render::unicode::Dense1x2},
    teloxide::prelude::*,
    tracing::debug,
};

use crate::{Error, Result};

/// Deep-link payloads may only use `A-Z a-z 0-9 _ -`, up to 64 characters.
const MAX_START_PARAMETER_LEN: usize = 64;

pub fn validate_start_parameter(parameter: &str) -> Result<()> {
    if parameter.is_empty() || parameter.len() > MAX_START_PARAMETER_LEN {
        return Err(Error::invalid_input(format!(
            "start parameter must be 1-{MAX_START_PARAMETER_LEN} characters"
        )));
    }
    if !parameter
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(Error::invalid_input(format!(
            "start parameter {parameter:?} may only contain letters, digits, '_' and '-'"
        )));
    }
    Ok(())
}

/// Link that opens the bot and sends `/start <start_parameter>`.
pub fn subscribe_link(bot_username: &str, start_parameter: &str) -> Result<String> {
    let bot = bot_username.trim().trim_start_matches('@');
    if bot.is_empty() {
        return Err(Error::invalid_input("bot username must not be empty"));
    }
    validate_start_parameter(start_parameter)?;
    Ok(format!("https://t.me/{bot}?start={start_parameter}"))
}

/// Draw `link` as a QR code for a terminal, two modules per character row.
///
/// Colors are inverted so the code scans on a dark background.
pub fn render_qr(link: &str) -> Result<String> {
    let code = QrCode::new(link.as_bytes())
        .map_err(|e| Error::invalid_input(format!("cannot encode link as a QR code: {e}")))?;
    Ok(code
        .render::<Dense1x2>()
        .dark_color(Dense1x2::Light)
        .light_color(Dense1x2::Dark)
        .quiet_zone(true)
        .build())
}

/// Use the configured bot username, or ask Telegram via `getMe`.
pub async fn resolve_bot_username(bot: &Bot, configured: Option<&str>) -> Result<String> {
    if let Some(name) = configured.map(str::trim).filter(|n| !n.is_empty()) {
        return Ok(name.trim_start_matches('@').to_string());
    }
    let me = bot.get_me().await?;
    let username = me
        .username
        .clone()
        .ok_or_else(|| Error::message("telegram bot has no username"))?;
    debug!(%username, "resolved bot username via getMe");
    Ok(username)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::mock_api::{MockApi, MockReply},
        rstest::rstest,
        serde_json::json,
    };

    #[test]
    fn builds_link() {
        assert_eq!(
            subscribe_link("@city_alerts_bot", "subscribe").unwrap(),
            "https://t.me/city_alerts_bot?start=subscribe"
        );
    }

    #[rstest]
    #[case("")]
    #[case("has space")]
    #[case("emoji🙂")]
    #[case(&"x".repeat(65))]
    fn rejects_bad_start_parameters(#[case] parameter: &str) {
        assert!(validate_start_parameter(parameter).is_err());
    }

    #[test]
    fn renders_link_as_square_qr_block() {
        let url = subscribe_link("city_alerts_bot", "subscribe").unwrap();
        let qr = render_qr(&url).unwrap();

        let rows: Vec<&str> = qr.lines().collect();
        let width = rows[0].chars().count();
        assert!(width > 21);
        assert!(rows.iter().all(|row| row.chars().count() == width));
        // Each character row holds two module rows.
        assert!(rows.len() * 2 >= width && rows.len() < width);
        assert!(qr.contains('█') || qr.contains('▀') || qr.contains('▄'));
    }

    #[test]
    fn oversized_payload_cannot_be_drawn() {
        assert!(render_qr(&"x".repeat(8000)).unwrap_err().is_validation());
    }

    #[test]
    fn rejects_empty_bot_name() {
        assert!(subscribe_link(" @ ", "subscribe").is_err());
    }

    #[tokio::test]
    async fn configured_username_skips_get_me() {
        let api = MockApi::start(|_, _| MockReply::error(500, "unexpected")).await;
        let name = resolve_bot_username(&api.bot(), Some("@alerts_bot"))
            .await
            .unwrap();
        assert_eq!(name, "alerts_bot");
        assert!(api.calls("getme").is_empty());
    }

    #[tokio::test]
    async fn falls_back_to_get_me() {
        let api = MockApi::start(|_, _| {
            MockReply::ok(json!({
                "id": 1,
                "is_bot": true,
                "first_name": "Alerts",
                "username": "alerts_bot",
                "can_join_groups": false,
                "can_read_all_group_messages": false,
                "supports_inline_queries": false,
                "can_connect_to_business": false,
                "has_main_web_app": false,
            }))
        })
        .await;
        let name = resolve_bot_username(&api.bot(), None).await.unwrap();
        assert_eq!(name, "alerts_bot");
    }
}
