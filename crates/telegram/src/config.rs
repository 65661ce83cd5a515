use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Which updates count as someone subscribing.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPolicy {
    /// Any message from a chat subscribes that chat.
    AnyMessage,
    /// Only `/start` (optionally with a payload) subscribes; other chatter
    /// is ignored.
    #[default]
    StartCommand,
}

/// Configuration for the alert bot.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramAccountConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Bot username used for opt-in links. Resolved with `getMe` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_username: Option<String>,

    /// Which updates create subscribers.
    pub subscription_policy: SubscriptionPolicy,

    /// Payload carried by the opt-in link (`?start=<payload>`).
    pub start_parameter: String,

    /// Long-poll timeout passed to `getUpdates` (0 = return immediately).
    pub poll_timeout_secs: u32,

    /// HTTP timeout for each Bot API request, on top of the poll timeout.
    pub request_timeout_secs: u64,

    /// Override for the Bot API base URL (self-hosted API server, tests).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl TelegramAccountConfig {
    pub fn has_token(&self) -> bool {
        !self.token.expose_secret().trim().is_empty()
    }
}

impl std::fmt::Debug for TelegramAccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramAccountConfig")
            .field("token", &"[REDACTED]")
            .field("bot_username", &self.bot_username)
            .field("subscription_policy", &self.subscription_policy)
            .field("start_parameter", &self.start_parameter)
            .finish_non_exhaustive()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for TelegramAccountConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            bot_username: None,
            subscription_policy: SubscriptionPolicy::default(),
            start_parameter: "subscribe".into(),
            poll_timeout_secs: 0,
            request_timeout_secs: 30,
            api_url: None,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = TelegramAccountConfig::default();
        assert_eq!(cfg.subscription_policy, SubscriptionPolicy::StartCommand);
        assert_eq!(cfg.start_parameter, "subscribe");
        assert_eq!(cfg.poll_timeout_secs, 0);
        assert_eq!(cfg.request_timeout_secs, 30);
        assert!(!cfg.has_token());
    }

    #[test]
    fn deserialize_from_json() {
        let json = r#"{
            "token": "123:ABC",
            "bot_username": "city_alerts_bot",
            "subscription_policy": "any_message"
        }"#;
        let cfg: TelegramAccountConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.token.expose_secret(), "123:ABC");
        assert_eq!(cfg.bot_username.as_deref(), Some("city_alerts_bot"));
        assert_eq!(cfg.subscription_policy, SubscriptionPolicy::AnyMessage);
        // defaults for unspecified fields
        assert_eq!(cfg.start_parameter, "subscribe");
        assert!(cfg.has_token());
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = TelegramAccountConfig {
            token: Secret::new("123:SECRET".into()),
            ..Default::default()
        };
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("SECRET"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn serialize_roundtrip() {
        let cfg = TelegramAccountConfig {
            token: Secret::new("tok".into()),
            subscription_policy: SubscriptionPolicy::AnyMessage,
            ..Default::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let cfg2: TelegramAccountConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg2.subscription_policy, SubscriptionPolicy::AnyMessage);
        assert_eq!(cfg2.token.expose_secret(), "tok");
    }
}
