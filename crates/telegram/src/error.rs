use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),

    #[error(transparent)]
    Subscribers(#[from] alertcast_subscribers::Error),

    /// Rejected before any network or store call.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("not a telegram chat id: {conversation_id}")]
    InvalidConversation { conversation_id: String },

    #[error("no subscribers with a conversation id to send to")]
    NoRecipients,

    #[error("a reconciliation pass is already in flight")]
    PassInFlight,

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_conversation(conversation_id: impl Into<String>) -> Self {
        Self::InvalidConversation {
            conversation_id: conversation_id.into(),
        }
    }

    /// Whether the error was raised by input checks rather than I/O.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        match self {
            Self::InvalidInput { .. } | Self::InvalidConversation { .. } | Self::NoRecipients => {
                true
            },
            Self::Subscribers(inner) => inner.is_validation(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
