use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Rejected before any state change (empty names, blank ids).
    #[error("invalid subscriber input: {message}")]
    InvalidInput { message: String },

    #[error("conversation {conversation_id} already belongs to subscriber {subscriber_id}")]
    ConversationTaken {
        conversation_id: String,
        subscriber_id: String,
    },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn conversation_taken(
        conversation_id: impl Into<String>,
        subscriber_id: impl Into<String>,
    ) -> Self {
        Self::ConversationTaken {
            conversation_id: conversation_id.into(),
            subscriber_id: subscriber_id.into(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Whether the error is a caller mistake rather than a storage failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidInput { .. } | Self::ConversationTaken { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
