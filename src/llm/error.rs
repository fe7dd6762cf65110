/// Classified provider failure, so callers can pick a user-facing message
/// without echoing raw provider text.
#[derive(Debug, thiserror::Error)]
#[error("provider error ({kind:?}, status {status:?}): {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// 401/403
    Auth,
    /// 402
    Billing,
    /// 429
    RateLimit,
    /// 404, usually a bad model name.
    NotFound,
    Timeout,
    /// Connection refused, DNS failure, reset.
    Network,
    /// 5xx
    ServerError,
    /// Response arrived but could not be understood.
    Malformed,
    Unknown,
}

const MAX_BODY_CHARS: usize = 300;

impl ProviderError {
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            401 | 403 => ProviderErrorKind::Auth,
            402 => ProviderErrorKind::Billing,
            404 => ProviderErrorKind::NotFound,
            408 => ProviderErrorKind::Timeout,
            429 => ProviderErrorKind::RateLimit,
            500..=599 => ProviderErrorKind::ServerError,
            _ => ProviderErrorKind::Unknown,
        };
        Self {
            kind,
            status: Some(status),
            message: body.chars().take(MAX_BODY_CHARS).collect(),
        }
    }

    pub fn network(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ProviderErrorKind::Timeout
        } else {
            ProviderErrorKind::Network
        };
        Self {
            kind,
            status: None,
            message: err.to_string(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Malformed,
            status: None,
            message: message.into(),
        }
    }

    /// Plain-language summary safe to show the end user.
    pub fn user_message(&self) -> &'static str {
        match self.kind {
            ProviderErrorKind::Auth | ProviderErrorKind::Billing | ProviderErrorKind::NotFound => {
                "The assistant is misconfigured right now. Please try again later."
            }
            ProviderErrorKind::RateLimit => {
                "I'm receiving too many requests right now. Please try again in a moment."
            }
            ProviderErrorKind::Timeout => "That took too long to answer. Please try again.",
            ProviderErrorKind::Network | ProviderErrorKind::ServerError => {
                "I couldn't reach the language service. Please try again shortly."
            }
            ProviderErrorKind::Malformed | ProviderErrorKind::Unknown => {
                "Something went wrong while processing your request. Please try again."
            }
        }
    }
}

/// Best user-facing message for an arbitrary error chain.
pub fn user_message_for(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<ProviderError>() {
        Some(p) => p.user_message(),
        None => "Something went wrong while processing your request. Please try again.",
    }
}
