use thiserror::Error;

pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{vendor}: http error: {message}")]
    Http { vendor: &'static str, message: String },

    #[error("{vendor}: unexpected status {status}: {body}")]
    Status {
        vendor: &'static str,
        status: u16,
        body: String,
    },

    #[error("{vendor}: failed to encode request: {message}")]
    Encode { vendor: &'static str, message: String },

    #[error("{vendor}: failed to decode response: {message}")]
    Decode { vendor: &'static str, message: String },
}

impl LlmError {
    /// Vendor tag of the adapter that produced the error, if any.
    pub fn vendor(&self) -> Option<&'static str> {
        match self {
            Self::InvalidInput(_) => None,
            Self::Http { vendor, .. }
            | Self::Status { vendor, .. }
            | Self::Encode { vendor, .. }
            | Self::Decode { vendor, .. } => Some(vendor),
        }
    }

    pub(crate) fn http(vendor: &'static str, e: reqwest::Error) -> Self {
        Self::Http {
            vendor,
            message: e.to_string(),
        }
    }

    pub(crate) fn encode(vendor: &'static str, e: serde_json::Error) -> Self {
        Self::Encode {
            vendor,
            message: e.to_string(),
        }
    }

    pub(crate) fn decode(vendor: &'static str, e: serde_json::Error) -> Self {
        Self::Decode {
            vendor,
            message: e.to_string(),
        }
    }
}
