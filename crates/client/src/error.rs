use api_shared::ErrorBody;
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with a failure envelope.
    #[error("{message} (HTTP {status})")]
    Api {
        status: u16,
        message: String,
        errors: Option<BTreeMap<String, Vec<String>>>,
    },
    #[error("not signed in")]
    NotAuthenticated,
    #[error("invalid base URL: {0}")]
    InvalidUrl(String),
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("session store error: {0}")]
    Store(#[from] std::io::Error),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

impl ClientError {
    pub(crate) fn from_body(status: u16, body: ErrorBody) -> Self {
        ClientError::Api {
            status,
            message: body.message,
            errors: body.errors,
        }
    }

    /// HTTP status of an API failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Field validation messages, if the failure carried any.
    pub fn field_errors(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        match self {
            ClientError::Api { errors, .. } => errors.as_ref(),
            _ => None,
        }
    }
}
