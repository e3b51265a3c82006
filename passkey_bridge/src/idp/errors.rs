use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum IdpError {
    #[error("Request to identity provider failed: {0}")]
    Http(String),

    #[error("Identity provider returned {status} for {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("Invalid response from identity provider: {0}")]
    InvalidResponse(String),

    #[error("Identity provider configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for IdpError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}
