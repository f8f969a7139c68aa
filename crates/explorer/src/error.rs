#[derive(Debug, thiserror::Error)]
pub enum ExplorerError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExplorerError {
    /// HTTP status of the failed request, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message shown in a table's inline error region.
    pub fn user_message(&self) -> String {
        match self {
            Self::Http { status, .. } => {
                format!("Could not load results (HTTP {status}). Please try again.")
            }
            Self::Transport(_) => {
                "Could not reach the data service. Please check your connection.".to_string()
            }
            Self::Decode(_) => "The data service returned an unexpected response.".to_string(),
            other => format!("Could not load results: {other}"),
        }
    }
}

impl From<reqwest::Error> for ExplorerError {
    fn from(error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            Self::Http {
                status: status.as_u16(),
                message: error.to_string(),
            }
        } else if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

impl From<serde_json::Error> for ExplorerError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExplorerError>;
