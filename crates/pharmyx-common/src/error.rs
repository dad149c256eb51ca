use thiserror::Error;

#[derive(Debug, Error)]
pub enum PharmyxError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("E-utilities returned HTTP {status}")]
    Status { status: u16 },

    #[error("E-utilities error: {0}")]
    Entrez(String),
}

pub type Result<T> = std::result::Result<T, PharmyxError>;

/// Why a single PMID produced no record.
///
/// A `FetchError` is terminal for that PMID only; the batch carries on.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("efetch returned HTTP {status}")]
    Status { status: u16 },

    #[error("XML parse error: {0}")]
    Parse(String),

    #[error("no PubmedArticle in efetch response for PMID {0}")]
    NoData(String),
}

impl FetchError {
    /// Short label for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "transport",
            FetchError::Status { .. } => "status",
            FetchError::Parse(_) => "parse",
            FetchError::NoData(_) => "no_data",
        }
    }
}
