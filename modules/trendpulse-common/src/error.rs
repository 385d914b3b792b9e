use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrendpulseError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
