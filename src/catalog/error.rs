use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog file read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog format: {0}")]
    Format(String),
    #[error("no catalog entry matches \"{0}\"")]
    NotFound(String),
    #[error("unable to fetch catalog: {0}")]
    Network(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        CatalogError::Network(err.to_string())
    }
}
