use thiserror::Error;

pub type Result<T> = std::result::Result<T,Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid parameters: {0}")]
    Config(String),
    #[error("constraint network is unsatisfiable")]
    Unsatisfiable,
    #[error("solver backend failure: {0}")]
    Backend(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse parameter file: {0}")]
    Json(#[from] serde_json::Error)
}
