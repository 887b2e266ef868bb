use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid bounding box: {bbox}. Expected west,south,east,north")]
    InvalidBbox { bbox: String },

    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Cropmap(#[from] cropmap::Error),
}
