use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DriveClientError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("auth error: {0}")]
    Auth(String),

    #[error("could not establish connection: {0}")]
    Connection(String),

    #[error("{0}")]
    Remote(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("request middleware error: {0}")]
    ReqwestMiddlewareError(#[from] reqwest_middleware::Error),

    #[error("parse error: {0}")]
    ParseError(#[from] url::ParseError),

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

pub type Result<T> = std::result::Result<T, DriveClientError>;

impl<T> From<std::sync::PoisonError<T>> for DriveClientError {
    fn from(value: std::sync::PoisonError<T>) -> Self {
        DriveClientError::LockPoisoned(format!("{value:?}"))
    }
}
