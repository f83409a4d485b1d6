use thiserror::Error;

#[derive(Error, Debug)]
pub enum PingmeError {
    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}
