use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}
