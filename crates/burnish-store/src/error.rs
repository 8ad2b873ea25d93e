use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store persistence error: {0}")]
    Persistence(String),
    #[error("store codec error: {0}")]
    Codec(String),
}
