use thiserror::Error;

/// Result type local to gridstream-mem.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("flush threshold ratio must be in (0, 1], got {0}")]
    InvalidThreshold(f64),
}

impl From<Error> for gridstream_core::Error {
    fn from(e: Error) -> Self {
        gridstream_core::Error::Config(e.to_string())
    }
}
