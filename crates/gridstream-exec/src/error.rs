use thiserror::Error;

use gridstream_cells::LayoutError;

use crate::report::Progress;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("schema error: {0}")]
    Schema(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("row source failed after {progress}: {source}")]
    Source {
        progress: Progress,
        source: gridstream_io::Error,
    },

    #[error("sink failed after {progress}: {source}")]
    Sink {
        progress: Progress,
        source: gridstream_io::Error,
    },

    #[error("layout failed after {progress}: {source}")]
    Layout {
        progress: Progress,
        source: LayoutError,
    },
}

impl ExecError {
    /// Rows processed and sheet reached when a fatal error stopped the run.
    /// `None` for errors raised before any output.
    pub fn progress(&self) -> Option<Progress> {
        match self {
            ExecError::Source { progress, .. }
            | ExecError::Sink { progress, .. }
            | ExecError::Layout { progress, .. } => Some(*progress),
            ExecError::Schema(_) | ExecError::Config(_) => None,
        }
    }
}

impl From<gridstream_core::Error> for ExecError {
    fn from(e: gridstream_core::Error) -> Self {
        match e {
            gridstream_core::Error::Schema(msg) => ExecError::Schema(msg),
            gridstream_core::Error::Config(msg) | gridstream_core::Error::Invariant(msg) => {
                ExecError::Config(msg)
            }
        }
    }
}

impl From<gridstream_mem::Error> for ExecError {
    fn from(e: gridstream_mem::Error) -> Self {
        ExecError::Config(e.to_string())
    }
}
