//! Error type shared by every stage of the visualization pipeline.

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum VisError {
    #[error("file type `{format}` is unsupported (supported: csv, mtx, npz, dot, gv)")]
    UnsupportedFormat { format: String },

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error(
        "the graph has not been laid out yet; run a layout or load a laid-out .gv/.dot file"
    )]
    NotLaidOut,

    #[error("edge references node `{0}` which has no position")]
    MissingPosition(String),

    #[error("layout engine error: {0}")]
    Layout(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VisError {
    pub(crate) fn unsupported(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VisError>;
