use thiserror::Error;

/// Errors raised while building or evaluating a filter graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("{filter}: {message}")]
    InvalidArgument {
        filter: &'static str,
        message: String,
    },
    #[error("{filter}: {message}")]
    UnsupportedFormat {
        filter: &'static str,
        message: String,
    },
    #[error("{filter}: {message}")]
    FormatMismatch {
        filter: &'static str,
        message: String,
    },
    #[error("frame {requested} requested but clip has {available} frames")]
    FrameOutOfRange { requested: usize, available: usize },
    #[error("Expr: {message}")]
    Expression { message: String },
    #[error("clip must contain at least one frame")]
    EmptyClip,
}

impl FilterError {
    pub fn invalid_argument(filter: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            filter,
            message: message.into(),
        }
    }

    pub fn unsupported_format(filter: &'static str, message: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            filter,
            message: message.into(),
        }
    }

    pub fn format_mismatch(filter: &'static str, message: impl Into<String>) -> Self {
        Self::FormatMismatch {
            filter,
            message: message.into(),
        }
    }
}
