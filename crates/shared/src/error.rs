use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    /// A grid configuration that would produce degenerate or NaN points.
    #[error("invalid grid config: {0}")]
    Config(String),

    #[error("ranking matrix is {rows}x{cols}, expected {size}x{size}")]
    MatrixShape { rows: usize, cols: usize, size: usize },

    #[error("unrecognised grid size label \"{0}\"")]
    GridSizeLabel(String),
}

impl GridError {
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }
}
