//! Error types for the simulation kernel.
//!
//! Every failure the kernel can report is a [`SimError`]. Callers that only
//! care about the broad category (abort before start, refuse to overwrite,
//! bad input data, internal contract violation) match on [`SimError::kind`].

use thiserror::Error;

use crate::components::Position;
use crate::persistence::StoreError;

/// Broad category of a [`SimError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed bounds, step, parameters or a layer without dimensions.
    Config,
    /// A layer would be replaced without an explicit overwrite flag.
    Conflict,
    /// Missing or empty sites, or a spawn outside the grid.
    Data,
    /// A cell access outside the grid extents.
    Bounds,
    /// The layer store collaborator failed.
    Store,
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("grid step must be positive, got {rows}x{cols}")]
    InvalidStep { rows: usize, cols: usize },

    #[error("invalid bounds: north {north} / south {south}, east {east} / west {west}")]
    InvalidBounds {
        north: f64,
        south: f64,
        east: f64,
        west: f64,
    },

    #[error("grid has no bounds; set bounds before adding layer `{0}`")]
    MissingBounds(String),

    #[error("grid step is fixed at {expected_rows}x{expected_cols} once layers exist, got {rows}x{cols}")]
    StepChanged {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    #[error("layer `{layer}` has {found} cells, grid expects {expected}")]
    DimensionMismatch {
        layer: String,
        expected: usize,
        found: usize,
    },

    #[error("layer `{0}` is not present in the grid")]
    MissingLayer(String),

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("layer `{0}` already exists and overwrite is not allowed")]
    LayerExists(String),

    #[error("site layer `{0}` is not present in the grid")]
    MissingSiteLayer(String),

    #[error("site layer `{0}` contains no site cells")]
    NoSites(String),

    #[error("cannot spawn at {position:?}: outside {rows}x{cols} grid")]
    SpawnOutsideGrid {
        position: Position,
        rows: usize,
        cols: usize,
    },

    #[error("cell ({row}, {col}) is outside {rows}x{cols} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SimError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimError::InvalidStep { .. }
            | SimError::InvalidBounds { .. }
            | SimError::MissingBounds(_)
            | SimError::StepChanged { .. }
            | SimError::DimensionMismatch { .. }
            | SimError::MissingLayer(_)
            | SimError::InvalidParameter { .. } => ErrorKind::Config,
            SimError::LayerExists(_) => ErrorKind::Conflict,
            SimError::MissingSiteLayer(_)
            | SimError::NoSites(_)
            | SimError::SpawnOutsideGrid { .. } => ErrorKind::Data,
            SimError::OutOfBounds { .. } => ErrorKind::Bounds,
            SimError::Store(_) => ErrorKind::Store,
        }
    }

    pub(crate) fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
        SimError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            SimError::InvalidStep { rows: 0, cols: 3 }.kind(),
            ErrorKind::Config
        );
        assert_eq!(
            SimError::LayerExists("cost".into()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(SimError::NoSites("sites".into()).kind(), ErrorKind::Data);
        assert_eq!(
            SimError::OutOfBounds {
                row: 5,
                col: 0,
                rows: 3,
                cols: 3
            }
            .kind(),
            ErrorKind::Bounds
        );
    }

    #[test]
    fn test_display_names_the_layer() {
        let err = SimError::DimensionMismatch {
            layer: "cost".into(),
            expected: 9,
            found: 4,
        };
        assert_eq!(err.to_string(), "layer `cost` has 4 cells, grid expects 9");
    }
}
