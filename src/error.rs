use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the proposal core. All of them are local and
/// non-retryable; shape checks fail fast instead of broadcasting.
#[derive(Error, Debug)]
pub enum Error {
    #[error("expected an (n, 4) box array, got ({rows}, {cols})")]
    MalformedBoxes { rows: usize, cols: usize },

    #[error("inconsistent rois number: {reference} reference boxes, {target} target boxes")]
    BoxCountMismatch { reference: usize, target: usize },

    #[error("deltas of shape ({rows}, {cols}) do not line up with {boxes} boxes")]
    MalformedDeltas { rows: usize, cols: usize, boxes: usize },

    #[error("{scores} scores for {boxes} boxes")]
    ScoreCountMismatch { scores: usize, boxes: usize },

    #[error("ground-truth box set is empty")]
    EmptyGroundTruth,

    #[error("crop size must be at least 1")]
    ZeroCropSize,

    #[error("failed to load settings: {0}")]
    Settings(#[from] config::ConfigError),
}
