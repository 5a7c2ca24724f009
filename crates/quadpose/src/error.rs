use quadpose_image::ImageError;
use quadpose_imgproc::morphology::MorphologyError;
use quadpose_pnp::{EulerError, PnPError};

use crate::corners::CornerOrderError;

/// Why a detected marker produced no pose.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PoseFailure {
    /// The quad corners could not be put in slot order.
    #[error(transparent)]
    Corners(#[from] CornerOrderError),

    /// The PnP solver rejected the correspondences.
    #[error(transparent)]
    Solver(#[from] PnPError),

    /// The solved rotation is not orthonormal.
    #[error(transparent)]
    Rotation(#[from] EulerError),
}

/// Per-frame outcomes that skip the report but keep the loop running.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    /// No contour passed the quad filters.
    #[error("no marker found")]
    NoMarkerFound,

    /// A marker was found but no usable pose could be computed.
    #[error("degenerate pose: {0}")]
    DegeneratePose(#[from] PoseFailure),
}

/// Errors that abort processing of a frame.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// Image buffers disagree in size.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// The mask cleaner failed.
    #[error(transparent)]
    Morphology(#[from] MorphologyError),
}

/// Errors raised by a [`crate::tracker::FrameSource`].
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    /// The source could not be opened.
    #[error("frame source unavailable: {0}")]
    Unavailable(String),

    /// A frame could not be read from an open source.
    #[error("failed to acquire frame: {0}")]
    Acquisition(String),
}

/// Errors raised by display and report sinks.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    /// Writing to the underlying medium failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Any other sink specific failure.
    #[error("sink failed: {0}")]
    Other(String),
}

/// Errors that stop the [`crate::tracker::Tracker`] loop.
#[derive(thiserror::Error, Debug)]
pub enum TrackerError {
    /// The frame source failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A sink failed.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Frame processing failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}
