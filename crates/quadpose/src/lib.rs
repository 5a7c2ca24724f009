#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! Each frame goes through color segmentation, mask cleaning, external contour
//! extraction, quad selection, corner ordering and planar PnP. The solved
//! rotation is reported as Euler angles in degrees.
//!
//! ```rust
//! use quadpose::{MarkerPipeline, PipelineConfig, ThresholdParams};
//! use quadpose_image::{Image, ImageSize};
//!
//! let pipeline = MarkerPipeline::new(PipelineConfig::default())?;
//! let frame = Image::<u8, 3>::from_size_val(ImageSize { width: 64, height: 48 }, 0)?;
//!
//! let output = pipeline.process(&frame, &ThresholdParams::default())?;
//! assert!(output.pose.is_err());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// drawing of the display images.
pub mod annotate;

/// mask cleaning with morphology.
pub mod clean;

/// pipeline configuration and threshold knobs.
pub mod config;

pub mod corners;

/// error types.
pub mod error;

/// the per-frame marker pipeline.
pub mod pipeline;

/// marker pose from ordered corners.
pub mod pose;

/// quadrilateral candidate selection.
pub mod quad;

/// color segmentation.
pub mod segment;

/// the frame loop and its collaborators.
pub mod tracker;

pub use crate::annotate::DisplayFrames;
pub use crate::config::{ConfigError, KernelConfig, PipelineConfig, PoseConfig, ThresholdParams};
pub use crate::corners::{order_corners, OrderedCorners};
pub use crate::error::{
    FrameError, PipelineError, PoseFailure, SinkError, SourceError, TrackerError,
};
pub use crate::pipeline::{Detection, FrameOutput, MarkerPipeline};
pub use crate::pose::{MarkerPose, PoseSolver};
pub use crate::quad::{MarkerCandidate, QuadSelector};
pub use crate::tracker::{
    DisplaySink, FrameSource, ParameterSource, ReportSink, Tracker, TrackerSummary,
};
