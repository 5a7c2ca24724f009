use quadpose_image::Image;
use quadpose_imgproc::contours::find_external_contours;

use crate::clean::MaskCleaner;
use crate::config::{ConfigError, PipelineConfig, ThresholdParams};
use crate::corners::{order_corners, vertices_to_points, OrderedCorners};
use crate::error::{FrameError, PipelineError};
use crate::pose::{MarkerPose, PoseSolver};
use crate::quad::{MarkerCandidate, QuadSelector};
use crate::segment::segment;

/// The quad found in a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// The selected quadrilateral.
    pub candidate: MarkerCandidate,
    /// Its corners in slot order, `None` when they could not be ordered.
    pub corners: Option<OrderedCorners>,
}

/// Everything computed for one frame.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    /// The cleaned segmentation mask.
    pub mask: Image<u8, 1>,
    /// The selected marker, if any.
    pub detection: Option<Detection>,
    /// The marker pose, or why there is none.
    pub pose: Result<MarkerPose, FrameError>,
}

/// Runs segmentation, cleaning, quad selection, corner ordering and pose
/// estimation on single frames.
///
/// Frames are independent; nothing is carried from one call to the next.
#[derive(Debug, Clone)]
pub struct MarkerPipeline {
    cleaner: MaskCleaner,
    selector: QuadSelector,
    solver: PoseSolver,
}

impl MarkerPipeline {
    /// Build a pipeline from a validated configuration.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let cleaner = MaskCleaner::from_config(&config.kernel)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(Self {
            cleaner,
            selector: QuadSelector::new(config.min_area, config.epsilon_fraction),
            solver: PoseSolver::new(
                config.camera,
                config.world_points,
                config.pnp.planar_params(),
            ),
        })
    }

    /// The pose solver, exposing the camera and marker geometry.
    pub fn solver(&self) -> &PoseSolver {
        &self.solver
    }

    /// Process one RGB frame with the given threshold knobs.
    ///
    /// # Errors
    ///
    /// Only buffer level failures are returned as errors. A missing marker or an
    /// unusable pose is reported through [`FrameOutput::pose`].
    pub fn process(
        &self,
        frame: &Image<u8, 3>,
        thresholds: &ThresholdParams,
    ) -> Result<FrameOutput, PipelineError> {
        let raw = segment(frame, thresholds)?;
        let mask = self.cleaner.clean(&raw)?;

        let contours = find_external_contours(&mask)?;
        log::debug!("found {} external contours", contours.len());

        let Some(candidate) = self.selector.select(&contours) else {
            return Ok(FrameOutput {
                mask,
                detection: None,
                pose: Err(FrameError::NoMarkerFound),
            });
        };

        let (corners, pose) = match order_corners(&vertices_to_points(&candidate.vertices)) {
            Ok(corners) => {
                let pose = self.solver.solve(&corners).map_err(FrameError::from);
                (Some(corners), pose)
            }
            Err(e) => (None, Err(FrameError::DegeneratePose(e.into()))),
        };

        Ok(FrameOutput {
            mask,
            detection: Some(Detection { candidate, corners }),
            pose,
        })
    }
}
