use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use quadpose_image::Image;

use crate::annotate::{render, DisplayFrames};
use crate::config::ThresholdParams;
use crate::error::{FrameError, PipelineError, SinkError, SourceError, TrackerError};
use crate::pipeline::MarkerPipeline;
use crate::pose::MarkerPose;

/// Produces RGB frames.
pub trait FrameSource {
    /// Return the next frame, blocking until one is available.
    ///
    /// `Ok(None)` marks the end of a finite sequence.
    fn next_frame(&mut self) -> Result<Option<Image<u8, 3>>, SourceError>;
}

/// Provides the current color threshold knobs.
pub trait ParameterSource {
    /// The thresholds to use for the next frame.
    fn thresholds(&mut self) -> ThresholdParams;
}

impl ParameterSource for ThresholdParams {
    fn thresholds(&mut self) -> ThresholdParams {
        *self
    }
}

/// Shows the per-frame images.
pub trait DisplaySink {
    /// Publish the images of one frame.
    fn show(&mut self, frames: &DisplayFrames) -> Result<(), SinkError>;
}

/// Receives the pose of every frame in which one was solved.
pub trait ReportSink {
    /// Report a pose.
    fn report(&mut self, pose: &MarkerPose) -> Result<(), SinkError>;
}

/// Counters kept over a [`Tracker::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerSummary {
    /// Frames pulled from the source and processed.
    pub frames: usize,
    /// Poses sent to the report sink.
    pub poses: usize,
    /// Frames without a marker.
    pub no_marker: usize,
    /// Frames with a marker but no usable pose.
    pub degenerate: usize,
}

/// Weight of the previous estimate in `LoopRate`.
const RATE_SMOOTHING: f32 = 0.95;

/// Exponentially smoothed iterations per second of the frame loop.
struct LoopRate {
    last: Instant,
    per_sec: f32,
}

impl LoopRate {
    fn start() -> Self {
        Self {
            last: Instant::now(),
            per_sec: 0.0,
        }
    }

    /// Mark the end of an iteration and return the smoothed rate.
    fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        self.last = now;

        // two ticks on the same instant carry no timing information
        if dt > 0.0 {
            let current = dt.recip();
            self.per_sec = if self.per_sec > 0.0 {
                RATE_SMOOTHING * self.per_sec + (1.0 - RATE_SMOOTHING) * current
            } else {
                current
            };
        }
        self.per_sec
    }
}

/// Single threaded loop tying a frame source to the pipeline and the sinks.
pub struct Tracker<S, P, D, R> {
    pipeline: MarkerPipeline,
    source: S,
    params: P,
    display: D,
    report: R,
    stop: Arc<AtomicBool>,
}

impl<S, P, D, R> Tracker<S, P, D, R>
where
    S: FrameSource,
    P: ParameterSource,
    D: DisplaySink,
    R: ReportSink,
{
    /// Create a tracker. It runs until the source is exhausted or the stop
    /// flag is set.
    pub fn new(pipeline: MarkerPipeline, source: S, params: P, display: D, report: R) -> Self {
        Self {
            pipeline,
            source,
            params,
            display,
            report,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A handle that stops the loop after the current frame when set.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Process one frame and publish the results.
    pub fn step(
        &mut self,
        frame: &Image<u8, 3>,
        summary: &mut TrackerSummary,
    ) -> Result<(), TrackerError> {
        let thresholds = self.params.thresholds();
        let output = self.pipeline.process(frame, &thresholds)?;
        summary.frames += 1;

        let shown = render(frame, &output).map_err(PipelineError::from)?;
        self.display.show(&shown)?;

        match &output.pose {
            Ok(pose) => {
                self.report.report(pose)?;
                summary.poses += 1;
            }
            Err(FrameError::NoMarkerFound) => {
                log::debug!("frame {}: no marker found", summary.frames);
                summary.no_marker += 1;
            }
            Err(e @ FrameError::DegeneratePose(_)) => {
                log::warn!("frame {}: {e}", summary.frames);
                summary.degenerate += 1;
            }
        }
        Ok(())
    }

    /// Run the loop.
    ///
    /// # Errors
    ///
    /// A failed frame acquisition ends the loop with an error, as do sink and
    /// buffer failures. Missing markers and degenerate poses only skip the report.
    pub fn run(&mut self) -> Result<TrackerSummary, TrackerError> {
        let mut summary = TrackerSummary::default();
        let mut rate = LoopRate::start();
        log::info!("tracker started");

        while !self.stop.load(Ordering::SeqCst) {
            let Some(frame) = self.source.next_frame()? else {
                log::info!("frame source exhausted");
                break;
            };

            self.step(&frame, &mut summary)?;

            log::debug!("fps: {:.1}", rate.tick());
        }

        log::info!(
            "tracker stopped after {} frames ({} poses, {} without marker, {} degenerate)",
            summary.frames,
            summary.poses,
            summary.no_marker,
            summary.degenerate
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use quadpose_image::ImageSize;
    use std::collections::VecDeque;

    struct Frames(VecDeque<Result<Image<u8, 3>, SourceError>>);

    impl FrameSource for Frames {
        fn next_frame(&mut self) -> Result<Option<Image<u8, 3>>, SourceError> {
            self.0.pop_front().transpose()
        }
    }

    #[derive(Default)]
    struct Shown(usize);

    impl DisplaySink for Shown {
        fn show(&mut self, _frames: &DisplayFrames) -> Result<(), SinkError> {
            self.0 += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Reports(Vec<MarkerPose>);

    impl ReportSink for Reports {
        fn report(&mut self, pose: &MarkerPose) -> Result<(), SinkError> {
            self.0.push(pose.clone());
            Ok(())
        }
    }

    struct StopAfterFirst(Arc<AtomicBool>);

    impl DisplaySink for StopAfterFirst {
        fn show(&mut self, _frames: &DisplayFrames) -> Result<(), SinkError> {
            self.0.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn background() -> Image<u8, 3> {
        let size = ImageSize {
            width: 32,
            height: 24,
        };
        Image::from_size_val(size, 40).expect("non-empty size")
    }

    fn pipeline() -> MarkerPipeline {
        MarkerPipeline::new(PipelineConfig::default()).expect("default config is valid")
    }

    #[test]
    fn test_loop_rate() {
        let mut rate = LoopRate::start();
        assert_eq!(rate.per_sec, 0.0);

        std::thread::sleep(std::time::Duration::from_millis(5));
        let first = rate.tick();
        assert!(first > 0.0 && first.is_finite());
        // a 5 ms iteration is at most 200 per second
        assert!(first <= 201.0);

        // a zero length interval leaves the estimate unchanged
        rate.last = Instant::now() + std::time::Duration::from_secs(1);
        assert_eq!(rate.tick(), first);

        std::thread::sleep(std::time::Duration::from_millis(2));
        let smoothed = rate.tick();
        assert!(smoothed.is_finite() && smoothed > 0.0);
    }

    #[test]
    fn test_run_until_exhausted() -> Result<(), TrackerError> {
        let frames = Frames((0..3).map(|_| Ok(background())).collect());
        let mut tracker = Tracker::new(
            pipeline(),
            frames,
            ThresholdParams::default(),
            Shown::default(),
            Reports::default(),
        );
        let summary = tracker.run()?;
        assert_eq!(
            summary,
            TrackerSummary {
                frames: 3,
                poses: 0,
                no_marker: 3,
                degenerate: 0,
            }
        );
        assert_eq!(tracker.display.0, 3);
        assert!(tracker.report.0.is_empty());
        Ok(())
    }

    #[test]
    fn test_acquisition_failure_is_fatal() {
        let frames = Frames(VecDeque::from(vec![
            Ok(background()),
            Err(SourceError::Acquisition("camera unplugged".into())),
            Ok(background()),
        ]));
        let mut tracker = Tracker::new(
            pipeline(),
            frames,
            ThresholdParams::default(),
            Shown::default(),
            Reports::default(),
        );
        let result = tracker.run();
        assert!(matches!(
            result,
            Err(TrackerError::Source(SourceError::Acquisition(_)))
        ));
        assert_eq!(tracker.display.0, 1);
    }

    #[test]
    fn test_stop_flag_ends_loop() -> Result<(), TrackerError> {
        let frames = Frames((0..5).map(|_| Ok(background())).collect());
        let stop = Arc::new(AtomicBool::new(false));
        let mut tracker = Tracker::new(
            pipeline(),
            frames,
            ThresholdParams::default(),
            StopAfterFirst(stop.clone()),
            Reports::default(),
        );
        tracker.stop = stop;
        let summary = tracker.run()?;
        assert_eq!(summary.frames, 1);
        Ok(())
    }

    #[test]
    fn test_preset_stop_processes_nothing() -> Result<(), TrackerError> {
        let frames = Frames((0..2).map(|_| Ok(background())).collect());
        let mut tracker = Tracker::new(
            pipeline(),
            frames,
            ThresholdParams::default(),
            Shown::default(),
            Reports::default(),
        );
        tracker.stop_handle().store(true, Ordering::SeqCst);
        assert_eq!(tracker.run()?.frames, 0);
        Ok(())
    }
}
