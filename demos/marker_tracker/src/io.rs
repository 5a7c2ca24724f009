use std::path::{Path, PathBuf};
use std::time::SystemTime;

use quadpose::error::{SinkError, SourceError};
use quadpose::{
    DisplayFrames, DisplaySink, FrameSource, MarkerPose, ParameterSource, ReportSink,
    ThresholdParams,
};
use quadpose_image::{Image, ImageSize};

const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Frames read from the images of a directory in file name order.
pub struct DirectorySource {
    paths: Vec<PathBuf>,
    next: usize,
    loop_forever: bool,
}

impl DirectorySource {
    /// Open a directory holding at least one frame.
    pub fn open(dir: &Path, loop_forever: bool) -> Result<Self, SourceError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| SourceError::Unavailable(format!("{}: {e}", dir.display())))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.to_ascii_lowercase())
                    .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.as_str()))
            })
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(SourceError::Unavailable(format!(
                "no frames in {}",
                dir.display()
            )));
        }
        log::info!("reading {} frames from {}", paths.len(), dir.display());

        Ok(Self {
            paths,
            next: 0,
            loop_forever,
        })
    }
}

/// Decode an image file as RGB.
pub fn read_rgb(path: &Path) -> Result<Image<u8, 3>, SourceError> {
    let rgb = image::open(path)
        .map_err(|e| SourceError::Acquisition(format!("{}: {e}", path.display())))?
        .into_rgb8();
    let size = ImageSize {
        width: rgb.width() as usize,
        height: rgb.height() as usize,
    };
    Image::new(size, rgb.into_raw()).map_err(|e| SourceError::Acquisition(e.to_string()))
}

impl FrameSource for DirectorySource {
    fn next_frame(&mut self) -> Result<Option<Image<u8, 3>>, SourceError> {
        if self.next == self.paths.len() {
            if !self.loop_forever {
                return Ok(None);
            }
            self.next = 0;
        }
        let path = &self.paths[self.next];
        self.next += 1;
        read_rgb(path).map(Some)
    }
}

/// Threshold knobs kept in a JSON file that may be edited while running.
///
/// The file is read again whenever its modification time changes. A missing
/// or half written file keeps the last good values.
pub struct ThresholdFile {
    path: PathBuf,
    modified: Option<SystemTime>,
    current: ThresholdParams,
}

impl ThresholdFile {
    /// Watch `path`, starting from `initial`.
    pub fn new(path: PathBuf, initial: ThresholdParams) -> Self {
        Self {
            path,
            modified: None,
            current: initial,
        }
    }
}

impl ParameterSource for ThresholdFile {
    fn thresholds(&mut self) -> ThresholdParams {
        let Ok(modified) = std::fs::metadata(&self.path).and_then(|m| m.modified()) else {
            return self.current;
        };
        if self.modified == Some(modified) {
            return self.current;
        }

        match ThresholdParams::from_json_file(&self.path) {
            Ok(params) => {
                if params != self.current {
                    log::info!("thresholds updated: {:?} - {:?}", params.lower(), params.upper());
                }
                self.current = params;
                self.modified = Some(modified);
            }
            Err(e) => log::warn!("keeping previous thresholds: {e}"),
        }
        self.current
    }
}

/// Writes the display images as PNG files, overwritten every frame.
pub struct PngDisplay {
    dir: PathBuf,
}

impl PngDisplay {
    /// Write into `dir`, creating it if needed.
    pub fn new(dir: PathBuf) -> Result<Self, SinkError> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }
}

fn save_png<const C: usize>(path: &Path, img: &Image<u8, C>) -> Result<(), SinkError> {
    let color = match C {
        1 => image::ExtendedColorType::L8,
        3 => image::ExtendedColorType::Rgb8,
        _ => return Err(SinkError::Other(format!("cannot save {C} channel image"))),
    };
    image::save_buffer(
        path,
        img.as_slice(),
        img.width() as u32,
        img.height() as u32,
        color,
    )
    .map_err(|e| SinkError::Other(format!("{}: {e}", path.display())))
}

impl DisplaySink for PngDisplay {
    fn show(&mut self, frames: &DisplayFrames) -> Result<(), SinkError> {
        save_png(&self.dir.join("original.png"), &frames.annotated)?;
        save_png(&self.dir.join("thresholding.png"), &frames.mask)?;
        save_png(&self.dir.join("contours.png"), &frames.corners)?;
        Ok(())
    }
}

/// Streams the display images to a rerun viewer.
#[cfg(feature = "rerun")]
pub struct RerunDisplay {
    rec: rerun::RecordingStream,
}

#[cfg(feature = "rerun")]
impl RerunDisplay {
    /// Spawn a viewer.
    pub fn spawn() -> Result<Self, Box<dyn std::error::Error>> {
        let rec = rerun::RecordingStreamBuilder::new("Quadpose Marker Tracker").spawn()?;
        Ok(Self { rec })
    }
}

#[cfg(feature = "rerun")]
impl DisplaySink for RerunDisplay {
    fn show(&mut self, frames: &DisplayFrames) -> Result<(), SinkError> {
        let send = |entity: &str, img: rerun::Image| {
            self.rec
                .log(entity, &img)
                .map_err(|e| SinkError::Other(e.to_string()))
        };
        let (a, m, c) = (&frames.annotated, &frames.mask, &frames.corners);
        send(
            "original",
            rerun::Image::from_elements(a.as_slice(), a.size().into(), rerun::ColorModel::RGB),
        )?;
        send(
            "thresholding",
            rerun::Image::from_elements(m.as_slice(), m.size().into(), rerun::ColorModel::L),
        )?;
        send(
            "contours",
            rerun::Image::from_elements(c.as_slice(), c.size().into(), rerun::ColorModel::RGB),
        )?;
        Ok(())
    }
}

/// Fans the display images out to several sinks.
pub struct Displays(pub Vec<Box<dyn DisplaySink>>);

impl DisplaySink for Displays {
    fn show(&mut self, frames: &DisplayFrames) -> Result<(), SinkError> {
        for sink in self.0.iter_mut() {
            sink.show(frames)?;
        }
        Ok(())
    }
}

/// Prints each pose to stdout.
pub struct ConsoleReport;

/// Format a pose as the two report lines.
pub fn format_pose(pose: &MarkerPose) -> String {
    let t = pose.translation();
    let e = &pose.euler;
    format!(
        "TVEC:- [{:.4}, {:.4}, {:.4}]\nAngles:- [{:.4}, {:.4}, {:.4}]",
        t[0], t[1], t[2], e.x, e.y, e.z
    )
}

impl ReportSink for ConsoleReport {
    fn report(&mut self, pose: &MarkerPose) -> Result<(), SinkError> {
        println!("{}", format_pose(pose));
        Ok(())
    }
}
