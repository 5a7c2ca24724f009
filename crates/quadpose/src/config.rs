//! Pipeline configuration and the color threshold knobs.

use quadpose_imgproc::morphology::KernelShape;
use quadpose_pnp::{CameraIntrinsics, CameraModel, LMParams, PlanarParams};
use serde::{Deserialize, Deserializer, Serialize};
use std::{fs, path::Path};

/// Errors raised while loading or validating configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The file could not be read or written.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The file is not valid JSON for the expected schema.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A value is outside its accepted range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn clamp_u8<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = f64::deserialize(deserializer)?;
    Ok(value.round().clamp(0.0, 255.0) as u8)
}

/// Inclusive per-channel color bounds used to segment the marker.
///
/// Bounds are in RGB order, matching the frame layout. Out of range values in
/// external sources are clamped to `[0, 255]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdParams {
    /// Lower bound of the red channel.
    #[serde(deserialize_with = "clamp_u8")]
    pub low_r: u8,
    /// Lower bound of the green channel.
    #[serde(deserialize_with = "clamp_u8")]
    pub low_g: u8,
    /// Lower bound of the blue channel.
    #[serde(deserialize_with = "clamp_u8")]
    pub low_b: u8,
    /// Upper bound of the red channel.
    #[serde(deserialize_with = "clamp_u8")]
    pub high_r: u8,
    /// Upper bound of the green channel.
    #[serde(deserialize_with = "clamp_u8")]
    pub high_g: u8,
    /// Upper bound of the blue channel.
    #[serde(deserialize_with = "clamp_u8")]
    pub high_b: u8,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            low_r: 0,
            low_g: 0,
            low_b: 168,
            high_r: 255,
            high_g: 152,
            high_b: 255,
        }
    }
}

impl ThresholdParams {
    /// Lower bounds as `[r, g, b]`.
    pub fn lower(&self) -> [u8; 3] {
        [self.low_r, self.low_g, self.low_b]
    }

    /// Upper bounds as `[r, g, b]`.
    pub fn upper(&self) -> [u8; 3] {
        [self.high_r, self.high_g, self.high_b]
    }

    /// Load the knobs from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Shape of the structuring element as written in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructuringShape {
    /// Filled rectangle.
    Rect,
    /// Centre row and column.
    Cross,
    /// Inscribed ellipse.
    Ellipse,
}

impl From<StructuringShape> for KernelShape {
    fn from(shape: StructuringShape) -> Self {
        match shape {
            StructuringShape::Rect => KernelShape::Box,
            StructuringShape::Cross => KernelShape::Cross,
            StructuringShape::Ellipse => KernelShape::Ellipse,
        }
    }
}

/// Structuring element used by the mask cleaner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Element shape.
    pub shape: StructuringShape,
    /// Width in pixels, odd.
    pub width: usize,
    /// Height in pixels, odd.
    pub height: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            shape: StructuringShape::Ellipse,
            width: 5,
            height: 5,
        }
    }
}

/// Settings of the pose solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    /// Maximum Levenberg–Marquardt iterations.
    pub max_iterations: usize,
    /// Convergence threshold on the squared error decrease.
    pub eps: f64,
    /// Initial damping.
    pub lambda_init: f64,
    /// Damping update factor.
    pub lambda_mul: f64,
    /// Poses with a larger reprojection RMSE (pixels) are rejected.
    pub max_reprojection_error: f64,
}

impl Default for PoseConfig {
    fn default() -> Self {
        let lm = LMParams::default();
        Self {
            max_iterations: lm.max_iters,
            eps: lm.eps,
            lambda_init: lm.lambda_init,
            lambda_mul: lm.lambda_mul,
            max_reprojection_error: PlanarParams::default().max_reprojection_error,
        }
    }
}

impl PoseConfig {
    /// Solver parameters for these settings.
    pub fn planar_params(&self) -> PlanarParams {
        PlanarParams {
            lm: LMParams {
                max_iters: self.max_iterations,
                eps: self.eps,
                lambda_init: self.lambda_init,
                lambda_mul: self.lambda_mul,
            },
            max_reprojection_error: self.max_reprojection_error,
            ..Default::default()
        }
    }
}

/// Camera the marker rig was calibrated with.
pub fn default_camera() -> CameraModel {
    CameraModel::pinhole(CameraIntrinsics::new(
        616.633_616_108_542_6,
        616.633_616_108_542_6,
        325.188_189_957_994_1,
        228.010_103_346_511_78,
    ))
}

/// Corners of the 50 x 50 marker in its own frame, in corner slot order.
pub const DEFAULT_WORLD_POINTS: [[f64; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [50.0, 0.0, 0.0],
    [50.0, 50.0, 0.0],
    [0.0, 50.0, 0.0],
];

/// Complete configuration of a [`crate::MarkerPipeline`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Intrinsics and distortion of the camera.
    pub camera: CameraModel,
    /// Marker corners in the marker frame, one per corner slot.
    pub world_points: [[f64; 3]; 4],
    /// Contours and quads must enclose strictly more than this many square pixels.
    pub min_area: f64,
    /// Polygon approximation tolerance as a fraction of the contour perimeter.
    pub epsilon_fraction: f64,
    /// Structuring element of the mask cleaner.
    pub kernel: KernelConfig,
    /// Pose solver settings.
    pub pnp: PoseConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            camera: default_camera(),
            world_points: DEFAULT_WORLD_POINTS,
            min_area: 2000.0,
            epsilon_fraction: 0.1,
            kernel: KernelConfig::default(),
            pnp: PoseConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a JSON config from disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Check every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.camera
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let k = &self.kernel;
        if k.width == 0 || k.height == 0 || k.width % 2 == 0 || k.height % 2 == 0 {
            return Err(ConfigError::Invalid(format!(
                "kernel size must be odd and non-zero, got {}x{}",
                k.width, k.height
            )));
        }

        if !(self.min_area.is_finite() && self.min_area > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "min_area must be positive, got {}",
                self.min_area
            )));
        }

        let eps = self.epsilon_fraction;
        if !(eps.is_finite() && eps > 0.0 && eps < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "epsilon_fraction must be in (0, 1), got {}",
                self.epsilon_fraction
            )));
        }

        if self.world_points.iter().flatten().any(|v| !v.is_finite())
            || self.world_points.iter().any(|p| p[2] != 0.0)
        {
            return Err(ConfigError::Invalid(
                "world_points must be finite and lie on the z = 0 plane".to_string(),
            ));
        }

        let p = &self.pnp;
        if p.max_iterations == 0 || p.lambda_mul <= 1.0 || p.lambda_init <= 0.0 || p.eps <= 0.0 {
            return Err(ConfigError::Invalid(
                "pnp needs max_iterations > 0, eps > 0, lambda_init > 0 and lambda_mul > 1"
                    .to_string(),
            ));
        }
        if p.max_reprojection_error.is_nan() || p.max_reprojection_error <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max_reprojection_error must be positive, got {}",
                p.max_reprojection_error
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() -> Result<(), ConfigError> {
        let config = PipelineConfig::default();
        config.validate()?;
        assert_eq!(config.min_area, 2000.0);
        assert_eq!(config.kernel.shape, StructuringShape::Ellipse);
        assert_eq!(config.camera.intrinsics.cx, 325.188_189_957_994_1);
        assert!(!config.camera.has_distortion());
        Ok(())
    }

    #[test]
    fn test_threshold_defaults_rgb_order() {
        let t = ThresholdParams::default();
        assert_eq!(t.lower(), [0, 0, 168]);
        assert_eq!(t.upper(), [255, 152, 255]);
    }

    #[test]
    fn test_threshold_clamps_external_values() -> Result<(), serde_json::Error> {
        let t: ThresholdParams =
            serde_json::from_str(r#"{"low_r": -20, "low_g": 10.4, "high_b": 300}"#)?;
        assert_eq!(t.low_r, 0);
        assert_eq!(t.low_g, 10);
        assert_eq!(t.high_b, 255);
        // missing keys keep their defaults
        assert_eq!(t.low_b, 168);
        assert_eq!(t.high_g, 152);
        Ok(())
    }

    #[test]
    fn test_partial_config() -> Result<(), ConfigError> {
        let json = r#"{
            "min_area": 500,
            "kernel": {"shape": "rect", "width": 3, "height": 3},
            "camera": {"fx": 500.0, "fy": 500.0, "cx": 320.0, "cy": 240.0,
                       "distortion": [0.1, 0.0, 0.0, 0.0, 0.0]}
        }"#;
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        assert_eq!(config.min_area, 500.0);
        assert_eq!(KernelShape::from(config.kernel.shape), KernelShape::Box);
        assert!(config.camera.has_distortion());
        assert_eq!(config.epsilon_fraction, 0.1);
        assert_eq!(config.world_points, DEFAULT_WORLD_POINTS);
        Ok(())
    }

    #[test]
    fn test_validate_rejects() {
        let mut config = PipelineConfig::default();
        config.kernel.width = 4;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = PipelineConfig::default();
        config.min_area = 0.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.epsilon_fraction = 1.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.camera.intrinsics.fx = -1.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.world_points[3][2] = 5.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.pnp.lambda_mul = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_file_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");

        let mut config = PipelineConfig::default();
        config.min_area = 1234.0;
        config.write_json(&path)?;

        let loaded = PipelineConfig::from_json_file(&path)?;
        assert_eq!(loaded, config);

        // calibrated intrinsics must survive save/load bit for bit
        let k = &loaded.camera.intrinsics;
        let k_gt = &config.camera.intrinsics;
        assert_eq!(k.cy.to_bits(), k_gt.cy.to_bits());
        assert_eq!(k.fx.to_bits(), k_gt.fx.to_bits());

        std::fs::write(&path, r#"{"epsilon_fraction": 2.0}"#)?;
        assert!(matches!(
            PipelineConfig::from_json_file(&path),
            Err(ConfigError::Invalid(_))
        ));

        std::fs::write(&path, "{ not json")?;
        assert!(matches!(
            PipelineConfig::from_json_file(&path),
            Err(ConfigError::Json(_))
        ));
        Ok(())
    }
}
