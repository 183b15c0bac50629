// src/calibration.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::info;

/// Camera model loaded once at startup and immutable for the process
/// lifetime. Two interchangeable forms: a precomputed image-to-ground
/// homography, or pinhole intrinsics with camera height and tilt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CalibrationModel {
    Homography {
        /// Row-major 3x3 matrix mapping image pixels to ground-plane meters.
        homography: [[f64; 3]; 3],
    },
    Intrinsics(IntrinsicsCalibration),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntrinsicsCalibration {
    /// Focal lengths in pixels.
    pub fx: f64,
    pub fy: f64,
    /// Principal point.
    pub cx: f64,
    pub cy: f64,
    /// Camera height above the ground plane in meters.
    pub camera_height_m: f64,
    /// Downward tilt in degrees; converted to radians at this boundary.
    pub tilt_deg: f64,
}

impl IntrinsicsCalibration {
    pub fn tilt_rad(&self) -> f64 {
        self.tilt_deg.to_radians()
    }

    /// One-time setup utility: derive pixel intrinsics from lens focal
    /// length and sensor dimensions. Not part of the continuous pipeline.
    pub fn from_lens(
        img_w: u32,
        img_h: u32,
        focal_mm: f64,
        sensor_w_mm: f64,
        sensor_h_mm: f64,
        camera_height_m: f64,
        tilt_deg: f64,
    ) -> Self {
        let fov_h = 2.0 * ((sensor_w_mm / 2.0) / focal_mm).atan();
        let fov_v = 2.0 * ((sensor_h_mm / 2.0) / focal_mm).atan();

        Self {
            fx: (img_w as f64 / 2.0) / (fov_h / 2.0).tan(),
            fy: (img_h as f64 / 2.0) / (fov_v / 2.0).tan(),
            cx: img_w as f64 / 2.0,
            cy: img_h as f64 / 2.0,
            camera_height_m,
            tilt_deg,
        }
    }
}

impl CalibrationModel {
    /// Load calibration from a YAML file. A missing or unparseable file is
    /// a fatal startup condition.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Calibration data not found: {}", path))?;
        let model: CalibrationModel = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse calibration: {}", path))?;

        match &model {
            CalibrationModel::Homography { .. } => info!("✓ Calibration loaded (homography)"),
            CalibrationModel::Intrinsics(c) => info!(
                "✓ Calibration loaded (intrinsics: h={:.2}m, tilt={:.1}°)",
                c.camera_height_m, c.tilt_deg
            ),
        }

        Ok(model)
    }
}
