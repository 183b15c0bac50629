// src/types.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub detection: DetectionConfig,
    pub video: VideoConfig,
    pub calibration: CalibrationConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub path: String,
    pub input_size: usize,
    pub num_threads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub confidence_threshold: f32,
    pub proximity_threshold_m: f64,
    pub iou_threshold: f32,
    /// Process every Nth frame; 1 = every frame.
    pub frame_stride: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    pub source_path: String,
    pub resized_width: i32,
    pub resized_height: i32,
    pub save_annotated: bool,
    pub output_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub push_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// A decoded video frame: packed RGB, 8 bits per channel.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

/// One detector output in resized-frame pixel coordinates.
#[derive(Debug, Clone)]
pub struct Detection {
    pub class_name: String,
    pub confidence: f32,
    pub bbox: [f32; 4], // [x1, y1, x2, y2]
}

impl Detection {
    /// Ground-contact proxy: horizontal box midpoint on the bottom edge.
    pub fn anchor(&self) -> (f32, f32) {
        ((self.bbox[0] + self.bbox[2]) / 2.0, self.bbox[3])
    }
}

/// Ground-plane position in meters. X is lateral, Z is depth from the camera.
/// Serialized as `{x, y}` to match the wire payload, where `y` carries Z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    pub x: f64,
    #[serde(rename = "y")]
    pub z: f64,
}

/// Discrete risk zone. Ordering is by severity so the frame aggregate is
/// simply the maximum over all pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Green,
    Yellow,
    Red,
}

impl Zone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Green => "green",
            Zone::Yellow => "yellow",
            Zone::Red => "red",
        }
    }
}

/// Nearest-person result for one vehicle in one frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProximityPair {
    pub car_world: WorldPoint,
    pub distance_m: f64,
    pub zone: Zone,
    pub nearest_person_world: WorldPoint,
}

/// Per-frame classification output.
#[derive(Debug, Clone)]
pub struct FrameSummary {
    pub detections: Vec<ProximityPair>,
    pub aggregate_zone: Zone,
}

impl FrameSummary {
    pub fn empty() -> Self {
        Self {
            detections: Vec::new(),
            aggregate_zone: Zone::Green,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameEntry {
    pub detections: Vec<ProximityPair>,
}

/// The single process-wide result snapshot served to consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestResult {
    pub frames: Vec<FrameEntry>,
    pub summary_zone: Zone,
}

impl Default for LatestResult {
    fn default() -> Self {
        Self {
            frames: Vec::new(),
            summary_zone: Zone::Green,
        }
    }
}

impl From<FrameSummary> for LatestResult {
    fn from(summary: FrameSummary) -> Self {
        Self {
            summary_zone: summary.aggregate_zone,
            frames: vec![FrameEntry {
                detections: summary.detections,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_severity_ordering() {
        assert!(Zone::Red > Zone::Yellow);
        assert!(Zone::Yellow > Zone::Green);
    }

    #[test]
    fn test_zone_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Zone::Red).unwrap(), "\"red\"");
        assert_eq!(serde_json::to_string(&Zone::Green).unwrap(), "\"green\"");
    }

    #[test]
    fn test_world_point_wire_format_uses_y_for_depth() {
        let p = WorldPoint { x: 1.5, z: 7.25 };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["x"], 1.5);
        assert_eq!(json["y"], 7.25);
    }

    #[test]
    fn test_anchor_is_bottom_midpoint() {
        let det = Detection {
            class_name: "person".to_string(),
            confidence: 0.9,
            bbox: [100.0, 50.0, 200.0, 300.0],
        };
        assert_eq!(det.anchor(), (150.0, 300.0));
    }

    #[test]
    fn test_default_latest_result_is_empty_green() {
        let result = LatestResult::default();
        assert!(result.frames.is_empty());
        assert_eq!(result.summary_zone, Zone::Green);
    }
}
