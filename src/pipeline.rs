// src/pipeline.rs

use crate::calibration::CalibrationModel;
use crate::detector::Detector;
use crate::geometry;
use crate::proximity;
use crate::types::{Config, Detection, Frame, FrameSummary, WorldPoint};
use crate::video;
use anyhow::Result;
use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
    videoio::VideoWriter,
};
use tracing::debug;

/// Per-frame processing: resize, detect, project anchors to the ground
/// plane, classify proximity. Owns the detector and the immutable
/// calibration handle for the process lifetime.
pub struct FrameProcessor {
    detector: Box<dyn Detector>,
    calibration: CalibrationModel,
    resized_width: i32,
    resized_height: i32,
    confidence_threshold: f32,
    proximity_threshold_m: f64,
    writer: Option<VideoWriter>,
    /// (scale_x, scale_y) from resized to original pixel space, computed
    /// from the first frame and assumed constant thereafter.
    scale: Option<(f64, f64)>,
}

impl FrameProcessor {
    pub fn new(
        detector: Box<dyn Detector>,
        calibration: CalibrationModel,
        config: &Config,
        writer: Option<VideoWriter>,
    ) -> Self {
        Self {
            detector,
            calibration,
            resized_width: config.video.resized_width,
            resized_height: config.video.resized_height,
            confidence_threshold: config.detection.confidence_threshold,
            proximity_threshold_m: config.detection.proximity_threshold_m,
            writer,
            scale: None,
        }
    }

    pub fn process(&mut self, frame: &Frame) -> Result<FrameSummary> {
        let resized = if frame.width == self.resized_width as usize
            && frame.height == self.resized_height as usize
        {
            frame.clone()
        } else {
            video::resize_frame(frame, self.resized_width, self.resized_height)?
        };

        let (scale_x, scale_y) = *self.scale.get_or_insert((
            frame.width as f64 / self.resized_width as f64,
            frame.height as f64 / self.resized_height as f64,
        ));

        let mut detections = self.detector.detect(&resized)?;
        detections.retain(|d| d.confidence >= self.confidence_threshold);

        let world_points: Vec<Option<WorldPoint>> = detections
            .iter()
            .map(|det| {
                let (ax, ay) = det.anchor();
                geometry::project(ax as f64 * scale_x, ay as f64 * scale_y, &self.calibration)
            })
            .collect();

        let summary = proximity::classify(&detections, &world_points, self.proximity_threshold_m);

        debug!(
            "Frame: {} detection(s), {} pair(s), zone={}",
            detections.len(),
            summary.detections.len(),
            summary.aggregate_zone.as_str()
        );

        if self.writer.is_some() {
            self.write_annotated(&resized, &detections, &world_points)?;
        }

        Ok(summary)
    }

    /// Visualization side effect only: draw boxes and zone-colored
    /// proximity lines on a copy of the resized frame.
    fn write_annotated(
        &mut self,
        frame: &Frame,
        detections: &[Detection],
        world_points: &[Option<WorldPoint>],
    ) -> Result<()> {
        let canvas = annotate(
            frame,
            detections,
            world_points,
            self.proximity_threshold_m,
        )?;
        if let Some(ref mut writer) = self.writer {
            use opencv::videoio::VideoWriterTrait;
            writer.write(&canvas)?;
        }
        Ok(())
    }
}

/// Render detections and vehicle-to-person lines onto a BGR copy of the
/// frame, color-coded by zone.
pub fn annotate(
    frame: &Frame,
    detections: &[Detection],
    world_points: &[Option<WorldPoint>],
    proximity_threshold_m: f64,
) -> Result<Mat> {
    let mat = Mat::from_slice(&frame.data)?;
    let mat = mat.reshape(3, frame.height as i32)?;

    let mut output = Mat::default();
    imgproc::cvt_color(&mat, &mut output, imgproc::COLOR_RGB2BGR, 0)?;

    let box_color = core::Scalar::new(255.0, 255.0, 255.0, 0.0);
    for det in detections {
        let rect = core::Rect::new(
            det.bbox[0] as i32,
            det.bbox[1] as i32,
            (det.bbox[2] - det.bbox[0]) as i32,
            (det.bbox[3] - det.bbox[1]) as i32,
        );
        imgproc::rectangle(&mut output, rect, box_color, 1, imgproc::LINE_8, 0)?;
    }

    for pair in proximity::nearest_pairs(detections, world_points) {
        let zone = proximity::zone_for(pair.distance_m, proximity_threshold_m);
        let (color, thickness) = match zone {
            crate::types::Zone::Red => (core::Scalar::new(0.0, 0.0, 255.0, 0.0), 2),
            crate::types::Zone::Yellow => (core::Scalar::new(0.0, 255.0, 255.0, 0.0), 2),
            crate::types::Zone::Green => (core::Scalar::new(0.0, 255.0, 0.0, 0.0), 1),
        };

        let (vx, vy) = detections[pair.vehicle_idx].anchor();
        let (px, py) = detections[pair.person_idx].anchor();
        imgproc::line(
            &mut output,
            core::Point::new(vx as i32, vy as i32),
            core::Point::new(px as i32, py as i32),
            color,
            thickness,
            imgproc::LINE_AA,
            0,
        )?;
    }

    Ok(output)
}
