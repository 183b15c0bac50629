// src/detector.rs

use crate::types::{Detection, Frame, ModelConfig};
use anyhow::{Context, Result};
use ort::{
    execution_providers::CUDAExecutionProvider,
    session::{builder::GraphOptimizationLevel, Session},
};
use tracing::{debug, info};

const COCO_CLASSES: usize = 80;

// COCO class IDs of interest: person plus vehicle classes.
const TARGET_CLASSES: [usize; 4] = [0, 2, 5, 7]; // person, car, bus, truck

/// External object detector, treated as a black box producing class labels,
/// confidence scores and bounding boxes for one frame.
pub trait Detector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;
}

/// YOLOv8 ONNX detector. Bounding boxes are returned in the coordinate
/// space of the frame passed to `detect`.
pub struct YoloDetector {
    session: Session,
    input_size: usize,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl YoloDetector {
    pub fn new(model: &ModelConfig, confidence_threshold: f32, iou_threshold: f32) -> Result<Self> {
        info!("Loading detection model: {}", model.path);

        let session = Session::builder()?
            .with_execution_providers([CUDAExecutionProvider::default().with_device_id(0).build()])?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(model.num_threads)?
            .commit_from_file(&model.path)
            .context("Failed to load detection model")?;

        info!("✓ Detector initialized");
        Ok(Self {
            session,
            input_size: model.input_size,
            confidence_threshold,
            iou_threshold,
        })
    }

    /// Letterbox the frame into the square model input, normalized CHW.
    /// Returns the tensor plus the scale and padding needed to map boxes
    /// back to frame coordinates.
    fn preprocess(&self, frame: &Frame) -> (Vec<f32>, f32, f32, f32) {
        let target = self.input_size;
        let (src_w, src_h) = (frame.width, frame.height);

        let scale = (target as f32 / src_w as f32).min(target as f32 / src_h as f32);
        let scaled_w = (src_w as f32 * scale) as usize;
        let scaled_h = (src_h as f32 * scale) as usize;
        let pad_x = (target - scaled_w) as f32 / 2.0;
        let pad_y = (target - scaled_h) as f32 / 2.0;

        let resized = resize_bilinear(&frame.data, src_w, src_h, scaled_w, scaled_h);

        let mut canvas = vec![114u8; target * target * 3];
        for y in 0..scaled_h {
            for x in 0..scaled_w {
                let src_idx = (y * scaled_w + x) * 3;
                let dst_idx = ((y + pad_y as usize) * target + x + pad_x as usize) * 3;
                canvas[dst_idx..dst_idx + 3].copy_from_slice(&resized[src_idx..src_idx + 3]);
            }
        }

        let mut input = vec![0.0f32; 3 * target * target];
        for c in 0..3 {
            for h in 0..target {
                for w in 0..target {
                    let hwc_idx = (h * target + w) * 3 + c;
                    let chw_idx = c * target * target + h * target + w;
                    input[chw_idx] = canvas[hwc_idx] as f32 / 255.0;
                }
            }
        }

        (input, scale, pad_x, pad_y)
    }

    fn infer(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let shape = [1, 3, self.input_size, self.input_size];
        let input_value =
            ort::value::Value::from_array((shape.as_slice(), input.to_vec().into_boxed_slice()))?;

        let outputs = self.session.run(ort::inputs!["images" => input_value])?;
        let (_, data) = outputs[0].try_extract_tensor::<f32>()?;

        Ok(data.to_vec())
    }

    /// Parse the raw [1, 84, N] output: decode boxes, filter by confidence
    /// and target class, reverse the letterbox, then apply NMS.
    fn postprocess(&self, output: &[f32], scale: f32, pad_x: f32, pad_y: f32) -> Vec<Detection> {
        let num_preds = output.len() / (4 + COCO_CLASSES);
        let mut detections = Vec::new();

        for i in 0..num_preds {
            let cx = output[i];
            let cy = output[num_preds + i];
            let w = output[num_preds * 2 + i];
            let h = output[num_preds * 3 + i];

            let mut max_conf = 0.0f32;
            let mut best_class = 0;
            for c in 0..COCO_CLASSES {
                let conf = output[num_preds * (4 + c) + i];
                if conf > max_conf {
                    max_conf = conf;
                    best_class = c;
                }
            }

            if max_conf < self.confidence_threshold || !TARGET_CLASSES.contains(&best_class) {
                continue;
            }

            // Center format to corners, then undo the letterbox.
            let x1 = (cx - w / 2.0 - pad_x) / scale;
            let y1 = (cy - h / 2.0 - pad_y) / scale;
            let x2 = (cx + w / 2.0 - pad_x) / scale;
            let y2 = (cy + h / 2.0 - pad_y) / scale;

            detections.push(Detection {
                bbox: [x1, y1, x2, y2],
                confidence: max_conf,
                class_name: class_id_to_name(best_class).to_string(),
            });
        }

        nms(detections, self.iou_threshold)
    }
}

impl Detector for YoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let (input, scale, pad_x, pad_y) = self.preprocess(frame);
        let output = self.infer(&input)?;
        let detections = self.postprocess(&output, scale, pad_x, pad_y);

        debug!("Detected {} object(s) of interest", detections.len());
        Ok(detections)
    }
}

fn class_id_to_name(class_id: usize) -> &'static str {
    match class_id {
        0 => "person",
        2 => "car",
        5 => "bus",
        7 => "truck",
        _ => "unknown",
    }
}

fn resize_bilinear(src: &[u8], src_w: usize, src_h: usize, dst_w: usize, dst_h: usize) -> Vec<u8> {
    let mut dst = vec![0u8; dst_h * dst_w * 3];
    let x_ratio = src_w as f32 / dst_w as f32;
    let y_ratio = src_h as f32 / dst_h as f32;

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let sx = dx as f32 * x_ratio;
            let sy = dy as f32 * y_ratio;
            let sx0 = sx.floor() as usize;
            let sy0 = sy.floor() as usize;
            let sx1 = (sx0 + 1).min(src_w - 1);
            let sy1 = (sy0 + 1).min(src_h - 1);
            let fx = sx - sx0 as f32;
            let fy = sy - sy0 as f32;

            for c in 0..3 {
                let p00 = src[(sy0 * src_w + sx0) * 3 + c] as f32;
                let p10 = src[(sy0 * src_w + sx1) * 3 + c] as f32;
                let p01 = src[(sy1 * src_w + sx0) * 3 + c] as f32;
                let p11 = src[(sy1 * src_w + sx1) * 3 + c] as f32;

                let val = p00 * (1.0 - fx) * (1.0 - fy)
                    + p10 * fx * (1.0 - fy)
                    + p01 * (1.0 - fx) * fy
                    + p11 * fx * fy;

                dst[(dy * dst_w + dx) * 3 + c] = val.round() as u8;
            }
        }
    }
    dst
}

fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    if detections.is_empty() {
        return detections;
    }

    detections.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap());

    let mut keep = Vec::new();
    while !detections.is_empty() {
        let current = detections.remove(0);
        detections.retain(|det| iou(&current.bbox, &det.bbox) < iou_threshold);
        keep.push(current);
    }

    keep
}

fn iou(box1: &[f32; 4], box2: &[f32; 4]) -> f32 {
    let x1 = box1[0].max(box2[0]);
    let y1 = box1[1].max(box2[1]);
    let x2 = box1[2].min(box2[2]);
    let y2 = box1[3].min(box2[3]);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area1 = (box1[2] - box1[0]) * (box1[3] - box1[1]);
    let area2 = (box2[2] - box2[0]) * (box2[3] - box2[1]);
    let union = area1 + area2 - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(confidence: f32, bbox: [f32; 4]) -> Detection {
        Detection {
            class_name: "car".to_string(),
            confidence,
            bbox,
        }
    }

    #[test]
    fn test_iou_identical_boxes() {
        let b = [0.0, 0.0, 10.0, 10.0];
        assert!((iou(&b, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint_boxes() {
        assert_eq!(iou(&[0.0, 0.0, 10.0, 10.0], &[20.0, 20.0, 30.0, 30.0]), 0.0);
    }

    #[test]
    fn test_nms_suppresses_overlapping_lower_confidence() {
        let detections = vec![
            det(0.9, [0.0, 0.0, 10.0, 10.0]),
            det(0.7, [1.0, 1.0, 11.0, 11.0]),
            det(0.8, [50.0, 50.0, 60.0, 60.0]),
        ];
        let kept = nms(detections, 0.45);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].confidence, 0.8);
    }

    #[test]
    fn test_target_classes_cover_person_and_vehicles() {
        assert_eq!(class_id_to_name(0), "person");
        assert_eq!(class_id_to_name(2), "car");
        assert_eq!(class_id_to_name(5), "bus");
        assert_eq!(class_id_to_name(7), "truck");
    }

    #[test]
    fn test_resize_bilinear_preserves_uniform_color() {
        let src = vec![200u8; 4 * 4 * 3];
        let dst = resize_bilinear(&src, 4, 4, 8, 8);
        assert_eq!(dst.len(), 8 * 8 * 3);
        assert!(dst.iter().all(|&p| p == 200));
    }
}
