// src/video.rs

use crate::types::Frame;
use anyhow::Result;
use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureTraitConst, VideoWriter},
};
use std::path::Path;
use tracing::info;

/// Sequential frame source with seek-to-start support for looping.
pub trait VideoSource: Send {
    /// Read the next frame. `Ok(None)` signals end-of-stream.
    fn read_frame(&mut self) -> Result<Option<Frame>>;

    /// Reset the stream position to the first frame.
    fn rewind(&mut self) -> Result<()>;
}

/// File-backed video source decoding to packed RGB.
pub struct VideoFileSource {
    cap: VideoCapture,
    pub fps: f64,
}

impl VideoFileSource {
    /// Open a video file. Failure to open is a fatal startup condition.
    pub fn open(path: &str) -> Result<Self> {
        info!("Opening video: {}", path);

        let cap = VideoCapture::from_file(path, videoio::CAP_ANY)?;
        if !cap.is_opened()? {
            anyhow::bail!("Cannot open video: {}", path);
        }

        let fps = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FPS)?;
        let width = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_WIDTH)? as i32;
        let height = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_HEIGHT)? as i32;

        info!("Video properties: {}x{} @ {:.1} FPS", width, height, fps);

        Ok(Self { cap, fps })
    }
}

impl VideoSource for VideoFileSource {
    fn read_frame(&mut self) -> Result<Option<Frame>> {
        use opencv::videoio::VideoCaptureTrait;

        let mut mat = Mat::default();
        if !VideoCaptureTrait::read(&mut self.cap, &mut mat)? || mat.empty() {
            return Ok(None);
        }

        let mut rgb_mat = Mat::default();
        imgproc::cvt_color(&mat, &mut rgb_mat, imgproc::COLOR_BGR2RGB, 0)?;

        Ok(Some(frame_from_mat(&rgb_mat)?))
    }

    fn rewind(&mut self) -> Result<()> {
        use opencv::videoio::VideoCaptureTrait;
        VideoCaptureTrait::set(&mut self.cap, videoio::CAP_PROP_POS_FRAMES, 0.0)?;
        Ok(())
    }
}

/// Build a Frame from a decoded RGB mat, sized from the mat itself rather
/// than container metadata, which can disagree with the decoded stream.
fn frame_from_mat(rgb: &Mat) -> Result<Frame> {
    Ok(Frame {
        data: rgb.data_bytes()?.to_vec(),
        width: rgb.cols() as usize,
        height: rgb.rows() as usize,
    })
}

/// Resize an RGB frame with bilinear interpolation.
pub fn resize_frame(frame: &Frame, width: i32, height: i32) -> Result<Frame> {
    let mat = Mat::from_slice(&frame.data)?;
    let mat = mat.reshape(3, frame.height as i32)?;

    let mut resized = Mat::default();
    imgproc::resize(
        &mat,
        &mut resized,
        core::Size::new(width, height),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    Ok(Frame {
        data: resized.data_bytes()?.to_vec(),
        width: width as usize,
        height: height as usize,
    })
}

/// Create a writer for the annotated output video next to the source name.
pub fn create_writer(
    source_path: &str,
    output_dir: &str,
    width: i32,
    height: i32,
    fps: f64,
) -> Result<VideoWriter> {
    std::fs::create_dir_all(output_dir)?;

    let source_name = Path::new(source_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let output_path = Path::new(output_dir).join(format!("{}_proximity.mp4", source_name));

    info!("Annotated output: {}", output_path.display());

    let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
    let writer = VideoWriter::new(
        output_path.to_str().unwrap_or_default(),
        fourcc,
        fps,
        core::Size::new(width, height),
        true,
    )?;

    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_sized_from_decoded_mat() {
        let mat = Mat::new_rows_cols_with_default(
            4,
            6,
            core::CV_8UC3,
            core::Scalar::all(7.0),
        )
        .unwrap();

        let frame = frame_from_mat(&mat).unwrap();
        assert_eq!(frame.width, 6);
        assert_eq!(frame.height, 4);
        assert_eq!(frame.data.len(), 6 * 4 * 3);
        assert!(frame.data.iter().all(|&p| p == 7));
    }
}

