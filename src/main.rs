// src/main.rs

mod acquisition;
mod calibration;
mod config;
mod detector;
mod geometry;
mod pipeline;
mod proximity;
mod server;
mod store;
mod types;
mod video;

use anyhow::Result;
use calibration::CalibrationModel;
use detector::YoloDetector;
use pipeline::FrameProcessor;
use server::AppState;
use store::ResultStore;
use tracing::{error, info};
use video::VideoFileSource;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("proximity_detection=info,ort=warn")
        .init();

    info!("🚦 Proximity Detection Service Starting");

    let config = types::Config::load("config.yaml")?;
    info!("✓ Configuration loaded");
    info!(
        "Proximity threshold: {:.1}m, confidence: {:.2}",
        config.detection.proximity_threshold_m, config.detection.confidence_threshold
    );

    // One-time initialization: calibration and video source are fatal if
    // absent, per the startup error taxonomy.
    let calibration = CalibrationModel::load(&config.calibration.path)?;

    let source = VideoFileSource::open(&config.video.source_path)?;

    let detector = YoloDetector::new(
        &config.model,
        config.detection.confidence_threshold,
        config.detection.iou_threshold,
    )?;

    let writer = if config.video.save_annotated {
        Some(video::create_writer(
            &config.video.source_path,
            &config.video.output_dir,
            config.video.resized_width,
            config.video.resized_height,
            source.fps,
        )?)
    } else {
        None
    };

    let processor = FrameProcessor::new(Box::new(detector), calibration, &config, writer);
    let store = ResultStore::new();

    {
        let store = store.clone();
        let frame_stride = config.detection.frame_stride;
        tokio::spawn(async move {
            if let Err(e) = acquisition::run(Box::new(source), processor, store, frame_stride).await
            {
                error!("Acquisition loop terminated: {:#}", e);
            }
        });
    }

    let state = AppState {
        store,
        push_interval: std::time::Duration::from_millis(config.server.push_interval_ms),
    };
    let app = server::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("🚀 Serving results on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
