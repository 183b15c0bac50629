// src/acquisition.rs

use crate::pipeline::FrameProcessor;
use crate::store::ResultStore;
use crate::video::VideoSource;
use anyhow::Result;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Delay after end-of-stream before re-reading, to avoid a hot spin.
const EOS_DELAY: Duration = Duration::from_millis(50);

enum StepOutcome {
    Processed(crate::types::FrameSummary),
    Skipped,
    EndOfStream,
    Failed(anyhow::Error),
}

/// Blocking half of the loop: owns the video source and the frame
/// processor, and is moved into `spawn_blocking` for each step so the
/// async scheduler is never occupied by decode or inference.
struct Worker {
    source: Box<dyn VideoSource>,
    processor: FrameProcessor,
    frame_index: u64,
    frame_stride: u64,
}

impl Worker {
    fn step(&mut self) -> StepOutcome {
        let frame = match self.source.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return StepOutcome::EndOfStream,
            Err(e) => return StepOutcome::Failed(e),
        };

        let index = self.frame_index;
        self.frame_index += 1;
        if self.frame_stride > 1 && index % self.frame_stride != 0 {
            return StepOutcome::Skipped;
        }

        match self.processor.process(&frame) {
            Ok(summary) => StepOutcome::Processed(summary),
            Err(e) => StepOutcome::Failed(e),
        }
    }

    fn rewind(&mut self) -> Result<()> {
        self.source.rewind()
    }
}

/// Continuously acquire frames, process them strictly sequentially, and
/// publish each result to the shared store. Runs for the process lifetime:
/// end-of-stream rewinds to the first frame, and a failed frame is logged
/// and skipped, leaving the previous snapshot in place.
pub async fn run(
    source: Box<dyn VideoSource>,
    processor: FrameProcessor,
    store: ResultStore,
    frame_stride: u64,
) -> Result<()> {
    info!("🎥 Acquisition loop started (stride: {})", frame_stride.max(1));

    let mut worker = Worker {
        source,
        processor,
        frame_index: 0,
        frame_stride: frame_stride.max(1),
    };

    loop {
        // A panicking decode or inference call must not take the loop (or
        // the worker it owns) down with it, so the step is unwound inside
        // the blocking task and surfaced as a per-frame failure.
        let (returned, outcome) = tokio::task::spawn_blocking(move || {
            let outcome =
                match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| worker.step())) {
                    Ok(outcome) => outcome,
                    Err(payload) => StepOutcome::Failed(anyhow::anyhow!(
                        "frame step panicked: {}",
                        panic_message(&payload)
                    )),
                };
            (worker, outcome)
        })
        .await?;
        worker = returned;

        match outcome {
            StepOutcome::Processed(summary) => store.write(summary).await,
            StepOutcome::Skipped => {}
            StepOutcome::EndOfStream => {
                debug!("End of stream, rewinding to first frame");
                let (returned, rewound) = tokio::task::spawn_blocking(move || {
                    let rewound = worker.rewind();
                    (worker, rewound)
                })
                .await?;
                worker = returned;
                if let Err(e) = rewound {
                    warn!("Rewind failed: {:#}", e);
                }
                tokio::time::sleep(EOS_DELAY).await;
            }
            StepOutcome::Failed(e) => warn!("Frame processing failed: {:#}", e),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
