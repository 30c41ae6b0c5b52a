use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::derainbow::domain::frame_processor::FrameProcessor;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};

/// Callback invoked after each written frame with `(processed, total)`.
/// Returning `false` cancels the run.
pub type ProgressCallback = Box<dyn Fn(usize, usize) -> bool + Send>;

/// Configuration for a pipeline execution run.
pub struct PipelineConfig {
    pub on_progress: Option<ProgressCallback>,
    pub cancelled: Arc<AtomicBool>,
    pub logger: Box<dyn PipelineLogger>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            on_progress: None,
            cancelled: Arc::new(AtomicBool::new(false)),
            logger: Box::new(NullPipelineLogger),
        }
    }
}

/// Abstracts how the read → filter → write pipeline is executed.
///
/// This is a port (application-layer interface). Infrastructure provides
/// concrete implementations.
pub trait PipelineExecutor: Send {
    fn execute(
        &self,
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        processor: Box<dyn FrameProcessor>,
        metadata: &VideoMetadata,
        output_path: &Path,
        config: PipelineConfig,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
