use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::derainbow::domain::frame_processor::FrameProcessor;
use crate::pipeline::pipeline_executor::{PipelineConfig, PipelineExecutor};
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

type SendError = Box<dyn std::error::Error + Send + Sync>;

/// Executes the derainbow pipeline with dedicated threads for I/O.
///
/// Layout: `reader → main [filter] → writer`
///
/// Decoding and encoding overlap with filtering on the calling thread.
pub struct ThreadedPipelineExecutor {
    channel_capacity: usize,
}

impl ThreadedPipelineExecutor {
    pub fn new() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_channel_capacity(channel_capacity: usize) -> Self {
        Self {
            channel_capacity: channel_capacity.max(1),
        }
    }
}

impl Default for ThreadedPipelineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineExecutor for ThreadedPipelineExecutor {
    fn execute(
        &self,
        reader: Box<dyn VideoReader>,
        mut writer: Box<dyn VideoWriter>,
        processor: Box<dyn FrameProcessor>,
        metadata: &VideoMetadata,
        output_path: &Path,
        mut config: PipelineConfig,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let cap = self.channel_capacity;

        writer.open(output_path, metadata)?;
        config.logger.info(&format!(
            "Filtering {}x{} {:?} video ({} frames) -> {}",
            metadata.width,
            metadata.height,
            metadata.format,
            metadata.total_frames,
            output_path.display()
        ));

        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Result<Frame, SendError>>(cap);
        let (write_tx, write_rx) = crossbeam_channel::bounded::<Frame>(cap);

        let reader_handle = spawn_reader(reader, frame_tx, config.cancelled.clone());
        let writer_handle = spawn_writer(writer, write_rx);

        let main_error = run_main_loop(
            frame_rx,
            &write_tx,
            &*processor,
            metadata.total_frames,
            &mut config,
        );

        drop(write_tx);

        let result = join_threads(reader_handle, writer_handle, main_error);
        config.logger.summary();
        result
    }
}

fn spawn_reader(
    mut reader: Box<dyn VideoReader>,
    frame_tx: crossbeam_channel::Sender<Result<Frame, SendError>>,
    cancelled: Arc<AtomicBool>,
) -> std::thread::JoinHandle<Box<dyn VideoReader>> {
    std::thread::spawn(move || {
        for frame_result in reader.frames() {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }
            let mapped = frame_result.map_err(|e| -> SendError { e.to_string().into() });
            if frame_tx.send(mapped).is_err() {
                break;
            }
        }
        reader.close();
        reader
    })
}

fn spawn_writer(
    mut writer: Box<dyn VideoWriter>,
    write_rx: crossbeam_channel::Receiver<Frame>,
) -> std::thread::JoinHandle<Result<Box<dyn VideoWriter>, SendError>> {
    std::thread::spawn(move || {
        for frame in write_rx {
            writer
                .write(&frame)
                .map_err(|e| -> SendError { e.to_string().into() })?;
        }
        Ok(writer)
    })
}

/// Runs the main thread loop: receive decoded frames, filter them, and send
/// them to the writer in order.
fn run_main_loop(
    frame_rx: crossbeam_channel::Receiver<Result<Frame, SendError>>,
    write_tx: &crossbeam_channel::Sender<Frame>,
    processor: &dyn FrameProcessor,
    total_frames: usize,
    config: &mut PipelineConfig,
) -> Option<Box<dyn std::error::Error>> {
    let mut frames_processed: usize = 0;

    loop {
        let queued = frame_rx.len();
        let Ok(frame_result) = frame_rx.recv() else {
            break;
        };
        if config.cancelled.load(Ordering::Relaxed) {
            break;
        }

        let frame = match frame_result {
            Ok(frame) => frame,
            Err(e) => return Some(e.to_string().into()),
        };
        config.logger.metric("reader_queue_depth", queued as f64);

        let started = Instant::now();
        let filtered = match processor.process(frame) {
            Ok(filtered) => filtered,
            Err(e) => return Some(e),
        };
        config
            .logger
            .timing("filter", started.elapsed().as_secs_f64() * 1000.0);

        // The writer only hangs up after failing; its own error is reported
        // when the thread is joined.
        if write_tx.send(filtered).is_err() {
            break;
        }

        frames_processed += 1;
        config.logger.progress(frames_processed, total_frames);

        if let Some(ref callback) = config.on_progress {
            if !callback(frames_processed, total_frames) {
                return Some("Cancelled".into());
            }
        }
    }

    None
}

/// Joins all pipeline threads and coalesces the first error encountered.
fn join_threads(
    reader_handle: std::thread::JoinHandle<Box<dyn VideoReader>>,
    writer_handle: std::thread::JoinHandle<Result<Box<dyn VideoWriter>, SendError>>,
    mut first_error: Option<Box<dyn std::error::Error>>,
) -> Result<(), Box<dyn std::error::Error>> {
    fn set_if_none(slot: &mut Option<Box<dyn std::error::Error>>, err: Box<dyn std::error::Error>) {
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    match reader_handle.join() {
        Ok(mut r) => r.close(),
        Err(_) => set_if_none(&mut first_error, "Reader thread panicked".into()),
    }

    match writer_handle.join() {
        Ok(Ok(mut w)) => {
            if let Err(e) = w.close() {
                set_if_none(&mut first_error, e);
            }
        }
        Ok(Err(e)) => set_if_none(&mut first_error, e.to_string().into()),
        Err(_) => set_if_none(&mut first_error, "Writer thread panicked".into()),
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
