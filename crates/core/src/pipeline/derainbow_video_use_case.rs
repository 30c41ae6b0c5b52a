use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::derainbow::domain::frame_processor::FrameProcessor;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::pipeline_executor::{PipelineConfig, PipelineExecutor, ProgressCallback};
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};

/// Orchestrates the full video derainbow pipeline.
///
/// Wires domain components together and delegates execution to a
/// `PipelineExecutor`. This is a single-use struct: `execute` consumes
/// the owned components, so calling it twice will fail.
pub struct DerainbowVideoUseCase {
    reader: Option<Box<dyn VideoReader>>,
    writer: Option<Box<dyn VideoWriter>>,
    processor: Option<Box<dyn FrameProcessor>>,
    executor: Box<dyn PipelineExecutor>,
    logger: Option<Box<dyn PipelineLogger>>,
    on_progress: Option<ProgressCallback>,
    cancelled: Arc<AtomicBool>,
}

impl DerainbowVideoUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        processor: Box<dyn FrameProcessor>,
        executor: Box<dyn PipelineExecutor>,
        on_progress: Option<ProgressCallback>,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Self {
        Self {
            reader: Some(reader),
            writer: Some(writer),
            processor: Some(processor),
            executor,
            logger: None,
            on_progress,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn execute(
        &mut self,
        metadata: &VideoMetadata,
        output_path: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let reader = self.reader.take().ok_or("Pipeline already executed")?;
        let writer = self.writer.take().ok_or("Pipeline already executed")?;
        let processor = self.processor.take().ok_or("Pipeline already executed")?;

        let config = PipelineConfig {
            on_progress: self.on_progress.take(),
            cancelled: self.cancelled.clone(),
            logger: self
                .logger
                .take()
                .unwrap_or_else(|| Box::new(NullPipelineLogger)),
        };

        self.executor
            .execute(reader, writer, processor, metadata, output_path, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derainbow::domain::rainbow_smooth::RainbowSmoothParams;
    use crate::derainbow::infrastructure::rainbow_smooth_processor::RainbowSmoothProcessor;
    use crate::filtering::infrastructure::native_host::NativeFilterHost;
    use crate::pipeline::infrastructure::threaded_pipeline_executor::ThreadedPipelineExecutor;
    use crate::shared::frame::{Frame, PixelFormat};
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    // --- Stubs ---

    struct StubReader {
        frames: Vec<Frame>,
        closed: Arc<Mutex<bool>>,
    }

    impl StubReader {
        fn new(frames: Vec<Frame>) -> Self {
            Self {
                frames,
                closed: Arc::new(Mutex::new(false)),
            }
        }
    }

    impl VideoReader for StubReader {
        fn open(&mut self, _path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            Ok(meta_with_count(self.frames.len()))
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            Box::new(self.frames.drain(..).map(Ok))
        }

        fn close(&mut self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    struct StubWriter {
        written: Arc<Mutex<Vec<Frame>>>,
        closed: Arc<Mutex<bool>>,
    }

    impl StubWriter {
        fn new() -> Self {
            Self {
                written: Arc::new(Mutex::new(Vec::new())),
                closed: Arc::new(Mutex::new(false)),
            }
        }
    }

    impl VideoWriter for StubWriter {
        fn open(
            &mut self,
            _path: &Path,
            _metadata: &VideoMetadata,
        ) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }

        fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.written.lock().unwrap().push(frame.clone());
            Ok(())
        }

        fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }
    }

    struct FailingWriter;

    impl VideoWriter for FailingWriter {
        fn open(
            &mut self,
            _path: &Path,
            _metadata: &VideoMetadata,
        ) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }

        fn write(&mut self, _frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            Err("disk full".into())
        }

        fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }
    }

    /// Records the indices it sees and inverts plane 1 so filtering is observable.
    struct MarkingProcessor {
        seen: Arc<Mutex<Vec<usize>>>,
    }

    impl MarkingProcessor {
        fn new() -> Self {
            Self {
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl FrameProcessor for MarkingProcessor {
        fn process(&self, mut frame: Frame) -> Result<Frame, Box<dyn std::error::Error>> {
            self.seen.lock().unwrap().push(frame.index());
            for v in frame.plane_mut(1).data_mut() {
                *v = 255 - *v;
            }
            Ok(frame)
        }
    }

    struct FailingProcessor;

    impl FrameProcessor for FailingProcessor {
        fn process(&self, _frame: Frame) -> Result<Frame, Box<dyn std::error::Error>> {
            Err("filter error".into())
        }
    }

    // --- Helpers ---

    fn make_frame(index: usize) -> Frame {
        Frame::filled(PixelFormat::Yuv420p, 32, 24, &[100, 120, 140], index)
    }

    fn make_frames(count: usize) -> Vec<Frame> {
        (0..count).map(make_frame).collect()
    }

    fn meta_with_count(count: usize) -> VideoMetadata {
        VideoMetadata {
            width: 32,
            height: 24,
            fps: 25.0,
            total_frames: count,
            codec: String::new(),
            format: PixelFormat::Yuv420p,
            source_path: None,
        }
    }

    fn default_executor() -> Box<dyn PipelineExecutor> {
        Box::new(ThreadedPipelineExecutor::new())
    }

    fn use_case(
        frames: Vec<Frame>,
        writer: Box<dyn VideoWriter>,
        processor: Box<dyn FrameProcessor>,
    ) -> DerainbowVideoUseCase {
        DerainbowVideoUseCase::new(
            Box::new(StubReader::new(frames)),
            writer,
            processor,
            default_executor(),
            None,
            None,
        )
    }

    // --- Tests ---

    #[test]
    fn test_processes_all_frames_in_order() {
        let writer = StubWriter::new();
        let written = writer.written.clone();
        let processor = MarkingProcessor::new();
        let seen = processor.seen.clone();

        let mut uc = use_case(make_frames(20), Box::new(writer), Box::new(processor));
        uc.execute(&meta_with_count(20), Path::new("/tmp/out.mkv"))
            .unwrap();

        let written = written.lock().unwrap();
        assert_eq!(written.len(), 20);
        for (i, frame) in written.iter().enumerate() {
            assert_eq!(frame.index(), i);
            assert_eq!(frame.plane(1).get(0, 0), 255 - 120);
        }
        assert_eq!(*seen.lock().unwrap(), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_video() {
        let writer = StubWriter::new();
        let written = writer.written.clone();

        let mut uc = use_case(vec![], Box::new(writer), Box::new(MarkingProcessor::new()));
        uc.execute(&meta_with_count(0), Path::new("/tmp/out.mkv"))
            .unwrap();
        assert!(written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_closes_reader_and_writer() {
        let reader = StubReader::new(make_frames(2));
        let reader_closed = reader.closed.clone();
        let writer = StubWriter::new();
        let writer_closed = writer.closed.clone();

        let mut uc = DerainbowVideoUseCase::new(
            Box::new(reader),
            Box::new(writer),
            Box::new(MarkingProcessor::new()),
            default_executor(),
            None,
            None,
        );
        uc.execute(&meta_with_count(2), Path::new("/tmp/out.mkv"))
            .unwrap();

        assert!(*reader_closed.lock().unwrap());
        assert!(*writer_closed.lock().unwrap());
    }

    #[test]
    fn test_second_execute_fails() {
        let mut uc = use_case(
            make_frames(1),
            Box::new(StubWriter::new()),
            Box::new(MarkingProcessor::new()),
        );
        uc.execute(&meta_with_count(1), Path::new("/tmp/out.mkv"))
            .unwrap();

        let err = uc
            .execute(&meta_with_count(1), Path::new("/tmp/out.mkv"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Pipeline already executed");
    }

    #[test]
    fn test_processor_error_propagates() {
        let mut uc = use_case(
            make_frames(3),
            Box::new(StubWriter::new()),
            Box::new(FailingProcessor),
        );
        let err = uc
            .execute(&meta_with_count(3), Path::new("/tmp/out.mkv"))
            .unwrap_err();
        assert_eq!(err.to_string(), "filter error");
    }

    #[test]
    fn test_writer_error_propagates() {
        let mut uc = use_case(
            make_frames(3),
            Box::new(FailingWriter),
            Box::new(MarkingProcessor::new()),
        );
        let err = uc
            .execute(&meta_with_count(3), Path::new("/tmp/out.mkv"))
            .unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn test_progress_reported_per_frame() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();

        let mut uc = DerainbowVideoUseCase::new(
            Box::new(StubReader::new(make_frames(4))),
            Box::new(StubWriter::new()),
            Box::new(MarkingProcessor::new()),
            default_executor(),
            Some(Box::new(move |current, total| {
                sink.lock().unwrap().push((current, total));
                true
            })),
            None,
        );
        uc.execute(&meta_with_count(4), Path::new("/tmp/out.mkv"))
            .unwrap();

        assert_eq!(*calls.lock().unwrap(), vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
    }

    #[test]
    fn test_progress_callback_cancels() {
        let writer = StubWriter::new();
        let written = writer.written.clone();

        let mut uc = DerainbowVideoUseCase::new(
            Box::new(StubReader::new(make_frames(10))),
            Box::new(writer),
            Box::new(MarkingProcessor::new()),
            default_executor(),
            Some(Box::new(|current, _| current < 3)),
            None,
        );
        let err = uc
            .execute(&meta_with_count(10), Path::new("/tmp/out.mkv"))
            .unwrap_err();

        assert_eq!(err.to_string(), "Cancelled");
        assert_eq!(written.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_pre_cancelled_writes_nothing() {
        let writer = StubWriter::new();
        let written = writer.written.clone();
        let cancelled = Arc::new(AtomicBool::new(false));
        cancelled.store(true, Ordering::Relaxed);

        let mut uc = DerainbowVideoUseCase::new(
            Box::new(StubReader::new(make_frames(5))),
            Box::new(writer),
            Box::new(MarkingProcessor::new()),
            default_executor(),
            None,
            Some(cancelled),
        );
        uc.execute(&meta_with_count(5), Path::new("/tmp/out.mkv"))
            .unwrap();

        assert!(written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_rainbow_smooth_keeps_luma_end_to_end() {
        let writer = StubWriter::new();
        let written = writer.written.clone();
        let mut frames = make_frames(3);
        for frame in &mut frames {
            for (i, v) in frame.plane_mut(0).data_mut().iter_mut().enumerate() {
                *v = if i % 32 < 16 { 20 } else { 230 };
            }
        }
        let expected_luma: Vec<_> = frames.iter().map(|f| f.plane(0).clone()).collect();

        let processor = RainbowSmoothProcessor::new(
            Arc::new(NativeFilterHost::new()),
            RainbowSmoothParams::default(),
        );
        let mut uc = use_case(frames, Box::new(writer), Box::new(processor));
        uc.execute(&meta_with_count(3), Path::new("/tmp/out.mkv"))
            .unwrap();

        let written = written.lock().unwrap();
        assert_eq!(written.len(), 3);
        for (frame, luma) in written.iter().zip(&expected_luma) {
            assert_eq!(frame.plane(0), luma);
        }
    }
}
