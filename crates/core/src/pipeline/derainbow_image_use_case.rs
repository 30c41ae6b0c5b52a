use std::path::Path;

use crate::derainbow::domain::frame_processor::FrameProcessor;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::video_reader::VideoReader;

/// Single-image derainbow pipeline: read → filter → write.
pub struct DerainbowImageUseCase {
    reader: Box<dyn VideoReader>,
    image_writer: Box<dyn ImageWriter>,
    processor: Box<dyn FrameProcessor>,
}

impl DerainbowImageUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        image_writer: Box<dyn ImageWriter>,
        processor: Box<dyn FrameProcessor>,
    ) -> Self {
        Self {
            reader,
            image_writer,
            processor,
        }
    }

    pub fn execute(
        &mut self,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let metadata = self.reader.open(input_path)?;
        log::debug!(
            "Read {}x{} image as {:?}",
            metadata.width,
            metadata.height,
            metadata.format
        );

        let frame = self.reader.frames().next().ok_or("No frames in image")??;
        self.reader.close();

        let filtered = self.processor.process(frame)?;
        self.image_writer.write(output_path, &filtered)?;

        Ok(())
    }
}
