use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Source of planar YUV frames: a video container or a still image.
///
/// Implementations own decoding and pixel-format negotiation; consumers
/// only see [`Frame`]s in one of the supported planar layouts.
pub trait VideoReader: Send {
    /// Opens the file and reports its dimensions, rate and decoded layout.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Lazily decodes frames in presentation order.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    fn close(&mut self);
}
