use std::path::PathBuf;

use crate::shared::frame::PixelFormat;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub format: PixelFormat,
    pub source_path: Option<PathBuf>,
}
