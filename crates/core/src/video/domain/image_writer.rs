use std::path::Path;

use crate::shared::frame::Frame;

/// Saves a single planar frame as an RGB image file.
pub trait ImageWriter: Send {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;
}
