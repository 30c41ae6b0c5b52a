use std::path::Path;

use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;

use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

use super::pixel_layout::{to_ffmpeg_pixel, video_from_frame};

/// Writes a single planar frame to an image file.
///
/// The frame is converted to RGB24 with the ffmpeg scaler and encoded by
/// the `image` crate, which picks the format from the file extension.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn to_rgb(frame: &Frame) -> Result<image::RgbImage, Box<dyn std::error::Error>> {
    ffmpeg_next::init()?;

    let width = frame.width() as u32;
    let height = frame.height() as u32;

    let mut scaler = scaling::Context::get(
        to_ffmpeg_pixel(frame.format()),
        width,
        height,
        Pixel::RGB24,
        width,
        height,
        scaling::Flags::BILINEAR,
    )?;

    let mut rgb = Video::empty();
    scaler.run(&video_from_frame(frame), &mut rgb)?;

    let stride = rgb.stride(0);
    let row_len = frame.width() * 3;
    let data = rgb.data(0);
    let mut pixels = Vec::with_capacity(row_len * frame.height());
    for row in 0..frame.height() {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_len]);
    }

    image::RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| "Failed to create image from frame data".into())
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        to_rgb(frame)?.save(path)?;
        Ok(())
    }
}
