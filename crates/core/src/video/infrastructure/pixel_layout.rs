use ffmpeg_next::format::Pixel;
use ffmpeg_next::util::frame::video::Video;

use crate::shared::frame::{FieldBased, Frame, PixelFormat, Plane};

/// Layout decoded frames are converted to when the source layout is not
/// one the filters understand.
pub const FALLBACK_PIXEL: Pixel = Pixel::YUV420P;

pub fn to_ffmpeg_pixel(format: PixelFormat) -> Pixel {
    match format {
        PixelFormat::Gray8 => Pixel::GRAY8,
        PixelFormat::Yuv420p => Pixel::YUV420P,
        PixelFormat::Yuv422p => Pixel::YUV422P,
        PixelFormat::Yuv444p => Pixel::YUV444P,
    }
}

/// Maps an ffmpeg layout to a planar 8-bit format, treating full-range
/// `yuvj*` layouts as their limited-range counterparts.
pub fn from_ffmpeg_pixel(pixel: Pixel) -> Option<PixelFormat> {
    match pixel {
        Pixel::GRAY8 => Some(PixelFormat::Gray8),
        Pixel::YUV420P | Pixel::YUVJ420P => Some(PixelFormat::Yuv420p),
        Pixel::YUV422P | Pixel::YUVJ422P => Some(PixelFormat::Yuv422p),
        Pixel::YUV444P | Pixel::YUVJ444P => Some(PixelFormat::Yuv444p),
        _ => None,
    }
}

pub fn field_based_of(video: &Video) -> FieldBased {
    if !video.is_interlaced() {
        FieldBased::Progressive
    } else if video.is_top_first() {
        FieldBased::TopFieldFirst
    } else {
        FieldBased::BottomFieldFirst
    }
}

/// Copies an ffmpeg frame in a supported layout into a [`Frame`], dropping
/// row padding.
pub fn frame_from_video(video: &Video, format: PixelFormat, index: usize) -> Frame {
    let width = video.width() as usize;
    let height = video.height() as usize;

    let planes = (0..format.num_planes())
        .map(|i| {
            let (pw, ph) = format.plane_dimensions(width, height, i);
            let stride = video.stride(i);
            let src = video.data(i);
            let mut data = Vec::with_capacity(pw * ph);
            for row in 0..ph {
                let start = row * stride;
                data.extend_from_slice(&src[start..start + pw]);
            }
            Plane::new(data, pw, ph)
        })
        .collect();

    Frame::new(format, width, height, planes, index).with_field_based(field_based_of(video))
}

/// Copies a [`Frame`] into a newly allocated ffmpeg frame of the same layout.
pub fn video_from_frame(frame: &Frame) -> Video {
    let mut video = Video::new(
        to_ffmpeg_pixel(frame.format()),
        frame.width() as u32,
        frame.height() as u32,
    );

    for (i, plane) in frame.planes().iter().enumerate() {
        let stride = video.stride(i);
        let dst = video.data_mut(i);
        for row in 0..plane.height() {
            let start = row * stride;
            dst[start..start + plane.width()].copy_from_slice(plane.row(row));
        }
    }

    video
}
