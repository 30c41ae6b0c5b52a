use std::path::Path;

use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;

use crate::shared::frame::{Frame, PixelFormat};
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

use super::pixel_layout::{frame_from_video, from_ffmpeg_pixel, to_ffmpeg_pixel, FALLBACK_PIXEL};

/// Decodes video frames via ffmpeg-next (libavformat + libavcodec).
///
/// Planar 8-bit YUV and gray streams are handed through in their native
/// layout; everything else is converted to YUV420P.
pub struct FfmpegReader {
    input_ctx: Option<ffmpeg_next::format::context::Input>,
    video_stream_index: usize,
    metadata: Option<VideoMetadata>,
}

// Safety: FfmpegReader is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self {
            input_ctx: None,
            video_stream_index: 0,
            metadata: None,
        }
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Picks the planar layout frames will be delivered in.
fn target_format(decoded: Pixel) -> PixelFormat {
    from_ffmpeg_pixel(decoded).unwrap_or(PixelFormat::Yuv420p)
}

fn open_decoder(
    ictx: &ffmpeg_next::format::context::Input,
) -> Result<(usize, ffmpeg_next::decoder::Video, ffmpeg_next::Rational, usize), Box<dyn std::error::Error>>
{
    let stream = ictx
        .streams()
        .best(ffmpeg_next::media::Type::Video)
        .ok_or("No video stream found")?;
    let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
    let decoder = codec_ctx.decoder().video()?;
    Ok((stream.index(), decoder, stream.rate(), stream.frames() as usize))
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(path)?;
        let (video_stream_index, decoder, rate, total_frames) = open_decoder(&ictx)?;

        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let format = target_format(decoder.format());
        if from_ffmpeg_pixel(decoder.format()).is_none() {
            log::info!(
                "Converting {:?} to {:?} for filtering",
                decoder.format(),
                FALLBACK_PIXEL
            );
        }

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            total_frames,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            format,
            source_path: Some(path.to_path_buf()),
        };

        self.video_stream_index = video_stream_index;
        self.metadata = Some(metadata.clone());
        self.input_ctx = Some(ictx);

        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let Some(ictx) = self.input_ctx.as_mut() else {
            return Box::new(std::iter::once(Err("FfmpegReader: not opened".into())));
        };

        let decoder = match open_decoder(ictx) {
            Ok((_, decoder, _, _)) => decoder,
            Err(e) => return Box::new(std::iter::once(Err(e))),
        };

        let format = target_format(decoder.format());
        let scaler = if from_ffmpeg_pixel(decoder.format()).is_some() {
            None
        } else {
            match scaling::Context::get(
                decoder.format(),
                decoder.width(),
                decoder.height(),
                to_ffmpeg_pixel(format),
                decoder.width(),
                decoder.height(),
                scaling::Flags::BILINEAR,
            ) {
                Ok(scaler) => Some(scaler),
                Err(e) => return Box::new(std::iter::once(Err(e.into()))),
            }
        };

        Box::new(FfmpegFrameIter {
            ictx,
            decoder,
            scaler,
            format,
            video_stream_index: self.video_stream_index,
            frame_index: 0,
            flushing: false,
            done: false,
        })
    }

    fn close(&mut self) {
        self.input_ctx = None;
        self.metadata = None;
    }
}

/// Lazy iterator that decodes video frames one at a time, avoiding the need
/// to buffer the entire video in memory.
struct FfmpegFrameIter<'a> {
    ictx: &'a mut ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: Option<scaling::Context>,
    format: PixelFormat,
    video_stream_index: usize,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

impl FfmpegFrameIter<'_> {
    fn try_receive(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let mut decoded = Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return None;
        }

        let frame = match self.scaler.as_mut() {
            None => frame_from_video(&decoded, self.format, self.frame_index),
            Some(scaler) => {
                let mut converted = Video::empty();
                if let Err(e) = scaler.run(&decoded, &mut converted) {
                    return Some(Err(Box::new(e)));
                }
                frame_from_video(&converted, self.format, self.frame_index)
                    .with_field_based(super::pixel_layout::field_based_of(&decoded))
            }
        };
        self.frame_index += 1;
        Some(Ok(frame))
    }
}

impl Iterator for FfmpegFrameIter<'_> {
    type Item = Result<Frame, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(result) = self.try_receive() {
            return Some(result);
        }

        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                if let Some(result) = self.try_receive() {
                    return Some(result);
                }
                self.done = true;
                return None;
            };

            if stream.index() != self.video_stream_index {
                continue;
            }

            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }

            if let Some(result) = self.try_receive() {
                return Some(result);
            }
        }
    }
}
