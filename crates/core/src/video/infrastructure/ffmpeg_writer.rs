use std::path::{Path, PathBuf};

use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

use super::pixel_layout::{to_ffmpeg_pixel, video_from_frame};

const ENCODE_PIXEL: Pixel = Pixel::YUV420P;
const DEFAULT_FPS: i32 = 30;

/// Encodes planar frames via ffmpeg-next with built-in audio muxing.
///
/// Frames are encoded as YUV420P. MPEG-4 Part 2 is used unless a CRF is
/// requested, in which case libx264 is tried first. When the source video
/// has an audio stream, it is copied directly to the output.
pub struct FfmpegWriter {
    crf: Option<u8>,
    output_path: Option<PathBuf>,
    source_path: Option<PathBuf>,
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<scaling::Context>,
    fps: i32,
    frame_count: usize,
    video_stream_index: usize,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            crf: None,
            output_path: None,
            source_path: None,
            octx: None,
            encoder: None,
            scaler: None,
            fps: DEFAULT_FPS,
            frame_count: 0,
            video_stream_index: 0,
        }
    }

    /// Requests constant-quality H.264 output (0 = lossless, 51 = worst).
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = Some(crf);
        self
    }

    fn write_pending_packets(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let (Some(encoder), Some(octx)) = (self.encoder.as_mut(), self.octx.as_mut()) else {
            return Err("FfmpegWriter: not opened".into());
        };
        let ost_time_base = octx
            .stream(self.video_stream_index)
            .ok_or("FfmpegWriter: output stream missing")?
            .time_base();

        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.video_stream_index);
            encoded.rescale_ts(ffmpeg_next::Rational(1, self.fps), ost_time_base);
            encoded.write_interleaved(octx)?;
        }
        Ok(())
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn rounded_fps(fps: f64) -> i32 {
    let fps = fps.round() as i32;
    if fps <= 0 {
        DEFAULT_FPS
    } else {
        fps
    }
}

/// Resolves the encoder and its options. Falls back to MPEG-4 when libx264
/// is unavailable.
fn select_codec(crf: Option<u8>) -> Result<(ffmpeg_next::Codec, ffmpeg_next::Dictionary<'static>), Box<dyn std::error::Error>> {
    let mut options = ffmpeg_next::Dictionary::new();
    if let Some(crf) = crf {
        if let Some(codec) = ffmpeg_next::encoder::find_by_name("libx264") {
            options.set("crf", &crf.to_string());
            return Ok((codec, options));
        }
        log::warn!("libx264 not available, ignoring CRF {crf} and encoding MPEG-4");
    }
    let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
        .ok_or("MPEG4 encoder not found")?;
    Ok((codec, options))
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        self.fps = rounded_fps(metadata.fps);
        self.output_path = Some(path.to_path_buf());
        self.source_path = metadata.source_path.clone();

        let mut octx = ffmpeg_next::format::output(path)?;

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let (codec, options) = select_codec(self.crf)?;
        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(ENCODE_PIXEL);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, self.fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(self.fps, 1)));

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(options)?;
        ost.set_parameters(&encoder);
        log::debug!(
            "Encoding {}x{} @ {} fps with {}",
            metadata.width,
            metadata.height,
            self.fps,
            codec.name()
        );

        self.video_stream_index = 0;

        octx.write_header()?;

        let source_pixel = to_ffmpeg_pixel(metadata.format);
        self.scaler = if source_pixel == ENCODE_PIXEL {
            None
        } else {
            Some(scaling::Context::get(
                source_pixel,
                metadata.width,
                metadata.height,
                ENCODE_PIXEL,
                metadata.width,
                metadata.height,
                scaling::Flags::BILINEAR,
            )?)
        };

        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.frame_count = 0;

        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let encoder = self.encoder.as_mut().ok_or("FfmpegWriter: not opened")?;

        let source = video_from_frame(frame);
        let mut yuv_frame = match self.scaler.as_mut() {
            None => source,
            Some(scaler) => {
                let mut converted = Video::empty();
                scaler.run(&source, &mut converted)?;
                converted
            }
        };
        yuv_frame.set_pts(Some(self.frame_count as i64));

        encoder.send_frame(&yuv_frame)?;
        self.write_pending_packets()?;

        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.send_eof()?;
            self.write_pending_packets()?;
            if let Some(octx) = self.octx.as_mut() {
                octx.write_trailer()?;
            }
            log::debug!("Encoded {} frames", self.frame_count);
        }

        if let (Some(source_path), Some(output_path)) =
            (self.source_path.take(), self.output_path.take())
        {
            if let Err(e) = mux_audio(&source_path, &output_path) {
                log::warn!("Audio muxing failed: {e}");
            }
        }

        self.octx = None;
        self.encoder = None;
        self.scaler = None;

        Ok(())
    }
}

/// Copies audio from `source` into `video_output` by remuxing.
///
/// Writes video and audio into a sibling temp file, then replaces the
/// original output. Does nothing when the source has no audio stream.
fn mux_audio(source: &Path, video_output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let has_audio = ffmpeg_next::format::input(source)?
        .streams()
        .best(ffmpeg_next::media::Type::Audio)
        .is_some();

    if !has_audio {
        return Ok(());
    }

    let mut ictx_source = ffmpeg_next::format::input(source)?;
    let mut ictx_video = ffmpeg_next::format::input(video_output)?;

    let ext = video_output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp4");
    let temp_path = video_output.with_extension(format!("_mux.{ext}"));

    let mut octx = ffmpeg_next::format::output(&temp_path)?;

    let video_map = map_streams(&ictx_video, &mut octx, ffmpeg_next::media::Type::Video, 0)?;
    let first_audio = video_map.iter().flatten().count();
    let audio_map = map_streams(
        &ictx_source,
        &mut octx,
        ffmpeg_next::media::Type::Audio,
        first_audio,
    )?;

    octx.write_header()?;
    copy_packets(&mut ictx_video, &mut octx, &video_map)?;
    copy_packets(&mut ictx_source, &mut octx, &audio_map)?;
    octx.write_trailer()?;

    std::fs::rename(&temp_path, video_output)?;
    log::debug!("Muxed audio from {}", source.display());

    Ok(())
}

/// Adds an output stream for every input stream of `medium`, returning the
/// output index per input stream.
fn map_streams(
    ictx: &ffmpeg_next::format::context::Input,
    octx: &mut ffmpeg_next::format::context::Output,
    medium: ffmpeg_next::media::Type,
    first_index: usize,
) -> Result<Vec<Option<usize>>, Box<dyn std::error::Error>> {
    let mut map = vec![None; ictx.nb_streams() as usize];
    let mut next = first_index;
    for (idx, stream) in ictx.streams().enumerate() {
        if stream.parameters().medium() != medium {
            continue;
        }
        let mut ost = octx.add_stream(ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::None))?;
        ost.set_parameters(stream.parameters());
        // Let the muxer pick a tag valid for the output container.
        unsafe {
            (*ost.parameters().as_mut_ptr()).codec_tag = 0;
        }
        map[idx] = Some(next);
        next += 1;
    }
    Ok(map)
}

fn copy_packets(
    ictx: &mut ffmpeg_next::format::context::Input,
    octx: &mut ffmpeg_next::format::context::Output,
    map: &[Option<usize>],
) -> Result<(), Box<dyn std::error::Error>> {
    let time_bases: Vec<_> = ictx.streams().map(|s| s.time_base()).collect();

    for (stream, mut packet) in ictx.packets() {
        let ist_idx = stream.index();
        let Some(ost_idx) = map.get(ist_idx).copied().flatten() else {
            continue;
        };
        let ost_time_base = octx
            .stream(ost_idx)
            .ok_or("mux: output stream missing")?
            .time_base();
        packet.rescale_ts(time_bases[ist_idx], ost_time_base);
        packet.set_position(-1);
        packet.set_stream(ost_idx);
        packet.write_interleaved(octx)?;
    }
    Ok(())
}
