use std::sync::Arc;

use crate::derainbow::domain::frame_processor::FrameProcessor;
use crate::derainbow::domain::rainbow_smooth::{rainbow_smooth, RainbowSmoothParams};
use crate::filtering::domain::clip::Clip;
use crate::filtering::domain::filter_host::FilterHost;
use crate::filtering::infrastructure::native_host::NativeFilterHost;
use crate::shared::frame::Frame;

/// Runs the RainbowSmooth graph over frames arriving one at a time.
///
/// Each frame is wrapped in a single-frame clip, the graph is built on top
/// of it and frame 0 is evaluated.
pub struct RainbowSmoothProcessor {
    host: Arc<dyn FilterHost>,
    params: RainbowSmoothParams,
}

impl RainbowSmoothProcessor {
    pub fn new(host: Arc<dyn FilterHost>, params: RainbowSmoothParams) -> Self {
        Self { host, params }
    }
}

impl Default for RainbowSmoothProcessor {
    fn default() -> Self {
        Self::new(
            Arc::new(NativeFilterHost::new()),
            RainbowSmoothParams::default(),
        )
    }
}

impl FrameProcessor for RainbowSmoothProcessor {
    fn process(&self, frame: Frame) -> Result<Frame, Box<dyn std::error::Error>> {
        let index = frame.index();
        let source = Clip::from_frames(vec![frame], 0.0)?;
        let filtered = rainbow_smooth(self.host.as_ref(), &source, &self.params)?;
        let out = filtered.frame(0)?;

        // Unwrap the Arc without copying when the graph holds no other reference.
        let mut out = Arc::try_unwrap(out).unwrap_or_else(|shared| (*shared).clone());
        out.set_index(index);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::{FieldBased, PixelFormat};

    fn noisy_frame(index: usize) -> Frame {
        let mut frame = Frame::filled(PixelFormat::Yuv420p, 16, 16, &[0, 128, 128], index);
        for (i, v) in frame.plane_mut(0).data_mut().iter_mut().enumerate() {
            *v = if i % 16 < 8 { 20 } else { 200 };
        }
        for (i, v) in frame.plane_mut(1).data_mut().iter_mut().enumerate() {
            *v = if i % 3 == 0 { 100 } else { 150 };
        }
        frame
    }

    #[test]
    fn test_preserves_index_and_shape() {
        let processor = RainbowSmoothProcessor::default();
        let out = processor.process(noisy_frame(42)).unwrap();
        assert_eq!(out.index(), 42);
        assert_eq!(out.width(), 16);
        assert_eq!(out.height(), 16);
        assert_eq!(out.format(), PixelFormat::Yuv420p);
    }

    #[test]
    fn test_preserves_field_based_property() {
        let processor = RainbowSmoothProcessor::default();
        let frame = noisy_frame(0).with_field_based(FieldBased::BottomFieldFirst);
        let out = processor.process(frame).unwrap();
        assert_eq!(out.field_based(), FieldBased::BottomFieldFirst);
    }

    #[test]
    fn test_luma_untouched_chroma_filtered() {
        let processor = RainbowSmoothProcessor::default();
        let input = noisy_frame(0);
        let out = processor.process(input.clone()).unwrap();
        assert_eq!(out.plane(0), input.plane(0));
        assert_ne!(out.plane(1), input.plane(1));
    }

    #[test]
    fn test_passthrough_params_return_input() {
        let processor = RainbowSmoothProcessor::new(
            Arc::new(NativeFilterHost::new()),
            RainbowSmoothParams {
                radius: 3,
                lthresh: 0,
                hthresh: 0,
            },
        );
        let input = noisy_frame(3);
        let out = processor.process(input.clone()).unwrap();
        assert_eq!(out.planes(), input.planes());
        assert_eq!(out.index(), 3);
    }

    #[test]
    fn test_invalid_params_error() {
        let processor = RainbowSmoothProcessor::new(
            Arc::new(NativeFilterHost::new()),
            RainbowSmoothParams {
                radius: 9,
                lthresh: 0,
                hthresh: 220,
            },
        );
        let err = processor.process(noisy_frame(0)).unwrap_err();
        assert!(err.to_string().contains("radius"));
    }
}
