use crate::shared::frame::Frame;

/// Domain interface for transforming one decoded frame into its filtered
/// counterpart. The output keeps the input's index and dimensions.
pub trait FrameProcessor: Send {
    fn process(&self, frame: Frame) -> Result<Frame, Box<dyn std::error::Error>>;
}
