use std::fmt;
use std::sync::Arc;

use crate::filtering::domain::filter_error::FilterError;
use crate::shared::frame::{Frame, PixelFormat};

/// Static properties shared by every frame of a clip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipInfo {
    pub format: PixelFormat,
    pub width: usize,
    pub height: usize,
    pub num_frames: usize,
    pub fps: f64,
}

impl ClipInfo {
    /// True when `other` has the same format and dimensions.
    pub fn same_shape(&self, other: &ClipInfo) -> bool {
        self.format == other.format && self.width == other.width && self.height == other.height
    }
}

/// A node in a lazily evaluated filter graph.
///
/// Nodes hold their inputs as [`Clip`]s and only compute pixels when a
/// frame is requested.
pub trait ClipNode: Send + Sync {
    fn info(&self) -> &ClipInfo;

    /// Produces frame `n`. Callers go through [`Clip::frame`], which checks
    /// the bounds first.
    fn frame(&self, n: usize) -> Result<Arc<Frame>, FilterError>;
}

/// Cheap-to-clone handle to a clip node.
#[derive(Clone)]
pub struct Clip {
    node: Arc<dyn ClipNode>,
}

impl Clip {
    pub fn new(node: impl ClipNode + 'static) -> Self {
        Self {
            node: Arc::new(node),
        }
    }

    /// Wraps in-memory frames as a source clip.
    pub fn from_frames(frames: Vec<Frame>, fps: f64) -> Result<Self, FilterError> {
        Ok(Self::new(SourceClip::new(frames, fps)?))
    }

    pub fn info(&self) -> &ClipInfo {
        self.node.info()
    }

    pub fn num_frames(&self) -> usize {
        self.info().num_frames
    }

    pub fn frame(&self, n: usize) -> Result<Arc<Frame>, FilterError> {
        let available = self.num_frames();
        if n >= available {
            return Err(FilterError::FrameOutOfRange {
                requested: n,
                available,
            });
        }
        self.node.frame(n)
    }

    /// Iterates over every frame in order, evaluating each on demand.
    pub fn frames(&self) -> impl Iterator<Item = Result<Arc<Frame>, FilterError>> + '_ {
        (0..self.num_frames()).map(move |n| self.frame(n))
    }

    /// True when both handles refer to the same graph node.
    pub fn ptr_eq(&self, other: &Clip) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

impl fmt::Debug for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clip").field("info", self.info()).finish()
    }
}

/// Clip over frames already held in memory.
pub struct SourceClip {
    info: ClipInfo,
    frames: Vec<Arc<Frame>>,
}

impl SourceClip {
    pub fn new(frames: Vec<Frame>, fps: f64) -> Result<Self, FilterError> {
        let first = frames.first().ok_or(FilterError::EmptyClip)?;
        let info = ClipInfo {
            format: first.format(),
            width: first.width(),
            height: first.height(),
            num_frames: frames.len(),
            fps,
        };
        for frame in &frames {
            if frame.format() != info.format
                || frame.width() != info.width
                || frame.height() != info.height
            {
                return Err(FilterError::format_mismatch(
                    "Source",
                    format!(
                        "frame {} is {:?} {}x{}, expected {:?} {}x{}",
                        frame.index(),
                        frame.format(),
                        frame.width(),
                        frame.height(),
                        info.format,
                        info.width,
                        info.height
                    ),
                ));
            }
        }
        Ok(Self {
            info,
            frames: frames.into_iter().map(Arc::new).collect(),
        })
    }
}

impl ClipNode for SourceClip {
    fn info(&self) -> &ClipInfo {
        &self.info
    }

    fn frame(&self, n: usize) -> Result<Arc<Frame>, FilterError> {
        Ok(Arc::clone(&self.frames[n]))
    }
}
