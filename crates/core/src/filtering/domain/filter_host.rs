use crate::filtering::domain::clip::Clip;
use crate::filtering::domain::filter_error::FilterError;
use crate::shared::constants::{DEFAULT_RADIUS, SMOOTH_UV_DEFAULT_THRESHOLD};

/// Set of plane indices a filter should process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaneSet(u8);

impl PlaneSet {
    pub const LUMA: PlaneSet = PlaneSet(0b001);
    pub const CHROMA: PlaneSet = PlaneSet(0b110);
    pub const ALL: PlaneSet = PlaneSet(0b111);

    pub fn contains(self, plane: usize) -> bool {
        plane < 3 && self.0 & (1 << plane) != 0
    }

    /// Highest plane index in the set, if any.
    pub fn max_index(self) -> Option<usize> {
        (0..3).rev().find(|&p| self.contains(p))
    }
}

/// Parameters for the SmoothUV chroma smoother.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SmoothUvParams {
    pub radius: i32,
    pub threshold: i32,
    /// `None` reads the field order from each frame.
    pub interlaced: Option<bool>,
}

impl Default for SmoothUvParams {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            threshold: SMOOTH_UV_DEFAULT_THRESHOLD,
            interlaced: None,
        }
    }
}

/// The filter operations the derainbow pipeline is composed from.
///
/// Every method returns a new lazy [`Clip`]; no frames are computed until
/// one is requested from the result. Argument and format validation happens
/// here, at graph construction.
pub trait FilterHost: Send + Sync {
    /// Threshold-limited chroma averaging; luma passes through.
    fn smooth_uv(&self, clip: &Clip, params: SmoothUvParams) -> Result<Clip, FilterError>;

    /// Local 3x3 maximum on the selected planes.
    fn maximum(&self, clip: &Clip, planes: PlaneSet) -> Result<Clip, FilterError>;

    /// Local 3x3 minimum on the selected planes.
    fn minimum(&self, clip: &Clip, planes: PlaneSet) -> Result<Clip, FilterError>;

    /// Per-pixel RPN expression, one expression per plane.
    fn expr(&self, clips: &[Clip], exprs: &[&str]) -> Result<Clip, FilterError>;

    /// Blends `a` towards `b` on the selected planes, weighted by `mask`.
    fn masked_merge(
        &self,
        a: &Clip,
        b: &Clip,
        mask: &Clip,
        planes: PlaneSet,
        first_plane: bool,
    ) -> Result<Clip, FilterError>;
}
