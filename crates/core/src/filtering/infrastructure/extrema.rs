use std::sync::Arc;

use ndarray::s;

use crate::filtering::domain::clip::{Clip, ClipInfo, ClipNode};
use crate::filtering::domain::filter_error::FilterError;
use crate::filtering::domain::filter_host::PlaneSet;
use crate::shared::frame::{Frame, Plane};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Extremum {
    Maximum,
    Minimum,
}

impl Extremum {
    fn name(self) -> &'static str {
        match self {
            Extremum::Maximum => "Maximum",
            Extremum::Minimum => "Minimum",
        }
    }
}

/// 3x3 grey-level dilation (`Maximum`) or erosion (`Minimum`).
///
/// Borders are handled by clamping the window to the plane. Planes outside
/// the selection are copied from the source.
pub struct ExtremaNode {
    source: Clip,
    info: ClipInfo,
    planes: PlaneSet,
    kind: Extremum,
}

impl ExtremaNode {
    pub fn new(source: Clip, planes: PlaneSet, kind: Extremum) -> Result<Self, FilterError> {
        let info = *source.info();
        if let Some(max) = planes.max_index() {
            if max >= info.format.num_planes() {
                return Err(FilterError::invalid_argument(
                    kind.name(),
                    format!("plane index {max} out of range for {:?}", info.format),
                ));
            }
        }
        Ok(Self {
            source,
            info,
            planes,
            kind,
        })
    }
}

impl ClipNode for ExtremaNode {
    fn info(&self) -> &ClipInfo {
        &self.info
    }

    fn frame(&self, n: usize) -> Result<Arc<Frame>, FilterError> {
        let src = self.source.frame(n)?;
        let planes = src
            .planes()
            .iter()
            .enumerate()
            .map(|(i, plane)| {
                if self.planes.contains(i) {
                    filter_plane(plane, self.kind)
                } else {
                    plane.clone()
                }
            })
            .collect();
        Ok(Arc::new(src.with_planes(planes)))
    }
}

pub fn filter_plane(src: &Plane, kind: Extremum) -> Plane {
    let (w, h) = (src.width(), src.height());
    let view = src.as_ndarray();
    let mut dst = src.clone();
    let mut out = dst.as_ndarray_mut();

    for y in 0..h {
        let y0 = y.saturating_sub(1);
        let y1 = (y + 1).min(h - 1);
        for x in 0..w {
            let x0 = x.saturating_sub(1);
            let x1 = (x + 1).min(w - 1);
            let window = view.slice(s![y0..=y1, x0..=x1]);
            let value = match kind {
                Extremum::Maximum => window.iter().copied().max(),
                Extremum::Minimum => window.iter().copied().min(),
            };
            out[[y, x]] = value.unwrap_or(view[[y, x]]);
        }
    }

    dst
}
