use std::ops::Range;
use std::sync::Arc;

use crate::filtering::domain::clip::{Clip, ClipInfo, ClipNode};
use crate::filtering::domain::filter_error::FilterError;
use crate::filtering::domain::filter_host::SmoothUvParams;
use crate::shared::constants::{
    SMOOTH_UV_MAX_RADIUS, SMOOTH_UV_MAX_THRESHOLD, SMOOTH_UV_MIN_RADIUS,
};
use crate::shared::frame::{Frame, Plane};

const FILTER_NAME: &str = "SmoothUV";

/// Spatial derainbow: replaces each chroma sample with the average of the
/// neighbours around it whose value lies within the threshold of it. Luma
/// passes through untouched.
pub struct SmoothUvNode {
    source: Clip,
    info: ClipInfo,
    radius: usize,
    threshold: i32,
    interlaced: Option<bool>,
}

impl SmoothUvNode {
    pub fn new(source: Clip, params: SmoothUvParams) -> Result<Self, FilterError> {
        if !(SMOOTH_UV_MIN_RADIUS..=SMOOTH_UV_MAX_RADIUS).contains(&params.radius) {
            return Err(FilterError::invalid_argument(
                FILTER_NAME,
                format!(
                    "radius must be between {SMOOTH_UV_MIN_RADIUS} and {SMOOTH_UV_MAX_RADIUS} (inclusive)."
                ),
            ));
        }
        if !(0..=SMOOTH_UV_MAX_THRESHOLD).contains(&params.threshold) {
            return Err(FilterError::invalid_argument(
                FILTER_NAME,
                format!("threshold must be between 0 and {SMOOTH_UV_MAX_THRESHOLD} (inclusive)."),
            ));
        }

        let info = *source.info();
        if !info.format.is_yuv() {
            return Err(FilterError::unsupported_format(
                FILTER_NAME,
                "only 8 bit YUV with constant format supported.",
            ));
        }

        Ok(Self {
            source,
            info,
            radius: params.radius as usize,
            threshold: effective_threshold(params.threshold),
            interlaced: params.interlaced,
        })
    }
}

impl ClipNode for SmoothUvNode {
    fn info(&self) -> &ClipInfo {
        &self.info
    }

    fn frame(&self, n: usize) -> Result<Arc<Frame>, FilterError> {
        let src = self.source.frame(n)?;
        let interlaced = self
            .interlaced
            .unwrap_or_else(|| src.field_based().is_interlaced());

        let planes = src
            .planes()
            .iter()
            .enumerate()
            .map(|(i, plane)| {
                if i == 0 {
                    plane.clone()
                } else {
                    smooth_plane(plane, self.radius, self.threshold, interlaced)
                }
            })
            .collect();

        Ok(Arc::new(src.with_planes(planes)))
    }
}

/// Per-sample difference limit for a user threshold: `floor(sqrt(t^2 / 3))`.
pub fn effective_threshold(threshold: i32) -> i32 {
    (((threshold * threshold) / 3) as f64).sqrt() as i32
}

/// Samples are processed in runs of this many columns sharing one window
/// origin.
const RUN: usize = 8;

/// `round(65536 / n)` saturated to `u16`; entry 0 is unused.
const RECIPROCALS: [u16; 256] = reciprocals();

const fn reciprocals() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut n = 1;
    while n < 256 {
        let r = (2 * 65536 + n) / (2 * n);
        table[n] = if r > 65535 { 65535 } else { r as u16 };
        n += 1;
    }
    table
}

/// Fixed-point rounded mean: `((sum + count/2) * round(65536/count)) >> 16`.
/// A lone sample `c` comes out as `c - 1`.
fn scaled_average(sum: u32, count: u32) -> u8 {
    let scaled = ((sum + count / 2) * RECIPROCALS[count as usize] as u32) >> 16;
    scaled.min(255) as u8
}

/// Columns averaged for sample `x`.
///
/// The window reaches `radius + 1` columns to the right. Its left reach is
/// taken from the first column of the run `x` belongs to, so the first run
/// of a row only looks right. The final run narrows to end one column past
/// the sample; columns beyond the plane are not read.
fn column_span(x: usize, width: usize, radius: usize) -> Range<usize> {
    let run = x - x % RUN;
    let x0 = run.min(radius) as isize;
    let xn = if run + RUN + radius < width {
        x0 + radius as isize + 1
    } else {
        x0 + width as isize - run as isize - (RUN as isize - 1)
    };

    let start = x as isize - x0;
    let end = (start + xn + 1).clamp(start, width as isize);
    start as usize..end as usize
}

/// Rows (in field coordinates) averaged for row `fy` out of `rows`.
/// Interlaced windows stop one row short.
fn row_span(fy: usize, rows: usize, radius: usize, interlaced: bool) -> Range<usize> {
    let y0 = fy.min(radius);
    let mut yn = if fy + radius < rows {
        y0 + radius + 1
    } else {
        y0 + rows - fy
    };
    if interlaced {
        yn -= 1;
    }
    fy - y0..fy - y0 + yn
}

/// Smooths one plane. In interlaced mode each field is processed on its own,
/// so the window only ever covers rows of the same parity. The trailing row
/// of an odd-height interlaced plane is copied.
///
/// A sample with no neighbour inside the threshold keeps its value.
pub fn smooth_plane(src: &Plane, radius: usize, threshold: i32, interlaced: bool) -> Plane {
    let (w, h) = (src.width(), src.height());
    let mut dst = src.clone();
    if w == 0 || h == 0 {
        return dst;
    }

    let (step, rows) = if interlaced { (2, h / 2) } else { (1, h) };
    let out = dst.data_mut();

    for field in 0..step {
        for fy in 0..rows {
            let y = fy * step + field;
            let window_rows = row_span(fy, rows, radius, interlaced);

            for x in 0..w {
                let columns = column_span(x, w, radius);
                let center = src.get(x, y) as i32;

                let mut sum = 0u32;
                let mut count = 0u32;
                for wy in window_rows.clone() {
                    for &p in &src.row(wy * step + field)[columns.clone()] {
                        if (center - p as i32).abs() < threshold {
                            sum += p as u32;
                            count += 1;
                        }
                    }
                }

                out[y * w + x] = if count == 0 {
                    center as u8
                } else {
                    scaled_average(sum, count)
                };
            }
        }
    }

    dst
}
