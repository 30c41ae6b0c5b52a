use serde::{Deserialize, Serialize};

use crate::filtering::domain::clip::Clip;
use crate::filtering::domain::filter_error::FilterError;
use crate::filtering::domain::filter_host::{FilterHost, PlaneSet, SmoothUvParams};
use crate::shared::constants::{
    DEFAULT_HIGH_THRESHOLD, DEFAULT_LOW_THRESHOLD, DEFAULT_RADIUS, EDGE_MASK_EXPR,
};

/// Tuning for [`rainbow_smooth`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RainbowSmoothParams {
    /// Smoothing window radius.
    pub radius: i32,
    /// Threshold applied everywhere. `0` leaves flat areas untouched.
    pub lthresh: i32,
    /// Threshold applied near luma edges, where rainbowing appears.
    pub hthresh: i32,
}

impl Default for RainbowSmoothParams {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            lthresh: DEFAULT_LOW_THRESHOLD,
            hthresh: DEFAULT_HIGH_THRESHOLD,
        }
    }
}

/// Builds the derainbow graph over `clip`.
///
/// The chroma is smoothed with `lthresh` everywhere (or left alone when
/// `lthresh <= 0`), and with `hthresh` where the local luma range marks an
/// edge. The edge mask ramps linearly from 0 to 255 as the 3x3 luma range
/// goes from 0 to 90. Luma is never modified.
///
/// Nothing is computed here; the returned clip evaluates frames on demand.
pub fn rainbow_smooth(
    host: &dyn FilterHost,
    clip: &Clip,
    params: &RainbowSmoothParams,
) -> Result<Clip, FilterError> {
    let lderain = if params.lthresh > 0 {
        host.smooth_uv(clip, smooth_params(params.radius, params.lthresh))?
    } else {
        clip.clone()
    };

    if params.hthresh <= params.lthresh {
        return Ok(lderain);
    }

    let hderain = host.smooth_uv(clip, smooth_params(params.radius, params.hthresh))?;

    let dilated = host.maximum(clip, PlaneSet::LUMA)?;
    let eroded = host.minimum(clip, PlaneSet::LUMA)?;
    let mask = host.expr(&[dilated, eroded], &[EDGE_MASK_EXPR, "", ""])?;

    host.masked_merge(&lderain, &hderain, &mask, PlaneSet::CHROMA, true)
}

fn smooth_params(radius: i32, threshold: i32) -> SmoothUvParams {
    SmoothUvParams {
        radius,
        threshold,
        interlaced: Some(false),
    }
}
