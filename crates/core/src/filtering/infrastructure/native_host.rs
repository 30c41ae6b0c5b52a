use crate::filtering::domain::clip::Clip;
use crate::filtering::domain::filter_error::FilterError;
use crate::filtering::domain::filter_host::{FilterHost, PlaneSet, SmoothUvParams};

use super::expr_filter::ExprNode;
use super::extrema::{ExtremaNode, Extremum};
use super::masked_merge::MaskedMergeNode;
use super::smooth_uv::SmoothUvNode;

/// CPU implementation of every filter the derainbow pipeline needs.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeFilterHost;

impl NativeFilterHost {
    pub fn new() -> Self {
        Self
    }
}

impl FilterHost for NativeFilterHost {
    fn smooth_uv(&self, clip: &Clip, params: SmoothUvParams) -> Result<Clip, FilterError> {
        log::debug!(
            "SmoothUV(radius={}, threshold={}, interlaced={:?})",
            params.radius,
            params.threshold,
            params.interlaced
        );
        Ok(Clip::new(SmoothUvNode::new(clip.clone(), params)?))
    }

    fn maximum(&self, clip: &Clip, planes: PlaneSet) -> Result<Clip, FilterError> {
        Ok(Clip::new(ExtremaNode::new(
            clip.clone(),
            planes,
            Extremum::Maximum,
        )?))
    }

    fn minimum(&self, clip: &Clip, planes: PlaneSet) -> Result<Clip, FilterError> {
        Ok(Clip::new(ExtremaNode::new(
            clip.clone(),
            planes,
            Extremum::Minimum,
        )?))
    }

    fn expr(&self, clips: &[Clip], exprs: &[&str]) -> Result<Clip, FilterError> {
        log::debug!("Expr({exprs:?}) over {} clips", clips.len());
        Ok(Clip::new(ExprNode::new(clips, exprs)?))
    }

    fn masked_merge(
        &self,
        a: &Clip,
        b: &Clip,
        mask: &Clip,
        planes: PlaneSet,
        first_plane: bool,
    ) -> Result<Clip, FilterError> {
        Ok(Clip::new(MaskedMergeNode::new(
            a.clone(),
            b.clone(),
            mask.clone(),
            planes,
            first_plane,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::{Frame, PixelFormat};

    fn source() -> Clip {
        Clip::from_frames(
            vec![Frame::filled(PixelFormat::Yuv420p, 8, 8, &[60, 100, 150], 0)],
            25.0,
        )
        .unwrap()
    }

    #[test]
    fn test_nodes_keep_source_info() {
        let host = NativeFilterHost::new();
        let clip = source();
        let smoothed = host.smooth_uv(&clip, SmoothUvParams::default()).unwrap();
        let max = host.maximum(&clip, PlaneSet::LUMA).unwrap();
        let min = host.minimum(&clip, PlaneSet::LUMA).unwrap();
        let expr = host.expr(&[max.clone(), min.clone()], &["x y -", ""]).unwrap();
        let merged = host
            .masked_merge(&clip, &smoothed, &expr, PlaneSet::CHROMA, true)
            .unwrap();
        for c in [&smoothed, &max, &min, &expr, &merged] {
            assert_eq!(c.info(), clip.info());
        }
    }

    #[test]
    fn test_errors_propagate() {
        let host = NativeFilterHost::new();
        let bad = SmoothUvParams {
            radius: 0,
            ..SmoothUvParams::default()
        };
        assert!(host.smooth_uv(&source(), bad).is_err());
        assert!(host.expr(&[source()], &["x y +"]).is_err());
    }
}
