use std::sync::Arc;

use crate::filtering::domain::clip::{Clip, ClipInfo, ClipNode};
use crate::filtering::domain::filter_error::FilterError;
use crate::filtering::domain::filter_host::PlaneSet;
use crate::shared::frame::{Frame, Plane};

const FILTER_NAME: &str = "MaskedMerge";

/// Per-sample blend `a*(255-m)/255 + b*m/255` on the selected planes.
///
/// With `first_plane` the mask's luma plane drives every selected plane;
/// for subsampled chroma it is averaged down to the chroma grid.
pub struct MaskedMergeNode {
    a: Clip,
    b: Clip,
    mask: Clip,
    info: ClipInfo,
    planes: PlaneSet,
    first_plane: bool,
}

impl MaskedMergeNode {
    pub fn new(
        a: Clip,
        b: Clip,
        mask: Clip,
        planes: PlaneSet,
        first_plane: bool,
    ) -> Result<Self, FilterError> {
        let info = *a.info();
        if !b.info().same_shape(&info) {
            return Err(FilterError::format_mismatch(
                FILTER_NAME,
                "both clips must have the same format and dimensions",
            ));
        }
        if let Some(max) = planes.max_index() {
            if max >= info.format.num_planes() {
                return Err(FilterError::invalid_argument(
                    FILTER_NAME,
                    format!("plane index {max} out of range for {:?}", info.format),
                ));
            }
        }
        let mask_info = mask.info();
        if first_plane {
            if mask_info.width != info.width || mask_info.height != info.height {
                return Err(FilterError::format_mismatch(
                    FILTER_NAME,
                    "mask's first plane must match the clips' luma dimensions",
                ));
            }
        } else if !mask_info.same_shape(&info) {
            return Err(FilterError::format_mismatch(
                FILTER_NAME,
                "mask must have the same format and dimensions as the clips",
            ));
        }

        Ok(Self {
            a,
            b,
            mask,
            info,
            planes,
            first_plane,
        })
    }
}

impl ClipNode for MaskedMergeNode {
    fn info(&self) -> &ClipInfo {
        &self.info
    }

    fn frame(&self, n: usize) -> Result<Arc<Frame>, FilterError> {
        let a = self.a.frame(n)?;
        if self.planes.max_index().is_none() {
            return Ok(a);
        }
        let b = self.b.frame(n)?;
        let mask = self.mask.frame(n)?;
        let (ssw, ssh) = self.info.format.subsampling();

        let planes = a
            .planes()
            .iter()
            .enumerate()
            .map(|(i, plane_a)| {
                if !self.planes.contains(i) {
                    return plane_a.clone();
                }
                let weights = if !self.first_plane {
                    mask.plane(i).clone()
                } else if i == 0 || (ssw, ssh) == (0, 0) {
                    mask.plane(0).clone()
                } else {
                    downsample_mask(mask.plane(0), plane_a.width(), plane_a.height(), ssw, ssh)
                };
                merge_plane(plane_a, b.plane(i), &weights)
            })
            .collect();

        Ok(Arc::new(a.with_planes(planes)))
    }
}

pub fn merge_plane(a: &Plane, b: &Plane, mask: &Plane) -> Plane {
    let data = a
        .data()
        .iter()
        .zip(b.data())
        .zip(mask.data())
        .map(|((&a, &b), &m)| {
            let (a, b, m) = (a as u32, b as u32, m as u32);
            ((a * (255 - m) + b * m + 127) / 255) as u8
        })
        .collect();
    Plane::new(data, a.width(), a.height())
}

/// Averages the luma-resolution mask over each `2^ssw x 2^ssh` block.
pub fn downsample_mask(mask: &Plane, width: usize, height: usize, ssw: u32, ssh: u32) -> Plane {
    let mut out = Vec::with_capacity(width * height);
    for cy in 0..height {
        let y0 = cy << ssh;
        let y1 = ((cy + 1) << ssh).min(mask.height());
        for cx in 0..width {
            let x0 = cx << ssw;
            let x1 = ((cx + 1) << ssw).min(mask.width());
            let mut sum = 0u32;
            let mut count = 0u32;
            for y in y0..y1 {
                for &m in &mask.row(y)[x0..x1] {
                    sum += m as u32;
                    count += 1;
                }
            }
            out.push(if count == 0 {
                0
            } else {
                ((sum + count / 2) / count) as u8
            });
        }
    }
    Plane::new(out, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::PixelFormat;
    use rstest::rstest;

    fn clip(format: PixelFormat, values: &[u8]) -> Clip {
        Clip::from_frames(vec![Frame::filled(format, 4, 4, values, 0)], 25.0).unwrap()
    }

    #[rstest]
    #[case::mask_zero(0, 40)]
    #[case::mask_full(255, 200)]
    #[case::mask_half(128, 120)]
    fn test_merge_weights(#[case] m: u8, #[case] expected: u8) {
        let a = Plane::filled(2, 2, 40);
        let b = Plane::filled(2, 2, 200);
        let mask = Plane::filled(2, 2, m);
        assert_eq!(merge_plane(&a, &b, &mask).get(1, 1), expected);
    }

    #[test]
    fn test_only_selected_planes_merged() {
        let a = clip(PixelFormat::Yuv444p, &[10, 20, 30]);
        let b = clip(PixelFormat::Yuv444p, &[110, 120, 130]);
        let mask = clip(PixelFormat::Yuv444p, &[255, 0, 0]);
        let node = MaskedMergeNode::new(a, b, mask, PlaneSet::CHROMA, true).unwrap();
        let out = node.frame(0).unwrap();
        assert!(out.plane(0).data().iter().all(|&v| v == 10));
        assert!(out.plane(1).data().iter().all(|&v| v == 120));
        assert!(out.plane(2).data().iter().all(|&v| v == 130));
    }

    #[test]
    fn test_per_plane_mask_without_first_plane() {
        let a = clip(PixelFormat::Yuv444p, &[10, 20, 30]);
        let b = clip(PixelFormat::Yuv444p, &[110, 120, 130]);
        let mask = clip(PixelFormat::Yuv444p, &[255, 0, 255]);
        let node = MaskedMergeNode::new(a, b, mask, PlaneSet::ALL, false).unwrap();
        let out = node.frame(0).unwrap();
        assert_eq!(out.plane(0).get(0, 0), 110);
        assert_eq!(out.plane(1).get(0, 0), 20);
        assert_eq!(out.plane(2).get(0, 0), 130);
    }

    #[test]
    fn test_first_plane_mask_downsampled_for_420() {
        let a = clip(PixelFormat::Yuv420p, &[0, 0, 0]);
        let b = clip(PixelFormat::Yuv420p, &[0, 255, 255]);
        let mut mask_frame = Frame::filled(PixelFormat::Yuv420p, 4, 4, &[0, 0, 0], 0);
        // Top-left 2x2 luma block fully masked.
        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            mask_frame.plane_mut(0).data_mut()[y * 4 + x] = 255;
        }
        let mask = Clip::from_frames(vec![mask_frame], 25.0).unwrap();

        let node = MaskedMergeNode::new(a, b, mask, PlaneSet::CHROMA, true).unwrap();
        let out = node.frame(0).unwrap();
        assert_eq!(out.plane(1).get(0, 0), 255);
        assert_eq!(out.plane(1).get(1, 0), 0);
        assert_eq!(out.plane(2).get(0, 1), 0);
    }

    #[test]
    fn test_downsample_mask_rounds_average() {
        let mut mask = Plane::filled(3, 2, 0);
        mask.data_mut().copy_from_slice(&[0, 255, 100, 0, 0, 100]);
        let small = downsample_mask(&mask, 2, 1, 1, 1);
        assert_eq!(small.get(0, 0), 64); // (255 + 2) / 4
        assert_eq!(small.get(1, 0), 100); // odd width: single column block
    }

    #[test]
    fn test_mismatched_clips_rejected() {
        let a = clip(PixelFormat::Yuv444p, &[0, 0, 0]);
        let b = clip(PixelFormat::Yuv420p, &[0, 0, 0]);
        let mask = clip(PixelFormat::Yuv444p, &[0, 0, 0]);
        let result = MaskedMergeNode::new(a, b, mask, PlaneSet::CHROMA, true);
        assert!(matches!(result, Err(FilterError::FormatMismatch { .. })));
    }

    #[test]
    fn test_gray_chroma_selection_rejected() {
        let a = clip(PixelFormat::Gray8, &[0]);
        let result = MaskedMergeNode::new(a.clone(), a.clone(), a, PlaneSet::CHROMA, true);
        assert!(matches!(result, Err(FilterError::InvalidArgument { .. })));
    }
}
