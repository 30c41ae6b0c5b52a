use std::sync::Arc;

use crate::filtering::domain::clip::{Clip, ClipInfo, ClipNode};
use crate::filtering::domain::expression::{Expression, MAX_EXPR_INPUTS};
use crate::filtering::domain::filter_error::FilterError;
use crate::shared::frame::{Frame, Plane};

const FILTER_NAME: &str = "Expr";

/// Evaluates one RPN expression per plane over up to three input clips.
///
/// If fewer expressions than planes are given, the last one is reused. An
/// empty expression copies that plane from the first clip.
pub struct ExprNode {
    clips: Vec<Clip>,
    info: ClipInfo,
    exprs: Vec<Option<Expression>>,
}

impl ExprNode {
    pub fn new(clips: &[Clip], exprs: &[&str]) -> Result<Self, FilterError> {
        let first = clips.first().ok_or_else(|| {
            FilterError::invalid_argument(FILTER_NAME, "at least one clip is required")
        })?;
        if clips.len() > MAX_EXPR_INPUTS {
            return Err(FilterError::invalid_argument(
                FILTER_NAME,
                format!("at most {MAX_EXPR_INPUTS} clips are supported"),
            ));
        }
        let info = *first.info();
        if clips.iter().any(|c| !c.info().same_shape(&info)) {
            return Err(FilterError::format_mismatch(
                FILTER_NAME,
                "all clips must have the same format and dimensions",
            ));
        }
        if exprs.is_empty() {
            return Err(FilterError::invalid_argument(
                FILTER_NAME,
                "at least one expression is required",
            ));
        }
        if exprs.len() > info.format.num_planes() {
            return Err(FilterError::invalid_argument(
                FILTER_NAME,
                format!(
                    "{} expressions given for {} planes",
                    exprs.len(),
                    info.format.num_planes()
                ),
            ));
        }

        let parsed = (0..info.format.num_planes())
            .map(|plane| {
                let source = exprs[plane.min(exprs.len() - 1)].trim();
                if source.is_empty() {
                    Ok(None)
                } else {
                    Expression::parse(source, clips.len()).map(Some)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            clips: clips.to_vec(),
            info,
            exprs: parsed,
        })
    }
}

impl ClipNode for ExprNode {
    fn info(&self) -> &ClipInfo {
        &self.info
    }

    fn frame(&self, n: usize) -> Result<Arc<Frame>, FilterError> {
        let frames = self
            .clips
            .iter()
            .map(|c| c.frame(n))
            .collect::<Result<Vec<_>, _>>()?;
        let base = &frames[0];

        let planes = self
            .exprs
            .iter()
            .enumerate()
            .map(|(i, expr)| match expr {
                None => base.plane(i).clone(),
                Some(expr) => {
                    let sources: Vec<&Plane> = frames.iter().map(|f| f.plane(i)).collect();
                    evaluate_plane(expr, &sources)
                }
            })
            .collect();

        Ok(Arc::new(base.with_planes(planes)))
    }
}

fn evaluate_plane(expr: &Expression, sources: &[&Plane]) -> Plane {
    let (w, h) = (sources[0].width(), sources[0].height());
    let mut out = Vec::with_capacity(w * h);
    let mut inputs = [0.0f32; MAX_EXPR_INPUTS];
    let mut stack = Vec::new();

    for idx in 0..w * h {
        for (slot, plane) in inputs.iter_mut().zip(sources) {
            *slot = plane.data()[idx] as f32;
        }
        out.push(expr.evaluate_u8(&inputs[..sources.len()], &mut stack));
    }

    Plane::new(out, w, h)
}
