use crate::filtering::domain::filter_error::FilterError;

/// Maximum number of input clips an expression can reference (`x`, `y`, `z`).
pub const MAX_EXPR_INPUTS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Op {
    Load(usize),
    Const(f32),
    Add,
    Sub,
    Mul,
    Div,
    Max,
    Min,
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    And,
    Or,
    Abs,
    Sqrt,
    Not,
    Dup,
    Swap,
    Ternary,
}

impl Op {
    fn parse(token: &str, num_inputs: usize) -> Result<Self, FilterError> {
        let op = match token {
            "+" => Op::Add,
            "-" => Op::Sub,
            "*" => Op::Mul,
            "/" => Op::Div,
            "max" => Op::Max,
            "min" => Op::Min,
            ">" => Op::Gt,
            "<" => Op::Lt,
            ">=" => Op::Ge,
            "<=" => Op::Le,
            "=" => Op::Eq,
            "and" => Op::And,
            "or" => Op::Or,
            "abs" => Op::Abs,
            "sqrt" => Op::Sqrt,
            "not" => Op::Not,
            "dup" => Op::Dup,
            "swap" => Op::Swap,
            "?" => Op::Ternary,
            "x" | "y" | "z" => {
                let index = match token {
                    "x" => 0,
                    "y" => 1,
                    _ => 2,
                };
                if index >= num_inputs {
                    return Err(FilterError::Expression {
                        message: format!(
                            "'{token}' references clip {index} but only {num_inputs} supplied"
                        ),
                    });
                }
                Op::Load(index)
            }
            _ => {
                let value: f32 = token.parse().map_err(|_| FilterError::Expression {
                    message: format!("failed to parse token '{token}'"),
                })?;
                Op::Const(value)
            }
        };
        Ok(op)
    }

    /// Stack values consumed and produced.
    fn arity(self) -> (usize, usize) {
        match self {
            Op::Load(_) | Op::Const(_) => (0, 1),
            Op::Abs | Op::Sqrt | Op::Not => (1, 1),
            Op::Dup => (1, 2),
            Op::Swap => (2, 2),
            Op::Ternary => (3, 1),
            _ => (2, 1),
        }
    }
}

/// A parsed reverse-Polish per-pixel expression.
///
/// Evaluated in `f32`; comparisons yield `1.0` or `0.0` and a value counts
/// as true when greater than zero.
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    ops: Vec<Op>,
    max_depth: usize,
}

impl Expression {
    pub fn parse(source: &str, num_inputs: usize) -> Result<Self, FilterError> {
        let ops = source
            .split_whitespace()
            .map(|token| Op::parse(token, num_inputs))
            .collect::<Result<Vec<_>, _>>()?;

        if ops.is_empty() {
            return Err(FilterError::Expression {
                message: "empty expression".to_string(),
            });
        }

        let mut depth = 0usize;
        let mut max_depth = 0usize;
        for op in &ops {
            let (pops, pushes) = op.arity();
            if depth < pops {
                return Err(FilterError::Expression {
                    message: format!("stack underflow in '{source}'"),
                });
            }
            depth = depth - pops + pushes;
            max_depth = max_depth.max(depth);
        }
        if depth != 1 {
            return Err(FilterError::Expression {
                message: format!("'{source}' leaves {depth} values on the stack, expected 1"),
            });
        }

        Ok(Self { ops, max_depth })
    }

    /// Evaluates with `inputs[i]` bound to the i-th variable. `stack` is
    /// scratch space reused between pixels.
    pub fn evaluate(&self, inputs: &[f32], stack: &mut Vec<f32>) -> f32 {
        stack.clear();
        stack.reserve(self.max_depth);
        for &op in &self.ops {
            match op {
                Op::Load(i) => stack.push(inputs[i]),
                Op::Const(v) => stack.push(v),
                Op::Abs => unary(stack, f32::abs),
                Op::Sqrt => unary(stack, |a| a.max(0.0).sqrt()),
                Op::Not => unary(stack, |a| truth(a <= 0.0)),
                Op::Dup => {
                    let top = stack[stack.len() - 1];
                    stack.push(top);
                }
                Op::Swap => {
                    let n = stack.len();
                    stack.swap(n - 1, n - 2);
                }
                Op::Ternary => {
                    let b = stack.pop().unwrap_or_default();
                    let a = stack.pop().unwrap_or_default();
                    let cond = stack.pop().unwrap_or_default();
                    stack.push(if cond > 0.0 { a } else { b });
                }
                Op::Add => binary(stack, |a, b| a + b),
                Op::Sub => binary(stack, |a, b| a - b),
                Op::Mul => binary(stack, |a, b| a * b),
                Op::Div => binary(stack, |a, b| if b == 0.0 { 0.0 } else { a / b }),
                Op::Max => binary(stack, f32::max),
                Op::Min => binary(stack, f32::min),
                Op::Gt => binary(stack, |a, b| truth(a > b)),
                Op::Lt => binary(stack, |a, b| truth(a < b)),
                Op::Ge => binary(stack, |a, b| truth(a >= b)),
                Op::Le => binary(stack, |a, b| truth(a <= b)),
                Op::Eq => binary(stack, |a, b| truth(a == b)),
                Op::And => binary(stack, |a, b| truth(a > 0.0 && b > 0.0)),
                Op::Or => binary(stack, |a, b| truth(a > 0.0 || b > 0.0)),
            }
        }
        stack.pop().unwrap_or_default()
    }

    /// Evaluates and converts to an 8-bit sample (rounded, clamped).
    pub fn evaluate_u8(&self, inputs: &[f32], stack: &mut Vec<f32>) -> u8 {
        let value = self.evaluate(inputs, stack);
        if value.is_nan() {
            return 0;
        }
        value.round().clamp(0.0, 255.0) as u8
    }
}

fn truth(cond: bool) -> f32 {
    if cond {
        1.0
    } else {
        0.0
    }
}

fn unary(stack: &mut [f32], f: impl Fn(f32) -> f32) {
    let n = stack.len();
    stack[n - 1] = f(stack[n - 1]);
}

fn binary(stack: &mut Vec<f32>, f: impl Fn(f32, f32) -> f32) {
    let b = stack.pop().unwrap_or_default();
    let n = stack.len();
    stack[n - 1] = f(stack[n - 1], b);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::constants::EDGE_MASK_EXPR;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn eval(source: &str, inputs: &[f32]) -> f32 {
        let expr = Expression::parse(source, inputs.len()).unwrap();
        expr.evaluate(inputs, &mut Vec::new())
    }

    #[rstest]
    #[case::add("x y +", 7.0)]
    #[case::sub("x y -", 3.0)]
    #[case::mul("x y *", 10.0)]
    #[case::div("x y /", 2.5)]
    #[case::max("x y max", 5.0)]
    #[case::min("x y min", 2.0)]
    #[case::gt("x y >", 1.0)]
    #[case::lt("x y <", 0.0)]
    #[case::ge("x 5 >=", 1.0)]
    #[case::le("x 4 <=", 0.0)]
    #[case::eq("x 5 =", 1.0)]
    #[case::and("x y and", 1.0)]
    #[case::or("0 y or", 1.0)]
    #[case::abs("y x - abs", 3.0)]
    #[case::sqrt("x 4 * sqrt", 4.472136)]
    #[case::not("x not", 0.0)]
    #[case::dup("x dup *", 25.0)]
    #[case::swap("x y swap -", -3.0)]
    #[case::ternary_true("1 x y ?", 5.0)]
    #[case::ternary_false("0 x y ?", 2.0)]
    fn test_operators(#[case] source: &str, #[case] expected: f32) {
        assert_relative_eq!(eval(source, &[5.0, 2.0]), expected, epsilon = 1e-5);
    }

    #[test]
    fn test_division_by_zero_yields_zero() {
        assert_eq!(eval("x 0 /", &[5.0]), 0.0);
    }

    #[test]
    fn test_edge_mask_saturates_above_knee() {
        let expr = Expression::parse(EDGE_MASK_EXPR, 2).unwrap();
        let mut stack = Vec::new();
        assert_eq!(expr.evaluate_u8(&[200.0, 100.0], &mut stack), 255);
        assert_eq!(expr.evaluate_u8(&[255.0, 0.0], &mut stack), 255);
    }

    #[test]
    fn test_edge_mask_zero_for_flat_area() {
        let expr = Expression::parse(EDGE_MASK_EXPR, 2).unwrap();
        assert_eq!(expr.evaluate_u8(&[80.0, 80.0], &mut Vec::new()), 0);
    }

    #[test]
    fn test_edge_mask_linear_ramp() {
        let expr = Expression::parse(EDGE_MASK_EXPR, 2).unwrap();
        let mut stack = Vec::new();
        assert_eq!(expr.evaluate_u8(&[18.0, 0.0], &mut stack), 51);
        assert_eq!(expr.evaluate_u8(&[90.0, 0.0], &mut stack), 255);
        let mid = expr.evaluate_u8(&[45.0, 0.0], &mut stack);
        assert!((127..=128).contains(&mid), "got {mid}");
    }

    #[test]
    fn test_evaluate_u8_clamps() {
        let expr = Expression::parse("x 100 +", 1).unwrap();
        assert_eq!(expr.evaluate_u8(&[200.0], &mut Vec::new()), 255);
        let expr = Expression::parse("x 100 -", 1).unwrap();
        assert_eq!(expr.evaluate_u8(&[50.0], &mut Vec::new()), 0);
    }

    #[rstest]
    #[case::empty("")]
    #[case::underflow("x +")]
    #[case::leftover("x y")]
    #[case::unknown_token("x foo +")]
    #[case::missing_clip("x z +")]
    fn test_parse_errors(#[case] source: &str) {
        assert!(matches!(
            Expression::parse(source, 2),
            Err(FilterError::Expression { .. })
        ));
    }
}
