//! Compile-time constant folding.
//!
//! Only used where the language demands a constant: array dimensions and
//! `case` labels. Works on the unanalysed AST, so it needs no datatypes.
//! Integer arithmetic wraps like the host's 64-bit integers; float
//! arithmetic is IEEE double. Comparisons and logical operators collapse to
//! the integers 0 and 1.

use crate::frontend::ast::{Expr, ExprKind, Operator};
use crate::semantic::datatype::Datatype;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue {
    Int(i64),
    Float(f64),
}

impl ConstValue {
    pub fn as_f64(self) -> f64 {
        match self {
            ConstValue::Int(v) => v as f64,
            ConstValue::Float(v) => v,
        }
    }

    fn is_truthy(self) -> bool {
        match self {
            ConstValue::Int(v) => v != 0,
            ConstValue::Float(v) => v != 0.0,
        }
    }

    fn from_bool(b: bool) -> Self {
        ConstValue::Int(b as i64)
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Int(v) => write!(f, "{}", v),
            ConstValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Fold `expr` to a constant, or `None` if it is not one.
pub fn evaluate(expr: &Expr) -> Option<ConstValue> {
    match &expr.kind {
        ExprKind::IntLiteral(v) => Some(ConstValue::Int(*v)),
        ExprKind::UintLiteral(v) => Some(ConstValue::Int(*v as i64)),
        ExprKind::FloatLiteral(v) => Some(ConstValue::Float(*v)),
        ExprKind::BoolLiteral(b) => Some(ConstValue::from_bool(*b)),
        ExprKind::Unary { op, operand } => evaluate_unary(*op, evaluate(operand)?),
        ExprKind::Binary { op, left, right } => {
            if op.is_assignment() {
                return None;
            }
            let l = evaluate(left)?;
            let r = evaluate(right)?;
            evaluate_binary(*op, l, r)
        }
        ExprKind::Ternary { cond, left, right, .. } => {
            if evaluate(cond)?.is_truthy() {
                evaluate(left)
            } else {
                evaluate(right)
            }
        }
        ExprKind::Cast { target, operand, .. } => {
            let value = evaluate(operand)?;
            convert(target, value)
        }
        _ => None,
    }
}

fn convert(target: &Datatype, value: ConstValue) -> Option<ConstValue> {
    match target {
        Datatype::Int | Datatype::Uint => Some(ConstValue::Int(match value {
            ConstValue::Int(v) => v,
            ConstValue::Float(v) => v as i64,
        })),
        Datatype::Bool => Some(ConstValue::from_bool(value.is_truthy())),
        Datatype::Half
        | Datatype::Float
        | Datatype::FloatSnorm
        | Datatype::FloatUnorm
        | Datatype::Double => Some(ConstValue::Float(value.as_f64())),
        // typedef'd or composite targets are not resolved here
        _ => None,
    }
}

fn evaluate_unary(op: Operator, value: ConstValue) -> Option<ConstValue> {
    match (op, value) {
        (Operator::Negate, ConstValue::Int(v)) => Some(ConstValue::Int(v.wrapping_neg())),
        (Operator::Negate, ConstValue::Float(v)) => Some(ConstValue::Float(-v)),
        (Operator::Complement, ConstValue::Int(v)) => Some(ConstValue::Int(!v)),
        (Operator::Not, v) => Some(ConstValue::from_bool(!v.is_truthy())),
        _ => None,
    }
}

fn evaluate_binary(op: Operator, l: ConstValue, r: ConstValue) -> Option<ConstValue> {
    use Operator::*;

    match op {
        Comma => return Some(r),
        LogicalAnd => return Some(ConstValue::from_bool(l.is_truthy() && r.is_truthy())),
        LogicalOr => return Some(ConstValue::from_bool(l.is_truthy() || r.is_truthy())),
        _ => {}
    }

    if let (ConstValue::Int(a), ConstValue::Int(b)) = (l, r) {
        let value = match op {
            Multiply => a.wrapping_mul(b),
            Divide => a.checked_div(b)?,
            Modulo => a.checked_rem(b)?,
            Add => a.wrapping_add(b),
            Subtract => a.wrapping_sub(b),
            LShift => a.wrapping_shl(b as u32),
            RShift => a.wrapping_shr(b as u32),
            BinaryAnd => a & b,
            BinaryXor => a ^ b,
            BinaryOr => a | b,
            LessThan => (a < b) as i64,
            GreaterThan => (a > b) as i64,
            LessThanOrEqual => (a <= b) as i64,
            GreaterThanOrEqual => (a >= b) as i64,
            Equal => (a == b) as i64,
            NotEqual => (a != b) as i64,
            _ => return None,
        };
        return Some(ConstValue::Int(value));
    }

    let (a, b) = (l.as_f64(), r.as_f64());
    Some(match op {
        Multiply => ConstValue::Float(a * b),
        Divide => ConstValue::Float(a / b),
        Modulo => ConstValue::Float(a % b),
        Add => ConstValue::Float(a + b),
        Subtract => ConstValue::Float(a - b),
        LessThan => ConstValue::from_bool(a < b),
        GreaterThan => ConstValue::from_bool(a > b),
        LessThanOrEqual => ConstValue::from_bool(a <= b),
        GreaterThanOrEqual => ConstValue::from_bool(a >= b),
        Equal => ConstValue::from_bool(a == b),
        NotEqual => ConstValue::from_bool(a != b),
        // bitwise operators are integer-only
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::location::SourcePos;

    fn pos() -> SourcePos {
        SourcePos::builtin()
    }

    fn int(v: i64) -> Expr {
        Expr::int_lit(v, pos())
    }

    fn binary(op: Operator, left: Expr, right: Expr) -> Expr {
        Expr::new(ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) }, pos())
    }

    #[test]
    fn test_integer_arithmetic() {
        let expr = binary(Operator::Add, int(2), binary(Operator::Multiply, int(3), int(4)));
        assert_eq!(evaluate(&expr), Some(ConstValue::Int(14)));
        assert_eq!(evaluate(&binary(Operator::LShift, int(1), int(4))), Some(ConstValue::Int(16)));
        assert_eq!(
            evaluate(&binary(Operator::Add, int(i64::MAX), int(1))),
            Some(ConstValue::Int(i64::MIN))
        );
    }

    #[test]
    fn test_division_by_zero_is_not_constant() {
        assert_eq!(evaluate(&binary(Operator::Divide, int(1), int(0))), None);
        assert_eq!(evaluate(&binary(Operator::Modulo, int(1), int(0))), None);
    }

    #[test]
    fn test_mixed_operands_widen_to_float() {
        let expr = binary(Operator::Multiply, int(2), Expr::float_lit(1.5, pos()));
        assert_eq!(evaluate(&expr), Some(ConstValue::Float(3.0)));
        let cmp = binary(Operator::LessThan, int(2), Expr::float_lit(2.5, pos()));
        assert_eq!(evaluate(&cmp), Some(ConstValue::Int(1)));
    }

    #[test]
    fn test_unary_and_ternary() {
        let neg = Expr::new(ExprKind::Unary { op: Operator::Negate, operand: Box::new(int(1)) }, pos());
        assert_eq!(evaluate(&neg), Some(ConstValue::Int(-1)));
        let not = Expr::new(ExprKind::Unary { op: Operator::Not, operand: Box::new(int(0)) }, pos());
        assert_eq!(evaluate(&not), Some(ConstValue::Int(1)));
        let ternary = Expr::new(
            ExprKind::Ternary {
                op: Operator::Conditional,
                cond: Box::new(int(0)),
                left: Box::new(int(10)),
                right: Box::new(int(20)),
            },
            pos(),
        );
        assert_eq!(evaluate(&ternary), Some(ConstValue::Int(20)));
    }

    #[test]
    fn test_non_constants() {
        let mut strings = crate::utils::intern::StringCache::new();
        let n = strings.intern("n");
        assert_eq!(evaluate(&Expr::ident(n, pos())), None);
        assert_eq!(evaluate(&binary(Operator::Assign, int(1), int(2))), None);
        assert_eq!(evaluate(&binary(Operator::BinaryAnd, Expr::float_lit(1.0, pos()), int(1))), None);
    }
}
