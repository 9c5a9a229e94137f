//! Tree IR node types.
//!
//! A function body is a statement tree over labels, jumps and moves between
//! typed expression trees. Every expression carries a scalar base and an
//! element count (1 for scalars, N for vectors, rows x columns for
//! matrices), so operand compatibility can be checked without consulting
//! the AST datatypes.

use crate::semantic::datatype::Datatype;
use crate::semantic::scope::SymbolIndex;
use crate::utils::location::SourcePos;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element type of an IR value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarBase {
    /// No value (void calls, aggregates)
    None,
    Bool,
    Int,
    Uint,
    Half,
    Float,
    Double,
}

impl ScalarBase {
    /// The element type of a scalar, vector or matrix datatype. Normalised
    /// floats lower to `Float`; everything else has no scalar base.
    pub fn of(datatype: &Datatype) -> ScalarBase {
        match datatype {
            Datatype::Vector { base, .. } | Datatype::Matrix { base, .. } => ScalarBase::of(base),
            Datatype::Bool => ScalarBase::Bool,
            Datatype::Int => ScalarBase::Int,
            Datatype::Uint => ScalarBase::Uint,
            Datatype::Half => ScalarBase::Half,
            Datatype::Float | Datatype::FloatSnorm | Datatype::FloatUnorm => ScalarBase::Float,
            Datatype::Double => ScalarBase::Double,
            _ => ScalarBase::None,
        }
    }

    pub fn is_floating(self) -> bool {
        matches!(self, ScalarBase::Half | ScalarBase::Float | ScalarBase::Double)
    }

    pub fn name(self) -> &'static str {
        match self {
            ScalarBase::None => "void",
            ScalarBase::Bool => "bool",
            ScalarBase::Int => "int",
            ScalarBase::Uint => "uint",
            ScalarBase::Half => "half",
            ScalarBase::Float => "float",
            ScalarBase::Double => "double",
        }
    }
}

impl fmt::Display for ScalarBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One element of a constant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum IrValue {
    Int(i64),
    Float(f64),
}

impl IrValue {
    /// `value` represented the way `base` stores it.
    pub fn of(base: ScalarBase, value: i64) -> IrValue {
        if base.is_floating() {
            IrValue::Float(value as f64)
        } else {
            IrValue::Int(value)
        }
    }
}

impl fmt::Display for IrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrValue::Int(v) => write!(f, "{}", v),
            IrValue::Float(v) => write!(f, "{:?}", v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IrBinop {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    LShift,
    RShift,
    And,
    Or,
    Xor,
}

impl IrBinop {
    pub fn symbol(self) -> &'static str {
        match self {
            IrBinop::Add => "+",
            IrBinop::Sub => "-",
            IrBinop::Mul => "*",
            IrBinop::Div => "/",
            IrBinop::Mod => "%",
            IrBinop::LShift => "<<",
            IrBinop::RShift => ">>",
            IrBinop::And => "&",
            IrBinop::Or => "|",
            IrBinop::Xor => "^",
        }
    }
}

/// Relation tested by a conditional jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IrCond {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl IrCond {
    pub fn symbol(self) -> &'static str {
        match self {
            IrCond::Eq => "==",
            IrCond::Ne => "!=",
            IrCond::Lt => "<",
            IrCond::Gt => ">",
            IrCond::Le => "<=",
            IrCond::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrExpr {
    pub kind: IrExprKind,
    pub base: ScalarBase,
    pub elements: u32,
    pub pos: SourcePos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IrExprKind {
    /// One value per element
    Constant(Vec<IrValue>),
    /// Function-local storage slot
    Temp(u32),
    /// Global storage slot
    Memory(u32),
    Binop {
        op: IrBinop,
        left: Box<IrExpr>,
        right: Box<IrExpr>,
    },
    /// Element-wise conversion to the node's base
    Convert(Box<IrExpr>),
    /// Vector/matrix built from the concatenated elements of the parts
    Construct(Vec<IrExpr>),
    Call {
        index: SymbolIndex,
        args: Vec<IrExpr>,
    },
    Swizzle {
        base: Box<IrExpr>,
        components: Vec<u8>,
    },
    Array {
        array: Box<IrExpr>,
        index: Box<IrExpr>,
    },
    /// Run `stmt`, then yield `expr`
    Eseq {
        stmt: Box<IrStmt>,
        expr: Box<IrExpr>,
    },
}

impl IrExpr {
    pub fn new(kind: IrExprKind, base: ScalarBase, elements: u32, pos: SourcePos) -> Self {
        Self { kind, base, elements, pos }
    }

    /// `value` replicated into every element.
    pub fn constant(value: i64, base: ScalarBase, elements: u32, pos: SourcePos) -> Self {
        let values = vec![IrValue::of(base, value); elements.max(1) as usize];
        Self::new(IrExprKind::Constant(values), base, elements, pos)
    }

    pub fn temp(slot: u32, base: ScalarBase, elements: u32, pos: SourcePos) -> Self {
        Self::new(IrExprKind::Temp(slot), base, elements, pos)
    }

    pub fn binop(op: IrBinop, left: IrExpr, right: IrExpr) -> Self {
        debug_assert_eq!(left.base, right.base, "binop {:?} on mismatched bases", op);
        debug_assert_eq!(left.elements, right.elements, "binop {:?} on mismatched shapes", op);
        let (base, elements, pos) = (left.base, left.elements, left.pos.clone());
        Self::new(
            IrExprKind::Binop { op, left: Box::new(left), right: Box::new(right) },
            base,
            elements,
            pos,
        )
    }

    pub fn eseq(stmt: IrStmt, expr: IrExpr) -> Self {
        let (base, elements, pos) = (expr.base, expr.elements, expr.pos.clone());
        Self::new(
            IrExprKind::Eseq { stmt: Box::new(stmt), expr: Box::new(expr) },
            base,
            elements,
            pos,
        )
    }

    /// Wrap in a conversion to `base` unless already of that base.
    pub fn convert(self, base: ScalarBase) -> Self {
        if self.base == base {
            return self;
        }
        let (elements, pos) = (self.elements, self.pos.clone());
        Self::new(IrExprKind::Convert(Box::new(self)), base, elements, pos)
    }

    pub fn is_storage(&self) -> bool {
        matches!(self.kind, IrExprKind::Temp(_) | IrExprKind::Memory(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IrStmt {
    Label(u32),
    Jump(u32),
    CJump {
        cond: IrCond,
        left: IrExpr,
        right: IrExpr,
        iftrue: u32,
        iffalse: u32,
    },
    Move {
        dst: IrExpr,
        src: IrExpr,
    },
    /// Evaluate for side effects
    Expr(IrExpr),
    Seq(Vec<IrStmt>),
    Discard,
}

impl IrStmt {
    pub fn moves(dst: IrExpr, src: IrExpr) -> Self {
        debug_assert_eq!(dst.base, src.base, "move between mismatched bases");
        debug_assert_eq!(dst.elements, src.elements, "move between mismatched shapes");
        IrStmt::Move { dst, src }
    }

    pub fn cjump(cond: IrCond, left: IrExpr, right: IrExpr, iftrue: u32, iffalse: u32) -> Self {
        IrStmt::CJump { cond, left, right, iftrue, iffalse }
    }

    /// Depth-first, pre-order walk over every statement in the tree,
    /// including statements nested in `Eseq` expressions.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a IrStmt)) {
        visit(self);
        match self {
            IrStmt::Seq(stmts) => stmts.iter().for_each(|s| s.walk(visit)),
            IrStmt::CJump { left, right, .. } => {
                left.walk_stmts(visit);
                right.walk_stmts(visit);
            }
            IrStmt::Move { dst, src } => {
                dst.walk_stmts(visit);
                src.walk_stmts(visit);
            }
            IrStmt::Expr(expr) => expr.walk_stmts(visit),
            IrStmt::Label(_) | IrStmt::Jump(_) | IrStmt::Discard => {}
        }
    }

    /// The top-level statement sequence with nested `Seq`s spliced in.
    pub fn flatten(&self) -> Vec<&IrStmt> {
        let mut out = Vec::new();
        let mut pending = vec![self];
        while let Some(stmt) = pending.pop() {
            match stmt {
                IrStmt::Seq(stmts) => pending.extend(stmts.iter().rev()),
                other => out.push(other),
            }
        }
        out
    }
}

impl IrExpr {
    fn walk_stmts<'a>(&'a self, visit: &mut dyn FnMut(&'a IrStmt)) {
        match &self.kind {
            IrExprKind::Eseq { stmt, expr } => {
                stmt.walk(visit);
                expr.walk_stmts(visit);
            }
            IrExprKind::Binop { left, right, .. } => {
                left.walk_stmts(visit);
                right.walk_stmts(visit);
            }
            IrExprKind::Array { array, index } => {
                array.walk_stmts(visit);
                index.walk_stmts(visit);
            }
            IrExprKind::Convert(inner) | IrExprKind::Swizzle { base: inner, .. } => inner.walk_stmts(visit),
            IrExprKind::Construct(parts) | IrExprKind::Call { args: parts, .. } => {
                parts.iter().for_each(|p| p.walk_stmts(visit))
            }
            IrExprKind::Constant(_) | IrExprKind::Temp(_) | IrExprKind::Memory(_) => {}
        }
    }
}

/// The lowered body of one user function.
#[derive(Debug, Clone, PartialEq)]
pub struct IrFunction {
    pub name: String,
    pub index: SymbolIndex,
    /// `Seq[Label(start_label), body, Label(end_label)]`
    pub body: IrStmt,
    /// Temp receiving the return value; `None` for `void`
    pub return_temp: Option<u32>,
    pub start_label: u32,
    pub end_label: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::datatype::{matrix_of, vector_of, Primitives};

    fn pos() -> SourcePos {
        SourcePos::builtin()
    }

    #[test]
    fn test_scalar_base_of_datatypes() {
        let p = Primitives::new();
        assert_eq!(ScalarBase::of(&vector_of(&p.half, 3)), ScalarBase::Half);
        assert_eq!(ScalarBase::of(&matrix_of(&p.float_snorm, 2, 2)), ScalarBase::Float);
        assert_eq!(ScalarBase::of(&p.string), ScalarBase::None);
    }

    #[test]
    fn test_constant_replicates_every_element() {
        let c = IrExpr::constant(-1, ScalarBase::Float, 4, pos());
        assert_eq!(c.kind, IrExprKind::Constant(vec![IrValue::Float(-1.0); 4]));
        let i = IrExpr::constant(1, ScalarBase::Int, 1, pos());
        assert_eq!(i.kind, IrExprKind::Constant(vec![IrValue::Int(1)]));
    }

    #[test]
    fn test_convert_skips_same_base() {
        let t = IrExpr::temp(1, ScalarBase::Int, 2, pos());
        assert_eq!(t.clone().convert(ScalarBase::Int), t);
        let f = t.convert(ScalarBase::Float);
        assert_eq!(f.base, ScalarBase::Float);
        assert_eq!(f.elements, 2);
        assert!(matches!(f.kind, IrExprKind::Convert(_)));
    }

    #[test]
    fn test_flatten_and_walk() {
        let inner = IrStmt::Seq(vec![IrStmt::Label(1), IrStmt::Jump(2)]);
        let tmp = IrExpr::temp(1, ScalarBase::Int, 1, pos());
        let eseq = IrExpr::eseq(IrStmt::Label(9), tmp.clone());
        let tree = IrStmt::Seq(vec![IrStmt::Label(0), inner, IrStmt::moves(tmp, eseq)]);

        let flat = tree.flatten();
        assert_eq!(flat.len(), 4);
        assert_eq!(*flat[1], IrStmt::Label(1));

        let mut labels = Vec::new();
        tree.walk(&mut |s| {
            if let IrStmt::Label(l) = s {
                labels.push(*l);
            }
        });
        assert_eq!(labels, vec![0, 1, 9]);
    }
}
