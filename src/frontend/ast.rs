//! Abstract Syntax Tree (AST) for the shading language.
//!
//! The AST preserves the source structure: compilation units at the top,
//! statements and expressions below. Every node carries the logical
//! `(file, line)` it was parsed from. Expressions additionally carry a
//! `datatype` slot that is `None` until semantic analysis fills it in; the
//! analyzer also rewrites the tree in place (implicit casts, swizzle
//! fallbacks, resolved symbol indices).

use crate::semantic::datatype::DatatypeRef;
use crate::semantic::scope::SymbolIndex;
use crate::utils::intern::Symbol;
use crate::utils::location::SourcePos;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::mem;

/// A parsed translation unit.
#[derive(Debug, Default)]
pub struct Program {
    /// Top-level declarations in source order
    pub units: Vec<CompilationUnit>,
}

impl Program {
    pub fn new() -> Self {
        Self { units: Vec::new() }
    }

    /// Iterate over function units (prototypes and definitions).
    pub fn functions(&self) -> impl Iterator<Item = &FunctionUnit> {
        self.units.iter().filter_map(|unit| match &unit.kind {
            UnitKind::Function(func) => Some(func),
            _ => None,
        })
    }

    /// Find the first function defined with a body under `name`.
    pub fn find_function(&self, name: Symbol) -> Option<&FunctionUnit> {
        self.functions().find(|f| f.signature.name == name && f.body.is_some())
    }
}

/// A top-level declaration.
#[derive(Debug)]
pub struct CompilationUnit {
    pub kind: UnitKind,
    pub pos: SourcePos,
}

#[derive(Debug)]
pub enum UnitKind {
    Function(FunctionUnit),
    Typedef(Typedef),
    Variables(VarDeclGroup),
    Struct(StructDeclaration),
}

/// A function prototype or definition.
#[derive(Debug)]
pub struct FunctionUnit {
    pub signature: FunctionSignature,
    /// `None` for a forward declaration
    pub body: Option<Box<Stmt>>,
    /// Assigned by analysis
    pub index: SymbolIndex,
    /// Number of local slots the body uses, assigned by analysis
    pub local_slots: u32,
    /// The function's signature datatype, assigned by analysis
    pub datatype: Option<DatatypeRef>,
}

#[derive(Debug)]
pub struct FunctionSignature {
    pub name: Symbol,
    /// `None` for `void`
    pub return_type: Option<DatatypeRef>,
    pub params: Vec<Parameter>,
    /// Output semantic, as in `float4 main() : SV_POSITION`
    pub semantic: Option<Symbol>,
    pub inline: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputModifier {
    None,
    In,
    Out,
    InOut,
    Uniform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interpolation {
    None,
    Linear,
    Centroid,
    NoInterpolation,
    NoPerspective,
}

#[derive(Debug)]
pub struct Parameter {
    pub name: Symbol,
    pub datatype: DatatypeRef,
    pub array: Option<ArraySize>,
    pub modifier: InputModifier,
    pub interpolation: Interpolation,
    pub semantic: Option<Symbol>,
    pub pos: SourcePos,
}

/// An array suffix on a declarator.
#[derive(Debug)]
pub enum ArraySize {
    /// `x[]`
    Unsized,
    /// `x[expr]`, folded to a constant during analysis
    Sized(Box<Expr>),
}

#[derive(Debug)]
pub struct Typedef {
    pub name: Symbol,
    pub is_const: bool,
    pub base: DatatypeRef,
    pub array: Option<ArraySize>,
    /// Resolved type, assigned by analysis
    pub datatype: Option<DatatypeRef>,
}

/// Storage and layout qualifiers on a variable declaration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageFlags {
    pub is_const: bool,
    pub is_static: bool,
    pub is_uniform: bool,
    pub is_extern: bool,
    pub is_volatile: bool,
    pub is_shared: bool,
    pub is_groupshared: bool,
    pub row_major: bool,
    pub column_major: bool,
}

/// `static const float a = 1, b[2];`
#[derive(Debug)]
pub struct VarDeclGroup {
    pub storage: StorageFlags,
    pub base: DatatypeRef,
    pub decls: Vec<VarDeclaration>,
}

#[derive(Debug)]
pub struct VarDeclaration {
    pub name: Symbol,
    pub array: Option<ArraySize>,
    pub semantic: Option<Symbol>,
    pub initializer: Option<Expr>,
    pub pos: SourcePos,
    /// Assigned by analysis
    pub datatype: Option<DatatypeRef>,
    /// Assigned by analysis
    pub index: SymbolIndex,
}

#[derive(Debug)]
pub struct StructDeclaration {
    pub name: Symbol,
    pub members: Vec<StructMemberDecl>,
    /// Variables declared after the closing brace: `struct S { ... } s;`
    pub variables: Option<VarDeclGroup>,
    /// Assigned by analysis
    pub datatype: Option<DatatypeRef>,
}

#[derive(Debug)]
pub struct StructMemberDecl {
    pub name: Symbol,
    pub base: DatatypeRef,
    pub array: Option<ArraySize>,
    pub interpolation: Interpolation,
    pub semantic: Option<Symbol>,
    pub pos: SourcePos,
}

/// A statement.
#[derive(Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub pos: SourcePos,
    /// `[unroll]`, `[branch]`, ... recorded, not interpreted
    pub attributes: Vec<Symbol>,
}

impl Stmt {
    pub fn new(kind: StmtKind, pos: SourcePos) -> Self {
        Self { kind, pos, attributes: Vec::new() }
    }
}

#[derive(Debug, Default)]
pub enum StmtKind {
    #[default]
    Empty,
    Break,
    Continue,
    Discard,
    Block(Vec<Stmt>),
    Expression(Expr),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    Switch {
        cond: Expr,
        cases: Vec<SwitchCase>,
    },
    For {
        /// A declaration or expression statement
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
    },
    Do {
        body: Box<Stmt>,
        cond: Expr,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    Typedef(Typedef),
    VarDecl(VarDeclGroup),
    Struct(StructDeclaration),
}

/// `case value:` or `default:` followed by its statements.
#[derive(Debug)]
pub struct SwitchCase {
    /// `None` for `default`
    pub value: Option<Expr>,
    pub body: Vec<Stmt>,
    pub pos: SourcePos,
}

// Statement trees can be arbitrarily deep (`{{{{...}}}}`, long `else if`
// chains), so teardown detaches child statements onto a work list instead
// of recursing through the generated drop glue.
impl Drop for Stmt {
    fn drop(&mut self) {
        let mut pending = vec![mem::take(&mut self.kind)];
        while let Some(kind) = pending.pop() {
            match kind {
                StmtKind::Block(mut stmts) => {
                    pending.extend(stmts.iter_mut().map(|s| mem::take(&mut s.kind)));
                }
                StmtKind::If { mut then_branch, else_branch, .. } => {
                    pending.push(mem::take(&mut then_branch.kind));
                    if let Some(mut else_branch) = else_branch {
                        pending.push(mem::take(&mut else_branch.kind));
                    }
                }
                StmtKind::Switch { mut cases, .. } => {
                    for case in cases.iter_mut() {
                        pending.extend(case.body.iter_mut().map(|s| mem::take(&mut s.kind)));
                    }
                }
                StmtKind::For { init, mut body, .. } => {
                    if let Some(mut init) = init {
                        pending.push(mem::take(&mut init.kind));
                    }
                    pending.push(mem::take(&mut body.kind));
                }
                StmtKind::Do { mut body, .. } | StmtKind::While { mut body, .. } => {
                    pending.push(mem::take(&mut body.kind));
                }
                _ => {}
            }
        }
    }
}

/// Operators, partitioned into contiguous unary, binary and ternary ranges.
///
/// The analyzer and the IR builder dispatch on the range rather than on
/// every operator, so new operators must be added inside their range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Operator {
    // Unary
    PreIncrement,
    PreDecrement,
    Negate,
    Complement,
    Not,
    PostIncrement,
    PostDecrement,

    // Binary
    Comma,
    Multiply,
    Divide,
    Modulo,
    Add,
    Subtract,
    LShift,
    RShift,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Equal,
    NotEqual,
    BinaryAnd,
    BinaryXor,
    BinaryOr,
    LogicalAnd,
    LogicalOr,
    Assign,
    MulAssign,
    DivAssign,
    ModAssign,
    AddAssign,
    SubAssign,
    LShiftAssign,
    RShiftAssign,
    AndAssign,
    XorAssign,
    OrAssign,

    // Ternary
    Conditional,
}

impl Operator {
    const UNARY_FIRST: u8 = Operator::PreIncrement as u8;
    const UNARY_LAST: u8 = Operator::PostDecrement as u8;
    const BINARY_FIRST: u8 = Operator::Comma as u8;
    const BINARY_LAST: u8 = Operator::OrAssign as u8;
    const TERNARY_FIRST: u8 = Operator::Conditional as u8;
    const TERNARY_LAST: u8 = Operator::Conditional as u8;

    pub fn is_unary(self) -> bool {
        (Self::UNARY_FIRST..=Self::UNARY_LAST).contains(&(self as u8))
    }

    pub fn is_binary(self) -> bool {
        (Self::BINARY_FIRST..=Self::BINARY_LAST).contains(&(self as u8))
    }

    pub fn is_ternary(self) -> bool {
        (Self::TERNARY_FIRST..=Self::TERNARY_LAST).contains(&(self as u8))
    }

    pub fn is_assignment(self) -> bool {
        (Operator::Assign as u8..=Operator::OrAssign as u8).contains(&(self as u8))
    }

    pub fn is_comparison(self) -> bool {
        (Operator::LessThan as u8..=Operator::NotEqual as u8).contains(&(self as u8))
    }

    /// For a compound assignment, the arithmetic operator it applies.
    pub fn compound_base(self) -> Option<Operator> {
        use Operator::*;
        Some(match self {
            MulAssign => Multiply,
            DivAssign => Divide,
            ModAssign => Modulo,
            AddAssign => Add,
            SubAssign => Subtract,
            LShiftAssign => LShift,
            RShiftAssign => RShift,
            AndAssign => BinaryAnd,
            XorAssign => BinaryXor,
            OrAssign => BinaryOr,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        use Operator::*;
        match self {
            PreIncrement | PostIncrement => "++",
            PreDecrement | PostDecrement => "--",
            Negate => "-",
            Complement => "~",
            Not => "!",
            Comma => ",",
            Multiply => "*",
            Divide => "/",
            Modulo => "%",
            Add => "+",
            Subtract => "-",
            LShift => "<<",
            RShift => ">>",
            LessThan => "<",
            GreaterThan => ">",
            LessThanOrEqual => "<=",
            GreaterThanOrEqual => ">=",
            Equal => "==",
            NotEqual => "!=",
            BinaryAnd => "&",
            BinaryXor => "^",
            BinaryOr => "|",
            LogicalAnd => "&&",
            LogicalOr => "||",
            Assign => "=",
            MulAssign => "*=",
            DivAssign => "/=",
            ModAssign => "%=",
            AddAssign => "+=",
            SubAssign => "-=",
            LShiftAssign => "<<=",
            RShiftAssign => ">>=",
            AndAssign => "&=",
            XorAssign => "^=",
            OrAssign => "|=",
            Conditional => "?:",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// An expression.
#[derive(Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: SourcePos,
    /// Filled in during semantic analysis
    pub datatype: Option<DatatypeRef>,
}

impl Expr {
    pub fn new(kind: ExprKind, pos: SourcePos) -> Self {
        Self { kind, pos, datatype: None }
    }

    pub fn int_lit(value: i64, pos: SourcePos) -> Self {
        Self::new(ExprKind::IntLiteral(value), pos)
    }

    pub fn float_lit(value: f64, pos: SourcePos) -> Self {
        Self::new(ExprKind::FloatLiteral(value), pos)
    }

    pub fn ident(name: Symbol, pos: SourcePos) -> Self {
        Self::new(ExprKind::Identifier { name, index: SymbolIndex::None }, pos)
    }

    /// The analysed datatype; `None` before analysis.
    pub fn datatype(&self) -> Option<&DatatypeRef> {
        self.datatype.as_ref()
    }
}

#[derive(Debug)]
pub enum ExprKind {
    Identifier {
        name: Symbol,
        index: SymbolIndex,
    },
    IntLiteral(i64),
    UintLiteral(u64),
    FloatLiteral(f64),
    BoolLiteral(bool),
    StringLiteral(Symbol),
    Unary {
        op: Operator,
        operand: Box<Expr>,
    },
    Binary {
        op: Operator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Ternary {
        op: Operator,
        cond: Box<Expr>,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `a[i]`
    DerefArray {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    /// `a.b`; the analyzer decides between a struct member and a swizzle
    DerefStruct {
        base: Box<Expr>,
        member: Symbol,
        is_swizzle: bool,
        /// Positional member index, or the packed swizzle components
        member_index: usize,
    },
    Call {
        name: Symbol,
        args: Vec<Expr>,
        /// Resolved overload
        index: SymbolIndex,
        signature: Option<DatatypeRef>,
    },
    /// `float4(...)`
    Constructor {
        target: DatatypeRef,
        args: Vec<Expr>,
    },
    /// `(float)x`; `implicit` marks casts inserted by the analyzer
    Cast {
        target: DatatypeRef,
        operand: Box<Expr>,
        implicit: bool,
    },
}

impl ExprKind {
    /// Whether this node may appear on the left of an assignment.
    pub fn is_lvalue(&self) -> bool {
        match self {
            ExprKind::Identifier { .. } => true,
            ExprKind::DerefArray { array, .. } => array.kind.is_lvalue(),
            ExprKind::DerefStruct { base, .. } => base.kind.is_lvalue(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> SourcePos {
        SourcePos::builtin()
    }

    #[test]
    fn test_operator_ranges() {
        assert!(Operator::PreIncrement.is_unary());
        assert!(Operator::PostDecrement.is_unary());
        assert!(!Operator::Comma.is_unary());
        assert!(Operator::Comma.is_binary());
        assert!(Operator::OrAssign.is_binary());
        assert!(Operator::LogicalOr.is_binary());
        assert!(!Operator::Conditional.is_binary());
        assert!(Operator::Conditional.is_ternary());
        assert!(Operator::AddAssign.is_assignment());
        assert!(!Operator::Add.is_assignment());
        assert!(Operator::NotEqual.is_comparison());
        assert_eq!(Operator::AddAssign.compound_base(), Some(Operator::Add));
        assert_eq!(Operator::Assign.compound_base(), None);
    }

    #[test]
    fn test_drop_long_statement_list() {
        let stmts: Vec<Stmt> = (0..10_000)
            .map(|i| Stmt::new(StmtKind::Expression(Expr::int_lit(i, pos())), pos()))
            .collect();
        let block = Stmt::new(StmtKind::Block(stmts), pos());
        drop(block);
    }

    #[test]
    fn test_drop_deeply_nested_blocks() {
        let mut stmt = Stmt::new(StmtKind::Break, pos());
        for _ in 0..100_000 {
            stmt = Stmt::new(StmtKind::Block(vec![stmt]), pos());
        }
        drop(stmt);

        let mut chain = Stmt::new(StmtKind::Empty, pos());
        for _ in 0..100_000 {
            chain = Stmt::new(
                StmtKind::If {
                    cond: Expr::new(ExprKind::BoolLiteral(true), pos()),
                    then_branch: Box::new(Stmt::new(StmtKind::Empty, pos())),
                    else_branch: Some(Box::new(chain)),
                },
                pos(),
            );
        }
        drop(chain);
    }

    #[test]
    fn test_lvalue() {
        let mut strings = crate::utils::intern::StringCache::new();
        let a = strings.intern("a");
        let x = strings.intern("x");
        let ident = Expr::ident(a, pos());
        assert!(ident.kind.is_lvalue());
        let member = ExprKind::DerefStruct {
            base: Box::new(Expr::ident(a, pos())),
            member: x,
            is_swizzle: false,
            member_index: 0,
        };
        assert!(member.is_lvalue());
        assert!(!ExprKind::IntLiteral(1).is_lvalue());
    }
}
