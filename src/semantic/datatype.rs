//! The datatype algebra.
//!
//! Datatypes are immutable and shared through [`DatatypeRef`]. The canonical
//! scalar instances live in [`Primitives`], owned by the compile context, so
//! two references to `float` obtained from it are pointer-equal; composite
//! types synthesized during analysis (`float3` for a swizzle, the signature of
//! a function) are built on demand and compared structurally.

use crate::frontend::token::{SamplerKeyword, ScalarKeyword};
use crate::utils::intern::{StringCache, Symbol};
use std::fmt;
use std::rc::Rc;

pub type DatatypeRef = Rc<Datatype>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerKind {
    Sampler1D,
    Sampler2D,
    Sampler3D,
    Cube,
    State,
    ComparisonState,
}

impl From<SamplerKeyword> for SamplerKind {
    fn from(kw: SamplerKeyword) -> Self {
        match kw {
            SamplerKeyword::Sampler1D => SamplerKind::Sampler1D,
            SamplerKeyword::Sampler2D => SamplerKind::Sampler2D,
            SamplerKeyword::Sampler3D => SamplerKind::Sampler3D,
            SamplerKeyword::SamplerCube => SamplerKind::Cube,
            SamplerKeyword::State => SamplerKind::State,
            SamplerKeyword::ComparisonState => SamplerKind::ComparisonState,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructMember {
    pub name: Symbol,
    pub datatype: DatatypeRef,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Datatype {
    None,
    Bool,
    Int,
    Uint,
    Half,
    Float,
    FloatSnorm,
    FloatUnorm,
    Double,
    String,
    Sampler(SamplerKind),
    Buffer(DatatypeRef),
    Vector {
        base: DatatypeRef,
        elements: u32,
    },
    Matrix {
        base: DatatypeRef,
        rows: u32,
        columns: u32,
    },
    /// `elements == -1` is an unsized array.
    Array {
        base: DatatypeRef,
        elements: i32,
    },
    /// `name` is only used for display; matching is by members.
    Struct {
        name: Option<Symbol>,
        members: Vec<StructMember>,
    },
    Function {
        retval: Option<DatatypeRef>,
        params: Vec<DatatypeRef>,
        intrinsic: bool,
    },
    /// A user type name. `details == None` is a stub emitted by the parser
    /// before the definition was analysed; reduction looks the name up.
    User {
        name: Symbol,
        details: Option<DatatypeRef>,
    },
}

/// Structural equality.
///
/// `User` aliases never match: callers reduce before comparing.
pub fn datatypes_match(a: &DatatypeRef, b: &DatatypeRef) -> bool {
    if Rc::ptr_eq(a, b) {
        return true;
    }
    use Datatype::*;
    match (&**a, &**b) {
        (None, None) | (Bool, Bool) | (Int, Int) | (Uint, Uint) | (Half, Half)
        | (Float, Float) | (FloatSnorm, FloatSnorm) | (FloatUnorm, FloatUnorm)
        | (Double, Double) | (String, String) => true,
        (Sampler(x), Sampler(y)) => x == y,
        (Buffer(x), Buffer(y)) => datatypes_match(x, y),
        (Vector { base: b1, elements: e1 }, Vector { base: b2, elements: e2 }) => {
            e1 == e2 && datatypes_match(b1, b2)
        }
        (
            Matrix { base: b1, rows: r1, columns: c1 },
            Matrix { base: b2, rows: r2, columns: c2 },
        ) => r1 == r2 && c1 == c2 && datatypes_match(b1, b2),
        (Array { base: b1, elements: e1 }, Array { base: b2, elements: e2 }) => {
            e1 == e2 && datatypes_match(b1, b2)
        }
        (Struct { members: m1, .. }, Struct { members: m2, .. }) => {
            m1.len() == m2.len()
                && m1
                    .iter()
                    .zip(m2)
                    .all(|(x, y)| x.name == y.name && datatypes_match(&x.datatype, &y.datatype))
        }
        (
            Function { retval: r1, params: p1, intrinsic: i1 },
            Function { retval: r2, params: p2, intrinsic: i2 },
        ) => {
            let retvals = match (r1, r2) {
                (Some(x), Some(y)) => datatypes_match(x, y),
                (Option::None, Option::None) => true,
                _ => false,
            };
            i1 == i2
                && retvals
                && p1.len() == p2.len()
                && p1.iter().zip(p2).all(|(x, y)| datatypes_match(x, y))
        }
        _ => false,
    }
}

impl Datatype {
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Datatype::Bool
                | Datatype::Int
                | Datatype::Uint
                | Datatype::Half
                | Datatype::Float
                | Datatype::FloatSnorm
                | Datatype::FloatUnorm
                | Datatype::Double
        )
    }

    /// Float-like for conversion ranking: float, snorm and unorm.
    pub fn is_float(&self) -> bool {
        matches!(self, Datatype::Float | Datatype::FloatSnorm | Datatype::FloatUnorm)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Datatype::Int | Datatype::Uint)
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Datatype::Function { .. })
    }

    /// Size in bytes of a scalar; 0 for anything else.
    pub fn size(&self) -> u32 {
        match self {
            Datatype::Bool => 1,
            Datatype::Half => 2,
            Datatype::Int
            | Datatype::Uint
            | Datatype::Float
            | Datatype::FloatSnorm
            | Datatype::FloatUnorm => 4,
            Datatype::Double => 8,
            _ => 0,
        }
    }

    /// Component count: N for vectors, rows x columns for matrices, else 1.
    pub fn elems(&self) -> u32 {
        match self {
            Datatype::Vector { elements, .. } => *elements,
            Datatype::Matrix { rows, columns, .. } => rows * columns,
            _ => 1,
        }
    }

    pub fn display<'a>(&'a self, strings: &'a StringCache) -> DatatypeDisplay<'a> {
        DatatypeDisplay { datatype: self, strings }
    }
}

/// Unwrap one level of vector, matrix, array or buffer.
pub fn datatype_base(dt: &DatatypeRef) -> DatatypeRef {
    match &**dt {
        Datatype::Vector { base, .. }
        | Datatype::Matrix { base, .. }
        | Datatype::Array { base, .. }
        | Datatype::Buffer(base) => Rc::clone(base),
        _ => Rc::clone(dt),
    }
}

pub fn vector_of(base: &DatatypeRef, elements: u32) -> DatatypeRef {
    Rc::new(Datatype::Vector { base: Rc::clone(base), elements })
}

pub fn matrix_of(base: &DatatypeRef, rows: u32, columns: u32) -> DatatypeRef {
    Rc::new(Datatype::Matrix { base: Rc::clone(base), rows, columns })
}

pub fn array_of(base: &DatatypeRef, elements: i32) -> DatatypeRef {
    Rc::new(Datatype::Array { base: Rc::clone(base), elements })
}

pub fn function_of(retval: Option<DatatypeRef>, params: Vec<DatatypeRef>, intrinsic: bool) -> DatatypeRef {
    Rc::new(Datatype::Function { retval, params, intrinsic })
}

/// Canonical instances of every primitive datatype.
#[derive(Debug, Clone)]
pub struct Primitives {
    pub none: DatatypeRef,
    pub bool_: DatatypeRef,
    pub int: DatatypeRef,
    pub uint: DatatypeRef,
    pub half: DatatypeRef,
    pub float: DatatypeRef,
    pub float_snorm: DatatypeRef,
    pub float_unorm: DatatypeRef,
    pub double: DatatypeRef,
    pub string: DatatypeRef,
    samplers: [DatatypeRef; 6],
}

impl Primitives {
    pub fn new() -> Self {
        let sampler = |kind| Rc::new(Datatype::Sampler(kind));
        Self {
            none: Rc::new(Datatype::None),
            bool_: Rc::new(Datatype::Bool),
            int: Rc::new(Datatype::Int),
            uint: Rc::new(Datatype::Uint),
            half: Rc::new(Datatype::Half),
            float: Rc::new(Datatype::Float),
            float_snorm: Rc::new(Datatype::FloatSnorm),
            float_unorm: Rc::new(Datatype::FloatUnorm),
            double: Rc::new(Datatype::Double),
            string: Rc::new(Datatype::String),
            samplers: [
                sampler(SamplerKind::Sampler1D),
                sampler(SamplerKind::Sampler2D),
                sampler(SamplerKind::Sampler3D),
                sampler(SamplerKind::Cube),
                sampler(SamplerKind::State),
                sampler(SamplerKind::ComparisonState),
            ],
        }
    }

    pub fn scalar(&self, kw: ScalarKeyword) -> DatatypeRef {
        Rc::clone(match kw {
            ScalarKeyword::Bool => &self.bool_,
            ScalarKeyword::Int => &self.int,
            ScalarKeyword::Uint => &self.uint,
            ScalarKeyword::Half => &self.half,
            ScalarKeyword::Float => &self.float,
            ScalarKeyword::Double => &self.double,
        })
    }

    pub fn sampler(&self, kind: SamplerKind) -> DatatypeRef {
        let slot = match kind {
            SamplerKind::Sampler1D => 0,
            SamplerKind::Sampler2D => 1,
            SamplerKind::Sampler3D => 2,
            SamplerKind::Cube => 3,
            SamplerKind::State => 4,
            SamplerKind::ComparisonState => 5,
        };
        Rc::clone(&self.samplers[slot])
    }
}

impl Default for Primitives {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders a datatype the way it would be spelled in source.
pub struct DatatypeDisplay<'a> {
    datatype: &'a Datatype,
    strings: &'a StringCache,
}

impl DatatypeDisplay<'_> {
    fn nested<'b>(&'b self, dt: &'b Datatype) -> DatatypeDisplay<'b> {
        DatatypeDisplay { datatype: dt, strings: self.strings }
    }
}

impl fmt::Display for DatatypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.datatype {
            Datatype::None => write!(f, "void"),
            Datatype::Bool => write!(f, "bool"),
            Datatype::Int => write!(f, "int"),
            Datatype::Uint => write!(f, "uint"),
            Datatype::Half => write!(f, "half"),
            Datatype::Float => write!(f, "float"),
            Datatype::FloatSnorm => write!(f, "snorm float"),
            Datatype::FloatUnorm => write!(f, "unorm float"),
            Datatype::Double => write!(f, "double"),
            Datatype::String => write!(f, "string"),
            Datatype::Sampler(kind) => {
                let name = match kind {
                    SamplerKind::Sampler1D => "sampler1D",
                    SamplerKind::Sampler2D => "sampler2D",
                    SamplerKind::Sampler3D => "sampler3D",
                    SamplerKind::Cube => "samplerCUBE",
                    SamplerKind::State => "SamplerState",
                    SamplerKind::ComparisonState => "SamplerComparisonState",
                };
                write!(f, "{}", name)
            }
            Datatype::Buffer(base) => write!(f, "Buffer<{}>", self.nested(base)),
            Datatype::Vector { base, elements } => write!(f, "{}{}", self.nested(base), elements),
            Datatype::Matrix { base, rows, columns } => {
                write!(f, "{}{}x{}", self.nested(base), rows, columns)
            }
            Datatype::Array { base, elements } => {
                if *elements < 0 {
                    write!(f, "{}[]", self.nested(base))
                } else {
                    write!(f, "{}[{}]", self.nested(base), elements)
                }
            }
            Datatype::Struct { name: Some(name), .. } => {
                write!(f, "struct {}", self.strings.resolve(*name))
            }
            Datatype::Struct { name: None, members } => {
                write!(f, "struct {{ ")?;
                for member in members {
                    write!(
                        f,
                        "{} {}; ",
                        self.nested(&member.datatype),
                        self.strings.resolve(member.name)
                    )?;
                }
                write!(f, "}}")
            }
            Datatype::Function { retval, params, .. } => {
                match retval {
                    Some(dt) => write!(f, "{}", self.nested(dt))?,
                    None => write!(f, "void")?,
                }
                write!(f, " (")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", self.nested(param))?;
                }
                write!(f, ")")
            }
            Datatype::User { name, .. } => write!(f, "{}", self.strings.resolve(*name)),
        }
    }
}
