//! Implicit conversion rules.
//!
//! Two questions are answered here, both on already-reduced datatypes:
//! how well an argument fits a parameter (overload scoring), and which side
//! of a binary operation should be converted to match the other.

use crate::semantic::datatype::{datatype_base, datatypes_match, Datatype, DatatypeRef};
use serde::{Deserialize, Serialize};

/// How well an argument fits a parameter. The discriminant is the score an
/// overload earns for that position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Compatibility {
    Incompatible = 0,
    Downcast = 1,
    Upcast = 2,
    Compatible = 3,
    Perfect = 4,
}

impl Compatibility {
    pub fn score(self) -> u32 {
        self as u32
    }
}

/// Rank an argument datatype against a parameter datatype.
///
/// A scalar argument is tested against the parameter's element type; vectors
/// and matrices need identical dimensions first. Element types are then
/// ranked: float-like into non-float always loses precision, otherwise the
/// byte sizes decide.
pub fn compatible_arg_datatype(arg: &DatatypeRef, param: &DatatypeRef) -> Compatibility {
    if datatypes_match(arg, param) {
        return Compatibility::Perfect;
    }

    let base_test = match (&**arg, &**param) {
        (a, _) if a.is_scalar() => true,
        (Datatype::Vector { elements: e1, .. }, Datatype::Vector { elements: e2, .. }) => e1 == e2,
        (
            Datatype::Matrix { rows: r1, columns: c1, .. },
            Datatype::Matrix { rows: r2, columns: c2, .. },
        ) => r1 == r2 && c1 == c2,
        _ => false,
    };
    if !base_test {
        return Compatibility::Incompatible;
    }

    let arg = datatype_base(arg);
    let param = datatype_base(param);
    let (argsize, paramsize) = (arg.size(), param.size());
    if argsize == 0 || paramsize == 0 {
        return Compatibility::Incompatible;
    }

    if arg.is_float() && !param.is_float() {
        Compatibility::Downcast
    } else if argsize == paramsize {
        Compatibility::Compatible
    } else if argsize < paramsize {
        Compatibility::Upcast
    } else {
        Compatibility::Downcast
    }
}

/// Which operand of a binary operation gets converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionChoice {
    /// Convert the right operand to the left operand's type
    Left,
    /// Convert the left operand to the right operand's type
    Right,
    /// No numeric conversion exists
    Neither,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Scalar,
    Vector,
    Matrix,
}

/// Conversion rank of a numeric element type.
#[derive(Debug, Clone, Copy)]
struct Rank {
    bits: u32,
    unsigned: bool,
    floating: bool,
}

fn rank(datatype: &Datatype) -> Option<(Shape, Rank)> {
    let (shape, base) = match datatype {
        Datatype::Vector { base, .. } => (Shape::Vector, &**base),
        Datatype::Matrix { base, .. } => (Shape::Matrix, &**base),
        other => (Shape::Scalar, other),
    };
    let rank = match base {
        Datatype::Bool => Rank { bits: 1, unsigned: true, floating: false },
        Datatype::Half => Rank { bits: 16, unsigned: false, floating: true },
        Datatype::Int => Rank { bits: 32, unsigned: false, floating: false },
        Datatype::Uint => Rank { bits: 32, unsigned: true, floating: false },
        Datatype::Float | Datatype::FloatSnorm | Datatype::FloatUnorm => {
            Rank { bits: 32, unsigned: false, floating: true }
        }
        Datatype::Double => Rank { bits: 64, unsigned: false, floating: true },
        _ => return None,
    };
    Some((shape, rank))
}

/// Decide which side of a binary operation to convert.
///
/// `left_fixed` marks an assignment target: when any conversion is possible
/// it is always the right side that changes. Otherwise the preference is
/// matrix over vector over scalar, then wider, then floating point, then
/// unsigned.
pub fn coercion_choice(left: &Datatype, right: &Datatype, left_fixed: bool) -> CoercionChoice {
    let (Some((lshape, l)), Some((rshape, r))) = (rank(left), rank(right)) else {
        return CoercionChoice::Neither;
    };

    if left_fixed {
        return CoercionChoice::Left;
    }

    let shape_rank = |shape: Shape| match shape {
        Shape::Scalar => 0,
        Shape::Vector => 1,
        Shape::Matrix => 2,
    };
    let keys = [
        (shape_rank(lshape), shape_rank(rshape)),
        (l.bits, r.bits),
        (l.floating as u32, r.floating as u32),
        (l.unsigned as u32, r.unsigned as u32),
    ];
    for (lk, rk) in keys {
        if lk > rk {
            return CoercionChoice::Left;
        }
        if lk < rk {
            return CoercionChoice::Right;
        }
    }
    // Same rank, different type (e.g. float and snorm float): keep the left.
    CoercionChoice::Left
}

/// Whether values of this datatype take part in numeric conversions.
pub fn is_numeric(datatype: &Datatype) -> bool {
    rank(datatype).is_some()
}

/// Whether a value of shape `from` can be converted to shape `to`.
///
/// Scalars splat into any shape and anything truncates to a scalar (its
/// first component). A vector only converts to a vector that is no longer,
/// a matrix only to a matrix of the same dimensions.
pub fn shape_convertible(from: &Datatype, to: &Datatype) -> bool {
    match (from, to) {
        (_, to) if to.is_scalar() => true,
        (from, _) if from.is_scalar() => true,
        (Datatype::Vector { elements: f, .. }, Datatype::Vector { elements: t, .. }) => t <= f,
        (
            Datatype::Matrix { rows: fr, columns: fc, .. },
            Datatype::Matrix { rows: tr, columns: tc, .. },
        ) => fr == tr && fc == tc,
        _ => false,
    }
}

/// Converting `from` to `to` drops components.
pub fn truncates(from: &Datatype, to: &Datatype) -> bool {
    !from.is_scalar() && to.elems() < from.elems()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::datatype::{matrix_of, vector_of, Primitives};
    use std::rc::Rc;

    #[test]
    fn test_perfect_and_scalar_ranks() {
        let p = Primitives::new();
        assert_eq!(compatible_arg_datatype(&p.float, &p.float), Compatibility::Perfect);
        assert_eq!(compatible_arg_datatype(&p.float, &p.int), Compatibility::Downcast);
        assert_eq!(compatible_arg_datatype(&p.int, &p.float), Compatibility::Compatible);
        assert_eq!(compatible_arg_datatype(&p.half, &p.float), Compatibility::Upcast);
        assert_eq!(compatible_arg_datatype(&p.double, &p.float), Compatibility::Downcast);
        assert_eq!(compatible_arg_datatype(&p.bool_, &p.int), Compatibility::Upcast);
    }

    #[test]
    fn test_vector_dimensions_must_agree() {
        let p = Primitives::new();
        let f3 = vector_of(&p.float, 3);
        let h3 = vector_of(&p.half, 3);
        let f4 = vector_of(&p.float, 4);
        assert_eq!(compatible_arg_datatype(&h3, &f3), Compatibility::Upcast);
        assert_eq!(compatible_arg_datatype(&f3, &f4), Compatibility::Incompatible);
        assert_eq!(compatible_arg_datatype(&f4, &matrix_of(&p.float, 2, 2)), Compatibility::Incompatible);
        // a scalar is tested against the element type
        assert_eq!(compatible_arg_datatype(&p.float, &f4), Compatibility::Compatible);
    }

    #[test]
    fn test_non_numeric_is_incompatible() {
        let p = Primitives::new();
        let sampler = p.sampler(crate::semantic::datatype::SamplerKind::Sampler2D);
        assert_eq!(compatible_arg_datatype(&p.int, &sampler), Compatibility::Incompatible);
        assert_eq!(compatible_arg_datatype(&sampler, &sampler), Compatibility::Perfect);
        assert_eq!(compatible_arg_datatype(&p.string, &p.float), Compatibility::Incompatible);
    }

    #[test]
    fn test_half2_ties_between_float2_and_int2() {
        let p = Primitives::new();
        let h2 = vector_of(&p.half, 2);
        let a = compatible_arg_datatype(&h2, &vector_of(&p.float, 2));
        let b = compatible_arg_datatype(&h2, &vector_of(&p.int, 2));
        assert_eq!(a, b);
    }

    #[test]
    fn test_coercion_choice_ordering() {
        let p = Primitives::new();
        let f4 = vector_of(&p.float, 4);
        let m = matrix_of(&p.half, 2, 2);
        assert_eq!(coercion_choice(&p.int, &p.float, false), CoercionChoice::Right);
        assert_eq!(coercion_choice(&p.float, &p.int, false), CoercionChoice::Left);
        assert_eq!(coercion_choice(&p.double, &f4, false), CoercionChoice::Right);
        assert_eq!(coercion_choice(&m, &f4, false), CoercionChoice::Left);
        assert_eq!(coercion_choice(&p.uint, &p.int, false), CoercionChoice::Left);
        assert_eq!(coercion_choice(&p.half, &p.int, false), CoercionChoice::Right);
        assert_eq!(coercion_choice(&p.int, &p.double, true), CoercionChoice::Left);
        assert_eq!(coercion_choice(&p.string, &p.int, false), CoercionChoice::Neither);
        assert!(is_numeric(&f4));
        assert!(!is_numeric(&Datatype::Array { base: Rc::clone(&p.int), elements: 2 }));
    }

    #[test]
    fn test_shape_conversions() {
        let p = Primitives::new();
        let f2 = vector_of(&p.float, 2);
        let f4 = vector_of(&p.float, 4);
        let m44 = matrix_of(&p.float, 4, 4);
        let m22 = matrix_of(&p.float, 2, 2);
        assert!(shape_convertible(&p.float, &f4));
        assert!(shape_convertible(&f4, &f2));
        assert!(shape_convertible(&f4, &p.float));
        assert!(shape_convertible(&m44, &p.float));
        assert!(shape_convertible(&m22, &matrix_of(&p.int, 2, 2)));
        assert!(!shape_convertible(&f2, &f4));
        assert!(!shape_convertible(&f4, &m44));
        assert!(!shape_convertible(&m22, &f4));
        assert!(!shape_convertible(&m44, &m22));

        assert!(truncates(&f4, &f2));
        assert!(truncates(&f4, &p.bool_));
        assert!(!truncates(&f2, &f2));
        assert!(!truncates(&p.float, &f4));
    }
}
