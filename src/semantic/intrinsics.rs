//! Built-in (intrinsic) functions.
//!
//! The table is declarative: each template names a function and the shapes
//! of its return value and parameters. Templates mentioning the generic
//! shape `T` are instantiated for `float`, `float2`, `float3` and `float4`;
//! templates mentioning `V`/`M` are instantiated for sizes 2 to 4, where `V`
//! is `floatN` and `M` is `floatNxN`. The expansion happens once per process;
//! the datatypes are built per compilation when the signatures are
//! registered.

use crate::context::Context;
use crate::semantic::datatype::{function_of, matrix_of, vector_of, DatatypeRef, SamplerKind};
use crate::semantic::scope::{ScopeError, Scopes};
use log::trace;
use once_cell::sync::Lazy;
use std::rc::Rc;

/// A parameter or return shape in a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// float .. float4
    T,
    /// floatN, N in 2..=4
    V,
    /// floatNxN, N in 2..=4
    M,
    Float,
    Float2,
    Float3,
    Float4,
    Bool,
    Sampler(SamplerKind),
}

struct Template {
    name: &'static str,
    /// `None` is `void`
    ret: Option<Shape>,
    params: &'static [Shape],
}

const fn t(name: &'static str, ret: Option<Shape>, params: &'static [Shape]) -> Template {
    Template { name, ret, params }
}

use Shape::*;

const TEMPLATES: &[Template] = &[
    t("abs", Some(T), &[T]),
    t("acos", Some(T), &[T]),
    t("asin", Some(T), &[T]),
    t("atan", Some(T), &[T]),
    t("atan2", Some(T), &[T, T]),
    t("ceil", Some(T), &[T]),
    t("clamp", Some(T), &[T, T, T]),
    t("cos", Some(T), &[T]),
    t("cosh", Some(T), &[T]),
    t("cross", Some(Float3), &[Float3, Float3]),
    t("ddx", Some(T), &[T]),
    t("ddy", Some(T), &[T]),
    t("degrees", Some(T), &[T]),
    t("determinant", Some(Float), &[M]),
    t("distance", Some(Float), &[T, T]),
    t("dot", Some(Float), &[T, T]),
    t("exp", Some(T), &[T]),
    t("exp2", Some(T), &[T]),
    t("floor", Some(T), &[T]),
    t("fmod", Some(T), &[T, T]),
    t("frac", Some(T), &[T]),
    t("length", Some(Float), &[T]),
    t("lerp", Some(T), &[T, T, T]),
    t("log", Some(T), &[T]),
    t("log2", Some(T), &[T]),
    t("log10", Some(T), &[T]),
    t("max", Some(T), &[T, T]),
    t("min", Some(T), &[T, T]),
    t("mul", Some(Float), &[Float, Float]),
    t("mul", Some(V), &[V, M]),
    t("mul", Some(V), &[M, V]),
    t("mul", Some(M), &[M, M]),
    t("normalize", Some(T), &[T]),
    t("pow", Some(T), &[T, T]),
    t("radians", Some(T), &[T]),
    t("reflect", Some(T), &[T, T]),
    t("rsqrt", Some(T), &[T]),
    t("saturate", Some(T), &[T]),
    t("sign", Some(T), &[T]),
    t("sin", Some(T), &[T]),
    t("sinh", Some(T), &[T]),
    t("smoothstep", Some(T), &[T, T, T]),
    t("sqrt", Some(T), &[T]),
    t("step", Some(T), &[T, T]),
    t("tan", Some(T), &[T]),
    t("tanh", Some(T), &[T]),
    t("transpose", Some(M), &[M]),
    t("any", Some(Bool), &[T]),
    t("all", Some(Bool), &[T]),
    t("clip", None, &[T]),
    t("tex1D", Some(Float4), &[Sampler(SamplerKind::Sampler1D), Float]),
    t("tex2D", Some(Float4), &[Sampler(SamplerKind::Sampler2D), Float2]),
    t("tex3D", Some(Float4), &[Sampler(SamplerKind::Sampler3D), Float3]),
    t("texCUBE", Some(Float4), &[Sampler(SamplerKind::Cube), Float3]),
    t("tex2Dlod", Some(Float4), &[Sampler(SamplerKind::Sampler2D), Float4]),
    t("tex2Dproj", Some(Float4), &[Sampler(SamplerKind::Sampler2D), Float4]),
    t("tex2Dbias", Some(Float4), &[Sampler(SamplerKind::Sampler2D), Float4]),
];

/// A template shape with the size variable bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcreteShape {
    /// `float` when 1, `floatN` otherwise
    Float(u32),
    /// `floatNxN`
    FloatMatrix(u32),
    Bool,
    Sampler(SamplerKind),
}

/// One instantiated intrinsic overload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntrinsicSignature {
    pub name: &'static str,
    pub ret: Option<ConcreteShape>,
    pub params: Vec<ConcreteShape>,
}

fn bind(shape: Shape, n: u32) -> ConcreteShape {
    match shape {
        T | V => ConcreteShape::Float(n),
        M => ConcreteShape::FloatMatrix(n),
        Float => ConcreteShape::Float(1),
        Float2 => ConcreteShape::Float(2),
        Float3 => ConcreteShape::Float(3),
        Float4 => ConcreteShape::Float(4),
        Bool => ConcreteShape::Bool,
        Sampler(kind) => ConcreteShape::Sampler(kind),
    }
}

fn expand(template: &Template) -> Vec<IntrinsicSignature> {
    let shapes = || template.params.iter().copied().chain(template.ret);
    let sizes = if shapes().any(|s| s == T) {
        1..=4
    } else if shapes().any(|s| s == V || s == M) {
        2..=4
    } else {
        1..=1
    };
    sizes
        .map(|n| IntrinsicSignature {
            name: template.name,
            ret: template.ret.map(|s| bind(s, n)),
            params: template.params.iter().map(|&s| bind(s, n)).collect(),
        })
        .collect()
}

/// Every intrinsic overload, in registration order.
pub static INTRINSICS: Lazy<Vec<IntrinsicSignature>> =
    Lazy::new(|| TEMPLATES.iter().flat_map(expand).collect());

fn datatype_of(ctx: &Context, shape: ConcreteShape) -> DatatypeRef {
    let types = &ctx.types;
    match shape {
        ConcreteShape::Float(1) => Rc::clone(&types.float),
        ConcreteShape::Float(n) => vector_of(&types.float, n),
        ConcreteShape::FloatMatrix(n) => matrix_of(&types.float, n, n),
        ConcreteShape::Bool => Rc::clone(&types.bool_),
        ConcreteShape::Sampler(kind) => types.sampler(kind),
    }
}

/// Register every intrinsic overload in `scopes` at the current scope.
pub fn register_intrinsics(ctx: &mut Context, scopes: &mut Scopes) -> Result<usize, ScopeError> {
    for sig in INTRINSICS.iter() {
        let ret = sig.ret.map(|s| datatype_of(ctx, s));
        let params = sig.params.iter().map(|&s| datatype_of(ctx, s)).collect();
        let name = ctx.strings.intern(sig.name);
        scopes.push_function(name, function_of(ret, params, true), true)?;
    }
    trace!("registered {} intrinsic overloads", INTRINSICS.len());
    Ok(INTRINSICS.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::datatype::Datatype;
    use crate::semantic::scope::SymbolIndex;

    #[test]
    fn test_generic_templates_expand_over_float_shapes() {
        let dots: Vec<_> = INTRINSICS.iter().filter(|s| s.name == "dot").collect();
        assert_eq!(dots.len(), 4);
        assert_eq!(dots[0].params, vec![ConcreteShape::Float(1), ConcreteShape::Float(1)]);
        assert_eq!(dots[3].params, vec![ConcreteShape::Float(4), ConcreteShape::Float(4)]);
        assert!(dots.iter().all(|s| s.ret == Some(ConcreteShape::Float(1))));

        let muls = INTRINSICS.iter().filter(|s| s.name == "mul").count();
        assert_eq!(muls, 1 + 3 * 3);
        let tex2d: Vec<_> = INTRINSICS.iter().filter(|s| s.name == "tex2D").collect();
        assert_eq!(tex2d.len(), 1);
        assert!(INTRINSICS.iter().any(|s| s.name == "clip" && s.ret.is_none()));
    }

    #[test]
    fn test_registration_uses_intrinsic_indices() {
        let mut ctx = Context::new();
        let mut scopes = Scopes::new();
        scopes.push_scope();
        let count = register_intrinsics(&mut ctx, &mut scopes).unwrap();
        assert_eq!(count, INTRINSICS.len());
        assert_eq!(scopes.function_count(), 0);

        let name = ctx.strings.get("normalize").unwrap();
        let overloads: Vec<_> = scopes.overloads(name).collect();
        assert_eq!(overloads.len(), 4);
        for entry in overloads {
            assert!(matches!(entry.index, SymbolIndex::Intrinsic(_)));
            assert!(matches!(&*entry.datatype, Datatype::Function { intrinsic: true, .. }));
        }
    }
}
