//! Text rendering of the IR.

use crate::ir::nodes::*;
use crate::utils::pretty::{PrettyPrint, NEST};
use pretty::{BoxAllocator, DocAllocator, DocBuilder};

const COMPONENTS: [char; 4] = ['x', 'y', 'z', 'w'];

fn type_name(base: ScalarBase, elements: u32) -> String {
    if elements == 1 {
        base.name().to_string()
    } else {
        format!("{}{}", base, elements)
    }
}

fn arguments<'a>(allocator: &'a BoxAllocator, args: &[IrExpr]) -> DocBuilder<'a, BoxAllocator> {
    allocator
        .intersperse(args.iter().map(|arg| arg.to_doc(allocator)), ", ")
        .parens()
}

impl PrettyPrint for IrExpr {
    fn to_doc<'a>(&self, allocator: &'a BoxAllocator) -> DocBuilder<'a, BoxAllocator> {
        match &self.kind {
            IrExprKind::Constant(values) if values.len() == 1 => allocator.text(values[0].to_string()),
            IrExprKind::Constant(values) => allocator.text(type_name(self.base, self.elements)).append(
                allocator
                    .intersperse(values.iter().map(|v| allocator.text(v.to_string())), ", ")
                    .parens(),
            ),
            IrExprKind::Temp(slot) => allocator.text(format!("t{}", slot)),
            IrExprKind::Memory(slot) => allocator.text(format!("m{}", slot)),
            IrExprKind::Binop { op, left, right } => left
                .to_doc(allocator)
                .append(format!(" {} ", op.symbol()))
                .append(right.to_doc(allocator))
                .parens(),
            IrExprKind::Convert(inner) => allocator
                .text(format!("convert<{}>", type_name(self.base, self.elements)))
                .append(inner.to_doc(allocator).parens()),
            IrExprKind::Construct(parts) => allocator
                .text(format!("construct<{}>", type_name(self.base, self.elements)))
                .append(arguments(allocator, parts)),
            IrExprKind::Call { index, args } => {
                allocator.text(format!("call[{}]", index)).append(arguments(allocator, args))
            }
            IrExprKind::Swizzle { base, components } => {
                let letters: String = components
                    .iter()
                    .map(|&c| COMPONENTS[usize::from(c) & 3])
                    .collect();
                base.to_doc(allocator).append(".").append(letters)
            }
            IrExprKind::Array { array, index } => {
                array.to_doc(allocator).append(index.to_doc(allocator).brackets())
            }
            IrExprKind::Eseq { stmt, expr } => allocator
                .text("eseq {")
                .append(allocator.hardline().append(stmt.to_doc(allocator)).nest(NEST))
                .append(allocator.hardline())
                .append("} ")
                .append(expr.to_doc(allocator)),
        }
    }
}

impl PrettyPrint for IrStmt {
    fn to_doc<'a>(&self, allocator: &'a BoxAllocator) -> DocBuilder<'a, BoxAllocator> {
        match self {
            IrStmt::Seq(_) => {
                let parts = self.flatten();
                allocator.intersperse(parts.into_iter().map(|s| s.to_doc(allocator)), allocator.hardline())
            }
            IrStmt::Label(label) => allocator.text(format!("L{}:", label)),
            IrStmt::Jump(label) => allocator.text(format!("jump L{}", label)),
            IrStmt::CJump { cond, left, right, iftrue, iffalse } => allocator
                .text("cjump ")
                .append(left.to_doc(allocator))
                .append(format!(" {} ", cond.symbol()))
                .append(right.to_doc(allocator))
                .append(format!(", L{}, L{}", iftrue, iffalse)),
            IrStmt::Move { dst, src } => allocator
                .text("move ")
                .append(dst.to_doc(allocator))
                .append(", ")
                .append(src.to_doc(allocator)),
            IrStmt::Expr(expr) => allocator.text("expr ").append(expr.to_doc(allocator)),
            IrStmt::Discard => allocator.text("discard"),
        }
    }
}

impl PrettyPrint for IrFunction {
    fn to_doc<'a>(&self, allocator: &'a BoxAllocator) -> DocBuilder<'a, BoxAllocator> {
        let mut header = format!("function {} [{}]", self.name, self.index);
        if let Some(temp) = self.return_temp {
            header.push_str(&format!(" returns t{}", temp));
        }
        allocator
            .text(header)
            .append(allocator.hardline().append(self.body.to_doc(allocator)).nest(NEST))
    }
}

/// Render every lowered function, separated by blank lines.
pub fn print_functions(functions: &[Option<IrFunction>]) -> String {
    functions
        .iter()
        .flatten()
        .map(|f| f.pretty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::scope::SymbolIndex;
    use crate::utils::location::SourcePos;

    fn pos() -> SourcePos {
        SourcePos::builtin()
    }

    #[test]
    fn test_print_expressions() {
        let t = IrExpr::temp(3, ScalarBase::Float, 4, pos());
        let one = IrExpr::constant(1, ScalarBase::Float, 4, pos());
        let sum = IrExpr::binop(IrBinop::Add, t.clone(), one);
        assert_eq!(sum.pretty(), "(t3 + float4(1.0, 1.0, 1.0, 1.0))");

        let swizzle = IrExpr::new(
            IrExprKind::Swizzle { base: Box::new(t), components: vec![2, 1, 0] },
            ScalarBase::Float,
            3,
            pos(),
        );
        assert_eq!(swizzle.pretty(), "t3.zyx");

        let c = IrExpr::constant(7, ScalarBase::Int, 1, pos()).convert(ScalarBase::Float);
        assert_eq!(c.pretty(), "convert<float>(7)");
    }

    #[test]
    fn test_print_function() {
        let ret = IrExpr::temp(2, ScalarBase::Int, 1, pos());
        let value = IrExpr::constant(0, ScalarBase::Int, 1, pos());
        let func = IrFunction {
            name: "main".to_string(),
            index: SymbolIndex::Function(0),
            body: IrStmt::Seq(vec![
                IrStmt::Label(0),
                IrStmt::Seq(vec![IrStmt::moves(ret, value), IrStmt::Jump(1)]),
                IrStmt::Label(1),
            ]),
            return_temp: Some(2),
            start_label: 0,
            end_label: 1,
        };
        let text = func.pretty();
        assert_eq!(
            text,
            "function main [function 0] returns t2\n  L0:\n  move t2, 0\n  jump L1\n  L1:"
        );
        assert_eq!(print_functions(&[None, Some(func)]), text);
    }
}
