//! AST to IR lowering.
//!
//! Runs on an analysed, error-free AST: every expression has a reduced
//! datatype, every identifier and call a resolved index, and every implicit
//! conversion is an explicit cast node. Control flow is lowered to fixed
//! label/jump templates:
//!
//! ```text
//! if      cjump(c == true, T, JOIN)  T: body  JOIN:
//! while   LOOP: cjump(c == true, BODY, JOIN)  BODY: body  jump LOOP  JOIN:
//! do      LOOP: body  cjump(c == true, LOOP, JOIN)  JOIN:
//! for     init  TEST: cjump(c == true, LOOP, JOIN)  LOOP: body
//!         INCREMENT: step  jump TEST  JOIN:
//! switch  t = cond  cjump(case_0 == t, CASE_0, NEXT_0)  NEXT_0: ...
//!         jump DEFAULT|JOIN  CASE_0: body_0 ...  JOIN:
//! ```
//!
//! Locals and parameters live in `Temp(slot)`, globals in `Memory(slot)`.
//! Temporaries introduced here are numbered after the function's last local
//! slot.

use crate::context::Context;
use crate::frontend::ast::*;
use crate::ir::nodes::*;
use crate::semantic::datatype::DatatypeRef;
use crate::semantic::scope::SymbolIndex;
use crate::semantic::unpack_swizzle;
use crate::utils::location::SourcePos;
use log::{debug, trace};

/// Lower every defined user function. The result is indexed by function
/// index; prototypes without a body leave their slot empty.
pub fn build_program(program: &Program, function_count: u32, ctx: &mut Context) -> Vec<Option<IrFunction>> {
    let mut functions: Vec<Option<IrFunction>> = vec![None; function_count as usize];
    let mut builder = IrBuilder::new(ctx);
    for func in program.functions() {
        if builder.ctx.should_stop() {
            break;
        }
        let Some(ir) = builder.build_function(func) else {
            continue;
        };
        if let SymbolIndex::Function(i) = ir.index {
            if let Some(slot) = functions.get_mut(i as usize) {
                *slot = Some(ir);
            }
        }
    }
    debug!(
        "built IR for {} of {} function(s) using {} label(s)",
        functions.iter().filter(|f| f.is_some()).count(),
        function_count,
        builder.next_label
    );
    functions
}

/// Jump targets of an enclosing loop or switch.
#[derive(Debug, Clone, Copy)]
struct Targets {
    brk: u32,
    /// `None` for a switch
    cont: Option<u32>,
}

struct ReturnSlot {
    temp: u32,
    base: ScalarBase,
    elements: u32,
}

pub struct IrBuilder<'c> {
    ctx: &'c mut Context,
    next_label: u32,
    next_temp: u32,
    targets: Vec<Targets>,
    end_label: Option<u32>,
    return_slot: Option<ReturnSlot>,
}

fn shape(datatype: Option<&DatatypeRef>) -> (ScalarBase, u32) {
    match datatype {
        Some(dt) => (ScalarBase::of(dt), dt.elems()),
        None => (ScalarBase::None, 1),
    }
}

/// Split an lvalue into the statements that compute its address and the
/// place itself.
fn split_lvalue(lvalue: IrExpr) -> (Vec<IrStmt>, IrExpr) {
    let mut setup = Vec::new();
    let mut place = lvalue;
    while let IrExprKind::Eseq { stmt, expr } = place.kind {
        setup.push(*stmt);
        place = *expr;
    }
    (setup, place)
}

impl<'c> IrBuilder<'c> {
    pub fn new(ctx: &'c mut Context) -> Self {
        Self { ctx, next_label: 0, next_temp: 1, targets: Vec::new(), end_label: None, return_slot: None }
    }

    fn label(&mut self) -> u32 {
        self.next_label += 1;
        self.next_label - 1
    }

    fn temp(&mut self, base: ScalarBase, elements: u32, pos: &SourcePos) -> IrExpr {
        let slot = self.next_temp;
        self.next_temp += 1;
        IrExpr::temp(slot, base, elements, pos.clone())
    }

    fn truth(&self, base: ScalarBase, elements: u32, value: bool, pos: &SourcePos) -> IrExpr {
        IrExpr::constant(i64::from(value), base, elements, pos.clone())
    }

    pub fn build_function(&mut self, func: &FunctionUnit) -> Option<IrFunction> {
        let body = func.body.as_ref()?;
        if !matches!(func.index, SymbolIndex::Function(_)) {
            return None;
        }
        let name = self.ctx.strings.resolve(func.signature.name).to_string();

        self.next_temp = func.local_slots + 1;
        let start_label = self.label();
        let end_label = self.label();
        let return_slot = func.signature.return_type.as_ref().map(|dt| {
            let (base, elements) = shape(Some(dt));
            let temp = self.next_temp;
            self.next_temp += 1;
            ReturnSlot { temp, base, elements }
        });
        let return_temp = return_slot.as_ref().map(|slot| slot.temp);

        self.end_label = Some(end_label);
        self.return_slot = return_slot;
        let lowered = self.build_stmt(body);
        self.end_label = None;
        self.return_slot = None;
        debug_assert!(self.targets.is_empty());

        trace!("lowered '{}' with {} temporaries", name, self.next_temp - 1);
        Some(IrFunction {
            name,
            index: func.index,
            body: IrStmt::Seq(vec![IrStmt::Label(start_label), lowered, IrStmt::Label(end_label)]),
            return_temp,
            start_label,
            end_label,
        })
    }

    // Statements

    fn build_stmt(&mut self, stmt: &Stmt) -> IrStmt {
        if self.ctx.should_stop() || !self.ctx.count_node() {
            return IrStmt::Seq(Vec::new());
        }
        let pos = &stmt.pos;
        match &stmt.kind {
            StmtKind::Empty | StmtKind::Typedef(_) => IrStmt::Seq(Vec::new()),
            StmtKind::Discard => IrStmt::Discard,
            StmtKind::Break => match self.targets.last() {
                Some(targets) => IrStmt::Jump(targets.brk),
                None => IrStmt::Seq(Vec::new()),
            },
            StmtKind::Continue => match self.targets.iter().rev().find_map(|t| t.cont) {
                Some(label) => IrStmt::Jump(label),
                None => IrStmt::Seq(Vec::new()),
            },
            StmtKind::Block(stmts) => IrStmt::Seq(stmts.iter().map(|s| self.build_stmt(s)).collect()),
            StmtKind::Expression(expr) => IrStmt::Expr(self.build_expr(expr)),
            StmtKind::If { cond, then_branch, else_branch } => {
                self.build_if(cond, then_branch, else_branch.as_deref())
            }
            StmtKind::Switch { cond, cases } => self.build_switch(cond, cases, pos),
            StmtKind::For { init, cond, step, body } => {
                self.build_for(init.as_deref(), cond.as_ref(), step.as_ref(), body, pos)
            }
            StmtKind::Do { body, cond } => {
                let (top, join) = (self.label(), self.label());
                self.targets.push(Targets { brk: join, cont: Some(top) });
                let body = self.build_stmt(body);
                self.targets.pop();
                let test = self.build_test(cond, top, join);
                IrStmt::Seq(vec![IrStmt::Label(top), body, test, IrStmt::Label(join)])
            }
            StmtKind::While { cond, body } => {
                let (top, enter, join) = (self.label(), self.label(), self.label());
                let test = self.build_test(cond, enter, join);
                self.targets.push(Targets { brk: join, cont: Some(top) });
                let body = self.build_stmt(body);
                self.targets.pop();
                IrStmt::Seq(vec![
                    IrStmt::Label(top),
                    test,
                    IrStmt::Label(enter),
                    body,
                    IrStmt::Jump(top),
                    IrStmt::Label(join),
                ])
            }
            StmtKind::Return(value) => self.build_return(value.as_ref()),
            StmtKind::VarDecl(group) => self.build_initializers(group),
            StmtKind::Struct(decl) => match &decl.variables {
                Some(group) => self.build_initializers(group),
                None => IrStmt::Seq(Vec::new()),
            },
        }
    }

    /// `cjump(cond == true, iftrue, iffalse)`
    fn build_test(&mut self, cond: &Expr, iftrue: u32, iffalse: u32) -> IrStmt {
        let value = self.build_expr(cond).convert(ScalarBase::Bool);
        let truth = self.truth(ScalarBase::Bool, value.elements, true, &cond.pos);
        IrStmt::cjump(IrCond::Eq, value, truth, iftrue, iffalse)
    }

    fn build_if(&mut self, cond: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) -> IrStmt {
        let iftrue = self.label();
        match else_branch {
            None => {
                let join = self.label();
                let test = self.build_test(cond, iftrue, join);
                let body = self.build_stmt(then_branch);
                IrStmt::Seq(vec![test, IrStmt::Label(iftrue), body, IrStmt::Label(join)])
            }
            Some(else_branch) => {
                let (iffalse, join) = (self.label(), self.label());
                let test = self.build_test(cond, iftrue, iffalse);
                let body = self.build_stmt(then_branch);
                let else_body = self.build_stmt(else_branch);
                IrStmt::Seq(vec![
                    test,
                    IrStmt::Label(iftrue),
                    body,
                    IrStmt::Jump(join),
                    IrStmt::Label(iffalse),
                    else_body,
                    IrStmt::Label(join),
                ])
            }
        }
    }

    fn build_for(
        &mut self,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        step: Option<&Expr>,
        body: &Stmt,
        pos: &SourcePos,
    ) -> IrStmt {
        let (test, enter, increment, join) = (self.label(), self.label(), self.label(), self.label());
        let mut seq = Vec::with_capacity(9);
        if let Some(init) = init {
            seq.push(self.build_stmt(init));
        }
        seq.push(IrStmt::Label(test));
        seq.push(match cond {
            Some(cond) => self.build_test(cond, enter, join),
            None => {
                let truth = self.truth(ScalarBase::Bool, 1, true, pos);
                IrStmt::cjump(IrCond::Eq, truth.clone(), truth, enter, join)
            }
        });
        seq.push(IrStmt::Label(enter));

        self.targets.push(Targets { brk: join, cont: Some(increment) });
        seq.push(self.build_stmt(body));
        self.targets.pop();

        seq.push(IrStmt::Label(increment));
        if let Some(step) = step {
            seq.push(IrStmt::Expr(self.build_expr(step)));
        }
        seq.push(IrStmt::Jump(test));
        seq.push(IrStmt::Label(join));
        IrStmt::Seq(seq)
    }

    fn build_switch(&mut self, cond: &Expr, cases: &[SwitchCase], pos: &SourcePos) -> IrStmt {
        let value = self.build_expr(cond);
        let temp = self.temp(value.base, value.elements, pos);
        let join = self.label();
        let case_labels: Vec<u32> = cases.iter().map(|_| self.label()).collect();

        let mut seq = vec![IrStmt::moves(temp.clone(), value)];
        let mut default = None;
        for (case, &label) in cases.iter().zip(&case_labels) {
            match &case.value {
                Some(value) => {
                    let next = self.label();
                    let value = self.build_expr(value);
                    seq.push(IrStmt::cjump(IrCond::Eq, value, temp.clone(), label, next));
                    seq.push(IrStmt::Label(next));
                }
                None => default = Some(label),
            }
        }
        seq.push(IrStmt::Jump(default.unwrap_or(join)));

        self.targets.push(Targets { brk: join, cont: None });
        for (case, &label) in cases.iter().zip(&case_labels) {
            seq.push(IrStmt::Label(label));
            seq.extend(case.body.iter().map(|s| self.build_stmt(s)));
        }
        self.targets.pop();

        seq.push(IrStmt::Label(join));
        IrStmt::Seq(seq)
    }

    fn build_return(&mut self, value: Option<&Expr>) -> IrStmt {
        let Some(end) = self.end_label else {
            return IrStmt::Seq(Vec::new());
        };
        let slot = self.return_slot.as_ref().map(|s| (s.temp, s.base, s.elements));
        match (value, slot) {
            (Some(value), Some((temp, base, elements))) => {
                let value = self.build_expr(value);
                let dst = IrExpr::temp(temp, base, elements, value.pos.clone());
                IrStmt::Seq(vec![IrStmt::moves(dst, value), IrStmt::Jump(end)])
            }
            _ => IrStmt::Jump(end),
        }
    }

    fn build_initializers(&mut self, group: &VarDeclGroup) -> IrStmt {
        let mut seq = Vec::new();
        for decl in &group.decls {
            let Some(init) = &decl.initializer else {
                continue;
            };
            let (base, elements) = shape(decl.datatype.as_ref());
            let dst = self.storage(decl.index, base, elements, &decl.pos);
            let src = self.build_expr(init);
            seq.push(IrStmt::moves(dst, src));
        }
        IrStmt::Seq(seq)
    }

    // Expressions

    fn storage(&self, index: SymbolIndex, base: ScalarBase, elements: u32, pos: &SourcePos) -> IrExpr {
        let kind = match index {
            SymbolIndex::Local(slot) => IrExprKind::Temp(slot),
            SymbolIndex::Global(slot) => IrExprKind::Memory(slot),
            _ => return IrExpr::constant(0, base, elements, pos.clone()),
        };
        IrExpr::new(kind, base, elements, pos.clone())
    }

    pub fn build_expr(&mut self, expr: &Expr) -> IrExpr {
        let pos = &expr.pos;
        let (base, elements) = shape(expr.datatype());
        if self.ctx.should_stop() || !self.ctx.count_node() {
            return IrExpr::constant(0, base, elements, pos.clone());
        }
        match &expr.kind {
            ExprKind::Identifier { index, .. } => self.storage(*index, base, elements, pos),
            ExprKind::IntLiteral(v) => IrExpr::constant(*v, base, elements, pos.clone()),
            ExprKind::UintLiteral(v) => IrExpr::new(
                IrExprKind::Constant(vec![IrValue::Int(*v as i64)]),
                base,
                elements,
                pos.clone(),
            ),
            ExprKind::FloatLiteral(v) => {
                IrExpr::new(IrExprKind::Constant(vec![IrValue::Float(*v)]), base, elements, pos.clone())
            }
            ExprKind::BoolLiteral(b) => IrExpr::constant(i64::from(*b), base, elements, pos.clone()),
            ExprKind::StringLiteral(sym) => IrExpr::new(
                IrExprKind::Constant(vec![IrValue::Int(i64::from(sym.as_raw()))]),
                base,
                elements,
                pos.clone(),
            ),
            ExprKind::Unary { op, operand } => self.build_unary(*op, operand, pos),
            ExprKind::Binary { op, left, right } => self.build_binary(*op, left, right, base, elements, pos),
            ExprKind::Ternary { cond, left, right, .. } => {
                let (iftrue, iffalse, join) = (self.label(), self.label(), self.label());
                let temp = self.temp(base, elements, pos);
                let test = self.build_test(cond, iftrue, iffalse);
                let left = self.build_expr(left);
                let right = self.build_expr(right);
                let seq = IrStmt::Seq(vec![
                    test,
                    IrStmt::Label(iftrue),
                    IrStmt::moves(temp.clone(), left),
                    IrStmt::Jump(join),
                    IrStmt::Label(iffalse),
                    IrStmt::moves(temp.clone(), right),
                    IrStmt::Label(join),
                ]);
                IrExpr::eseq(seq, temp)
            }
            ExprKind::DerefArray { array, index } => {
                let array = self.build_expr(array);
                let index = self.build_expr(index);
                IrExpr::new(
                    IrExprKind::Array { array: Box::new(array), index: Box::new(index) },
                    base,
                    elements,
                    pos.clone(),
                )
            }
            ExprKind::DerefStruct { base: inner, is_swizzle: true, member_index, .. } => {
                let inner = self.build_expr(inner);
                let components = unpack_swizzle(*member_index, elements);
                IrExpr::new(
                    IrExprKind::Swizzle { base: Box::new(inner), components },
                    base,
                    elements,
                    pos.clone(),
                )
            }
            ExprKind::DerefStruct { base: inner, member_index, .. } => {
                // members occupy the slots after the struct's own
                let offset = 1 + *member_index as u32;
                let inner = self.build_expr(inner);
                let kind = match inner.kind {
                    IrExprKind::Temp(slot) => IrExprKind::Temp(slot + offset),
                    IrExprKind::Memory(slot) => IrExprKind::Memory(slot + offset),
                    _ => {
                        let index = IrExpr::constant(*member_index as i64, ScalarBase::Int, 1, pos.clone());
                        IrExprKind::Array { array: Box::new(inner), index: Box::new(index) }
                    }
                };
                IrExpr::new(kind, base, elements, pos.clone())
            }
            ExprKind::Call { args, index, .. } => {
                let args = args.iter().map(|arg| self.build_expr(arg)).collect();
                IrExpr::new(IrExprKind::Call { index: *index, args }, base, elements, pos.clone())
            }
            ExprKind::Constructor { args, .. } => {
                let parts = args.iter().map(|arg| self.build_expr(arg).convert(base)).collect();
                IrExpr::new(IrExprKind::Construct(parts), base, elements, pos.clone())
            }
            ExprKind::Cast { operand, .. } => self.build_cast(operand, base, elements, pos),
        }
    }

    fn build_cast(&mut self, operand: &Expr, base: ScalarBase, elements: u32, pos: &SourcePos) -> IrExpr {
        let inner = self.build_expr(operand);
        let resized = if inner.elements == elements || base == ScalarBase::None {
            inner
        } else if inner.elements == 1 {
            // splat a scalar, evaluating it once
            let pure = inner.is_storage() || matches!(inner.kind, IrExprKind::Constant(_));
            let inner_base = inner.base;
            if pure {
                IrExpr::new(IrExprKind::Construct(vec![inner; elements as usize]), inner_base, elements, pos.clone())
            } else {
                let temp = self.temp(inner_base, 1, pos);
                let splat = IrExpr::new(
                    IrExprKind::Construct(vec![temp.clone(); elements as usize]),
                    inner_base,
                    elements,
                    pos.clone(),
                );
                IrExpr::eseq(IrStmt::moves(temp, inner), splat)
            }
        } else {
            // analysis only lets casts keep, splat or drop components
            debug_assert!(inner.elements > elements, "cast widens {} to {}", inner.elements, elements);
            let inner_base = inner.base;
            IrExpr::new(
                IrExprKind::Swizzle { base: Box::new(inner), components: (0..elements as u8).collect() },
                inner_base,
                elements,
                pos.clone(),
            )
        };
        resized.convert(base)
    }

    fn build_unary(&mut self, op: Operator, operand: &Expr, pos: &SourcePos) -> IrExpr {
        let value = self.build_expr(operand);
        let (base, elements) = (value.base, value.elements);
        match op {
            Operator::PreIncrement | Operator::PreDecrement => {
                let delta = if op == Operator::PreIncrement { 1 } else { -1 };
                let one = IrExpr::constant(delta, base, elements, pos.clone());
                let (mut setup, place) = split_lvalue(value);
                setup.push(IrStmt::moves(place.clone(), IrExpr::binop(IrBinop::Add, place.clone(), one)));
                IrExpr::eseq(IrStmt::Seq(setup), place)
            }
            Operator::PostIncrement | Operator::PostDecrement => {
                let delta = if op == Operator::PostIncrement { 1 } else { -1 };
                let one = IrExpr::constant(delta, base, elements, pos.clone());
                let snapshot = self.temp(base, elements, pos);
                let (mut setup, place) = split_lvalue(value);
                setup.push(IrStmt::moves(snapshot.clone(), place.clone()));
                setup.push(IrStmt::moves(place.clone(), IrExpr::binop(IrBinop::Add, place, one)));
                IrExpr::eseq(IrStmt::Seq(setup), snapshot)
            }
            Operator::Negate => {
                let zero = IrExpr::constant(0, base, elements, pos.clone());
                IrExpr::binop(IrBinop::Sub, zero, value)
            }
            Operator::Complement => {
                let ones = IrExpr::constant(-1, base, elements, pos.clone());
                IrExpr::binop(IrBinop::Xor, value, ones)
            }
            Operator::Not => {
                let value = value.convert(ScalarBase::Bool);
                let falsehood = self.truth(ScalarBase::Bool, elements, false, pos);
                self.build_compare(IrCond::Eq, value, falsehood, pos)
            }
            _ => value,
        }
    }

    fn build_binary(
        &mut self,
        op: Operator,
        left: &Expr,
        right: &Expr,
        base: ScalarBase,
        elements: u32,
        pos: &SourcePos,
    ) -> IrExpr {
        use Operator::*;

        match op {
            Comma => {
                let left = self.build_expr(left);
                let right = self.build_expr(right);
                IrExpr::eseq(IrStmt::Expr(left), right)
            }
            LogicalAnd => self.build_logical(left, right, true, pos),
            LogicalOr => self.build_logical(left, right, false, pos),
            LessThan | GreaterThan | LessThanOrEqual | GreaterThanOrEqual | Equal | NotEqual => {
                let cond = match op {
                    LessThan => IrCond::Lt,
                    GreaterThan => IrCond::Gt,
                    LessThanOrEqual => IrCond::Le,
                    GreaterThanOrEqual => IrCond::Ge,
                    Equal => IrCond::Eq,
                    _ => IrCond::Ne,
                };
                let left = self.build_expr(left);
                let right = self.build_expr(right);
                self.build_compare(cond, left, right, pos)
            }
            Assign => {
                let value = self.build_expr(right);
                let target = self.build_expr(left);
                self.build_store(target, value, pos)
            }
            _ if op.is_assignment() => {
                let Some(binop) = op.compound_base().and_then(arithmetic) else {
                    return IrExpr::constant(0, base, elements, pos.clone());
                };
                let value = self.build_expr(right);
                let target = self.build_expr(left);
                let (mut setup, place) = split_lvalue(target);
                let temp = self.temp(place.base, place.elements, pos);
                setup.push(IrStmt::moves(temp.clone(), IrExpr::binop(binop, place.clone(), value)));
                setup.push(IrStmt::moves(place, temp.clone()));
                IrExpr::eseq(IrStmt::Seq(setup), temp)
            }
            _ => match arithmetic(op) {
                Some(binop) => {
                    let left = self.build_expr(left);
                    let right = self.build_expr(right);
                    IrExpr::binop(binop, left, right)
                }
                None => IrExpr::constant(0, base, elements, pos.clone()),
            },
        }
    }

    /// `move(t, value); move(target, t)`, yielding `t`.
    fn build_store(&mut self, target: IrExpr, value: IrExpr, pos: &SourcePos) -> IrExpr {
        let (mut setup, place) = split_lvalue(target);
        let temp = self.temp(value.base, value.elements, pos);
        setup.push(IrStmt::moves(temp.clone(), value));
        setup.push(IrStmt::moves(place, temp.clone()));
        IrExpr::eseq(IrStmt::Seq(setup), temp)
    }

    /// A comparison as a boolean value: the if/else template moving `true`
    /// or `false` into a fresh temporary.
    fn build_compare(&mut self, cond: IrCond, left: IrExpr, right: IrExpr, pos: &SourcePos) -> IrExpr {
        let elements = left.elements;
        let (iftrue, iffalse, join) = (self.label(), self.label(), self.label());
        let temp = self.temp(ScalarBase::Bool, elements, pos);
        let seq = IrStmt::Seq(vec![
            IrStmt::cjump(cond, left, right, iftrue, iffalse),
            IrStmt::Label(iftrue),
            IrStmt::moves(temp.clone(), self.truth(ScalarBase::Bool, elements, true, pos)),
            IrStmt::Jump(join),
            IrStmt::Label(iffalse),
            IrStmt::moves(temp.clone(), self.truth(ScalarBase::Bool, elements, false, pos)),
            IrStmt::Label(join),
        ]);
        IrExpr::eseq(seq, temp)
    }

    /// `&&` (`expected == true`) and `||` (`expected == false`): `right` is
    /// only evaluated when `left` has the expected truth value; otherwise
    /// the result is `!expected`.
    fn build_logical(&mut self, left: &Expr, right: &Expr, expected: bool, pos: &SourcePos) -> IrExpr {
        let left = self.build_expr(left).convert(ScalarBase::Bool);
        let elements = left.elements;
        let (eval_right, short, join) = (self.label(), self.label(), self.label());
        let temp = self.temp(ScalarBase::Bool, elements, pos);
        let right = self.build_expr(right).convert(ScalarBase::Bool);
        let seq = IrStmt::Seq(vec![
            IrStmt::cjump(
                IrCond::Eq,
                left,
                self.truth(ScalarBase::Bool, elements, expected, pos),
                eval_right,
                short,
            ),
            IrStmt::Label(eval_right),
            IrStmt::moves(temp.clone(), right),
            IrStmt::Jump(join),
            IrStmt::Label(short),
            IrStmt::moves(temp.clone(), self.truth(ScalarBase::Bool, elements, !expected, pos)),
            IrStmt::Label(join),
        ]);
        IrExpr::eseq(seq, temp)
    }
}

fn arithmetic(op: Operator) -> Option<IrBinop> {
    Some(match op {
        Operator::Multiply => IrBinop::Mul,
        Operator::Divide => IrBinop::Div,
        Operator::Modulo => IrBinop::Mod,
        Operator::Add => IrBinop::Add,
        Operator::Subtract => IrBinop::Sub,
        Operator::LShift => IrBinop::LShift,
        Operator::RShift => IrBinop::RShift,
        Operator::BinaryAnd => IrBinop::And,
        Operator::BinaryXor => IrBinop::Xor,
        Operator::BinaryOr => IrBinop::Or,
        _ => return None,
    })
}
