//! Semantic analysis.
//!
//! One recursive walk over the AST that resolves names, infers a datatype
//! for every expression and rewrites the tree where the language converts
//! implicitly (a cast node is inserted around the converted operand). Every
//! error is recovered from locally by substituting a plausible type or
//! node, so one pass reports as many independent problems as possible and
//! the tree stays well-typed for the IR builder.

pub mod coerce;
pub mod consteval;
pub mod datatype;
pub mod intrinsics;
pub mod scope;

use crate::context::Context;
use crate::frontend::ast::*;
use crate::utils::errors::SemanticErrorKind;
use crate::utils::intern::Symbol;
use crate::utils::location::SourcePos;
use coerce::{coercion_choice, compatible_arg_datatype, CoercionChoice, Compatibility};
use consteval::ConstValue;
use datatype::{
    array_of, datatype_base, datatypes_match, function_of, matrix_of, vector_of, Datatype, DatatypeRef,
    StructMember,
};
use log::{debug, trace};
use scope::{ScopeError, Scopes, SymbolIndex};
use std::mem;
use std::rc::Rc;

/// Array dimension used when the declared one cannot be evaluated.
pub const FALLBACK_ARRAY_DIMENSION: i32 = 16;

const SWIZZLE_SETS: [&str; 2] = ["xyzw", "rgba"];

/// Analyse `program` in place. Returns the number of user function indices
/// handed out, which sizes the IR function table.
pub fn analyze(program: &mut Program, ctx: &mut Context) -> u32 {
    let mut analyzer = Analyzer::new(ctx);
    analyzer.analyze_program(program);
    analyzer.scopes.function_count()
}

/// Component indices selected by a swizzle on a vector of `elements`, or
/// `None` if `text` is not a valid swizzle for it.
///
/// All letters must come from one set (`xyzw` or `rgba`), the swizzle may
/// not be longer than the vector, and every component must exist.
pub fn parse_swizzle(text: &str, elements: u32) -> Option<Vec<u8>> {
    if text.is_empty() || text.len() > elements as usize {
        return None;
    }
    SWIZZLE_SETS.iter().find_map(|set| {
        let components: Option<Vec<u8>> = text.chars().map(|c| set.find(c).map(|i| i as u8)).collect();
        components.filter(|cs| cs.iter().all(|&c| u32::from(c) < elements))
    })
}

/// Pack swizzle components two bits each, first component lowest.
pub fn pack_swizzle(components: &[u8]) -> usize {
    components
        .iter()
        .enumerate()
        .fold(0, |acc, (i, &c)| acc | (usize::from(c) << (2 * i)))
}

/// Inverse of [`pack_swizzle`].
pub fn unpack_swizzle(packed: usize, len: u32) -> Vec<u8> {
    (0..len).map(|i| ((packed >> (2 * i)) & 3) as u8).collect()
}

/// Outcome of overload resolution.
enum CallTarget {
    Function { datatype: DatatypeRef, index: SymbolIndex },
    /// The name is bound to something that is not a function
    NotFunction(DatatypeRef),
    Unresolved,
}

pub struct Analyzer<'c> {
    ctx: &'c mut Context,
    scopes: Scopes,
    loop_depth: u32,
    switch_depth: u32,
    /// Return type of the function being checked: `Some(None)` is `void`
    return_type: Option<Option<DatatypeRef>>,
}

impl<'c> Analyzer<'c> {
    /// A fresh analyzer with the intrinsics registered in an outermost scope
    /// and a global scope opened above it.
    pub fn new(ctx: &'c mut Context) -> Self {
        let mut scopes = Scopes::new();
        scopes.push_scope();
        if let Err(err) = intrinsics::register_intrinsics(ctx, &mut scopes) {
            ctx.error(&SourcePos::builtin(), SemanticErrorKind::DuplicateFunction, err.to_string());
        }
        scopes.push_scope();
        Self { ctx, scopes, loop_depth: 0, switch_depth: 0, return_type: None }
    }

    pub fn analyze_program(&mut self, program: &mut Program) {
        debug!("analysing {} compilation units", program.units.len());
        for unit in &mut program.units {
            if self.ctx.should_stop() {
                break;
            }
            let pos = unit.pos.clone();
            match &mut unit.kind {
                UnitKind::Function(func) => self.check_function(func, &pos),
                UnitKind::Typedef(typedef) => self.check_typedef(typedef, &pos),
                UnitKind::Variables(group) => self.check_var_group(group),
                UnitKind::Struct(decl) => self.check_struct(decl, &pos),
            }
        }
        debug!(
            "analysis finished: {} function(s), {} error(s)",
            self.scopes.function_count(),
            self.ctx.error_count()
        );
    }

    // Declarations

    fn check_function(&mut self, func: &mut FunctionUnit, pos: &SourcePos) {
        let name = func.signature.name;
        let retval = func
            .signature
            .return_type
            .as_ref()
            .map(|dt| self.resolve_type(dt, pos));

        let mut params = Vec::with_capacity(func.signature.params.len());
        for param in &mut func.signature.params {
            let base = self.resolve_type(&param.datatype, &param.pos);
            let datatype = self.apply_array(base, param.array.as_ref(), &param.pos);
            param.datatype = Rc::clone(&datatype);
            params.push(datatype);
        }

        let datatype = function_of(retval.clone(), params.clone(), false);
        let index = match self.scopes.push_function(name, Rc::clone(&datatype), func.body.is_none()) {
            Ok(index) => index,
            Err(ScopeError::DuplicateFunction(index)) => {
                let message = format!("Function '{}' already defined", self.name(name));
                self.ctx.error(pos, SemanticErrorKind::DuplicateFunction, message);
                index
            }
            Err(ScopeError::DuplicateSymbol) => {
                let message = format!("Symbol '{}' already defined", self.name(name));
                self.ctx.error(pos, SemanticErrorKind::DuplicateSymbol, message);
                SymbolIndex::None
            }
        };
        func.index = index;
        func.datatype = Some(datatype);
        func.signature.return_type = retval.clone();

        let Some(body) = func.body.as_mut() else {
            return;
        };
        trace!("checking function '{}' ({})", self.ctx.strings.resolve(name), index);

        self.scopes.enter_function();
        self.return_type = Some(retval);
        for (param, datatype) in func.signature.params.iter().zip(params) {
            self.declare_variable(param.name, datatype, &param.pos);
        }
        self.check_stmt(body);
        func.local_slots = self.scopes.leave_function();
        self.return_type = None;

        debug_assert_eq!(self.loop_depth, 0);
        debug_assert_eq!(self.switch_depth, 0);
    }

    fn check_typedef(&mut self, typedef: &mut Typedef, pos: &SourcePos) {
        let base = self.resolve_type(&typedef.base, pos);
        let datatype = self.apply_array(base, typedef.array.as_ref(), pos);
        if self.scopes.push_usertype(typedef.name, Rc::clone(&datatype)).is_err() {
            let message = format!("Symbol '{}' already defined", self.name(typedef.name));
            self.ctx.error(pos, SemanticErrorKind::DuplicateSymbol, message);
        }
        typedef.datatype = Some(datatype);
    }

    fn check_struct(&mut self, decl: &mut StructDeclaration, pos: &SourcePos) {
        let mut members: Vec<StructMember> = Vec::with_capacity(decl.members.len());
        for member in &decl.members {
            let base = self.resolve_type(&member.base, &member.pos);
            let datatype = self.apply_array(base, member.array.as_ref(), &member.pos);
            if members.iter().any(|m| m.name == member.name) {
                let message = format!("Struct member '{}' already defined", self.name(member.name));
                self.ctx.error(&member.pos, SemanticErrorKind::DuplicateSymbol, message);
                continue;
            }
            members.push(StructMember { name: member.name, datatype });
        }

        let datatype = Rc::new(Datatype::Struct { name: Some(decl.name), members });
        if self.scopes.push_usertype(decl.name, Rc::clone(&datatype)).is_err() {
            let message = format!("Symbol '{}' already defined", self.name(decl.name));
            self.ctx.error(pos, SemanticErrorKind::DuplicateSymbol, message);
        }
        decl.datatype = Some(datatype);

        if let Some(group) = decl.variables.as_mut() {
            self.check_var_group(group);
        }
    }

    fn check_var_group(&mut self, group: &mut VarDeclGroup) {
        for decl in &mut group.decls {
            let base = self.resolve_type(&group.base, &decl.pos);
            let datatype = self.apply_array(base, decl.array.as_ref(), &decl.pos);
            if let Some(init) = decl.initializer.as_mut() {
                let init_type = self.check_expr(init);
                self.add_type_coercion(None, &datatype, init, &init_type);
            }
            decl.index = self.declare_variable(decl.name, Rc::clone(&datatype), &decl.pos);
            decl.datatype = Some(datatype);
        }
    }

    fn declare_variable(&mut self, name: Symbol, datatype: DatatypeRef, pos: &SourcePos) -> SymbolIndex {
        match self.scopes.push_variable(name, datatype) {
            Ok(index) => index,
            Err(_) => {
                let message = format!("Symbol '{}' already defined", self.name(name));
                self.ctx.error(pos, SemanticErrorKind::DuplicateSymbol, message);
                SymbolIndex::None
            }
        }
    }

    /// Reduce a declared type; an unknown user type becomes `int`.
    fn resolve_type(&mut self, datatype: &DatatypeRef, pos: &SourcePos) -> DatatypeRef {
        let reduced = self.scopes.reduce(datatype);
        match &*reduced {
            Datatype::User { name, .. } => {
                let message = format!("Unknown type '{}'", self.name(*name));
                self.ctx.error(pos, SemanticErrorKind::UnknownType, message);
                Rc::clone(&self.ctx.types.int)
            }
            Datatype::Buffer(inner) if matches!(**inner, Datatype::User { .. }) => {
                let inner = Rc::clone(inner);
                Rc::new(Datatype::Buffer(self.resolve_type(&inner, pos)))
            }
            _ => reduced,
        }
    }

    fn apply_array(&mut self, base: DatatypeRef, array: Option<&ArraySize>, pos: &SourcePos) -> DatatypeRef {
        match array {
            None => base,
            Some(ArraySize::Unsized) => array_of(&base, -1),
            Some(ArraySize::Sized(expr)) => {
                let elements = self.array_dimension(expr, pos);
                array_of(&base, elements)
            }
        }
    }

    fn array_dimension(&mut self, expr: &Expr, pos: &SourcePos) -> i32 {
        let (kind, message) = match consteval::evaluate(expr) {
            Some(ConstValue::Int(n)) if n >= 0 => return n.min(i64::from(i32::MAX)) as i32,
            Some(ConstValue::Int(_)) => {
                (SemanticErrorKind::ArrayDimensionNegative, "Array dimensions must be positive")
            }
            Some(ConstValue::Float(_)) => {
                (SemanticErrorKind::ArrayDimensionNotInteger, "Array dimensions must be integers")
            }
            None => (SemanticErrorKind::ArrayDimensionNotConstant, "Array dimensions must be constant"),
        };
        self.ctx.error(pos, kind, message);
        FALLBACK_ARRAY_DIMENSION
    }

    // Statements

    fn check_stmt(&mut self, stmt: &mut Stmt) {
        if self.ctx.should_stop() {
            return;
        }
        let pos = stmt.pos.clone();
        match &mut stmt.kind {
            StmtKind::Empty | StmtKind::Discard => {}
            StmtKind::Break => {
                if self.loop_depth == 0 && self.switch_depth == 0 {
                    self.ctx.error(
                        &pos,
                        SemanticErrorKind::BreakOutsideLoopOrSwitch,
                        "Break outside loop or switch",
                    );
                }
            }
            StmtKind::Continue => {
                if self.loop_depth == 0 {
                    self.ctx.error(&pos, SemanticErrorKind::ContinueOutsideLoop, "Continue outside loop");
                }
            }
            StmtKind::Block(stmts) => {
                self.scopes.push_scope();
                for stmt in stmts.iter_mut() {
                    self.check_stmt(stmt);
                }
                self.scopes.pop_scope();
            }
            StmtKind::Expression(expr) => {
                self.check_expr(expr);
            }
            StmtKind::If { cond, then_branch, else_branch } => {
                self.scopes.push_scope();
                self.check_condition(cond);
                self.check_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_stmt(else_branch);
                }
                self.scopes.pop_scope();
            }
            StmtKind::Switch { cond, cases } => {
                self.switch_depth += 1;
                self.scopes.push_scope();
                let cond_type = self.check_expr(cond);
                self.require_integer(&cond_type, &cond.pos);
                self.check_cases(cases, &cond_type);
                self.scopes.pop_scope();
                self.switch_depth -= 1;
            }
            StmtKind::For { init, cond, step, body } => {
                self.loop_depth += 1;
                self.scopes.push_scope();
                if let Some(init) = init {
                    self.check_stmt(init);
                }
                if let Some(cond) = cond {
                    self.check_condition(cond);
                }
                if let Some(step) = step {
                    self.check_expr(step);
                }
                self.check_stmt(body);
                self.scopes.pop_scope();
                self.loop_depth -= 1;
            }
            StmtKind::Do { body, cond } => {
                self.loop_depth += 1;
                self.scopes.push_scope();
                self.check_stmt(body);
                self.check_condition(cond);
                self.scopes.pop_scope();
                self.loop_depth -= 1;
            }
            StmtKind::While { cond, body } => {
                self.loop_depth += 1;
                self.scopes.push_scope();
                self.check_condition(cond);
                self.check_stmt(body);
                self.scopes.pop_scope();
                self.loop_depth -= 1;
            }
            StmtKind::Return(value) => self.check_return(value.as_mut(), &pos),
            StmtKind::Typedef(typedef) => self.check_typedef(typedef, &pos),
            StmtKind::VarDecl(group) => self.check_var_group(group),
            StmtKind::Struct(decl) => self.check_struct(decl, &pos),
        }
    }

    /// Controlling expressions only need a truth value, any numeric type.
    fn check_condition(&mut self, cond: &mut Expr) {
        let datatype = self.check_expr(cond);
        self.require_numeric(&datatype, &cond.pos);
    }

    fn check_cases(&mut self, cases: &mut [SwitchCase], cond_type: &DatatypeRef) {
        let mut seen_default = false;
        for case in cases.iter_mut() {
            match case.value.as_mut() {
                Some(value) => {
                    let mut value_type = self.check_expr(value);
                    if consteval::evaluate(value).is_none() {
                        self.ctx.error(
                            &value.pos,
                            SemanticErrorKind::CaseNotConstant,
                            "Case value must be a constant",
                        );
                        let mut zero = Expr::int_lit(0, value.pos.clone());
                        zero.datatype = Some(Rc::clone(&self.ctx.types.int));
                        *value = zero;
                        value_type = Rc::clone(&self.ctx.types.int);
                    }
                    self.add_type_coercion(None, cond_type, value, &value_type);
                }
                None if seen_default => {
                    self.ctx.error(
                        &case.pos,
                        SemanticErrorKind::DuplicateDefault,
                        "Multiple default labels in one switch",
                    );
                }
                None => seen_default = true,
            }
            for stmt in case.body.iter_mut() {
                self.check_stmt(stmt);
            }
        }
    }

    fn check_return(&mut self, value: Option<&mut Expr>, pos: &SourcePos) {
        let expected = match &self.return_type {
            Some(expected) => expected.clone(),
            None => return,
        };
        match (expected, value) {
            (Some(expected), Some(value)) => {
                let actual = self.check_expr(value);
                self.add_type_coercion(None, &expected, value, &actual);
            }
            (None, Some(value)) => {
                self.check_expr(value);
                self.ctx.error(
                    pos,
                    SemanticErrorKind::ReturnTypeMismatch,
                    "Return with a value in a function returning void",
                );
            }
            (Some(_), None) => {
                self.ctx.error(
                    pos,
                    SemanticErrorKind::ReturnTypeMismatch,
                    "Return without a value in a function returning a value",
                );
            }
            (None, None) => {}
        }
    }

    // Expressions

    /// Infer, record and return the datatype of `expr`. The result is
    /// always reduced.
    fn check_expr(&mut self, expr: &mut Expr) -> DatatypeRef {
        let datatype = if self.ctx.should_stop() {
            Rc::clone(&self.ctx.types.int)
        } else {
            self.check_expr_kind(&mut expr.kind, &expr.pos)
        };
        expr.datatype = Some(Rc::clone(&datatype));
        datatype
    }

    fn check_expr_kind(&mut self, kind: &mut ExprKind, pos: &SourcePos) -> DatatypeRef {
        match kind {
            ExprKind::IntLiteral(_) => Rc::clone(&self.ctx.types.int),
            ExprKind::UintLiteral(_) => Rc::clone(&self.ctx.types.uint),
            ExprKind::FloatLiteral(_) => Rc::clone(&self.ctx.types.float),
            ExprKind::BoolLiteral(_) => Rc::clone(&self.ctx.types.bool_),
            ExprKind::StringLiteral(_) => Rc::clone(&self.ctx.types.string),
            ExprKind::Identifier { name, index } => match self.scopes.find_variable(*name) {
                Some((datatype, found)) => {
                    *index = found;
                    self.scopes.reduce(&datatype)
                }
                None => {
                    let message = format!("Unknown identifier '{}'", self.name(*name));
                    self.ctx.error(pos, SemanticErrorKind::UnknownIdentifier, message);
                    Rc::clone(&self.ctx.types.int)
                }
            },
            ExprKind::Unary { op, operand } => {
                let op = *op;
                let datatype = self.check_expr(operand);
                match op {
                    Operator::Complement => {
                        self.require_integer(&datatype, pos);
                        datatype
                    }
                    Operator::Not => {
                        self.require_boolean(&datatype, pos);
                        self.bool_like(&datatype)
                    }
                    _ => {
                        self.require_numeric(&datatype, pos);
                        datatype
                    }
                }
            }
            ExprKind::Binary { op, left, right } => self.check_binary(*op, left, right, pos),
            ExprKind::Ternary { cond, left, right, .. } => {
                self.check_condition(cond);
                let ltype = self.check_expr(left);
                let rtype = self.check_expr(right);
                self.add_type_coercion(Some(&mut **left), &ltype, right, &rtype)
            }
            ExprKind::DerefArray { array, index } => {
                let array_type = self.check_expr(array);
                let index_type = self.check_expr(index);
                if index_type.is_integer() {
                    // already an index
                } else if coerce::is_numeric(&index_type) && index_type.is_scalar() {
                    let int = Rc::clone(&self.ctx.types.int);
                    self.add_type_coercion(None, &int, index, &index_type);
                } else {
                    self.ctx.error(pos, SemanticErrorKind::ExpectedIntegerType, "Expected integer index");
                }
                match &*array_type {
                    Datatype::Vector { base, .. } => Rc::clone(base),
                    Datatype::Matrix { base, columns, .. } => vector_of(base, *columns),
                    Datatype::Array { base, .. } | Datatype::Buffer(base) => self.scopes.reduce(base),
                    _ => {
                        self.ctx.error(pos, SemanticErrorKind::ExpectedArray, "Expected array");
                        Rc::clone(&self.ctx.types.int)
                    }
                }
            }
            ExprKind::DerefStruct { base, member, is_swizzle, member_index } => {
                let base_type = self.check_expr(base);
                self.check_member(&base_type, member, is_swizzle, member_index, pos)
            }
            ExprKind::Call { name, args, index, signature } => {
                let arg_types: Vec<DatatypeRef> = args.iter_mut().map(|arg| self.check_expr(arg)).collect();
                match self.match_func_to_call(*name, &arg_types, pos) {
                    CallTarget::Function { datatype, index: found } => {
                        *index = found;
                        *signature = Some(Rc::clone(&datatype));
                        let Datatype::Function { retval, params, .. } = &*datatype else {
                            return Rc::clone(&self.ctx.types.int);
                        };
                        for ((arg, arg_type), param) in args.iter_mut().zip(&arg_types).zip(params) {
                            self.add_type_coercion(None, param, arg, arg_type);
                        }
                        match retval {
                            Some(retval) => Rc::clone(retval),
                            None => Rc::clone(&self.ctx.types.none),
                        }
                    }
                    CallTarget::NotFunction(_) => {
                        let message = format!("'{}' is not a function", self.name(*name));
                        self.ctx.error(pos, SemanticErrorKind::ExpectedFunction, message);
                        Rc::clone(&self.ctx.types.int)
                    }
                    CallTarget::Unresolved => Rc::clone(&self.ctx.types.int),
                }
            }
            ExprKind::Constructor { target, args } => {
                let resolved = self.resolve_type(target, pos);
                *target = Rc::clone(&resolved);
                self.check_constructor(&resolved, args, pos);
                resolved
            }
            ExprKind::Cast { target, operand, .. } => {
                let resolved = self.resolve_type(target, pos);
                *target = Rc::clone(&resolved);
                let operand_type = self.check_expr(operand);
                // the operand arrives already in the target's shape
                self.add_type_coercion(None, &resolved, operand, &operand_type);
                resolved
            }
        }
    }

    fn check_binary(&mut self, op: Operator, left: &mut Expr, right: &mut Expr, pos: &SourcePos) -> DatatypeRef {
        use Operator::*;

        let ltype = self.check_expr(left);
        let rtype = self.check_expr(right);
        match op {
            Comma => rtype,
            Multiply | Divide | Add | Subtract => {
                self.require_numeric(&ltype, pos);
                self.require_numeric(&rtype, pos);
                self.add_type_coercion(Some(left), &ltype, right, &rtype)
            }
            Modulo | LShift | RShift | BinaryAnd | BinaryXor | BinaryOr => {
                self.require_integer(&ltype, pos);
                self.require_integer(&rtype, pos);
                self.add_type_coercion(Some(left), &ltype, right, &rtype)
            }
            LessThan | GreaterThan | LessThanOrEqual | GreaterThanOrEqual | Equal | NotEqual => {
                self.require_numeric(&ltype, pos);
                self.require_numeric(&rtype, pos);
                let unified = self.add_type_coercion(Some(left), &ltype, right, &rtype);
                self.bool_like(&unified)
            }
            LogicalAnd | LogicalOr => {
                self.require_boolean(&ltype, pos);
                self.require_boolean(&rtype, pos);
                let unified = self.add_type_coercion(Some(left), &ltype, right, &rtype);
                self.bool_like(&unified)
            }
            Assign => {
                self.add_type_coercion(None, &ltype, right, &rtype);
                ltype
            }
            MulAssign | DivAssign | AddAssign | SubAssign => {
                self.require_numeric(&ltype, pos);
                self.require_numeric(&rtype, pos);
                self.add_type_coercion(None, &ltype, right, &rtype);
                ltype
            }
            ModAssign | LShiftAssign | RShiftAssign | AndAssign | XorAssign | OrAssign => {
                self.require_integer(&ltype, pos);
                self.require_integer(&rtype, pos);
                self.add_type_coercion(None, &ltype, right, &rtype);
                ltype
            }
            _ => {
                debug_assert!(op.is_binary(), "{:?} in a binary node", op);
                ltype
            }
        }
    }

    fn check_member(
        &mut self,
        base_type: &DatatypeRef,
        member: &mut Symbol,
        is_swizzle: &mut bool,
        member_index: &mut usize,
        pos: &SourcePos,
    ) -> DatatypeRef {
        match &**base_type {
            Datatype::Vector { base, elements } => {
                *is_swizzle = true;
                let text = self.ctx.strings.resolve(*member).to_string();
                let components = match parse_swizzle(&text, *elements) {
                    Some(components) => components,
                    None => {
                        let message = format!("Invalid swizzle '{}'", text);
                        self.ctx.error(pos, SemanticErrorKind::InvalidSwizzle, message);
                        *member = self.ctx.strings.intern(SWIZZLE_SETS[0]);
                        vec![0, 1, 2, 3]
                    }
                };
                *member_index = pack_swizzle(&components);
                match components.len() {
                    1 => Rc::clone(base),
                    n => vector_of(base, n as u32),
                }
            }
            Datatype::Struct { members, .. } => {
                match members.iter().position(|m| m.name == *member) {
                    Some(i) => {
                        *member_index = i;
                        self.scopes.reduce(&members[i].datatype)
                    }
                    None => {
                        let message = format!("Struct has no member named '{}'", self.name(*member));
                        self.ctx.error(pos, SemanticErrorKind::UnknownStructMember, message);
                        Rc::clone(&self.ctx.types.int)
                    }
                }
            }
            _ => {
                self.ctx.error(pos, SemanticErrorKind::ExpectedStruct, "Expected a struct or vector");
                Rc::clone(&self.ctx.types.int)
            }
        }
    }

    /// `float4(float3(...), 1.0)`: each vector or matrix argument fills as
    /// many component slots as it has elements.
    fn check_constructor(&mut self, target: &DatatypeRef, args: &mut [Expr], pos: &SourcePos) {
        let (base, expected) = match &**target {
            Datatype::Struct { members, .. } => {
                let members: Vec<DatatypeRef> = members.iter().map(|m| Rc::clone(&m.datatype)).collect();
                for (arg, member) in args.iter_mut().zip(&members) {
                    let arg_type = self.check_expr(arg);
                    self.add_type_coercion(None, member, arg, &arg_type);
                }
                for arg in args.iter_mut().skip(members.len()) {
                    self.check_expr(arg);
                }
                self.check_slot_count(args.len() as u32, members.len() as u32, pos);
                return;
            }
            Datatype::Vector { base, elements } => (Rc::clone(base), *elements),
            Datatype::Matrix { base, rows, columns } => (Rc::clone(base), rows * columns),
            scalar if scalar.is_scalar() => (Rc::clone(target), 1),
            _ => {
                let message = format!("Cannot construct '{}'", target.display(&self.ctx.strings));
                self.ctx.error(pos, SemanticErrorKind::ExpectedNumericType, message);
                for arg in args.iter_mut() {
                    self.check_expr(arg);
                }
                return;
            }
        };

        let mut slots = 0;
        for arg in args.iter_mut() {
            let arg_type = self.check_expr(arg);
            let (slot_type, used) = match &*arg_type {
                Datatype::Vector { elements, .. } => (vector_of(&base, *elements), *elements),
                Datatype::Matrix { rows, columns, .. } => (matrix_of(&base, *rows, *columns), rows * columns),
                _ => (Rc::clone(&base), 1),
            };
            self.add_type_coercion(None, &slot_type, arg, &arg_type);
            slots += used;
        }
        self.check_slot_count(slots, expected, pos);
    }

    fn check_slot_count(&mut self, supplied: u32, expected: u32, pos: &SourcePos) {
        if supplied < expected {
            let message = format!("Too few arguments: expected {}, got {}", expected, supplied);
            self.ctx.error(pos, SemanticErrorKind::TooFewArguments, message);
        } else if supplied > expected {
            let message = format!("Too many arguments: expected {}, got {}", expected, supplied);
            self.ctx.error(pos, SemanticErrorKind::TooManyArguments, message);
        }
    }

    /// Pick the overload of `name` that best fits `args`.
    ///
    /// Every visible entry under the name is scored by summing the
    /// per-argument [`Compatibility`]; one incompatible argument or a count
    /// mismatch disqualifies the candidate. A perfect score wins outright.
    /// Otherwise the first candidate with the highest score is kept, and a
    /// tie on that score makes the call ambiguous. A non-function entry
    /// under the name hides the overloads entirely.
    fn match_func_to_call(&mut self, name: Symbol, args: &[DatatypeRef], pos: &SourcePos) -> CallTarget {
        let perfect = args.len() as u32 * Compatibility::Perfect.score();
        let mut best: Option<(DatatypeRef, SymbolIndex)> = None;
        let mut best_score = 0;
        let mut matches = 0;

        for entry in self.scopes.overloads(name) {
            let datatype = self.scopes.reduce(&entry.datatype);
            if !datatype.is_function() {
                return CallTarget::NotFunction(datatype);
            }
            let Datatype::Function { params, .. } = &*datatype else {
                continue;
            };
            if params.len() != args.len() {
                continue;
            }
            let score = args.iter().zip(params).try_fold(0, |acc, (arg, param)| {
                match compatible_arg_datatype(arg, param) {
                    Compatibility::Incompatible => None,
                    fit => Some(acc + fit.score()),
                }
            });
            let Some(score) = score else {
                continue;
            };

            if score == perfect {
                best = Some((Rc::clone(&datatype), entry.index));
                matches = 1;
                break;
            } else if score > best_score {
                best = Some((Rc::clone(&datatype), entry.index));
                best_score = score;
                matches = 1;
            } else if score == best_score {
                matches += 1;
            }
        }

        if matches > 1 {
            let message = format!("Ambiguous function call to '{}'", self.name(name));
            self.ctx.error(pos, SemanticErrorKind::AmbiguousFunctionCall, message);
        }
        match best {
            Some((datatype, index)) => {
                trace!("call to '{}' resolved to {}", self.ctx.strings.resolve(name), index);
                CallTarget::Function { datatype, index }
            }
            None => {
                let message = format!("No matching function named '{}'", self.name(name));
                self.ctx.error(pos, SemanticErrorKind::NoMatchingFunction, message);
                CallTarget::Unresolved
            }
        }
    }

    /// Unify the operand types of a binary operation, wrapping the converted
    /// side in an implicit cast.
    ///
    /// `left == None` marks a fixed target (an assignment destination, a
    /// parameter, a declared variable): only `right` may change. When no
    /// conversion exists, or one would have to add components (see
    /// [`coerce::shape_convertible`]), `right` is replaced by `0` cast to
    /// the left type.
    fn add_type_coercion(
        &mut self,
        left: Option<&mut Expr>,
        ltype: &DatatypeRef,
        right: &mut Expr,
        rtype: &DatatypeRef,
    ) -> DatatypeRef {
        let l = self.scopes.reduce(ltype);
        let r = self.scopes.reduce(rtype);
        if datatypes_match(&l, &r) {
            return l;
        }

        let mut target = match coercion_choice(&l, &r, left.is_none()) {
            CoercionChoice::Left => Rc::clone(&l),
            CoercionChoice::Right => Rc::clone(&r),
            CoercionChoice::Neither => return self.reject_coercion(l, &r, right),
        };

        // two vectors meet at the shorter length
        if let (Datatype::Vector { elements: le, .. }, Datatype::Vector { elements: re, .. }) = (&*l, &*r) {
            if le != re && left.is_some() {
                target = vector_of(&datatype_base(&target), (*le).min(*re));
            }
        }

        let left_fits = left.is_none() || coerce::shape_convertible(&l, &target);
        if !left_fits || !coerce::shape_convertible(&r, &target) {
            return self.reject_coercion(l, &r, right);
        }
        if coerce::truncates(&r, &target) || (left.is_some() && coerce::truncates(&l, &target)) {
            self.ctx.warning(&right.pos, "implicit truncation of vector type");
        }

        if let Some(left) = left {
            if !datatypes_match(&l, &target) {
                self.insert_cast(left, Rc::clone(&target));
            }
        }
        if !datatypes_match(&r, &target) {
            self.insert_cast(right, Rc::clone(&target));
        }
        target
    }

    /// Report that `r` cannot become `l` and replace `right` by `0` cast to
    /// `l`.
    fn reject_coercion(&mut self, l: DatatypeRef, r: &DatatypeRef, right: &mut Expr) -> DatatypeRef {
        let message = format!(
            "Incompatible data types '{}' and '{}'",
            l.display(&self.ctx.strings),
            r.display(&self.ctx.strings)
        );
        self.ctx.error(&right.pos, SemanticErrorKind::IncompatibleTypes, message);
        let mut zero = Expr::int_lit(0, right.pos.clone());
        zero.datatype = Some(Rc::clone(&self.ctx.types.int));
        *right = zero;
        self.insert_cast(right, Rc::clone(&l));
        l
    }

    fn insert_cast(&mut self, expr: &mut Expr, target: DatatypeRef) {
        self.ctx.count_node();
        let pos = expr.pos.clone();
        let operand = mem::replace(expr, Expr::new(ExprKind::BoolLiteral(false), pos.clone()));
        *expr = Expr {
            kind: ExprKind::Cast { target: Rc::clone(&target), operand: Box::new(operand), implicit: true },
            pos,
            datatype: Some(target),
        };
    }

    // Operand requirements. Vectors and matrices are judged by their
    // element type.

    fn require_numeric(&mut self, datatype: &DatatypeRef, pos: &SourcePos) -> bool {
        let ok = coerce::is_numeric(datatype);
        if !ok {
            self.ctx.error(pos, SemanticErrorKind::ExpectedNumericType, "Expected numeric type");
        }
        ok
    }

    fn require_integer(&mut self, datatype: &DatatypeRef, pos: &SourcePos) -> bool {
        let ok = datatype_base(datatype).is_integer();
        if !ok {
            self.ctx.error(pos, SemanticErrorKind::ExpectedIntegerType, "Expected integer type");
        }
        ok
    }

    fn require_boolean(&mut self, datatype: &DatatypeRef, pos: &SourcePos) -> bool {
        let base = datatype_base(datatype);
        let ok = matches!(*base, Datatype::Bool) || base.is_integer();
        if !ok {
            self.ctx.error(pos, SemanticErrorKind::ExpectedBooleanType, "Expected boolean type");
        }
        ok
    }

    /// One truth value per component of `datatype`.
    fn bool_like(&self, datatype: &DatatypeRef) -> DatatypeRef {
        let bool_ = &self.ctx.types.bool_;
        match &**datatype {
            Datatype::Vector { elements, .. } => vector_of(bool_, *elements),
            Datatype::Matrix { rows, columns, .. } => matrix_of(bool_, *rows, *columns),
            _ => Rc::clone(bool_),
        }
    }

    fn name(&self, sym: Symbol) -> String {
        self.ctx.strings.resolve(sym).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parse_into;
    use crate::utils::errors::Diagnostic;

    fn analyze_source(source: &str) -> (Program, Context) {
        let mut ctx = Context::new();
        let mut program = parse_into(source, "test.hlsl", &mut ctx);
        assert_eq!(ctx.error_count(), 0, "syntax errors: {:?}", ctx.diagnostics());
        analyze(&mut program, &mut ctx);
        (program, ctx)
    }

    fn error_kinds(ctx: &Context) -> Vec<SemanticErrorKind> {
        ctx.diagnostics()
            .iter()
            .filter(|d| d.is_error())
            .filter_map(|d: &Diagnostic| d.kind)
            .collect()
    }

    fn stmt_at<'p>(program: &'p Program, name: &str, ctx: &Context, i: usize) -> &'p Stmt {
        let sym = ctx.strings.get(name).unwrap();
        let func = program.find_function(sym).unwrap();
        match &func.body.as_ref().unwrap().kind {
            StmtKind::Block(stmts) => &stmts[i],
            _ => panic!("Expected block"),
        }
    }

    fn initializer<'p>(stmt: &'p Stmt) -> &'p Expr {
        match &stmt.kind {
            StmtKind::VarDecl(group) => group.decls[0].initializer.as_ref().unwrap(),
            other => panic!("Expected declaration, got {:?}", other),
        }
    }

    fn decl_type(stmt: &Stmt, ctx: &Context) -> String {
        match &stmt.kind {
            StmtKind::VarDecl(group) => group.decls[0].datatype.as_ref().unwrap().display(&ctx.strings).to_string(),
            other => panic!("Expected declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_overload_prefers_perfect_match() {
        let source = r#"
            float f(float a) { return a; }
            int f(int a) { return a; }
            void main() { float r = f(1.0); int q = f(3); }
        "#;
        let (program, ctx) = analyze_source(source);
        assert!(error_kinds(&ctx).is_empty(), "{:?}", ctx.diagnostics());
        let call = initializer(stmt_at(&program, "main", &ctx, 0));
        match &call.kind {
            ExprKind::Call { index, .. } => assert_eq!(*index, SymbolIndex::Function(0)),
            other => panic!("Expected call, got {:?}", other),
        }
        let call = initializer(stmt_at(&program, "main", &ctx, 1));
        match &call.kind {
            ExprKind::Call { index, .. } => assert_eq!(*index, SymbolIndex::Function(1)),
            other => panic!("Expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_single_overload_inserts_cast() {
        let source = "float f(float a) { return a; } void main() { float r = f(3); }";
        let (program, ctx) = analyze_source(source);
        assert!(error_kinds(&ctx).is_empty(), "{:?}", ctx.diagnostics());
        match &initializer(stmt_at(&program, "main", &ctx, 0)).kind {
            ExprKind::Call { args, .. } => {
                assert!(matches!(args[0].kind, ExprKind::Cast { implicit: true, .. }));
                assert_eq!(args[0].datatype().unwrap().display(&ctx.strings).to_string(), "float");
            }
            other => panic!("Expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_ambiguous_call() {
        let source = r#"
            float f(float2 a) { return 1.0; }
            float f(int2 a) { return 2.0; }
            void main() { half2 x = half2(1, 2); float r = f(x); }
        "#;
        let (_, ctx) = analyze_source(source);
        assert_eq!(error_kinds(&ctx), vec![SemanticErrorKind::AmbiguousFunctionCall]);

        let source = r#"
            float f(float2 a) { return 1.0; }
            float f(half2 a) { return 2.0; }
            float f(int2 a) { return 3.0; }
            void main() { half2 x = half2(1, 2); float r = f(x); }
        "#;
        let (_, ctx) = analyze_source(source);
        assert!(error_kinds(&ctx).is_empty(), "{:?}", ctx.diagnostics());
    }

    #[test]
    fn test_no_matching_function_and_shadowing() {
        let (_, ctx) = analyze_source("float f(float2 a) { return 1.0; } void main() { float r = f(1, 2); }");
        assert_eq!(error_kinds(&ctx), vec![SemanticErrorKind::NoMatchingFunction]);

        let (_, ctx) = analyze_source("float f(float a) { return a; } void main() { float f = 1; f(2.0); }");
        assert_eq!(error_kinds(&ctx), vec![SemanticErrorKind::ExpectedFunction]);
    }

    #[test]
    fn test_zero_argument_call_resolves() {
        let (_, ctx) = analyze_source("float one() { return 1.0; } void main() { float r = one(); }");
        assert!(error_kinds(&ctx).is_empty(), "{:?}", ctx.diagnostics());
    }

    #[test]
    fn test_intrinsic_call() {
        let source = "float4 main(float3 n : NORMAL) : COLOR { float l = dot(n, n); return float4(normalize(n), l); }";
        let (_, ctx) = analyze_source(source);
        assert!(error_kinds(&ctx).is_empty(), "{:?}", ctx.diagnostics());
    }

    #[test]
    fn test_swizzles() {
        let source = r#"
            void main() {
                float4 v = float4(1, 2, 3, 4);
                float4 a = v.xyzw;
                float4 b = v.rgba;
                float2 c = v.xy;
                float3 d = v.zzz;
                float e = v.w;
            }
        "#;
        let (program, ctx) = analyze_source(source);
        assert!(error_kinds(&ctx).is_empty(), "{:?}", ctx.diagnostics());
        let expected = ["float4", "float4", "float2", "float3", "float"];
        for (i, name) in expected.iter().enumerate() {
            let init = initializer(stmt_at(&program, "main", &ctx, i + 1));
            assert_eq!(init.datatype().unwrap().display(&ctx.strings).to_string(), *name);
        }
    }

    #[test]
    fn test_invalid_swizzle_falls_back() {
        let source = "void main() { float4 v = float4(1, 2, 3, 4); float4 a = v.xg; float4 b = v.xyzzy; }";
        let (program, ctx) = analyze_source(source);
        assert_eq!(
            error_kinds(&ctx),
            vec![SemanticErrorKind::InvalidSwizzle, SemanticErrorKind::InvalidSwizzle]
        );
        match &initializer(stmt_at(&program, "main", &ctx, 1)).kind {
            ExprKind::DerefStruct { member, is_swizzle, .. } => {
                assert!(*is_swizzle);
                assert_eq!(ctx.strings.resolve(*member), "xyzw");
            }
            other => panic!("Expected swizzle, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_swizzle() {
        assert_eq!(parse_swizzle("wzyx", 4), Some(vec![3, 2, 1, 0]));
        assert_eq!(parse_swizzle("bg", 3), Some(vec![2, 1]));
        assert_eq!(parse_swizzle("ba", 3), None);
        assert_eq!(parse_swizzle("z", 2), None);
        assert_eq!(parse_swizzle("xg", 4), None);
        assert_eq!(parse_swizzle("", 4), None);
        let packed = pack_swizzle(&[3, 0, 2]);
        assert_eq!(unpack_swizzle(packed, 3), vec![3, 0, 2]);
    }

    #[test]
    fn test_array_dimensions() {
        let source = "void main() { int n = 3; int a[2+3]; int b[n]; int c[-1]; int d[2.5]; }";
        let (program, ctx) = analyze_source(source);
        assert_eq!(
            error_kinds(&ctx),
            vec![
                SemanticErrorKind::ArrayDimensionNotConstant,
                SemanticErrorKind::ArrayDimensionNegative,
                SemanticErrorKind::ArrayDimensionNotInteger,
            ]
        );
        assert_eq!(decl_type(stmt_at(&program, "main", &ctx, 1), &ctx), "int[5]");
        assert_eq!(decl_type(stmt_at(&program, "main", &ctx, 2), &ctx), "int[16]");
        assert_eq!(decl_type(stmt_at(&program, "main", &ctx, 3), &ctx), "int[16]");
    }

    #[test]
    fn test_constructor_slots() {
        let source = r#"
            void main() {
                float3 v = float3(1, 2, 3);
                float4 a = float4(v, 1.0);
                float4 b = float4(v);
                float4 c = float4(v, v);
            }
        "#;
        let (_, ctx) = analyze_source(source);
        assert_eq!(
            error_kinds(&ctx),
            vec![SemanticErrorKind::TooFewArguments, SemanticErrorKind::TooManyArguments]
        );
    }

    #[test]
    fn test_struct_members() {
        let source = r#"
            struct Light { float3 dir; float intensity; };
            float main(Light l) { float x = l.intensity; return l.missing; }
        "#;
        let (program, ctx) = analyze_source(source);
        assert_eq!(error_kinds(&ctx), vec![SemanticErrorKind::UnknownStructMember]);
        match &initializer(stmt_at(&program, "main", &ctx, 0)).kind {
            ExprKind::DerefStruct { member_index, is_swizzle, .. } => {
                assert_eq!(*member_index, 1);
                assert!(!*is_swizzle);
            }
            other => panic!("Expected member access, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_identifier_defaults_to_int() {
        let (program, ctx) = analyze_source("void main() { float x = y + 1; }");
        assert_eq!(error_kinds(&ctx), vec![SemanticErrorKind::UnknownIdentifier]);
        let init = initializer(stmt_at(&program, "main", &ctx, 0));
        // int + int converted to the float destination
        assert!(matches!(init.kind, ExprKind::Cast { implicit: true, .. }));
    }

    #[test]
    fn test_break_continue_placement() {
        let source = r#"
            void main() {
                break;
                continue;
                for (int i = 0; i < 4; i++) { if (i == 1) continue; break; }
                switch (1) { case 0: break; default: break; }
            }
        "#;
        let (_, ctx) = analyze_source(source);
        assert_eq!(
            error_kinds(&ctx),
            vec![SemanticErrorKind::BreakOutsideLoopOrSwitch, SemanticErrorKind::ContinueOutsideLoop]
        );

        let (_, ctx) = analyze_source("void main() { switch (1) { case 0: continue; } }");
        assert_eq!(error_kinds(&ctx), vec![SemanticErrorKind::ContinueOutsideLoop]);
    }

    #[test]
    fn test_switch_cases() {
        let source = r#"
            void main(int x) {
                int y = 2;
                switch (x) { case 1.0: break; case y: break; default: break; default: break; }
            }
        "#;
        let (_, ctx) = analyze_source(source);
        assert_eq!(
            error_kinds(&ctx),
            vec![SemanticErrorKind::CaseNotConstant, SemanticErrorKind::DuplicateDefault]
        );
    }

    #[test]
    fn test_return_checks() {
        let source = r#"
            void a() { return 1; }
            float b() { return; }
            float c() { return 1; }
        "#;
        let (program, ctx) = analyze_source(source);
        assert_eq!(
            error_kinds(&ctx),
            vec![SemanticErrorKind::ReturnTypeMismatch, SemanticErrorKind::ReturnTypeMismatch]
        );
        match &stmt_at(&program, "c", &ctx, 0).kind {
            StmtKind::Return(Some(value)) => {
                assert!(matches!(value.kind, ExprKind::Cast { implicit: true, .. }))
            }
            other => panic!("Expected return, got {:?}", other),
        }
    }

    #[test]
    fn test_logical_operators_yield_bool() {
        let (program, ctx) = analyze_source("void main(int a, int b) { int c = 0; bool r = a && b; }");
        assert!(error_kinds(&ctx).is_empty(), "{:?}", ctx.diagnostics());
        let init = initializer(stmt_at(&program, "main", &ctx, 1));
        assert_eq!(init.datatype().unwrap().display(&ctx.strings).to_string(), "bool");
    }

    #[test]
    fn test_operand_requirements() {
        let source = "void main(float f, int i) { int a = f % 2; bool b = !f; int c = ~i; }";
        let (_, ctx) = analyze_source(source);
        assert_eq!(
            error_kinds(&ctx),
            vec![SemanticErrorKind::ExpectedIntegerType, SemanticErrorKind::ExpectedBooleanType]
        );
    }

    #[test]
    fn test_incompatible_types_replace_right_side() {
        let source = "struct S { float a; }; void main(S s) { float x = s; }";
        let (program, ctx) = analyze_source(source);
        assert_eq!(error_kinds(&ctx), vec![SemanticErrorKind::IncompatibleTypes]);
        match &initializer(stmt_at(&program, "main", &ctx, 0)).kind {
            ExprKind::Cast { operand, implicit: true, .. } => {
                assert!(matches!(operand.kind, ExprKind::IntLiteral(0)))
            }
            other => panic!("Expected cast of zero, got {:?}", other),
        }
    }

    #[test]
    fn test_vector_truncation_warns() {
        let (program, ctx) = analyze_source("void main(float4 a, float3 b) { float3 c = a + b; }");
        assert!(error_kinds(&ctx).is_empty());
        assert_eq!(ctx.diagnostics().len(), 1);
        let init = initializer(stmt_at(&program, "main", &ctx, 0));
        assert_eq!(init.datatype().unwrap().display(&ctx.strings).to_string(), "float3");
    }

    #[test]
    fn test_widening_and_reshaping_rejected() {
        let sources = [
            "void main(float2 a) { float4 x = a; }",
            "float4 main(float4 v, float4x4 m) { return v * m; }",
            "void main(float2 a) { float4 x = (float4)a; }",
            "void main(float4 v) { float2x2 m = v; }",
        ];
        for source in sources {
            let (_, ctx) = analyze_source(source);
            assert_eq!(error_kinds(&ctx), vec![SemanticErrorKind::IncompatibleTypes], "{}", source);
            // no truncation warning for a rejected conversion
            assert_eq!(ctx.diagnostics().len(), 1, "{}", source);
        }

        let (program, ctx) = analyze_source("void main(float2 a) { float4 x = a; }");
        match &initializer(stmt_at(&program, "main", &ctx, 0)).kind {
            ExprKind::Cast { operand, implicit: true, .. } => {
                assert!(matches!(operand.kind, ExprKind::IntLiteral(0)))
            }
            other => panic!("Expected cast of zero, got {:?}", other),
        }
    }

    #[test]
    fn test_explicit_cast_normalises_operand() {
        let (program, ctx) = analyze_source("void main(float4 v) { float2 t = (float2)v; }");
        assert!(error_kinds(&ctx).is_empty(), "{:?}", ctx.diagnostics());
        match &initializer(stmt_at(&program, "main", &ctx, 0)).kind {
            ExprKind::Cast { operand, implicit: false, .. } => {
                assert!(matches!(operand.kind, ExprKind::Cast { implicit: true, .. }));
                assert_eq!(operand.datatype().unwrap().display(&ctx.strings).to_string(), "float2");
            }
            other => panic!("Expected explicit cast, got {:?}", other),
        }
    }

    #[test]
    fn test_truth_values_follow_operand_shape() {
        let source = r#"
            void main(float3 a, float3 b, bool2 p, float2x2 m) {
                bool3 lt = a < b;
                bool2 inverted = !p;
                bool2 both = p && p;
                bool2x2 eq = m == m;
                bool3 mixed = a.x < b;
            }
        "#;
        let (program, ctx) = analyze_source(source);
        assert!(ctx.diagnostics().is_empty(), "{:?}", ctx.diagnostics());
        let expected = ["bool3", "bool2", "bool2", "bool2x2", "bool3"];
        for (i, name) in expected.iter().enumerate() {
            let init = initializer(stmt_at(&program, "main", &ctx, i));
            assert_eq!(init.datatype().unwrap().display(&ctx.strings).to_string(), *name);
        }
    }

    #[test]
    fn test_truncation_warning_only_when_components_drop() {
        let (_, ctx) = analyze_source("void main(float3 a, float b) { float3 c = a * b; float3 d = b; }");
        assert!(ctx.diagnostics().is_empty(), "{:?}", ctx.diagnostics());

        let (_, ctx) = analyze_source("void main(float3 a, float3 b) { bool r = a < b; }");
        assert_eq!(ctx.diagnostics().len(), 1);
        assert!(ctx.diagnostics()[0].message.contains("implicit truncation"));
    }

    #[test]
    fn test_duplicates() {
        let source = r#"
            float g;
            float g;
            void f() {}
            void f() {}
            void h(int a) { int a = 1; }
        "#;
        let (_, ctx) = analyze_source(source);
        assert_eq!(
            error_kinds(&ctx),
            vec![
                SemanticErrorKind::DuplicateSymbol,
                SemanticErrorKind::DuplicateFunction,
            ]
        );
    }

    #[test]
    fn test_prototype_then_definition_shares_index() {
        let source = "float f(float a); void main() { float x = f(1.0); } float f(float a) { return a; }";
        let (program, ctx) = analyze_source(source);
        assert!(error_kinds(&ctx).is_empty(), "{:?}", ctx.diagnostics());
        let indices: Vec<SymbolIndex> = program.functions().map(|f| f.index).collect();
        assert_eq!(indices[0], indices[2]);
        assert_ne!(indices[0], indices[1]);
    }

    #[test]
    fn test_typedef_and_local_slots() {
        let source = r#"
            typedef float3 dir;
            struct Pair { float a; float b; };
            float main(dir d) { Pair p; float x = d.x; return x + p.a; }
        "#;
        let (program, ctx) = analyze_source(source);
        assert!(error_kinds(&ctx).is_empty(), "{:?}", ctx.diagnostics());
        let sym = ctx.strings.get("main").unwrap();
        let func = program.find_function(sym).unwrap();
        // d: 1, p: 2..=4, x: 5
        assert_eq!(func.local_slots, 5);
        assert_eq!(decl_type(stmt_at(&program, "main", &ctx, 0), &ctx), "struct Pair");
    }

    #[test]
    fn test_cancelled_analysis_stops() {
        use std::sync::atomic::AtomicBool;
        use std::sync::Arc;

        let options = crate::CompileOptions {
            cancel: Some(Arc::new(AtomicBool::new(true))),
            ..crate::CompileOptions::default()
        };
        let mut ctx = Context::from_options(&options);
        let mut program = parse_into("void main() { float x = y; }", "test.hlsl", &mut ctx);
        analyze(&mut program, &mut ctx);
        assert!(error_kinds(&ctx).is_empty());
    }
}
