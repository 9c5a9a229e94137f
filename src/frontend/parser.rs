//! Parser for the shading language.
//!
//! A recursive descent parser that turns the token stream into an AST. The
//! whole file is lexed up front so the parser can look ahead freely (casts
//! such as `(float3)v` need it).
//!
//! Identifiers are re-classified as user type names while parsing: every
//! `typedef` and `struct` registers its name in the parser's own scoped
//! table, and later occurrences of that name parse as a type. The parser
//! only emits stub `User` datatypes for these names; the analyzer resolves
//! them once the definitions have been checked.
//!
//! Errors are recorded in the [`Context`] and the parser resynchronises at
//! the next statement or declaration, so one pass reports as many syntax
//! errors as possible.

use crate::context::Context;
use crate::frontend::ast::*;
use crate::frontend::lexer::Lexer;
use crate::frontend::token::{Token, TokenKind, TokenValue, TypeKeyword};
use crate::semantic::datatype::{matrix_of, vector_of, Datatype, DatatypeRef};
use crate::semantic::scope::{ScopeEntry, SymbolIndex, SymbolTable};
use crate::utils::errors::{Diagnostic, ParseError, ParseErrorKind};
use crate::utils::intern::Symbol;
use crate::utils::location::{SourcePos, Span};
use log::trace;
use std::rc::Rc;

type Result<T> = std::result::Result<T, ParseError>;

/// Nesting depth at which the parser gives up instead of overflowing.
const MAX_DEPTH: usize = 128;

/// Stop collecting lexer errors after this many.
const MAX_LEXER_ERRORS: usize = 64;

/// Binary operator precedence levels, loosest first.
const BINARY_LEVELS: &[&[(TokenKind, Operator)]] = &[
    &[(TokenKind::PipePipe, Operator::LogicalOr)],
    &[(TokenKind::AmpAmp, Operator::LogicalAnd)],
    &[(TokenKind::Pipe, Operator::BinaryOr)],
    &[(TokenKind::Caret, Operator::BinaryXor)],
    &[(TokenKind::Amp, Operator::BinaryAnd)],
    &[(TokenKind::EqualEqual, Operator::Equal), (TokenKind::BangEqual, Operator::NotEqual)],
    &[
        (TokenKind::Less, Operator::LessThan),
        (TokenKind::Greater, Operator::GreaterThan),
        (TokenKind::LessEqual, Operator::LessThanOrEqual),
        (TokenKind::GreaterEqual, Operator::GreaterThanOrEqual),
    ],
    &[(TokenKind::LessLess, Operator::LShift), (TokenKind::GreaterGreater, Operator::RShift)],
    &[(TokenKind::Plus, Operator::Add), (TokenKind::Minus, Operator::Subtract)],
    &[
        (TokenKind::Star, Operator::Multiply),
        (TokenKind::Slash, Operator::Divide),
        (TokenKind::Percent, Operator::Modulo),
    ],
];

fn assignment_operator(kind: TokenKind) -> Option<Operator> {
    Some(match kind {
        TokenKind::Equal => Operator::Assign,
        TokenKind::StarEqual => Operator::MulAssign,
        TokenKind::SlashEqual => Operator::DivAssign,
        TokenKind::PercentEqual => Operator::ModAssign,
        TokenKind::PlusEqual => Operator::AddAssign,
        TokenKind::MinusEqual => Operator::SubAssign,
        TokenKind::LessLessEqual => Operator::LShiftAssign,
        TokenKind::GreaterGreaterEqual => Operator::RShiftAssign,
        TokenKind::AmpEqual => Operator::AndAssign,
        TokenKind::CaretEqual => Operator::XorAssign,
        TokenKind::PipeEqual => Operator::OrAssign,
        _ => return None,
    })
}

/// A parser for the shading language.
pub struct Parser<'c> {
    ctx: &'c mut Context,
    tokens: Vec<Token>,
    current: usize,
    /// Names currently bound as user types
    usertypes: SymbolTable,
    depth: usize,
}

impl<'c> Parser<'c> {
    /// Lex `source` and prepare to parse it. Lexical errors are recorded in
    /// `ctx`; the offending characters are skipped.
    pub fn new(source: &str, filename: &str, ctx: &'c mut Context) -> Self {
        let mut lexer = Lexer::new(source, filename);
        let mut tokens = Vec::new();
        let mut lexer_errors = 0;
        loop {
            match lexer.next_token() {
                Ok(token) => {
                    let is_eof = token.is_eof();
                    tokens.push(token);
                    if is_eof {
                        break;
                    }
                }
                Err(err) => {
                    ctx.report(Diagnostic::error(&lexer.position(), err.message));
                    lexer_errors += 1;
                    if lexer_errors >= MAX_LEXER_ERRORS || lexer.is_at_end() {
                        tokens.push(Token::new(TokenKind::Eof, Span::dummy(), String::new(), lexer.position()));
                        break;
                    }
                }
            }
        }
        for (pos, message) in lexer.take_warnings() {
            ctx.warning(&pos, message);
        }
        trace!("lexed {} tokens", tokens.len());

        let mut usertypes = SymbolTable::new();
        usertypes.push_boundary();
        Self { ctx, tokens, current: 0, usertypes, depth: 0 }
    }

    /// Parse the whole translation unit.
    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::new();

        while !self.is_at_end() && !self.ctx.should_stop() {
            match self.parse_compilation_unit() {
                Ok(Some(unit)) => program.units.push(unit),
                Ok(None) => {}
                Err(err) => {
                    self.record(err);
                    self.synchronize();
                }
            }
        }

        program
    }

    fn parse_compilation_unit(&mut self) -> Result<Option<CompilationUnit>> {
        let pos = self.pos();
        let kind = match self.kind() {
            TokenKind::Semicolon => {
                self.advance();
                return Ok(None);
            }
            TokenKind::Typedef => UnitKind::Typedef(self.parse_typedef()?),
            TokenKind::Struct => UnitKind::Struct(self.parse_struct()?),
            _ => {
                let (storage, inline) = self.parse_storage();
                let base = self.parse_type()?;
                let (name, name_pos) = self.consume_identifier("Expected a name after the type")?;
                if self.check(TokenKind::LeftParen) {
                    UnitKind::Function(self.parse_function(base, name, inline)?)
                } else {
                    let decls = self.parse_declarators(name, name_pos)?;
                    UnitKind::Variables(VarDeclGroup { storage, base, decls })
                }
            }
        };
        self.ctx.count_node();
        Ok(Some(CompilationUnit { kind, pos }))
    }

    fn parse_function(&mut self, return_type: DatatypeRef, name: Symbol, inline: bool) -> Result<FunctionUnit> {
        self.consume(TokenKind::LeftParen, "Expected '(' after function name")?;
        let params = self.parse_parameters()?;
        self.consume(TokenKind::RightParen, "Expected ')' after parameters")?;
        let semantic = if self.match_token(TokenKind::Colon) { self.parse_semantic()? } else { None };

        let body = if self.match_token(TokenKind::Semicolon) {
            None
        } else {
            let pos = self.pos();
            let stmts = self.parse_block()?;
            Some(Box::new(self.stmt(StmtKind::Block(stmts), pos)))
        };

        let return_type = match &*return_type {
            Datatype::None => None,
            _ => Some(return_type),
        };
        Ok(FunctionUnit {
            signature: FunctionSignature { name, return_type, params, semantic, inline },
            body,
            index: SymbolIndex::None,
            local_slots: 0,
            datatype: None,
        })
    }

    fn parse_parameters(&mut self) -> Result<Vec<Parameter>> {
        let mut params = Vec::new();
        if self.check(TokenKind::Type(TypeKeyword::Void)) && self.peek_kind(1) == TokenKind::RightParen {
            self.advance();
            return Ok(params);
        }
        if self.check(TokenKind::RightParen) {
            return Ok(params);
        }
        loop {
            params.push(self.parse_parameter()?);
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }
        Ok(params)
    }

    fn parse_parameter(&mut self) -> Result<Parameter> {
        let pos = self.pos();
        let mut modifier = InputModifier::None;
        let mut interpolation = Interpolation::None;
        loop {
            match self.kind() {
                TokenKind::In => modifier = InputModifier::In,
                TokenKind::Out => modifier = InputModifier::Out,
                TokenKind::Inout => modifier = InputModifier::InOut,
                TokenKind::Uniform => modifier = InputModifier::Uniform,
                TokenKind::Const => {}
                other => match Self::interpolation_of(other) {
                    Some(interp) => interpolation = interp,
                    None => break,
                },
            }
            self.advance();
        }

        let datatype = self.parse_type()?;
        let (name, _) = self.consume_identifier("Expected parameter name")?;
        let array = self.parse_array_suffix()?;
        let semantic = if self.match_token(TokenKind::Colon) { self.parse_semantic()? } else { None };
        if self.check(TokenKind::Equal) {
            let default_pos = self.pos();
            self.advance();
            self.parse_assignment()?;
            self.ctx.report(Diagnostic::error(&default_pos, "Default parameter values are not supported"));
        }
        Ok(Parameter { name, datatype, array, modifier, interpolation, semantic, pos })
    }

    fn interpolation_of(kind: TokenKind) -> Option<Interpolation> {
        match kind {
            TokenKind::Linear => Some(Interpolation::Linear),
            TokenKind::Centroid => Some(Interpolation::Centroid),
            TokenKind::Nointerpolation => Some(Interpolation::NoInterpolation),
            TokenKind::Noperspective => Some(Interpolation::NoPerspective),
            _ => None,
        }
    }

    /// Storage qualifiers; the second value is `inline`.
    fn parse_storage(&mut self) -> (StorageFlags, bool) {
        let mut flags = StorageFlags::default();
        let mut inline = false;
        loop {
            match self.kind() {
                TokenKind::Const => flags.is_const = true,
                TokenKind::Static => flags.is_static = true,
                TokenKind::Uniform => flags.is_uniform = true,
                TokenKind::Extern => flags.is_extern = true,
                TokenKind::Volatile => flags.is_volatile = true,
                TokenKind::Shared => flags.is_shared = true,
                TokenKind::Groupshared => flags.is_groupshared = true,
                TokenKind::RowMajor => flags.row_major = true,
                TokenKind::ColumnMajor => flags.column_major = true,
                TokenKind::Inline => inline = true,
                TokenKind::Linear
                | TokenKind::Centroid
                | TokenKind::Nointerpolation
                | TokenKind::Noperspective => {}
                _ => break,
            }
            self.advance();
        }
        (flags, inline)
    }

    /// `: SEMANTIC` or `: register(...)`; the colon is already consumed.
    fn parse_semantic(&mut self) -> Result<Option<Symbol>> {
        let token = self.current().clone();
        if token.kind != TokenKind::Identifier {
            return Err(self.error(ParseErrorKind::ExpectedIdentifier, "Expected a semantic after ':'"));
        }
        self.advance();
        if (token.lexeme == "register" || token.lexeme == "packoffset") && self.check(TokenKind::LeftParen) {
            while !self.check(TokenKind::RightParen) && !self.is_at_end() {
                self.advance();
            }
            self.consume(TokenKind::RightParen, "Expected ')' to close register binding")?;
            return Ok(None);
        }
        Ok(Some(self.ctx.strings.intern(&token.lexeme)))
    }

    fn parse_array_suffix(&mut self) -> Result<Option<ArraySize>> {
        if !self.match_token(TokenKind::LeftBracket) {
            return Ok(None);
        }
        if self.match_token(TokenKind::RightBracket) {
            return Ok(Some(ArraySize::Unsized));
        }
        let size = self.parse_expression()?;
        self.consume(TokenKind::RightBracket, "Expected ']' after array size")?;
        Ok(Some(ArraySize::Sized(Box::new(size))))
    }

    /// Declarators after the base type, up to and including the `;`.
    fn parse_declarators(&mut self, first: Symbol, first_pos: SourcePos) -> Result<Vec<VarDeclaration>> {
        let mut decls = Vec::new();
        let (mut name, mut pos) = (first, first_pos);
        loop {
            let array = self.parse_array_suffix()?;
            let semantic = if self.match_token(TokenKind::Colon) { self.parse_semantic()? } else { None };
            let initializer = if self.match_token(TokenKind::Equal) {
                if self.check(TokenKind::LeftBrace) {
                    let brace_pos = self.pos();
                    self.skip_braces();
                    self.ctx.report(Diagnostic::error(&brace_pos, "Initializer lists are not supported"));
                    None
                } else {
                    Some(self.parse_assignment()?)
                }
            } else {
                None
            };
            self.ctx.count_node();
            decls.push(VarDeclaration {
                name,
                array,
                semantic,
                initializer,
                pos,
                datatype: None,
                index: SymbolIndex::None,
            });
            if !self.match_token(TokenKind::Comma) {
                break;
            }
            let next = self.consume_identifier("Expected variable name after ','")?;
            name = next.0;
            pos = next.1;
        }
        self.consume(TokenKind::Semicolon, "Expected ';' after declaration")?;
        Ok(decls)
    }

    fn parse_typedef(&mut self) -> Result<Typedef> {
        self.consume(TokenKind::Typedef, "Expected 'typedef'")?;
        let is_const = self.match_token(TokenKind::Const);
        let base = self.parse_type()?;
        let (name, _) = self.consume_identifier("Expected typedef name")?;
        let array = self.parse_array_suffix()?;
        self.consume(TokenKind::Semicolon, "Expected ';' after typedef")?;
        self.register_usertype(name);
        Ok(Typedef { name, is_const, base, array, datatype: None })
    }

    fn parse_struct(&mut self) -> Result<StructDeclaration> {
        self.consume(TokenKind::Struct, "Expected 'struct'")?;
        let (name, _) = self.consume_identifier("Expected struct name")?;
        self.consume(TokenKind::LeftBrace, "Expected '{' after struct name")?;

        let mut members = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            let mut interpolation = Interpolation::None;
            while let Some(interp) = Self::interpolation_of(self.kind()) {
                interpolation = interp;
                self.advance();
            }
            let base = self.parse_type()?;
            loop {
                let (member, pos) = self.consume_identifier("Expected struct member name")?;
                let array = self.parse_array_suffix()?;
                let semantic = if self.match_token(TokenKind::Colon) { self.parse_semantic()? } else { None };
                members.push(StructMemberDecl {
                    name: member,
                    base: Rc::clone(&base),
                    array,
                    interpolation,
                    semantic,
                    pos,
                });
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
            self.consume(TokenKind::Semicolon, "Expected ';' after struct member")?;
        }
        self.consume(TokenKind::RightBrace, "Expected '}' to close struct")?;
        self.register_usertype(name);

        let variables = if self.check(TokenKind::Identifier) {
            let (first, pos) = self.consume_identifier("Expected variable name")?;
            let base = Rc::new(Datatype::User { name, details: None });
            let decls = self.parse_declarators(first, pos)?;
            Some(VarDeclGroup { storage: StorageFlags::default(), base, decls })
        } else {
            self.consume(TokenKind::Semicolon, "Expected ';' after struct declaration")?;
            None
        };

        Ok(StructDeclaration { name, members, variables, datatype: None })
    }

    fn register_usertype(&mut self, name: Symbol) {
        let stub = Rc::new(Datatype::User { name, details: None });
        self.usertypes.insert(ScopeEntry::new(name, stub, SymbolIndex::None));
    }

    fn is_usertype(&self, token: &Token) -> bool {
        token.kind == TokenKind::Identifier
            && self
                .ctx
                .strings
                .get(&token.lexeme)
                .map(|sym| self.usertypes.find(sym).is_some())
                .unwrap_or(false)
    }

    fn is_type_start(&self, offset: usize) -> bool {
        match self.tokens.get(self.current + offset) {
            Some(token) => {
                matches!(token.kind, TokenKind::Type(_) | TokenKind::Snorm | TokenKind::Unorm)
                    || self.is_usertype(token)
            }
            None => false,
        }
    }

    fn parse_type(&mut self) -> Result<DatatypeRef> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Snorm | TokenKind::Unorm => {
                self.advance();
                let base = self.parse_type()?;
                Ok(self.normalized(base, token.kind == TokenKind::Snorm))
            }
            TokenKind::Type(kw) => {
                self.advance();
                self.builtin_type(kw)
            }
            TokenKind::Identifier if self.is_usertype(&token) => {
                self.advance();
                let name = self.ctx.strings.intern(&token.lexeme);
                Ok(Rc::new(Datatype::User { name, details: None }))
            }
            _ => Err(self.error(ParseErrorKind::ExpectedType, "Expected a type")),
        }
    }

    fn builtin_type(&mut self, kw: TypeKeyword) -> Result<DatatypeRef> {
        let types = &self.ctx.types;
        Ok(match kw {
            TypeKeyword::Void => Rc::clone(&types.none),
            TypeKeyword::String => Rc::clone(&types.string),
            TypeKeyword::Scalar(s) => types.scalar(s),
            TypeKeyword::Vector(s, n) => vector_of(&types.scalar(s), n as u32),
            TypeKeyword::Matrix(s, r, c) => matrix_of(&types.scalar(s), r as u32, c as u32),
            TypeKeyword::Sampler(kind) => types.sampler(kind.into()),
            TypeKeyword::GenericVector => {
                if !self.match_token(TokenKind::Less) {
                    return Ok(vector_of(&self.ctx.types.float, 4));
                }
                let base = self.parse_scalar_keyword()?;
                self.consume(TokenKind::Comma, "Expected ',' in vector<type, size>")?;
                let n = self.parse_dimension()?;
                self.consume(TokenKind::Greater, "Expected '>' to close vector<...>")?;
                vector_of(&base, n)
            }
            TypeKeyword::GenericMatrix => {
                if !self.match_token(TokenKind::Less) {
                    return Ok(matrix_of(&self.ctx.types.float, 4, 4));
                }
                let base = self.parse_scalar_keyword()?;
                self.consume(TokenKind::Comma, "Expected ',' in matrix<type, rows, columns>")?;
                let rows = self.parse_dimension()?;
                self.consume(TokenKind::Comma, "Expected ',' in matrix<type, rows, columns>")?;
                let columns = self.parse_dimension()?;
                self.consume(TokenKind::Greater, "Expected '>' to close matrix<...>")?;
                matrix_of(&base, rows, columns)
            }
            TypeKeyword::Buffer => {
                self.consume(TokenKind::Less, "Expected '<' after Buffer")?;
                let inner = self.parse_type()?;
                self.consume(TokenKind::Greater, "Expected '>' to close Buffer<...>")?;
                Rc::new(Datatype::Buffer(inner))
            }
        })
    }

    fn parse_scalar_keyword(&mut self) -> Result<DatatypeRef> {
        match self.kind() {
            TokenKind::Type(TypeKeyword::Scalar(s)) => {
                self.advance();
                Ok(self.ctx.types.scalar(s))
            }
            _ => Err(self.error(ParseErrorKind::ExpectedType, "Expected a scalar type")),
        }
    }

    /// A literal 1..=4 inside `vector<...>` / `matrix<...>`.
    fn parse_dimension(&mut self) -> Result<u32> {
        match (self.kind(), self.current().value) {
            (TokenKind::Integer, TokenValue::Int(n)) if (1..=4).contains(&n) => {
                self.advance();
                Ok(n as u32)
            }
            _ => Err(self.error(ParseErrorKind::UnexpectedToken, "Expected a dimension between 1 and 4")),
        }
    }

    /// `snorm`/`unorm` applied to a float-based type.
    fn normalized(&self, base: DatatypeRef, signed: bool) -> DatatypeRef {
        let types = &self.ctx.types;
        let scalar = if signed { &types.float_snorm } else { &types.float_unorm };
        match &*base {
            Datatype::Float => Rc::clone(scalar),
            Datatype::Vector { base: inner, elements } if matches!(**inner, Datatype::Float) => {
                vector_of(scalar, *elements)
            }
            Datatype::Matrix { base: inner, rows, columns } if matches!(**inner, Datatype::Float) => {
                matrix_of(scalar, *rows, *columns)
            }
            _ => base,
        }
    }

    // Statements

    fn parse_block(&mut self) -> Result<Vec<Stmt>> {
        self.consume(TokenKind::LeftBrace, "Expected '{'")?;
        self.usertypes.push_boundary();

        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() && !self.ctx.should_stop() {
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.record(err);
                    self.synchronize_statement();
                }
            }
        }

        self.usertypes.pop_scope();
        self.consume(TokenKind::RightBrace, "Expected '}'")?;
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Stmt> {
        self.enter()?;
        let result = self.parse_statement_inner();
        self.depth -= 1;
        result
    }

    fn parse_statement_inner(&mut self) -> Result<Stmt> {
        let attributes = self.parse_attributes()?;
        let pos = self.pos();

        let kind = match self.kind() {
            TokenKind::LeftBrace => StmtKind::Block(self.parse_block()?),
            TokenKind::Semicolon => {
                self.advance();
                StmtKind::Empty
            }
            TokenKind::If => self.parse_if_statement()?,
            TokenKind::While => self.parse_while_statement()?,
            TokenKind::Do => self.parse_do_statement()?,
            TokenKind::For => self.parse_for_statement()?,
            TokenKind::Switch => self.parse_switch_statement()?,
            TokenKind::Break => self.parse_keyword_statement(StmtKind::Break)?,
            TokenKind::Continue => self.parse_keyword_statement(StmtKind::Continue)?,
            TokenKind::Discard => self.parse_keyword_statement(StmtKind::Discard)?,
            TokenKind::Return => {
                self.advance();
                let value = if self.check(TokenKind::Semicolon) { None } else { Some(self.parse_expression()?) };
                self.consume(TokenKind::Semicolon, "Expected ';' after return")?;
                StmtKind::Return(value)
            }
            _ if self.is_declaration_start() => self.parse_declaration_statement()?,
            _ => {
                let expr = self.parse_expression()?;
                self.consume(TokenKind::Semicolon, "Expected ';' after expression")?;
                StmtKind::Expression(expr)
            }
        };

        let mut stmt = self.stmt(kind, pos);
        stmt.attributes = attributes;
        Ok(stmt)
    }

    /// `[unroll]`, `[loop]`, `[branch]`, `[unroll(4)]`...
    fn parse_attributes(&mut self) -> Result<Vec<Symbol>> {
        let mut attributes = Vec::new();
        while self.match_token(TokenKind::LeftBracket) {
            let (name, _) = self.consume_identifier("Expected attribute name")?;
            if self.match_token(TokenKind::LeftParen) {
                while !self.check(TokenKind::RightParen) && !self.is_at_end() {
                    self.advance();
                }
                self.consume(TokenKind::RightParen, "Expected ')' after attribute arguments")?;
            }
            self.consume(TokenKind::RightBracket, "Expected ']' after attribute")?;
            attributes.push(name);
        }
        Ok(attributes)
    }

    fn parse_keyword_statement(&mut self, kind: StmtKind) -> Result<StmtKind> {
        self.advance();
        self.consume(TokenKind::Semicolon, "Expected ';'")?;
        Ok(kind)
    }

    fn parse_if_statement(&mut self) -> Result<StmtKind> {
        self.consume(TokenKind::If, "Expected 'if'")?;
        let cond = self.parse_condition()?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.match_token(TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(StmtKind::If { cond, then_branch, else_branch })
    }

    fn parse_while_statement(&mut self) -> Result<StmtKind> {
        self.consume(TokenKind::While, "Expected 'while'")?;
        let cond = self.parse_condition()?;
        let body = Box::new(self.parse_statement()?);
        Ok(StmtKind::While { cond, body })
    }

    fn parse_do_statement(&mut self) -> Result<StmtKind> {
        self.consume(TokenKind::Do, "Expected 'do'")?;
        let body = Box::new(self.parse_statement()?);
        self.consume(TokenKind::While, "Expected 'while' after do body")?;
        let cond = self.parse_condition()?;
        self.consume(TokenKind::Semicolon, "Expected ';' after do/while")?;
        Ok(StmtKind::Do { body, cond })
    }

    fn parse_for_statement(&mut self) -> Result<StmtKind> {
        self.consume(TokenKind::For, "Expected 'for'")?;
        self.consume(TokenKind::LeftParen, "Expected '(' after 'for'")?;

        let init = if self.match_token(TokenKind::Semicolon) {
            None
        } else {
            let pos = self.pos();
            let kind = if self.is_declaration_start() {
                self.parse_declaration_statement()?
            } else {
                let expr = self.parse_expression()?;
                self.consume(TokenKind::Semicolon, "Expected ';' after for initializer")?;
                StmtKind::Expression(expr)
            };
            Some(Box::new(self.stmt(kind, pos)))
        };
        let cond = if self.check(TokenKind::Semicolon) { None } else { Some(self.parse_expression()?) };
        self.consume(TokenKind::Semicolon, "Expected ';' after for condition")?;
        let step = if self.check(TokenKind::RightParen) { None } else { Some(self.parse_expression()?) };
        self.consume(TokenKind::RightParen, "Expected ')' after for clauses")?;

        let body = Box::new(self.parse_statement()?);
        Ok(StmtKind::For { init, cond, step, body })
    }

    fn parse_switch_statement(&mut self) -> Result<StmtKind> {
        self.consume(TokenKind::Switch, "Expected 'switch'")?;
        let cond = self.parse_condition()?;
        self.consume(TokenKind::LeftBrace, "Expected '{' after switch condition")?;

        let mut cases = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            let pos = self.pos();
            let value = if self.match_token(TokenKind::Case) {
                Some(self.parse_conditional()?)
            } else if self.match_token(TokenKind::Default) {
                None
            } else {
                return Err(self.error(ParseErrorKind::UnexpectedToken, "Expected 'case' or 'default'"));
            };
            self.consume(TokenKind::Colon, "Expected ':' after case label")?;

            let mut body = Vec::new();
            while !matches!(self.kind(), TokenKind::Case | TokenKind::Default | TokenKind::RightBrace)
                && !self.is_at_end()
            {
                match self.parse_statement() {
                    Ok(stmt) => body.push(stmt),
                    Err(err) => {
                        self.record(err);
                        self.synchronize_statement();
                    }
                }
            }
            cases.push(SwitchCase { value, body, pos });
        }

        self.consume(TokenKind::RightBrace, "Expected '}' to close switch")?;
        Ok(StmtKind::Switch { cond, cases })
    }

    fn parse_condition(&mut self) -> Result<Expr> {
        self.consume(TokenKind::LeftParen, "Expected '('")?;
        let cond = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "Expected ')'")?;
        Ok(cond)
    }

    fn is_declaration_start(&self) -> bool {
        let kind = self.kind();
        match kind {
            TokenKind::Typedef | TokenKind::Struct => true,
            _ if kind.is_qualifier() => true,
            TokenKind::Type(_) => self.peek_kind(1) != TokenKind::LeftParen,
            TokenKind::Identifier => {
                self.is_usertype(self.current()) && self.peek_kind(1) == TokenKind::Identifier
            }
            _ => false,
        }
    }

    fn parse_declaration_statement(&mut self) -> Result<StmtKind> {
        match self.kind() {
            TokenKind::Typedef => Ok(StmtKind::Typedef(self.parse_typedef()?)),
            TokenKind::Struct => Ok(StmtKind::Struct(self.parse_struct()?)),
            _ => {
                let (storage, _) = self.parse_storage();
                let base = self.parse_type()?;
                let (name, pos) = self.consume_identifier("Expected variable name")?;
                let decls = self.parse_declarators(name, pos)?;
                Ok(StmtKind::VarDecl(VarDeclGroup { storage, base, decls }))
            }
        }
    }

    // Expressions

    fn parse_expression(&mut self) -> Result<Expr> {
        let mut left = self.parse_assignment()?;
        while self.check(TokenKind::Comma) {
            let pos = self.pos();
            self.advance();
            let right = self.parse_assignment()?;
            left = self.binary(Operator::Comma, left, right, pos);
        }
        Ok(left)
    }

    fn parse_assignment(&mut self) -> Result<Expr> {
        let left = self.parse_conditional()?;
        match assignment_operator(self.kind()) {
            Some(op) => {
                let pos = self.pos();
                self.advance();
                self.enter()?;
                let right = self.parse_assignment();
                self.depth -= 1;
                Ok(self.binary(op, left, right?, pos))
            }
            None => Ok(left),
        }
    }

    fn parse_conditional(&mut self) -> Result<Expr> {
        let cond = self.parse_binary(0)?;
        if !self.check(TokenKind::Question) {
            return Ok(cond);
        }
        let pos = self.pos();
        self.advance();
        self.enter()?;
        let branches = self.parse_branches();
        self.depth -= 1;
        let (left, right) = branches?;
        Ok(self.expr(
            ExprKind::Ternary {
                op: Operator::Conditional,
                cond: Box::new(cond),
                left: Box::new(left),
                right: Box::new(right),
            },
            pos,
        ))
    }

    /// `left : right` of a conditional expression.
    fn parse_branches(&mut self) -> Result<(Expr, Expr)> {
        let left = self.parse_assignment()?;
        self.consume(TokenKind::Colon, "Expected ':' in conditional expression")?;
        let right = self.parse_conditional()?;
        Ok((left, right))
    }

    fn parse_binary(&mut self, level: usize) -> Result<Expr> {
        let mut chained = 0;
        let result = self.parse_binary_chain(level, &mut chained);
        self.depth -= chained;
        result
    }

    /// One precedence level, left associative. Every operator nests the
    /// tree one level deeper and counts against [`MAX_DEPTH`] until the
    /// whole expression is parsed; the leftmost operand shares the count.
    fn parse_binary_chain(&mut self, level: usize, chained: &mut usize) -> Result<Expr> {
        let operators = match BINARY_LEVELS.get(level) {
            Some(operators) => *operators,
            None => return self.parse_unary(),
        };
        let mut left = self.parse_binary_chain(level + 1, chained)?;
        loop {
            let kind = self.kind();
            let op = match operators.iter().find(|(token, _)| *token == kind) {
                Some((_, op)) => *op,
                None => break,
            };
            self.enter()?;
            *chained += 1;
            let pos = self.pos();
            self.advance();
            let right = self.parse_binary(level + 1)?;
            left = self.binary(op, left, right, pos);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        self.enter()?;
        let result = self.parse_unary_inner();
        self.depth -= 1;
        result
    }

    fn parse_unary_inner(&mut self) -> Result<Expr> {
        let pos = self.pos();
        let op = match self.kind() {
            TokenKind::PlusPlus => Operator::PreIncrement,
            TokenKind::MinusMinus => Operator::PreDecrement,
            TokenKind::Minus => Operator::Negate,
            TokenKind::Tilde => Operator::Complement,
            TokenKind::Bang => Operator::Not,
            TokenKind::Plus => {
                self.advance();
                return self.parse_unary();
            }
            TokenKind::LeftParen if self.looks_like_cast() => {
                self.advance();
                let target = self.parse_type()?;
                self.consume(TokenKind::RightParen, "Expected ')' after cast type")?;
                let operand = self.parse_unary()?;
                return Ok(self.expr(
                    ExprKind::Cast { target, operand: Box::new(operand), implicit: false },
                    pos,
                ));
            }
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(self.expr(ExprKind::Unary { op, operand: Box::new(operand) }, pos))
    }

    /// `(` type `)`: a cast rather than a parenthesised expression.
    fn looks_like_cast(&mut self) -> bool {
        if !self.is_type_start(1) {
            return false;
        }
        let saved = self.current;
        self.advance();
        let is_cast = self.parse_type().is_ok() && self.check(TokenKind::RightParen);
        self.current = saved;
        is_cast
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut chained = 0;
        let result = self.parse_postfix_chain(&mut chained);
        self.depth -= chained;
        result
    }

    fn parse_postfix_chain(&mut self, chained: &mut usize) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            let pos = self.pos();
            if matches!(
                self.kind(),
                TokenKind::LeftBracket | TokenKind::Dot | TokenKind::PlusPlus | TokenKind::MinusMinus
            ) {
                self.enter()?;
                *chained += 1;
            }
            match self.kind() {
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.consume(TokenKind::RightBracket, "Expected ']' after index")?;
                    expr = self.expr(ExprKind::DerefArray { array: Box::new(expr), index: Box::new(index) }, pos);
                }
                TokenKind::Dot => {
                    self.advance();
                    let (member, _) = self.consume_identifier("Expected member name after '.'")?;
                    expr = self.expr(
                        ExprKind::DerefStruct { base: Box::new(expr), member, is_swizzle: false, member_index: 0 },
                        pos,
                    );
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    let op = if self.kind() == TokenKind::PlusPlus {
                        Operator::PostIncrement
                    } else {
                        Operator::PostDecrement
                    };
                    self.advance();
                    expr = self.expr(ExprKind::Unary { op, operand: Box::new(expr) }, pos);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        let pos = token.pos.clone();

        let kind = match token.kind {
            TokenKind::Integer => {
                self.advance();
                let value = match token.value {
                    TokenValue::Int(v) => v,
                    _ => 0,
                };
                if token.lexeme.ends_with(|c| c == 'u' || c == 'U') {
                    ExprKind::UintLiteral(value as u64)
                } else {
                    ExprKind::IntLiteral(value)
                }
            }
            TokenKind::Float => {
                self.advance();
                match token.value {
                    TokenValue::Float(v) => ExprKind::FloatLiteral(v),
                    _ => ExprKind::FloatLiteral(0.0),
                }
            }
            TokenKind::True => {
                self.advance();
                ExprKind::BoolLiteral(true)
            }
            TokenKind::False => {
                self.advance();
                ExprKind::BoolLiteral(false)
            }
            TokenKind::String => {
                self.advance();
                let text = token.lexeme.trim_start_matches('"').trim_end_matches('"');
                ExprKind::StringLiteral(self.ctx.strings.intern(text))
            }
            TokenKind::Type(_) => {
                let target = self.parse_type()?;
                self.consume(TokenKind::LeftParen, "Expected '(' after type in constructor")?;
                let args = self.parse_arguments()?;
                ExprKind::Constructor { target, args }
            }
            TokenKind::Identifier if self.is_usertype(&token) => {
                let target = self.parse_type()?;
                self.consume(TokenKind::LeftParen, "Expected '(' after type in constructor")?;
                let args = self.parse_arguments()?;
                ExprKind::Constructor { target, args }
            }
            TokenKind::Identifier => {
                self.advance();
                let name = self.ctx.strings.intern(&token.lexeme);
                if self.match_token(TokenKind::LeftParen) {
                    let args = self.parse_arguments()?;
                    ExprKind::Call { name, args, index: SymbolIndex::None, signature: None }
                } else {
                    ExprKind::Identifier { name, index: SymbolIndex::None }
                }
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.consume(TokenKind::RightParen, "Expected ')'")?;
                return Ok(inner);
            }
            _ => return Err(self.error(ParseErrorKind::ExpectedExpression, "Expected an expression")),
        };

        Ok(self.expr(kind, pos))
    }

    /// Arguments after an opening `(`, up to and including the `)`.
    fn parse_arguments(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                args.push(self.parse_assignment()?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expected ')' after arguments")?;
        Ok(args)
    }

    // Node construction

    fn expr(&mut self, kind: ExprKind, pos: SourcePos) -> Expr {
        self.ctx.count_node();
        Expr::new(kind, pos)
    }

    fn binary(&mut self, op: Operator, left: Expr, right: Expr, pos: SourcePos) -> Expr {
        self.expr(ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) }, pos)
    }

    fn stmt(&mut self, kind: StmtKind, pos: SourcePos) -> Stmt {
        self.ctx.count_node();
        Stmt::new(kind, pos)
    }

    // Helper methods

    fn current(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.current.min(last)]
    }

    fn kind(&self) -> TokenKind {
        self.current().kind
    }

    fn peek_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.current + offset)
            .map(|token| token.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn pos(&self) -> SourcePos {
        self.current().pos.clone()
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn is_at_end(&self) -> bool {
        self.kind() == TokenKind::Eof
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }

    fn previous_kind(&self) -> Option<TokenKind> {
        self.current.checked_sub(1).and_then(|i| self.tokens.get(i)).map(|t| t.kind)
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<()> {
        if self.match_token(kind) {
            Ok(())
        } else {
            Err(self.error(ParseErrorKind::UnexpectedToken, message))
        }
    }

    fn consume_identifier(&mut self, message: &str) -> Result<(Symbol, SourcePos)> {
        if self.check(TokenKind::Identifier) {
            let pos = self.pos();
            let lexeme = self.current().lexeme.clone();
            let name = self.ctx.strings.intern(&lexeme);
            self.advance();
            Ok((name, pos))
        } else {
            Err(self.error(ParseErrorKind::ExpectedIdentifier, message))
        }
    }

    fn enter(&mut self) -> Result<()> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(ParseErrorKind::StackOverflow, "parser stack overflow"));
        }
        self.depth += 1;
        Ok(())
    }

    fn error(&self, kind: ParseErrorKind, message: &str) -> ParseError {
        ParseError {
            message: format!("syntax error: {}", message),
            pos: self.pos(),
            kind,
            found: Some(self.current().to_string()),
        }
    }

    fn record(&mut self, err: ParseError) {
        self.ctx.report(Diagnostic::from(err));
    }

    /// Skip a balanced `{ ... }` group.
    fn skip_braces(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.kind() {
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                TokenKind::Eof => return,
                _ => {}
            }
            self.advance();
        }
    }

    fn synchronize(&mut self) {
        // Always advance at least once to avoid infinite loops
        self.advance();

        while !self.is_at_end() {
            if matches!(self.previous_kind(), Some(TokenKind::Semicolon) | Some(TokenKind::RightBrace)) {
                return;
            }
            if matches!(self.kind(), TokenKind::Typedef | TokenKind::Struct) {
                return;
            }
            self.advance();
        }
    }

    fn synchronize_statement(&mut self) {
        if !self.check(TokenKind::RightBrace) {
            self.advance();
        }
        while !self.is_at_end() && !self.check(TokenKind::RightBrace) {
            if self.previous_kind() == Some(TokenKind::Semicolon) {
                return;
            }
            match self.kind() {
                TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Do
                | TokenKind::Switch
                | TokenKind::Return
                | TokenKind::LeftBrace => return,
                _ => {}
            }
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> (Program, Context) {
        let mut ctx = Context::new();
        let program = Parser::new(source, "test.hlsl", &mut ctx).parse_program();
        (program, ctx)
    }

    fn function_body(program: &Program) -> &Vec<Stmt> {
        let func = program.functions().next().expect("function");
        match &func.body.as_ref().expect("body").kind {
            StmtKind::Block(stmts) => stmts,
            other => panic!("Expected block, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_function() {
        let (program, ctx) = parse("void main() {}");
        assert!(ctx.diagnostics().is_empty());
        let func = program.functions().next().unwrap();
        assert_eq!(ctx.strings.resolve(func.signature.name), "main");
        assert!(func.signature.return_type.is_none());
        assert!(func.body.is_some());
    }

    #[test]
    fn test_function_signature() {
        let (program, ctx) = parse(
            "float4 main(in float4 pos : POSITION, uniform float2 uv, out float depth) : SV_POSITION;",
        );
        assert!(ctx.diagnostics().is_empty(), "{:?}", ctx.diagnostics());
        let func = program.functions().next().unwrap();
        assert!(func.body.is_none());
        assert_eq!(func.signature.params.len(), 3);
        assert_eq!(func.signature.params[0].modifier, InputModifier::In);
        assert_eq!(func.signature.params[2].modifier, InputModifier::Out);
        let semantic = func.signature.params[0].semantic.unwrap();
        assert_eq!(ctx.strings.resolve(semantic), "POSITION");
        assert_eq!(ctx.strings.resolve(func.signature.semantic.unwrap()), "SV_POSITION");
    }

    #[test]
    fn test_void_parameter_list() {
        let (program, ctx) = parse("float f(void) { return 1.0; }");
        assert!(ctx.diagnostics().is_empty());
        assert!(program.functions().next().unwrap().signature.params.is_empty());
    }

    #[test]
    fn test_typedef_makes_usertype() {
        let (program, ctx) = parse("typedef float4 color; color tint; void f() { color c = color(1,1,1,1); }");
        assert!(ctx.diagnostics().is_empty(), "{:?}", ctx.diagnostics());
        match &program.units[1].kind {
            UnitKind::Variables(group) => assert!(matches!(&*group.base, Datatype::User { .. })),
            other => panic!("Expected variables, got {:?}", other),
        }
        let body = function_body(&program);
        match &body[0].kind {
            StmtKind::VarDecl(group) => {
                let init = group.decls[0].initializer.as_ref().unwrap();
                assert!(matches!(init.kind, ExprKind::Constructor { .. }));
            }
            other => panic!("Expected declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_struct_declaration() {
        let (program, ctx) = parse("struct VSOut { float4 pos : SV_POSITION; float2 uv, uv2; } vout;");
        assert!(ctx.diagnostics().is_empty(), "{:?}", ctx.diagnostics());
        match &program.units[0].kind {
            UnitKind::Struct(decl) => {
                assert_eq!(decl.members.len(), 3);
                assert!(decl.members[0].semantic.is_some());
                assert_eq!(decl.variables.as_ref().unwrap().decls.len(), 1);
            }
            other => panic!("Expected struct, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let (program, ctx) = parse("int x = 1 + 2 * 3;");
        assert!(ctx.diagnostics().is_empty());
        let UnitKind::Variables(group) = &program.units[0].kind else { panic!("Expected variables") };
        match &group.decls[0].initializer.as_ref().unwrap().kind {
            ExprKind::Binary { op: Operator::Add, right, .. } => {
                assert!(matches!(right.kind, ExprKind::Binary { op: Operator::Multiply, .. }));
            }
            other => panic!("Expected addition, got {:?}", other),
        }
    }

    #[test]
    fn test_cast_versus_parentheses() {
        let (program, ctx) = parse("void f() { float a = (float)1; float b = (a) * 2; float c = (float4(1,2,3,4)).x; }");
        assert!(ctx.diagnostics().is_empty(), "{:?}", ctx.diagnostics());
        let body = function_body(&program);
        let init = |i: usize| match &body[i].kind {
            StmtKind::VarDecl(group) => &group.decls[0].initializer.as_ref().unwrap().kind,
            other => panic!("Expected declaration, got {:?}", other),
        };
        assert!(matches!(init(0), ExprKind::Cast { implicit: false, .. }));
        assert!(matches!(init(1), ExprKind::Binary { op: Operator::Multiply, .. }));
        assert!(matches!(init(2), ExprKind::DerefStruct { .. }));
    }

    #[test]
    fn test_control_flow_statements() {
        let source = r#"
            void f(int n) {
                [unroll] for (int i = 0; i < n; i++) { if (i == 2) continue; else break; }
                while (n > 0) n--;
                do { n += 1; } while (n < 10);
                switch (n) { case 1: n = 2; break; default: discard; }
            }
        "#;
        let (program, ctx) = parse(source);
        assert!(ctx.diagnostics().is_empty(), "{:?}", ctx.diagnostics());
        let body = function_body(&program);
        assert_eq!(body.len(), 4);
        assert_eq!(body[0].attributes.len(), 1);
        match &body[0].kind {
            StmtKind::For { init, cond, step, .. } => {
                assert!(matches!(init.as_ref().unwrap().kind, StmtKind::VarDecl(_)));
                assert!(cond.is_some());
                assert!(step.is_some());
            }
            other => panic!("Expected for, got {:?}", other),
        }
        assert!(matches!(body[1].kind, StmtKind::While { .. }));
        assert!(matches!(body[2].kind, StmtKind::Do { .. }));
        match &body[3].kind {
            StmtKind::Switch { cases, .. } => {
                assert_eq!(cases.len(), 2);
                assert!(cases[0].value.is_some());
                assert!(cases[1].value.is_none());
                assert_eq!(cases[0].body.len(), 2);
            }
            other => panic!("Expected switch, got {:?}", other),
        }
    }

    #[test]
    fn test_generic_vector_and_matrix() {
        let (program, ctx) = parse("vector<int, 3> v; matrix<float, 2, 3> m; matrix mm; Buffer<float4> buf;");
        assert!(ctx.diagnostics().is_empty(), "{:?}", ctx.diagnostics());
        let base = |i: usize| match &program.units[i].kind {
            UnitKind::Variables(group) => Rc::clone(&group.base),
            other => panic!("Expected variables, got {:?}", other),
        };
        assert_eq!(base(0).display(&ctx.strings).to_string(), "int3");
        assert_eq!(base(1).display(&ctx.strings).to_string(), "float2x3");
        assert_eq!(base(2).display(&ctx.strings).to_string(), "float4x4");
        assert_eq!(base(3).display(&ctx.strings).to_string(), "Buffer<float4>");
    }

    #[test]
    fn test_postfix_and_literals() {
        let (program, ctx) = parse("void f() { float4 v; v.xyz = v.zyx; v[0]++; uint u = 3u; }");
        assert!(ctx.diagnostics().is_empty(), "{:?}", ctx.diagnostics());
        let body = function_body(&program);
        match &body[1].kind {
            StmtKind::Expression(Expr { kind: ExprKind::Binary { op: Operator::Assign, left, .. }, .. }) => {
                assert!(matches!(left.kind, ExprKind::DerefStruct { .. }));
            }
            other => panic!("Expected assignment, got {:?}", other),
        }
        match &body[2].kind {
            StmtKind::Expression(Expr { kind: ExprKind::Unary { op, operand }, .. }) => {
                assert_eq!(*op, Operator::PostIncrement);
                assert!(matches!(operand.kind, ExprKind::DerefArray { .. }));
            }
            other => panic!("Expected increment, got {:?}", other),
        }
        match &body[3].kind {
            StmtKind::VarDecl(group) => {
                let init = group.decls[0].initializer.as_ref().unwrap();
                assert!(matches!(init.kind, ExprKind::UintLiteral(3)));
            }
            other => panic!("Expected declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error_recovery() {
        let (program, ctx) = parse("void f() { int x = ; int y = 2; } void g() {}");
        assert_eq!(ctx.error_count(), 1);
        assert!(ctx.diagnostics()[0].message.contains("syntax error"));
        assert_eq!(program.functions().count(), 2);
        assert_eq!(function_body(&program).len(), 1);
    }

    #[test]
    fn test_line_directive_positions() {
        let (program, ctx) = parse("#line 100 \"shader.fx\"\nfloat x;\n");
        assert!(ctx.error_count() == 0);
        assert_eq!(&*program.units[0].pos.file, "shader.fx");
        assert_eq!(program.units[0].pos.line, 100);
    }

    #[test]
    fn test_lexer_errors_are_reported() {
        let (program, ctx) = parse("float x; @ float y;");
        assert_eq!(ctx.error_count(), 1);
        assert_eq!(program.units.len(), 2);
    }

    #[test]
    fn test_deep_nesting_reports_overflow() {
        let source = format!("void f() {{ {} }}", "{".repeat(1000) + &"}".repeat(1000));
        let (_, ctx) = parse(&source);
        assert!(ctx.diagnostics().iter().any(|d| d.message.contains("stack overflow")));
    }

    #[test]
    fn test_long_operator_chain_reports_overflow() {
        let source = format!("void f(int x) {{ x = x{}; int y = 1 + 2; }}", " + 1".repeat(50_000));
        let (program, ctx) = parse(&source);
        assert_eq!(ctx.error_count(), 1);
        assert!(ctx.diagnostics()[0].message.contains("stack overflow"));
        // parsing resumes after the runaway statement
        assert_eq!(function_body(&program).len(), 1);

        let (_, ctx) = parse(&format!("void f(int x) {{ x = x{}; }}", " + 1".repeat(100)));
        assert_eq!(ctx.error_count(), 0);
    }

    #[test]
    fn test_initializer_list_rejected() {
        let (_, ctx) = parse("float a[2] = { 1, 2 };");
        assert_eq!(ctx.error_count(), 1);
        assert!(ctx.diagnostics()[0].message.contains("Initializer lists"));
    }
}
