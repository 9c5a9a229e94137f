//! Error types for the shader compiler.
//!
//! This module defines all error types used throughout the crate,
//! organized by the phase that produces them, plus the [`Diagnostic`]
//! record that ends up in a [`CompileResult`](crate::CompileResult).

use thiserror::Error;
use crate::utils::location::{Span, SourcePos};
use serde::{Serialize, Deserialize};
use std::fmt;

/// Error during lexical analysis.
#[derive(Error, Debug, Clone)]
pub struct LexerError {
    /// The error message
    pub message: String,
    /// Location in source
    pub span: Span,
    /// The kind of lexer error
    pub kind: LexerErrorKind,
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexerErrorKind {
    /// Unexpected character
    UnexpectedChar,
    /// Unterminated string literal
    UnterminatedString,
    /// Invalid number literal
    InvalidNumber,
    /// Invalid escape sequence
    InvalidEscape,
    /// Malformed preprocessor line
    BadDirective,
}

/// Error during parsing.
#[derive(Error, Debug, Clone)]
pub struct ParseError {
    /// The error message
    pub message: String,
    /// Location in source
    pub pos: SourcePos,
    /// The kind of parse error
    pub kind: ParseErrorKind,
    /// What was found
    pub found: Option<String>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref found) = self.found {
            write!(f, " (found: {})", found)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Unexpected token
    UnexpectedToken,
    /// Expected an expression
    ExpectedExpression,
    /// Expected an identifier
    ExpectedIdentifier,
    /// Expected a type
    ExpectedType,
    /// A lexer error surfaced while parsing
    Lexical,
    /// Nesting went deeper than the parser allows
    StackOverflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticErrorKind {
    DuplicateSymbol,
    DuplicateFunction,
    UnknownIdentifier,
    UnknownType,
    UnknownStructMember,
    NoMatchingFunction,
    AmbiguousFunctionCall,
    IncompatibleTypes,
    ExpectedNumericType,
    ExpectedIntegerType,
    ExpectedBooleanType,
    ExpectedArray,
    ExpectedStruct,
    ExpectedFunction,
    TooFewArguments,
    TooManyArguments,
    InvalidSwizzle,
    ArrayDimensionNotConstant,
    ArrayDimensionNotInteger,
    ArrayDimensionNegative,
    BreakOutsideLoopOrSwitch,
    ContinueOutsideLoop,
    ReturnTypeMismatch,
    DuplicateDefault,
    CaseNotConstant,
}

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticSeverity {
    /// Error - no IR will be produced
    Error,
    /// Warning - compilation continues
    Warning,
}

/// One reported problem, attributed to a `(filename, line)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level
    pub severity: DiagnosticSeverity,
    /// File the problem was found in
    pub filename: String,
    /// Line in that file (0 for problems without a position)
    pub line: usize,
    /// Message
    pub message: String,
    /// Semantic classification, when the problem came from analysis
    pub kind: Option<SemanticErrorKind>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(pos: &SourcePos, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            filename: pos.file.to_string(),
            line: pos.line,
            message: message.into(),
            kind: None,
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(pos: &SourcePos, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            ..Self::error(pos, message)
        }
    }

    /// Attach a semantic classification.
    pub fn with_kind(mut self, kind: SemanticErrorKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
        };
        write!(f, "{}:{}: {}: {}", self.filename, self.line, label, self.message)
    }
}

impl From<ParseError> for Diagnostic {
    fn from(err: ParseError) -> Self {
        let message = err.to_string();
        Diagnostic::error(&err.pos, message)
    }
}
