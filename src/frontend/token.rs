//! Token types for the shading language.
//!
//! This module defines all token types produced by the lexer, including the
//! fixed keyword table that maps reserved words (statement keywords, storage
//! qualifiers and the built-in type names such as `float4x4`) to terminals.

use crate::utils::location::{SourcePos, Span};
use std::fmt;

/// A token in the source code.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The physical source span
    pub span: Span,
    /// The lexeme (raw text)
    pub lexeme: String,
    /// Decoded literal value, if this is a numeric literal
    pub value: TokenValue,
    /// Logical `(file, line)` after `#line` remapping
    pub pos: SourcePos,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, span: Span, lexeme: String, pos: SourcePos) -> Self {
        Self { kind, span, lexeme, value: TokenValue::None, pos }
    }

    /// Attach a decoded literal value.
    pub fn with_value(mut self, value: TokenValue) -> Self {
        self.value = value;
        self
    }

    /// Check if this is an EOF token.
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_eof() {
            write!(f, "end of file")
        } else {
            write!(f, "'{}'", self.lexeme)
        }
    }
}

/// The typed payload of a literal token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenValue {
    None,
    Int(i64),
    Float(f64),
}

/// Scalar part of a built-in type keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKeyword {
    Bool,
    Int,
    Uint,
    Half,
    Float,
    Double,
}

impl ScalarKeyword {
    fn from_prefix(s: &str) -> Option<(ScalarKeyword, &str)> {
        const PREFIXES: [(&str, ScalarKeyword); 7] = [
            ("bool", ScalarKeyword::Bool),
            ("int", ScalarKeyword::Int),
            ("uint", ScalarKeyword::Uint),
            ("dword", ScalarKeyword::Uint),
            ("half", ScalarKeyword::Half),
            ("float", ScalarKeyword::Float),
            ("double", ScalarKeyword::Double),
        ];
        PREFIXES
            .iter()
            .find(|(prefix, _)| s.starts_with(prefix))
            .map(|(prefix, kw)| (*kw, &s[prefix.len()..]))
    }
}

/// Sampler flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerKeyword {
    Sampler1D,
    Sampler2D,
    Sampler3D,
    SamplerCube,
    State,
    ComparisonState,
}

/// Built-in type names recognised by the keyword table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKeyword {
    Void,
    String,
    Scalar(ScalarKeyword),
    Vector(ScalarKeyword, u8),
    Matrix(ScalarKeyword, u8, u8),
    Sampler(SamplerKeyword),
    /// `vector<T, N>`
    GenericVector,
    /// `matrix<T, R, C>`
    GenericMatrix,
    /// `Buffer<T>`
    Buffer,
}

impl TypeKeyword {
    /// Look up a built-in type name such as `float`, `int3` or `half2x4`.
    pub fn lookup(s: &str) -> Option<TypeKeyword> {
        let fixed = match s {
            "void" => Some(TypeKeyword::Void),
            "string" => Some(TypeKeyword::String),
            "vector" => Some(TypeKeyword::GenericVector),
            "matrix" => Some(TypeKeyword::GenericMatrix),
            "Buffer" => Some(TypeKeyword::Buffer),
            "sampler" | "sampler2D" => Some(TypeKeyword::Sampler(SamplerKeyword::Sampler2D)),
            "sampler1D" => Some(TypeKeyword::Sampler(SamplerKeyword::Sampler1D)),
            "sampler3D" => Some(TypeKeyword::Sampler(SamplerKeyword::Sampler3D)),
            "samplerCUBE" => Some(TypeKeyword::Sampler(SamplerKeyword::SamplerCube)),
            "sampler_state" | "SamplerState" => Some(TypeKeyword::Sampler(SamplerKeyword::State)),
            "SamplerComparisonState" => {
                Some(TypeKeyword::Sampler(SamplerKeyword::ComparisonState))
            }
            _ => None,
        };
        if fixed.is_some() {
            return fixed;
        }

        let (scalar, rest) = ScalarKeyword::from_prefix(s)?;
        let digit = |c: u8| -> Option<u8> {
            match c {
                b'1'..=b'4' => Some(c - b'0'),
                _ => None,
            }
        };
        match rest.as_bytes() {
            [] => Some(TypeKeyword::Scalar(scalar)),
            [n] => Some(TypeKeyword::Vector(scalar, digit(*n)?)),
            [r, b'x', c] => Some(TypeKeyword::Matrix(scalar, digit(*r)?, digit(*c)?)),
            _ => None,
        }
    }
}

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    /// Integer literal
    Integer,
    /// Floating-point literal
    Float,
    /// String literal
    String,

    // Identifiers
    /// Identifier (variable, function name, user type, ...)
    Identifier,
    /// Built-in type name
    Type(TypeKeyword),

    // Keywords
    Struct,
    Typedef,
    If,
    Else,
    For,
    Do,
    While,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Return,
    Discard,
    True,
    False,

    // Qualifiers
    Const,
    Static,
    Uniform,
    Extern,
    Volatile,
    Shared,
    Groupshared,
    In,
    Out,
    Inout,
    Snorm,
    Unorm,
    RowMajor,
    ColumnMajor,
    Nointerpolation,
    Linear,
    Centroid,
    Noperspective,
    Inline,

    // Arithmetic operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,

    // Bitwise operators
    Amp,
    Pipe,
    Caret,
    Tilde,
    LessLess,
    GreaterGreater,

    // Comparison operators
    EqualEqual,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Assignment operators
    Equal,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    LessLessEqual,
    GreaterGreaterEqual,
    AmpEqual,
    PipeEqual,
    CaretEqual,

    // Logical operators
    AmpAmp,
    PipePipe,
    Bang,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Comma,
    Semicolon,
    Colon,
    Question,
    Dot,

    // Special
    /// End of file
    Eof,
}

impl TokenKind {
    /// Get the keyword for a string, if it is a keyword.
    pub fn keyword(s: &str) -> Option<TokenKind> {
        use TokenKind::*;
        let kind = match s {
            "struct" => Struct,
            "typedef" => Typedef,
            "if" => If,
            "else" => Else,
            "for" => For,
            "do" => Do,
            "while" => While,
            "switch" => Switch,
            "case" => Case,
            "default" => Default,
            "break" => Break,
            "continue" => Continue,
            "return" => Return,
            "discard" => Discard,
            "true" => True,
            "false" => False,
            "const" => Const,
            "static" => Static,
            "uniform" => Uniform,
            "extern" => Extern,
            "volatile" => Volatile,
            "shared" => Shared,
            "groupshared" => Groupshared,
            "in" => In,
            "out" => Out,
            "inout" => Inout,
            "snorm" => Snorm,
            "unorm" => Unorm,
            "row_major" => RowMajor,
            "column_major" => ColumnMajor,
            "nointerpolation" => Nointerpolation,
            "linear" => Linear,
            "centroid" => Centroid,
            "noperspective" => Noperspective,
            "inline" => Inline,
            _ => return TypeKeyword::lookup(s).map(Type),
        };
        Some(kind)
    }

    /// Check if this is an assignment operator.
    pub fn is_assignment(&self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Equal | PlusEqual | MinusEqual | StarEqual | SlashEqual | PercentEqual |
            LessLessEqual | GreaterGreaterEqual | AmpEqual | PipeEqual | CaretEqual
        )
    }

    /// Storage, interpolation and layout qualifiers that may prefix a declaration.
    pub fn is_qualifier(&self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Const | Static | Uniform | Extern | Volatile | Shared | Groupshared |
            In | Out | Inout | Snorm | Unorm | RowMajor | ColumnMajor |
            Nointerpolation | Linear | Centroid | Noperspective | Inline
        )
    }

    /// Get a human-readable name for this token kind.
    pub fn name(&self) -> &'static str {
        use TokenKind::*;
        match self {
            Integer => "integer",
            Float => "float literal",
            String => "string",
            Identifier => "identifier",
            Type(_) => "type name",
            Struct => "struct",
            Typedef => "typedef",
            If => "if",
            Else => "else",
            For => "for",
            Do => "do",
            While => "while",
            Switch => "switch",
            Case => "case",
            Default => "default",
            Break => "break",
            Continue => "continue",
            Return => "return",
            Discard => "discard",
            True => "true",
            False => "false",
            Const => "const",
            Static => "static",
            Uniform => "uniform",
            Extern => "extern",
            Volatile => "volatile",
            Shared => "shared",
            Groupshared => "groupshared",
            In => "in",
            Out => "out",
            Inout => "inout",
            Snorm => "snorm",
            Unorm => "unorm",
            RowMajor => "row_major",
            ColumnMajor => "column_major",
            Nointerpolation => "nointerpolation",
            Linear => "linear",
            Centroid => "centroid",
            Noperspective => "noperspective",
            Inline => "inline",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            PlusPlus => "++",
            MinusMinus => "--",
            Amp => "&",
            Pipe => "|",
            Caret => "^",
            Tilde => "~",
            LessLess => "<<",
            GreaterGreater => ">>",
            EqualEqual => "==",
            BangEqual => "!=",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            Equal => "=",
            PlusEqual => "+=",
            MinusEqual => "-=",
            StarEqual => "*=",
            SlashEqual => "/=",
            PercentEqual => "%=",
            LessLessEqual => "<<=",
            GreaterGreaterEqual => ">>=",
            AmpEqual => "&=",
            PipeEqual => "|=",
            CaretEqual => "^=",
            AmpAmp => "&&",
            PipePipe => "||",
            Bang => "!",
            LeftParen => "(",
            RightParen => ")",
            LeftBracket => "[",
            RightBracket => "]",
            LeftBrace => "{",
            RightBrace => "}",
            Comma => ",",
            Semicolon => ";",
            Colon => ":",
            Question => "?",
            Dot => ".",
            Eof => "end of file",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(TokenKind::keyword("for"), Some(TokenKind::For));
        assert_eq!(TokenKind::keyword("struct"), Some(TokenKind::Struct));
        assert_eq!(TokenKind::keyword("foobar"), None);
    }

    #[test]
    fn test_type_keywords() {
        assert_eq!(
            TypeKeyword::lookup("float"),
            Some(TypeKeyword::Scalar(ScalarKeyword::Float))
        );
        assert_eq!(
            TypeKeyword::lookup("uint3"),
            Some(TypeKeyword::Vector(ScalarKeyword::Uint, 3))
        );
        assert_eq!(
            TypeKeyword::lookup("half2x4"),
            Some(TypeKeyword::Matrix(ScalarKeyword::Half, 2, 4))
        );
        assert_eq!(TypeKeyword::lookup("float5"), None);
        assert_eq!(TypeKeyword::lookup("float4x"), None);
        assert_eq!(TypeKeyword::lookup("integer"), None);
        assert_eq!(
            TokenKind::keyword("samplerCUBE"),
            Some(TokenKind::Type(TypeKeyword::Sampler(SamplerKeyword::SamplerCube)))
        );
    }

    #[test]
    fn test_is_assignment() {
        assert!(TokenKind::Equal.is_assignment());
        assert!(TokenKind::GreaterGreaterEqual.is_assignment());
        assert!(!TokenKind::EqualEqual.is_assignment());
    }
}
