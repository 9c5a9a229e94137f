//! Frontend: Lexer, Parser, and AST for the shading language.
//!
//! This module handles parsing of the input language into an AST.
//!
//! ## Language Overview
//!
//! The input is a C-like shading language with vector and matrix types,
//! swizzles and semantics:
//!
//! ```text
//! float4 main(float4 pos : POSITION) : SV_POSITION {
//!     float x = 1;
//!     float4 result = float4(x, x, x, 1.0);
//!     return result;
//! }
//! ```

pub mod token;
pub mod lexer;
pub mod ast;
pub mod parser;

// Re-exports
pub use lexer::Lexer;
pub use parser::Parser;
pub use ast::*;
pub use token::{Token, TokenKind};
pub use crate::utils::errors::ParseError;

use crate::context::Context;
use anyhow::{anyhow, Result};

/// Parse `source` into `ctx`, recording syntax errors there.
pub fn parse_into(source: &str, filename: &str, ctx: &mut Context) -> Program {
    Parser::new(source, filename, ctx).parse_program()
}

/// Parse source code into an AST, failing on the first syntax error.
pub fn parse(source: &str, filename: &str) -> Result<(Program, Context)> {
    let mut ctx = Context::new();
    let program = parse_into(source, filename, &mut ctx);
    if let Some(first) = ctx.diagnostics().iter().find(|d| d.is_error()) {
        return Err(anyhow!("{} ({} error(s))", first, ctx.error_count()));
    }
    Ok((program, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let source = r#"
            float4 main(float4 pos : POSITION) : SV_POSITION {
                for (int i = 0; i < 10; i++) {
                    pos.x += 1.0;
                }
                return pos;
            }
        "#;
        let result = parse(source, "simple.hlsl");
        assert!(result.is_ok());
        let (program, _) = result.unwrap();
        assert_eq!(program.functions().count(), 1);
    }

    #[test]
    fn test_parse_reports_first_error() {
        let err = parse("float x = ;", "bad.hlsl").unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("bad.hlsl:1: error: syntax error"), "{}", message);
    }
}
