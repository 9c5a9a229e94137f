//! # hlslc - front end for an HLSL-style shading language
//!
//! Turns shader source text into a label/jump tree IR, reporting every
//! problem it can find along the way:
//! - Recursive-descent parsing into an AST with `(file, line)` positions
//! - Semantic analysis: scoping, type inference, implicit conversions,
//!   overload resolution, swizzles, constant array dimensions
//! - Lowering of each user function to a tree IR with explicit control flow
//!
//! ## Architecture
//!
//! ```text
//! Source → Lexer → Parser → AST → Semantic analysis → IR builder → IR
//! ```
//!
//! All state lives in a per-compilation [`context::Context`]; independent
//! compilations can run side by side.
//!
//! ## Example
//!
//! ```rust,ignore
//! use hlslc::prelude::*;
//!
//! let source = r#"
//!     float4 main(float4 pos : POSITION) : SV_POSITION {
//!         float x = 1;
//!         return float4(x, x, x, 1.0);
//!     }
//! "#;
//!
//! let result = hlslc::compile(source, &CompileOptions::default());
//! assert!(result.success);
//! println!("{}", hlslc::ir::print_functions(&result.ir));
//! ```

#![warn(clippy::all)]

pub mod context;
pub mod frontend;
pub mod ir;
pub mod semantic;
pub mod utils;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::context::Context;
    pub use crate::frontend::ast::*;
    pub use crate::frontend::{parse, ParseError};
    pub use crate::ir::{IrExpr, IrExprKind, IrFunction, IrStmt};
    pub use crate::semantic::datatype::{Datatype, DatatypeRef};
    pub use crate::semantic::scope::SymbolIndex;
    pub use crate::utils::errors::*;
    pub use crate::utils::PrettyPrint;
    pub use crate::{compile, CompileOptions, CompileResult, Stage};
}

use crate::context::Context;
use crate::frontend::ast::Program;
use crate::ir::IrFunction;
use crate::utils::errors::Diagnostic;
use crate::utils::location::SourcePos;
use anyhow::{anyhow, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The last pipeline stage to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    Parse,
    Analyze,
    Ir,
}

/// Configuration for one compilation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileOptions {
    /// Name stamped on diagnostics until a `#line` directive changes it
    pub filename: String,
    pub stop_after: Stage,
    /// Maximum number of AST/IR nodes before the compile is treated as out
    /// of memory
    pub node_limit: Option<usize>,
    /// Cooperative cancellation, checked at every statement and expression
    #[serde(skip)]
    pub cancel: Option<Arc<AtomicBool>>,
    pub warnings_as_errors: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            filename: "<source>".to_string(),
            stop_after: Stage::Ir,
            node_limit: None,
            cancel: None,
            warnings_as_errors: false,
        }
    }
}

/// Everything a compilation produced.
#[derive(Debug)]
pub struct CompileResult {
    pub success: bool,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    /// The (analysed, when analysis ran) syntax tree
    pub ast: Option<Program>,
    /// Lowered functions indexed by function index; empty unless every
    /// stage up to IR building ran without errors
    pub ir: Vec<Option<IrFunction>>,
    pub function_count: u32,
    pub out_of_memory: bool,
}

impl CompileResult {
    /// The result reported when the node budget runs out. Carries no
    /// diagnostics and allocates nothing.
    pub fn out_of_memory() -> Self {
        Self {
            success: false,
            errors: Vec::new(),
            warnings: Vec::new(),
            ast: None,
            ir: Vec::new(),
            function_count: 0,
            out_of_memory: true,
        }
    }
}

/// Run the pipeline over `source` up to `options.stop_after`.
///
/// Each stage only runs when the previous ones reported no error. The
/// result always carries the complete error and warning lists.
pub fn compile(source: &str, options: &CompileOptions) -> CompileResult {
    let mut ctx = Context::from_options(options);

    debug!("parsing {} ({} bytes)", options.filename, source.len());
    let mut program = frontend::parse_into(source, &options.filename, &mut ctx);

    let mut function_count = 0;
    let mut ir = Vec::new();
    if options.stop_after >= Stage::Analyze && !ctx.is_fail() && !ctx.should_stop() {
        debug!("analysing {}", options.filename);
        function_count = semantic::analyze(&mut program, &mut ctx);
        if options.stop_after >= Stage::Ir && !ctx.is_fail() && !ctx.should_stop() {
            debug!("building IR for {} function(s)", function_count);
            ir = ir::build_program(&program, function_count, &mut ctx);
        }
    }

    if ctx.is_out_of_memory() {
        info!("compilation of {} ran out of memory", options.filename);
        return CompileResult::out_of_memory();
    }
    if ctx.is_cancelled() {
        let pos = SourcePos::new(Rc::from(options.filename.as_str()), 0);
        ctx.report(Diagnostic::error(&pos, "compilation cancelled"));
        ir.clear();
    }

    let (errors, warnings): (Vec<_>, Vec<_>) = ctx.take_diagnostics().into_iter().partition(|d| d.is_error());
    info!(
        "compiled {}: {} error(s), {} warning(s)",
        options.filename,
        errors.len(),
        warnings.len()
    );
    CompileResult {
        success: errors.is_empty(),
        errors,
        warnings,
        ast: Some(program),
        ir,
        function_count,
        out_of_memory: false,
    }
}

fn first_error(ctx: &Context) -> Result<()> {
    match ctx.diagnostics().iter().find(|d| d.is_error()) {
        Some(first) => Err(anyhow!("{} ({} error(s))", first, ctx.error_count())),
        None => Ok(()),
    }
}

/// Parse source code into an AST, failing on the first syntax error.
pub fn parse(source: &str, filename: &str) -> Result<(Program, Context)> {
    frontend::parse(source, filename)
}

/// Parse and analyse, failing on the first error of either stage.
pub fn parse_and_analyze(source: &str, filename: &str) -> Result<(Program, Context)> {
    let (mut program, mut ctx) = frontend::parse(source, filename)?;
    semantic::analyze(&mut program, &mut ctx);
    first_error(&ctx)?;
    Ok((program, ctx))
}

/// Full pipeline: parse, analyse and lower to IR.
pub fn lower(source: &str, filename: &str) -> Result<Vec<Option<IrFunction>>> {
    let (program, mut ctx) = frontend::parse(source, filename)?;
    let mut program = program;
    let count = semantic::analyze(&mut program, &mut ctx);
    first_error(&ctx)?;
    Ok(ir::build_program(&program, count, &mut ctx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_stage_order() {
        assert!(Stage::Parse < Stage::Analyze);
        assert!(Stage::Analyze < Stage::Ir);
    }

    #[test]
    fn test_stop_after_parse_skips_analysis() {
        let options = CompileOptions { stop_after: Stage::Parse, ..CompileOptions::default() };
        let result = compile("void main() { float x = y; }", &options);
        assert!(result.success);
        assert!(result.ir.is_empty());
        assert!(result.ast.is_some());
    }

    #[test]
    fn test_parse_and_analyze_reports_first_error() {
        let err = parse_and_analyze("void main() { return 1; }", "ret.hlsl").unwrap_err();
        assert!(err.to_string().starts_with("ret.hlsl:1: error:"), "{}", err);
    }
}
