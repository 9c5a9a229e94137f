//! Per-compilation state.
//!
//! One [`Context`] is created for each call into the pipeline and dropped at
//! the end of it. Nothing in the compiler is process-global: independent
//! compilations can run side by side, each with its own context.

use crate::semantic::datatype::Primitives;
use crate::utils::errors::{Diagnostic, DiagnosticSeverity, SemanticErrorKind};
use crate::utils::intern::StringCache;
use crate::utils::location::SourcePos;
use crate::CompileOptions;
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct Context {
    /// Interned identifiers, member names and semantics
    pub strings: StringCache,
    /// Canonical primitive datatypes
    pub types: Primitives,
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    nodes: usize,
    node_limit: Option<usize>,
    out_of_memory: bool,
    cancel: Option<Arc<AtomicBool>>,
    warnings_as_errors: bool,
}

impl Context {
    pub fn new() -> Self {
        Self {
            strings: StringCache::new(),
            types: Primitives::new(),
            diagnostics: Vec::new(),
            error_count: 0,
            nodes: 0,
            node_limit: None,
            out_of_memory: false,
            cancel: None,
            warnings_as_errors: false,
        }
    }

    pub fn from_options(options: &CompileOptions) -> Self {
        Self {
            node_limit: options.node_limit,
            cancel: options.cancel.clone(),
            warnings_as_errors: options.warnings_as_errors,
            ..Self::new()
        }
    }

    /// Record an error. Nothing is recorded once out of memory.
    pub fn error(&mut self, pos: &SourcePos, kind: SemanticErrorKind, message: impl Into<String>) {
        self.report(Diagnostic::error(pos, message).with_kind(kind));
    }

    pub fn warning(&mut self, pos: &SourcePos, message: impl Into<String>) {
        self.report(Diagnostic::warning(pos, message));
    }

    pub fn report(&mut self, mut diagnostic: Diagnostic) {
        if self.out_of_memory {
            return;
        }
        if self.warnings_as_errors && !diagnostic.is_error() {
            diagnostic.severity = DiagnosticSeverity::Error;
        }
        if diagnostic.is_error() {
            self.error_count += 1;
        }
        debug!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Whether any error has been recorded (the compile has failed).
    pub fn is_fail(&self) -> bool {
        self.error_count > 0 || self.out_of_memory
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.error_count = 0;
        std::mem::take(&mut self.diagnostics)
    }

    /// Charge one node against the budget; `false` once it is exhausted.
    pub fn count_node(&mut self) -> bool {
        if self.out_of_memory {
            return false;
        }
        self.nodes += 1;
        if let Some(limit) = self.node_limit {
            if self.nodes > limit {
                warn!("node budget of {} exhausted", limit);
                self.out_of_memory = true;
                return false;
            }
        }
        true
    }

    pub fn node_count(&self) -> usize {
        self.nodes
    }

    pub fn is_out_of_memory(&self) -> bool {
        self.out_of_memory
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Fatal conditions that end the walk early.
    pub fn should_stop(&self) -> bool {
        self.out_of_memory || self.is_cancelled()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_budget_latches() {
        let options = CompileOptions { node_limit: Some(2), ..CompileOptions::default() };
        let mut ctx = Context::from_options(&options);
        assert!(ctx.count_node());
        assert!(ctx.count_node());
        assert!(!ctx.count_node());
        assert!(ctx.is_out_of_memory());
        assert!(!ctx.count_node());

        ctx.error(&SourcePos::builtin(), SemanticErrorKind::UnknownIdentifier, "lost");
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn test_diagnostics_are_counted() {
        let mut ctx = Context::new();
        let pos = SourcePos::builtin();
        ctx.warning(&pos, "careful");
        assert!(!ctx.is_fail());
        ctx.error(&pos, SemanticErrorKind::IncompatibleTypes, "bad");
        assert!(ctx.is_fail());
        assert_eq!(ctx.error_count(), 1);
        assert_eq!(ctx.diagnostics().len(), 2);
    }

    #[test]
    fn test_warnings_as_errors() {
        let options = CompileOptions { warnings_as_errors: true, ..CompileOptions::default() };
        let mut ctx = Context::from_options(&options);
        ctx.warning(&SourcePos::builtin(), "careful");
        assert!(ctx.is_fail());
    }

    #[test]
    fn test_cancellation_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let options = CompileOptions { cancel: Some(Arc::clone(&flag)), ..CompileOptions::default() };
        let ctx = Context::from_options(&options);
        assert!(!ctx.should_stop());
        flag.store(true, Ordering::Relaxed);
        assert!(ctx.should_stop());
    }
}
