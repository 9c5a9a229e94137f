//! Utility modules shared by every compiler stage:
//! - Error types and diagnostics
//! - Source location tracking
//! - String interning
//! - Pretty printing

pub mod errors;
pub mod location;
pub mod intern;
pub mod pretty;

// Re-exports
pub use errors::*;
pub use location::{SourceLocation, SourcePos, Span};
pub use intern::{StringCache, Symbol};
pub use pretty::PrettyPrint;
