//! Source location tracking for error reporting.
//!
//! Tokens carry a [`Span`] (physical line/column/offset in the text being
//! lexed). AST and IR nodes carry the coarser [`SourcePos`]: the logical
//! `(filename, line)` pair, which honours `#line` directives.

use std::fmt;
use std::rc::Rc;
use serde::{Serialize, Deserialize};

/// A position in source code (line and column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
    /// Byte offset from start of file
    pub offset: usize,
}

impl SourceLocation {
    /// Create a new source location.
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }

    /// Create a location at the start of a file.
    pub fn start() -> Self {
        Self { line: 1, column: 1, offset: 0 }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A span in source code (start and end positions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start line (1-indexed)
    pub start_line: usize,
    /// Start column (1-indexed)
    pub start_column: usize,
    /// End line (1-indexed)
    pub end_line: usize,
    /// End column (1-indexed)
    pub end_column: usize,
    /// Byte offset of start
    pub start_offset: usize,
    /// Byte offset of end
    pub end_offset: usize,
}

impl Span {
    /// Create a span from start and end locations.
    pub fn from_locations(start: SourceLocation, end: SourceLocation) -> Self {
        Self {
            start_line: start.line,
            start_column: start.column,
            end_line: end.line,
            end_column: end.column,
            start_offset: start.offset,
            end_offset: end.offset,
        }
    }

    /// Create a dummy span (for generated code).
    pub fn dummy() -> Self {
        Self::default()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start_line == self.end_line {
            write!(f, "{}:{}-{}", self.start_line, self.start_column, self.end_column)
        } else {
            write!(
                f,
                "{}:{}-{}:{}",
                self.start_line, self.start_column, self.end_line, self.end_column
            )
        }
    }
}

/// The logical `(filename, line)` stamp carried by every AST and IR node.
///
/// The filename is shared: cloning a position only bumps a reference count.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourcePos {
    pub file: Rc<str>,
    pub line: usize,
}

impl SourcePos {
    pub fn new(file: Rc<str>, line: usize) -> Self {
        Self { file, line }
    }

    /// Position used for synthesized nodes that have no source text.
    pub fn builtin() -> Self {
        Self { file: Rc::from("<builtin>"), line: 0 }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_display() {
        let start = SourceLocation::new(1, 5, 4);
        let span = Span::from_locations(start, SourceLocation::new(1, 10, 9));
        assert_eq!(format!("{}", span), "1:5-10");
        assert_eq!(span.end_offset - span.start_offset, 5);

        let span = Span::from_locations(start, SourceLocation::new(3, 10, 30));
        assert_eq!(format!("{}", span), "1:5-3:10");
    }

    #[test]
    fn test_source_pos_display() {
        let pos = SourcePos::new(Rc::from("shader.hlsl"), 12);
        assert_eq!(pos.to_string(), "shader.hlsl:12");
        assert_eq!(SourcePos::builtin().line, 0);
    }
}
