//! Pretty printing utilities for IR trees.

use pretty::{BoxAllocator, DocBuilder};

/// Default line width for pretty printing.
pub const DEFAULT_WIDTH: usize = 80;

/// Indentation applied to nested IR sequences.
pub const NEST: isize = 2;

/// A pretty-printable value.
pub trait PrettyPrint {
    /// Convert to a pretty document.
    fn to_doc<'a>(&self, allocator: &'a BoxAllocator) -> DocBuilder<'a, BoxAllocator>;

    /// Pretty print to a string with the given width.
    fn pretty_print(&self, width: usize) -> String {
        let allocator = BoxAllocator;
        let doc = self.to_doc(&allocator).into_doc();
        let mut output = String::new();
        // Writing into a String cannot fail.
        let _ = doc.render_fmt(width, &mut output);
        output
    }

    /// Pretty print with default width.
    fn pretty(&self) -> String {
        self.pretty_print(DEFAULT_WIDTH)
    }
}
