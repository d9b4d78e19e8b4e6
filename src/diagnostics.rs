use crate::fix::TextEdit;
use crate::level::LintLevel;
use crate::lint::LintDescriptor;
use serde::Serialize;
use tree_sitter::Range;

/// A single finding produced by dispose-clippy.
#[derive(Debug, Clone)]
#[must_use]
pub struct Diagnostic {
    pub lint: &'static LintDescriptor,
    pub level: LintLevel,
    pub file: Option<String>,
    pub span: Span,
    pub message: String,
    pub help: Option<String>,
    pub suggestion: Option<Suggestion>,
}

impl Diagnostic {
    /// `IDISP002: Dispose member ...` style headline used by every output format.
    pub fn headline(&self) -> String {
        format!("{}: {}", self.lint.id, self.message)
    }
}

/// A proposed rewrite for a diagnostic, expressed as byte-offset edits.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// Action title shown to the user, e.g. "Dispose member".
    pub message: String,
    pub edits: Vec<TextEdit>,
    pub applicability: Applicability,
}

impl Suggestion {
    pub fn new(message: impl Into<String>, edits: Vec<TextEdit>, applicability: Applicability) -> Self {
        Self {
            message: message.into(),
            edits,
            applicability,
        }
    }

    pub fn machine_applicable(message: impl Into<String>, edits: Vec<TextEdit>) -> Self {
        Self::new(message, edits, Applicability::MachineApplicable)
    }

    pub fn maybe_incorrect(message: impl Into<String>, edits: Vec<TextEdit>) -> Self {
        Self::new(message, edits, Applicability::MaybeIncorrect)
    }
}

/// Applicability of an automated suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Applicability {
    MachineApplicable,
    MaybeIncorrect,
    HasPlaceholders,
    Unspecified,
}

/// Span in a C# source file (1-based row/column positions plus byte offsets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
    pub start_byte: usize,
    pub end_byte: usize,
}

/// Single position in a source file (1-based row/column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

impl Span {
    /// Construct a `Span` from a tree-sitter range, converting to 1-based positions.
    #[must_use]
    pub fn from_range(range: Range) -> Self {
        Self {
            start: Position {
                row: range.start_point.row + 1,
                column: range.start_point.column + 1,
            },
            end: Position {
                row: range.end_point.row + 1,
                column: range.end_point.column + 1,
            },
            start_byte: range.start_byte,
            end_byte: range.end_byte,
        }
    }

    /// Zero-width span at `byte_offset`.
    #[must_use]
    pub fn at_offset(source: &str, byte_offset: usize) -> Self {
        let pos = position_from_byte_offset(source, byte_offset);
        Self {
            start: pos,
            end: pos,
            start_byte: byte_offset,
            end_byte: byte_offset,
        }
    }
}

pub(crate) fn position_from_byte_offset(source: &str, byte_offset: usize) -> Position {
    let mut row = 1usize;
    let mut col = 1usize;

    let end = byte_offset.min(source.len());
    for b in source.as_bytes().iter().take(end) {
        if *b == b'\n' {
            row += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    Position { row, column: col }
}

/// Stable ordering used by every output format: file, row, column, rule id.
pub fn sort_diagnostics(diags: &mut [Diagnostic]) {
    diags.sort_by(|a, b| {
        (a.file.as_deref(), a.span.start, a.lint.id).cmp(&(b.file.as_deref(), b.span.start, b.lint.id))
    });
}
