//! Text-edit primitives behind every automated fix.
//!
//! Everything here works on strings and byte offsets; no file I/O. Edits
//! are validated to be non-overlapping and applied back to front so that
//! earlier offsets stay valid.

use thiserror::Error;

/// Error type for fix application operations.
#[derive(Debug, Error)]
pub enum FixError {
    #[error("Overlapping edits detected at byte {0}")]
    OverlappingEdits(usize),

    #[error("Edit range [{start}..{end}) exceeds source length {source_len}")]
    InvalidRange {
        start: usize,
        end: usize,
        source_len: usize,
    },

    #[error("Edit start {start} is after edit end {end}")]
    InvalidEditOrder { start: usize, end: usize },

    #[error("Edit boundary {0} is not on a character boundary")]
    NotCharBoundary(usize),
}

/// Replace `[start_byte..end_byte)` with `replacement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub start_byte: usize,
    pub end_byte: usize,
    pub replacement: String,
}

impl TextEdit {
    pub fn new(start_byte: usize, end_byte: usize, replacement: impl Into<String>) -> Self {
        Self {
            start_byte,
            end_byte,
            replacement: replacement.into(),
        }
    }

    pub fn delete(start_byte: usize, end_byte: usize) -> Self {
        Self::new(start_byte, end_byte, String::new())
    }

    pub fn insert(byte_offset: usize, text: impl Into<String>) -> Self {
        Self::new(byte_offset, byte_offset, text)
    }

    pub fn replace(start_byte: usize, end_byte: usize, replacement: impl Into<String>) -> Self {
        Self::new(start_byte, end_byte, replacement)
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start_byte..self.end_byte
    }

    pub fn is_insertion(&self) -> bool {
        self.start_byte == self.end_byte
    }

    /// Two ranges overlap when they share a byte. Insertions at the same
    /// offset do not overlap; they are applied in input order.
    pub fn overlaps_with(&self, other: &TextEdit) -> bool {
        if self.is_insertion() && other.is_insertion() {
            return false;
        }
        if self.is_insertion() {
            return other.start_byte < self.start_byte && self.start_byte < other.end_byte;
        }
        if other.is_insertion() {
            return self.start_byte < other.start_byte && other.start_byte < self.end_byte;
        }
        self.start_byte < other.end_byte && other.start_byte < self.end_byte
    }

    pub fn validate(&self, source: &str) -> Result<(), FixError> {
        if self.start_byte > self.end_byte {
            return Err(FixError::InvalidEditOrder {
                start: self.start_byte,
                end: self.end_byte,
            });
        }

        if self.end_byte > source.len() {
            return Err(FixError::InvalidRange {
                start: self.start_byte,
                end: self.end_byte,
                source_len: source.len(),
            });
        }

        for b in [self.start_byte, self.end_byte] {
            if !source.is_char_boundary(b) {
                return Err(FixError::NotCharBoundary(b));
            }
        }

        Ok(())
    }
}

/// Validate that a list of edits are non-overlapping and within bounds.
pub fn validate_edits(edits: &[TextEdit], source: &str) -> Result<(), FixError> {
    for edit in edits {
        edit.validate(source)?;
    }

    for i in 0..edits.len() {
        for j in (i + 1)..edits.len() {
            if edits[i].overlaps_with(&edits[j]) {
                return Err(FixError::OverlappingEdits(edits[i].start_byte));
            }
        }
    }

    Ok(())
}

/// Apply a list of non-overlapping edits to source code.
///
/// # Example
///
/// ```rust
/// use dispose_clippy::fix::{TextEdit, apply_fixes};
///
/// let source = "GC.SuppressFinalize(null);";
/// let edits = vec![TextEdit::replace(20, 24, "this")];
///
/// let result = apply_fixes(source, &edits).unwrap();
/// assert_eq!(result, "GC.SuppressFinalize(this);");
/// ```
pub fn apply_fixes(source: &str, edits: &[TextEdit]) -> Result<String, FixError> {
    if edits.is_empty() {
        return Ok(source.to_string());
    }

    validate_edits(edits, source)?;

    // Back to front; for equal offsets the later input edit goes first so
    // that same-offset insertions end up in input order.
    let mut order: Vec<usize> = (0..edits.len()).collect();
    order.sort_by(|&a, &b| {
        edits[b]
            .start_byte
            .cmp(&edits[a].start_byte)
            .then_with(|| b.cmp(&a))
    });

    let mut result = source.to_string();
    for idx in order {
        let edit = &edits[idx];
        result.replace_range(edit.range(), &edit.replacement);
    }

    Ok(result)
}

/// Apply a single edit to source code (convenience wrapper).
pub fn apply_fix(source: &str, edit: &TextEdit) -> Result<String, FixError> {
    apply_fixes(source, std::slice::from_ref(edit))
}

/// Byte offset of the first character of the line containing `byte_offset`.
pub fn line_start(source: &str, byte_offset: usize) -> usize {
    let end = byte_offset.min(source.len());
    source[..end].rfind('\n').map_or(0, |i| i + 1)
}

/// Leading whitespace of the line containing `byte_offset`.
pub fn indentation_at(source: &str, byte_offset: usize) -> &str {
    let start = line_start(source, byte_offset);
    let rest = &source[start..];
    let len = rest
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(rest.len());
    &rest[..len]
}

/// One indentation step, inferred from the file (four spaces when unknown).
pub fn indent_unit(source: &str) -> &'static str {
    if source.lines().any(|l| l.starts_with('\t')) {
        "\t"
    } else if source
        .lines()
        .any(|l| (l.len() - l.trim_start_matches(' ').len()) % 4 == 2)
    {
        "  "
    } else {
        "    "
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_edit_creation() {
        let edit = TextEdit::new(0, 5, "hello");
        assert_eq!(edit.start_byte, 0);
        assert_eq!(edit.end_byte, 5);
        assert_eq!(edit.replacement, "hello");
    }

    #[test]
    fn test_text_edit_insert_is_zero_width() {
        let edit = TextEdit::insert(5, "inserted");
        assert!(edit.is_insertion());
        assert_eq!(edit.range(), 5..5);
    }

    #[test]
    fn test_overlaps_with() {
        let edit1 = TextEdit::new(0, 10, "a");
        let edit2 = TextEdit::new(5, 15, "b");
        let edit3 = TextEdit::new(10, 20, "c");

        assert!(edit1.overlaps_with(&edit2));
        assert!(edit2.overlaps_with(&edit1));
        assert!(!edit1.overlaps_with(&edit3));
        assert!(!edit3.overlaps_with(&edit1));
    }

    #[test]
    fn test_insertion_inside_replacement_overlaps() {
        let replace = TextEdit::new(0, 10, "a");
        let inside = TextEdit::insert(4, "x");
        let at_edge = TextEdit::insert(10, "y");
        assert!(replace.overlaps_with(&inside));
        assert!(inside.overlaps_with(&replace));
        assert!(!replace.overlaps_with(&at_edge));
    }

    #[test]
    fn test_validate_edit_invalid_order() {
        let edit = TextEdit::new(10, 5, "hello");
        assert!(matches!(
            edit.validate(&"x".repeat(20)),
            Err(FixError::InvalidEditOrder { .. })
        ));
    }

    #[test]
    fn test_validate_edit_exceeds_length() {
        let edit = TextEdit::new(0, 15, "hello");
        assert!(matches!(
            edit.validate("0123456789"),
            Err(FixError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_split_characters() {
        let edit = TextEdit::new(1, 1, "x");
        assert!(matches!(
            edit.validate("é"),
            Err(FixError::NotCharBoundary(1))
        ));
    }

    #[test]
    fn test_validate_edits_overlapping() {
        let edits = vec![TextEdit::new(0, 10, "a"), TextEdit::new(5, 15, "b")];
        assert!(matches!(
            validate_edits(&edits, &"x".repeat(20)),
            Err(FixError::OverlappingEdits(_))
        ));
    }

    #[test]
    fn test_apply_argument_replacement() {
        let source = "GC.SuppressFinalize(null);";
        let edit = TextEdit::replace(20, 24, "this");
        assert_eq!(apply_fix(source, &edit).unwrap(), "GC.SuppressFinalize(this);");
    }

    #[test]
    fn test_apply_multiple_edits_preserves_offsets() {
        let source = "a.Dispose(); b.Dispose();";
        let edits = vec![
            TextEdit::replace(0, 1, "this.a"),
            TextEdit::replace(13, 14, "this.b"),
        ];
        assert_eq!(
            apply_fixes(source, &edits).unwrap(),
            "this.a.Dispose(); this.b.Dispose();"
        );
    }

    #[test]
    fn test_same_offset_insertions_keep_input_order() {
        let source = "{}";
        let edits = vec![TextEdit::insert(1, "first;"), TextEdit::insert(1, "second;")];
        assert_eq!(apply_fixes(source, &edits).unwrap(), "{first;second;}");
    }

    #[test]
    fn test_no_edits_is_identity() {
        let source = "unchanged";
        assert_eq!(apply_fixes(source, &[]).unwrap(), source);
    }

    #[test]
    fn test_indentation_helpers() {
        let source = "class C\n{\n    void M()\n    {\n    }\n}\n";
        let offset = source.find("void").unwrap();
        assert_eq!(indentation_at(source, offset), "    ");
        assert_eq!(line_start(source, offset), source.find("    void").unwrap());
        assert_eq!(indent_unit(source), "    ");
    }
}
