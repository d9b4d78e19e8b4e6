//! Fix-all application: turns the suggestions attached to a document's
//! diagnostics into one rewritten source text.

use crate::diagnostics::{Applicability, Diagnostic};
use crate::fix::{self, TextEdit};
use std::path::Path;

/// Result of applying fixes to a source file.
#[derive(Debug)]
pub struct FixResult {
    /// The modified source code.
    pub fixed_source: String,
    /// Number of suggestions applied.
    pub fixes_applied: usize,
    /// Suggestions left out because they need `--unsafe-fixes` or have placeholders.
    pub fixes_skipped: usize,
    /// Suggestions that collided with an earlier one; a later pass may pick them up.
    pub fixes_deferred: usize,
}

/// Error when applying fixes.
#[derive(Debug, thiserror::Error)]
pub enum FixError {
    #[error("Cannot apply fixes to stdin - please specify a file path")]
    StdinNotSupported,

    #[error(transparent)]
    Edit(#[from] fix::FixError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn is_applicable(applicability: Applicability, allow_unsafe: bool) -> bool {
    match applicability {
        Applicability::MachineApplicable => true,
        Applicability::MaybeIncorrect => allow_unsafe,
        Applicability::HasPlaceholders | Applicability::Unspecified => false,
    }
}

/// Apply every applicable suggestion in `diagnostics` to `source`.
///
/// Suggestions are taken in diagnostic order. One whose edits collide with an
/// already accepted suggestion is deferred rather than failing the batch.
pub fn apply_fixes(
    source: &str,
    diagnostics: &[Diagnostic],
    allow_unsafe: bool,
) -> Result<FixResult, FixError> {
    let mut accepted: Vec<TextEdit> = Vec::new();
    let mut applied = 0usize;
    let mut skipped = 0usize;
    let mut deferred = 0usize;

    for diag in diagnostics {
        let Some(suggestion) = &diag.suggestion else {
            continue;
        };

        if !is_applicable(suggestion.applicability, allow_unsafe) {
            skipped += 1;
            continue;
        }

        if suggestion.edits.is_empty() {
            continue;
        }

        if suggestion.edits.iter().any(|e| e.validate(source).is_err()) {
            skipped += 1;
            continue;
        }

        let collides = suggestion
            .edits
            .iter()
            .any(|e| accepted.iter().any(|a| a.overlaps_with(e)));
        if collides {
            deferred += 1;
            continue;
        }

        accepted.extend(suggestion.edits.iter().cloned());
        applied += 1;
    }

    let fixed_source = fix::apply_fixes(source, &accepted)?;

    Ok(FixResult {
        fixed_source,
        fixes_applied: applied,
        fixes_skipped: skipped,
        fixes_deferred: deferred,
    })
}

/// Unified diff between original and fixed source with three context lines.
pub fn format_diff(original: &str, fixed: &str, path: &Path) -> String {
    format_diff_with_context(original, fixed, path, 3)
}

struct Hunk {
    start: usize,
    end: usize,
    changed: Vec<usize>,
}

/// Unified diff with a configurable number of context lines.
///
/// Lines are compared by index, which is what the fixes produce: insertions
/// shift the remainder of the file and show up as one wide hunk.
pub fn format_diff_with_context(original: &str, fixed: &str, path: &Path, context: usize) -> String {
    use std::fmt::Write;

    let old: Vec<&str> = original.lines().collect();
    let new: Vec<&str> = fixed.lines().collect();
    let max_len = old.len().max(new.len());

    let changed: Vec<usize> = (0..max_len)
        .filter(|&i| old.get(i) != new.get(i))
        .collect();
    if changed.is_empty() {
        return String::new();
    }

    let mut hunks: Vec<Hunk> = Vec::new();
    for i in changed {
        let start = i.saturating_sub(context);
        let end = (i + context + 1).min(max_len);
        match hunks.last_mut() {
            Some(h) if start <= h.end => {
                h.end = end;
                h.changed.push(i);
            }
            _ => hunks.push(Hunk {
                start,
                end,
                changed: vec![i],
            }),
        }
    }

    let mut out = String::new();
    let display = path.display();
    let _ = writeln!(out, "--- a/{display}");
    let _ = writeln!(out, "+++ b/{display}");

    for hunk in hunks {
        let old_len = hunk.end.min(old.len()).saturating_sub(hunk.start);
        let new_len = hunk.end.min(new.len()).saturating_sub(hunk.start);
        let _ = writeln!(
            out,
            "@@ -{},{} +{},{} @@",
            hunk.start + 1,
            old_len,
            hunk.start + 1,
            new_len
        );

        for idx in hunk.start..hunk.end {
            if hunk.changed.contains(&idx) {
                if let Some(line) = old.get(idx) {
                    let _ = writeln!(out, "-{line}");
                }
                if let Some(line) = new.get(idx) {
                    let _ = writeln!(out, "+{line}");
                }
            } else if let Some(line) = old.get(idx) {
                let _ = writeln!(out, " {line}");
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Span, Suggestion};

    static TEST_LINT: crate::lint::LintDescriptor = crate::lint::LintDescriptor {
        id: "TEST001",
        name: "test",
        category: crate::lint::LintCategory::Correctness,
        description: "test",
        group: crate::lint::RuleGroup::Stable,
        fix: crate::lint::FixDescriptor::none(),
        default_level: crate::level::LintLevel::Warn,
    };

    fn diag_with(edits: Vec<TextEdit>, applicability: Applicability) -> Diagnostic {
        Diagnostic {
            lint: &TEST_LINT,
            level: crate::level::LintLevel::Warn,
            file: None,
            span: Span::at_offset("", 0),
            message: "test".into(),
            help: None,
            suggestion: Some(Suggestion::new("fix", edits, applicability)),
        }
    }

    #[test]
    fn test_apply_single_fix() {
        let source = "GC.SuppressFinalize(null);";
        let diag = diag_with(
            vec![TextEdit::replace(20, 24, "this")],
            Applicability::MachineApplicable,
        );

        let result = apply_fixes(source, &[diag], false).unwrap();
        assert_eq!(result.fixed_source, "GC.SuppressFinalize(this);");
        assert_eq!(result.fixes_applied, 1);
    }

    #[test]
    fn test_unsafe_fix_needs_opt_in() {
        let source = "var s = Open();";
        let diag = diag_with(vec![TextEdit::insert(0, "using ")], Applicability::MaybeIncorrect);

        let result = apply_fixes(source, std::slice::from_ref(&diag), false).unwrap();
        assert_eq!(result.fixed_source, source);
        assert_eq!(result.fixes_skipped, 1);

        let result = apply_fixes(source, &[diag], true).unwrap();
        assert_eq!(result.fixed_source, "using var s = Open();");
    }

    #[test]
    fn test_colliding_suggestion_is_deferred() {
        let source = "a.Dispose();";
        let first = diag_with(vec![TextEdit::replace(0, 1, "this.a")], Applicability::MachineApplicable);
        let second = diag_with(vec![TextEdit::replace(0, 9, "x")], Applicability::MachineApplicable);

        let result = apply_fixes(source, &[first, second], false).unwrap();
        assert_eq!(result.fixed_source, "this.a.Dispose();");
        assert_eq!(result.fixes_applied, 1);
        assert_eq!(result.fixes_deferred, 1);
    }

    #[test]
    fn test_format_diff() {
        let original = "GC.SuppressFinalize(null);\nint y = 1;";
        let fixed = "GC.SuppressFinalize(this);\nint y = 1;";
        let path = Path::new("C.cs");

        let diff = format_diff(original, fixed, path);
        assert!(diff.contains("--- a/C.cs"));
        assert!(diff.contains("+++ b/C.cs"));
        assert!(diff.contains("-GC.SuppressFinalize(null);"));
        assert!(diff.contains("+GC.SuppressFinalize(this);"));
    }
}
