//! Shared predicates and text-edit builders for the rules.

use crate::analysis::Analysis;
use crate::fix::{TextEdit, indent_unit, indentation_at, line_start};
use crate::syntax::{children, slice};
use tree_sitter::Node;

/// Whether the value `expr` produces is of a disposable type.
pub(crate) fn is_disposable_value<'c>(cx: &Analysis<'_, 'c>, expr: Node<'c>) -> bool {
    cx.model.type_of(expr).is_some_and(|t| cx.model.is_disposable(&t))
}

/// Insert `text` as a new statement on its own line before `stmt`.
pub(crate) fn insert_before_statement(source: &str, stmt: Node, text: &str) -> TextEdit {
    let start = stmt.start_byte();
    let ls = line_start(source, start);
    let lead = &source[ls..start];
    if lead.trim().is_empty() {
        TextEdit::insert(ls, format!("{lead}{text}\n"))
    } else {
        TextEdit::insert(start, format!("{text} "))
    }
}

/// Insert `text` as a new line after `stmt`, at the same indentation.
pub(crate) fn insert_after_statement(source: &str, stmt: Node, text: &str) -> TextEdit {
    let indent = indentation_at(source, stmt.start_byte());
    TextEdit::insert(stmt.end_byte(), format!("\n{indent}{text}"))
}

/// Byte offset of the closing `}` of a block.
fn closing_brace(block: Node) -> Option<usize> {
    children(block)
        .into_iter()
        .rev()
        .find(|c| c.kind() == "}")
        .map(|c| c.start_byte())
}

/// Append `text` as the last statement of `block`.
pub(crate) fn append_to_block(source: &str, block: Node, text: &str) -> Option<TextEdit> {
    let close = closing_brace(block)?;
    let ls = line_start(source, close);
    let brace_indent = &source[ls..close];
    if brace_indent.trim().is_empty() && ls > block.start_byte() {
        let unit = indent_unit(source);
        return Some(TextEdit::insert(ls, format!("{brace_indent}{unit}{text}\n")));
    }
    // `{ }` on one line
    let content_end = source[..close].trim_end().len().max(block.start_byte() + 1);
    Some(TextEdit::replace(content_end, close, format!(" {text} ")))
}

/// Append several lines wrapped in a new block introduced by `header`
/// (e.g. `if (disposing)`) at the end of `block`.
///
/// The edit replaces the whitespace before the closing brace, so two such
/// edits on one block collide and the second waits for the next fix pass.
pub(crate) fn append_block_to_block(source: &str, block: Node, header: &str, lines: &[String]) -> Option<TextEdit> {
    let close = closing_brace(block)?;
    let ls = line_start(source, close);
    let brace_indent = if source[ls..close].trim().is_empty() {
        source[ls..close].to_string()
    } else {
        indentation_at(source, block.start_byte()).to_string()
    };
    let unit = indent_unit(source);
    let inner = format!("{brace_indent}{unit}");
    let content_end = source[..close].trim_end().len().max(block.start_byte() + 1);
    let mut text = format!("\n{inner}{header}\n{inner}{{\n");
    for line in lines {
        text.push_str(&format!("{inner}{unit}{line}\n"));
    }
    text.push_str(&format!("{inner}}}\n{brace_indent}"));
    Some(TextEdit::replace(content_end, close, text))
}

/// Insert a new block introduced by `header` before `stmt`. Replaces the
/// statement's leading whitespace, see [`append_block_to_block`].
pub(crate) fn insert_block_before(source: &str, stmt: Node, header: &str, lines: &[String]) -> TextEdit {
    let start = stmt.start_byte();
    let ls = line_start(source, start);
    let indent = indentation_at(source, start);
    let unit = indent_unit(source);
    let mut text = format!("{indent}{header}\n{indent}{{\n");
    for line in lines {
        text.push_str(&format!("{indent}{unit}{line}\n"));
    }
    text.push_str(&format!("{indent}}}\n\n{indent}"));
    if source[ls..start].trim().is_empty() {
        TextEdit::replace(ls, start, text)
    } else {
        TextEdit::insert(start, text)
    }
}

/// Rewrite `=> expr;` into a block body ending with `lines`.
pub(crate) fn expand_arrow_body(source: &str, decl: Node, arrow: Node, lines: &[String]) -> Option<TextEdit> {
    let clause = arrow.parent().filter(|p| p.kind() == "arrow_expression_clause")?;
    let end = children(decl)
        .into_iter()
        .find(|c| c.kind() == ";" && c.start_byte() >= clause.end_byte())
        .map_or(clause.end_byte(), |c| c.end_byte());
    let start = source[..clause.start_byte()].trim_end().len();
    let indent = indentation_at(source, decl.start_byte());
    let unit = indent_unit(source);
    let mut text = format!("\n{indent}{{\n{indent}{unit}{};\n", slice(source, arrow));
    for line in lines {
        text.push_str(&format!("{indent}{unit}{line}\n"));
    }
    text.push_str(&format!("{indent}}}"));
    Some(TextEdit::replace(start, end, text))
}
