use crate::analysis::Analysis;
use crate::analysis::members::{disposable_member_type, is_member_disposed, requires_disposal};
use crate::analysis::protocol::{
    DisposeKind, DisposingBranch, base_call_statement, disposing_branch, primary_dispose_method,
};
use crate::diagnostics::Suggestion;
use crate::fix::{TextEdit, indentation_at};
use crate::lint::{FixDescriptor, LintCategory, LintContext, LintDescriptor, LintRule};
use crate::model::Symbol;
use crate::syntax::{arrow_body, block_body, declarators, parameters, variable_declaration};
use tree_sitter::Node;

use super::util::{append_block_to_block, append_to_block, expand_arrow_body, insert_after_statement, insert_block_before};

#[cfg(feature = "telemetry")]
use tracing::trace;

// ============================================================================
// DisposeMemberLint (IDISP002)
// ============================================================================

pub struct DisposeMemberLint;

pub(crate) static DISPOSE_MEMBER: LintDescriptor = LintDescriptor::stable(
    "IDISP002",
    "dispose_member",
    LintCategory::Correctness,
    "A field or property that owns a created disposable must be disposed by the containing type",
)
.with_fix(FixDescriptor::safe("Dispose the member in the type's dispose method"));

impl LintRule for DisposeMemberLint {
    fn descriptor(&self) -> &'static LintDescriptor {
        &DISPOSE_MEMBER
    }

    fn node_kinds(&self) -> &'static [&'static str] {
        &["field_declaration", "property_declaration"]
    }

    fn check<'c>(&self, node: Node<'c>, cx: &Analysis<'_, 'c>, ctx: &mut LintContext<'_>) {
        if node.kind() == "property_declaration" {
            check_member(cx, ctx, Symbol::Property(node), node);
            return;
        }
        let Some(declaration) = variable_declaration(node) else {
            return;
        };
        let decls = declarators(declaration);
        let single = decls.len() == 1;
        for decl in decls {
            let at = if single { node } else { decl };
            check_member(cx, ctx, Symbol::Field(decl), at);
        }
    }
}

fn check_member<'c>(cx: &Analysis<'_, 'c>, ctx: &mut LintContext<'_>, member: Symbol<'c>, at: Node<'c>) {
    if !requires_disposal(cx, member) || is_member_disposed(cx, member) {
        return;
    }
    let name = cx.model.symbol_name(member).unwrap_or("?");
    #[cfg(feature = "telemetry")]
    trace!(member = name, "member owns a created disposable");

    ctx.report_diagnostic_for_node(
        at,
        &DISPOSE_MEMBER,
        format!("Dispose member: `{name}` is created by this type and never disposed"),
        Some("Dispose it in the type's `Dispose` method".to_string()),
        dispose_member_fix(cx, member, name),
    );
}

/// `this.x?.Dispose();`, or one line per disposable tuple slot.
fn dispose_statements<'c>(cx: &Analysis<'_, 'c>, member: Symbol<'c>, name: &str) -> Vec<String> {
    let slots = disposable_member_type(cx, member).and_then(|t| cx.model.disposable_slots(&t));
    match slots {
        Some(slots) => slots
            .iter()
            .enumerate()
            .filter(|(_, disposable)| **disposable)
            .map(|(i, _)| format!("this.{name}.Item{}?.Dispose();", i + 1))
            .collect(),
        None => vec![format!("this.{name}?.Dispose();")],
    }
}

fn dispose_member_fix<'c>(cx: &Analysis<'_, 'c>, member: Symbol<'c>, name: &str) -> Option<Suggestion> {
    let owner = cx.model.owner_of(member)?;
    let method = primary_dispose_method(cx, owner)?;
    // edits apply to the member's document only
    let member_doc = cx.model.document_of(member.node()?);
    if !std::ptr::eq(member_doc, cx.model.document_of(method.node)) {
        return None;
    }
    let source = cx.source_of(method.node);
    let lines = dispose_statements(cx, member, name);

    let edit = if method.kind == DisposeKind::DisposeBool {
        dispose_bool_edit(cx, method.node, source, &lines)?
    } else {
        match (block_body(method.node), arrow_body(method.node)) {
            (Some(block), _) => append_to_block(source, block, &lines.join(" "))?,
            (None, Some(arrow)) => expand_arrow_body(source, method.node, arrow, &lines)?,
            _ => return None,
        }
    };
    Some(Suggestion::machine_applicable(
        format!("Dispose `{name}` in `{}`", method.kind.method_name()),
        vec![edit],
    ))
}

/// Managed cleanup in `Dispose(bool)` goes under the `disposing` guard,
/// before any call to the base implementation.
fn dispose_bool_edit<'c>(cx: &Analysis<'_, 'c>, method: Node<'c>, source: &str, lines: &[String]) -> Option<TextEdit> {
    match disposing_branch(cx, method) {
        Some(DisposingBranch::EarlyReturn(stmt)) => {
            let indent = indentation_at(source, stmt.start_byte());
            Some(insert_after_statement(source, stmt, &lines.join(format!("\n{indent}").as_str())))
        }
        Some(DisposingBranch::Block(block)) => append_to_block(source, block, &lines.join(" ")),
        None => {
            let param = parameters(method).into_iter().next()?;
            let header = format!("if ({})", cx.model.name_of(param)?);
            match base_call_statement(method) {
                Some(stmt) => Some(insert_block_before(source, stmt, &header, lines)),
                None => append_block_to_block(source, block_body(method)?, &header, lines),
            }
        }
    }
}
