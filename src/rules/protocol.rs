use crate::analysis::Analysis;
use crate::analysis::protocol::{DisposeKind, DisposeMethod, calls_base, dispose_kind};
use crate::diagnostics::Suggestion;
use crate::fix::TextEdit;
use crate::lint::{FixDescriptor, LintCategory, LintContext, LintDescriptor, LintRule};
use crate::model::Symbol;
use crate::syntax::{
    argument_expression, arguments, arrow_body, block_body, containing_member, invoked_member,
    name_of, parameters, strip_parens,
};
use tree_sitter::Node;

use super::util::{append_to_block, expand_arrow_body};

// ============================================================================
// CallBaseDisposeLint (IDISP010)
// ============================================================================

pub struct CallBaseDisposeLint;

pub(crate) static CALL_BASE_DISPOSE: LintDescriptor = LintDescriptor::stable(
    "IDISP010",
    "call_base_dispose",
    LintCategory::Protocol,
    "An override of a dispose method must call the base implementation",
)
.with_fix(FixDescriptor::safe("Call the base dispose method at the end of the override"));

impl LintRule for CallBaseDisposeLint {
    fn descriptor(&self) -> &'static LintDescriptor {
        &CALL_BASE_DISPOSE
    }

    fn node_kinds(&self) -> &'static [&'static str] {
        &["method_declaration"]
    }

    fn check<'c>(&self, node: Node<'c>, cx: &Analysis<'_, 'c>, ctx: &mut LintContext<'_>) {
        let Some(kind) = dispose_kind(cx, node) else {
            return;
        };
        if kind == DisposeKind::DisposeAsync || !cx.model.has_modifier(node, "override") {
            return;
        }
        let method = DisposeMethod { kind, node };
        if calls_base(cx, method) || base_is_abstract(cx, method) {
            return;
        }
        let Some(name) = name_of(node) else {
            return;
        };

        let call = base_call_text(cx, method);
        let suggestion = call.as_deref().and_then(|call| {
            let source = cx.source_of(node);
            let edit = match (block_body(node), arrow_body(node)) {
                (Some(block), _) => append_to_block(source, block, call),
                (None, Some(arrow)) => expand_arrow_body(source, node, arrow, &[call.to_string()]),
                _ => None,
            }?;
            Some(Suggestion::machine_applicable(
                format!("Call `{}`", call.trim_end_matches(';')),
                vec![edit],
            ))
        });

        ctx.report_diagnostic_for_node(
            name,
            &CALL_BASE_DISPOSE,
            format!("Call `base.{}` in the override", kind.method_name()),
            Some("Resources owned by the base class are leaked when the override does not chain to it".to_string()),
            suggestion,
        );
    }
}

/// `abstract` in the base class: there is nothing to call.
fn base_is_abstract<'c>(cx: &Analysis<'_, 'c>, method: DisposeMethod<'c>) -> bool {
    let Some(base) = cx
        .model
        .containing_type(method.node)
        .and_then(|t| cx.model.base_class(t))
    else {
        return false;
    };
    let argc = parameters(method.node).len();
    match cx.model.lookup_member(base, method.kind.method_name(), Some(argc)) {
        Some(Symbol::Method(m)) => cx.model.has_modifier(m, "abstract"),
        _ => false,
    }
}

fn base_call_text<'c>(cx: &Analysis<'_, 'c>, method: DisposeMethod<'c>) -> Option<String> {
    match method.kind {
        DisposeKind::Dispose => Some("base.Dispose();".to_string()),
        DisposeKind::DisposeBool => {
            let param = parameters(method.node).into_iter().next()?;
            let name = cx.model.name_of(param)?;
            Some(format!("base.Dispose({name});"))
        }
        DisposeKind::DisposeAsyncCore if cx.model.has_modifier(method.node, "async") => {
            Some("await base.DisposeAsyncCore().ConfigureAwait(false);".to_string())
        }
        _ => None,
    }
}

// ============================================================================
// SuppressFinalizeThisLint (IDISP020)
// ============================================================================

pub struct SuppressFinalizeThisLint;

pub(crate) static SUPPRESS_FINALIZE_THIS: LintDescriptor = LintDescriptor::stable(
    "IDISP020",
    "suppress_finalize_this",
    LintCategory::Correctness,
    "GC.SuppressFinalize should be called with `this`",
)
.with_fix(FixDescriptor::safe("Pass `this`"));

impl LintRule for SuppressFinalizeThisLint {
    fn descriptor(&self) -> &'static LintDescriptor {
        &SUPPRESS_FINALIZE_THIS
    }

    fn node_kinds(&self) -> &'static [&'static str] {
        &["invocation_expression"]
    }

    fn check<'c>(&self, node: Node<'c>, cx: &Analysis<'_, 'c>, ctx: &mut LintContext<'_>) {
        let Some((name, Some(receiver))) = invoked_member(node) else {
            return;
        };
        if cx.text(name) != "SuppressFinalize" || !matches!(cx.text(receiver), "GC" | "System.GC") {
            return;
        }
        let args = arguments(node);
        let [arg] = args.as_slice() else {
            return;
        };
        let Some(expr) = argument_expression(*arg) else {
            return;
        };
        if strip_parens(expr).kind() == "this_expression" {
            return;
        }
        match containing_member(node) {
            Some(member) if !cx.model.has_modifier(member, "static") => {}
            _ => return,
        }

        let edit = TextEdit::replace(expr.start_byte(), expr.end_byte(), "this");
        ctx.report_diagnostic_for_node(
            expr,
            &SUPPRESS_FINALIZE_THIS,
            format!("Call `GC.SuppressFinalize(this)` instead of `GC.SuppressFinalize({})`", cx.text(expr)),
            None,
            Some(Suggestion::machine_applicable("Use `this`", vec![edit])),
        );
    }
}
