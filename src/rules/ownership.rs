use crate::analysis::Analysis;
use crate::analysis::injected::is_potentially_cached_or_injected;
use crate::analysis::protocol::dispose_receiver;
use crate::lint::{LintCategory, LintContext, LintDescriptor, LintRule};
use crate::syntax::{
    ancestors, declarators, enclosing_statement, has_token, initializer_of, is_lambda, is_type_declaration,
    last_named, named_children, variable_declaration,
};
use tree_sitter::Node;

// ============================================================================
// DontDisposeInjectedLint (IDISP007)
// ============================================================================

pub struct DontDisposeInjectedLint;

pub(crate) static DONT_DISPOSE_INJECTED: LintDescriptor = LintDescriptor::stable(
    "IDISP007",
    "dont_dispose_injected",
    LintCategory::Correctness,
    "Don't dispose a value that was injected or is cached; its owner disposes it",
);

const HELP: &str = "The value may still be used by its owner after it is disposed here";

impl LintRule for DontDisposeInjectedLint {
    fn descriptor(&self) -> &'static LintDescriptor {
        &DONT_DISPOSE_INJECTED
    }

    fn node_kinds(&self) -> &'static [&'static str] {
        &["using_statement", "local_declaration_statement", "invocation_expression"]
    }

    fn check<'c>(&self, node: Node<'c>, cx: &Analysis<'_, 'c>, ctx: &mut LintContext<'_>) {
        match node.kind() {
            "using_statement" => check_using_statement(node, cx, ctx),
            "local_declaration_statement" if has_token(node, "using") => {
                if declared_resources(node).into_iter().any(|v| is_potentially_cached_or_injected(cx, v)) {
                    report(node, cx, ctx);
                }
            }
            "invocation_expression" => {
                let Some(receiver) = dispose_receiver(cx, node) else {
                    return;
                };
                if inside_lambda(node) || !is_potentially_cached_or_injected(cx, receiver) {
                    return;
                }
                let stmt = enclosing_statement(node)
                    .filter(|s| s.kind() == "expression_statement")
                    .unwrap_or(node);
                report(stmt, cx, ctx);
            }
            _ => {}
        }
    }
}

fn check_using_statement<'c>(node: Node<'c>, cx: &Analysis<'_, 'c>, ctx: &mut LintContext<'_>) {
    let body = node.child_by_field_name("body").or_else(|| last_named(node));
    let resource = named_children(node)
        .into_iter()
        .find(|c| body.is_none_or(|b| b.id() != c.id()));
    let Some(resource) = resource else {
        return;
    };
    if resource.kind() == "variable_declaration" {
        if declared_resources(resource).into_iter().any(|v| is_potentially_cached_or_injected(cx, v)) {
            report(resource, cx, ctx);
        }
    } else if is_potentially_cached_or_injected(cx, resource) {
        report(resource, cx, ctx);
    }
}

fn declared_resources(node: Node) -> Vec<Node> {
    variable_declaration(node)
        .map(|decl| declarators(decl).into_iter().filter_map(initializer_of).collect())
        .unwrap_or_default()
}

/// Disposal inside a lambda may run long after the value changed owner.
fn inside_lambda(node: Node) -> bool {
    ancestors(node)
        .take_while(|a| !is_type_declaration(*a))
        .any(is_lambda)
}

fn report<'c>(node: Node<'c>, cx: &Analysis<'_, 'c>, ctx: &mut LintContext<'_>) {
    let text = cx.text(node);
    let shown = text.lines().next().unwrap_or(text).trim();
    ctx.report_diagnostic_for_node(
        node,
        &DONT_DISPOSE_INJECTED,
        format!("Don't dispose injected: `{shown}` is owned elsewhere"),
        Some(HELP.to_string()),
        None,
    );
}
