use crate::analysis::fixture;
use crate::analysis::flow::executed_before;
use crate::analysis::mutation::{MutationKind, Scope, mutations, references, refers_to};
use crate::analysis::ownership::classify;
use crate::analysis::protocol::{disposed_before, dispose_receiver, setter_backing_field};
use crate::analysis::{Analysis, Ownership};
use crate::diagnostics::Suggestion;
use crate::fix::TextEdit;
use crate::lint::{FixDescriptor, LintCategory, LintContext, LintDescriptor, LintRule};
use crate::model::known;
use crate::model::{Symbol, TypeRef};
use crate::syntax::{
    ancestors, argument_modifier, arguments, assignment_parts, binary_operator, block_body, contains,
    declarators, enclosing_statement, first_named, has_token, in_nested_lambda, initializer_of,
    invoked_member, is_auto_property, is_lambda, last_named, name_of, named_children,
    parameters, region_of, slice, strip_conversions, strip_parens, variable_declaration,
    variable_type_node, walk,
};
use tree_sitter::Node;

use super::util::{insert_before_statement, is_disposable_value};

#[cfg(feature = "telemetry")]
use tracing::trace;

// ============================================================================
// DisposeCreatedLint (IDISP001)
// ============================================================================

pub struct DisposeCreatedLint;

pub(crate) static DISPOSE_CREATED: LintDescriptor = LintDescriptor::stable(
    "IDISP001",
    "dispose_created",
    LintCategory::Correctness,
    "A local that holds a created disposable must be disposed or handed off",
)
.with_fix(FixDescriptor::unsafe_fix(
    "Add `using`, or in a constructor store the value in a field",
));

impl LintRule for DisposeCreatedLint {
    fn descriptor(&self) -> &'static LintDescriptor {
        &DISPOSE_CREATED
    }

    fn node_kinds(&self) -> &'static [&'static str] {
        &["local_declaration_statement"]
    }

    fn check<'c>(&self, node: Node<'c>, cx: &Analysis<'_, 'c>, ctx: &mut LintContext<'_>) {
        if has_token(node, "using") || cx.model.has_modifier(node, "const") {
            return;
        }
        let Some(region) = region_of(node) else {
            return;
        };
        let Some(declaration) = variable_declaration(node) else {
            return;
        };
        let decls = declarators(declaration);

        for decl in &decls {
            let Some(init) = initializer_of(*decl) else {
                continue;
            };
            // `var x = this.field = new Foo()` stores the value before the local sees it
            if strip_parens(init).kind() == "assignment_expression" {
                continue;
            }
            let Some(sym) = name_of(*decl).and_then(|n| cx.model.symbol(n)) else {
                continue;
            };
            if classify(cx, init) != Some(Ownership::Created) {
                continue;
            }
            let disposable = cx
                .model
                .declared_type(sym)
                .is_some_and(|t| cx.model.is_disposable(&t))
                || is_disposable_value(cx, init);
            if !disposable {
                continue;
            }
            let mut visited = Vec::new();
            if released_or_handed_off(cx, sym, region, &mut visited) {
                continue;
            }

            let name = cx.model.symbol_name(sym).unwrap_or("?");
            let suggestion = if decls.len() == 1 {
                dispose_created_fix(cx, node, region, *decl, sym, init)
            } else {
                None
            };
            ctx.report_diagnostic_for_node(
                node,
                &DISPOSE_CREATED,
                format!("Dispose created: `{name}` is created here and never disposed"),
                Some("Wrap it in `using`, dispose it, or hand it to an owner".to_string()),
                suggestion,
            );
            return;
        }
    }
}

fn dispose_created_fix<'c>(
    cx: &Analysis<'_, 'c>,
    stmt: Node<'c>,
    region: Node<'c>,
    decl: Node<'c>,
    sym: Symbol<'c>,
    init: Node<'c>,
) -> Option<Suggestion> {
    let source = cx.source_of(stmt);
    let in_constructor_body = region.kind() == "constructor_declaration"
        && stmt.parent().zip(block_body(region)).is_some_and(|(p, b)| p.id() == b.id());

    if in_constructor_body {
        let name = cx.model.symbol_name(sym)?;
        let owner = cx.model.containing_type(region)?;
        if cx.model.lookup_member(owner, name, None).is_some() {
            return None;
        }
        let declared = stmt_type_text(cx, decl, sym)?;
        let field = insert_before_statement(source, region, &format!("private readonly {declared} {name};\n"));
        let assign = TextEdit::replace(
            stmt.start_byte(),
            stmt.end_byte(),
            format!("this.{name} = {};", slice(source, init)),
        );
        return Some(Suggestion::maybe_incorrect("Assign to a new field", vec![field, assign]));
    }

    // C# does not allow a using declaration directly in a switch section
    if stmt.parent()?.kind() != "block" {
        return None;
    }
    Some(Suggestion::maybe_incorrect(
        "Add `using`",
        vec![TextEdit::insert(stmt.start_byte(), "using ")],
    ))
}

/// Declared type, or the inferred one for `var`.
fn stmt_type_text<'c>(cx: &Analysis<'_, 'c>, decl: Node<'c>, sym: Symbol<'c>) -> Option<String> {
    let type_node = decl.parent().and_then(variable_type_node)?;
    let text = cx.text(type_node);
    if text != "var" {
        return Some(text.to_string());
    }
    let inferred = cx.model.declared_type(sym)?;
    matches!(inferred, TypeRef::Named { .. } | TypeRef::Tuple(_) | TypeRef::Array(_))
        .then(|| inferred.to_string())
}

/// Whether a local (or parameter, when following a call) is disposed in its
/// region or its value is handed to something that outlives the region.
fn released_or_handed_off<'c>(
    cx: &Analysis<'_, 'c>,
    sym: Symbol<'c>,
    region: Node<'c>,
    visited: &mut Vec<usize>,
) -> bool {
    let Some(name) = cx.model.symbol_name(sym).map(str::to_owned) else {
        return true;
    };

    let mut disposed = false;
    walk(region, &mut |n| {
        if disposed || cx.is_cancelled() {
            return false;
        }
        if let Some(receiver) = dispose_receiver(cx, n) {
            let receiver = strip_conversions(cx.source_of(receiver), receiver);
            disposed = refers_to(cx, receiver, sym, &name);
        }
        true
    });
    if disposed || cx.is_cancelled() {
        return true;
    }

    references(cx, sym, Scope::Node(region))
        .into_iter()
        .any(|r| in_nested_lambda(r, region) || escapes(cx, r, visited))
}

/// Whether the value read at `reference` leaves the current owner.
fn escapes<'c>(cx: &Analysis<'_, 'c>, reference: Node<'c>, visited: &mut Vec<usize>) -> bool {
    let mut cur = reference;
    while let Some(parent) = cur.parent() {
        let source = cx.source_of(parent);
        match parent.kind() {
            "parenthesized_expression" | "cast_expression" | "switch_expression_arm" => {}
            "postfix_unary_expression" if slice(source, parent).ends_with('!') => {}
            "binary_expression" if matches!(binary_operator(source, parent), Some("??" | "as")) => {}
            "conditional_expression" | "switch_expression" => {
                if first_named(parent).is_some_and(|c| c.id() == cur.id()) {
                    return false;
                }
            }
            "equals_value_clause" | "variable_declarator" => return true,
            "return_statement" | "arrow_expression_clause" | "yield_statement" | "using_statement" => {
                return true;
            }
            "array_creation_expression"
            | "implicit_array_creation_expression"
            | "initializer_expression"
            | "collection_expression"
            | "anonymous_object_creation_expression"
            | "anonymous_object_member_declarator" => return true,
            "assignment_expression" => {
                return assignment_parts(source, parent).is_some_and(|a| a.right.id() == cur.id());
            }
            "argument" => return argument_escapes(cx, parent, visited),
            "lambda_expression" => return true,
            _ => return false,
        }
        cur = parent;
    }
    false
}

fn argument_escapes<'c>(cx: &Analysis<'_, 'c>, argument: Node<'c>, visited: &mut Vec<usize>) -> bool {
    match argument_modifier(cx.source_of(argument), argument) {
        Some("ref") => return true,
        Some("out") => return false,
        _ => {}
    }
    let Some(list) = argument.parent() else {
        return false;
    };
    if list.kind() == "tuple_expression" {
        return escapes(cx, list, visited);
    }
    let Some(call) = list.parent() else {
        return false;
    };
    match call.kind() {
        "object_creation_expression" | "implicit_object_creation_expression" | "constructor_initializer" => true,
        "invocation_expression" => {
            if invoked_member(call).is_some_and(|(n, _)| known::is_collection_adder(cx.text(n))) {
                return true;
            }
            match cx.model.symbol(call) {
                Some(Symbol::Method(method)) => parameter_escapes(cx, method, call, argument, visited),
                _ => false,
            }
        }
        _ => false,
    }
}

/// Follow an argument into a compilation method: does the parameter it
/// binds to escape there?
fn parameter_escapes<'c>(
    cx: &Analysis<'_, 'c>,
    method: Node<'c>,
    call: Node<'c>,
    argument: Node<'c>,
    visited: &mut Vec<usize>,
) -> bool {
    if visited.contains(&method.id()) {
        return false;
    }
    let params = parameters(method);
    let param = match named_children(argument).first() {
        Some(label) if label.kind() == "name_colon" => {
            let label = first_named(*label).map(|l| cx.text(l));
            params.iter().copied().find(|p| cx.model.name_of(*p) == label)
        }
        _ => {
            let index = arguments(call).iter().position(|a| a.id() == argument.id());
            index.and_then(|i| params.get(i).copied())
        }
    };
    let Some(param) = param else {
        // params array or unmatched name
        return true;
    };
    visited.push(method.id());
    let escapes = released_or_handed_off(cx, Symbol::Parameter(param), method, visited);
    visited.pop();
    escapes
}

// ============================================================================
// DisposePreviousLint (IDISP003)
// ============================================================================

pub struct DisposePreviousLint;

pub(crate) static DISPOSE_PREVIOUS: LintDescriptor = LintDescriptor::stable(
    "IDISP003",
    "dispose_previous",
    LintCategory::Correctness,
    "Dispose the previous value before assigning a new created disposable",
)
.with_fix(FixDescriptor::unsafe_fix("Dispose the previous value before the assignment"));

impl LintRule for DisposePreviousLint {
    fn descriptor(&self) -> &'static LintDescriptor {
        &DISPOSE_PREVIOUS
    }

    fn node_kinds(&self) -> &'static [&'static str] {
        &["assignment_expression"]
    }

    fn check<'c>(&self, node: Node<'c>, cx: &Analysis<'_, 'c>, ctx: &mut LintContext<'_>) {
        let source = cx.source_of(node);
        let Some(assignment) = assignment_parts(source, node) else {
            return;
        };
        if assignment.operator != "=" {
            return;
        }
        let target = strip_parens(assignment.left);
        let Some(sym) = cx.model.symbol(target) else {
            return;
        };
        match sym {
            Symbol::Local(_) | Symbol::Field(_) => {}
            Symbol::Property(p) if is_auto_property(p) || setter_backing_field(cx, p).is_some() => {}
            _ => return,
        }
        if classify(cx, assignment.right) != Some(Ownership::Created) {
            return;
        }
        let disposable = cx
            .model
            .declared_type(sym)
            .is_some_and(|t| cx.model.is_disposable(&t))
            || is_disposable_value(cx, assignment.right);
        if !disposable || null_guarded(cx, node, sym) || !may_hold_created(cx, sym, node) {
            return;
        }
        if disposed_before(cx, sym, node) {
            return;
        }

        let stmt = enclosing_statement(node)
            .filter(|s| s.kind() == "expression_statement" && first_named(*s).is_some_and(|e| e.id() == node.id()));
        let target_text = slice(source, target);
        let suggestion = stmt.map(|stmt| {
            Suggestion::maybe_incorrect(
                format!("Dispose `{target_text}` before assigning"),
                vec![insert_before_statement(source, stmt, &format!("{target_text}?.Dispose();"))],
            )
        });

        ctx.report_diagnostic_for_node(
            node,
            &DISPOSE_PREVIOUS,
            format!("Dispose previous before re-assigning `{target_text}`"),
            Some("The value it held before is created here too and is never released".to_string()),
            suggestion,
        );
    }
}

/// `if (x == null) x = new Foo();` and `if (x is null)`.
fn null_guarded<'c>(cx: &Analysis<'_, 'c>, node: Node<'c>, sym: Symbol<'c>) -> bool {
    let Some(name) = cx.model.symbol_name(sym).map(str::to_owned) else {
        return false;
    };
    for a in ancestors(node) {
        if is_lambda(a) || crate::syntax::REGIONS.contains(&a.kind()) {
            break;
        }
        if a.kind() != "if_statement" {
            continue;
        }
        let kids = named_children(a);
        let condition = a.child_by_field_name("condition").or_else(|| kids.first().copied());
        let consequence = a.child_by_field_name("consequence").or_else(|| kids.get(1).copied());
        if !consequence.is_some_and(|c| contains(c, node)) {
            continue;
        }
        let Some(condition) = condition else {
            continue;
        };
        let mut found = false;
        walk(condition, &mut |n| {
            if found {
                return false;
            }
            let source = cx.source_of(n);
            let parts = match n.kind() {
                "binary_expression" if binary_operator(source, n) == Some("==") => {
                    first_named(n).zip(last_named(n))
                }
                "is_pattern_expression" => first_named(n).zip(last_named(n)),
                _ => None,
            };
            if let Some((left, right)) = parts {
                let is_null = |e: Node| slice(source, e).trim() == "null";
                found = (is_null(right) && refers_to(cx, strip_parens(left), sym, &name))
                    || (is_null(left) && refers_to(cx, strip_parens(right), sym, &name));
            }
            true
        });
        if found {
            return true;
        }
    }
    false
}

/// Whether `sym` may already hold a created value when `assignment` runs.
fn may_hold_created<'c>(cx: &Analysis<'_, 'c>, sym: Symbol<'c>, assignment: Node<'c>) -> bool {
    let created = |value: Option<Node<'c>>| value.is_some_and(|v| classify(cx, v) == Some(Ownership::Created));

    match sym {
        Symbol::Local(decl) => {
            let Some(region) = region_of(decl) else {
                return false;
            };
            if repeats_without_declaration(assignment, decl) {
                return true;
            }
            mutations(cx, sym, Scope::Node(region)).into_iter().any(|w| {
                w.node.id() != assignment.id()
                    && created(w.value)
                    && executed_before(w.node, assignment).is_possible()
            })
        }
        _ => {
            // constructors and test setup methods run once per instance
            let initializer = region_of(assignment).filter(|r| {
                r.kind() == "constructor_declaration" || fixture::enclosing_setup(cx, assignment).is_some()
            });
            let Some(initializer) = initializer else {
                #[cfg(feature = "telemetry")]
                trace!(member = cx.model.symbol_name(sym).unwrap_or("?"), "member assigned outside constructor");
                return true;
            };
            let Some(scope) = Scope::for_symbol(cx, sym) else {
                return false;
            };
            mutations(cx, sym, scope).into_iter().any(|w| {
                if w.node.id() == assignment.id() || !created(w.value) {
                    return false;
                }
                match w.kind {
                    // field and property initializers run before every constructor body
                    MutationKind::Initializer => true,
                    _ => {
                        region_of(w.node).is_some_and(|r| r.id() == initializer.id())
                            && executed_before(w.node, assignment).is_possible()
                    }
                }
            })
        }
    }
}

/// Inside a loop that does not also contain the declaration: every
/// iteration after the first overwrites the previous iteration's value.
fn repeats_without_declaration(assignment: Node, decl: Node) -> bool {
    const LOOPS: &[&str] = &[
        "for_statement",
        "for_each_statement",
        "foreach_statement",
        "while_statement",
        "do_statement",
    ];
    ancestors(assignment)
        .take_while(|a| !is_lambda(*a) && !crate::syntax::REGIONS.contains(&a.kind()))
        .any(|a| LOOPS.contains(&a.kind()) && !contains(a, decl))
}

// ============================================================================
// DontIgnoreCreatedLint (IDISP004)
// ============================================================================

pub struct DontIgnoreCreatedLint;

pub(crate) static DONT_IGNORE_CREATED: LintDescriptor = LintDescriptor::preview(
    "IDISP004",
    "dont_ignore_created",
    LintCategory::Suspicious,
    "A created disposable is discarded without being disposed",
);

impl LintRule for DontIgnoreCreatedLint {
    fn descriptor(&self) -> &'static LintDescriptor {
        &DONT_IGNORE_CREATED
    }

    fn node_kinds(&self) -> &'static [&'static str] {
        &["expression_statement"]
    }

    fn check<'c>(&self, node: Node<'c>, cx: &Analysis<'_, 'c>, ctx: &mut LintContext<'_>) {
        let Some(expr) = first_named(node) else {
            return;
        };
        if matches!(
            expr.kind(),
            "assignment_expression" | "prefix_unary_expression" | "postfix_unary_expression"
        ) {
            return;
        }
        if classify(cx, expr) != Some(Ownership::Created) || !is_disposable_value(cx, expr) {
            return;
        }
        ctx.report_diagnostic_for_node(
            expr,
            &DONT_IGNORE_CREATED,
            "Don't ignore created: the disposable value is never disposed",
            Some("Assign it to a `using` variable or dispose it".to_string()),
            None,
        );
    }
}
