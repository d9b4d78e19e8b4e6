//! Writes to and reads of one variable within a bounded scope.

use super::Analysis;
use crate::model::{Symbol, TypeId};
use crate::syntax::{
    argument_expression, argument_modifier, assignment_parts, first_named, initializer_of,
    member_name, named_children, region_of, simple_name, strip_parens, unary_operator, walk,
};
use tree_sitter::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// `= value` on the declaration itself.
    Initializer,
    /// `x = value` and `x ??= value`.
    Assign,
    /// `x += value` and friends.
    Compound,
    Out,
    Ref,
    /// `x++`, `--x`
    Increment,
}

#[derive(Debug, Clone, Copy)]
pub struct Mutation<'c> {
    pub kind: MutationKind,
    /// Declarator, assignment, argument or unary expression.
    pub node: Node<'c>,
    /// Assigned value when the write has one.
    pub value: Option<Node<'c>>,
}

impl Mutation<'_> {
    pub fn is_conditional(&self, cx: &Analysis<'_, '_>) -> bool {
        self.kind == MutationKind::Assign
            && assignment_parts(cx.source_of(self.node), self.node).is_some_and(|a| a.operator == "??=")
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Scope<'c> {
    Node(Node<'c>),
    /// Every member of every part of the type.
    Type(TypeId),
}

impl<'c> Scope<'c> {
    /// Declaring region of a local or parameter, the containing type of a member.
    pub fn for_symbol(cx: &Analysis<'_, 'c>, sym: Symbol<'c>) -> Option<Self> {
        match sym {
            Symbol::Local(n) | Symbol::Parameter(n) => region_of(n).map(Scope::Node),
            Symbol::Field(_) | Symbol::Property(_) => cx.model.owner_of(sym).map(Scope::Type),
            _ => None,
        }
    }

    fn roots(&self, cx: &Analysis<'_, 'c>) -> Vec<Node<'c>> {
        match *self {
            Scope::Node(n) => vec![n],
            Scope::Type(t) => cx.model.members(t),
        }
    }
}

/// Initializer of a declarator or property symbol.
fn declared_value<'c>(sym: Symbol<'c>) -> Option<(Node<'c>, Node<'c>)> {
    match sym {
        Symbol::Local(d) | Symbol::Field(d) if d.kind() == "variable_declarator" => {
            initializer_of(d).map(|v| (d, v))
        }
        Symbol::Property(p) => initializer_of(p).map(|v| (p, v)),
        _ => None,
    }
}

/// Whether `expr` reads or names `sym`.
pub(crate) fn refers_to<'c>(cx: &Analysis<'_, 'c>, expr: Node<'c>, sym: Symbol<'c>, name: &str) -> bool {
    let expr = strip_parens(expr);
    if sym.node().is_some_and(|d| d.id() == expr.id()) {
        return true;
    }
    let simple = match expr.kind() {
        "member_access_expression" => member_name(expr),
        _ => simple_name(expr),
    };
    if !simple.is_some_and(|s| cx.text(s) == name) {
        return false;
    }
    cx.model.symbol(expr) == Some(sym)
}

/// Every write to `sym` within `scope`, in source order per scope root.
pub fn mutations<'c>(cx: &Analysis<'_, 'c>, sym: Symbol<'c>, scope: Scope<'c>) -> Vec<Mutation<'c>> {
    let mut out = Vec::new();
    if let Some((decl, value)) = declared_value(sym) {
        out.push(Mutation {
            kind: MutationKind::Initializer,
            node: decl,
            value: Some(value),
        });
    }
    let Some(name) = cx.model.symbol_name(sym) else {
        return out;
    };

    for root in scope.roots(cx) {
        let source = cx.source_of(root);
        walk(root, &mut |n| {
            if cx.is_cancelled() {
                return false;
            }
            match n.kind() {
                "assignment_expression" => {
                    if let Some(a) = assignment_parts(source, n) {
                        let kind = match a.operator {
                            "=" | "??=" => MutationKind::Assign,
                            _ => MutationKind::Compound,
                        };
                        let value = (kind == MutationKind::Assign).then_some(a.right);
                        record_target(cx, sym, name, a.left, value, kind, n, &mut out);
                    }
                }
                "argument" => {
                    let kind = match argument_modifier(source, n) {
                        Some("out") => Some(MutationKind::Out),
                        Some("ref") => Some(MutationKind::Ref),
                        _ => None,
                    };
                    if let Some(kind) = kind
                        && let Some(expr) = argument_expression(n)
                        && refers_to(cx, expr, sym, name)
                    {
                        out.push(Mutation {
                            kind,
                            node: n,
                            value: None,
                        });
                    }
                }
                "prefix_unary_expression" | "postfix_unary_expression" => {
                    if matches!(unary_operator(source, n), "++" | "--")
                        && let Some(operand) = first_named(n)
                        && refers_to(cx, operand, sym, name)
                    {
                        out.push(Mutation {
                            kind: MutationKind::Increment,
                            node: n,
                            value: None,
                        });
                    }
                }
                _ => {}
            }
            true
        });
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn record_target<'c>(
    cx: &Analysis<'_, 'c>,
    sym: Symbol<'c>,
    name: &str,
    target: Node<'c>,
    value: Option<Node<'c>>,
    kind: MutationKind,
    node: Node<'c>,
    out: &mut Vec<Mutation<'c>>,
) {
    let target = strip_parens(target);
    if target.kind() == "tuple_expression" {
        // (a, b) = (x, y)
        let values: Vec<Node<'c>> = value
            .map(strip_parens)
            .filter(|v| v.kind() == "tuple_expression")
            .map(|v| named_children(v).into_iter().filter_map(argument_expression).collect())
            .unwrap_or_default();
        for (i, element) in named_children(target)
            .into_iter()
            .filter_map(argument_expression)
            .enumerate()
        {
            record_target(cx, sym, name, element, values.get(i).copied(), kind, node, out);
        }
        return;
    }
    if refers_to(cx, target, sym, name) {
        out.push(Mutation { kind, node, value });
    }
}

/// Expressions reading or writing `sym` within `scope`, declarations excluded.
pub fn references<'c>(cx: &Analysis<'_, 'c>, sym: Symbol<'c>, scope: Scope<'c>) -> Vec<Node<'c>> {
    let Some(name) = cx.model.symbol_name(sym).map(str::to_owned) else {
        return Vec::new();
    };
    let mut out: Vec<Node<'c>> = Vec::new();
    for root in scope.roots(cx) {
        walk(root, &mut |n| {
            if cx.is_cancelled() {
                return false;
            }
            if n.kind() != "identifier" || cx.text(n) != name {
                return true;
            }
            let Some(parent) = n.parent() else {
                return true;
            };
            let expr = match parent.kind() {
                "member_access_expression" if member_name(parent).is_some_and(|m| m.id() == n.id()) => parent,
                "member_binding_expression" => parent,
                _ => n,
            };
            let is_declaration_name = sym
                .node()
                .and_then(crate::syntax::name_of)
                .is_some_and(|d| d.id() == n.id())
                || sym.node().is_some_and(|d| d.id() == n.id());
            if !is_declaration_name
                && cx.model.symbol(expr) == Some(sym)
                && !out.iter().any(|o| o.id() == expr.id())
            {
                out.push(expr);
            }
            true
        });
    }
    out
}
