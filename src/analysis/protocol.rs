//! Dispose methods, dispose calls and the `disposing` branch.

use super::flow::executed_before;
use super::mutation::{mutations, refers_to, Scope};
use super::Analysis;
use crate::model::{Symbol, TypeId, TypeRef};
use crate::syntax::{
    accessor_keyword, accessors, arguments, assignment_parts, block_body, body, first_named, invoked_member,
    is_lambda, last_named, parameters, region_of, statements, strip_conversions, strip_parens, walk,
};
use tree_sitter::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposeKind {
    /// `Dispose()`
    Dispose,
    /// `Dispose(bool disposing)`
    DisposeBool,
    DisposeAsync,
    DisposeAsyncCore,
}

impl DisposeKind {
    pub fn method_name(self) -> &'static str {
        match self {
            DisposeKind::Dispose | DisposeKind::DisposeBool => "Dispose",
            DisposeKind::DisposeAsync => "DisposeAsync",
            DisposeKind::DisposeAsyncCore => "DisposeAsyncCore",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DisposeMethod<'c> {
    pub kind: DisposeKind,
    pub node: Node<'c>,
}

pub fn dispose_kind<'c>(cx: &Analysis<'_, 'c>, method: Node<'c>) -> Option<DisposeKind> {
    if method.kind() != "method_declaration" {
        return None;
    }
    let params = parameters(method);
    match (cx.model.name_of(method)?, params.len()) {
        ("Dispose", 0) => Some(DisposeKind::Dispose),
        ("Dispose", 1) => {
            let ty = crate::syntax::declared_type_node(params[0]).map(|t| cx.text(t));
            (ty == Some("bool")).then_some(DisposeKind::DisposeBool)
        }
        ("DisposeAsync", 0) => Some(DisposeKind::DisposeAsync),
        ("DisposeAsyncCore", 0) => Some(DisposeKind::DisposeAsyncCore),
        _ => None,
    }
}

/// Dispose methods declared on the type itself (all partial parts).
pub fn own_dispose_methods<'c>(cx: &Analysis<'_, 'c>, t: TypeId) -> Vec<DisposeMethod<'c>> {
    cx.model
        .members(t)
        .into_iter()
        .filter_map(|m| dispose_kind(cx, m).map(|kind| DisposeMethod { kind, node: m }))
        .collect()
}

/// The method a fix should add member disposal to: `Dispose(bool)` when the
/// type has one, else `Dispose()`.
pub fn primary_dispose_method<'c>(cx: &Analysis<'_, 'c>, t: TypeId) -> Option<DisposeMethod<'c>> {
    let own = own_dispose_methods(cx, t);
    own.iter()
        .find(|m| m.kind == DisposeKind::DisposeBool)
        .or_else(|| own.iter().find(|m| m.kind == DisposeKind::Dispose))
        .or_else(|| own.iter().find(|m| m.kind == DisposeKind::DisposeAsyncCore))
        .or_else(|| own.iter().find(|m| m.kind == DisposeKind::DisposeAsync))
        .copied()
}

/// Dispose methods that may release members of `t`: its own, those of its
/// base classes, and overrides in derived classes.
pub fn protocol_methods<'c>(cx: &Analysis<'_, 'c>, t: TypeId) -> Vec<DisposeMethod<'c>> {
    let mut out = own_dispose_methods(cx, t);
    for other in cx.model.base_chain(t).into_iter().chain(cx.model.derived_types(t)) {
        out.extend(own_dispose_methods(cx, other));
    }
    out
}

/// Receiver of `x.Dispose()`, `x?.Dispose()` or `x.DisposeAsync()`.
pub fn dispose_receiver<'c>(cx: &Analysis<'_, 'c>, call: Node<'c>) -> Option<Node<'c>> {
    if call.kind() != "invocation_expression" {
        return None;
    }
    let (name, receiver) = invoked_member(call)?;
    if !matches!(cx.text(name), "Dispose" | "DisposeAsync") || !arguments(call).is_empty() {
        return None;
    }
    receiver.filter(|r| !matches!(r.kind(), "this_expression" | "base_expression"))
}

/// Nodes of a dispose method that run when resources are released: the
/// whole body, or for `Dispose(bool)` only what runs when `disposing` is true.
pub fn release_scope<'c>(cx: &Analysis<'_, 'c>, method: DisposeMethod<'c>) -> Vec<Node<'c>> {
    match method.kind {
        DisposeKind::DisposeBool => disposing_scope(cx, method.node),
        _ => body(method.node).into_iter().collect(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Guard {
    /// Holds only when `disposing` is true.
    Disposing,
    /// Holds only when `disposing` is false.
    NotDisposing,
}

/// Statements of `Dispose(bool disposing)` under `if (disposing)`,
/// `if (disposing == true)`, or after `if (!disposing) return;`.
pub fn disposing_scope<'c>(cx: &Analysis<'_, 'c>, method: Node<'c>) -> Vec<Node<'c>> {
    let mut out = Vec::new();
    let Some(param) = parameters(method).into_iter().next() else {
        return out;
    };
    if let Some(block) = block_body(method) {
        collect_disposing(cx, param, &statements(block), &mut out);
    }
    out
}

fn collect_disposing<'c>(cx: &Analysis<'_, 'c>, param: Node<'c>, stmts: &[Node<'c>], out: &mut Vec<Node<'c>>) {
    for (i, stmt) in stmts.iter().enumerate() {
        match stmt.kind() {
            "if_statement" => {
                let condition = stmt.child_by_field_name("condition").or_else(|| first_named(*stmt));
                let kids = crate::syntax::named_children(*stmt);
                let consequence = stmt.child_by_field_name("consequence").or_else(|| kids.get(1).copied());
                let alternative = stmt.child_by_field_name("alternative").or_else(|| kids.get(2).copied());
                match condition.and_then(|c| guard_of(cx, param, c)) {
                    Some(Guard::Disposing) => out.extend(consequence),
                    Some(Guard::NotDisposing) => {
                        if consequence.is_some_and(exits) {
                            out.extend(stmts.get(i + 1..).unwrap_or_default().iter().copied());
                            return;
                        }
                        out.extend(alternative);
                    }
                    None => {
                        for branch in consequence.into_iter().chain(alternative) {
                            collect_disposing(cx, param, &statements(unwrap_else(branch)), out);
                        }
                    }
                }
            }
            "block" => collect_disposing(cx, param, &statements(*stmt), out),
            "try_statement" => {
                for part in crate::syntax::named_children(*stmt) {
                    let block = match part.kind() {
                        "block" => Some(part),
                        "finally_clause" => last_named(part),
                        _ => None,
                    };
                    if let Some(block) = block {
                        collect_disposing(cx, param, &statements(block), out);
                    }
                }
            }
            "lock_statement" | "using_statement" => {
                if let Some(b) = stmt.child_by_field_name("body").or_else(|| last_named(*stmt)) {
                    collect_disposing(cx, param, &statements(b), out);
                }
            }
            _ => {}
        }
    }
}

/// Where a `Dispose(bool)` body already separates managed cleanup.
#[derive(Debug, Clone, Copy)]
pub enum DisposingBranch<'c> {
    /// `if (!disposing) return;`
    EarlyReturn(Node<'c>),
    /// The block of `if (disposing) { ... }`.
    Block(Node<'c>),
}

/// First top-level disposing guard of a `Dispose(bool)` method.
pub fn disposing_branch<'c>(cx: &Analysis<'_, 'c>, method: Node<'c>) -> Option<DisposingBranch<'c>> {
    let param = parameters(method).into_iter().next()?;
    let block = block_body(method)?;
    statements(block).into_iter().find_map(|stmt| {
        if stmt.kind() != "if_statement" {
            return None;
        }
        let kids = crate::syntax::named_children(stmt);
        let condition = stmt.child_by_field_name("condition").or_else(|| kids.first().copied())?;
        let consequence = stmt.child_by_field_name("consequence").or_else(|| kids.get(1).copied())?;
        let has_else = stmt.child_by_field_name("alternative").is_some() || kids.len() > 2;
        match guard_of(cx, param, condition)? {
            Guard::NotDisposing if exits(consequence) && !has_else => Some(DisposingBranch::EarlyReturn(stmt)),
            Guard::Disposing if consequence.kind() == "block" => Some(DisposingBranch::Block(consequence)),
            _ => None,
        }
    })
}

/// `else_clause` wrapper in some grammar versions.
fn unwrap_else(node: Node) -> Node {
    if node.kind() == "else_clause" {
        last_named(node).unwrap_or(node)
    } else {
        node
    }
}

fn exits(stmt: Node) -> bool {
    match stmt.kind() {
        "return_statement" | "throw_statement" => true,
        "block" => statements(stmt).last().is_some_and(|s| exits(*s)),
        _ => false,
    }
}

fn guard_of<'c>(cx: &Analysis<'_, 'c>, param: Node<'c>, cond: Node<'c>) -> Option<Guard> {
    let cond = crate::syntax::strip_parens(cond);
    let source = cx.source_of(cond);
    match cond.kind() {
        "identifier" => (cx.model.symbol(cond) == Some(Symbol::Parameter(param))).then_some(Guard::Disposing),
        "prefix_unary_expression" if crate::syntax::unary_operator(source, cond) == "!" => {
            match guard_of(cx, param, first_named(cond)?)? {
                Guard::Disposing => Some(Guard::NotDisposing),
                Guard::NotDisposing => Some(Guard::Disposing),
            }
        }
        "binary_expression" => {
            let op = crate::syntax::binary_operator(source, cond)?;
            let kids = crate::syntax::named_children(cond);
            let (left, right) = (*kids.first()?, *kids.last()?);
            match op {
                "&&" => guard_of(cx, param, left)
                    .filter(|g| *g == Guard::Disposing)
                    .or_else(|| guard_of(cx, param, right).filter(|g| *g == Guard::Disposing)),
                "||" => guard_of(cx, param, left)
                    .filter(|g| *g == Guard::NotDisposing)
                    .or_else(|| guard_of(cx, param, right).filter(|g| *g == Guard::NotDisposing)),
                "==" | "!=" => {
                    let (var, literal) = if left.kind() == "boolean_literal" { (right, left) } else { (left, right) };
                    if literal.kind() != "boolean_literal" {
                        return None;
                    }
                    let guard = guard_of(cx, param, var)?;
                    let positive = (cx.text(literal) == "true") == (op == "==");
                    match (guard, positive) {
                        (g, true) => Some(g),
                        (Guard::Disposing, false) => Some(Guard::NotDisposing),
                        (Guard::NotDisposing, false) => Some(Guard::Disposing),
                    }
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Whether `sym` is disposed before `location` on some path, without a
/// reassignment that certainly happens in between.
pub fn disposed_before<'c>(cx: &Analysis<'_, 'c>, sym: Symbol<'c>, location: Node<'c>) -> bool {
    let Some(region) = region_of(location) else {
        return false;
    };
    let Some(name) = cx.model.symbol_name(sym).map(str::to_owned) else {
        return false;
    };

    let mut calls = Vec::new();
    walk(region, &mut |n| {
        if cx.is_cancelled() || (is_lambda(n) && n.id() != region.id()) {
            return false;
        }
        if let Some(receiver) = dispose_receiver(cx, n) {
            calls.push((n, receiver));
        }
        true
    });

    let writes = mutations(cx, sym, Scope::Node(region));
    for (call, receiver) in calls {
        if !executed_before(call, location).is_possible() {
            continue;
        }
        let receiver = strip_conversions(cx.source_of(receiver), receiver);
        if !refers_to(cx, receiver, sym, &name) {
            continue;
        }
        let reassigned = writes.iter().any(|w| {
            w.node.id() != location.id()
                && executed_before(call, w.node).is_yes()
                && executed_before(w.node, location).is_yes()
        });
        if !reassigned {
            return true;
        }
    }

    if let Symbol::Property(p) = sym {
        return setter_disposes(cx, p);
    }
    false
}

/// The field a property's setter stores `value` into, with the write.
pub fn setter_backing_field<'c>(cx: &Analysis<'_, 'c>, property: Node<'c>) -> Option<(Symbol<'c>, Node<'c>)> {
    let source = cx.source_of(property);
    let setter = accessors(property)
        .into_iter()
        .find(|a| matches!(accessor_keyword(source, *a), "set" | "init"))?;
    let setter_body = body(setter)?;
    let mut found = None;
    walk(setter_body, &mut |n| {
        if found.is_some() || is_lambda(n) {
            return false;
        }
        if let Some(assignment) = assignment_parts(source, n)
            && assignment.operator == "="
            && cx.text(strip_parens(assignment.right)) == "value"
            && let Some(field @ Symbol::Field(_)) = cx.model.symbol(strip_parens(assignment.left))
        {
            found = Some((field, n));
        }
        true
    });
    found
}

/// `set { this.x?.Dispose(); this.x = value; }`: the setter releases the
/// backing field before overwriting it.
fn setter_disposes<'c>(cx: &Analysis<'_, 'c>, property: Node<'c>) -> bool {
    let Some((field, write)) = setter_backing_field(cx, property) else {
        return false;
    };
    let Some(name) = cx.model.symbol_name(field).map(str::to_owned) else {
        return false;
    };
    let Some(region) = region_of(write) else {
        return false;
    };
    let mut found = false;
    walk(region, &mut |n| {
        if found || (is_lambda(n) && n.id() != region.id()) {
            return false;
        }
        if let Some(receiver) = dispose_receiver(cx, n) {
            let receiver = strip_conversions(cx.source_of(receiver), receiver);
            found = refers_to(cx, receiver, field, &name) && executed_before(n, write).is_possible();
        }
        true
    });
    found
}

/// Whether a `Dispose` override calls the matching `base.` method.
pub fn calls_base<'c>(cx: &Analysis<'_, 'c>, method: DisposeMethod<'c>) -> bool {
    let Some(b) = body(method.node) else {
        return false;
    };
    let wanted = method.kind.method_name();
    let mut found = false;
    walk(b, &mut |n| {
        if found || is_lambda(n) {
            return false;
        }
        if n.kind() == "invocation_expression"
            && let Some((name, Some(receiver))) = invoked_member(n)
            && receiver.kind() == "base_expression"
            && cx.text(name) == wanted
        {
            found = true;
        }
        true
    });
    found
}

/// `base.Dispose(disposing)` statement inside a dispose method, if any.
pub fn base_call_statement(method: Node) -> Option<Node> {
    let block = block_body(method)?;
    statements(block).into_iter().find(|s| {
        s.kind() == "expression_statement"
            && first_named(*s).is_some_and(|e| {
                e.kind() == "invocation_expression"
                    && invoked_member(e).is_some_and(|(_, r)| r.is_some_and(|r| r.kind() == "base_expression"))
            })
    })
}

/// Whether the type implements `IDisposable` through its own base list or a base class.
pub fn has_dispose_protocol<'c>(cx: &Analysis<'_, 'c>, t: TypeId) -> bool {
    let decl = cx.model.type_decl(t);
    cx.model.is_disposable(&TypeRef::named(decl.name.clone()))
        || !own_dispose_methods(cx, t).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::{compile, find};
    use crate::analysis::CancellationToken;
    use crate::model::SemanticModel;
    use crate::syntax::slice;

    const SRC: &str = r#"
using System;
using System.IO;
class C : IDisposable
{
    private Stream a;
    private Stream b;
    private Stream c;
    private bool disposed;

    public void Dispose() { Dispose(true); }

    protected virtual void Dispose(bool disposing)
    {
        if (this.disposed) { return; }
        this.disposed = true;
        if (disposing)
        {
            A();
        }
        B();
        if (!disposing)
        {
            return;
        }
        Z();
    }
}
"#;

    #[test]
    fn disposing_scope_follows_guards() {
        let compilation = compile(SRC);
        let model = SemanticModel::new(&compilation);
        let token = CancellationToken::new();
        let cx = Analysis::new(&model, &token);
        let root = compilation.documents()[0].root();
        let name = find(root, SRC, "identifier", "disposing");
        let method = name.parent().and_then(|p| p.parent()).and_then(|p| p.parent()).expect("method");
        assert_eq!(dispose_kind(&cx, method), Some(DisposeKind::DisposeBool));
        let scope: Vec<&str> = disposing_scope(&cx, method).iter().map(|n| slice(SRC, *n).trim()).collect();
        assert!(scope.iter().any(|s| s.contains("A()")));
        assert!(scope.iter().any(|s| s.contains("Z()")));
        assert!(!scope.iter().any(|s| s.contains("B()")));
    }

    #[test]
    fn disposed_before_sees_earlier_dispose_calls() {
        let src = r#"
using System.IO;
class C
{
    void M()
    {
        var s = new MemoryStream();
        s.Dispose();
        s = new MemoryStream();
        s.Dispose();
    }
}
"#;
        let compilation = compile(src);
        let model = SemanticModel::new(&compilation);
        let token = CancellationToken::new();
        let cx = Analysis::new(&model, &token);
        let root = compilation.documents()[0].root();
        let assignment = find(root, src, "assignment_expression", "s = new MemoryStream()");
        let decl = find(root, src, "variable_declarator", "s = new MemoryStream()");
        let sym = model.symbol(crate::syntax::name_of(decl).expect("name")).expect("symbol");
        assert!(disposed_before(&cx, sym, assignment));
        assert!(!disposed_before(&cx, sym, decl));
    }
}
