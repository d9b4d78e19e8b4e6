//! Whether a type owns a member's value and whether its dispose protocol
//! releases it.

use super::fixture;
use super::mutation::{mutations, Scope};
use super::ownership::{classify, getter, Ownership};
use super::pool::Visited;
use super::protocol::{dispose_kind, dispose_receiver, protocol_methods, release_scope};
use super::Analysis;
use crate::model::{tuple_slot_index, Symbol, TypeRef};
use crate::syntax::{
    argument_expression, arguments, body, initializer_of, invoked_member, is_auto_property,
    is_lambda, member_name, member_receiver, returned_expressions, strip_conversions, walk,
};
use std::collections::BTreeSet;
use tree_sitter::Node;

#[cfg(feature = "telemetry")]
use tracing::trace;

/// Declared type of a field or property, when it is disposable or a tuple
/// with disposable slots.
pub fn disposable_member_type<'c>(cx: &Analysis<'_, 'c>, member: Symbol<'c>) -> Option<TypeRef> {
    let ty = cx.model.declared_type(member)?;
    (cx.model.is_disposable(&ty) || cx.model.disposable_slots(&ty).is_some()).then_some(ty)
}

/// Whether the containing type is responsible for releasing the member: an
/// instance field or auto-property of disposable type that is assigned a
/// Created value and never an Injected or Cached one.
pub fn requires_disposal<'c>(cx: &Analysis<'_, 'c>, member: Symbol<'c>) -> bool {
    match member {
        Symbol::Field(_) => {}
        Symbol::Property(p) if is_auto_property(p) => {}
        _ => return false,
    }
    if cx.model.is_static(member) || disposable_member_type(cx, member).is_none() {
        return false;
    }
    let Some(scope) = Scope::for_symbol(cx, member) else {
        return false;
    };

    let mut created = false;
    for write in mutations(cx, member, scope) {
        let Some(value) = write.value else {
            // out/ref: someone else produced it
            return false;
        };
        match classify(cx, value) {
            Some(Ownership::Created) => created = true,
            Some(Ownership::Injected | Ownership::Cached) => return false,
            Some(Ownership::Borrowed) | None => {}
        }
    }
    created
}

/// Whether the member is released by its type's dispose protocol (own,
/// base and derived dispose methods), or by the teardown method paired with
/// the setup method that assigns it.
pub fn is_member_disposed<'c>(cx: &Analysis<'_, 'c>, member: Symbol<'c>) -> bool {
    let Some(owner) = cx.model.owner_of(member) else {
        return false;
    };
    let slots = cx
        .model
        .declared_type(member)
        .and_then(|t| cx.model.disposable_slots(&t));

    let mut scan = DisposalScan::new(cx, backing_targets(cx, member));
    for method in protocol_methods(cx, owner) {
        scan.scan(&release_scope(cx, method));
        if scan.satisfied(slots.as_deref()) {
            return true;
        }
    }

    let Some(scope) = Scope::for_symbol(cx, member) else {
        return false;
    };
    for write in mutations(cx, member, scope) {
        let Some(setup) = fixture::enclosing_setup(cx, write.node) else {
            continue;
        };
        for teardown in fixture::teardown_methods(cx, owner, setup) {
            scan.scan(&body(teardown).into_iter().collect::<Vec<_>>());
            if scan.satisfied(slots.as_deref()) {
                return true;
            }
        }
    }

    #[cfg(feature = "telemetry")]
    trace!(member = cx.model.symbol_name(member).unwrap_or("?"), "member not released");
    false
}

/// The member plus the field or property that stores the same value.
fn backing_targets<'c>(cx: &Analysis<'_, 'c>, member: Symbol<'c>) -> Vec<Symbol<'c>> {
    let mut targets = vec![member];
    match member {
        Symbol::Property(p) if !is_auto_property(p) => {
            targets.extend(returned_member(cx, p));
        }
        Symbol::Field(_) => {
            if let Some(owner) = cx.model.owner_of(member) {
                for m in cx.model.members(owner) {
                    if m.kind() == "property_declaration"
                        && !is_auto_property(m)
                        && returned_member(cx, m) == Some(member)
                    {
                        targets.push(Symbol::Property(m));
                    }
                }
            }
        }
        _ => {}
    }
    targets
}

/// Field or property a computed getter returns.
fn returned_member<'c>(cx: &Analysis<'_, 'c>, property: Node<'c>) -> Option<Symbol<'c>> {
    let returns = returned_expressions(getter(property).unwrap_or(property));
    match returns.as_slice() {
        [single] => cx.model.symbol(*single).filter(Symbol::is_member),
        _ => None,
    }
}

enum Target {
    Whole,
    Slot(usize),
}

/// Accumulates which parts of a member have been seen disposed.
struct DisposalScan<'x, 'a, 'c> {
    cx: &'x Analysis<'a, 'c>,
    targets: Vec<Symbol<'c>>,
    whole: bool,
    slots: BTreeSet<usize>,
    visited: Visited,
}

impl<'x, 'a, 'c> DisposalScan<'x, 'a, 'c> {
    fn new(cx: &'x Analysis<'a, 'c>, targets: Vec<Symbol<'c>>) -> Self {
        Self {
            cx,
            targets,
            whole: false,
            slots: BTreeSet::new(),
            visited: Visited::acquire(),
        }
    }

    fn satisfied(&self, slots: Option<&[bool]>) -> bool {
        match slots {
            Some(slots) => slots
                .iter()
                .enumerate()
                .all(|(i, disposable)| !disposable || self.slots.contains(&i)),
            None => self.whole,
        }
    }

    fn scan(&mut self, roots: &[Node<'c>]) {
        for root in roots {
            let mut helpers = Vec::new();
            walk(*root, &mut |n| {
                if self.cx.is_cancelled() || is_lambda(n) {
                    return false;
                }
                if n.kind() != "invocation_expression" {
                    return true;
                }
                if let Some(receiver) = dispose_receiver(self.cx, n) {
                    match self.target_of(receiver) {
                        Some(Target::Whole) => self.whole = true,
                        Some(Target::Slot(i)) => {
                            self.slots.insert(i);
                        }
                        None => {}
                    }
                } else if let Some(Symbol::Method(m)) = self.cx.model.symbol(n)
                    && dispose_kind(self.cx, m).is_none()
                {
                    helpers.push(m);
                }
                true
            });
            for helper in helpers {
                if self.visited.insert(Symbol::Method(helper).key()) {
                    self.scan(&body(helper).into_iter().collect::<Vec<_>>());
                }
            }
        }
    }

    fn target_of(&self, receiver: Node<'c>) -> Option<Target> {
        let expr = strip_conversions(self.cx.source_of(receiver), receiver);
        if expr.kind() == "member_access_expression"
            && let Some(slot) = member_name(expr).and_then(|n| tuple_slot_index(self.cx.text(n)))
            && member_receiver(expr).is_some_and(|r| self.resolves(r, 0))
        {
            return Some(Target::Slot(slot));
        }
        if self.resolves(expr, 0) {
            return Some(Target::Whole);
        }
        // Interlocked.Exchange(ref this.x, null)?.Dispose()
        if expr.kind() == "invocation_expression"
            && invoked_member(expr).is_some_and(|(name, _)| self.cx.text(name) == "Exchange")
            && arguments(expr)
                .first()
                .and_then(|a| argument_expression(*a))
                .is_some_and(|a| self.resolves(a, 0))
        {
            return Some(Target::Whole);
        }
        None
    }

    /// Reads the member directly, through a getter, or through a local
    /// initialized from it.
    fn resolves(&self, expr: Node<'c>, depth: usize) -> bool {
        if depth > 4 {
            return false;
        }
        let expr = strip_conversions(self.cx.source_of(expr), expr);
        match self.cx.model.symbol(expr) {
            Some(sym) if self.targets.contains(&sym) => true,
            Some(Symbol::Local(decl)) if decl.kind() == "variable_declarator" => {
                initializer_of(decl).is_some_and(|init| self.resolves(init, depth + 1))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::{compile, find};
    use crate::analysis::CancellationToken;
    use crate::model::SemanticModel;
    use crate::syntax::name_of;

    fn member(src: &str, declarator: &str) -> (bool, bool) {
        let compilation = compile(src);
        let model = SemanticModel::new(&compilation);
        let token = CancellationToken::new();
        let cx = Analysis::new(&model, &token);
        let root = compilation.documents()[0].root();
        let decl = find(root, src, "variable_declarator", declarator);
        let sym = model.symbol(name_of(decl).expect("name")).expect("symbol");
        (requires_disposal(&cx, sym), is_member_disposed(&cx, sym))
    }

    #[test]
    fn field_disposed_in_simple_dispose() {
        let src = r#"
using System;
using System.IO;
class C : IDisposable
{
    private readonly Stream stream = File.OpenRead("a");
    public void Dispose() { this.stream?.Dispose(); }
}
"#;
        assert_eq!(member(src, "stream = File.OpenRead(\"a\")"), (true, true));
    }

    #[test]
    fn injected_field_is_exempt() {
        let src = r#"
using System.IO;
class C
{
    private readonly Stream stream;
    C(Stream stream) { this.stream = stream; }
}
"#;
        assert_eq!(member(src, "stream"), (false, false));
    }

    #[test]
    fn disposal_outside_the_disposing_branch_does_not_count() {
        let src = r#"
using System;
using System.IO;
class C : IDisposable
{
    private readonly Stream inside = new MemoryStream();
    private readonly Stream outside = new MemoryStream();
    public void Dispose() { Dispose(true); }
    protected virtual void Dispose(bool disposing)
    {
        if (disposing)
        {
            inside.Dispose();
        }
        outside.Dispose();
    }
}
"#;
        assert_eq!(member(src, "inside = new MemoryStream()"), (true, true));
        assert_eq!(member(src, "outside = new MemoryStream()"), (true, false));
    }

    #[test]
    fn every_tuple_slot_must_be_disposed() {
        let src = r#"
using System;
using System.IO;
class C : IDisposable
{
    private readonly (Stream, Stream) pair = (new MemoryStream(), new MemoryStream());
    public void Dispose() { pair.Item1.Dispose(); }
}
"#;
        assert_eq!(member(src, "pair = (new MemoryStream(), new MemoryStream())"), (true, false));
    }

    #[test]
    fn disposal_in_derived_override_counts() {
        let src = r#"
using System;
using System.IO;
abstract class Base : IDisposable
{
    protected readonly Stream stream = new MemoryStream();
    public void Dispose() { Dispose(true); }
    protected virtual void Dispose(bool disposing) { }
}
class Derived : Base
{
    protected override void Dispose(bool disposing)
    {
        if (disposing) { this.stream.Dispose(); }
        base.Dispose(disposing);
    }
}
"#;
        assert_eq!(member(src, "stream = new MemoryStream()"), (true, true));
    }
}
