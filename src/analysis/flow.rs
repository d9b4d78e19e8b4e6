//! Execution order between two points of one region.
//!
//! No control-flow graph is built. The two nodes are split at their lowest
//! common ancestor and the construct found there decides the order; the
//! result is then weakened when the first node only runs on some paths.

use crate::syntax::{
    ancestors, children, contains, first_named, is_lambda, last_named, named_children, region_of, walk, REGIONS,
};
use tree_sitter::Node;

/// Answer to "does `a` run before `b`".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// On every path that reaches `b`, `a` ran first.
    Yes,
    /// `a` never runs before `b`.
    No,
    Maybe,
}

impl Execution {
    pub fn is_yes(self) -> bool {
        self == Execution::Yes
    }

    /// Yes or Maybe.
    pub fn is_possible(self) -> bool {
        self != Execution::No
    }
}

const LOOPS: &[&str] = &[
    "while_statement",
    "do_statement",
    "for_statement",
    "for_each_statement",
    "foreach_statement",
];

pub fn executed_before(a: Node, b: Node) -> Execution {
    if a.id() == b.id() {
        return Execution::No;
    }
    if contains(a, b) || contains(b, a) {
        return Execution::Maybe;
    }
    let region = match (region_of(a), region_of(b)) {
        (Some(ra), Some(rb)) if ra.id() == rb.id() => ra,
        _ => return Execution::Maybe,
    };
    let Some((lca, ca, cb)) = split_at_common_ancestor(a, b) else {
        return Execution::Maybe;
    };

    match order_children(lca, ca, cb) {
        Execution::Yes if conditionally_reached(a, lca) || skipped_by_jump(a, lca) || has_goto(region) => {
            Execution::Maybe
        }
        Execution::No if in_loop(lca) => Execution::Maybe,
        order => order,
    }
}

/// Lowest common ancestor and its children on the paths to `a` and `b`.
fn split_at_common_ancestor<'t>(a: Node<'t>, b: Node<'t>) -> Option<(Node<'t>, Node<'t>, Node<'t>)> {
    let path_a: Vec<Node<'t>> = std::iter::once(a).chain(ancestors(a)).collect();
    let mut below_b = b;
    for anc in ancestors(b) {
        if let Some(i) = path_a.iter().position(|n| n.id() == anc.id()) {
            let below_a = path_a.get(i.checked_sub(1)?)?;
            return Some((anc, *below_a, below_b));
        }
        below_b = anc;
    }
    None
}

fn same(a: Node, b: Option<Node>) -> bool {
    b.is_some_and(|b| b.id() == a.id())
}

fn condition_of(node: Node) -> Option<Node> {
    node.child_by_field_name("condition").or_else(|| first_named(node))
}

fn body_of(node: Node) -> Option<Node> {
    node.child_by_field_name("body").or_else(|| last_named(node))
}

fn positional(a: Node, b: Node) -> Execution {
    if a.start_byte() < b.start_byte() {
        Execution::Yes
    } else {
        Execution::No
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ForPart {
    Initializer,
    Condition,
    Update,
    Body,
}

fn for_part(stmt: Node, child: Node) -> ForPart {
    if same(child, body_of(stmt)) {
        return ForPart::Body;
    }
    let semicolons: Vec<usize> = children(stmt)
        .into_iter()
        .filter(|c| !c.is_named() && c.kind() == ";")
        .map(|c| c.start_byte())
        .collect();
    match semicolons.as_slice() {
        [first, ..] if child.end_byte() <= *first => ForPart::Initializer,
        [_, second, ..] if child.end_byte() <= *second => ForPart::Condition,
        _ => ForPart::Update,
    }
}

fn order_children(lca: Node, ca: Node, cb: Node) -> Execution {
    match lca.kind() {
        "if_statement" | "conditional_expression" => {
            let condition = condition_of(lca);
            if same(ca, condition) {
                Execution::Yes
            } else if same(cb, condition) {
                Execution::No
            } else {
                Execution::Maybe
            }
        }
        "while_statement" => {
            if same(ca, condition_of(lca)) {
                Execution::Yes
            } else {
                Execution::Maybe
            }
        }
        "do_statement" => {
            if same(ca, body_of(lca)) && same(cb, lca.child_by_field_name("condition")) {
                Execution::Yes
            } else {
                Execution::Maybe
            }
        }
        "for_statement" => match (for_part(lca, ca), for_part(lca, cb)) {
            (ForPart::Initializer, _) => Execution::Yes,
            (_, ForPart::Initializer) => Execution::No,
            (ForPart::Condition, ForPart::Body) => Execution::Yes,
            _ => Execution::Maybe,
        },
        "for_each_statement" | "foreach_statement" => {
            let collection = lca.child_by_field_name("right");
            if same(ca, collection) {
                Execution::Yes
            } else if same(cb, collection) {
                Execution::No
            } else {
                Execution::Maybe
            }
        }
        "try_statement" => {
            if ca.kind() == "finally_clause" && cb.kind() == "block" {
                Execution::No
            } else {
                Execution::Maybe
            }
        }
        "using_statement" | "lock_statement" | "fixed_statement" => {
            let body = body_of(lca);
            if same(cb, body) {
                Execution::Yes
            } else if same(ca, body) {
                Execution::No
            } else {
                positional(ca, cb)
            }
        }
        "switch_statement" | "switch_expression" => {
            let value = lca.child_by_field_name("value").or_else(|| first_named(lca));
            if same(ca, value) {
                Execution::Yes
            } else if same(cb, value) {
                Execution::No
            } else {
                Execution::Maybe
            }
        }
        "switch_body" => Execution::Maybe,
        _ => positional(ca, cb),
    }
}

fn operator_token(node: Node) -> &'static str {
    children(node)
        .into_iter()
        .find(|c| !c.is_named())
        .map(|c| c.kind())
        .unwrap_or("")
}

/// Whether `child` runs only on some executions of `parent`.
fn is_conditional_child(parent: Node, child: Node) -> bool {
    match parent.kind() {
        "if_statement" | "conditional_expression" | "while_statement" => {
            !same(child, condition_of(parent))
        }
        "binary_expression" => {
            matches!(operator_token(parent), "&&" | "||" | "??") && same(child, last_named(parent))
        }
        "assignment_expression" => operator_token(parent) == "??=" && same(child, last_named(parent)),
        "conditional_access_expression" => !same(child, first_named(parent)),
        "for_statement" => for_part(parent, child) != ForPart::Initializer,
        "for_each_statement" | "foreach_statement" => same(child, body_of(parent)),
        "try_statement" => child.kind() == "catch_clause",
        "catch_clause" | "switch_section" | "switch_expression_arm" | "switch_body" => true,
        _ => false,
    }
}

fn conditionally_reached(node: Node, stop: Node) -> bool {
    let mut child = node;
    for parent in ancestors(node) {
        if parent.id() == stop.id() {
            return false;
        }
        if is_conditional_child(parent, child) {
            return true;
        }
        child = parent;
    }
    false
}

/// A `break`, `continue` or caught `throw` ahead of `node` can leave a
/// construct below `stop` without running `node`.
fn skipped_by_jump(node: Node, stop: Node) -> bool {
    let mut child = node;
    for parent in ancestors(node) {
        if parent.id() == stop.id() || REGIONS.contains(&parent.kind()) {
            return false;
        }
        let kind = parent.kind();
        let escapes = if LOOPS.contains(&kind) || kind == "switch_statement" {
            jump_ahead(parent, node, |j| {
                matches!(j.kind(), "break_statement" | "continue_statement")
                    && jump_target(j).is_some_and(|t| t.id() == parent.id())
            })
        } else if kind == "try_statement" && child.kind() == "block" && has_catch(parent) {
            jump_ahead(child, node, |j| matches!(j.kind(), "throw_statement" | "throw_expression"))
        } else {
            false
        };
        if escapes {
            return true;
        }
        child = parent;
    }
    false
}

/// Whether a jump matching `is_jump` inside `scope` ends before `node` starts.
fn jump_ahead(scope: Node, node: Node, is_jump: impl Fn(Node) -> bool) -> bool {
    let mut found = false;
    walk(scope, &mut |n| {
        if found || n.start_byte() >= node.start_byte() || (is_lambda(n) && n.id() != scope.id()) {
            return false;
        }
        found = is_jump(n) && n.end_byte() <= node.start_byte();
        true
    });
    found
}

/// Loop or switch a `break` / `continue` leaves.
fn jump_target(jump: Node) -> Option<Node> {
    let is_continue = jump.kind() == "continue_statement";
    ancestors(jump)
        .take_while(|a| !REGIONS.contains(&a.kind()))
        .find(|a| LOOPS.contains(&a.kind()) || (!is_continue && a.kind() == "switch_statement"))
}

fn has_catch(try_statement: Node) -> bool {
    named_children(try_statement)
        .iter()
        .any(|c| c.kind() == "catch_clause")
}

/// `goto` can reach any label of the region.
fn has_goto(region: Node) -> bool {
    let mut found = false;
    walk(region, &mut |n| {
        found |= n.kind() == "goto_statement";
        !found && !(is_lambda(n) && n.id() != region.id())
    });
    found
}

/// A loop between `node` and its region can run it again.
fn in_loop(node: Node) -> bool {
    for a in ancestors(node) {
        if REGIONS.contains(&a.kind()) {
            return false;
        }
        if LOOPS.contains(&a.kind()) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::{compile, find, find_nth};

    const SRC: &str = r#"
class C
{
    void M(bool c)
    {
        var a = 1;
        var b = 2;
        if (c) { Foo(); } else { Bar(); }
        while (c) { Baz(); }
        Qux();
        try { T1(); } finally { F1(); }
        System.Action act = () => L();
        for (var i = 0; i < 3; i++) { Step(); }
    }
}
"#;

    #[test]
    fn irreflexive() {
        let compilation = compile(SRC);
        let root = compilation.documents()[0].root();
        let foo = find(root, SRC, "invocation_expression", "Foo()");
        assert_eq!(executed_before(foo, foo), Execution::No);
    }

    #[test]
    fn sequential_statements_follow_source_order() {
        let compilation = compile(SRC);
        let root = compilation.documents()[0].root();
        let a = find(root, SRC, "variable_declarator", "a = 1");
        let b = find(root, SRC, "variable_declarator", "b = 2");
        assert_eq!(executed_before(a, b), Execution::Yes);
        assert_eq!(executed_before(b, a), Execution::No);
    }

    #[test]
    fn exclusive_branches_are_maybe() {
        let compilation = compile(SRC);
        let root = compilation.documents()[0].root();
        let foo = find(root, SRC, "invocation_expression", "Foo()");
        let bar = find(root, SRC, "invocation_expression", "Bar()");
        assert_eq!(executed_before(foo, bar), Execution::Maybe);
        assert_eq!(executed_before(bar, foo), Execution::Maybe);
    }

    #[test]
    fn condition_runs_before_its_branches() {
        let compilation = compile(SRC);
        let root = compilation.documents()[0].root();
        let condition = find_nth(root, SRC, "identifier", "c", 1);
        let foo = find(root, SRC, "invocation_expression", "Foo()");
        assert_eq!(executed_before(condition, foo), Execution::Yes);
        assert_eq!(executed_before(foo, condition), Execution::No);
    }

    #[test]
    fn conditional_code_is_maybe_before_later_code() {
        let compilation = compile(SRC);
        let root = compilation.documents()[0].root();
        let foo = find(root, SRC, "invocation_expression", "Foo()");
        let qux = find(root, SRC, "invocation_expression", "Qux()");
        assert_eq!(executed_before(foo, qux), Execution::Maybe);
    }

    #[test]
    fn loop_body_is_maybe_before_code_after_the_loop() {
        let compilation = compile(SRC);
        let root = compilation.documents()[0].root();
        let baz = find(root, SRC, "invocation_expression", "Baz()");
        let qux = find(root, SRC, "invocation_expression", "Qux()");
        assert_eq!(executed_before(baz, qux), Execution::Maybe);
        assert_eq!(executed_before(qux, baz), Execution::No);
    }

    #[test]
    fn finally_never_runs_before_try() {
        let compilation = compile(SRC);
        let root = compilation.documents()[0].root();
        let t1 = find(root, SRC, "invocation_expression", "T1()");
        let f1 = find(root, SRC, "invocation_expression", "F1()");
        assert_eq!(executed_before(f1, t1), Execution::No);
        assert_eq!(executed_before(t1, f1), Execution::Maybe);
    }

    #[test]
    fn other_regions_are_maybe() {
        let compilation = compile(SRC);
        let root = compilation.documents()[0].root();
        let l = find(root, SRC, "invocation_expression", "L()");
        let qux = find(root, SRC, "invocation_expression", "Qux()");
        assert_eq!(executed_before(qux, l), Execution::Maybe);
        assert_eq!(executed_before(l, qux), Execution::Maybe);
    }

    #[test]
    fn for_initializer_runs_first_and_body_repeats() {
        let compilation = compile(SRC);
        let root = compilation.documents()[0].root();
        let init = find(root, SRC, "variable_declarator", "i = 0");
        let step = find(root, SRC, "invocation_expression", "Step()");
        assert_eq!(executed_before(init, step), Execution::Yes);
        assert_eq!(executed_before(step, init), Execution::No);
    }

    const JUMPS: &str = r#"
class C
{
    void M(bool c)
    {
        try { if (c) throw new System.Exception(); A(); } catch { }
        B();
        do { if (c) break; D(); } while (c);
        E();
        do { if (c) continue; G(); } while (c);
        H();
        try { if (c) throw new System.Exception(); K(); } finally { }
        N();
        do { P(); if (c) break; } while (c);
        Q();
        try { System.Action act = () => { throw new System.Exception(); }; R(); } catch { }
        S();
    }

    void Goto(bool c)
    {
        if (c) goto done;
        U();
        done:
        V();
    }

    void Switch(int k)
    {
        switch (k) { case 1: if (k > 0) break; W(); break; }
        X();
    }
}
"#;

    fn jump_order(first: &str, second: &str) -> Execution {
        let compilation = compile(JUMPS);
        let root = compilation.documents()[0].root();
        let a = find(root, JUMPS, "invocation_expression", first);
        let b = find(root, JUMPS, "invocation_expression", second);
        executed_before(a, b)
    }

    #[test]
    fn caught_throw_can_skip_the_rest_of_the_try() {
        assert_eq!(jump_order("A()", "B()"), Execution::Maybe);
    }

    #[test]
    fn uncaught_throw_leaves_the_region() {
        // a throw without a catch never reaches N()
        assert_eq!(jump_order("K()", "N()"), Execution::Yes);
    }

    #[test]
    fn break_and_continue_can_skip_the_rest_of_a_loop() {
        assert_eq!(jump_order("D()", "E()"), Execution::Maybe);
        assert_eq!(jump_order("G()", "H()"), Execution::Maybe);
    }

    #[test]
    fn jumps_after_the_node_do_not_matter() {
        assert_eq!(jump_order("P()", "Q()"), Execution::Yes);
    }

    #[test]
    fn throws_in_lambdas_do_not_leave_the_try() {
        assert_eq!(jump_order("R()", "S()"), Execution::Yes);
    }

    #[test]
    fn goto_makes_order_maybe() {
        assert_eq!(jump_order("U()", "V()"), Execution::Maybe);
    }

    #[test]
    fn break_out_of_a_switch_section_is_maybe() {
        assert_eq!(jump_order("W()", "X()"), Execution::Maybe);
    }
}
