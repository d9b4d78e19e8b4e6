//! May-analysis: could this value be shared with, or owned by, someone else?
//!
//! Where [`super::ownership`] asks "is this provably ours", this asks the
//! opposite question for disposal sites. Only positive evidence counts; a
//! call into code outside the compilation proves nothing either way.

use super::mutation::{mutations, Scope};
use super::ownership::getter;
use super::pool::Visited;
use super::Analysis;
use crate::model::{known, tuple_slot_index, Symbol};
use crate::syntax::{
    accessor_keyword, accessors, binary_operator, invoked_member, is_auto_property, last_named, member_name,
    member_receiver, modifiers, named_children, region_of, returned_expressions, slice, strip_conversions,
};
use tree_sitter::Node;

pub fn is_potentially_cached_or_injected<'c>(cx: &Analysis<'_, 'c>, expr: Node<'c>) -> bool {
    let mut walker = Walker {
        cx,
        visited: Visited::acquire(),
    };
    walker.expr(expr)
}

struct Walker<'x, 'a, 'c> {
    cx: &'x Analysis<'a, 'c>,
    visited: Visited,
}

impl<'c> Walker<'_, '_, 'c> {
    fn expr(&mut self, expr: Node<'c>) -> bool {
        if self.cx.is_cancelled() {
            return false;
        }
        let expr = strip_conversions(self.cx.source_of(expr), expr);
        match expr.kind() {
            "element_access_expression" | "element_binding_expression" => true,
            "conditional_expression" => named_children(expr).into_iter().skip(1).any(|b| self.expr(b)),
            "switch_expression" => named_children(expr)
                .into_iter()
                .filter(|c| c.kind() == "switch_expression_arm")
                .filter_map(last_named)
                .any(|v| self.expr(v)),
            "binary_expression" if binary_operator(self.cx.source_of(expr), expr) == Some("??") => {
                named_children(expr).into_iter().any(|e| self.expr(e))
            }
            "assignment_expression" => last_named(expr).is_some_and(|r| self.expr(r)),
            "invocation_expression" => self.invocation(expr),
            "member_access_expression" => match slot_receiver(self.cx, expr) {
                Some(wrapper) => self.expr(wrapper),
                None => self.symbol(expr),
            },
            "identifier" | "generic_name" | "member_binding_expression"
            | "conditional_access_expression" => self.symbol(expr),
            _ => false,
        }
    }

    fn invocation(&mut self, inv: Node<'c>) -> bool {
        let Some((name_node, receiver)) = invoked_member(inv) else {
            return false;
        };
        let name = self.cx.text(name_node);
        if let Some(receiver) = receiver {
            if name == "ConfigureAwait" || known::is_element_projection(name) {
                return self.expr(receiver);
            }
            if self.cx.model.framework_call(inv).is_some() {
                return false;
            }
        }
        match self.cx.model.symbol(inv) {
            Some(Symbol::Method(method)) => self.returns(method),
            _ => false,
        }
    }

    fn returns(&mut self, member: Node<'c>) -> bool {
        let key = Symbol::Method(member).key();
        if !self.visited.insert(key) {
            return false;
        }
        let found = returned_expressions(member).into_iter().any(|r| self.expr(r));
        self.visited.remove(key);
        found
    }

    fn symbol(&mut self, expr: Node<'c>) -> bool {
        let Some(sym) = self.cx.model.symbol(expr) else {
            return false;
        };
        match sym {
            Symbol::Parameter(p) => {
                let text = slice(self.cx.source_of(p), p).trim_start();
                !text.starts_with("out ")
            }
            // only the type itself can call a private setter
            Symbol::SetterValue(p) if p.kind() == "property_declaration" && setter_is_private(self.cx, p) => {
                self.assigned_values(Symbol::Property(p))
            }
            Symbol::SetterValue(_) => true,
            Symbol::Field(_) | Symbol::Property(_) if self.cx.model.is_static(sym) => true,
            Symbol::Property(p) if !is_auto_property(p) && initializer_of_none(p) => {
                // computed getter: follow what it returns
                self.returns(getter(p).unwrap_or(p))
            }
            Symbol::Field(_) | Symbol::Property(_) | Symbol::Local(_) => self.assigned_values(sym),
            _ => false,
        }
    }

    fn assigned_values(&mut self, sym: Symbol<'c>) -> bool {
        if let Symbol::Local(decl) = sym
            && decl.kind() == "identifier"
        {
            // foreach variable: its collection decides
            return decl
                .parent()
                .filter(|p| matches!(p.kind(), "for_each_statement" | "foreach_statement"))
                .and_then(|p| p.child_by_field_name("right").or_else(|| last_named_before_body(p)))
                .is_some_and(|collection| self.expr(collection));
        }
        let key = sym.key();
        if !self.visited.insert(key) {
            return false;
        }
        let scope = match sym {
            Symbol::Local(decl) => region_of(decl).map(Scope::Node),
            _ => Scope::for_symbol(self.cx, sym),
        };
        let found = scope.is_some_and(|scope| {
            mutations(self.cx, sym, scope)
                .into_iter()
                .filter_map(|m| m.value)
                .any(|v| self.expr(v))
        });
        self.visited.remove(key);
        found
    }
}

/// Receiver of `wrapper.Item1` / `wrapper.Value`: the slot holds whatever
/// the wrapper was built from.
fn slot_receiver<'c>(cx: &Analysis<'_, 'c>, expr: Node<'c>) -> Option<Node<'c>> {
    let name = cx.text(member_name(expr)?);
    if tuple_slot_index(name).is_none() && name != "Value" {
        return None;
    }
    member_receiver(expr).filter(|r| !matches!(r.kind(), "this_expression" | "base_expression"))
}

fn setter_is_private(cx: &Analysis<'_, '_>, property: Node) -> bool {
    let source = cx.source_of(property);
    let Some(setter) = accessors(property)
        .into_iter()
        .find(|a| matches!(accessor_keyword(source, *a), "set" | "init"))
    else {
        return false;
    };
    let own = modifiers(source, setter);
    if !own.is_empty() {
        return own == ["private"];
    }
    let declared = modifiers(source, property);
    !["public", "protected", "internal"].iter().any(|m| declared.contains(m))
}

fn initializer_of_none(property: Node) -> bool {
    crate::syntax::initializer_of(property).is_none()
}

fn last_named_before_body(stmt: Node) -> Option<Node> {
    let kids = named_children(stmt);
    kids.len().checked_sub(2).and_then(|i| kids.get(i).copied())
}
