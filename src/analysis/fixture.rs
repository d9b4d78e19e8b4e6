//! Test-fixture lifecycle: members created in `[SetUp]` and released in the
//! paired `[TearDown]`.

use super::Analysis;
use crate::model::{known, TypeId};
use crate::syntax::{attribute_names, nearest_ancestor};
use tree_sitter::Node;

/// Teardown attribute paired with one of the method's setup attributes.
pub fn teardown_attribute<'c>(cx: &Analysis<'_, 'c>, method: Node<'c>) -> Option<&'static str> {
    attribute_names(cx.source_of(method), method)
        .iter()
        .find_map(|a| known::teardown_for(a))
}

/// Setup method containing `node`, if it is one.
pub fn enclosing_setup<'c>(cx: &Analysis<'_, 'c>, node: Node<'c>) -> Option<Node<'c>> {
    let method = nearest_ancestor(node, &["method_declaration"])?;
    teardown_attribute(cx, method).map(|_| method)
}

/// Methods of the type (or its bases) carrying the teardown attribute that
/// pairs with `setup`.
pub fn teardown_methods<'c>(cx: &Analysis<'_, 'c>, owner: TypeId, setup: Node<'c>) -> Vec<Node<'c>> {
    let Some(wanted) = teardown_attribute(cx, setup) else {
        return Vec::new();
    };
    std::iter::once(owner)
        .chain(cx.model.base_chain(owner))
        .flat_map(|t| cx.model.members(t))
        .filter(|m| m.kind() == "method_declaration")
        .filter(|m| attribute_names(cx.source_of(*m), *m).iter().any(|a| a == wanted))
        .collect()
}
