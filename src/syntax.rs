//! Small, grammar-tolerant accessors over the tree-sitter C# syntax tree.
//!
//! Field names in the C# grammar have moved between releases, so every
//! accessor tries the field first and falls back to positional children.

use tree_sitter::Node;

pub(crate) fn slice<'a>(source: &'a str, node: Node) -> &'a str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

pub(crate) fn is_trivia(node: Node) -> bool {
    matches!(node.kind(), "comment") || node.kind().starts_with("preproc")
}

/// Named children, without comments and preprocessor lines.
pub(crate) fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| !is_trivia(*c))
        .collect()
}

/// All children including anonymous tokens.
pub(crate) fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

pub(crate) fn first_named<'t>(node: Node<'t>) -> Option<Node<'t>> {
    named_children(node).into_iter().next()
}

pub(crate) fn last_named<'t>(node: Node<'t>) -> Option<Node<'t>> {
    named_children(node).into_iter().last()
}

pub(crate) fn child_of_kind<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    named_children(node)
        .into_iter()
        .find(|c| kinds.contains(&c.kind()))
}

pub(crate) fn has_token(node: Node, token: &str) -> bool {
    children(node).iter().any(|c| !c.is_named() && c.kind() == token)
}

/// Depth-first walk. Returning `false` from `f` skips the node's children.
pub(crate) fn walk<'t>(node: Node<'t>, f: &mut impl FnMut(Node<'t>) -> bool) {
    if !f(node) {
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, f);
    }
}

pub(crate) fn ancestors<'t>(node: Node<'t>) -> impl Iterator<Item = Node<'t>> {
    std::iter::successors(node.parent(), |n| n.parent())
}

pub(crate) fn is_ancestor_of(ancestor: Node, node: Node) -> bool {
    if ancestor.start_byte() > node.start_byte() || ancestor.end_byte() < node.end_byte() {
        return false;
    }
    ancestors(node).any(|a| a.id() == ancestor.id())
}

pub(crate) fn contains(outer: Node, inner: Node) -> bool {
    outer.id() == inner.id() || is_ancestor_of(outer, inner)
}

pub(crate) fn nearest_ancestor<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    ancestors(node).find(|a| kinds.contains(&a.kind()))
}

pub(crate) const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "struct_declaration",
    "record_declaration",
    "record_struct_declaration",
    "interface_declaration",
];

pub(crate) const LAMBDAS: &[&str] = &[
    "lambda_expression",
    "anonymous_method_expression",
    "local_function_statement",
];

/// Nodes that own a body and bound every flow query.
pub(crate) const REGIONS: &[&str] = &[
    "method_declaration",
    "constructor_declaration",
    "destructor_declaration",
    "operator_declaration",
    "conversion_operator_declaration",
    "accessor_declaration",
    "property_declaration",
    "indexer_declaration",
    "field_declaration",
    "lambda_expression",
    "anonymous_method_expression",
    "local_function_statement",
];

pub(crate) fn is_type_declaration(node: Node) -> bool {
    TYPE_DECLARATIONS.contains(&node.kind())
}

pub(crate) fn is_lambda(node: Node) -> bool {
    LAMBDAS.contains(&node.kind())
}

/// Smallest method body, accessor body or lambda containing `node`.
pub(crate) fn region_of<'t>(node: Node<'t>) -> Option<Node<'t>> {
    nearest_ancestor(node, REGIONS)
}

pub(crate) fn containing_member<'t>(node: Node<'t>) -> Option<Node<'t>> {
    let mut cur = node;
    while let Some(parent) = cur.parent() {
        if is_type_declaration(parent) || parent.kind() == "declaration_list" {
            return if parent.kind() == "declaration_list" {
                Some(cur)
            } else {
                None
            };
        }
        cur = parent;
    }
    None
}

/// True when `node` sits inside a lambda, anonymous method or local function
/// nested below `boundary`.
pub(crate) fn in_nested_lambda(node: Node, boundary: Node) -> bool {
    for a in ancestors(node) {
        if a.id() == boundary.id() {
            return false;
        }
        if is_lambda(a) {
            return true;
        }
    }
    false
}

pub(crate) fn strip_parens(mut node: Node) -> Node {
    while node.kind() == "parenthesized_expression" {
        match first_named(node) {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

/// Peel parentheses, casts, `as`, null-forgiving `!` and `await`.
pub(crate) fn strip_conversions<'t>(source: &str, mut node: Node<'t>) -> Node<'t> {
    loop {
        node = strip_parens(node);
        let next = match node.kind() {
            "cast_expression" => last_named(node),
            "as_expression" => first_named(node),
            "binary_expression" if binary_operator(source, node) == Some("as") => first_named(node),
            "postfix_unary_expression" if slice(source, node).trim_end().ends_with('!') => {
                first_named(node)
            }
            "await_expression" => first_named(node),
            _ => None,
        };
        match next {
            Some(n) => node = n,
            None => return node,
        }
    }
}

pub(crate) fn binary_operator<'s>(source: &'s str, node: Node) -> Option<&'s str> {
    let kids = named_children(node);
    let (left, right) = (kids.first()?, kids.last()?);
    source
        .get(left.end_byte()..right.start_byte())
        .map(str::trim)
}

pub(crate) fn unary_operator<'s>(source: &'s str, node: Node) -> &'s str {
    let text = slice(source, node);
    let Some(operand) = first_named(node) else {
        return "";
    };
    if node.kind() == "prefix_unary_expression" {
        text.get(..operand.start_byte() - node.start_byte())
            .unwrap_or("")
            .trim()
    } else {
        text.get(operand.end_byte() - node.start_byte()..)
            .unwrap_or("")
            .trim()
    }
}

pub(crate) struct Assignment<'t, 's> {
    pub left: Node<'t>,
    pub operator: &'s str,
    pub right: Node<'t>,
}

pub(crate) fn assignment_parts<'t, 's>(source: &'s str, node: Node<'t>) -> Option<Assignment<'t, 's>> {
    if node.kind() != "assignment_expression" {
        return None;
    }
    let kids = named_children(node);
    let left = node.child_by_field_name("left").or_else(|| kids.first().copied())?;
    let right = node.child_by_field_name("right").or_else(|| kids.last().copied())?;
    let operator = source.get(left.end_byte()..right.start_byte())?.trim();
    Some(Assignment {
        left,
        operator,
        right,
    })
}

/// The called expression and argument list of an invocation.
pub(crate) fn invocation_function<'t>(node: Node<'t>) -> Option<Node<'t>> {
    node.child_by_field_name("function")
        .or_else(|| first_named(node))
}

pub(crate) fn argument_list<'t>(node: Node<'t>) -> Option<Node<'t>> {
    node.child_by_field_name("arguments")
        .or_else(|| child_of_kind(node, &["argument_list"]))
}

pub(crate) fn arguments<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    argument_list(node)
        .map(|list| {
            named_children(list)
                .into_iter()
                .filter(|c| c.kind() == "argument")
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn argument_expression<'t>(argument: Node<'t>) -> Option<Node<'t>> {
    if argument.kind() != "argument" {
        return Some(argument);
    }
    last_named(argument)
}

/// `out`, `ref` or `in` when the argument carries one.
pub(crate) fn argument_modifier<'s>(source: &'s str, argument: Node) -> Option<&'s str> {
    let expr = last_named(argument)?;
    let prefix = source.get(argument.start_byte()..expr.start_byte())?;
    let prefix = prefix.rsplit(':').next().unwrap_or(prefix).trim();
    ["out", "ref", "in"].into_iter().find(|m| *m == prefix)
}

/// Simple name of a name-like node (`Foo`, `Foo<T>`, `A.B.Foo`).
pub(crate) fn simple_name<'t>(node: Node<'t>) -> Option<Node<'t>> {
    match node.kind() {
        "identifier" => Some(node),
        "generic_name" => first_named(node).and_then(simple_name),
        "qualified_name" | "alias_qualified_name" => last_named(node).and_then(simple_name),
        "member_access_expression" => member_name(node),
        "member_binding_expression" => last_named(node).and_then(simple_name),
        _ => None,
    }
}

pub(crate) fn member_receiver<'t>(node: Node<'t>) -> Option<Node<'t>> {
    node.child_by_field_name("expression")
        .or_else(|| first_named(node))
}

pub(crate) fn member_name<'t>(node: Node<'t>) -> Option<Node<'t>> {
    node.child_by_field_name("name")
        .or_else(|| last_named(node))
        .and_then(|n| if n.kind() == "identifier" { Some(n) } else { simple_name(n) })
}

/// Name and receiver of an invocation's target. For `a?.B()` the receiver is
/// `a`, for `B()` there is none.
pub(crate) fn invoked_member<'t>(node: Node<'t>) -> Option<(Node<'t>, Option<Node<'t>>)> {
    let function = strip_parens(invocation_function(node)?);
    match function.kind() {
        "identifier" | "generic_name" => Some((simple_name(function)?, None)),
        "member_access_expression" => Some((member_name(function)?, member_receiver(function))),
        "member_binding_expression" => {
            let name = simple_name(function)?;
            let receiver = conditional_access_receiver(node);
            Some((name, receiver))
        }
        "conditional_access_expression" => {
            let kids = named_children(function);
            let receiver = kids.first().copied();
            let binding = kids.last().copied()?;
            Some((simple_name(binding)?, receiver))
        }
        _ => None,
    }
}

/// For `x?.M()` parsed as `conditional_access(x, invocation(.M, ()))`, the `x`.
fn conditional_access_receiver<'t>(node: Node<'t>) -> Option<Node<'t>> {
    let parent = node.parent()?;
    if parent.kind() != "conditional_access_expression" {
        return None;
    }
    let first = first_named(parent)?;
    (first.id() != node.id()).then_some(first)
}

pub(crate) fn enclosing_statement<'t>(node: Node<'t>) -> Option<Node<'t>> {
    let mut cur = node;
    loop {
        if cur.kind().ends_with("_statement") {
            return Some(cur);
        }
        cur = cur.parent()?;
        if is_type_declaration(cur) || cur.kind() == "declaration_list" {
            return None;
        }
    }
}

pub(crate) fn name_of<'t>(decl: Node<'t>) -> Option<Node<'t>> {
    if let Some(n) = decl.child_by_field_name("name") {
        return simple_name(n).or(Some(n));
    }
    match decl.kind() {
        "variable_declarator" => first_named(decl).filter(|n| n.kind() == "identifier"),
        "parameter" => named_children(decl)
            .into_iter()
            .rfind(|c| c.kind() == "identifier"),
        _ => {
            // name precedes the parameter list or accessor list / arrow body
            let kids = named_children(decl);
            let stop = kids.iter().position(|c| {
                matches!(
                    c.kind(),
                    "parameter_list" | "accessor_list" | "arrow_expression_clause" | "block"
                        | "type_parameter_list" | "base_list" | "declaration_list"
                )
            })?;
            kids[..stop].iter().rev().find(|c| c.kind() == "identifier").copied()
        }
    }
}

pub(crate) fn name_text<'s>(source: &'s str, decl: Node) -> Option<&'s str> {
    name_of(decl).map(|n| slice(source, n))
}

/// Declared type of a field/local `variable_declaration`, property, method or parameter.
pub(crate) fn declared_type_node<'t>(decl: Node<'t>) -> Option<Node<'t>> {
    if let Some(t) = decl
        .child_by_field_name("type")
        .or_else(|| decl.child_by_field_name("returns"))
    {
        return Some(t);
    }
    let name = name_of(decl)?;
    named_children(decl)
        .into_iter()
        .take_while(|c| c.start_byte() < name.start_byte())
        .filter(|c| !matches!(c.kind(), "attribute_list" | "modifier" | "explicit_interface_specifier"))
        .last()
}

pub(crate) fn variable_declaration<'t>(node: Node<'t>) -> Option<Node<'t>> {
    if node.kind() == "variable_declaration" {
        return Some(node);
    }
    child_of_kind(node, &["variable_declaration"])
}

pub(crate) fn declarators<'t>(declaration: Node<'t>) -> Vec<Node<'t>> {
    named_children(declaration)
        .into_iter()
        .filter(|c| c.kind() == "variable_declarator")
        .collect()
}

pub(crate) fn variable_type_node<'t>(declaration: Node<'t>) -> Option<Node<'t>> {
    declaration
        .child_by_field_name("type")
        .or_else(|| first_named(declaration).filter(|c| c.kind() != "variable_declarator"))
}

/// `= value` of a declarator or property.
pub(crate) fn initializer_of<'t>(decl: Node<'t>) -> Option<Node<'t>> {
    if let Some(clause) = child_of_kind(decl, &["equals_value_clause"]) {
        return first_named(clause);
    }
    if decl.kind() == "property_declaration" {
        if let Some(value) = decl.child_by_field_name("value")
            && value.kind() != "arrow_expression_clause"
        {
            return Some(value);
        }
    }
    let kids = children(decl);
    let eq = kids.iter().position(|c| !c.is_named() && c.kind() == "=")?;
    kids[eq + 1..].iter().find(|c| c.is_named() && !is_trivia(**c)).copied()
}

pub(crate) fn parameters<'t>(decl: Node<'t>) -> Vec<Node<'t>> {
    let list = decl
        .child_by_field_name("parameters")
        .or_else(|| child_of_kind(decl, &["parameter_list", "bracketed_parameter_list"]));
    match list {
        Some(list) => named_children(list)
            .into_iter()
            .filter(|c| c.kind() == "parameter")
            .collect(),
        // `x => ...`
        None if decl.kind() == "lambda_expression" => first_named(decl)
            .filter(|c| c.kind() == "identifier")
            .into_iter()
            .collect(),
        None => Vec::new(),
    }
}

pub(crate) fn block_body<'t>(decl: Node<'t>) -> Option<Node<'t>> {
    decl.child_by_field_name("body")
        .filter(|b| b.kind() == "block")
        .or_else(|| child_of_kind(decl, &["block"]))
}

pub(crate) fn arrow_body<'t>(decl: Node<'t>) -> Option<Node<'t>> {
    if decl.kind() == "lambda_expression" {
        return last_named(decl).filter(|b| b.kind() != "block");
    }
    child_of_kind(decl, &["arrow_expression_clause"]).and_then(first_named)
}

/// Block or expression body of a member, accessor or lambda.
pub(crate) fn body<'t>(decl: Node<'t>) -> Option<Node<'t>> {
    if decl.kind() == "lambda_expression" {
        return last_named(decl);
    }
    block_body(decl).or_else(|| arrow_body(decl))
}

pub(crate) fn statements<'t>(block: Node<'t>) -> Vec<Node<'t>> {
    if block.kind() == "block" {
        named_children(block)
    } else {
        vec![block]
    }
}

pub(crate) fn modifiers<'s>(source: &'s str, decl: Node) -> Vec<&'s str> {
    children(decl)
        .into_iter()
        .filter(|c| c.kind() == "modifier")
        .map(|c| slice(source, c).trim())
        .collect()
}

pub(crate) fn has_modifier(source: &str, decl: Node, modifier: &str) -> bool {
    let decl = match decl.kind() {
        "variable_declarator" => decl
            .parent()
            .and_then(|d| d.parent())
            .unwrap_or(decl),
        _ => decl,
    };
    modifiers(source, decl).contains(&modifier)
        || children(decl).iter().any(|c| !c.is_named() && c.kind() == modifier)
}

/// Attribute names on a declaration, normalized to `SetUp` for
/// `[NUnit.Framework.SetUpAttribute]`.
pub(crate) fn attribute_names(source: &str, decl: Node) -> Vec<String> {
    let mut names = Vec::new();
    for list in named_children(decl).into_iter().filter(|c| c.kind() == "attribute_list") {
        for attr in named_children(list).into_iter().filter(|c| c.kind() == "attribute") {
            if let Some(name) = attribute_name(source, attr) {
                names.push(name);
            }
        }
    }
    names
}

pub(crate) fn attribute_name(source: &str, attr: Node) -> Option<String> {
    let name = attr
        .child_by_field_name("name")
        .or_else(|| first_named(attr))?;
    let simple = simple_name(name).unwrap_or(name);
    let text = slice(source, simple);
    Some(text.strip_suffix("Attribute").unwrap_or(text).to_string())
}

pub(crate) fn accessor_keyword<'s>(source: &'s str, accessor: Node) -> &'s str {
    for child in children(accessor) {
        match child.kind() {
            "get" | "set" | "init" | "add" | "remove" => return child.kind(),
            "identifier" => return slice(source, child),
            _ => {}
        }
    }
    ""
}

pub(crate) fn accessors<'t>(property: Node<'t>) -> Vec<Node<'t>> {
    property
        .child_by_field_name("accessors")
        .or_else(|| child_of_kind(property, &["accessor_list"]))
        .map(|list| {
            named_children(list)
                .into_iter()
                .filter(|c| c.kind() == "accessor_declaration")
                .collect()
        })
        .unwrap_or_default()
}

/// `{ get; set; }`: accessors without bodies.
pub(crate) fn is_auto_property(property: Node) -> bool {
    let accs = accessors(property);
    !accs.is_empty() && accs.iter().all(|a| body(*a).is_none())
}

/// Returned expressions of a member body (or the arrow expression), not
/// descending into nested lambdas.
pub(crate) fn returned_expressions<'t>(decl: Node<'t>) -> Vec<Node<'t>> {
    if let Some(expr) = arrow_body(decl) {
        return vec![expr];
    }
    let Some(block) = block_body(decl) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    walk(block, &mut |n| {
        if is_lambda(n) {
            return false;
        }
        if n.kind() == "return_statement"
            && let Some(expr) = first_named(n)
        {
            out.push(expr);
        }
        true
    });
    out
}
