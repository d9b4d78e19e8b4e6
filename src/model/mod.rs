//! Syntax-driven symbol and type model over a [`Compilation`].
//!
//! This answers the questions the analysis asks of a compiler: what a name
//! refers to, what type an expression has, and whether a type can be
//! disposed. Everything is derived from the syntax trees of the documents
//! in one compilation plus the framework tables in [`known`].

pub(crate) mod known;
pub mod types;

pub use types::TypeRef;

use crate::parser::{Compilation, Document};
use crate::syntax::{
    accessor_keyword, ancestors, arguments, child_of_kind, children, declarators, first_named,
    has_modifier, initializer_of, invocation_function, invoked_member, is_lambda,
    is_type_declaration, last_named, member_name, member_receiver, name_of, name_text,
    named_children, nearest_ancestor, parameters, simple_name, slice, strip_parens,
    variable_declaration, variable_type_node, walk, TYPE_DECLARATIONS,
};
use std::collections::HashMap;
use tree_sitter::Node;

/// Bound on mutually recursive type/symbol lookups (`var a = b; var b = a;`).
const MAX_DEPTH: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(usize);

/// One declaration of a class, struct, record or interface.
#[derive(Debug, Clone)]
pub struct TypeDecl<'c> {
    pub node: Node<'c>,
    pub name: String,
    pub bases: Vec<TypeRef>,
    pub is_interface: bool,
}

/// What a name or member access refers to.
#[derive(Debug, Clone, Copy)]
pub enum Symbol<'c> {
    /// Variable declarator, `out var` / pattern declaration, or the
    /// identifier of a `foreach` / `catch` variable.
    Local(Node<'c>),
    Parameter(Node<'c>),
    /// The implicit `value` of a setter; holds the property declaration.
    SetterValue(Node<'c>),
    /// A `variable_declarator` inside a field declaration.
    Field(Node<'c>),
    Property(Node<'c>),
    /// Method declaration or local function.
    Method(Node<'c>),
    Type(TypeId),
    /// Framework type used as a static receiver (`File`, `GC`).
    Framework(&'static str),
    /// Declared outside the compilation.
    External,
}

impl<'c> Symbol<'c> {
    pub fn key(&self) -> (u8, usize) {
        match self {
            Symbol::Local(n) => (0, n.id()),
            Symbol::Parameter(n) => (1, n.id()),
            Symbol::SetterValue(n) => (2, n.id()),
            Symbol::Field(n) => (3, n.id()),
            Symbol::Property(n) => (4, n.id()),
            Symbol::Method(n) => (5, n.id()),
            Symbol::Type(t) => (6, t.0),
            Symbol::Framework(name) => (7, name.as_ptr() as usize),
            Symbol::External => (8, 0),
        }
    }

    /// Declaration site, when the symbol is declared in the compilation.
    pub fn node(&self) -> Option<Node<'c>> {
        match *self {
            Symbol::Local(n)
            | Symbol::Parameter(n)
            | Symbol::SetterValue(n)
            | Symbol::Field(n)
            | Symbol::Property(n)
            | Symbol::Method(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_member(&self) -> bool {
        matches!(self, Symbol::Field(_) | Symbol::Property(_))
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Symbol::Local(_) | Symbol::Field(_) | Symbol::Property(_))
    }
}

impl PartialEq for Symbol<'_> {
    fn eq(&self, other: &Self) -> bool {
        !matches!(self, Symbol::External) && self.key() == other.key()
    }
}

pub struct SemanticModel<'c> {
    documents: &'c [Document],
    roots: Vec<usize>,
    types: Vec<TypeDecl<'c>>,
    by_name: HashMap<String, Vec<TypeId>>,
    by_node: HashMap<usize, TypeId>,
}

impl<'c> SemanticModel<'c> {
    pub fn new(compilation: &'c Compilation) -> Self {
        let documents = compilation.documents();
        let mut model = Self {
            documents,
            roots: documents.iter().map(|d| d.root().id()).collect(),
            types: Vec::new(),
            by_name: HashMap::new(),
            by_node: HashMap::new(),
        };

        for doc in documents {
            let source = doc.source.as_str();
            walk(doc.root(), &mut |n| {
                if is_type_declaration(n)
                    && let Some(name) = name_text(source, n)
                {
                    let bases = n
                        .child_by_field_name("bases")
                        .or_else(|| child_of_kind(n, &["base_list"]))
                        .map(|list| {
                            named_children(list)
                                .into_iter()
                                .map(|c| TypeRef::from_syntax(source, c))
                                .filter(TypeRef::is_known)
                                .collect()
                        })
                        .unwrap_or_default();
                    let id = TypeId(model.types.len());
                    model.types.push(TypeDecl {
                        node: n,
                        name: name.to_string(),
                        bases,
                        is_interface: n.kind() == "interface_declaration",
                    });
                    model.by_name.entry(name.to_string()).or_default().push(id);
                    model.by_node.insert(n.id(), id);
                }
                !matches!(n.kind(), "block" | "arrow_expression_clause")
            });
        }

        model
    }

    pub fn documents(&self) -> &'c [Document] {
        self.documents
    }

    fn doc_index(&self, node: Node<'c>) -> usize {
        if self.documents.len() <= 1 {
            return 0;
        }
        let root = ancestors(node).last().unwrap_or(node);
        self.roots.iter().position(|r| *r == root.id()).unwrap_or(0)
    }

    pub fn document_of(&self, node: Node<'c>) -> &'c Document {
        &self.documents[self.doc_index(node)]
    }

    pub fn source_of(&self, node: Node<'c>) -> &'c str {
        self.document_of(node).source.as_str()
    }

    pub fn text(&self, node: Node<'c>) -> &'c str {
        slice(self.source_of(node), node)
    }

    pub fn name_of(&self, decl: Node<'c>) -> Option<&'c str> {
        name_text(self.source_of(decl), decl)
    }

    pub fn has_modifier(&self, decl: Node<'c>, modifier: &str) -> bool {
        has_modifier(self.source_of(decl), decl, modifier)
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    pub fn type_decl(&self, id: TypeId) -> &TypeDecl<'c> {
        &self.types[id.0]
    }

    pub fn declared_type_id(&self, decl: Node<'c>) -> Option<TypeId> {
        self.by_node.get(&decl.id()).copied()
    }

    pub fn containing_type(&self, node: Node<'c>) -> Option<TypeId> {
        nearest_ancestor(node, TYPE_DECLARATIONS).and_then(|d| self.declared_type_id(d))
    }

    pub fn types_named(&self, name: &str) -> &[TypeId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn same_type(&self, a: TypeId, b: TypeId) -> bool {
        let (a, b) = (&self.types[a.0], &self.types[b.0]);
        a.name == b.name && a.is_interface == b.is_interface
    }

    /// Every `partial` declaration of the type.
    pub fn parts(&self, id: TypeId) -> Vec<TypeId> {
        self.types_named(&self.types[id.0].name)
            .iter()
            .copied()
            .filter(|other| self.same_type(id, *other))
            .collect()
    }

    fn resolve_class(&self, name: &str) -> Option<TypeId> {
        let candidates = self.types_named(name);
        candidates
            .iter()
            .copied()
            .find(|t| !self.types[t.0].is_interface)
            .or_else(|| candidates.first().copied())
    }

    pub fn base_class(&self, id: TypeId) -> Option<TypeId> {
        for part in self.parts(id) {
            for base in &self.types[part.0].bases {
                let Some(name) = base.name() else { continue };
                if let Some(t) = self
                    .types_named(name)
                    .iter()
                    .copied()
                    .find(|t| !self.types[t.0].is_interface && !self.same_type(*t, id))
                {
                    return Some(t);
                }
            }
        }
        None
    }

    /// Base classes declared in the compilation, nearest first.
    pub fn base_chain(&self, id: TypeId) -> Vec<TypeId> {
        let mut out: Vec<TypeId> = Vec::new();
        let mut cur = self.base_class(id);
        while let Some(b) = cur {
            if self.same_type(b, id) || out.iter().any(|o| self.same_type(*o, b)) || out.len() > MAX_DEPTH {
                break;
            }
            out.push(b);
            cur = self.base_class(b);
        }
        out
    }

    /// Classes in the compilation deriving (transitively) from `id`.
    pub fn derived_types(&self, id: TypeId) -> Vec<TypeId> {
        let mut out: Vec<TypeId> = Vec::new();
        for idx in 0..self.types.len() {
            let t = TypeId(idx);
            if self.same_type(t, id) || out.iter().any(|o| self.same_type(*o, t)) {
                continue;
            }
            if self.base_chain(t).iter().any(|b| self.same_type(*b, id)) {
                out.push(t);
            }
        }
        out
    }

    /// Member declarations across all parts of the type.
    pub fn members(&self, id: TypeId) -> Vec<Node<'c>> {
        self.parts(id)
            .into_iter()
            .flat_map(|p| {
                let node = self.types[p.0].node;
                node.child_by_field_name("body")
                    .or_else(|| child_of_kind(node, &["declaration_list"]))
                    .map(named_children)
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Field declarators declared directly in the type.
    pub fn fields(&self, id: TypeId) -> Vec<Node<'c>> {
        self.members(id)
            .into_iter()
            .filter(|m| m.kind() == "field_declaration")
            .filter_map(variable_declaration)
            .flat_map(declarators)
            .collect()
    }

    pub fn methods_named(&self, id: TypeId, name: &str) -> Vec<Node<'c>> {
        self.members(id)
            .into_iter()
            .filter(|m| m.kind() == "method_declaration" && self.name_of(*m) == Some(name))
            .collect()
    }

    fn own_member(&self, id: TypeId, name: &str, argc: Option<usize>) -> Option<Symbol<'c>> {
        let mut methods = Vec::new();
        for m in self.members(id) {
            match m.kind() {
                "field_declaration" => {
                    for d in variable_declaration(m).map(declarators).unwrap_or_default() {
                        if self.name_of(d) == Some(name) {
                            return Some(Symbol::Field(d));
                        }
                    }
                }
                "property_declaration" if self.name_of(m) == Some(name) => {
                    return Some(Symbol::Property(m));
                }
                "method_declaration" if self.name_of(m) == Some(name) => methods.push(m),
                k if TYPE_DECLARATIONS.contains(&k) && self.name_of(m) == Some(name) => {
                    return self.declared_type_id(m).map(Symbol::Type);
                }
                _ => {}
            }
        }

        let chosen = match argc {
            Some(argc) => methods
                .iter()
                .copied()
                .find(|m| accepts_argc(self.source_of(*m), *m, argc))
                .or_else(|| methods.first().copied()),
            None => methods.first().copied(),
        };
        chosen.map(Symbol::Method)
    }

    /// Member lookup through the type and its base classes.
    pub fn lookup_member(&self, id: TypeId, name: &str, argc: Option<usize>) -> Option<Symbol<'c>> {
        std::iter::once(id)
            .chain(self.base_chain(id))
            .find_map(|t| self.own_member(t, name, argc))
    }

    /// Whether values of `ty` expose a release capability.
    pub fn is_disposable(&self, ty: &TypeRef) -> bool {
        match ty {
            TypeRef::Named { name, .. } => self.named_is_disposable(name, 0),
            _ => false,
        }
    }

    fn named_is_disposable(&self, name: &str, depth: usize) -> bool {
        if depth > MAX_DEPTH {
            return false;
        }
        let declared = self.types_named(name);
        if !declared.is_empty() {
            return declared.iter().any(|t| {
                self.types[t.0]
                    .bases
                    .iter()
                    .filter_map(TypeRef::name)
                    .any(|b| b != name && self.named_is_disposable(b, depth + 1))
            });
        }
        known::is_disposable_type_name(name).unwrap_or(false)
    }

    /// Per-slot disposability of a tuple type; `None` unless some slot is disposable.
    pub fn disposable_slots(&self, ty: &TypeRef) -> Option<Vec<bool>> {
        let slots: Vec<bool> = ty.slot_types()?.iter().map(|t| self.is_disposable(t)).collect();
        slots.iter().any(|d| *d).then_some(slots)
    }

    pub fn is_type_disposable(&self, id: TypeId) -> bool {
        self.named_is_disposable(&self.types[id.0].name, 0)
    }

    // ------------------------------------------------------------------
    // Symbols
    // ------------------------------------------------------------------

    pub fn symbol(&self, node: Node<'c>) -> Option<Symbol<'c>> {
        self.symbol_at(node, 0)
    }

    fn symbol_at(&self, node: Node<'c>, depth: usize) -> Option<Symbol<'c>> {
        if depth > MAX_DEPTH {
            return None;
        }
        let node = strip_parens(node);
        match node.kind() {
            "identifier" | "generic_name" => {
                let simple = simple_name(node)?;
                if let Some(parent) = node.parent() {
                    match parent.kind() {
                        "member_access_expression"
                            if member_name(parent).is_some_and(|n| n.id() == simple.id())
                                && member_receiver(parent).is_some_and(|r| r.id() != node.id()) =>
                        {
                            return self.symbol_at(parent, depth + 1);
                        }
                        "member_binding_expression" | "generic_name" => {
                            return self.symbol_at(parent, depth + 1);
                        }
                        _ => {}
                    }
                }
                if let Some(declared) = self.declared_symbol_at(simple) {
                    return Some(declared);
                }
                let name = self.text(simple);
                self.resolve_simple_name(node, name, call_argc(node))
            }
            "member_access_expression" => {
                let name = self.text(member_name(node)?);
                let receiver = strip_parens(member_receiver(node)?);
                self.member_on_receiver(receiver, name, call_argc(node), depth)
            }
            "member_binding_expression" => {
                let name = self.text(simple_name(node)?);
                let receiver = binding_receiver(node)?;
                self.member_on_receiver(receiver, name, call_argc(node), depth)
            }
            "conditional_access_expression" => {
                last_named(node).and_then(|n| self.symbol_at(n, depth + 1))
            }
            "invocation_expression" => {
                invocation_function(node).and_then(|f| self.symbol_at(f, depth + 1))
            }
            _ => None,
        }
    }

    fn member_on_receiver(
        &self,
        receiver: Node<'c>,
        name: &str,
        argc: Option<usize>,
        depth: usize,
    ) -> Option<Symbol<'c>> {
        match receiver.kind() {
            "this_expression" => {
                let t = self.containing_type(receiver)?;
                return self.lookup_member(t, name, argc).or(Some(Symbol::External));
            }
            "base_expression" => {
                let t = self.containing_type(receiver)?;
                let base = self.base_class(t)?;
                return self.lookup_member(base, name, argc).or(Some(Symbol::External));
            }
            "predefined_type" => return Some(Symbol::External),
            _ => {}
        }

        match self.symbol_at(receiver, depth + 1) {
            Some(Symbol::Type(t)) => {
                return self.lookup_member(t, name, argc).or(Some(Symbol::External));
            }
            Some(Symbol::Framework(_)) => return Some(Symbol::External),
            _ => {}
        }

        if let Some(ty) = self.type_of_at(receiver, depth + 1)
            && let Some(type_name) = ty.name()
            && let Some(t) = self.resolve_class(type_name)
            && let Some(sym) = self.lookup_member(t, name, argc)
        {
            return Some(sym);
        }

        Some(Symbol::External)
    }

    /// The symbol declared by `identifier`, when it is a declaration's name.
    fn declared_symbol_at(&self, identifier: Node<'c>) -> Option<Symbol<'c>> {
        let parent = identifier.parent()?;
        let is_name = || name_of(parent).is_some_and(|n| n.id() == identifier.id());
        match parent.kind() {
            "variable_declarator" if is_name() => Some(if is_field_declarator(parent) {
                Symbol::Field(parent)
            } else {
                Symbol::Local(parent)
            }),
            "parameter" if is_name() => Some(Symbol::Parameter(parent)),
            "property_declaration" if is_name() => Some(Symbol::Property(parent)),
            "method_declaration" | "local_function_statement" if is_name() => Some(Symbol::Method(parent)),
            "declaration_expression" | "declaration_pattern"
                if last_named(parent).is_some_and(|n| n.id() == identifier.id()) =>
            {
                Some(Symbol::Local(parent))
            }
            "for_each_statement" | "foreach_statement"
                if foreach_variable(parent).is_some_and(|n| n.id() == identifier.id()) =>
            {
                Some(Symbol::Local(identifier))
            }
            "catch_declaration"
                if catch_variable(parent).is_some_and(|n| n.id() == identifier.id()) =>
            {
                Some(Symbol::Local(identifier))
            }
            k if TYPE_DECLARATIONS.contains(&k) && is_name() => {
                self.declared_type_id(parent).map(Symbol::Type)
            }
            _ => None,
        }
    }

    fn resolve_simple_name(&self, node: Node<'c>, name: &str, argc: Option<usize>) -> Option<Symbol<'c>> {
        for scope in ancestors(node) {
            match scope.kind() {
                "block" | "switch_section" => {
                    if let Some(sym) = self.local_in_block(scope, node, name) {
                        return Some(sym);
                    }
                }
                "using_statement" | "fixed_statement" | "for_statement" => {
                    if let Some(decl) = child_of_kind(scope, &["variable_declaration"])
                        && let Some(d) = declarators(decl)
                            .into_iter()
                            .find(|d| self.name_of(*d) == Some(name))
                    {
                        return Some(Symbol::Local(d));
                    }
                }
                "for_each_statement" | "foreach_statement" => {
                    if let Some(var) = foreach_variable(scope)
                        && self.text(var) == name
                    {
                        return Some(Symbol::Local(var));
                    }
                }
                "catch_clause" => {
                    if let Some(var) = child_of_kind(scope, &["catch_declaration"]).and_then(catch_variable)
                        && self.text(var) == name
                    {
                        return Some(Symbol::Local(var));
                    }
                }
                "lambda_expression"
                | "anonymous_method_expression"
                | "local_function_statement"
                | "method_declaration"
                | "constructor_declaration"
                | "destructor_declaration"
                | "operator_declaration"
                | "conversion_operator_declaration"
                | "indexer_declaration" => {
                    if let Some(p) = self.parameter_named(scope, name) {
                        return Some(p);
                    }
                }
                "accessor_declaration" if name == "value" => {
                    let keyword = accessor_keyword(self.source_of(scope), scope);
                    if matches!(keyword, "set" | "init" | "add" | "remove")
                        && let Some(owner) = nearest_ancestor(
                            scope,
                            &["property_declaration", "indexer_declaration", "event_declaration"],
                        )
                    {
                        return Some(Symbol::SetterValue(owner));
                    }
                }
                k if TYPE_DECLARATIONS.contains(&k) => {
                    if let Some(p) = self.parameter_named(scope, name) {
                        return Some(p);
                    }
                    if let Some(t) = self.declared_type_id(scope)
                        && let Some(sym) = self.lookup_member(t, name, argc)
                    {
                        return Some(sym);
                    }
                }
                _ => {}
            }
        }

        if let Some(t) = self.resolve_class(name) {
            return Some(Symbol::Type(t));
        }
        if let Some(f) = known::static_framework_type(name) {
            return Some(Symbol::Framework(f));
        }
        Some(Symbol::External)
    }

    fn parameter_named(&self, scope: Node<'c>, name: &str) -> Option<Symbol<'c>> {
        parameters(scope)
            .into_iter()
            .find(|p| {
                let n = if p.kind() == "identifier" { Some(*p) } else { name_of(*p) };
                n.is_some_and(|n| self.text(n) == name)
            })
            .map(Symbol::Parameter)
    }

    /// Locals declared in `block` before `use_site`, local functions anywhere in it.
    fn local_in_block(&self, block: Node<'c>, use_site: Node<'c>, name: &str) -> Option<Symbol<'c>> {
        let mut found = None;
        for stmt in named_children(block) {
            let before = stmt.start_byte() <= use_site.start_byte();
            match stmt.kind() {
                "local_declaration_statement" if before => {
                    if let Some(d) = variable_declaration(stmt)
                        .map(declarators)
                        .unwrap_or_default()
                        .into_iter()
                        .find(|d| self.name_of(*d) == Some(name))
                    {
                        found = Some(Symbol::Local(d));
                    }
                }
                "local_function_statement" if self.name_of(stmt) == Some(name) => {
                    return Some(Symbol::Method(stmt));
                }
                _ => {}
            }
            if before && let Some(d) = self.pattern_declaration(stmt, use_site, name) {
                found = Some(Symbol::Local(d));
            }
        }
        found
    }

    /// `out var name` / `is T name` introduced by `stmt` before `use_site`.
    fn pattern_declaration(&self, stmt: Node<'c>, use_site: Node<'c>, name: &str) -> Option<Node<'c>> {
        let mut found = None;
        walk(stmt, &mut |n| {
            if n.start_byte() >= use_site.start_byte() {
                return false;
            }
            if is_lambda(n) || (n.kind() == "block" && !crate::syntax::contains(n, use_site)) {
                return false;
            }
            if matches!(n.kind(), "declaration_expression" | "declaration_pattern")
                && last_named(n).is_some_and(|id| id.kind() == "identifier" && self.text(id) == name)
            {
                found = Some(n);
            }
            true
        });
        found
    }

    /// Declaration site of a symbol.
    pub fn declaration(&self, sym: Symbol<'c>) -> Option<Node<'c>> {
        sym.node()
    }

    pub fn symbol_name(&self, sym: Symbol<'c>) -> Option<&str> {
        match sym {
            Symbol::Local(n) => match n.kind() {
                "variable_declarator" => self.name_of(n),
                "declaration_expression" | "declaration_pattern" => last_named(n).map(|id| self.text(id)),
                _ => Some(self.text(n)),
            },
            Symbol::Parameter(p) if p.kind() == "identifier" => Some(self.text(p)),
            Symbol::SetterValue(_) => Some("value"),
            Symbol::Parameter(n) | Symbol::Field(n) | Symbol::Property(n) | Symbol::Method(n) => {
                self.name_of(n)
            }
            Symbol::Type(t) => Some(self.types[t.0].name.as_str()),
            Symbol::Framework(f) => Some(f),
            Symbol::External => None,
        }
    }

    /// Type declaring a field, property or method symbol.
    pub fn owner_of(&self, sym: Symbol<'c>) -> Option<TypeId> {
        match sym {
            Symbol::Field(n) | Symbol::Property(n) | Symbol::Method(n) | Symbol::SetterValue(n) => {
                self.containing_type(n)
            }
            _ => None,
        }
    }

    pub fn is_static(&self, sym: Symbol<'c>) -> bool {
        match sym {
            Symbol::Field(d) => self.has_modifier(d, "static") || self.has_modifier(d, "const"),
            Symbol::Property(p) | Symbol::Method(p) => self.has_modifier(p, "static"),
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Expression types
    // ------------------------------------------------------------------

    pub fn declared_type(&self, sym: Symbol<'c>) -> Option<TypeRef> {
        self.declared_type_at(sym, 0)
    }

    fn syntax_type(&self, node: Node<'c>) -> TypeRef {
        TypeRef::from_syntax(self.source_of(node), node)
    }

    fn declared_type_at(&self, sym: Symbol<'c>, depth: usize) -> Option<TypeRef> {
        if depth > MAX_DEPTH {
            return None;
        }
        let ty = match sym {
            Symbol::Local(n) => match n.kind() {
                "variable_declarator" => {
                    let declared = n
                        .parent()
                        .and_then(variable_type_node)
                        .map(|t| self.syntax_type(t))?;
                    if declared == TypeRef::Inferred {
                        return initializer_of(n).and_then(|init| self.type_of_at(init, depth + 1));
                    }
                    declared
                }
                "declaration_expression" | "declaration_pattern" => {
                    first_named(n).map(|t| self.syntax_type(t))?
                }
                _ => {
                    let owner = n.parent()?;
                    let type_node = owner
                        .child_by_field_name("type")
                        .or_else(|| first_named(owner).filter(|t| t.id() != n.id()))?;
                    let declared = self.syntax_type(type_node);
                    if declared == TypeRef::Inferred {
                        let collection = owner.child_by_field_name("right")?;
                        return self.type_of_at(collection, depth + 1)?.element_type();
                    }
                    declared
                }
            },
            Symbol::Parameter(p) if p.kind() == "parameter" => {
                crate::syntax::declared_type_node(p).map(|t| self.syntax_type(t))?
            }
            Symbol::Field(d) => d
                .parent()
                .and_then(variable_type_node)
                .map(|t| self.syntax_type(t))?,
            Symbol::SetterValue(p) | Symbol::Property(p) | Symbol::Method(p) => {
                crate::syntax::declared_type_node(p).map(|t| self.syntax_type(t))?
            }
            Symbol::Type(t) => TypeRef::named(self.types[t.0].name.clone()),
            _ => return None,
        };
        ty.is_known().then_some(ty)
    }

    pub fn type_of(&self, expr: Node<'c>) -> Option<TypeRef> {
        self.type_of_at(expr, 0)
    }

    fn type_of_at(&self, expr: Node<'c>, depth: usize) -> Option<TypeRef> {
        if depth > MAX_DEPTH {
            return None;
        }
        let expr = strip_parens(expr);
        let source = self.source_of(expr);
        match expr.kind() {
            "identifier" | "generic_name" | "member_binding_expression" | "conditional_access_expression" => {
                self.symbol_type(expr, depth)
            }
            "member_access_expression" => {
                let name = self.text(member_name(expr)?);
                let receiver = member_receiver(expr)?;
                if let Some(slot) = tuple_slot_index(name) {
                    let receiver_type = self.type_of_at(receiver, depth + 1);
                    if let Some(slots) = receiver_type.as_ref().and_then(TypeRef::slot_types) {
                        return slots.get(slot).cloned().filter(TypeRef::is_known);
                    }
                }
                if let Some(Symbol::Framework(f)) = self.symbol_at(receiver, depth + 1)
                    && let Some(t) = known::known_static_member(f, name)
                {
                    return Some(TypeRef::from_name(t));
                }
                self.symbol_type(expr, depth)
            }
            "invocation_expression" => self.invocation_type(expr, depth),
            "object_creation_expression" => {
                let t = expr
                    .child_by_field_name("type")
                    .or_else(|| first_named(expr))?;
                Some(self.syntax_type(t)).filter(TypeRef::is_known)
            }
            "implicit_object_creation_expression" => self.target_type(expr, depth),
            "cast_expression" => {
                let t = expr.child_by_field_name("type").or_else(|| first_named(expr))?;
                Some(self.syntax_type(t)).filter(TypeRef::is_known)
            }
            "as_expression" => {
                let t = expr.child_by_field_name("right").or_else(|| last_named(expr))?;
                Some(self.syntax_type(t)).filter(TypeRef::is_known)
            }
            "binary_expression" => match crate::syntax::binary_operator(source, expr)? {
                "as" => last_named(expr).map(|t| self.syntax_type(t)).filter(TypeRef::is_known),
                "??" => first_named(expr)
                    .and_then(|l| self.type_of_at(l, depth + 1))
                    .or_else(|| last_named(expr).and_then(|r| self.type_of_at(r, depth + 1))),
                "==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||" => Some(TypeRef::named("bool")),
                _ => None,
            },
            "conditional_expression" => {
                let kids = named_children(expr);
                kids.get(1)
                    .and_then(|c| self.type_of_at(*c, depth + 1))
                    .or_else(|| kids.get(2).and_then(|a| self.type_of_at(*a, depth + 1)))
            }
            "await_expression" => {
                let inner = first_named(expr)?;
                self.type_of_at(inner, depth + 1)?.awaited()
            }
            "tuple_expression" => Some(TypeRef::Tuple(
                named_children(expr)
                    .into_iter()
                    .filter_map(crate::syntax::argument_expression)
                    .map(|e| self.type_of_at(e, depth + 1).unwrap_or(TypeRef::Unknown))
                    .collect(),
            )),
            "assignment_expression" => {
                let left = expr.child_by_field_name("left").or_else(|| first_named(expr))?;
                self.type_of_at(left, depth + 1)
            }
            "element_access_expression" => {
                let receiver = expr.child_by_field_name("expression").or_else(|| first_named(expr))?;
                self.type_of_at(receiver, depth + 1)?.element_type()
            }
            "this_expression" => {
                let t = self.containing_type(expr)?;
                Some(TypeRef::named(self.types[t.0].name.clone()))
            }
            "string_literal" | "verbatim_string_literal" | "raw_string_literal" | "interpolated_string_expression" => {
                Some(TypeRef::named("string"))
            }
            "integer_literal" => Some(TypeRef::named("int")),
            "boolean_literal" => Some(TypeRef::named("bool")),
            "array_creation_expression" => {
                let t = expr.child_by_field_name("type").or_else(|| first_named(expr))?;
                Some(self.syntax_type(t)).filter(TypeRef::is_known)
            }
            "implicit_array_creation_expression" => Some(TypeRef::Array(Box::new(TypeRef::Unknown))),
            _ => None,
        }
    }

    fn symbol_type(&self, expr: Node<'c>, depth: usize) -> Option<TypeRef> {
        match self.symbol_at(expr, depth + 1)? {
            Symbol::Method(_) | Symbol::Framework(_) | Symbol::External => None,
            sym => self.declared_type_at(sym, depth + 1),
        }
    }

    /// Type an implicit `new()` takes from its target.
    fn target_type(&self, expr: Node<'c>, depth: usize) -> Option<TypeRef> {
        let parent = expr.parent()?;
        match parent.kind() {
            "equals_value_clause" => {
                let owner = parent.parent()?;
                match owner.kind() {
                    "variable_declarator" => {
                        let sym = if is_field_declarator(owner) {
                            Symbol::Field(owner)
                        } else {
                            Symbol::Local(owner)
                        };
                        self.declared_type_at(sym, depth + 1)
                    }
                    "property_declaration" => self.declared_type_at(Symbol::Property(owner), depth + 1),
                    _ => None,
                }
            }
            "property_declaration" => self.declared_type_at(Symbol::Property(parent), depth + 1),
            "variable_declarator" => {
                let sym = if is_field_declarator(parent) {
                    Symbol::Field(parent)
                } else {
                    Symbol::Local(parent)
                };
                self.declared_type_at(sym, depth + 1)
            }
            "assignment_expression" => {
                let left = parent.child_by_field_name("left").or_else(|| first_named(parent))?;
                self.type_of_at(left, depth + 1)
            }
            _ => None,
        }
    }

    fn invocation_type(&self, inv: Node<'c>, depth: usize) -> Option<TypeRef> {
        let (name_node, receiver) = invoked_member(inv)?;
        let name = self.text(name_node);

        if let Some(receiver) = receiver {
            if name == "ConfigureAwait" {
                return self.type_of_at(receiver, depth + 1);
            }
            if known::is_element_projection(name)
                && let Some(element) = self
                    .type_of_at(receiver, depth + 1)
                    .and_then(|t| t.element_type())
            {
                return Some(element);
            }
            let receiver_name = simple_name(strip_parens(receiver)).map(|n| self.text(n));
            if name == "Create"
                && let Some(tuple @ ("Tuple" | "ValueTuple")) = receiver_name
            {
                let args = arguments(inv)
                    .into_iter()
                    .filter_map(crate::syntax::argument_expression)
                    .map(|e| self.type_of_at(e, depth + 1).unwrap_or(TypeRef::Unknown))
                    .collect::<Vec<_>>();
                return Some(if tuple == "Tuple" {
                    TypeRef::generic("Tuple", args)
                } else {
                    TypeRef::Tuple(args)
                });
            }
            if let Some(call) = self.framework_call(inv) {
                return Some(TypeRef::from_name(call.returns));
            }
        }

        match self.symbol_at(inv, depth + 1)? {
            Symbol::Method(m) => self.declared_type_at(Symbol::Method(m), depth + 1),
            _ => None,
        }
    }

    /// Entry of the framework call table matching `inv`, e.g. `File.OpenRead(..)`.
    pub(crate) fn framework_call(&self, inv: Node<'c>) -> Option<&'static known::KnownCall> {
        let (name_node, receiver) = invoked_member(inv)?;
        let name = self.text(name_node);
        let receiver = strip_parens(receiver?);
        let receiver_name = match self.symbol(receiver) {
            Some(Symbol::Framework(f)) => f,
            Some(Symbol::External) => simple_name(receiver).map(|n| self.text(n))?,
            _ => {
                let ty = self.type_of(receiver)?;
                return known::known_call(ty.name()?, name);
            }
        };
        known::known_call(receiver_name, name)
    }
}

pub(crate) fn is_field_declarator(declarator: Node) -> bool {
    declarator
        .parent()
        .and_then(|d| d.parent())
        .is_some_and(|f| matches!(f.kind(), "field_declaration" | "event_field_declaration"))
}

/// `Item1` -> 0.
pub(crate) fn tuple_slot_index(name: &str) -> Option<usize> {
    let n: usize = name.strip_prefix("Item")?.parse().ok()?;
    n.checked_sub(1)
}

/// Number of arguments when `node` is the target of a call.
fn call_argc(node: Node) -> Option<usize> {
    let mut target = node;
    if let Some(parent) = target.parent()
        && matches!(parent.kind(), "member_access_expression" | "member_binding_expression" | "generic_name")
        && last_named(parent).is_some_and(|n| n.id() == target.id())
    {
        target = parent;
    }
    let parent = target.parent()?;
    if parent.kind() == "invocation_expression"
        && invocation_function(parent).is_some_and(|f| f.id() == target.id())
    {
        return Some(arguments(parent).len());
    }
    None
}

fn accepts_argc(source: &str, method: Node, argc: usize) -> bool {
    let params = parameters(method);
    let required = params
        .iter()
        .filter(|p| {
            initializer_of(**p).is_none() && !slice(source, **p).trim_start().starts_with("params ")
        })
        .count();
    let variadic = params
        .iter()
        .any(|p| slice(source, *p).trim_start().starts_with("params "));
    argc >= required && (variadic || argc <= params.len())
}

/// Receiver of `.Name` inside `receiver?.Name`.
pub(crate) fn binding_receiver(binding: Node) -> Option<Node> {
    let access = ancestors(binding).find(|a| a.kind() == "conditional_access_expression")?;
    first_named(access).filter(|r| !crate::syntax::contains(*r, binding))
}

pub(crate) fn foreach_variable(stmt: Node) -> Option<Node> {
    if let Some(left) = stmt.child_by_field_name("left") {
        return (left.kind() == "identifier").then_some(left);
    }
    let kids = children(stmt);
    let in_pos = kids.iter().position(|c| !c.is_named() && c.kind() == "in")?;
    kids[..in_pos]
        .iter()
        .rev()
        .find(|c| c.is_named())
        .copied()
        .filter(|c| c.kind() == "identifier")
}

fn catch_variable(decl: Node) -> Option<Node> {
    if let Some(name) = decl.child_by_field_name("name") {
        return Some(name);
    }
    let kids = named_children(decl);
    (kids.len() == 2).then(|| kids[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SourceFile;

    fn compile(src: &str) -> Compilation {
        Compilation::parse(&[SourceFile::anonymous(src)]).expect("parse")
    }

    fn find<'t>(root: Node<'t>, source: &str, kind: &str, text: &str) -> Node<'t> {
        let mut found = None;
        walk(root, &mut |n| {
            if found.is_none() && n.kind() == kind && slice(source, n) == text {
                found = Some(n);
            }
            true
        });
        found.unwrap_or_else(|| panic!("no {kind} `{text}`"))
    }

    #[test]
    fn var_local_takes_type_of_known_factory() {
        let src = r#"
using System.IO;
class C
{
    void M()
    {
        var stream = File.OpenRead(string.Empty);
        stream.Dispose();
    }
}
"#;
        let compilation = compile(src);
        let model = SemanticModel::new(&compilation);
        let root = compilation.documents()[0].root();
        let receiver = find(root, src, "identifier", "stream");
        let sym = model.symbol(receiver).expect("resolves");
        assert!(matches!(sym, Symbol::Local(_)));
        assert_eq!(model.declared_type(sym), Some(TypeRef::named("FileStream")));
    }

    #[test]
    fn property_shadows_type_of_same_name() {
        let src = r#"
using System.IO;
class C
{
    private Stream stream;
    public Stream Stream => this.stream;
    void M()
    {
        Stream.Dispose();
    }
}
"#;
        let compilation = compile(src);
        let model = SemanticModel::new(&compilation);
        let root = compilation.documents()[0].root();
        let access = find(root, src, "member_access_expression", "Stream.Dispose");
        let receiver = member_receiver(access).expect("receiver");
        assert!(matches!(model.symbol(receiver), Some(Symbol::Property(_))));
    }

    #[test]
    fn user_types_are_disposable_through_their_bases() {
        let src = r#"
using System;
class Disposable : IDisposable { public void Dispose() { } }
class Derived : Disposable { }
class Plain { }
"#;
        let compilation = compile(src);
        let model = SemanticModel::new(&compilation);
        assert!(model.is_disposable(&TypeRef::named("Derived")));
        assert!(!model.is_disposable(&TypeRef::named("Plain")));
        assert!(!model.is_disposable(&TypeRef::generic("Task", vec![TypeRef::named("int")])));
    }

    #[test]
    fn base_chain_spans_documents() {
        let files = [
            SourceFile::new("A.cs", "class A : System.IDisposable { public void Dispose() { } }"),
            SourceFile::new("B.cs", "class B : A { }"),
        ];
        let compilation = Compilation::parse(&files).expect("parse");
        let model = SemanticModel::new(&compilation);
        let b = model.types_named("B")[0];
        let chain: Vec<&str> = model
            .base_chain(b)
            .into_iter()
            .map(|t| model.type_decl(t).name.as_str())
            .collect();
        assert_eq!(chain, vec!["A"]);
        assert!(model.is_type_disposable(b));
    }
}
