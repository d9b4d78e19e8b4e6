//! Who owns the value an expression produces.

use super::flow::executed_before;
use super::mutation::{mutations, Scope};
use super::pool::Visited;
use super::Analysis;
use crate::model::{known, tuple_slot_index, Symbol};
use crate::syntax::{
    argument_expression, arguments, binary_operator, first_named, in_nested_lambda, invoked_member,
    is_auto_property, last_named, member_receiver, named_children, region_of, returned_expressions,
    strip_parens, accessors,
};
use tree_sitter::Node;

#[cfg(feature = "telemetry")]
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// Fresh value the current scope must release.
    Created,
    /// Handed in from outside; someone else releases it.
    Injected,
    /// Stored somewhere shared and possibly handed out again.
    Cached,
    /// An alias of a value owned elsewhere.
    Borrowed,
}

impl Ownership {
    /// All Created stays Created; otherwise the weakest claim wins.
    pub fn combine(values: impl IntoIterator<Item = Ownership>) -> Option<Ownership> {
        let mut seen = [false; 4];
        let mut any = false;
        for v in values {
            any = true;
            seen[v as usize] = true;
        }
        if !any {
            return None;
        }
        let [created, injected, cached, borrowed] = seen;
        Some(if cached {
            Ownership::Cached
        } else if injected {
            Ownership::Injected
        } else if borrowed {
            Ownership::Borrowed
        } else {
            debug_assert!(created);
            Ownership::Created
        })
    }
}

/// Classify the value `expr` produces. `None` when inconclusive.
pub fn classify<'c>(cx: &Analysis<'_, 'c>, expr: Node<'c>) -> Option<Ownership> {
    let mut classifier = Classifier {
        cx,
        visited: Visited::acquire(),
    };
    classifier.expr(expr, expr)
}

/// Classification of whatever a method's returns produce, for call sites.
pub fn classify_returns<'c>(cx: &Analysis<'_, 'c>, method: Node<'c>) -> Option<Ownership> {
    let mut classifier = Classifier {
        cx,
        visited: Visited::acquire(),
    };
    classifier.method_returns(method)
}

struct Classifier<'x, 'a, 'c> {
    cx: &'x Analysis<'a, 'c>,
    visited: Visited,
}

impl<'c> Classifier<'_, '_, 'c> {
    /// `at` is the point of use; local reads only see writes that may run before it.
    fn expr(&mut self, expr: Node<'c>, at: Node<'c>) -> Option<Ownership> {
        if self.cx.is_cancelled() {
            return None;
        }
        let expr = strip_parens(expr);
        let source = self.cx.source_of(expr);
        match expr.kind() {
            "object_creation_expression" | "implicit_object_creation_expression" => Some(Ownership::Created),
            "cast_expression" => self.conversion(last_named(expr)?, at),
            "as_expression" => self.conversion(first_named(expr)?, at),
            "binary_expression" => match binary_operator(source, expr)? {
                "as" => self.conversion(first_named(expr)?, at),
                "??" => {
                    let left = self.expr(first_named(expr)?, at);
                    let right = self.expr(last_named(expr)?, at);
                    Ownership::combine(left.into_iter().chain(right))
                }
                _ => None,
            },
            "postfix_unary_expression" => self.expr(first_named(expr)?, at),
            "conditional_expression" => {
                let branches: Vec<Node<'c>> = named_children(expr).into_iter().skip(1).collect();
                self.all_of(&branches, at)
            }
            "switch_expression" => {
                let arms: Vec<Node<'c>> = named_children(expr)
                    .into_iter()
                    .filter(|c| c.kind() == "switch_expression_arm")
                    .filter_map(last_named)
                    .collect();
                self.all_of(&arms, at)
            }
            "await_expression" => self.expr(first_named(expr)?, at),
            "assignment_expression" => self.expr(last_named(expr)?, at),
            "element_access_expression" => Some(Ownership::Injected),
            "tuple_expression" => {
                let elements: Vec<Node<'c>> =
                    named_children(expr).into_iter().filter_map(argument_expression).collect();
                self.all_of(&elements, at)
            }
            "invocation_expression" => self.invocation(expr, at),
            "member_access_expression" => {
                let name = self.cx.text(crate::syntax::member_name(expr)?);
                if tuple_slot_index(name).is_some() || name == "Value" {
                    // wrapper unwrapping keeps the wrapper's classification
                    if let Some(inner) = self.expr(member_receiver(expr)?, at) {
                        return Some(inner);
                    }
                }
                self.symbol_read(expr, at)
            }
            "identifier" | "generic_name" | "member_binding_expression" | "conditional_access_expression" => {
                self.symbol_read(expr, at)
            }
            "this_expression" | "base_expression" => Some(Ownership::Injected),
            _ => None,
        }
    }

    /// Casts alias their operand unless it is fresh.
    fn conversion(&mut self, inner: Node<'c>, at: Node<'c>) -> Option<Ownership> {
        match self.expr(inner, at)? {
            Ownership::Created => Some(Ownership::Created),
            Ownership::Cached => Some(Ownership::Cached),
            _ => Some(Ownership::Borrowed),
        }
    }

    /// Created only when every conclusive part is Created.
    fn all_of(&mut self, parts: &[Node<'c>], at: Node<'c>) -> Option<Ownership> {
        let classified: Vec<Ownership> = parts.iter().filter_map(|p| self.expr(*p, at)).collect();
        Ownership::combine(classified)
    }

    fn invocation(&mut self, inv: Node<'c>, at: Node<'c>) -> Option<Ownership> {
        let (name_node, receiver) = invoked_member(inv)?;
        let name = self.cx.text(name_node);

        if let Some(receiver) = receiver {
            if name == "ConfigureAwait" {
                return self.expr(receiver, at);
            }
            if known::is_element_projection(name) {
                return Some(Ownership::Borrowed);
            }
            let receiver_text = self.cx.text(strip_parens(receiver));
            if name == "Create" && matches!(receiver_text, "Tuple" | "ValueTuple") {
                let args: Vec<Node<'c>> = arguments(inv).into_iter().filter_map(argument_expression).collect();
                return self.all_of(&args, at);
            }
            if let Some(call) = self.cx.model.framework_call(inv) {
                return Some(if call.creates {
                    Ownership::Created
                } else {
                    Ownership::Injected
                });
            }
        }

        match self.cx.model.symbol(inv) {
            Some(Symbol::Method(method)) => self.method_returns(method),
            _ => Some(Ownership::Injected),
        }
    }

    /// Factory check over a compilation method. Re-entering a method on the
    /// current path is inconclusive.
    fn method_returns(&mut self, method: Node<'c>) -> Option<Ownership> {
        let key = Symbol::Method(method).key();
        if !self.visited.insert(key) {
            #[cfg(feature = "telemetry")]
            trace!(method = self.cx.model.name_of(method).unwrap_or("?"), "recursive factory, inconclusive");
            return None;
        }
        let returns = returned_expressions(method);
        let result = if returns.is_empty() {
            Some(Ownership::Injected)
        } else {
            let mut classified = Vec::with_capacity(returns.len());
            for ret in returns {
                if self.returns_member(ret) {
                    classified.push(Ownership::Cached);
                } else if let Some(o) = self.expr(ret, ret) {
                    classified.push(o);
                }
            }
            Ownership::combine(classified)
        };
        self.visited.remove(key);
        result
    }

    /// `return this.field;`: the value outlives the call.
    fn returns_member(&self, ret: Node<'c>) -> bool {
        let ret = strip_parens(ret);
        if !matches!(ret.kind(), "identifier" | "member_access_expression") {
            return false;
        }
        matches!(self.cx.model.symbol(ret), Some(sym) if sym.is_member())
    }

    fn symbol_read(&mut self, expr: Node<'c>, at: Node<'c>) -> Option<Ownership> {
        let sym = self.cx.model.symbol(expr)?;
        match sym {
            Symbol::Parameter(_) | Symbol::SetterValue(_) => Some(Ownership::Injected),
            Symbol::Field(_) => Some(if self.cx.model.is_static(sym) {
                Ownership::Cached
            } else {
                Ownership::Injected
            }),
            Symbol::Property(p) => {
                if self.cx.model.is_static(sym) {
                    return Some(Ownership::Cached);
                }
                if is_auto_property(p) || (accessors(p).is_empty() && crate::syntax::arrow_body(p).is_none()) {
                    return Some(Ownership::Injected);
                }
                // computed getter: `=> new X()` creates, `=> this.x` caches
                match self.method_returns(getter(p).unwrap_or(p))? {
                    Ownership::Created => Some(Ownership::Created),
                    Ownership::Cached => Some(Ownership::Cached),
                    _ => Some(Ownership::Injected),
                }
            }
            Symbol::Local(decl) => self.local(sym, decl, at),
            Symbol::Method(_) | Symbol::Type(_) | Symbol::Framework(_) | Symbol::External => {
                Some(Ownership::Injected)
            }
        }
    }

    fn local(&mut self, sym: Symbol<'c>, decl: Node<'c>, at: Node<'c>) -> Option<Ownership> {
        if decl.kind() == "identifier" {
            // foreach and catch variables
            return Some(Ownership::Injected);
        }
        let region = region_of(decl)?;
        if in_nested_lambda(at, region) {
            return Some(Ownership::Injected);
        }
        let key = sym.key();
        if !self.visited.insert(key) {
            return None;
        }
        let writes = mutations(self.cx, sym, Scope::Node(region));
        let mut classified = Vec::new();
        for write in writes {
            if !executed_before(write.node, at).is_possible() {
                continue;
            }
            match write.value {
                Some(value) => {
                    if let Some(o) = self.expr(value, write.node) {
                        classified.push(o);
                    }
                }
                None => classified.push(Ownership::Injected),
            }
        }
        self.visited.remove(key);
        Ownership::combine(classified)
    }
}

/// `get` accessor of a property, or the property itself for `=> expr`.
pub(crate) fn getter(property: Node) -> Option<Node> {
    accessors(property)
        .into_iter()
        .find(|a| crate::syntax::children(*a).iter().any(|c| c.kind() == "get"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::{compile, find};
    use crate::analysis::CancellationToken;
    use crate::model::SemanticModel;

    fn classify_in(src: &str, kind: &str, text: &str) -> Option<Ownership> {
        let compilation = compile(src);
        let model = SemanticModel::new(&compilation);
        let token = CancellationToken::new();
        let cx = Analysis::new(&model, &token);
        let root = compilation.documents()[0].root();
        classify(&cx, find(root, src, kind, text))
    }

    #[test]
    fn combine_prefers_the_weakest_claim() {
        use Ownership::*;
        assert_eq!(Ownership::combine([Created, Created]), Some(Created));
        assert_eq!(Ownership::combine([Created, Injected]), Some(Injected));
        assert_eq!(Ownership::combine([Injected, Cached]), Some(Cached));
        assert_eq!(Ownership::combine([Created, Borrowed]), Some(Borrowed));
        assert_eq!(Ownership::combine([]), None);
    }

    #[test]
    fn creation_and_known_factories_are_created() {
        let src = r#"
using System.IO;
class C
{
    void M(string p)
    {
        var a = new MemoryStream();
        var b = File.OpenRead(p);
        var c = File.ReadAllText(p);
    }
}
"#;
        assert_eq!(classify_in(src, "object_creation_expression", "new MemoryStream()"), Some(Ownership::Created));
        assert_eq!(classify_in(src, "invocation_expression", "File.OpenRead(p)"), Some(Ownership::Created));
        assert_eq!(classify_in(src, "invocation_expression", "File.ReadAllText(p)"), Some(Ownership::Injected));
    }

    #[test]
    fn parameters_locals_and_statics() {
        let src = r#"
using System.IO;
class C
{
    private static Stream shared;
    void M(Stream injected, bool flag)
    {
        var local = flag ? new MemoryStream() : injected;
        Use(local);
        Use(shared);
        Use(injected as MemoryStream);
    }
    void Use(Stream s) { }
}
"#;
        assert_eq!(classify_in(src, "identifier", "local"), Some(Ownership::Injected));
        assert_eq!(classify_in(src, "identifier", "shared"), Some(Ownership::Cached));
        assert_eq!(classify_in(src, "as_expression", "injected as MemoryStream"), Some(Ownership::Borrowed));
    }

    #[test]
    fn factory_methods_are_followed_and_cycles_are_inconclusive() {
        let src = r#"
using System.IO;
class C
{
    private Stream cached;
    Stream Create() => new MemoryStream();
    Stream Get() { return this.cached; }
    Stream Loop() => Loop();
    void M()
    {
        Create();
        Get();
        Loop();
    }
}
"#;
        assert_eq!(classify_in(src, "invocation_expression", "Create()"), Some(Ownership::Created));
        assert_eq!(classify_in(src, "invocation_expression", "Get()"), Some(Ownership::Cached));
        assert_eq!(classify_in(src, "invocation_expression", "Loop()"), None);
    }
}
