//! Source-level suppression of diagnostics.
//!
//! Two forms are honored, both accepting a rule id or its snake-case name:
//!
//! - `#pragma warning disable IDISP001` / `#pragma warning restore IDISP001`
//!   regions (a bare `disable` covers every rule);
//! - `[SuppressMessage("Category", "IDISP001:Dispose created")]` on an
//!   enclosing type or member.

use crate::lint::LintDescriptor;
use crate::syntax::{attribute_name, is_type_declaration, named_children, slice, walk};
use tree_sitter::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PragmaAction {
    Disable,
    Restore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PragmaDirective {
    offset: usize,
    action: PragmaAction,
    /// Empty means every rule.
    codes: Vec<String>,
}

impl PragmaDirective {
    fn applies_to(&self, lint: &LintDescriptor) -> bool {
        self.codes.is_empty() || self.codes.iter().any(|c| lint.answers_to(c))
    }
}

/// `#pragma warning` directives of one document, in source order.
#[derive(Debug, Clone, Default)]
pub struct PragmaMap {
    directives: Vec<PragmaDirective>,
}

impl PragmaMap {
    pub fn parse(source: &str) -> Self {
        let mut directives = Vec::new();
        let mut offset = 0usize;
        for line in source.split_inclusive('\n') {
            if let Some(directive) = parse_pragma_line(line, offset) {
                directives.push(directive);
            }
            offset += line.len();
        }
        Self { directives }
    }

    /// The last directive before `offset` that names the lint decides.
    pub fn is_disabled(&self, lint: &LintDescriptor, offset: usize) -> bool {
        self.directives
            .iter()
            .take_while(|d| d.offset <= offset)
            .filter(|d| d.applies_to(lint))
            .last()
            .is_some_and(|d| d.action == PragmaAction::Disable)
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}

fn parse_pragma_line(line: &str, offset: usize) -> Option<PragmaDirective> {
    let text = line.trim();
    let rest = text.strip_prefix('#')?.trim_start();
    let rest = rest.strip_prefix("pragma")?.trim_start();
    let rest = rest.strip_prefix("warning")?.trim_start();
    let (action, rest) = if let Some(r) = rest.strip_prefix("disable") {
        (PragmaAction::Disable, r)
    } else if let Some(r) = rest.strip_prefix("restore") {
        (PragmaAction::Restore, r)
    } else {
        return None;
    };
    let rest = rest.split("//").next().unwrap_or("");
    let codes = rest
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    Some(PragmaDirective {
        offset,
        action,
        codes,
    })
}

/// Whether a type or member enclosing `node` carries a `[SuppressMessage]`
/// naming the lint.
pub fn suppressed_by_attribute(source: &str, node: Node, lint: &LintDescriptor) -> bool {
    let mut cur = Some(node);
    while let Some(n) = cur {
        if (is_type_declaration(n) || is_member_declaration(n)) && suppresses(source, n, lint) {
            return true;
        }
        cur = n.parent();
    }
    false
}

fn is_member_declaration(node: Node) -> bool {
    matches!(
        node.kind(),
        "method_declaration"
            | "constructor_declaration"
            | "destructor_declaration"
            | "property_declaration"
            | "field_declaration"
            | "event_field_declaration"
            | "indexer_declaration"
            | "local_function_statement"
    )
}

fn suppresses(source: &str, decl: Node, lint: &LintDescriptor) -> bool {
    for list in named_children(decl).into_iter().filter(|c| c.kind() == "attribute_list") {
        for attr in named_children(list).into_iter().filter(|c| c.kind() == "attribute") {
            if attribute_name(source, attr).as_deref() != Some("SuppressMessage") {
                continue;
            }
            let mut found = false;
            walk(attr, &mut |n| {
                if found {
                    return false;
                }
                if matches!(n.kind(), "string_literal" | "verbatim_string_literal") {
                    found = string_names_lint(slice(source, n), lint);
                    return false;
                }
                true
            });
            if found {
                return true;
            }
        }
    }
    false
}

/// `"IDISP001:Dispose created"`, `"IDISP001"` or `"dispose_created"`.
fn string_names_lint(literal: &str, lint: &LintDescriptor) -> bool {
    let content = literal.trim_start_matches('@').trim_matches('"');
    let code = content.split(':').next().unwrap_or("").trim();
    !code.is_empty() && lint.answers_to(code)
}
