use crate::analysis::Analysis;
use crate::lint::{LintContext, LintRegistry};
use crate::model::known::GENERATED_CODE_ATTRIBUTES;
use crate::parser::Document;
use crate::syntax::{attribute_names, is_type_declaration};
use regex::Regex;
use tree_sitter::Node;

/// Decides which documents and declarations are never analyzed.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    patterns: Vec<Regex>,
    analyze_generated: bool,
}

impl ExclusionFilter {
    pub fn new(patterns: Vec<Regex>, analyze_generated: bool) -> Self {
        Self {
            patterns,
            analyze_generated,
        }
    }

    pub fn excludes_path(&self, path: &str) -> bool {
        let normalized = path.replace('\\', "/");
        self.patterns.iter().any(|p| p.is_match(&normalized))
    }

    pub fn excludes_document(&self, doc: &Document) -> bool {
        if doc.path.as_deref().is_some_and(|p| self.excludes_path(p)) {
            return true;
        }
        !self.analyze_generated && doc.is_generated()
    }

    /// `[GeneratedCode]` / `[CompilerGenerated]` on a type or member hides
    /// the whole declaration.
    pub fn excludes_declaration(&self, source: &str, node: Node) -> bool {
        if self.analyze_generated || !(is_type_declaration(node) || is_annotated_member(node)) {
            return false;
        }
        attribute_names(source, node)
            .iter()
            .any(|a| GENERATED_CODE_ATTRIBUTES.contains(&a.as_str()))
    }
}

fn is_annotated_member(node: Node) -> bool {
    matches!(
        node.kind(),
        "method_declaration"
            | "constructor_declaration"
            | "property_declaration"
            | "field_declaration"
            | "indexer_declaration"
    )
}

/// Walk one document and hand every node to the rules subscribed to its kind.
pub fn walk_document<'c>(
    doc: &'c Document,
    registry: &LintRegistry,
    exclusion: &ExclusionFilter,
    cx: &Analysis<'_, 'c>,
    ctx: &mut LintContext<'_>,
) {
    walk_node(doc.root(), &doc.source, registry, exclusion, cx, ctx);
}

fn walk_node<'c>(
    node: Node<'c>,
    source: &str,
    registry: &LintRegistry,
    exclusion: &ExclusionFilter,
    cx: &Analysis<'_, 'c>,
    ctx: &mut LintContext<'_>,
) {
    if cx.is_cancelled() || exclusion.excludes_declaration(source, node) {
        return;
    }

    for rule in registry.subscribers(node.kind()) {
        rule.check(node, cx, ctx);
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_node(child, source, registry, exclusion, cx, ctx);
    }
}
