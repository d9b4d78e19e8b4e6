//! Resource-ownership analysis.
//!
//! The queries here are what the rules compose: execution order
//! ([`flow`]), writes to a symbol ([`mutation`]), who owns a value
//! ([`ownership`], [`injected`]) and whether a type releases its members
//! ([`members`], [`protocol`], [`fixture`]). Every query is conservative:
//! when it cannot prove its answer it returns the one that suppresses a
//! diagnostic.

pub mod fixture;
pub mod flow;
pub mod injected;
pub mod members;
pub mod mutation;
pub mod ownership;
mod pool;
pub mod protocol;

pub use flow::{executed_before, Execution};
pub use ownership::Ownership;

use crate::model::SemanticModel;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tree_sitter::Node;

/// Cooperative cancellation for a whole analysis pass.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Read-only context handed to every rule invocation.
#[derive(Clone, Copy)]
pub struct Analysis<'a, 'c> {
    pub model: &'a SemanticModel<'c>,
    cancel: &'a CancellationToken,
}

impl<'a, 'c> Analysis<'a, 'c> {
    pub fn new(model: &'a SemanticModel<'c>, cancel: &'a CancellationToken) -> Self {
        Self { model, cancel }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn text(&self, node: Node<'c>) -> &'c str {
        self.model.text(node)
    }

    pub fn source_of(&self, node: Node<'c>) -> &'c str {
        self.model.source_of(node)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::parser::{Compilation, SourceFile};
    use crate::syntax::{slice, walk};
    use tree_sitter::Node;

    pub(crate) fn compile(src: &str) -> Compilation {
        Compilation::parse(&[SourceFile::anonymous(src)]).expect("parse")
    }

    /// First node of `kind` whose text is exactly `text`.
    pub(crate) fn find<'t>(root: Node<'t>, source: &str, kind: &str, text: &str) -> Node<'t> {
        find_nth(root, source, kind, text, 0)
    }

    pub(crate) fn find_nth<'t>(root: Node<'t>, source: &str, kind: &str, text: &str, nth: usize) -> Node<'t> {
        let mut matches = Vec::new();
        walk(root, &mut |n| {
            if n.kind() == kind && slice(source, n) == text {
                matches.push(n);
            }
            true
        });
        matches
            .get(nth)
            .copied()
            .unwrap_or_else(|| panic!("no {kind} #{nth} `{text}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
