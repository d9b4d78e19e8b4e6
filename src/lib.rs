//! Core dispose-clippy engine and lint registry.
//!
//! The crate parses C# sources with tree-sitter, builds a syntax-driven
//! semantic model over all of them, and runs resource-lifetime rules
//! (`IDisposable` ownership and the dispose pattern) against it.

#![allow(clippy::new_without_default)] // LintRegistry::new() requires explicit construction

pub mod analysis;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fix;
pub mod fixer;
pub mod level;
pub mod lint;
pub mod model;
pub mod parser;
pub mod rules;
pub(crate) mod syntax;
pub mod suppression;
pub mod telemetry;
pub mod visitor;

use anyhow::Result;

use crate::analysis::{Analysis, CancellationToken};
use crate::diagnostics::{Diagnostic, sort_diagnostics};
use crate::error::{ClippyResult, DisposeClippyError};
use crate::lint::{LintContext, LintRegistry, LintSettings};
use crate::model::SemanticModel;
use crate::parser::{Compilation, SourceFile};
use crate::visitor::{ExclusionFilter, walk_document};

#[cfg(feature = "telemetry")]
use tracing::{debug, warn};

/// Engine orchestrates linting by parsing sources and running registered rules.
pub struct LintEngine {
    registry: LintRegistry,
    settings: LintSettings,
    exclusion: ExclusionFilter,
}

impl LintEngine {
    /// Create a new engine with default lint settings.
    pub fn new(registry: LintRegistry) -> Self {
        Self::new_with_settings(registry, LintSettings::default())
    }

    /// Create a new engine with explicit lint settings (e.g. from config).
    pub fn new_with_settings(registry: LintRegistry, settings: LintSettings) -> Self {
        Self {
            registry,
            settings,
            exclusion: ExclusionFilter::default(),
        }
    }

    #[must_use]
    pub fn with_exclusion(mut self, exclusion: ExclusionFilter) -> Self {
        self.exclusion = exclusion;
        self
    }

    pub fn registry(&self) -> &LintRegistry {
        &self.registry
    }

    /// Lint a single in-memory source string and return diagnostics.
    pub fn lint_source(&self, source: &str) -> Result<Vec<Diagnostic>> {
        self.lint_files(&[SourceFile::anonymous(source)])
    }

    /// Lint several files as one compilation.
    pub fn lint_files(&self, files: &[SourceFile]) -> Result<Vec<Diagnostic>> {
        self.lint_files_with_cancellation(files, &CancellationToken::new())
    }

    /// Like [`LintEngine::lint_files`], stopping with
    /// [`DisposeClippyError::Cancelled`] once `token` is cancelled.
    pub fn lint_files_with_cancellation(
        &self,
        files: &[SourceFile],
        token: &CancellationToken,
    ) -> Result<Vec<Diagnostic>> {
        let compilation = instrument_block!("parse", { Compilation::parse(files) })?;
        Ok(self.lint_compilation(&compilation, token)?)
    }

    pub fn lint_compilation(
        &self,
        compilation: &Compilation,
        token: &CancellationToken,
    ) -> ClippyResult<Vec<Diagnostic>> {
        let model = instrument_block!("model", { SemanticModel::new(compilation) });
        let cx = Analysis::new(&model, token);
        let mut diagnostics = Vec::new();

        for doc in compilation.documents() {
            if token.is_cancelled() {
                return Err(DisposeClippyError::Cancelled);
            }
            if self.exclusion.excludes_document(doc) {
                #[cfg(feature = "telemetry")]
                debug!(path = doc.path.as_deref().unwrap_or("<memory>"), "excluded");
                continue;
            }

            #[cfg(feature = "telemetry")]
            {
                if doc.root().has_error() {
                    warn!(
                        path = doc.path.as_deref().unwrap_or("<memory>"),
                        "document has syntax errors; results may be incomplete"
                    );
                }
                debug!(path = doc.path.as_deref().unwrap_or("<memory>"), "linting document");
            }

            let mut ctx = LintContext::new(&doc.source, doc.path.clone(), &self.settings);
            instrument_block!("rules", {
                walk_document(doc, &self.registry, &self.exclusion, &cx, &mut ctx)
            });
            diagnostics.extend(ctx.into_diagnostics());
        }

        if token.is_cancelled() {
            return Err(DisposeClippyError::Cancelled);
        }

        sort_diagnostics(&mut diagnostics);
        Ok(diagnostics)
    }
}

/// Construct a `LintEngine` with all stable built-in lints enabled.
pub fn create_default_engine() -> LintEngine {
    LintEngine::new(stable_registry())
}

fn stable_registry() -> LintRegistry {
    let mut registry = LintRegistry::new();
    for rule in rules::all_rules() {
        if rule.descriptor().group == lint::RuleGroup::Stable {
            registry = registry.with_boxed_rule(rule);
        }
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn engine_is_send_and_sync() {
        assert_send_sync::<LintEngine>();
    }

    #[test]
    fn cancelled_pass_returns_no_partial_results() {
        let engine = create_default_engine();
        let token = CancellationToken::new();
        token.cancel();
        let err = engine
            .lint_files_with_cancellation(&[SourceFile::anonymous("class C {}")], &token)
            .unwrap_err();
        let err = DisposeClippyError::from(err);
        assert!(err.is_cancelled());
    }

    #[test]
    fn excluded_documents_produce_nothing() {
        let src = "using System.IO;\nclass C { void M() { var s = File.OpenRead(\"a\"); } }";
        let engine = create_default_engine();
        assert_eq!(engine.lint_files(&[SourceFile::new("A.cs", src)]).unwrap().len(), 1);

        let filter = ExclusionFilter::new(vec![regex::Regex::new("A\\.cs$").unwrap()], false);
        let engine = create_default_engine().with_exclusion(filter);
        assert!(engine.lint_files(&[SourceFile::new("A.cs", src)]).unwrap().is_empty());
    }
}
