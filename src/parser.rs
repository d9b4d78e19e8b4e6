//! Parsing C# sources into a [`Compilation`] of syntax trees.

use crate::error::{ClippyResult, DisposeClippyError};
use std::cell::RefCell;
use tree_sitter::{Language, Node, Parser, Tree};

fn csharp_language() -> Language {
    tree_sitter_c_sharp::language()
}

thread_local! {
    /// Ready-to-use parsers for this thread. A parser is taken out for one
    /// parse and handed back when the guard drops.
    static PARSER_CACHE: RefCell<Vec<Parser>> = const { RefCell::new(Vec::new()) };
}

/// More than one parser per thread is only needed for nested parses.
const MAX_CACHED_PARSERS: usize = 4;

/// RAII guard around a cached parser.
struct CachedParser {
    parser: Option<Parser>,
}

impl CachedParser {
    fn take() -> ClippyResult<Self> {
        let cached = PARSER_CACHE.with(|cache| cache.borrow_mut().pop());
        let parser = match cached {
            Some(mut p) => {
                p.reset();
                p
            }
            None => {
                let mut p = Parser::new();
                p.set_language(csharp_language())
                    .map_err(|e| DisposeClippyError::parse(format!("failed to load C# grammar: {e}")))?;
                p
            }
        };
        Ok(Self {
            parser: Some(parser),
        })
    }

    fn parse(&mut self, source: &str) -> Option<Tree> {
        self.parser.as_mut()?.parse(source, None)
    }
}

impl Drop for CachedParser {
    fn drop(&mut self) {
        if let Some(parser) = self.parser.take() {
            PARSER_CACHE.with(|cache| {
                let mut cache = cache.borrow_mut();
                if cache.len() < MAX_CACHED_PARSERS {
                    cache.push(parser);
                }
            });
        }
    }
}

/// Parse a single C# source text.
pub fn parse_source(source: &str) -> ClippyResult<Tree> {
    let mut parser = CachedParser::take()?;
    parser
        .parse(source)
        .ok_or_else(|| DisposeClippyError::parse("tree-sitter failed to parse source"))
}

/// Input to the engine: a path (for reporting and exclusion) and its text.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: Option<String>,
    pub text: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            text: text.into(),
        }
    }

    pub fn anonymous(text: impl Into<String>) -> Self {
        Self {
            path: None,
            text: text.into(),
        }
    }
}

/// A parsed source file.
pub struct Document {
    pub path: Option<String>,
    pub source: String,
    pub tree: Tree,
}

impl Document {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Whether the file is tool output (`*.g.cs`, designer files, `<auto-generated>` header).
    pub fn is_generated(&self) -> bool {
        if let Some(path) = &self.path {
            let lower = path.to_ascii_lowercase();
            if [".g.cs", ".g.i.cs", ".designer.cs", ".generated.cs", ".assemblyattributes.cs"]
                .iter()
                .any(|suffix| lower.ends_with(suffix))
            {
                return true;
            }
        }

        self.source
            .lines()
            .take_while(|l| {
                let t = l.trim_start();
                t.is_empty() || t.starts_with("//") || t.starts_with("/*") || t.starts_with('*')
            })
            .any(|l| l.contains("<auto-generated"))
    }
}

/// Every document analyzed together in one pass. Symbols declared in one
/// document (base types, overrides, factories) are visible from the others.
pub struct Compilation {
    documents: Vec<Document>,
}

impl Compilation {
    pub fn parse(files: &[SourceFile]) -> ClippyResult<Self> {
        let mut documents = Vec::with_capacity(files.len());
        for file in files {
            let tree = parse_source(&file.text).map_err(|e| match &file.path {
                Some(p) => DisposeClippyError::parse(format!("{p}: {e}")),
                None => e,
            })?;
            documents.push(Document {
                path: file.path.clone(),
                source: file.text.clone(),
                tree,
            });
        }
        Ok(Self { documents })
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }
}
