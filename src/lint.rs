use crate::analysis::Analysis;
use crate::diagnostics::{Diagnostic, Span, Suggestion};
use crate::level::LintLevel;
use crate::suppression::{self, PragmaMap};
use anyhow::{Result, anyhow};
use std::collections::{HashMap, HashSet};
use tree_sitter::Node;

// ============================================================================
// Rule Groups (Preview vs Stable)
// ============================================================================

/// Classification of lint rules by stability level.
///
/// New rules start in `Preview` and graduate to `Stable` once their false
/// positive rate on real code bases is near zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub enum RuleGroup {
    /// Enabled by default.
    #[default]
    Stable,

    /// Requires `--preview` or `preview = true` in config.
    Preview,
}

impl RuleGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleGroup::Stable => "stable",
            RuleGroup::Preview => "preview",
        }
    }

    pub fn required_flag(&self) -> Option<&'static str> {
        match self {
            RuleGroup::Stable => None,
            RuleGroup::Preview => Some("--preview"),
        }
    }
}

// ============================================================================
// Fix Safety Classification
// ============================================================================

/// Safe fixes are applied by `--fix`; unsafe ones also need `--unsafe-fixes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FixSafety {
    #[default]
    Safe,
    Unsafe,
}

impl FixSafety {
    pub fn as_str(&self) -> &'static str {
        match self {
            FixSafety::Safe => "safe",
            FixSafety::Unsafe => "unsafe",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixDescriptor {
    pub available: bool,
    pub safety: FixSafety,
    pub description: &'static str,
}

impl FixDescriptor {
    pub const fn safe(description: &'static str) -> Self {
        Self {
            available: true,
            safety: FixSafety::Safe,
            description,
        }
    }

    pub const fn unsafe_fix(description: &'static str) -> Self {
        Self {
            available: true,
            safety: FixSafety::Unsafe,
            description,
        }
    }

    pub const fn none() -> Self {
        Self {
            available: false,
            safety: FixSafety::Safe,
            description: "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LintCategory {
    /// A resource is leaked or released by the wrong owner.
    Correctness,
    /// The dispose pattern itself is implemented incorrectly.
    Protocol,
    /// Likely a leak, with a higher false positive rate.
    Suspicious,
}

impl LintCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LintCategory::Correctness => "correctness",
            LintCategory::Protocol => "protocol",
            LintCategory::Suspicious => "suspicious",
        }
    }
}

#[derive(Debug)]
pub struct LintDescriptor {
    /// Stable identifier, e.g. `IDISP001`.
    pub id: &'static str,
    /// Snake-case name accepted wherever the id is.
    pub name: &'static str,
    pub category: LintCategory,
    pub description: &'static str,
    pub group: RuleGroup,
    pub fix: FixDescriptor,
    pub default_level: LintLevel,
}

impl LintDescriptor {
    pub const fn stable(
        id: &'static str,
        name: &'static str,
        category: LintCategory,
        description: &'static str,
    ) -> Self {
        Self {
            id,
            name,
            category,
            description,
            group: RuleGroup::Stable,
            fix: FixDescriptor::none(),
            default_level: LintLevel::Warn,
        }
    }

    pub const fn preview(
        id: &'static str,
        name: &'static str,
        category: LintCategory,
        description: &'static str,
    ) -> Self {
        Self {
            group: RuleGroup::Preview,
            ..Self::stable(id, name, category, description)
        }
    }

    pub const fn with_fix(self, fix: FixDescriptor) -> Self {
        Self { fix, ..self }
    }

    pub const fn with_level(self, default_level: LintLevel) -> Self {
        Self {
            default_level,
            ..self
        }
    }

    /// Whether `name` refers to this lint by id (case-insensitive) or name.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.id.eq_ignore_ascii_case(name)
    }
}

/// A rule subscribes to node kinds and is called once per matching node.
pub trait LintRule: Send + Sync {
    fn descriptor(&self) -> &'static LintDescriptor;

    /// Tree-sitter node kinds this rule wants to see.
    fn node_kinds(&self) -> &'static [&'static str];

    fn check<'c>(&self, node: Node<'c>, cx: &Analysis<'_, 'c>, ctx: &mut LintContext<'_>);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintSettings {
    levels: HashMap<String, LintLevel>,
}

impl LintSettings {
    /// Per-lint levels keyed by id or name.
    #[must_use]
    pub fn with_config_levels(mut self, levels: HashMap<String, LintLevel>) -> Self {
        for (name, level) in levels {
            let canonical = resolve_lint_alias(&name);
            self.levels.insert(canonical.to_string(), level);
        }
        self
    }

    #[must_use]
    pub fn disable(mut self, disabled: impl IntoIterator<Item = String>) -> Self {
        for name in disabled {
            let canonical = resolve_lint_alias(&name);
            self.levels.insert(canonical.to_string(), LintLevel::Allow);
        }
        self
    }

    pub fn level_for(&self, lint: &LintDescriptor) -> LintLevel {
        self.levels
            .get(lint.name)
            .copied()
            .unwrap_or(lint.default_level)
    }
}

/// Per-document reporting sink: applies levels, suppressions and
/// de-duplication before a diagnostic is kept.
pub struct LintContext<'src> {
    source: &'src str,
    file: Option<String>,
    settings: &'src LintSettings,
    pragmas: PragmaMap,
    diagnostics: Vec<Diagnostic>,
    reported: HashSet<(&'static str, usize, usize)>,
}

impl<'src> LintContext<'src> {
    pub fn new(source: &'src str, file: Option<String>, settings: &'src LintSettings) -> Self {
        Self {
            source,
            file,
            settings,
            pragmas: PragmaMap::parse(source),
            diagnostics: Vec::new(),
            reported: HashSet::new(),
        }
    }

    fn effective_level(&self, lint: &'static LintDescriptor, node: Node) -> LintLevel {
        let level = self.settings.level_for(lint);
        if !level.is_enabled()
            || self.pragmas.is_disabled(lint, node.start_byte())
            || suppression::suppressed_by_attribute(self.source, node, lint)
        {
            return LintLevel::Allow;
        }
        level
    }

    pub fn report_node(&mut self, lint: &'static LintDescriptor, node: Node, message: impl Into<String>) {
        self.report_diagnostic_for_node(node, lint, message, None, None);
    }

    pub fn report_diagnostic_for_node(
        &mut self,
        node: Node,
        lint: &'static LintDescriptor,
        message: impl Into<String>,
        help: Option<String>,
        suggestion: Option<Suggestion>,
    ) {
        let level = self.effective_level(lint, node);
        if level == LintLevel::Allow {
            return;
        }
        if !self.reported.insert((lint.id, node.start_byte(), node.end_byte())) {
            return;
        }

        self.diagnostics.push(Diagnostic {
            lint,
            level,
            file: self.file.clone(),
            span: Span::from_range(node.range()),
            message: message.into(),
            help,
            suggestion,
        });
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    pub fn settings(&self) -> &LintSettings {
        self.settings
    }

    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// Canonical (snake-case) name for an id or name; unknown names are returned unchanged.
pub fn resolve_lint_alias(name: &str) -> &str {
    find_descriptor(name).map_or(name, |d| d.name)
}

pub fn find_descriptor(name: &str) -> Option<&'static LintDescriptor> {
    crate::rules::all_descriptors()
        .iter()
        .copied()
        .find(|d| d.answers_to(name))
}

pub fn is_known_lint(name: &str) -> bool {
    find_descriptor(name).is_some()
}

pub struct LintRegistry {
    rules: Vec<Box<dyn LintRule>>,
    by_kind: HashMap<&'static str, Vec<usize>>,
}

impl Default for LintRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LintRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            by_kind: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_rule(mut self, rule: impl LintRule + 'static) -> Self {
        self.push(Box::new(rule));
        self
    }

    #[must_use]
    pub fn with_boxed_rule(mut self, rule: Box<dyn LintRule>) -> Self {
        self.push(rule);
        self
    }

    fn push(&mut self, rule: Box<dyn LintRule>) {
        let index = self.rules.len();
        for kind in rule.node_kinds() {
            self.by_kind.entry(kind).or_default().push(index);
        }
        self.rules.push(rule);
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn LintRule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Rules subscribed to `kind`, in registration order.
    pub fn subscribers(&self, kind: &str) -> impl Iterator<Item = &dyn LintRule> {
        self.by_kind
            .get(kind)
            .into_iter()
            .flatten()
            .map(|&i| self.rules[i].as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &'static LintDescriptor> + '_ {
        self.rules.iter().map(|r| r.descriptor())
    }

    pub fn find_descriptor(&self, name: &str) -> Option<&'static LintDescriptor> {
        self.descriptors().find(|d| d.answers_to(name))
    }

    /// Every built-in rule, preview ones included.
    #[must_use = "registry should be used to create an engine"]
    pub fn default_rules() -> Self {
        let mut reg = Self::new();
        for rule in crate::rules::all_rules() {
            reg.push(rule);
        }
        reg
    }

    pub fn default_rules_filtered(
        only: &[String],
        skip: &[String],
        disabled: &[String],
        preview: bool,
    ) -> Result<Self> {
        for n in only.iter().chain(skip.iter()).chain(disabled.iter()) {
            if !is_known_lint(n) {
                return Err(anyhow!("unknown lint: {n}"));
            }
        }

        let only_set: Option<HashSet<&str>> = if only.is_empty() {
            None
        } else {
            Some(only.iter().map(|s| resolve_lint_alias(s)).collect())
        };
        let skip_set: HashSet<&str> = skip
            .iter()
            .chain(disabled.iter())
            .map(|s| resolve_lint_alias(s))
            .collect();

        let mut reg = Self::new();
        for rule in crate::rules::all_rules() {
            let descriptor = rule.descriptor();
            let name = descriptor.name;

            if let Some(ref only) = only_set {
                // naming a preview rule in --only opts into it
                if !only.contains(name) {
                    continue;
                }
            } else if descriptor.group == RuleGroup::Preview && !preview {
                continue;
            }
            if skip_set.contains(name) {
                continue;
            }

            reg.push(rule);
        }

        Ok(reg)
    }
}
