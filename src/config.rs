use crate::level::LintLevel;
use crate::lint::{LintSettings, is_known_lint};
use crate::visitor::ExclusionFilter;
use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisposeClippyConfig {
    #[serde(default)]
    pub lints: LintsConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct LintsConfig {
    #[serde(default)]
    pub preview: bool,

    #[serde(default)]
    pub disabled: Vec<String>,

    /// `dispose_member = "error"` or `IDISP007 = "allow"`.
    #[serde(flatten)]
    pub levels: HashMap<String, LintLevel>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Path regexes; matching documents are not analyzed.
    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub analyze_generated: bool,
}

impl DisposeClippyConfig {
    /// Reject lint names that no rule answers to.
    pub fn validate(&self) -> Result<()> {
        for name in self.lints.disabled.iter().chain(self.lints.levels.keys()) {
            if !is_known_lint(name) {
                bail!("unknown lint in config: {name}");
            }
        }
        Ok(())
    }

    pub fn settings(&self) -> LintSettings {
        LintSettings::default()
            .with_config_levels(self.lints.levels.clone())
            .disable(self.lints.disabled.clone())
    }

    pub fn exclusion(&self) -> Result<ExclusionFilter> {
        let patterns = self
            .analysis
            .exclude
            .iter()
            .map(|p| Regex::new(p).with_context(|| format!("invalid exclude pattern: {p}")))
            .collect::<Result<Vec<_>>>()?;
        Ok(ExclusionFilter::new(patterns, self.analysis.analyze_generated))
    }
}

pub const DEFAULT_CONFIG_FILE_NAME: &str = "dispose-clippy.toml";

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut cur = Some(start_dir);
    while let Some(dir) = cur {
        let candidate = dir.join(DEFAULT_CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        cur = dir.parent();
    }
    None
}

pub fn load_config_file(path: &Path) -> Result<DisposeClippyConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let cfg: DisposeClippyConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config file: {}", path.display()))?;
    Ok(cfg)
}

pub fn load_config(
    explicit_path: Option<&Path>,
    start_dir: &Path,
) -> Result<Option<(PathBuf, DisposeClippyConfig)>> {
    if let Some(p) = explicit_path {
        let cfg = load_config_file(p)?;
        return Ok(Some((p.to_path_buf(), cfg)));
    }

    let Some(p) = find_config_file(start_dir) else {
        return Ok(None);
    };
    let cfg = load_config_file(&p)?;
    Ok(Some((p, cfg)))
}
