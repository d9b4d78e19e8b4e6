use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity attached to a rule, ordered from quietest to loudest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LintLevel {
    Allow,
    #[serde(alias = "warning")]
    Warn,
    #[serde(alias = "deny")]
    Error,
}

impl LintLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LintLevel::Allow => "allow",
            LintLevel::Warn => "warning",
            LintLevel::Error => "error",
        }
    }

    pub fn is_enabled(&self) -> bool {
        *self != LintLevel::Allow
    }

    /// `--deny-warnings` turns every enabled finding into an error.
    #[must_use]
    pub fn promoted(self, deny_warnings: bool) -> Self {
        match self {
            LintLevel::Warn if deny_warnings => LintLevel::Error,
            other => other,
        }
    }
}

impl Default for LintLevel {
    fn default() -> Self {
        Self::Warn
    }
}

impl fmt::Display for LintLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_parse_from_config_spellings() {
        #[derive(Deserialize)]
        struct Wrapper {
            level: LintLevel,
        }

        for (raw, expected) in [
            ("allow", LintLevel::Allow),
            ("warn", LintLevel::Warn),
            ("warning", LintLevel::Warn),
            ("error", LintLevel::Error),
            ("deny", LintLevel::Error),
        ] {
            let w: Wrapper = toml::from_str(&format!("level = \"{raw}\"")).expect("level parses");
            assert_eq!(w.level, expected, "{raw}");
        }
    }

    #[test]
    fn deny_warnings_only_promotes_warnings() {
        assert_eq!(LintLevel::Warn.promoted(true), LintLevel::Error);
        assert_eq!(LintLevel::Allow.promoted(true), LintLevel::Allow);
        assert_eq!(LintLevel::Warn.promoted(false), LintLevel::Warn);
    }
}
