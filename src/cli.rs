use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// dispose-clippy CLI options.
#[derive(Debug, Parser)]
#[command(
    name = "dispose-clippy",
    version,
    about = "Find leaked and misused IDisposable values in C# code",
    args_conflicts_with_subcommands = true,
    subcommand_precedence_over_arg = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub lint: LintArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lint files or directories.
    Lint(LintArgs),

    /// List available lints.
    ListRules,

    /// Explain a lint.
    Explain {
        /// Lint id or name (`IDISP001`, `dispose_created`).
        rule: String,
    },
}

#[derive(Debug, Clone, ClapArgs)]
pub struct LintArgs {
    /// Files/directories to lint as one compilation. Defaults to stdin when absent.
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,

    /// Only run these lints (comma-separated ids or names).
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Skip these lints (comma-separated ids or names).
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Enable preview lints.
    #[arg(long)]
    pub preview: bool,

    /// Exit with code 1 if any diagnostics are emitted.
    #[arg(long)]
    pub deny_warnings: bool,

    /// Path to a dispose-clippy.toml; otherwise discovered from the first PATH upwards.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Apply machine-applicable fixes in place.
    #[arg(long)]
    pub fix: bool,

    /// Print the fixes as a diff instead of writing them.
    #[arg(long, requires = "fix")]
    pub fix_dry_run: bool,

    /// Also apply fixes that may change behavior.
    #[arg(long, requires = "fix")]
    pub unsafe_fixes: bool,

    /// Do not write `.cs.bak` backups before fixing.
    #[arg(long, requires = "fix")]
    pub no_backup: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
    Github,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_paths_lint_by_default() {
        let args = Args::parse_from(["dispose-clippy", "src", "--only", "IDISP001,dispose_member"]);
        assert!(args.command.is_none());
        assert_eq!(args.lint.paths, vec![PathBuf::from("src")]);
        assert_eq!(args.lint.only, vec!["IDISP001", "dispose_member"]);
    }

    #[test]
    fn fix_flags_require_fix() {
        assert!(Args::try_parse_from(["dispose-clippy", "--fix-dry-run", "a.cs"]).is_err());
        let args = Args::parse_from(["dispose-clippy", "--fix", "--unsafe-fixes", "a.cs"]);
        assert!(args.lint.fix && args.lint.unsafe_fixes);
    }

    #[test]
    fn explain_subcommand() {
        let args = Args::parse_from(["dispose-clippy", "explain", "IDISP007"]);
        assert!(matches!(args.command, Some(Command::Explain { rule }) if rule == "IDISP007"));
    }
}
