use clap::Parser;
use dispose_clippy::LintEngine;
use dispose_clippy::cli::{Args, Command, LintArgs, OutputFormat};
use dispose_clippy::config;
use dispose_clippy::diagnostics::Diagnostic;
use dispose_clippy::fixer;
use dispose_clippy::level::LintLevel;
use dispose_clippy::lint::{LintRegistry, LintSettings, find_descriptor};
use dispose_clippy::parser::SourceFile;
use dispose_clippy::rules;
use dispose_clippy::visitor::ExclusionFilter;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const STDIN_NAME: &str = "stdin";

fn main() -> ExitCode {
    dispose_clippy::telemetry::init_tracing();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(2)
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    match args.command {
        Some(Command::ListRules) => {
            list_rules();
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Explain { rule }) => {
            explain_rule(&rule)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Lint(lint)) => lint_command(lint),
        None => lint_command(args.lint),
    }
}

fn list_rules() {
    for d in rules::all_descriptors() {
        let fix_status = if d.fix.available {
            format!(" [fix: {}]", d.fix.safety.as_str())
        } else {
            String::new()
        };
        println!(
            "{}\t{}\t{}\t{}\t{}{}",
            d.id,
            d.name,
            d.category.as_str(),
            d.group.as_str(),
            d.description,
            fix_status
        );
    }
}

fn explain_rule(rule: &str) -> anyhow::Result<()> {
    let Some(d) = find_descriptor(rule) else {
        anyhow::bail!("unknown lint: {rule}");
    };

    println!("id: {}", d.id);
    println!("name: {}", d.name);
    println!("category: {}", d.category.as_str());
    println!("group: {}", d.group.as_str());
    println!("default level: {}", d.default_level.as_str());
    println!("description: {}", d.description);
    if d.fix.available {
        println!("fix: available ({})", d.fix.safety.as_str());
        if !d.fix.description.is_empty() {
            println!("fix description: {}", d.fix.description);
        }
    } else {
        println!("fix: not available");
    }
    if let Some(flag) = d.group.required_flag() {
        println!("enable with: {flag}");
    }
    Ok(())
}

fn build_engine(args: &LintArgs) -> anyhow::Result<LintEngine> {
    let start_dir = infer_start_dir(args)?;
    let loaded_cfg = config::load_config(args.config.as_deref(), &start_dir)?;

    let (disabled, settings, preview, exclusion) = match loaded_cfg.as_ref() {
        Some((_path, cfg)) => (
            cfg.lints.disabled.clone(),
            cfg.settings(),
            // CLI flag takes precedence over config
            args.preview || cfg.lints.preview,
            cfg.exclusion()?,
        ),
        None => (
            Vec::new(),
            LintSettings::default(),
            args.preview,
            ExclusionFilter::default(),
        ),
    };

    let registry = LintRegistry::default_rules_filtered(&args.only, &args.skip, &disabled, preview)?;
    Ok(LintEngine::new_with_settings(registry, settings).with_exclusion(exclusion))
}

fn lint_command(args: LintArgs) -> anyhow::Result<ExitCode> {
    let engine = build_engine(&args)?;

    if args.fix {
        return fix_command(&engine, &args);
    }

    let files = if args.paths.is_empty() {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source)?;
        vec![SourceFile::new(STDIN_NAME, source)]
    } else {
        read_sources(&collect_cs_files(&args.paths)?)?
    };

    let diagnostics = engine.lint_files(&files)?;
    let has_error = diagnostics
        .iter()
        .any(|d| d.level.promoted(args.deny_warnings) == LintLevel::Error);

    match args.format {
        OutputFormat::Json => {
            let out: Vec<JsonDiagnostic> = diagnostics.iter().map(JsonDiagnostic::from).collect();
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Pretty => {
            for diag in &diagnostics {
                print_pretty(diag);
            }
            println!("{} diagnostics in {} file(s)", diagnostics.len(), files.len());
        }
        OutputFormat::Github => {
            for diag in &diagnostics {
                print_github(diag, args.deny_warnings);
            }
        }
    }

    if has_error || (args.deny_warnings && !diagnostics.is_empty()) {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn file_label(diag: &Diagnostic) -> &str {
    diag.file.as_deref().unwrap_or(STDIN_NAME)
}

fn print_pretty(diag: &Diagnostic) {
    println!(
        "{}:{}:{}: {}: {}",
        file_label(diag),
        diag.span.start.row,
        diag.span.start.column,
        diag.level.as_str(),
        diag.headline()
    );
    if let Some(help) = &diag.help {
        println!("  help: {help}");
    }
    if let Some(suggestion) = &diag.suggestion {
        println!("  fix: {}", suggestion.message);
    }
}

fn print_github(diag: &Diagnostic, deny_warnings: bool) {
    let kind = if diag.level.promoted(deny_warnings) == LintLevel::Error {
        "error"
    } else {
        "warning"
    };
    println!(
        "::{} file={},line={},col={},endLine={},endColumn={},title={}::{}",
        kind,
        github_escape(file_label(diag)),
        diag.span.start.row,
        diag.span.start.column,
        diag.span.end.row,
        diag.span.end.column,
        diag.lint.id,
        github_escape(&diag.message)
    );
}

#[derive(Debug, Serialize)]
struct JsonDiagnostic {
    file: String,
    row: usize,
    column: usize,
    end_row: usize,
    end_column: usize,
    level: String,
    id: String,
    lint: String,
    message: String,
    help: Option<String>,
    fix: Option<String>,
}

impl From<&Diagnostic> for JsonDiagnostic {
    fn from(d: &Diagnostic) -> Self {
        Self {
            file: file_label(d).to_string(),
            row: d.span.start.row,
            column: d.span.start.column,
            end_row: d.span.end.row,
            end_column: d.span.end.column,
            level: d.level.as_str().to_string(),
            id: d.lint.id.to_string(),
            lint: d.lint.name.to_string(),
            message: d.message.clone(),
            help: d.help.clone(),
            fix: d.suggestion.as_ref().map(|s| s.message.clone()),
        }
    }
}

/// Handle --fix mode: apply fixes to files, re-analyzing the whole
/// compilation after each round.
fn fix_command(engine: &LintEngine, args: &LintArgs) -> anyhow::Result<ExitCode> {
    if args.paths.is_empty() {
        anyhow::bail!("--fix requires file paths (stdin not supported)");
    }

    let paths = collect_cs_files(&args.paths)?;
    let originals = read_sources(&paths)?;
    let mut current = originals.clone();
    let mut total_fixed = 0usize;
    let mut total_skipped = 0usize;

    const MAX_ITERATIONS: usize = 10; // Prevent infinite loops

    for iteration in 1.. {
        if iteration > MAX_ITERATIONS {
            eprintln!("Warning: Max fix iterations ({MAX_ITERATIONS}) reached");
            break;
        }

        let diagnostics = engine.lint_files(&current)?;
        let mut by_file: BTreeMap<&str, Vec<Diagnostic>> = BTreeMap::new();
        for d in diagnostics.iter().filter(|d| d.suggestion.is_some()) {
            by_file.entry(file_label(d)).or_default().push(d.clone());
        }
        if by_file.is_empty() {
            break;
        }

        let mut round_fixed = 0usize;
        let mut round_skipped = 0usize;
        let mut next = current.clone();
        for file in &mut next {
            let Some(fixable) = file.path.as_deref().and_then(|p| by_file.get(p)) else {
                continue;
            };
            let result = fixer::apply_fixes(&file.text, fixable, args.unsafe_fixes)?;
            round_fixed += result.fixes_applied;
            round_skipped += result.fixes_skipped;
            file.text = result.fixed_source;
        }
        current = next;
        total_fixed += round_fixed;

        if round_fixed == 0 || args.fix_dry_run {
            total_skipped += round_skipped;
            break;
        }
    }

    let mut files_modified = 0usize;
    for (original, fixed) in originals.iter().zip(&current) {
        if original.text == fixed.text {
            continue;
        }
        let path = Path::new(fixed.path.as_deref().unwrap_or_default());
        if args.fix_dry_run {
            let diff = fixer::format_diff(&original.text, &fixed.text, path);
            if !diff.is_empty() {
                println!("{diff}");
            }
            continue;
        }
        if !args.no_backup {
            let backup_path = path.with_extension(format!(
                "{}.bak",
                path.extension().unwrap_or_default().to_string_lossy()
            ));
            std::fs::write(&backup_path, &original.text)?;
        }
        std::fs::write(path, &fixed.text)?;
        files_modified += 1;
    }

    if args.fix_dry_run {
        println!("\n{total_fixed} fix(es) would be applied to {} file(s)", paths.len());
    } else {
        println!("Applied {total_fixed} fix(es) to {files_modified} file(s)");
    }
    if total_skipped > 0 {
        println!("{total_skipped} fix(es) skipped (use --unsafe-fixes to apply)");
    }

    Ok(ExitCode::SUCCESS)
}

fn github_escape(s: &str) -> String {
    s.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn read_sources(paths: &[PathBuf]) -> anyhow::Result<Vec<SourceFile>> {
    paths
        .iter()
        .map(|p| {
            let text = std::fs::read_to_string(p)
                .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", p.display()))?;
            Ok(SourceFile::new(p.display().to_string(), text))
        })
        .collect()
}

fn collect_cs_files(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for path in paths {
        collect_from_path(path, &mut out)?;
    }

    out.sort();
    out.dedup();
    Ok(out)
}

fn collect_from_path(path: &Path, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    let meta = std::fs::metadata(path)?;
    if meta.is_dir() {
        collect_from_dir(path, out)
    } else {
        out.push(path.to_path_buf());
        Ok(())
    }
}

fn collect_from_dir(dir: &Path, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            if should_skip_dir(&path) {
                continue;
            }
            collect_from_dir(&path, out)?;
            continue;
        }

        if path.extension().and_then(|e| e.to_str()) == Some("cs") {
            out.push(path);
        }
    }

    Ok(())
}

fn should_skip_dir(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
        return false;
    };

    matches!(name, ".git" | "bin" | "obj" | "target")
}

fn infer_start_dir(args: &LintArgs) -> anyhow::Result<PathBuf> {
    let base = match args.paths.first() {
        Some(p) => p.clone(),
        None => std::env::current_dir()?,
    };

    let base = if base.is_file() {
        base.parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    } else {
        base
    };

    Ok(base)
}
