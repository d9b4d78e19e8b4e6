use dispose_clippy::LintEngine;
use dispose_clippy::config;
use dispose_clippy::level::LintLevel;
use dispose_clippy::lint::LintRegistry;
use std::fs;

const SRC: &str = r#"
using System.IO;
class C
{
    private readonly Stream s = File.OpenRead("a.txt");

    public void M(Stream injected)
    {
        injected.Dispose();
    }
}
"#;

fn engine_for(cfg: &config::DisposeClippyConfig) -> LintEngine {
    let empty: Vec<String> = Vec::new();
    let registry =
        LintRegistry::default_rules_filtered(&empty, &empty, &cfg.lints.disabled, cfg.lints.preview)
            .expect("registry");
    LintEngine::new_with_settings(registry, cfg.settings())
        .with_exclusion(cfg.exclusion().expect("exclusion"))
}

#[test]
fn config_is_discovered_from_a_nested_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let nested = dir.path().join("src").join("Services");
    fs::create_dir_all(&nested).expect("mkdir");
    fs::write(
        dir.path().join(config::DEFAULT_CONFIG_FILE_NAME),
        "[lints]\ndispose_member = \"error\"\n",
    )
    .expect("write config");

    let (path, cfg) = config::load_config(None, &nested)
        .expect("config should load")
        .expect("config should be found");
    assert_eq!(path, dir.path().join(config::DEFAULT_CONFIG_FILE_NAME));

    let diags = engine_for(&cfg).lint_source(SRC).expect("linting should succeed");
    assert!(
        diags
            .iter()
            .any(|d| d.lint.id == "IDISP002" && d.level == LintLevel::Error)
    );
    assert!(
        diags
            .iter()
            .any(|d| d.lint.id == "IDISP007" && d.level == LintLevel::Warn)
    );
}

#[test]
fn config_can_disable_and_allow_lints() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(config::DEFAULT_CONFIG_FILE_NAME);
    fs::write(&path, "[lints]\ndisabled = [\"dispose_member\"]\nIDISP007 = \"allow\"\n").expect("write");

    let cfg = config::load_config_file(&path).expect("config should load");
    let diags = engine_for(&cfg).lint_source(SRC).expect("linting should succeed");
    assert!(diags.is_empty(), "{diags:#?}");
}

#[test]
fn config_rejects_unknown_lints() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(config::DEFAULT_CONFIG_FILE_NAME);
    fs::write(&path, "[lints]\nno_such_lint = \"error\"\n").expect("write");

    let err = config::load_config_file(&path).expect_err("unknown lint should fail");
    assert!(format!("{err:#}").contains("no_such_lint"), "{err:#}");
}

#[test]
fn config_exclude_skips_matching_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(config::DEFAULT_CONFIG_FILE_NAME);
    fs::write(&path, "[analysis]\nexclude = [\"Migrations/\"]\n").expect("write");

    let cfg = config::load_config_file(&path).expect("config should load");
    let files = [
        dispose_clippy::parser::SourceFile::new("src/Migrations/Initial.cs", SRC.replace("class C", "class Initial")),
        dispose_clippy::parser::SourceFile::new("src/Service.cs", SRC),
    ];
    let diags = engine_for(&cfg).lint_files(&files).expect("linting should succeed");
    assert!(!diags.is_empty());
    assert!(
        diags
            .iter()
            .all(|d| d.file.as_deref() == Some("src/Service.cs")),
        "{diags:#?}"
    );
}

#[test]
fn missing_config_is_not_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(config::load_config(None, dir.path()).expect("no error").is_none());
}
