use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

fn collect_rs_files(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_rs_files(&path, out)?;
            continue;
        }
        if file_type.is_file() && path.extension().is_some_and(|ext| ext == "rs") {
            out.push(path);
        }
    }
    Ok(())
}

fn rule_sources() -> Vec<(PathBuf, String)> {
    let rules_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("src")
        .join("rules");

    let mut rs_files = Vec::new();
    collect_rs_files(&rules_dir, &mut rs_files).expect("should list src/rules/**/*.rs");
    rs_files.sort();
    assert!(!rs_files.is_empty(), "expected rust files under {rules_dir:?}");

    rs_files
        .into_iter()
        .map(|path| {
            let content = fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
            (path, content)
        })
        .collect()
}

/// Source above the first `#[cfg(test)]`.
fn non_test_part(content: &str) -> &str {
    content.split("#[cfg(test)]").next().unwrap_or(content)
}

#[test]
fn rules_report_only_through_the_suppression_aware_context() {
    let bypass = Regex::new(r"\bdiagnostics\.push\(|Diagnostic\s*\{").unwrap();
    let mut hits = Vec::new();

    for (path, content) in rule_sources() {
        for (idx, line) in non_test_part(&content).lines().enumerate() {
            if bypass.is_match(line) {
                hits.push(format!("{}:{}: {}", path.display(), idx + 1, line.trim()));
            }
        }
    }

    assert!(
        hits.is_empty(),
        "suppression bypass regression: diagnostics built directly under src/rules:\n{}",
        hits.join("\n")
    );
}

#[test]
fn rules_do_not_unwrap_outside_tests() {
    let panicky = Regex::new(r"\.unwrap\(\)|\.expect\(|panic!\(|unreachable!\(").unwrap();
    let mut hits = Vec::new();

    for (path, content) in rule_sources() {
        for (idx, line) in non_test_part(&content).lines().enumerate() {
            if panicky.is_match(line) {
                hits.push(format!("{}:{}: {}", path.display(), idx + 1, line.trim()));
            }
        }
    }

    assert!(
        hits.is_empty(),
        "rules must degrade to no diagnostic instead of panicking:\n{}",
        hits.join("\n")
    );
}

#[test]
fn every_declared_descriptor_is_registered_once() {
    let declared = Regex::new(r#"LintDescriptor::(?:stable|preview)\(\s*"(IDISP\d{3})",\s*"([a-z_]+)""#).unwrap();

    let mut ids = BTreeSet::new();
    let mut names = BTreeSet::new();
    for (path, content) in rule_sources() {
        for caps in declared.captures_iter(&content) {
            assert!(ids.insert(caps[1].to_string()), "duplicate id {} in {}", &caps[1], path.display());
            assert!(names.insert(caps[2].to_string()), "duplicate name {} in {}", &caps[2], path.display());
        }
    }

    let registered: BTreeSet<String> = dispose_clippy::rules::all_descriptors()
        .iter()
        .map(|d| d.id.to_string())
        .collect();
    assert_eq!(ids, registered);

    let rules: BTreeSet<String> = dispose_clippy::rules::all_rules()
        .iter()
        .map(|r| r.descriptor().id.to_string())
        .collect();
    assert_eq!(rules, registered);
}
