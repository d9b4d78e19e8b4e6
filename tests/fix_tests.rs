//! Tests for auto-fix functionality.
//!
//! Each test lints a source with one rule enabled, applies the suggested
//! fixes in a single pass and snapshots the rewritten source.

use dispose_clippy::LintEngine;
use dispose_clippy::diagnostics::Applicability;
use dispose_clippy::fixer;
use dispose_clippy::lint::LintRegistry;
use insta::assert_snapshot;

fn fix(source: &str, lint: &str, allow_unsafe: bool) -> String {
    let registry =
        LintRegistry::default_rules_filtered(&[lint.to_string()], &[], &[], false).expect("registry");
    let diagnostics = LintEngine::new(registry)
        .lint_source(source)
        .expect("linting should succeed");
    assert!(
        diagnostics.iter().any(|d| d.suggestion.is_some()),
        "{lint} should offer a fix: {diagnostics:#?}"
    );
    let result = fixer::apply_fixes(source, &diagnostics, allow_unsafe).expect("fixes apply");
    result.fixed_source.trim().to_string()
}

// ============================================================================
// dispose_member (IDISP002)
// ============================================================================

#[test]
fn dispose_member_appends_to_dispose() {
    let source = r#"
using System;
using System.IO;
sealed class C : IDisposable
{
    private readonly Stream s = File.OpenRead("a.txt");

    public void Dispose()
    {
    }
}
"#;
    assert_snapshot!(fix(source, "IDISP002", false), @r###"
using System;
using System.IO;
sealed class C : IDisposable
{
    private readonly Stream s = File.OpenRead("a.txt");

    public void Dispose()
    {
        this.s?.Dispose();
    }
}
"###);
}

#[test]
fn dispose_member_adds_disposing_block_before_base_call() {
    let source = r#"
using System;
using System.IO;
class Base : IDisposable
{
    public void Dispose()
    {
        Dispose(true);
    }

    protected virtual void Dispose(bool disposing)
    {
    }
}

sealed class D : Base
{
    private readonly Stream s = new MemoryStream();

    protected override void Dispose(bool disposing)
    {
        base.Dispose(disposing);
    }
}
"#;
    assert_snapshot!(fix(source, "IDISP002", false), @r###"
using System;
using System.IO;
class Base : IDisposable
{
    public void Dispose()
    {
        Dispose(true);
    }

    protected virtual void Dispose(bool disposing)
    {
    }
}

sealed class D : Base
{
    private readonly Stream s = new MemoryStream();

    protected override void Dispose(bool disposing)
    {
        if (disposing)
        {
            this.s?.Dispose();
        }

        base.Dispose(disposing);
    }
}
"###);
}

#[test]
fn dispose_member_uses_existing_disposing_block() {
    let source = r#"
using System;
using System.IO;
class C : IDisposable
{
    private readonly Stream s = new MemoryStream();
    private readonly Stream t = new MemoryStream();

    public void Dispose()
    {
        Dispose(true);
    }

    protected virtual void Dispose(bool disposing)
    {
        if (disposing)
        {
            this.s.Dispose();
        }
    }
}
"#;
    let fixed = fix(source, "IDISP002", false);
    assert!(
        fixed.contains("            this.s.Dispose();\n            this.t?.Dispose();\n        }"),
        "{fixed}"
    );
}

// ============================================================================
// dispose_created (IDISP001)
// ============================================================================

#[test]
fn dispose_created_fix_is_unsafe() {
    let source = r#"
using System.IO;
class C
{
    public void M()
    {
        var stream = File.OpenRead("a.txt");
        stream.ReadByte();
    }
}
"#;
    let registry =
        LintRegistry::default_rules_filtered(&["IDISP001".to_string()], &[], &[], false).expect("registry");
    let diagnostics = LintEngine::new(registry).lint_source(source).expect("lint");
    let suggestion = diagnostics[0].suggestion.as_ref().expect("fix");
    assert_eq!(suggestion.applicability, Applicability::MaybeIncorrect);

    let result = fixer::apply_fixes(source, &diagnostics, false).expect("fixes apply");
    assert_eq!(result.fixes_applied, 0);
    assert_eq!(result.fixes_skipped, 1);

    assert_snapshot!(fix(source, "IDISP001", true), @r###"
using System.IO;
class C
{
    public void M()
    {
        using var stream = File.OpenRead("a.txt");
        stream.ReadByte();
    }
}
"###);
}

#[test]
fn dispose_created_in_constructor_becomes_field() {
    let source = r#"
using System.IO;
class C
{
    public C()
    {
        var stream = File.OpenRead("a.txt");
    }
}
"#;
    assert_snapshot!(fix(source, "IDISP001", true), @r###"
using System.IO;
class C
{
    private readonly FileStream stream;

    public C()
    {
        this.stream = File.OpenRead("a.txt");
    }
}
"###);
}

// ============================================================================
// dispose_previous (IDISP003)
// ============================================================================

#[test]
fn dispose_previous_disposes_before_assignment() {
    let source = r#"
using System.IO;
class C
{
    public void M()
    {
        var s = new MemoryStream();
        s = new MemoryStream();
        s.Dispose();
    }
}
"#;
    assert_snapshot!(fix(source, "IDISP003", true), @r###"
using System.IO;
class C
{
    public void M()
    {
        var s = new MemoryStream();
        s?.Dispose();
        s = new MemoryStream();
        s.Dispose();
    }
}
"###);
}

// ============================================================================
// call_base_dispose (IDISP010)
// ============================================================================

#[test]
fn call_base_dispose_appends_base_call() {
    let source = r#"
using System;
class Base : IDisposable
{
    public void Dispose()
    {
        Dispose(true);
    }

    protected virtual void Dispose(bool disposing)
    {
    }
}

class Derived : Base
{
    protected override void Dispose(bool isDisposing)
    {
        Console.WriteLine();
    }
}
"#;
    let fixed = fix(source, "IDISP010", false);
    assert!(
        fixed.contains("        Console.WriteLine();\n        base.Dispose(isDisposing);\n    }"),
        "{fixed}"
    );
}

// ============================================================================
// suppress_finalize_this (IDISP020)
// ============================================================================

#[test]
fn suppress_finalize_this_rewrites_argument() {
    let source = r#"
using System;
sealed class C : IDisposable
{
    public void Dispose()
    {
        GC.SuppressFinalize(null);
    }
}
"#;
    assert_snapshot!(fix(source, "suppress_finalize_this", false), @r###"
using System;
sealed class C : IDisposable
{
    public void Dispose()
    {
        GC.SuppressFinalize(this);
    }
}
"###);
}

#[test]
fn overlapping_fixes_are_deferred() {
    let source = r#"
using System;
using System.IO;
sealed class C : IDisposable
{
    private readonly Stream a = new MemoryStream();
    private readonly Stream b = new MemoryStream();

    public void Dispose()
    {
    }
}
"#;
    let registry =
        LintRegistry::default_rules_filtered(&["IDISP002".to_string()], &[], &[], false).expect("registry");
    let diagnostics = LintEngine::new(registry).lint_source(source).expect("lint");
    assert_eq!(diagnostics.len(), 2);

    // both insert at the same offset, which does not collide
    let result = fixer::apply_fixes(source, &diagnostics, false).expect("fixes apply");
    assert_eq!(result.fixes_applied, 2);
    assert!(
        result
            .fixed_source
            .contains("        this.a?.Dispose();\n        this.b?.Dispose();\n    }"),
        "{}",
        result.fixed_source
    );
}
