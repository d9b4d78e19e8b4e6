use dispose_clippy::LintEngine;
use dispose_clippy::create_default_engine;
use dispose_clippy::diagnostics::Diagnostic;
use dispose_clippy::lint::LintRegistry;

fn lint_only(src: &str, lint: &str) -> Vec<Diagnostic> {
    let registry = LintRegistry::default_rules_filtered(&[lint.to_string()], &[], &[], false)
        .expect("registry");
    LintEngine::new(registry)
        .lint_source(src)
        .expect("linting should succeed")
}

fn rows(diags: &[Diagnostic]) -> Vec<usize> {
    diags.iter().map(|d| d.span.start.row).collect()
}

// ============================================================================
// dispose_created (IDISP001)
// ============================================================================

#[test]
fn dispose_created_flags_local_that_is_never_disposed() {
    let src = r#"
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
    let diags = lint_only(src, "IDISP001");
    assert_eq!(rows(&diags), vec![7], "{diags:#?}");
    assert!(diags[0].message.contains("`stream`"));
}

#[test]
fn dispose_created_allows_using_forms() {
    let src = r#"
using System.IO;
class C
{
    public void M()
    {
        using var a = File.OpenRead("a.txt");
        using (var b = new MemoryStream())
        {
        }
        var c = new MemoryStream();
        using (c)
        {
        }
    }
}
"#;
    assert!(lint_only(src, "dispose_created").is_empty());
}

#[test]
fn dispose_created_allows_explicit_dispose_in_constructor() {
    let src = r#"
using System.IO;
class C
{
    public C(string path)
    {
        Stream s = File.OpenRead(path);
        s.Dispose();
    }
}
"#;
    assert!(lint_only(src, "IDISP001").is_empty());
}

#[test]
fn dispose_created_allows_handoffs() {
    let src = r#"
using System;
using System.Collections.Generic;
using System.IO;
class C
{
    private Stream stored;
    private readonly List<Stream> all = new List<Stream>();

    public Stream Returned()
    {
        var s = File.OpenRead("a");
        return s;
    }

    public void Stored()
    {
        var s = File.OpenRead("b");
        this.stored = s;
    }

    public void Wrapped()
    {
        var s = File.OpenRead("c");
        using var reader = new StreamReader(s);
    }

    public void Added()
    {
        var s = File.OpenRead("d");
        all.Add(s);
    }

    public Action Captured()
    {
        var s = File.OpenRead("e");
        return () => s.Dispose();
    }
}
"#;
    let diags = lint_only(src, "IDISP001");
    assert!(diags.is_empty(), "{diags:#?}");
}

#[test]
fn dispose_created_follows_arguments_into_compilation_methods() {
    let src = r#"
using System.IO;
class C
{
    private Stream kept;

    private void Keep(Stream s) { this.kept = s; }

    private static void Peek(Stream s) { s.ReadByte(); }

    public void M()
    {
        var kept = File.OpenRead("a");
        Keep(kept);
        var peeked = File.OpenRead("b");
        Peek(peeked);
    }
}
"#;
    let diags = lint_only(src, "IDISP001");
    assert_eq!(rows(&diags), vec![15], "{diags:#?}");
}

#[test]
fn dispose_created_ignores_injected_values() {
    let src = r#"
using System.IO;
class C
{
    public void M(Stream stream)
    {
        var s = stream;
        s.ReadByte();
    }
}
"#;
    assert!(lint_only(src, "IDISP001").is_empty());
}

// ============================================================================
// dispose_member (IDISP002)
// ============================================================================

#[test]
fn dispose_member_flags_field_without_dispose_method() {
    let src = r#"
using System.IO;
class C
{
    private readonly Stream s = File.OpenRead("a.txt");
}
"#;
    let diags = lint_only(src, "IDISP002");
    assert_eq!(rows(&diags), vec![5], "{diags:#?}");
}

#[test]
fn dispose_member_allows_member_disposed_in_dispose() {
    let src = r#"
using System;
using System.IO;
sealed class C : IDisposable
{
    private readonly Stream s = File.OpenRead("a.txt");
    private Stream t;

    public C()
    {
        this.t = new MemoryStream();
    }

    public void Dispose()
    {
        this.s.Dispose();
        (t as IDisposable)?.Dispose();
    }
}
"#;
    let diags = lint_only(src, "IDISP002");
    assert!(diags.is_empty(), "{diags:#?}");
}

#[test]
fn dispose_member_never_flags_injected_fields() {
    let src = r#"
using System.IO;
class C
{
    private readonly Stream s;

    public C(Stream s)
    {
        this.s = s;
    }
}
"#;
    assert!(lint_only(src, "IDISP002").is_empty());
}

#[test]
fn dispose_member_requires_the_disposing_branch() {
    let outside = r#"
using System;
using System.IO;
class C : IDisposable
{
    private readonly Stream s = new MemoryStream();

    public void Dispose()
    {
        Dispose(true);
    }

    protected virtual void Dispose(bool disposing)
    {
        if (disposing)
        {
        }
        s.Dispose();
    }
}
"#;
    assert_eq!(rows(&lint_only(outside, "IDISP002")), vec![6]);

    let inside = outside.replace(
        "        {\n        }\n        s.Dispose();",
        "        {\n            s.Dispose();\n        }",
    );
    assert!(lint_only(&inside, "IDISP002").is_empty(), "{inside}");

    let early_return = outside.replace(
        "        if (disposing)\n        {\n        }\n        s.Dispose();",
        "        if (!disposing)\n        {\n            return;\n        }\n\n        s.Dispose();",
    );
    assert!(lint_only(&early_return, "IDISP002").is_empty(), "{early_return}");
}

#[test]
fn dispose_member_counts_disposal_in_derived_override() {
    let src = r#"
using System;
using System.IO;
abstract class Base : IDisposable
{
    protected readonly Stream s = new MemoryStream();

    public void Dispose()
    {
        Dispose(true);
    }

    protected virtual void Dispose(bool disposing)
    {
    }
}

sealed class Derived : Base
{
    protected override void Dispose(bool disposing)
    {
        if (disposing)
        {
            s.Dispose();
        }
        base.Dispose(disposing);
    }
}
"#;
    let diags = lint_only(src, "IDISP002");
    assert!(diags.is_empty(), "{diags:#?}");
}

#[test]
fn dispose_member_pairs_setup_and_teardown() {
    let src = r#"
using System.IO;
using NUnit.Framework;
public class Tests
{
    private Stream stream;

    [SetUp]
    public void SetUp()
    {
        this.stream = new MemoryStream();
    }

    [TearDown]
    public void TearDown()
    {
        this.stream.Dispose();
    }
}
"#;
    assert!(lint_only(src, "IDISP002").is_empty());
}

// ============================================================================
// dispose_previous (IDISP003)
// ============================================================================

#[test]
fn dispose_previous_flags_reassignment_outside_constructor() {
    let src = r#"
using System;
using System.IO;
sealed class C : IDisposable
{
    private Stream s = new MemoryStream();

    public void Reset()
    {
        this.s = new MemoryStream();
    }

    public void Dispose() => this.s.Dispose();
}
"#;
    let diags = lint_only(src, "IDISP003");
    assert_eq!(rows(&diags), vec![10], "{diags:#?}");
}

#[test]
fn dispose_previous_allows_disposed_or_guarded_targets() {
    let src = r#"
using System;
using System.IO;
sealed class C : IDisposable
{
    private Stream s;
    private Stream t;

    public C()
    {
        this.s = new MemoryStream();
    }

    public void Reset()
    {
        this.s?.Dispose();
        this.s = new MemoryStream();
    }

    public void Ensure()
    {
        if (this.t == null)
        {
            this.t = new MemoryStream();
        }
    }

    public void Dispose()
    {
        this.s?.Dispose();
        this.t?.Dispose();
    }
}
"#;
    let diags = lint_only(src, "IDISP003");
    assert!(diags.is_empty(), "{diags:#?}");
}

#[test]
fn dispose_previous_flags_local_overwritten() {
    let src = r#"
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
    let diags = lint_only(src, "IDISP003");
    assert_eq!(rows(&diags), vec![8], "{diags:#?}");
}

#[test]
fn dispose_previous_trusts_setter_that_disposes_its_backing_field() {
    let src = r#"
using System;
using System.IO;
public sealed class C
{
    private Stream stream;
    private Stream other;
    private Stream unrelated;

    public Stream Stream
    {
        get { return this.stream; }
        set { this.stream?.Dispose(); this.stream = value; }
    }

    public Stream Other
    {
        get { return this.other; }
        set { this.unrelated?.Dispose(); this.other = value; }
    }

    public void M()
    {
        this.Stream = File.OpenRead("a.txt");
        this.Other = File.OpenRead("b.txt");
    }
}
"#;
    let diags = lint_only(src, "IDISP003");
    assert_eq!(rows(&diags), vec![25], "{diags:#?}");
}

// ============================================================================
// dont_ignore_created (IDISP004, preview)
// ============================================================================

#[test]
fn dont_ignore_created_is_preview_only() {
    let src = r#"
using System.IO;
class C
{
    public void M()
    {
        File.OpenRead("a.txt");
    }
}
"#;
    let stable = create_default_engine().lint_source(src).expect("lint");
    assert!(!stable.iter().any(|d| d.lint.id == "IDISP004"));

    let preview = LintRegistry::default_rules_filtered(&[], &[], &[], true).expect("registry");
    let diags = LintEngine::new(preview).lint_source(src).expect("lint");
    assert_eq!(
        rows(&diags.into_iter().filter(|d| d.lint.id == "IDISP004").collect::<Vec<_>>()),
        vec![7]
    );
}

// ============================================================================
// dont_dispose_injected (IDISP007)
// ============================================================================

#[test]
fn dont_dispose_injected_flags_using_of_constructor_parameter() {
    let src = r#"
using System.IO;
class C
{
    public C(Stream someInjectedStream)
    {
        using (var s = someInjectedStream)
        {
        }
    }
}
"#;
    let diags = lint_only(src, "IDISP007");
    assert_eq!(rows(&diags), vec![7], "{diags:#?}");
}

#[test]
fn dont_dispose_injected_flags_dispose_of_parameter_and_static() {
    let src = r#"
using System.IO;
class C
{
    private static readonly Stream Shared = new MemoryStream();

    public void M(Stream stream)
    {
        stream.Dispose();
        Shared.Dispose();
    }
}
"#;
    let diags = lint_only(src, "IDISP007");
    assert_eq!(rows(&diags), vec![9, 10], "{diags:#?}");
}

#[test]
fn dont_dispose_injected_allows_created_resources() {
    let src = r#"
using System.IO;
class C
{
    public void M()
    {
        using var a = File.OpenRead("a.txt");
        var b = new MemoryStream();
        b.Dispose();
    }
}
"#;
    assert!(lint_only(src, "IDISP007").is_empty());
}

#[test]
fn dont_dispose_injected_allows_field_behind_private_setter() {
    let src = r#"
using System;
using System.IO;
public sealed class C : IDisposable
{
    private Stream stream = File.OpenRead(string.Empty);

    public Stream Calculated => this.stream;

    public Stream Stream
    {
        get { return this.stream; }
        private set { this.stream = value; }
    }

    public void Dispose()
    {
        this.stream.Dispose();
    }
}
"#;
    for call in [
        "this.stream.Dispose();",
        "stream?.Dispose();",
        "this.Stream?.Dispose();",
        "Calculated.Dispose();",
    ] {
        let code = src.replace("this.stream.Dispose();", call);
        let diags = lint_only(&code, "IDISP007");
        assert!(diags.is_empty(), "{call}: {diags:#?}");
    }

    let public_setter = src.replace("private set", "set");
    assert_eq!(rows(&lint_only(&public_setter, "IDISP007")), vec![18]);
}

#[test]
fn dont_dispose_injected_allows_slots_of_created_wrapper() {
    let src = r#"
using System;
using System.IO;
public class Pair<T>
{
    public Pair(T item1, T item2)
    {
        this.Item1 = item1;
        this.Item2 = item2;
    }

    public T Item1 { get; }

    public T Item2 { get; }
}

public sealed class C : IDisposable
{
    private readonly Pair<FileStream> pair;

    public C(string file1, string file2)
    {
        this.pair = new Pair<FileStream>(File.OpenRead(file1), File.OpenRead(file2));
    }

    public void Dispose()
    {
        this.pair.Item1.Dispose();
        this.pair.Item2.Dispose();
    }
}
"#;
    let diags = lint_only(src, "IDISP007");
    assert!(diags.is_empty(), "{diags:#?}");
}

// ============================================================================
// call_base_dispose (IDISP010)
// ============================================================================

#[test]
fn call_base_dispose_flags_override_without_base_call() {
    let src = r#"
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
    protected override void Dispose(bool disposing)
    {
    }
}

class Good : Base
{
    protected override void Dispose(bool disposing)
    {
        base.Dispose(disposing);
    }
}
"#;
    let diags = lint_only(src, "call_base_dispose");
    assert_eq!(rows(&diags), vec![17], "{diags:#?}");
    assert_eq!(diags[0].message, "Call `base.Dispose` in the override");
}

// ============================================================================
// suppress_finalize_this (IDISP020)
// ============================================================================

#[test]
fn suppress_finalize_this_flags_other_arguments() {
    let src = r#"
using System;
sealed class C : IDisposable
{
    public void Dispose()
    {
        GC.SuppressFinalize(null);
    }
}
"#;
    let diags = lint_only(src, "IDISP020");
    assert_eq!(rows(&diags), vec![7], "{diags:#?}");
    assert!(diags[0].suggestion.is_some());
}

#[test]
fn suppress_finalize_this_allows_this() {
    let src = r#"
using System;
sealed class C : IDisposable
{
    public void Dispose()
    {
        GC.SuppressFinalize(this);
    }
}
"#;
    assert!(lint_only(src, "IDISP020").is_empty());
}

// ============================================================================
// engine
// ============================================================================

#[test]
fn malformed_input_does_not_panic() {
    let src = r#"
using System.IO;
class C
{
    public void M(
    {
        var s = File.OpenRead(
        this.x = new MemoryStream(
    }
"#;
    let _ = create_default_engine().lint_source(src).expect("linting should succeed");
}

#[test]
fn diagnostics_are_sorted_by_position() {
    let src = r#"
using System.IO;
class C
{
    private readonly Stream s = File.OpenRead("a.txt");

    public void M(Stream injected)
    {
        var t = File.OpenRead("b.txt");
        injected.Dispose();
    }
}
"#;
    let diags = create_default_engine().lint_source(src).expect("lint");
    let ids: Vec<_> = diags.iter().map(|d| (d.span.start.row, d.lint.id)).collect();
    assert_eq!(ids, vec![(5, "IDISP002"), (9, "IDISP001"), (10, "IDISP007")]);
}
