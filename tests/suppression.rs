use dispose_clippy::create_default_engine;

#[test]
fn pragma_disable_by_id_suppresses_until_restore() {
    let engine = create_default_engine();

    let src = r#"
using System.IO;
class C
{
#pragma warning disable IDISP002 // owned by the host
    private readonly Stream a = File.OpenRead("a.txt");
#pragma warning restore IDISP002
    private readonly Stream b = File.OpenRead("b.txt");
}
"#;

    let diags = engine.lint_source(src).expect("linting should succeed");
    let rows: Vec<_> = diags
        .iter()
        .filter(|d| d.lint.id == "IDISP002")
        .map(|d| d.span.start.row)
        .collect();
    assert_eq!(rows, vec![8], "got: {diags:#?}");
}

#[test]
fn pragma_accepts_rule_names_and_bare_disable() {
    let engine = create_default_engine();

    let by_name = r#"
using System.IO;
class C
{
#pragma warning disable dispose_member
    private readonly Stream a = File.OpenRead("a.txt");
}
"#;
    let diags = engine.lint_source(by_name).expect("linting should succeed");
    assert!(diags.is_empty(), "got: {diags:#?}");

    let bare = by_name.replace("disable dispose_member", "disable");
    let diags = engine.lint_source(&bare).expect("linting should succeed");
    assert!(diags.is_empty(), "got: {diags:#?}");
}

#[test]
fn suppress_message_on_type_suppresses_members() {
    let engine = create_default_engine();

    let src = r#"
using System.Diagnostics.CodeAnalysis;
using System.IO;

[SuppressMessage("IDisposableAnalyzers.Correctness", "IDISP002:Dispose member")]
class C
{
    private readonly Stream a = File.OpenRead("a.txt");

    public void M()
    {
        var s = File.OpenRead("b.txt");
    }
}
"#;

    let diags = engine.lint_source(src).expect("linting should succeed");
    assert!(
        !diags.iter().any(|d| d.lint.id == "IDISP002"),
        "expected SuppressMessage to suppress IDISP002, got: {diags:#?}"
    );
    assert!(
        diags.iter().any(|d| d.lint.id == "IDISP001"),
        "other rules still fire, got: {diags:#?}"
    );
}

#[test]
fn without_suppression_the_lint_fires() {
    let engine = create_default_engine();

    let src = r#"
using System.IO;
class C
{
    private readonly Stream a = File.OpenRead("a.txt");
}
"#;

    let diags = engine.lint_source(src).expect("linting should succeed");
    assert!(
        diags.iter().any(|d| d.lint.id == "IDISP002"),
        "expected IDISP002 to fire without suppression, got: {diags:#?}"
    );
}

#[test]
fn generated_code_attribute_excludes_declaration() {
    let engine = create_default_engine();

    let src = r#"
using System.CodeDom.Compiler;
using System.IO;

[GeneratedCode("tool", "1.0")]
class Generated
{
    private readonly Stream a = File.OpenRead("a.txt");
}

class Handwritten
{
    private readonly Stream b = File.OpenRead("b.txt");
}
"#;

    let diags = engine.lint_source(src).expect("linting should succeed");
    let rows: Vec<_> = diags.iter().map(|d| d.span.start.row).collect();
    assert_eq!(rows, vec![13], "got: {diags:#?}");
}
