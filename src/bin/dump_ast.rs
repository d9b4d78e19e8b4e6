//! Print the tree-sitter syntax tree of a C# file, for writing rules.

use std::env;
use std::fs;
use std::process::ExitCode;

fn print_tree(node: tree_sitter::Node, source: &str, indent: usize) {
    let indent_str = "  ".repeat(indent);
    let kind = node.kind();

    let text = &source[node.byte_range()];
    let text_display = match text.char_indices().nth(50) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    };
    let text_display = text_display.replace('\n', "\\n");

    match node.parent().and_then(|_| field_name(node)) {
        Some(field) => println!("{indent_str}{field}: {kind}  \"{text_display}\""),
        None => println!("{indent_str}{kind}  \"{text_display}\""),
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        print_tree(child, source, indent + 1);
    }
}

fn field_name(node: tree_sitter::Node) -> Option<&'static str> {
    let parent = node.parent()?;
    let mut cursor = parent.walk();
    if !cursor.goto_first_child() {
        return None;
    }
    loop {
        if cursor.node().id() == node.id() {
            return cursor.field_name();
        }
        if !cursor.goto_next_sibling() {
            return None;
        }
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: dump_ast <file.cs>");
        return ExitCode::from(2);
    }

    let file_path = &args[1];
    let source = match fs::read_to_string(file_path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Failed to read {file_path}: {e}");
            return ExitCode::from(2);
        }
    };

    let tree = match dispose_clippy::parser::parse_source(&source) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    println!("AST for {file_path}:");
    println!("================");
    print_tree(tree.root_node(), &source, 0);
    ExitCode::SUCCESS
}
