//! Parse a PHP snippet, list its declarations and re-format it.

use php_syntax_rs::{Declaration, NodeKind};

fn main() {
    let input = "\
<?php
namespace App;

final class Greeter {
    public function __construct(private string $name) {}
    public function greet(?string $greeting = null): string { return ($greeting ?? 'Hello') . ', ' . $this->name; }
}
";

    let result = php_syntax_rs::parse_str(input);
    assert!(result.diagnostics.is_empty(), "unexpected diagnostics");

    let tree = &result.tree;
    for id in tree.descendants(tree.root()) {
        match tree.kind(id) {
            NodeKind::Declaration(Declaration::Class { name: Some(name), .. }) => {
                println!("Class: {name}");
            }
            NodeKind::Declaration(Declaration::Method { name: Some(name), .. }) => {
                println!("  Method: {name}");
            }
            _ => {}
        }
    }

    let output = php_syntax_rs::format(tree);
    println!("\nFormatted output:\n{output}");
}
