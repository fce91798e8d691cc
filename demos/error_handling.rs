//! Parse broken PHP and print the diagnostics. Parsing never fails: the
//! tree is always built and still holds every byte of the input.

fn main() {
    // Missing `)` in a parameter list
    let input = "<?php\nfunction sum($a, $b {\n    return $a + $b;\n}\n";
    let result = php_syntax_rs::parse_str(input);
    println!("Recovered: {}", result.recovered);
    for record in result.records() {
        println!("  {record}");
    }
    assert_eq!(result.text(), input);

    println!();

    // Missing comma between match arms, and an unterminated string
    let input = "<?php\n$v = match ($x) { 1 => 'a' 2 => 'b' };\necho 'open;\n";
    let result = php_syntax_rs::parse_str(input);
    for diagnostic in &result.diagnostics {
        println!("{}: {}", diagnostic.code, diagnostic.message);
    }
    println!("Error nodes: {}", result.tree.errors().count());

    // Only reading the file can fail.
    if let Err(e) = php_syntax_rs::parse_file(
        std::path::Path::new("missing.php"),
        &php_syntax_rs::ParserConfig::default(),
    ) {
        println!("\n{e}");
    }
}
