//! Lossless round-trip tests: the tree text is always the input.

mod common;

use common::{BROKEN_FIXTURE, VALID_FIXTURE, parse_lossless};

// -----------------------------------------------------------
// Valid input.
// -----------------------------------------------------------

#[test]
fn roundtrip_fixtures() {
    parse_lossless(VALID_FIXTURE);
    parse_lossless(BROKEN_FIXTURE);
}

#[test]
fn roundtrip_empty_and_whitespace() {
    parse_lossless("");
    parse_lossless("   \n\t\n");
    parse_lossless("<?php");
    parse_lossless("<?php\n");
}

#[test]
fn roundtrip_crlf_and_bom() {
    parse_lossless("\u{feff}<?php\r\n$a = 1;\r\n");
    parse_lossless("<?php\r\nif ($a) {\r\n    echo 1;\r\n}\r\n");
}

#[test]
fn roundtrip_comments_everywhere() {
    parse_lossless("<?php /* a */ $x /* b */ = /* c */ 1 /* d */ ; // e\n# f\n/** g */");
}

#[test]
fn roundtrip_inline_html() {
    parse_lossless("<html>\n<?= $title ?>\n<?php foreach ($rows as $row) { ?><tr></tr><?php } ?>\n</html>");
}

#[test]
fn roundtrip_multibyte_text() {
    parse_lossless("<?php\n$saudação = 'Olá, mundo!';\necho \"$saudação\";\n");
}

// -----------------------------------------------------------
// Broken input.
// -----------------------------------------------------------

#[test]
fn roundtrip_unterminated_constructs() {
    parse_lossless("<?php\n$a = 'open\n$b = \"also open");
    parse_lossless("<?php\n/* comment never closed\n$a = 1;");
    parse_lossless("<?php\n$h = <<<EOT\nno end label\n");
}

#[test]
fn roundtrip_unbalanced_delimiters() {
    parse_lossless("<?php\nfunction f( {\n");
    parse_lossless("<?php\n))) ]]] }}}\n");
    parse_lossless("<?php\nclass A { public function b() { if ($x) { \n");
    parse_lossless("<?php\n$a = [1, 2, (3 + ];\n");
}

#[test]
fn roundtrip_garbage() {
    parse_lossless("<?php\n\u{1}\u{2} $$ -> :: ?? => @@ \\\\ ;;");
    parse_lossless("<?php\n12abc 0x 1__0 .5.5\n");
    parse_lossless("<?php\nclass class class function function fn fn match match");
}
