//! End-to-end tests: configuration, parsing, linting and reporting
//! together, the way the command-line tool drives them.

mod common;

use std::fs;
use std::path::PathBuf;
use std::thread;

use common::{BROKEN_FIXTURE, VALID_FIXTURE};
use php_syntax_rs::diagnostic::sort_diagnostics;
use php_syntax_rs::{
    Config, ConfigError, DiagnosticCode, DiagnosticRecord, Error, LintLevel, LintRule, ParseResult,
    Severity, SourceBuffer, SyntaxTree, lint, parse, parse_file, parse_str,
};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("php-syntax-{name}-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

// -----------------------------------------------------------
// Thread safety.
// -----------------------------------------------------------

#[test]
fn results_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ParseResult>();
    assert_send_sync::<SyntaxTree>();
    assert_send_sync::<Config>();
}

#[test]
fn parallel_parses_are_independent() {
    let inputs = [VALID_FIXTURE, BROKEN_FIXTURE, "<?php\n$a =+ 1;\n", ""];
    let sequential: Vec<_> = inputs.iter().map(|i| parse_str(i).diagnostics).collect();
    let parallel: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|input| scope.spawn(move || parse_str(input).diagnostics))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("parse thread"))
            .collect()
    });
    assert_eq!(sequential, parallel);
}

// -----------------------------------------------------------
// Configuration.
// -----------------------------------------------------------

#[test]
fn config_file_drives_parse_and_lint() {
    let dir = scratch_dir("config");
    fs::write(
        dir.join("php-syntax.json"),
        r#"{
            "parser": { "max_nesting_depth": 8 },
            "lint": {
                "enforce-namespace": { "level": "error" },
                "disallow-debug-functions": { "functions": ["trace"] }
            }
        }"#,
    )
    .expect("write config");
    let config = Config::discover(&dir).expect("config");
    assert_eq!(config.parser.max_nesting_depth, 8);
    assert_eq!(config.lint.level(LintRule::EnforceNamespace), LintLevel::Error);

    let php = dir.join("input.php");
    fs::write(&php, "<?php\ntrace($a);\nvar_dump($b);\n$x = ((((((((((1))))))))));\n")
        .expect("write php");
    let result = parse_file(&php, &config.parser).expect("parse");
    assert_eq!(result.source.name(), Some(php.display().to_string().as_str()));
    assert_eq!(
        result.diagnostics.iter().map(|d| d.code).collect::<Vec<_>>(),
        vec![DiagnosticCode::NestingTooDeep]
    );

    let findings = lint(&result, &config.lint);
    let rules: Vec<_> = findings
        .iter()
        .map(|d| (d.code, d.severity))
        .collect();
    assert_eq!(
        rules,
        vec![
            (DiagnosticCode::Lint(LintRule::EnforceNamespace), Severity::Error),
            (DiagnosticCode::Lint(LintRule::DisallowDebugFunctions), Severity::Warning),
        ]
    );
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn bad_config_is_reported() {
    let dir = scratch_dir("bad-config");
    let path = dir.join("php-syntax.json");
    fs::write(&path, r#"{"lint": {"line-length": {"max": "long"}}}"#).expect("write");
    let err = Config::load(&path).expect_err("invalid config");
    assert!(matches!(err, ConfigError::Json(_)));
    let err = Error::from(err);
    assert!(err.to_string().starts_with("invalid configuration"));
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn unreadable_file_is_an_error() {
    let err = parse_file(
        std::path::Path::new("/nonexistent/input.php"),
        &Config::default().parser,
    )
    .expect_err("missing file");
    assert!(matches!(err, Error::Io { .. }));
    assert!(err.to_string().contains("/nonexistent/input.php"));
}

// -----------------------------------------------------------
// Reporting.
// -----------------------------------------------------------

#[test]
fn merged_report_is_sorted_and_serializable() {
    let result = parse(
        SourceBuffer::new("<?php\nvar_dump($a)\n$b = 1;\n"),
        &Config::default().parser,
    );
    let mut diagnostics = result.diagnostics.clone();
    diagnostics.extend(lint(&result, &Config::default().lint));
    sort_diagnostics(&mut diagnostics);
    let codes: Vec<_> = diagnostics.iter().map(|d| d.code.as_str()).collect();
    assert_eq!(codes, vec!["disallow-debug-functions", "ExpectedToken"]);

    let records: Vec<DiagnosticRecord> = diagnostics
        .iter()
        .map(|d| d.to_record(&result.source))
        .collect();
    assert_eq!(records[0].to_string(), "2:1: warning [disallow-debug-functions] call to debug function 'var_dump'");
    assert_eq!(records[1].start_line, 2);
    assert_eq!(records[1].start_column, 13);

    let json = serde_json::to_string(&records).expect("serialize");
    let back: Vec<DiagnosticRecord> = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, records);
}

#[test]
fn position_queries() {
    let result = parse_str("<?php\n$a = 1;\n");
    let source = &result.source;
    let position = source.position(7).expect("position");
    assert_eq!((position.line, position.column), (2, 2));
    assert_eq!(source.offset(position).expect("offset"), 7);
    assert!(source.position(100).is_err());
    let err: Error = source.position(100).expect_err("out of range").into();
    assert!(matches!(err, Error::Position(_)));
}
