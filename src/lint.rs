//! Style rules evaluated on a parsed file.
//!
//! Rules read the syntax tree and the source text; they never re-parse.
//! Each rule has its own level and produces diagnostics with code
//! `Lint(rule)`, numbered after the parse diagnostics so the two lists
//! can be merged and sorted together.

use serde::{Deserialize, Serialize};

use crate::ast::{Declaration, NodeKind};
use crate::diagnostic::{Diagnostic, DiagnosticCode, DiagnosticSink, Severity};
use crate::parser::ParseResult;
use crate::token::Span;
use crate::tree::{NodeId, SyntaxTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LintRule {
    SingleClassPerFile,
    EnforceNamespace,
    DisallowDebugFunctions,
    LineLength,
    ConsecutiveBlankLines,
    ClassMemberOrder,
}

impl LintRule {
    pub const ALL: [Self; 6] = [
        Self::SingleClassPerFile,
        Self::EnforceNamespace,
        Self::DisallowDebugFunctions,
        Self::LineLength,
        Self::ConsecutiveBlankLines,
        Self::ClassMemberOrder,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SingleClassPerFile => "single-class-per-file",
            Self::EnforceNamespace => "enforce-namespace",
            Self::DisallowDebugFunctions => "disallow-debug-functions",
            Self::LineLength => "line-length",
            Self::ConsecutiveBlankLines => "consecutive-blank-lines",
            Self::ClassMemberOrder => "class-member-order",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LintLevel {
    Off,
    #[default]
    Warning,
    Error,
}

impl LintLevel {
    const fn severity(self) -> Option<Severity> {
        match self {
            Self::Off => None,
            Self::Warning => Some(Severity::Warning),
            Self::Error => Some(Severity::Error),
        }
    }
}

/// Group a class member belongs to for `class-member-order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemberGroup {
    TraitUses,
    Cases,
    Constants,
    Properties,
    Methods,
}

impl MemberGroup {
    const fn label(self) -> &'static str {
        match self {
            Self::TraitUses => "trait uses",
            Self::Cases => "enum cases",
            Self::Constants => "constants",
            Self::Properties => "properties",
            Self::Methods => "methods",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LevelOnly {
    pub level: LintLevel,
}

impl Default for LevelOnly {
    fn default() -> Self {
        Self {
            level: LintLevel::Warning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnforceNamespace {
    pub level: LintLevel,
    /// Accept `namespace Foo { ... }` as well as `namespace Foo;`.
    pub allow_braced: bool,
}

impl Default for EnforceNamespace {
    fn default() -> Self {
        Self {
            level: LintLevel::Off,
            allow_braced: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DebugFunctions {
    pub level: LintLevel,
    /// Function names, compared without case.
    pub functions: Vec<String>,
}

impl Default for DebugFunctions {
    fn default() -> Self {
        Self {
            level: LintLevel::Warning,
            functions: ["var_dump", "print_r", "var_export", "dd", "dump", "debug_zval_dump"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LineLength {
    pub level: LintLevel,
    /// Longest allowed line, in characters.
    pub max: usize,
}

impl Default for LineLength {
    fn default() -> Self {
        Self {
            level: LintLevel::Warning,
            max: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlankLines {
    pub level: LintLevel,
    pub max: usize,
}

impl Default for BlankLines {
    fn default() -> Self {
        Self {
            level: LintLevel::Warning,
            max: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemberOrder {
    pub level: LintLevel,
    /// Groups in the order they must appear. Unlisted groups may appear
    /// anywhere.
    pub order: Vec<MemberGroup>,
}

impl Default for MemberOrder {
    fn default() -> Self {
        Self {
            level: LintLevel::Warning,
            order: vec![
                MemberGroup::Constants,
                MemberGroup::Properties,
                MemberGroup::Methods,
            ],
        }
    }
}

/// Settings for every rule, the `lint` section of the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct LintConfig {
    pub single_class_per_file: LevelOnly,
    pub enforce_namespace: EnforceNamespace,
    pub disallow_debug_functions: DebugFunctions,
    pub line_length: LineLength,
    pub consecutive_blank_lines: BlankLines,
    pub class_member_order: MemberOrder,
}

impl LintConfig {
    #[must_use]
    pub const fn level(&self, rule: LintRule) -> LintLevel {
        match rule {
            LintRule::SingleClassPerFile => self.single_class_per_file.level,
            LintRule::EnforceNamespace => self.enforce_namespace.level,
            LintRule::DisallowDebugFunctions => self.disallow_debug_functions.level,
            LintRule::LineLength => self.line_length.level,
            LintRule::ConsecutiveBlankLines => self.consecutive_blank_lines.level,
            LintRule::ClassMemberOrder => self.class_member_order.level,
        }
    }
}

/// Run every enabled rule. Returned diagnostics are sorted and their ids
/// continue after the parse diagnostics of `result`.
#[must_use]
pub fn lint(result: &ParseResult, config: &LintConfig) -> Vec<Diagnostic> {
    let mut linter = Linter {
        result,
        config,
        sink: DiagnosticSink::starting_at(result.diagnostics.len()),
    };
    for rule in LintRule::ALL {
        let Some(severity) = config.level(rule).severity() else {
            continue;
        };
        let before = linter.sink.len();
        match rule {
            LintRule::SingleClassPerFile => linter.single_class_per_file(severity),
            LintRule::EnforceNamespace => linter.enforce_namespace(severity),
            LintRule::DisallowDebugFunctions => linter.disallow_debug_functions(severity),
            LintRule::LineLength => linter.line_length(severity),
            LintRule::ConsecutiveBlankLines => linter.consecutive_blank_lines(severity),
            LintRule::ClassMemberOrder => linter.class_member_order(severity),
        }
        tracing::trace!(
            rule = rule.as_str(),
            found = linter.sink.len() - before,
            "lint rule finished"
        );
    }
    linter.sink.into_sorted()
}

struct Linter<'a> {
    result: &'a ParseResult,
    config: &'a LintConfig,
    sink: DiagnosticSink,
}

impl Linter<'_> {
    const fn tree(&self) -> &SyntaxTree {
        &self.result.tree
    }

    fn report(&mut self, rule: LintRule, severity: Severity, span: Span, message: String) {
        self.sink
            .push(severity, DiagnosticCode::Lint(rule), span, message);
    }

    fn declarations(&self) -> impl Iterator<Item = (NodeId, &Declaration)> + '_ {
        let tree = self.tree();
        tree.descendants(tree.root())
            .filter_map(move |id| match tree.kind(id) {
                NodeKind::Declaration(decl) => Some((id, decl)),
                _ => None,
            })
    }

    fn single_class_per_file(&mut self, severity: Severity) {
        let classes: Vec<(NodeId, Option<String>)> = self
            .declarations()
            .filter_map(|(id, decl)| match decl {
                Declaration::Class { name, .. } | Declaration::Enum { name, .. } => {
                    Some((id, name.clone()))
                }
                _ => None,
            })
            .collect();
        let Some((_, first)) = classes.first() else {
            return;
        };
        let first = first.clone().unwrap_or_default();
        for (id, name) in classes.iter().skip(1) {
            let span = self.tree().span(*id);
            let message = format!(
                "'{}' is a second class-like declaration in this file (first is '{first}')",
                name.as_deref().unwrap_or("?")
            );
            self.report(LintRule::SingleClassPerFile, severity, span, message);
        }
    }

    fn enforce_namespace(&mut self, severity: Severity) {
        let tree = self.tree();
        let namespaces: Vec<(NodeId, bool)> = tree
            .descendants(tree.root())
            .filter_map(|id| match tree.kind(id) {
                NodeKind::Namespace { braced, .. } => Some((id, *braced)),
                _ => None,
            })
            .collect();
        if namespaces.is_empty() {
            self.report(
                LintRule::EnforceNamespace,
                severity,
                Span::empty(0),
                "file declares no namespace".to_string(),
            );
            return;
        }
        if self.config.enforce_namespace.allow_braced {
            return;
        }
        for (id, braced) in namespaces {
            if braced {
                let span = self.tree().span(id);
                self.report(
                    LintRule::EnforceNamespace,
                    severity,
                    span,
                    "braced namespace declarations are not allowed".to_string(),
                );
            }
        }
    }

    fn disallow_debug_functions(&mut self, severity: Severity) {
        let tree = self.tree();
        let functions = &self.config.disallow_debug_functions.functions;
        let calls: Vec<(Span, String)> = tree
            .descendants(tree.root())
            .filter(|&id| tree.kind(id) == &NodeKind::Call)
            .filter_map(|id| {
                let callee = tree.child_nodes(id).next()?;
                let NodeKind::Name { name } = tree.kind(callee) else {
                    return None;
                };
                let bare = name.trim_start_matches('\\');
                functions
                    .iter()
                    .any(|f| f.eq_ignore_ascii_case(bare))
                    .then(|| (tree.span(id), bare.to_string()))
            })
            .collect();
        for (span, name) in calls {
            self.report(
                LintRule::DisallowDebugFunctions,
                severity,
                span,
                format!("call to debug function '{name}'"),
            );
        }
    }

    fn line_length(&mut self, severity: Severity) {
        let max = self.config.line_length.max;
        let mut findings = Vec::new();
        let mut offset = 0;
        for line in self.result.source.text().split_inclusive('\n') {
            let content = line.trim_end_matches(['\n', '\r']);
            let length = content.chars().count();
            if length > max {
                findings.push((Span::new(offset, offset + content.len()), length));
            }
            offset += line.len();
        }
        for (span, length) in findings {
            self.report(
                LintRule::LineLength,
                severity,
                span,
                format!("line is {length} characters long (max {max})"),
            );
        }
    }

    fn consecutive_blank_lines(&mut self, severity: Severity) {
        let max = self.config.consecutive_blank_lines.max;
        let mut findings = Vec::new();
        let mut run = 0;
        let mut offset = 0;
        for line in self.result.source.text().split_inclusive('\n') {
            if line.trim().is_empty() {
                run += 1;
                // Report once per run, on the first line over the limit.
                if run == max + 1 {
                    findings.push(Span::new(offset, offset + line.len()));
                }
            } else {
                run = 0;
            }
            offset += line.len();
        }
        for span in findings {
            self.report(
                LintRule::ConsecutiveBlankLines,
                severity,
                span,
                format!("more than {max} consecutive blank lines"),
            );
        }
    }

    fn class_member_order(&mut self, severity: Severity) {
        let tree = self.tree();
        let order = &self.config.class_member_order.order;
        let mut findings = Vec::new();
        let lists = tree
            .descendants(tree.root())
            .filter(|&id| tree.kind(id) == &NodeKind::MemberList);
        for list in lists {
            let mut furthest: Option<usize> = None;
            for member in tree.child_nodes(list) {
                let Some((group, name)) = member_group(tree.kind(member)) else {
                    continue;
                };
                let Some(rank) = order.iter().position(|g| *g == group) else {
                    continue;
                };
                match furthest {
                    Some(seen) if rank < seen => {
                        let message = format!(
                            "{} '{name}' should be declared before {}",
                            group.label(),
                            order[seen].label()
                        );
                        findings.push((tree.span(member), message));
                    }
                    _ => furthest = Some(rank),
                }
            }
        }
        for (span, message) in findings {
            self.report(LintRule::ClassMemberOrder, severity, span, message);
        }
    }
}

fn first_name(names: &[String]) -> String {
    names.first().cloned().unwrap_or_default()
}

fn member_group(kind: &NodeKind) -> Option<(MemberGroup, String)> {
    match kind {
        NodeKind::Use { imports } => Some((MemberGroup::TraitUses, first_name(imports))),
        NodeKind::Declaration(decl) => match decl {
            Declaration::EnumCase { name } => Some((MemberGroup::Cases, name.clone())),
            Declaration::Constant { names, .. } => Some((MemberGroup::Constants, first_name(names))),
            Declaration::Property { names, .. } => {
                Some((MemberGroup::Properties, format!("${}", first_name(names))))
            }
            Declaration::Method { name, .. } => {
                Some((MemberGroup::Methods, name.clone().unwrap_or_default()))
            }
            _ => None,
        },
        _ => None,
    }
}
