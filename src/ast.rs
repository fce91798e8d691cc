//! Node kinds of the PHP syntax tree.
//!
//! Structure lives in [`crate::tree::SyntaxTree`]; this module only
//! describes what each node is. Payloads carry the facts a downstream
//! consumer wants without re-reading tokens (names, modifiers, operators).

use crate::diagnostic::{DiagnosticCode, DiagnosticId};
use crate::token::Operator;

/// Kind and payload of a syntax node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Root. Spans the whole buffer and always ends with the `Eof` token.
    Program,
    /// Run of `InlineHtml`, `<?php` and `?>` tokens at statement level.
    InlineHtml,
    /// `namespace A\B;` or `namespace A\B { ... }`.
    Namespace { name: Option<String>, braced: bool },
    /// `use A\B, C\D as E;`
    Use { imports: Vec<String> },
    Declaration(Declaration),
    /// `{ ... }` body of a class-like declaration.
    MemberList,
    ParameterList,
    Parameter(Parameter),
    Type(TypeShape),
    /// `{ ... }` statement block.
    Block,

    EmptyStatement,
    ExpressionStatement,
    Echo,
    Return,
    If,
    ElseIf,
    Else,
    While,
    Foreach,
    For,
    /// `break` or `continue`, with an optional level.
    Jump { keyword: JumpKind },

    Literal(LiteralKind),
    Variable { name: String },
    /// Possibly qualified name: `Foo`, `\App\Foo`, `self`, `strlen`.
    Name { name: String },
    /// `[...]` or `array(...)`.
    Array,
    /// `value`, `key => value` or `...spread` inside an array.
    ArrayElement,
    Assignment { op: Operator },
    Binary { op: Operator },
    Unary { op: UnaryOp },
    /// `$x instanceof Foo`.
    Instanceof,
    /// `(int) $x`, with the cast type lowercased.
    Cast { ty: String },
    /// `a ? b : c` and the short form `a ?: c`.
    Ternary,
    Call,
    New,
    MemberAccess { name: Option<String>, nullsafe: bool },
    /// `A::b`, `A::$b`, `A::b()` target; `member` is the text after `::`.
    StaticAccess { member: Option<String> },
    Index,
    Match,
    MatchArm { is_default: bool },
    ArrowFunction,
    Closure,
    Parenthesized,
    Throw,
    ArgumentList,
    /// Call argument, `name` is set for named arguments.
    Argument { name: Option<String> },

    /// Region that could not be parsed as expected. `diagnostic` is the
    /// id of the report explaining it; children are the tokens and nodes
    /// consumed while recovering.
    Error {
        code: DiagnosticCode,
        diagnostic: DiagnosticId,
    },
}

impl NodeKind {
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Short name used by tree dumps and tests.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Program => "Program",
            Self::InlineHtml => "InlineHtml",
            Self::Namespace { .. } => "Namespace",
            Self::Use { .. } => "Use",
            Self::Declaration(decl) => decl.name(),
            Self::MemberList => "MemberList",
            Self::ParameterList => "ParameterList",
            Self::Parameter(_) => "Parameter",
            Self::Type(_) => "Type",
            Self::Block => "Block",
            Self::EmptyStatement => "EmptyStatement",
            Self::ExpressionStatement => "ExpressionStatement",
            Self::Echo => "Echo",
            Self::Return => "Return",
            Self::If => "If",
            Self::ElseIf => "ElseIf",
            Self::Else => "Else",
            Self::While => "While",
            Self::Foreach => "Foreach",
            Self::For => "For",
            Self::Jump { .. } => "Jump",
            Self::Literal(_) => "Literal",
            Self::Variable { .. } => "Variable",
            Self::Name { .. } => "Name",
            Self::Array => "Array",
            Self::ArrayElement => "ArrayElement",
            Self::Assignment { .. } => "Assignment",
            Self::Binary { .. } => "Binary",
            Self::Unary { .. } => "Unary",
            Self::Instanceof => "Instanceof",
            Self::Cast { .. } => "Cast",
            Self::Ternary => "Ternary",
            Self::Call => "Call",
            Self::New => "New",
            Self::MemberAccess { .. } => "MemberAccess",
            Self::StaticAccess { .. } => "StaticAccess",
            Self::Index => "Index",
            Self::Match => "Match",
            Self::MatchArm { .. } => "MatchArm",
            Self::ArrowFunction => "ArrowFunction",
            Self::Closure => "Closure",
            Self::Parenthesized => "Parenthesized",
            Self::Throw => "Throw",
            Self::ArgumentList => "ArgumentList",
            Self::Argument { .. } => "Argument",
            Self::Error { .. } => "Error",
        }
    }
}

/// One node kind for every declaration shape, discriminated by payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// Class, interface or trait.
    Class {
        kind: ClassKind,
        name: Option<String>,
        modifiers: Modifiers,
        extends: Vec<String>,
        implements: Vec<String>,
    },
    /// `enum Name: backing { ... }`.
    Enum {
        name: Option<String>,
        backing: Option<String>,
    },
    Function { name: Option<String>, by_ref: bool },
    Method {
        name: Option<String>,
        modifiers: Modifiers,
    },
    /// Typed or untyped property, possibly declaring several names.
    Property {
        modifiers: Modifiers,
        names: Vec<String>,
    },
    /// Class constant list.
    Constant {
        modifiers: Modifiers,
        names: Vec<String>,
    },
    /// `case Name [= value]` or a bare `Name` in an enum body.
    EnumCase { name: String },
}

impl Declaration {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Class {
                kind: ClassKind::Class,
                ..
            } => "ClassDeclaration",
            Self::Class {
                kind: ClassKind::Interface,
                ..
            } => "InterfaceDeclaration",
            Self::Class {
                kind: ClassKind::Trait,
                ..
            } => "TraitDeclaration",
            Self::Enum { .. } => "EnumDeclaration",
            Self::Function { .. } => "FunctionDeclaration",
            Self::Method { .. } => "MethodDeclaration",
            Self::Property { .. } => "PropertyDeclaration",
            Self::Constant { .. } => "ConstantDeclaration",
            Self::EnumCase { .. } => "EnumCase",
        }
    }

    /// True for class, interface, trait and enum declarations.
    #[must_use]
    pub const fn is_class_like(&self) -> bool {
        matches!(self, Self::Class { .. } | Self::Enum { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
    Trait,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

/// Declaration modifiers in any order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Modifiers {
    pub visibility: Option<Visibility>,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_readonly: bool,
}

impl Modifiers {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.visibility.is_none()
            && !self.is_static
            && !self.is_abstract
            && !self.is_final
            && !self.is_readonly
    }
}

/// Function or method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Parameter {
    pub name: Option<String>,
    /// Visibility or `readonly` on a constructor parameter.
    pub modifiers: Modifiers,
    pub by_ref: bool,
    pub variadic: bool,
}

impl Parameter {
    /// Constructor property promotion: a parameter that also declares a
    /// property.
    #[must_use]
    pub const fn is_promoted(&self) -> bool {
        self.modifiers.visibility.is_some() || self.modifiers.is_readonly
    }
}

/// Shape of a type declaration. Member types are child nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeShape {
    /// `int`, `?`-less class name, `self`, `static`.
    Named { name: String },
    /// `?T`.
    Nullable,
    /// `A|B`.
    Union,
    /// `A&B`.
    Intersection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralKind {
    Int,
    Float,
    String { interpolated: bool },
    Heredoc { nowdoc: bool },
    Bool,
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
    BitNot,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
    /// `@expr`.
    Silence,
    /// `&$x` in array elements and arguments.
    Reference,
    /// `...$x` in arguments.
    Spread,
    Print,
    Clone,
    Include,
    Require,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JumpKind {
    Break,
    Continue,
}
