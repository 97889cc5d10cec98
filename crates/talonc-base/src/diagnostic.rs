//! Diagnostics: the accumulator of errors/warnings/notes produced across the
//! pipeline's phases, and the closed category taxonomy they carry.
//!
//! Diagnostics never abort a phase by themselves -- a phase keeps running and
//! annotating what it can. Only a handful of conditions (an unrecognized
//! character in the lexer, a parse failure, an unaddressable lowering target)
//! are hard stops, and those are represented as `Result` errors elsewhere,
//! not as diagnostics.

use crate::span::{SourceMap, SourceRange};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        };
        f.write_str(s)
    }
}

/// The closed diagnostic taxonomy from the type checker and the NIR
/// unused-variable analysis. Each variant owns exactly the payload needed
/// to render its message; nothing here is free-form text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    UnknownType,
    UndefinedVariable { name: String },
    TypeMismatch { expected: String, actual: String },
    InvalidOperation { op: String, ty: String },
    InvalidBinaryOperands { op: String, lhs: String, rhs: String },
    InvalidUnaryOperand { op: String, ty: String },
    NonBooleanCondition { ty: String },
    NotCallable { ty: String },
    ArgumentCountMismatch { expected: usize, actual: usize },
    MissingArgumentLabel { expected: String },
    UnexpectedArgumentLabel { got: String },
    IncorrectArgumentLabel { expected: String, got: String },
    ArgumentLabelOrderMismatch { expected: Vec<String>, got: Vec<String> },
    CannotTakeAddress { ty: String },
    CannotAssign { ty: String },
    CannotDereference { ty: String },
    InvalidMemberAccess { ty: String },
    UnknownMember { ty: String, member: String },
    MissingInitializer { name: String },
    MissingFieldType { name: String },
    VariadicArgument { ty: String },
    UninitializedVariable { name: String },
    WriteOnlyVariable { name: String, store_count: usize },
    UnusedVariableSummary { function: String, uninitialized: usize, write_only: usize },
}

impl Category {
    /// Default severity for a category when not overridden by the caller.
    pub fn default_severity(&self) -> Severity {
        match self {
            Category::VariadicArgument { .. } | Category::UnusedVariableSummary { .. } => Severity::Note,
            Category::UninitializedVariable { .. } | Category::WriteOnlyVariable { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// The bracketed tag in the wire format, e.g. `type-mismatch`.
    pub fn tag(&self) -> &'static str {
        match self {
            Category::UnknownType => "unknown-type",
            Category::UndefinedVariable { .. } => "undefined-variable",
            Category::TypeMismatch { .. } => "type-mismatch",
            Category::InvalidOperation { .. } => "invalid-operation",
            Category::InvalidBinaryOperands { .. } => "invalid-binary-operands",
            Category::InvalidUnaryOperand { .. } => "invalid-unary-operand",
            Category::NonBooleanCondition { .. } => "non-boolean-condition",
            Category::NotCallable { .. } => "not-callable",
            Category::ArgumentCountMismatch { .. } => "argument-count-mismatch",
            Category::MissingArgumentLabel { .. } => "missing-argument-label",
            Category::UnexpectedArgumentLabel { .. } => "unexpected-argument-label",
            Category::IncorrectArgumentLabel { .. } => "incorrect-argument-label",
            Category::ArgumentLabelOrderMismatch { .. } => "argument-label-order-mismatch",
            Category::CannotTakeAddress { .. } => "cannot-take-address",
            Category::CannotAssign { .. } => "cannot-assign",
            Category::CannotDereference { .. } => "cannot-dereference",
            Category::InvalidMemberAccess { .. } => "invalid-member-access",
            Category::UnknownMember { .. } => "unknown-member",
            Category::MissingInitializer { .. } => "missing-initializer",
            Category::MissingFieldType { .. } => "missing-field-type",
            Category::VariadicArgument { .. } => "variadic-argument",
            Category::UninitializedVariable { .. } => "uninitialized",
            Category::WriteOnlyVariable { .. } => "write-only",
            Category::UnusedVariableSummary { .. } => "unused-variable-summary",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Category::UnknownType => "unknown type".to_string(),
            Category::UndefinedVariable { name } => format!("undefined variable '{name}'"),
            Category::TypeMismatch { expected, actual } => {
                format!("expected type '{expected}', found '{actual}'")
            }
            Category::InvalidOperation { op, ty } => format!("invalid operation '{op}' on type '{ty}'"),
            Category::InvalidBinaryOperands { op, lhs, rhs } => {
                format!("invalid operands to '{op}': '{lhs}' and '{rhs}'")
            }
            Category::InvalidUnaryOperand { op, ty } => format!("invalid operand to '{op}': '{ty}'"),
            Category::NonBooleanCondition { ty } => format!("condition must be 'Bool', found '{ty}'"),
            Category::NotCallable { ty } => format!("value of type '{ty}' is not callable"),
            Category::ArgumentCountMismatch { expected, actual } => {
                format!("expected {expected} argument(s), found {actual}")
            }
            Category::MissingArgumentLabel { expected } => format!("missing argument label '{expected}'"),
            Category::UnexpectedArgumentLabel { got } => format!("unexpected argument label '{got}'"),
            Category::IncorrectArgumentLabel { expected, got } => {
                format!("incorrect argument label, expected '{expected}', found '{got}'")
            }
            Category::ArgumentLabelOrderMismatch { expected, got } => format!(
                "argument labels out of order, expected [{}], found [{}]",
                expected.join(", "),
                got.join(", ")
            ),
            Category::CannotTakeAddress { ty } => format!("cannot take the address of a value of type '{ty}'"),
            Category::CannotAssign { ty } => format!("cannot assign to a value of type '{ty}'"),
            Category::CannotDereference { ty } => format!("cannot dereference a value of type '{ty}'"),
            Category::InvalidMemberAccess { ty } => format!("type '{ty}' has no members"),
            Category::UnknownMember { ty, member } => format!("type '{ty}' has no member '{member}'"),
            Category::MissingInitializer { name } => format!("field '{name}' requires an initializer or type"),
            Category::MissingFieldType { name } => format!("field '{name}' requires a declared type"),
            Category::VariadicArgument { ty } => format!("argument of type '{ty}' passed to variadic parameter"),
            Category::UninitializedVariable { name } => {
                format!("variable '{name}' is never read or written")
            }
            Category::WriteOnlyVariable { name, store_count } => {
                format!("variable '{name}' is written {store_count} time(s) but never read")
            }
            Category::UnusedVariableSummary { function, uninitialized, write_only } => format!(
                "function '{function}': {uninitialized} uninitialized, {write_only} write-only variable(s)"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub range: SourceRange,
    pub severity: Severity,
    pub category: Category,
}

impl Diagnostic {
    pub fn new(range: SourceRange, category: Category) -> Self {
        let severity = category.default_severity();
        Self { range, severity, category }
    }

    /// Render per the wire format: `"<line>:<col>-<endcol>: <severity> [<category>]: <message>"`.
    /// Ranges that span multiple lines expand the end side to `line:col`.
    pub fn render(&self, source_map: &SourceMap) -> String {
        let (start, end) = source_map.locate_range(self.range);
        let end_part = if start.line == end.line {
            format!("{}", end.column)
        } else {
            format!("{}:{}", end.line, end.column)
        };
        format!(
            "{}:{}-{}: {} [{}]: {}",
            start.line,
            start.column,
            end_part,
            self.severity,
            self.category.tag(),
            self.category.message()
        )
    }
}

/// Accumulates diagnostics in source order across one phase (or the whole run).
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, range: SourceRange, category: Category) {
        self.items.push(Diagnostic::new(range, category));
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn render_all(&self, source_map: &SourceMap) -> Vec<String> {
        self.items.iter().map(|d| d.render(source_map)).collect()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }
}
