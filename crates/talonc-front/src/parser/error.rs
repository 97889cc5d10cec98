//! The closed parse-error taxonomy. Parse errors abort the current parse;
//! they never accumulate the way type-checker diagnostics do.

use std::fmt;

use talonc_base::{SourceMap, SourceRange};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    UnexpectedToken { found: String, range: SourceRange },
    ExpectedToken { expected: String, found: String, message: String, range: SourceRange },
    ExpectedIdentifier { range: SourceRange },
    ExpectedType { range: SourceRange },
    UnderscoreArgumentLabelNotAllowed { range: SourceRange },
}

impl ParseError {
    pub fn range(&self) -> SourceRange {
        match self {
            ParseError::UnexpectedToken { range, .. }
            | ParseError::ExpectedToken { range, .. }
            | ParseError::ExpectedIdentifier { range }
            | ParseError::ExpectedType { range }
            | ParseError::UnderscoreArgumentLabelNotAllowed { range } => *range,
        }
    }

    fn message(&self) -> String {
        match self {
            ParseError::UnexpectedToken { found, .. } => format!("unexpected token: {found}"),
            ParseError::ExpectedToken { expected, found, message, .. } => {
                format!("expected {expected}, found {found}: {message}")
            }
            ParseError::ExpectedIdentifier { .. } => "expected an identifier".to_string(),
            ParseError::ExpectedType { .. } => "expected a type".to_string(),
            ParseError::UnderscoreArgumentLabelNotAllowed { .. } => {
                "'_' is not a valid argument label".to_string()
            }
        }
    }

    /// Render using `line:column: message`.
    pub fn render(&self, source_map: &SourceMap) -> String {
        let loc = source_map.locate(self.range().start);
        format!("{}:{}: {}", loc.line, loc.column, self.message())
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}..{}", self.message(), self.range().start, self.range().end)
    }
}

impl std::error::Error for ParseError {}
