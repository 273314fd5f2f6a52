//! Result and errors.
use std::{
    fmt::{self, Display, Formatter},
    io,
    string::FromUtf8Error,
};

use smol_str::SmolStr;

use crate::tokens::Span;

pub type JackResult<T> = std::result::Result<T, JackError>;

#[derive(Debug)]
pub enum JackError {
    /// Compilation failure that can be traced back to a location in the source.
    Source(SourceError),
    /// Configuration file could not be loaded.
    Config(String),
    Io(io::Error),
    Utf8(FromUtf8Error),
    Fmt(fmt::Error),
}

impl JackError {
    /// The source error, when the failure originated in the compiled text.
    pub fn as_source(&self) -> Option<&SourceError> {
        match self {
            Self::Source(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for JackError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source(err) => write!(f, "{err}"),
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::Utf8(err) => write!(f, "source is not valid text: {err}"),
            Self::Fmt(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for JackError {}

impl From<SourceError> for JackError {
    fn from(err: SourceError) -> Self {
        JackError::Source(err)
    }
}

impl From<io::Error> for JackError {
    fn from(err: io::Error) -> Self {
        JackError::Io(err)
    }
}

impl From<FromUtf8Error> for JackError {
    fn from(err: FromUtf8Error) -> Self {
        JackError::Utf8(err)
    }
}

impl From<fmt::Error> for JackError {
    fn from(err: fmt::Error) -> Self {
        JackError::Fmt(err)
    }
}

/// Error located in the source text.
#[derive(Debug, Clone)]
pub struct SourceError {
    pub kind: ErrorKind,
    pub span: Span,
    /// One-based line number of the offending token.
    pub line: usize,
    /// Source line containing the offending token.
    pub line_text: String,
    /// Column of the token within `line_text`, zero-based.
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No token pattern matches at the current position.
    Lexical,
    /// Current token does not fit the grammar at a decision point.
    Syntax { found: String, expected: String },
    /// Variable reference which resolves to no symbol in either scope.
    UndefinedSymbol(SmolStr),
    /// Name declared twice in the same scope.
    DuplicateSymbol(SmolStr),
    /// Integer constant outside the range of the target machine word.
    IntegerOverflow(SmolStr),
    /// String constant whose length does not fit in an integer constant.
    StringTooLong(usize),
    /// Scope already holds the maximum number of symbols of this kind.
    TooManySymbols(SmolStr),
}

impl SourceError {
    pub fn new(source_code: &str, span: Span, kind: ErrorKind) -> Self {
        let (line_text, line_span) = span.surrounding_line(source_code);
        let column = (span.index.saturating_sub(line_span.index)) as usize;

        Self {
            kind,
            span,
            line: span.line_number(source_code),
            line_text: line_text.to_owned(),
            column,
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexical => write!(f, "lexical error: unrecognised character"),
            Self::Syntax { found, expected } => {
                write!(f, "syntax error: found {found}, expected {expected}")
            }
            Self::UndefinedSymbol(name) => write!(f, "undefined symbol '{name}'"),
            Self::DuplicateSymbol(name) => {
                write!(f, "symbol '{name}' is already defined in this scope")
            }
            Self::IntegerOverflow(text) => {
                write!(f, "integer constant {text} exceeds the maximum of 32767")
            }
            Self::StringTooLong(len) => {
                write!(f, "string constant of length {len} exceeds the maximum of 32767")
            }
            Self::TooManySymbols(name) => {
                write!(f, "too many symbols of the same kind to define '{name}'")
            }
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "line {}: {}", self.line, self.kind)?;
        writeln!(f, "    {}", self.line_text)?;
        write!(
            f,
            "    {:>width$}",
            "^".repeat(self.span.size.max(1) as usize),
            width = self.column + self.span.size.max(1) as usize
        )
    }
}

impl std::error::Error for SourceError {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_source_error_location() {
        const CODE: &str = "class Main {\n  field int x y;\n}";

        let span = Span::new(27, 1);
        assert_eq!(span.fragment(CODE), "y");

        let err = SourceError::new(
            CODE,
            span,
            ErrorKind::Syntax {
                found: "identifier 'y'".to_owned(),
                expected: "one of [',', ';']".to_owned(),
            },
        );

        assert_eq!(err.line, 2);
        assert_eq!(err.column, 14);
        assert_eq!(err.line_text, "  field int x y;");
        assert_eq!(
            err.to_string(),
            "line 2: syntax error: found identifier 'y', expected one of [',', ';']\n    \
             \x20 field int x y;\n                  ^"
        );
    }
}
