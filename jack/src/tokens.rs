//! Tokens

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub span: Span,
    pub kind: TokenKind,
}

impl Token {
    /// Text of the token, sliced from the source it was lexed from.
    ///
    /// String constants are returned without their surrounding quotes.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        let fragment = self.span.fragment(source);
        match self.kind {
            TokenKind::String => &fragment[1..fragment.len() - 1],
            _ => fragment,
        }
    }

    #[inline]
    pub fn class(&self) -> TokenClass {
        self.kind.class()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Reserved identifiers
    Keyword(Keyword),
    /// Single character symbol
    Symbol(Punct),
    Ident,
    /// Number literal
    Integer,
    /// String literal, including the quotes
    String,
}

impl TokenKind {
    #[rustfmt::skip]
    pub fn class(&self) -> TokenClass {
        match self {
            Self::Keyword(_) => TokenClass::Keyword,
            Self::Symbol(_)  => TokenClass::Symbol,
            Self::Ident      => TokenClass::Identifier,
            Self::Integer    => TokenClass::IntegerConstant,
            Self::String     => TokenClass::StringConstant,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Keyword(keyword) => write!(f, "keyword '{keyword}'"),
            Self::Symbol(punct) => write!(f, "symbol '{punct}'"),
            _ => write!(f, "{}", self.class()),
        }
    }
}

/// Coarse token categories, without the token's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Keyword,
    Symbol,
    Identifier,
    IntegerConstant,
    StringConstant,
}

impl TokenClass {
    /// Element name used by the XML token dump.
    #[rustfmt::skip]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Keyword         => "keyword",
            Self::Symbol          => "symbol",
            Self::Identifier      => "identifier",
            Self::IntegerConstant => "integerConstant",
            Self::StringConstant  => "stringConstant",
        }
    }
}

impl fmt::Display for TokenClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[rustfmt::skip]
pub enum Punct {
    LeftBrace,    // {
    RightBrace,   // }
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]
    Dot,          // .
    Comma,        // ,
    Semicolon,    // ;
    Plus,         // +
    Minus,        // -
    Star,         // *
    Slash,        // /
    Amp,          // &
    Pipe,         // |
    Less,         // <
    Greater,      // >
    Eq,           // =
    Tilde,        // ~
}

impl Punct {
    #[rustfmt::skip]
    pub fn parse(c: char) -> Option<Self> {
        match c {
            '{' => Some(Self::LeftBrace),
            '}' => Some(Self::RightBrace),
            '(' => Some(Self::LeftParen),
            ')' => Some(Self::RightParen),
            '[' => Some(Self::LeftBracket),
            ']' => Some(Self::RightBracket),
            '.' => Some(Self::Dot),
            ',' => Some(Self::Comma),
            ';' => Some(Self::Semicolon),
            '+' => Some(Self::Plus),
            '-' => Some(Self::Minus),
            '*' => Some(Self::Star),
            '/' => Some(Self::Slash),
            '&' => Some(Self::Amp),
            '|' => Some(Self::Pipe),
            '<' => Some(Self::Less),
            '>' => Some(Self::Greater),
            '=' => Some(Self::Eq),
            '~' => Some(Self::Tilde),
            _ => None,
        }
    }

    #[rustfmt::skip]
    pub fn as_char(&self) -> char {
        match self {
            Self::LeftBrace    => '{',
            Self::RightBrace   => '}',
            Self::LeftParen    => '(',
            Self::RightParen   => ')',
            Self::LeftBracket  => '[',
            Self::RightBracket => ']',
            Self::Dot          => '.',
            Self::Comma        => ',',
            Self::Semicolon    => ';',
            Self::Plus         => '+',
            Self::Minus        => '-',
            Self::Star         => '*',
            Self::Slash        => '/',
            Self::Amp          => '&',
            Self::Pipe         => '|',
            Self::Less         => '<',
            Self::Greater      => '>',
            Self::Eq           => '=',
            Self::Tilde        => '~',
        }
    }
}

impl fmt::Display for Punct {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Reserved keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[rustfmt::skip]
pub enum Keyword {
    // ------------------------------------------------------------------------
    // Declarations
    Class,
    Constructor,
    Function,
    Method,
    Field,
    Static,
    Var,

    // ------------------------------------------------------------------------
    // Types
    Int,
    Char,
    Boolean,
    Void,

    // ------------------------------------------------------------------------
    // Constants
    True,
    False,
    Null,
    This,

    // ------------------------------------------------------------------------
    // Statements
    Let,
    Do,
    If,
    Else,
    While,
    Return,
}

impl Keyword {
    #[rustfmt::skip]
    pub fn parse(text: impl AsRef<str>) -> Option<Self> {
        match text.as_ref() {
            "class"       => Some(Self::Class),
            "constructor" => Some(Self::Constructor),
            "function"    => Some(Self::Function),
            "method"      => Some(Self::Method),
            "field"       => Some(Self::Field),
            "static"      => Some(Self::Static),
            "var"         => Some(Self::Var),
            // ----------------------------------------------------------------
            "int"         => Some(Self::Int),
            "char"        => Some(Self::Char),
            "boolean"     => Some(Self::Boolean),
            "void"        => Some(Self::Void),
            // ----------------------------------------------------------------
            "true"        => Some(Self::True),
            "false"       => Some(Self::False),
            "null"        => Some(Self::Null),
            "this"        => Some(Self::This),
            // ----------------------------------------------------------------
            "let"         => Some(Self::Let),
            "do"          => Some(Self::Do),
            "if"          => Some(Self::If),
            "else"        => Some(Self::Else),
            "while"       => Some(Self::While),
            "return"      => Some(Self::Return),
            // ----------------------------------------------------------------
            _ => None,
        }
    }

    #[rustfmt::skip]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Class       => "class",
            Self::Constructor => "constructor",
            Self::Function    => "function",
            Self::Method      => "method",
            Self::Field       => "field",
            Self::Static      => "static",
            Self::Var         => "var",
            Self::Int         => "int",
            Self::Char        => "char",
            Self::Boolean     => "boolean",
            Self::Void        => "void",
            Self::True        => "true",
            Self::False       => "false",
            Self::Null        => "null",
            Self::This        => "this",
            Self::Let         => "let",
            Self::Do          => "do",
            Self::If          => "if",
            Self::Else        => "else",
            Self::While       => "while",
            Self::Return      => "return",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chunk of source code, encoded as byte offset and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub index: u32,
    pub size: u32,
}

impl Span {
    pub fn new(index: u32, size: u32) -> Self {
        Self { index, size }
    }

    #[inline]
    pub fn fragment<'a>(&self, text: &'a str) -> &'a str {
        &text[(self.index as usize)..(self.index as usize + self.size as usize)]
    }

    /// One-based line number where the span starts.
    pub fn line_number(&self, text: &str) -> usize {
        let end = (self.index as usize).min(text.len());
        text.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
    }

    /// The line of source text containing the start of the span,
    /// without its line terminator.
    pub fn surrounding_line<'a>(&self, text: &'a str) -> (&'a str, Span) {
        let index = (self.index as usize).min(text.len());

        let start = text[..index].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let end = text[index..]
            .find('\n')
            .map(|i| index + i)
            .unwrap_or(text.len());

        // Windows :(
        let line = text[start..end].trim_end_matches('\r');

        let line_span = Span {
            index: start as u32,
            size: line.len() as u32,
        };

        (line, line_span)
    }
}
