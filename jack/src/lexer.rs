//! Lexical analysis
use log::trace;

use crate::{
    error::{ErrorKind, JackError, JackResult, SourceError},
    tokens::{Keyword, Punct, Span, Token, TokenKind},
};

/// Pattern classes, in declaration order.
///
/// At each position every rule is tried, and the longest match wins.
/// Ties are broken by the order of this table.
#[rustfmt::skip]
const RULES: &[(Rule, fn(&str) -> usize)] = &[
    (Rule::Ident,        match_ident),
    (Rule::Integer,      match_integer),
    (Rule::Whitespace,   match_whitespace),
    (Rule::Symbol,       match_symbol),
    (Rule::String,       match_string),
    (Rule::LineComment,  match_line_comment),
    (Rule::BlockComment, match_block_comment),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Ident,
    Integer,
    Whitespace,
    Symbol,
    String,
    LineComment,
    BlockComment,
}

impl Rule {
    /// Trivia is consumed by the lexer and never yielded.
    fn is_trivia(&self) -> bool {
        matches!(self, Rule::Whitespace | Rule::LineComment | Rule::BlockComment)
    }
}

pub struct Lexer<'a> {
    /// Keep reference to the source so the parser can
    /// slice fragments from it.
    original: &'a str,
    /// Absolute byte position of the next unconsumed character.
    offset: usize,
    /// Token that was peeked, but not consumed yet.
    peeked: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(source_code: &'a str) -> Self {
        Self {
            original: source_code,
            offset: 0,
            peeked: None,
        }
    }

    /// Original source code that was passed in during construction.
    pub fn source_code(&self) -> &'a str {
        self.original
    }

    /// Indicates whether another token can be produced, after
    /// skipping whitespace and comments.
    ///
    /// # Errors
    ///
    /// Returns a lexical error if the remaining source starts
    /// with an unrecognised character.
    pub fn has_next(&mut self) -> JackResult<bool> {
        Ok(self.peek_token()?.is_some())
    }

    /// Consume and return the next token.
    ///
    /// Returns `None` at the end of the source.
    pub fn next_token(&mut self) -> JackResult<Option<Token>> {
        match self.peeked.take() {
            Some(token) => Ok(Some(token)),
            None => self.scan(),
        }
    }

    /// Return the next token without consuming it.
    pub fn peek_token(&mut self) -> JackResult<Option<&Token>> {
        if self.peeked.is_none() {
            self.peeked = self.scan()?;
        }
        Ok(self.peeked.as_ref())
    }

    /// Scan the source characters and construct the next token.
    ///
    /// Whitespace and comments are matched like any other token,
    /// then discarded.
    fn scan(&mut self) -> JackResult<Option<Token>> {
        while self.offset < self.original.len() {
            let rest = &self.original[self.offset..];

            let mut best: Option<(Rule, usize)> = None;
            for (rule, matcher) in RULES {
                let size = matcher(rest);
                if size > best.map(|(_, size)| size).unwrap_or(0) {
                    best = Some((*rule, size));
                }
            }

            let (rule, size) = match best {
                Some(best) => best,
                None => return Err(self.error()),
            };

            let span = Span::new(self.offset as u32, size as u32);
            self.offset += size;

            if rule.is_trivia() {
                continue;
            }

            let token = self.make_token(rule, span);
            trace!("{:?} {:?}", token.kind, span.fragment(self.original));
            return Ok(Some(token));
        }

        Ok(None)
    }

    fn make_token(&self, rule: Rule, span: Span) -> Token {
        let fragment = span.fragment(self.original);

        let kind = match rule {
            Rule::Ident => match Keyword::parse(fragment) {
                Some(keyword) => TokenKind::Keyword(keyword),
                None => TokenKind::Ident,
            },
            Rule::Integer => TokenKind::Integer,
            Rule::String => TokenKind::String,
            Rule::Symbol => {
                // Symbol rule only matches characters that parse.
                let c = fragment.chars().next().unwrap_or_default();
                match Punct::parse(c) {
                    Some(punct) => TokenKind::Symbol(punct),
                    None => unreachable!("symbol rule matched unknown character {c:?}"),
                }
            }
            Rule::Whitespace | Rule::LineComment | Rule::BlockComment => {
                unreachable!("trivia is never made into a token")
            }
        };

        Token { span, kind }
    }

    #[inline(never)]
    #[cold]
    fn error(&self) -> JackError {
        let size = self.original[self.offset..]
            .chars()
            .next()
            .map(char::len_utf8)
            .unwrap_or(0);
        let span = Span::new(self.offset as u32, size as u32);
        SourceError::new(self.original, span, ErrorKind::Lexical).into()
    }
}

fn match_ident(text: &str) -> usize {
    let bytes = text.as_bytes();
    if !bytes.first().copied().map(is_letter).unwrap_or(false) {
        return 0;
    }
    bytes.iter().take_while(|b| is_letter_or_digit(**b)).count()
}

fn match_integer(text: &str) -> usize {
    text.bytes().take_while(u8::is_ascii_digit).count()
}

fn match_whitespace(text: &str) -> usize {
    text.bytes().take_while(u8::is_ascii_whitespace).count()
}

fn match_symbol(text: &str) -> usize {
    match text.chars().next() {
        Some(c) if Punct::parse(c).is_some() => 1,
        _ => 0,
    }
}

/// A double quoted run of characters on a single line.
fn match_string(text: &str) -> usize {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'"') {
        return 0;
    }

    for (i, b) in bytes.iter().enumerate().skip(1) {
        match b {
            b'"' => return i + 1,
            b'\n' | b'\r' => return 0,
            b if !b.is_ascii() => return 0,
            _ => {}
        }
    }

    // Unterminated
    0
}

/// Comment line up to, but not including, the trailing newline.
fn match_line_comment(text: &str) -> usize {
    if !text.starts_with("//") {
        return 0;
    }
    text.find(is_newline).unwrap_or(text.len())
}

fn match_block_comment(text: &str) -> usize {
    if !text.starts_with("/*") {
        return 0;
    }
    match text[2..].find("*/") {
        Some(i) => i + 4,
        None => 0,
    }
}

fn is_newline(c: char) -> bool {
    matches!(c, '\r' | '\n')
}

fn is_letter(b: u8) -> bool {
    matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'_')
}

fn is_letter_or_digit(b: u8) -> bool {
    is_letter(b) || b.is_ascii_digit()
}

/// Convenience iterator over the remaining tokens.
///
/// Iteration stops after the first lexical error.
impl<'a> Iterator for Lexer<'a> {
    type Item = JackResult<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Ok(token) => token.map(Ok),
            Err(err) => {
                // Skip to the end so the iterator is fused.
                self.offset = self.original.len();
                Some(Err(err))
            }
        }
    }
}
