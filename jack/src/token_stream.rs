//! Parser cursor over the token stream.
use itertools::Itertools;

use crate::{
    error::{ErrorKind, JackError, JackResult, SourceError},
    lexer::Lexer,
    tokens::{Span, Token, TokenClass, TokenKind},
};

/// Holds the current token, with one token of look ahead.
///
/// Tokens are lazily lexed. Advancing the cursor or peeking
/// past the current token triggers the internal lexer.
///
/// The match primitives come in three flavours:
///
/// - `*_match` checks the current token without consuming anything.
/// - `assert_*` checks the current token, failing with a syntax error.
/// - `expect_*` advances to the next token, then asserts.
pub struct TokenStream<'a> {
    lexer: Lexer<'a>,
    /// Keep reference to the source so the parser can
    /// slice fragments from it.
    original: &'a str,
    /// `None` before the first advance, and at the end of the source.
    current: Option<Token>,
}

impl<'a> TokenStream<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self {
            original: lexer.source_code(),
            lexer,
            current: None,
        }
    }

    #[inline]
    pub fn current(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    /// Text of the given token, sliced from the source code.
    #[inline]
    pub fn text(&self, token: &Token) -> &'a str {
        token.text(self.original)
    }

    /// Move the cursor to the next token.
    ///
    /// The current token becomes `None` at the end of the source.
    pub fn advance(&mut self) -> JackResult<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    /// Return the token following the current one, without advancing.
    pub fn peek(&mut self) -> JackResult<Option<&Token>> {
        self.lexer.peek_token()
    }

    /// Current token belongs to one of the given classes.
    pub fn type_match(&self, classes: &[TokenClass]) -> bool {
        self.current
            .map(|token| classes.contains(&token.class()))
            .unwrap_or(false)
    }

    /// Current token is exactly one of the given kinds.
    pub fn token_match(&self, kinds: &[TokenKind]) -> bool {
        self.current
            .map(|token| kinds.contains(&token.kind))
            .unwrap_or(false)
    }

    pub fn assert_type(&self, classes: &[TokenClass]) -> JackResult<Token> {
        match self.current {
            Some(token) if classes.contains(&token.class()) => Ok(token),
            _ => Err(self.unexpected(expected_set(classes))),
        }
    }

    pub fn assert_token(&self, kinds: &[TokenKind]) -> JackResult<Token> {
        match self.current {
            Some(token) if kinds.contains(&token.kind) => Ok(token),
            _ => Err(self.unexpected(expected_set(kinds))),
        }
    }

    pub fn expect_type(&mut self, classes: &[TokenClass]) -> JackResult<Token> {
        self.advance()?;
        self.assert_type(classes)
    }

    pub fn expect_token(&mut self, kinds: &[TokenKind]) -> JackResult<Token> {
        self.advance()?;
        self.assert_token(kinds)
    }

    /// Build a syntax error that reports the current token.
    #[inline(never)]
    #[cold]
    pub fn unexpected(&self, expected: impl ToString) -> JackError {
        let (span, found) = match self.current {
            Some(token) => (
                token.span,
                format!("{} '{}'", token.class(), token.span.fragment(self.original)),
            ),
            None => (self.end_span(), "end of input".to_owned()),
        };

        let kind = ErrorKind::Syntax {
            found,
            expected: expected.to_string(),
        };
        SourceError::new(self.original, span, kind).into()
    }

    /// Build an error pointing at the given token.
    #[inline(never)]
    #[cold]
    pub fn error(&self, token: &Token, kind: ErrorKind) -> JackError {
        SourceError::new(self.original, token.span, kind).into()
    }

    fn end_span(&self) -> Span {
        Span::new(self.original.len() as u32, 0)
    }
}

fn expected_set<T: ToString>(items: &[T]) -> String {
    match items {
        [item] => item.to_string(),
        _ => format!("one of [{}]", items.iter().map(T::to_string).join(", ")),
    }
}
