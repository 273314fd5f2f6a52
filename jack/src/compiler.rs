//! Single pass compiler from Jack source to VM code.
//!
//! There is no syntax tree. Each grammar production validates its
//! tokens and emits instructions as a side effect of recognising them.
use log::debug;
use smol_str::SmolStr;

use crate::{
    error::{ErrorKind, JackResult},
    lexer::Lexer,
    symbol::{DefineError, Redefinition, SymbolKind, SymbolTable},
    token_stream::TokenStream,
    tokens::{Keyword, Punct, Token, TokenClass, TokenKind},
    vm::{ArithOp, Instr, Label, LabelKind, Segment},
};

/// Largest integer constant the target machine word can hold.
pub const MAX_INTEGER: u16 = 32767;

/// Compiler configuration.
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CompileConf {
    /// Handling of names declared twice in the same scope.
    pub redefinition: Redefinition,
}

/// Statements, dispatched by their leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Statement {
    Let,
    If,
    While,
    Do,
    Return,
}

impl Statement {
    fn from_keyword(keyword: Keyword) -> Option<Self> {
        match keyword {
            Keyword::Let => Some(Self::Let),
            Keyword::If => Some(Self::If),
            Keyword::While => Some(Self::While),
            Keyword::Do => Some(Self::Do),
            Keyword::Return => Some(Self::Return),
            _ => None,
        }
    }
}

/// Resolved callee of a subroutine call site.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CallTarget {
    /// `Name.sub(...)` where `Name` is not a variable, so it must be a
    /// class. Function or constructor call, no receiver.
    Unbound { class: SmolStr },
    /// `var.sub(...)` where `var` is a variable holding an object.
    BoundVariable {
        declared_type: SmolStr,
        segment: Segment,
        index: u16,
    },
    /// `sub(...)` is a method call on the current object.
    ImplicitSelf,
}

const LEFT_BRACE: TokenKind = TokenKind::Symbol(Punct::LeftBrace);
const RIGHT_BRACE: TokenKind = TokenKind::Symbol(Punct::RightBrace);
const LEFT_PAREN: TokenKind = TokenKind::Symbol(Punct::LeftParen);
const RIGHT_PAREN: TokenKind = TokenKind::Symbol(Punct::RightParen);
const LEFT_BRACKET: TokenKind = TokenKind::Symbol(Punct::LeftBracket);
const RIGHT_BRACKET: TokenKind = TokenKind::Symbol(Punct::RightBracket);
const DOT: TokenKind = TokenKind::Symbol(Punct::Dot);
const COMMA: TokenKind = TokenKind::Symbol(Punct::Comma);
const SEMICOLON: TokenKind = TokenKind::Symbol(Punct::Semicolon);
const EQ: TokenKind = TokenKind::Symbol(Punct::Eq);

/// Tokens that may name a variable's type.
const VAR_TYPES: &[TokenKind] = &[
    TokenKind::Keyword(Keyword::Int),
    TokenKind::Keyword(Keyword::Char),
    TokenKind::Keyword(Keyword::Boolean),
    TokenKind::Ident,
];

/// Tokens that may name a subroutine's return type.
const RETURN_TYPES: &[TokenKind] = &[
    TokenKind::Keyword(Keyword::Void),
    TokenKind::Keyword(Keyword::Int),
    TokenKind::Keyword(Keyword::Char),
    TokenKind::Keyword(Keyword::Boolean),
    TokenKind::Ident,
];

/// Compiles one class.
///
/// A compiler is single use. Each source file gets its own compiler,
/// with its own lexer and symbol table.
pub struct Compiler<'a> {
    stream: TokenStream<'a>,
    symbols: SymbolTable,
    class_name: SmolStr,
    /// Label counters. Never reset, so labels are unique for the whole class.
    if_count: u32,
    while_count: u32,
    /// Instructions emitted so far. Only handed out when the
    /// whole class compiled successfully.
    code: Vec<Instr>,
}

impl<'a> Compiler<'a> {
    pub fn new(lexer: Lexer<'a>, conf: CompileConf) -> Self {
        Self {
            stream: TokenStream::new(lexer),
            symbols: SymbolTable::new(conf.redefinition),
            class_name: SmolStr::default(),
            if_count: 0,
            while_count: 0,
            code: vec![],
        }
    }

    /// Compile the class, returning the generated VM code.
    ///
    /// On error no code is returned at all, never a truncated listing.
    pub fn compile(mut self) -> JackResult<Vec<Instr>> {
        self.compile_class()?;
        Ok(self.code)
    }

    #[inline]
    fn emit(&mut self, instr: Instr) {
        self.code.push(instr);
    }

    fn define(&mut self, name: &Token, ty: SmolStr, kind: SymbolKind) -> JackResult<()> {
        let text = self.stream.text(name);
        match self.symbols.define(text, ty, kind) {
            Ok(symbol) => {
                debug!(
                    "define {:?} {} {}: {} #{}",
                    symbol.kind, symbol.ty, symbol.name, symbol.kind.segment(), symbol.index
                );
                Ok(())
            }
            Err(DefineError::Duplicate(name_text)) => {
                Err(self.stream.error(name, ErrorKind::DuplicateSymbol(name_text)))
            }
            Err(DefineError::Overflow(name_text)) => {
                Err(self.stream.error(name, ErrorKind::TooManySymbols(name_text)))
            }
        }
    }

    /// Segment and index of the variable named by the token.
    fn resolve_var(&self, name: &Token) -> JackResult<(Segment, u16)> {
        let text = self.stream.text(name);
        match self.symbols.lookup(text) {
            Some(symbol) => Ok((symbol.kind.segment(), symbol.index)),
            None => Err(self
                .stream
                .error(name, ErrorKind::UndefinedSymbol(SmolStr::from(text)))),
        }
    }

    /// Text of a type token, as stored in the symbol table.
    fn type_name(&self, token: &Token) -> SmolStr {
        SmolStr::from(self.stream.text(token))
    }
}

/// Program structure.
impl<'a> Compiler<'a> {
    /// `class` Identifier `{` (classVarDec | subroutineDec)* `}`
    fn compile_class(&mut self) -> JackResult<()> {
        self.stream.expect_token(&[TokenKind::Keyword(Keyword::Class)])?;

        let name = self.stream.expect_type(&[TokenClass::Identifier])?;
        self.class_name = self.type_name(&name);
        debug!("compiling class {}", self.class_name);

        self.stream.expect_token(&[LEFT_BRACE])?;
        self.stream.advance()?;

        while let Some(Token {
            kind: TokenKind::Keyword(keyword),
            ..
        }) = self.stream.current().copied()
        {
            match keyword {
                Keyword::Static | Keyword::Field => self.compile_class_var_dec(keyword)?,
                Keyword::Constructor | Keyword::Function | Keyword::Method => {
                    self.compile_subroutine(keyword)?
                }
                _ => {
                    return Err(self.stream.unexpected(
                        "one of [keyword 'static', keyword 'field', keyword 'constructor', \
                         keyword 'function', keyword 'method', symbol '}']",
                    ))
                }
            }
        }

        self.stream.assert_token(&[RIGHT_BRACE])?;

        // One class per source file.
        self.stream.advance()?;
        if self.stream.current().is_some() {
            return Err(self.stream.unexpected("end of input"));
        }

        Ok(())
    }

    /// (`static`|`field`) type Identifier (`,` Identifier)* `;`
    fn compile_class_var_dec(&mut self, keyword: Keyword) -> JackResult<()> {
        let kind = match keyword {
            Keyword::Static => SymbolKind::Static,
            _ => SymbolKind::Field,
        };

        let ty = self.stream.expect_token(VAR_TYPES)?;
        let ty = self.type_name(&ty);

        self.compile_name_list(ty, kind)
    }

    /// Identifier (`,` Identifier)* `;`
    ///
    /// Each name is defined with the given type and kind.
    fn compile_name_list(&mut self, ty: SmolStr, kind: SymbolKind) -> JackResult<()> {
        loop {
            let name = self.stream.expect_type(&[TokenClass::Identifier])?;
            self.define(&name, ty.clone(), kind)?;

            self.stream.expect_token(&[COMMA, SEMICOLON])?;
            if self.stream.token_match(&[SEMICOLON]) {
                break;
            }
        }

        self.stream.advance()
    }

    /// (`constructor`|`function`|`method`) (`void`|type) Identifier
    /// `(` parameterList `)` `{` varDec* statements `}`
    fn compile_subroutine(&mut self, keyword: Keyword) -> JackResult<()> {
        self.symbols.start_subroutine();

        self.stream.expect_token(RETURN_TYPES)?;

        let name = self.stream.expect_type(&[TokenClass::Identifier])?;
        let full_name = format!("{}.{}", self.class_name, self.stream.text(&name));
        debug!("compiling {} {}", keyword, full_name);

        if keyword == Keyword::Method {
            // Receiver takes argument slot 0.
            self.symbols
                .define("this", self.class_name.clone(), SymbolKind::Arg)
                .map_err(|_| self.stream.error(&name, ErrorKind::DuplicateSymbol("this".into())))?;
        }

        self.stream.expect_token(&[LEFT_PAREN])?;
        self.compile_parameter_list()?;
        self.stream.assert_token(&[RIGHT_PAREN])?;

        self.stream.expect_token(&[LEFT_BRACE])?;
        self.stream.advance()?;

        while self.stream.token_match(&[TokenKind::Keyword(Keyword::Var)]) {
            self.compile_var_dec()?;
        }

        let local_count = self.symbols.var_count(SymbolKind::Var);
        self.emit(Instr::Function(full_name, local_count));

        match keyword {
            Keyword::Constructor => {
                let field_count = self.symbols.var_count(SymbolKind::Field);
                self.emit(Instr::Push(Segment::Constant, field_count));
                self.emit(Instr::call("Memory.alloc", 1));
                self.emit(Instr::Pop(Segment::Pointer, 0));
            }
            Keyword::Method => {
                self.emit(Instr::Push(Segment::Argument, 0));
                self.emit(Instr::Pop(Segment::Pointer, 0));
            }
            _ => {}
        }

        self.compile_statements()?;

        self.stream.assert_token(&[RIGHT_BRACE])?;
        self.stream.advance()
    }

    /// ((type Identifier) (`,` type Identifier)*)?
    ///
    /// Leaves the closing parenthesis as the current token.
    fn compile_parameter_list(&mut self) -> JackResult<()> {
        self.stream.advance()?;

        if self.stream.token_match(&[RIGHT_PAREN]) {
            return Ok(());
        }

        loop {
            let ty = self.stream.assert_token(VAR_TYPES)?;
            let ty = self.type_name(&ty);

            let name = self.stream.expect_type(&[TokenClass::Identifier])?;
            self.define(&name, ty, SymbolKind::Arg)?;

            self.stream.expect_token(&[COMMA, RIGHT_PAREN])?;
            if self.stream.token_match(&[RIGHT_PAREN]) {
                return Ok(());
            }
            self.stream.advance()?;
        }
    }

    /// `var` type Identifier (`,` Identifier)* `;`
    fn compile_var_dec(&mut self) -> JackResult<()> {
        let ty = self.stream.expect_token(VAR_TYPES)?;
        let ty = self.type_name(&ty);

        self.compile_name_list(ty, SymbolKind::Var)
    }
}

/// Statements.
impl<'a> Compiler<'a> {
    fn compile_statements(&mut self) -> JackResult<()> {
        while let Some(Token {
            kind: TokenKind::Keyword(keyword),
            ..
        }) = self.stream.current().copied()
        {
            match Statement::from_keyword(keyword) {
                Some(Statement::Let) => self.compile_let()?,
                Some(Statement::If) => self.compile_if()?,
                Some(Statement::While) => self.compile_while()?,
                Some(Statement::Do) => self.compile_do()?,
                Some(Statement::Return) => self.compile_return()?,
                None => break,
            }
        }

        Ok(())
    }

    /// `let` Identifier (`[` expression `]`)? `=` expression `;`
    fn compile_let(&mut self) -> JackResult<()> {
        let name = self.stream.expect_type(&[TokenClass::Identifier])?;
        let (segment, index) = self.resolve_var(&name)?;

        self.stream.expect_token(&[LEFT_BRACKET, EQ])?;

        let is_array = self.stream.token_match(&[LEFT_BRACKET]);
        if is_array {
            // Target address, base + offset, stays on the stack
            // while the right-hand side is evaluated.
            self.stream.advance()?;
            self.compile_expression()?;
            self.stream.assert_token(&[RIGHT_BRACKET])?;

            self.emit(Instr::Push(segment, index));
            self.emit(Instr::Arith(ArithOp::Add));

            self.stream.expect_token(&[EQ])?;
        }

        self.stream.advance()?;
        self.compile_expression()?;
        self.stream.assert_token(&[SEMICOLON])?;

        if is_array {
            self.emit(Instr::Pop(Segment::Temp, 0));
            self.emit(Instr::Pop(Segment::Pointer, 1));
            self.emit(Instr::Push(Segment::Temp, 0));
            self.emit(Instr::Pop(Segment::That, 0));
        } else {
            self.emit(Instr::Pop(segment, index));
        }

        self.stream.advance()
    }

    /// `if` `(` expression `)` `{` statements `}` (`else` `{` statements `}`)?
    fn compile_if(&mut self) -> JackResult<()> {
        let id = self.if_count;
        self.if_count += 1;

        self.stream.expect_token(&[LEFT_PAREN])?;
        self.stream.advance()?;
        self.compile_expression()?;
        self.stream.assert_token(&[RIGHT_PAREN])?;

        self.emit(Instr::IfGoto(Label::new(LabelKind::IfTrue, id)));
        self.emit(Instr::Goto(Label::new(LabelKind::IfFalse, id)));
        self.emit(Instr::Label(Label::new(LabelKind::IfTrue, id)));

        self.compile_block()?;

        if self.stream.token_match(&[TokenKind::Keyword(Keyword::Else)]) {
            self.emit(Instr::Goto(Label::new(LabelKind::IfEnd, id)));
            self.emit(Instr::Label(Label::new(LabelKind::IfFalse, id)));

            self.compile_block()?;

            self.emit(Instr::Label(Label::new(LabelKind::IfEnd, id)));
        } else {
            self.emit(Instr::Label(Label::new(LabelKind::IfFalse, id)));
        }

        Ok(())
    }

    /// `while` `(` expression `)` `{` statements `}`
    fn compile_while(&mut self) -> JackResult<()> {
        let id = self.while_count;
        self.while_count += 1;

        self.emit(Instr::Label(Label::new(LabelKind::WhileExp, id)));

        self.stream.expect_token(&[LEFT_PAREN])?;
        self.stream.advance()?;
        self.compile_expression()?;
        self.stream.assert_token(&[RIGHT_PAREN])?;

        self.emit(Instr::Arith(ArithOp::Not));
        self.emit(Instr::IfGoto(Label::new(LabelKind::WhileEnd, id)));

        self.compile_block()?;

        self.emit(Instr::Goto(Label::new(LabelKind::WhileExp, id)));
        self.emit(Instr::Label(Label::new(LabelKind::WhileEnd, id)));

        Ok(())
    }

    /// `{` statements `}`
    ///
    /// Expects the opening brace to be the next token, and leaves
    /// the token after the closing brace as current.
    fn compile_block(&mut self) -> JackResult<()> {
        self.stream.expect_token(&[LEFT_BRACE])?;
        self.stream.advance()?;
        self.compile_statements()?;
        self.stream.assert_token(&[RIGHT_BRACE])?;
        self.stream.advance()
    }

    /// `do` subroutineCall `;`
    fn compile_do(&mut self) -> JackResult<()> {
        self.stream.expect_type(&[TokenClass::Identifier])?;
        self.compile_subroutine_call()?;

        // Discard the return value.
        self.emit(Instr::Pop(Segment::Temp, 0));

        self.stream.assert_token(&[SEMICOLON])?;
        self.stream.advance()
    }

    /// `return` expression? `;`
    fn compile_return(&mut self) -> JackResult<()> {
        self.stream.advance()?;

        if self.stream.token_match(&[SEMICOLON]) {
            // Every VM function returns a value.
            self.emit(Instr::Push(Segment::Constant, 0));
        } else {
            self.compile_expression()?;
            self.stream.assert_token(&[SEMICOLON])?;
        }

        self.emit(Instr::Return);
        self.stream.advance()
    }
}

/// Expressions.
impl<'a> Compiler<'a> {
    /// term (op term)*
    ///
    /// Operators have no precedence and are applied left to right.
    fn compile_expression(&mut self) -> JackResult<()> {
        self.compile_term()?;

        while let Some(instr) = self.stream.current().and_then(binary_op) {
            self.stream.advance()?;
            self.compile_term()?;
            self.emit(instr);
        }

        Ok(())
    }

    fn compile_term(&mut self) -> JackResult<()> {
        use Keyword as K;
        use TokenKind as T;

        let token = match self.stream.current().copied() {
            Some(token) => token,
            None => return Err(self.stream.unexpected("term")),
        };

        match token.kind {
            T::Integer => {
                let value = self.integer_value(&token)?;
                self.emit(Instr::Push(Segment::Constant, value));
                self.stream.advance()
            }
            T::String => {
                self.compile_string(&token)?;
                self.stream.advance()
            }
            T::Keyword(K::True) => {
                self.emit(Instr::Push(Segment::Constant, 0));
                self.emit(Instr::Arith(ArithOp::Not));
                self.stream.advance()
            }
            T::Keyword(K::False) | T::Keyword(K::Null) => {
                self.emit(Instr::Push(Segment::Constant, 0));
                self.stream.advance()
            }
            T::Keyword(K::This) => {
                self.emit(Instr::Push(Segment::Pointer, 0));
                self.stream.advance()
            }
            T::Ident => {
                let next = self.stream.peek()?.map(|token| token.kind);
                match next {
                    Some(LEFT_BRACKET) => self.compile_array_entry(&token),
                    Some(LEFT_PAREN) | Some(DOT) => self.compile_subroutine_call(),
                    _ => {
                        let (segment, index) = self.resolve_var(&token)?;
                        self.emit(Instr::Push(segment, index));
                        self.stream.advance()
                    }
                }
            }
            LEFT_PAREN => {
                self.stream.advance()?;
                self.compile_expression()?;
                self.stream.assert_token(&[RIGHT_PAREN])?;
                self.stream.advance()
            }
            T::Symbol(Punct::Minus) | T::Symbol(Punct::Tilde) => {
                let op = match token.kind {
                    T::Symbol(Punct::Minus) => ArithOp::Neg,
                    _ => ArithOp::Not,
                };
                self.stream.advance()?;
                self.compile_term()?;
                self.emit(Instr::Arith(op));
                Ok(())
            }
            _ => Err(self.stream.unexpected("term")),
        }
    }

    fn integer_value(&self, token: &Token) -> JackResult<u16> {
        let text = self.stream.text(token);
        match text.parse::<u16>() {
            Ok(value) if value <= MAX_INTEGER => Ok(value),
            _ => Err(self
                .stream
                .error(token, ErrorKind::IntegerOverflow(SmolStr::from(text)))),
        }
    }

    /// Strings are built at runtime, one character at a time.
    fn compile_string(&mut self, token: &Token) -> JackResult<()> {
        let text = self.stream.text(token);

        // Lexer only accepts ASCII inside string literals, so
        // the byte length is the character count.
        let len = match u16::try_from(text.len()) {
            Ok(len) if len <= MAX_INTEGER => len,
            _ => {
                return Err(self
                    .stream
                    .error(token, ErrorKind::StringTooLong(text.len())))
            }
        };

        self.emit(Instr::Push(Segment::Constant, len));
        self.emit(Instr::call("String.new", 1));

        for byte in text.bytes() {
            self.emit(Instr::Push(Segment::Constant, u16::from(byte)));
            self.emit(Instr::call("String.appendChar", 2));
        }

        Ok(())
    }

    /// Identifier `[` expression `]`
    fn compile_array_entry(&mut self, name: &Token) -> JackResult<()> {
        let (segment, index) = self.resolve_var(name)?;

        self.stream.expect_token(&[LEFT_BRACKET])?;
        self.stream.advance()?;
        self.compile_expression()?;
        self.stream.assert_token(&[RIGHT_BRACKET])?;

        self.emit(Instr::Push(segment, index));
        self.emit(Instr::Arith(ArithOp::Add));
        self.emit(Instr::Pop(Segment::Pointer, 1));
        self.emit(Instr::Push(Segment::That, 0));

        self.stream.advance()
    }

    /// (Identifier `.`)? Identifier `(` expressionList `)`
    ///
    /// The first identifier must be the current token.
    fn compile_subroutine_call(&mut self) -> JackResult<()> {
        let first = self.stream.assert_type(&[TokenClass::Identifier])?;

        self.stream.expect_token(&[DOT, LEFT_PAREN])?;

        let (target, sub_name) = if self.stream.token_match(&[DOT]) {
            let sub_name = self.stream.expect_type(&[TokenClass::Identifier])?;
            self.stream.expect_token(&[LEFT_PAREN])?;
            (self.resolve_call(&first), sub_name)
        } else {
            (CallTarget::ImplicitSelf, first)
        };
        let sub_name = self.stream.text(&sub_name);

        let (full_name, receiver_count) = match target {
            CallTarget::Unbound { class } => (format!("{}.{}", class, sub_name), 0),
            CallTarget::BoundVariable {
                declared_type,
                segment,
                index,
            } => {
                self.emit(Instr::Push(segment, index));
                (format!("{}.{}", declared_type, sub_name), 1)
            }
            CallTarget::ImplicitSelf => {
                self.emit(Instr::Push(Segment::Pointer, 0));
                (format!("{}.{}", self.class_name, sub_name), 1)
            }
        };

        self.stream.advance()?;
        let arg_count = self.compile_expression_list()?;
        self.stream.assert_token(&[RIGHT_PAREN])?;

        self.emit(Instr::Call(full_name, arg_count + receiver_count));

        self.stream.advance()
    }

    /// Decide what a qualified call `name.sub(...)` refers to.
    fn resolve_call(&self, name: &Token) -> CallTarget {
        let text = self.stream.text(name);
        match self.symbols.lookup(text) {
            Some(symbol) => CallTarget::BoundVariable {
                declared_type: symbol.ty.clone(),
                segment: symbol.kind.segment(),
                index: symbol.index,
            },
            None => CallTarget::Unbound {
                class: SmolStr::from(text),
            },
        }
    }

    /// (expression (`,` expression)*)?
    ///
    /// Returns the number of expressions compiled. Leaves the closing
    /// parenthesis as the current token.
    fn compile_expression_list(&mut self) -> JackResult<u16> {
        let mut count = 0;

        if self.stream.token_match(&[RIGHT_PAREN]) {
            return Ok(count);
        }

        loop {
            self.compile_expression()?;
            count += 1;

            if self.stream.token_match(&[COMMA]) {
                self.stream.advance()?;
            } else {
                return Ok(count);
            }
        }
    }
}

/// VM operation for a binary operator token.
#[rustfmt::skip]
fn binary_op(token: &Token) -> Option<Instr> {
    match token.kind {
        TokenKind::Symbol(punct) => match punct {
            Punct::Plus    => Some(Instr::Arith(ArithOp::Add)),
            Punct::Minus   => Some(Instr::Arith(ArithOp::Sub)),
            Punct::Star    => Some(Instr::call("Math.multiply", 2)),
            Punct::Slash   => Some(Instr::call("Math.divide", 2)),
            Punct::Amp     => Some(Instr::Arith(ArithOp::And)),
            Punct::Pipe    => Some(Instr::Arith(ArithOp::Or)),
            Punct::Less    => Some(Instr::Arith(ArithOp::Lt)),
            Punct::Greater => Some(Instr::Arith(ArithOp::Gt)),
            Punct::Eq      => Some(Instr::Arith(ArithOp::Eq)),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::JackError;

    fn compile_conf(source: &str, conf: CompileConf) -> JackResult<Vec<String>> {
        let code = Compiler::new(Lexer::new(source), conf).compile()?;
        Ok(code.iter().map(Instr::to_string).collect())
    }

    fn compile(source: &str) -> Vec<String> {
        compile_conf(source, CompileConf::default()).unwrap()
    }

    fn compile_err(source: &str) -> ErrorKind {
        match compile_conf(source, CompileConf::default()) {
            Err(JackError::Source(err)) => err.kind,
            other => panic!("expected source error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_return() {
        let code = compile("class Main { function void main() { return; } }");
        assert_eq!(code, ["function Main.main 0", "push constant 0", "return"]);
    }

    #[test]
    fn test_constructor_allocates_fields() {
        let code = compile(
            "class Point {
                field int x, y;
                static int count;
                constructor Point new(int ax, int ay) {
                    let x = ax;
                    let y = ay;
                    return this;
                }
            }",
        );
        assert_eq!(
            code,
            [
                "function Point.new 0",
                "push constant 2",
                "call Memory.alloc 1",
                "pop pointer 0",
                "push argument 0",
                "pop this 0",
                "push argument 1",
                "pop this 1",
                "push pointer 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_method_receiver_is_argument_zero() {
        let code = compile(
            "class Point {
                field int x;
                method int plus(int n) {
                    var int sum;
                    let sum = x + n;
                    return sum;
                }
            }",
        );
        assert_eq!(
            code,
            [
                "function Point.plus 1",
                "push argument 0",
                "pop pointer 0",
                "push this 0",
                "push argument 1",
                "add",
                "pop local 0",
                "push local 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_call_resolution() {
        let code = compile(
            "class M {
                method void baz() {
                    var Point p;
                    do Foo.bar(1, 2);
                    do bar(1, 2);
                    do p.move();
                    return;
                }
            }",
        );
        assert_eq!(
            code,
            [
                "function M.baz 1",
                "push argument 0",
                "pop pointer 0",
                "push constant 1",
                "push constant 2",
                "call Foo.bar 2",
                "pop temp 0",
                "push pointer 0",
                "push constant 1",
                "push constant 2",
                "call M.bar 3",
                "pop temp 0",
                "push local 0",
                "call Point.move 1",
                "pop temp 0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_string_constant() {
        let code = compile(
            "class Main { function void main() { do Output.printString(\"Hi\"); return; } }",
        );
        assert_eq!(
            &code[1..8],
            [
                "push constant 2",
                "call String.new 1",
                "push constant 72",
                "call String.appendChar 2",
                "push constant 105",
                "call String.appendChar 2",
                "call Output.printString 1",
            ]
        );
    }

    #[test]
    fn test_keyword_constants() {
        let code = compile(
            "class Main {
                function void main() {
                    var boolean a, b;
                    var Array c;
                    let a = true;
                    let b = false;
                    let c = null;
                    return;
                }
            }",
        );
        assert_eq!(
            &code[1..8],
            [
                "push constant 0",
                "not",
                "pop local 0",
                "push constant 0",
                "pop local 1",
                "push constant 0",
                "pop local 2",
            ]
        );
    }

    #[test]
    fn test_operators_have_no_precedence() {
        let code = compile(
            "class Main { function int f(int a) { return 1 + a * 3 / -a; } }",
        );
        assert_eq!(
            code,
            [
                "function Main.f 0",
                "push constant 1",
                "push argument 0",
                "add",
                "push constant 3",
                "call Math.multiply 2",
                "push argument 0",
                "neg",
                "call Math.divide 2",
                "return",
            ]
        );
    }

    #[test]
    fn test_parenthesised_and_unary() {
        let code = compile(
            "class Main { function boolean f(int a) { return ~(a < 2) & (a = 1); } }",
        );
        assert_eq!(
            &code[1..],
            [
                "push argument 0",
                "push constant 2",
                "lt",
                "not",
                "push argument 0",
                "push constant 1",
                "eq",
                "and",
                "return",
            ]
        );
    }

    #[test]
    fn test_array_write_is_deferred() {
        let code = compile(
            "class Main {
                function void main() {
                    var Array a;
                    var int i, j;
                    let a[i] = a[j] + 1;
                    return;
                }
            }",
        );
        assert_eq!(
            code,
            [
                "function Main.main 3",
                // Target address
                "push local 1",
                "push local 0",
                "add",
                // Right hand side
                "push local 2",
                "push local 0",
                "add",
                "pop pointer 1",
                "push that 0",
                "push constant 1",
                "add",
                // Write through the saved address
                "pop temp 0",
                "pop pointer 1",
                "push temp 0",
                "pop that 0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_if_labels() {
        let code = compile(
            "class Main {
                function void main(boolean c) {
                    if (c) { do f(); }
                    if (c) { do g(); } else { do h(); }
                    return;
                }
            }",
        );
        assert_eq!(
            code,
            [
                "function Main.main 0",
                "push argument 0",
                "if-goto IF_TRUE0",
                "goto IF_FALSE0",
                "label IF_TRUE0",
                "push pointer 0",
                "call Main.f 1",
                "pop temp 0",
                "label IF_FALSE0",
                "push argument 0",
                "if-goto IF_TRUE1",
                "goto IF_FALSE1",
                "label IF_TRUE1",
                "push pointer 0",
                "call Main.g 1",
                "pop temp 0",
                "goto IF_END1",
                "label IF_FALSE1",
                "push pointer 0",
                "call Main.h 1",
                "pop temp 0",
                "label IF_END1",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_while_labels() {
        let code = compile(
            "class Main {
                function void main() {
                    var int i;
                    while (i < 10) {
                        let i = i + 1;
                    }
                    return;
                }
            }",
        );
        assert_eq!(
            code,
            [
                "function Main.main 1",
                "label WHILE_EXP0",
                "push local 0",
                "push constant 10",
                "lt",
                "not",
                "if-goto WHILE_END0",
                "push local 0",
                "push constant 1",
                "add",
                "pop local 0",
                "goto WHILE_EXP0",
                "label WHILE_END0",
                "push constant 0",
                "return",
            ]
        );
    }

    #[test]
    fn test_label_counters_span_the_class() {
        let code = compile(
            "class Main {
                function void a(boolean c) {
                    while (c) { if (c) { return; } }
                    return;
                }
                function void b(boolean c) {
                    while (c) { if (c) { return; } }
                    return;
                }
            }",
        );
        let labels = code
            .iter()
            .filter(|line| line.starts_with("label"))
            .map(String::as_str)
            .collect::<Vec<_>>();
        assert_eq!(
            labels,
            [
                "label WHILE_EXP0",
                "label IF_TRUE0",
                "label IF_FALSE0",
                "label WHILE_END0",
                "label WHILE_EXP1",
                "label IF_TRUE1",
                "label IF_FALSE1",
                "label WHILE_END1",
            ]
        );
    }

    #[test]
    fn test_locals_reset_per_subroutine() {
        let code = compile(
            "class Main {
                function void a() { var int x, y; let y = 1; return; }
                function void b() { var int z; let z = 2; return; }
            }",
        );
        assert_eq!(code[0], "function Main.a 2");
        assert_eq!(code[2], "pop local 1");
        assert_eq!(code[5], "function Main.b 1");
        assert_eq!(code[7], "pop local 0");
    }

    #[test]
    fn test_undefined_symbol() {
        assert_eq!(
            compile_err("class Main { function void main() { let x = 1; return; } }"),
            ErrorKind::UndefinedSymbol("x".into())
        );
        assert_eq!(
            compile_err("class Main { function int main() { return y; } }"),
            ErrorKind::UndefinedSymbol("y".into())
        );
    }

    #[test]
    fn test_duplicate_symbol() {
        const SOURCE: &str =
            "class Main { function void main() { var int x; var char x; return; } }";

        assert_eq!(compile_err(SOURCE), ErrorKind::DuplicateSymbol("x".into()));

        let conf = CompileConf {
            redefinition: Redefinition::Shadow,
        };
        let code = compile_conf(SOURCE, conf).unwrap();
        assert_eq!(code[0], "function Main.main 2");
    }

    #[test]
    fn test_integer_bounds() {
        let code = compile("class Main { function int main() { return 32767; } }");
        assert_eq!(code[1], "push constant 32767");

        assert_eq!(
            compile_err("class Main { function int main() { return 32768; } }"),
            ErrorKind::IntegerOverflow("32768".into())
        );
        assert_eq!(
            compile_err("class Main { function int main() { return 99999999999; } }"),
            ErrorKind::IntegerOverflow("99999999999".into())
        );
    }

    #[test]
    fn test_string_length_bounds() {
        let source = |len: usize| {
            format!(
                "class Main {{ function void main() {{ do Output.printString(\"{}\"); return; }} }}",
                "a".repeat(len)
            )
        };

        let code = compile(&source(32767));
        assert_eq!(code[1], "push constant 32767");

        assert_eq!(compile_err(&source(32768)), ErrorKind::StringTooLong(32768));
        assert_eq!(compile_err(&source(65536)), ErrorKind::StringTooLong(65536));
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(
            compile_err("class Main { function void main() { return } }"),
            ErrorKind::Syntax {
                found: "symbol '}'".to_owned(),
                expected: "term".to_owned(),
            }
        );
        assert_eq!(
            compile_err("class Main { function void main(int a int b) { return; } }"),
            ErrorKind::Syntax {
                found: "keyword 'int'".to_owned(),
                expected: "one of [symbol ',', symbol ')']".to_owned(),
            }
        );
        assert_eq!(
            compile_err("class Main { } class Other { }"),
            ErrorKind::Syntax {
                found: "keyword 'class'".to_owned(),
                expected: "end of input".to_owned(),
            }
        );
        assert_eq!(
            compile_err("class Main { function void main() { return; }"),
            ErrorKind::Syntax {
                found: "end of input".to_owned(),
                expected: "symbol '}'".to_owned(),
            }
        );
    }

    #[test]
    fn test_failed_compile_yields_no_code() {
        let result = compile_conf(
            "class Main { function void main() { return; } function void f() { let ; } }",
            CompileConf::default(),
        );
        assert!(result.is_err());
    }
}
