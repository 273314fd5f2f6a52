//! Compiler from the Jack language to stack machine VM code.
mod compiler;
mod error;
mod lexer;
mod symbol;
mod token_stream;
mod tokens;
mod vm;
mod xml;

pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub use self::{
    compiler::{CompileConf, Compiler, MAX_INTEGER},
    error::{ErrorKind, JackError, JackResult, SourceError},
    lexer::Lexer,
    symbol::{DefineError, Redefinition, Symbol, SymbolKind, SymbolTable},
    token_stream::TokenStream,
    tokens::{Keyword, Punct, Span, Token, TokenClass, TokenKind},
    vm::{write_vm, ArithOp, Instr, Label, LabelKind, Segment},
    xml::write_tokens_xml,
};

pub mod prelude {
    pub use super::{compile, compile_to_string, compile_with, CompileConf, JackError, JackResult};
}

/// Compile the source code of one class with the default configuration.
pub fn compile(source_code: &str) -> JackResult<Vec<Instr>> {
    compile_with(source_code, CompileConf::default())
}

pub fn compile_with(source_code: &str, conf: CompileConf) -> JackResult<Vec<Instr>> {
    Compiler::new(Lexer::new(source_code), conf).compile()
}

/// Compile the source code of one class into VM code text.
pub fn compile_to_string(source_code: &str, conf: CompileConf) -> JackResult<String> {
    let code = compile_with(source_code, conf)?;
    let mut buf = String::new();
    write_vm(&mut buf, &code)?;
    Ok(buf)
}
