//! Stack machine instructions.
//!
//! The compiler's only contract with the VM translator is the
//! textual form of these instructions, one per line.
use std::fmt::{self, Write};

/// Named storage region of the stack machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Constant,
    Local,
    Argument,
    This,
    That,
    Pointer,
    Temp,
    Static,
}

impl fmt::Display for Segment {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Segment::Constant => write!(f, "constant"),
            Segment::Local    => write!(f, "local"),
            Segment::Argument => write!(f, "argument"),
            Segment::This     => write!(f, "this"),
            Segment::That     => write!(f, "that"),
            Segment::Pointer  => write!(f, "pointer"),
            Segment::Temp     => write!(f, "temp"),
            Segment::Static   => write!(f, "static"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl fmt::Display for ArithOp {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ArithOp::Add => write!(f, "add"),
            ArithOp::Sub => write!(f, "sub"),
            ArithOp::Neg => write!(f, "neg"),
            ArithOp::Eq  => write!(f, "eq"),
            ArithOp::Gt  => write!(f, "gt"),
            ArithOp::Lt  => write!(f, "lt"),
            ArithOp::And => write!(f, "and"),
            ArithOp::Or  => write!(f, "or"),
            ArithOp::Not => write!(f, "not"),
        }
    }
}

/// Jump target generated for control flow statements.
///
/// The id is unique per label kind within one compiled class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label {
    pub kind: LabelKind,
    pub id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    IfTrue,
    IfFalse,
    IfEnd,
    WhileExp,
    WhileEnd,
}

impl Label {
    #[inline]
    pub fn new(kind: LabelKind, id: u32) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for Label {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let prefix = match self.kind {
            LabelKind::IfTrue   => "IF_TRUE",
            LabelKind::IfFalse  => "IF_FALSE",
            LabelKind::IfEnd    => "IF_END",
            LabelKind::WhileExp => "WHILE_EXP",
            LabelKind::WhileEnd => "WHILE_END",
        };
        write!(f, "{}{}", prefix, self.id)
    }
}

/// VM instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    Arith(ArithOp),
    Push(Segment, u16),
    Pop(Segment, u16),
    Label(Label),
    Goto(Label),
    IfGoto(Label),
    /// Function entry, with the number of local variables.
    Function(String, u16),
    /// Subroutine call, with the number of arguments already pushed.
    Call(String, u16),
    Return,
}

impl Instr {
    #[inline]
    pub fn call(name: impl ToString, arg_count: u16) -> Self {
        Instr::Call(name.to_string(), arg_count)
    }
}

/// Outputs instruction as VM code.
impl fmt::Display for Instr {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Instr::Arith(op)             => write!(f, "{}", op),
            Instr::Push(segment, index)  => write!(f, "push {} {}", segment, index),
            Instr::Pop(segment, index)   => write!(f, "pop {} {}", segment, index),
            Instr::Label(label)          => write!(f, "label {}", label),
            Instr::Goto(label)           => write!(f, "goto {}", label),
            Instr::IfGoto(label)         => write!(f, "if-goto {}", label),
            Instr::Function(name, count) => write!(f, "function {} {}", name, count),
            Instr::Call(name, count)     => write!(f, "call {} {}", name, count),
            Instr::Return                => write!(f, "return"),
        }
    }
}

/// Write instructions to the given writer, one per line.
pub fn write_vm<W: Write>(w: &mut W, code: &[Instr]) -> fmt::Result {
    for instr in code {
        writeln!(w, "{}", instr)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_instruction_text() {
        let code = [
            Instr::Function("Main.main".to_owned(), 2),
            Instr::Push(Segment::Constant, 7),
            Instr::Pop(Segment::Local, 1),
            Instr::Label(Label::new(LabelKind::WhileExp, 0)),
            Instr::Arith(ArithOp::Not),
            Instr::IfGoto(Label::new(LabelKind::WhileEnd, 0)),
            Instr::Goto(Label::new(LabelKind::IfFalse, 12)),
            Instr::call("Math.multiply", 2),
            Instr::Pop(Segment::Pointer, 1),
            Instr::Push(Segment::That, 0),
            Instr::Return,
        ];

        let mut buf = String::new();
        write_vm(&mut buf, &code).unwrap();

        assert_eq!(
            buf,
            "function Main.main 2\n\
             push constant 7\n\
             pop local 1\n\
             label WHILE_EXP0\n\
             not\n\
             if-goto WHILE_END0\n\
             goto IF_FALSE12\n\
             call Math.multiply 2\n\
             pop pointer 1\n\
             push that 0\n\
             return\n"
        );
    }
}
