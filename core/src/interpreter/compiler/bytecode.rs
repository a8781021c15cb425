//! Instruction set and compiled code objects

use std::fmt;
use std::fmt::Write as _;
use std::rc::Rc;

use crate::interpreter::types::ast::BinOp;

/// Operation codes understood by the VM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    LoadConstantFloat,
    LoadConstantStr,
    LoadConstantBool,
    LoadConstantFn,
    LoadVar,
    Assign,
    DiscardTop,
    /// Argument is 1 when a value sits on the stack, 0 for `undefined`
    Return,
    JumpIfFalse,
    JumpAbsolute,
    BinaryAdd,
    BinarySub,
    BinaryMul,
    BinaryDiv,
    BinaryMod,
    BinaryEq,
    BinaryNe,
    BinaryLt,
    BinaryLe,
    BinaryGt,
    BinaryGe,
    /// Argument is the number of arguments above the callee
    Call,
}

impl Opcode {
    pub fn name(self) -> &'static str {
        match self {
            Opcode::LoadConstantFloat => "LOAD_CONSTANT_FLOAT",
            Opcode::LoadConstantStr => "LOAD_CONSTANT_STR",
            Opcode::LoadConstantBool => "LOAD_CONSTANT_BOOL",
            Opcode::LoadConstantFn => "LOAD_CONSTANT_FN",
            Opcode::LoadVar => "LOAD_VAR",
            Opcode::Assign => "ASSIGN",
            Opcode::DiscardTop => "DISCARD_TOP",
            Opcode::Return => "RETURN",
            Opcode::JumpIfFalse => "JUMP_IF_FALSE",
            Opcode::JumpAbsolute => "JUMP_ABSOLUTE",
            Opcode::BinaryAdd => "BINARY_ADD",
            Opcode::BinarySub => "BINARY_SUB",
            Opcode::BinaryMul => "BINARY_MUL",
            Opcode::BinaryDiv => "BINARY_DIV",
            Opcode::BinaryMod => "BINARY_MOD",
            Opcode::BinaryEq => "BINARY_EQ",
            Opcode::BinaryNe => "BINARY_NE",
            Opcode::BinaryLt => "BINARY_LT",
            Opcode::BinaryLe => "BINARY_LE",
            Opcode::BinaryGt => "BINARY_GT",
            Opcode::BinaryGe => "BINARY_GE",
            Opcode::Call => "CALL",
        }
    }

    pub fn for_binop(op: BinOp) -> Self {
        match op {
            BinOp::Add => Opcode::BinaryAdd,
            BinOp::Sub => Opcode::BinarySub,
            BinOp::Mul => Opcode::BinaryMul,
            BinOp::Div => Opcode::BinaryDiv,
            BinOp::Mod => Opcode::BinaryMod,
            BinOp::Eq => Opcode::BinaryEq,
            BinOp::Ne => Opcode::BinaryNe,
            BinOp::Lt => Opcode::BinaryLt,
            BinOp::Le => Opcode::BinaryLe,
            BinOp::Gt => Opcode::BinaryGt,
            BinOp::Ge => Opcode::BinaryGe,
        }
    }

    /// The binary operator an opcode applies, if it is a BINARY_* opcode
    pub fn binop(self) -> Option<BinOp> {
        let op = match self {
            Opcode::BinaryAdd => BinOp::Add,
            Opcode::BinarySub => BinOp::Sub,
            Opcode::BinaryMul => BinOp::Mul,
            Opcode::BinaryDiv => BinOp::Div,
            Opcode::BinaryMod => BinOp::Mod,
            Opcode::BinaryEq => BinOp::Eq,
            Opcode::BinaryNe => BinOp::Ne,
            Opcode::BinaryLt => BinOp::Lt,
            Opcode::BinaryLe => BinOp::Le,
            Opcode::BinaryGt => BinOp::Gt,
            Opcode::BinaryGe => BinOp::Ge,
            _ => return None,
        };
        Some(op)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// One instruction: an opcode and its argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: Opcode,
    pub arg: u32,
}

impl Instruction {
    pub fn new(op: Opcode, arg: u32) -> Self {
        Self { op, arg }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op, self.arg)
    }
}

/// Compiled unit: the top-level program or a single function body
#[derive(Debug, Clone, PartialEq)]
pub struct CodeObject {
    /// Function name, `<main>` for the top level
    pub name: String,
    pub code: Vec<Instruction>,
    pub constants_float: Vec<f64>,
    pub constants_str: Vec<Rc<str>>,
    pub constants_fn: Vec<Rc<CodeObject>>,
    /// Variable names by slot. Parameters occupy the first `arg_count` slots.
    pub names: Rc<Vec<String>>,
    pub arg_count: usize,
}

impl CodeObject {
    /// Human readable position, e.g. `sum_numbers #12 BINARY_ADD 0`
    pub fn location(&self, pc: usize) -> String {
        match self.code.get(pc) {
            Some(instr) => format!("{} #{} {}", self.name, pc, instr),
            None => format!("{} #{}", self.name, pc),
        }
    }

    /// The operand an instruction refers to, for disassembly comments
    fn describe_arg(&self, instr: &Instruction) -> Option<String> {
        let idx = instr.arg as usize;
        match instr.op {
            Opcode::LoadConstantFloat => self
                .constants_float
                .get(idx)
                .map(|v| crate::interpreter::types::format_number(*v)),
            Opcode::LoadConstantStr => self.constants_str.get(idx).map(|s| format!("{:?}", s)),
            Opcode::LoadConstantBool => Some((instr.arg != 0).to_string()),
            Opcode::LoadConstantFn => self.constants_fn.get(idx).map(|f| format!("<{}>", f.name)),
            Opcode::LoadVar | Opcode::Assign => self.names.get(idx).cloned(),
            _ => None,
        }
    }
}

/// Disassemble a code object and every function nested in it
pub fn dis(code: &CodeObject) -> String {
    let mut out = String::new();
    dis_into(code, &mut out);
    out
}

fn dis_into(code: &CodeObject, out: &mut String) {
    let _ = writeln!(out, "== {} ({} args) ==", code.name, code.arg_count);
    for (pc, instr) in code.code.iter().enumerate() {
        match code.describe_arg(instr) {
            Some(desc) => {
                let _ = writeln!(out, "{:>4} {:<20} {:>3}  ({})", pc, instr.op, instr.arg, desc);
            }
            None => {
                let _ = writeln!(out, "{:>4} {:<20} {:>3}", pc, instr.op, instr.arg);
            }
        }
    }
    for nested in &code.constants_fn {
        out.push('\n');
        dis_into(nested, out);
    }
}
