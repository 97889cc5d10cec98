//! Instruction and terminator vocabulary. Grouped into small sub-enums
//! (arithmetic vs. comparison) the way a larger instruction set would be,
//! even though this one is short, so the grouping survives if the set grows.

use talonc_base::{Symbol, Type};

use crate::id::{BlockId, ValueId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NirBinaryOp {
    Arith(ArithOp),
    Cmp(CmpOp),
}

impl NirBinaryOp {
    /// The literal C operator this lowers to 1:1.
    pub fn c_operator(self) -> &'static str {
        match self {
            NirBinaryOp::Arith(ArithOp::Add) => "+",
            NirBinaryOp::Arith(ArithOp::Sub) => "-",
            NirBinaryOp::Arith(ArithOp::Mul) => "*",
            NirBinaryOp::Arith(ArithOp::Div) => "/",
            NirBinaryOp::Arith(ArithOp::Mod) => "%",
            NirBinaryOp::Cmp(CmpOp::Eq) => "==",
            NirBinaryOp::Cmp(CmpOp::NotEq) => "!=",
            NirBinaryOp::Cmp(CmpOp::Lt) => "<",
            NirBinaryOp::Cmp(CmpOp::Le) => "<=",
            NirBinaryOp::Cmp(CmpOp::Gt) => ">",
            NirBinaryOp::Cmp(CmpOp::Ge) => ">=",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, NirBinaryOp::Cmp(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NirUnaryOp {
    Neg,
    Not,
}

/// One instruction in a basic block. Never a terminator — see [`Terminator`].
/// Each variant documents its C lowering and its result type rule, since
/// both the emitter and the builder need to agree on them.
#[derive(Debug, Clone)]
pub enum Instruction {
    /// Lowers to `lhs <op> rhs`. Result type is the common operand type for
    /// arithmetic, `Bool` for comparisons.
    BinaryOp { op: NirBinaryOp, lhs: ValueId, rhs: ValueId },
    /// Lowers to `<op>value`. Result type mirrors the operand.
    UnaryOp { op: NirUnaryOp, value: ValueId },
    /// Declares a local of `ty`; lowers to a C local declaration. Result
    /// type is `Pointer(ty)`.
    Alloca { ty: Type, name_hint: Option<String> },
    /// Lowers to `*address` (read). Result type is the address's pointee.
    Load { address: ValueId },
    /// Lowers to `*address = value;`. Produces no result (`Void`).
    Store { address: ValueId, value: ValueId },
    /// Lowers to a C cast expression. Result type is `target`.
    Cast { value: ValueId, target: Type },
    /// Reads `base.field` by value. Result type is the field's type.
    FieldExtract { base: ValueId, field: Symbol },
    /// Computes `&base->path[0].path[1]...`. Result type is
    /// `Pointer(type of path's last field)`.
    FieldAddress { base: ValueId, path: Vec<Symbol> },
    /// Lowers to a direct C call. `callee` is already the emitted symbol
    /// name (source name, or `Struct_method` for a bound method).
    Call { callee: String, args: Vec<ValueId> },
}

impl Instruction {
    /// Dead-code elimination must never remove these even when their result
    /// is unused: stores have no result to begin with, and calls are
    /// conservatively treated as side-effecting.
    pub fn is_always_preserved(&self) -> bool {
        matches!(self, Instruction::Store { .. } | Instruction::Call { .. })
    }

    /// Other instructions this one reads, for use-counting passes.
    pub fn operands(&self) -> Vec<ValueId> {
        match self {
            Instruction::BinaryOp { lhs, rhs, .. } => vec![*lhs, *rhs],
            Instruction::UnaryOp { value, .. } => vec![*value],
            Instruction::Alloca { .. } => vec![],
            Instruction::Load { address } => vec![*address],
            Instruction::Store { address, value } => vec![*address, *value],
            Instruction::Cast { value, .. } => vec![*value],
            Instruction::FieldExtract { base, .. } => vec![*base],
            Instruction::FieldAddress { base, .. } => vec![*base],
            Instruction::Call { args, .. } => args.clone(),
        }
    }
}

/// Every block ends in exactly one of these once sealed. Successor lists are
/// derived, never stored independently, so they cannot drift out of sync.
#[derive(Debug, Clone)]
pub enum Terminator {
    Jump { target: BlockId, args: Vec<ValueId> },
    Branch {
        cond: ValueId,
        true_target: BlockId,
        true_args: Vec<ValueId>,
        false_target: BlockId,
        false_args: Vec<ValueId>,
    },
    Return { value: Option<ValueId> },
}

impl Terminator {
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Jump { target, .. } => vec![*target],
            Terminator::Branch { true_target, false_target, .. } => vec![*true_target, *false_target],
            Terminator::Return { .. } => vec![],
        }
    }

    pub fn operands(&self) -> Vec<ValueId> {
        match self {
            Terminator::Jump { args, .. } => args.clone(),
            Terminator::Branch { cond, true_args, false_args, .. } => {
                let mut all = vec![*cond];
                all.extend(true_args.iter().copied());
                all.extend(false_args.iter().copied());
                all
            }
            Terminator::Return { value } => value.iter().copied().collect(),
        }
    }
}
