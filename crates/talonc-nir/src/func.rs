//! `NIRFunction`: a function body as an arena of blocks and values.
//! Block/value identity is the handle returned at creation time, never the
//! name — two blocks may share a name only by debugging accident, never by
//! the builder's own logic.

use talonc_base::{Symbol, Type};

use crate::id::{BlockId, ValueId};
use crate::inst::{Instruction, Terminator};

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i64),
    Bool(bool),
    Str(String),
    Void,
}

#[derive(Debug, Clone)]
pub enum ValueData {
    Constant(Constant),
    Undef,
    BlockParameter { block: BlockId, index: usize },
    Instruction { block: BlockId },
}

#[derive(Debug, Clone)]
pub struct BlockParameter {
    pub ty: Type,
    pub index: usize,
    pub value: ValueId,
}

#[derive(Debug)]
pub struct BasicBlock {
    pub name: String,
    pub params: Vec<BlockParameter>,
    pub instructions: Vec<(ValueId, Instruction)>,
    pub terminator: Option<Terminator>,
}

impl BasicBlock {
    fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), params: Vec::new(), instructions: Vec::new(), terminator: None }
    }

    pub fn is_sealed(&self) -> bool {
        self.terminator.is_some()
    }
}

/// A lowered function. Parameters are exactly the entry block's parameters —
/// there is no separate parameter list to keep in sync.
#[derive(Debug)]
pub struct NIRFunction {
    pub name: String,
    pub return_type: Type,
    pub is_variadic: bool,
    blocks: Vec<BasicBlock>,
    values: Vec<(ValueData, Type)>,
    pub entry: BlockId,
}

impl NIRFunction {
    /// Creates a function with a single, unsealed entry block carrying
    /// `param_types` as its parameters.
    pub fn new(name: impl Into<String>, param_types: Vec<Type>, return_type: Type, is_variadic: bool) -> Self {
        let mut func = NIRFunction {
            name: name.into(),
            return_type,
            is_variadic,
            blocks: vec![BasicBlock::new("entry")],
            values: Vec::new(),
            entry: BlockId(0),
        };
        for (index, ty) in param_types.into_iter().enumerate() {
            let value = func.push_value(ValueData::BlockParameter { block: func.entry, index }, ty.clone());
            func.blocks[0].params.push(BlockParameter { ty, index, value });
            debug_assert_eq!(value.index(), index);
        }
        func
    }

    fn push_value(&mut self, data: ValueData, ty: Type) -> ValueId {
        self.values.push((data, ty));
        ValueId((self.values.len() - 1) as u32)
    }

    pub fn param_types(&self) -> Vec<Type> {
        self.blocks[self.entry.index()].params.iter().map(|p| p.ty.clone()).collect()
    }

    pub fn entry_param_value(&self, index: usize) -> ValueId {
        ValueId(index as u32)
    }

    pub fn type_of(&self, value: ValueId) -> Type {
        self.values[value.index()].1.clone()
    }

    pub fn value_data(&self, value: ValueId) -> &ValueData {
        &self.values[value.index()].0
    }

    pub fn const_int(&mut self, n: i64, ty: Type) -> ValueId {
        self.push_value(ValueData::Constant(Constant::Int(n)), ty)
    }

    pub fn const_bool(&mut self, b: bool) -> ValueId {
        self.push_value(ValueData::Constant(Constant::Bool(b)), Type::Bool)
    }

    pub fn const_str(&mut self, s: impl Into<String>) -> ValueId {
        self.push_value(ValueData::Constant(Constant::Str(s.into())), Type::pointer(Type::Int8))
    }

    pub fn const_void(&mut self) -> ValueId {
        self.push_value(ValueData::Constant(Constant::Void), Type::Void)
    }

    /// A 0-initialised bit pattern for a type with no natural zero constant
    /// (pointers, structs) — used by the default-return policy.
    pub fn undef(&mut self, ty: Type) -> ValueId {
        self.push_value(ValueData::Undef, ty)
    }

    pub fn new_block(&mut self, name: impl Into<String>) -> BlockId {
        self.blocks.push(BasicBlock::new(name));
        BlockId((self.blocks.len() - 1) as u32)
    }

    pub fn add_block_param(&mut self, block: BlockId, ty: Type) -> ValueId {
        let index = self.blocks[block.index()].params.len();
        let value = self.push_value(ValueData::BlockParameter { block, index }, ty.clone());
        self.blocks[block.index()].params.push(BlockParameter { ty, index, value });
        value
    }

    /// Appends `inst` to `block` and returns the value it produces, or
    /// `None` for `Void`-producing instructions (`Store`).
    pub fn push_instruction(&mut self, block: BlockId, inst: Instruction, result_type: Type) -> Option<ValueId> {
        assert!(!self.blocks[block.index()].is_sealed(), "cannot append past a terminator");
        let void_result = matches!(inst, Instruction::Store { .. });
        let value = self.push_value(ValueData::Instruction { block }, result_type);
        self.blocks[block.index()].instructions.push((value, inst));
        if void_result { None } else { Some(value) }
    }

    pub fn seal(&mut self, block: BlockId, terminator: Terminator) {
        assert!(!self.blocks[block.index()].is_sealed(), "block already sealed");
        self.blocks[block.index()].terminator = Some(terminator);
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.index()]
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &BasicBlock)> {
        self.blocks.iter().enumerate().map(|(i, b)| (BlockId(i as u32), b))
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// True once every block is sealed — the only state in which a function
    /// is valid to run a pass over or interpret.
    pub fn is_well_formed(&self) -> bool {
        self.blocks.iter().all(BasicBlock::is_sealed)
    }
}

/// Mirrors a struct's compiled field layout: ordered field names with
/// types, used by `FieldAddress`/`FieldExtract` lowering and by C struct
/// emission.
#[derive(Debug, Clone)]
pub struct StructLayout {
    pub name: Symbol,
    pub fields: Vec<(Symbol, Type)>,
}

impl StructLayout {
    pub fn field_type(&self, name: Symbol) -> Option<&Type> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, ty)| ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_function_parameters_are_entry_block_parameters() {
        let func = NIRFunction::new("f", vec![Type::Int, Type::Bool], Type::Void, false);
        assert_eq!(func.param_types(), vec![Type::Int, Type::Bool]);
        assert_eq!(func.type_of(func.entry_param_value(1)), Type::Bool);
    }

    #[test]
    fn push_instruction_after_seal_panics() {
        let mut func = NIRFunction::new("f", vec![], Type::Void, false);
        func.seal(func.entry, Terminator::Return { value: None });
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            func.push_instruction(func.entry, Instruction::Load { address: ValueId(0) }, Type::Int)
        }));
        assert!(result.is_err());
    }

    #[test]
    fn store_instruction_produces_no_value() {
        let mut func = NIRFunction::new("f", vec![Type::pointer(Type::Int), Type::Int], Type::Void, false);
        let result = func.push_instruction(
            func.entry,
            Instruction::Store { address: func.entry_param_value(0), value: func.entry_param_value(1) },
            Type::Void,
        );
        assert!(result.is_none());
    }

    #[test]
    fn is_well_formed_requires_every_block_sealed() {
        let mut func = NIRFunction::new("f", vec![], Type::Void, false);
        assert!(!func.is_well_formed());
        func.seal(func.entry, Terminator::Return { value: None });
        assert!(func.is_well_formed());
    }
}
