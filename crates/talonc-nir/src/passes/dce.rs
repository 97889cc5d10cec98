//! Dead-code elimination over a lowered function: repeatedly drops
//! instructions whose result is never used, until a pass removes nothing.
//! `Store`/`Call` are never candidates regardless of use count — see
//! [`Instruction::is_always_preserved`].

use std::collections::HashSet;

use crate::func::NIRFunction;
use crate::id::ValueId;

pub fn eliminate_dead_code(func: &mut NIRFunction) {
    loop {
        let used = collect_used_values(func);
        let mut removed_any = false;
        for block_id in block_ids(func) {
            let block = func.block_mut(block_id);
            let before = block.instructions.len();
            block.instructions.retain(|(value, inst)| inst.is_always_preserved() || used.contains(value));
            if block.instructions.len() != before {
                removed_any = true;
            }
        }
        if !removed_any {
            break;
        }
    }
}

fn block_ids(func: &NIRFunction) -> Vec<crate::id::BlockId> {
    func.blocks().map(|(id, _)| id).collect()
}

fn collect_used_values(func: &NIRFunction) -> HashSet<ValueId> {
    let mut used = HashSet::new();
    for (_, block) in func.blocks() {
        for (_, inst) in &block.instructions {
            used.extend(inst.operands());
        }
        if let Some(term) = &block.terminator {
            used.extend(term.operands());
        }
    }
    used
}

#[cfg(test)]
mod tests {
    use super::*;
    use talonc_base::Type;
    use crate::inst::Instruction;
    use crate::inst::Terminator;

    #[test]
    fn unused_pure_instruction_is_removed() {
        let mut func = NIRFunction::new("f", vec![], Type::Void, false);
        let entry = func.entry;
        let a = func.const_int(1, Type::Int);
        let b = func.const_int(2, Type::Int);
        func.push_instruction(entry, Instruction::BinaryOp { op: crate::inst::NirBinaryOp::Arith(crate::inst::ArithOp::Add), lhs: a, rhs: b }, Type::Int);
        func.seal(entry, Terminator::Return { value: None });
        assert_eq!(func.block(entry).instructions.len(), 1);
        eliminate_dead_code(&mut func);
        assert_eq!(func.block(entry).instructions.len(), 0);
    }

    #[test]
    fn instruction_feeding_the_return_value_survives() {
        let mut func = NIRFunction::new("f", vec![], Type::Int, false);
        let entry = func.entry;
        let a = func.const_int(1, Type::Int);
        let b = func.const_int(2, Type::Int);
        let sum = func
            .push_instruction(entry, Instruction::BinaryOp { op: crate::inst::NirBinaryOp::Arith(crate::inst::ArithOp::Add), lhs: a, rhs: b }, Type::Int)
            .unwrap();
        func.seal(entry, Terminator::Return { value: Some(sum) });
        eliminate_dead_code(&mut func);
        assert_eq!(func.block(entry).instructions.len(), 1);
    }

    #[test]
    fn store_survives_even_with_no_readers() {
        let mut func = NIRFunction::new("f", vec![Type::pointer(Type::Int), Type::Int], Type::Void, false);
        let entry = func.entry;
        func.push_instruction(
            entry,
            Instruction::Store { address: func.entry_param_value(0), value: func.entry_param_value(1) },
            Type::Void,
        );
        func.seal(entry, Terminator::Return { value: None });
        eliminate_dead_code(&mut func);
        assert_eq!(func.block(entry).instructions.len(), 1);
    }

    #[test]
    fn chain_of_unused_instructions_is_fully_removed_by_fixed_point() {
        let mut func = NIRFunction::new("f", vec![], Type::Void, false);
        let entry = func.entry;
        let a = func.const_int(1, Type::Int);
        let b = func
            .push_instruction(entry, Instruction::UnaryOp { op: crate::inst::NirUnaryOp::Neg, value: a }, Type::Int)
            .unwrap();
        func.push_instruction(entry, Instruction::UnaryOp { op: crate::inst::NirUnaryOp::Neg, value: b }, Type::Int);
        func.seal(entry, Terminator::Return { value: None });
        eliminate_dead_code(&mut func);
        assert_eq!(func.block(entry).instructions.len(), 0);
    }

    /// Builds `return a + b` with `dead_chain_len` unused `Neg` instructions
    /// chained off of `a` sitting alongside it, unread by anything.
    fn build_with_dead_chain(a: i64, b: i64, dead_chain_len: usize) -> NIRFunction {
        let mut func = NIRFunction::new("f", vec![], Type::Int, false);
        let entry = func.entry;
        let x = func.const_int(a, Type::Int);
        let y = func.const_int(b, Type::Int);
        let sum = func
            .push_instruction(entry, Instruction::BinaryOp { op: crate::inst::NirBinaryOp::Arith(crate::inst::ArithOp::Add), lhs: x, rhs: y }, Type::Int)
            .unwrap();
        let mut dead = x;
        for _ in 0..dead_chain_len {
            dead = func.push_instruction(entry, Instruction::UnaryOp { op: crate::inst::NirUnaryOp::Neg, value: dead }, Type::Int).unwrap();
        }
        let _ = dead;
        func.seal(entry, Terminator::Return { value: Some(sum) });
        func
    }

    proptest::proptest! {
        /// Running DCE never changes what a function interprets to, on
        /// functions built with a random-length chain of dead instructions
        /// sitting alongside the value that actually feeds the return.
        #[test]
        fn dce_does_not_change_interpreted_result(a in -1000i64..1000, b in -1000i64..1000, dead_chain_len in 0usize..5) {
            let before_funcs = vec![build_with_dead_chain(a, b, dead_chain_len)];
            let mut after_funcs = vec![build_with_dead_chain(a, b, dead_chain_len)];
            eliminate_dead_code(&mut after_funcs[0]);

            let builtins = crate::interpreter::BuiltinRegistry::new();
            let before_result = crate::interpreter::Interpreter::new(&before_funcs, &builtins).run("f", vec![]).unwrap();
            let after_result = crate::interpreter::Interpreter::new(&after_funcs, &builtins).run("f", vec![]).unwrap();
            proptest::prop_assert_eq!(before_result, after_result);
        }
    }
}
