//! Classifies every `Alloca` in a function by how its address is used.
//!
//! NIR carries no source locations (those live on the AST the builder
//! already consumed), so every diagnostic here anchors to an empty range at
//! offset zero; the wire format still reports category, name, and severity,
//! which is what a caller actually keys off.

use std::collections::HashMap;

use talonc_base::{Category, Diagnostics, SourceRange};

use crate::func::NIRFunction;
use crate::id::ValueId;
use crate::inst::Instruction;

#[derive(Default)]
struct Usage {
    loads: usize,
    stores: usize,
    /// The address was handed to something other than a direct load/store
    /// (a field projection, a call argument, ...). Once an address escapes
    /// like this nothing can be said about how it's really used downstream,
    /// so escaped allocas are never flagged.
    escaped: bool,
}

/// Runs the classification and returns one diagnostic per flagged variable
/// plus a per-function summary note.
pub fn analyze_unused_variables(func: &NIRFunction) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    let mut usage: HashMap<ValueId, Usage> = HashMap::new();
    let mut names: HashMap<ValueId, String> = HashMap::new();

    for (_, block) in func.blocks() {
        for (value, inst) in &block.instructions {
            if let Instruction::Alloca { name_hint, .. } = inst {
                usage.entry(*value).or_default();
                if let Some(name) = name_hint {
                    names.insert(*value, name.clone());
                }
            }
        }
    }

    for (_, block) in func.blocks() {
        for (_, inst) in &block.instructions {
            match inst {
                Instruction::Load { address } => {
                    if let Some(u) = usage.get_mut(address) {
                        u.loads += 1;
                    }
                }
                Instruction::Store { address, value } => {
                    if let Some(u) = usage.get_mut(address) {
                        u.stores += 1;
                    }
                    // `value` can itself be another alloca's address (e.g. `p = &x`
                    // lowers to `Store{address: p_addr, value: x_addr}`) — being
                    // stored elsewhere counts as a use, not an escape.
                    if let Some(u) = usage.get_mut(value) {
                        u.stores += 1;
                    }
                }
                other => {
                    for operand in other.operands() {
                        if let Some(u) = usage.get_mut(&operand) {
                            u.escaped = true;
                        }
                    }
                }
            }
        }
        if let Some(term) = &block.terminator {
            for operand in term.operands() {
                if let Some(u) = usage.get_mut(&operand) {
                    u.escaped = true;
                }
            }
        }
    }

    let mut uninitialized = 0;
    let mut write_only = 0;
    let range = SourceRange::empty_at(0);
    for (value, u) in &usage {
        if u.escaped {
            continue;
        }
        let name = names.get(value).cloned().unwrap_or_default();
        if u.loads == 0 && u.stores == 0 {
            uninitialized += 1;
            diagnostics.push(range, Category::UninitializedVariable { name });
        } else if u.loads == 0 && u.stores > 0 {
            write_only += 1;
            diagnostics.push(range, Category::WriteOnlyVariable { name, store_count: u.stores });
        }
    }

    if uninitialized > 0 || write_only > 0 {
        diagnostics.push(
            range,
            Category::UnusedVariableSummary { function: func.name.clone(), uninitialized, write_only },
        );
    }

    diagnostics
}
