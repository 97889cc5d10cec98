//! SSA-with-block-parameters mid-level IR: the builder that lowers a
//! type-checked AST into it, the pass manager that runs over it, and the
//! interpreter that executes it directly (no textual IR form — functions
//! are consumed as arena-backed [`func::NIRFunction`] values end to end).

pub mod builder;
pub mod func;
pub mod id;
pub mod inst;
pub mod interpreter;
pub mod passes;

pub use builder::{build_struct_layouts, lower_program, NirBuildError};
pub use func::{BasicBlock, Constant, NIRFunction, StructLayout, ValueData};
pub use id::{BlockId, ValueId};
pub use inst::{ArithOp, CmpOp, Instruction, NirBinaryOp, NirUnaryOp, Terminator};
pub use interpreter::{BuiltinRegistry, InterpError, Interpreter, RuntimeValue};
pub use passes::{analyze_unused_variables, eliminate_dead_code, optimize_program};
