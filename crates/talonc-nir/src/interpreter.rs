//! Single-threaded, synchronous CFG walker over lowered functions. No
//! suspension points: a call either returns a value or the whole run aborts
//! on a typed [`InterpError`] — there is nothing async here to mirror from
//! the tree-walker this is adapted from, which exists to support awaiting
//! filesystem operations that this language has no equivalent of.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use talonc_base::Type;

use crate::func::{Constant, NIRFunction, ValueData};
use crate::id::ValueId;
use crate::inst::{ArithOp, CmpOp, Instruction, NirBinaryOp, NirUnaryOp, Terminator};

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeValue {
    Void,
    Int64(i64),
    Int8(i8),
    Int32(i32),
    Bool(bool),
    Str(String),
    /// The zero bit pattern of any pointer type.
    Null,
    Pointer(Pointer),
    Struct(StructValue),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pointer {
    pub allocation: usize,
    pub path: Vec<talonc_base::Symbol>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    pub type_name: talonc_base::Symbol,
    pub fields: HashMap<talonc_base::Symbol, RuntimeValue>,
}

impl RuntimeValue {
    fn as_i64(&self) -> Option<i64> {
        match self {
            RuntimeValue::Int64(n) => Some(*n),
            RuntimeValue::Int32(n) => Some(*n as i64),
            RuntimeValue::Int8(n) => Some(*n as i64),
            RuntimeValue::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            RuntimeValue::Void => "Void",
            RuntimeValue::Int64(_) => "Int",
            RuntimeValue::Int8(_) => "Int8",
            RuntimeValue::Int32(_) => "Int32",
            RuntimeValue::Bool(_) => "Bool",
            RuntimeValue::Str(_) => "String",
            RuntimeValue::Null | RuntimeValue::Pointer(_) => "Pointer",
            RuntimeValue::Struct(_) => "Struct",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterpError {
    InvalidArgumentCount { function: String, expected: usize, actual: usize },
    TypeMismatch { expected: String, actual: String },
    UnknownFunction { name: String },
    InvalidPointer { description: String },
}

impl fmt::Display for InterpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpError::InvalidArgumentCount { function, expected, actual } => {
                write!(f, "'{function}' expects {expected} argument(s), got {actual}")
            }
            InterpError::TypeMismatch { expected, actual } => write!(f, "expected {expected}, found {actual}"),
            InterpError::UnknownFunction { name } => write!(f, "unknown function '{name}'"),
            InterpError::InvalidPointer { description } => write!(f, "invalid pointer: {description}"),
        }
    }
}

impl std::error::Error for InterpError {}

pub type Builtin = Rc<dyn Fn(&[RuntimeValue]) -> Result<RuntimeValue, InterpError>>;

/// Host functions callable from interpreted code under a name that has no
/// matching NIR function — the native half of the call-dispatch rule.
#[derive(Default, Clone)]
pub struct BuiltinRegistry {
    builtins: HashMap<String, Builtin>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, f: Builtin) {
        self.builtins.insert(name.into(), f);
    }

    pub fn unregister(&mut self, name: &str) {
        self.builtins.remove(name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builtins.contains_key(name)
    }

    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.builtins.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Runs lowered functions over a shared allocation heap. One `Interpreter`
/// corresponds to one program run.
pub struct Interpreter<'a> {
    functions: HashMap<&'a str, &'a NIRFunction>,
    builtins: &'a BuiltinRegistry,
    heap: Vec<RuntimeValue>,
}

impl<'a> Interpreter<'a> {
    pub fn new(functions: &'a [NIRFunction], builtins: &'a BuiltinRegistry) -> Self {
        let functions = functions.iter().map(|f| (f.name.as_str(), f)).collect();
        Interpreter { functions, builtins, heap: Vec::new() }
    }

    pub fn run(&mut self, entry: &str, args: Vec<RuntimeValue>) -> Result<RuntimeValue, InterpError> {
        let func = *self.functions.get(entry).ok_or_else(|| InterpError::UnknownFunction { name: entry.to_string() })?;
        self.call_nir_function(func, args)
    }

    fn call_nir_function(&mut self, func: &NIRFunction, args: Vec<RuntimeValue>) -> Result<RuntimeValue, InterpError> {
        if args.len() != func.param_types().len() && !func.is_variadic {
            return Err(InterpError::InvalidArgumentCount {
                function: func.name.clone(),
                expected: func.param_types().len(),
                actual: args.len(),
            });
        }
        let mut frame: HashMap<ValueId, RuntimeValue> = HashMap::new();
        for (i, arg) in args.into_iter().enumerate() {
            frame.insert(func.entry_param_value(i), arg);
        }

        let mut current = func.entry;
        let mut incoming_args: Vec<ValueId> = Vec::new();
        loop {
            let block = func.block(current);
            for (index, param) in block.params.iter().enumerate() {
                if let Some(arg) = incoming_args.get(index) {
                    let value = self.resolve(func, &frame, *arg)?;
                    frame.insert(param.value, value);
                }
            }

            for (value_id, inst) in &block.instructions {
                let result = self.exec_instruction(func, &mut frame, inst)?;
                if let Some(result) = result {
                    frame.insert(*value_id, result);
                }
            }

            match block.terminator.as_ref().expect("interpreted function must be well-formed") {
                Terminator::Return { value } => {
                    return match value {
                        Some(v) => self.resolve(func, &frame, *v),
                        None => Ok(RuntimeValue::Void),
                    };
                }
                Terminator::Jump { target, args } => {
                    incoming_args = args.clone();
                    current = *target;
                }
                Terminator::Branch { cond, true_target, true_args, false_target, false_args } => {
                    let cond_value = self.resolve(func, &frame, *cond)?;
                    let taken = match cond_value {
                        RuntimeValue::Bool(b) => b,
                        other => {
                            return Err(InterpError::TypeMismatch { expected: "Bool".into(), actual: other.type_name().into() })
                        }
                    };
                    let (target, jump_args) = if taken { (*true_target, true_args) } else { (*false_target, false_args) };
                    incoming_args = jump_args.clone();
                    current = target;
                }
            }
        }
    }

    fn resolve(&mut self, func: &NIRFunction, frame: &HashMap<ValueId, RuntimeValue>, value: ValueId) -> Result<RuntimeValue, InterpError> {
        if let Some(v) = frame.get(&value) {
            return Ok(v.clone());
        }
        match func.value_data(value) {
            ValueData::Constant(c) => Ok(constant_value(c)),
            ValueData::Undef => Ok(zero_value(&func.type_of(value))),
            ValueData::BlockParameter { .. } | ValueData::Instruction { .. } => {
                Err(InterpError::InvalidPointer { description: format!("value {value} used before it was bound") })
            }
        }
    }

    fn exec_instruction(
        &mut self,
        func: &NIRFunction,
        frame: &mut HashMap<ValueId, RuntimeValue>,
        inst: &Instruction,
    ) -> Result<Option<RuntimeValue>, InterpError> {
        match inst {
            Instruction::Alloca { ty, .. } => {
                let zero = zero_value(ty);
                self.heap.push(zero);
                Ok(Some(RuntimeValue::Pointer(Pointer { allocation: self.heap.len() - 1, path: vec![] })))
            }
            Instruction::Load { address } => {
                let addr = self.resolve(func, frame, *address)?;
                let ptr = pointer_of(&addr)?;
                Ok(Some(navigate(&self.heap[ptr.allocation], &ptr.path)?.clone()))
            }
            Instruction::Store { address, value } => {
                let addr = self.resolve(func, frame, *address)?;
                let ptr = pointer_of(&addr)?;
                let new_value = self.resolve(func, frame, *value)?;
                let slot = &mut self.heap[ptr.allocation];
                *navigate_mut(slot, &ptr.path)? = new_value;
                Ok(None)
            }
            Instruction::FieldAddress { base, path } => {
                let base_value = self.resolve(func, frame, *base)?;
                let mut ptr = pointer_of(&base_value)?;
                ptr.path.extend(path.iter().copied());
                Ok(Some(RuntimeValue::Pointer(ptr)))
            }
            Instruction::FieldExtract { base, field } => {
                let base_value = self.resolve(func, frame, *base)?;
                match base_value {
                    RuntimeValue::Struct(s) => Ok(Some(
                        s.fields
                            .get(field)
                            .cloned()
                            .ok_or_else(|| InterpError::InvalidPointer { description: "unknown field".into() })?,
                    )),
                    other => Err(InterpError::TypeMismatch { expected: "Struct".into(), actual: other.type_name().into() }),
                }
            }
            Instruction::BinaryOp { op, lhs, rhs } => {
                let l = self.resolve(func, frame, *lhs)?;
                let r = self.resolve(func, frame, *rhs)?;
                Ok(Some(eval_binary_op(*op, &l, &r)?))
            }
            Instruction::UnaryOp { op, value } => {
                let v = self.resolve(func, frame, *value)?;
                Ok(Some(eval_unary_op(*op, &v)?))
            }
            Instruction::Cast { value, target } => {
                let v = self.resolve(func, frame, *value)?;
                Ok(Some(cast_value(&v, target)?))
            }
            Instruction::Call { callee, args } => {
                let mut resolved = Vec::with_capacity(args.len());
                for a in args {
                    resolved.push(self.resolve(func, frame, *a)?);
                }
                Ok(Some(self.call_named(callee, resolved)?))
            }
        }
    }

    fn call_named(&mut self, name: &str, args: Vec<RuntimeValue>) -> Result<RuntimeValue, InterpError> {
        if let Some(func) = self.functions.get(name).copied() {
            return self.call_nir_function(func, args);
        }
        if let Some(builtin) = self.builtins.builtins.get(name) {
            return builtin(&args);
        }
        Err(InterpError::UnknownFunction { name: name.to_string() })
    }
}

fn constant_value(c: &Constant) -> RuntimeValue {
    match c {
        Constant::Int(n) => RuntimeValue::Int64(*n),
        Constant::Bool(b) => RuntimeValue::Bool(*b),
        Constant::Str(s) => RuntimeValue::Str(s.clone()),
        Constant::Void => RuntimeValue::Void,
    }
}

fn zero_value(ty: &Type) -> RuntimeValue {
    match ty {
        Type::Int => RuntimeValue::Int64(0),
        Type::Int8 => RuntimeValue::Int8(0),
        Type::Int32 => RuntimeValue::Int32(0),
        Type::Bool => RuntimeValue::Bool(false),
        Type::Void => RuntimeValue::Void,
        Type::Pointer(_) => RuntimeValue::Null,
        Type::Struct(s) => RuntimeValue::Struct(StructValue {
            type_name: s.name,
            fields: s.fields.iter().map(|(name, field_ty)| (*name, zero_value(field_ty))).collect(),
        }),
        Type::Unknown | Type::CVarArgs | Type::Function(_) => RuntimeValue::Void,
    }
}

fn pointer_of(value: &RuntimeValue) -> Result<Pointer, InterpError> {
    match value {
        RuntimeValue::Pointer(p) => Ok(p.clone()),
        RuntimeValue::Null => Err(InterpError::InvalidPointer { description: "dereferenced a null pointer".into() }),
        other => Err(InterpError::TypeMismatch { expected: "Pointer".into(), actual: other.type_name().into() }),
    }
}

fn navigate<'a>(root: &'a RuntimeValue, path: &[talonc_base::Symbol]) -> Result<&'a RuntimeValue, InterpError> {
    let mut current = root;
    for field in path {
        match current {
            RuntimeValue::Struct(s) => {
                current = s
                    .fields
                    .get(field)
                    .ok_or_else(|| InterpError::InvalidPointer { description: "unknown field in path".into() })?;
            }
            other => return Err(InterpError::TypeMismatch { expected: "Struct".into(), actual: other.type_name().into() }),
        }
    }
    Ok(current)
}

fn navigate_mut<'a>(root: &'a mut RuntimeValue, path: &[talonc_base::Symbol]) -> Result<&'a mut RuntimeValue, InterpError> {
    let mut current = root;
    for field in path {
        match current {
            RuntimeValue::Struct(s) => {
                current = s
                    .fields
                    .get_mut(field)
                    .ok_or_else(|| InterpError::InvalidPointer { description: "unknown field in path".into() })?;
            }
            other => return Err(InterpError::TypeMismatch { expected: "Struct".into(), actual: other.type_name().into() }),
        }
    }
    Ok(current)
}

fn eval_binary_op(op: NirBinaryOp, l: &RuntimeValue, r: &RuntimeValue) -> Result<RuntimeValue, InterpError> {
    let (Some(lv), Some(rv)) = (l.as_i64(), r.as_i64()) else {
        return Err(InterpError::TypeMismatch { expected: "numeric operand".into(), actual: l.type_name().into() });
    };
    match op {
        NirBinaryOp::Arith(arith) => {
            let result = match arith {
                ArithOp::Add => lv.wrapping_add(rv),
                ArithOp::Sub => lv.wrapping_sub(rv),
                ArithOp::Mul => lv.wrapping_mul(rv),
                ArithOp::Div => lv.wrapping_div(rv),
                ArithOp::Mod => lv.wrapping_rem(rv),
            };
            Ok(widen_like(l, result))
        }
        NirBinaryOp::Cmp(cmp) => {
            let result = match cmp {
                CmpOp::Eq => lv == rv,
                CmpOp::NotEq => lv != rv,
                CmpOp::Lt => lv < rv,
                CmpOp::Le => lv <= rv,
                CmpOp::Gt => lv > rv,
                CmpOp::Ge => lv >= rv,
            };
            Ok(RuntimeValue::Bool(result))
        }
    }
}

fn eval_unary_op(op: NirUnaryOp, v: &RuntimeValue) -> Result<RuntimeValue, InterpError> {
    match op {
        NirUnaryOp::Neg => {
            let n = v.as_i64().ok_or_else(|| InterpError::TypeMismatch { expected: "numeric operand".into(), actual: v.type_name().into() })?;
            Ok(widen_like(v, n.wrapping_neg()))
        }
        NirUnaryOp::Not => match v {
            RuntimeValue::Bool(b) => Ok(RuntimeValue::Bool(!b)),
            other => Err(InterpError::TypeMismatch { expected: "Bool".into(), actual: other.type_name().into() }),
        },
    }
}

fn widen_like(sample: &RuntimeValue, n: i64) -> RuntimeValue {
    match sample {
        RuntimeValue::Int8(_) => RuntimeValue::Int8(n as i8),
        RuntimeValue::Int32(_) => RuntimeValue::Int32(n as i32),
        _ => RuntimeValue::Int64(n),
    }
}

fn cast_value(v: &RuntimeValue, target: &Type) -> Result<RuntimeValue, InterpError> {
    let as_int = v.as_i64();
    match target {
        Type::Int => Ok(RuntimeValue::Int64(as_int.unwrap_or(0))),
        Type::Int8 => Ok(RuntimeValue::Int8(as_int.unwrap_or(0) as i8)),
        Type::Int32 => Ok(RuntimeValue::Int32(as_int.unwrap_or(0) as i32)),
        Type::Bool => Ok(RuntimeValue::Bool(as_int.unwrap_or(0) != 0)),
        Type::Void => Ok(RuntimeValue::Void),
        _ => Ok(v.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_function(body: impl FnOnce(&mut NIRFunction)) -> NIRFunction {
        let mut func = NIRFunction::new("f", vec![], Type::Int, false);
        body(&mut func);
        func
    }

    #[test]
    fn arithmetic_returns_expected_value() {
        let func = leaf_function(|f| {
            let entry = f.entry;
            let a = f.const_int(3, Type::Int);
            let b = f.const_int(4, Type::Int);
            let sum = f.push_instruction(entry, Instruction::BinaryOp { op: NirBinaryOp::Arith(ArithOp::Add), lhs: a, rhs: b }, Type::Int).unwrap();
            f.seal(entry, Terminator::Return { value: Some(sum) });
        });
        let functions = vec![func];
        let builtins = BuiltinRegistry::new();
        let mut interp = Interpreter::new(&functions, &builtins);
        assert_eq!(interp.run("f", vec![]).unwrap(), RuntimeValue::Int64(7));
    }

    #[test]
    fn alloca_store_load_round_trips() {
        let func = leaf_function(|f| {
            let entry = f.entry;
            let addr = f.push_instruction(entry, Instruction::Alloca { ty: Type::Int, name_hint: None }, Type::pointer(Type::Int)).unwrap();
            let v = f.const_int(42, Type::Int);
            f.push_instruction(entry, Instruction::Store { address: addr, value: v }, Type::Void);
            let loaded = f.push_instruction(entry, Instruction::Load { address: addr }, Type::Int).unwrap();
            f.seal(entry, Terminator::Return { value: Some(loaded) });
        });
        let functions = vec![func];
        let builtins = BuiltinRegistry::new();
        let mut interp = Interpreter::new(&functions, &builtins);
        assert_eq!(interp.run("f", vec![]).unwrap(), RuntimeValue::Int64(42));
    }

    #[test]
    fn calling_unknown_function_is_a_typed_error() {
        let func = leaf_function(|f| {
            let entry = f.entry;
            f.seal(entry, Terminator::Return { value: None });
        });
        let functions = vec![func];
        let builtins = BuiltinRegistry::new();
        let mut interp = Interpreter::new(&functions, &builtins);
        assert!(matches!(interp.run("missing", vec![]), Err(InterpError::UnknownFunction { .. })));
    }

    #[test]
    fn builtin_call_dispatches_when_no_nir_function_matches() {
        let func = leaf_function(|f| {
            let entry = f.entry;
            let c = f.const_int(5, Type::Int);
            let result = f.push_instruction(entry, Instruction::Call { callee: "double".into(), args: vec![c] }, Type::Int).unwrap();
            f.seal(entry, Terminator::Return { value: Some(result) });
        });
        let functions = vec![func];
        let mut builtins = BuiltinRegistry::new();
        builtins.register(
            "double",
            Rc::new(|args: &[RuntimeValue]| Ok(RuntimeValue::Int64(args[0].as_i64().unwrap() * 2))),
        );
        let mut interp = Interpreter::new(&functions, &builtins);
        assert_eq!(interp.run("f", vec![]).unwrap(), RuntimeValue::Int64(10));
    }
}
