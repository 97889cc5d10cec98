//! Lowers a type-checked AST into NIR functions. Assumes the tree it is
//! given produced zero error diagnostics — the checker's structural rules
//! (every call resolves, every lvalue is addressable, every member access
//! has a struct base) are relied on rather than re-validated here.
//!
//! The lowering cursor is just `self.cursor: BlockId` plus `&mut self.func`:
//! every lowering call that creates blocks or emits a terminator updates
//! `self.cursor` before returning, so callers never see a stale "current
//! block".

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use talonc_base::{Interner, Symbol, Type};
use talonc_front::ast::{
    BinaryOp, Block, CallArgument, Clause, Decl, Expr, ExprKind, FunctionDeclaration, Parameter, Program,
    Stmt, StmtKind, UnaryOp,
};
use talonc_base::types::StructType;

use crate::func::{NIRFunction, StructLayout};
use crate::id::{BlockId, ValueId};
use crate::inst::{ArithOp, CmpOp, Instruction, NirBinaryOp, NirUnaryOp, Terminator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NirBuildError {
    /// A call's or an address-of's target has no way to compute an address
    /// (neither a local name nor a member chain rooted in one).
    CannotComputeAddress { description: String },
}

impl fmt::Display for NirBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NirBuildError::CannotComputeAddress { description } => {
                write!(f, "cannot compute address: {description}")
            }
        }
    }
}

impl std::error::Error for NirBuildError {}

/// Lowers every non-extern top-level function and struct method in
/// `program`. Struct methods are mangled `Struct_method`.
pub fn lower_program(program: &Program, interner: &Interner) -> Result<Vec<NIRFunction>, NirBuildError> {
    let struct_layouts = build_struct_layouts(program, interner);
    let self_symbol = interner.lookup("self");
    let mut functions = Vec::new();

    for decl in &program.declarations {
        match decl {
            Decl::Function(f) => {
                if f.body.is_none() {
                    continue;
                }
                let name = interner.resolve(f.name).to_string();
                functions.push(lower_declared_function(interner, &struct_layouts, name, None, None, f)?);
            }
            Decl::Extern(_) => {}
            Decl::Struct(s) => {
                for m in &s.methods {
                    if m.body.is_none() {
                        continue;
                    }
                    let mangled = format!("{}_{}", interner.resolve(s.name), interner.resolve(m.name));
                    functions.push(lower_declared_function(
                        interner,
                        &struct_layouts,
                        mangled,
                        Some(s.name),
                        self_symbol,
                        m,
                    )?);
                }
            }
        }
    }
    Ok(functions)
}

/// Derives every struct's field layout straight from the AST, independent of
/// the checker's own side tables — shared by lowering and by C struct
/// emission so both see the same field order.
pub fn build_struct_layouts(program: &Program, _interner: &Interner) -> HashMap<Symbol, StructLayout> {
    let mut layouts = HashMap::new();
    for decl in &program.declarations {
        if let Decl::Struct(s) = decl {
            let fields = s
                .fields
                .iter()
                .filter_map(|stmt| match &stmt.kind {
                    StmtKind::VarBinding { name, declared_type, .. } => {
                        let ty = declared_type.as_ref()?.resolved_type()?;
                        Some((*name, ty))
                    }
                    _ => None,
                })
                .collect();
            layouts.insert(s.name, StructLayout { name: s.name, fields });
        }
    }
    layouts
}

fn lower_declared_function(
    interner: &Interner,
    struct_layouts: &HashMap<Symbol, StructLayout>,
    name_text: String,
    owner: Option<Symbol>,
    self_symbol: Option<Symbol>,
    f: &FunctionDeclaration,
) -> Result<NIRFunction, NirBuildError> {
    let mut param_types = Vec::new();
    if let Some(owner_sym) = owner {
        param_types.push(Type::pointer(Type::Struct(Rc::new(StructType {
            name: owner_sym,
            fields: Vec::new(),
            methods: Vec::new(),
        }))));
    }
    for p in &f.parameters {
        if p.is_variadic {
            continue;
        }
        param_types.push(p.type_node.as_ref().expect("non-variadic parameter has a type").resolved_type().expect("checked"));
    }
    let return_type = f.resolved_return_type().unwrap_or(Type::Void);

    let mut lowerer = FunctionLowerer::new(
        interner,
        struct_layouts,
        name_text,
        param_types,
        return_type,
        f.is_variadic(),
        owner,
        self_symbol,
    );
    lowerer.bind_params(&f.parameters);
    lowerer.lower_block(f.body.as_ref().expect("non-extern function has a body"))?;
    lowerer.finish()
}

struct FunctionLowerer<'a> {
    interner: &'a Interner,
    struct_layouts: &'a HashMap<Symbol, StructLayout>,
    current_struct: Option<Symbol>,
    self_symbol: Option<Symbol>,
    locals: HashMap<Symbol, ValueId>,
    func: NIRFunction,
    cursor: BlockId,
    return_type: Type,
}

impl<'a> FunctionLowerer<'a> {
    fn new(
        interner: &'a Interner,
        struct_layouts: &'a HashMap<Symbol, StructLayout>,
        name: String,
        param_types: Vec<Type>,
        return_type: Type,
        is_variadic: bool,
        current_struct: Option<Symbol>,
        self_symbol: Option<Symbol>,
    ) -> Self {
        let func = NIRFunction::new(name, param_types, return_type.clone(), is_variadic);
        let cursor = func.entry;
        FunctionLowerer {
            interner,
            struct_layouts,
            current_struct,
            self_symbol,
            locals: HashMap::new(),
            func,
            cursor,
            return_type,
        }
    }

    fn text(&self, sym: Symbol) -> &'a str {
        self.interner.resolve(sym)
    }

    fn bind_params(&mut self, params: &[Parameter]) {
        let mut index = 0;
        if let (Some(_), Some(self_sym)) = (self.current_struct, self.self_symbol) {
            let ty = self.func.param_types()[index].clone();
            self.promote_param(self_sym, ty, index);
            index += 1;
        }
        for p in params {
            if p.is_variadic {
                continue;
            }
            let ty = self.func.param_types()[index].clone();
            self.promote_param(p.name, ty, index);
            index += 1;
        }
    }

    /// Entry-block alloca+store promotion: every named parameter is
    /// rebound to the address of a fresh local so reads/writes/address-of
    /// all go through the same `FieldAddress`/`Load`/`Store` machinery as
    /// any other local.
    fn promote_param(&mut self, name: Symbol, ty: Type, index: usize) {
        let incoming = self.func.entry_param_value(index);
        let alloca = self
            .func
            .push_instruction(
                self.cursor,
                Instruction::Alloca { ty: ty.clone(), name_hint: Some(self.text(name).to_string()) },
                Type::pointer(ty),
            )
            .expect("alloca always produces a value");
        self.func
            .push_instruction(self.cursor, Instruction::Store { address: alloca, value: incoming }, Type::Void);
        self.locals.insert(name, alloca);
    }

    fn finish(mut self) -> Result<NIRFunction, NirBuildError> {
        if !self.func.block(self.cursor).is_sealed() {
            let term = self.default_return()?;
            self.func.seal(self.cursor, term);
        }
        Ok(self.func)
    }

    fn default_return(&mut self) -> Result<Terminator, NirBuildError> {
        if self.return_type == Type::Void {
            return Ok(Terminator::Return { value: None });
        }
        let zero = self.zero_value(self.return_type.clone());
        Ok(Terminator::Return { value: Some(zero) })
    }

    fn zero_value(&mut self, ty: Type) -> ValueId {
        match &ty {
            Type::Int | Type::Int8 | Type::Int32 => self.func.const_int(0, ty),
            Type::Bool => self.func.const_bool(false),
            _ => self.func.undef(ty),
        }
    }

    fn is_sealed(&self) -> bool {
        self.func.block(self.cursor).is_sealed()
    }

    // ---- statements --------------------------------------------------

    fn lower_block(&mut self, block: &Block) -> Result<(), NirBuildError> {
        for stmt in block {
            if self.is_sealed() {
                break; // unreachable code after return/branch: nothing left to lower
            }
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), NirBuildError> {
        match &stmt.kind {
            StmtKind::Block(b) => self.lower_block(b),
            StmtKind::VarBinding { name, declared_type, initializer } => {
                let ty = declared_type
                    .as_ref()
                    .and_then(|t| t.resolved_type())
                    .or_else(|| initializer.as_ref().and_then(|e| e.resolved_type()))
                    .expect("checked var binding has a type");
                let alloca = self
                    .func
                    .push_instruction(
                        self.cursor,
                        Instruction::Alloca { ty: ty.clone(), name_hint: Some(self.text(*name).to_string()) },
                        Type::pointer(ty),
                    )
                    .expect("alloca always produces a value");
                self.locals.insert(*name, alloca);
                if let Some(init) = initializer {
                    let value = self.lower_expr(init)?;
                    self.func.push_instruction(self.cursor, Instruction::Store { address: alloca, value }, Type::Void);
                }
                Ok(())
            }
            StmtKind::AssignStatement { target, value } => {
                let v = self.lower_expr(value)?;
                let addr = self.identifier_address(*target)?;
                self.func.push_instruction(self.cursor, Instruction::Store { address: addr, value: v }, Type::Void);
                Ok(())
            }
            StmtKind::LValueAssignStatement { target, value } => {
                let v = self.lower_expr(value)?;
                let addr = self.lower_lvalue_address(target)?;
                self.func.push_instruction(self.cursor, Instruction::Store { address: addr, value: v }, Type::Void);
                Ok(())
            }
            StmtKind::ReturnStatement { value } => {
                let v = match value {
                    Some(e) => Some(self.lower_expr(e)?),
                    None => None,
                };
                self.func.seal(self.cursor, Terminator::Return { value: v });
                Ok(())
            }
            StmtKind::ExpressionStatement { expr } => {
                self.lower_expr(expr)?;
                Ok(())
            }
            StmtKind::IfStatement { clauses, else_block } => self.lower_if(clauses, else_block.as_ref()),
        }
    }

    fn struct_name_of(&self, expr: &Expr) -> Symbol {
        match expr.resolved_type() {
            Some(Type::Struct(s)) => s.name,
            _ => Symbol::EMPTY,
        }
    }

    fn lower_if(&mut self, clauses: &[Clause], else_block: Option<&Block>) -> Result<(), NirBuildError> {
        let merge = self.func.new_block("if_merge");
        let n = clauses.len();
        for (i, clause) in clauses.iter().enumerate() {
            let cond = self.lower_expr(&clause.condition)?;
            let then_block = self.func.new_block("if_then");
            let next_block = if i + 1 < n {
                self.func.new_block("if_cond")
            } else if else_block.is_some() {
                self.func.new_block("if_else")
            } else {
                merge
            };
            self.func.seal(
                self.cursor,
                Terminator::Branch {
                    cond,
                    true_target: then_block,
                    true_args: vec![],
                    false_target: next_block,
                    false_args: vec![],
                },
            );
            self.cursor = then_block;
            self.lower_block(&clause.body)?;
            if !self.is_sealed() {
                self.func.seal(self.cursor, Terminator::Jump { target: merge, args: vec![] });
            }
            self.cursor = next_block;
        }
        if let Some(else_body) = else_block {
            self.lower_block(else_body)?;
            if !self.is_sealed() {
                self.func.seal(self.cursor, Terminator::Jump { target: merge, args: vec![] });
            }
        }
        self.cursor = merge;
        Ok(())
    }

    // ---- expressions ---------------------------------------------------

    fn lower_expr(&mut self, expr: &Expr) -> Result<ValueId, NirBuildError> {
        let ty = expr.resolved_type().expect("checked expression has a resolved type");
        match &expr.kind {
            ExprKind::IntegerLiteral(sym) => {
                let n = self.text(*sym).parse::<i64>().unwrap_or(0);
                Ok(self.func.const_int(n, ty))
            }
            ExprKind::StringLiteral(sym) => Ok(self.func.const_str(self.text(*sym).to_string())),
            ExprKind::BooleanLiteral(b) => Ok(self.func.const_bool(*b)),
            ExprKind::Identifier(name) => {
                let addr = self.identifier_address(*name)?;
                Ok(self.func.push_instruction(self.cursor, Instruction::Load { address: addr }, ty).expect("load always produces a value"))
            }
            ExprKind::Binary { op, left, right } if op.is_short_circuit() => self.lower_short_circuit(*op, left, right),
            ExprKind::Binary { op, left, right } => {
                let l = self.lower_expr(left)?;
                let r = self.lower_expr(right)?;
                let nir_op = nir_binary_op(*op);
                Ok(self
                    .func
                    .push_instruction(self.cursor, Instruction::BinaryOp { op: nir_op, lhs: l, rhs: r }, ty)
                    .expect("binary op always produces a value"))
            }
            ExprKind::Unary { op: UnaryOp::AddressOf, operand } => self.lower_lvalue_address(operand),
            ExprKind::Unary { op: UnaryOp::Deref, operand } => {
                let ptr = self.lower_expr(operand)?;
                Ok(self
                    .func
                    .push_instruction(self.cursor, Instruction::Load { address: ptr }, ty)
                    .expect("load always produces a value"))
            }
            ExprKind::Unary { op: UnaryOp::Neg, operand } => {
                let v = self.lower_expr(operand)?;
                Ok(self
                    .func
                    .push_instruction(self.cursor, Instruction::UnaryOp { op: NirUnaryOp::Neg, value: v }, ty)
                    .expect("unary op always produces a value"))
            }
            ExprKind::Unary { op: UnaryOp::Not, operand } => {
                let v = self.lower_expr(operand)?;
                Ok(self
                    .func
                    .push_instruction(self.cursor, Instruction::UnaryOp { op: NirUnaryOp::Not, value: v }, ty)
                    .expect("unary op always produces a value"))
            }
            ExprKind::Cast { expr: inner, .. } => {
                let v = self.lower_expr(inner)?;
                Ok(self
                    .func
                    .push_instruction(self.cursor, Instruction::Cast { value: v, target: ty.clone() }, ty)
                    .expect("cast always produces a value"))
            }
            ExprKind::MemberAccess { .. } => {
                let addr = self.lower_lvalue_address(expr)?;
                Ok(self.func.push_instruction(self.cursor, Instruction::Load { address: addr }, ty).expect("load always produces a value"))
            }
            ExprKind::Call { callee, args } => self.lower_call(expr, callee, args),
        }
    }

    fn lower_short_circuit(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<ValueId, NirBuildError> {
        let is_and = op == BinaryOp::And;
        let l = self.lower_expr(left)?;
        let continue_block = self.func.new_block(if is_and { "and_rhs" } else { "or_rhs" });
        let merge_block = self.func.new_block(if is_and { "and_merge" } else { "or_merge" });
        let merge_param = self.func.add_block_param(merge_block, Type::Bool);

        let short_circuit = self.func.const_bool(!is_and);
        if is_and {
            self.func.seal(
                self.cursor,
                Terminator::Branch {
                    cond: l,
                    true_target: continue_block,
                    true_args: vec![],
                    false_target: merge_block,
                    false_args: vec![short_circuit],
                },
            );
        } else {
            self.func.seal(
                self.cursor,
                Terminator::Branch {
                    cond: l,
                    true_target: merge_block,
                    true_args: vec![short_circuit],
                    false_target: continue_block,
                    false_args: vec![],
                },
            );
        }
        self.cursor = continue_block;
        let r = self.lower_expr(right)?;
        if !self.is_sealed() {
            self.func.seal(self.cursor, Terminator::Jump { target: merge_block, args: vec![r] });
        }
        self.cursor = merge_block;
        Ok(merge_param)
    }

    fn lower_call(&mut self, call_expr: &Expr, callee: &Expr, args: &[CallArgument]) -> Result<ValueId, NirBuildError> {
        let return_type = call_expr.resolved_type().expect("checked call has a resolved type");

        if let ExprKind::Identifier(name) = &callee.kind {
            if args.len() == 1 && is_primitive_name(self.text(*name)) {
                let value = self.lower_expr(&args[0].value)?;
                return Ok(self
                    .func
                    .push_instruction(self.cursor, Instruction::Cast { value, target: return_type.clone() }, return_type)
                    .expect("cast always produces a value"));
            }
        }

        if let ExprKind::MemberAccess { base, member } = &callee.kind {
            let receiver = self.lower_lvalue_address(base)?;
            let owner = self.struct_name_of(base);
            let mangled = format!("{}_{}", self.text(owner), self.text(*member));
            let mut call_args = Vec::with_capacity(args.len() + 1);
            call_args.push(receiver);
            for a in args {
                call_args.push(self.lower_expr(&a.value)?);
            }
            return Ok(self
                .func
                .push_instruction(self.cursor, Instruction::Call { callee: mangled, args: call_args }, return_type)
                .expect("call always produces a value"));
        }

        let name = match &callee.kind {
            ExprKind::Identifier(name) => self.text(*name).to_string(),
            _ => {
                return Err(NirBuildError::CannotComputeAddress {
                    description: "call target is neither a named function nor a member access".to_string(),
                })
            }
        };
        let mut call_args = Vec::with_capacity(args.len());
        for a in args {
            call_args.push(self.lower_expr(&a.value)?);
        }
        Ok(self
            .func
            .push_instruction(self.cursor, Instruction::Call { callee: name, args: call_args }, return_type)
            .expect("call always produces a value"))
    }

    /// Address of any lvalue form: a local/implicit-field name, a
    /// dereferenced pointer, or a member-access chain. A chain of `n`
    /// `.`/`->` accesses lowers to `n` single-field `FieldAddress`
    /// instructions rather than one multi-segment instruction — operationally
    /// equivalent, since each intermediate address is already exactly the
    /// struct pointer the next level needs.
    fn lower_lvalue_address(&mut self, expr: &Expr) -> Result<ValueId, NirBuildError> {
        match &expr.kind {
            ExprKind::Identifier(name) => self.identifier_address(*name),
            ExprKind::Unary { op: UnaryOp::Deref, operand } => self.lower_expr(operand),
            ExprKind::MemberAccess { base, member } => {
                let base_addr = self.lower_lvalue_address(base)?;
                let field_ty = expr.resolved_type().expect("checked member access has a resolved type");
                Ok(self
                    .func
                    .push_instruction(
                        self.cursor,
                        Instruction::FieldAddress { base: base_addr, path: vec![*member] },
                        Type::pointer(field_ty),
                    )
                    .expect("field address always produces a value"))
            }
            other => Err(NirBuildError::CannotComputeAddress { description: format!("{other:?} is not an lvalue") }),
        }
    }

    fn identifier_address(&mut self, name: Symbol) -> Result<ValueId, NirBuildError> {
        if let Some(addr) = self.locals.get(&name) {
            return Ok(*addr);
        }
        if let Some(owner) = self.current_struct {
            if let Some(field_ty) = self.struct_layouts.get(&owner).and_then(|l| l.field_type(name)).cloned() {
                let self_ptr = self.load_self_pointer()?;
                return Ok(self
                    .func
                    .push_instruction(
                        self.cursor,
                        Instruction::FieldAddress { base: self_ptr, path: vec![name] },
                        Type::pointer(field_ty),
                    )
                    .expect("field address always produces a value"));
            }
        }
        Err(NirBuildError::CannotComputeAddress { description: format!("'{}' is not addressable", self.text(name)) })
    }

    fn load_self_pointer(&mut self) -> Result<ValueId, NirBuildError> {
        let self_sym = self
            .self_symbol
            .filter(|_| self.current_struct.is_some())
            .ok_or_else(|| NirBuildError::CannotComputeAddress { description: "no 'self' in scope".to_string() })?;
        let addr = *self
            .locals
            .get(&self_sym)
            .ok_or_else(|| NirBuildError::CannotComputeAddress { description: "'self' is not bound".to_string() })?;
        let pointee = self.func.type_of(addr).as_pointer().expect("self's own alloca is a pointer").clone();
        Ok(self.func.push_instruction(self.cursor, Instruction::Load { address: addr }, pointee).expect("load always produces a value"))
    }
}

fn is_primitive_name(text: &str) -> bool {
    matches!(text, "Int" | "Int8" | "Int32" | "Bool" | "Void")
}

fn nir_binary_op(op: BinaryOp) -> NirBinaryOp {
    match op {
        BinaryOp::Add => NirBinaryOp::Arith(ArithOp::Add),
        BinaryOp::Sub => NirBinaryOp::Arith(ArithOp::Sub),
        BinaryOp::Mul => NirBinaryOp::Arith(ArithOp::Mul),
        BinaryOp::Div => NirBinaryOp::Arith(ArithOp::Div),
        BinaryOp::Mod => NirBinaryOp::Arith(ArithOp::Mod),
        BinaryOp::Eq => NirBinaryOp::Cmp(CmpOp::Eq),
        BinaryOp::NotEq => NirBinaryOp::Cmp(CmpOp::NotEq),
        BinaryOp::Lt => NirBinaryOp::Cmp(CmpOp::Lt),
        BinaryOp::Le => NirBinaryOp::Cmp(CmpOp::Le),
        BinaryOp::Gt => NirBinaryOp::Cmp(CmpOp::Gt),
        BinaryOp::Ge => NirBinaryOp::Cmp(CmpOp::Ge),
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit operators never reach instruction lowering"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talonc_check::check_program;
    use talonc_front::{Lexer, Parser};

    fn lower(source: &str) -> Vec<NIRFunction> {
        let mut interner = Interner::new();
        let tokens = Lexer::new(source).tokenize(&mut interner).expect("lex");
        let program = Parser::new(tokens).parse_program().expect("parse");
        let diags = check_program(&program, &interner);
        assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
        lower_program(&program, &interner).expect("lower")
    }

    #[test]
    fn arithmetic_function_lowers_to_a_single_well_formed_block() {
        let funcs = lower("func f(_ x: Int, _ y: Int) -> Int { return x + y * 2 }");
        assert_eq!(funcs.len(), 1);
        assert!(funcs[0].is_well_formed());
        assert_eq!(funcs[0].block_count(), 1);
    }

    #[test]
    fn if_else_if_else_creates_one_block_per_branch_plus_merge() {
        let funcs = lower(
            "func g(_ n: Int) -> Int { if n > 10 { return 1 } else if n > 5 { return 2 } else { return 3 } }",
        );
        assert!(funcs[0].is_well_formed());
        // then(clause1) + cond(clause2) + then(clause2) + else + merge
        assert_eq!(funcs[0].block_count(), 5);
    }

    #[test]
    fn short_circuit_or_creates_rhs_and_merge_blocks_with_a_bool_parameter() {
        let funcs = lower("func f() -> Bool { return true || false }");
        assert!(funcs[0].is_well_formed());
        assert_eq!(funcs[0].block_count(), 3); // entry + rhs + merge
    }

    #[test]
    fn struct_method_mangles_to_struct_underscore_method() {
        let funcs = lower(
            "struct Counter { var value: Int\n\
             func inc(_ d: Int) { value = value + d }\n\
             func get() -> Int { return value } }",
        );
        assert!(funcs.iter().any(|f| f.name == "Counter_inc"));
        assert!(funcs.iter().any(|f| f.name == "Counter_get"));
    }

    #[test]
    fn method_call_passes_receiver_address_as_first_argument() {
        let funcs = lower(
            "struct Counter { var value: Int\n func inc(_ d: Int) { value = value + d } }\n\
             func main() -> Int32 { var c: Counter; c.inc(5); return Int32(0) }",
        );
        let main = funcs.iter().find(|f| f.name == "main").unwrap();
        let found_call = main.blocks().any(|(_, b)| {
            b.instructions.iter().any(|(_, inst)| matches!(inst, Instruction::Call { callee, args } if callee == "Counter_inc" && args.len() == 2))
        });
        assert!(found_call);
    }

    #[test]
    fn function_with_no_explicit_return_gets_a_default_return() {
        let funcs = lower("func main() -> Int32 { var unused: Int = 1 }");
        let main = &funcs[0];
        assert!(main.is_well_formed());
        let (_, entry) = main.blocks().next().unwrap();
        assert!(matches!(entry.terminator, Some(Terminator::Return { value: Some(_) })));
    }

    #[test]
    fn primitive_cast_call_lowers_to_cast_instruction() {
        let funcs = lower("func f(_ x: Int) -> Int32 { return Int32(x) }");
        let f = &funcs[0];
        let (_, entry) = f.blocks().next().unwrap();
        assert!(entry.instructions.iter().any(|(_, i)| matches!(i, Instruction::Cast { .. })));
    }

    proptest::proptest! {
        /// Every terminator's branch-argument arity matches its target
        /// block's parameter arity, across lowered functions built from
        /// randomly chosen operands in a short-circuit-heavy boolean
        /// expression (the shape that actually creates rhs/merge blocks).
        #[test]
        fn branch_argument_arity_matches_target_params(a in -1000i64..1000, b in -1000i64..1000, c in -1000i64..1000, d in -1000i64..1000) {
            let source = format!("func f() -> Bool {{ return ({a} > {b}) && ({c} > {d}) || ({a} < {c}) }}");
            let funcs = lower(&source);
            let func = &funcs[0];
            for (_, block) in func.blocks() {
                match &block.terminator {
                    Some(Terminator::Jump { target, args }) => {
                        proptest::prop_assert_eq!(args.len(), func.block(*target).params.len());
                    }
                    Some(Terminator::Branch { true_target, true_args, false_target, false_args, .. }) => {
                        proptest::prop_assert_eq!(true_args.len(), func.block(*true_target).params.len());
                        proptest::prop_assert_eq!(false_args.len(), func.block(*false_target).params.len());
                    }
                    Some(Terminator::Return { .. }) | None => {}
                }
            }
        }
    }
}
