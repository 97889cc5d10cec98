//! Two-pass type checker (pass 1: populate the global scope; pass 2: walk
//! every body). Produces a [`Diagnostics`] accumulator; never aborts on its
//! own, since every category in the taxonomy is recoverable in-band.

use std::collections::HashMap;
use std::rc::Rc;

use talonc_base::{Category, Diagnostics, Interner, Symbol, SymbolEq, Type, FunctionType, StructType};
use talonc_front::ast::{
    Clause, Decl, Expr, ExprKind, FunctionDeclaration, Program, Stmt, StmtKind, StructDeclaration,
    TypeNode, TypeNodeKind, UnaryOp, BinaryOp, CallArgument,
};

use crate::env::Env;

/// Runs both checker passes over `program` and returns the accumulated
/// diagnostics. Resolved types are stashed in place on the AST's
/// `resolvedType`/`resolved_return_type` slots as a side effect.
pub fn check_program(program: &Program, interner: &Interner) -> Diagnostics {
    let mut checker = Checker::new(interner);
    checker.run(program);
    checker.diagnostics
}

struct Checker<'a> {
    interner: &'a Interner,
    diagnostics: Diagnostics,
    structs: HashMap<Symbol, Rc<StructType>>,
    struct_fields: HashMap<Symbol, Vec<(Symbol, Type)>>,
    struct_methods: HashMap<Symbol, Vec<(Symbol, Rc<FunctionType>)>>,
    functions: HashMap<Symbol, Rc<FunctionType>>,
    self_symbol: Option<Symbol>,
    env: Env,
    current_struct: Option<Symbol>,
    current_return_type: Type,
}

impl<'a> Checker<'a> {
    fn new(interner: &'a Interner) -> Self {
        Self {
            interner,
            diagnostics: Diagnostics::new(),
            structs: HashMap::new(),
            struct_fields: HashMap::new(),
            struct_methods: HashMap::new(),
            functions: HashMap::new(),
            self_symbol: interner.lookup("self"),
            env: Env::new(),
            current_struct: None,
            current_return_type: Type::Void,
        }
    }

    fn run(&mut self, program: &Program) {
        for decl in &program.declarations {
            if let Decl::Struct(s) = decl {
                self.structs.insert(s.name, Rc::new(StructType { name: s.name, fields: vec![], methods: vec![] }));
            }
        }
        for decl in &program.declarations {
            match decl {
                Decl::Struct(s) => self.register_struct_body(s),
                Decl::Function(f) => {
                    let ft = self.build_function_type(f, None);
                    self.functions.insert(f.name, Rc::new(ft));
                }
                Decl::Extern(e) => {
                    let ft = self.build_function_type(&e.function, None);
                    self.functions.insert(e.function.name, Rc::new(ft));
                }
            }
        }
        for decl in &program.declarations {
            match decl {
                Decl::Function(f) => {
                    self.current_struct = None;
                    self.check_function(f);
                }
                Decl::Extern(_) => {}
                Decl::Struct(s) => {
                    for m in &s.methods {
                        self.current_struct = Some(s.name);
                        self.check_function(m);
                    }
                }
            }
        }
    }

    fn text(&self, sym: Symbol) -> String {
        self.interner.resolve(sym).to_string()
    }

    // --- pass 1 ---------------------------------------------------------

    fn register_struct_body(&mut self, s: &StructDeclaration) {
        let mut fields = Vec::new();
        for field_stmt in &s.fields {
            if let StmtKind::VarBinding { name, declared_type, .. } = &field_stmt.kind {
                let ty = match declared_type {
                    Some(t) => self.resolve_type_node(t),
                    None => {
                        self.diagnostics.push(field_stmt.range, Category::MissingFieldType { name: self.text(*name) });
                        Type::Unknown
                    }
                };
                fields.push((*name, ty));
            }
        }
        self.struct_fields.insert(s.name, fields);

        let mut methods = Vec::new();
        for m in &s.methods {
            let ft = self.build_function_type(m, Some(s.name));
            methods.push((m.name, Rc::new(ft)));
        }
        self.struct_methods.insert(s.name, methods);
    }

    fn build_function_type(&mut self, f: &FunctionDeclaration, owner: Option<Symbol>) -> FunctionType {
        let mut params = Vec::new();
        let mut labels = Vec::new();
        let mut is_variadic = false;

        if let Some(owner_name) = owner {
            let owner_struct = self.structs.get(&owner_name).expect("struct registered in pass 1a").clone();
            params.push(Type::Pointer(Rc::new(Type::Struct(owner_struct))));
            labels.push(self.self_symbol);
        }

        for p in &f.parameters {
            if p.is_variadic {
                is_variadic = true;
                continue;
            }
            let ty = p.type_node.as_ref().map(|t| self.resolve_type_node(t)).unwrap_or(Type::Unknown);
            params.push(ty);
            labels.push(p.external_label);
        }

        let return_type = match &f.return_type {
            Some(t) => self.resolve_type_node(t),
            None => Type::Void,
        };
        f.set_resolved_return_type(return_type.clone());

        FunctionType { params, labels, return_type, is_variadic }
    }

    fn resolve_type_node(&mut self, node: &TypeNode) -> Type {
        let ty = match &node.kind {
            TypeNodeKind::Pointer(inner) => Type::Pointer(Rc::new(self.resolve_type_node(inner))),
            TypeNodeKind::Named(sym) => {
                if let Some(primitive) = self.primitive_for(*sym) {
                    primitive
                } else if let Some(st) = self.structs.get(sym) {
                    Type::Struct(st.clone())
                } else {
                    self.diagnostics.push(node.range, Category::UnknownType);
                    Type::Unknown
                }
            }
        };
        node.set_resolved_type(ty.clone());
        ty
    }

    fn primitive_for(&self, sym: Symbol) -> Option<Type> {
        if sym.is(self.interner, "Int") {
            Some(Type::Int)
        } else if sym.is(self.interner, "Int8") {
            Some(Type::Int8)
        } else if sym.is(self.interner, "Int32") {
            Some(Type::Int32)
        } else if sym.is(self.interner, "Bool") {
            Some(Type::Bool)
        } else if sym.is(self.interner, "Void") {
            Some(Type::Void)
        } else {
            None
        }
    }

    // --- pass 2 -----------------------------------------------------------

    fn check_function(&mut self, func: &FunctionDeclaration) {
        let Some(body) = &func.body else { return };
        self.env = Env::new();

        if let Some(owner) = self.current_struct {
            if let Some(self_sym) = self.self_symbol {
                let st = self.structs.get(&owner).expect("struct registered").clone();
                self.env.bind(self_sym, Type::Pointer(Rc::new(Type::Struct(st))));
            }
        }
        for param in &func.parameters {
            if param.is_variadic {
                continue;
            }
            let ty = param.type_node.as_ref().map(|t| t.resolved_type().unwrap_or(Type::Unknown)).unwrap_or(Type::Unknown);
            self.env.bind(param.name, ty);
        }

        self.current_return_type = func.resolved_return_type().unwrap_or(Type::Void);
        for stmt in body {
            self.check_stmt(stmt);
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block(block) => {
                self.env.push_scope();
                for s in block {
                    self.check_stmt(s);
                }
                self.env.pop_scope();
            }
            StmtKind::VarBinding { name, declared_type, initializer } => {
                let declared_ty = declared_type.as_ref().map(|t| self.resolve_type_node(t));
                let init_ty = initializer.as_ref().map(|e| self.check_expr(e));
                let final_ty = match (&declared_ty, &init_ty) {
                    (Some(d), Some(i)) => {
                        if d != i {
                            self.diagnostics.push(
                                stmt.range,
                                Category::TypeMismatch { expected: d.to_string(), actual: i.to_string() },
                            );
                        }
                        d.clone()
                    }
                    (Some(d), None) => d.clone(),
                    (None, Some(i)) => i.clone(),
                    (None, None) => {
                        self.diagnostics.push(stmt.range, Category::MissingInitializer { name: self.text(*name) });
                        Type::Unknown
                    }
                };
                self.env.bind(*name, final_ty);
            }
            StmtKind::AssignStatement { target, value } => {
                let value_ty = self.check_expr(value);
                let target_ty = self.resolve_identifier(*target, stmt.range);
                if target_ty != Type::Unknown && value_ty != Type::Unknown && target_ty != value_ty {
                    self.diagnostics.push(
                        stmt.range,
                        Category::TypeMismatch { expected: target_ty.to_string(), actual: value_ty.to_string() },
                    );
                }
            }
            StmtKind::LValueAssignStatement { target, value } => {
                let target_ty = self.check_expr(target);
                let value_ty = self.check_expr(value);
                if !is_lvalue(target) {
                    self.diagnostics.push(target.range, Category::CannotAssign { ty: target_ty.to_string() });
                } else if target_ty != Type::Unknown && value_ty != Type::Unknown && target_ty != value_ty {
                    self.diagnostics.push(
                        stmt.range,
                        Category::TypeMismatch { expected: target_ty.to_string(), actual: value_ty.to_string() },
                    );
                }
            }
            StmtKind::ReturnStatement { value } => {
                let value_ty = value.as_ref().map(|e| self.check_expr(e)).unwrap_or(Type::Void);
                if value_ty != self.current_return_type {
                    self.diagnostics.push(
                        stmt.range,
                        Category::TypeMismatch {
                            expected: self.current_return_type.to_string(),
                            actual: value_ty.to_string(),
                        },
                    );
                }
            }
            StmtKind::ExpressionStatement { expr } => {
                self.check_expr(expr);
            }
            StmtKind::IfStatement { clauses, else_block } => {
                for Clause { condition, body } in clauses {
                    let cond_ty = self.check_expr(condition);
                    if cond_ty != Type::Bool {
                        self.diagnostics
                            .push(condition.range, Category::NonBooleanCondition { ty: cond_ty.to_string() });
                    }
                    self.env.push_scope();
                    for s in body {
                        self.check_stmt(s);
                    }
                    self.env.pop_scope();
                }
                if let Some(block) = else_block {
                    self.env.push_scope();
                    for s in block {
                        self.check_stmt(s);
                    }
                    self.env.pop_scope();
                }
            }
        }
    }

    fn resolve_identifier(&mut self, sym: Symbol, range: talonc_base::SourceRange) -> Type {
        if let Some(ty) = self.env.lookup(sym) {
            return ty;
        }
        if let Some(owner) = self.current_struct {
            if let Some(fields) = self.struct_fields.get(&owner) {
                if let Some((_, ty)) = fields.iter().find(|(n, _)| *n == sym) {
                    return ty.clone();
                }
            }
        }
        if let Some(ft) = self.functions.get(&sym) {
            return Type::Function(ft.clone());
        }
        self.diagnostics.push(range, Category::UndefinedVariable { name: self.text(sym) });
        Type::Unknown
    }

    fn check_expr(&mut self, expr: &Expr) -> Type {
        let ty = match &expr.kind {
            ExprKind::IntegerLiteral(_) => Type::Int,
            ExprKind::StringLiteral(_) => Type::Pointer(Rc::new(Type::Int8)),
            ExprKind::BooleanLiteral(_) => Type::Bool,
            ExprKind::Identifier(sym) => self.resolve_identifier(*sym, expr.range),
            ExprKind::Unary { op, operand } => self.check_unary(*op, operand),
            ExprKind::Binary { op, left, right } => self.check_binary(*op, left, right),
            ExprKind::Call { callee, args } => self.check_call(callee, args, expr.range),
            ExprKind::Cast { target_type, expr: inner } => {
                let target = self.resolve_type_node(target_type);
                self.check_expr(inner);
                target
            }
            ExprKind::MemberAccess { base, member } => self.check_member_access(base, *member, expr.range),
        };
        expr.set_resolved_type(ty.clone());
        ty
    }

    fn check_unary(&mut self, op: UnaryOp, operand: &Expr) -> Type {
        let ty = self.check_expr(operand);
        match op {
            UnaryOp::Neg => {
                if ty.is_integer() {
                    ty
                } else {
                    self.diagnostics.push(
                        operand.range,
                        Category::InvalidUnaryOperand { op: op.text().to_string(), ty: ty.to_string() },
                    );
                    Type::Unknown
                }
            }
            UnaryOp::Not => {
                if ty == Type::Bool {
                    Type::Bool
                } else {
                    self.diagnostics.push(
                        operand.range,
                        Category::InvalidUnaryOperand { op: op.text().to_string(), ty: ty.to_string() },
                    );
                    Type::Unknown
                }
            }
            UnaryOp::AddressOf => {
                if is_lvalue(operand) {
                    Type::Pointer(Rc::new(ty))
                } else {
                    self.diagnostics.push(operand.range, Category::CannotTakeAddress { ty: ty.to_string() });
                    Type::Unknown
                }
            }
            UnaryOp::Deref => match ty.as_pointer() {
                Some(inner) => inner.clone(),
                None => {
                    self.diagnostics.push(operand.range, Category::CannotDereference { ty: ty.to_string() });
                    Type::Unknown
                }
            },
        }
    }

    fn check_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> Type {
        let lt = self.check_expr(left);
        let rt = self.check_expr(right);
        let range = left.range.merge(&right.range);
        match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                if lt.is_integer() && lt == rt {
                    lt
                } else {
                    self.invalid_binary(op, &lt, &rt, range)
                }
            }
            BinaryOp::And | BinaryOp::Or => {
                if lt == Type::Bool && rt == Type::Bool {
                    Type::Bool
                } else {
                    self.invalid_binary(op, &lt, &rt, range)
                }
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                if lt == rt && (lt.is_integer() || lt == Type::Bool) {
                    Type::Bool
                } else {
                    self.invalid_binary(op, &lt, &rt, range)
                }
            }
            BinaryOp::Eq | BinaryOp::NotEq => {
                if lt == rt {
                    Type::Bool
                } else {
                    self.invalid_binary(op, &lt, &rt, range)
                }
            }
        }
    }

    fn invalid_binary(&mut self, op: BinaryOp, lt: &Type, rt: &Type, range: talonc_base::SourceRange) -> Type {
        self.diagnostics.push(
            range,
            Category::InvalidBinaryOperands { op: op.text().to_string(), lhs: lt.to_string(), rhs: rt.to_string() },
        );
        Type::Unknown
    }

    fn check_member_access(&mut self, base: &Expr, member: Symbol, range: talonc_base::SourceRange) -> Type {
        let base_ty = self.check_expr(base);
        match base_ty.as_struct() {
            Some(st) => {
                let owner = st.name;
                if let Some(fields) = self.struct_fields.get(&owner) {
                    if let Some((_, ty)) = fields.iter().find(|(n, _)| *n == member) {
                        return ty.clone();
                    }
                }
                if let Some(methods) = self.struct_methods.get(&owner) {
                    if let Some((_, ft)) = methods.iter().find(|(n, _)| *n == member) {
                        return Type::Function(Rc::new(without_self(ft)));
                    }
                }
                self.diagnostics.push(
                    range,
                    Category::UnknownMember { ty: base_ty.to_string(), member: self.text(member) },
                );
                Type::Unknown
            }
            None => {
                self.diagnostics.push(range, Category::InvalidMemberAccess { ty: base_ty.to_string() });
                Type::Unknown
            }
        }
    }

    fn check_call(&mut self, callee: &Expr, args: &[CallArgument], call_range: talonc_base::SourceRange) -> Type {
        if let ExprKind::Identifier(sym) = &callee.kind {
            if let Some(primitive) = self.primitive_for(*sym) {
                if args.len() == 1 && args[0].label.is_none() {
                    self.check_expr(&args[0].value);
                    callee.set_resolved_type(primitive.clone());
                    return primitive;
                }
            }
            if self.structs.contains_key(sym) {
                self.diagnostics.push(
                    callee.range,
                    Category::NotCallable { ty: Type::Struct(self.structs[sym].clone()).to_string() },
                );
                for a in args {
                    self.check_expr(&a.value);
                }
                return Type::Unknown;
            }
        }

        let callee_ty = self.check_expr(callee);
        match callee_ty.clone() {
            Type::Function(ft) => self.check_call_arguments(ft, args, call_range),
            _ => {
                self.diagnostics.push(callee.range, Category::NotCallable { ty: callee_ty.to_string() });
                for a in args {
                    self.check_expr(&a.value);
                }
                Type::Unknown
            }
        }
    }

    fn check_call_arguments(
        &mut self,
        ft: Rc<FunctionType>,
        args: &[CallArgument],
        call_range: talonc_base::SourceRange,
    ) -> Type {
        let declared = ft.params.len();
        let supplied = args.len();
        let count_ok = if ft.is_variadic { supplied >= declared } else { supplied == declared };
        if !count_ok {
            self.diagnostics.push(call_range, Category::ArgumentCountMismatch { expected: declared, actual: supplied });
        }

        let checked_len = declared.min(supplied);
        let mut declared_labels = Vec::with_capacity(checked_len);
        let mut supplied_labels = Vec::with_capacity(checked_len);

        for i in 0..checked_len {
            let arg = &args[i];
            let arg_ty = self.check_expr(&arg.value);
            let expected_ty = &ft.params[i];
            if &arg_ty != expected_ty {
                self.diagnostics.push(
                    arg.value.range,
                    Category::TypeMismatch { expected: expected_ty.to_string(), actual: arg_ty.to_string() },
                );
            }
            declared_labels.push(ft.labels[i]);
            supplied_labels.push(arg.label);
        }

        for arg in args.iter().skip(checked_len) {
            let arg_ty = self.check_expr(&arg.value);
            self.diagnostics.push(arg.value.range, Category::VariadicArgument { ty: arg_ty.to_string() });
        }

        let declared_present: Vec<Symbol> = declared_labels.iter().copied().flatten().collect();
        let supplied_present: Vec<Symbol> = supplied_labels.iter().copied().flatten().collect();
        let is_pure_reorder = declared_present.len() == supplied_present.len() && declared_present != supplied_present && {
            let mut ds = declared_present.clone();
            ds.sort();
            let mut ss = supplied_present.clone();
            ss.sort();
            ds == ss
        };

        if is_pure_reorder {
            // A pure permutation of the declared labels gets exactly one
            // diagnostic, not one per swapped position too.
            self.diagnostics.push(
                call_range,
                Category::ArgumentLabelOrderMismatch {
                    expected: declared_present.iter().map(|s| self.text(*s)).collect(),
                    got: supplied_present.iter().map(|s| self.text(*s)).collect(),
                },
            );
        } else {
            for i in 0..checked_len {
                let arg = &args[i];
                match (declared_labels[i], supplied_labels[i]) {
                    (Some(e), None) => {
                        self.diagnostics.push(arg.value.range, Category::MissingArgumentLabel { expected: self.text(e) })
                    }
                    (None, Some(g)) => {
                        self.diagnostics.push(arg.value.range, Category::UnexpectedArgumentLabel { got: self.text(g) })
                    }
                    (Some(e), Some(g)) if e != g => self.diagnostics.push(
                        arg.value.range,
                        Category::IncorrectArgumentLabel { expected: self.text(e), got: self.text(g) },
                    ),
                    _ => {}
                }
            }
        }

        ft.return_type.clone()
    }
}

fn without_self(ft: &FunctionType) -> FunctionType {
    FunctionType {
        params: ft.params.iter().skip(1).cloned().collect(),
        labels: ft.labels.iter().skip(1).cloned().collect(),
        return_type: ft.return_type.clone(),
        is_variadic: ft.is_variadic,
    }
}

fn is_lvalue(expr: &Expr) -> bool {
    matches!(expr.kind, ExprKind::Identifier(_) | ExprKind::MemberAccess { .. })
        || matches!(expr.kind, ExprKind::Unary { op: UnaryOp::Deref, .. })
}

#[cfg(test)]
mod tests {
    use super::*;
    use talonc_front::{Lexer, Parser};

    fn check(source: &str) -> (Diagnostics, Interner) {
        let mut interner = Interner::new();
        let tokens = Lexer::new(source).tokenize(&mut interner).expect("lex ok");
        let program = Parser::new(tokens).parse_program().expect("parse ok");
        let diagnostics = check_program(&program, &interner);
        (diagnostics, interner)
    }

    #[test]
    fn well_typed_function_has_no_diagnostics() {
        let (diags, _) = check("func main() -> Int { return 0 }");
        assert!(diags.is_empty());
    }

    #[test]
    fn undefined_variable_is_reported() {
        let (diags, _) = check("func f() -> Int { return x }");
        assert!(diags.iter().any(|d| d.category.tag() == "undefined-variable"));
    }

    #[test]
    fn return_type_mismatch_is_reported() {
        let (diags, _) = check("func f() -> Bool { return 0 }");
        assert!(diags.iter().any(|d| d.category.tag() == "type-mismatch"));
    }

    #[test]
    fn non_boolean_condition_is_reported() {
        let (diags, _) = check("func f() { if 0 { } }");
        assert!(diags.iter().any(|d| d.category.tag() == "non-boolean-condition"));
    }

    #[test]
    fn calling_a_struct_name_is_not_callable_not_undefined() {
        let (diags, _) = check("struct Counter { var value: Int } func f() { Counter(1) }");
        assert!(diags.iter().any(|d| d.category.tag() == "not-callable"));
        assert!(!diags.iter().any(|d| d.category.tag() == "undefined-variable"));
    }

    #[test]
    fn primitive_cast_call_is_accepted() {
        let (diags, _) = check("func f(_ x: Int) -> Int32 { return Int32(x) }");
        assert!(diags.is_empty());
    }

    #[test]
    fn missing_argument_label_is_reported() {
        let (diags, _) = check("func g(x value: Int) {} func f() { g(1) }");
        assert!(diags.iter().any(|d| d.category.tag() == "missing-argument-label"));
    }

    #[test]
    fn unexpected_argument_label_is_reported() {
        let (diags, _) = check("func g(_ value: Int) {} func f() { g(x: 1) }");
        assert!(diags.iter().any(|d| d.category.tag() == "unexpected-argument-label"));
    }

    #[test]
    fn argument_label_order_mismatch_is_reported() {
        let (diags, _) = check("func g(a: Int, b: Int) {} func f() { g(b: 1, a: 2) }");
        assert!(diags.iter().any(|d| d.category.tag() == "argument-label-order-mismatch"));
    }

    #[test]
    fn variadic_extra_argument_is_a_note() {
        let (diags, interner) = check("@(c) func printf(_ fmt: *Int8, ...) -> Int func f() { printf(\"hi\", 1) }");
        let variadic_note = diags.iter().find(|d| d.category.tag() == "variadic-argument");
        assert!(variadic_note.is_some());
        let _ = interner;
    }

    #[test]
    fn struct_field_and_method_resolve_through_member_access() {
        let (diags, _) = check(
            "struct Counter { var value: Int func get() -> Int { return self.value } } \
             func f(_ c: Counter) -> Int { return c.get() }",
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn recursive_struct_pointer_field_type_checks() {
        let (diags, _) = check("struct Node { var next: *Node var value: Int }");
        assert!(diags.is_empty());
    }

    #[test]
    fn address_of_non_lvalue_is_reported() {
        let (diags, _) = check("func f() { return &1 }");
        assert!(diags.iter().any(|d| d.category.tag() == "cannot-take-address"));
    }

    #[test]
    fn short_circuit_operands_must_be_boolean() {
        let (diags, _) = check("func f() -> Bool { return 1 && true }");
        assert!(diags.iter().any(|d| d.category.tag() == "invalid-binary-operands"));
    }
}
