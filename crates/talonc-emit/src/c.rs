//! NIR to single-translation-unit C. Every instruction lowers to exactly one
//! C statement; control flow is `goto`-threaded between block labels rather
//! than reconstructed into `if`/`while` — the NIR's own basic blocks already
//! are the control-flow graph, so there is nothing to reconstruct.
//!
//! Unlike the AST-driven emitter this one is grounded on, there is no
//! separate `CType` enum here: `talonc_base::Type` already closes over
//! exactly the primitive/pointer/struct set C lowering needs, since every
//! NIR value carries a fully resolved `Type` by construction. Introducing a
//! second, parallel type enum would just be copying data that already
//! exists in the right shape.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use talonc_base::{Interner, Symbol, Type};
use talonc_front::ast::{Decl, Program};
use talonc_nir::{
    BasicBlock, BlockId, Constant, Instruction, NIRFunction, NirUnaryOp, StructLayout, Terminator, ValueData, ValueId,
};

/// Emits a complete `.c` translation unit for `functions` (the lowered,
/// optimized bodies) plus the externs and struct layouts declared in
/// `program`. `struct_layouts` is normally `talonc_nir::build_struct_layouts`
/// run over the same `program`.
pub fn emit_c(
    program: &Program,
    functions: &[NIRFunction],
    struct_layouts: &HashMap<Symbol, StructLayout>,
    interner: &Interner,
) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str("#include <stdbool.h>\n");
    out.push_str("#include <stdint.h>\n\n");

    emit_struct_defs(struct_layouts, interner, &mut out);
    emit_extern_prototypes(program, interner, &mut out);

    for func in functions {
        writeln!(out, "{};", function_signature(func, interner)).unwrap();
    }
    out.push('\n');

    for func in functions {
        emit_function(func, interner, &mut out);
        out.push('\n');
    }

    out
}

fn emit_struct_defs(layouts: &HashMap<Symbol, StructLayout>, interner: &Interner, out: &mut String) {
    let mut remaining: Vec<&StructLayout> = layouts.values().collect();
    remaining.sort_by_key(|l| interner.resolve(l.name));
    let mut emitted: HashSet<Symbol> = HashSet::new();

    while !remaining.is_empty() {
        let mut next = Vec::new();
        let mut progressed = false;
        for layout in remaining {
            let ready = layout.fields.iter().all(|(_, ty)| match ty {
                Type::Struct(s) => emitted.contains(&s.name),
                _ => true,
            });
            if ready {
                write_struct_def(layout, interner, out);
                emitted.insert(layout.name);
                progressed = true;
            } else {
                next.push(layout);
            }
        }
        if !progressed {
            // Field-dependency cycle: nothing left can become "ready", so
            // emit the rest as-is rather than loop forever.
            for layout in next {
                write_struct_def(layout, interner, out);
            }
            break;
        }
        remaining = next;
    }
}

fn write_struct_def(layout: &StructLayout, interner: &Interner, out: &mut String) {
    let name = escape_c_ident(interner.resolve(layout.name));
    writeln!(out, "typedef struct {name} {{").unwrap();
    for (field, ty) in &layout.fields {
        writeln!(out, "    {};", c_declare(ty, escape_c_ident(interner.resolve(*field)), interner)).unwrap();
    }
    writeln!(out, "}} {name};\n").unwrap();
}

fn emit_extern_prototypes(program: &Program, interner: &Interner, out: &mut String) {
    for decl in &program.declarations {
        let Decl::Extern(e) = decl else { continue };
        let f = &e.function;
        let ret = c_type_str(&f.resolved_return_type().unwrap_or(Type::Void), interner);
        let mut params: Vec<String> = f
            .parameters
            .iter()
            .filter(|p| !p.is_variadic)
            .map(|p| {
                let ty = p.type_node.as_ref().and_then(|t| t.resolved_type()).unwrap_or(Type::Unknown);
                c_type_str(&ty, interner)
            })
            .collect();
        if f.is_variadic() {
            params.push("...".to_string());
        }
        if params.is_empty() {
            params.push("void".to_string());
        }
        writeln!(out, "extern {} {}({});", ret, escape_c_ident(interner.resolve(f.name)), params.join(", ")).unwrap();
    }
    out.push('\n');
}

fn function_signature(func: &NIRFunction, interner: &Interner) -> String {
    let is_main = func.name == "main";
    let ret = if is_main { "int".to_string() } else { c_type_str(&func.return_type, interner) };
    let mut params: Vec<String> =
        func.param_types().iter().enumerate().map(|(i, ty)| c_declare(ty, format!("v{i}"), interner)).collect();
    if func.is_variadic {
        params.push("...".to_string());
    }
    if params.is_empty() {
        params.push("void".to_string());
    }
    format!("{} {}({})", ret, escape_c_ident(&func.name), params.join(", "))
}

fn emit_function(func: &NIRFunction, interner: &Interner, out: &mut String) {
    let is_main = func.name == "main";
    writeln!(out, "{} {{", function_signature(func, interner)).unwrap();

    let alloca_ids = collect_alloca_ids(func);
    emit_top_of_body_decls(func, interner, &alloca_ids, out);

    for (block_id, block) in func.blocks() {
        if block_id != func.entry {
            writeln!(out, "{}:;", block_id).unwrap();
        }
        emit_block_body(func, interner, &alloca_ids, block, is_main, out);
    }

    out.push_str("}\n");
}

fn collect_alloca_ids(func: &NIRFunction) -> HashSet<ValueId> {
    let mut ids = HashSet::new();
    for (_, block) in func.blocks() {
        for (value, inst) in &block.instructions {
            if matches!(inst, Instruction::Alloca { .. }) {
                ids.insert(*value);
            }
        }
    }
    ids
}

fn emit_top_of_body_decls(func: &NIRFunction, interner: &Interner, alloca_ids: &HashSet<ValueId>, out: &mut String) {
    for (_, block) in func.blocks() {
        for (value, inst) in &block.instructions {
            if let Instruction::Alloca { ty, .. } = inst {
                writeln!(out, "    {};", c_declare(ty, format!("v{}", value.0), interner)).unwrap();
            }
        }
    }
    let entry_params: HashSet<ValueId> = (0..func.param_types().len()).map(|i| func.entry_param_value(i)).collect();
    for (_, block) in func.blocks() {
        for param in &block.params {
            if entry_params.contains(&param.value) {
                continue;
            }
            writeln!(out, "    {};", c_declare(&param.ty, format!("v{}", param.value.0), interner)).unwrap();
        }
        for (value, inst) in &block.instructions {
            if alloca_ids.contains(value) {
                continue;
            }
            let ty = func.type_of(*value);
            if ty == Type::Void {
                continue;
            }
            writeln!(out, "    {};", c_declare(&ty, format!("v{}", value.0), interner)).unwrap();
        }
    }
}

fn emit_block_body(
    func: &NIRFunction,
    interner: &Interner,
    alloca_ids: &HashSet<ValueId>,
    block: &BasicBlock,
    is_main: bool,
    out: &mut String,
) {
    for (value, inst) in &block.instructions {
        emit_instruction(func, interner, alloca_ids, *value, inst, out);
    }
    if let Some(term) = &block.terminator {
        emit_terminator(func, interner, alloca_ids, term, is_main, out);
    }
}

fn emit_instruction(
    func: &NIRFunction,
    interner: &Interner,
    alloca_ids: &HashSet<ValueId>,
    value: ValueId,
    inst: &Instruction,
    out: &mut String,
) {
    let v = format!("v{}", value.0);
    let operand = |id: ValueId| operand_expr(func, interner, alloca_ids, id);
    match inst {
        Instruction::Alloca { .. } => {}
        Instruction::BinaryOp { op, lhs, rhs } => {
            writeln!(out, "    {v} = ({} {} {});", operand(*lhs), op.c_operator(), operand(*rhs)).unwrap();
        }
        Instruction::UnaryOp { op, value: operand_id } => {
            let sym = match op {
                NirUnaryOp::Neg => "-",
                NirUnaryOp::Not => "!",
            };
            writeln!(out, "    {v} = ({}{});", sym, operand(*operand_id)).unwrap();
        }
        Instruction::Load { address } => {
            writeln!(out, "    {v} = {};", deref_expr(operand(*address))).unwrap();
        }
        Instruction::Store { address, value: stored } => {
            writeln!(out, "    {} = {};", deref_expr(operand(*address)), operand(*stored)).unwrap();
        }
        Instruction::Cast { value: operand_id, target } => {
            writeln!(out, "    {v} = ({})({});", c_type_str(target, interner), operand(*operand_id)).unwrap();
        }
        Instruction::FieldExtract { base, field } => {
            writeln!(out, "    {v} = ({}).{};", operand(*base), escape_c_ident(interner.resolve(*field))).unwrap();
        }
        Instruction::FieldAddress { base, path } => {
            let mut expr = deref_expr(operand(*base));
            for field in path {
                expr = format!("{}.{}", expr, escape_c_ident(interner.resolve(*field)));
            }
            writeln!(out, "    {v} = &({});", expr).unwrap();
        }
        Instruction::Call { callee, args } => {
            let args_str: Vec<String> = args.iter().map(|a| operand(*a)).collect();
            let call = format!("{}({})", escape_c_ident(callee), args_str.join(", "));
            if func.type_of(value) == Type::Void {
                writeln!(out, "    {};", call).unwrap();
            } else {
                writeln!(out, "    {v} = {};", call).unwrap();
            }
        }
    }
}

fn emit_terminator(
    func: &NIRFunction,
    interner: &Interner,
    alloca_ids: &HashSet<ValueId>,
    term: &Terminator,
    is_main: bool,
    out: &mut String,
) {
    let operand = |id: ValueId| operand_expr(func, interner, alloca_ids, id);
    match term {
        Terminator::Jump { target, args } => {
            emit_param_assignments(func, &operand, *target, args, out);
            writeln!(out, "    goto {};", target).unwrap();
        }
        Terminator::Branch { cond, true_target, true_args, false_target, false_args } => {
            writeln!(out, "    if ({}) {{", operand(*cond)).unwrap();
            emit_param_assignments(func, &operand, *true_target, true_args, out);
            writeln!(out, "        goto {};", true_target).unwrap();
            out.push_str("    } else {\n");
            emit_param_assignments(func, &operand, *false_target, false_args, out);
            writeln!(out, "        goto {};", false_target).unwrap();
            out.push_str("    }\n");
        }
        Terminator::Return { value } => match value {
            Some(v) if is_main => writeln!(out, "    return (int)({});", operand(*v)).unwrap(),
            Some(v) => writeln!(out, "    return {};", operand(*v)).unwrap(),
            None if is_main => out.push_str("    return 0;\n"),
            None => out.push_str("    return;\n"),
        },
    }
}

fn emit_param_assignments(
    func: &NIRFunction,
    operand: &impl Fn(ValueId) -> String,
    target: BlockId,
    args: &[ValueId],
    out: &mut String,
) {
    let params = &func.block(target).params;
    for (param, arg) in params.iter().zip(args) {
        writeln!(out, "        v{} = {};", param.value.0, operand(*arg)).unwrap();
    }
}

fn operand_expr(func: &NIRFunction, interner: &Interner, alloca_ids: &HashSet<ValueId>, value: ValueId) -> String {
    match func.value_data(value) {
        ValueData::Constant(c) => constant_expr(c, &func.type_of(value)),
        ValueData::Undef => zero_expr(&func.type_of(value), interner),
        ValueData::BlockParameter { .. } => format!("v{}", value.0),
        ValueData::Instruction { .. } => {
            if alloca_ids.contains(&value) {
                format!("&v{}", value.0)
            } else {
                format!("v{}", value.0)
            }
        }
    }
}

/// `*&x` round-trips to `x`; anything else gets wrapped in an explicit
/// dereference.
fn deref_expr(operand: String) -> String {
    match operand.strip_prefix('&') {
        Some(rest) => rest.to_string(),
        None => format!("(*{})", operand),
    }
}

fn constant_expr(c: &Constant, ty: &Type) -> String {
    match c {
        Constant::Int(n) => {
            if *ty == Type::Int {
                format!("{n}LL")
            } else {
                n.to_string()
            }
        }
        Constant::Bool(b) => b.to_string(),
        Constant::Str(s) => format!("\"{}\"", escape_c_string(s)),
        Constant::Void => "0".to_string(),
    }
}

fn zero_expr(ty: &Type, interner: &Interner) -> String {
    match ty {
        Type::Bool => "false".to_string(),
        Type::Pointer(_) => "NULL".to_string(),
        Type::Struct(_) => format!("({}){{0}}", c_type_str(ty, interner)),
        _ => "0".to_string(),
    }
}

fn escape_c_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn c_declare(ty: &Type, ident: impl Into<String>, interner: &Interner) -> String {
    format!("{} {}", c_type_str(ty, interner), ident.into())
}

fn c_type_str(ty: &Type, interner: &Interner) -> String {
    match ty {
        Type::Int => "int64_t".to_string(),
        Type::Int8 => "char".to_string(),
        Type::Int32 => "int32_t".to_string(),
        Type::Bool => "bool".to_string(),
        Type::Void => "void".to_string(),
        Type::Unknown => "void*".to_string(),
        Type::CVarArgs => "...".to_string(),
        Type::Pointer(inner) => format!("{}*", c_type_str(inner, interner)),
        Type::Struct(s) => format!("struct {}", escape_c_ident(interner.resolve(s.name))),
        Type::Function(_) => "void*".to_string(),
    }
}

fn is_c_reserved(name: &str) -> bool {
    matches!(
        name,
        "auto" | "break" | "case" | "char" | "const" | "continue" | "default" | "do" | "double"
            | "else" | "enum" | "extern" | "float" | "for" | "goto" | "if" | "inline" | "int"
            | "long" | "register" | "restrict" | "return" | "short" | "signed" | "sizeof"
            | "static" | "struct" | "switch" | "typedef" | "union" | "unsigned" | "void"
            | "volatile" | "while" | "_Bool" | "_Complex" | "_Imaginary" | "_Alignas" | "_Alignof"
            | "_Atomic" | "_Generic" | "_Noreturn" | "_Static_assert" | "_Thread_local" | "bool"
            | "true" | "false"
    )
}

fn escape_c_ident(name: &str) -> String {
    if is_c_reserved(name) {
        format!("talonc_{name}")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talonc_front::{Lexer, Parser};

    fn lower(source: &str) -> (Program, Interner, Vec<NIRFunction>, HashMap<Symbol, StructLayout>) {
        let mut interner = Interner::new();
        let tokens = Lexer::new(source).tokenize(&mut interner).expect("lex");
        let mut parser = Parser::new(tokens);
        let program = parser.parse_program().expect("parse");
        let diags = talonc_check::check_program(&program, &interner);
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags.iter().collect::<Vec<_>>());
        let layouts = talonc_nir::build_struct_layouts(&program, &interner);
        let functions = talonc_nir::lower_program(&program, &interner).expect("lower");
        (program, interner, functions, layouts)
    }

    #[test]
    fn arithmetic_function_emits_one_statement_per_instruction() {
        let (program, interner, functions, layouts) = lower("func add(a: Int, b: Int) -> Int { return a + b }");
        let c = emit_c(&program, &functions, &layouts, &interner);
        assert!(c.contains("int64_t add(int64_t v0, int64_t v1) {"));
        assert!(c.contains("return"));
    }

    #[test]
    fn main_always_gets_c_int_return_type() {
        let (program, interner, functions, layouts) = lower("func main() -> Int32 { return Int32(0) }");
        let c = emit_c(&program, &functions, &layouts, &interner);
        assert!(c.contains("int main(void) {"));
        assert!(c.contains("return (int)("));
    }

    #[test]
    fn reserved_word_identifier_is_escaped() {
        let (program, interner, functions, layouts) = lower("func int(x: Int) -> Int { return x }");
        let c = emit_c(&program, &functions, &layouts, &interner);
        assert!(c.contains("talonc_int"));
        assert!(!c.contains("int64_t int("));
    }

    #[test]
    fn struct_fields_referencing_another_struct_are_ordered_first() {
        let (program, interner, functions, layouts) = lower(
            "struct Inner { var value: Int }\nstruct Outer { var inner: Inner }\nfunc main() -> Int32 { return Int32(0) }",
        );
        let c = emit_c(&program, &functions, &layouts, &interner);
        let inner_pos = c.find("struct Inner {").expect("Inner struct emitted");
        let outer_pos = c.find("struct Outer {").expect("Outer struct emitted");
        assert!(inner_pos < outer_pos);
    }

    #[test]
    fn branch_terminator_assigns_block_params_before_goto() {
        let (program, interner, functions, layouts) =
            lower("func pick(cond: Bool) -> Int { if cond { return 1 } else { return 2 } }");
        let c = emit_c(&program, &functions, &layouts, &interner);
        assert!(c.contains("if ("));
        assert!(c.contains("goto bb"));
    }

    #[test]
    fn void_call_is_a_bare_statement_with_no_assignment() {
        let (program, interner, functions, layouts) = lower(
            "@(c) func log_it(_ x: Int) -> Void\nfunc main() -> Int32 { log_it(1) return Int32(0) }",
        );
        let c = emit_c(&program, &functions, &layouts, &interner);
        assert!(c.contains("extern void log_it(int64_t);"));
        assert!(c.contains("    log_it(1LL);\n"));
    }
}
