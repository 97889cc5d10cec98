//! The public compilation pipeline: source text in, a chosen stage's output
//! out. This is the library surface the CLI binary is a thin wrapper over —
//! everything here is free of file I/O and process invocation so it can be
//! embedded anywhere a caller has a source string.

use std::fmt;

use talonc_base::{Interner, SourceMap};
use talonc_front::{Lexer, ParseError, Parser, Program, Token};
use talonc_nir::{
    BuiltinRegistry, InterpError, Interpreter, NIRFunction, NirBuildError, RuntimeValue,
};

/// How far through the pipeline [`run_source`] should run before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopAt {
    Tokens,
    Ast,
    TypeChecked,
    Nir,
    C,
}

/// Knobs that don't change which stages run, only how they behave.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Run dead-code elimination over the lowered NIR before emission.
    pub optimize: bool,
    /// Run the unused-variable analysis pass and fold its diagnostics in.
    pub run_analysis_passes: bool,
    /// Emit a phase-timing line to stderr for every stage that runs.
    pub verbose: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { optimize: false, run_analysis_passes: true, verbose: false }
    }
}

/// The artifact produced by the stage [`run_source`] stopped at.
#[derive(Debug)]
pub enum StageOutput {
    Tokens(Vec<Token>),
    Ast(Program),
    TypeChecked(Program),
    Nir(Vec<NIRFunction>),
    C(String),
}

/// Everything [`run_source`] produced: the requested stage's output, the
/// diagnostics accumulated up to that point (rendered to the wire format),
/// and the context (`interner`, `source_map`) needed to make further sense
/// of symbols or ranges inside `stage`.
#[derive(Debug)]
pub struct PipelineResult {
    pub stage: StageOutput,
    pub diagnostics: Vec<String>,
    pub interner: Interner,
    pub source_map: SourceMap,
}

/// Everything that can abort the pipeline outright. Diagnostics that don't
/// rise to this level (warnings, notes) travel in [`PipelineResult::diagnostics`]
/// instead.
#[derive(Debug)]
pub enum PipelineError {
    Lex(talonc_front::LexError),
    Parse(ParseError),
    /// Type checking produced at least one error-severity diagnostic.
    /// Carries every diagnostic rendered to the wire format, not just the
    /// first, since the checker never aborts early.
    TypeCheck(Vec<String>),
    Nir(NirBuildError),
    Interp(InterpError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Lex(e) => write!(f, "{e}"),
            PipelineError::Parse(e) => write!(f, "{e}"),
            PipelineError::TypeCheck(lines) => write!(f, "{}", lines.join("\n")),
            PipelineError::Nir(e) => write!(f, "{e}"),
            PipelineError::Interp(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PipelineError {}

/// Runs lex → parse → type-check → lower → (analysis, optimize) → emit,
/// stopping after whichever stage `stop_at` names.
///
/// Type-check errors abort the pipeline ([`PipelineError::TypeCheck`]); its
/// warnings and notes do not, and are folded into the returned
/// [`PipelineResult::diagnostics`] alongside anything the unused-variable
/// analysis pass finds.
pub fn run_source(source: &str, stop_at: StopAt, options: &PipelineOptions) -> Result<PipelineResult, PipelineError> {
    let mut interner = Interner::new();
    let source_map = SourceMap::new(source);

    if options.verbose {
        eprintln!("[talonc] lexing");
    }
    let tokens = Lexer::new(source).tokenize(&mut interner).map_err(PipelineError::Lex)?;
    if stop_at == StopAt::Tokens {
        return Ok(PipelineResult { stage: StageOutput::Tokens(tokens), diagnostics: Vec::new(), interner, source_map });
    }

    if options.verbose {
        eprintln!("[talonc] parsing");
    }
    let program = Parser::new(tokens).parse_program().map_err(PipelineError::Parse)?;
    if stop_at == StopAt::Ast {
        return Ok(PipelineResult { stage: StageOutput::Ast(program), diagnostics: Vec::new(), interner, source_map });
    }

    if options.verbose {
        eprintln!("[talonc] type checking");
    }
    let type_diagnostics = talonc_check::check_program(&program, &interner);
    let mut rendered = type_diagnostics.render_all(&source_map);
    if type_diagnostics.has_errors() {
        return Err(PipelineError::TypeCheck(rendered));
    }
    if stop_at == StopAt::TypeChecked {
        return Ok(PipelineResult { stage: StageOutput::TypeChecked(program), diagnostics: rendered, interner, source_map });
    }

    if options.verbose {
        eprintln!("[talonc] lowering to nir");
    }
    let struct_layouts = talonc_nir::build_struct_layouts(&program, &interner);
    let mut functions = talonc_nir::lower_program(&program, &interner).map_err(PipelineError::Nir)?;

    if options.run_analysis_passes {
        if options.verbose {
            eprintln!("[talonc] analyzing unused variables");
        }
        for func in &functions {
            rendered.extend(talonc_nir::analyze_unused_variables(func).render_all(&source_map));
        }
    }
    if options.optimize {
        if options.verbose {
            eprintln!("[talonc] eliminating dead code");
        }
        for func in &mut functions {
            talonc_nir::eliminate_dead_code(func);
        }
    }
    if stop_at == StopAt::Nir {
        return Ok(PipelineResult { stage: StageOutput::Nir(functions), diagnostics: rendered, interner, source_map });
    }

    if options.verbose {
        eprintln!("[talonc] emitting c");
    }
    let c = talonc_emit::emit_c(&program, &functions, &struct_layouts, &interner);
    Ok(PipelineResult { stage: StageOutput::C(c), diagnostics: rendered, interner, source_map })
}

/// Lexes, parses, type-checks, lowers, then interprets `entry` over the
/// resulting NIR with `args` bound to its parameters. `builtins` supplies
/// any host function with no matching NIR definition.
///
/// The spec's default entry point is `"main"` with no arguments; callers
/// pass those explicitly since Rust has no default-argument sugar.
pub fn interpret(
    source: &str,
    entry: &str,
    args: Vec<RuntimeValue>,
    builtins: &BuiltinRegistry,
) -> Result<RuntimeValue, PipelineError> {
    let mut interner = Interner::new();
    let tokens = Lexer::new(source).tokenize(&mut interner).map_err(PipelineError::Lex)?;
    let program = Parser::new(tokens).parse_program().map_err(PipelineError::Parse)?;

    let type_diagnostics = talonc_check::check_program(&program, &interner);
    if type_diagnostics.has_errors() {
        let source_map = SourceMap::new(source);
        return Err(PipelineError::TypeCheck(type_diagnostics.render_all(&source_map)));
    }

    let functions = talonc_nir::lower_program(&program, &interner).map_err(PipelineError::Nir)?;
    Interpreter::new(&functions, builtins).run(entry, args).map_err(PipelineError::Interp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopping_at_tokens_yields_no_diagnostics() {
        let result = run_source("func main() -> Int32 { return Int32(0) }", StopAt::Tokens, &PipelineOptions::default()).unwrap();
        assert!(result.diagnostics.is_empty());
        assert!(matches!(result.stage, StageOutput::Tokens(_)));
    }

    #[test]
    fn type_errors_abort_before_lowering() {
        let err = run_source("func main() -> Int32 { return undefined_name }", StopAt::C, &PipelineOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::TypeCheck(_)));
    }

    #[test]
    fn stopping_at_c_emits_a_translation_unit() {
        let result = run_source("func main() -> Int32 { return Int32(0) }", StopAt::C, &PipelineOptions::default()).unwrap();
        match result.stage {
            StageOutput::C(code) => assert!(code.contains("int main(void)")),
            _ => panic!("expected C stage output"),
        }
    }

    #[test]
    fn analysis_pass_reports_an_unused_variable_as_a_diagnostic() {
        let source = "func main() -> Int32 { var x: Int x = 1 return Int32(0) }";
        let result = run_source(source, StopAt::Nir, &PipelineOptions::default()).unwrap();
        assert!(result.diagnostics.iter().any(|d| d.contains("write-only")));
    }

    #[test]
    fn disabling_analysis_passes_suppresses_the_unused_variable_diagnostic() {
        let source = "func main() -> Int32 { var x: Int x = 1 return Int32(0) }";
        let options = PipelineOptions { run_analysis_passes: false, ..PipelineOptions::default() };
        let result = run_source(source, StopAt::Nir, &options).unwrap();
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn interpret_runs_the_named_entry_point() {
        let builtins = BuiltinRegistry::new();
        let value = interpret("func main() -> Int { return 40 + 2 }", "main", vec![], &builtins).unwrap();
        assert_eq!(value, RuntimeValue::Int64(42));
    }

    #[test]
    fn interpret_reports_unknown_functions_as_a_typed_error() {
        let builtins = BuiltinRegistry::new();
        let err = interpret("func main() -> Int { return 1 }", "missing", vec![], &builtins).unwrap_err();
        assert!(matches!(err, PipelineError::Interp(InterpError::UnknownFunction { .. })));
    }
}
