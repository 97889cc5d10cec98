//! Command-line interface for `talonc`.
//!
//! This owns exactly the collaborators the pipeline itself has no business
//! with: reading the input file, choosing where output goes, and optionally
//! shelling out to a C compiler to link the emitted translation unit. The
//! pipeline crate knows nothing about any of that.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use clap::{Parser, ValueEnum};

use crate::pipeline::{self, PipelineOptions, StageOutput, StopAt};

/// The talonc compiler driver: lex, parse, type-check, lower to NIR, and
/// emit C from a single source file.
#[derive(Parser)]
#[command(name = "talonc")]
#[command(about = "Compile or interpret a talonc source file", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Source file to compile.
    pub input: PathBuf,

    /// Where to write the chosen stage's output. Defaults to stdout.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Pipeline stage to stop at.
    #[arg(long, value_enum, default_value = "c")]
    pub stop_at: StopAtArg,

    /// Run dead-code elimination over the lowered NIR.
    #[arg(long)]
    pub optimize: bool,

    /// Skip the unused-variable analysis pass.
    #[arg(long)]
    pub no_analysis: bool,

    /// Log each pipeline phase as it starts, to stderr.
    #[arg(short, long)]
    pub verbose: bool,

    /// Invoke this C compiler on the emitted output to link an executable.
    /// Requires `--stop-at c` (the default) and `-o`.
    #[arg(long)]
    pub cc: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StopAtArg {
    Tokens,
    Ast,
    TypeChecked,
    Nir,
    C,
}

impl From<StopAtArg> for StopAt {
    fn from(arg: StopAtArg) -> StopAt {
        match arg {
            StopAtArg::Tokens => StopAt::Tokens,
            StopAtArg::Ast => StopAt::Ast,
            StopAtArg::TypeChecked => StopAt::TypeChecked,
            StopAtArg::Nir => StopAt::Nir,
            StopAtArg::C => StopAt::C,
        }
    }
}

pub fn run_cli() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let source = fs::read_to_string(&cli.input)?;

    let options = PipelineOptions {
        optimize: cli.optimize,
        run_analysis_passes: !cli.no_analysis,
        verbose: cli.verbose,
    };

    let result = pipeline::run_source(&source, cli.stop_at.into(), &options)?;

    for diagnostic in &result.diagnostics {
        eprintln!("{diagnostic}");
    }

    match result.stage {
        StageOutput::Tokens(tokens) => println!("{} token(s)", tokens.len()),
        StageOutput::Ast(program) => println!("parsed {} declaration(s)", program.declarations.len()),
        StageOutput::TypeChecked(program) => println!("type check passed ({} declaration(s))", program.declarations.len()),
        StageOutput::Nir(functions) => println!("lowered {} function(s)", functions.len()),
        StageOutput::C(code) => {
            write_output(&cli.output, &code)?;
            if let Some(cc) = &cli.cc {
                link_with_cc(cc, &cli.output)?;
            }
        }
    }

    Ok(())
}

fn write_output(output: &Option<PathBuf>, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(path) => fs::write(path, content)?,
        None => print!("{content}"),
    }
    Ok(())
}

/// Shells out to `cc` to link the C file just written into an executable
/// alongside it. Requires `-o` so there's a file on disk to compile.
fn link_with_cc(cc: &str, output: &Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let c_path = output.as_ref().ok_or("--cc requires -o to produce a file to compile")?;
    let exe_path = c_path.with_extension("");
    let status = Command::new(cc).arg(c_path).arg("-o").arg(&exe_path).status()?;
    if !status.success() {
        return Err(format!("{cc} exited with status {status}").into());
    }
    Ok(())
}
