//! The talonc compiler: a library pipeline plus a thin CLI over it.
//!
//! [`pipeline`] is the embeddable surface (no file I/O, no process
//! invocation). [`cli`] owns everything outside that — argument parsing,
//! reading the input file, writing output, and optionally invoking an
//! external C compiler to link.

pub mod cli;
pub mod pipeline;

pub use cli::run_cli;
