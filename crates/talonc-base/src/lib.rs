//! Shared atoms used across every `talonc` crate: string interning, source
//! ranges, and the diagnostics accumulator.
//!
//! # Design Principles
//!
//! - No crate here depends on any other `talonc-*` crate; this is the leaf.
//! - Identifiers are interned once and compared by [`intern::Symbol`]
//!   equality everywhere downstream, never by string comparison.
//! - Diagnostics are data, not text: a [`diagnostic::Category`] carries
//!   exactly the payload needed to render its message, and rendering only
//!   happens at the edge (the wire format in [`diagnostic::Diagnostic::render`]).

pub mod diagnostic;
pub mod intern;
pub mod span;
pub mod types;

pub use diagnostic::{Category, Diagnostic, Diagnostics, Severity};
pub use intern::{Interner, Symbol, SymbolEq};
pub use span::{SourceLocation, SourceMap, SourceRange};
pub use types::{FunctionType, StructType, Type};
