//! Two-pass type checker: resolves every type reference, types every
//! expression, and accumulates the closed diagnostic taxonomy.

pub mod env;
pub mod typecheck;

pub use env::Env;
pub use typecheck::check_program;
