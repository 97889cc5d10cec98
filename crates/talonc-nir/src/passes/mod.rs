//! Pass manager: sequential iteration over a fixed pipeline, no dependency
//! graph between passes. Mirrors the ambient compiler's optimize module,
//! which runs its own small pass list the same way.

mod dce;
mod unused;

pub use dce::eliminate_dead_code;
pub use unused::analyze_unused_variables;

use talonc_base::Diagnostics;

use crate::func::NIRFunction;

/// Runs the unused-variable analysis then dead-code elimination over every
/// function, in that order — diagnostics describe the code as written, so
/// analysis must see it before DCE rewrites it.
pub fn optimize_program(functions: &mut [NIRFunction]) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    for func in functions.iter() {
        diagnostics.extend(analyze_unused_variables(func));
    }
    for func in functions.iter_mut() {
        eliminate_dead_code(func);
    }
    diagnostics
}
