//! Functions with well-known symbol names for stack assertions.

use std::hint::black_box;

/// Recurse `depth` times through `descend`, then call `f` at the bottom.
///
/// Every level is a real frame named `panictrace_testing/markers.descend`.
#[inline(never)]
pub fn descend<T>(depth: usize, f: &mut dyn FnMut() -> T) -> T {
    if depth == 0 {
        return f();
    }
    let value = descend(depth - 1, f);
    // Keeps the recursive call out of tail position.
    black_box(depth);
    value
}

/// Count frame blocks in a rendered plain-text report.
///
/// Returns `(innermost, others)`: lines marked `->  at ` and lines starting
/// with `    at `.
#[must_use]
pub fn frame_blocks(report: &str) -> (usize, usize) {
    let innermost = report.lines().filter(|l| l.starts_with("->  at ")).count();
    let others = report.lines().filter(|l| l.starts_with("    at ")).count();
    (innermost, others)
}
