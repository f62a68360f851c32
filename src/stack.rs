//! Stack growth for the recursive parser, printer and evaluator.
//!
//! Parsing and evaluation recurse once per nested node, and a closure
//! calling itself nests a handful of nodes per call. Running each step
//! through [ensure_sufficient_stack] moves onto a freshly allocated stack
//! segment whenever the current one runs low, so evaluation depth is
//! bounded by [crate::Config::max_call_depth] and parsing depth only by
//! memory, not by the size of the thread stack the host called us on.

/// Grow when less than this much stack remains.
const RED_ZONE: usize = 64 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recursion_deeper_than_the_test_thread_stack() {
        fn depth(n: u64) -> u64 {
            ensure_sufficient_stack(|| {
                // Pad the frame so a plain recursion of this depth would overflow
                let padding = std::hint::black_box([0u8; 512]);
                if n == 0 { padding[0] as u64 } else { depth(n - 1) + 1 }
            })
        }

        assert_eq!(depth(50_000), 50_000);
    }

    #[test]
    fn passes_results_through() {
        let result: Result<i32, &str> = ensure_sufficient_stack(|| Err("failed"));
        assert_eq!(result, Err("failed"));
    }
}
