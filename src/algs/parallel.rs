//! Per-entity data-parallel loops.
//!
//! With the `rayon` feature the loop body runs on the global thread pool,
//! otherwise sequentially. Results are always returned in index order.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Evaluate `f(i)` for every `i in 0..n`.
pub fn parallel_map<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        (0..n).into_par_iter().map(f).collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        (0..n).map(f).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_index_order() {
        let squares = parallel_map(1000, |i| i * i);
        assert_eq!(squares[31], 961);
        assert_eq!(squares.len(), 1000);
    }
}
