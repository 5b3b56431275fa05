/// Compatibility layer for rayon/sequential execution.
///
/// With the `parallel` feature the real rayon parallel-iterator traits are
/// re-exported. Without it, a sequential stand-in keeps the same call sites
/// compiling: `into_par_iter()` resolves to plain `into_iter()` and the rest
/// of the chain falls through to the standard `Iterator` methods.
#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod fallback {
    /// Sequential stand-in for `rayon::prelude::IntoParallelIterator`.
    pub trait IntoParallelIterator {
        type Iter;
        type Item;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub use fallback::*;
