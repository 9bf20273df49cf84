pub(crate) const DEFAULT_MAX_LEVEL: usize = 16;
pub(crate) const DEFAULT_PROBABILITY: f64 = 0.5;

/// Samples tower heights for new skip-list nodes.
///
/// A node's top level is the number of consecutive Bernoulli(`probability`)
/// successes, capped at `max_level`, so level `L` is occupied by roughly a
/// `probability^L` fraction of nodes.
///
/// `fastrand` keeps its state in a thread-local generator, so concurrent
/// callers never share or race on RNG state.
#[derive(Debug, Clone)]
pub(crate) struct LevelSampler {
    max_level: usize,
    probability: f64,
}

impl LevelSampler {
    pub(crate) fn new(max_level: usize, probability: f64) -> Self {
        debug_assert!((0.0..1.0).contains(&probability));
        LevelSampler {
            max_level,
            probability,
        }
    }

    pub(crate) fn max_level(&self) -> usize {
        self.max_level
    }

    /// Sample a top level in `[0, max_level]`.
    ///
    /// For the default probability the Bernoulli loop collapses to counting
    /// trailing ones in a single draw: each trailing 1 bit is one successful
    /// coin flip.
    pub(crate) fn sample(&self) -> usize {
        if self.probability == 0.5 {
            let bits = fastrand::u64(..);
            ((!bits).trailing_zeros() as usize).min(self.max_level)
        } else {
            let mut level = 0;
            while level < self.max_level && fastrand::f64() < self.probability {
                level += 1;
            }
            level
        }
    }
}
