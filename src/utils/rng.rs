/// Source of randomness for the track-set sampler.
///
/// Every random decision of the sampler (move type, track, vertex, accept/reject) goes through
/// this trait so a chain can be replayed from a seed or scripted in tests. Any `rand::Rng`
/// is a `RandomSource`.
///
pub trait RandomSource {
    /// Uniform sample from `[0, 1)`
    fn next_uniform(&mut self) -> f64;

    /// Uniform integer from `[0, bound)`, `bound` must be positive
    fn next_int(&mut self, bound: usize) -> usize;
}

impl<R> RandomSource for R
where
    R: rand::Rng + ?Sized,
{
    fn next_uniform(&mut self) -> f64 {
        self.gen::<f64>()
    }

    fn next_int(&mut self, bound: usize) -> usize {
        assert!(bound > 0, "The bound must be positive");
        self.gen_range(0..bound)
    }
}
