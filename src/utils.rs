/// Oriented rectangles, poses and distance helpers
pub mod geometry;

/// Injectable random source used by the sampler
pub mod rng;
