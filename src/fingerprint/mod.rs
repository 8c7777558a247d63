pub mod bucket;
pub mod builder;
pub mod scoring;

pub use builder::{compute_momentum_vector, is_degenerate};
