//! Priority formulas, one per task flavour.

mod boefje;
mod normalizer;

pub use boefje::BoefjeRanker;
pub use normalizer::NormalizerRanker;
