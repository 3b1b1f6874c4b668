pub mod blend;
pub mod normalizer;
pub mod pipeline;
pub mod selectivity;
pub mod weighted;

pub use blend::{Blend, ModelBlender};
pub use normalizer::{parse_number, Normalizer};
pub use pipeline::ScoringPipeline;
pub use selectivity::{SelectivityAdjuster, SelectivityAdjustment};
pub use weighted::{strengths_and_weaknesses, CompositeScore, WeightedScorer, COMPOSITE_SCALE};
