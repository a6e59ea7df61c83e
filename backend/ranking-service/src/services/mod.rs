pub mod freshness;
pub mod pipeline;
pub mod scorer;

pub use freshness::{Clock, FreshnessGate, SystemClock};
pub use pipeline::{PipelineError, PipelineOptions, RankingPipeline, RunSummary};
pub use scorer::{ScoreWeights, Scorer};
