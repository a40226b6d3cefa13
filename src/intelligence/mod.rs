pub mod aggregator;
pub mod classifier;
pub mod score;
pub mod signals;

pub use aggregator::aggregate_fills;
pub use classifier::{classify_trade, Tag};
pub use score::{combine_signals, AggregatedScore, ScoredTrade};
pub use signals::{ScoringContext, SignalDetail, SignalName, SignalResult};
