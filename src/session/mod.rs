// Session - per-session statistics and the aggregation fold

pub mod aggregator;
pub mod state;

pub use aggregator::{ComboPolicy, SessionAggregator, StrikeCountPolicy};
pub use state::{ComboStats, ScoredStrike, Session, SessionStats, TechniqueStats};
