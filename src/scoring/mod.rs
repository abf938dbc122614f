// Scoring - numeric strike quality and reference-checklist comparison

pub mod matcher;
pub mod reference;
pub mod scorer;

pub use matcher::{power_feedback, speed_feedback, TechniqueAnalysis, TechniqueReferenceMatcher};
pub use reference::{reference_for, TechniqueReference};
pub use scorer::{ScoreBreakdown, TechniqueScorer};
