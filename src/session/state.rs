// Session state - per-session statistics and the persisted session shape
//
// The serialized form (camelCase) is what persistence and transport
// collaborators store: `{userId, date, duration, totalStrikes,
// completedCombos, averageScore, maxComboStreak, strikes, techniqueBreakdown}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::strike::StrikeEvent;

/// Running aggregate for one `side_type` technique key
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechniqueStats {
    pub count: u32,
    pub average_score: f64,
    pub best_score: i32,
}

impl TechniqueStats {
    /// Fold one score into the running mean and best score
    pub fn record(&mut self, score: i32) {
        let count = self.count as f64;
        self.average_score = (self.average_score * count + score as f64) / (count + 1.0);
        self.best_score = if self.count == 0 {
            score
        } else {
            self.best_score.max(score)
        };
        self.count += 1;
    }
}

/// A strike together with the score it was recorded with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredStrike {
    #[serde(flatten)]
    pub strike: StrikeEvent,
    pub score: i32,
}

/// Caller-supplied combo counters, copied verbatim into the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComboStats {
    pub total_strikes: u32,
    pub completed_combos: u32,
    pub max_combo_streak: u32,
}

/// Aggregate statistics of a session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total_strikes: u32,
    pub completed_combos: u32,
    pub average_score: f64,
    pub max_combo_streak: u32,
    pub technique_breakdown: BTreeMap<String, TechniqueStats>,
}

/// One training session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Registry id (`session_{start}_{n}`)
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    /// Start time, ms
    pub date: u64,
    /// Stamped when the session ends, ms
    pub duration: u64,
    pub total_strikes: u32,
    pub completed_combos: u32,
    pub average_score: f64,
    pub max_combo_streak: u32,
    pub strikes: Vec<ScoredStrike>,
    pub technique_breakdown: BTreeMap<String, TechniqueStats>,
    #[serde(skip)]
    pub(crate) ended: bool,
}

impl Session {
    pub fn new(id: impl Into<String>, user_id: impl Into<String>, started_at_ms: u64) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            date: started_at_ms,
            duration: 0,
            total_strikes: 0,
            completed_combos: 0,
            average_score: 0.0,
            max_combo_streak: 0,
            strikes: Vec::new(),
            technique_breakdown: BTreeMap::new(),
            ended: false,
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            total_strikes: self.total_strikes,
            completed_combos: self.completed_combos,
            average_score: self.average_score,
            max_combo_streak: self.max_combo_streak,
            technique_breakdown: self.technique_breakdown.clone(),
        }
    }

    /// Copy without the strike list, for history listings
    pub fn summary(&self) -> Session {
        Session {
            strikes: Vec::new(),
            ..self.clone()
        }
    }

    pub fn has_technique(&self, key: &str) -> bool {
        self.technique_breakdown.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_technique_stats_running_mean() {
        let mut stats = TechniqueStats::default();
        for score in [80, 90, 70] {
            stats.record(score);
        }
        assert_eq!(stats.count, 3);
        assert!((stats.average_score - 80.0).abs() < 1e-9);
        assert_eq!(stats.best_score, 90);
    }

    #[test]
    fn test_first_score_sets_best_even_when_negative() {
        let mut stats = TechniqueStats::default();
        stats.record(-5);
        assert_eq!(stats.best_score, -5);
    }

    #[test]
    fn test_session_wire_shape() {
        let session = Session::new("session_1000_0", "user-1", 1000);
        let json = serde_json::to_value(&session).unwrap();

        assert_eq!(json["userId"], "user-1");
        assert_eq!(json["date"], 1000);
        assert_eq!(json["totalStrikes"], 0);
        assert_eq!(json["maxComboStreak"], 0);
        assert!(json["techniqueBreakdown"].as_object().unwrap().is_empty());
        assert!(json.get("ended").is_none());
    }

    #[test]
    fn test_summary_omits_strikes() {
        let mut session = Session::new("s", "u", 0);
        session.total_strikes = 4;
        let summary = session.summary();
        assert!(summary.strikes.is_empty());
        assert_eq!(summary.total_strikes, 4);
    }
}
