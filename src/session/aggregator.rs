// SessionAggregator - folds scored strikes into session statistics
//
// averageScore is the exact arithmetic mean of every recorded score,
// recomputed on each strike. Per-technique breakdown entries use an
// incremental mean and running best. Combo counters are not derived here:
// they come from a caller-supplied ComboPolicy.

use crate::analysis::strike::StrikeEvent;
use crate::error::SessionError;
use crate::scoring::TechniqueAnalysis;
use crate::session::state::{ComboStats, ScoredStrike, Session, SessionStats};

/// Combo/streak detection seam
///
/// Implementations decide what counts as a combo; the aggregator only
/// copies the returned counters into the session.
pub trait ComboPolicy: Send {
    fn on_strike(&mut self, strike: &StrikeEvent, analysis: &TechniqueAnalysis) -> ComboStats;
}

/// Counts strikes; never reports combos or streaks
#[derive(Debug, Clone, Default)]
pub struct StrikeCountPolicy {
    total: u32,
}

impl ComboPolicy for StrikeCountPolicy {
    fn on_strike(&mut self, _strike: &StrikeEvent, _analysis: &TechniqueAnalysis) -> ComboStats {
        self.total += 1;
        ComboStats {
            total_strikes: self.total,
            completed_combos: 0,
            max_combo_streak: 0,
        }
    }
}

pub struct SessionAggregator;

impl SessionAggregator {
    /// Append a scored strike and refresh the aggregates
    pub fn record(
        session: &mut Session,
        strike: StrikeEvent,
        score: i32,
        combos: ComboStats,
    ) -> Result<(), SessionError> {
        if session.ended {
            return Err(SessionError::AlreadyEnded {
                session_id: session.id.clone(),
            });
        }

        session
            .technique_breakdown
            .entry(strike.technique_key())
            .or_default()
            .record(score);
        session.strikes.push(ScoredStrike { strike, score });

        let sum: i64 = session.strikes.iter().map(|s| s.score as i64).sum();
        session.average_score = sum as f64 / session.strikes.len() as f64;

        session.total_strikes = combos.total_strikes;
        session.completed_combos = combos.completed_combos;
        session.max_combo_streak = combos.max_combo_streak;
        Ok(())
    }

    /// Stamp the duration and freeze the session
    pub fn finish(session: &mut Session, now_ms: u64) -> Result<SessionStats, SessionError> {
        if session.ended {
            return Err(SessionError::AlreadyEnded {
                session_id: session.id.clone(),
            });
        }

        session.duration = now_ms.saturating_sub(session.date);
        session.ended = true;
        Ok(session.stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::strike::{Side, StrikeForm, StrikeType};

    fn strike(technique: StrikeType, side: Side) -> StrikeEvent {
        StrikeEvent {
            technique,
            side,
            speed: 5.0,
            accuracy: 0.9,
            power: 0.7,
            form: StrikeForm {
                hip_rotation: 10.0,
                shoulder_alignment: 175.0,
                guard_position: 0.9,
                knee_angle: None,
                hip_angle: None,
            },
            timestamp_ms: 0,
        }
    }

    fn counted(n: u32) -> ComboStats {
        ComboStats {
            total_strikes: n,
            ..ComboStats::default()
        }
    }

    #[test]
    fn test_left_jab_breakdown() {
        let mut session = Session::new("s", "u", 0);
        for (i, score) in [80, 90, 70].into_iter().enumerate() {
            SessionAggregator::record(
                &mut session,
                strike(StrikeType::Jab, Side::Left),
                score,
                counted(i as u32 + 1),
            )
            .unwrap();
        }

        let stats = session.technique_breakdown["left_jab"];
        assert_eq!(stats.count, 3);
        assert_eq!(stats.average_score, 80.0);
        assert_eq!(stats.best_score, 90);
        assert_eq!(session.total_strikes, 3);
        assert_eq!(session.strikes.len(), 3);
    }

    #[test]
    fn test_average_is_exact_mean_across_techniques() {
        let mut session = Session::new("s", "u", 0);
        let scores = [61, 74, 99, 13, 58];
        let strikes = [
            strike(StrikeType::Jab, Side::Left),
            strike(StrikeType::Cross, Side::Right),
            strike(StrikeType::Roundhouse, Side::Left),
            strike(StrikeType::Jab, Side::Left),
            strike(StrikeType::Roundhouse, Side::Right),
        ];
        for (strike, score) in strikes.into_iter().zip(scores) {
            SessionAggregator::record(&mut session, strike, score, ComboStats::default()).unwrap();
        }

        let expected = scores.iter().sum::<i32>() as f64 / scores.len() as f64;
        assert_eq!(session.average_score, expected);
        assert_eq!(session.technique_breakdown.len(), 4);
        assert_eq!(session.technique_breakdown["left_jab"].average_score, 37.0);
    }

    #[test]
    fn test_combo_counters_copied_from_caller() {
        let mut session = Session::new("s", "u", 0);
        let combos = ComboStats {
            total_strikes: 12,
            completed_combos: 3,
            max_combo_streak: 5,
        };
        SessionAggregator::record(&mut session, strike(StrikeType::Jab, Side::Left), 50, combos)
            .unwrap();

        assert_eq!(session.total_strikes, 12);
        assert_eq!(session.completed_combos, 3);
        assert_eq!(session.max_combo_streak, 5);
    }

    #[test]
    fn test_finish_stamps_duration_and_freezes() {
        let mut session = Session::new("s", "u", 1000);
        let stats = SessionAggregator::finish(&mut session, 5000).unwrap();

        assert_eq!(session.duration, 4000);
        assert!(session.is_ended());
        assert_eq!(stats.total_strikes, 0);

        let err = SessionAggregator::record(
            &mut session,
            strike(StrikeType::Jab, Side::Left),
            10,
            ComboStats::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            SessionError::AlreadyEnded {
                session_id: "s".to_string()
            }
        );
        assert!(SessionAggregator::finish(&mut session, 9000).is_err());
        assert_eq!(session.duration, 4000);
    }

    #[test]
    fn test_finish_before_start_saturates() {
        let mut session = Session::new("s", "u", 1000);
        SessionAggregator::finish(&mut session, 500).unwrap();
        assert_eq!(session.duration, 0);
    }

    #[test]
    fn test_strike_count_policy() {
        let mut policy = StrikeCountPolicy::default();
        let analysis = TechniqueAnalysis {
            is_correct: true,
            score: 100.0,
            improvements: Vec::new(),
            overall_feedback: String::new(),
        };
        let jab = strike(StrikeType::Jab, Side::Left);
        policy.on_strike(&jab, &analysis);
        let stats = policy.on_strike(&jab, &analysis);
        assert_eq!(stats.total_strikes, 2);
        assert_eq!(stats.completed_combos, 0);
        assert_eq!(stats.max_combo_streak, 0);
    }
}
