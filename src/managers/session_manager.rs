// SessionManager: registry of live and finished training sessions
//
// Single Responsibility: session lifecycle, per-session pipelines and
// history queries.
//
// Each session sits behind its own Mutex inside the registry RwLock, so
// frames for different sessions never contend on the same lock, while
// frames for one session are serialized.
//
// Lock order is registry before session. Ending a session drops its
// pipeline; pruning and removal take the registry write lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::analysis::strike::StrikeEvent;
use crate::analysis::{SessionPipeline, StrikeOutcome};
use crate::config::AppConfig;
use crate::error::{log_session_error, SessionError};
use crate::pose::Frame;
use crate::session::{
    ComboPolicy, Session, SessionAggregator, SessionStats, StrikeCountPolicy, TechniqueStats,
};
use crate::telemetry::{self, DiagnosticError, LifecyclePhase};

/// Creates the combo policy for each new session
pub type ComboPolicyFactory = Box<dyn Fn() -> Box<dyn ComboPolicy> + Send + Sync>;

/// One technique's statistics in a past session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechniqueProgress {
    pub session_id: String,
    pub date: u64,
    pub stats: TechniqueStats,
}

/// Per-session state that only exists while the session is running
struct LiveState {
    pipeline: SessionPipeline,
    combos: Box<dyn ComboPolicy>,
}

impl LiveState {
    fn fold(&mut self, session: &mut Session, outcome: &StrikeOutcome) -> Result<(), SessionError> {
        let combos = self.combos.on_strike(&outcome.strike, &outcome.analysis);
        SessionAggregator::record(session, outcome.strike.clone(), outcome.score, combos)
    }
}

/// Registry entry; `live` is `None` exactly when the session has ended
struct SessionSlot {
    session: Session,
    live: Option<LiveState>,
}

impl SessionSlot {
    fn live(&mut self) -> Result<(&mut Session, &mut LiveState), SessionError> {
        match self.live.as_mut() {
            Some(live) => Ok((&mut self.session, live)),
            None => Err(SessionError::AlreadyEnded {
                session_id: self.session.id.clone(),
            }),
        }
    }

    /// End the session and release its pipeline and combo policy
    fn finish(&mut self, ended_at_ms: u64) -> Result<SessionStats, SessionError> {
        let stats = SessionAggregator::finish(&mut self.session, ended_at_ms)?;
        self.live = None;
        Ok(stats)
    }
}

/// Manages training sessions keyed by id
///
/// # Example
/// ```ignore
/// let manager = SessionManager::new(AppConfig::default());
/// let id = manager.start_session("user-1")?;
/// for frame in frames {
///     if let Some(outcome) = manager.process_frame(&id, &frame)? {
///         println!("{} scored {}", outcome.strike.technique, outcome.score);
///     }
/// }
/// let stats = manager.end_session(&id)?;
/// ```
pub struct SessionManager {
    config: AppConfig,
    sessions: Arc<RwLock<HashMap<String, Arc<Mutex<SessionSlot>>>>>,
    counter: AtomicU64,
    combo_policy: ComboPolicyFactory,
}

impl SessionManager {
    /// Create a manager whose sessions count strikes without combo detection
    pub fn new(config: AppConfig) -> Self {
        Self::with_combo_policy(
            config,
            Box::new(|| -> Box<dyn ComboPolicy> { Box::new(StrikeCountPolicy::default()) }),
        )
    }

    /// Create a manager with a caller-supplied combo policy
    pub fn with_combo_policy(config: AppConfig, combo_policy: ComboPolicyFactory) -> Self {
        Self {
            config,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            counter: AtomicU64::new(0),
            combo_policy,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Start a session at the current wall-clock time
    pub fn start_session(&self, user_id: &str) -> Result<String, SessionError> {
        self.start_session_at(user_id, telemetry::now_timestamp_ms())
    }

    /// Start a session with an explicit start time
    ///
    /// # Returns
    /// * `Ok(String)` - New session id (`session_{start_ms}_{n}`)
    /// * `Err(SessionError)` - Registry lock poisoned
    pub fn start_session_at(&self, user_id: &str, started_at_ms: u64) -> Result<String, SessionError> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let session_id = format!("session_{}_{}", started_at_ms, n);

        let slot = SessionSlot {
            session: Session::new(session_id.clone(), user_id, started_at_ms),
            live: Some(LiveState {
                pipeline: SessionPipeline::new(session_id.clone(), &self.config),
                combos: (self.combo_policy)(),
            }),
        };

        let mut sessions = self
            .write_sessions()
            .inspect_err(|err| self.report(err, "start_session"))?;
        sessions.insert(session_id.clone(), Arc::new(Mutex::new(slot)));
        drop(sessions);

        log::info!("[SessionManager] Started {} for user {}", session_id, user_id);
        telemetry::hub().record_session_phase(LifecyclePhase::Started, &session_id);
        Ok(session_id)
    }

    /// Run one frame through the session's pipeline and fold any strike
    /// into its statistics
    pub fn process_frame(
        &self,
        session_id: &str,
        frame: &Frame,
    ) -> Result<Option<StrikeOutcome>, SessionError> {
        let slot = self.slot(session_id, "process_frame")?;
        let mut slot = self.lock_slot(&slot, "process_frame")?;
        let (session, live) = slot
            .live()
            .inspect_err(|err| self.report(err, "process_frame"))?;

        let Some(outcome) = live.pipeline.process_frame(frame) else {
            return Ok(None);
        };
        live.fold(session, &outcome)
            .inspect_err(|err| self.report(err, "process_frame"))?;
        Ok(Some(outcome))
    }

    /// Score and record a strike classified outside this manager
    ///
    /// The strike shares the session's cooldown with frame-classified
    /// strikes, measured at `strike.timestamp_ms`.
    ///
    /// # Errors
    /// * `NotFound` / `AlreadyEnded` - Session cannot take strikes
    /// * `StrikeInCooldown` - Previous strike was less than `cooldown_ms` ago;
    ///   the session is left unchanged
    pub fn record_strike(
        &self,
        session_id: &str,
        strike: StrikeEvent,
    ) -> Result<StrikeOutcome, SessionError> {
        let slot = self.slot(session_id, "record_strike")?;
        let mut slot = self.lock_slot(&slot, "record_strike")?;
        let (session, live) = slot
            .live()
            .inspect_err(|err| self.report(err, "record_strike"))?;

        let outcome = live
            .pipeline
            .admit(strike)
            .map_err(|remaining_ms| SessionError::StrikeInCooldown {
                session_id: session_id.to_string(),
                remaining_ms,
            })
            .inspect_err(|err| self.report(err, "record_strike"))?;
        live.fold(session, &outcome)
            .inspect_err(|err| self.report(err, "record_strike"))?;
        Ok(outcome)
    }

    /// End a session at the current wall-clock time
    pub fn end_session(&self, session_id: &str) -> Result<SessionStats, SessionError> {
        self.end_session_at(session_id, telemetry::now_timestamp_ms())
    }

    /// End a session, stamping `duration = ended_at_ms - start`
    ///
    /// The session's pipeline is released and only its record is kept. The
    /// user's oldest ended sessions beyond `session.retained_sessions` are
    /// removed.
    pub fn end_session_at(
        &self,
        session_id: &str,
        ended_at_ms: u64,
    ) -> Result<SessionStats, SessionError> {
        let slot = self.slot(session_id, "end_session")?;
        let (stats, user_id) = {
            let mut slot = self.lock_slot(&slot, "end_session")?;
            let stats = slot
                .finish(ended_at_ms)
                .inspect_err(|err| self.report(err, "end_session"))?;

            log::info!(
                "[SessionManager] Ended {} after {} ms ({} strikes, avg {:.1})",
                session_id,
                slot.session.duration,
                slot.session.strikes.len(),
                stats.average_score
            );
            (stats, slot.session.user_id.clone())
        };
        telemetry::hub().record_session_phase(LifecyclePhase::Ended, session_id);

        self.prune_ended(&user_id)?;
        Ok(stats)
    }

    /// Remove a session from the registry, running or not
    ///
    /// # Returns
    /// * `Ok(Session)` - The removed session record
    /// * `Err(SessionError)` - Unknown id or poisoned lock
    pub fn remove_session(&self, session_id: &str) -> Result<Session, SessionError> {
        let removed = self
            .write_sessions()
            .inspect_err(|err| self.report(err, "remove_session"))?
            .remove(session_id);
        let Some(slot) = removed else {
            let err = SessionError::NotFound {
                session_id: session_id.to_string(),
            };
            self.report(&err, "remove_session");
            return Err(err);
        };

        let session = self.lock_slot(&slot, "remove_session")?.session.clone();
        log::info!("[SessionManager] Removed {}", session_id);
        Ok(session)
    }

    pub fn stats(&self, session_id: &str) -> Result<SessionStats, SessionError> {
        let slot = self.slot(session_id, "stats")?;
        let slot = self.lock_slot(&slot, "stats")?;
        Ok(slot.session.stats())
    }

    /// Full copy of a session, strikes included
    pub fn snapshot(&self, session_id: &str) -> Result<Session, SessionError> {
        let slot = self.slot(session_id, "snapshot")?;
        let slot = self.lock_slot(&slot, "snapshot")?;
        Ok(slot.session.clone())
    }

    /// Ended sessions of a user, newest first, without their strike lists
    ///
    /// `limit` defaults to `session.history_limit`.
    pub fn session_history(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Session>, SessionError> {
        let limit = limit.unwrap_or(self.config.session.history_limit);
        let sessions = self.ended_sessions(user_id, "session_history")?;
        Ok(sessions
            .into_iter()
            .take(limit)
            .map(|session| session.summary())
            .collect())
    }

    /// One technique's statistics across a user's ended sessions, newest first
    pub fn technique_progress(
        &self,
        user_id: &str,
        technique_key: &str,
    ) -> Result<Vec<TechniqueProgress>, SessionError> {
        let sessions = self.ended_sessions(user_id, "technique_progress")?;
        Ok(sessions
            .into_iter()
            .filter_map(|session| {
                let stats = *session.technique_breakdown.get(technique_key)?;
                Some(TechniqueProgress {
                    session_id: session.id,
                    date: session.date,
                    stats,
                })
            })
            .take(self.config.session.progress_limit)
            .collect())
    }

    /// Number of sessions that have not ended yet
    pub fn active_sessions(&self) -> Result<usize, SessionError> {
        let sessions = self
            .read_sessions()
            .inspect_err(|err| self.report(err, "active_sessions"))?;
        let mut active = 0;
        for slot in sessions.values() {
            if !self.lock_slot(slot, "active_sessions")?.session.is_ended() {
                active += 1;
            }
        }
        Ok(active)
    }

    // ========================================================================
    // HELPER METHODS - Lock management and lookups
    // ========================================================================

    /// Drop a user's oldest ended sessions beyond `session.retained_sessions`
    fn prune_ended(&self, user_id: &str) -> Result<usize, SessionError> {
        let mut sessions = self
            .write_sessions()
            .inspect_err(|err| self.report(err, "prune_ended"))?;

        let mut ended = Vec::new();
        for (id, slot) in sessions.iter() {
            let slot = self.lock_slot(slot, "prune_ended")?;
            if slot.session.user_id == user_id && slot.session.is_ended() {
                ended.push((slot.session.date, id.clone()));
            }
        }
        ended.sort_by(|a, b| b.cmp(a));

        let stale: Vec<String> = ended
            .into_iter()
            .skip(self.config.session.retained_sessions)
            .map(|(_, id)| id)
            .collect();
        for id in &stale {
            sessions.remove(id);
        }
        if !stale.is_empty() {
            log::info!(
                "[SessionManager] Pruned {} ended sessions of user {}",
                stale.len(),
                user_id
            );
        }
        Ok(stale.len())
    }

    /// Ended sessions of a user sorted by start time, newest first
    fn ended_sessions(&self, user_id: &str, context: &str) -> Result<Vec<Session>, SessionError> {
        let sessions = self
            .read_sessions()
            .inspect_err(|err| self.report(err, context))?;

        let mut matching = Vec::new();
        for slot in sessions.values() {
            let slot = self.lock_slot(slot, context)?;
            if slot.session.user_id == user_id && slot.session.is_ended() {
                matching.push(slot.session.clone());
            }
        }
        matching.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
        Ok(matching)
    }

    /// Look up a session slot, releasing the registry lock before returning
    fn slot(&self, session_id: &str, context: &str) -> Result<Arc<Mutex<SessionSlot>>, SessionError> {
        let sessions = self
            .read_sessions()
            .inspect_err(|err| self.report(err, context))?;
        sessions.get(session_id).cloned().ok_or_else(|| {
            let err = SessionError::NotFound {
                session_id: session_id.to_string(),
            };
            self.report(&err, context);
            err
        })
    }

    /// Safely acquire lock on a session slot
    fn lock_slot<'a>(
        &self,
        slot: &'a Arc<Mutex<SessionSlot>>,
        context: &str,
    ) -> Result<MutexGuard<'a, SessionSlot>, SessionError> {
        slot.lock()
            .map_err(|_| SessionError::LockPoisoned {
                component: "session".to_string(),
            })
            .inspect_err(|err| self.report(err, context))
    }

    /// Safely acquire read lock on the registry
    fn read_sessions(
        &self,
    ) -> Result<RwLockReadGuard<'_, HashMap<String, Arc<Mutex<SessionSlot>>>>, SessionError> {
        self.sessions
            .read()
            .map_err(|_| SessionError::LockPoisoned {
                component: "registry".to_string(),
            })
    }

    /// Safely acquire write lock on the registry
    fn write_sessions(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<String, Arc<Mutex<SessionSlot>>>>, SessionError> {
        self.sessions
            .write()
            .map_err(|_| SessionError::LockPoisoned {
                component: "registry".to_string(),
            })
    }

    /// Log an error and mirror it onto the telemetry stream
    fn report(&self, err: &SessionError, context: &str) {
        log_session_error(err, context);
        let code = match err {
            SessionError::NotFound { .. } => DiagnosticError::SessionNotFound,
            SessionError::LockPoisoned { .. } => DiagnosticError::LockPoisoned,
            SessionError::AlreadyEnded { .. } => DiagnosticError::SessionEnded,
            SessionError::StrikeInCooldown { .. } => DiagnosticError::StrikeInCooldown,
        };
        telemetry::hub().record_error(code, format!("{}: {}", context, err));
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}
