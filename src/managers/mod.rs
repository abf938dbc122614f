// Managers Module
//
// Focused manager types owning shared, lock-protected state.
//
// - SessionManager: session lifecycle, per-session pipelines, history queries

pub mod session_manager;

pub use session_manager::{ComboPolicyFactory, SessionManager, TechniqueProgress};
