// Strike Trainer Core - pose-based martial-arts strike recognition
// Frame-by-frame motion tracking, rule-based strike classification,
// technique scoring and per-session statistics

// Module declarations
pub mod analysis;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod managers;
pub mod pose;
pub mod scoring;
pub mod session;
pub mod telemetry;
pub mod testing;

// Re-exports for convenience
pub use analysis::strike::{Side, StrikeEvent, StrikeForm, StrikeType};
pub use analysis::{SessionPipeline, StrikeOutcome};
pub use config::AppConfig;
pub use error::{ErrorCode, SessionError};
pub use managers::SessionManager;
pub use pose::{Frame, Keypoint};
pub use scoring::{TechniqueAnalysis, TechniqueReferenceMatcher, TechniqueScorer};
pub use session::{Session, SessionStats, TechniqueStats};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the stderr tracing subscriber
///
/// `RUST_LOG` overrides `default_filter`. Calling this more than once is
/// harmless; only the first subscriber is kept. `log` records from the
/// managers are bridged through the same subscriber.
pub fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
