//! Testability harness utilities.
//!
//! Deterministic pose generators shared by unit tests, the integration
//! suites and the CLI's synthetic fixture source, so the classifier can be
//! exercised without a camera or a pose-estimation model.

pub mod poses;
