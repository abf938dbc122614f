//! Fixture utilities for the deterministic CLI harness.
//!
//! A fixture is a JSON file holding either recorded keypoint frames or a
//! list of synthetic strike patterns. An optional `<name>.expect.json`
//! next to it lists the strikes the pipeline must report.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::strike::{Side, StrikeType};
use crate::analysis::{SessionPipeline, StrikeOutcome};
use crate::config::AppConfig;
use crate::pose::Frame;
use crate::telemetry::{self, DiagnosticError};
use crate::testing::poses::{synthesize, SyntheticPattern};

/// Default location for fixture JSON assets.
pub const DEFAULT_FIXTURE_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures");

const EXPECT_SUFFIX: &str = ".expect.json";

/// Metadata describing an available fixture.
#[derive(Clone, Debug)]
pub struct FixtureMetadata {
    pub name: String,
    pub path: PathBuf,
    pub expect_path: Option<PathBuf>,
}

/// On-disk fixture: recorded frames, or patterns to synthesize
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Timestamp of the first synthesized frame
    #[serde(default)]
    pub start_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<SyntheticPattern>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<Frame>,
}

impl FixtureFile {
    /// Frames to feed the pipeline, synthesizing them when none are recorded
    pub fn into_frames(self) -> Result<Vec<Frame>> {
        match (self.frames.is_empty(), self.patterns.is_empty()) {
            (false, false) => bail!("fixture defines both frames and patterns"),
            (false, true) => Ok(self.frames),
            (true, false) => Ok(synthesize(&self.patterns, self.start_ms)),
            (true, true) => Ok(Vec::new()),
        }
    }
}

/// Loaded fixture data with its frame sequence.
pub struct FixtureData {
    pub metadata: FixtureMetadata,
    pub description: Option<String>,
    pub frames: Vec<Frame>,
    pub expectations: Option<FixtureExpectations>,
}

/// JSON expectation schema for fixture verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureExpectations {
    pub fixture: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub events: Vec<ExpectedStrike>,
}

impl FixtureExpectations {
    pub fn verify(&self, actual: &[StrikeOutcome]) -> std::result::Result<(), ExpectationDiff> {
        let mut failures = Vec::new();

        for (idx, expected) in self.events.iter().enumerate() {
            match actual.get(idx) {
                Some(outcome) => {
                    let delta = outcome.strike.timestamp_ms.abs_diff(expected.timestamp_ms);
                    if !expected.matches(outcome) || delta > expected.tolerance_ms {
                        failures.push(ExpectationFailure {
                            index: idx,
                            expected: Some(expected.clone()),
                            actual: Some(outcome.clone()),
                            delta_ms: Some(delta),
                        });
                    }
                }
                None => failures.push(ExpectationFailure {
                    index: idx,
                    expected: Some(expected.clone()),
                    actual: None,
                    delta_ms: None,
                }),
            }
        }

        for (idx, outcome) in actual.iter().enumerate().skip(self.events.len()) {
            failures.push(ExpectationFailure {
                index: idx,
                expected: None,
                actual: Some(outcome.clone()),
                delta_ms: None,
            });
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ExpectationDiff { failures })
        }
    }
}

/// Expected strike definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedStrike {
    pub technique: StrikeType,
    pub side: Side,
    pub timestamp_ms: u64,
    #[serde(default = "default_tolerance")]
    pub tolerance_ms: u64,
}

impl ExpectedStrike {
    fn matches(&self, outcome: &StrikeOutcome) -> bool {
        outcome.strike.technique == self.technique && outcome.strike.side == self.side
    }
}

fn default_tolerance() -> u64 {
    50
}

/// Outcome of comparing actual results with expectations.
#[derive(Debug)]
pub struct ExpectationDiff {
    pub failures: Vec<ExpectationFailure>,
}

impl ExpectationDiff {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "failures": self.failures.iter().map(|failure| {
                serde_json::json!({
                    "index": failure.index,
                    "expected": failure.expected,
                    "actual": failure.actual.as_ref().map(|outcome| serde_json::json!({
                        "technique": outcome.strike.technique,
                        "side": outcome.strike.side,
                        "timestamp_ms": outcome.strike.timestamp_ms,
                        "score": outcome.score,
                    })),
                    "delta_ms": failure.delta_ms,
                })
            }).collect::<Vec<_>>()
        })
    }
}

/// Detailed diff entry for a single failure.
///
/// `expected` is `None` for strikes the fixture did not expect at all.
#[derive(Debug)]
pub struct ExpectationFailure {
    pub index: usize,
    pub expected: Option<ExpectedStrike>,
    pub actual: Option<StrikeOutcome>,
    pub delta_ms: Option<u64>,
}

/// Catalog responsible for discovering fixtures on disk.
pub struct FixtureCatalog {
    root: PathBuf,
}

impl FixtureCatalog {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List all fixtures by their metadata.
    pub fn discover(&self) -> Result<Vec<FixtureMetadata>> {
        let mut fixtures = Vec::new();
        if !self.root.exists() {
            return Ok(fixtures);
        }

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let is_fixture = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(".json") && !name.ends_with(EXPECT_SUFFIX));
            if is_fixture {
                fixtures.push(self.metadata_for_path(&path)?);
            }
        }

        fixtures.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(fixtures)
    }

    /// Load fixture frames + expectations for provided name or path.
    pub fn load(&self, fixture: &str, override_expect: Option<PathBuf>) -> Result<FixtureData> {
        let path = self.resolve_fixture_path(fixture)?;
        let metadata = self.metadata_for_path(&path)?;

        let json = fs::read_to_string(&path)
            .with_context(|| format!("reading fixture {}", path.display()))
            .inspect_err(|err| report_load_error(err))?;
        let file: FixtureFile = serde_json::from_str(&json)
            .with_context(|| format!("parsing {}", path.display()))
            .inspect_err(|err| report_load_error(err))?;
        let description = file.description.clone();
        let frames = file
            .into_frames()
            .with_context(|| format!("loading frames of {}", path.display()))?;

        let expectation_path = override_expect.or(metadata.expect_path.clone());
        let expectations = match expectation_path {
            Some(path) => {
                let json = fs::read_to_string(&path)
                    .with_context(|| format!("reading expectation {}", path.display()))?;
                Some(
                    serde_json::from_str(&json)
                        .with_context(|| format!("parsing {}", path.display()))?,
                )
            }
            None => None,
        };

        Ok(FixtureData {
            metadata,
            description,
            frames,
            expectations,
        })
    }

    fn resolve_fixture_path(&self, fixture: &str) -> Result<PathBuf> {
        let as_path = Path::new(fixture);
        if as_path.is_file() {
            return Ok(as_path.to_path_buf());
        }

        let candidate = self.root.join(format!("{fixture}.json"));
        if candidate.exists() {
            Ok(candidate)
        } else {
            Err(anyhow!(
                "Fixture '{fixture}' not found in {}",
                self.root.display()
            ))
        }
    }

    fn metadata_for_path(&self, path: &Path) -> Result<FixtureMetadata> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("Invalid fixture name for {}", path.display()))?
            .to_string();
        let expect_path = path.with_extension("expect.json");
        Ok(FixtureMetadata {
            name,
            path: path.to_path_buf(),
            expect_path: expect_path.exists().then_some(expect_path),
        })
    }
}

impl Default for FixtureCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_FIXTURE_ROOT)
    }
}

fn report_load_error(err: &anyhow::Error) {
    log::error!("[Fixtures] {:#}", err);
    telemetry::hub().record_error(DiagnosticError::FixtureLoad, format!("{:#}", err));
}

/// Executes fixtures by feeding their frames through a fresh session pipeline.
pub struct FixtureProcessor {
    config: AppConfig,
}

impl FixtureProcessor {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Run every frame in order and collect the strikes reported
    ///
    /// # Errors
    /// Frames whose timestamps go backwards are rejected.
    pub fn run(&self, data: &FixtureData) -> Result<Vec<StrikeOutcome>> {
        self.run_with(data, |_| {})
    }

    /// Like [`run`](Self::run), calling `on_strike` as each strike is reported
    pub fn run_with<F>(&self, data: &FixtureData, mut on_strike: F) -> Result<Vec<StrikeOutcome>>
    where
        F: FnMut(&StrikeOutcome),
    {
        if let Some(idx) = data
            .frames
            .windows(2)
            .position(|pair| pair[1].timestamp_ms < pair[0].timestamp_ms)
        {
            bail!(
                "frame {} of {} goes back in time ({} ms after {} ms)",
                idx + 1,
                data.metadata.name,
                data.frames[idx + 1].timestamp_ms,
                data.frames[idx].timestamp_ms
            );
        }

        let mut pipeline = SessionPipeline::new(data.metadata.name.clone(), &self.config);
        let mut outcomes = Vec::new();
        for frame in &data.frames {
            if let Some(outcome) = pipeline.process_frame(frame) {
                on_strike(&outcome);
                outcomes.push(outcome);
            }
        }
        Ok(outcomes)
    }
}

impl Default for FixtureProcessor {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expectation(events: Vec<ExpectedStrike>) -> FixtureExpectations {
        FixtureExpectations {
            fixture: "test".to_string(),
            notes: None,
            events,
        }
    }

    fn expected(technique: StrikeType, side: Side, timestamp_ms: u64) -> ExpectedStrike {
        ExpectedStrike {
            technique,
            side,
            timestamp_ms,
            tolerance_ms: default_tolerance(),
        }
    }

    fn data(frames: Vec<Frame>) -> FixtureData {
        FixtureData {
            metadata: FixtureMetadata {
                name: "test".to_string(),
                path: PathBuf::from("test.json"),
                expect_path: None,
            },
            description: None,
            frames,
            expectations: None,
        }
    }

    fn run_patterns(patterns: &[SyntheticPattern]) -> Vec<StrikeOutcome> {
        FixtureProcessor::default()
            .run(&data(synthesize(patterns, 1000)))
            .unwrap()
    }

    #[test]
    fn test_bundled_fixtures_are_discovered() {
        let fixtures = FixtureCatalog::default().discover().unwrap();
        let names: Vec<_> = fixtures.iter().map(|f| f.name.as_str()).collect();
        assert!(names.contains(&"jab_cross"));
        assert!(names.contains(&"recorded_jab"));
        assert!(names.iter().all(|name| !name.ends_with(".expect")));
        assert!(fixtures
            .iter()
            .find(|f| f.name == "jab_cross")
            .and_then(|f| f.expect_path.as_ref())
            .is_some());
    }

    #[test]
    fn test_bundled_fixtures_meet_expectations() {
        let catalog = FixtureCatalog::default();
        let processor = FixtureProcessor::default();
        for metadata in catalog.discover().unwrap() {
            let data = catalog.load(&metadata.name, None).unwrap();
            let actual = processor.run(&data).unwrap();
            if let Some(expectations) = &data.expectations {
                if let Err(diff) = expectations.verify(&actual) {
                    panic!("{}: {}", metadata.name, diff.to_json());
                }
            }
        }
    }

    #[test]
    fn test_unknown_fixture_is_an_error() {
        let err = FixtureCatalog::default()
            .load("does_not_exist", None)
            .err()
            .unwrap();
        assert!(err.to_string().contains("does_not_exist"));
    }

    #[test]
    fn test_verify_passes_within_tolerance() {
        let actual = run_patterns(&[SyntheticPattern::Jab]);
        let expectations = expectation(vec![expected(StrikeType::Jab, Side::Left, 1050)]);
        assert!(expectations.verify(&actual).is_ok());
    }

    #[test]
    fn test_verify_reports_wrong_technique_missing_and_extra() {
        let actual = run_patterns(&[SyntheticPattern::Jab, SyntheticPattern::Cross]);

        let wrong = expectation(vec![
            expected(StrikeType::Jab, Side::Left, 1033),
            expected(StrikeType::Roundhouse, Side::Left, 1990),
        ]);
        let diff = wrong.verify(&actual).unwrap_err();
        assert_eq!(diff.failures.len(), 1);
        assert_eq!(diff.failures[0].index, 1);
        assert_eq!(diff.failures[0].delta_ms, Some(0));

        let missing = expectation(vec![
            expected(StrikeType::Jab, Side::Left, 1033),
            expected(StrikeType::Cross, Side::Right, 1990),
            expected(StrikeType::Jab, Side::Left, 3000),
        ]);
        let diff = missing.verify(&actual).unwrap_err();
        assert_eq!(diff.failures.len(), 1);
        assert!(diff.failures[0].actual.is_none());

        let extra = expectation(vec![expected(StrikeType::Jab, Side::Left, 1033)]);
        let diff = extra.verify(&actual).unwrap_err();
        assert_eq!(diff.failures.len(), 1);
        assert!(diff.failures[0].expected.is_none());
        assert_eq!(diff.to_json()["failures"][0]["actual"]["technique"], "cross");
    }

    #[test]
    fn test_late_strike_exceeds_tolerance() {
        let actual = run_patterns(&[SyntheticPattern::Jab]);
        let mut late = expected(StrikeType::Jab, Side::Left, 900);
        late.tolerance_ms = 100;
        let diff = expectation(vec![late]).verify(&actual).unwrap_err();
        assert_eq!(diff.failures[0].delta_ms, Some(133));
    }

    #[test]
    fn test_fixture_file_sources() {
        let synthetic: FixtureFile =
            serde_json::from_str(r#"{"start_ms": 500, "patterns": ["jab"]}"#).unwrap();
        let frames = synthetic.into_frames().unwrap();
        assert_eq!(frames[0].timestamp_ms, 500);

        let empty = FixtureFile::default();
        assert!(empty.into_frames().unwrap().is_empty());

        let both = FixtureFile {
            patterns: vec![SyntheticPattern::Idle],
            frames: synthesize(&[], 0),
            ..FixtureFile::default()
        };
        assert!(both.into_frames().is_err());
    }

    #[test]
    fn test_processor_rejects_frames_out_of_order() {
        let mut frames = synthesize(&[SyntheticPattern::Idle], 0);
        frames.swap(1, 2);
        let err = FixtureProcessor::default().run(&data(frames)).unwrap_err();
        assert!(err.to_string().contains("back in time"));
    }

    #[test]
    fn test_run_with_reports_each_strike() {
        let mut seen = Vec::new();
        let frames = synthesize(&[SyntheticPattern::Jab, SyntheticPattern::Cross], 1000);
        let outcomes = FixtureProcessor::default()
            .run_with(&data(frames), |outcome| seen.push(outcome.strike.timestamp_ms))
            .unwrap();
        assert_eq!(seen, vec![1033, 1990]);
        assert_eq!(outcomes.len(), 2);
    }
}
